use std::{collections::VecDeque, marker::PhantomData};

use rustc_hash::FxHashMap;
use tracing::{debug, info_span, trace};

use super::{metrics::CacheMetrics, traits::CacheableKernel};
use crate::{context::Device, error::QmmError};

/// Bounded cache of resources built from keys.
///
/// When full, inserting a new entry evicts the oldest one.
pub struct KernelCache<K: CacheableKernel> {
    entries: FxHashMap<K::Key, K::CachedResource>,
    insertion_order: VecDeque<K::Key>,
    capacity: usize,
    hits: u64,
    misses: u64,
    evictions: u64,
    _marker: PhantomData<K>,
}

impl<K: CacheableKernel> KernelCache<K> {
    /// Create a cache holding at most `capacity` entries (at least one).
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: FxHashMap::default(),
            insertion_order: VecDeque::with_capacity(capacity),
            capacity,
            hits: 0,
            misses: 0,
            evictions: 0,
            _marker: PhantomData,
        }
    }

    /// Return the cached resource for `key`, building it on a miss.
    pub fn get_or_create<D: Device>(&mut self, key: &K::Key, device: &D) -> Result<K::CachedResource, QmmError> {
        let span = info_span!("cache_get_or_create", cache = K::CACHE_NAME);
        let _enter = span.enter();

        if let Some(resource) = self.entries.get(key) {
            self.hits += 1;
            return Ok(resource.clone());
        }

        // Build before evicting so a failed build leaves the cache untouched.
        let resource = K::create_cached_resource(key, device)?;
        self.evict_to_fit();
        self.misses += 1;
        debug!(cache = K::CACHE_NAME, ?key, size = self.entries.len() + 1, "cache miss, resource created");
        self.entries.insert(key.clone(), resource.clone());
        self.insertion_order.push_back(key.clone());
        Ok(resource)
    }

    fn evict_to_fit(&mut self) {
        while self.entries.len() >= self.capacity {
            let Some(oldest) = self.insertion_order.pop_front() else {
                break;
            };
            if self.entries.remove(&oldest).is_some() {
                self.evictions += 1;
                trace!(cache = K::CACHE_NAME, key = ?oldest, "evicted oldest entry");
            }
        }
    }

    #[inline]
    pub fn contains(&self, key: &K::Key) -> bool {
        self.entries.contains_key(key)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn metrics(&self) -> CacheMetrics {
        CacheMetrics {
            size: self.entries.len(),
            capacity: self.capacity,
            hits: self.hits,
            misses: self.misses,
            evictions: self.evictions,
        }
    }
}
