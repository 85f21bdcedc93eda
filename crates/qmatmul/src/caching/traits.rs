use std::{fmt::Debug, hash::Hash};

use crate::{context::Device, error::QmmError};

/// Trait implemented by resources that participate in a [`super::KernelCache`].
///
/// Implementations are usually zero-sized adapters naming the key type and
/// how to build the resource on a miss.
pub trait CacheableKernel: 'static {
    /// Unique key type for entries in this cache.
    type Key: Clone + Eq + Hash + Debug + 'static;
    /// Concrete resource stored in the cache. Clones should be cheap handles.
    type CachedResource: Clone + 'static;

    /// Human readable cache name used in logs and metrics.
    const CACHE_NAME: &'static str;

    /// Instantiate a cached resource from its key.
    fn create_cached_resource<D: Device>(key: &Self::Key, device: &D) -> Result<Self::CachedResource, QmmError>;
}
