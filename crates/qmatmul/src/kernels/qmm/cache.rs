use std::sync::Arc;

use super::descriptor::{MatmulDescriptor, QmmPlanKey};
use crate::{
    caching::{CacheableKernel, KernelCache}, config::QmmConfig, context::Device, error::QmmError
};

/// Plans kept when no capacity is configured.
pub const DEFAULT_PLAN_CACHE_CAPACITY: usize = 64;

/// Zero-sized type that implements `CacheableKernel` for matmul plans.
pub struct QmmPlanKernel;

impl CacheableKernel for QmmPlanKernel {
    type Key = QmmPlanKey;
    type CachedResource = Arc<MatmulDescriptor>;

    const CACHE_NAME: &'static str = "qmm_plan";

    #[inline]
    fn create_cached_resource<D: Device>(key: &Self::Key, device: &D) -> Result<Self::CachedResource, QmmError> {
        MatmulDescriptor::build(device, key).map(Arc::new)
    }
}

/// Cache of matmul plans keyed by shape, formats, mode and device.
pub type PlanCache = KernelCache<QmmPlanKernel>;

impl PlanCache {
    /// Cache sized from `QMATMUL_PLAN_CACHE_CAPACITY`, falling back to the default.
    pub fn from_env() -> Self {
        let capacity = qmatmul_env::PLAN_CACHE_CAPACITY.get_or_warn().unwrap_or(DEFAULT_PLAN_CACHE_CAPACITY);
        Self::with_capacity(capacity)
    }

    pub fn from_config(config: &QmmConfig) -> Self {
        Self::with_capacity(config.plan_cache_capacity)
    }
}

impl Default for PlanCache {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_PLAN_CACHE_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        caching::CacheMetrics, host::HostDevice, kernels::qmm::MatrixLayout, quantization::{NumericFormat, QuantizationMode}
    };

    fn key(n: u64) -> QmmPlanKey {
        QmmPlanKey {
            device_ordinal: 0,
            a_format: NumericFormat::F16,
            a: MatrixLayout::new(8, 64, 64, false),
            b: MatrixLayout::new(64, n, 64, true),
            out_format: NumericFormat::F16,
            mode: QuantizationMode::Nvfp4,
        }
    }

    #[test]
    fn hits_share_the_cached_plan() {
        let device = HostDevice::block_scaled();
        let mut cache = PlanCache::with_capacity(2);
        let first = cache.get_or_create(&key(16), &device).expect("plan");
        let second = cache.get_or_create(&key(16), &device).expect("plan");
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.metrics().hits, 1);
        assert_eq!(cache.metrics().misses, 1);
    }

    #[test]
    fn oldest_plan_is_evicted_at_capacity() {
        let device = HostDevice::block_scaled();
        let mut cache = PlanCache::with_capacity(2);
        for n in [16, 32, 48] {
            cache.get_or_create(&key(n), &device).expect("plan");
        }
        assert_eq!(cache.len(), 2);
        assert!(!cache.contains(&key(16)));
        assert!(cache.contains(&key(48)));
        assert_eq!(
            cache.metrics(),
            CacheMetrics {
                size: 2,
                capacity: 2,
                hits: 0,
                misses: 3,
                evictions: 1,
            }
        );
    }

    #[test]
    fn failed_builds_are_not_cached() {
        let device = HostDevice::block_scaled();
        let mut cache = PlanCache::with_capacity(2);
        let mut affine = key(16);
        affine.mode = QuantizationMode::Affine;
        assert!(matches!(
            cache.get_or_create(&affine, &device),
            Err(QmmError::UnsupportedQuantizationMode { .. })
        ));
        assert!(cache.is_empty());
        assert_eq!(cache.metrics().misses, 0);
    }

    #[test]
    fn capacity_comes_from_config() {
        let config = QmmConfig {
            plan_cache_capacity: 3,
            ..QmmConfig::default()
        };
        assert_eq!(PlanCache::from_config(&config).capacity(), 3);
        assert_eq!(PlanCache::default().capacity(), DEFAULT_PLAN_CACHE_CAPACITY);
    }
}
