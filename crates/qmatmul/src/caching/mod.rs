//! Bounded caches for reusable engine resources.
//!
//! A resource type plugs in by implementing [`CacheableKernel`]; the generic
//! [`KernelCache`] handles lookup, creation on miss, eviction and counters.

pub mod cache;
pub mod metrics;
pub mod traits;

pub use cache::KernelCache;
pub use metrics::CacheMetrics;
pub use traits::CacheableKernel;
