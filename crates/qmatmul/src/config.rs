//! Runtime configuration assembled from the process environment.

use std::sync::OnceLock;

use qmatmul_env::{EnvVarError, LOG_LEVEL, PLAN_CACHE_CAPACITY};
use tracing::Level;

use crate::kernels::qmm::DEFAULT_PLAN_CACHE_CAPACITY;

/// Errors raised while loading [`QmmConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid log level '{value}'")]
    InvalidLogLevel { value: String },
    #[error("invalid plan cache capacity '{value}'")]
    InvalidPlanCacheCapacity { value: String },
    #[error("failed to access engine environment: {source}")]
    EnvVar {
        #[from]
        source: EnvVarError,
    },
}

/// Engine configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QmmConfig {
    /// Minimum tracing level installed by [`crate::logging::init_tracing`].
    pub log_level: Level,
    /// Plans retained by a [`crate::kernels::qmm::PlanCache`] built from this config.
    pub plan_cache_capacity: usize,
}

impl Default for QmmConfig {
    fn default() -> Self {
        Self {
            log_level: Level::INFO,
            plan_cache_capacity: DEFAULT_PLAN_CACHE_CAPACITY,
        }
    }
}

static CONFIG: OnceLock<QmmConfig> = OnceLock::new();

impl QmmConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let log_level = match LOG_LEVEL.get() {
            Ok(Some(value)) => value,
            Ok(None) => Level::INFO,
            Err(EnvVarError::Parse { value, .. }) => return Err(ConfigError::InvalidLogLevel { value }),
            Err(err) => return Err(err.into()),
        };

        let plan_cache_capacity = match PLAN_CACHE_CAPACITY.get() {
            Ok(Some(value)) => value,
            Ok(None) => DEFAULT_PLAN_CACHE_CAPACITY,
            Err(EnvVarError::Parse { value, .. }) => return Err(ConfigError::InvalidPlanCacheCapacity { value }),
            Err(err) => return Err(err.into()),
        };

        Ok(Self {
            log_level,
            plan_cache_capacity,
        })
    }

    /// Process-wide configuration, loaded from the environment on first use.
    ///
    /// A malformed environment falls back to defaults after logging a warning.
    pub fn global() -> &'static Self {
        CONFIG.get_or_init(|| {
            Self::from_env().unwrap_or_else(|err| {
                tracing::warn!(error = %err, "falling back to default engine configuration");
                Self::default()
            })
        })
    }
}
