//! Engine-specific environment variable identifiers and descriptors.

use tracing::Level;

use super::EnvVar;
use super::value::{EnvVarFormatError, EnvVarParseError, TypedEnvVar};

/// Environment variables consulted by the quantized matmul engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum QmmEnvVar {
    /// Minimum tracing level installed by `qmatmul::logging::init_tracing`.
    LogLevel,
    /// Maximum number of matmul plans retained by a plan cache.
    PlanCacheCapacity,
}

impl QmmEnvVar {
    pub const fn key(self) -> &'static str {
        match self {
            QmmEnvVar::LogLevel => "QMATMUL_LOG_LEVEL",
            QmmEnvVar::PlanCacheCapacity => "QMATMUL_PLAN_CACHE_CAPACITY",
        }
    }

    /// Convert into the unscoped [`EnvVar`] variant.
    pub const fn into_env(self) -> EnvVar {
        EnvVar::Qmm(self)
    }
}

/// Typed descriptor for the engine log level.
pub const LOG_LEVEL: TypedEnvVar<Level> = TypedEnvVar::new(QmmEnvVar::LogLevel.into_env(), parse_log_level, format_level);

/// Typed descriptor for the plan cache capacity.
pub const PLAN_CACHE_CAPACITY: TypedEnvVar<usize> =
    TypedEnvVar::new(QmmEnvVar::PlanCacheCapacity.into_env(), parse_capacity, format_usize);

fn parse_log_level(value: &str) -> Result<Level, EnvVarParseError> {
    value.trim().parse::<Level>().map_err(|_| EnvVarParseError::new("invalid tracing level"))
}

fn format_level(level: &Level) -> Result<String, EnvVarFormatError> {
    Ok(level.to_string())
}

fn parse_capacity(value: &str) -> Result<usize, EnvVarParseError> {
    match value.trim().parse::<usize>() {
        Ok(0) => Err(EnvVarParseError::new("capacity must be at least 1")),
        Ok(capacity) => Ok(capacity),
        Err(_) => Err(EnvVarParseError::new("value is not a positive integer")),
    }
}

fn format_usize(value: &usize) -> Result<String, EnvVarFormatError> {
    if *value == 0 {
        return Err(EnvVarFormatError::new("capacity must be at least 1"));
    }
    Ok(value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_level_accepts_tracing_names() {
        assert_eq!(parse_log_level("debug").ok(), Some(Level::DEBUG));
        assert_eq!(parse_log_level(" WARN ").ok(), Some(Level::WARN));
        assert!(parse_log_level("verbose").is_err());
    }

    #[test]
    fn capacity_rejects_zero() {
        assert!(parse_capacity("0").is_err());
        assert!(parse_capacity("-3").is_err());
        assert_eq!(parse_capacity("32").ok(), Some(32));
        assert!(format_usize(&0).is_err());
    }
}
