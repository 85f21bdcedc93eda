//! Process environment helpers shared by the qmatmul engine and its tests.

pub mod environment;

pub use environment::{
    EnvVar, Environment, guard::EnvVarGuard, qmm::{LOG_LEVEL, PLAN_CACHE_CAPACITY, QmmEnvVar}, value::{EnvVarError, EnvVarFormatError, EnvVarParseError, TypedEnvVar, TypedEnvVarGuard}
};

/// Returns true when the variable is present in the process environment, whatever its value.
pub fn is_set(var: impl Into<EnvVar>) -> bool {
    Environment::get(var).is_some()
}
