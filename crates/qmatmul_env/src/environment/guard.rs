//! Scoped guard helpers for manipulating engine environment variables.

use super::{EnvVar, Environment};

/// Guard object that restores the previous environment state upon drop.
///
/// Each mutation acquires the global [`Environment`] mutex so scoped updates
/// remain serialised even when tests execute concurrently.
pub struct EnvVarGuard {
    var: EnvVar,
    previous: Option<String>,
}

impl EnvVarGuard {
    /// Set the provided environment variable for the duration of the guard.
    pub fn set(var: impl Into<EnvVar>, value: &str) -> Self {
        let var = var.into();
        let mut lock = Environment::lock();
        let previous = Environment::get(var);
        Environment::set_locked(var, value, &mut lock);
        Self { var, previous }
    }

    /// Unset the provided environment variable for the duration of the guard.
    pub fn unset(var: impl Into<EnvVar>) -> Self {
        let var = var.into();
        let mut lock = Environment::lock();
        let previous = Environment::get(var);
        Environment::remove_locked(var, &mut lock);
        Self { var, previous }
    }
}

impl Drop for EnvVarGuard {
    fn drop(&mut self) {
        let mut lock = Environment::lock();
        match &self.previous {
            Some(previous) => Environment::set_locked(self.var, previous, &mut lock),
            None => Environment::remove_locked(self.var, &mut lock),
        }
    }
}

#[cfg(test)]
mod tests {
    use serial_test::serial;

    use super::*;
    use crate::QmmEnvVar;

    #[test]
    #[serial]
    fn guard_restores_previous_value() {
        let _outer = EnvVarGuard::set(QmmEnvVar::PlanCacheCapacity, "12");
        {
            let _inner = EnvVarGuard::set(QmmEnvVar::PlanCacheCapacity, "99");
            assert_eq!(Environment::get(QmmEnvVar::PlanCacheCapacity).as_deref(), Some("99"));
        }
        assert_eq!(Environment::get(QmmEnvVar::PlanCacheCapacity).as_deref(), Some("12"));
    }

    #[test]
    #[serial]
    fn unset_guard_removes_then_restores() {
        let _outer = EnvVarGuard::set(QmmEnvVar::LogLevel, "debug");
        {
            let _cleared = EnvVarGuard::unset(QmmEnvVar::LogLevel);
            assert!(Environment::get(QmmEnvVar::LogLevel).is_none());
        }
        assert_eq!(Environment::get(QmmEnvVar::LogLevel).as_deref(), Some("debug"));
    }
}
