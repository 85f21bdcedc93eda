use std::sync::OnceLock;

use qmatmul_env::{EnvVarGuard, PLAN_CACHE_CAPACITY, QmmEnvVar, is_set};
use serial_test::serial;

#[test]
#[serial]
fn get_cached_latches_first_value() {
    let _clear = EnvVarGuard::unset(QmmEnvVar::PlanCacheCapacity);
    static CACHE: OnceLock<Option<usize>> = OnceLock::new();

    {
        let _set = EnvVarGuard::set(QmmEnvVar::PlanCacheCapacity, "8");
        assert_eq!(PLAN_CACHE_CAPACITY.get_cached(&CACHE), Some(8));
    }

    {
        let _set = EnvVarGuard::set(QmmEnvVar::PlanCacheCapacity, "16");
        assert_eq!(PLAN_CACHE_CAPACITY.get_cached(&CACHE), Some(8));
    }
}

#[test]
#[serial]
fn is_set_tracks_guard_scope() {
    let _clear = EnvVarGuard::unset(QmmEnvVar::LogLevel);
    assert!(!is_set(QmmEnvVar::LogLevel));
    {
        let _set = EnvVarGuard::set(QmmEnvVar::LogLevel, "info");
        assert!(is_set(QmmEnvVar::LogLevel));
    }
    assert!(!is_set(QmmEnvVar::LogLevel));
}
