//! Kept in its own test binary: the process-wide config is initialised once.

use qmatmul::{QmmConfig, kernels::qmm::DEFAULT_PLAN_CACHE_CAPACITY};
use qmatmul_env::{EnvVarGuard, PLAN_CACHE_CAPACITY, QmmEnvVar};
use serial_test::serial;
use tracing::Level;

#[test]
#[serial]
fn global_config_falls_back_to_defaults_on_malformed_environment() {
    let _capacity = PLAN_CACHE_CAPACITY.unset_guard();
    let config = {
        let _level = EnvVarGuard::set(QmmEnvVar::LogLevel, "chatty");
        QmmConfig::global()
    };
    assert_eq!(*config, QmmConfig::default());
    assert_eq!(config.log_level, Level::INFO);
    assert_eq!(config.plan_cache_capacity, DEFAULT_PLAN_CACHE_CAPACITY);

    let _capacity = PLAN_CACHE_CAPACITY.set_guard(7).expect("set capacity");
    assert!(std::ptr::eq(QmmConfig::global(), config));
    assert_eq!(QmmConfig::global().plan_cache_capacity, DEFAULT_PLAN_CACHE_CAPACITY);
}
