use qmatmul::{ConfigError, PlanCache, QmmConfig, kernels::qmm::DEFAULT_PLAN_CACHE_CAPACITY};
use qmatmul_env::{EnvVarGuard, LOG_LEVEL, PLAN_CACHE_CAPACITY, QmmEnvVar};
use serial_test::serial;
use tracing::Level;

#[test]
#[serial]
fn config_defaults_when_unset() {
    let _level = LOG_LEVEL.unset_guard();
    let _capacity = PLAN_CACHE_CAPACITY.unset_guard();

    let config = QmmConfig::from_env().expect("defaults parse");
    assert_eq!(config.log_level, Level::INFO);
    assert_eq!(config.plan_cache_capacity, DEFAULT_PLAN_CACHE_CAPACITY);
}

#[test]
#[serial]
fn config_reads_typed_variables() {
    let _level = LOG_LEVEL.set_guard(Level::TRACE).expect("set level");
    let _capacity = PLAN_CACHE_CAPACITY.set_guard(5).expect("set capacity");

    let config = QmmConfig::from_env().expect("configuration should parse");
    assert_eq!(config.log_level, Level::TRACE);
    assert_eq!(config.plan_cache_capacity, 5);
    assert_eq!(PlanCache::from_env().capacity(), 5);
    assert_eq!(PlanCache::from_config(&config).capacity(), 5);
}

#[test]
#[serial]
fn config_rejects_malformed_values() {
    let _capacity = PLAN_CACHE_CAPACITY.unset_guard();
    {
        let _level = EnvVarGuard::set(QmmEnvVar::LogLevel, "verbose");
        match QmmConfig::from_env() {
            Err(ConfigError::InvalidLogLevel { value }) => assert_eq!(value, "verbose"),
            other => panic!("expected invalid log level error, got {other:?}"),
        }
    }

    let _level = LOG_LEVEL.unset_guard();
    let _capacity = EnvVarGuard::set(QmmEnvVar::PlanCacheCapacity, "0");
    match QmmConfig::from_env() {
        Err(ConfigError::InvalidPlanCacheCapacity { value }) => assert_eq!(value, "0"),
        other => panic!("expected invalid capacity error, got {other:?}"),
    }
    assert_eq!(PlanCache::from_env().capacity(), DEFAULT_PLAN_CACHE_CAPACITY);
}
