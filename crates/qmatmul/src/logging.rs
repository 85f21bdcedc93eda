use std::sync::OnceLock;

use tracing_subscriber::{EnvFilter, fmt};

use crate::config::QmmConfig;

/// Install a fmt subscriber at the configured level.
///
/// Only the first call installs anything. Returns whether this call did.
pub fn init_tracing(config: &QmmConfig) -> bool {
    static INSTALLED: OnceLock<bool> = OnceLock::new();
    let mut installed_now = false;
    INSTALLED.get_or_init(|| {
        let filter = EnvFilter::new(format!("qmatmul={}", config.log_level));
        installed_now = fmt().with_env_filter(filter).with_target(true).try_init().is_ok();
        true
    });
    installed_now
}
