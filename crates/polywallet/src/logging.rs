//! Logging bootstrap for hosts that do not install their own subscriber

use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Environment variable read for the filter directives
pub const LOG_ENV: &str = "POLYWALLET_LOG";

/// Builds the filter from `POLYWALLET_LOG`, else `default_filter`
pub fn env_filter(default_filter: &str) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default_filter))
}

/// Installs a fmt subscriber as the global default.
///
/// Returns `false` when a global subscriber was already set, in which case
/// nothing changes.
pub fn init(default_filter: &str) -> bool {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(env_filter(default_filter))
        .with_target(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_idempotent() {
        init("polywallet=debug");
        assert!(!init("polywallet=trace"));
        tracing::info!("logging ready");
    }

    #[test]
    fn test_default_filter_used() {
        if std::env::var_os(LOG_ENV).is_none() {
            assert_eq!(env_filter("warn").to_string(), "warn");
        }
    }
}
