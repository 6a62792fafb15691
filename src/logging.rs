//! Tracing setup. Logs go to stderr; stdout carries only reports.

use tracing_subscriber::EnvFilter;

use crate::config::Config;

/// `RUST_LOG` wins over `NBX_LOG`; both fall back to `warn`.
pub fn init(cfg: &Config) {
    let fallback = cfg.get("NBX_LOG").unwrap_or_else(|| "warn".into());
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
