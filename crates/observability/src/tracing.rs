//! Tracing subscriber initialization.

use tracing_subscriber::EnvFilter;

/// Default filter when `RUST_LOG` is unset: our crates at info, noisy HTTP
/// internals at warn.
const DEFAULT_FILTER: &str = "info,hyper=warn,reqwest=warn,sqlx=warn";

/// Initialize tracing for the process (JSON lines, filter from `RUST_LOG`).
///
/// Safe to call multiple times (subsequent calls are no-ops).
pub fn init() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .json()
        .with_timer(tracing_subscriber::fmt::time::SystemTime)
        .with_target(false)
        .try_init();
}

#[cfg(test)]
mod tests {
    #[test]
    fn init_is_idempotent() {
        super::init();
        super::init();
        ::tracing::info!("still logging after second init");
    }
}
