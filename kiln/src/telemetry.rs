//! Tracing subscriber setup for binaries embedding the engine.

use tracing_subscriber::EnvFilter;

pub const DEFAULT_LOG_FILTER: &str = "info";

/// Installs a fmt subscriber filtered by `RUST_LOG`, falling back to `info`.
/// Returns `false` when a global subscriber was already installed.
pub fn init_tracing() -> bool {
    init_tracing_with(DEFAULT_LOG_FILTER)
}

pub fn init_tracing_with(default_filter: &str) -> bool {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::init_tracing;

    #[test]
    fn second_install_reports_existing_subscriber() {
        init_tracing();
        assert!(!init_tracing());
    }
}
