//! Logging setup.

use tracing_subscriber::EnvFilter;

/// Installs a `fmt` subscriber filtered by `RUST_LOG`, defaulting to `info`.
///
/// ```text
/// RUST_LOG=debug aspen-guide                 # payload-level detail
/// RUST_LOG=aspen_guide::store=debug,info     # one module only
/// ```
///
/// Calling this twice is harmless; the second call leaves the first
/// subscriber in place.
pub fn setup_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
