//! Tracing subscriber setup for simulation binaries.

use tracing::Level;
use tracing_subscriber::filter::Directive;
use tracing_subscriber::EnvFilter;

/// The log level that will be used if `RUST_LOG` is not defined.
pub const FALLBACK_LOG_LEVEL: Level = Level::INFO;

///
/// Installs a formatted tracing subscriber filtered through `RUST_LOG`,
/// falling back to [`FALLBACK_LOG_LEVEL`].
///
/// Installing twice (or next to a subscriber the caller set up) is a no-op,
/// so tests can call this freely.
///
pub fn init() {
    let filter = EnvFilter::builder()
        .with_default_directive(Directive::from(FALLBACK_LOG_LEVEL))
        .from_env_lossy();
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
