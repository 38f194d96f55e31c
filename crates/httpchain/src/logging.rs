//! Log output for tests.
//!
//! The tester emits `tracing` events for every build, execute and assert
//! step. Call [`init_test_logging`] at the top of a test to see them:
//!
//! ```rust,ignore
//! httpchain::logging::init_test_logging();
//! ```
//!
//! The filter is read from `RUST_LOG` and defaults to `warn`.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Default filter when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "warn";

/// Installs a global subscriber that writes through the libtest capture
/// writer.
///
/// Returns `false` if a global subscriber was already installed, which makes
/// repeated calls from many tests harmless.
pub fn init_test_logging() -> bool {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_test_writer()
        .with_target(true);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()
        .is_ok()
}
