//! Tracing subscriber setup.
//!
//! The library crates only emit events; installing a subscriber is left to
//! the embedding binary or test. `RUST_LOG` selects the filter, defaulting
//! to `info`.

use tracing_subscriber::EnvFilter;

fn filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Install a global fmt subscriber.
///
/// Returns `false` when one is already installed, so repeated calls are
/// harmless.
pub fn init() -> bool {
    tracing_subscriber::fmt()
        .with_env_filter(filter())
        .with_target(true)
        .try_init()
        .is_ok()
}

/// Same as [`init`], writing through the test harness's captured output.
pub fn init_for_tests() -> bool {
    tracing_subscriber::fmt()
        .with_env_filter(filter())
        .with_test_writer()
        .try_init()
        .is_ok()
}
