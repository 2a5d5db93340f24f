//! Global `tracing` logger setup.

use tracing_subscriber::{
    util::{SubscriberInitExt, TryInitError},
    EnvFilter,
};

/// Installs the global `tracing` subscriber: compact single-line events on
/// stdout, INFO and up unless `RUST_LOG` narrows or widens the filter with
/// the usual directive syntax.
///
/// Panics if a subscriber was already installed.
pub fn init() {
    try_init().expect("a tracing subscriber was already installed");
}

/// Logger setup for tests. Tests are silent by default; exporting
/// `RUST_LOG` opts in. The install race between test threads is ignored,
/// since whichever thread wins installs an identical subscriber.
pub fn init_for_testing() {
    if std::env::var_os("RUST_LOG").is_some() {
        let _ = try_init();
    }
}

fn try_init() -> Result<(), TryInitError> {
    // An unset or unparseable RUST_LOG falls back to INFO for all targets.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .compact()
        .with_env_filter(filter)
        .finish()
        .try_init()
}
