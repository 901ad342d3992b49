//! Diagnostic logging.
//!
//! Everything goes to stderr so it never interleaves with the streamed
//! review on stdout. `REVUE_LOG` takes an `EnvFilter` directive string and
//! overrides `--verbose`.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::constants::LOG_ENV;

fn default_directive(verbose: bool) -> &'static str {
    if verbose {
        "revue=debug,warn"
    } else {
        "warn"
    }
}

/// Installs the global subscriber. Safe to call more than once; later calls
/// are ignored.
pub fn init(verbose: bool) {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose)));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .try_init();
}
