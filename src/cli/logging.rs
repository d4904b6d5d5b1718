//! Diagnostic logging to stderr
//!
//! `RNC_LOG` takes an `EnvFilter` directive (e.g. `rnc=trace`) and wins over
//! the `--verbose` / `--quiet` flags.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub const LOG_ENV: &str = "RNC_LOG";

/// Filter used when `RNC_LOG` is unset or invalid
pub fn default_directive(verbose: bool, quiet: bool) -> &'static str {
    if quiet {
        "error"
    } else if verbose {
        "warn,rnc=debug"
    } else {
        "warn"
    }
}

pub fn init(verbose: bool, quiet: bool) {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| default_directive(verbose, quiet).into());

    // A subscriber may already be installed (tests); keep it
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .without_time(),
        )
        .try_init();
}
