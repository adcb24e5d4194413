//! Logging setup for the command line tool.
//!
//! Library code only emits `tracing` events; installing a subscriber is the
//! binary's job. Output goes to stderr so stdout stays clean for rendered
//! markup and filenames.
//!
//! Log level is controlled via the `SHOEBOX_LOG` environment variable:
//! - `SHOEBOX_LOG=debug` for verbose output
//! - `SHOEBOX_LOG=info` for standard output (default)
//! - `SHOEBOX_LOG=warn` for warnings and errors only

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

pub const LOG_ENV: &str = "SHOEBOX_LOG";

/// Install the global subscriber. `verbose` raises the default level to
/// `debug` when `SHOEBOX_LOG` is unset.
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let env_filter =
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .try_init();
}
