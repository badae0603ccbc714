//! Tracing setup shared by the antikoala binaries.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Default filter for the CLI: tables go to stdout, only problems reach stderr.
pub const CLI_DEFAULT_LEVEL: &str = "warn";

/// Initialize logging for the CLI
///
/// `verbose` raises the default level to `debug`. `RUST_LOG` always wins.
/// Output goes to stderr so that command output on stdout stays parseable.
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { CLI_DEFAULT_LEVEL };
    init_with_level(default_level)
}

/// Initialize logging with a specific default level
pub fn init_with_level(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    // try_init: a second call (tests, embedding) must not panic
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact().with_writer(std::io::stderr))
        .try_init();
}

/// Initialize logging for testing (captures logs for test output)
#[cfg(test)]
pub fn init_test() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter(EnvFilter::new("debug"))
        .try_init();
}
