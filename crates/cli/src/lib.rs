//! Command-line host for recipes implemented in Python.

pub mod args;
pub mod config;
pub mod output;
pub mod recipes;
pub mod sof;

use tracing_subscriber::EnvFilter;

/// Installs the stderr log subscriber. `--debug` wins over `RUST_LOG`.
pub fn init_logging(debug: bool) {
    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
