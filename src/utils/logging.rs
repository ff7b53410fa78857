//! Logging utilities
//!
//! Provides logging setup and configuration.

use env_logger::Env;

/// Setup logging for the provisioner.
///
/// Defaults to `info`; `RUST_LOG` overrides. Output goes to stderr so stdout
/// stays free for the controller protocol.
pub fn setup_logging() {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
}
