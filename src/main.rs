//! Hostpath provisioner - Entry Point
//!
//! Provisions volumes as directories under a host path on behalf of a
//! provisioning controller talking NDJSON over stdin/stdout.

use log::{error, info};
use std::process;
use std::sync::Arc;
use tokio::io::BufReader;

use hostpath_provisioner::controller::{Greeting, serve};
use hostpath_provisioner::utils::logging::setup_logging;
use hostpath_provisioner::{HostPathProvisioner, ProvisionerConfig};

#[tokio::main]
async fn main() {
    // Initialize the logger (env_logger picks up RUST_LOG environment variable)
    setup_logging();

    info!("Launching hostpath provisioner...");

    let config = match ProvisionerConfig::load() {
        Ok(config) => Arc::new(config),
        Err(e) => {
            error!("{}", e);
            process::exit(1);
        }
    };

    let greeting = Greeting::from_config(&config);
    let provisioner = Arc::new(HostPathProvisioner::new(config));
    let stdin = BufReader::new(tokio::io::stdin());

    if let Err(e) = serve(provisioner, greeting, stdin, tokio::io::stdout()).await {
        error!("Controller stream failed: {}", e);
        process::exit(1);
    }
    info!("Shutting down");
}
