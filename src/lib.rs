pub mod config;
pub mod controller;
pub mod error;
pub mod provisioner;
pub mod resolver;
pub mod storage;
pub mod utils;

pub use crate::config::ProvisionerConfig;
pub use crate::error::ProvisionerError;
pub use crate::provisioner::{HostPathProvisioner, Provisioner};
