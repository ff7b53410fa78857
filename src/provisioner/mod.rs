//! Provisioner module
//!
//! The interface the provisioning controller drives, its single host path
//! implementation, and the descriptors exchanged with the controller.

mod operations;
pub mod types;

// Re-export public types and functions
pub use operations::{HostPathProvisioner, Provisioner};
pub use types::*;
