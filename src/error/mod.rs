//! Error handling
//!
//! Defines error types and handling for the provisioner.

pub mod handlers;
pub mod types;

pub use types::*;
