//! Volume path resolution
//!
//! Turns a claim's name and annotations into the sanitized path, relative
//! to the provisioning root, that backs its volume.

pub mod identifier;
pub mod normalize;
mod operations;

// Re-export public types and functions
pub use operations::{PVC_ID_PLACEHOLDER, PathResolver};
