//! File system storage management
//!
//! Handles volume directory creation, race-safe deletion and path
//! confinement under the mount root.

pub mod filesystem;
mod operations;
pub mod results;
pub mod validation;

pub use operations::{DELETION_PREFIX, VolumeLifecycle, pending_deletion_path};
pub use results::DestroyOutcome;
