//! Storage result types
//!
//! Defines result structures returned by volume lifecycle operations.

use std::path::PathBuf;

/// How a volume's backing directory was disposed of
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DestroyOutcome {
    /// Renamed aside, then removed
    Removed { path: PathBuf, deletion_path: PathBuf },
    /// A previous interrupted deletion was finished
    Resumed { deletion_path: PathBuf },
    /// The rename failed, so the original path was removed directly
    RemovedInPlace { path: PathBuf },
    /// Nothing was there any more
    AlreadyAbsent { path: PathBuf },
}
