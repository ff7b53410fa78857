//! Path validation
//!
//! Keeps every real filesystem path confined to its root.

use std::path::{Component, Path, PathBuf};

use crate::error::ProvisionerError;

/// True when `path` is a non-empty chain of plain names
fn is_confined(path: &Path) -> bool {
    let mut components = path.components().peekable();
    components.peek().is_some() && components.all(|c| matches!(c, Component::Normal(_)))
}

/// Join a root-relative path onto `root`.
///
/// Absolute paths, `..` components and the empty path are refused: the
/// result is always a strict descendant of `root`.
pub fn join_under_root(root: &Path, relative: &str) -> Result<PathBuf, ProvisionerError> {
    let relative_path = Path::new(relative);
    if !is_confined(relative_path) {
        return Err(ProvisionerError::PathEscapesRoot {
            root: root.to_path_buf(),
            path: relative_path.to_path_buf(),
        });
    }
    Ok(root.join(relative_path))
}

/// Express a stored host path relative to the provisioning root.
///
/// Comparison is lexical. A host path outside the root, or the root itself,
/// is refused.
pub fn relativize(root: &Path, host_path: &Path) -> Result<PathBuf, ProvisionerError> {
    let escapes = || ProvisionerError::PathEscapesRoot {
        root: root.to_path_buf(),
        path: host_path.to_path_buf(),
    };

    let relative = host_path.strip_prefix(root).map_err(|_| escapes())?;
    if !is_confined(relative) {
        return Err(escapes());
    }
    Ok(relative.to_path_buf())
}
