//! File system operations
//!
//! Thin wrappers over `std::fs` with the semantics volume directories need.

use log::warn;
use std::fs::{self, DirBuilder, Permissions};
use std::io;
use std::os::unix::fs::{DirBuilderExt, PermissionsExt};
use std::path::Path;

use crate::error::{IoOperation, ProvisionerError};

/// rwxrwxr-x
pub const VOLUME_DIR_MODE: u32 = 0o775;

/// Whether anything (file, directory or dangling symlink) exists at `path`
pub fn entry_exists(path: &Path) -> Result<bool, ProvisionerError> {
    match fs::symlink_metadata(path) {
        Ok(_) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(ProvisionerError::io(IoOperation::Inspect, path, e)),
    }
}

/// Whether a pending deletion was left at `path`.
///
/// Any failure to inspect it counts as "nothing left": the rename that
/// follows fails on the same path and the caller removes the original.
pub fn residue_exists(path: &Path) -> bool {
    match fs::symlink_metadata(path) {
        Ok(_) => true,
        Err(e) if e.kind() == io::ErrorKind::NotFound => false,
        Err(e) => {
            warn!("Cannot inspect [{}]: {}", path.display(), e);
            false
        }
    }
}

/// Create `path` and every missing ancestor with [`VOLUME_DIR_MODE`].
///
/// The mode is applied explicitly so the process umask has no effect.
/// Existing directories are left alone. On failure, directories created by
/// this call are removed again.
pub fn create_directory_tree(path: &Path) -> Result<(), ProvisionerError> {
    let mut missing = Vec::new();
    for ancestor in path.ancestors() {
        if ancestor.as_os_str().is_empty() {
            break;
        }
        match fs::metadata(ancestor) {
            Ok(meta) if meta.is_dir() => break,
            Ok(_) => {
                return Err(ProvisionerError::io(
                    IoOperation::CreateDirectory,
                    ancestor,
                    io::Error::new(io::ErrorKind::AlreadyExists, "exists and is not a directory"),
                ));
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => missing.push(ancestor),
            Err(e) => return Err(ProvisionerError::io(IoOperation::Inspect, ancestor, e)),
        }
    }

    let mut created: Vec<&Path> = Vec::new();
    for dir in missing.into_iter().rev() {
        if let Err(err) = create_single_directory(dir, &mut created) {
            rollback(&created);
            return Err(err);
        }
    }
    Ok(())
}

fn create_single_directory<'p>(
    dir: &'p Path,
    created: &mut Vec<&'p Path>,
) -> Result<(), ProvisionerError> {
    match DirBuilder::new().mode(VOLUME_DIR_MODE).create(dir) {
        Ok(()) => {
            created.push(dir);
            fs::set_permissions(dir, Permissions::from_mode(VOLUME_DIR_MODE))
                .map_err(|e| ProvisionerError::io(IoOperation::SetPermissions, dir, e))
        }
        // Someone else created it in the meantime
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists && dir.is_dir() => Ok(()),
        Err(e) => Err(ProvisionerError::io(IoOperation::CreateDirectory, dir, e)),
    }
}

fn rollback(created: &[&Path]) {
    for dir in created.iter().rev() {
        if let Err(e) = fs::remove_dir(dir) {
            warn!("\tFailed to roll back directory [{}]: {}", dir.display(), e);
        }
    }
}

/// Remove whatever is at `path`, recursively for directories.
///
/// Symbolic links are removed, never followed. A missing path is not an error.
pub fn remove_tree(path: &Path) -> Result<(), ProvisionerError> {
    let result = match fs::symlink_metadata(path) {
        Ok(meta) if meta.is_dir() => fs::remove_dir_all(path),
        Ok(_) => fs::remove_file(path),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    };
    result.map_err(|e| ProvisionerError::io(IoOperation::RemoveTree, path, e))
}
