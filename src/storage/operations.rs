//! Storage operations
//!
//! Creates volume directories and removes them without racing a new volume
//! provisioned at the same location.

use log::{error, info, warn};
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::ProvisionerConfig;
use crate::error::{IoOperation, ProvisionerError};
use crate::provisioner::VolumeDescriptor;
use crate::storage::filesystem::{
    create_directory_tree, entry_exists, remove_tree, residue_exists,
};
use crate::storage::results::DestroyOutcome;
use crate::storage::validation::{join_under_root, relativize};

/// Prefix of directories whose deletion is in flight
pub const DELETION_PREFIX: &str = ".deleted.";

/// Sibling path a volume directory is renamed to before it is removed:
/// `.../<leaf>` becomes `.../.deleted.<leaf>.<volume name>`.
pub fn pending_deletion_path(path: &Path, volume_name: &str) -> Option<PathBuf> {
    let parent = path.parent()?;
    let leaf = path.file_name()?;

    let mut name = OsString::from(DELETION_PREFIX);
    name.push(leaf);
    name.push(".");
    name.push(volume_name);
    Some(parent.join(name))
}

/// Filesystem side of a volume's lifecycle
#[derive(Debug, Clone, Copy)]
pub struct VolumeLifecycle<'a> {
    config: &'a ProvisionerConfig,
}

impl<'a> VolumeLifecycle<'a> {
    pub fn new(config: &'a ProvisionerConfig) -> Self {
        Self { config }
    }

    /// Create the directory backing `relative_path` under the mount root.
    ///
    /// Idempotent. Returns the real path that now exists.
    pub fn create(&self, relative_path: &str) -> Result<PathBuf, ProvisionerError> {
        let real_path = join_under_root(&self.config.mount_root, relative_path)?;
        info!("\tCreating [{}]", real_path.display());

        if let Err(e) = create_directory_tree(&real_path) {
            error!("\tProvisioning failed: {}", e);
            return Err(e);
        }
        Ok(real_path)
    }

    /// Remove the directory recorded in `volume`.
    ///
    /// Volumes tagged by another instance are refused with
    /// [`ProvisionerError::Ignored`] before anything is touched.
    pub fn destroy(&self, volume: &VolumeDescriptor) -> Result<DestroyOutcome, ProvisionerError> {
        let identity = volume
            .identity()
            .ok_or_else(|| ProvisionerError::MissingIdentity(volume.name.clone()))?;
        if identity != self.config.identity {
            return Err(ProvisionerError::Ignored(format!(
                "identity annotation [{}] on volume {} does not match ours [{}]",
                identity, volume.name, self.config.identity
            )));
        }

        let host_path = &volume.host_path.path;
        info!(
            "Removing the contents for volume {} at host path [{}]",
            volume.name,
            host_path.display()
        );

        let relative = relativize(&self.config.provisioning_root, host_path).inspect_err(|e| {
            error!("\tFailed to relativize the host path: {}", e);
        })?;
        let full_path = self.config.mount_root.join(&relative);
        let deletion_path = pending_deletion_path(&full_path, &volume.name).ok_or_else(|| {
            ProvisionerError::PathEscapesRoot {
                root: self.config.mount_root.clone(),
                path: full_path.clone(),
            }
        })?;

        self.remove_renamed(&full_path, deletion_path)
    }

    fn remove_renamed(
        &self,
        full_path: &Path,
        deletion_path: PathBuf,
    ) -> Result<DestroyOutcome, ProvisionerError> {
        let outcome = if residue_exists(&deletion_path) {
            warn!("\tResuming interrupted deletion of [{}]", deletion_path.display());
            DestroyOutcome::Resumed {
                deletion_path: deletion_path.clone(),
            }
        } else if !entry_exists(full_path)? {
            info!(
                "\tThe volume path [{}] no longer exists, skipping the deletion",
                full_path.display()
            );
            return Ok(DestroyOutcome::AlreadyAbsent {
                path: full_path.to_path_buf(),
            });
        } else {
            match fs::rename(full_path, &deletion_path) {
                Ok(()) => {
                    info!(
                        "\tRenamed the path [{}] to [{}] for race protection",
                        full_path.display(),
                        deletion_path.display()
                    );
                    DestroyOutcome::Removed {
                        path: full_path.to_path_buf(),
                        deletion_path: deletion_path.clone(),
                    }
                }
                Err(e) => {
                    warn!(
                        "\t{}, removing the original path instead",
                        ProvisionerError::io(IoOperation::Rename, full_path, e)
                    );
                    DestroyOutcome::RemovedInPlace {
                        path: full_path.to_path_buf(),
                    }
                }
            }
        };

        let target = match &outcome {
            DestroyOutcome::RemovedInPlace { path } => path.as_path(),
            _ => deletion_path.as_path(),
        };
        info!("\tDeleting [{}] recursively...", target.display());
        if let Err(e) = remove_tree(target) {
            error!("\tFailed to remove the contents: {}", e);
            return Err(e);
        }
        info!("\tDeletion complete!");
        Ok(outcome)
    }
}
