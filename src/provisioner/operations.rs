//! Provisioner operations implementation

use log::info;
use std::collections::HashMap;
use std::sync::Arc;

use crate::config::ProvisionerConfig;
use crate::error::ProvisionerError;
use crate::provisioner::types::{
    HostPathSource, HostPathType, IDENTITY_ANNOTATION, ProvisionRequest, ProvisioningState,
    VolumeDescriptor,
};
use crate::resolver::PathResolver;
use crate::storage::{DestroyOutcome, VolumeLifecycle};

/// The capability a provisioning controller drives
pub trait Provisioner: Send + Sync {
    /// Create the storage for a claim and describe the resulting volume
    fn provision(
        &self,
        request: &ProvisionRequest,
    ) -> Result<(VolumeDescriptor, ProvisioningState), ProvisionerError>;

    /// Remove the storage behind a previously provisioned volume
    fn delete(&self, volume: &VolumeDescriptor) -> Result<(), ProvisionerError>;
}

/// Provisions volumes as directories under a host path
#[derive(Debug, Clone)]
pub struct HostPathProvisioner {
    config: Arc<ProvisionerConfig>,
}

impl HostPathProvisioner {
    pub fn new(config: Arc<ProvisionerConfig>) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ProvisionerConfig {
        &self.config
    }

    /// Same as [`Provisioner::delete`], reporting what happened on disk
    pub fn delete_volume(
        &self,
        volume: &VolumeDescriptor,
    ) -> Result<DestroyOutcome, ProvisionerError> {
        VolumeLifecycle::new(&self.config).destroy(volume)
    }
}

impl Provisioner for HostPathProvisioner {
    fn provision(
        &self,
        request: &ProvisionRequest,
    ) -> Result<(VolumeDescriptor, ProvisioningState), ProvisionerError> {
        let claim = &request.claim;
        let relative_path = PathResolver::new(&self.config).resolve(claim, &request.volume_name);
        let host_path = self.config.provisioning_root.join(&relative_path);

        info!(
            "Provisioning volume {} from PVC {} at host path [{}]",
            request.volume_name,
            claim.qualified_name(),
            host_path.display()
        );
        VolumeLifecycle::new(&self.config).create(&relative_path)?;

        let volume = VolumeDescriptor {
            name: request.volume_name.clone(),
            annotations: HashMap::from([(
                IDENTITY_ANNOTATION.to_string(),
                self.config.identity.clone(),
            )]),
            reclaim_policy: request.reclaim_policy,
            access_modes: claim.access_modes.clone(),
            capacity: claim.storage_request.clone(),
            host_path: HostPathSource {
                path: host_path,
                kind: HostPathType::DirectoryOrCreate,
            },
        };
        Ok((volume, ProvisioningState::Finished))
    }

    fn delete(&self, volume: &VolumeDescriptor) -> Result<(), ProvisionerError> {
        self.delete_volume(volume).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provisioner::types::{AccessMode, ClaimDescriptor, ReclaimPolicy};
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    fn provisioner(mount: &Path) -> HostPathProvisioner {
        HostPathProvisioner::new(Arc::new(ProvisionerConfig::new(
            "node-a",
            "/var/hostpath",
            mount,
        )))
    }

    fn request(claim: ClaimDescriptor) -> ProvisionRequest {
        ProvisionRequest {
            volume_name: "pvc-0f1e".into(),
            claim,
            reclaim_policy: ReclaimPolicy::Retain,
        }
    }

    #[test]
    fn test_provision_fills_descriptor() {
        let mount = TempDir::new().unwrap();
        let provisioner = provisioner(mount.path());
        let mut claim = ClaimDescriptor::new("default", "data");
        claim.access_modes = vec![AccessMode::ReadWriteOnce, AccessMode::ReadOnlyMany];
        claim.storage_request = Some("5Gi".into());

        let (volume, state) = provisioner.provision(&request(claim)).unwrap();
        assert_eq!(state, ProvisioningState::Finished);
        assert_eq!(volume.name, "pvc-0f1e");
        assert_eq!(volume.identity(), Some("node-a"));
        assert_eq!(volume.reclaim_policy, ReclaimPolicy::Retain);
        assert_eq!(
            volume.access_modes,
            vec![AccessMode::ReadWriteOnce, AccessMode::ReadOnlyMany]
        );
        assert_eq!(volume.capacity.as_deref(), Some("5Gi"));
        assert_eq!(volume.host_path.path, PathBuf::from("/var/hostpath/pvc-0f1e"));
        assert!(mount.path().join("pvc-0f1e").is_dir());
    }

    #[test]
    fn test_provision_with_location_uses_both_roots() {
        let mount = TempDir::new().unwrap();
        let provisioner = provisioner(mount.path());
        let claim = ClaimDescriptor::new("default", "data-pvc-abc123")
            .with_annotation("hostpath/location", "team/${pvcId}/vol")
            .with_annotation("hostpath/pvcId-pattern", "^(.*)-pvc-.*$")
            .with_annotation("hostpath/pvcId-replace", "$1");

        let (volume, _) = provisioner.provision(&request(claim)).unwrap();
        assert_eq!(
            volume.host_path.path,
            PathBuf::from("/var/hostpath/team/data/vol")
        );
        assert!(mount.path().join("team/data/vol").is_dir());
    }

    #[test]
    fn test_provision_then_delete() {
        let mount = TempDir::new().unwrap();
        let provisioner = provisioner(mount.path());
        let claim =
            ClaimDescriptor::new("default", "data").with_annotation("hostpath/location", "a/b");

        let (volume, _) = provisioner.provision(&request(claim)).unwrap();
        assert!(mount.path().join("a/b").is_dir());

        provisioner.delete(&volume).unwrap();
        assert!(!mount.path().join("a/b").exists());
        provisioner.delete(&volume).unwrap();
    }
}
