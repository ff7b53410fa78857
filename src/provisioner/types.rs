//! Claim and volume descriptors exchanged with the controller
//!
//! All types are `Serialize`/`Deserialize` so the controller can hand them
//! over as JSON and persist the volume descriptor between provision and
//! delete.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Annotation on a volume holding the identity of the provisioner that owns it
pub const IDENTITY_ANNOTATION: &str = "hostpath/provisionerIdentity";

/// How a volume may be mounted
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum AccessMode {
    ReadWriteOnce,
    ReadOnlyMany,
    ReadWriteMany,
    ReadWriteOncePod,
}

/// What happens to a volume once its claim is released
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum ReclaimPolicy {
    Retain,
    #[default]
    Delete,
    Recycle,
}

/// A request for storage
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClaimDescriptor {
    pub namespace: String,
    pub name: String,
    #[serde(default)]
    pub annotations: HashMap<String, String>,
    #[serde(default)]
    pub access_modes: Vec<AccessMode>,
    /// Requested storage quantity, e.g. `"10Gi"`; copied, never interpreted
    #[serde(default)]
    pub storage_request: Option<String>,
}

impl ClaimDescriptor {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_annotation(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.annotations.insert(key.into(), value.into());
        self
    }

    pub fn annotation(&self, key: &str) -> Option<&str> {
        self.annotations.get(key).map(String::as_str)
    }

    /// `namespace/name`, for log lines
    pub fn qualified_name(&self) -> String {
        format!("{}/{}", self.namespace, self.name)
    }
}

/// Everything the controller knows when it asks for a new volume
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProvisionRequest {
    /// Name the controller assigned to the volume
    pub volume_name: String,
    pub claim: ClaimDescriptor,
    /// Reclaim policy of the claim's storage class
    #[serde(default)]
    pub reclaim_policy: ReclaimPolicy,
}

/// Host path volumes are always created on demand
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum HostPathType {
    #[default]
    DirectoryOrCreate,
}

/// Where the volume lives on the host
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HostPathSource {
    /// Absolute path under the provisioning root
    pub path: PathBuf,
    #[serde(default, rename = "type")]
    pub kind: HostPathType,
}

/// Durable record of a provisioned volume
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VolumeDescriptor {
    pub name: String,
    #[serde(default)]
    pub annotations: HashMap<String, String>,
    #[serde(default)]
    pub reclaim_policy: ReclaimPolicy,
    #[serde(default)]
    pub access_modes: Vec<AccessMode>,
    #[serde(default)]
    pub capacity: Option<String>,
    pub host_path: HostPathSource,
}

impl VolumeDescriptor {
    /// Identity tag of the provisioner that created this volume, if any
    pub fn identity(&self) -> Option<&str> {
        self.annotations.get(IDENTITY_ANNOTATION).map(String::as_str)
    }
}

/// Terminal marker returned with every provision result
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ProvisioningState {
    /// No further retry is needed for this request
    Finished,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_volume_descriptor_from_controller_json() {
        let json = r#"{
            "name": "pvc-123",
            "annotations": {"hostpath/provisionerIdentity": "node-a"},
            "host_path": {"path": "/hostPath/team/data"}
        }"#;
        let volume: VolumeDescriptor = serde_json::from_str(json).unwrap();
        assert_eq!(volume.identity(), Some("node-a"));
        assert_eq!(volume.reclaim_policy, ReclaimPolicy::Delete);
        assert_eq!(volume.host_path.kind, HostPathType::DirectoryOrCreate);
        assert_eq!(volume.host_path.path, PathBuf::from("/hostPath/team/data"));
    }

    #[test]
    fn test_claim_builder() {
        let claim = ClaimDescriptor::new("default", "data-pvc-1")
            .with_annotation("hostpath/location", "team/${pvcId}");
        assert_eq!(claim.qualified_name(), "default/data-pvc-1");
        assert_eq!(claim.annotation("hostpath/location"), Some("team/${pvcId}"));
        assert_eq!(claim.annotation("missing"), None);
    }
}
