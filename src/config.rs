//! Configuration management for the hostpath provisioner
//!
//! Everything here is read once at process start and never reloaded. Values
//! come from an optional `hostpath-provisioner` config file with the process
//! environment layered on top.

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment, File};
use log::info;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::handlers::handle_warning;
use crate::error::{ProvisionerError, SanitizationWarning};

pub const DEFAULT_ROOT: &str = "/hostPath";
pub const DEFAULT_LOCATION_ANNOTATION: &str = "hostpath/location";
pub const DEFAULT_ID_PATTERN_ANNOTATION: &str = "hostpath/pvcId-pattern";
pub const DEFAULT_ID_REPLACE_ANNOTATION: &str = "hostpath/pvcId-replace";
pub const DEFAULT_PROVISIONER_NAME: &str = "hostpath";

const CONFIG_FILE: &str = "hostpath-provisioner";

/// Settings exactly as found in the environment / config file.
///
/// Keys are the lowercased environment variable names.
#[derive(Debug, Default, Deserialize)]
pub struct RawSettings {
    /// `NODE_NAME`, required
    pub node_name: Option<String>,
    /// `NODE_HOST_PATH`
    pub node_host_path: Option<String>,
    /// `NODE_HOST_PATH_ANNOTATION`
    pub node_host_path_annotation: Option<String>,
    /// `NODE_HOST_PVCID_PATTERN_ANNOTATION`
    pub node_host_pvcid_pattern_annotation: Option<String>,
    /// `NODE_HOST_PVCID_REPLACE_ANNOTATION`
    pub node_host_pvcid_replace_annotation: Option<String>,
    /// `NODE_HOST_PATH_MOUNT`
    pub node_host_path_mount: Option<String>,
    /// `HOSTPATH_PROVISIONER_NAME`
    pub hostpath_provisioner_name: Option<String>,
}

/// Immutable process-wide configuration shared by every component
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ProvisionerConfig {
    /// Identity of this provisioner instance, set to the node's name
    pub identity: String,
    /// Logical root recorded in volume descriptors
    pub provisioning_root: PathBuf,
    /// Where the provisioning root is reachable from this process
    pub mount_root: PathBuf,
    /// Claim annotation requesting a specific location within the tree
    pub location_annotation: String,
    /// Claim annotation holding the regex that parses the claim id
    pub id_pattern_annotation: String,
    /// Claim annotation holding the replacement template (`$1`, `${name}`...)
    pub id_replace_annotation: String,
    /// Name this provisioner is registered under with the controller
    pub provisioner_name: String,
}

impl ProvisionerConfig {
    /// Configuration with the default annotation keys
    pub fn new(
        identity: impl Into<String>,
        provisioning_root: impl Into<PathBuf>,
        mount_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            identity: identity.into(),
            provisioning_root: provisioning_root.into(),
            mount_root: mount_root.into(),
            location_annotation: DEFAULT_LOCATION_ANNOTATION.to_string(),
            id_pattern_annotation: DEFAULT_ID_PATTERN_ANNOTATION.to_string(),
            id_replace_annotation: DEFAULT_ID_REPLACE_ANNOTATION.to_string(),
            provisioner_name: DEFAULT_PROVISIONER_NAME.to_string(),
        }
    }

    /// Load configuration from the optional config file with environment overrides
    pub fn load() -> Result<Self, ProvisionerError> {
        let builder = Config::builder()
            .add_source(File::with_name(CONFIG_FILE).required(false))
            .add_source(Environment::default());
        Self::from_builder(builder)
    }

    /// Build and validate configuration from prepared sources
    pub fn from_builder(builder: ConfigBuilder<DefaultState>) -> Result<Self, ProvisionerError> {
        let settings: RawSettings = builder.build()?.try_deserialize()?;
        let config = Self::from_settings(settings)?;

        match serde_json::to_string_pretty(&config) {
            Ok(dump) => info!("Initialized as follows:\n{}", dump),
            Err(e) => info!("Initialized as {:?} ({})", config, e),
        }
        Ok(config)
    }

    /// Apply defaults and validation to raw settings
    pub fn from_settings(settings: RawSettings) -> Result<Self, ProvisionerError> {
        let identity = non_empty(settings.node_name).ok_or_else(|| {
            ProvisionerError::Configuration(
                "NODE_NAME must be set so that this provisioner can identify itself".into(),
            )
        })?;

        let provisioning_root = PathBuf::from(
            non_empty(settings.node_host_path).unwrap_or_else(|| DEFAULT_ROOT.to_string()),
        );
        if !provisioning_root.is_absolute() {
            return Err(ProvisionerError::Configuration(format!(
                "NODE_HOST_PATH [{}] must be an absolute path",
                provisioning_root.display()
            )));
        }

        let mount_root = match non_empty(settings.node_host_path_mount) {
            Some(mount) if Path::new(&mount).is_absolute() => PathBuf::from(mount),
            Some(mount) => {
                handle_warning(&SanitizationWarning::RelativeMountRoot(mount));
                PathBuf::from(DEFAULT_ROOT)
            }
            None => PathBuf::from(DEFAULT_ROOT),
        };

        Ok(Self {
            identity,
            provisioning_root,
            mount_root,
            location_annotation: non_empty(settings.node_host_path_annotation)
                .unwrap_or_else(|| DEFAULT_LOCATION_ANNOTATION.to_string()),
            id_pattern_annotation: non_empty(settings.node_host_pvcid_pattern_annotation)
                .unwrap_or_else(|| DEFAULT_ID_PATTERN_ANNOTATION.to_string()),
            id_replace_annotation: non_empty(settings.node_host_pvcid_replace_annotation)
                .unwrap_or_else(|| DEFAULT_ID_REPLACE_ANNOTATION.to_string()),
            provisioner_name: non_empty(settings.hostpath_provisioner_name)
                .unwrap_or_else(|| DEFAULT_PROVISIONER_NAME.to_string()),
        })
    }
}

/// Unset and empty variables mean the same thing
fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}
