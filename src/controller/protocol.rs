//! Wire protocol between a provisioning controller and this process.
//!
//! NDJSON: every message is one JSON object terminated by `\n`.
//!
//! - On startup the process writes one [`Greeting`] line.
//! - Each [`Request`] line is answered by exactly one [`Response`] line.
//!   Requests run concurrently, so responses may arrive out of order; the
//!   optional `id` is echoed back for correlation.

use serde::{Deserialize, Serialize};

use crate::config::ProvisionerConfig;
use crate::error::ProvisionerError;
use crate::error::handlers::{error_category, is_retryable};
use crate::provisioner::{ProvisionRequest, ProvisioningState, VolumeDescriptor};

/// First line written once the provisioner is ready
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Greeting {
    pub ready: bool,
    pub provisioner: String,
    pub identity: String,
}

impl Greeting {
    pub fn from_config(config: &ProvisionerConfig) -> Self {
        Self {
            ready: true,
            provisioner: config.provisioner_name.clone(),
            identity: config.identity.clone(),
        }
    }
}

/// Requests the controller may send
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Request {
    Provision {
        #[serde(default)]
        id: Option<String>,
        request: ProvisionRequest,
    },
    Delete {
        #[serde(default)]
        id: Option<String>,
        volume: VolumeDescriptor,
    },
}

impl Request {
    pub fn id(&self) -> Option<&str> {
        match self {
            Request::Provision { id, .. } | Request::Delete { id, .. } => id.as_deref(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Ok,
    /// Not ours; the controller must neither retry nor alarm
    Ignored,
    Error,
}

/// Answer to a single request
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Response {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub status: Status,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume: Option<VolumeDescriptor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<ProvisioningState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retryable: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl Response {
    fn with_status(id: Option<String>, status: Status) -> Self {
        Self {
            id,
            status,
            volume: None,
            state: None,
            reason: None,
            category: None,
            retryable: None,
            message: None,
        }
    }

    pub fn provisioned(
        id: Option<String>,
        volume: VolumeDescriptor,
        state: ProvisioningState,
    ) -> Self {
        Self {
            volume: Some(volume),
            state: Some(state),
            ..Self::with_status(id, Status::Ok)
        }
    }

    pub fn deleted(id: Option<String>) -> Self {
        Self::with_status(id, Status::Ok)
    }

    pub fn failed(id: Option<String>, err: &ProvisionerError) -> Self {
        if let ProvisionerError::Ignored(reason) = err {
            return Self {
                reason: Some(reason.clone()),
                ..Self::with_status(id, Status::Ignored)
            };
        }
        Self {
            category: Some(error_category(err).to_string()),
            retryable: Some(is_retryable(err)),
            message: Some(err.to_string()),
            ..Self::with_status(id, Status::Error)
        }
    }

    /// A line that could not be understood as a request
    pub fn malformed(message: impl Into<String>) -> Self {
        Self {
            category: Some("request".to_string()),
            retryable: Some(false),
            message: Some(message.into()),
            ..Self::with_status(None, Status::Error)
        }
    }

    /// The worker executing a request died
    pub fn internal(id: Option<String>, message: impl Into<String>) -> Self {
        Self {
            category: Some("internal".to_string()),
            retryable: Some(true),
            message: Some(message.into()),
            ..Self::with_status(id, Status::Error)
        }
    }
}
