//! Error types
//!
//! Defines the failures surfaced by provisioning and deletion, and the
//! sanitization warnings that are only ever logged.

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Filesystem operation that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoOperation {
    CreateDirectory,
    SetPermissions,
    Inspect,
    Rename,
    RemoveTree,
}

impl fmt::Display for IoOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IoOperation::CreateDirectory => write!(f, "create directory"),
            IoOperation::SetPermissions => write!(f, "set permissions on"),
            IoOperation::Inspect => write!(f, "inspect"),
            IoOperation::Rename => write!(f, "rename"),
            IoOperation::RemoveTree => write!(f, "remove"),
        }
    }
}

/// Errors returned by the provisioner to its controller
#[derive(Debug)]
pub enum ProvisionerError {
    /// Startup configuration is unusable
    Configuration(String),
    /// A filesystem call failed; the operation's primary effect did not happen
    Io {
        operation: IoOperation,
        path: PathBuf,
        source: io::Error,
    },
    /// A path would resolve outside of its root
    PathEscapesRoot { root: PathBuf, path: PathBuf },
    /// The volume carries no identity tag at all
    MissingIdentity(String),
    /// The volume belongs to another provisioner instance; not a failure
    Ignored(String),
}

impl ProvisionerError {
    pub fn io(operation: IoOperation, path: impl Into<PathBuf>, source: io::Error) -> Self {
        ProvisionerError::Io {
            operation,
            path: path.into(),
            source,
        }
    }

    /// True when the controller should neither retry nor alarm on this error
    pub fn is_ignored(&self) -> bool {
        matches!(self, ProvisionerError::Ignored(_))
    }
}

impl fmt::Display for ProvisionerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProvisionerError::Configuration(msg) => write!(f, "Configuration error: {}", msg),
            ProvisionerError::Io {
                operation,
                path,
                source,
            } => write!(
                f,
                "Failed to {} [{}]: {}",
                operation,
                path.display(),
                source
            ),
            ProvisionerError::PathEscapesRoot { root, path } => write!(
                f,
                "Path [{}] escapes the root [{}]",
                path.display(),
                root.display()
            ),
            ProvisionerError::MissingIdentity(volume) => {
                write!(f, "Identity annotation not found on volume {}", volume)
            }
            ProvisionerError::Ignored(reason) => write!(f, "Ignored: {}", reason),
        }
    }
}

impl std::error::Error for ProvisionerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ProvisionerError::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<config::ConfigError> for ProvisionerError {
    fn from(error: config::ConfigError) -> Self {
        ProvisionerError::Configuration(error.to_string())
    }
}

/// Non-fatal problems found while computing a volume path.
///
/// Each one triggers a documented fallback and is logged, never returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SanitizationWarning {
    InvalidPattern { pattern: String, reason: String },
    EmptySubstitution { pattern: String, replace: String },
    PatternWithoutReplacement(String),
    ReplacementWithoutPattern(String),
    EmptyLocation(String),
    RelativeMountRoot(String),
}

impl fmt::Display for SanitizationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SanitizationWarning::InvalidPattern { pattern, reason } => {
                write!(f, "The pvcId pattern [{}] is not valid: {}", pattern, reason)
            }
            SanitizationWarning::EmptySubstitution { pattern, replace } => write!(
                f,
                "The pvcId pattern [{}] with replacement [{}] produced an empty id, keeping the claim name",
                pattern, replace
            ),
            SanitizationWarning::PatternWithoutReplacement(claim) => write!(
                f,
                "Claim {} has a pvcId pattern but no replacement, can't apply regex transformation",
                claim
            ),
            SanitizationWarning::ReplacementWithoutPattern(claim) => write!(
                f,
                "Claim {} has a pvcId replacement but no pattern, can't apply regex transformation",
                claim
            ),
            SanitizationWarning::EmptyLocation(location) => write!(
                f,
                "The location [{}] normalizes to nothing, using the volume name",
                location
            ),
            SanitizationWarning::RelativeMountRoot(mount) => write!(
                f,
                "The given mount root [{}] must be an absolute path",
                mount
            ),
        }
    }
}
