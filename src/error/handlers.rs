//! Error handlers
//!
//! Classifies provisioner errors for the controller and logs warnings.

use crate::error::types::{ProvisionerError, SanitizationWarning};
use log::{error, warn};

/// Log a provisioner error at the level it deserves
pub fn handle_error(err: &ProvisionerError) {
    if err.is_ignored() {
        warn!("{}", err);
    } else {
        error!("Provisioner error: {}", err);
    }
}

/// Log a sanitization warning; the caller has already applied its fallback
pub fn handle_warning(warning: &SanitizationWarning) {
    warn!("{}", warning);
}

/// Convert error to the category reported to the controller
pub fn error_category(err: &ProvisionerError) -> &'static str {
    match err {
        ProvisionerError::Configuration(_) => "config",
        ProvisionerError::Io { .. } => "io",
        ProvisionerError::PathEscapesRoot { .. } => "path",
        ProvisionerError::MissingIdentity(_) => "ownership",
        ProvisionerError::Ignored(_) => "ignored",
    }
}

/// Whether a later attempt of the same request could succeed
pub fn is_retryable(err: &ProvisionerError) -> bool {
    matches!(err, ProvisionerError::Io { .. })
}
