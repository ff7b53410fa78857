//! Volume path resolution

use log::info;

use crate::config::ProvisionerConfig;
use crate::error::SanitizationWarning;
use crate::error::handlers::handle_warning;
use crate::provisioner::ClaimDescriptor;
use crate::resolver::identifier::rewrite_identifier;
use crate::resolver::normalize::normalize_relative;

/// Placeholder in a location annotation replaced by the claim identifier
pub const PVC_ID_PLACEHOLDER: &str = "${pvcId}";

/// Computes where under the provisioning root a claim's volume lives
#[derive(Debug, Clone, Copy)]
pub struct PathResolver<'a> {
    config: &'a ProvisionerConfig,
}

impl<'a> PathResolver<'a> {
    pub fn new(config: &'a ProvisionerConfig) -> Self {
        Self { config }
    }

    /// Resolve the root-relative path backing a claim's volume.
    ///
    /// Never fails. Without the location annotation the result is exactly
    /// `default_name`. With it, the annotation value has `${pvcId}` replaced
    /// by the claim identifier and is normalized; if nothing usable remains
    /// `default_name` is used instead.
    pub fn resolve(&self, claim: &ClaimDescriptor, default_name: &str) -> String {
        let location_key = &self.config.location_annotation;
        let Some(custom_path) = claim.annotation(location_key) else {
            info!(
                "No {} annotation for PVC {}, will use the default path: [{}]",
                location_key,
                claim.qualified_name(),
                default_name
            );
            return default_name.to_string();
        };

        info!(
            "Computing the host path for PVC {} from the {} annotation: [{}]",
            claim.qualified_name(),
            location_key,
            custom_path
        );

        let pvc_id = self.claim_identifier(claim);
        let substituted = custom_path.replace(PVC_ID_PLACEHOLDER, &pvc_id);
        let normalized = normalize_relative(&substituted);

        if normalized.is_empty() {
            handle_warning(&SanitizationWarning::EmptyLocation(custom_path.to_string()));
            return default_name.to_string();
        }
        normalized
    }

    /// Claim name, optionally rewritten by the pattern/replace annotations
    fn claim_identifier(&self, claim: &ClaimDescriptor) -> String {
        let pattern = claim.annotation(&self.config.id_pattern_annotation);
        let replace = claim.annotation(&self.config.id_replace_annotation);

        match (pattern, replace) {
            (Some(pattern), Some(replace)) => {
                info!("\tpvcId Pattern: [{}]", pattern);
                info!("\tpvcId Replace: [{}]", replace);
                info!("\tpvcId Value  : [{}]", claim.name);
                match rewrite_identifier(&claim.name, pattern, replace) {
                    Ok(id) => {
                        info!("\tpvcId Result : [{}]", id);
                        id
                    }
                    Err(warning) => {
                        handle_warning(&warning);
                        claim.name.clone()
                    }
                }
            }
            (Some(_), None) => {
                handle_warning(&SanitizationWarning::PatternWithoutReplacement(
                    claim.qualified_name(),
                ));
                claim.name.clone()
            }
            (None, Some(_)) => {
                handle_warning(&SanitizationWarning::ReplacementWithoutPattern(
                    claim.qualified_name(),
                ));
                claim.name.clone()
            }
            (None, None) => claim.name.clone(),
        }
    }
}
