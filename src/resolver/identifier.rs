//! Claim identifier derivation
//!
//! A claim may carry a regex and a replacement template that rewrite its
//! name into the identifier substituted for `${pvcId}` in its location.

use regex::Regex;

use crate::error::SanitizationWarning;

/// Rewrite `name` through `pattern` and the `replace` template.
///
/// Every match of the pattern is replaced; the template may reference
/// capture groups (`$1`, `${name}`). Surrounding whitespace is trimmed.
/// An invalid pattern or an empty result is reported as a warning and the
/// caller keeps the unmodified name.
pub fn rewrite_identifier(
    name: &str,
    pattern: &str,
    replace: &str,
) -> Result<String, SanitizationWarning> {
    let regex = Regex::new(pattern).map_err(|e| SanitizationWarning::InvalidPattern {
        pattern: pattern.to_string(),
        reason: e.to_string(),
    })?;

    let rewritten = regex.replace_all(name, replace);
    let rewritten = rewritten.trim();
    if rewritten.is_empty() {
        return Err(SanitizationWarning::EmptySubstitution {
            pattern: pattern.to_string(),
            replace: replace.to_string(),
        });
    }
    Ok(rewritten.to_string())
}
