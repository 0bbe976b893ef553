//! Sibling reference resolution, derived names and merge rules.
//!
//! Resolution runs once per reference slot at finalize time:
//! - an explicit `AutomaticallyCreated` / `External` reference is kept as is
//! - `AutomaticPlaceholder` becomes `AutomaticallyCreated(<derived name>)`
//! - an absent slot stays absent
//!
//! The same module owns the naming conventions for derived siblings and the
//! order-preserving merges used when building `dependsOn` and app settings.

use super::error::{CompileError, Result};
use super::types::{ResourceName, ResourceRef, Setting};
use indexmap::IndexMap;

/// Longest prefix kept from an owner name when deriving a storage account.
const STORAGE_PREFIX_LEN: usize = 16;

/// Legal storage account name length.
const STORAGE_NAME_MIN: usize = 3;
const STORAGE_NAME_MAX: usize = 24;

/// Resolve an optional sibling slot. Total and idempotent.
pub fn resolve(
    reference: Option<ResourceRef>,
    derive: impl FnOnce() -> ResourceName,
) -> Option<ResourceRef> {
    reference.map(|r| resolve_required(r, derive))
}

/// Resolve a mandatory sibling slot (e.g. a hosting plan).
pub fn resolve_required(
    reference: ResourceRef,
    derive: impl FnOnce() -> ResourceName,
) -> ResourceRef {
    match reference {
        ResourceRef::AutomaticPlaceholder => ResourceRef::AutomaticallyCreated(derive()),
        resolved => resolved,
    }
}

/// Like [`resolve`], for derivations that can fail sanitization.
pub fn try_resolve(
    reference: Option<ResourceRef>,
    derive: impl FnOnce() -> Result<ResourceName>,
) -> Result<Option<ResourceRef>> {
    match reference {
        Some(ResourceRef::AutomaticPlaceholder) => {
            Ok(Some(ResourceRef::AutomaticallyCreated(derive()?)))
        }
        other => Ok(other),
    }
}

// ============================================================================
// Naming conventions
// ============================================================================

/// `<owner>-plan`
pub fn plan_name(owner: &ResourceName) -> ResourceName {
    owner.map(|n| format!("{n}-plan"))
}

/// `<owner>-ai`
pub fn insights_name(owner: &ResourceName) -> ResourceName {
    owner.map(|n| format!("{n}-ai"))
}

/// Lower-case alphanumerics of `owner`, truncated, suffixed with `storage`.
pub fn storage_name_for(owner: &ResourceName) -> Result<ResourceName> {
    let prefix: String = alphanumeric_lowercase(owner.as_str())
        .take(STORAGE_PREFIX_LEN)
        .collect();
    if prefix.is_empty() {
        return Err(CompileError::InvalidIdentifier {
            name: owner.to_string(),
            reason: "no alphanumeric characters to derive a storage account name from".to_string(),
        });
    }
    Ok(ResourceName::new(format!("{prefix}storage")))
}

/// Sanitize a storage account name: lower-case alphanumerics, 3 to 24 long.
///
/// Idempotent: sanitizing an already sanitized name returns it unchanged.
pub fn sanitize_storage_name(name: &ResourceName) -> Result<ResourceName> {
    let sanitized: String = alphanumeric_lowercase(name.as_str())
        .take(STORAGE_NAME_MAX)
        .collect();
    if sanitized.len() < STORAGE_NAME_MIN {
        return Err(CompileError::InvalidIdentifier {
            name: name.to_string(),
            reason: format!(
                "storage account names need at least {STORAGE_NAME_MIN} alphanumeric characters"
            ),
        });
    }
    Ok(ResourceName::new(sanitized))
}

fn alphanumeric_lowercase(raw: &str) -> impl Iterator<Item = char> + '_ {
    raw.chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_lowercase())
}

/// Fail with `MissingRequiredField` when `name` is blank.
pub fn require_name(
    name: &ResourceName,
    resource: &'static str,
    field: &'static str,
) -> Result<()> {
    if name.is_blank() {
        return Err(CompileError::MissingRequiredField { resource, field });
    }
    Ok(())
}

// ============================================================================
// Merges
// ============================================================================

/// Build a `dependsOn` list: insertion order, absent entries skipped,
/// duplicates dropped.
pub fn merge_dependencies<'a>(
    candidates: impl IntoIterator<Item = Option<&'a ResourceName>>,
) -> Vec<ResourceName> {
    let mut merged: Vec<ResourceName> = Vec::new();
    for name in candidates.into_iter().flatten() {
        if !merged.contains(name) {
            merged.push(name.clone());
        }
    }
    merged
}

/// Merge user settings with mandatory provider settings.
///
/// User settings keep their order. A user key that a mandatory setting also
/// sets is dropped so the mandatory value is the single, last entry.
pub fn merge_settings(
    user: &IndexMap<String, Setting>,
    mandatory: Vec<(String, Setting)>,
) -> Vec<(String, Setting)> {
    let mut merged: Vec<(String, Setting)> = user
        .iter()
        .filter(|(key, _)| {
            let overridden = mandatory.iter().any(|(m, _)| m == *key);
            if overridden {
                tracing::warn!(setting = %key, "user setting replaced by a mandatory setting");
            }
            !overridden
        })
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();
    for (key, value) in mandatory {
        merged.retain(|(existing, _)| *existing != key);
        merged.push((key, value));
    }
    merged
}
