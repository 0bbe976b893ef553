//! Identifiers, references and the canonical resource graph.
//!
//! Everything downstream of a finalized builder is expressed in these types:
//! resource names, deployment locations, the tri-state sibling reference,
//! secure parameters, app setting values and the closed set of canonical
//! resources the template assembler knows how to emit.

use super::expression::ArmExpression;
use crate::resources::{functions, insights, search, sql, storage, web};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

// ============================================================================
// Identifiers
// ============================================================================

/// A provider-level resource name. Compared and hashed by value.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceName(String);

impl ResourceName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True when the name is empty or whitespace only.
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }

    /// Derive a sibling name, e.g. `web.map(|n| format!("{n}-plan"))`.
    pub fn map(&self, f: impl FnOnce(&str) -> String) -> Self {
        Self(f(&self.0))
    }
}

impl fmt::Display for ResourceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ResourceName {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for ResourceName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Deployment region, e.g. `westeurope`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Location(String);

impl Location {
    pub fn new(location: impl Into<String>) -> Self {
        Self(location.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn west_europe() -> Self {
        Self::new("westeurope")
    }

    pub fn north_europe() -> Self {
        Self::new("northeurope")
    }

    pub fn east_us() -> Self {
        Self::new("eastus")
    }

    pub fn west_us() -> Self {
        Self::new("westus")
    }
}

impl Default for Location {
    fn default() -> Self {
        Self::west_europe()
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Provider type token plus the api version it is emitted with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResourceType {
    pub path: &'static str,
    pub api_version: &'static str,
}

impl ResourceType {
    pub const fn new(path: &'static str, api_version: &'static str) -> Self {
        Self { path, api_version }
    }
}

pub const STORAGE_ACCOUNTS: ResourceType =
    ResourceType::new("Microsoft.Storage/storageAccounts", "2018-07-01");
pub const BLOB_CONTAINERS: ResourceType =
    ResourceType::new("blobServices/containers", "2018-03-01-preview");
pub const SERVER_FARMS: ResourceType = ResourceType::new("Microsoft.Web/serverfarms", "2018-02-01");
pub const SITES: ResourceType = ResourceType::new("Microsoft.Web/sites", "2016-08-01");
pub const SITE_EXTENSIONS: ResourceType = ResourceType::new("siteextensions", "2016-08-01");
pub const INSIGHTS_COMPONENTS: ResourceType =
    ResourceType::new("Microsoft.Insights/components", "2014-04-01");
pub const SEARCH_SERVICES: ResourceType =
    ResourceType::new("Microsoft.Search/searchServices", "2015-08-19");
pub const SQL_SERVERS: ResourceType =
    ResourceType::new("Microsoft.Sql/servers", "2014-04-01-preview");
pub const SQL_DATABASES: ResourceType = ResourceType::new("databases", "2015-01-01");
pub const SQL_FIREWALL_RULES: ResourceType =
    ResourceType::new("firewallrules", "2014-04-01-preview");
pub const SQL_ENCRYPTION: ResourceType =
    ResourceType::new("transparentDataEncryption", "2014-04-01-preview");

// ============================================================================
// Sibling references
// ============================================================================

/// A sibling resource the owner may depend on.
///
/// `AutomaticPlaceholder` only exists between a builder's `start` and its
/// finalize step. Absence of a sibling is modelled as `Option::None` on the
/// owning field, never as a fourth variant.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ResourceRef {
    AutomaticPlaceholder,
    AutomaticallyCreated(ResourceName),
    External(ResourceName),
}

impl ResourceRef {
    /// The sibling's name once resolved; `None` for a placeholder.
    pub fn name(&self) -> Option<&ResourceName> {
        match self {
            Self::AutomaticPlaceholder => None,
            Self::AutomaticallyCreated(name) | Self::External(name) => Some(name),
        }
    }

    /// The name of a sibling this deployment must emit.
    pub fn created_name(&self) -> Option<&ResourceName> {
        match self {
            Self::AutomaticallyCreated(name) => Some(name),
            Self::AutomaticPlaceholder | Self::External(_) => None,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self, Self::AutomaticPlaceholder)
    }
}

// ============================================================================
// Secure parameters and setting values
// ============================================================================

/// A template input whose value never appears in the document.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct SecureParameter(String);

impl SecureParameter {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

/// An app setting or connection string value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Setting {
    Literal(String),
    Expression(ArmExpression),
}

impl Setting {
    pub fn secure_parameters(&self) -> &[SecureParameter] {
        match self {
            Self::Literal(_) => &[],
            Self::Expression(expr) => expr.secure_parameters(),
        }
    }
}

impl From<&str> for Setting {
    fn from(s: &str) -> Self {
        Self::Literal(s.to_string())
    }
}

impl From<String> for Setting {
    fn from(s: String) -> Self {
        Self::Literal(s)
    }
}

impl From<ArmExpression> for Setting {
    fn from(expr: ArmExpression) -> Self {
        Self::Expression(expr)
    }
}

impl Serialize for Setting {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            // A literal starting with '[' would be read as an expression.
            Self::Literal(s) if s.starts_with('[') => serializer.serialize_str(&format!("[{s}")),
            Self::Literal(s) => serializer.serialize_str(s),
            Self::Expression(expr) => expr.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for Setting {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(Self::Literal)
    }
}

// ============================================================================
// Canonical resources
// ============================================================================

/// Every resource kind the assembler can emit.
#[derive(Debug, Clone, PartialEq)]
pub enum ArmResource {
    StorageAccount(storage::StorageAccount),
    ServerFarm(web::ServerFarm),
    WebApp(web::WebApp),
    FunctionApp(functions::FunctionApp),
    AppInsights(insights::AppInsights),
    Search(search::SearchService),
    SqlServer(sql::SqlServer),
}

impl ArmResource {
    pub fn name(&self) -> &ResourceName {
        match self {
            Self::StorageAccount(r) => &r.name,
            Self::ServerFarm(r) => &r.name,
            Self::WebApp(r) => &r.name,
            Self::FunctionApp(r) => &r.name,
            Self::AppInsights(r) => &r.name,
            Self::Search(r) => &r.name,
            Self::SqlServer(r) => &r.name,
        }
    }

    pub fn resource_type(&self) -> ResourceType {
        match self {
            Self::StorageAccount(_) => STORAGE_ACCOUNTS,
            Self::ServerFarm(_) => SERVER_FARMS,
            Self::WebApp(_) | Self::FunctionApp(_) => SITES,
            Self::AppInsights(_) => INSIGHTS_COMPONENTS,
            Self::Search(_) => SEARCH_SERVICES,
            Self::SqlServer(_) => SQL_SERVERS,
        }
    }

    /// Declared `dependsOn` edges.
    pub fn dependencies(&self) -> &[ResourceName] {
        match self {
            Self::WebApp(r) => &r.dependencies,
            Self::FunctionApp(r) => &r.dependencies,
            Self::StorageAccount(_)
            | Self::ServerFarm(_)
            | Self::AppInsights(_)
            | Self::Search(_)
            | Self::SqlServer(_) => &[],
        }
    }

    /// Secure parameters referenced anywhere in this resource's properties.
    pub fn secure_parameters(&self) -> Vec<&SecureParameter> {
        match self {
            Self::WebApp(r) => r
                .app_settings
                .iter()
                .chain(r.connection_strings.iter())
                .flat_map(|(_, value)| value.secure_parameters())
                .collect(),
            Self::FunctionApp(r) => r
                .app_settings
                .iter()
                .flat_map(|(_, value)| value.secure_parameters())
                .collect(),
            Self::SqlServer(r) => vec![&r.admin_password],
            Self::StorageAccount(_)
            | Self::ServerFarm(_)
            | Self::AppInsights(_)
            | Self::Search(_) => Vec::new(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::expression::{ArmExpression, Expr};

    #[test]
    fn test_types_resource_name_map() {
        let name = ResourceName::new("shop");
        assert_eq!(name.map(|n| format!("{n}-plan")).as_str(), "shop-plan");
        assert_eq!(name.as_str(), "shop");
    }

    #[test]
    fn test_types_resource_name_blank() {
        assert!(ResourceName::default().is_blank());
        assert!(ResourceName::new("  ").is_blank());
        assert!(!ResourceName::new("a").is_blank());
    }

    #[test]
    fn test_types_resource_ref_names() {
        assert_eq!(ResourceRef::AutomaticPlaceholder.name(), None);
        let created = ResourceRef::AutomaticallyCreated("a".into());
        let external = ResourceRef::External("b".into());
        assert_eq!(created.name().map(ResourceName::as_str), Some("a"));
        assert_eq!(external.name().map(ResourceName::as_str), Some("b"));
        assert!(created.created_name().is_some());
        assert!(external.created_name().is_none());
    }

    #[test]
    fn test_types_setting_literal_serializes_plain() {
        let json = serde_json::to_string(&Setting::from("hello")).unwrap();
        assert_eq!(json, "\"hello\"");
    }

    #[test]
    fn test_types_setting_literal_bracket_escaped() {
        let json = serde_json::to_string(&Setting::from("[not an expression]")).unwrap();
        assert_eq!(json, "\"[[not an expression]\"");
    }

    #[test]
    fn test_types_setting_expression_serializes_bracketed() {
        let expr = ArmExpression::from(Expr::literal("x"));
        let json = serde_json::to_string(&Setting::from(expr)).unwrap();
        assert_eq!(json, "\"['x']\"");
    }

    #[test]
    fn test_types_setting_deserializes_as_literal() {
        let s: Setting = serde_yaml_ng::from_str("\"[concat('a')]\"").unwrap();
        assert_eq!(s, Setting::Literal("[concat('a')]".to_string()));
    }

    #[test]
    fn test_types_location_default() {
        assert_eq!(Location::default().as_str(), "westeurope");
        assert_eq!(Location::east_us().to_string(), "eastus");
    }
}
