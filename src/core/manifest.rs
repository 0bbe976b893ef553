//! YAML deployment manifests.
//!
//! A manifest declares resources by kind and lowers each entry into its
//! builder's operation sequence. Names in `depends_on`, settings and outputs
//! refer to other entries of the same manifest by their declared name.
//!
//! Lowering runs in two passes: standalone kinds (storage, insights, search,
//! sql) first, then web and function apps, which may reference them.

use super::builder::build;
use super::error::{CompileError, Result};
use super::expression::ArmExpression;
use super::template::{Deployment, ResourceConfig};
use super::types::{Location, ResourceName, Setting};
use crate::resources::functions::{FunctionsConfig, FunctionsOp, FunctionsRuntime};
use crate::resources::insights::{AppInsightsConfig, AppInsightsOp};
use crate::resources::search::{SearchConfig, SearchOp, SearchSku};
use crate::resources::sql::{DbSku, FirewallRule, SqlConfig, SqlDatabase, SqlOp};
use crate::resources::storage::{StorageAccessLevel, StorageConfig, StorageOp, StorageSku};
use crate::resources::web::{
    JavaServer, JavaVersion, OperatingSystem, Runtime, WebAppConfig, WebAppOp, WebAppSku,
};
use indexmap::IndexMap;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

// ============================================================================
// Manifest types
// ============================================================================

/// Top-level manifest document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    /// Deployment region; `westeurope` when omitted.
    #[serde(default)]
    pub location: Option<String>,

    #[serde(default)]
    pub resources: Vec<ResourceSpec>,

    /// Output name -> expression helper.
    #[serde(default)]
    pub outputs: IndexMap<String, ExpressionSpec>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResourceSpec {
    Storage(StorageSpec),
    WebApp(WebAppSpec),
    Functions(FunctionsSpec),
    AppInsights(AppInsightsSpec),
    Search(SearchSpec),
    Sql(SqlSpec),
}

impl ResourceSpec {
    /// The name this entry is declared under.
    pub fn declared_name(&self) -> &str {
        match self {
            Self::Storage(s) => &s.name,
            Self::WebApp(s) => &s.name,
            Self::Functions(s) => &s.name,
            Self::AppInsights(s) => &s.name,
            Self::Search(s) => &s.name,
            Self::Sql(s) => &s.name,
        }
    }

    fn is_site(&self) -> bool {
        matches!(self, Self::WebApp(_) | Self::Functions(_))
    }
}

/// Keyword form of a sibling slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum SiblingKeyword {
    Auto,
    Disabled,
}

/// A sibling slot: `auto`, `disabled`, `{ name: x }` or `{ external: x }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum SiblingSpec {
    Keyword(SiblingKeyword),
    /// Auto-created under an explicit name.
    Named { name: String },
    /// Already exists outside this deployment.
    External { external: String },
}

impl Default for SiblingSpec {
    fn default() -> Self {
        Self::Keyword(SiblingKeyword::Auto)
    }
}

/// Deferred expression helpers usable in settings and outputs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum ExpressionSpec {
    StorageKey { storage_key: String },
    InstrumentationKey { instrumentation_key: String },
    SearchAdminKey { search_admin_key: String },
    SqlConnectionString { sql_connection_string: SqlConnectionSpec },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct SqlConnectionSpec {
    pub server: String,
    pub database: String,
}

/// A setting value: a literal string or an expression helper.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum SettingSpec {
    Literal(String),
    Expression(ExpressionSpec),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct StorageSpec {
    pub name: String,
    #[serde(default)]
    pub sku: Option<StorageSku>,
    #[serde(default)]
    pub private_containers: Vec<String>,
    #[serde(default)]
    pub blob_containers: Vec<String>,
    #[serde(default)]
    pub public_containers: Vec<String>,
}

/// Application runtime, e.g. `{ node: "14" }` or `{ java: java11, server: tomcat90 }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum RuntimeSpec {
    DotNetCore { dotnet_core: String },
    AspNet { aspnet: String },
    Node { node: String },
    Php { php: String },
    Python { python: String },
    Java { java: JavaVersion, server: JavaServer },
    Docker { docker: String },
}

impl From<&RuntimeSpec> for Runtime {
    fn from(spec: &RuntimeSpec) -> Self {
        match spec {
            RuntimeSpec::DotNetCore { dotnet_core } => Runtime::DotNetCore(dotnet_core.clone()),
            RuntimeSpec::AspNet { aspnet } => Runtime::AspNet(aspnet.clone()),
            RuntimeSpec::Node { node } => Runtime::Node(node.clone()),
            RuntimeSpec::Php { php } => Runtime::Php(php.clone()),
            RuntimeSpec::Python { python } => Runtime::Python(python.clone()),
            RuntimeSpec::Java { java, server } => Runtime::Java {
                version: *java,
                server: *server,
            },
            RuntimeSpec::Docker { docker } => Runtime::Docker(docker.clone()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct WebAppSpec {
    pub name: String,
    /// Plan sku such as `F1`, `S1` or `P2v2`.
    #[serde(default)]
    pub sku: Option<String>,
    #[serde(default)]
    pub workers: Option<u32>,
    #[serde(default)]
    pub operating_system: Option<OperatingSystem>,
    #[serde(default)]
    pub runtime: Option<RuntimeSpec>,
    #[serde(default)]
    pub service_plan: SiblingSpec,
    #[serde(default)]
    pub app_insights: SiblingSpec,
    #[serde(default)]
    pub settings: IndexMap<String, SettingSpec>,
    #[serde(default)]
    pub connection_strings: IndexMap<String, SettingSpec>,
    #[serde(default)]
    pub depends_on: Vec<String>,
    #[serde(default)]
    pub extensions: Vec<String>,
    #[serde(default)]
    pub always_on: Option<bool>,
    #[serde(default)]
    pub https_only: Option<bool>,
    #[serde(default)]
    pub client_affinity: Option<bool>,
    #[serde(default)]
    pub run_from_package: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct FunctionsSpec {
    pub name: String,
    /// Plan sku; consumption (`Y1`) when omitted.
    #[serde(default)]
    pub sku: Option<String>,
    #[serde(default)]
    pub workers: Option<u32>,
    #[serde(default)]
    pub operating_system: Option<OperatingSystem>,
    #[serde(default)]
    pub runtime: Option<FunctionsRuntime>,
    #[serde(default)]
    pub extension_version: Option<String>,
    #[serde(default)]
    pub service_plan: SiblingSpec,
    #[serde(default)]
    pub storage: SiblingSpec,
    #[serde(default)]
    pub app_insights: SiblingSpec,
    #[serde(default)]
    pub settings: IndexMap<String, SettingSpec>,
    #[serde(default)]
    pub depends_on: Vec<String>,
    #[serde(default)]
    pub always_on: Option<bool>,
    #[serde(default)]
    pub https_only: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct AppInsightsSpec {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct SearchSpec {
    pub name: String,
    #[serde(default)]
    pub sku: Option<SearchSku>,
    #[serde(default)]
    pub replicas: Option<u32>,
    #[serde(default)]
    pub partitions: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct SqlSpec {
    pub name: String,
    pub admin_login: String,
    #[serde(default)]
    pub databases: Vec<DatabaseSpec>,
    #[serde(default)]
    pub firewall_rules: Vec<FirewallRuleSpec>,
    #[serde(default)]
    pub allow_azure_services: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct DatabaseSpec {
    pub name: String,
    #[serde(default)]
    pub sku: Option<DbSku>,
    #[serde(default)]
    pub collation: Option<String>,
    #[serde(default)]
    pub encrypted: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct FirewallRuleSpec {
    pub name: String,
    pub start: String,
    pub end: String,
}

// ============================================================================
// Parsing
// ============================================================================

/// Parse a manifest file from disk.
pub fn parse_manifest_file(path: &Path) -> Result<Manifest> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        CompileError::manifest(format!("failed to read {}: {}", path.display(), e))
    })?;
    parse_manifest(&content)
}

/// Parse a manifest from a YAML string.
pub fn parse_manifest(yaml: &str) -> Result<Manifest> {
    serde_yaml_ng::from_str(yaml)
        .map_err(|e| CompileError::manifest(format!("YAML parse error: {}", e)))
}

/// JSON Schema of the manifest format.
pub fn manifest_schema() -> schemars::schema::RootSchema {
    schemars::schema_for!(Manifest)
}

// ============================================================================
// Lowering
// ============================================================================

/// Lower a manifest into a deployment. `location` overrides the manifest's.
pub fn lower(manifest: &Manifest, location: Option<Location>) -> Result<Deployment> {
    let location = location
        .or_else(|| manifest.location.as_deref().map(Location::new))
        .unwrap_or_default();

    let mut registry: HashMap<&str, ResourceConfig> = HashMap::new();
    for spec in &manifest.resources {
        let declared = spec.declared_name();
        if manifest
            .resources
            .iter()
            .filter(|s| s.declared_name() == declared)
            .count()
            > 1
        {
            return Err(CompileError::manifest(format!(
                "resource '{}' is declared more than once",
                declared
            )));
        }
        let config: ResourceConfig = match spec {
            ResourceSpec::Storage(s) => lower_storage(s)?,
            ResourceSpec::AppInsights(s) => {
                build::<AppInsightsConfig>([AppInsightsOp::Name(s.name.as_str().into())])?.into()
            }
            ResourceSpec::Search(s) => lower_search(s)?,
            ResourceSpec::Sql(s) => lower_sql(s)?,
            ResourceSpec::WebApp(_) | ResourceSpec::Functions(_) => continue,
        };
        tracing::debug!(name = declared, "lowered manifest entry");
        registry.insert(declared, config);
    }

    // Final names by declared name, for dependsOn. Sites keep their name.
    let names: HashMap<&str, ResourceName> = manifest
        .resources
        .iter()
        .map(|spec| {
            let name = match registry.get(spec.declared_name()) {
                Some(config) => config.name().clone(),
                None => ResourceName::new(spec.declared_name()),
            };
            (spec.declared_name(), name)
        })
        .collect();

    let scope = Scope {
        registry: &registry,
        names: &names,
    };
    let mut sites: HashMap<&str, ResourceConfig> = HashMap::new();
    for spec in manifest.resources.iter().filter(|s| s.is_site()) {
        let config = match spec {
            ResourceSpec::WebApp(s) => scope.lower_web_app(s)?,
            ResourceSpec::Functions(s) => scope.lower_functions(s)?,
            _ => continue,
        };
        tracing::debug!(name = spec.declared_name(), "lowered manifest entry");
        sites.insert(spec.declared_name(), config);
    }

    let mut deployment = Deployment::new(location);
    for (name, spec) in &manifest.outputs {
        deployment = deployment.output(name.as_str(), scope.expression(spec)?);
    }
    for spec in &manifest.resources {
        let declared = spec.declared_name();
        if let Some(config) = sites.remove(declared).or_else(|| registry.remove(declared)) {
            deployment = deployment.add(config);
        }
    }
    Ok(deployment)
}

fn lower_storage(spec: &StorageSpec) -> Result<ResourceConfig> {
    let containers = [
        (&spec.private_containers, StorageAccessLevel::Private),
        (&spec.blob_containers, StorageAccessLevel::Blob),
        (&spec.public_containers, StorageAccessLevel::Container),
    ];
    let ops = std::iter::once(StorageOp::name(spec.name.as_str()))
        .chain(spec.sku.map(StorageOp::Sku))
        .chain(containers.into_iter().flat_map(|(names, access)| {
            names
                .iter()
                .map(move |c| StorageOp::AddContainer(c.clone(), access))
        }));
    Ok(build::<StorageConfig>(ops)?.into())
}

fn lower_search(spec: &SearchSpec) -> Result<ResourceConfig> {
    let ops = [
        Some(SearchOp::Name(spec.name.as_str().into())),
        spec.sku.map(SearchOp::Sku),
        spec.replicas.map(SearchOp::Replicas),
        spec.partitions.map(SearchOp::Partitions),
    ];
    Ok(build::<SearchConfig>(ops.into_iter().flatten())?.into())
}

fn lower_sql(spec: &SqlSpec) -> Result<ResourceConfig> {
    let mut ops = vec![
        SqlOp::ServerName(spec.name.as_str().into()),
        SqlOp::AdminLogin(spec.admin_login.clone()),
        SqlOp::AllowAzureServices(spec.allow_azure_services),
    ];
    ops.extend(spec.databases.iter().map(|db| {
        let mut database = SqlDatabase::new(db.name.as_str());
        database.sku = db.sku.unwrap_or_default();
        if let Some(collation) = &db.collation {
            database.collation.clone_from(collation);
        }
        database.encrypted = db.encrypted;
        SqlOp::AddDatabase(database)
    }));
    ops.extend(spec.firewall_rules.iter().map(|rule| {
        SqlOp::AddFirewallRule(FirewallRule {
            name: rule.name.clone(),
            start: rule.start.clone(),
            end: rule.end.clone(),
        })
    }));
    Ok(build::<SqlConfig>(ops)?.into())
}

fn parse_sku(owner: &str, sku: &str) -> Result<WebAppSku> {
    sku.parse()
        .map_err(|e: String| CompileError::manifest(format!("resource '{}': {}", owner, e)))
}

/// Lookups available while lowering web and function apps.
struct Scope<'a> {
    registry: &'a HashMap<&'a str, ResourceConfig>,
    names: &'a HashMap<&'a str, ResourceName>,
}

impl Scope<'_> {
    fn get(&self, name: &str) -> Result<&ResourceConfig> {
        self.registry
            .get(name)
            .ok_or_else(|| CompileError::manifest(format!("unknown resource '{}'", name)))
    }

    fn dependency(&self, owner: &str, name: &str) -> Result<ResourceName> {
        if name == owner {
            return Err(CompileError::manifest(format!(
                "resource '{}' depends on itself",
                owner
            )));
        }
        self.names.get(name).cloned().ok_or_else(|| {
            CompileError::manifest(format!(
                "resource '{}' depends on unknown resource '{}'",
                owner, name
            ))
        })
    }

    fn expression(&self, spec: &ExpressionSpec) -> Result<ArmExpression> {
        let wrong_kind = |name: &str, expected: &str| {
            CompileError::manifest(format!("resource '{}' is not a {}", name, expected))
        };
        match spec {
            ExpressionSpec::StorageKey { storage_key } => match self.get(storage_key)? {
                ResourceConfig::Storage(c) => Ok(c.key()),
                _ => Err(wrong_kind(storage_key, "storage account")),
            },
            ExpressionSpec::InstrumentationKey {
                instrumentation_key,
            } => match self.get(instrumentation_key)? {
                ResourceConfig::AppInsights(c) => Ok(c.instrumentation_key()),
                _ => Err(wrong_kind(instrumentation_key, "app insights instance")),
            },
            ExpressionSpec::SearchAdminKey { search_admin_key } => {
                match self.get(search_admin_key)? {
                    ResourceConfig::Search(c) => Ok(c.admin_key()),
                    _ => Err(wrong_kind(search_admin_key, "search service")),
                }
            }
            ExpressionSpec::SqlConnectionString {
                sql_connection_string: SqlConnectionSpec { server, database },
            } => match self.get(server)? {
                ResourceConfig::Sql(c) => {
                    let db = c
                        .databases
                        .iter()
                        .find(|db| db.name.as_str() == database)
                        .ok_or_else(|| {
                            CompileError::manifest(format!(
                                "sql server '{}' has no database '{}'",
                                server, database
                            ))
                        })?;
                    Ok(c.connection_string(&db.name))
                }
                _ => Err(wrong_kind(server, "sql server")),
            },
        }
    }

    fn setting(&self, spec: &SettingSpec) -> Result<Setting> {
        match spec {
            SettingSpec::Literal(value) => Ok(Setting::from(value.as_str())),
            SettingSpec::Expression(expr) => self.expression(expr).map(Setting::from),
        }
    }

    fn lower_web_app(&self, spec: &WebAppSpec) -> Result<ResourceConfig> {
        let owner = spec.name.as_str();
        let mut ops = vec![WebAppOp::name(owner)];
        if let Some(sku) = &spec.sku {
            ops.push(WebAppOp::Sku(parse_sku(owner, sku)?));
        }
        ops.extend(spec.workers.map(WebAppOp::NumberOfWorkers));
        ops.extend(spec.operating_system.map(WebAppOp::OperatingSystem));
        ops.extend(spec.runtime.as_ref().map(|r| WebAppOp::Runtime(r.into())));
        match &spec.service_plan {
            SiblingSpec::Keyword(SiblingKeyword::Auto) => {}
            SiblingSpec::Keyword(SiblingKeyword::Disabled) => {
                return Err(plan_required(owner));
            }
            SiblingSpec::Named { name } => {
                ops.push(WebAppOp::ServicePlanName(name.as_str().into()))
            }
            SiblingSpec::External { external } => {
                ops.push(WebAppOp::LinkToServicePlan(external.as_str().into()))
            }
        }
        match &spec.app_insights {
            SiblingSpec::Keyword(SiblingKeyword::Auto) => {}
            SiblingSpec::Keyword(SiblingKeyword::Disabled) => {
                ops.push(WebAppOp::DisableAppInsights)
            }
            SiblingSpec::Named { name } => {
                ops.push(WebAppOp::AppInsightsName(name.as_str().into()))
            }
            SiblingSpec::External { external } => {
                ops.push(WebAppOp::LinkToAppInsights(external.as_str().into()))
            }
        }
        for (key, value) in &spec.settings {
            ops.push(WebAppOp::Setting(key.clone(), self.setting(value)?));
        }
        for (key, value) in &spec.connection_strings {
            ops.push(WebAppOp::ConnectionString(key.clone(), self.setting(value)?));
        }
        for dep in &spec.depends_on {
            ops.push(WebAppOp::DependsOn(self.dependency(owner, dep)?));
        }
        ops.extend(spec.extensions.iter().cloned().map(WebAppOp::AddExtension));
        ops.extend(spec.always_on.map(WebAppOp::AlwaysOn));
        ops.extend(spec.https_only.map(WebAppOp::HttpsOnly));
        ops.extend(spec.client_affinity.map(WebAppOp::ClientAffinity));
        ops.extend(spec.run_from_package.map(WebAppOp::RunFromPackage));
        Ok(build::<WebAppConfig>(ops)?.into())
    }

    fn lower_functions(&self, spec: &FunctionsSpec) -> Result<ResourceConfig> {
        let owner = spec.name.as_str();
        let mut ops = vec![FunctionsOp::name(owner)];
        if let Some(sku) = &spec.sku {
            ops.push(FunctionsOp::Sku(parse_sku(owner, sku)?));
        }
        ops.extend(spec.workers.map(FunctionsOp::NumberOfWorkers));
        ops.extend(spec.operating_system.map(FunctionsOp::OperatingSystem));
        ops.extend(spec.runtime.map(FunctionsOp::Runtime));
        ops.extend(spec.extension_version.clone().map(FunctionsOp::ExtensionVersion));
        match &spec.service_plan {
            SiblingSpec::Keyword(SiblingKeyword::Auto) => {}
            SiblingSpec::Keyword(SiblingKeyword::Disabled) => {
                return Err(plan_required(owner));
            }
            SiblingSpec::Named { name } => {
                ops.push(FunctionsOp::ServicePlanName(name.as_str().into()))
            }
            SiblingSpec::External { external } => {
                ops.push(FunctionsOp::LinkToServicePlan(external.as_str().into()))
            }
        }
        match &spec.storage {
            SiblingSpec::Keyword(SiblingKeyword::Auto) => {}
            SiblingSpec::Keyword(SiblingKeyword::Disabled) => ops.push(FunctionsOp::DisableStorage),
            SiblingSpec::Named { name } => {
                ops.push(FunctionsOp::StorageAccountName(name.as_str().into()))
            }
            SiblingSpec::External { external } => {
                // A storage account declared in this manifest links by its final name.
                let name = self
                    .names
                    .get(external.as_str())
                    .cloned()
                    .unwrap_or_else(|| ResourceName::new(external.as_str()));
                ops.push(FunctionsOp::LinkToStorageAccount(name))
            }
        }
        match &spec.app_insights {
            SiblingSpec::Keyword(SiblingKeyword::Auto) => {}
            SiblingSpec::Keyword(SiblingKeyword::Disabled) => {
                ops.push(FunctionsOp::DisableAppInsights)
            }
            SiblingSpec::Named { name } => {
                ops.push(FunctionsOp::AppInsightsName(name.as_str().into()))
            }
            SiblingSpec::External { external } => {
                ops.push(FunctionsOp::LinkToAppInsights(external.as_str().into()))
            }
        }
        for (key, value) in &spec.settings {
            ops.push(FunctionsOp::Setting(key.clone(), self.setting(value)?));
        }
        for dep in &spec.depends_on {
            ops.push(FunctionsOp::DependsOn(self.dependency(owner, dep)?));
        }
        ops.extend(spec.always_on.map(FunctionsOp::AlwaysOn));
        ops.extend(spec.https_only.map(FunctionsOp::HttpsOnly));
        Ok(build::<FunctionsConfig>(ops)?.into())
    }
}

fn plan_required(owner: &str) -> CompileError {
    CompileError::manifest(format!(
        "resource '{}': a service plan cannot be disabled",
        owner
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::ArmResource;

    const SCENARIO: &str = r#"
location: westeurope
resources:
  - type: storage
    name: mystorage
    sku: premium_lrs
  - type: web_app
    name: mysuperwebapp
    sku: S1
    app_insights: disabled
    settings:
      storage_key: { storage_key: mystorage }
    depends_on: [mystorage]
outputs:
  storageKey: { storage_key: mystorage }
"#;

    #[test]
    fn test_manifest_parse_scenario() {
        let manifest = parse_manifest(SCENARIO).unwrap();
        assert_eq!(manifest.location.as_deref(), Some("westeurope"));
        assert_eq!(manifest.resources.len(), 2);
        let ResourceSpec::WebApp(web) = &manifest.resources[1] else {
            panic!("expected web app");
        };
        assert_eq!(web.app_insights, SiblingSpec::Keyword(SiblingKeyword::Disabled));
        assert_eq!(
            web.settings["storage_key"],
            SettingSpec::Expression(ExpressionSpec::StorageKey {
                storage_key: "mystorage".to_string()
            })
        );
    }

    #[test]
    fn test_manifest_lower_scenario() {
        let manifest = parse_manifest(SCENARIO).unwrap();
        let template = lower(&manifest, None).unwrap().compile();
        let names: Vec<&str> = template.resources.iter().map(|r| r.name().as_str()).collect();
        assert_eq!(names, ["mystorage", "mysuperwebapp", "mysuperwebapp-plan"]);
        let ArmResource::WebApp(app) = &template.resources[1] else {
            panic!("expected web app");
        };
        assert_eq!(
            app.dependencies,
            vec![ResourceName::new("mysuperwebapp-plan"), ResourceName::new("mystorage")]
        );
        assert!(app.app_settings.iter().any(|(k, _)| k == "storage_key"));
        assert!(app.extensions.is_empty());
        assert_eq!(template.outputs.len(), 1);
    }

    #[test]
    fn test_manifest_sibling_forms() {
        let yaml = r#"
resources:
  - type: functions
    name: fn
    service_plan: { external: shared-plan }
    storage: { name: fnstate }
    app_insights: disabled
"#;
        let manifest = parse_manifest(yaml).unwrap();
        let ResourceSpec::Functions(spec) = &manifest.resources[0] else {
            panic!("expected functions");
        };
        assert_eq!(
            spec.service_plan,
            SiblingSpec::External {
                external: "shared-plan".to_string()
            }
        );
        let template = lower(&manifest, None).unwrap().compile();
        let names: Vec<&str> = template.resources.iter().map(|r| r.name().as_str()).collect();
        assert_eq!(names, ["fn", "fnstate"]);
    }

    #[test]
    fn test_manifest_location_override() {
        let manifest = parse_manifest(SCENARIO).unwrap();
        let deployment = lower(&manifest, Some(Location::east_us())).unwrap();
        assert_eq!(deployment.location, Location::east_us());
        let deployment = lower(&parse_manifest("resources: []").unwrap(), None).unwrap();
        assert_eq!(deployment.location, Location::west_europe());
    }

    #[test]
    fn test_manifest_unknown_dependency() {
        let yaml = r#"
resources:
  - type: web_app
    name: shop
    depends_on: [ghost]
"#;
        let err = lower(&parse_manifest(yaml).unwrap(), None).unwrap_err();
        assert!(err.to_string().contains("unknown resource 'ghost'"));
    }

    #[test]
    fn test_manifest_self_dependency() {
        let yaml = r#"
resources:
  - type: web_app
    name: shop
    depends_on: [shop]
"#;
        let err = lower(&parse_manifest(yaml).unwrap(), None).unwrap_err();
        assert!(err.to_string().contains("depends on itself"));
    }

    #[test]
    fn test_manifest_duplicate_names() {
        let yaml = r#"
resources:
  - type: storage
    name: data
  - type: search
    name: data
"#;
        let err = lower(&parse_manifest(yaml).unwrap(), None).unwrap_err();
        assert!(err.to_string().contains("declared more than once"));
    }

    #[test]
    fn test_manifest_wrong_kind_expression() {
        let yaml = r#"
resources:
  - type: search
    name: find
outputs:
  key: { storage_key: find }
"#;
        let err = lower(&parse_manifest(yaml).unwrap(), None).unwrap_err();
        assert!(err.to_string().contains("is not a storage account"));
    }

    #[test]
    fn test_manifest_sql_connection_output() {
        let yaml = r#"
resources:
  - type: sql
    name: orders-srv
    admin_login: admin
    databases:
      - name: orders
        sku: s0
outputs:
  conn: { sql_connection_string: { server: orders-srv, database: orders } }
"#;
        let template = lower(&parse_manifest(yaml).unwrap(), None).unwrap().compile();
        assert_eq!(template.parameters.len(), 1);
        assert_eq!(template.parameters[0].name(), "password-for-orders-srv");
    }

    #[test]
    fn test_manifest_sql_unknown_database() {
        let yaml = r#"
resources:
  - type: sql
    name: srv
    admin_login: admin
outputs:
  conn: { sql_connection_string: { server: srv, database: nope } }
"#;
        let err = lower(&parse_manifest(yaml).unwrap(), None).unwrap_err();
        assert!(err.to_string().contains("has no database 'nope'"));
    }

    #[test]
    fn test_manifest_bad_sku() {
        let yaml = r#"
resources:
  - type: web_app
    name: shop
    sku: Z9
"#;
        let err = lower(&parse_manifest(yaml).unwrap(), None).unwrap_err();
        assert!(err.to_string().contains("unknown web app sku"));
    }

    #[test]
    fn test_manifest_disabled_plan_rejected() {
        let yaml = r#"
resources:
  - type: web_app
    name: shop
    service_plan: disabled
"#;
        assert!(lower(&parse_manifest(yaml).unwrap(), None).is_err());
    }

    #[test]
    fn test_manifest_runtime_forms() {
        let yaml = r#"
resources:
  - type: web_app
    name: api
    runtime: { java: java11, server: tomcat90 }
  - type: web_app
    name: ui
    operating_system: linux
    runtime: { node: "14" }
"#;
        let manifest = parse_manifest(yaml).unwrap();
        let ResourceSpec::WebApp(api) = &manifest.resources[0] else {
            panic!("expected web app");
        };
        assert_eq!(
            Runtime::from(api.runtime.as_ref().unwrap()),
            Runtime::Java {
                version: JavaVersion::Java11,
                server: JavaServer::Tomcat90
            }
        );
        assert!(lower(&manifest, None).is_ok());
    }

    #[test]
    fn test_manifest_unknown_field_rejected() {
        let yaml = r#"
resources:
  - type: storage
    name: data
    colour: blue
"#;
        assert!(parse_manifest(yaml).is_err());
    }

    #[test]
    fn test_manifest_parse_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deploy.yaml");
        std::fs::write(&path, SCENARIO).unwrap();
        assert_eq!(parse_manifest_file(&path).unwrap().resources.len(), 2);
        assert!(parse_manifest_file(&dir.path().join("missing.yaml")).is_err());
    }

    #[test]
    fn test_manifest_schema_names_resource_kinds() {
        let schema = serde_json::to_string(&manifest_schema()).unwrap();
        assert!(schema.contains("web_app"));
        assert!(schema.contains("sql_connection_string"));
    }
}
