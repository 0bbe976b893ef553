//! Web apps and their hosting plans.
//!
//! A web app always has a hosting plan (auto-created as `<name>-plan` unless
//! named or linked) and, by default, an auto-created insights instance.
//! The runtime matrix maps an (application runtime, operating system) pair
//! onto the site-config fields the platform understands.

use super::insights::{self, AppInsights};
use crate::core::builder::{Finalized, ResourceBuilder};
use crate::core::error::Result;
use crate::core::expression::{ArmExpression, Expr};
use crate::core::resolver;
use crate::core::types::{
    ArmResource, Location, ResourceName, ResourceRef, Setting, SERVER_FARMS, SITES,
    SITE_EXTENSIONS,
};
use indexmap::IndexMap;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::fmt;
use std::str::FromStr;

/// Site extension installed alongside insights on Windows.
pub const INSIGHTS_EXTENSION: &str = "Microsoft.ApplicationInsights.AzureWebSites";

// ============================================================================
// Plan sku
// ============================================================================

/// Hosting plan sku.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub enum WebAppSku {
    #[default]
    Free,
    Shared,
    Basic(String),
    Standard(String),
    Premium(String),
    PremiumV2(String),
    Isolated(String),
    /// Consumption plan for function apps.
    Dynamic,
}

impl WebAppSku {
    pub fn name(&self) -> &str {
        match self {
            Self::Free => "F1",
            Self::Shared => "D1",
            Self::Dynamic => "Y1",
            Self::Basic(n)
            | Self::Standard(n)
            | Self::Premium(n)
            | Self::PremiumV2(n)
            | Self::Isolated(n) => n,
        }
    }

    pub fn tier(&self) -> &'static str {
        match self {
            Self::Free => "Free",
            Self::Shared => "Shared",
            Self::Basic(_) => "Basic",
            Self::Standard(_) => "Standard",
            Self::Premium(_) => "Premium",
            Self::PremiumV2(_) => "PremiumV2",
            Self::Isolated(_) => "Isolated",
            Self::Dynamic => "Dynamic",
        }
    }

    /// First letter of the sku name.
    pub fn family(&self) -> &str {
        let name = self.name();
        name.get(..1).unwrap_or(name)
    }
}

impl FromStr for WebAppSku {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        let tier = |c: u8| (b'1'..=b'3').contains(&c);
        let numbered = |prefix: u8| {
            let bytes = upper.as_bytes();
            bytes.len() == 2 && bytes[0] == prefix && tier(bytes[1])
        };
        match upper.as_str() {
            "F1" | "FREE" => Ok(Self::Free),
            "D1" | "SHARED" => Ok(Self::Shared),
            "Y1" | "DYNAMIC" => Ok(Self::Dynamic),
            "P1V2" | "P2V2" | "P3V2" => Ok(Self::PremiumV2(format!("{}v2", &upper[..2]))),
            _ if numbered(b'B') => Ok(Self::Basic(upper.clone())),
            _ if numbered(b'S') => Ok(Self::Standard(upper.clone())),
            _ if numbered(b'P') => Ok(Self::Premium(upper.clone())),
            _ if numbered(b'I') => Ok(Self::Isolated(upper.clone())),
            _ => Err(format!("unknown web app sku '{}'", s)),
        }
    }
}

impl fmt::Display for WebAppSku {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Host operating system.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum OperatingSystem {
    #[default]
    Windows,
    Linux,
}

// ============================================================================
// Runtime matrix
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum JavaVersion {
    Java8,
    Java11,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum JavaServer {
    JavaSe,
    Tomcat85,
    Tomcat90,
}

/// Application runtime stack.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Runtime {
    DotNetCore(String),
    AspNet(String),
    Node(String),
    Php(String),
    Python(String),
    Java {
        version: JavaVersion,
        server: JavaServer,
    },
    /// `image:tag`
    Docker(String),
}

/// Site-config fields selected by the runtime matrix.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlatformSettings {
    pub net_framework_version: Option<String>,
    pub linux_fx_version: Option<String>,
    pub node_version: Option<String>,
    pub php_version: Option<String>,
    pub python_version: Option<String>,
    pub java_version: Option<String>,
    pub java_container: Option<String>,
    pub java_container_version: Option<String>,
    pub current_stack: Option<String>,
}

impl PlatformSettings {
    fn stack(stack: &str) -> Self {
        Self {
            current_stack: Some(stack.to_string()),
            ..Self::default()
        }
    }

    fn linux(fx: String) -> Self {
        Self {
            linux_fx_version: Some(fx),
            ..Self::default()
        }
    }

    fn write_into(&self, site_config: &mut Map<String, Value>) {
        let fields = [
            ("netFrameworkVersion", &self.net_framework_version),
            ("linuxFxVersion", &self.linux_fx_version),
            ("nodeVersion", &self.node_version),
            ("phpVersion", &self.php_version),
            ("pythonVersion", &self.python_version),
            ("javaVersion", &self.java_version),
            ("javaContainer", &self.java_container),
            ("javaContainerVersion", &self.java_container_version),
        ];
        for (key, value) in fields {
            if let Some(value) = value {
                site_config.insert(key.to_string(), json!(value));
            }
        }
        if let Some(stack) = &self.current_stack {
            site_config.insert(
                "metadata".to_string(),
                json!([{ "name": "CURRENT_STACK", "value": stack }]),
            );
        }
    }
}

fn java_tokens(version: JavaVersion) -> (&'static str, &'static str) {
    match version {
        JavaVersion::Java8 => ("1.8", "jre8"),
        JavaVersion::Java11 => ("11", "java11"),
    }
}

/// Select platform fields for a runtime on an OS. Unsupported pairs yield
/// an empty [`PlatformSettings`].
pub fn platform_settings(runtime: &Runtime, os: OperatingSystem) -> PlatformSettings {
    use OperatingSystem::{Linux, Windows};
    match (runtime, os) {
        (Runtime::DotNetCore(_), Windows) => PlatformSettings::stack("dotnetcore"),
        (Runtime::DotNetCore(v), Linux) => PlatformSettings::linux(format!("DOTNETCORE|{v}")),
        (Runtime::AspNet(v), Windows) => PlatformSettings {
            net_framework_version: Some(format!("v{v}")),
            ..PlatformSettings::stack("dotnet")
        },
        (Runtime::AspNet(_), Linux) => PlatformSettings::default(),
        (Runtime::Node(v), Windows) => PlatformSettings {
            node_version: Some(v.clone()),
            ..PlatformSettings::stack("node")
        },
        (Runtime::Node(v), Linux) => PlatformSettings::linux(format!("NODE|{v}")),
        (Runtime::Php(v), Windows) => PlatformSettings {
            php_version: Some(v.clone()),
            ..PlatformSettings::stack("php")
        },
        (Runtime::Php(v), Linux) => PlatformSettings::linux(format!("PHP|{v}")),
        (Runtime::Python(v), Windows) => PlatformSettings {
            python_version: Some(v.clone()),
            ..PlatformSettings::stack("python")
        },
        (Runtime::Python(v), Linux) => PlatformSettings::linux(format!("PYTHON|{v}")),
        (Runtime::Java { version, server }, Windows) => {
            let (container, container_version) = match server {
                JavaServer::JavaSe => ("JAVA", "SE"),
                JavaServer::Tomcat85 => ("TOMCAT", "8.5"),
                JavaServer::Tomcat90 => ("TOMCAT", "9.0"),
            };
            PlatformSettings {
                java_version: Some(java_tokens(*version).0.to_string()),
                java_container: Some(container.to_string()),
                java_container_version: Some(container_version.to_string()),
                ..PlatformSettings::stack("java")
            }
        }
        (Runtime::Java { version, server }, Linux) => {
            let (major, suffix) = match version {
                JavaVersion::Java8 => ("8", java_tokens(*version).1),
                JavaVersion::Java11 => ("11", java_tokens(*version).1),
            };
            let fx = match server {
                JavaServer::JavaSe => format!("JAVA|{major}-{suffix}"),
                JavaServer::Tomcat85 => format!("TOMCAT|8.5-{suffix}"),
                JavaServer::Tomcat90 => format!("TOMCAT|9.0-{suffix}"),
            };
            PlatformSettings::linux(fx)
        }
        (Runtime::Docker(image), Linux) => PlatformSettings::linux(format!("DOCKER|{image}")),
        (Runtime::Docker(_), Windows) => PlatformSettings::default(),
    }
}

// ============================================================================
// Builder
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct WebAppConfig {
    pub name: ResourceName,
    pub service_plan: ResourceRef,
    pub sku: WebAppSku,
    pub workers: u32,
    pub operating_system: OperatingSystem,
    pub runtime: Option<Runtime>,
    pub app_insights: Option<ResourceRef>,
    pub settings: IndexMap<String, Setting>,
    pub connection_strings: IndexMap<String, Setting>,
    pub dependencies: Vec<ResourceName>,
    pub extensions: Vec<String>,
    pub always_on: bool,
    pub https_only: bool,
    pub client_affinity: bool,
    pub run_from_package: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum WebAppOp {
    Name(ResourceName),
    Sku(WebAppSku),
    NumberOfWorkers(u32),
    OperatingSystem(OperatingSystem),
    Runtime(Runtime),
    /// Auto-create the plan under this name.
    ServicePlanName(ResourceName),
    /// Use an existing plan; nothing is emitted for it.
    LinkToServicePlan(ResourceName),
    AppInsightsName(ResourceName),
    LinkToAppInsights(ResourceName),
    DisableAppInsights,
    Setting(String, Setting),
    ConnectionString(String, Setting),
    DependsOn(ResourceName),
    AddExtension(String),
    AlwaysOn(bool),
    HttpsOnly(bool),
    ClientAffinity(bool),
    RunFromPackage(bool),
}

impl WebAppOp {
    pub fn name(name: impl Into<ResourceName>) -> Self {
        Self::Name(name.into())
    }

    pub fn setting(key: impl Into<String>, value: impl Into<Setting>) -> Self {
        Self::Setting(key.into(), value.into())
    }

    pub fn connection_string(key: impl Into<String>, value: impl Into<Setting>) -> Self {
        Self::ConnectionString(key.into(), value.into())
    }

    /// Depend on another finalized resource by name.
    pub fn depends_on<B: ResourceBuilder>(other: &Finalized<B>) -> Self {
        Self::DependsOn(other.name().clone())
    }
}

impl ResourceBuilder for WebAppConfig {
    type Op = WebAppOp;
    const KIND: &'static str = "web app";

    fn start() -> Self {
        Self {
            name: ResourceName::default(),
            service_plan: ResourceRef::AutomaticPlaceholder,
            sku: WebAppSku::Free,
            workers: 1,
            operating_system: OperatingSystem::Windows,
            runtime: None,
            app_insights: Some(ResourceRef::AutomaticPlaceholder),
            settings: IndexMap::new(),
            connection_strings: IndexMap::new(),
            dependencies: Vec::new(),
            extensions: Vec::new(),
            always_on: false,
            https_only: false,
            client_affinity: true,
            run_from_package: false,
        }
    }

    fn apply(mut self, op: WebAppOp) -> Self {
        match op {
            WebAppOp::Name(name) => self.name = name,
            WebAppOp::Sku(sku) => self.sku = sku,
            WebAppOp::NumberOfWorkers(workers) => self.workers = workers,
            WebAppOp::OperatingSystem(os) => self.operating_system = os,
            WebAppOp::Runtime(runtime) => self.runtime = Some(runtime),
            WebAppOp::ServicePlanName(plan) => {
                self.service_plan = ResourceRef::AutomaticallyCreated(plan)
            }
            WebAppOp::LinkToServicePlan(plan) => self.service_plan = ResourceRef::External(plan),
            WebAppOp::AppInsightsName(name) => {
                self.app_insights = Some(ResourceRef::AutomaticallyCreated(name))
            }
            WebAppOp::LinkToAppInsights(name) => {
                self.app_insights = Some(ResourceRef::External(name))
            }
            WebAppOp::DisableAppInsights => self.app_insights = None,
            WebAppOp::Setting(key, value) => {
                self.settings.insert(key, value);
            }
            WebAppOp::ConnectionString(key, value) => {
                self.connection_strings.insert(key, value);
            }
            WebAppOp::DependsOn(name) => {
                if !self.dependencies.contains(&name) {
                    self.dependencies.push(name);
                }
            }
            WebAppOp::AddExtension(extension) => {
                if !self.extensions.contains(&extension) {
                    self.extensions.push(extension);
                }
            }
            WebAppOp::AlwaysOn(on) => self.always_on = on,
            WebAppOp::HttpsOnly(on) => self.https_only = on,
            WebAppOp::ClientAffinity(on) => self.client_affinity = on,
            WebAppOp::RunFromPackage(on) => self.run_from_package = on,
        }
        self
    }

    fn finalize(mut self) -> Result<Self> {
        resolver::require_name(&self.name, Self::KIND, "name")?;
        let name = self.name.clone();
        self.service_plan = resolver::resolve_required(self.service_plan, || {
            resolver::plan_name(&name)
        });
        self.app_insights = resolver::resolve(self.app_insights, || resolver::insights_name(&name));
        Ok(self)
    }

    fn name(&self) -> &ResourceName {
        &self.name
    }

    fn convert(config: &Finalized<Self>, location: &Location) -> Vec<ArmResource> {
        let plan = config
            .service_plan
            .name()
            .cloned()
            .unwrap_or_else(|| resolver::plan_name(&config.name));
        let insights = config
            .app_insights
            .as_ref()
            .map(|r| r.name().cloned().unwrap_or_else(|| resolver::insights_name(&config.name)));
        let windows = config.operating_system == OperatingSystem::Windows;

        let mut mandatory: Vec<(String, Setting)> = Vec::new();
        if config.run_from_package {
            mandatory.push(("WEBSITE_RUN_FROM_PACKAGE".to_string(), Setting::from("1")));
        }
        let mut extensions = config.extensions.clone();
        if let Some(ai) = &insights {
            mandatory.push((
                "APPINSIGHTS_INSTRUMENTATIONKEY".to_string(),
                insights::instrumentation_key(ai).into(),
            ));
            mandatory.push((
                "APPLICATIONINSIGHTS_CONNECTION_STRING".to_string(),
                insights::connection_string(ai).into(),
            ));
            if windows {
                mandatory.push((
                    "ApplicationInsightsAgent_EXTENSION_VERSION".to_string(),
                    Setting::from("~2"),
                ));
                if !extensions.iter().any(|e| e == INSIGHTS_EXTENSION) {
                    extensions.push(INSIGHTS_EXTENSION.to_string());
                }
            }
        }

        let dependencies = resolver::merge_dependencies(
            std::iter::once(Some(&plan))
                .chain(config.dependencies.iter().map(Some))
                .chain(std::iter::once(insights.as_ref())),
        );

        let mut resources = vec![ArmResource::WebApp(WebApp {
            name: config.name.clone(),
            location: location.clone(),
            service_plan: plan.clone(),
            operating_system: config.operating_system,
            platform: config
                .runtime
                .as_ref()
                .map(|r| platform_settings(r, config.operating_system))
                .unwrap_or_default(),
            app_settings: resolver::merge_settings(&config.settings, mandatory),
            connection_strings: config
                .connection_strings
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            always_on: config.always_on,
            https_only: config.https_only,
            client_affinity: config.client_affinity,
            extensions,
            dependencies,
        })];

        if let ResourceRef::AutomaticallyCreated(plan) = &config.service_plan {
            resources.push(ArmResource::ServerFarm(ServerFarm {
                name: plan.clone(),
                location: location.clone(),
                sku: config.sku.clone(),
                workers: config.workers,
                operating_system: config.operating_system,
            }));
        }
        if let Some(ResourceRef::AutomaticallyCreated(ai)) = &config.app_insights {
            resources.push(ArmResource::AppInsights(AppInsights {
                name: ai.clone(),
                location: location.clone(),
                linked_website: Some(config.name.clone()),
            }));
        }
        resources
    }
}

// ============================================================================
// Canonical resources
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct ServerFarm {
    pub name: ResourceName,
    pub location: Location,
    pub sku: WebAppSku,
    pub workers: u32,
    pub operating_system: OperatingSystem,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WebApp {
    pub name: ResourceName,
    pub location: Location,
    pub service_plan: ResourceName,
    pub operating_system: OperatingSystem,
    pub platform: PlatformSettings,
    pub app_settings: Vec<(String, Setting)>,
    pub connection_strings: Vec<(String, Setting)>,
    pub always_on: bool,
    pub https_only: bool,
    pub client_affinity: bool,
    pub extensions: Vec<String>,
    pub dependencies: Vec<ResourceName>,
}

/// `[resourceId('Microsoft.Web/serverfarms', '<plan>')]`
pub(crate) fn server_farm_id(plan: &ResourceName) -> ArmExpression {
    Expr::resource_id(SERVER_FARMS, plan).into()
}

pub(crate) fn settings_json(settings: &[(String, Setting)]) -> Value {
    Value::Array(
        settings
            .iter()
            .map(|(name, value)| json!({ "name": name, "value": value }))
            .collect(),
    )
}

pub fn server_farm_json(farm: &ServerFarm) -> Value {
    let linux = farm.operating_system == OperatingSystem::Linux;
    let kind = if linux { "linux" } else { "app" };
    json!({
        "type": SERVER_FARMS.path,
        "apiVersion": SERVER_FARMS.api_version,
        "name": farm.name,
        "location": farm.location,
        "sku": {
            "name": farm.sku.name(),
            "tier": farm.sku.tier(),
            "size": farm.sku.name(),
            "family": farm.sku.family(),
            "capacity": farm.workers,
        },
        "kind": kind,
        "properties": {
            "name": farm.name,
            "perSiteScaling": false,
            "reserved": linux,
        },
    })
}

pub fn web_app_json(app: &WebApp) -> Value {
    let mut site_config = Map::new();
    site_config.insert("alwaysOn".to_string(), json!(app.always_on));
    site_config.insert("appSettings".to_string(), settings_json(&app.app_settings));
    if !app.connection_strings.is_empty() {
        let strings: Vec<Value> = app
            .connection_strings
            .iter()
            .map(|(name, value)| {
                json!({ "name": name, "connectionString": value, "type": "SQLAzure" })
            })
            .collect();
        site_config.insert("connectionStrings".to_string(), Value::Array(strings));
    }
    app.platform.write_into(&mut site_config);

    let extensions: Vec<Value> = app
        .extensions
        .iter()
        .map(|extension| {
            json!({
                "type": SITE_EXTENSIONS.path,
                "apiVersion": SITE_EXTENSIONS.api_version,
                "name": extension,
                "dependsOn": [app.name],
                "properties": {},
            })
        })
        .collect();

    let kind = match app.operating_system {
        OperatingSystem::Windows => "app",
        OperatingSystem::Linux => "app,linux",
    };

    json!({
        "type": SITES.path,
        "apiVersion": SITES.api_version,
        "name": app.name,
        "location": app.location,
        "kind": kind,
        "dependsOn": app.dependencies,
        "properties": {
            "serverFarmId": server_farm_id(&app.service_plan),
            "httpsOnly": app.https_only,
            "clientAffinityEnabled": app.client_affinity,
            "siteConfig": site_config,
        },
        "resources": extensions,
    })
}
