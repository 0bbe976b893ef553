//! Serverless function apps.
//!
//! On top of the web-app shape a function app needs a storage account for
//! its runtime state. Storage and insights follow the same tri-state policy:
//! created by default, linked when named externally, absent when disabled.

use super::insights::{self, AppInsights};
use super::storage::{self, StorageAccount, StorageSku};
use super::web::{self, OperatingSystem, ServerFarm, WebAppSku};
use crate::core::builder::{Finalized, ResourceBuilder};
use crate::core::error::Result;
use crate::core::resolver;
use crate::core::types::{ArmResource, Location, ResourceName, ResourceRef, Setting, SITES};
use indexmap::IndexMap;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;

/// Language worker hosted by the functions runtime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum FunctionsRuntime {
    #[default]
    DotNet,
    Node,
    Java,
    Python,
}

impl fmt::Display for FunctionsRuntime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DotNet => write!(f, "dotnet"),
            Self::Node => write!(f, "node"),
            Self::Java => write!(f, "java"),
            Self::Python => write!(f, "python"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionsConfig {
    pub name: ResourceName,
    pub service_plan: ResourceRef,
    pub sku: WebAppSku,
    pub workers: u32,
    pub operating_system: OperatingSystem,
    pub runtime: FunctionsRuntime,
    pub extension_version: String,
    pub storage: Option<ResourceRef>,
    pub app_insights: Option<ResourceRef>,
    pub settings: IndexMap<String, Setting>,
    pub dependencies: Vec<ResourceName>,
    pub always_on: bool,
    pub https_only: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FunctionsOp {
    Name(ResourceName),
    Sku(WebAppSku),
    NumberOfWorkers(u32),
    OperatingSystem(OperatingSystem),
    Runtime(FunctionsRuntime),
    ExtensionVersion(String),
    ServicePlanName(ResourceName),
    LinkToServicePlan(ResourceName),
    StorageAccountName(ResourceName),
    LinkToStorageAccount(ResourceName),
    DisableStorage,
    AppInsightsName(ResourceName),
    LinkToAppInsights(ResourceName),
    DisableAppInsights,
    Setting(String, Setting),
    DependsOn(ResourceName),
    AlwaysOn(bool),
    HttpsOnly(bool),
}

impl FunctionsOp {
    pub fn name(name: impl Into<ResourceName>) -> Self {
        Self::Name(name.into())
    }

    pub fn setting(key: impl Into<String>, value: impl Into<Setting>) -> Self {
        Self::Setting(key.into(), value.into())
    }

    pub fn depends_on<B: ResourceBuilder>(other: &Finalized<B>) -> Self {
        Self::DependsOn(other.name().clone())
    }
}

impl ResourceBuilder for FunctionsConfig {
    type Op = FunctionsOp;
    const KIND: &'static str = "function app";

    fn start() -> Self {
        Self {
            name: ResourceName::default(),
            service_plan: ResourceRef::AutomaticPlaceholder,
            sku: WebAppSku::Dynamic,
            workers: 1,
            operating_system: OperatingSystem::Windows,
            runtime: FunctionsRuntime::DotNet,
            extension_version: "~3".to_string(),
            storage: Some(ResourceRef::AutomaticPlaceholder),
            app_insights: Some(ResourceRef::AutomaticPlaceholder),
            settings: IndexMap::new(),
            dependencies: Vec::new(),
            always_on: false,
            https_only: false,
        }
    }

    fn apply(mut self, op: FunctionsOp) -> Self {
        match op {
            FunctionsOp::Name(name) => self.name = name,
            FunctionsOp::Sku(sku) => self.sku = sku,
            FunctionsOp::NumberOfWorkers(workers) => self.workers = workers,
            FunctionsOp::OperatingSystem(os) => self.operating_system = os,
            FunctionsOp::Runtime(runtime) => self.runtime = runtime,
            FunctionsOp::ExtensionVersion(version) => self.extension_version = version,
            FunctionsOp::ServicePlanName(plan) => {
                self.service_plan = ResourceRef::AutomaticallyCreated(plan)
            }
            FunctionsOp::LinkToServicePlan(plan) => {
                self.service_plan = ResourceRef::External(plan)
            }
            FunctionsOp::StorageAccountName(name) => {
                self.storage = Some(ResourceRef::AutomaticallyCreated(name))
            }
            FunctionsOp::LinkToStorageAccount(name) => {
                self.storage = Some(ResourceRef::External(name))
            }
            FunctionsOp::DisableStorage => self.storage = None,
            FunctionsOp::AppInsightsName(name) => {
                self.app_insights = Some(ResourceRef::AutomaticallyCreated(name))
            }
            FunctionsOp::LinkToAppInsights(name) => {
                self.app_insights = Some(ResourceRef::External(name))
            }
            FunctionsOp::DisableAppInsights => self.app_insights = None,
            FunctionsOp::Setting(key, value) => {
                self.settings.insert(key, value);
            }
            FunctionsOp::DependsOn(name) => {
                if !self.dependencies.contains(&name) {
                    self.dependencies.push(name);
                }
            }
            FunctionsOp::AlwaysOn(on) => self.always_on = on,
            FunctionsOp::HttpsOnly(on) => self.https_only = on,
        }
        self
    }

    fn finalize(mut self) -> Result<Self> {
        resolver::require_name(&self.name, Self::KIND, "name")?;
        let name = self.name.clone();
        self.service_plan =
            resolver::resolve_required(self.service_plan, || resolver::plan_name(&name));
        self.storage = resolver::try_resolve(self.storage, || resolver::storage_name_for(&name))?;
        // An explicitly named storage account must still be a legal name.
        if let Some(ResourceRef::AutomaticallyCreated(storage)) = &self.storage {
            let sanitized = resolver::sanitize_storage_name(storage)?;
            self.storage = Some(ResourceRef::AutomaticallyCreated(sanitized));
        }
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
        let storage_name = config.storage.as_ref().and_then(|r| r.name().cloned());
        let insights_name = config.app_insights.as_ref().and_then(|r| r.name().cloned());

        let mut mandatory: Vec<(String, Setting)> = vec![
            (
                "FUNCTIONS_WORKER_RUNTIME".to_string(),
                Setting::from(config.runtime.to_string()),
            ),
            (
                "FUNCTIONS_EXTENSION_VERSION".to_string(),
                Setting::from(config.extension_version.clone()),
            ),
        ];
        if let Some(storage) = &storage_name {
            let key = storage::connection_string(storage);
            mandatory.push(("AzureWebJobsStorage".to_string(), key.clone().into()));
            mandatory.push(("AzureWebJobsDashboard".to_string(), key.clone().into()));
            if config.operating_system == OperatingSystem::Windows
                && config.sku == WebAppSku::Dynamic
            {
                mandatory.push((
                    "WEBSITE_CONTENTAZUREFILECONNECTIONSTRING".to_string(),
                    key.into(),
                ));
                mandatory.push((
                    "WEBSITE_CONTENTSHARE".to_string(),
                    Setting::from(config.name.as_str().to_lowercase()),
                ));
            }
        }
        if let Some(ai) = &insights_name {
            mandatory.push((
                "APPINSIGHTS_INSTRUMENTATIONKEY".to_string(),
                insights::instrumentation_key(ai).into(),
            ));
        }

        let dependencies = resolver::merge_dependencies(
            std::iter::once(Some(&plan))
                .chain(config.dependencies.iter().map(Some))
                .chain([insights_name.as_ref(), storage_name.as_ref()]),
        );

        let mut resources = vec![ArmResource::FunctionApp(FunctionApp {
            name: config.name.clone(),
            location: location.clone(),
            service_plan: plan,
            operating_system: config.operating_system,
            app_settings: resolver::merge_settings(&config.settings, mandatory),
            always_on: config.always_on,
            https_only: config.https_only,
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
        if let Some(ResourceRef::AutomaticallyCreated(storage)) = &config.storage {
            resources.push(ArmResource::StorageAccount(StorageAccount {
                name: storage.clone(),
                location: location.clone(),
                sku: StorageSku::StandardLrs,
                containers: Vec::new(),
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

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionApp {
    pub name: ResourceName,
    pub location: Location,
    pub service_plan: ResourceName,
    pub operating_system: OperatingSystem,
    pub app_settings: Vec<(String, Setting)>,
    pub always_on: bool,
    pub https_only: bool,
    pub dependencies: Vec<ResourceName>,
}

pub fn arm_json(app: &FunctionApp) -> Value {
    let kind = match app.operating_system {
        OperatingSystem::Windows => "functionapp",
        OperatingSystem::Linux => "functionapp,linux",
    };
    json!({
        "type": SITES.path,
        "apiVersion": SITES.api_version,
        "name": app.name,
        "location": app.location,
        "kind": kind,
        "dependsOn": app.dependencies,
        "properties": {
            "serverFarmId": web::server_farm_id(&app.service_plan),
            "httpsOnly": app.https_only,
            "siteConfig": {
                "alwaysOn": app.always_on,
                "appSettings": web::settings_json(&app.app_settings),
            },
        },
    })
}
