//! Template assembly.
//!
//! A [`Deployment`] gathers finalized builder configurations and named
//! outputs. Compiling it converts every configuration, drops duplicate
//! resources, and collects every secure parameter exactly once.

use super::builder::Finalized;
use super::codegen;
use super::expression::ArmExpression;
use super::types::{ArmResource, Location, ResourceName, SecureParameter};
use crate::resources::functions::FunctionsConfig;
use crate::resources::insights::AppInsightsConfig;
use crate::resources::search::SearchConfig;
use crate::resources::sql::SqlConfig;
use crate::resources::storage::StorageConfig;
use crate::resources::web::WebAppConfig;
use indexmap::IndexMap;
use serde_json::Value;

/// One finalized builder of any family.
#[derive(Debug, Clone, PartialEq)]
pub enum ResourceConfig {
    Storage(Finalized<StorageConfig>),
    WebApp(Finalized<WebAppConfig>),
    Functions(Finalized<FunctionsConfig>),
    AppInsights(Finalized<AppInsightsConfig>),
    Search(Finalized<SearchConfig>),
    Sql(Finalized<SqlConfig>),
}

impl ResourceConfig {
    pub fn name(&self) -> &ResourceName {
        match self {
            Self::Storage(c) => c.name(),
            Self::WebApp(c) => c.name(),
            Self::Functions(c) => c.name(),
            Self::AppInsights(c) => c.name(),
            Self::Search(c) => c.name(),
            Self::Sql(c) => c.name(),
        }
    }

    pub fn resources(&self, location: &Location) -> Vec<ArmResource> {
        match self {
            Self::Storage(c) => c.resources(location),
            Self::WebApp(c) => c.resources(location),
            Self::Functions(c) => c.resources(location),
            Self::AppInsights(c) => c.resources(location),
            Self::Search(c) => c.resources(location),
            Self::Sql(c) => c.resources(location),
        }
    }
}

macro_rules! impl_from_finalized {
    ($($config:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<Finalized<$config>> for ResourceConfig {
                fn from(config: Finalized<$config>) -> Self {
                    Self::$variant(config)
                }
            }
        )*
    };
}

impl_from_finalized! {
    StorageConfig => Storage,
    WebAppConfig => WebApp,
    FunctionsConfig => Functions,
    AppInsightsConfig => AppInsights,
    SearchConfig => Search,
    SqlConfig => Sql,
}

/// Everything that goes into one template.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Deployment {
    pub location: Location,
    pub resources: Vec<ResourceConfig>,
    pub outputs: IndexMap<String, ArmExpression>,
}

impl Deployment {
    pub fn new(location: Location) -> Self {
        Self {
            location,
            ..Self::default()
        }
    }

    pub fn add(mut self, config: impl Into<ResourceConfig>) -> Self {
        self.resources.push(config.into());
        self
    }

    /// Declare a named output. Re-declaring a name replaces its value.
    pub fn output(mut self, name: impl Into<String>, value: ArmExpression) -> Self {
        self.outputs.insert(name.into(), value);
        self
    }

    /// Convert every configuration, in declaration order.
    pub fn canonical_resources(&self) -> Vec<ArmResource> {
        self.resources
            .iter()
            .flat_map(|config| config.resources(&self.location))
            .collect()
    }

    pub fn compile(&self) -> Template {
        assemble(self.canonical_resources(), self.outputs.clone())
    }
}

/// The compiled output, ready for emission.
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    pub resources: Vec<ArmResource>,
    pub parameters: Vec<SecureParameter>,
    pub outputs: IndexMap<String, ArmExpression>,
}

impl Template {
    /// Outputter JSON for every resource, in template order.
    pub fn resource_values(&self) -> Vec<Value> {
        self.resources.iter().map(codegen::resource_json).collect()
    }
}

/// Assemble canonical resources and outputs into a template.
///
/// Resources sharing a (type, name) identity are emitted once, keeping the
/// first occurrence. Dependencies on names outside the template are passed
/// through unchecked.
pub fn assemble(resources: Vec<ArmResource>, outputs: IndexMap<String, ArmExpression>) -> Template {
    let mut unique: Vec<ArmResource> = Vec::with_capacity(resources.len());
    for resource in resources {
        let duplicate = unique.iter().find(|kept| {
            kept.resource_type() == resource.resource_type() && kept.name() == resource.name()
        });
        match duplicate {
            Some(kept) => {
                if *kept != resource {
                    tracing::warn!(
                        name = %resource.name(),
                        kind = resource.resource_type().path,
                        "conflicting definitions for one resource; keeping the first"
                    );
                }
            }
            None => unique.push(resource),
        }
    }

    let mut parameters: Vec<SecureParameter> = Vec::new();
    let referenced = unique
        .iter()
        .flat_map(|r| r.secure_parameters())
        .chain(outputs.values().flat_map(|o| o.secure_parameters()));
    for parameter in referenced {
        if !parameters.contains(parameter) {
            parameters.push(parameter.clone());
        }
    }

    tracing::info!(
        resources = unique.len(),
        parameters = parameters.len(),
        outputs = outputs.len(),
        "template assembled"
    );

    Template {
        resources: unique,
        parameters,
        outputs,
    }
}
