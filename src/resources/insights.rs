//! Application Insights components.

use crate::core::builder::{Finalized, ResourceBuilder};
use crate::core::error::Result;
use crate::core::expression::{ArmExpression, Expr};
use crate::core::resolver;
use crate::core::types::{
    ArmResource, Location, ResourceName, ResourceType, INSIGHTS_COMPONENTS, SITES,
};
use serde_json::{json, Map, Value};

/// Standalone insights instance, not tied to a web site.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppInsightsConfig {
    pub name: ResourceName,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AppInsightsOp {
    Name(ResourceName),
}

impl AppInsightsConfig {
    pub fn instrumentation_key(&self) -> ArmExpression {
        instrumentation_key(&self.name)
    }
}

impl ResourceBuilder for AppInsightsConfig {
    type Op = AppInsightsOp;
    const KIND: &'static str = "app insights";

    fn start() -> Self {
        Self::default()
    }

    fn apply(self, op: AppInsightsOp) -> Self {
        match op {
            AppInsightsOp::Name(name) => Self { name },
        }
    }

    fn finalize(self) -> Result<Self> {
        resolver::require_name(&self.name, Self::KIND, "name")?;
        Ok(self)
    }

    fn name(&self) -> &ResourceName {
        &self.name
    }

    fn convert(config: &Finalized<Self>, location: &Location) -> Vec<ArmResource> {
        vec![ArmResource::AppInsights(AppInsights {
            name: config.name.clone(),
            location: location.clone(),
            linked_website: None,
        })]
    }
}

/// `reference(...).InstrumentationKey`
pub fn instrumentation_key(name: &ResourceName) -> ArmExpression {
    Expr::reference(INSIGHTS_COMPONENTS, name, "InstrumentationKey").into()
}

/// Components only expose `ConnectionString` from this api version on.
const CONNECTION_STRING_API: ResourceType =
    ResourceType::new(INSIGHTS_COMPONENTS.path, "2020-02-02");

/// `reference(...).ConnectionString`
pub fn connection_string(name: &ResourceName) -> ArmExpression {
    Expr::reference(CONNECTION_STRING_API, name, "ConnectionString").into()
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppInsights {
    pub name: ResourceName,
    pub location: Location,
    pub linked_website: Option<ResourceName>,
}

pub fn arm_json(insights: &AppInsights) -> Value {
    let mut tags = Map::new();
    let mut properties = Map::new();
    properties.insert("name".to_string(), json!(insights.name));
    properties.insert("Application_Type".to_string(), json!("web"));
    if let Some(site) = &insights.linked_website {
        let hidden_link: ArmExpression = Expr::concat([
            Expr::literal("hidden-link:"),
            Expr::ResourceGroupId,
            Expr::literal(format!("/providers/{}/", SITES.path)),
            Expr::literal(site.as_str()),
        ])
        .into();
        tags.insert(hidden_link.value().to_string(), json!("Resource"));
        properties.insert("ApplicationId".to_string(), json!(site));
    }
    tags.insert("displayName".to_string(), json!("AppInsightsComponent"));

    json!({
        "type": INSIGHTS_COMPONENTS.path,
        "apiVersion": INSIGHTS_COMPONENTS.api_version,
        "name": insights.name,
        "location": insights.location,
        "kind": "web",
        "tags": tags,
        "properties": properties,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::builder::build;

    #[test]
    fn test_insights_finalize_idempotent() {
        let once = build::<AppInsightsConfig>([AppInsightsOp::Name("telemetry".into())]).unwrap();
        let twice = Finalized::new(once.clone().into_inner()).unwrap();
        assert_eq!(once, twice);
        assert_eq!(
            once.resources(&Location::east_us()),
            twice.resources(&Location::east_us())
        );
    }

    #[test]
    fn test_insights_standalone() {
        let config = build::<AppInsightsConfig>([AppInsightsOp::Name("telemetry".into())]).unwrap();
        let resources = config.resources(&Location::east_us());
        assert_eq!(resources.len(), 1);
        let ArmResource::AppInsights(ai) = &resources[0] else {
            panic!("expected insights");
        };
        let json = arm_json(ai);
        assert_eq!(json["type"], "Microsoft.Insights/components");
        assert_eq!(json["location"], "eastus");
        assert_eq!(json["tags"], json!({ "displayName": "AppInsightsComponent" }));
        assert!(json["properties"].get("ApplicationId").is_none());
    }

    #[test]
    fn test_insights_connection_string_api_version() {
        assert_eq!(
            connection_string(&"t".into()).value(),
            "[reference(resourceId('Microsoft.Insights/components', 't'), '2020-02-02').ConnectionString]"
        );
    }

    #[test]
    fn test_insights_hidden_link_tag() {
        let ai = AppInsights {
            name: "shop-ai".into(),
            location: Location::west_europe(),
            linked_website: Some("shop".into()),
        };
        let json = arm_json(&ai);
        let key = "[concat('hidden-link:', resourceGroup().id, '/providers/Microsoft.Web/sites/', 'shop')]";
        assert_eq!(json["tags"][key], "Resource");
        assert_eq!(json["properties"]["ApplicationId"], "shop");
    }

    #[test]
    fn test_insights_instrumentation_key() {
        let config = build::<AppInsightsConfig>([AppInsightsOp::Name("t".into())]).unwrap();
        assert_eq!(
            config.instrumentation_key().value(),
            "[reference(resourceId('Microsoft.Insights/components', 't'), '2014-04-01').InstrumentationKey]"
        );
    }

    #[test]
    fn test_insights_requires_name() {
        assert!(build::<AppInsightsConfig>([]).is_err());
    }
}
