//! Document emission.

use super::expression::ArmExpression;
use super::template::Template;
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;

pub const SCHEMA: &str =
    "https://schema.management.azure.com/schemas/2015-01-01/deploymentTemplate.json#";
pub const CONTENT_VERSION: &str = "1.0.0.0";

#[derive(Debug, Serialize)]
struct ParameterDeclaration {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Serialize)]
struct OutputDeclaration<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    value: &'a ArmExpression,
}

/// Top-level document shape. Field order is emission order.
#[derive(Debug, Serialize)]
pub struct Document<'a> {
    #[serde(rename = "$schema")]
    schema: &'static str,
    #[serde(rename = "contentVersion")]
    content_version: &'static str,
    parameters: IndexMap<&'a str, ParameterDeclaration>,
    outputs: IndexMap<&'a str, OutputDeclaration<'a>>,
    resources: Vec<Value>,
}

impl<'a> Document<'a> {
    pub fn new(template: &'a Template) -> Self {
        let parameters = template
            .parameters
            .iter()
            .map(|p| (p.name(), ParameterDeclaration { kind: "securestring" }))
            .collect();
        let outputs = template
            .outputs
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str(),
                    OutputDeclaration {
                        kind: "string",
                        value,
                    },
                )
            })
            .collect();
        Self {
            schema: SCHEMA,
            content_version: CONTENT_VERSION,
            parameters,
            outputs,
            resources: template.resource_values(),
        }
    }
}

/// Serialize a template to JSON text.
pub fn to_json(template: &Template, pretty: bool) -> serde_json::Result<String> {
    let document = Document::new(template);
    if pretty {
        serde_json::to_string_pretty(&document)
    } else {
        serde_json::to_string(&document)
    }
}

/// The document as a JSON value, for callers that post-process it.
pub fn to_value(template: &Template) -> serde_json::Result<Value> {
    serde_json::to_value(Document::new(template))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::builder::build;
    use crate::core::template::Deployment;
    use crate::core::types::Location;
    use crate::resources::sql::{SqlConfig, SqlOp};
    use crate::resources::storage::{StorageConfig, StorageOp};
    use serde_json::json;

    fn deployment() -> Deployment {
        let storage = build::<StorageConfig>([StorageOp::name("mystorage")]).unwrap();
        let server = build::<SqlConfig>([
            SqlOp::ServerName("db".into()),
            SqlOp::AdminLogin("admin".into()),
        ])
        .unwrap();
        Deployment::new(Location::west_europe())
            .output("storageKey", storage.key())
            .add(storage)
            .add(server)
    }

    #[test]
    fn test_emit_top_level_keys() {
        let value = to_value(&deployment().compile()).unwrap();
        let keys: Vec<&String> = value.as_object().unwrap().keys().collect();
        assert_eq!(
            keys,
            ["$schema", "contentVersion", "parameters", "outputs", "resources"]
        );
        assert_eq!(value["$schema"], SCHEMA);
        assert_eq!(value["contentVersion"], "1.0.0.0");
    }

    #[test]
    fn test_emit_parameters_are_securestring() {
        let value = to_value(&deployment().compile()).unwrap();
        assert_eq!(
            value["parameters"],
            json!({ "password-for-db": { "type": "securestring" } })
        );
    }

    #[test]
    fn test_emit_outputs_typed_string() {
        let value = to_value(&deployment().compile()).unwrap();
        assert_eq!(value["outputs"]["storageKey"]["type"], "string");
        assert!(value["outputs"]["storageKey"]["value"]
            .as_str()
            .unwrap()
            .starts_with("[concat('DefaultEndpointsProtocol=https;AccountName=mystorage;"));
    }

    #[test]
    fn test_emit_empty_template() {
        let template = Deployment::new(Location::west_europe()).compile();
        let text = to_json(&template, false).unwrap();
        assert_eq!(
            text,
            format!(
                "{{\"$schema\":\"{SCHEMA}\",\"contentVersion\":\"1.0.0.0\",\"parameters\":{{}},\"outputs\":{{}},\"resources\":[]}}"
            )
        );
    }

    #[test]
    fn test_emit_deterministic() {
        let a = to_json(&deployment().compile(), true).unwrap();
        let b = to_json(&deployment().compile(), true).unwrap();
        assert_eq!(a, b);
    }
}
