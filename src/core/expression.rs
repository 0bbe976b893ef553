//! Deferred runtime expressions.
//!
//! Expressions are built from a closed set of constructors and rendered
//! through exactly one template per provider function. The rendered
//! [`ArmExpression`] is opaque: it is never parsed back, only emitted.
//!
//! Grammar rules enforced here:
//! - the outermost expression is wrapped in `[` `]`
//! - string literals are single-quoted, embedded quotes doubled (`''`)
//! - function arguments are separated by `, `

use super::types::{ResourceName, ResourceType, SecureParameter};
use serde::{Serialize, Serializer};
use std::fmt;

/// Key-listing functions that read secrets of a deployed resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyFunction {
    ListKeys,
    ListAdminKeys,
}

impl KeyFunction {
    fn function_name(self) -> &'static str {
        match self {
            Self::ListKeys => "listKeys",
            Self::ListAdminKeys => "listAdminKeys",
        }
    }
}

/// Expression tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Expr {
    /// `'text'`
    Literal(String),
    /// `parameters('name')`
    Parameter(SecureParameter),
    /// `resourceId('type', 'name')`
    ResourceId {
        resource_type: &'static str,
        name: ResourceName,
    },
    /// `resourceGroup().id`
    ResourceGroupId,
    /// `reference(target, 'api').property`
    Reference {
        target: Box<Expr>,
        api_version: &'static str,
        property: String,
    },
    /// `listKeys(target, 'api').path`
    KeyListing {
        function: KeyFunction,
        target: Box<Expr>,
        api_version: &'static str,
        path: String,
    },
    /// `concat(a, b, ...)`
    Concat(Vec<Expr>),
}

impl Expr {
    pub fn literal(text: impl Into<String>) -> Self {
        Self::Literal(text.into())
    }

    pub fn parameter(parameter: &SecureParameter) -> Self {
        Self::Parameter(parameter.clone())
    }

    pub fn resource_id(resource_type: ResourceType, name: &ResourceName) -> Self {
        Self::ResourceId {
            resource_type: resource_type.path,
            name: name.clone(),
        }
    }

    /// Read a runtime property of another resource in the deployment.
    pub fn reference(resource_type: ResourceType, name: &ResourceName, property: &str) -> Self {
        Self::Reference {
            target: Box::new(Self::resource_id(resource_type, name)),
            api_version: resource_type.api_version,
            property: property.to_string(),
        }
    }

    pub fn list_keys(resource_type: ResourceType, name: &ResourceName, path: &str) -> Self {
        Self::key_listing(KeyFunction::ListKeys, resource_type, name, path)
    }

    pub fn list_admin_keys(resource_type: ResourceType, name: &ResourceName, path: &str) -> Self {
        Self::key_listing(KeyFunction::ListAdminKeys, resource_type, name, path)
    }

    fn key_listing(
        function: KeyFunction,
        resource_type: ResourceType,
        name: &ResourceName,
        path: &str,
    ) -> Self {
        Self::KeyListing {
            function,
            target: Box::new(Self::resource_id(resource_type, name)),
            api_version: resource_type.api_version,
            path: path.to_string(),
        }
    }

    pub fn concat(parts: impl IntoIterator<Item = Expr>) -> Self {
        Self::Concat(parts.into_iter().collect())
    }

    /// Render without the outer brackets.
    pub fn render(&self) -> String {
        let mut out = String::new();
        self.render_into(&mut out);
        out
    }

    fn render_into(&self, out: &mut String) {
        match self {
            Self::Literal(text) => quote_into(text, out),
            Self::Parameter(parameter) => {
                out.push_str("parameters(");
                quote_into(parameter.name(), out);
                out.push(')');
            }
            Self::ResourceId {
                resource_type,
                name,
            } => {
                out.push_str("resourceId(");
                quote_into(resource_type, out);
                out.push_str(", ");
                quote_into(name.as_str(), out);
                out.push(')');
            }
            Self::ResourceGroupId => out.push_str("resourceGroup().id"),
            Self::Reference {
                target,
                api_version,
                property,
            } => {
                out.push_str("reference(");
                target.render_into(out);
                out.push_str(", ");
                quote_into(api_version, out);
                out.push_str(").");
                out.push_str(property);
            }
            Self::KeyListing {
                function,
                target,
                api_version,
                path,
            } => {
                out.push_str(function.function_name());
                out.push('(');
                target.render_into(out);
                out.push_str(", ");
                quote_into(api_version, out);
                out.push_str(").");
                out.push_str(path);
            }
            Self::Concat(parts) => {
                out.push_str("concat(");
                for (i, part) in parts.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    part.render_into(out);
                }
                out.push(')');
            }
        }
    }

    fn collect_parameters(&self, found: &mut Vec<SecureParameter>) {
        match self {
            Self::Parameter(parameter) => {
                if !found.contains(parameter) {
                    found.push(parameter.clone());
                }
            }
            Self::Reference { target, .. } | Self::KeyListing { target, .. } => {
                target.collect_parameters(found)
            }
            Self::Concat(parts) => parts.iter().for_each(|p| p.collect_parameters(found)),
            Self::Literal(_) | Self::ResourceId { .. } | Self::ResourceGroupId => {}
        }
    }
}

fn quote_into(text: &str, out: &mut String) {
    out.push('\'');
    out.push_str(&text.replace('\'', "''"));
    out.push('\'');
}

/// A rendered, bracket-wrapped expression plus the secure parameters it uses.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArmExpression {
    value: String,
    parameters: Vec<SecureParameter>,
}

impl ArmExpression {
    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn secure_parameters(&self) -> &[SecureParameter] {
        &self.parameters
    }
}

impl From<Expr> for ArmExpression {
    fn from(expr: Expr) -> Self {
        let mut parameters = Vec::new();
        expr.collect_parameters(&mut parameters);
        Self {
            value: format!("[{}]", expr.render()),
            parameters,
        }
    }
}

impl fmt::Display for ArmExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

impl Serialize for ArmExpression {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{INSIGHTS_COMPONENTS, SEARCH_SERVICES, STORAGE_ACCOUNTS};

    #[test]
    fn test_expr_literal_quotes_escaped() {
        assert_eq!(Expr::literal("it's").render(), "'it''s'");
    }

    #[test]
    fn test_expr_resource_id() {
        let expr = Expr::resource_id(STORAGE_ACCOUNTS, &"mystorage".into());
        assert_eq!(
            expr.render(),
            "resourceId('Microsoft.Storage/storageAccounts', 'mystorage')"
        );
    }

    #[test]
    fn test_expr_reference_property() {
        let expr = Expr::reference(INSIGHTS_COMPONENTS, &"web-ai".into(), "InstrumentationKey");
        assert_eq!(
            ArmExpression::from(expr).value(),
            "[reference(resourceId('Microsoft.Insights/components', 'web-ai'), '2014-04-01').InstrumentationKey]"
        );
    }

    #[test]
    fn test_expr_list_keys_in_concat() {
        let name = ResourceName::new("mystorage");
        let expr = Expr::concat([
            Expr::literal("AccountName=mystorage;AccountKey="),
            Expr::list_keys(STORAGE_ACCOUNTS, &name, "keys[0].value"),
        ]);
        assert_eq!(
            ArmExpression::from(expr).value(),
            "[concat('AccountName=mystorage;AccountKey=', listKeys(resourceId('Microsoft.Storage/storageAccounts', 'mystorage'), '2018-07-01').keys[0].value)]"
        );
    }

    #[test]
    fn test_expr_list_admin_keys() {
        let expr = Expr::list_admin_keys(SEARCH_SERVICES, &"find".into(), "primaryKey");
        assert_eq!(
            expr.render(),
            "listAdminKeys(resourceId('Microsoft.Search/searchServices', 'find'), '2015-08-19').primaryKey"
        );
    }

    #[test]
    fn test_expr_parameter_collected_once() {
        let p = SecureParameter::new("password-for-db");
        let expr = ArmExpression::from(Expr::concat([
            Expr::parameter(&p),
            Expr::literal(";"),
            Expr::parameter(&p),
        ]));
        assert_eq!(
            expr.value(),
            "[concat(parameters('password-for-db'), ';', parameters('password-for-db'))]"
        );
        assert_eq!(expr.secure_parameters(), &[p]);
    }

    #[test]
    fn test_expr_resource_group_id() {
        let expr = Expr::concat([Expr::literal("hidden-link:"), Expr::ResourceGroupId]);
        assert_eq!(expr.render(), "concat('hidden-link:', resourceGroup().id)");
    }

    #[test]
    fn test_expr_serializes_as_string() {
        let expr = ArmExpression::from(Expr::literal("a"));
        assert_eq!(serde_json::to_string(&expr).unwrap(), "\"['a']\"");
        assert_eq!(expr.to_string(), "['a']");
    }
}
