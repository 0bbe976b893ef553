//! SQL servers with nested databases and firewall rules.
//!
//! The administrator password is never emitted: the server declares a
//! `password-for-<server>` secure parameter and references it symbolically.

use crate::core::builder::{Finalized, ResourceBuilder};
use crate::core::error::{CompileError, Result};
use crate::core::expression::{ArmExpression, Expr};
use crate::core::resolver;
use crate::core::types::{
    ArmResource, Location, ResourceName, SecureParameter, SQL_DATABASES, SQL_ENCRYPTION,
    SQL_FIREWALL_RULES, SQL_SERVERS,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

pub const DEFAULT_COLLATION: &str = "SQL_Latin1_General_CP1_CI_AS";

/// Rule name used for the "allow Azure services" 0.0.0.0 range.
pub const AZURE_SERVICES_RULE: &str = "AllowAllMicrosoftAzureIps";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum DbSku {
    #[default]
    Basic,
    S0,
    S1,
    S2,
    S3,
    P1,
    P2,
    P4,
}

impl DbSku {
    pub fn edition(self) -> &'static str {
        match self {
            Self::Basic => "Basic",
            Self::S0 | Self::S1 | Self::S2 | Self::S3 => "Standard",
            Self::P1 | Self::P2 | Self::P4 => "Premium",
        }
    }

    pub fn objective(self) -> &'static str {
        match self {
            Self::Basic => "Basic",
            Self::S0 => "S0",
            Self::S1 => "S1",
            Self::S2 => "S2",
            Self::S3 => "S3",
            Self::P1 => "P1",
            Self::P2 => "P2",
            Self::P4 => "P4",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SqlDatabase {
    pub name: ResourceName,
    pub sku: DbSku,
    pub collation: String,
    pub encrypted: bool,
}

impl SqlDatabase {
    pub fn new(name: impl Into<ResourceName>) -> Self {
        Self {
            name: name.into(),
            sku: DbSku::Basic,
            collation: DEFAULT_COLLATION.to_string(),
            encrypted: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FirewallRule {
    pub name: String,
    pub start: String,
    pub end: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SqlConfig {
    pub name: ResourceName,
    pub admin_login: String,
    pub databases: Vec<SqlDatabase>,
    pub firewall_rules: Vec<FirewallRule>,
    pub allow_azure_services: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SqlOp {
    ServerName(ResourceName),
    AdminLogin(String),
    AddDatabase(SqlDatabase),
    AddFirewallRule(FirewallRule),
    AllowAzureServices(bool),
}

impl SqlConfig {
    pub fn admin_password(&self) -> SecureParameter {
        admin_password_parameter(&self.name)
    }

    /// ADO.NET connection string for one of this server's databases.
    pub fn connection_string(&self, database: &ResourceName) -> ArmExpression {
        Expr::concat([
            Expr::literal("Server=tcp:"),
            Expr::reference(SQL_SERVERS, &self.name, "fullyQualifiedDomainName"),
            Expr::literal(format!(
                ",1433;Initial Catalog={database};Persist Security Info=False;User ID={};Password=",
                self.admin_login
            )),
            Expr::parameter(&self.admin_password()),
            Expr::literal(
                ";MultipleActiveResultSets=False;Encrypt=True;TrustServerCertificate=False;Connection Timeout=30;",
            ),
        ])
        .into()
    }
}

pub fn admin_password_parameter(server: &ResourceName) -> SecureParameter {
    SecureParameter::new(format!("password-for-{server}"))
}

impl ResourceBuilder for SqlConfig {
    type Op = SqlOp;
    const KIND: &'static str = "sql server";

    fn start() -> Self {
        Self {
            name: ResourceName::default(),
            admin_login: String::new(),
            databases: Vec::new(),
            firewall_rules: Vec::new(),
            allow_azure_services: false,
        }
    }

    fn apply(mut self, op: SqlOp) -> Self {
        match op {
            SqlOp::ServerName(name) => self.name = name,
            SqlOp::AdminLogin(login) => self.admin_login = login,
            SqlOp::AddDatabase(db) => {
                self.databases.retain(|existing| existing.name != db.name);
                self.databases.push(db);
            }
            SqlOp::AddFirewallRule(rule) => self.firewall_rules.push(rule),
            SqlOp::AllowAzureServices(allow) => self.allow_azure_services = allow,
        }
        self
    }

    fn finalize(self) -> Result<Self> {
        resolver::require_name(&self.name, Self::KIND, "name")?;
        if self.admin_login.trim().is_empty() {
            return Err(CompileError::MissingRequiredField {
                resource: Self::KIND,
                field: "admin_login",
            });
        }
        for db in &self.databases {
            resolver::require_name(&db.name, "sql database", "name")?;
        }
        Ok(self)
    }

    fn name(&self) -> &ResourceName {
        &self.name
    }

    fn convert(config: &Finalized<Self>, location: &Location) -> Vec<ArmResource> {
        let mut firewall_rules = config.firewall_rules.clone();
        if config.allow_azure_services
            && !firewall_rules.iter().any(|r| r.name == AZURE_SERVICES_RULE)
        {
            firewall_rules.push(FirewallRule {
                name: AZURE_SERVICES_RULE.to_string(),
                start: "0.0.0.0".to_string(),
                end: "0.0.0.0".to_string(),
            });
        }
        vec![ArmResource::SqlServer(SqlServer {
            name: config.name.clone(),
            location: location.clone(),
            admin_login: config.admin_login.clone(),
            admin_password: config.admin_password(),
            databases: config.databases.clone(),
            firewall_rules,
        })]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SqlServer {
    pub name: ResourceName,
    pub location: Location,
    pub admin_login: String,
    pub admin_password: SecureParameter,
    pub databases: Vec<SqlDatabase>,
    pub firewall_rules: Vec<FirewallRule>,
}

/// Server -> databases -> encryption, plus firewall rules beside the databases.
pub fn arm_json(server: &SqlServer) -> Value {
    let password: ArmExpression = Expr::parameter(&server.admin_password).into();

    let databases = server.databases.iter().map(|db| {
        let encryption: Vec<Value> = if db.encrypted {
            vec![json!({
                "type": SQL_ENCRYPTION.path,
                "apiVersion": SQL_ENCRYPTION.api_version,
                "name": "current",
                "dependsOn": [db.name],
                "properties": { "status": "Enabled" },
            })]
        } else {
            Vec::new()
        };
        json!({
            "type": SQL_DATABASES.path,
            "apiVersion": SQL_DATABASES.api_version,
            "name": db.name,
            "location": server.location,
            "tags": { "displayName": db.name },
            "dependsOn": [server.name],
            "properties": {
                "edition": db.sku.edition(),
                "collation": db.collation,
                "requestedServiceObjectiveName": db.sku.objective(),
            },
            "resources": encryption,
        })
    });

    let rules = server.firewall_rules.iter().map(|rule| {
        json!({
            "type": SQL_FIREWALL_RULES.path,
            "apiVersion": SQL_FIREWALL_RULES.api_version,
            "name": rule.name,
            "location": server.location,
            "dependsOn": [server.name],
            "properties": {
                "startIpAddress": rule.start,
                "endIpAddress": rule.end,
            },
        })
    });

    let children: Vec<Value> = databases.chain(rules).collect();

    json!({
        "type": SQL_SERVERS.path,
        "apiVersion": SQL_SERVERS.api_version,
        "name": server.name,
        "location": server.location,
        "tags": { "displayName": server.name },
        "properties": {
            "administratorLogin": server.admin_login,
            "administratorLoginPassword": password,
            "version": "12.0",
        },
        "resources": children,
    })
}
