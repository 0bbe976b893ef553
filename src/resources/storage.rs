//! Storage accounts with nested blob containers.

use crate::core::builder::{Finalized, ResourceBuilder};
use crate::core::error::Result;
use crate::core::expression::{ArmExpression, Expr};
use crate::core::resolver;
use crate::core::types::{
    ArmResource, Location, ResourceName, BLOB_CONTAINERS, STORAGE_ACCOUNTS,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;

/// Replication / performance tier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum StorageSku {
    #[default]
    StandardLrs,
    StandardGrs,
    StandardRagrs,
    StandardZrs,
    PremiumLrs,
}

impl fmt::Display for StorageSku {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StandardLrs => write!(f, "Standard_LRS"),
            Self::StandardGrs => write!(f, "Standard_GRS"),
            Self::StandardRagrs => write!(f, "Standard_RAGRS"),
            Self::StandardZrs => write!(f, "Standard_ZRS"),
            Self::PremiumLrs => write!(f, "Premium_LRS"),
        }
    }
}

/// Anonymous read access for a blob container.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum StorageAccessLevel {
    #[default]
    Private,
    Blob,
    Container,
}

impl fmt::Display for StorageAccessLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Private => write!(f, "None"),
            Self::Blob => write!(f, "Blob"),
            Self::Container => write!(f, "Container"),
        }
    }
}

/// Builder configuration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StorageConfig {
    pub name: ResourceName,
    pub sku: StorageSku,
    pub containers: Vec<(String, StorageAccessLevel)>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StorageOp {
    Name(ResourceName),
    Sku(StorageSku),
    /// Adding a container twice keeps the first position, last access level.
    AddContainer(String, StorageAccessLevel),
}

impl StorageOp {
    pub fn name(name: impl Into<ResourceName>) -> Self {
        Self::Name(name.into())
    }

    pub fn private_container(name: impl Into<String>) -> Self {
        Self::AddContainer(name.into(), StorageAccessLevel::Private)
    }

    pub fn public_container(name: impl Into<String>) -> Self {
        Self::AddContainer(name.into(), StorageAccessLevel::Container)
    }

    pub fn blob_container(name: impl Into<String>) -> Self {
        Self::AddContainer(name.into(), StorageAccessLevel::Blob)
    }
}

impl StorageConfig {
    /// Connection string with the account's primary key.
    pub fn key(&self) -> ArmExpression {
        connection_string(&self.name)
    }
}

impl ResourceBuilder for StorageConfig {
    type Op = StorageOp;
    const KIND: &'static str = "storage account";

    fn start() -> Self {
        Self::default()
    }

    fn apply(mut self, op: StorageOp) -> Self {
        match op {
            StorageOp::Name(name) => self.name = name,
            StorageOp::Sku(sku) => self.sku = sku,
            StorageOp::AddContainer(container, access) => {
                match self.containers.iter_mut().find(|(c, _)| *c == container) {
                    Some(existing) => existing.1 = access,
                    None => self.containers.push((container, access)),
                }
            }
        }
        self
    }

    fn finalize(mut self) -> Result<Self> {
        resolver::require_name(&self.name, Self::KIND, "name")?;
        self.name = resolver::sanitize_storage_name(&self.name)?;
        Ok(self)
    }

    fn name(&self) -> &ResourceName {
        &self.name
    }

    fn convert(config: &Finalized<Self>, location: &Location) -> Vec<ArmResource> {
        vec![ArmResource::StorageAccount(StorageAccount {
            name: config.name.clone(),
            location: location.clone(),
            sku: config.sku,
            containers: config.containers.clone(),
        })]
    }
}

/// `DefaultEndpointsProtocol=https;AccountName=<name>;AccountKey=<key>`
pub fn connection_string(name: &ResourceName) -> ArmExpression {
    Expr::concat([
        Expr::literal(format!(
            "DefaultEndpointsProtocol=https;AccountName={name};AccountKey="
        )),
        Expr::list_keys(STORAGE_ACCOUNTS, name, "keys[0].value"),
    ])
    .into()
}

// ============================================================================
// Canonical resource
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct StorageAccount {
    pub name: ResourceName,
    pub location: Location,
    pub sku: StorageSku,
    pub containers: Vec<(String, StorageAccessLevel)>,
}

/// Emit the account with its containers nested under `resources`.
pub fn arm_json(account: &StorageAccount) -> Value {
    let containers: Vec<Value> = account
        .containers
        .iter()
        .map(|(container, access)| {
            json!({
                "type": BLOB_CONTAINERS.path,
                "apiVersion": BLOB_CONTAINERS.api_version,
                "name": format!("default/{container}"),
                "dependsOn": [account.name],
                "properties": { "publicAccess": access.to_string() },
            })
        })
        .collect();

    json!({
        "type": STORAGE_ACCOUNTS.path,
        "apiVersion": STORAGE_ACCOUNTS.api_version,
        "name": account.name,
        "location": account.location,
        "sku": { "name": account.sku.to_string() },
        "kind": "StorageV2",
        "properties": {},
        "resources": containers,
    })
}
