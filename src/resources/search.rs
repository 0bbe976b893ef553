//! Search services.

use crate::core::builder::{Finalized, ResourceBuilder};
use crate::core::error::Result;
use crate::core::expression::{ArmExpression, Expr};
use crate::core::resolver;
use crate::core::types::{ArmResource, Location, ResourceName, SEARCH_SERVICES};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum SearchSku {
    #[default]
    Free,
    Basic,
    Standard,
    Standard2,
    Standard3,
    /// Standard3 in high-density hosting mode.
    Standard3HighDensity,
    StorageOptimisedL1,
    StorageOptimisedL2,
}

impl SearchSku {
    pub fn name(self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::Basic => "basic",
            Self::Standard => "standard",
            Self::Standard2 => "standard2",
            Self::Standard3 | Self::Standard3HighDensity => "standard3",
            Self::StorageOptimisedL1 => "storage_optimized_l1",
            Self::StorageOptimisedL2 => "storage_optimized_l2",
        }
    }

    pub fn hosting_mode(self) -> &'static str {
        match self {
            Self::Standard3HighDensity => "highDensity",
            _ => "default",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchConfig {
    pub name: ResourceName,
    pub sku: SearchSku,
    pub replicas: u32,
    pub partitions: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SearchOp {
    Name(ResourceName),
    Sku(SearchSku),
    Replicas(u32),
    Partitions(u32),
}

impl SearchConfig {
    pub fn admin_key(&self) -> ArmExpression {
        admin_key(&self.name)
    }
}

impl ResourceBuilder for SearchConfig {
    type Op = SearchOp;
    const KIND: &'static str = "search service";

    fn start() -> Self {
        Self {
            name: ResourceName::default(),
            sku: SearchSku::Free,
            replicas: 1,
            partitions: 1,
        }
    }

    fn apply(mut self, op: SearchOp) -> Self {
        match op {
            SearchOp::Name(name) => self.name = name,
            SearchOp::Sku(sku) => self.sku = sku,
            SearchOp::Replicas(n) => self.replicas = n,
            SearchOp::Partitions(n) => self.partitions = n,
        }
        self
    }

    fn finalize(self) -> Result<Self> {
        resolver::require_name(&self.name, Self::KIND, "name")?;
        Ok(self)
    }

    fn name(&self) -> &ResourceName {
        &self.name
    }

    fn convert(config: &Finalized<Self>, location: &Location) -> Vec<ArmResource> {
        vec![ArmResource::Search(SearchService {
            name: config.name.clone(),
            location: location.clone(),
            sku: config.sku,
            replicas: config.replicas,
            partitions: config.partitions,
        })]
    }
}

/// Primary admin key of a search service.
pub fn admin_key(name: &ResourceName) -> ArmExpression {
    Expr::list_admin_keys(SEARCH_SERVICES, name, "primaryKey").into()
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchService {
    pub name: ResourceName,
    pub location: Location,
    pub sku: SearchSku,
    pub replicas: u32,
    pub partitions: u32,
}

pub fn arm_json(search: &SearchService) -> Value {
    json!({
        "type": SEARCH_SERVICES.path,
        "apiVersion": SEARCH_SERVICES.api_version,
        "name": search.name,
        "location": search.location,
        "sku": { "name": search.sku.name() },
        "properties": {
            "replicaCount": search.replicas,
            "partitionCount": search.partitions,
            "hostingMode": search.sku.hosting_mode(),
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::builder::build;

    #[test]
    fn test_search_finalize_idempotent() {
        let once = build::<SearchConfig>([
            SearchOp::Name("find".into()),
            SearchOp::Sku(SearchSku::Standard2),
        ])
        .unwrap();
        let twice = Finalized::new(once.clone().into_inner()).unwrap();
        assert_eq!(once, twice);
        assert_eq!(
            once.resources(&Location::west_europe()),
            twice.resources(&Location::west_europe())
        );
    }

    #[test]
    fn test_search_defaults() {
        let config = build::<SearchConfig>([SearchOp::Name("find".into())]).unwrap();
        let resources = config.resources(&Location::west_europe());
        let ArmResource::Search(search) = &resources[0] else {
            panic!("expected search");
        };
        let json = arm_json(search);
        assert_eq!(json["sku"]["name"], "free");
        assert_eq!(json["properties"]["replicaCount"], 1);
        assert_eq!(json["properties"]["hostingMode"], "default");
    }

    #[test]
    fn test_search_high_density() {
        let config = build::<SearchConfig>([
            SearchOp::Name("dense".into()),
            SearchOp::Sku(SearchSku::Standard3HighDensity),
            SearchOp::Replicas(3),
            SearchOp::Partitions(2),
        ])
        .unwrap();
        let resources = config.resources(&Location::west_europe());
        let ArmResource::Search(search) = &resources[0] else {
            panic!("expected search");
        };
        let json = arm_json(search);
        assert_eq!(json["sku"]["name"], "standard3");
        assert_eq!(json["properties"]["hostingMode"], "highDensity");
        assert_eq!(json["properties"]["replicaCount"], 3);
        assert_eq!(json["properties"]["partitionCount"], 2);
    }

    #[test]
    fn test_search_admin_key() {
        let config = build::<SearchConfig>([SearchOp::Name("find".into())]).unwrap();
        assert_eq!(
            config.admin_key().value(),
            "[listAdminKeys(resourceId('Microsoft.Search/searchServices', 'find'), '2015-08-19').primaryKey]"
        );
    }

    #[test]
    fn test_search_storage_optimised_name() {
        assert_eq!(SearchSku::StorageOptimisedL2.name(), "storage_optimized_l2");
    }
}
