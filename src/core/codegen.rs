//! Resource JSON generation, dispatched to each family's outputter.
//!
//! Every canonical resource kind has exactly one outputter. The match is
//! exhaustive, so a new [`ArmResource`] variant fails to compile until it is
//! wired up here.

use super::types::ArmResource;
use crate::resources;
use serde_json::Value;

/// Generate the template entry for one canonical resource.
pub fn resource_json(resource: &ArmResource) -> Value {
    match resource {
        ArmResource::StorageAccount(r) => resources::storage::arm_json(r),
        ArmResource::ServerFarm(r) => resources::web::server_farm_json(r),
        ArmResource::WebApp(r) => resources::web::web_app_json(r),
        ArmResource::FunctionApp(r) => resources::functions::arm_json(r),
        ArmResource::AppInsights(r) => resources::insights::arm_json(r),
        ArmResource::Search(r) => resources::search::arm_json(r),
        ArmResource::SqlServer(r) => resources::sql::arm_json(r),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{Location, ResourceName};
    use crate::resources::insights::AppInsights;
    use crate::resources::search::{SearchService, SearchSku};
    use crate::resources::storage::{StorageAccount, StorageSku};

    fn storage() -> ArmResource {
        ArmResource::StorageAccount(StorageAccount {
            name: ResourceName::new("mystorage"),
            location: Location::west_europe(),
            sku: StorageSku::StandardLrs,
            containers: vec![],
        })
    }

    #[test]
    fn test_codegen_type_and_name_match_resource() {
        let resources = [
            storage(),
            ArmResource::AppInsights(AppInsights {
                name: "ai".into(),
                location: Location::west_europe(),
                linked_website: None,
            }),
            ArmResource::Search(SearchService {
                name: "find".into(),
                location: Location::west_europe(),
                sku: SearchSku::Basic,
                replicas: 1,
                partitions: 1,
            }),
        ];
        for resource in &resources {
            let json = resource_json(resource);
            assert_eq!(json["type"], resource.resource_type().path);
            assert_eq!(json["apiVersion"], resource.resource_type().api_version);
            assert_eq!(json["name"], resource.name().as_str());
        }
    }

    #[test]
    fn test_codegen_location_emitted() {
        let json = resource_json(&storage());
        assert_eq!(json["location"], "westeurope");
    }
}
