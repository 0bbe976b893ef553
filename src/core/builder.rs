//! Builder accumulation as a fold over operations.
//!
//! A builder configuration is a plain value. Each operation consumes the
//! current value and returns the next one; `finalize` resolves every sibling
//! reference exactly once. Only a [`Finalized`] configuration can be
//! converted into canonical resources.

use super::error::Result;
use super::types::{ArmResource, Location, ResourceName};
use std::ops::Deref;

/// One resource family's configuration record.
pub trait ResourceBuilder: Sized + Clone {
    /// An accumulation operation, e.g. "set the sku".
    type Op;

    /// Human-readable family name used in error messages.
    const KIND: &'static str;

    /// Default configuration: smallest tier, placeholders for siblings.
    fn start() -> Self;

    /// Apply one operation, producing the next configuration.
    fn apply(self, op: Self::Op) -> Self;

    /// Resolve placeholders and default derived names. Must be idempotent.
    fn finalize(self) -> Result<Self>;

    /// The primary resource name.
    fn name(&self) -> &ResourceName;

    /// Convert into canonical resources. Only reachable through
    /// [`Finalized`], so every sibling slot is already resolved.
    fn convert(config: &Finalized<Self>, location: &Location) -> Vec<ArmResource>;
}

/// A configuration that has been through [`ResourceBuilder::finalize`].
#[derive(Debug, Clone, PartialEq)]
pub struct Finalized<B>(B);

impl<B: ResourceBuilder> Finalized<B> {
    pub fn new(config: B) -> Result<Self> {
        config.finalize().map(Self)
    }

    pub fn name(&self) -> &ResourceName {
        self.0.name()
    }

    pub fn resources(&self, location: &Location) -> Vec<ArmResource> {
        tracing::debug!(kind = B::KIND, name = %self.name(), "converting");
        B::convert(self, location)
    }

    pub fn into_inner(self) -> B {
        self.0
    }
}

impl<B> Deref for Finalized<B> {
    type Target = B;

    fn deref(&self) -> &B {
        &self.0
    }
}

/// Fold `ops` over the builder's default configuration and finalize.
pub fn build<B: ResourceBuilder>(ops: impl IntoIterator<Item = B::Op>) -> Result<Finalized<B>> {
    let config = ops.into_iter().fold(B::start(), B::apply);
    Finalized::new(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::ResourceRef;
    use crate::resources::functions::{FunctionsConfig, FunctionsOp};
    use crate::resources::storage::{StorageConfig, StorageOp};
    use crate::resources::web::{WebAppConfig, WebAppOp};
    use proptest::prelude::*;

    #[test]
    fn test_builder_fold_applies_in_order() {
        let config = build::<StorageConfig>([StorageOp::name("first"), StorageOp::name("second")])
            .unwrap();
        assert_eq!(config.name().as_str(), "second");
    }

    #[test]
    fn test_builder_start_is_unfinalized() {
        let config = WebAppConfig::start();
        assert!(config.service_plan.is_placeholder());
        assert!(config.name.is_blank());
    }

    #[test]
    fn test_builder_round_trip_minimal_web_app() {
        let config = build::<WebAppConfig>([WebAppOp::name("bare"), WebAppOp::DisableAppInsights])
            .unwrap();
        let resources = config.resources(&Location::default());
        assert_eq!(resources.len(), 2);
        assert!(matches!(resources[0], ArmResource::WebApp(ref app) if app.extensions.is_empty()));
        assert!(matches!(resources[1], ArmResource::ServerFarm(_)));
    }

    fn site_ops(name: String, choice: u8) -> Vec<WebAppOp> {
        let mut ops = vec![WebAppOp::Name(name.into())];
        match choice {
            0 => ops.push(WebAppOp::DisableAppInsights),
            1 => ops.push(WebAppOp::LinkToAppInsights("shared-ai".into())),
            2 => ops.push(WebAppOp::AppInsightsName("named-ai".into())),
            _ => {}
        }
        ops
    }

    proptest! {
        #[test]
        fn prop_web_finalize_idempotent(name in "[a-z][a-z0-9-]{0,20}", choice in 0u8..4) {
            let once = build::<WebAppConfig>(site_ops(name, choice)).unwrap();
            let twice = Finalized::new(once.clone().into_inner()).unwrap();
            prop_assert_eq!(
                once.resources(&Location::default()),
                twice.resources(&Location::default())
            );
        }

        #[test]
        fn prop_web_placeholders_resolved(name in "[a-z][a-z0-9-]{0,20}", choice in 0u8..4) {
            let config = build::<WebAppConfig>(site_ops(name, choice)).unwrap();
            prop_assert!(!config.service_plan.is_placeholder());
            prop_assert!(config.app_insights.as_ref().map_or(true, |r| !r.is_placeholder()));
        }

        #[test]
        fn prop_functions_finalize_idempotent(name in "[a-zA-Z][a-zA-Z0-9-]{0,30}") {
            let once = build::<FunctionsConfig>([FunctionsOp::name(name)]).unwrap();
            prop_assert!(!matches!(once.storage, Some(ResourceRef::AutomaticPlaceholder)));
            let twice = Finalized::new(once.clone().into_inner()).unwrap();
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn prop_dependencies_emitted_or_linked(name in "[a-z][a-z0-9]{0,20}", choice in 0u8..4) {
            let web = build::<WebAppConfig>(site_ops(name.clone(), choice)).unwrap();
            let functions = build::<FunctionsConfig>([FunctionsOp::name(name)]).unwrap();
            for resources in [
                web.resources(&Location::default()),
                functions.resources(&Location::default()),
            ] {
                let emitted: Vec<&ResourceName> = resources.iter().map(|r| r.name()).collect();
                for dependency in resources[0].dependencies() {
                    prop_assert!(
                        emitted.contains(&dependency) || dependency.as_str() == "shared-ai",
                        "{} is neither emitted nor linked",
                        dependency
                    );
                }
            }
        }

        #[test]
        fn prop_compile_deterministic(name in "[a-z][a-z0-9]{0,20}", choice in 0u8..4) {
            let a = build::<WebAppConfig>(site_ops(name.clone(), choice)).unwrap();
            let b = build::<WebAppConfig>(site_ops(name, choice)).unwrap();
            prop_assert_eq!(a.resources(&Location::default()), b.resources(&Location::default()));
        }
    }
}
