//! Registration-time module validation.
//!
//! [`validate_modules`] runs once at simulation construction to check
//! the module list for structural errors: unregistered entities and
//! missing required features. Failing fast here is what lets run-time
//! compute hooks treat feature lookups as infallible.

use crate::module::UpdateModule;
use osmos_core::{EntityCatalog, EntityId, FeatureKind};
use std::error::Error;
use std::fmt;

/// Errors from module-list validation (setup-time, not per-epoch).
#[derive(Clone, Debug, PartialEq)]
pub enum ValidationError {
    /// No modules registered.
    NoModules,

    /// A module references an entity not registered in the catalog.
    UnknownEntity {
        /// Which module.
        module: String,
        /// The unregistered entity.
        entity: EntityId,
    },

    /// A required feature is absent from a feature-target entity.
    MissingFeature {
        /// Which module.
        module: String,
        /// The entity lacking the feature, by catalog name.
        entity: String,
        /// The missing feature kind.
        feature: FeatureKind,
    },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoModules => write!(f, "no modules registered"),
            Self::UnknownEntity { module, entity } => {
                write!(f, "module '{module}' references unregistered entity {entity}")
            }
            Self::MissingFeature {
                module,
                entity,
                feature,
            } => {
                write!(
                    f,
                    "module '{module}' requires feature '{feature}' on entity \
                     '{entity}', which does not carry it"
                )
            }
        }
    }
}

impl Error for ValidationError {}

/// Validate a module list against an entity catalog.
///
/// Checks performed (all at setup, none per-epoch):
///
/// 1. Module list is non-empty.
/// 2. Every referenced entity is registered in the catalog.
/// 3. Every feature-target entity carries every required feature kind.
pub fn validate_modules(
    modules: &[Box<dyn UpdateModule>],
    catalog: &EntityCatalog,
) -> Result<(), ValidationError> {
    if modules.is_empty() {
        return Err(ValidationError::NoModules);
    }

    for module in modules {
        for entity in module.referenced_entities() {
            if !catalog.contains(entity) {
                return Err(ValidationError::UnknownEntity {
                    module: module.name().to_string(),
                    entity,
                });
            }
        }

        let required = module.required_features();
        if required.is_empty() {
            continue;
        }
        for entity in module.feature_targets() {
            if !catalog.contains(entity) {
                return Err(ValidationError::UnknownEntity {
                    module: module.name().to_string(),
                    entity,
                });
            }
            let present = catalog.features_of(entity);
            for kind in required.iter() {
                if !present.contains(kind) {
                    return Err(ValidationError::MissingFeature {
                        module: module.name().to_string(),
                        entity: catalog
                            .name(entity)
                            .unwrap_or("<unnamed>")
                            .to_string(),
                        feature: kind,
                    });
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::ModuleKind;
    use osmos_core::{EntityKind, FeatureSet};

    /// Declares a feature requirement on one entity; computes nothing.
    struct NeedsDiffusivity {
        entity: EntityId,
    }

    impl UpdateModule for NeedsDiffusivity {
        fn name(&self) -> &str {
            "needs_diffusivity"
        }
        fn kind(&self) -> ModuleKind {
            ModuleKind::NeighbourDependent
        }
        fn required_features(&self) -> FeatureSet {
            [FeatureKind::Diffusivity].into_iter().collect()
        }
        fn referenced_entities(&self) -> Vec<EntityId> {
            vec![self.entity]
        }
    }

    /// References entities without requiring any feature.
    struct PlainModule {
        entities: Vec<EntityId>,
    }

    impl UpdateModule for PlainModule {
        fn name(&self) -> &str {
            "plain"
        }
        fn kind(&self) -> ModuleKind {
            ModuleKind::NodeLocal
        }
        fn referenced_entities(&self) -> Vec<EntityId> {
            self.entities.clone()
        }
    }

    #[test]
    fn empty_module_list_rejected() {
        let catalog = EntityCatalog::new();
        let modules: Vec<Box<dyn UpdateModule>> = vec![];
        assert!(matches!(
            validate_modules(&modules, &catalog),
            Err(ValidationError::NoModules)
        ));
    }

    #[test]
    fn missing_feature_rejected_with_names() {
        let mut catalog = EntityCatalog::new();
        let glucose = catalog.register("glucose", EntityKind::SmallMolecule).unwrap();
        let modules: Vec<Box<dyn UpdateModule>> =
            vec![Box::new(NeedsDiffusivity { entity: glucose })];

        match validate_modules(&modules, &catalog) {
            Err(ValidationError::MissingFeature {
                module,
                entity,
                feature,
            }) => {
                assert_eq!(module, "needs_diffusivity");
                assert_eq!(entity, "glucose");
                assert_eq!(feature, FeatureKind::Diffusivity);
            }
            other => panic!("expected MissingFeature, got {other:?}"),
        }
    }

    #[test]
    fn present_feature_accepted() {
        let mut catalog = EntityCatalog::new();
        let glucose = catalog.register("glucose", EntityKind::SmallMolecule).unwrap();
        catalog
            .set_feature(glucose, FeatureKind::Diffusivity, 600.0)
            .unwrap();
        let modules: Vec<Box<dyn UpdateModule>> =
            vec![Box::new(NeedsDiffusivity { entity: glucose })];
        assert!(validate_modules(&modules, &catalog).is_ok());
    }

    #[test]
    fn unknown_entity_rejected() {
        let catalog = EntityCatalog::new();
        let modules: Vec<Box<dyn UpdateModule>> = vec![Box::new(PlainModule {
            entities: vec![EntityId(4)],
        })];
        match validate_modules(&modules, &catalog) {
            Err(ValidationError::UnknownEntity { module, entity }) => {
                assert_eq!(module, "plain");
                assert_eq!(entity, EntityId(4));
            }
            other => panic!("expected UnknownEntity, got {other:?}"),
        }
    }

    #[test]
    fn modules_without_requirements_pass() {
        let mut catalog = EntityCatalog::new();
        let a = catalog.register("A", EntityKind::SmallMolecule).unwrap();
        let modules: Vec<Box<dyn UpdateModule>> = vec![Box::new(PlainModule {
            entities: vec![a],
        })];
        assert!(validate_modules(&modules, &catalog).is_ok());
    }
}
