//! The chemical entity catalog.
//!
//! The catalog is an explicit registry object constructed once at setup
//! and passed by reference to whatever resolves entity properties. There
//! is no global state: two simulations can hold two unrelated catalogs.
//!
//! Entity identity (name, kind) is immutable after registration. Features
//! are attached lazily by external collaborators and never removed.

use crate::features::{FeatureKind, FeatureSet};
use crate::id::EntityId;
use indexmap::IndexMap;
use std::error::Error;
use std::fmt;

/// Classification tag for a chemical entity.
///
/// Behavioral differences between entity categories are expressed through
/// the attached feature set, not through the kind tag; the tag exists for
/// display and for applicability predicates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EntityKind {
    /// A small molecule (metabolite, ion, solvent species).
    SmallMolecule,
    /// A protein (typically an enzyme or transporter).
    Protein,
    /// A bound complex of two or more entities.
    Complex,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SmallMolecule => write!(f, "small molecule"),
            Self::Protein => write!(f, "protein"),
            Self::Complex => write!(f, "complex"),
        }
    }
}

/// A registered chemical entity: immutable identity plus lazily attached
/// scalar features.
#[derive(Clone, Debug)]
pub struct ChemicalEntity {
    name: String,
    kind: EntityKind,
    features: IndexMap<FeatureKind, f64>,
}

impl ChemicalEntity {
    /// The entity's unique name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The entity's kind tag.
    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    /// Look up a feature value, if attached.
    pub fn feature(&self, kind: FeatureKind) -> Option<f64> {
        self.features.get(&kind).copied()
    }

    /// The set of feature kinds currently attached.
    pub fn feature_set(&self) -> FeatureSet {
        self.features.keys().copied().collect()
    }
}

/// Errors from catalog registration and feature attachment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CatalogError {
    /// An entity with the same name is already registered.
    DuplicateEntity {
        /// The conflicting name.
        name: String,
    },
    /// The entity ID does not exist in this catalog.
    UnknownEntity {
        /// The unresolved ID.
        entity: EntityId,
    },
}

impl fmt::Display for CatalogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateEntity { name } => {
                write!(f, "entity '{name}' is already registered")
            }
            Self::UnknownEntity { entity } => {
                write!(f, "entity {entity} is not registered in this catalog")
            }
        }
    }
}

impl Error for CatalogError {}

/// Registry of all chemical entities known to a simulation.
///
/// # Examples
///
/// ```
/// use osmos_core::{EntityCatalog, EntityKind, FeatureKind};
///
/// let mut catalog = EntityCatalog::new();
/// let atp = catalog.register("ATP", EntityKind::SmallMolecule).unwrap();
/// catalog.set_feature(atp, FeatureKind::Diffusivity, 350.0).unwrap();
///
/// assert_eq!(catalog.name(atp), Some("ATP"));
/// assert_eq!(catalog.feature(atp, FeatureKind::Diffusivity), Some(350.0));
/// assert_eq!(catalog.feature(atp, FeatureKind::MichaelisConstant), None);
/// ```
#[derive(Clone, Debug, Default)]
pub struct EntityCatalog {
    entities: Vec<ChemicalEntity>,
    by_name: IndexMap<String, EntityId>,
}

impl EntityCatalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new entity. Identity is immutable once registered.
    ///
    /// Returns `Err(CatalogError::DuplicateEntity)` if the name is taken.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        kind: EntityKind,
    ) -> Result<EntityId, CatalogError> {
        let name = name.into();
        if self.by_name.contains_key(&name) {
            return Err(CatalogError::DuplicateEntity { name });
        }
        let id = EntityId(self.entities.len() as u32);
        self.entities.push(ChemicalEntity {
            name: name.clone(),
            kind,
            features: IndexMap::new(),
        });
        self.by_name.insert(name, id);
        Ok(id)
    }

    /// Attach (or overwrite) a scalar feature on an entity.
    ///
    /// Features accumulate; there is no removal operation.
    pub fn set_feature(
        &mut self,
        entity: EntityId,
        kind: FeatureKind,
        value: f64,
    ) -> Result<(), CatalogError> {
        let record = self
            .entities
            .get_mut(entity.0 as usize)
            .ok_or(CatalogError::UnknownEntity { entity })?;
        record.features.insert(kind, value);
        Ok(())
    }

    /// Look up a feature value on an entity.
    pub fn feature(&self, entity: EntityId, kind: FeatureKind) -> Option<f64> {
        self.get(entity).and_then(|e| e.feature(kind))
    }

    /// The set of feature kinds attached to an entity.
    ///
    /// Returns the empty set for unknown IDs.
    pub fn features_of(&self, entity: EntityId) -> FeatureSet {
        self.get(entity)
            .map(|e| e.feature_set())
            .unwrap_or_else(FeatureSet::empty)
    }

    /// The full record for an entity, if registered.
    pub fn get(&self, entity: EntityId) -> Option<&ChemicalEntity> {
        self.entities.get(entity.0 as usize)
    }

    /// The entity's name, if registered.
    pub fn name(&self, entity: EntityId) -> Option<&str> {
        self.get(entity).map(|e| e.name())
    }

    /// Resolve an entity by name.
    pub fn lookup(&self, name: &str) -> Option<EntityId> {
        self.by_name.get(name).copied()
    }

    /// Whether the ID is registered in this catalog.
    pub fn contains(&self, entity: EntityId) -> bool {
        (entity.0 as usize) < self.entities.len()
    }

    /// Number of registered entities.
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Whether the catalog has no entities.
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Iterate over `(id, entity)` pairs in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (EntityId, &ChemicalEntity)> {
        self.entities
            .iter()
            .enumerate()
            .map(|(i, e)| (EntityId(i as u32), e))
    }
}
