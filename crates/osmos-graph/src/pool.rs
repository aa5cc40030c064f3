//! Concentration pools and per-node concentration containers.

use crate::compartment::CellRegion;
use crate::error::GraphError;
use indexmap::IndexMap;
use osmos_core::{EntityId, SubsectionId};

/// Mapping from chemical entity to a non-negative concentration.
///
/// `get` on an entity that was never set returns exactly `0.0`, never
/// errors, and never inserts. Insertion order is irrelevant to the
/// numerics but is preserved so iteration is deterministic.
///
/// `Clone` produces a deep, independent copy: candidate states built
/// during step evaluation never share storage with the live pool.
///
/// # Examples
///
/// ```
/// use osmos_graph::ConcentrationPool;
/// use osmos_core::EntityId;
///
/// let mut pool = ConcentrationPool::new();
/// assert_eq!(pool.get(EntityId(0)), 0.0);
///
/// pool.set(EntityId(0), 1.5);
/// assert_eq!(pool.get(EntityId(0)), 1.5);
/// assert_eq!(pool.get(EntityId(1)), 0.0);
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ConcentrationPool {
    values: IndexMap<EntityId, f64>,
}

impl ConcentrationPool {
    /// Create an empty pool.
    pub fn new() -> Self {
        Self::default()
    }

    /// The concentration of an entity; `0.0` if never set. No side effect.
    pub fn get(&self, entity: EntityId) -> f64 {
        self.values.get(&entity).copied().unwrap_or(0.0)
    }

    /// Set the concentration of an entity, overwriting any prior value.
    pub fn set(&mut self, entity: EntityId, value: f64) {
        self.values.insert(entity, value);
    }

    /// Seed an initial concentration at setup time.
    ///
    /// Identical to [`set`](Self::set); named separately so setup code
    /// reads as setup code.
    pub fn initialize(&mut self, entity: EntityId, value: f64) {
        self.set(entity, value);
    }

    /// All entities ever set in this pool, in insertion order.
    ///
    /// Modules that iterate "all species present" use this; an entity
    /// set to `0.0` is still referenced.
    pub fn referenced_entities(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.values.keys().copied()
    }

    /// Iterate over `(entity, concentration)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (EntityId, f64)> + '_ {
        self.values.iter().map(|(e, v)| (*e, *v))
    }

    /// Number of referenced entities.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether no entity has ever been set.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// One [`ConcentrationPool`] per subsection of a node's region.
///
/// Owned exclusively by its node; the engine's apply phase is the only
/// code that mutates a live container during simulation.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ConcentrationContainer {
    pools: IndexMap<SubsectionId, ConcentrationPool>,
}

impl ConcentrationContainer {
    /// Create a container with one empty pool per subsection referenced
    /// by the region.
    pub fn for_region(region: &CellRegion) -> Self {
        let mut pools = IndexMap::new();
        for (_, subsection) in region.sections() {
            pools.entry(subsection.id()).or_default();
        }
        Self { pools }
    }

    /// The concentration of an entity in a subsection.
    ///
    /// Unknown subsections read as `0.0`, matching the pool contract.
    pub fn get(&self, subsection: SubsectionId, entity: EntityId) -> f64 {
        self.pools
            .get(&subsection)
            .map(|p| p.get(entity))
            .unwrap_or(0.0)
    }

    /// Set a concentration in a subsection.
    ///
    /// Fails if the subsection is not part of the owning node's region —
    /// a delta addressed to a sub-volume the node does not have is a
    /// configuration defect, not a value of zero.
    pub fn set(
        &mut self,
        subsection: SubsectionId,
        entity: EntityId,
        value: f64,
    ) -> Result<(), GraphError> {
        match self.pools.get_mut(&subsection) {
            Some(pool) => {
                pool.set(entity, value);
                Ok(())
            }
            None => Err(GraphError::UnknownSubsection { subsection }),
        }
    }

    /// Seed an initial concentration at setup time.
    pub fn initialize(
        &mut self,
        subsection: SubsectionId,
        entity: EntityId,
        value: f64,
    ) -> Result<(), GraphError> {
        self.set(subsection, entity, value)
    }

    /// The pool for a subsection, if the region maps it.
    pub fn pool(&self, subsection: SubsectionId) -> Option<&ConcentrationPool> {
        self.pools.get(&subsection)
    }

    /// Iterate over `(subsection, pool)` pairs in insertion order.
    pub fn pools(&self) -> impl Iterator<Item = (SubsectionId, &ConcentrationPool)> {
        self.pools.iter().map(|(s, p)| (*s, p))
    }

    /// Whether the container maps the subsection.
    pub fn has_subsection(&self, subsection: SubsectionId) -> bool {
        self.pools.contains_key(&subsection)
    }
}
