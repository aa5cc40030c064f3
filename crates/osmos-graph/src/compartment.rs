//! Cell compartment classification: topologies, subsections, regions.

use indexmap::IndexMap;
use osmos_core::SubsectionId;

/// Classifies which sub-volume of a node a quantity belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CellTopology {
    /// The enclosed sub-volume (e.g. cytoplasm).
    Inner,
    /// The surrounding sub-volume (e.g. extracellular region).
    Outer,
    /// The separating surface between inner and outer.
    Membrane,
}

impl CellTopology {
    /// All topologies, in declaration order.
    pub const ALL: [CellTopology; 3] = [
        CellTopology::Inner,
        CellTopology::Outer,
        CellTopology::Membrane,
    ];
}

/// A named sub-volume with a stable identifier usable as a mapping key.
///
/// # Examples
///
/// ```
/// use osmos_graph::CellSubsection;
/// use osmos_core::SubsectionId;
///
/// let cytoplasm = CellSubsection::new(SubsectionId(0), "cytoplasm");
/// assert_eq!(cytoplasm.name(), "cytoplasm");
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CellSubsection {
    id: SubsectionId,
    name: String,
}

impl CellSubsection {
    /// Create a subsection with an explicit stable identifier.
    ///
    /// Identifiers are assigned by the graph builder; two subsections
    /// with the same ID are the same sub-volume.
    pub fn new(id: SubsectionId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }

    /// The stable mapping key.
    pub fn id(&self) -> SubsectionId {
        self.id
    }

    /// The human-readable name.
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Maps [`CellTopology`] to [`CellSubsection`] for one class of node.
///
/// Regions are shared (`Arc`) between all nodes of the same class and are
/// read-only during simulation: they are never mutated after the graph is
/// built.
#[derive(Clone, Debug, Default)]
pub struct CellRegion {
    name: String,
    sections: IndexMap<CellTopology, CellSubsection>,
}

impl CellRegion {
    /// Create an empty region with a descriptive name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sections: IndexMap::new(),
        }
    }

    /// Create a single-compartment region: one subsection mapped to
    /// [`CellTopology::Inner`].
    pub fn single(name: impl Into<String>, subsection: CellSubsection) -> Self {
        let mut region = Self::new(name);
        region.sections.insert(CellTopology::Inner, subsection);
        region
    }

    /// Map a topology to a subsection, consuming and returning `self`
    /// for chained construction.
    pub fn with(mut self, topology: CellTopology, subsection: CellSubsection) -> Self {
        self.sections.insert(topology, subsection);
        self
    }

    /// The region's descriptive name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The subsection mapped to a topology, if any.
    pub fn subsection(&self, topology: CellTopology) -> Option<&CellSubsection> {
        self.sections.get(&topology)
    }

    /// Iterate over `(topology, subsection)` pairs in insertion order.
    pub fn sections(&self) -> impl Iterator<Item = (CellTopology, &CellSubsection)> {
        self.sections.iter().map(|(t, s)| (*t, s))
    }

    /// Number of mapped topologies.
    pub fn len(&self) -> usize {
        self.sections.len()
    }

    /// Whether no topology is mapped.
    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_region_maps_inner_only() {
        let region = CellRegion::single(
            "aqueous",
            CellSubsection::new(SubsectionId(0), "cytoplasm"),
        );
        assert_eq!(
            region.subsection(CellTopology::Inner).map(|s| s.name()),
            Some("cytoplasm")
        );
        assert!(region.subsection(CellTopology::Membrane).is_none());
        assert_eq!(region.len(), 1);
    }

    #[test]
    fn with_chains_additional_topologies() {
        let region = CellRegion::new("cell boundary")
            .with(
                CellTopology::Inner,
                CellSubsection::new(SubsectionId(0), "cytoplasm"),
            )
            .with(
                CellTopology::Membrane,
                CellSubsection::new(SubsectionId(1), "plasma membrane"),
            )
            .with(
                CellTopology::Outer,
                CellSubsection::new(SubsectionId(2), "extracellular region"),
            );
        assert_eq!(region.len(), 3);
        assert_eq!(
            region.subsection(CellTopology::Outer).map(|s| s.id()),
            Some(SubsectionId(2))
        );
    }
}
