//! Feature kinds and the [`FeatureSet`] bitset.
//!
//! Features are scalar physico-chemical properties attached lazily to
//! entities in the catalog. Modules declare the feature kinds they need
//! via a [`FeatureSet`]; the declaration is checked once at registration,
//! not per-epoch.

use std::fmt;

/// Classification of a scalar feature attachable to a chemical entity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u32)]
pub enum FeatureKind {
    /// Diffusion coefficient, in µm²/s.
    Diffusivity = 0,
    /// Catalytic turnover number kcat, in 1/s.
    CatalyticConstant = 1,
    /// Michaelis constant Km, in the simulation's concentration unit.
    MichaelisConstant = 2,
}

impl FeatureKind {
    /// All feature kinds, in discriminant order.
    pub const ALL: [FeatureKind; 3] = [
        FeatureKind::Diffusivity,
        FeatureKind::CatalyticConstant,
        FeatureKind::MichaelisConstant,
    ];

    fn bit(self) -> u32 {
        1u32 << (self as u32)
    }
}

impl fmt::Display for FeatureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Diffusivity => write!(f, "diffusivity"),
            Self::CatalyticConstant => write!(f, "catalytic constant"),
            Self::MichaelisConstant => write!(f, "michaelis constant"),
        }
    }
}

/// A set of feature kinds implemented as a fixed-width bitset.
///
/// Used by modules to declare which features they require on the entities
/// they act on, enabling the engine to validate the module list up front.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FeatureSet {
    bits: u32,
}

impl FeatureSet {
    /// Create an empty feature set.
    pub fn empty() -> Self {
        Self { bits: 0 }
    }

    /// Insert a feature kind into the set.
    pub fn insert(&mut self, kind: FeatureKind) {
        self.bits |= kind.bit();
    }

    /// Check whether the set contains a feature kind.
    pub fn contains(&self, kind: FeatureKind) -> bool {
        self.bits & kind.bit() != 0
    }

    /// Return the union of two sets (`self | other`).
    pub fn union(&self, other: &Self) -> Self {
        Self {
            bits: self.bits | other.bits,
        }
    }

    /// Return the intersection of two sets (`self & other`).
    pub fn intersection(&self, other: &Self) -> Self {
        Self {
            bits: self.bits & other.bits,
        }
    }

    /// Return the set difference (`self - other`).
    pub fn difference(&self, other: &Self) -> Self {
        Self {
            bits: self.bits & !other.bits,
        }
    }

    /// Check whether `self` is a subset of `other`.
    pub fn is_subset(&self, other: &Self) -> bool {
        self.bits & !other.bits == 0
    }

    /// Returns `true` if the set contains no feature kinds.
    pub fn is_empty(&self) -> bool {
        self.bits == 0
    }

    /// Returns the number of feature kinds in the set.
    pub fn len(&self) -> usize {
        self.bits.count_ones() as usize
    }

    /// Iterate over the feature kinds in the set, in discriminant order.
    pub fn iter(&self) -> FeatureSetIter {
        FeatureSetIter {
            bits: self.bits,
            next: 0,
        }
    }
}

impl FromIterator<FeatureKind> for FeatureSet {
    fn from_iter<I: IntoIterator<Item = FeatureKind>>(iter: I) -> Self {
        let mut set = Self::empty();
        for kind in iter {
            set.insert(kind);
        }
        set
    }
}

impl IntoIterator for &FeatureSet {
    type Item = FeatureKind;
    type IntoIter = FeatureSetIter;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over the kinds in a [`FeatureSet`], in discriminant order.
pub struct FeatureSetIter {
    bits: u32,
    next: usize,
}

impl Iterator for FeatureSetIter {
    type Item = FeatureKind;

    fn next(&mut self) -> Option<Self::Item> {
        while self.next < FeatureKind::ALL.len() {
            let kind = FeatureKind::ALL[self.next];
            self.next += 1;
            if self.bits & kind.bit() != 0 {
                return Some(kind);
            }
        }
        None
    }
}
