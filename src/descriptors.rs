//! Molecular descriptor families.
//!
//! Every family is a set of nodes implementing [`Descriptor`](crate::engine::Descriptor): each node names
//! the intermediates it needs (distance matrix, property vectors, other
//! descriptors) and computes its value from them. Evaluation and caching are
//! handled by [`crate::engine::Session`].
//!
//! | Family  | Symbol | Parameters         | Hydrogens  |
//! |---------|--------|--------------------|------------|
//! | [`AbcIndex`]       | ABC    | none               | suppressed |
//! | [`AbcGgIndex`]     | ABCGG  | none               | suppressed |
//! | [`Autocorrelation`] | ATS, AATS, ATSC, AATSC, MATS, GATS | order, property | explicit |
//!
//! Numeric degeneracies (empty pair sets, zero variance, non-finite properties)
//! produce `NaN`; [`DescriptorError`] is reserved for misconfiguration.
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::engine::{DescriptorRef, ValueKind};
use crate::properties::PropertyKey;

pub mod abc_index;
pub mod autocorrelation;

pub use abc_index::{AbcGgIndex, AbcIndex};
pub use autocorrelation::{Autocorrelation, AutocorrelationKind, MAX_DISTANCE};

/// Errors returned while building or evaluating descriptors.
///
/// These are configuration and programming errors. They are raised at
/// construction or on first evaluation and never depend on the numeric
/// content of a molecule: undefined numeric results are `NaN`, not errors.
#[derive(Debug, Error)]
pub enum DescriptorError {
    /// An element symbol that is not in the element table.
    #[error("unknown element: {0}")]
    UnknownElement(String),

    /// Structurally invalid molecule (bad bond indices, duplicate bonds).
    #[error("invalid molecule: {0}")]
    InvalidMolecule(String),

    /// A property selector that the registry does not know.
    #[error("unknown atomic property: {0}")]
    UnknownProperty(String),

    /// A property name registered twice.
    #[error("atomic property already registered: {0}")]
    DuplicateProperty(String),

    /// An order outside the family's documented range.
    #[error("{family}: order {order} outside {min}..={max}")]
    OrderOutOfRange {
        /// Family symbol.
        family: String,
        /// Rejected order.
        order: u32,
        /// Smallest valid order.
        min: u32,
        /// Largest valid order.
        max: u32,
    },

    /// A node that (transitively) depends on itself.
    #[error("cyclic dependency detected at {0}")]
    CyclicDependency(String),

    /// A dependency evaluated on a different hydrogen view than its parent.
    #[error("{parent} and its dependency {child} disagree on explicit hydrogens")]
    HydrogenModeMismatch {
        /// Declaring node.
        parent: String,
        /// Declared dependency.
        child: String,
    },

    /// Two dependencies declared under the same name.
    #[error("{node} declares dependency `{name}` more than once")]
    DuplicateDependency {
        /// Declaring node.
        node: String,
        /// Repeated dependency name.
        name: String,
    },

    /// A formula asked for a dependency it did not declare.
    #[error("{node} has no resolved dependency `{name}`")]
    MissingDependency {
        /// Calculating node.
        node: String,
        /// Requested dependency name.
        name: String,
    },

    /// A value of the wrong kind where another was expected.
    #[error("{node}: expected {expected} value, found {found}")]
    ValueKindMismatch {
        /// Offending node.
        node: String,
        /// Kind required here.
        expected: ValueKind,
        /// Kind the node produces.
        found: ValueKind,
    },

    /// `PropertyRegistry::install` after the registry was already in use.
    #[error("atomic property registry is already initialized")]
    RegistryAlreadyInitialized,

    /// A molecular property function returned the wrong number of values.
    #[error("atomic property {property}: {found} values for {expected} atoms")]
    PropertyLength {
        /// Property selector.
        property: String,
        /// Atom count of the molecule.
        expected: usize,
        /// Values returned.
        found: usize,
    },

    /// Calculator configuration rejected by validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Calculator configuration that is not valid JSON for the schema.
    #[error("configuration parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// Result table assembly failed.
    #[error("result table shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),
}

/// Division that yields `NaN` when the denominator is zero or non-finite.
///
/// Every formula that divides by a count or a variance goes through this, so
/// degenerate molecules produce `NaN` instead of `inf` or a panic.
///
/// ```
/// use qsar_descriptors::descriptors::safe_div;
///
/// assert_eq!(safe_div(3.0, 2.0), 1.5);
/// assert!(safe_div(1.0, 0.0).is_nan());
/// assert!(safe_div(1.0, f64::INFINITY).is_nan());
/// ```
pub fn safe_div(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 || !denominator.is_finite() {
        f64::NAN
    } else {
        numerator / denominator
    }
}

/// Catalog of the descriptor families this crate provides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Family {
    /// Atom-bond connectivity index.
    #[serde(rename = "ABC")]
    Abc,
    /// Graovac-Ghorbani ABC index.
    #[serde(rename = "ABCGG")]
    AbcGg,
    /// Moreau-Broto autocorrelation.
    #[serde(rename = "ATS")]
    Ats,
    /// Averaged ATS.
    #[serde(rename = "AATS")]
    Aats,
    /// Centered ATS.
    #[serde(rename = "ATSC")]
    Atsc,
    /// Averaged centered ATS.
    #[serde(rename = "AATSC")]
    Aatsc,
    /// Moran coefficient.
    #[serde(rename = "MATS")]
    Mats,
    /// Geary coefficient.
    #[serde(rename = "GATS")]
    Gats,
}

impl Family {
    /// Every family, in catalog order.
    pub const ALL: [Family; 8] = [
        Family::Abc,
        Family::AbcGg,
        Family::Ats,
        Family::Aats,
        Family::Atsc,
        Family::Aatsc,
        Family::Mats,
        Family::Gats,
    ];

    /// Descriptor symbol used in display names and JSON.
    pub fn name(self) -> &'static str {
        match self {
            Family::Abc => "ABC",
            Family::AbcGg => "ABCGG",
            Family::Ats => "ATS",
            Family::Aats => "AATS",
            Family::Atsc => "ATSC",
            Family::Aatsc => "AATSC",
            Family::Mats => "MATS",
            Family::Gats => "GATS",
        }
    }

    /// The autocorrelation member behind this family, if it is one.
    pub fn autocorrelation(self) -> Option<AutocorrelationKind> {
        match self {
            Family::Abc | Family::AbcGg => None,
            Family::Ats => Some(AutocorrelationKind::Ats),
            Family::Aats => Some(AutocorrelationKind::Aats),
            Family::Atsc => Some(AutocorrelationKind::Atsc),
            Family::Aatsc => Some(AutocorrelationKind::Aatsc),
            Family::Mats => Some(AutocorrelationKind::Mats),
            Family::Gats => Some(AutocorrelationKind::Gats),
        }
    }

    /// Canonical instances of this family for batch computation.
    pub fn presets(self) -> Vec<DescriptorRef> {
        match self.autocorrelation() {
            Some(kind) => kind.presets(),
            None => vec![self.singleton()],
        }
    }

    /// Presets restricted to orders up to `max_order` and, when given, to a
    /// whitelist of property selectors. Parameterless families ignore both.
    pub fn presets_with(
        self,
        max_order: u32,
        properties: Option<&[PropertyKey]>,
    ) -> Vec<DescriptorRef> {
        match self.autocorrelation() {
            Some(kind) => kind.presets_with(max_order, properties),
            None => vec![self.singleton()],
        }
    }

    fn singleton(self) -> DescriptorRef {
        match self {
            Family::AbcGg => Arc::new(AbcGgIndex),
            _ => Arc::new(AbcIndex),
        }
    }
}

impl std::fmt::Display for Family {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Every preset of every family, in catalog order.
pub fn all_presets() -> Vec<DescriptorRef> {
    Family::ALL.iter().flat_map(|f| f.presets()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Descriptor;
    use std::collections::HashSet;

    #[test]
    fn safe_div_guards_degenerate_denominators() {
        assert_eq!(safe_div(1.0, 4.0), 0.25);
        assert!(safe_div(0.0, 0.0).is_nan());
        assert!(safe_div(1.0, -0.0).is_nan());
        assert!(safe_div(1.0, f64::NAN).is_nan());
        assert!(safe_div(1.0, f64::NEG_INFINITY).is_nan());
        assert!(safe_div(f64::NAN, 2.0).is_nan());
    }

    #[test]
    fn singleton_families_have_one_preset() {
        assert_eq!(Family::Abc.presets().len(), 1);
        assert_eq!(Family::AbcGg.presets().len(), 1);
        assert_eq!(Family::Abc.presets()[0].to_string(), "ABC");
        assert_eq!(Family::AbcGg.presets()[0].to_string(), "ABCGG");
    }

    #[test]
    fn all_presets_have_distinct_identities() {
        let presets = all_presets();
        let ids: HashSet<_> = presets.iter().map(|d| d.id()).collect();
        assert_eq!(ids.len(), presets.len());
    }

    #[test]
    fn family_serde_uses_descriptor_symbols() {
        let json = serde_json::to_string(&Family::AbcGg).unwrap();
        assert_eq!(json, "\"ABCGG\"");
        let family: Family = serde_json::from_str("\"AATSC\"").unwrap();
        assert_eq!(family, Family::Aatsc);
        assert_eq!(family.to_string(), "AATSC");
    }
}
