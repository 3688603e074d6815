// src/descriptors/autocorrelation.rs
//! Moreau-Broto, Moran and Geary autocorrelation descriptors.
//!
//! All six members weight atoms by a property vector `w` over the
//! explicit-hydrogen graph and correlate atom pairs at topological distance
//! `k` through the order-k matrix `Bₖ[i,j] = (dᵢⱼ == k)`.
//!
//! | Kind    | Value                                           | Orders |
//! |---------|-------------------------------------------------|--------|
//! | `ATS`   | Σw² for k = 0, ½·wᵀBₖw otherwise                | 0–8    |
//! | `AATS`  | ATS / Δₖ                                        | 0–8    |
//! | `ATSC`  | ATS over the centered vector `c = w − w̄`        | 0–8    |
//! | `AATSC` | ATSC / Δₖ                                       | 0–8    |
//! | `MATS`  | A·AATSC / Σc²                                   | 1–8    |
//! | `GATS`  | (Σ Bₖ(wᵢ − wⱼ)² / 4Δₖ) / (Σc² / (A − 1))        | 1–8    |
//!
//! Δₖ is the number of atom pairs at distance k ([`PairCount`]) and A the
//! atom count. A NaN property value makes the result NaN, and so does every
//! zero denominator.
//!
//! ```
//! use qsar_descriptors::descriptors::{Autocorrelation, AutocorrelationKind};
//! use qsar_descriptors::engine::Session;
//! use qsar_descriptors::molecule::{BondOrder, MoleculeBuilder};
//!
//! let mut b = MoleculeBuilder::new("ethanol");
//! let c1 = b.atom("C")?;
//! let c2 = b.atom("C")?;
//! let o = b.atom("O")?;
//! b.bond(c1, c2, BondOrder::Single)?;
//! b.bond(c2, o, BondOrder::Single)?;
//! let ethanol = b.build();
//!
//! let mut session = Session::new(&ethanol);
//! let mats = Autocorrelation::new(AutocorrelationKind::Mats, 1, "pe")?;
//! assert_eq!(mats.to_string(), "MATS1pe");
//! assert!(session.evaluate(&mats)?.is_finite());
//! # Ok::<(), qsar_descriptors::DescriptorError>(())
//! ```

use std::fmt;
use std::sync::Arc;

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use super::{safe_div, DescriptorError};
use crate::engine::{DescriptorRef, Dependencies, Descriptor, NodeId, Resolved, Value};
use crate::graph_matrix::{AdjacencyMatrix, PairCount};
use crate::molecule::Molecule;
use crate::properties::{
    get_properties, CenteredPropertyVector, PropertyFilter, PropertyKey, PropertyVector,
};

/// Largest topological distance the presets enumerate and constructors accept.
pub const MAX_DISTANCE: u32 = 8;

/// Which member of the autocorrelation family a node computes.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum AutocorrelationKind {
    /// Moreau-Broto: Σ B wᵢwⱼ.
    Ats,
    /// ATS over Δk.
    Aats,
    /// ATS of the centered property.
    Atsc,
    /// ATSC over Δk.
    Aatsc,
    /// Moran coefficient.
    Mats,
    /// Geary coefficient.
    Gats,
}

impl AutocorrelationKind {
    /// All six members, in catalog order.
    pub const ALL: [AutocorrelationKind; 6] = [
        AutocorrelationKind::Ats,
        AutocorrelationKind::Aats,
        AutocorrelationKind::Atsc,
        AutocorrelationKind::Aatsc,
        AutocorrelationKind::Mats,
        AutocorrelationKind::Gats,
    ];

    /// Symbol used as display-name prefix.
    pub fn name(self) -> &'static str {
        match self {
            AutocorrelationKind::Ats => "ATS",
            AutocorrelationKind::Aats => "AATS",
            AutocorrelationKind::Atsc => "ATSC",
            AutocorrelationKind::Aatsc => "AATSC",
            AutocorrelationKind::Mats => "MATS",
            AutocorrelationKind::Gats => "GATS",
        }
    }

    /// Smallest valid order. Moran and Geary coefficients are undefined at 0.
    pub fn min_order(self) -> u32 {
        match self {
            AutocorrelationKind::Mats | AutocorrelationKind::Gats => 1,
            _ => 0,
        }
    }

    /// Property classes enumerated by the presets.
    pub fn property_filter(self) -> PropertyFilter {
        match self {
            AutocorrelationKind::Ats | AutocorrelationKind::Aats => PropertyFilter {
                istate: true,
                ..Default::default()
            },
            _ => PropertyFilter {
                charge: true,
                istate: true,
                ..Default::default()
            },
        }
    }

    /// One node per (property, order) pair, properties outermost.
    pub fn presets(self) -> Vec<DescriptorRef> {
        self.presets_with(MAX_DISTANCE, None)
    }

    /// Presets with orders capped at `max_order` and properties restricted to
    /// `properties` when given.
    pub fn presets_with(
        self,
        max_order: u32,
        properties: Option<&[PropertyKey]>,
    ) -> Vec<DescriptorRef> {
        let max_order = max_order.min(MAX_DISTANCE);
        get_properties(self.property_filter())
            .into_iter()
            .filter(|p| properties.map_or(true, |allowed| allowed.contains(p)))
            .flat_map(|property| {
                (self.min_order()..=max_order).map(move |order| {
                    Arc::new(Autocorrelation {
                        kind: self,
                        order,
                        property: property.clone(),
                    }) as DescriptorRef
                })
            })
            .collect()
    }
}

impl fmt::Display for AutocorrelationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One autocorrelation descriptor: kind, order and property.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Autocorrelation {
    kind: AutocorrelationKind,
    order: u32,
    property: PropertyKey,
}

impl Autocorrelation {
    /// # Errors
    ///
    /// `UnknownProperty` for an unregistered selector, `OrderOutOfRange` for an
    /// order outside the kind's range.
    pub fn new(kind: AutocorrelationKind, order: u32, property: &str) -> Result<Self, DescriptorError> {
        Self::from_key(kind, order, PropertyKey::new(property)?)
    }

    /// Like [`Autocorrelation::new`] with an already validated key.
    pub fn from_key(
        kind: AutocorrelationKind,
        order: u32,
        property: PropertyKey,
    ) -> Result<Self, DescriptorError> {
        if !(kind.min_order()..=MAX_DISTANCE).contains(&order) {
            return Err(DescriptorError::OrderOutOfRange {
                family: kind.name().to_string(),
                order,
                min: kind.min_order(),
                max: MAX_DISTANCE,
            });
        }
        Ok(Autocorrelation {
            kind,
            order,
            property,
        })
    }

    /// Moreau-Broto autocorrelation.
    pub fn ats(order: u32, property: &str) -> Result<Self, DescriptorError> {
        Self::new(AutocorrelationKind::Ats, order, property)
    }

    /// Averaged ATS.
    pub fn aats(order: u32, property: &str) -> Result<Self, DescriptorError> {
        Self::new(AutocorrelationKind::Aats, order, property)
    }

    /// Centered ATS.
    pub fn atsc(order: u32, property: &str) -> Result<Self, DescriptorError> {
        Self::new(AutocorrelationKind::Atsc, order, property)
    }

    /// Averaged centered ATS.
    pub fn aatsc(order: u32, property: &str) -> Result<Self, DescriptorError> {
        Self::new(AutocorrelationKind::Aatsc, order, property)
    }

    /// Moran coefficient.
    pub fn mats(order: u32, property: &str) -> Result<Self, DescriptorError> {
        Self::new(AutocorrelationKind::Mats, order, property)
    }

    /// Geary coefficient.
    pub fn gats(order: u32, property: &str) -> Result<Self, DescriptorError> {
        Self::new(AutocorrelationKind::Gats, order, property)
    }

    /// Member of the family.
    pub fn kind(&self) -> AutocorrelationKind {
        self.kind
    }

    /// Topological lag k.
    pub fn order(&self) -> u32 {
        self.order
    }

    /// Property selector weighting the atoms.
    pub fn property(&self) -> &PropertyKey {
        &self.property
    }

    // Sibling nodes share order and property; only the kind changes.
    fn sibling(&self, kind: AutocorrelationKind) -> Autocorrelation {
        Autocorrelation {
            kind,
            order: self.order,
            property: self.property.clone(),
        }
    }

    fn avec(&self) -> PropertyVector {
        PropertyVector::new(true, self.property.clone())
    }

    fn cavec(&self) -> CenteredPropertyVector {
        CenteredPropertyVector::new(true, self.property.clone())
    }

    fn gmat(&self) -> AdjacencyMatrix {
        AdjacencyMatrix::new(true, self.order)
    }

    fn gsum(&self) -> PairCount {
        PairCount::new(true, self.order)
    }
}

impl fmt::Display for Autocorrelation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.kind, self.order, self.property)
    }
}

/// Σw² at order 0, ½·wᵀBw otherwise. NaN entries propagate through the product.
fn autocorrelation(order: u32, w: &Array1<f64>, deps: &Resolved) -> Result<f64, DescriptorError> {
    if order == 0 {
        return Ok(w.dot(w));
    }
    let b: Array2<f64> = deps.mask("gmat")?.mapv(|x| if x { 1.0 } else { 0.0 });
    Ok(0.5 * w.dot(&b.dot(w)))
}

impl Descriptor for Autocorrelation {
    fn id(&self) -> NodeId {
        NodeId::Autocorrelation {
            kind: self.kind,
            order: self.order,
            property: self.property.clone(),
        }
    }

    fn explicit_hydrogens(&self) -> bool {
        true
    }

    fn dependencies(&self, _mol: &Molecule) -> Dependencies {
        use AutocorrelationKind::*;
        let deps = Dependencies::new();
        match self.kind {
            Ats | Atsc => {
                let deps = if self.kind == Ats {
                    deps.with("avec", self.avec())
                } else {
                    deps.with("cavec", self.cavec())
                };
                if self.order == 0 {
                    deps
                } else {
                    deps.with("gmat", self.gmat())
                }
            }
            Aats => deps.with("ATS", self.sibling(Ats)).with("gsum", self.gsum()),
            Aatsc => deps.with("ATSC", self.sibling(Atsc)).with("gsum", self.gsum()),
            Mats => deps
                .with("avec", self.avec())
                .with("AATSC", self.sibling(Aatsc))
                .with("cavec", self.cavec()),
            Gats => deps
                .with("avec", self.avec())
                .with("gmat", self.gmat())
                .with("gsum", self.gsum())
                .with("cavec", self.cavec()),
        }
    }

    fn calculate(&self, _mol: &Molecule, deps: &Resolved) -> Result<Value, DescriptorError> {
        let value = match self.kind {
            AutocorrelationKind::Ats => autocorrelation(self.order, deps.vector("avec")?, deps)?,
            AutocorrelationKind::Atsc => autocorrelation(self.order, deps.vector("cavec")?, deps)?,
            AutocorrelationKind::Aats => safe_div(deps.scalar("ATS")?, deps.scalar("gsum")?),
            AutocorrelationKind::Aatsc => safe_div(deps.scalar("ATSC")?, deps.scalar("gsum")?),
            AutocorrelationKind::Mats => {
                let n = deps.vector("avec")?.len() as f64;
                let cavec = deps.vector("cavec")?;
                safe_div(n * deps.scalar("AATSC")?, cavec.dot(cavec))
            }
            AutocorrelationKind::Gats => {
                let avec = deps.vector("avec")?;
                let n = avec.len();
                if n <= 1 || avec.iter().any(|w| !w.is_finite()) {
                    f64::NAN
                } else {
                    let gmat = deps.mask("gmat")?;
                    let squared_diffs: f64 = gmat
                        .indexed_iter()
                        .filter(|(_, &linked)| linked)
                        .map(|((i, j), _)| (avec[i] - avec[j]).powi(2))
                        .sum();
                    let numerator = safe_div(squared_diffs, 4.0 * deps.scalar("gsum")?);
                    let cavec = deps.vector("cavec")?;
                    let denominator = cavec.dot(cavec) / (n - 1) as f64;
                    safe_div(numerator, denominator)
                }
            }
        };
        Ok(Value::Scalar(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{evaluate, Session};
    use crate::molecule::{BondOrder, MoleculeBuilder};
    use approx::assert_relative_eq;
    use std::collections::HashSet;

    const C: f64 = 12.011;
    const H: f64 = 1.008;

    fn ethane() -> Molecule {
        let mut b = MoleculeBuilder::new("ethane");
        let c1 = b.atom("C").unwrap();
        let c2 = b.atom("C").unwrap();
        b.bond(c1, c2, BondOrder::Single).unwrap();
        b.build()
    }

    fn lone_carbon() -> Molecule {
        let mut b = MoleculeBuilder::new("atomic carbon");
        b.atom_with_hydrogens("C", 0, 0).unwrap();
        b.build()
    }

    #[test]
    fn order_zero_is_sum_of_squares() {
        let mol = ethane();
        let mut session = Session::new(&mol);
        let ats0 = session.evaluate(&Autocorrelation::ats(0, "m").unwrap()).unwrap();
        assert_relative_eq!(ats0, 2.0 * C * C + 6.0 * H * H, epsilon = 1e-9);
        // no distance matrix behind order 0
        let dmat = NodeId::DistanceMatrix {
            explicit_hydrogens: true,
        };
        assert!(session.cached(&dmat).is_none());
    }

    #[test]
    fn ats_and_aats_on_ethane() {
        let mol = ethane();
        // pairs at distance 1: one C-C and six C-H
        let ats1 = evaluate(&Autocorrelation::ats(1, "m").unwrap(), &mol).unwrap();
        assert_relative_eq!(ats1, C * C + 6.0 * C * H, epsilon = 1e-9);
        let aats1 = evaluate(&Autocorrelation::aats(1, "m").unwrap(), &mol).unwrap();
        assert_relative_eq!(aats1, ats1 / 7.0, epsilon = 1e-9);
        // pairs at distance 3: nine H-C-C-H paths
        let ats3 = evaluate(&Autocorrelation::ats(3, "m").unwrap(), &mol).unwrap();
        assert_relative_eq!(ats3, 9.0 * H * H, epsilon = 1e-9);
    }

    #[test]
    fn averaged_forms_are_nan_without_pairs() {
        let mol = ethane();
        for node in [
            Autocorrelation::aats(8, "m").unwrap(),
            Autocorrelation::aatsc(8, "m").unwrap(),
            Autocorrelation::gats(8, "m").unwrap(),
        ] {
            let value = evaluate(&node, &mol).unwrap();
            assert!(value.is_nan(), "{node} = {value}");
        }
        assert_eq!(evaluate(&Autocorrelation::ats(8, "m").unwrap(), &mol).unwrap(), 0.0);
    }

    #[test]
    fn centered_order_zero_is_variance_sum() {
        let mol = ethane();
        let mean = (2.0 * C + 6.0 * H) / 8.0;
        let expected = 2.0 * (C - mean).powi(2) + 6.0 * (H - mean).powi(2);
        let atsc0 = evaluate(&Autocorrelation::atsc(0, "m").unwrap(), &mol).unwrap();
        assert_relative_eq!(atsc0, expected, epsilon = 1e-9);
        let aatsc0 = evaluate(&Autocorrelation::aatsc(0, "m").unwrap(), &mol).unwrap();
        assert_relative_eq!(aatsc0, expected / 8.0, epsilon = 1e-9);
    }

    #[test]
    fn mats_normalizes_aatsc() {
        let mol = ethane();
        let mut session = Session::new(&mol);
        let aatsc = session.evaluate(&Autocorrelation::aatsc(1, "m").unwrap()).unwrap();
        let atsc0 = session.evaluate(&Autocorrelation::atsc(0, "m").unwrap()).unwrap();
        let mats = session.evaluate(&Autocorrelation::mats(1, "m").unwrap()).unwrap();
        assert_relative_eq!(mats, 8.0 * aatsc / atsc0, epsilon = 1e-12);
    }

    #[test]
    fn gats_on_ethane() {
        let mol = ethane();
        // only the six C-H pairs differ at distance 1, each counted twice
        let mean = (2.0 * C + 6.0 * H) / 8.0;
        let numerator = 12.0 * (C - H).powi(2) / (4.0 * 7.0);
        let denominator = (2.0 * (C - mean).powi(2) + 6.0 * (H - mean).powi(2)) / 7.0;
        let gats1 = evaluate(&Autocorrelation::gats(1, "m").unwrap(), &mol).unwrap();
        assert_relative_eq!(gats1, numerator / denominator, epsilon = 1e-9);
    }

    #[test]
    fn single_atom_gives_nan_for_moran_and_geary() {
        let mol = lone_carbon();
        for property in ["m", "Z", "pe", "c"] {
            for order in 1..=MAX_DISTANCE {
                let gats = evaluate(&Autocorrelation::gats(order, property).unwrap(), &mol).unwrap();
                assert!(gats.is_nan(), "GATS{order}{property} = {gats}");
                let mats = evaluate(&Autocorrelation::mats(order, property).unwrap(), &mol).unwrap();
                assert!(mats.is_nan(), "MATS{order}{property} = {mats}");
            }
        }
    }

    #[test]
    fn constant_property_makes_moran_undefined() {
        // both atoms carry the same mass, so the centered vector is zero
        let mut b = MoleculeBuilder::new("dicarbon");
        let c1 = b.atom_with_hydrogens("C", 0, 0).unwrap();
        let c2 = b.atom_with_hydrogens("C", 0, 0).unwrap();
        b.bond(c1, c2, BondOrder::Triple).unwrap();
        let mol = b.build();
        assert!(evaluate(&Autocorrelation::mats(1, "m").unwrap(), &mol).unwrap().is_nan());
        assert!(evaluate(&Autocorrelation::gats(1, "m").unwrap(), &mol).unwrap().is_nan());
    }

    #[test]
    fn nan_property_propagates() {
        // intrinsic state is undefined for an atom without heavy neighbors
        let mol = ethane();
        let ats1 = evaluate(&Autocorrelation::ats(1, "s").unwrap(), &mol).unwrap();
        assert!(ats1.is_finite());

        let methane = {
            let mut b = MoleculeBuilder::new("methane");
            b.atom("C").unwrap();
            b.build()
        };
        let ats1 = evaluate(&Autocorrelation::ats(1, "s").unwrap(), &methane).unwrap();
        assert!(ats1.is_nan());
        let gats1 = evaluate(&Autocorrelation::gats(1, "s").unwrap(), &methane).unwrap();
        assert!(gats1.is_nan());
    }

    #[test]
    fn order_ranges_are_enforced() {
        assert!(Autocorrelation::ats(0, "m").is_ok());
        assert!(Autocorrelation::ats(MAX_DISTANCE, "m").is_ok());
        for err in [
            Autocorrelation::ats(MAX_DISTANCE + 1, "m"),
            Autocorrelation::mats(0, "m"),
            Autocorrelation::gats(0, "m"),
        ] {
            assert!(matches!(err, Err(DescriptorError::OrderOutOfRange { .. })));
        }
        assert!(matches!(
            Autocorrelation::ats(1, "mass"),
            Err(DescriptorError::UnknownProperty(_))
        ));
    }

    #[test]
    fn display_names() {
        assert_eq!(Autocorrelation::ats(3, "m").unwrap().to_string(), "ATS3m");
        assert_eq!(Autocorrelation::atsc(3, "c").unwrap().to_string(), "ATSC3c");
        assert_eq!(Autocorrelation::gats(8, "are").unwrap().to_string(), "GATS8are");
    }

    #[test]
    fn preset_counts() {
        let istate = get_properties(AutocorrelationKind::Ats.property_filter()).len();
        let charge_istate = get_properties(AutocorrelationKind::Mats.property_filter()).len();
        let orders = MAX_DISTANCE as usize;
        assert_eq!(AutocorrelationKind::Ats.presets().len(), (orders + 1) * istate);
        assert_eq!(AutocorrelationKind::Aats.presets().len(), (orders + 1) * istate);
        assert_eq!(AutocorrelationKind::Atsc.presets().len(), (orders + 1) * charge_istate);
        assert_eq!(AutocorrelationKind::Aatsc.presets().len(), (orders + 1) * charge_istate);
        assert_eq!(AutocorrelationKind::Mats.presets().len(), orders * charge_istate);
        assert_eq!(AutocorrelationKind::Gats.presets().len(), orders * charge_istate);
    }

    #[test]
    fn ats_presets_are_distinct_and_evaluable() {
        let mol = ethane();
        let presets = AutocorrelationKind::Ats.presets();
        let ids: HashSet<NodeId> = presets.iter().map(|d| d.id()).collect();
        assert_eq!(ids.len(), presets.len());
        assert_eq!(presets[0].to_string(), "ATS0d");
        assert_eq!(presets[1].to_string(), "ATS1d");

        let mut session = Session::new(&mol);
        for node in &presets {
            session.evaluate(node.as_ref()).unwrap();
        }
        let dmat = NodeId::DistanceMatrix {
            explicit_hydrogens: true,
        };
        assert_eq!(session.stats().calculations(&dmat), 1);
    }

    #[test]
    fn restricted_presets() {
        let m = PropertyKey::new("m").unwrap();
        let presets = AutocorrelationKind::Mats.presets_with(3, Some(std::slice::from_ref(&m)));
        let names: Vec<String> = presets.iter().map(|d| d.to_string()).collect();
        assert_eq!(names, vec!["MATS1m", "MATS2m", "MATS3m"]);
        // caps above the maximum distance are clamped
        assert_eq!(
            AutocorrelationKind::Ats.presets_with(100, None).len(),
            AutocorrelationKind::Ats.presets().len()
        );
    }

    #[test]
    fn shared_intermediates_are_calculated_once() {
        let mol = ethane();
        let mut session = Session::new(&mol);
        for kind in AutocorrelationKind::ALL {
            session
                .evaluate(&Autocorrelation::new(kind, 2, "pe").unwrap())
                .unwrap();
        }
        let stats = session.stats();
        let key = PropertyKey::new("pe").unwrap();
        for id in [
            NodeId::PropertyVector {
                explicit_hydrogens: true,
                property: key.clone(),
            },
            NodeId::CenteredPropertyVector {
                explicit_hydrogens: true,
                property: key,
            },
            NodeId::AdjacencyMatrix {
                explicit_hydrogens: true,
                order: 2,
            },
            NodeId::PairCount {
                explicit_hydrogens: true,
                order: 2,
            },
        ] {
            assert_eq!(stats.calculations(&id), 1, "{id:?}");
        }
        // six descriptors, two vectors, distance matrix, order-2 matrix, pair count
        assert_eq!(stats.total_calculations(), 11);
    }
}
