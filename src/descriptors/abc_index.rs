// src/descriptors/abc_index.rs
//! Atom-bond connectivity indices.
//!
//! | Index | Per-bond term                          | Needs            |
//! |-------|----------------------------------------|------------------|
//! | ABC   | √((dᵤ + dᵥ − 2) / (dᵤ·dᵥ)), d = degree | bonds only       |
//! | ABCGG | √((nᵤ + nᵥ − 2) / (nᵤ·nᵥ))             | distance matrix  |
//!
//! For ABCGG, nᵤ counts the atoms strictly closer to u than to v. Both indices
//! are computed on the hydrogen-suppressed graph.
//!
//! ```
//! use qsar_descriptors::descriptors::{AbcGgIndex, AbcIndex};
//! use qsar_descriptors::engine::evaluate;
//! use qsar_descriptors::molecule::{BondOrder, MoleculeBuilder};
//! use approx::assert_relative_eq;
//!
//! let mut b = MoleculeBuilder::new("benzene");
//! let ring: Vec<usize> = (0..6).map(|_| b.aromatic_atom("C")).collect::<Result<_, _>>()?;
//! for i in 0..6 {
//!     b.bond(ring[i], ring[(i + 1) % 6], BondOrder::Aromatic)?;
//! }
//! let benzene = b.build();
//!
//! assert_relative_eq!(evaluate(&AbcIndex, &benzene)?, 6.0 * 0.5_f64.sqrt(), epsilon = 1e-12);
//! assert_relative_eq!(evaluate(&AbcGgIndex, &benzene)?, 4.0, epsilon = 1e-12);
//! # Ok::<(), qsar_descriptors::DescriptorError>(())
//! ```

use std::fmt;

use super::DescriptorError;
use crate::engine::{Dependencies, Descriptor, NodeId, Resolved, Value};
use crate::graph_matrix::DistanceMatrix;
use crate::molecule::Molecule;

fn connectivity_term(a: f64, b: f64) -> f64 {
    ((a + b - 2.0) / (a * b)).sqrt()
}

/// Atom-bond connectivity index (Estrada).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct AbcIndex;

impl fmt::Display for AbcIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ABC")
    }
}

impl Descriptor for AbcIndex {
    fn id(&self) -> NodeId {
        NodeId::AbcIndex
    }

    fn explicit_hydrogens(&self) -> bool {
        false
    }

    fn calculate(&self, mol: &Molecule, _deps: &Resolved) -> Result<Value, DescriptorError> {
        let total = mol
            .bonds()
            .iter()
            .map(|bond| {
                connectivity_term(mol.degree(bond.begin) as f64, mol.degree(bond.end) as f64)
            })
            .fold(0.0, |acc, term| acc + term);
        Ok(Value::Scalar(total))
    }
}

/// Graovac-Ghorbani atom-bond connectivity index.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct AbcGgIndex;

impl fmt::Display for AbcGgIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ABCGG")
    }
}

impl Descriptor for AbcGgIndex {
    fn id(&self) -> NodeId {
        NodeId::AbcGgIndex
    }

    fn explicit_hydrogens(&self) -> bool {
        false
    }

    fn dependencies(&self, _mol: &Molecule) -> Dependencies {
        Dependencies::new().with("D", DistanceMatrix::new(false))
    }

    fn calculate(&self, mol: &Molecule, deps: &Resolved) -> Result<Value, DescriptorError> {
        let d = deps.distances("D")?;
        let total = mol
            .bonds()
            .iter()
            .map(|bond| {
                let (u, v) = (d.row(bond.begin), d.row(bond.end));
                let nu = u.iter().zip(v.iter()).filter(|(a, b)| a < b).count();
                let nv = u.iter().zip(v.iter()).filter(|(a, b)| b < a).count();
                connectivity_term(nu as f64, nv as f64)
            })
            .fold(0.0, |acc, term| acc + term);
        Ok(Value::Scalar(total))
    }
}
