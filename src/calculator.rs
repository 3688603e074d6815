// src/calculator.rs
//! Batch descriptor computation.
//!
//! A [`Calculator`] holds an ordered, duplicate-free list of scalar
//! descriptors. Each molecule gets its own [`Session`], so intermediates are
//! shared between the descriptors of one molecule and never across molecules.
//! [`Calculator::map`] fans molecules out over the rayon thread pool and
//! assembles an `n_molecules × n_descriptors` table.
//!
//! ```
//! use qsar_descriptors::calculator::Calculator;
//! use qsar_descriptors::descriptors::Family;
//! use qsar_descriptors::molecule::{BondOrder, MoleculeBuilder};
//!
//! let mut b = MoleculeBuilder::new("propane");
//! let c: Vec<usize> = (0..3).map(|_| b.atom("C")).collect::<Result<_, _>>()?;
//! b.bond(c[0], c[1], BondOrder::Single)?;
//! b.bond(c[1], c[2], BondOrder::Single)?;
//! let propane = b.build();
//!
//! let mut calc = Calculator::new();
//! calc.register_family(Family::Abc);
//! calc.register_family(Family::Ats);
//! let table = calc.map(&[propane])?;
//! assert_eq!(table.shape(), &[1, calc.len()]);
//! assert_eq!(calc.names()[0], "ABC");
//! # Ok::<(), qsar_descriptors::DescriptorError>(())
//! ```

use std::collections::HashSet;
use std::sync::Arc;

use ndarray::Array2;
use rayon::prelude::*;
use tracing::{debug, info};

use crate::config::CalculatorConfig;
use crate::descriptors::{DescriptorError, Family};
use crate::engine::{Descriptor, DescriptorRef, NodeId, Session, ValueKind};
use crate::molecule::Molecule;

/// Ordered set of descriptors evaluated together.
#[derive(Debug, Clone)]
pub struct Calculator {
    descriptors: Vec<DescriptorRef>,
    seen: HashSet<NodeId>,
    parallel: bool,
}

impl Default for Calculator {
    fn default() -> Self {
        Self::new()
    }
}

impl Calculator {
    /// An empty calculator that evaluates in parallel.
    pub fn new() -> Self {
        Calculator {
            descriptors: Vec::new(),
            seen: HashSet::new(),
            parallel: true,
        }
    }

    /// Calculator with the families, order cap and property whitelist of
    /// `config`.
    pub fn from_config(config: &CalculatorConfig) -> Result<Self, DescriptorError> {
        config.validate()?;
        let properties = config.property_keys()?;
        let mut calc = Calculator::new().parallel(config.parallel);
        for family in &config.families {
            for node in family.presets_with(config.max_order(), properties.as_deref()) {
                calc.register_ref(node)?;
            }
        }
        info!(
            descriptors = calc.len(),
            families = config.families.len(),
            "calculator configured"
        );
        Ok(calc)
    }

    /// Evaluate batches on the rayon thread pool (`true`) or sequentially.
    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Add one descriptor. Returns `false` if an equal node is already present.
    pub fn register<D: Descriptor + 'static>(&mut self, node: D) -> Result<bool, DescriptorError> {
        self.register_ref(Arc::new(node))
    }

    /// # Errors
    ///
    /// `ValueKindMismatch` for nodes that do not produce a scalar.
    pub fn register_ref(&mut self, node: DescriptorRef) -> Result<bool, DescriptorError> {
        if node.result_kind() != ValueKind::Scalar {
            return Err(DescriptorError::ValueKindMismatch {
                node: node.to_string(),
                expected: ValueKind::Scalar,
                found: node.result_kind(),
            });
        }
        if !self.seen.insert(node.id()) {
            debug!(node = %node, "already registered");
            return Ok(false);
        }
        self.descriptors.push(node);
        Ok(true)
    }

    /// Add every preset of `family`. Returns how many were new.
    pub fn register_family(&mut self, family: Family) -> usize {
        let mut added = 0;
        for node in family.presets() {
            if self.seen.insert(node.id()) {
                self.descriptors.push(node);
                added += 1;
            }
        }
        added
    }

    /// Registered descriptors, in column order.
    pub fn descriptors(&self) -> &[DescriptorRef] {
        &self.descriptors
    }

    /// Display names, in column order.
    pub fn names(&self) -> Vec<String> {
        self.descriptors.iter().map(|d| d.to_string()).collect()
    }

    /// Number of registered descriptors.
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    /// Whether no descriptor is registered.
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Every registered descriptor for one molecule, in registration order.
    pub fn calculate(&self, mol: &Molecule) -> Result<Vec<f64>, DescriptorError> {
        let mut session = Session::new(mol);
        let row = self
            .descriptors
            .iter()
            .map(|node| session.evaluate(node.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        debug!(
            molecule = mol.name(),
            calculated = session.stats().total_calculations(),
            cache_hits = session.stats().cache_hits(),
            "molecule done"
        );
        Ok(row)
    }

    /// Descriptor table with one row per molecule.
    ///
    /// The first configuration error aborts the whole batch; numeric
    /// degeneracies are `NaN` cells.
    pub fn map(&self, molecules: &[Molecule]) -> Result<Array2<f64>, DescriptorError> {
        let rows: Vec<Vec<f64>> = if self.parallel {
            molecules
                .par_iter()
                .map(|mol| self.calculate(mol))
                .collect::<Result<_, _>>()?
        } else {
            molecules
                .iter()
                .map(|mol| self.calculate(mol))
                .collect::<Result<_, _>>()?
        };

        let (n_rows, n_cols) = (rows.len(), self.len());
        let mut flat = Vec::with_capacity(n_rows * n_cols);
        for row in &rows {
            flat.extend_from_slice(row);
        }
        info!(
            molecules = n_rows,
            descriptors = n_cols,
            parallel = self.parallel,
            "batch calculated"
        );
        Ok(Array2::from_shape_vec((n_rows, n_cols), flat)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptors::{AbcIndex, Autocorrelation};
    use crate::graph_matrix::DistanceMatrix;
    use crate::molecule::{BondOrder, MoleculeBuilder};

    fn chain(n: usize) -> Molecule {
        let mut b = MoleculeBuilder::new(format!("C{n}"));
        let atoms: Vec<usize> = (0..n).map(|_| b.atom("C").unwrap()).collect();
        for w in atoms.windows(2) {
            b.bond(w[0], w[1], BondOrder::Single).unwrap();
        }
        b.build()
    }

    #[test]
    fn duplicates_are_ignored() {
        let mut calc = Calculator::new();
        assert!(calc.register(AbcIndex).unwrap());
        assert!(!calc.register(AbcIndex).unwrap());
        assert!(calc.register(Autocorrelation::ats(1, "m").unwrap()).unwrap());
        assert!(!calc.register(Autocorrelation::ats(1, "m").unwrap()).unwrap());
        assert_eq!(calc.len(), 2);
        assert_eq!(calc.register_family(Family::Abc), 0);
        assert_eq!(calc.register_family(Family::AbcGg), 1);
        assert_eq!(calc.names(), vec!["ABC", "ATS1m", "ABCGG"]);
    }

    #[test]
    fn non_scalar_nodes_are_rejected() {
        let mut calc = Calculator::new();
        let err = calc.register(DistanceMatrix::new(false)).unwrap_err();
        assert!(matches!(err, DescriptorError::ValueKindMismatch { .. }));
        assert!(calc.is_empty());
    }

    #[test]
    fn parallel_and_sequential_tables_agree() {
        let molecules: Vec<Molecule> = (1..=6).map(chain).collect();
        let mut calc = Calculator::new();
        calc.register_family(Family::Abc);
        calc.register_family(Family::Aats);

        let parallel = calc.map(&molecules).unwrap();
        let sequential = calc.clone().parallel(false).map(&molecules).unwrap();
        assert_eq!(parallel.shape(), &[6, calc.len()]);
        for (a, b) in parallel.iter().zip(sequential.iter()) {
            assert!(a == b || (a.is_nan() && b.is_nan()));
        }
        for (i, mol) in molecules.iter().enumerate() {
            let row = calc.calculate(mol).unwrap();
            for (a, b) in parallel.row(i).iter().zip(&row) {
                assert!(a == b || (a.is_nan() && b.is_nan()));
            }
        }
    }

    #[test]
    fn from_config_restricts_presets() {
        let config = CalculatorConfig::from_json(
            r#"{"families": ["ABCGG", "ATSC", "GATS"], "max_order": 2, "properties": ["m"]}"#,
        )
        .unwrap();
        let calc = Calculator::from_config(&config).unwrap();
        assert_eq!(
            calc.names(),
            vec!["ABCGG", "ATSC0m", "ATSC1m", "ATSC2m", "GATS1m", "GATS2m"]
        );
    }

    #[test]
    fn empty_batch_has_no_rows() {
        let mut calc = Calculator::new();
        calc.register_family(Family::Abc);
        let table = calc.map(&[]).unwrap();
        assert_eq!(table.shape(), &[0, 1]);
    }
}
