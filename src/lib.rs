#![warn(missing_docs)]
//! qsar-descriptors: a memoized molecular descriptor engine for QSAR.
//!
//! Descriptors are nodes in a dependency graph. Each node names the
//! intermediates it needs (distance matrix, order-k adjacency, property
//! vectors, other descriptors) and a formula over them; a per-molecule
//! [`engine::Session`] resolves the graph and calculates every distinct node
//! once.
//!
//! - **molecule**, **element**: a small molecular graph with implicit hydrogens
//! - **properties**: atomic property registry and property-vector nodes
//! - **graph_matrix**: distance matrix, order-k adjacency, pair counts
//! - **engine**: node contract, identities, sessions and caching
//! - **descriptors**: ABC, ABCGG and the ATS/AATS/ATSC/AATSC/MATS/GATS family
//! - **calculator**, **config**: batch evaluation into an `ndarray` table
//!
//! Undefined numeric results (empty pair sets, zero variance, NaN properties)
//! are `NaN`. Only misconfiguration is an error.
//!
//! # Quick examples
//!
//! ### One descriptor
//! ```
//! use qsar_descriptors::{evaluate, AbcIndex, BondOrder, MoleculeBuilder};
//!
//! let mut b = MoleculeBuilder::new("propane");
//! let c1 = b.atom("C")?;
//! let c2 = b.atom("C")?;
//! let c3 = b.atom("C")?;
//! b.bond(c1, c2, BondOrder::Single)?;
//! b.bond(c2, c3, BondOrder::Single)?;
//! let propane = b.build();
//!
//! let abc = evaluate(&AbcIndex, &propane)?;
//! assert!((abc - 2.0_f64.sqrt()).abs() < 1e-12);
//! # Ok::<(), qsar_descriptors::DescriptorError>(())
//! ```
//!
//! ### Every preset over a batch
//! ```
//! use qsar_descriptors::{BondOrder, Calculator, CalculatorConfig, MoleculeBuilder};
//!
//! let mut b = MoleculeBuilder::new("methanol");
//! let c = b.atom("C")?;
//! let o = b.atom("O")?;
//! b.bond(c, o, BondOrder::Single)?;
//! let methanol = b.build();
//!
//! let calc = Calculator::from_config(&CalculatorConfig::default())?;
//! let table = calc.map(std::slice::from_ref(&methanol))?;
//! assert_eq!(table.ncols(), calc.names().len());
//! # Ok::<(), qsar_descriptors::DescriptorError>(())
//! ```

pub mod calculator;
pub mod charge;
pub mod config;
pub mod descriptors;
pub mod element;
pub mod engine;
pub mod graph_matrix;
pub mod molecule;
pub mod properties;

// ─────────────────────────────────────────────────────────────────────────────
// Convenience re-exports
// ─────────────────────────────────────────────────────────────────────────────
pub use calculator::Calculator;
pub use config::CalculatorConfig;
pub use descriptors::{
    AbcGgIndex, AbcIndex, Autocorrelation, AutocorrelationKind, DescriptorError, Family,
};
pub use engine::{evaluate, Descriptor, DescriptorRef, NodeId, Session, Value};
pub use molecule::{BondOrder, Molecule, MoleculeBuilder};
pub use properties::{get_properties, PropertyFilter, PropertyKey};
