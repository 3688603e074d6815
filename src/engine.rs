// src/engine.rs
//! Descriptor dependency-graph evaluation.
//!
//! A descriptor is a node that declares named dependencies (other nodes) and a
//! formula over their resolved values. A [`Session`] evaluates nodes for one
//! molecule: it walks dependencies depth-first, calculates each distinct
//! [`NodeId`] once, and hands the cached value to every node that asks for it.
//! Two ATS descriptors of different order over the same property therefore
//! share one property vector and one distance matrix.
//!
//! ```
//! use qsar_descriptors::descriptors::Autocorrelation;
//! use qsar_descriptors::engine::Session;
//! use qsar_descriptors::molecule::{BondOrder, MoleculeBuilder};
//!
//! let mut b = MoleculeBuilder::new("ethane");
//! let c1 = b.atom("C")?;
//! let c2 = b.atom("C")?;
//! b.bond(c1, c2, BondOrder::Single)?;
//! let mol = b.build();
//!
//! let mut session = Session::new(&mol);
//! let ats1 = session.evaluate(&Autocorrelation::ats(1, "m")?)?;
//! let ats2 = session.evaluate(&Autocorrelation::ats(2, "m")?)?;
//! assert!(ats1 > 0.0 && ats2 > 0.0);
//! # Ok::<(), qsar_descriptors::DescriptorError>(())
//! ```

use std::cell::OnceCell;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::descriptors::{
    AbcGgIndex, AbcIndex, Autocorrelation, AutocorrelationKind, DescriptorError,
};
use crate::graph_matrix::{AdjacencyMatrix, DistanceMatrix, PairCount};
use crate::molecule::Molecule;
use crate::properties::{CenteredPropertyVector, PropertyKey, PropertyVector};

/// Shared handle to a descriptor node.
pub type DescriptorRef = Arc<dyn Descriptor>;

// ─────────────────────────────────────────────────────────────────────────────
// Values
// ─────────────────────────────────────────────────────────────────────────────

/// Result of evaluating a node.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Real scalar; `NaN` is a valid value.
    Scalar(f64),
    /// Per-atom vector.
    Vector(Array1<f64>),
    /// Topological distance matrix, `DISCONNECTED` for unreachable pairs.
    Distances(Array2<u32>),
    /// Boolean atom-pair matrix.
    Mask(Array2<bool>),
}

impl Value {
    /// Discriminant of this value.
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Scalar(_) => ValueKind::Scalar,
            Value::Vector(_) => ValueKind::Vector,
            Value::Distances(_) => ValueKind::Distances,
            Value::Mask(_) => ValueKind::Mask,
        }
    }

    /// The scalar, if this is one.
    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            Value::Scalar(v) => Some(*v),
            _ => None,
        }
    }
}

/// Discriminant of [`Value`], declared by every node as its result type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueKind {
    /// [`Value::Scalar`]
    Scalar,
    /// [`Value::Vector`]
    Vector,
    /// [`Value::Distances`]
    Distances,
    /// [`Value::Mask`]
    Mask,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueKind::Scalar => "scalar",
            ValueKind::Vector => "vector",
            ValueKind::Distances => "distance matrix",
            ValueKind::Mask => "mask",
        };
        f.write_str(name)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Node identity
// ─────────────────────────────────────────────────────────────────────────────

/// Structural identity of a node: its kind plus its construction parameters.
///
/// Equal ids are interchangeable nodes and share one cached value per
/// molecule. The id is also enough to rebuild the node
/// ([`NodeId::instantiate`]), and serializes so node lists can cross process
/// boundaries. Display names are a separate projection (`Display` on the
/// node) and play no part in equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "node")]
pub enum NodeId {
    /// [`DistanceMatrix`]
    DistanceMatrix {
        /// Hydrogen view.
        explicit_hydrogens: bool,
    },
    /// [`AdjacencyMatrix`]
    AdjacencyMatrix {
        /// Hydrogen view.
        explicit_hydrogens: bool,
        /// Distance k.
        order: u32,
    },
    /// [`PairCount`]
    PairCount {
        /// Hydrogen view.
        explicit_hydrogens: bool,
        /// Distance k.
        order: u32,
    },
    /// [`PropertyVector`]
    PropertyVector {
        /// Hydrogen view.
        explicit_hydrogens: bool,
        /// Atomic property.
        property: PropertyKey,
    },
    /// [`CenteredPropertyVector`]
    CenteredPropertyVector {
        /// Hydrogen view.
        explicit_hydrogens: bool,
        /// Atomic property.
        property: PropertyKey,
    },
    /// [`AbcIndex`]
    AbcIndex,
    /// [`AbcGgIndex`]
    AbcGgIndex,
    /// [`Autocorrelation`]
    Autocorrelation {
        /// Family member.
        kind: AutocorrelationKind,
        /// Lag k.
        order: u32,
        /// Weighting property.
        property: PropertyKey,
    },
}

impl NodeId {
    /// Rebuild the node this id describes, re-validating its parameters.
    pub fn instantiate(&self) -> Result<DescriptorRef, DescriptorError> {
        let node: DescriptorRef = match self {
            NodeId::DistanceMatrix { explicit_hydrogens } => {
                Arc::new(DistanceMatrix::new(*explicit_hydrogens))
            }
            NodeId::AdjacencyMatrix {
                explicit_hydrogens,
                order,
            } => Arc::new(AdjacencyMatrix::new(*explicit_hydrogens, *order)),
            NodeId::PairCount {
                explicit_hydrogens,
                order,
            } => Arc::new(PairCount::new(*explicit_hydrogens, *order)),
            NodeId::PropertyVector {
                explicit_hydrogens,
                property,
            } => Arc::new(PropertyVector::new(*explicit_hydrogens, property.clone())),
            NodeId::CenteredPropertyVector {
                explicit_hydrogens,
                property,
            } => Arc::new(CenteredPropertyVector::new(
                *explicit_hydrogens,
                property.clone(),
            )),
            NodeId::AbcIndex => Arc::new(AbcIndex),
            NodeId::AbcGgIndex => Arc::new(AbcGgIndex),
            NodeId::Autocorrelation {
                kind,
                order,
                property,
            } => Arc::new(Autocorrelation::from_key(*kind, *order, property.clone())?),
        };
        Ok(node)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Node contract
// ─────────────────────────────────────────────────────────────────────────────

/// A computable quantity: identity, dependencies and formula.
///
/// Implementations are immutable parameter holders. `calculate` must be a pure
/// function of the molecule and the resolved dependencies; all graph walking
/// and caching belongs to [`Session`].
pub trait Descriptor: fmt::Debug + fmt::Display + Send + Sync {
    /// Structural identity used as cache key and for equality.
    fn id(&self) -> NodeId;

    /// Whether this node works on the explicit-hydrogen view of the molecule.
    /// Every dependency must agree with its parent.
    fn explicit_hydrogens(&self) -> bool;

    /// Kind of value `calculate` returns.
    fn result_kind(&self) -> ValueKind {
        ValueKind::Scalar
    }

    /// Named nodes that must be resolved before `calculate`.
    fn dependencies(&self, _mol: &Molecule) -> Dependencies {
        Dependencies::new()
    }

    /// Evaluate the formula on `mol`, which is already in this node's
    /// hydrogen view, with every declared dependency resolved.
    fn calculate(&self, mol: &Molecule, deps: &Resolved) -> Result<Value, DescriptorError>;
}

/// Named dependency declaration of one node.
#[derive(Debug, Clone, Default)]
pub struct Dependencies {
    entries: Vec<(&'static str, DescriptorRef)>,
}

impl Dependencies {
    /// Empty declaration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare `node` under `name`.
    pub fn with<D: Descriptor + 'static>(self, name: &'static str, node: D) -> Self {
        self.with_ref(name, Arc::new(node))
    }

    /// Declare an already shared node under `name`.
    pub fn with_ref(mut self, name: &'static str, node: DescriptorRef) -> Self {
        self.entries.push((name, node));
        self
    }

    /// Number of declared dependencies.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is declared.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Declared `(name, node)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &DescriptorRef)> {
        self.entries.iter().map(|(name, node)| (*name, node))
    }
}

/// Resolved dependency values handed to [`Descriptor::calculate`].
#[derive(Debug)]
pub struct Resolved {
    owner: String,
    values: HashMap<&'static str, Arc<Value>>,
}

impl Resolved {
    fn new(owner: String) -> Self {
        Resolved {
            owner,
            values: HashMap::new(),
        }
    }

    /// Resolved value of dependency `name`.
    pub fn get(&self, name: &str) -> Result<&Value, DescriptorError> {
        self.values
            .get(name)
            .map(|v| v.as_ref())
            .ok_or_else(|| DescriptorError::MissingDependency {
                node: self.owner.clone(),
                name: name.to_string(),
            })
    }

    /// Scalar dependency.
    pub fn scalar(&self, name: &str) -> Result<f64, DescriptorError> {
        match self.get(name)? {
            Value::Scalar(v) => Ok(*v),
            other => Err(self.mismatch(ValueKind::Scalar, other)),
        }
    }

    /// Per-atom vector dependency.
    pub fn vector(&self, name: &str) -> Result<&Array1<f64>, DescriptorError> {
        match self.get(name)? {
            Value::Vector(v) => Ok(v),
            other => Err(self.mismatch(ValueKind::Vector, other)),
        }
    }

    /// Distance-matrix dependency.
    pub fn distances(&self, name: &str) -> Result<&Array2<u32>, DescriptorError> {
        match self.get(name)? {
            Value::Distances(d) => Ok(d),
            other => Err(self.mismatch(ValueKind::Distances, other)),
        }
    }

    /// Boolean matrix dependency.
    pub fn mask(&self, name: &str) -> Result<&Array2<bool>, DescriptorError> {
        match self.get(name)? {
            Value::Mask(m) => Ok(m),
            other => Err(self.mismatch(ValueKind::Mask, other)),
        }
    }

    fn mismatch(&self, expected: ValueKind, found: &Value) -> DescriptorError {
        DescriptorError::ValueKindMismatch {
            node: self.owner.clone(),
            expected,
            found: found.kind(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Session
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug)]
enum Slot {
    InProgress,
    Done(Arc<Value>),
}

/// Counters for one session.
#[derive(Debug, Clone, Default)]
pub struct EvaluationStats {
    calculations: HashMap<NodeId, usize>,
    cache_hits: usize,
}

impl EvaluationStats {
    /// Times `calculate` ran for this id. At most 1 within a session.
    pub fn calculations(&self, id: &NodeId) -> usize {
        self.calculations.get(id).copied().unwrap_or(0)
    }

    /// Calculations across all ids.
    pub fn total_calculations(&self) -> usize {
        self.calculations.values().sum()
    }

    /// Resolutions answered from the cache.
    pub fn cache_hits(&self) -> usize {
        self.cache_hits
    }
}

/// Per-molecule evaluation context.
///
/// Holds the cache of resolved nodes and the lazily built hydrogen views of
/// the molecule. A session is single-threaded; evaluate many molecules in
/// parallel by giving each its own session.
#[derive(Debug)]
pub struct Session<'m> {
    molecule: &'m Molecule,
    explicit: OnceCell<Molecule>,
    suppressed: OnceCell<Molecule>,
    cache: HashMap<NodeId, Slot>,
    stats: EvaluationStats,
}

impl<'m> Session<'m> {
    /// Empty session for `molecule`.
    pub fn new(molecule: &'m Molecule) -> Self {
        Session {
            molecule,
            explicit: OnceCell::new(),
            suppressed: OnceCell::new(),
            cache: HashMap::new(),
            stats: EvaluationStats::default(),
        }
    }

    /// The molecule as given, before any hydrogen conversion.
    pub fn molecule(&self) -> &'m Molecule {
        self.molecule
    }

    /// The molecule as seen by nodes with the given hydrogen mode.
    pub fn view(&self, explicit_hydrogens: bool) -> &Molecule {
        if explicit_hydrogens {
            self.explicit
                .get_or_init(|| self.molecule.with_explicit_hydrogens())
        } else {
            self.suppressed
                .get_or_init(|| self.molecule.hydrogen_suppressed())
        }
    }

    /// Counters collected so far.
    pub fn stats(&self) -> &EvaluationStats {
        &self.stats
    }

    /// Cached value for an id, if it has been resolved in this session.
    pub fn cached(&self, id: &NodeId) -> Option<&Value> {
        match self.cache.get(id) {
            Some(Slot::Done(value)) => Some(value.as_ref()),
            _ => None,
        }
    }

    /// Evaluate a scalar descriptor.
    pub fn evaluate(&mut self, node: &dyn Descriptor) -> Result<f64, DescriptorError> {
        let value = self.resolve(node)?;
        value
            .as_scalar()
            .ok_or_else(|| DescriptorError::ValueKindMismatch {
                node: node.to_string(),
                expected: ValueKind::Scalar,
                found: value.kind(),
            })
    }

    /// Resolve any node, calculating it and its dependencies at most once.
    pub fn resolve(&mut self, node: &dyn Descriptor) -> Result<Arc<Value>, DescriptorError> {
        let id = node.id();
        match self.cache.get(&id) {
            Some(Slot::Done(value)) => {
                self.stats.cache_hits += 1;
                trace!(node = %node, "cache hit");
                return Ok(Arc::clone(value));
            }
            Some(Slot::InProgress) => {
                return Err(DescriptorError::CyclicDependency(node.to_string()));
            }
            None => {}
        }

        self.cache.insert(id.clone(), Slot::InProgress);
        match self.compute(node) {
            Ok(value) => {
                let value = Arc::new(value);
                *self.stats.calculations.entry(id.clone()).or_default() += 1;
                self.cache.insert(id, Slot::Done(Arc::clone(&value)));
                Ok(value)
            }
            Err(e) => {
                self.cache.remove(&id);
                Err(e)
            }
        }
    }

    fn compute(&mut self, node: &dyn Descriptor) -> Result<Value, DescriptorError> {
        let explicit = node.explicit_hydrogens();
        let deps = node.dependencies(self.view(explicit));

        let mut resolved = Resolved::new(node.to_string());
        for (name, dep) in deps.iter() {
            if dep.explicit_hydrogens() != explicit {
                return Err(DescriptorError::HydrogenModeMismatch {
                    parent: node.to_string(),
                    child: dep.to_string(),
                });
            }
            if resolved.values.contains_key(name) {
                return Err(DescriptorError::DuplicateDependency {
                    node: node.to_string(),
                    name: name.to_string(),
                });
            }
            let value = self.resolve(dep.as_ref())?;
            resolved.values.insert(name, value);
        }

        let value = node.calculate(self.view(explicit), &resolved)?;
        if value.kind() != node.result_kind() {
            return Err(DescriptorError::ValueKindMismatch {
                node: node.to_string(),
                expected: node.result_kind(),
                found: value.kind(),
            });
        }
        debug!(node = %node, kind = %value.kind(), "calculated");
        Ok(value)
    }
}

/// Evaluate one scalar descriptor in a fresh session.
pub fn evaluate(node: &dyn Descriptor, molecule: &Molecule) -> Result<f64, DescriptorError> {
    Session::new(molecule).evaluate(node)
}
