// src/graph_matrix.rs
//! Topological matrices shared by distance-based descriptors.
//!
//! | Node                | Value                                         |
//! |---------------------|-----------------------------------------------|
//! | [`DistanceMatrix`]  | shortest-path bond counts, `D[i,i] = 0`       |
//! | [`AdjacencyMatrix`] | `B_k[i,j] = (D[i,j] == k)`                    |
//! | [`PairCount`]       | Δk, the number of atom pairs at distance k    |
//!
//! Atoms in different fragments have no path between them; their distance is
//! [`DISCONNECTED`]. Orders equal to the sentinel are rejected, so
//! `D[i,j] == k` only ever matches real paths.

use std::collections::VecDeque;
use std::fmt;

use ndarray::Array2;

use crate::descriptors::DescriptorError;
use crate::engine::{Dependencies, Descriptor, NodeId, Resolved, Value, ValueKind};
use crate::molecule::Molecule;

/// Distance between atoms with no connecting path.
pub const DISCONNECTED: u32 = u32::MAX;

/// All-pairs shortest path lengths by breadth-first search from every atom.
pub fn distance_matrix(mol: &Molecule) -> Array2<u32> {
    let n = mol.atom_count();
    let mut dist = Array2::from_elem((n, n), DISCONNECTED);
    let mut queue = VecDeque::with_capacity(n);

    for source in 0..n {
        dist[[source, source]] = 0;
        queue.push_back(source);
        while let Some(atom) = queue.pop_front() {
            let next = dist[[source, atom]] + 1;
            for neighbor in mol.neighbors(atom) {
                if dist[[source, neighbor]] == DISCONNECTED {
                    dist[[source, neighbor]] = next;
                    queue.push_back(neighbor);
                }
            }
        }
    }
    dist
}

fn check_order(family: &str, order: u32) -> Result<(), DescriptorError> {
    if order == DISCONNECTED {
        return Err(DescriptorError::OrderOutOfRange {
            family: family.to_string(),
            order,
            min: 0,
            max: DISCONNECTED - 1,
        });
    }
    Ok(())
}

/// Topological distance matrix of the molecule's hydrogen view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DistanceMatrix {
    explicit_hydrogens: bool,
}

impl DistanceMatrix {
    /// Distance matrix over the given hydrogen view.
    pub fn new(explicit_hydrogens: bool) -> Self {
        DistanceMatrix { explicit_hydrogens }
    }
}

impl fmt::Display for DistanceMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DistanceMatrix(H={})", self.explicit_hydrogens)
    }
}

impl Descriptor for DistanceMatrix {
    fn id(&self) -> NodeId {
        NodeId::DistanceMatrix {
            explicit_hydrogens: self.explicit_hydrogens,
        }
    }

    fn explicit_hydrogens(&self) -> bool {
        self.explicit_hydrogens
    }

    fn result_kind(&self) -> ValueKind {
        ValueKind::Distances
    }

    fn calculate(&self, mol: &Molecule, _deps: &Resolved) -> Result<Value, DescriptorError> {
        Ok(Value::Distances(distance_matrix(mol)))
    }
}

/// Atom pairs at exactly `order` bonds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AdjacencyMatrix {
    explicit_hydrogens: bool,
    order: u32,
}

impl AdjacencyMatrix {
    /// Order-`order` matrix over the given hydrogen view.
    pub fn new(explicit_hydrogens: bool, order: u32) -> Self {
        AdjacencyMatrix {
            explicit_hydrogens,
            order,
        }
    }
}

impl fmt::Display for AdjacencyMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AdjacencyMatrix{}(H={})", self.order, self.explicit_hydrogens)
    }
}

impl Descriptor for AdjacencyMatrix {
    fn id(&self) -> NodeId {
        NodeId::AdjacencyMatrix {
            explicit_hydrogens: self.explicit_hydrogens,
            order: self.order,
        }
    }

    fn explicit_hydrogens(&self) -> bool {
        self.explicit_hydrogens
    }

    fn result_kind(&self) -> ValueKind {
        ValueKind::Mask
    }

    fn dependencies(&self, _mol: &Molecule) -> Dependencies {
        Dependencies::new().with("dmat", DistanceMatrix::new(self.explicit_hydrogens))
    }

    fn calculate(&self, _mol: &Molecule, deps: &Resolved) -> Result<Value, DescriptorError> {
        check_order("AdjacencyMatrix", self.order)?;
        let order = self.order;
        Ok(Value::Mask(deps.distances("dmat")?.mapv(|d| d == order)))
    }
}

/// Δk: pairs at distance k, each unordered pair counted once.
///
/// For k = 0 the matrix only has its diagonal set, so the count is the atom
/// count and is not halved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PairCount {
    explicit_hydrogens: bool,
    order: u32,
}

impl PairCount {
    /// Δ for `order` over the given hydrogen view.
    pub fn new(explicit_hydrogens: bool, order: u32) -> Self {
        PairCount {
            explicit_hydrogens,
            order,
        }
    }
}

impl fmt::Display for PairCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PairCount{}(H={})", self.order, self.explicit_hydrogens)
    }
}

impl Descriptor for PairCount {
    fn id(&self) -> NodeId {
        NodeId::PairCount {
            explicit_hydrogens: self.explicit_hydrogens,
            order: self.order,
        }
    }

    fn explicit_hydrogens(&self) -> bool {
        self.explicit_hydrogens
    }

    fn dependencies(&self, _mol: &Molecule) -> Dependencies {
        Dependencies::new().with(
            "gmat",
            AdjacencyMatrix::new(self.explicit_hydrogens, self.order),
        )
    }

    fn calculate(&self, _mol: &Molecule, deps: &Resolved) -> Result<Value, DescriptorError> {
        check_order("PairCount", self.order)?;
        let count = deps.mask("gmat")?.iter().filter(|&&b| b).count() as f64;
        Ok(Value::Scalar(if self.order == 0 { count } else { count / 2.0 }))
    }
}
