// src/molecule.rs
//! Molecular graph representation.
//!
//! A [`Molecule`] is an undirected graph of [`Atom`]s joined by [`Bond`]s, with
//! an adjacency list built once at construction. Hydrogens can live in the graph
//! as explicit atoms or be folded into their heavy neighbor as an implicit
//! count; [`Molecule::with_explicit_hydrogens`] and
//! [`Molecule::hydrogen_suppressed`] convert between the two views.
//!
//! Molecules are assembled with [`MoleculeBuilder`]:
//!
//! ```
//! use qsar_descriptors::molecule::{BondOrder, MoleculeBuilder};
//!
//! // ethanol, hydrogen-suppressed
//! let mut b = MoleculeBuilder::new("ethanol");
//! let c1 = b.atom("C")?;
//! let c2 = b.atom("C")?;
//! let o = b.atom("O")?;
//! b.bond(c1, c2, BondOrder::Single)?;
//! b.bond(c2, o, BondOrder::Single)?;
//! let mol = b.build();
//!
//! assert_eq!(mol.atom_count(), 3);
//! assert_eq!(mol.with_explicit_hydrogens().atom_count(), 9);
//! # Ok::<(), qsar_descriptors::DescriptorError>(())
//! ```

use crate::descriptors::DescriptorError;
use crate::element::{self, Element};

/// Bond order classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BondOrder {
    /// Order 1.
    Single,
    /// Order 2.
    Double,
    /// Order 3.
    Triple,
    /// Delocalized, order 1.5.
    Aromatic,
}

impl BondOrder {
    /// Numeric bond order for valence calculations.
    pub fn as_f64(self) -> f64 {
        match self {
            BondOrder::Single => 1.0,
            BondOrder::Double => 2.0,
            BondOrder::Triple => 3.0,
            BondOrder::Aromatic => 1.5,
        }
    }
}

/// An atom in a molecular graph.
#[derive(Debug, Clone, PartialEq)]
pub struct Atom {
    /// Element of this atom.
    pub element: &'static Element,
    /// Formal charge in units of e.
    pub formal_charge: i8,
    /// Hydrogens attached to this atom that are not graph atoms.
    pub implicit_hydrogens: u8,
    /// Member of an aromatic system.
    pub aromatic: bool,
}

impl Atom {
    /// Atomic number of the element.
    pub fn atomic_number(&self) -> u8 {
        self.element.atomic_number
    }

    /// Whether the element is hydrogen.
    pub fn is_hydrogen(&self) -> bool {
        self.element.is_hydrogen()
    }
}

/// A bond between two atoms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Bond {
    /// Index of the first atom.
    pub begin: usize,
    /// Index of the second atom.
    pub end: usize,
    /// Bond order.
    pub order: BondOrder,
}

/// A molecular graph with atoms, bonds, and adjacency information.
#[derive(Debug, Clone)]
pub struct Molecule {
    name: String,
    atoms: Vec<Atom>,
    bonds: Vec<Bond>,
    /// adjacency[atom] = Vec<(neighbor, bond index)>
    adjacency: Vec<Vec<(usize, usize)>>,
}

impl Molecule {
    /// Create a molecule from atoms and bonds, building the adjacency list.
    ///
    /// # Errors
    ///
    /// Returns `DescriptorError::InvalidMolecule` when a bond references a
    /// missing atom, joins an atom to itself, or duplicates another bond.
    pub fn new(
        name: impl Into<String>,
        atoms: Vec<Atom>,
        bonds: Vec<Bond>,
    ) -> Result<Self, DescriptorError> {
        let name = name.into();
        let mut adjacency = vec![Vec::new(); atoms.len()];
        for (bi, bond) in bonds.iter().enumerate() {
            check_bond(&name, atoms.len(), &adjacency, bond.begin, bond.end)?;
            adjacency[bond.begin].push((bond.end, bi));
            adjacency[bond.end].push((bond.begin, bi));
        }
        Ok(Molecule {
            name,
            atoms,
            bonds,
            adjacency,
        })
    }

    /// Molecule name, used in log events and error messages.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of graph atoms (implicit hydrogens are not counted).
    pub fn atom_count(&self) -> usize {
        self.atoms.len()
    }

    /// Number of bonds.
    pub fn bond_count(&self) -> usize {
        self.bonds.len()
    }

    /// Atoms in index order.
    pub fn atoms(&self) -> &[Atom] {
        &self.atoms
    }

    /// Atom at `idx`. Panics when out of range.
    pub fn atom(&self, idx: usize) -> &Atom {
        &self.atoms[idx]
    }

    /// Bonds in insertion order.
    pub fn bonds(&self) -> &[Bond] {
        &self.bonds
    }

    /// Neighbor atom indices for a given atom.
    pub fn neighbors(&self, atom_idx: usize) -> impl Iterator<Item = usize> + '_ {
        self.adjacency[atom_idx].iter().map(|&(n, _)| n)
    }

    /// Graph degree of an atom (number of bonds to graph atoms).
    pub fn degree(&self, atom_idx: usize) -> usize {
        self.adjacency[atom_idx].len()
    }

    /// Number of non-hydrogen neighbors.
    pub fn heavy_degree(&self, atom_idx: usize) -> usize {
        self.neighbors(atom_idx)
            .filter(|&n| !self.atoms[n].is_hydrogen())
            .count()
    }

    /// Attached hydrogens, implicit plus explicit hydrogen neighbors.
    pub fn total_hydrogens(&self, atom_idx: usize) -> usize {
        let explicit = self
            .neighbors(atom_idx)
            .filter(|&n| self.atoms[n].is_hydrogen())
            .count();
        explicit + self.atoms[atom_idx].implicit_hydrogens as usize
    }

    /// Sum of bond orders to graph atoms.
    pub fn bond_order_sum(&self, atom_idx: usize) -> f64 {
        self.adjacency[atom_idx]
            .iter()
            .map(|&(_, bi)| self.bonds[bi].order.as_f64())
            .sum()
    }

    /// Copy of this molecule where every implicit hydrogen is a graph atom.
    ///
    /// New hydrogens are appended after the existing atoms in the order of the
    /// atoms that carry them. Idempotent.
    pub fn with_explicit_hydrogens(&self) -> Molecule {
        let mut atoms = self.atoms.clone();
        let mut bonds = self.bonds.clone();
        for (idx, atom) in self.atoms.iter().enumerate() {
            for _ in 0..atom.implicit_hydrogens {
                let h = atoms.len();
                atoms.push(Atom {
                    element: element::hydrogen(),
                    formal_charge: 0,
                    implicit_hydrogens: 0,
                    aromatic: false,
                });
                bonds.push(Bond {
                    begin: idx,
                    end: h,
                    order: BondOrder::Single,
                });
            }
        }
        for atom in atoms.iter_mut() {
            atom.implicit_hydrogens = 0;
        }
        Molecule::from_valid_parts(self.name.clone(), atoms, bonds)
    }

    /// Copy of this molecule with neutral terminal hydrogens folded into their
    /// heavy neighbor's implicit count. Idempotent.
    ///
    /// Hydrogens bonded to another hydrogen, charged hydrogens and isolated
    /// hydrogens stay in the graph.
    pub fn hydrogen_suppressed(&self) -> Molecule {
        let removable: Vec<Option<usize>> = (0..self.atom_count())
            .map(|idx| {
                let atom = &self.atoms[idx];
                if !atom.is_hydrogen() || atom.formal_charge != 0 || self.degree(idx) != 1 {
                    return None;
                }
                self.neighbors(idx).find(|&n| !self.atoms[n].is_hydrogen())
            })
            .collect();

        let mut remap = vec![usize::MAX; self.atom_count()];
        let mut atoms = Vec::with_capacity(self.atom_count());
        for (idx, atom) in self.atoms.iter().enumerate() {
            if removable[idx].is_none() {
                remap[idx] = atoms.len();
                atoms.push(atom.clone());
            }
        }
        for heavy in removable.iter().flatten() {
            let atom = &mut atoms[remap[*heavy]];
            atom.implicit_hydrogens = atom.implicit_hydrogens.saturating_add(1);
        }

        let bonds = self
            .bonds
            .iter()
            .filter(|b| removable[b.begin].is_none() && removable[b.end].is_none())
            .map(|b| Bond {
                begin: remap[b.begin],
                end: remap[b.end],
                order: b.order,
            })
            .collect();

        Molecule::from_valid_parts(self.name.clone(), atoms, bonds)
    }

    /// Build from parts derived from an already validated molecule.
    fn from_valid_parts(name: String, atoms: Vec<Atom>, bonds: Vec<Bond>) -> Molecule {
        let mut adjacency = vec![Vec::new(); atoms.len()];
        for (bi, bond) in bonds.iter().enumerate() {
            adjacency[bond.begin].push((bond.end, bi));
            adjacency[bond.end].push((bond.begin, bi));
        }
        Molecule {
            name,
            atoms,
            bonds,
            adjacency,
        }
    }
}

fn check_bond(
    name: &str,
    atom_count: usize,
    adjacency: &[Vec<(usize, usize)>],
    a: usize,
    b: usize,
) -> Result<(), DescriptorError> {
    if a >= atom_count || b >= atom_count {
        return Err(DescriptorError::InvalidMolecule(format!(
            "{name}: bond {a}-{b} references a missing atom ({atom_count} atoms)"
        )));
    }
    if a == b {
        return Err(DescriptorError::InvalidMolecule(format!(
            "{name}: atom {a} bonded to itself"
        )));
    }
    if adjacency[a].iter().any(|&(n, _)| n == b) {
        return Err(DescriptorError::InvalidMolecule(format!(
            "{name}: duplicate bond {a}-{b}"
        )));
    }
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Builder
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
struct PendingAtom {
    element: &'static Element,
    formal_charge: i8,
    hydrogens: Option<u8>,
    aromatic: bool,
}

/// Incremental molecule construction with implicit hydrogen perception.
///
/// Atoms added without an explicit hydrogen count receive
/// `valence - round(sum of bond orders)` implicit hydrogens when the molecule is
/// built. Charges shift the valence of pnictogens and chalcogens up by the
/// charge (`[NH4+]`, `[O-]`) and lower every other element's valence by the
/// charge magnitude. Aromatic heteroatoms that carry a hydrogen in a ring
/// (pyrrole-type nitrogen) need [`MoleculeBuilder::atom_with_hydrogens`].
#[derive(Debug, Clone)]
pub struct MoleculeBuilder {
    name: String,
    atoms: Vec<PendingAtom>,
    bonds: Vec<Bond>,
    adjacency: Vec<Vec<(usize, usize)>>,
}

impl MoleculeBuilder {
    /// Empty builder for a molecule called `name`.
    pub fn new(name: impl Into<String>) -> Self {
        MoleculeBuilder {
            name: name.into(),
            atoms: Vec::new(),
            bonds: Vec::new(),
            adjacency: Vec::new(),
        }
    }

    /// Add a neutral aliphatic atom, returning its index.
    pub fn atom(&mut self, symbol: &str) -> Result<usize, DescriptorError> {
        self.push(symbol, 0, None, false)
    }

    /// Add a charged atom.
    pub fn charged_atom(&mut self, symbol: &str, charge: i8) -> Result<usize, DescriptorError> {
        self.push(symbol, charge, None, false)
    }

    /// Add an atom with a fixed implicit hydrogen count.
    pub fn atom_with_hydrogens(
        &mut self,
        symbol: &str,
        charge: i8,
        hydrogens: u8,
    ) -> Result<usize, DescriptorError> {
        self.push(symbol, charge, Some(hydrogens), false)
    }

    /// Add a neutral aromatic atom.
    pub fn aromatic_atom(&mut self, symbol: &str) -> Result<usize, DescriptorError> {
        self.push(symbol, 0, None, true)
    }

    /// Join two previously added atoms.
    pub fn bond(&mut self, a: usize, b: usize, order: BondOrder) -> Result<(), DescriptorError> {
        check_bond(&self.name, self.atoms.len(), &self.adjacency, a, b)?;
        let bi = self.bonds.len();
        self.bonds.push(Bond {
            begin: a,
            end: b,
            order,
        });
        self.adjacency[a].push((b, bi));
        self.adjacency[b].push((a, bi));
        Ok(())
    }

    /// Finish the molecule, filling in default implicit hydrogen counts.
    pub fn build(self) -> Molecule {
        let atoms = self
            .atoms
            .iter()
            .enumerate()
            .map(|(idx, pending)| {
                let implicit_hydrogens = pending.hydrogens.unwrap_or_else(|| {
                    let bond_sum: f64 = self.adjacency[idx]
                        .iter()
                        .map(|&(_, bi)| self.bonds[bi].order.as_f64())
                        .sum();
                    default_hydrogens(pending.element, pending.formal_charge, bond_sum)
                });
                Atom {
                    element: pending.element,
                    formal_charge: pending.formal_charge,
                    implicit_hydrogens,
                    aromatic: pending.aromatic,
                }
            })
            .collect();
        Molecule::from_valid_parts(self.name, atoms, self.bonds)
    }

    fn push(
        &mut self,
        symbol: &str,
        formal_charge: i8,
        hydrogens: Option<u8>,
        aromatic: bool,
    ) -> Result<usize, DescriptorError> {
        let element = element::element_by_symbol(symbol)
            .ok_or_else(|| DescriptorError::UnknownElement(symbol.to_string()))?;
        self.atoms.push(PendingAtom {
            element,
            formal_charge,
            hydrogens,
            aromatic,
        });
        self.adjacency.push(Vec::new());
        Ok(self.atoms.len() - 1)
    }
}

fn default_hydrogens(element: &Element, charge: i8, bond_sum: f64) -> u8 {
    let charge = i32::from(charge);
    let valence = match element.valence_electrons {
        5 | 6 => i32::from(element.valence) + charge,
        _ => i32::from(element.valence) - charge.abs(),
    };
    let free = valence - bond_sum.round() as i32;
    free.clamp(0, i32::from(u8::MAX)) as u8
}
