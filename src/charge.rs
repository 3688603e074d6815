// src/charge.rs
//! Gasteiger-Marsili partial charges.
//!
//! Iterative partial equalization of orbital electronegativity, the charge
//! model behind the `c` atomic property. Hybridization is read from the number
//! of π bonds, which is the same in the hydrogen-suppressed and
//! explicit-hydrogen views.

use crate::molecule::Molecule;

const ITERATIONS: i32 = 6;

/// Electronegativity coefficients of χ = a + b·q + c·q².
///
/// Gasteiger & Marsili, Tetrahedron 36, 3219 (1980).
#[derive(Debug, Clone, Copy)]
struct ElectroParams {
    a: f64,
    b: f64,
    c: f64,
}

impl ElectroParams {
    fn electronegativity(&self, q: f64) -> f64 {
        self.a + self.b * q + self.c * q * q
    }

    /// Electronegativity of the cation, used to scale charge transfer.
    fn cation(&self) -> f64 {
        self.a + self.b + self.c
    }
}

/// Parameters by element and π-bond count (bond order sum minus σ bonds),
/// which separates sp3 (0), sp2 and aromatic (1) and sp (2) centers.
fn electro_params(atomic_number: u8, pi_bonds: f64) -> ElectroParams {
    let p = |a, b, c| ElectroParams { a, b, c };
    match atomic_number {
        1 => p(7.17, 6.24, -0.56),
        6 if pi_bonds > 1.5 => p(10.39, 9.45, 0.73),
        6 if pi_bonds > 0.5 => p(8.79, 9.32, 1.51),
        6 => p(7.98, 9.18, 1.88),
        7 if pi_bonds > 1.5 => p(15.68, 11.70, -0.27),
        7 if pi_bonds > 0.5 => p(12.87, 11.15, 0.85),
        7 => p(11.54, 10.82, 1.36),
        8 if pi_bonds > 0.5 => p(17.07, 13.79, 0.47),
        8 => p(14.18, 12.92, 1.39),
        9 => p(14.66, 13.85, 2.31),
        14 => p(5.60, 6.00, 1.20),
        15 => p(8.90, 8.24, 0.96),
        16 if pi_bonds > 0.5 => p(12.00, 9.88, 1.58),
        16 => p(10.14, 9.13, 1.38),
        17 => p(11.00, 9.69, 1.35),
        34 => p(10.00, 8.80, 1.20),
        35 => p(10.08, 8.47, 1.16),
        53 => p(9.90, 7.96, 0.96),
        // sp3 carbon for anything unparameterized
        _ => p(7.98, 9.18, 1.88),
    }
}

/// Gasteiger-Marsili charges for every graph atom, formal charges included.
pub fn gasteiger_charges(mol: &Molecule) -> Vec<f64> {
    let n = mol.atom_count();
    let params: Vec<ElectroParams> = (0..n)
        .map(|i| {
            let pi_bonds = mol.bond_order_sum(i) - mol.degree(i) as f64;
            electro_params(mol.atom(i).atomic_number(), pi_bonds)
        })
        .collect();

    let mut charges = vec![0.0_f64; n];
    for iteration in 0..ITERATIONS {
        let damping = 0.5_f64.powi(iteration + 1);
        let mut delta = vec![0.0_f64; n];

        for bond in mol.bonds() {
            let (a1, a2) = (bond.begin, bond.end);
            let diff = params[a2].electronegativity(charges[a2])
                - params[a1].electronegativity(charges[a1]);

            // charge flows towards the more electronegative atom
            let scale = if diff > 0.0 {
                params[a2].cation()
            } else {
                params[a1].cation()
            };
            if scale.abs() < 1e-12 {
                continue;
            }

            let transfer = damping * diff / scale;
            delta[a1] += transfer;
            delta[a2] -= transfer;
        }

        for (q, d) in charges.iter_mut().zip(&delta) {
            *q += d;
        }
    }

    for (q, atom) in charges.iter_mut().zip(mol.atoms()) {
        *q += f64::from(atom.formal_charge);
    }
    charges
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::molecule::{BondOrder, MoleculeBuilder};

    fn acetic_acid() -> Molecule {
        let mut b = MoleculeBuilder::new("acetic acid");
        let c1 = b.atom("C").unwrap();
        let c2 = b.atom("C").unwrap();
        let o1 = b.atom("O").unwrap();
        let o2 = b.atom("O").unwrap();
        b.bond(c1, c2, BondOrder::Single).unwrap();
        b.bond(c2, o1, BondOrder::Double).unwrap();
        b.bond(c2, o2, BondOrder::Single).unwrap();
        b.build()
    }

    #[test]
    fn neutral_molecule_charges_sum_near_zero() {
        let charges = gasteiger_charges(&acetic_acid().with_explicit_hydrogens());
        let sum: f64 = charges.iter().sum();
        assert!(sum.abs() < 1e-9, "charge sum = {sum}");
    }

    #[test]
    fn oxygens_are_negative() {
        let charges = gasteiger_charges(&acetic_acid());
        assert!(charges[2] < 0.0, "carbonyl O = {}", charges[2]);
        assert!(charges[3] < 0.0, "hydroxyl O = {}", charges[3]);
        assert!(charges[1] > 0.0, "carboxyl C = {}", charges[1]);
    }

    #[test]
    fn single_atom_has_zero_charge() {
        let mut b = MoleculeBuilder::new("methane");
        b.atom("C").unwrap();
        assert_eq!(gasteiger_charges(&b.build()), vec![0.0]);
    }

    #[test]
    fn formal_charge_is_added() {
        let mut b = MoleculeBuilder::new("ammonium");
        b.charged_atom("N", 1).unwrap();
        assert_eq!(gasteiger_charges(&b.build()), vec![1.0]);
    }

    #[test]
    fn empty_molecule() {
        let mol = MoleculeBuilder::new("empty").build();
        assert!(gasteiger_charges(&mol).is_empty());
    }
}
