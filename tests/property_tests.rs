//! # Property-Based Tests
//!
//! Invariants of the descriptor engine over random acyclic molecules.

use approx::relative_eq;
use proptest::collection::vec;
use proptest::prelude::*;
use qsar_descriptors::engine::Value;
use qsar_descriptors::graph_matrix::{distance_matrix, PairCount};
use qsar_descriptors::properties::CenteredPropertyVector;
use qsar_descriptors::{
    Autocorrelation, BondOrder, Calculator, Family, Molecule, MoleculeBuilder, PropertyKey,
    Session,
};

const ELEMENTS: [&str; 4] = ["C", "N", "O", "S"];

/// Random tree: atom `i + 1` bonds to an earlier atom chosen by `parent`.
fn tree(links: &[(usize, usize)]) -> Molecule {
    let mut b = MoleculeBuilder::new("random tree");
    b.atom("C").expect("carbon");
    for (i, &(element, parent)) in links.iter().enumerate() {
        let atom = b.atom(ELEMENTS[element]).expect("known element");
        b.bond(parent % (i + 1), atom, BondOrder::Single).expect("valid bond");
    }
    b.build()
}

fn same(a: f64, b: f64) -> bool {
    (a.is_nan() && b.is_nan()) || relative_eq!(a, b, epsilon = 1e-9, max_relative = 1e-9)
}

fn random_links() -> impl Strategy<Value = Vec<(usize, usize)>> {
    vec((0..ELEMENTS.len(), 0usize..1000), 0..10)
}

// =============================================================================
// PROPERTY TESTS
// =============================================================================

proptest! {
    /// Mean-centered property vectors sum to zero.
    #[test]
    fn centered_vector_sums_to_zero(
        links in random_links(),
        property in prop::sample::select(vec!["m", "Z", "v", "pe", "c"])
    ) {
        let mol = tree(&links);
        let mut session = Session::new(&mol);
        let node = CenteredPropertyVector::new(true, PropertyKey::new(property).expect("known"));
        let value = session.resolve(&node).expect("resolve");
        let Value::Vector(v) = value.as_ref() else {
            panic!("expected vector, got {value:?}");
        };
        prop_assert_eq!(v.len(), mol.with_explicit_hydrogens().atom_count());
        let scale = v.iter().map(|x| x.abs()).fold(1.0, f64::max);
        prop_assert!(v.sum().abs() <= 1e-9 * scale * v.len() as f64);
    }

    /// Two independent calculations of the same molecule agree.
    #[test]
    fn calculation_is_deterministic(links in random_links()) {
        let mol = tree(&links);
        let mut calc = Calculator::new();
        calc.register_family(Family::AbcGg);
        calc.register_family(Family::Mats);
        calc.register_family(Family::Gats);

        let first = calc.calculate(&mol).expect("first");
        let second = calc.calculate(&mol).expect("second");
        prop_assert_eq!(first.len(), second.len());
        for (a, b) in first.iter().zip(&second) {
            prop_assert!(a.to_bits() == b.to_bits() || (a.is_nan() && b.is_nan()));
        }
    }

    /// In a connected molecule every pair sits at exactly one positive distance.
    #[test]
    fn pair_counts_partition_all_pairs(links in random_links()) {
        let mol = tree(&links).with_explicit_hydrogens();
        let n = mol.atom_count();
        let d = distance_matrix(&mol);
        let diameter = d.iter().copied().max().unwrap_or(0);

        let mut session = Session::new(&mol);
        let mut total = 0.0;
        for k in 1..=diameter {
            total += session.evaluate(&PairCount::new(true, k)).expect("pair count");
        }
        prop_assert_eq!(total, (n * (n - 1) / 2) as f64);
        prop_assert_eq!(session.evaluate(&PairCount::new(true, 0)).expect("k = 0"), n as f64);
    }

    /// ATS(0) is the sum of squares and AATS(k) is ATS(k) over the pair count.
    #[test]
    fn averaged_autocorrelation_matches_definition(
        links in random_links(),
        order in 0u32..=8
    ) {
        let mol = tree(&links);
        let mut session = Session::new(&mol);
        let ats = session.evaluate(&Autocorrelation::ats(order, "m").expect("ats")).expect("ats");
        let aats = session.evaluate(&Autocorrelation::aats(order, "m").expect("aats")).expect("aats");
        let delta = session.evaluate(&PairCount::new(true, order)).expect("delta");

        if delta == 0.0 {
            prop_assert!(aats.is_nan());
        } else {
            prop_assert!(same(aats, ats / delta));
        }
        if order == 0 {
            let explicit = mol.with_explicit_hydrogens();
            let squares: f64 = explicit.atoms().iter().map(|a| a.element.mass.powi(2)).sum();
            prop_assert!(same(ats, squares));
        }
    }

    /// Batch tables equal per-molecule rows.
    #[test]
    fn map_matches_calculate(link_sets in vec(random_links(), 1..5)) {
        let molecules: Vec<Molecule> = link_sets.iter().map(|s| tree(s)).collect();
        let mut calc = Calculator::new();
        calc.register_family(Family::Abc);
        calc.register_family(Family::Aatsc);

        let table = calc.map(&molecules).expect("map");
        for (i, mol) in molecules.iter().enumerate() {
            let row = calc.calculate(mol).expect("calculate");
            for (a, b) in table.row(i).iter().zip(&row) {
                prop_assert!(same(*a, *b));
            }
        }
    }
}
