//! A custom property registry installed before first use.
//!
//! Lives in its own test binary: the registry is process-wide and can only be
//! installed once.

use qsar_descriptors::properties::{PropertyClass, PropertyRegistry};
use qsar_descriptors::{
    evaluate, Autocorrelation, BondOrder, DescriptorError, Molecule, MoleculeBuilder,
};

fn ethane() -> Result<Molecule, DescriptorError> {
    let mut b = MoleculeBuilder::new("ethane");
    let c1 = b.atom("C")?;
    let c2 = b.atom("C")?;
    b.bond(c1, c2, BondOrder::Single)?;
    Ok(b.build())
}

fn long(mol: &Molecule) -> Vec<f64> {
    vec![2.0; mol.atom_count() + 5]
}

fn short(_: &Molecule) -> Vec<f64> {
    vec![2.0]
}

fn twos(mol: &Molecule) -> Vec<f64> {
    vec![2.0; mol.atom_count()]
}

#[test]
fn molecular_properties_with_wrong_length_are_errors() -> Result<(), DescriptorError> {
    let mut reg = PropertyRegistry::with_defaults();
    reg.register_molecular("long", "too many values", PropertyClass::General, long)?;
    reg.register_molecular("short", "too few values", PropertyClass::General, short)?;
    reg.register_molecular("twos", "constant 2", PropertyClass::General, twos)?;
    reg.install()?;

    let mol = ethane()?;

    // eight atoms with explicit hydrogens, 2 * 2 each
    assert_eq!(evaluate(&Autocorrelation::ats(0, "twos")?, &mol)?, 32.0);

    let err = evaluate(&Autocorrelation::ats(0, "long")?, &mol).unwrap_err();
    assert!(matches!(
        err,
        DescriptorError::PropertyLength { ref property, expected: 8, found: 13 } if property == "long"
    ));
    let err = evaluate(&Autocorrelation::ats(1, "short")?, &mol).unwrap_err();
    assert!(matches!(
        err,
        DescriptorError::PropertyLength { expected: 8, found: 1, .. }
    ));
    Ok(())
}
