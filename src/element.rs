// src/element.rs
//! Periodic table data for the elements that appear in drug-like molecules.
//!
//! Each row carries the columns that the atomic property registry reads:
//!
//! | Column            | Unit   | Used by property |
//! |-------------------|--------|------------------|
//! | `mass`            | Da     | `m`              |
//! | `vdw_radius`      | Å      | `v`              |
//! | `sanderson`       | n/a    | `se`             |
//! | `pauling`         | n/a    | `pe`             |
//! | `allred_rochow`   | n/a    | `are`            |
//! | `polarizability`  | Å³     | `p`              |
//! | `ionization`      | eV     | `i`              |
//!
//! `valence` is the default bonding valence used to fill implicit hydrogens,
//! `valence_electrons` and `period` feed the valence-electron and intrinsic
//! state properties.

/// A chemical element and its tabulated atomic constants.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Element {
    /// Atomic number (Z).
    pub atomic_number: u8,
    /// Element symbol as written in SMILES (`"C"`, `"Cl"`, ...).
    pub symbol: &'static str,
    /// Standard atomic weight.
    pub mass: f64,
    /// Default valence used to derive implicit hydrogen counts.
    pub valence: u8,
    /// Number of valence-shell electrons.
    pub valence_electrons: u8,
    /// Period (principal quantum number of the valence shell).
    pub period: u8,
    /// Van der Waals radius.
    pub vdw_radius: f64,
    /// Sanderson electronegativity.
    pub sanderson: f64,
    /// Pauling electronegativity.
    pub pauling: f64,
    /// Allred-Rochow electronegativity.
    pub allred_rochow: f64,
    /// Atomic polarizability.
    pub polarizability: f64,
    /// First ionization potential.
    pub ionization: f64,
}

impl Element {
    /// `true` for hydrogen.
    pub fn is_hydrogen(&self) -> bool {
        self.atomic_number == 1
    }

    /// Van der Waals volume of a sphere with the tabulated radius.
    pub fn vdw_volume(&self) -> f64 {
        4.0 / 3.0 * std::f64::consts::PI * self.vdw_radius.powi(3)
    }
}

macro_rules! element {
    ($z:expr, $sym:expr, $mass:expr, $val:expr, $ve:expr, $per:expr,
     $vdw:expr, $se:expr, $pe:expr, $are:expr, $pol:expr, $ion:expr) => {
        Element {
            atomic_number: $z,
            symbol: $sym,
            mass: $mass,
            valence: $val,
            valence_electrons: $ve,
            period: $per,
            vdw_radius: $vdw,
            sanderson: $se,
            pauling: $pe,
            allred_rochow: $are,
            polarizability: $pol,
            ionization: $ion,
        }
    };
}

static ELEMENTS: [Element; 15] = [
    element!(1, "H", 1.008, 1, 1, 1, 1.10, 2.59, 2.20, 2.20, 0.667, 13.598),
    element!(5, "B", 10.81, 3, 3, 2, 1.92, 2.28, 2.04, 2.01, 3.03, 8.298),
    element!(6, "C", 12.011, 4, 4, 2, 1.70, 2.75, 2.55, 2.50, 1.76, 11.260),
    element!(7, "N", 14.007, 3, 5, 2, 1.55, 3.19, 3.04, 3.07, 1.10, 14.534),
    element!(8, "O", 15.999, 2, 6, 2, 1.52, 3.65, 3.44, 3.50, 0.802, 13.618),
    element!(9, "F", 18.998, 1, 7, 2, 1.47, 4.00, 3.98, 4.10, 0.557, 17.423),
    element!(11, "Na", 22.990, 1, 1, 3, 2.27, 0.56, 0.93, 1.01, 24.11, 5.139),
    element!(14, "Si", 28.086, 4, 4, 3, 2.10, 2.14, 1.90, 1.74, 5.38, 8.152),
    element!(15, "P", 30.974, 3, 5, 3, 1.80, 2.52, 2.19, 2.06, 3.63, 10.487),
    element!(16, "S", 32.06, 2, 6, 3, 1.80, 2.96, 2.58, 2.44, 2.90, 10.360),
    element!(17, "Cl", 35.45, 1, 7, 3, 1.75, 3.48, 3.16, 2.83, 2.18, 12.968),
    element!(19, "K", 39.098, 1, 1, 4, 2.75, 0.45, 0.82, 0.91, 43.4, 4.341),
    element!(34, "Se", 78.971, 2, 6, 4, 1.90, 2.76, 2.55, 2.48, 3.77, 9.752),
    element!(35, "Br", 79.904, 1, 7, 4, 1.85, 3.22, 2.96, 2.74, 3.05, 11.814),
    element!(53, "I", 126.904, 1, 7, 5, 1.98, 2.78, 2.66, 2.21, 5.35, 10.451),
];

/// Look up an element by symbol (case-sensitive, `"Cl"` not `"CL"`).
pub fn element_by_symbol(symbol: &str) -> Option<&'static Element> {
    ELEMENTS.iter().find(|e| e.symbol == symbol)
}

/// Look up an element by atomic number.
pub fn element_by_number(atomic_number: u8) -> Option<&'static Element> {
    ELEMENTS.iter().find(|e| e.atomic_number == atomic_number)
}

/// Hydrogen, used when expanding implicit hydrogens into graph atoms.
pub(crate) fn hydrogen() -> &'static Element {
    &ELEMENTS[0]
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn lookup_by_symbol_and_number_agree() {
        for e in ELEMENTS.iter() {
            assert_eq!(element_by_symbol(e.symbol), Some(e));
            assert_eq!(element_by_number(e.atomic_number), Some(e));
        }
    }

    #[test]
    fn symbols_are_case_sensitive() {
        assert!(element_by_symbol("Cl").is_some());
        assert!(element_by_symbol("CL").is_none());
        assert!(element_by_symbol("Xx").is_none());
    }

    #[test]
    fn hydrogen_helper_is_hydrogen() {
        assert!(hydrogen().is_hydrogen());
        assert_eq!(hydrogen().symbol, "H");
    }

    #[test]
    fn carbon_vdw_volume() {
        let c = element_by_symbol("C").unwrap();
        assert_relative_eq!(c.vdw_volume(), 20.5795, epsilon = 1e-3);
    }
}
