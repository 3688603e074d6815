// src/properties.rs
//! Atomic properties and per-atom property vectors.
//!
//! Autocorrelation descriptors weight atoms by a physicochemical property. The
//! properties live in a [`PropertyRegistry`] that is built once per process and
//! never mutated afterwards; descriptors refer to a property through a
//! validated [`PropertyKey`].
//!
//! | Key   | Property                              | Class           |
//! |-------|---------------------------------------|-----------------|
//! | `c`   | Gasteiger partial charge              | charge          |
//! | `dv`  | Kier-Hall valence electrons           | valence         |
//! | `d`   | sigma electrons (heavy neighbors)     | general         |
//! | `s`   | intrinsic state                       | intrinsic state |
//! | `Z`   | atomic number                         | general         |
//! | `m`   | atomic mass                           | general         |
//! | `v`   | van der Waals volume                  | general         |
//! | `se`  | Sanderson electronegativity           | general         |
//! | `pe`  | Pauling electronegativity             | general         |
//! | `are` | Allred-Rochow electronegativity       | general         |
//! | `p`   | polarizability                        | general         |
//! | `i`   | ionization potential                  | general         |
//!
//! Values that are undefined for an atom are `NaN` entries, never errors.
//!
//! Custom properties are registered under a new key before the registry is
//! first read:
//!
//! ```no_run
//! use qsar_descriptors::molecule::Molecule;
//! use qsar_descriptors::properties::{PropertyClass, PropertyRegistry};
//!
//! fn heavy_flag(mol: &Molecule, idx: usize) -> f64 {
//!     if mol.atom(idx).is_hydrogen() { 0.0 } else { 1.0 }
//! }
//!
//! let mut registry = PropertyRegistry::with_defaults();
//! registry.register_per_atom("heavy", "heavy atom indicator", PropertyClass::General, heavy_flag)?;
//! registry.install()?;
//! # Ok::<(), qsar_descriptors::DescriptorError>(())
//! ```

use std::fmt;
use std::sync::OnceLock;

use ndarray::Array1;
use serde::{Deserialize, Serialize};

use crate::charge::gasteiger_charges;
use crate::descriptors::{safe_div, DescriptorError};
use crate::engine::{Dependencies, Descriptor, NodeId, Resolved, Value, ValueKind};
use crate::molecule::Molecule;

// ─────────────────────────────────────────────────────────────────────────────
// Registry
// ─────────────────────────────────────────────────────────────────────────────

/// Which optional groups a property belongs to, for [`get_properties`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PropertyClass {
    /// Always enumerated.
    General,
    /// Partial charges.
    Charge,
    /// Valence electron counts.
    Valence,
    /// Electrotopological intrinsic state.
    IntrinsicState,
}

/// How a property is computed over a molecule.
#[derive(Debug, Clone, Copy)]
pub enum PropertyFn {
    /// Independent value per atom.
    PerAtom(fn(&Molecule, usize) -> f64),
    /// Values that need the whole molecule at once (e.g. partial charges).
    Molecular(fn(&Molecule) -> Vec<f64>),
}

/// One named entry of the registry.
#[derive(Debug, Clone)]
pub struct AtomicProperty {
    /// Selector key.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// Filter class.
    pub class: PropertyClass,
    /// How the values are computed.
    pub func: PropertyFn,
}

impl AtomicProperty {
    /// Property values for every atom of `mol`, in atom order.
    ///
    /// # Errors
    ///
    /// `PropertyLength` if a molecular function does not return exactly one
    /// value per atom.
    pub fn values(&self, mol: &Molecule) -> Result<Array1<f64>, DescriptorError> {
        match self.func {
            PropertyFn::PerAtom(f) => Ok((0..mol.atom_count()).map(|i| f(mol, i)).collect()),
            PropertyFn::Molecular(f) => {
                let values = f(mol);
                if values.len() != mol.atom_count() {
                    return Err(DescriptorError::PropertyLength {
                        property: self.name.clone(),
                        expected: mol.atom_count(),
                        found: values.len(),
                    });
                }
                Ok(Array1::from_vec(values))
            }
        }
    }
}

/// Filter flags for [`get_properties`]; general properties are always kept.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PropertyFilter {
    /// Include partial-charge properties.
    pub charge: bool,
    /// Include valence-electron properties.
    pub valence: bool,
    /// Include intrinsic-state properties.
    pub istate: bool,
}

impl PropertyFilter {
    fn accepts(&self, class: PropertyClass) -> bool {
        match class {
            PropertyClass::General => true,
            PropertyClass::Charge => self.charge,
            PropertyClass::Valence => self.valence,
            PropertyClass::IntrinsicState => self.istate,
        }
    }
}

/// Catalog of atomic properties, in enumeration order.
#[derive(Debug, Clone)]
pub struct PropertyRegistry {
    properties: Vec<AtomicProperty>,
}

static REGISTRY: OnceLock<PropertyRegistry> = OnceLock::new();

/// The process-wide registry. The built-in catalog unless another registry
/// was installed first.
pub fn registry() -> &'static PropertyRegistry {
    REGISTRY.get_or_init(PropertyRegistry::with_defaults)
}

/// Keys of the registered properties accepted by `filter`, in catalog order.
pub fn get_properties(filter: PropertyFilter) -> Vec<PropertyKey> {
    registry().keys(filter)
}

impl PropertyRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        PropertyRegistry {
            properties: Vec::new(),
        }
    }

    /// The built-in catalog.
    pub fn with_defaults() -> Self {
        use PropertyClass::*;
        let builtins: [(&str, &str, PropertyClass, PropertyFn); 12] = [
            ("c", "gasteiger charge", Charge, PropertyFn::Molecular(gasteiger_charges)),
            ("dv", "valence electrons", Valence, PropertyFn::PerAtom(valence_electrons)),
            ("d", "sigma electrons", General, PropertyFn::PerAtom(sigma_electrons)),
            ("s", "intrinsic state", IntrinsicState, PropertyFn::PerAtom(intrinsic_state)),
            ("Z", "atomic number", General, PropertyFn::PerAtom(atomic_number)),
            ("m", "mass", General, PropertyFn::PerAtom(mass)),
            ("v", "vdw volume", General, PropertyFn::PerAtom(vdw_volume)),
            ("se", "sanderson EN", General, PropertyFn::PerAtom(sanderson)),
            ("pe", "pauling EN", General, PropertyFn::PerAtom(pauling)),
            ("are", "allred-rochow EN", General, PropertyFn::PerAtom(allred_rochow)),
            ("p", "polarizability", General, PropertyFn::PerAtom(polarizability)),
            ("i", "ionization potential", General, PropertyFn::PerAtom(ionization)),
        ];
        let properties = builtins
            .into_iter()
            .map(|(name, description, class, func)| AtomicProperty {
                name: name.to_string(),
                description: description.to_string(),
                class,
                func,
            })
            .collect();
        PropertyRegistry { properties }
    }

    /// Add a property computed independently per atom.
    pub fn register_per_atom(
        &mut self,
        name: impl Into<String>,
        description: impl Into<String>,
        class: PropertyClass,
        func: fn(&Molecule, usize) -> f64,
    ) -> Result<(), DescriptorError> {
        self.register(name.into(), description.into(), class, PropertyFn::PerAtom(func))
    }

    /// Add a property computed over the whole molecule.
    pub fn register_molecular(
        &mut self,
        name: impl Into<String>,
        description: impl Into<String>,
        class: PropertyClass,
        func: fn(&Molecule) -> Vec<f64>,
    ) -> Result<(), DescriptorError> {
        self.register(name.into(), description.into(), class, PropertyFn::Molecular(func))
    }

    fn register(
        &mut self,
        name: String,
        description: String,
        class: PropertyClass,
        func: PropertyFn,
    ) -> Result<(), DescriptorError> {
        if self.lookup(&name).is_some() {
            return Err(DescriptorError::DuplicateProperty(name));
        }
        self.properties.push(AtomicProperty {
            name,
            description,
            class,
            func,
        });
        Ok(())
    }

    /// Make this the process-wide registry.
    ///
    /// # Errors
    ///
    /// `RegistryAlreadyInitialized` if a registry was installed before or the
    /// default one has already been read.
    pub fn install(self) -> Result<(), DescriptorError> {
        REGISTRY
            .set(self)
            .map_err(|_| DescriptorError::RegistryAlreadyInitialized)
    }

    /// Property registered under `name`.
    pub fn lookup(&self, name: &str) -> Option<&AtomicProperty> {
        self.properties.iter().find(|p| p.name == name)
    }

    /// Number of registered properties.
    pub fn len(&self) -> usize {
        self.properties.len()
    }

    /// Whether nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    /// Keys accepted by `filter`, in catalog order.
    pub fn keys(&self, filter: PropertyFilter) -> Vec<PropertyKey> {
        self.properties
            .iter()
            .filter(|p| filter.accepts(p.class))
            .map(|p| PropertyKey(p.name.clone()))
            .collect()
    }

    /// Property vector of `mol` for `key`.
    pub fn values(&self, key: &PropertyKey, mol: &Molecule) -> Result<Array1<f64>, DescriptorError> {
        self.lookup(key.as_str())
            .ok_or_else(|| DescriptorError::UnknownProperty(key.to_string()))?
            .values(mol)
    }
}

impl Default for PropertyRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Name of a property known to the process-wide registry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PropertyKey(String);

impl PropertyKey {
    /// Validate `name` against the registry.
    ///
    /// # Errors
    ///
    /// `UnknownProperty` if no property of that name is registered.
    pub fn new(name: &str) -> Result<Self, DescriptorError> {
        match registry().lookup(name) {
            Some(p) => Ok(PropertyKey(p.name.clone())),
            None => Err(DescriptorError::UnknownProperty(name.to_string())),
        }
    }

    /// The selector name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for PropertyKey {
    type Error = DescriptorError;

    fn try_from(name: String) -> Result<Self, Self::Error> {
        PropertyKey::new(&name)
    }
}

impl From<PropertyKey> for String {
    fn from(key: PropertyKey) -> Self {
        key.0
    }
}

impl fmt::Display for PropertyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Built-in property functions
// ─────────────────────────────────────────────────────────────────────────────

fn atomic_number(mol: &Molecule, idx: usize) -> f64 {
    f64::from(mol.atom(idx).atomic_number())
}

fn mass(mol: &Molecule, idx: usize) -> f64 {
    mol.atom(idx).element.mass
}

fn vdw_volume(mol: &Molecule, idx: usize) -> f64 {
    mol.atom(idx).element.vdw_volume()
}

fn sanderson(mol: &Molecule, idx: usize) -> f64 {
    mol.atom(idx).element.sanderson
}

fn pauling(mol: &Molecule, idx: usize) -> f64 {
    mol.atom(idx).element.pauling
}

fn allred_rochow(mol: &Molecule, idx: usize) -> f64 {
    mol.atom(idx).element.allred_rochow
}

fn polarizability(mol: &Molecule, idx: usize) -> f64 {
    mol.atom(idx).element.polarizability
}

fn ionization(mol: &Molecule, idx: usize) -> f64 {
    mol.atom(idx).element.ionization
}

/// Number of heavy-atom neighbors.
fn sigma_electrons(mol: &Molecule, idx: usize) -> f64 {
    mol.heavy_degree(idx) as f64
}

/// Kier-Hall valence delta: (Zv - h) / (Z - Zv - 1), 0 for hydrogen.
fn valence_electrons(mol: &Molecule, idx: usize) -> f64 {
    let atom = mol.atom(idx);
    if atom.is_hydrogen() {
        return 0.0;
    }
    let charge = f64::from(atom.formal_charge);
    let zv = f64::from(atom.element.valence_electrons) - charge;
    let z = f64::from(atom.atomic_number()) - charge;
    let h = mol.total_hydrogens(idx) as f64;
    safe_div(zv - h, z - zv - 1.0)
}

/// Electrotopological intrinsic state: ((2/N)^2 * dv + 1) / d.
fn intrinsic_state(mol: &Molecule, idx: usize) -> f64 {
    let n = f64::from(mol.atom(idx).element.period);
    let dv = valence_electrons(mol, idx);
    let d = sigma_electrons(mol, idx);
    safe_div((2.0 / n).powi(2) * dv + 1.0, d)
}

// ─────────────────────────────────────────────────────────────────────────────
// Nodes
// ─────────────────────────────────────────────────────────────────────────────

/// Per-atom vector of one property over the molecule's hydrogen view.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PropertyVector {
    explicit_hydrogens: bool,
    property: PropertyKey,
}

impl PropertyVector {
    /// Vector of `property` over the given hydrogen view.
    pub fn new(explicit_hydrogens: bool, property: PropertyKey) -> Self {
        PropertyVector {
            explicit_hydrogens,
            property,
        }
    }

    /// Selected property.
    pub fn property(&self) -> &PropertyKey {
        &self.property
    }
}

impl fmt::Display for PropertyVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PropertyVector({}, H={})", self.property, self.explicit_hydrogens)
    }
}

impl Descriptor for PropertyVector {
    fn id(&self) -> NodeId {
        NodeId::PropertyVector {
            explicit_hydrogens: self.explicit_hydrogens,
            property: self.property.clone(),
        }
    }

    fn explicit_hydrogens(&self) -> bool {
        self.explicit_hydrogens
    }

    fn result_kind(&self) -> ValueKind {
        ValueKind::Vector
    }

    fn calculate(&self, mol: &Molecule, _deps: &Resolved) -> Result<Value, DescriptorError> {
        registry().values(&self.property, mol).map(Value::Vector)
    }
}

/// Property vector minus its arithmetic mean. `NaN` entries propagate.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CenteredPropertyVector {
    explicit_hydrogens: bool,
    property: PropertyKey,
}

impl CenteredPropertyVector {
    /// Centered vector of `property` over the given hydrogen view.
    pub fn new(explicit_hydrogens: bool, property: PropertyKey) -> Self {
        CenteredPropertyVector {
            explicit_hydrogens,
            property,
        }
    }
}

impl fmt::Display for CenteredPropertyVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CenteredPropertyVector({}, H={})",
            self.property, self.explicit_hydrogens
        )
    }
}

impl Descriptor for CenteredPropertyVector {
    fn id(&self) -> NodeId {
        NodeId::CenteredPropertyVector {
            explicit_hydrogens: self.explicit_hydrogens,
            property: self.property.clone(),
        }
    }

    fn explicit_hydrogens(&self) -> bool {
        self.explicit_hydrogens
    }

    fn result_kind(&self) -> ValueKind {
        ValueKind::Vector
    }

    fn dependencies(&self, _mol: &Molecule) -> Dependencies {
        Dependencies::new().with(
            "avec",
            PropertyVector::new(self.explicit_hydrogens, self.property.clone()),
        )
    }

    fn calculate(&self, _mol: &Molecule, deps: &Resolved) -> Result<Value, DescriptorError> {
        Ok(Value::Vector(centered(deps.vector("avec")?)))
    }
}

/// `v - mean(v)`; an empty vector stays empty.
pub fn centered(v: &Array1<f64>) -> Array1<f64> {
    match v.mean() {
        Some(mean) => v.mapv(|x| x - mean),
        None => v.clone(),
    }
}
