//! Atomic species, site positions, and numerical-orbital metadata.
//!
//! The tight-binding core treats its basis as an opaque index range; this
//! module carries the metadata needed to interpret basis index → (atom,
//! orbital) — which is all the band-unfolding engine requires. The tabulated
//! radial functions are inert numeric payload retained alongside.

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

/// One numerical atomic orbital: an angular-momentum channel with a
/// tabulated radial function on a uniform mesh.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NumericalOrbital {
    /// Angular momentum quantum number l.
    pub l: u32,
    /// Number of radial mesh points.
    pub mesh: usize,
    /// Radial step (Å).
    pub dr: f64,
    /// Tabulated radial values, length `mesh`.
    pub values: Vec<f64>,
}

impl NumericalOrbital {
    /// Number of basis functions this orbital contributes (2l + 1).
    pub fn multiplicity(&self) -> usize {
        2 * self.l as usize + 1
    }
}

/// An atomic species: a label, the Cartesian positions of its atoms, and
/// its orbital set (shared by every atom of the species).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AtomSpecies {
    pub label: String,
    /// Cartesian atom positions (Å).
    pub positions: Vec<Vector3<f64>>,
    /// Orbitals in basis order; empty until registered.
    pub orbitals: Vec<NumericalOrbital>,
}

impl AtomSpecies {
    pub fn new(label: impl Into<String>, positions: Vec<Vector3<f64>>) -> Self {
        Self {
            label: label.into(),
            positions,
            orbitals: Vec::new(),
        }
    }

    /// Basis functions per atom of this species.
    pub fn functions_per_atom(&self) -> usize {
        self.orbitals.iter().map(NumericalOrbital::multiplicity).sum()
    }
}

/// One entry of the flattened basis: which atom a basis function sits on and
/// which orbital (within the atom) it is.
#[derive(Debug, Clone)]
pub struct BasisEntry {
    pub species: usize,
    pub atom: usize,
    /// Index of the function within its atom (orbital channel × m flattened).
    pub function: usize,
    /// Cartesian position of the host atom (Å).
    pub position: Vector3<f64>,
}

/// Flattened basis-index → (atom, orbital) map.
///
/// Basis functions are ordered species-major, then atom, then orbital
/// channel, then m — matching the ordering of the operator matrices handed
/// to the core.
#[derive(Debug, Clone, Default)]
pub struct BasisLayout {
    entries: Vec<BasisEntry>,
}

impl BasisLayout {
    /// Flatten a species list into a per-basis-function layout.
    pub fn from_species(species: &[AtomSpecies]) -> Self {
        let mut entries = Vec::new();
        for (si, sp) in species.iter().enumerate() {
            let per_atom = sp.functions_per_atom();
            for (ai, pos) in sp.positions.iter().enumerate() {
                for f in 0..per_atom {
                    entries.push(BasisEntry {
                        species: si,
                        atom: ai,
                        function: f,
                        position: *pos,
                    });
                }
            }
        }
        Self { entries }
    }

    /// Total number of basis functions.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entry for basis index `i`.
    pub fn entry(&self, i: usize) -> &BasisEntry {
        &self.entries[i]
    }

    pub fn entries(&self) -> &[BasisEntry] {
        &self.entries
    }
}
