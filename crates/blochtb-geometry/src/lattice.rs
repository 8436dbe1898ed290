//! The real-space lattice and its reciprocal.
//!
//! A [`Lattice`] is immutable after construction: it holds the lattice
//! constant, the 3×3 lattice-vector matrix (row $i$ is the Cartesian vector
//! $\mathbf{a}_i$, already scaled by the lattice constant), and the derived
//! inverse and reciprocal matrices. Direct (fractional) coordinates are
//! related to Cartesian ones by
//!
//! $$\mathbf{r} = \sum_i d_i \mathbf{a}_i, \qquad
//!   \mathbf{b}_i \cdot \mathbf{a}_j = 2\pi \delta_{ij}.$$

use nalgebra::{Matrix3, Vector3};
use thiserror::Error;

/// Errors arising from lattice construction.
#[derive(Debug, Error)]
pub enum GeometryError {
    #[error("lattice-vector matrix is singular (determinant {det:.3e})")]
    DegenerateLattice { det: f64 },
}

/// An immutable real-space lattice.
#[derive(Debug, Clone)]
pub struct Lattice {
    constant: f64,
    /// Rows are the scaled lattice vectors in Cartesian units (Å).
    vectors: Matrix3<f64>,
    /// Inverse of `vectors`, cached at construction.
    inverse: Matrix3<f64>,
    /// Rows are the reciprocal-lattice vectors (2π convention, Å⁻¹).
    reciprocal: Matrix3<f64>,
}

impl Lattice {
    /// Build a lattice from a constant and the 3×3 vector matrix.
    ///
    /// `vectors` rows are the lattice vectors in units of `constant`; they
    /// are scaled on construction so that all stored quantities are in
    /// Cartesian Å. Fails with [`GeometryError::DegenerateLattice`] when the
    /// matrix is not invertible.
    pub fn new(constant: f64, vectors: Matrix3<f64>) -> Result<Self, GeometryError> {
        let scaled = vectors * constant;
        let det = scaled.determinant();
        if det.abs() < 1e-12 {
            return Err(GeometryError::DegenerateLattice { det });
        }
        let inverse = scaled
            .try_inverse()
            .ok_or(GeometryError::DegenerateLattice { det })?;
        // b_i · a_j = 2π δ_ij  ⇒  B = 2π (A⁻¹)ᵀ
        let reciprocal = inverse.transpose() * (2.0 * std::f64::consts::PI);
        Ok(Self {
            constant,
            vectors: scaled,
            inverse,
            reciprocal,
        })
    }

    /// The lattice constant (Å).
    pub fn constant(&self) -> f64 {
        self.constant
    }

    /// The scaled lattice-vector matrix (rows = vectors, Å).
    pub fn vectors(&self) -> &Matrix3<f64> {
        &self.vectors
    }

    /// The reciprocal-lattice matrix (rows = vectors, Å⁻¹, 2π convention).
    pub fn reciprocal(&self) -> &Matrix3<f64> {
        &self.reciprocal
    }

    /// Cell volume (Å³).
    pub fn volume(&self) -> f64 {
        self.vectors.determinant().abs()
    }

    /// Direct (fractional) → Cartesian for a real-space vector.
    pub fn direct_to_cartesian(&self, direct: &Vector3<f64>) -> Vector3<f64> {
        self.vectors.transpose() * direct
    }

    /// Cartesian → direct (fractional) for a real-space vector.
    pub fn cartesian_to_direct(&self, cartesian: &Vector3<f64>) -> Vector3<f64> {
        self.inverse.transpose() * cartesian
    }

    /// Direct → Cartesian for a reciprocal-space vector (Å⁻¹).
    pub fn direct_to_cartesian_kspace(&self, k_direct: &Vector3<f64>) -> Vector3<f64> {
        self.reciprocal.transpose() * k_direct
    }
}
