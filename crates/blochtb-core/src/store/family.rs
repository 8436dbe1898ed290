//! Dense/sparse polymorphic storage of one operator family.
//!
//! An [`OperatorFamily`] holds one Hermitian matrix per lattice-translation
//! vector R, in the upper-triangle-of-Hermitian convention: only elements
//! with `row ≤ col` are meaningful, and the lower triangle of any assembled
//! Bloch matrix is recovered by conjugate transposition. The representation
//! (dense `ndarray` matrices or compressed-column `sprs` matrices) is chosen
//! at construction; everything downstream goes through the capability
//! surface here and never branches on it.

use ndarray::Array2;
use num_complex::Complex64;
use sprs::CsMatI;

use crate::error::{CoreError, Result};

/// One operator family: a matrix per R, dense or sparse.
#[derive(Debug, Clone)]
pub enum OperatorFamily {
    /// Dense upper-triangle matrices, one per R.
    Dense(Vec<Array2<Complex64>>),
    /// Sparse (compressed-column, Hermitian-upper) matrices, one per R.
    Sparse(Vec<CsMatI<Complex64, usize>>),
}

impl OperatorFamily {
    /// Number of stored R matrices.
    pub fn len(&self) -> usize {
        match self {
            OperatorFamily::Dense(m) => m.len(),
            OperatorFamily::Sparse(m) => m.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total nonzero count across all R matrices (dense matrices count every
    /// element).
    pub fn nonzero_count(&self) -> usize {
        match self {
            OperatorFamily::Dense(m) => m.iter().map(|a| a.len()).sum(),
            OperatorFamily::Sparse(m) => m.iter().map(|a| a.nnz()).sum(),
        }
    }

    /// Validate every matrix against the declared basis dimension and the
    /// expected R count.
    pub fn check_shape(&self, context: &'static str, basis_num: usize, r_num: usize) -> Result<()> {
        if self.len() != r_num {
            return Err(CoreError::ShapeMismatch {
                context,
                expected: r_num,
                got: self.len(),
            });
        }
        match self {
            OperatorFamily::Dense(mats) => {
                for m in mats {
                    if m.nrows() != basis_num || m.ncols() != basis_num {
                        return Err(CoreError::ShapeMismatch {
                            context,
                            expected: basis_num,
                            got: m.nrows().max(m.ncols()),
                        });
                    }
                }
            }
            OperatorFamily::Sparse(mats) => {
                for m in mats {
                    if m.rows() != basis_num || m.cols() != basis_num {
                        return Err(CoreError::ShapeMismatch {
                            context,
                            expected: basis_num,
                            got: m.rows().max(m.cols()),
                        });
                    }
                }
            }
        }
        Ok(())
    }

    /// Accumulate `out += Σ_i weights[i] · M_i` on the stored (upper)
    /// triangle. `out` must be `basis_num × basis_num`; `weights` must match
    /// the R count.
    pub fn accumulate_weighted(&self, weights: &[Complex64], out: &mut Array2<Complex64>) {
        match self {
            OperatorFamily::Dense(mats) => {
                for (m, &w) in mats.iter().zip(weights) {
                    out.zip_mut_with(m, |o, &v| *o += w * v);
                }
            }
            OperatorFamily::Sparse(mats) => {
                for (m, &w) in mats.iter().zip(weights) {
                    for (&v, (i, j)) in m.iter() {
                        out[[i, j]] += w * v;
                    }
                }
            }
        }
    }

    /// Materialise every stored matrix as a dense copy (copy-on-read).
    pub fn to_dense(&self) -> Vec<Array2<Complex64>> {
        match self {
            OperatorFamily::Dense(mats) => mats.clone(),
            OperatorFamily::Sparse(mats) => mats
                .iter()
                .map(|m| {
                    let mut dense = Array2::zeros((m.rows(), m.cols()));
                    for (&v, (i, j)) in m.iter() {
                        dense[[i, j]] = v;
                    }
                    dense
                })
                .collect(),
        }
    }
}
