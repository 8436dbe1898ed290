//! Standard and generalized Hermitian eigensolver.
//!
//! The generalized problem $H\mathbf{v} = \lambda S\mathbf{v}$ is reduced to
//! a standard one through the Cholesky factorisation $S = LL^\dagger$:
//!
//! $$ (L^{-1} H L^{-\dagger})\,\mathbf{y} = \lambda\,\mathbf{y},
//!    \qquad \mathbf{v} = L^{-\dagger}\mathbf{y}. $$
//!
//! A failed factorisation means the supplied overlap is not Hermitian
//! positive definite and surfaces as
//! [`CoreError::NonPositiveDefiniteOverlap`]. Eigenvalues are returned
//! ascending; eigenvectors (columns) are orthonormal under the Sk metric.
//! Within a degenerate subspace the eigenvector basis is NOT gauge-fixed —
//! gauge-covariant consumers apply the degeneracy tolerance policy instead
//! of assuming a canonical choice.

use ndarray::{Array1, Array2};
use ndarray_linalg::{Cholesky, EigValsh, Eigh, Inverse, UPLO};
use num_complex::Complex64;

use crate::error::{CoreError, Result};

/// Ordered eigenvalues with their S-orthonormal eigenvector columns.
#[derive(Debug, Clone)]
pub struct EigenSolution {
    /// Real eigenvalues, ascending.
    pub eigenvalues: Array1<f64>,
    /// Eigenvectors as columns, orthonormal under the overlap metric.
    pub eigenvectors: Array2<Complex64>,
}

/// Conjugate transpose.
pub(crate) fn adjoint(m: &Array2<Complex64>) -> Array2<Complex64> {
    m.t().mapv(|v| v.conj())
}

/// Solve the (generalized) Hermitian eigenproblem at one k-point.
///
/// Pass `None` for `sk` when the overlap is the identity; the standard
/// Hermitian path is used then.
pub fn diagonalize(hk: &Array2<Complex64>, sk: Option<&Array2<Complex64>>) -> Result<EigenSolution> {
    match sk {
        None => {
            let (eigenvalues, eigenvectors) = hk
                .eigh(UPLO::Upper)
                .map_err(|e| CoreError::LinAlg(e.to_string()))?;
            Ok(EigenSolution { eigenvalues, eigenvectors })
        }
        Some(sk) => {
            let l = sk
                .cholesky(UPLO::Lower)
                .map_err(|e| CoreError::NonPositiveDefiniteOverlap(e.to_string()))?;
            let l_inv = l
                .inv()
                .map_err(|e| CoreError::NonPositiveDefiniteOverlap(e.to_string()))?;
            let l_inv_h = adjoint(&l_inv);
            let reduced = l_inv.dot(hk).dot(&l_inv_h);
            let (eigenvalues, y) = reduced
                .eigh(UPLO::Upper)
                .map_err(|e| CoreError::LinAlg(e.to_string()))?;
            let eigenvectors = l_inv_h.dot(&y);
            Ok(EigenSolution { eigenvalues, eigenvectors })
        }
    }
}

/// Eigenvalues-only fast path (no eigenvector back-transformation).
pub fn eigenvalues_only(
    hk: &Array2<Complex64>,
    sk: Option<&Array2<Complex64>>,
) -> Result<Array1<f64>> {
    match sk {
        None => hk
            .eigvalsh(UPLO::Upper)
            .map_err(|e| CoreError::LinAlg(e.to_string())),
        Some(sk) => {
            let l = sk
                .cholesky(UPLO::Lower)
                .map_err(|e| CoreError::NonPositiveDefiniteOverlap(e.to_string()))?;
            let l_inv = l
                .inv()
                .map_err(|e| CoreError::NonPositiveDefiniteOverlap(e.to_string()))?;
            let reduced = l_inv.dot(hk).dot(&adjoint(&l_inv));
            reduced
                .eigvalsh(UPLO::Upper)
                .map_err(|e| CoreError::LinAlg(e.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    fn c(re: f64, im: f64) -> Complex64 {
        Complex64::new(re, im)
    }

    #[test]
    fn test_two_level_standard_problem() {
        let hk = array![[c(0.0, 0.0), c(1.0, 0.0)], [c(1.0, 0.0), c(0.0, 0.0)]];
        let sol = diagonalize(&hk, None).unwrap();
        assert_abs_diff_eq!(sol.eigenvalues[0], -1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(sol.eigenvalues[1], 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_generalized_problem_s_orthonormality() {
        let hk = array![[c(1.0, 0.0), c(0.4, 0.2)], [c(0.4, -0.2), c(-0.5, 0.0)]];
        let sk = array![[c(1.0, 0.0), c(0.2, 0.1)], [c(0.2, -0.1), c(1.0, 0.0)]];
        let sol = diagonalize(&hk, Some(&sk)).unwrap();

        assert!(sol.eigenvalues[0] <= sol.eigenvalues[1]);

        // U† S U = I
        let gram = adjoint(&sol.eigenvectors).dot(&sk).dot(&sol.eigenvectors);
        for i in 0..2 {
            for j in 0..2 {
                let expect = if i == j { 1.0 } else { 0.0 };
                assert_abs_diff_eq!(gram[[i, j]].re, expect, epsilon = 1e-10);
                assert_abs_diff_eq!(gram[[i, j]].im, 0.0, epsilon = 1e-10);
            }
        }

        // H v = λ S v
        for n in 0..2 {
            let v = sol.eigenvectors.column(n).to_owned();
            let hv = hk.dot(&v);
            let sv = sk.dot(&v);
            for i in 0..2 {
                let d = hv[i] - sv[i] * sol.eigenvalues[n];
                assert_abs_diff_eq!(d.norm(), 0.0, epsilon = 1e-10);
            }
        }
    }

    #[test]
    fn test_indefinite_overlap_rejected() {
        let hk = array![[c(1.0, 0.0), c(0.0, 0.0)], [c(0.0, 0.0), c(1.0, 0.0)]];
        let sk = array![[c(1.0, 0.0), c(0.0, 0.0)], [c(0.0, 0.0), c(-1.0, 0.0)]];
        assert!(matches!(
            diagonalize(&hk, Some(&sk)),
            Err(CoreError::NonPositiveDefiniteOverlap(_))
        ));
    }

    #[test]
    fn test_eigenvalues_only_agrees() {
        let hk = array![[c(0.3, 0.0), c(0.7, 0.1)], [c(0.7, -0.1), c(-0.2, 0.0)]];
        let sk = array![[c(1.1, 0.0), c(0.1, 0.0)], [c(0.1, 0.0), c(0.9, 0.0)]];
        let full = diagonalize(&hk, Some(&sk)).unwrap();
        let vals = eigenvalues_only(&hk, Some(&sk)).unwrap();
        for n in 0..2 {
            assert_abs_diff_eq!(full.eigenvalues[n], vals[n], epsilon = 1e-12);
        }
    }
}
