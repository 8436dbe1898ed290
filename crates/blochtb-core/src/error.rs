//! Error taxonomy of the core engine.
//!
//! Every variant is a deterministic input or numerical defect: the failing
//! call is unrecoverable and surfaced immediately, never retried.

use thiserror::Error;

/// Errors that can occur while storing operators or computing observables.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Dimension or count inconsistency between supplied matrices and the
    /// declared basis/R-set sizes. Always a caller input defect.
    #[error("shape mismatch in {context}: expected {expected}, got {got}")]
    ShapeMismatch {
        context: &'static str,
        expected: usize,
        got: usize,
    },

    /// The operation requires an operator family that was never set.
    #[error("operator family `{0}` has not been initialised")]
    NotInitialized(&'static str),

    /// Cholesky factorisation of the overlap failed during the generalized
    /// eigensolve — the overlap data is not Hermitian positive definite.
    #[error("overlap matrix is not positive definite: {0}")]
    NonPositiveDefiniteOverlap(String),

    /// A Berry-phase/Wilson-loop k-loop whose endpoints are not related by a
    /// reciprocal lattice vector.
    #[error(
        "k-loop is not closed under a reciprocal lattice vector \
         (endpoint gap [{0:.3e}, {1:.3e}, {2:.3e}])"
    )]
    OpenLoop(f64, f64, f64),

    /// An integer mode/method flag outside the preserved mapping.
    #[error("unknown {what} flag {flag}")]
    UnknownFlag { what: &'static str, flag: i32 },

    /// Backend (LAPACK) failure outside the positive-definiteness contract.
    #[error("linear algebra backend error: {0}")]
    LinAlg(String),
}

pub type Result<T> = std::result::Result<T, CoreError>;
