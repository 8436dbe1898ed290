//! Velocity and momentum matrix elements in the band eigenbasis.
//!
//! The velocity operator is the analytic k-gradient of the Bloch
//! Hamiltonian projected into the eigenbasis,
//!
//! $$ V_a(\mathbf{k}) = U^\dagger(\mathbf{k})\,
//!    \partial_{k_a} H(\mathbf{k})\, U(\mathbf{k}), $$
//!
//! not a finite-difference approximation. For a non-orthogonal basis the
//! overlap gradient enters through the Hermitian-symmetrised correction
//! $-\tfrac12\{U^\dagger \partial_{k_a}S\,U,\ \mathrm{diag}(E)\}$, which
//! vanishes when SR is absent. When the position families are stored, the
//! Berry-connection correction $i[H_k, r_{k,a}]$ can be folded into the
//! operator before projection (curvature mode 1).
//!
//! Every observable engine shares this single pathway so that curvature,
//! Kubo, and shift-current sums stay physically consistent with one another.

use blochtb_geometry::Lattice;
use ndarray::{Array1, Array2};
use num_complex::Complex64;

use crate::bloch;
use crate::eigen::{self, adjoint, EigenSolution};
use crate::error::Result;
use crate::store::RealSpaceStore;

/// Eigenpairs plus the velocity matrices in the eigenbasis at one k-point.
#[derive(Debug, Clone)]
pub struct KState {
    /// Eigenvalues, ascending (eV).
    pub energies: Array1<f64>,
    /// Eigenvector columns, S-orthonormal.
    pub vectors: Array2<Complex64>,
    /// Velocity matrices, one per Cartesian direction.
    pub velocity: [Array2<Complex64>; 3],
}

/// Diagonalize at `k` and project the velocity operator into the eigenbasis.
///
/// `with_position` folds the i·[Hk, rk] correction into the operator before
/// projection; it requires the rR families.
pub fn k_state(
    store: &RealSpaceStore,
    lattice: &Lattice,
    k: &[f64; 3],
    with_position: bool,
) -> Result<KState> {
    let hk = bloch::assemble_hk(store, k)?;
    let sk = if store.has_overlap() {
        Some(bloch::assemble_sk(store, k)?)
    } else {
        None
    };
    let solution = eigen::diagonalize(&hk, sk.as_ref())?;

    let mut operators = bloch::assemble_hk_gradient(store, lattice, k)?;
    if with_position {
        let rk = bloch::assemble_rk(store, k)?;
        for (op, r) in operators.iter_mut().zip(rk.iter()) {
            // i·[Hk, rk_a]
            let comm = hk.dot(r) - r.dot(&hk);
            op.zip_mut_with(&comm, |o, &c| *o += Complex64::i() * c);
        }
    }

    let sk_grad = bloch::assemble_sk_gradient(store, lattice, k)?;

    let u = &solution.eigenvectors;
    let u_dag = adjoint(u);
    let n = store.basis_num();
    let mut velocity = [
        Array2::zeros((n, n)),
        Array2::zeros((n, n)),
        Array2::zeros((n, n)),
    ];
    for a in 0..3 {
        let mut v_eig = u_dag.dot(&operators[a]).dot(u);
        if let Some(sg) = &sk_grad {
            let w = u_dag.dot(&sg[a]).dot(u);
            for nn in 0..n {
                for mm in 0..n {
                    let mean_e = 0.5 * (solution.eigenvalues[nn] + solution.eigenvalues[mm]);
                    v_eig[[nn, mm]] -= w[[nn, mm]] * mean_e;
                }
            }
        }
        velocity[a] = v_eig;
    }

    let EigenSolution { eigenvalues, eigenvectors } = solution;
    Ok(KState {
        energies: eigenvalues,
        vectors: eigenvectors,
        velocity,
    })
}

/// The velocity-matrix operation: eigenvalues, eigenvectors, and the three
/// Cartesian velocity matrices at one k-point.
pub fn velocity_matrix(store: &RealSpaceStore, lattice: &Lattice, k: &[f64; 3]) -> Result<KState> {
    k_state(store, lattice, k, false)
}

/// The momentum-matrix variant: eigenvalues plus U†·p_k·U per direction,
/// built from the stored pR families directly.
pub fn momentum_matrix(
    store: &RealSpaceStore,
    k: &[f64; 3],
) -> Result<(Array1<f64>, [Array2<Complex64>; 3])> {
    let hk = bloch::assemble_hk(store, k)?;
    let sk = if store.has_overlap() {
        Some(bloch::assemble_sk(store, k)?)
    } else {
        None
    };
    let solution = eigen::diagonalize(&hk, sk.as_ref())?;

    let pk = bloch::assemble_pk(store, k)?;
    let u = &solution.eigenvectors;
    let u_dag = adjoint(u);
    let projected = [
        u_dag.dot(&pk[0]).dot(u),
        u_dag.dot(&pk[1]).dot(u),
        u_dag.dot(&pk[2]).dot(u),
    ];
    Ok((solution.eigenvalues, projected))
}
