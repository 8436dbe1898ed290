//! Berry curvature, Berry phase, and Wilson loops.
//!
//! Curvature uses the Kubo-formula sum over states,
//!
//! $$ \Omega_{ab}(\mathbf{k}) = -2\,\mathrm{Im}
//!    \sum_{n\,\text{occ}} \sum_{m \neq n}
//!    \frac{\langle n|v_a|m\rangle \langle m|v_b|n\rangle}
//!         {(E_n - E_m)^2}, $$
//!
//! with pairs closer than the degeneracy tolerance excluded from the sum —
//! a deliberate truncation, not an error. The three independent components
//! are returned as the pseudovector (Ω_yz, Ω_zx, Ω_xy).
//!
//! The Berry phase of a closed k-loop is the phase of the product of
//! occupied-subspace overlap determinants between consecutive loop points;
//! the Wilson loop returns the eigenphases of the ordered product of the
//! same overlap matrices. Both require the loop's last point to be related
//! to the first by a reciprocal lattice vector.

use blochtb_geometry::Lattice;
use ndarray::{s, Array1, Array2};
use ndarray_linalg::{Determinant, Eig};
use num_complex::Complex64;

use crate::bloch;
use crate::eigen::{self, adjoint};
use crate::error::{CoreError, Result};
use crate::observables::velocity::k_state;
use crate::store::RealSpaceStore;
use crate::types::{CurvatureMode, Occupation, DEGENERACY_TOL};

/// Berry-curvature pseudovector at one k-point.
pub fn curvature_at_k(
    store: &RealSpaceStore,
    lattice: &Lattice,
    k: &[f64; 3],
    occupation: Occupation,
    mode: CurvatureMode,
) -> Result<[f64; 3]> {
    let with_position = mode == CurvatureMode::VelocityWithPosition;
    let state = k_state(store, lattice, k, with_position)?;
    let n_sta = state.energies.len();
    let n_occ = occupation.count(&state.energies.to_vec());

    // (Ω_yz, Ω_zx, Ω_xy)
    let components = [(1usize, 2usize), (2, 0), (0, 1)];
    let mut omega = [0.0; 3];
    for (c, &(a, b)) in components.iter().enumerate() {
        let va = &state.velocity[a];
        let vb = &state.velocity[b];
        let mut total = 0.0;
        for n in 0..n_occ {
            for m in 0..n_sta {
                if m == n {
                    continue;
                }
                let de = state.energies[n] - state.energies[m];
                if de.abs() < DEGENERACY_TOL {
                    // Degenerate pair: stays out of the sum.
                    continue;
                }
                total += (va[[n, m]] * vb[[m, n]]).im / (de * de);
            }
        }
        omega[c] = -2.0 * total;
    }
    Ok(omega)
}

/// Distance of each component of `v` from the nearest integer.
fn integer_gap(v: [f64; 3]) -> [f64; 3] {
    [
        (v[0] - v[0].round()).abs(),
        (v[1] - v[1].round()).abs(),
        (v[2] - v[2].round()).abs(),
    ]
}

/// Occupied-subspace overlap matrices Λ_i between consecutive loop points.
///
/// The loop is `k_loop[0] … k_loop[n-1]` with the last point equal to the
/// first up to a reciprocal lattice vector; the closing point is dropped
/// after validation and the final segment wraps back onto the first
/// eigenvector set (periodic gauge — Hk is exactly G-periodic in this phase
/// convention). The overlap metric for each segment is Sk assembled at the
/// segment midpoint.
fn loop_overlaps(
    store: &RealSpaceStore,
    k_loop: &[[f64; 3]],
    occupied_band_num: usize,
) -> Result<Vec<Array2<Complex64>>> {
    if k_loop.len() < 3 {
        return Err(CoreError::ShapeMismatch {
            context: "k-loop (need at least two segments plus closure)",
            expected: 3,
            got: k_loop.len(),
        });
    }
    if occupied_band_num > store.basis_num() {
        return Err(CoreError::ShapeMismatch {
            context: "occupied band count",
            expected: store.basis_num(),
            got: occupied_band_num,
        });
    }

    let first = k_loop[0];
    let last = k_loop[k_loop.len() - 1];
    let gap = integer_gap([last[0] - first[0], last[1] - first[1], last[2] - first[2]]);
    if gap.iter().any(|g| *g > 1e-8) {
        return Err(CoreError::OpenLoop(gap[0], gap[1], gap[2]));
    }

    let points = &k_loop[..k_loop.len() - 1];
    let mut occ_vectors = Vec::with_capacity(points.len());
    for k in points {
        let hk = bloch::assemble_hk(store, k)?;
        let sk = if store.has_overlap() {
            Some(bloch::assemble_sk(store, k)?)
        } else {
            None
        };
        let sol = eigen::diagonalize(&hk, sk.as_ref())?;
        occ_vectors.push(sol.eigenvectors.slice(s![.., ..occupied_band_num]).to_owned());
    }

    let m = points.len();
    let mut overlaps = Vec::with_capacity(m);
    for i in 0..m {
        let k_a = k_loop[i];
        let k_b = k_loop[i + 1];
        let mid = [
            0.5 * (k_a[0] + k_b[0]),
            0.5 * (k_a[1] + k_b[1]),
            0.5 * (k_a[2] + k_b[2]),
        ];
        let metric = bloch::assemble_sk(store, &mid)?;
        let u_a = &occ_vectors[i];
        let u_b = &occ_vectors[(i + 1) % m];
        overlaps.push(adjoint(u_a).dot(&metric).dot(u_b));
    }
    Ok(overlaps)
}

/// Berry phase of a closed k-loop over the lowest `occupied_band_num` bands.
///
/// φ = −Im ln ∏_i det Λ_i, reported in (−π, π].
pub fn berry_phase(
    store: &RealSpaceStore,
    k_loop: &[[f64; 3]],
    occupied_band_num: usize,
) -> Result<f64> {
    let overlaps = loop_overlaps(store, k_loop, occupied_band_num)?;
    let mut product = Complex64::new(1.0, 0.0);
    for lambda in &overlaps {
        let det = lambda
            .det()
            .map_err(|e| CoreError::LinAlg(e.to_string()))?;
        product *= det;
    }
    Ok(-product.arg())
}

/// Wilson-loop spectrum: the eigenphases of the ordered product of the
/// occupied-subspace overlap matrices, ascending.
pub fn wilson_loop(
    store: &RealSpaceStore,
    k_loop: &[[f64; 3]],
    occupied_band_num: usize,
) -> Result<Array1<f64>> {
    let overlaps = loop_overlaps(store, k_loop, occupied_band_num)?;
    let mut w = Array2::<Complex64>::eye(occupied_band_num);
    for lambda in &overlaps {
        w = w.dot(lambda);
    }
    let (eigs, _) = w.eig().map_err(|e| CoreError::LinAlg(e.to_string()))?;
    let mut phases: Vec<f64> = eigs.iter().map(|z| z.arg()).collect();
    phases.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    Ok(Array1::from_vec(phases))
}
