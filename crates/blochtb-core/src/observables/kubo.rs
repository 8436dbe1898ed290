//! Kubo linear-response optical conductivity and dielectric function.
//!
//! The interband conductivity tensor on a uniform frequency grid,
//!
//! $$ \sigma_{ab}(\omega) = \frac{i\,g_s}{V N_k} \sum_{\mathbf{k}}
//!    \sum_{n \neq m} \frac{f_n - f_m}{E_{nm}}\,
//!    \frac{v_a[n,m]\,v_b[m,n]}{\omega + E_{nm} + i\eta}, $$
//!
//! with $E_{nm} = E_n - E_m$, zero-temperature occupations filled up to
//! `occupied_band_num`, spin degeneracy $g_s$ from `nspin`, and the finite
//! lifetime η regularising the resonance. Natural units (e = ħ = 1) with
//! energies in eV and lengths in Å; the resonant pole sits at the interband
//! transition energy.
//!
//! The dielectric function follows as
//! $\varepsilon_{ab}(\omega) = \delta_{ab} + 4\pi i\,\sigma_{ab}(\omega)/(\omega + i\eta)$.
//!
//! Brillouin-zone integration is uniform sampling: contributions accumulate
//! over the supplied k batch and are normalised by `total_kpoint_num`, so a
//! batch may be any slice of the caller's full mesh. Accuracy scales with
//! mesh density; nothing is adaptively refined.

use blochtb_geometry::Lattice;
use ndarray::Array3;
use num_complex::Complex64;
use rayon::prelude::*;

use crate::error::Result;
use crate::observables::velocity::{k_state, KState};
use crate::store::RealSpaceStore;
use crate::types::{spin_degeneracy, KuboMethod, KuboParams, DEGENERACY_TOL};

/// Contributing ordered band pairs (n, m) with occupation weights f_n − f_m.
fn band_pairs(method: KuboMethod, n_sta: usize, n_occ: usize) -> Vec<(usize, usize, f64)> {
    match method {
        KuboMethod::FullBandSum => {
            let occ = |i: usize| if i < n_occ { 1.0 } else { 0.0 };
            let mut pairs = Vec::with_capacity(n_sta * n_sta);
            for n in 0..n_sta {
                for m in 0..n_sta {
                    if n != m {
                        pairs.push((n, m, occ(n) - occ(m)));
                    }
                }
            }
            pairs
        }
        KuboMethod::OccupiedEmptyPairs => {
            let mut pairs = Vec::with_capacity(2 * n_occ * (n_sta - n_occ));
            for n in 0..n_occ {
                for m in n_occ..n_sta {
                    pairs.push((n, m, 1.0));
                    pairs.push((m, n, -1.0));
                }
            }
            pairs
        }
    }
}

/// Conductivity contribution of a single k-point, shape (3, 3, omega_num).
fn conductivity_at_k(state: &KState, params: &KuboParams) -> Array3<Complex64> {
    let n_sta = state.energies.len();
    let n_occ = params.occupied_band_num.min(n_sta);
    let mut sigma = Array3::<Complex64>::zeros((3, 3, params.omega.num));

    for (n, m, weight) in band_pairs(params.method, n_sta, n_occ) {
        if weight == 0.0 {
            continue;
        }
        let e_nm = state.energies[n] - state.energies[m];
        if e_nm.abs() < DEGENERACY_TOL {
            continue;
        }
        for a in 0..3 {
            for b in 0..3 {
                let vv = state.velocity[a][[n, m]] * state.velocity[b][[m, n]];
                let amplitude = vv * (weight / e_nm);
                for (w, omega) in params.omega.iter().enumerate() {
                    let kernel = Complex64::from(1.0) / Complex64::new(omega + e_nm, params.eta);
                    sigma[[a, b, w]] += Complex64::i() * amplitude * kernel;
                }
            }
        }
    }
    sigma
}

/// Frequency-resolved optical conductivity and dielectric function,
/// accumulated over the k batch in parallel.
pub fn optical_conductivity(
    store: &RealSpaceStore,
    lattice: &Lattice,
    k_points: &[[f64; 3]],
    params: &KuboParams,
) -> Result<(Array3<Complex64>, Array3<Complex64>)> {
    let zero = || Array3::<Complex64>::zeros((3, 3, params.omega.num));
    let total: Array3<Complex64> = k_points
        .par_iter()
        .map(|k| -> Result<Array3<Complex64>> {
            let state = k_state(store, lattice, k, false)?;
            Ok(conductivity_at_k(&state, params))
        })
        .try_reduce(zero, |a, b| Ok(a + b))?;

    let norm = spin_degeneracy(params.nspin)
        / (lattice.volume() * params.total_kpoint_num.max(1) as f64);
    let sigma = total.mapv(|v| v * norm);

    let mut epsilon = Array3::<Complex64>::zeros((3, 3, params.omega.num));
    for a in 0..3 {
        for b in 0..3 {
            for (w, omega) in params.omega.iter().enumerate() {
                let diag = if a == b {
                    Complex64::new(1.0, 0.0)
                } else {
                    Complex64::new(0.0, 0.0)
                };
                let denom = Complex64::new(omega, params.eta);
                epsilon[[a, b, w]] = diag
                    + Complex64::i() * 4.0 * std::f64::consts::PI * sigma[[a, b, w]] / denom;
            }
        }
    }
    Ok((sigma, epsilon))
}
