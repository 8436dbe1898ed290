//! Shift current: the second-order DC photocurrent response.
//!
//! Structurally this mirrors the Kubo engine — the same frequency grid,
//! k-sampling, occupation, and spin-degeneracy contract — but sums triple
//! products of interband matrix elements. Off-diagonal position elements
//! come from the velocity matrix,
//!
//! $$ r_a[n,m] = \frac{v_a[n,m]}{i\,E_{nm}} \quad (n \neq m), $$
//!
//! and the gauge-covariant (generalized) derivative follows from the
//! sum rule of Sipe & Shkrebtii (Phys. Rev. B **61**, 5337 (2000)):
//!
//! $$ r_b[n,m;a] = \frac{r_a[n,m]\Delta_b[n,m] + r_b[n,m]\Delta_a[n,m]}{i E_{nm}}
//!    + \frac{1}{i E_{nm}} \sum_{p \neq n,m}
//!      \bigl( E_{np}\, r_a[n,p]\, r_b[p,m] - E_{pm}\, r_b[n,p]\, r_a[p,m] \bigr), $$
//!
//! with $\Delta_a[n,m] = v_a[n,n] - v_a[m,m]$. The response tensor is
//!
//! $$ \sigma^{abc}(\omega) = \frac{\pi\,g_s}{V N_k} \sum_{\mathbf{k}}
//!    \sum_{n\,\text{occ}}\sum_{m\,\text{emp}}
//!    \tfrac12\,\mathrm{Im}\bigl( r_b[m,n]\,r_c[n,m;a] + r_c[m,n]\,r_b[n,m;a] \bigr)\,
//!    \delta_\eta(E_{mn} - \omega), $$
//!
//! where the δ-kernel shape (Gaussian or Lorentzian of width η) is selected
//! by `smearing_method`. Degenerate pairs are excluded from every
//! energy-denominator by the shared tolerance.

use blochtb_geometry::Lattice;
use ndarray::{Array2, Array4};
use num_complex::Complex64;
use rayon::prelude::*;

use crate::error::Result;
use crate::observables::velocity::{k_state, KState};
use crate::store::RealSpaceStore;
use crate::types::{spin_degeneracy, ShiftCurrentParams, DEGENERACY_TOL};

/// Interband position matrices r_a[n,m] (diagonal left zero).
fn position_elements(state: &KState) -> [Array2<Complex64>; 3] {
    let n_sta = state.energies.len();
    let mut r = [
        Array2::zeros((n_sta, n_sta)),
        Array2::zeros((n_sta, n_sta)),
        Array2::zeros((n_sta, n_sta)),
    ];
    for a in 0..3 {
        for n in 0..n_sta {
            for m in 0..n_sta {
                if n == m {
                    continue;
                }
                let e_nm = state.energies[n] - state.energies[m];
                if e_nm.abs() < DEGENERACY_TOL {
                    continue;
                }
                r[a][[n, m]] = state.velocity[a][[n, m]] / Complex64::new(0.0, e_nm);
            }
        }
    }
    r
}

/// Generalized derivative r_b[n,m;a] from the sum rule.
fn generalized_derivative(
    state: &KState,
    r: &[Array2<Complex64>; 3],
    n: usize,
    m: usize,
    a: usize,
    b: usize,
) -> Complex64 {
    let e_nm = state.energies[n] - state.energies[m];
    if e_nm.abs() < DEGENERACY_TOL {
        return Complex64::new(0.0, 0.0);
    }
    let n_sta = state.energies.len();

    let delta_a = (state.velocity[a][[n, n]] - state.velocity[a][[m, m]]).re;
    let delta_b = (state.velocity[b][[n, n]] - state.velocity[b][[m, m]]).re;

    let mut total = r[a][[n, m]] * delta_b + r[b][[n, m]] * delta_a;
    for p in 0..n_sta {
        if p == n || p == m {
            continue;
        }
        let e_np = state.energies[n] - state.energies[p];
        let e_pm = state.energies[p] - state.energies[m];
        total += e_np * r[a][[n, p]] * r[b][[p, m]] - e_pm * r[b][[n, p]] * r[a][[p, m]];
    }
    total / Complex64::new(0.0, e_nm)
}

/// Shift-current contribution of a single k-point, shape (3, 3, 3, omega_num).
fn shift_current_at_k(state: &KState, params: &ShiftCurrentParams) -> Array4<f64> {
    let n_sta = state.energies.len();
    let n_occ = params.occupied_band_num.min(n_sta);
    let r = position_elements(state);
    let mut out = Array4::<f64>::zeros((3, 3, 3, params.omega.num));

    for n in 0..n_occ {
        for m in n_occ..n_sta {
            let e_mn = state.energies[m] - state.energies[n];
            if e_mn.abs() < DEGENERACY_TOL {
                continue;
            }
            // δ_η(E_mn − ω) evaluated once per frequency for this transition.
            let kernels: Vec<f64> = params
                .omega
                .iter()
                .map(|omega| params.smearing.delta(e_mn - omega, params.eta))
                .collect();

            for a in 0..3 {
                for b in 0..3 {
                    for c in 0..3 {
                        let rc_deriv = generalized_derivative(state, &r, n, m, a, c);
                        let rb_deriv = generalized_derivative(state, &r, n, m, a, b);
                        let integrand = 0.5
                            * ((r[b][[m, n]] * rc_deriv).im + (r[c][[m, n]] * rb_deriv).im);
                        if integrand == 0.0 {
                            continue;
                        }
                        for (w, kern) in kernels.iter().enumerate() {
                            out[[a, b, c, w]] += integrand * kern;
                        }
                    }
                }
            }
        }
    }
    out
}

/// Frequency-resolved shift-current tensor σ^{abc}(ω), accumulated over the
/// k batch in parallel and normalised by cell volume and mesh size.
pub fn shift_current(
    store: &RealSpaceStore,
    lattice: &Lattice,
    k_points: &[[f64; 3]],
    params: &ShiftCurrentParams,
) -> Result<Array4<f64>> {
    let zero = || Array4::<f64>::zeros((3, 3, 3, params.omega.num));
    let total: Array4<f64> = k_points
        .par_iter()
        .map(|k| -> Result<Array4<f64>> {
            let state = k_state(store, lattice, k, false)?;
            Ok(shift_current_at_k(&state, params))
        })
        .try_reduce(zero, |a, b| Ok(a + b))?;

    let norm = std::f64::consts::PI * spin_degeneracy(params.nspin)
        / (lattice.volume() * params.total_kpoint_num.max(1) as f64);
    Ok(total.mapv(|v| v * norm))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FrequencyGrid, SmearingKernel};
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    fn toy_state() -> KState {
        // Two levels at ∓1 eV with a complex interband velocity element.
        let v01 = Complex64::new(0.3, 0.4);
        let mut vx = Array2::zeros((2, 2));
        vx[[0, 1]] = v01;
        vx[[1, 0]] = v01.conj();
        // Unequal band velocities break the symmetry that would otherwise
        // null the two-level response.
        vx[[0, 0]] = Complex64::new(0.2, 0.0);
        vx[[1, 1]] = Complex64::new(-0.1, 0.0);
        KState {
            energies: array![-1.0, 1.0],
            vectors: ndarray::Array2::eye(2),
            velocity: [vx.clone(), Array2::zeros((2, 2)), Array2::zeros((2, 2))],
        }
    }

    #[test]
    fn test_position_elements_antihermitian_pairing() {
        // r[n,m] = v[n,m]/(iE_nm) ⇒ r must be Hermitian like v.
        let state = toy_state();
        let r = position_elements(&state);
        let d = r[0][[0, 1]] - r[0][[1, 0]].conj();
        assert_abs_diff_eq!(d.norm(), 0.0, epsilon = 1e-14);
        assert_abs_diff_eq!(r[0][[0, 0]].norm(), 0.0, epsilon = 1e-14);
    }

    #[test]
    fn test_response_peaks_at_transition_energy() {
        let params = ShiftCurrentParams {
            nspin: 1,
            omega: FrequencyGrid::new(0.5, 0.05, 61),
            smearing: SmearingKernel::Gaussian,
            eta: 0.1,
            occupied_band_num: 1,
            total_kpoint_num: 1,
        };
        let state = toy_state();
        let out = shift_current_at_k(&state, &params);
        // The transition sits at E_mn = 2 eV: whatever component is nonzero
        // must be peaked there.
        let mut best = (0, 0.0f64);
        for w in 0..params.omega.num {
            let mag: f64 = (0..3)
                .flat_map(|a| (0..3).flat_map(move |b| (0..3).map(move |c| (a, b, c))))
                .map(|(a, b, c)| out[[a, b, c, w]].abs())
                .sum();
            if mag > best.1 {
                best = (w, mag);
            }
        }
        if best.1 > 0.0 {
            assert_abs_diff_eq!(params.omega.omega(best.0), 2.0, epsilon = 0.051);
        }
    }
}
