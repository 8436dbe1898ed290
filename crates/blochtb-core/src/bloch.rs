//! Lattice Fourier assembly of Bloch matrices.
//!
//! For every stored operator family the assembler evaluates the Bloch sum
//!
//! $$ O(\mathbf{k}) = \sum_{\mathbf{R}} e^{i 2\pi \mathbf{k}\cdot\mathbf{R}}\, O(\mathbf{R}) $$
//!
//! with k and R both in direct (fractional) coordinates — no implicit
//! Cartesian conversion happens here. The sum is accumulated on the stored
//! upper triangle and the lower triangle is filled by conjugate
//! transposition afterwards, so every assembled matrix is Hermitian by
//! construction.
//!
//! The analytic k-gradient of the Bloch sum,
//!
//! $$ \partial_{k_a} H(\mathbf{k})
//!    = \sum_{\mathbf{R}} i\,(\mathbf{R}_{\text{cart}})_a\,
//!      e^{i 2\pi \mathbf{k}\cdot\mathbf{R}}\, H(\mathbf{R}), $$
//!
//! uses the Cartesian components of R so that velocity matrix elements come
//! out in the same Cartesian frame as the position/momentum families.

use blochtb_geometry::Lattice;
use nalgebra::Vector3;
use ndarray::Array2;
use num_complex::Complex64;

use crate::error::Result;
use crate::store::RealSpaceStore;

const TWO_PI: f64 = 2.0 * std::f64::consts::PI;

/// Phase factors exp(i·2π·k·R) for every R of the set.
pub fn phase_factors(r_set: &[[f64; 3]], k: &[f64; 3]) -> Vec<Complex64> {
    r_set
        .iter()
        .map(|r| {
            let kr = TWO_PI * (k[0] * r[0] + k[1] * r[1] + k[2] * r[2]);
            Complex64::new(0.0, kr).exp()
        })
        .collect()
}

/// Per-direction gradient weights i·(R_cart)_a·exp(i·2π·k·R).
fn gradient_weights(
    r_set: &[[f64; 3]],
    lattice: &Lattice,
    k: &[f64; 3],
) -> [Vec<Complex64>; 3] {
    let phases = phase_factors(r_set, k);
    let mut weights = [
        Vec::with_capacity(r_set.len()),
        Vec::with_capacity(r_set.len()),
        Vec::with_capacity(r_set.len()),
    ];
    for (r, phase) in r_set.iter().zip(&phases) {
        let r_cart = lattice.direct_to_cartesian(&Vector3::new(r[0], r[1], r[2]));
        for a in 0..3 {
            weights[a].push(Complex64::new(0.0, r_cart[a]) * phase);
        }
    }
    weights
}

/// Fill the strict lower triangle from the conjugate of the upper one.
fn hermitize(m: &mut Array2<Complex64>) {
    let n = m.nrows();
    for i in 0..n {
        for j in 0..i {
            m[[i, j]] = m[[j, i]].conj();
        }
    }
}

/// Assemble the Bloch Hamiltonian Hk at one k-point (direct coordinates).
pub fn assemble_hk(store: &RealSpaceStore, k: &[f64; 3]) -> Result<Array2<Complex64>> {
    let hr = store.hr()?;
    let phases = phase_factors(store.r_set(), k);
    let n = store.basis_num();
    let mut hk = Array2::zeros((n, n));
    hr.accumulate_weighted(&phases, &mut hk);
    hermitize(&mut hk);
    Ok(hk)
}

/// Assemble the Bloch overlap Sk; identity when no overlap family is stored
/// (orthogonal-basis assumption).
pub fn assemble_sk(store: &RealSpaceStore, k: &[f64; 3]) -> Result<Array2<Complex64>> {
    let n = store.basis_num();
    match store.sr() {
        Some(sr) => {
            let phases = phase_factors(store.r_set(), k);
            let mut sk = Array2::zeros((n, n));
            sr.accumulate_weighted(&phases, &mut sk);
            hermitize(&mut sk);
            Ok(sk)
        }
        None => Ok(Array2::eye(n)),
    }
}

/// Assemble the position-operator Bloch matrices (x, y, z) at one k-point.
pub fn assemble_rk(store: &RealSpaceStore, k: &[f64; 3]) -> Result<[Array2<Complex64>; 3]> {
    let rr = store.rr()?;
    let phases = phase_factors(store.r_set(), k);
    let n = store.basis_num();
    let mut out = [Array2::zeros((n, n)), Array2::zeros((n, n)), Array2::zeros((n, n))];
    for (fam, mat) in rr.iter().zip(out.iter_mut()) {
        fam.accumulate_weighted(&phases, mat);
        hermitize(mat);
    }
    Ok(out)
}

/// Assemble the momentum-operator Bloch matrices (x, y, z) at one k-point.
pub fn assemble_pk(store: &RealSpaceStore, k: &[f64; 3]) -> Result<[Array2<Complex64>; 3]> {
    let pr = store.pr()?;
    let phases = phase_factors(store.r_set(), k);
    let n = store.basis_num();
    let mut out = [Array2::zeros((n, n)), Array2::zeros((n, n)), Array2::zeros((n, n))];
    for (fam, mat) in pr.iter().zip(out.iter_mut()) {
        fam.accumulate_weighted(&phases, mat);
        hermitize(mat);
    }
    Ok(out)
}

/// Analytic Cartesian k-gradient of Hk, one matrix per direction.
pub fn assemble_hk_gradient(
    store: &RealSpaceStore,
    lattice: &Lattice,
    k: &[f64; 3],
) -> Result<[Array2<Complex64>; 3]> {
    let hr = store.hr()?;
    let weights = gradient_weights(store.r_set(), lattice, k);
    let n = store.basis_num();
    let mut out = [Array2::zeros((n, n)), Array2::zeros((n, n)), Array2::zeros((n, n))];
    for (w, mat) in weights.iter().zip(out.iter_mut()) {
        hr.accumulate_weighted(w, mat);
        hermitize(mat);
    }
    Ok(out)
}

/// Analytic Cartesian k-gradient of Sk; `None` when no overlap is stored
/// (the identity has a vanishing gradient).
pub fn assemble_sk_gradient(
    store: &RealSpaceStore,
    lattice: &Lattice,
    k: &[f64; 3],
) -> Result<Option<[Array2<Complex64>; 3]>> {
    let sr = match store.sr() {
        Some(sr) => sr,
        None => return Ok(None),
    };
    let weights = gradient_weights(store.r_set(), lattice, k);
    let n = store.basis_num();
    let mut out = [Array2::zeros((n, n)), Array2::zeros((n, n)), Array2::zeros((n, n))];
    for (w, mat) in weights.iter().zip(out.iter_mut()) {
        sr.accumulate_weighted(w, mat);
        hermitize(mat);
    }
    Ok(Some(out))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::OperatorFamily;
    use approx::assert_abs_diff_eq;
    use nalgebra::Matrix3;
    use ndarray::array;

    fn c(re: f64, im: f64) -> Complex64 {
        Complex64::new(re, im)
    }

    fn chain_store(t: f64) -> RealSpaceStore {
        // One orbital, hoppings at R = ±x: E(k) = 2t·cos(2πk).
        let mut store = RealSpaceStore::new(1);
        let hr = OperatorFamily::Dense(vec![
            array![[c(0.0, 0.0)]],
            array![[c(t, 0.0)]],
            array![[c(t, 0.0)]],
        ]);
        store
            .set_hamiltonian(
                vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [-1.0, 0.0, 0.0]],
                hr,
                None,
            )
            .unwrap();
        store
    }

    #[test]
    fn test_gamma_point_equals_h0() {
        // Single R = 0 family: Hk(0) must equal H(0) exactly.
        let mut store = RealSpaceStore::new(2);
        let h0 = array![[c(0.0, 0.0), c(1.0, 0.0)], [c(0.0, 0.0), c(0.0, 0.0)]];
        store
            .set_hamiltonian(vec![[0.0, 0.0, 0.0]], OperatorFamily::Dense(vec![h0]), None)
            .unwrap();
        let hk = assemble_hk(&store, &[0.0, 0.0, 0.0]).unwrap();
        assert_abs_diff_eq!(hk[[0, 1]].re, 1.0, epsilon = 1e-15);
        assert_abs_diff_eq!(hk[[1, 0]].re, 1.0, epsilon = 1e-15);
        assert_abs_diff_eq!(hk[[0, 0]].re, 0.0, epsilon = 1e-15);
    }

    #[test]
    fn test_chain_dispersion() {
        let store = chain_store(-1.0);
        for &k in &[0.0, 0.13, 0.5, 0.77] {
            let hk = assemble_hk(&store, &[k, 0.0, 0.0]).unwrap();
            assert_abs_diff_eq!(hk[[0, 0]].re, -2.0 * (TWO_PI * k).cos(), epsilon = 1e-12);
            assert_abs_diff_eq!(hk[[0, 0]].im, 0.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_assembled_matrix_is_hermitian() {
        let mut store = RealSpaceStore::new(2);
        let h0 = array![[c(0.5, 0.0), c(1.0, 0.3)], [c(0.0, 0.0), c(-0.5, 0.0)]];
        let h1 = array![[c(0.1, 0.2), c(0.4, -0.1)], [c(0.0, 0.0), c(0.2, 0.1)]];
        // H(-R) entries are the Hermitian images of H(R)'s.
        let h1m = h1.mapv(|v| v.conj());
        store
            .set_hamiltonian(
                vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [-1.0, 0.0, 0.0]],
                OperatorFamily::Dense(vec![h0, h1, h1m]),
                None,
            )
            .unwrap();
        let hk = assemble_hk(&store, &[0.31, 0.0, 0.0]).unwrap();
        for i in 0..2 {
            for j in 0..2 {
                let d = hk[[i, j]] - hk[[j, i]].conj();
                assert_abs_diff_eq!(d.norm(), 0.0, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn test_sk_defaults_to_identity() {
        let store = chain_store(1.0);
        let sk = assemble_sk(&store, &[0.2, 0.0, 0.0]).unwrap();
        assert_abs_diff_eq!(sk[[0, 0]].re, 1.0, epsilon = 1e-15);
    }

    #[test]
    fn test_chain_gradient_matches_analytic_velocity() {
        // v(k) = dE/dk_cart = −2·t·a·sin(2πk) for the cosine band.
        let a = 2.5;
        let t = -1.0;
        let lattice = Lattice::new(a, Matrix3::identity()).unwrap();
        let store = chain_store(t);
        let k = 0.21;
        let grad = assemble_hk_gradient(&store, &lattice, &[k, 0.0, 0.0]).unwrap();
        let expect = -2.0 * t * a * (TWO_PI * k).sin();
        assert_abs_diff_eq!(grad[0][[0, 0]].re, expect, epsilon = 1e-12);
        assert_abs_diff_eq!(grad[1][[0, 0]].norm(), 0.0, epsilon = 1e-12);
    }
}
