//! Integration test: Berry curvature integrated over the Brillouin zone of
//! a two-band Chern insulator. The lattice sum of Ω_xy over a uniform mesh
//! must reproduce the quantised Chern number in the topological phase and
//! zero in the trivial one.
//!
//! Model: H(k) = sin(2πk_x)·σ_x + sin(2πk_y)·σ_y
//!             + (m + cos(2πk_x) + cos(2πk_y))·σ_z
//! on the square lattice, gapped for |m| ∉ {0, 2}; the lower band carries
//! Chern number ±1 for 0 < |m| < 2.

use approx::assert_abs_diff_eq;
use blochtb_core::{CurvatureMode, Occupation, OperatorFamily, TbEngine};
use blochtb_geometry::Lattice;
use nalgebra::Matrix3;
use ndarray::array;
use num_complex::Complex64;

const PI: f64 = std::f64::consts::PI;

fn c(re: f64, im: f64) -> Complex64 {
    Complex64::new(re, im)
}

/// Two-band Chern model with mass `m`; only Hermitian-upper parts stored.
fn chern_engine(m: f64) -> TbEngine {
    let engine = TbEngine::new(Lattice::new(1.0, Matrix3::identity()).unwrap(), 2);
    let h0 = array![[c(m, 0.0), c(0.0, 0.0)], [c(0.0, 0.0), c(-m, 0.0)]];
    // H(+x) = σ_z/2 − i·σ_x/2, H(+y) = σ_z/2 − i·σ_y/2, plus Hermitian images.
    let hx = array![[c(0.5, 0.0), c(0.0, -0.5)], [c(0.0, 0.0), c(-0.5, 0.0)]];
    let hxm = array![[c(0.5, 0.0), c(0.0, 0.5)], [c(0.0, 0.0), c(-0.5, 0.0)]];
    let hy = array![[c(0.5, 0.0), c(-0.5, 0.0)], [c(0.0, 0.0), c(-0.5, 0.0)]];
    let hym = array![[c(0.5, 0.0), c(0.5, 0.0)], [c(0.0, 0.0), c(-0.5, 0.0)]];
    engine
        .set_hamiltonian(
            vec![
                [0.0, 0.0, 0.0],
                [1.0, 0.0, 0.0],
                [-1.0, 0.0, 0.0],
                [0.0, 1.0, 0.0],
                [0.0, -1.0, 0.0],
            ],
            OperatorFamily::Dense(vec![h0, hx, hxm, hy, hym]),
            None,
        )
        .unwrap();
    engine
}

fn bz_mesh(n: usize) -> Vec<[f64; 3]> {
    let mut mesh = Vec::with_capacity(n * n);
    for i in 0..n {
        for j in 0..n {
            mesh.push([i as f64 / n as f64, j as f64 / n as f64, 0.0]);
        }
    }
    mesh
}

/// C = (1/2π)·Σ_k Ω_xy·ΔA with ΔA = (2π/N)² for unit lattice constant.
fn chern_number(engine: &TbEngine, n: usize, occupation: Occupation) -> f64 {
    let mesh = bz_mesh(n);
    let omega = engine
        .berry_curvature(&mesh, occupation, CurvatureMode::Velocity)
        .unwrap();
    let cell = (2.0 * PI / n as f64).powi(2);
    omega.column(2).sum() * cell / (2.0 * PI)
}

#[test]
fn test_chern_number_topological_phase() {
    let engine = chern_engine(-1.0);
    let chern = chern_number(&engine, 30, Occupation::BandCount(1));
    assert_abs_diff_eq!(chern.abs(), 1.0, epsilon = 5e-2);
}

#[test]
fn test_chern_number_trivial_phase() {
    let engine = chern_engine(-3.0);
    let chern = chern_number(&engine, 30, Occupation::BandCount(1));
    assert_abs_diff_eq!(chern, 0.0, epsilon = 5e-2);
}

#[test]
fn test_fermi_energy_occupation_matches_band_count() {
    // With E_F in the gap the two occupation selections are identical.
    let engine = chern_engine(-1.0);
    let mesh = bz_mesh(12);
    let by_count = engine
        .berry_curvature(&mesh, Occupation::BandCount(1), CurvatureMode::Velocity)
        .unwrap();
    let by_fermi = engine
        .berry_curvature(&mesh, Occupation::FermiEnergy(0.0), CurvatureMode::Velocity)
        .unwrap();
    for (a, b) in by_count.iter().zip(by_fermi.iter()) {
        assert_abs_diff_eq!(a, b, epsilon = 1e-14);
    }
}

#[test]
fn test_position_corrected_mode_with_vanishing_rr() {
    // A zero position family must leave the gradient-only curvature intact.
    let engine = chern_engine(-1.0);
    let zero = || {
        OperatorFamily::Dense(vec![
            ndarray::Array2::zeros((2, 2));
            5
        ])
    };
    engine.set_position([zero(), zero(), zero()]).unwrap();

    let mesh = bz_mesh(8);
    let plain = engine
        .berry_curvature(&mesh, Occupation::BandCount(1), CurvatureMode::Velocity)
        .unwrap();
    let corrected = engine
        .berry_curvature(&mesh, Occupation::BandCount(1), CurvatureMode::VelocityWithPosition)
        .unwrap();
    for (a, b) in plain.iter().zip(corrected.iter()) {
        assert_abs_diff_eq!(a, b, epsilon = 1e-12);
    }
}

#[test]
fn test_time_reversal_symmetric_model_has_zero_curvature() {
    // Real hoppings ⇒ TRS ⇒ Ω(k) + Ω(−k) = 0, and Ω ≡ 0 along k_y = 0 here.
    let engine = TbEngine::new(Lattice::new(1.0, Matrix3::identity()).unwrap(), 2);
    let h0 = array![[c(0.0, 0.0), c(1.0, 0.0)], [c(0.0, 0.0), c(0.0, 0.0)]];
    let h1m = array![[c(0.0, 0.0), c(0.4, 0.0)], [c(0.0, 0.0), c(0.0, 0.0)]];
    let h1 = h1m.t().mapv(|v: Complex64| v.conj());
    engine
        .set_hamiltonian(
            vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [-1.0, 0.0, 0.0]],
            OperatorFamily::Dense(vec![h0, h1, h1m]),
            None,
        )
        .unwrap();
    let omega = engine
        .berry_curvature(
            &[[0.13, 0.0, 0.0], [0.77, 0.0, 0.0]],
            Occupation::BandCount(1),
            CurvatureMode::Velocity,
        )
        .unwrap();
    for v in omega.iter() {
        assert_abs_diff_eq!(*v, 0.0, epsilon = 1e-10);
    }
}
