//! Band unfolding: supercell spectra projected onto primitive-cell k-points.
//!
//! Given the integer transformation M with supercell lattice
//! $A_s = M A_p$, a primitive k-point (direct, primitive basis) folds onto
//! the supercell point $\mathbf{K} = \mathrm{frac}(M\mathbf{k})$. Each
//! supercell eigenstate there is decomposed over classes of basis functions
//! sharing the same primitive-cell image, and the spectral weight at
//! primitive k is
//!
//! $$ P_N(\mathbf{k}) = \frac{1}{\det M} \sum_{\text{classes}}
//!    \Bigl| \sum_{j \in \text{class}} C_{jN}\,
//!    e^{-i 2\pi \mathbf{k}\cdot\mathbf{n}_j} \Bigr|^2, $$
//!
//! where $\mathbf{n}_j$ is the integer primitive-lattice offset of basis
//! function j within the supercell. Summed over the det(M) primitive
//! k-points folding onto one supercell K, the weights of a state add to one
//! — total weight equals the contributing state count.
//!
//! The atom/orbital metadata enters only through the basis-index → atom
//! mapping; states above `ecut` carry zero weight.

use std::collections::HashMap;

use blochtb_geometry::{BasisLayout, Lattice};
use nalgebra::Matrix3;
use ndarray::Array3;
use num_complex::Complex64;
use rayon::prelude::*;

use crate::bloch;
use crate::eigen;
use crate::error::{CoreError, Result};
use crate::store::RealSpaceStore;
use crate::types::UnfoldingWindow;

const TWO_PI: f64 = 2.0 * std::f64::consts::PI;

/// Fractional part folded into [0, 1).
fn frac(x: f64) -> f64 {
    let f = x - x.floor();
    if (f - 1.0).abs() < 1e-9 {
        0.0
    } else {
        f
    }
}

/// Class key and integer offset of one supercell basis function.
struct BasisImage {
    /// Groups functions with the same primitive-cell image: quantized
    /// fractional position plus the per-basis-function identity.
    class: (i64, i64, i64, usize, usize),
    /// Integer primitive-lattice offset n_j.
    offset: [f64; 3],
}

/// Resolve every supercell basis function to its primitive-cell image.
fn basis_images(
    layout: &BasisLayout,
    lattice: &Lattice,
    m_matrix: &Matrix3<f64>,
) -> Vec<BasisImage> {
    layout
        .entries()
        .iter()
        .map(|entry| {
            let s = lattice.cartesian_to_direct(&entry.position);
            // Primitive direct coordinates of the host atom.
            let p = m_matrix.transpose() * s;
            let t = [frac(p[0]), frac(p[1]), frac(p[2])];
            let offset = [p[0] - t[0], p[1] - t[1], p[2] - t[2]];
            let quantize = |x: f64| (x * 1.0e6).round() as i64;
            BasisImage {
                class: (
                    quantize(t[0]),
                    quantize(t[1]),
                    quantize(t[2]),
                    entry.species,
                    entry.function,
                ),
                offset,
            }
        })
        .collect()
}

/// Unfold the supercell spectrum onto the supplied primitive k-points.
///
/// Returns the spectral-weight array `P` and the energy array `E`, both
/// shaped `(band_count, nspin, k_num)` over the supercell band-index window.
/// The spin channels of a spin-degenerate store are identical copies.
pub fn unfold(
    store: &RealSpaceStore,
    lattice: &Lattice,
    layout: &BasisLayout,
    m_matrix: &Matrix3<f64>,
    k_points: &[[f64; 3]],
    window: &UnfoldingWindow,
) -> Result<(Array3<f64>, Array3<f64>)> {
    let basis_num = store.basis_num();
    if layout.len() != basis_num {
        return Err(CoreError::ShapeMismatch {
            context: "basis layout",
            expected: basis_num,
            got: layout.len(),
        });
    }
    if window.max_bandindex >= basis_num || window.min_bandindex > window.max_bandindex {
        return Err(CoreError::ShapeMismatch {
            context: "band-index window",
            expected: basis_num,
            got: window.max_bandindex,
        });
    }
    let det_m = m_matrix.determinant().round();
    if det_m < 1.0 {
        return Err(CoreError::ShapeMismatch {
            context: "supercell transformation determinant",
            expected: 1,
            got: det_m.abs() as usize,
        });
    }

    let images = basis_images(layout, lattice, m_matrix);
    let band_count = window.band_count();
    let nspin = window.nspin.max(1);
    let k_num = k_points.len();

    // One (P, E) column pair per k, computed in parallel, written by k-index.
    let columns: Vec<(Vec<f64>, Vec<f64>)> = k_points
        .par_iter()
        .map(|k| -> Result<(Vec<f64>, Vec<f64>)> {
            let k_prim = nalgebra::Vector3::new(k[0], k[1], k[2]);
            let k_super = m_matrix * k_prim;
            let folded = [frac(k_super[0]), frac(k_super[1]), frac(k_super[2])];

            let hk = bloch::assemble_hk(store, &folded)?;
            let sk = if store.has_overlap() {
                Some(bloch::assemble_sk(store, &folded)?)
            } else {
                None
            };
            let sol = eigen::diagonalize(&hk, sk.as_ref())?;

            let mut p_col = Vec::with_capacity(band_count);
            let mut e_col = Vec::with_capacity(band_count);
            for band in window.min_bandindex..=window.max_bandindex {
                let energy = sol.eigenvalues[band];
                e_col.push(energy);
                if energy > window.ecut {
                    p_col.push(0.0);
                    continue;
                }
                let mut class_sums: HashMap<(i64, i64, i64, usize, usize), Complex64> = HashMap::new();
                for (j, image) in images.iter().enumerate() {
                    let phase = TWO_PI
                        * (k[0] * image.offset[0]
                            + k[1] * image.offset[1]
                            + k[2] * image.offset[2]);
                    let factor = Complex64::new(0.0, -phase).exp();
                    *class_sums.entry(image.class).or_insert(Complex64::new(0.0, 0.0)) +=
                        sol.eigenvectors[[j, band]] * factor;
                }
                let weight: f64 = class_sums.values().map(|z| z.norm_sqr()).sum();
                p_col.push(weight / det_m);
            }
            Ok((p_col, e_col))
        })
        .collect::<Result<Vec<_>>>()?;

    let mut p = Array3::<f64>::zeros((band_count, nspin, k_num));
    let mut e = Array3::<f64>::zeros((band_count, nspin, k_num));
    for (ik, (p_col, e_col)) in columns.iter().enumerate() {
        for b in 0..band_count {
            for s in 0..nspin {
                p[[b, s, ik]] = p_col[b];
                e[[b, s, ik]] = e_col[b];
            }
        }
    }
    Ok((p, e))
}
