//! The engine facade: lattice + operator store + batch drivers.
//!
//! [`TbEngine`] owns the [`RealSpaceStore`] behind a `RwLock`: mutation
//! methods take the write lock, every batch computation holds the read lock
//! for its whole duration — the single-writer / multiple-reader discipline
//! the store's contract requires. All k-point batches are embarrassingly
//! parallel and run on the rayon pool; output arrays are indexed by input
//! k-point order regardless of execution order.

use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use blochtb_geometry::{BasisLayout, Lattice};
use log::debug;
use nalgebra::Matrix3;
use ndarray::{Array1, Array2, Array3, Array4};
use num_complex::Complex64;
use rayon::prelude::*;

use crate::bloch;
use crate::eigen::{self, EigenSolution};
use crate::error::Result;
use crate::observables::velocity::KState;
use crate::observables::{berry, kubo, shift_current, unfold, velocity};
use crate::store::{OperatorFamily, RealSpaceStore};
use crate::types::{CurvatureMode, KuboParams, Occupation, ShiftCurrentParams, UnfoldingWindow};

/// The tight-binding engine: one lattice, one store, every observable.
#[derive(Debug)]
pub struct TbEngine {
    lattice: Lattice,
    store: RwLock<RealSpaceStore>,
}

impl TbEngine {
    /// A fresh engine for a fixed basis dimension.
    pub fn new(lattice: Lattice, basis_num: usize) -> Self {
        Self {
            lattice,
            store: RwLock::new(RealSpaceStore::new(basis_num)),
        }
    }

    pub fn lattice(&self) -> &Lattice {
        &self.lattice
    }

    pub fn basis_num(&self) -> usize {
        self.read().basis_num()
    }

    // Readers never leave the store half-written; a poisoned lock is
    // recovered, not propagated.
    fn read(&self) -> RwLockReadGuard<'_, RealSpaceStore> {
        self.store.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, RealSpaceStore> {
        self.store.write().unwrap_or_else(|e| e.into_inner())
    }

    // ---- store mutation (write lock) ----------------------------------

    /// Replace HR (and optionally SR) together with their R-set.
    pub fn set_hamiltonian(
        &self,
        r_set: Vec<[f64; 3]>,
        hr: OperatorFamily,
        sr: Option<OperatorFamily>,
    ) -> Result<()> {
        debug!("set_hamiltonian: {} R vectors", r_set.len());
        self.write().set_hamiltonian(r_set, hr, sr)
    }

    /// Replace HR content on the existing R-set.
    pub fn update_hamiltonian(&self, hr: OperatorFamily) -> Result<()> {
        self.write().update_hamiltonian(hr)
    }

    /// Replace SR content on the existing R-set.
    pub fn update_overlap(&self, sr: OperatorFamily) -> Result<()> {
        self.write().update_overlap(sr)
    }

    /// Set the position-operator triplet (x, y, z).
    pub fn set_position(&self, rr: [OperatorFamily; 3]) -> Result<()> {
        self.write().set_position(rr)
    }

    /// Set the momentum-operator triplet (x, y, z).
    pub fn set_momentum(&self, pr: [OperatorFamily; 3]) -> Result<()> {
        self.write().set_momentum(pr)
    }

    /// Replace one direction of the position triplet.
    pub fn update_position(&self, direction: usize, fam: OperatorFamily) -> Result<()> {
        self.write().update_position(direction, fam)
    }

    /// Replace one direction of the momentum triplet.
    pub fn update_momentum(&self, direction: usize, fam: OperatorFamily) -> Result<()> {
        self.write().update_momentum(direction, fam)
    }

    // ---- store getters (copy-on-read) ---------------------------------

    pub fn hamiltonian_matrices(&self) -> Result<Vec<Array2<Complex64>>> {
        self.read().hamiltonian_matrices()
    }

    pub fn overlap_matrices(&self) -> Result<Vec<Array2<Complex64>>> {
        self.read().overlap_matrices()
    }

    pub fn position_matrices(&self, direction: usize) -> Result<Vec<Array2<Complex64>>> {
        self.read().position_matrices(direction)
    }

    pub fn momentum_matrices(&self, direction: usize) -> Result<Vec<Array2<Complex64>>> {
        self.read().momentum_matrices(direction)
    }

    pub fn r_set(&self) -> Vec<[f64; 3]> {
        self.read().r_set().to_vec()
    }

    // ---- Bloch matrices and eigenpairs (read lock) --------------------

    /// Bloch Hamiltonians for a k batch, in input order.
    pub fn hk_batch(&self, k_points: &[[f64; 3]]) -> Result<Vec<Array2<Complex64>>> {
        let store = self.read();
        k_points
            .par_iter()
            .map(|k| bloch::assemble_hk(&store, k))
            .collect()
    }

    /// Bloch overlaps for a k batch (identity matrices when SR is absent).
    pub fn sk_batch(&self, k_points: &[[f64; 3]]) -> Result<Vec<Array2<Complex64>>> {
        let store = self.read();
        k_points
            .par_iter()
            .map(|k| bloch::assemble_sk(&store, k))
            .collect()
    }

    /// Full eigenpairs for a k batch.
    pub fn diagonalize_batch(&self, k_points: &[[f64; 3]]) -> Result<Vec<EigenSolution>> {
        let store = self.read();
        debug!("diagonalize_batch: {} k-points", k_points.len());
        k_points
            .par_iter()
            .map(|k| {
                let hk = bloch::assemble_hk(&store, k)?;
                let sk = if store.has_overlap() {
                    Some(bloch::assemble_sk(&store, k)?)
                } else {
                    None
                };
                eigen::diagonalize(&hk, sk.as_ref())
            })
            .collect()
    }

    /// Eigenvalues-only fast path; rows indexed by input k order.
    pub fn eigenvalues_batch(&self, k_points: &[[f64; 3]]) -> Result<Array2<f64>> {
        let store = self.read();
        let rows: Vec<Array1<f64>> = k_points
            .par_iter()
            .map(|k| {
                let hk = bloch::assemble_hk(&store, k)?;
                let sk = if store.has_overlap() {
                    Some(bloch::assemble_sk(&store, k)?)
                } else {
                    None
                };
                eigen::eigenvalues_only(&hk, sk.as_ref())
            })
            .collect::<Result<_>>()?;
        let n = store.basis_num();
        let mut out = Array2::zeros((k_points.len(), n));
        for (i, row) in rows.into_iter().enumerate() {
            out.row_mut(i).assign(&row);
        }
        Ok(out)
    }

    // ---- observables --------------------------------------------------

    /// Total Berry curvature per k-point, rows = (Ω_yz, Ω_zx, Ω_xy).
    pub fn berry_curvature(
        &self,
        k_points: &[[f64; 3]],
        occupation: Occupation,
        mode: CurvatureMode,
    ) -> Result<Array2<f64>> {
        let store = self.read();
        let rows: Vec<[f64; 3]> = k_points
            .par_iter()
            .map(|k| berry::curvature_at_k(&store, &self.lattice, k, occupation, mode))
            .collect::<Result<_>>()?;
        let mut out = Array2::zeros((k_points.len(), 3));
        for (i, row) in rows.iter().enumerate() {
            for c in 0..3 {
                out[[i, c]] = row[c];
            }
        }
        Ok(out)
    }

    /// Berry phase of a closed k-loop over the lowest `occupied_band_num`
    /// bands, in (−π, π].
    pub fn berry_phase(&self, k_loop: &[[f64; 3]], occupied_band_num: usize) -> Result<f64> {
        berry::berry_phase(&self.read(), k_loop, occupied_band_num)
    }

    /// Wilson-loop eigenphases of a closed k-loop, ascending.
    pub fn wilson_loop(
        &self,
        k_loop: &[[f64; 3]],
        occupied_band_num: usize,
    ) -> Result<Array1<f64>> {
        berry::wilson_loop(&self.read(), k_loop, occupied_band_num)
    }

    /// Kubo optical conductivity σ_ab(ω) and dielectric function ε_ab(ω),
    /// both shaped (3, 3, omega_num).
    pub fn optical_conductivity(
        &self,
        k_points: &[[f64; 3]],
        params: &KuboParams,
    ) -> Result<(Array3<Complex64>, Array3<Complex64>)> {
        kubo::optical_conductivity(&self.read(), &self.lattice, k_points, params)
    }

    /// Shift-current tensor σ^{abc}(ω), shaped (3, 3, 3, omega_num).
    pub fn shift_current(
        &self,
        k_points: &[[f64; 3]],
        params: &ShiftCurrentParams,
    ) -> Result<Array4<f64>> {
        shift_current::shift_current(&self.read(), &self.lattice, k_points, params)
    }

    /// Eigenpairs plus Cartesian velocity matrices at one k-point.
    pub fn velocity_matrix(&self, k: &[f64; 3]) -> Result<KState> {
        velocity::velocity_matrix(&self.read(), &self.lattice, k)
    }

    /// Eigenvalues plus momentum matrices in the eigenbasis at one k-point.
    pub fn momentum_matrix(
        &self,
        k: &[f64; 3],
    ) -> Result<(Array1<f64>, [Array2<Complex64>; 3])> {
        velocity::momentum_matrix(&self.read(), k)
    }

    /// Band unfolding: spectral weights P and energies E over the band
    /// window, both shaped (band_count, nspin, k_num).
    pub fn unfold(
        &self,
        layout: &BasisLayout,
        m_matrix: &Matrix3<f64>,
        k_points: &[[f64; 3]],
        window: &UnfoldingWindow,
    ) -> Result<(Array3<f64>, Array3<f64>)> {
        unfold::unfold(&self.read(), &self.lattice, layout, m_matrix, k_points, window)
    }
}
