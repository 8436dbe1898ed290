//! The real-space operator store.
//!
//! Owns the ordered R-set and the operator families living on it: the
//! Hamiltonian HR, the optional overlap SR (same R-set), and the optional
//! position rR and momentum pR triplets (one family per Cartesian direction,
//! sharing HR's R-set). Setters replace a family wholesale and the store
//! copies what it is given — getters hand back copies too, so no caller ever
//! aliases internal state.

mod family;

pub use family::OperatorFamily;

use ndarray::Array2;
use num_complex::Complex64;

use crate::error::{CoreError, Result};

/// Cartesian direction index used for the rR/pR triplets.
pub const DIRECTIONS: usize = 3;

/// The store: one R-set plus the operator families defined on it.
#[derive(Debug)]
pub struct RealSpaceStore {
    basis_num: usize,
    r_set: Vec<[f64; 3]>,
    hr: Option<OperatorFamily>,
    sr: Option<OperatorFamily>,
    rr: Option<[OperatorFamily; DIRECTIONS]>,
    pr: Option<[OperatorFamily; DIRECTIONS]>,
}

impl RealSpaceStore {
    /// An empty store for a fixed basis dimension.
    pub fn new(basis_num: usize) -> Self {
        Self {
            basis_num,
            r_set: Vec::new(),
            hr: None,
            sr: None,
            rr: None,
            pr: None,
        }
    }

    pub fn basis_num(&self) -> usize {
        self.basis_num
    }

    /// The ordered R-set (direct coordinates).
    pub fn r_set(&self) -> &[[f64; 3]] {
        &self.r_set
    }

    pub fn r_num(&self) -> usize {
        self.r_set.len()
    }

    fn check_direction(direction: usize) -> Result<()> {
        if direction >= DIRECTIONS {
            return Err(CoreError::ShapeMismatch {
                context: "Cartesian direction index",
                expected: DIRECTIONS - 1,
                got: direction,
            });
        }
        Ok(())
    }

    fn check_no_duplicate_r(r_set: &[[f64; 3]]) -> Result<()> {
        for (i, a) in r_set.iter().enumerate() {
            for b in r_set.iter().skip(i + 1) {
                if (a[0] - b[0]).abs() < 1e-8
                    && (a[1] - b[1]).abs() < 1e-8
                    && (a[2] - b[2]).abs() < 1e-8
                {
                    return Err(CoreError::ShapeMismatch {
                        context: "R-set (duplicate translation vector)",
                        expected: r_set.len(),
                        got: i,
                    });
                }
            }
        }
        Ok(())
    }

    /// Replace the Hamiltonian family (and optionally the overlap family)
    /// together with the R-set they live on.
    pub fn set_hamiltonian(
        &mut self,
        r_set: Vec<[f64; 3]>,
        hr: OperatorFamily,
        sr: Option<OperatorFamily>,
    ) -> Result<()> {
        Self::check_no_duplicate_r(&r_set)?;
        hr.check_shape("HR", self.basis_num, r_set.len())?;
        if let Some(sr) = &sr {
            sr.check_shape("SR", self.basis_num, r_set.len())?;
        }
        self.r_set = r_set;
        self.hr = Some(hr);
        self.sr = sr;
        // The position/momentum triplets were defined on the previous R-set.
        self.rr = None;
        self.pr = None;
        Ok(())
    }

    /// Replace Hamiltonian matrix content without changing the R-set.
    pub fn update_hamiltonian(&mut self, hr: OperatorFamily) -> Result<()> {
        if self.hr.is_none() {
            return Err(CoreError::NotInitialized("HR"));
        }
        hr.check_shape("HR", self.basis_num, self.r_set.len())?;
        self.hr = Some(hr);
        Ok(())
    }

    /// Replace overlap matrix content without changing the R-set.
    pub fn update_overlap(&mut self, sr: OperatorFamily) -> Result<()> {
        if self.sr.is_none() {
            return Err(CoreError::NotInitialized("SR"));
        }
        sr.check_shape("SR", self.basis_num, self.r_set.len())?;
        self.sr = Some(sr);
        Ok(())
    }

    /// Set the position-operator triplet (x, y, z) on HR's R-set.
    pub fn set_position(&mut self, rr: [OperatorFamily; DIRECTIONS]) -> Result<()> {
        if self.hr.is_none() {
            return Err(CoreError::NotInitialized("HR"));
        }
        for fam in &rr {
            fam.check_shape("rR", self.basis_num, self.r_set.len())?;
        }
        self.rr = Some(rr);
        Ok(())
    }

    /// Set the momentum-operator triplet (x, y, z) on HR's R-set.
    pub fn set_momentum(&mut self, pr: [OperatorFamily; DIRECTIONS]) -> Result<()> {
        if self.hr.is_none() {
            return Err(CoreError::NotInitialized("HR"));
        }
        for fam in &pr {
            fam.check_shape("pR", self.basis_num, self.r_set.len())?;
        }
        self.pr = Some(pr);
        Ok(())
    }

    /// Replace one direction of the position triplet.
    pub fn update_position(&mut self, direction: usize, fam: OperatorFamily) -> Result<()> {
        Self::check_direction(direction)?;
        fam.check_shape("rR", self.basis_num, self.r_set.len())?;
        match &mut self.rr {
            Some(rr) => {
                rr[direction] = fam;
                Ok(())
            }
            None => Err(CoreError::NotInitialized("rR")),
        }
    }

    /// Replace one direction of the momentum triplet.
    pub fn update_momentum(&mut self, direction: usize, fam: OperatorFamily) -> Result<()> {
        Self::check_direction(direction)?;
        fam.check_shape("pR", self.basis_num, self.r_set.len())?;
        match &mut self.pr {
            Some(pr) => {
                pr[direction] = fam;
                Ok(())
            }
            None => Err(CoreError::NotInitialized("pR")),
        }
    }

    pub(crate) fn hr(&self) -> Result<&OperatorFamily> {
        self.hr.as_ref().ok_or(CoreError::NotInitialized("HR"))
    }

    pub(crate) fn sr(&self) -> Option<&OperatorFamily> {
        self.sr.as_ref()
    }

    pub(crate) fn rr(&self) -> Result<&[OperatorFamily; DIRECTIONS]> {
        self.rr.as_ref().ok_or(CoreError::NotInitialized("rR"))
    }

    pub(crate) fn pr(&self) -> Result<&[OperatorFamily; DIRECTIONS]> {
        self.pr.as_ref().ok_or(CoreError::NotInitialized("pR"))
    }

    pub fn has_overlap(&self) -> bool {
        self.sr.is_some()
    }

    pub fn has_position(&self) -> bool {
        self.rr.is_some()
    }

    pub fn has_momentum(&self) -> bool {
        self.pr.is_some()
    }

    /// Copy-on-read view of the Hamiltonian matrices.
    pub fn hamiltonian_matrices(&self) -> Result<Vec<Array2<Complex64>>> {
        Ok(self.hr()?.to_dense())
    }

    /// Copy-on-read view of the overlap matrices.
    pub fn overlap_matrices(&self) -> Result<Vec<Array2<Complex64>>> {
        self.sr
            .as_ref()
            .map(OperatorFamily::to_dense)
            .ok_or(CoreError::NotInitialized("SR"))
    }

    /// Copy-on-read view of one direction of the position matrices.
    pub fn position_matrices(&self, direction: usize) -> Result<Vec<Array2<Complex64>>> {
        Self::check_direction(direction)?;
        Ok(self.rr()?[direction].to_dense())
    }

    /// Copy-on-read view of one direction of the momentum matrices.
    pub fn momentum_matrices(&self, direction: usize) -> Result<Vec<Array2<Complex64>>> {
        Self::check_direction(direction)?;
        Ok(self.pr()?[direction].to_dense())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn c(re: f64, im: f64) -> Complex64 {
        Complex64::new(re, im)
    }

    fn one_r_family() -> OperatorFamily {
        OperatorFamily::Dense(vec![array![
            [c(0.0, 0.0), c(1.0, 0.0)],
            [c(0.0, 0.0), c(0.0, 0.0)]
        ]])
    }

    #[test]
    fn test_set_then_get_round_trip() {
        let mut store = RealSpaceStore::new(2);
        store
            .set_hamiltonian(vec![[0.0, 0.0, 0.0]], one_r_family(), None)
            .unwrap();
        let back = store.hamiltonian_matrices().unwrap();
        assert_eq!(back.len(), 1);
        assert_eq!(back[0][[0, 1]], c(1.0, 0.0));
    }

    #[test]
    fn test_update_before_set_fails() {
        let mut store = RealSpaceStore::new(2);
        assert!(matches!(
            store.update_hamiltonian(one_r_family()),
            Err(CoreError::NotInitialized("HR"))
        ));
    }

    #[test]
    fn test_shape_mismatch_detected() {
        let mut store = RealSpaceStore::new(3);
        let err = store.set_hamiltonian(vec![[0.0, 0.0, 0.0]], one_r_family(), None);
        assert!(matches!(err, Err(CoreError::ShapeMismatch { .. })));
    }

    #[test]
    fn test_duplicate_r_rejected() {
        let mut store = RealSpaceStore::new(2);
        let fam = OperatorFamily::Dense(vec![
            Array2::zeros((2, 2)),
            Array2::zeros((2, 2)),
        ]);
        let err = store.set_hamiltonian(vec![[0.0, 0.0, 0.0], [0.0, 0.0, 0.0]], fam, None);
        assert!(err.is_err());
    }

    #[test]
    fn test_position_requires_hamiltonian() {
        let mut store = RealSpaceStore::new(2);
        let triplet = [one_r_family(), one_r_family(), one_r_family()];
        assert!(matches!(
            store.set_position(triplet),
            Err(CoreError::NotInitialized("HR"))
        ));
    }
}
