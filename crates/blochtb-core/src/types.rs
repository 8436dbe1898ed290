//! Parameter containers and mode enumerations shared across the engines.
//!
//! The original interface selects formula variants by opaque integers; here
//! they are tagged enumerations whose `from_flag` constructors preserve the
//! original integer mapping exactly.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// Two eigenvalues closer than this are treated as a degenerate pair and
/// excluded from energy-denominator sums rather than surfaced as errors.
pub const DEGENERACY_TOL: f64 = 1e-6;

/// Uniform frequency grid: `num` points starting at `start`, spaced `step`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FrequencyGrid {
    pub start: f64,
    pub step: f64,
    pub num: usize,
}

impl FrequencyGrid {
    pub fn new(start: f64, step: f64, num: usize) -> Self {
        Self { start, step, num }
    }

    /// Frequency of grid point `i`.
    pub fn omega(&self, i: usize) -> f64 {
        self.start + self.step * i as f64
    }

    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        (0..self.num).map(move |i| self.omega(i))
    }
}

/// How occupied states are selected when summing band contributions.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub enum Occupation {
    /// All states with eigenvalue below the Fermi energy, per k-point.
    FermiEnergy(f64),
    /// The lowest N states regardless of absolute energy.
    BandCount(usize),
}

impl Occupation {
    /// Number of occupied states among ascending `eigenvalues`.
    pub fn count(&self, eigenvalues: &[f64]) -> usize {
        match *self {
            Occupation::FermiEnergy(ef) => {
                eigenvalues.iter().take_while(|&&e| e <= ef).count()
            }
            Occupation::BandCount(n) => n.min(eigenvalues.len()),
        }
    }
}

/// Berry-curvature formula variant (original integer flag preserved).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CurvatureMode {
    /// Velocity operator from the analytic Hk gradient alone (flag 0).
    Velocity,
    /// Gradient velocity plus the position-matrix correction i·[Hk, rk]
    /// (flag 1; requires the rR families).
    VelocityWithPosition,
}

impl CurvatureMode {
    pub fn from_flag(flag: i32) -> Result<Self> {
        match flag {
            0 => Ok(CurvatureMode::Velocity),
            1 => Ok(CurvatureMode::VelocityWithPosition),
            _ => Err(CoreError::UnknownFlag { what: "curvature mode", flag }),
        }
    }
}

/// Kubo summation strategy (original integer flag preserved). The two
/// variants are semantically equivalent at zero temperature and differ only
/// in numerical path and cost.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KuboMethod {
    /// Double loop over all band pairs weighted by occupation differences
    /// (flag 0).
    FullBandSum,
    /// Restricted loop over occupied→empty pairs with the resonant and
    /// antiresonant kernels added explicitly (flag 1).
    OccupiedEmptyPairs,
}

impl KuboMethod {
    pub fn from_flag(flag: i32) -> Result<Self> {
        match flag {
            0 => Ok(KuboMethod::FullBandSum),
            1 => Ok(KuboMethod::OccupiedEmptyPairs),
            _ => Err(CoreError::UnknownFlag { what: "kubo method", flag }),
        }
    }
}

/// Broadened δ-function kernel shape for the shift-current engine
/// (original integer flag preserved).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SmearingKernel {
    /// Normalised Gaussian of width η (flag 0).
    Gaussian,
    /// Lorentzian of half-width η (flag 1).
    Lorentzian,
}

impl SmearingKernel {
    pub fn from_flag(flag: i32) -> Result<Self> {
        match flag {
            0 => Ok(SmearingKernel::Gaussian),
            1 => Ok(SmearingKernel::Lorentzian),
            _ => Err(CoreError::UnknownFlag { what: "smearing method", flag }),
        }
    }

    /// Evaluate δ_η(x).
    pub fn delta(&self, x: f64, eta: f64) -> f64 {
        match self {
            SmearingKernel::Gaussian => {
                let t = x / eta;
                (-0.5 * t * t).exp() / (eta * (2.0 * std::f64::consts::PI).sqrt())
            }
            SmearingKernel::Lorentzian => {
                eta / (std::f64::consts::PI * (x * x + eta * eta))
            }
        }
    }
}

/// Parameters of a Kubo optical-conductivity run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KuboParams {
    /// Spin channel count; `nspin == 1` applies the spin-degeneracy factor 2.
    pub nspin: usize,
    pub omega: FrequencyGrid,
    /// Lifetime broadening η (eV).
    pub eta: f64,
    /// Zero-temperature occupation: the lowest N bands are filled.
    pub occupied_band_num: usize,
    /// Size of the full Brillouin-zone mesh this batch is part of; the
    /// accumulated sum is normalised by this, not by the batch length.
    pub total_kpoint_num: usize,
    pub method: KuboMethod,
}

/// Parameters of a shift-current run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShiftCurrentParams {
    pub nspin: usize,
    pub omega: FrequencyGrid,
    pub smearing: SmearingKernel,
    pub eta: f64,
    pub occupied_band_num: usize,
    pub total_kpoint_num: usize,
}

/// Band window and cutoff of a band-unfolding run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct UnfoldingWindow {
    /// Inclusive supercell band-index window.
    pub min_bandindex: usize,
    pub max_bandindex: usize,
    /// Supercell eigenstates above this energy carry zero spectral weight.
    pub ecut: f64,
    pub nspin: usize,
}

impl UnfoldingWindow {
    /// Number of bands in the window.
    pub fn band_count(&self) -> usize {
        self.max_bandindex - self.min_bandindex + 1
    }
}

/// Spin-degeneracy factor: 2 for a spin-unpolarised store, 1 otherwise.
pub(crate) fn spin_degeneracy(nspin: usize) -> f64 {
    if nspin == 1 {
        2.0
    } else {
        1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_frequency_grid() {
        let grid = FrequencyGrid::new(0.5, 0.25, 4);
        let omegas: Vec<f64> = grid.iter().collect();
        assert_eq!(omegas.len(), 4);
        assert_abs_diff_eq!(omegas[3], 1.25, epsilon = 1e-14);
    }

    #[test]
    fn test_occupation_count() {
        let vals = [-1.0, -0.2, 0.3, 1.5];
        assert_eq!(Occupation::FermiEnergy(0.0).count(&vals), 2);
        assert_eq!(Occupation::BandCount(3).count(&vals), 3);
        assert_eq!(Occupation::BandCount(9).count(&vals), 4);
    }

    #[test]
    fn test_flag_round_trip() {
        assert_eq!(CurvatureMode::from_flag(0).unwrap(), CurvatureMode::Velocity);
        assert_eq!(KuboMethod::from_flag(1).unwrap(), KuboMethod::OccupiedEmptyPairs);
        assert!(SmearingKernel::from_flag(7).is_err());
    }

    #[test]
    fn test_smearing_kernels_normalised() {
        // ∫ δ_η(x) dx ≈ 1 on a wide grid
        for kernel in [SmearingKernel::Gaussian, SmearingKernel::Lorentzian] {
            let eta = 0.05;
            let dx = 0.001;
            let total: f64 = (-40_000..40_000)
                .map(|i| kernel.delta(i as f64 * dx, eta) * dx)
                .sum();
            assert_abs_diff_eq!(total, 1.0, epsilon = 2e-2);
        }
    }
}
