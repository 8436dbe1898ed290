//! # BlochTB Core
//!
//! The numerical backbone of the BlochTB framework. Given a real-space
//! lattice and a set of hopping/overlap matrices indexed by
//! lattice-translation vectors, this crate assembles Bloch Hamiltonians at
//! arbitrary crystal momenta, solves the (generalized) Hermitian
//! eigenproblem, and derives physical observables from the eigenpairs.
//!
//! ## Architecture
//!
//! All observables flow through a single pathway: the
//! [`store::RealSpaceStore`] owns the real-space operator families, the
//! [`bloch`] assembler Fourier-transforms them to a given k-point, and the
//! [`eigen`] solver produces ordered, overlap-orthonormal eigenpairs. Each
//! observable engine in [`observables`] is an independent consumer of that
//! pair; none calls another. The [`engine::TbEngine`] facade wires the
//! pieces together and parallelises k-point batches.
//!
//! ## Modules
//!
//! - [`types`] — Parameter containers, mode/method enumerations, tolerances.
//! - [`store`] — Real-space operator store (dense or sparse families).
//! - [`bloch`] — Lattice Fourier assembly of Hk/Sk/rk/pk and the analytic
//!   k-gradient.
//! - [`eigen`] — Standard and generalized Hermitian eigensolver.
//! - [`observables`] — Berry curvature/phase/Wilson loops, Kubo optical
//!   conductivity, shift current, velocity/momentum matrices, band unfolding.
//! - [`engine`] — The [`engine::TbEngine`] facade with batch drivers.

pub mod bloch;
pub mod eigen;
pub mod engine;
pub mod error;
pub mod observables;
pub mod store;
pub mod types;

pub use eigen::EigenSolution;
pub use engine::TbEngine;
pub use error::{CoreError, Result};
pub use store::{OperatorFamily, RealSpaceStore};
pub use types::{CurvatureMode, FrequencyGrid, KuboMethod, Occupation, SmearingKernel};
