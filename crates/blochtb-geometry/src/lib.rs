//! # BlochTB Geometry
//!
//! Geometry handling for the BlochTB framework. This crate provides:
//!
//! - **Lattice** ([`lattice`]) — The real-space cell (lattice constant plus
//!   3×3 lattice-vector matrix), direct↔Cartesian coordinate transforms, and
//!   the reciprocal lattice.
//! - **Basis metadata** ([`basis`]) — Atomic species, site positions, and
//!   numerical-orbital tables, flattened into a per-basis-function layout
//!   used by the band-unfolding engine.

pub mod basis;
pub mod lattice;

pub use basis::{AtomSpecies, BasisLayout, NumericalOrbital};
pub use lattice::{GeometryError, Lattice};
