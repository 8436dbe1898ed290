//! Observable engines built on the shared assembler/eigensolver pathway.
//!
//! Each engine is an independent consumer of Bloch matrices and eigenpairs;
//! none calls another. The velocity module also hosts the common
//! diagonalize-and-project pathway ([`velocity::k_state`]) the
//! energy-denominator engines share.

pub mod berry;
pub mod kubo;
pub mod shift_current;
pub mod unfold;
pub mod velocity;

pub use velocity::KState;
