//! MrSolve - modal response solver
//!
//! This crate reconstructs stress, displacement, velocity, and acceleration
//! time histories from modal-superposition data, derives principal and
//! von Mises stresses, performs rainflow cycle counting with Miner damage
//! accumulation, and optionally applies elastic-plastic notch corrections
//! (Neuber, Glinka, incremental tensor) with temperature-dependent
//! material curves. The batch solver processes node ranges in chunks sized
//! by a memory budget and reports progress through an injected sink.

/// Defines a type alias for the error type as a static string
pub type StrError = &'static str;

pub mod base;
pub mod material;
pub mod prelude;
pub mod solver;
