//! Implements the modal superposition solver and its supporting machinery

mod chunking;
mod differentiate;
mod kernel;
mod orchestrator;
mod output_store;
mod progress;
mod rainflow;
mod reconstruction;
mod stress_measures;
mod summary;
pub use crate::solver::chunking::*;
pub use crate::solver::differentiate::*;
pub use crate::solver::kernel::*;
pub use crate::solver::orchestrator::*;
pub use crate::solver::output_store::*;
pub use crate::solver::progress::*;
pub use crate::solver::rainflow::*;
pub use crate::solver::reconstruction::*;
pub use crate::solver::stress_measures::*;
pub use crate::solver::summary::*;
