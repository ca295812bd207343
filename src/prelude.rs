//! Makes available common structures needed to run an analysis
//!
//! You may write `use mrsolve::prelude::*` in your code and obtain
//! access to commonly used functionality.

pub use crate::base::{AnalysisMode, CorrectionMethod, CorrectionStatus, Extrapolation, KernelKind, Precision};
pub use crate::base::{DisplacementShapes, ModalCoordinates, ModeShapeSet, SteadyStateField, TemperatureField};
pub use crate::base::{NodeId, ParamFatigue, ParamPlasticity, Quantity, SampleData, SolveConfig, SolveState};
pub use crate::material::{CorrectedHistory, CorrectionResult, Corrector, MaterialCurve, MaterialDatabase};
pub use crate::solver::{solve_in_background, CancelToken, ChunkPlan, InMemoryStore, NodeHistory, NullSink};
pub use crate::solver::{OutputStoreTrait, ProgressSink, SolveCase, Solver, SolveSummary, Warning};
