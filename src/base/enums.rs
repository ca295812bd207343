use super::NodeId;
use serde::{Deserialize, Serialize};

/// Defines the floating-point precision of the reconstruction kernel
///
/// The precision selects the accumulation width of the plain CPU kernel and
/// the bytes-per-value figure used by the chunk planner. The accelerated
/// kernel always computes in double precision (BLAS path).
#[derive(Clone, Copy, Debug, Eq, PartialEq, Deserialize, Serialize)]
pub enum Precision {
    /// 32-bit accumulation (4 bytes per value in the memory estimate)
    Single,

    /// 64-bit accumulation (8 bytes per value in the memory estimate)
    Double,
}

impl Precision {
    /// Returns the number of bytes per stored value
    pub fn bytes_per_value(&self) -> usize {
        match self {
            Precision::Single => 4,
            Precision::Double => 8,
        }
    }
}

/// Defines the strategy performing the modal projection
#[derive(Clone, Copy, Debug, Eq, PartialEq, Deserialize, Serialize)]
pub enum KernelKind {
    /// Plain loop kernel honoring the configured precision
    VectorizedCpu,

    /// Dense matrix-matrix product through the BLAS bindings
    ///
    /// Falls back to [`KernelKind::VectorizedCpu`] with a warning if the
    /// kernel cannot be initialized.
    Accelerated,
}

/// Defines how material queries behave beyond the tabulated range
#[derive(Clone, Copy, Debug, Eq, PartialEq, Deserialize, Serialize)]
pub enum Extrapolation {
    /// Extends the curve using the slope of the last segment
    Linear,

    /// Holds the last tabulated value constant
    Plateau,
}

/// Defines the elastic-plastic notch correction method
#[derive(Clone, Copy, Debug, Eq, PartialEq, Deserialize, Serialize)]
pub enum CorrectionMethod {
    /// Neuber's rule (equality of strain-energy-like products)
    Neuber,

    /// Glinka's equivalent strain energy density rule
    Glinka,

    /// Incremental tensor correction over a full history (experimental)
    IncrementalTensor,
}

impl CorrectionMethod {
    /// Returns the name of the correction method
    pub fn name(&self) -> String {
        match self {
            CorrectionMethod::Neuber => "Neuber".to_string(),
            CorrectionMethod::Glinka => "Glinka".to_string(),
            CorrectionMethod::IncrementalTensor => "IncrementalTensor".to_string(),
        }
    }
}

/// Defines the outcome of one notch correction call
#[derive(Clone, Copy, Debug, Eq, PartialEq, Deserialize, Serialize)]
pub enum CorrectionStatus {
    /// The input was below yield and passed through unchanged
    ElasticInput,

    /// The iteration satisfied the relative tolerance
    Converged,

    /// The iteration produced a non-finite value; the last finite estimate is kept
    Diverged,

    /// The iteration cap was reached; the best estimate is kept
    MaxIterExceeded,
}

impl CorrectionStatus {
    /// Indicates whether the correction result can be used without a warning
    pub fn is_ok(&self) -> bool {
        match self {
            CorrectionStatus::ElasticInput => true,
            CorrectionStatus::Converged => true,
            CorrectionStatus::Diverged => false,
            CorrectionStatus::MaxIterExceeded => false,
        }
    }
}

/// Defines the lifecycle state of a solve
#[derive(Clone, Copy, Debug, Eq, PartialEq, Deserialize, Serialize)]
pub enum SolveState {
    /// No solve has run yet
    Idle,

    /// Chunks are being processed
    Running,

    /// All chunks finished and the store is finalized
    Completed,

    /// A fatal precondition or an unrecoverable error stopped the solve
    Failed,

    /// A cancellation request was honored at a chunk boundary
    Cancelled,
}

/// Defines whether the solver sweeps all nodes or materializes one history
#[derive(Clone, Copy, Debug, Eq, PartialEq, Deserialize, Serialize)]
pub enum AnalysisMode {
    /// Processes all nodes in chunks and retains per-node scalars only
    Batch,

    /// Materializes the full time history of a single node
    SingleNode(NodeId),
}

/// Defines the derived quantities a solve can track
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Deserialize, Serialize)]
pub enum Quantity {
    /// Von Mises equivalent stress
    VonMises,

    /// Largest principal stress s1
    MaxPrincipal,

    /// Smallest principal stress s3
    MinPrincipal,

    /// Displacement magnitude
    Displacement,

    /// Velocity magnitude
    Velocity,

    /// Acceleration magnitude
    Acceleration,
}

impl Quantity {
    /// Returns the name of the quantity
    pub fn name(&self) -> String {
        match self {
            Quantity::VonMises => "VonMises".to_string(),
            Quantity::MaxPrincipal => "MaxPrincipal".to_string(),
            Quantity::MinPrincipal => "MinPrincipal".to_string(),
            Quantity::Displacement => "Displacement".to_string(),
            Quantity::Velocity => "Velocity".to_string(),
            Quantity::Acceleration => "Acceleration".to_string(),
        }
    }

    /// Indicates whether the quantity derives from displacement shapes
    pub fn needs_displacement(&self) -> bool {
        match self {
            Quantity::Displacement => true,
            Quantity::Velocity => true,
            Quantity::Acceleration => true,
            _ => false,
        }
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
