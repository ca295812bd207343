/// Defines the external identifier of a node
pub type NodeId = usize;

/// Defines the default memory budget for batch chunking (1 GiB)
pub const DEFAULT_MEMORY_BUDGET: usize = 1024 * 1024 * 1024;

/// Defines the default maximum number of iterations for notch corrections
pub const DEFAULT_CORRECTION_MAX_IT: usize = 40;

/// Defines the default relative tolerance for notch corrections
pub const DEFAULT_CORRECTION_TOL: f64 = 1e-8;

/// Defines the default reference temperature when no field is given
pub const DEFAULT_TEMPERATURE: f64 = 22.0;

/// Defines the default Poisson coefficient for the incremental correction
pub const DEFAULT_POISSON: f64 = 0.3;

/// Defines a small number to guard divisions by (near) zero stresses
pub const TINY_STRESS: f64 = 1e-12;

/// Defines the relative tolerance to accept a time grid as uniform
pub const UNIFORM_DT_RTOL: f64 = 1e-6;

/// Defines the directory where the solver result files are saved
pub const DEFAULT_OUT_DIR: &str = "/tmp/mrsolve/results";

/// Defines an auxiliary directory where the test result files are saved
pub const DEFAULT_TEST_DIR: &str = "/tmp/mrsolve/test";
