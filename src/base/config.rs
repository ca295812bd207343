use super::{AnalysisMode, KernelKind, ParamFatigue, ParamPlasticity, Precision, Quantity};
use super::{CorrectionMethod, DEFAULT_MEMORY_BUDGET};
use crate::StrError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Holds the configuration of a solve
///
/// The configuration is a plain value: build it, hand it to the solver by
/// reference, and it stays untouched for the whole run. There is no global
/// or mutable solver state behind it.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct SolveConfig {
    /// Analysis mode (batch sweep or single-node history)
    pub mode: AnalysisMode,

    /// Memory budget in bytes for the working arrays of one chunk
    pub memory_budget: usize,

    /// Floating-point precision of the reconstruction kernel
    pub precision: Precision,

    /// Strategy performing the modal projection
    pub kernel: KernelKind,

    /// Number of initial modes excluded from the projection
    pub skip_modes: usize,

    /// Computes the von Mises stress
    pub von_mises: bool,

    /// Computes the maximum principal stress s1
    pub max_principal: bool,

    /// Computes the minimum principal stress s3
    pub min_principal: bool,

    /// Computes displacement magnitudes (requires displacement shapes)
    pub displacement: bool,

    /// Computes velocity magnitudes by finite differences
    pub velocity: bool,

    /// Computes acceleration magnitudes by finite differences
    pub acceleration: bool,

    /// Computes rainflow damage of the von Mises history
    pub damage: bool,

    /// Adds the steady-state bias when a field is attached
    pub include_steady_state: bool,

    /// Parameters of the notch plasticity correction (None disables it)
    pub plasticity: Option<ParamPlasticity>,

    /// Fatigue parameters (required when damage is enabled)
    pub fatigue: Option<ParamFatigue>,

    /// Verbose mode: prints a header and one line per committed chunk
    pub verbose: bool,
}

impl SolveConfig {
    /// Allocates a new instance with default values
    pub fn new() -> Self {
        SolveConfig {
            mode: AnalysisMode::Batch,
            memory_budget: DEFAULT_MEMORY_BUDGET,
            precision: Precision::Double,
            kernel: KernelKind::Accelerated,
            skip_modes: 0,
            von_mises: true,
            max_principal: false,
            min_principal: false,
            displacement: false,
            velocity: false,
            acceleration: false,
            damage: false,
            include_steady_state: true,
            plasticity: None,
            fatigue: None,
            verbose: false,
        }
    }

    /// Sets the analysis mode
    pub fn set_mode(&mut self, mode: AnalysisMode) -> Result<&mut Self, StrError> {
        self.mode = mode;
        Ok(self)
    }

    /// Sets the memory budget in bytes for the working arrays of one chunk
    pub fn set_memory_budget(&mut self, bytes: usize) -> Result<&mut Self, StrError> {
        if bytes < 1 {
            return Err("memory budget must be ≥ 1 byte");
        }
        self.memory_budget = bytes;
        Ok(self)
    }

    /// Sets the floating-point precision of the reconstruction kernel
    pub fn set_precision(&mut self, precision: Precision) -> Result<&mut Self, StrError> {
        self.precision = precision;
        Ok(self)
    }

    /// Sets the strategy performing the modal projection
    pub fn set_kernel(&mut self, kernel: KernelKind) -> Result<&mut Self, StrError> {
        self.kernel = kernel;
        Ok(self)
    }

    /// Sets the number of initial modes excluded from the projection
    pub fn set_skip_modes(&mut self, skip_modes: usize) -> Result<&mut Self, StrError> {
        self.skip_modes = skip_modes;
        Ok(self)
    }

    /// Sets the scalar stress outputs
    pub fn set_stress_outputs(
        &mut self,
        von_mises: bool,
        max_principal: bool,
        min_principal: bool,
    ) -> Result<&mut Self, StrError> {
        self.von_mises = von_mises;
        self.max_principal = max_principal;
        self.min_principal = min_principal;
        Ok(self)
    }

    /// Sets the kinematic outputs (derived from displacement shapes)
    pub fn set_kinematic_outputs(
        &mut self,
        displacement: bool,
        velocity: bool,
        acceleration: bool,
    ) -> Result<&mut Self, StrError> {
        self.displacement = displacement;
        self.velocity = velocity;
        self.acceleration = acceleration;
        Ok(self)
    }

    /// Enables or disables the damage accumulation
    pub fn set_damage(&mut self, flag: bool) -> Result<&mut Self, StrError> {
        if flag && self.fatigue.is_none() {
            return Err("damage requires fatigue parameters; call set_fatigue first");
        }
        self.damage = flag;
        Ok(self)
    }

    /// Enables or disables the steady-state bias
    pub fn set_include_steady_state(&mut self, flag: bool) -> Result<&mut Self, StrError> {
        self.include_steady_state = flag;
        Ok(self)
    }

    /// Sets the parameters of the notch plasticity correction
    pub fn set_plasticity(&mut self, param: ParamPlasticity) -> Result<&mut Self, StrError> {
        if let Some(_) = param.validate() {
            return Err("plasticity parameters are invalid");
        }
        if param.method == CorrectionMethod::IncrementalTensor && !param.enable_incremental {
            return Err("the incremental tensor method requires the enable_incremental flag");
        }
        self.plasticity = Some(param);
        Ok(self)
    }

    /// Sets the fatigue parameters
    pub fn set_fatigue(&mut self, param: ParamFatigue) -> Result<&mut Self, StrError> {
        if let Some(_) = param.validate() {
            return Err("fatigue parameters are invalid");
        }
        self.fatigue = Some(param);
        Ok(self)
    }

    /// Enables or disables the verbose mode
    pub fn set_verbose(&mut self, flag: bool) -> Result<&mut Self, StrError> {
        self.verbose = flag;
        Ok(self)
    }

    /// Validates all data
    ///
    /// Returns a message with the inconsistent data, or returns None if everything is all right.
    pub fn validate(&self) -> Option<String> {
        if self.memory_budget < 1 {
            return Some("memory_budget is incorrect; it must be ≥ 1 byte".to_string());
        }
        if self.requested_quantities().is_empty() {
            return Some("at least one output quantity must be requested".to_string());
        }
        if self.damage && self.fatigue.is_none() {
            return Some("damage is enabled but no fatigue parameters are set".to_string());
        }
        if self.damage && !self.von_mises {
            return Some("damage requires the von Mises output".to_string());
        }
        if self.plasticity.is_some() && !self.von_mises {
            return Some("the plasticity correction requires the von Mises output".to_string());
        }
        if let Some(param) = &self.plasticity {
            if let Some(msg) = param.validate() {
                return Some(format!("plasticity parameters are invalid: {}", msg));
            }
            if param.method == CorrectionMethod::IncrementalTensor && !param.enable_incremental {
                return Some("the incremental tensor method requires the enable_incremental flag".to_string());
            }
        }
        if let Some(param) = &self.fatigue {
            if let Some(msg) = param.validate() {
                return Some(format!("fatigue parameters are invalid: {}", msg));
            }
        }
        None
    }

    /// Returns the requested quantities in a fixed order
    pub fn requested_quantities(&self) -> Vec<Quantity> {
        let mut quantities = Vec::new();
        if self.von_mises {
            quantities.push(Quantity::VonMises);
        }
        if self.max_principal {
            quantities.push(Quantity::MaxPrincipal);
        }
        if self.min_principal {
            quantities.push(Quantity::MinPrincipal);
        }
        if self.displacement {
            quantities.push(Quantity::Displacement);
        }
        if self.velocity {
            quantities.push(Quantity::Velocity);
        }
        if self.acceleration {
            quantities.push(Quantity::Acceleration);
        }
        quantities
    }

    /// Returns the number of per-node working arrays of one chunk
    ///
    /// Counts the six stress component rows, one row per scalar stress
    /// output, the displacement component rows when any kinematic output
    /// is requested, and the derivative rows of velocity/acceleration.
    /// The chunk planner divides the memory budget by this figure.
    pub fn working_arrays_per_node(&self) -> usize {
        let mut count = 6;
        if self.von_mises {
            count += 1;
        }
        if self.max_principal {
            count += 1;
        }
        if self.min_principal {
            count += 1;
        }
        let any_kinematic = self.displacement || self.velocity || self.acceleration;
        if any_kinematic {
            count += 3;
        }
        if self.displacement {
            count += 1;
        }
        if self.velocity {
            count += 4;
        }
        if self.acceleration {
            count += 4;
        }
        count
    }

    /// Indicates whether the plasticity correction is enabled
    pub fn correction_enabled(&self) -> bool {
        self.plasticity.is_some()
    }
}

impl fmt::Display for SolveConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Solve configuration\n").unwrap();
        write!(f, "===================\n").unwrap();
        write!(f, "mode = {:?}\n", self.mode).unwrap();
        write!(f, "memory_budget = {:?}\n", self.memory_budget).unwrap();
        write!(f, "precision = {:?}\n", self.precision).unwrap();
        write!(f, "kernel = {:?}\n", self.kernel).unwrap();
        write!(f, "skip_modes = {:?}\n", self.skip_modes).unwrap();
        write!(f, "von_mises = {:?}\n", self.von_mises).unwrap();
        write!(f, "max_principal = {:?}\n", self.max_principal).unwrap();
        write!(f, "min_principal = {:?}\n", self.min_principal).unwrap();
        write!(f, "displacement = {:?}\n", self.displacement).unwrap();
        write!(f, "velocity = {:?}\n", self.velocity).unwrap();
        write!(f, "acceleration = {:?}\n", self.acceleration).unwrap();
        write!(f, "damage = {:?}\n", self.damage).unwrap();
        write!(f, "include_steady_state = {:?}\n", self.include_steady_state).unwrap();
        write!(f, "verbose = {:?}\n", self.verbose).unwrap();

        write!(f, "\nParameters for plasticity\n").unwrap();
        write!(f, "=========================\n").unwrap();
        write!(f, "{:?}\n", self.plasticity).unwrap();

        write!(f, "\nParameters for fatigue\n").unwrap();
        write!(f, "======================\n").unwrap();
        write!(f, "{:?}\n", self.fatigue).unwrap();
        Ok(())
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
