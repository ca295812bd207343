use super::{CorrectionMethod, Extrapolation};
use super::{DEFAULT_CORRECTION_MAX_IT, DEFAULT_CORRECTION_TOL, DEFAULT_POISSON, DEFAULT_TEMPERATURE};
use serde::{Deserialize, Serialize};

/// Holds parameters for the elastic-plastic notch correction
#[derive(Clone, Copy, Debug, Deserialize, Serialize)]
pub struct ParamPlasticity {
    /// Correction method
    pub method: CorrectionMethod,

    /// Maximum number of iterations of the scalar or incremental solvers
    pub max_iterations: usize,

    /// Relative tolerance on the stress (or plastic strain) update
    pub tolerance: f64,

    /// Behavior of material queries beyond the tabulated range
    pub extrapolation: Extrapolation,

    /// Temperature assigned to nodes not covered by a temperature field
    pub default_temperature: f64,

    /// Poisson's coefficient (used by the incremental correction)
    pub poisson: f64,

    /// Enables the experimental incremental tensor method
    ///
    /// Selecting [`CorrectionMethod::IncrementalTensor`] without this flag
    /// is rejected when the corrector is allocated.
    pub enable_incremental: bool,
}

impl ParamPlasticity {
    /// Allocates a new instance with default numerical settings
    pub fn new(method: CorrectionMethod) -> Self {
        ParamPlasticity {
            method,
            max_iterations: DEFAULT_CORRECTION_MAX_IT,
            tolerance: DEFAULT_CORRECTION_TOL,
            extrapolation: Extrapolation::Linear,
            default_temperature: DEFAULT_TEMPERATURE,
            poisson: DEFAULT_POISSON,
            enable_incremental: false,
        }
    }

    /// Validates all data
    ///
    /// Returns a message with the inconsistent data, or returns None if everything is all right.
    pub fn validate(&self) -> Option<String> {
        if self.max_iterations < 1 {
            return Some(format!(
                "max_iterations = {:?} is incorrect; it must be ≥ 1",
                self.max_iterations
            ));
        }
        if self.tolerance <= 0.0 {
            return Some(format!(
                "tolerance = {:?} is incorrect; it must be > 0.0",
                self.tolerance
            ));
        }
        if self.poisson < 0.0 || self.poisson >= 0.5 {
            return Some(format!(
                "poisson = {:?} is incorrect; it must be in [0.0, 0.5)",
                self.poisson
            ));
        }
        None
    }

    /// Returns sample parameters for the Neuber correction
    pub fn sample_neuber() -> Self {
        ParamPlasticity::new(CorrectionMethod::Neuber)
    }

    /// Returns sample parameters for the Glinka correction
    pub fn sample_glinka() -> Self {
        ParamPlasticity::new(CorrectionMethod::Glinka)
    }
}

/// Holds S-N parameters for Basquin-style fatigue damage
///
/// The number of cycles to failure under a stress range Δσ is
///
/// ```text
///           A
/// N_f = ————————
///        (Δσ)^m
/// ```
#[derive(Clone, Copy, Debug, Deserialize, Serialize)]
pub struct ParamFatigue {
    /// Fatigue strength coefficient A
    pub aa: f64,

    /// Fatigue strength exponent m
    pub mm: f64,
}

impl ParamFatigue {
    /// Allocates a new instance
    pub fn new(aa: f64, mm: f64) -> Self {
        ParamFatigue { aa, mm }
    }

    /// Validates all data
    ///
    /// Returns a message with the inconsistent data, or returns None if everything is all right.
    pub fn validate(&self) -> Option<String> {
        if self.aa <= 0.0 {
            return Some(format!("A = {:?} is incorrect; it must be > 0.0", self.aa));
        }
        if self.mm <= 0.0 {
            return Some(format!("m = {:?} is incorrect; it must be > 0.0", self.mm));
        }
        None
    }

    /// Returns the number of cycles to failure for a stress range
    ///
    /// A non-positive range yields infinite life.
    pub fn cycles_to_failure(&self, range: f64) -> f64 {
        if range <= 0.0 {
            return f64::INFINITY;
        }
        self.aa / f64::powf(range, self.mm)
    }

    /// Returns the damage contributed by cycles of a given stress range
    ///
    /// The count may be fractional (0.5 for half cycles).
    pub fn damage(&self, range: f64, count: f64) -> f64 {
        count / self.cycles_to_failure(range)
    }

    /// Returns sample parameters for an aluminum-like S-N line
    pub fn sample_aluminum() -> Self {
        ParamFatigue {
            aa: 1e12, // MPa^m · cycles
            mm: 3.0,  // [-]
        }
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::{ParamFatigue, ParamPlasticity};
    use crate::base::CorrectionMethod;
    use russell_lab::approx_eq;

    #[test]
    fn param_plasticity_new_works() {
        let param = ParamPlasticity::new(CorrectionMethod::Neuber);
        assert_eq!(param.method, CorrectionMethod::Neuber);
        assert_eq!(param.max_iterations, 40);
        assert_eq!(param.tolerance, 1e-8);
        assert_eq!(param.default_temperature, 22.0);
        assert_eq!(param.poisson, 0.3);
        assert_eq!(param.enable_incremental, false);
        assert_eq!(param.validate(), None);

        let param_clone = param.clone();
        assert_eq!(format!("{:?}", param_clone.method), "Neuber");

        assert_eq!(ParamPlasticity::sample_neuber().method, CorrectionMethod::Neuber);
        assert_eq!(ParamPlasticity::sample_glinka().method, CorrectionMethod::Glinka);
    }

    #[test]
    fn param_plasticity_validate_works() {
        let mut param = ParamPlasticity::new(CorrectionMethod::Glinka);
        param.max_iterations = 0;
        assert_eq!(
            param.validate(),
            Some("max_iterations = 0 is incorrect; it must be ≥ 1".to_string())
        );
        param.max_iterations = 10;
        param.tolerance = 0.0;
        assert_eq!(
            param.validate(),
            Some("tolerance = 0.0 is incorrect; it must be > 0.0".to_string())
        );
        param.tolerance = 1e-6;
        param.poisson = 0.5;
        assert_eq!(
            param.validate(),
            Some("poisson = 0.5 is incorrect; it must be in [0.0, 0.5)".to_string())
        );
        param.poisson = 0.3;
        assert_eq!(param.validate(), None);
    }

    #[test]
    fn param_fatigue_works() {
        let param = ParamFatigue::new(1e12, 3.0);
        assert_eq!(param.validate(), None);
        approx_eq(param.cycles_to_failure(100.0), 1e6, 1e-9);
        approx_eq(param.damage(100.0, 1.0), 1e-6, 1e-15);
        approx_eq(param.damage(100.0, 0.5), 5e-7, 1e-15);
        assert_eq!(param.cycles_to_failure(0.0), f64::INFINITY);
        assert_eq!(param.damage(0.0, 1.0), 0.0);

        let bad = ParamFatigue::new(0.0, 3.0);
        assert_eq!(bad.validate(), Some("A = 0.0 is incorrect; it must be > 0.0".to_string()));
        let bad = ParamFatigue::new(1e12, -1.0);
        assert_eq!(bad.validate(), Some("m = -1.0 is incorrect; it must be > 0.0".to_string()));

        let sample = ParamFatigue::sample_aluminum();
        assert_eq!(sample.validate(), None);
    }
}
