use super::{CorrectionResult, CorrectionTrait, MaterialDatabase};
use crate::base::{CorrectionMethod, CorrectionStatus, ParamPlasticity, TINY_STRESS};

/// Implements Glinka's equivalent strain energy density correction
///
/// Given an elastic equivalent stress σe, the corrected stress σ equates
/// the strain energy densities of the elastic and elastic-plastic responses
///
/// ```text
///   σ²             σe²
/// —————— + Up(σ) = ————
///  2 E             2 E
/// ```
///
/// where Up is the plastic strain energy density of the material curve at
/// the working temperature. The Newton-Raphson contract (forward-difference
/// derivative, halving on non-positive updates, relative stopping) matches
/// the Neuber implementation. Over a purely elastic curve, Up vanishes and
/// the corrected stress equals the elastic input.
pub struct Glinka {
    /// Holds the correction parameters
    param: ParamPlasticity,
}

impl Glinka {
    /// Allocates a new instance
    pub fn new(param: &ParamPlasticity) -> Self {
        Glinka { param: *param }
    }

    /// Computes the residual of the energy balance
    fn residual(&self, db: &MaterialDatabase, temperature: f64, sigma: f64, sigma_elastic: f64) -> f64 {
        let young = db.young(temperature, self.param.extrapolation);
        let up = db.plastic_energy(temperature, sigma, self.param.extrapolation);
        sigma * sigma / (2.0 * young) + up - sigma_elastic * sigma_elastic / (2.0 * young)
    }
}

impl CorrectionTrait for Glinka {
    /// Returns the method implemented by this correction
    fn method(&self) -> CorrectionMethod {
        CorrectionMethod::Glinka
    }

    /// Corrects one elastic equivalent stress value
    fn correct(&self, db: &MaterialDatabase, temperature: f64, sigma_elastic: f64) -> CorrectionResult {
        let extrapolation = self.param.extrapolation;
        let yield_stress = db.yield_stress(temperature, extrapolation);
        if sigma_elastic <= yield_stress {
            return CorrectionResult {
                stress: sigma_elastic,
                plastic_strain: 0.0,
                status: CorrectionStatus::ElasticInput,
                iterations: 0,
            };
        }
        let mut sigma = f64::min(sigma_elastic, yield_stress);
        for it in 0..self.param.max_iterations {
            let r = self.residual(db, temperature, sigma, sigma_elastic);
            let ds = 1e-6 * f64::max(f64::abs(sigma), 1.0);
            let drds = (self.residual(db, temperature, sigma + ds, sigma_elastic) - r) / ds;
            if !drds.is_finite() || f64::abs(drds) < 1e-30 {
                break;
            }
            let step = r / drds;
            let sigma_new = sigma - step;
            if !sigma_new.is_finite() {
                return CorrectionResult {
                    stress: sigma,
                    plastic_strain: db.plastic_strain(temperature, sigma, extrapolation),
                    status: CorrectionStatus::Diverged,
                    iterations: it + 1,
                };
            }
            if sigma_new <= 0.0 {
                sigma = 0.5 * sigma;
                continue;
            }
            sigma = sigma_new;
            if f64::abs(step) / (f64::abs(sigma) + TINY_STRESS) < self.param.tolerance {
                return CorrectionResult {
                    stress: sigma,
                    plastic_strain: db.plastic_strain(temperature, sigma, extrapolation),
                    status: CorrectionStatus::Converged,
                    iterations: it + 1,
                };
            }
        }
        CorrectionResult {
            stress: sigma,
            plastic_strain: db.plastic_strain(temperature, sigma, extrapolation),
            status: CorrectionStatus::MaxIterExceeded,
            iterations: self.param.max_iterations,
        }
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
