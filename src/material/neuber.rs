use super::{CorrectionResult, CorrectionTrait, MaterialDatabase};
use crate::base::{CorrectionMethod, CorrectionStatus, ParamPlasticity, TINY_STRESS};

/// Implements Neuber's notch correction rule
///
/// Given an elastic equivalent stress σe, the corrected stress σ solves
///
/// ```text
///   ⎛ σ           ⎞    σe²
/// σ ⎜ ——— + εp(σ) ⎟ = —————
///   ⎝ E           ⎠     E
/// ```
///
/// where εp(σ) follows from the material curve at the working temperature.
/// The root is found by Newton-Raphson with a forward-difference derivative;
/// an update driving the stress non-positive halves the iterate instead.
/// Inputs at or below the yield stress pass through unchanged.
pub struct Neuber {
    /// Holds the correction parameters
    param: ParamPlasticity,
}

impl Neuber {
    /// Allocates a new instance
    pub fn new(param: &ParamPlasticity) -> Self {
        Neuber { param: *param }
    }

    /// Computes the residual of Neuber's equation
    fn residual(&self, db: &MaterialDatabase, temperature: f64, sigma: f64, sigma_elastic: f64) -> f64 {
        let young = db.young(temperature, self.param.extrapolation);
        let epsp = db.plastic_strain(temperature, sigma, self.param.extrapolation);
        sigma / young + epsp - sigma_elastic * sigma_elastic / (sigma * young + TINY_STRESS)
    }
}

impl CorrectionTrait for Neuber {
    /// Returns the method implemented by this correction
    fn method(&self) -> CorrectionMethod {
        CorrectionMethod::Neuber
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

#[cfg(test)]
mod tests {
    use super::Neuber;
    use crate::base::{CorrectionStatus, Extrapolation, ParamPlasticity};
    use crate::material::{CorrectionTrait, MaterialCurve, MaterialDatabase};
    use russell_lab::approx_eq;

    fn steel_db() -> MaterialDatabase {
        let curve = MaterialCurve::from_plastic_table(22.0, 200000.0, &[0.0, 0.1], &[250.0, 500.0]).unwrap();
        MaterialDatabase::new(vec![curve]).unwrap()
    }

    #[test]
    fn elastic_input_passes_through() {
        let db = steel_db();
        let neuber = Neuber::new(&ParamPlasticity::sample_neuber());

        let res = neuber.correct(&db, 22.0, 0.0);
        assert_eq!(res.status, CorrectionStatus::ElasticInput);
        assert_eq!(res.stress, 0.0);
        assert_eq!(res.plastic_strain, 0.0);

        let res = neuber.correct(&db, 22.0, 100.0);
        assert_eq!(res.status, CorrectionStatus::ElasticInput);
        assert_eq!(res.stress, 100.0);
        assert_eq!(res.plastic_strain, 0.0);
        assert_eq!(res.iterations, 0);
    }

    #[test]
    fn correct_works_above_yield() {
        // yield 250 MPa, elastic input 300 MPa
        let db = steel_db();
        let neuber = Neuber::new(&ParamPlasticity::sample_neuber());
        let res = neuber.correct(&db, 22.0, 300.0);
        assert_eq!(res.status, CorrectionStatus::Converged);
        assert!(res.stress < 300.0);
        assert!(res.stress > 250.0);
        assert!(res.plastic_strain > 0.0);

        // Neuber identity: σ (σ/E + εp) = σe²/E
        let young = 200000.0;
        let lhs = res.stress * (res.stress / young + res.plastic_strain);
        approx_eq(lhs, 300.0 * 300.0 / young, 1e-7);

        // closed form for the bilinear branch
        approx_eq(res.stress, 251.3344, 1e-3);
    }

    #[test]
    fn correct_works_with_aluminum_sample() {
        let db = MaterialDatabase::sample_aluminum();
        let neuber = Neuber::new(&ParamPlasticity::sample_neuber());
        let res = neuber.correct(&db, 22.0, 600.0);
        assert_eq!(res.status, CorrectionStatus::Converged);
        assert!(res.stress < 600.0 && res.stress > 400.0);
        let lhs = res.stress * (res.stress / 70000.0 + res.plastic_strain);
        approx_eq(lhs, 600.0 * 600.0 / 70000.0, 1e-7);
    }

    #[test]
    fn iteration_cap_is_reported() {
        let db = steel_db();
        let mut param = ParamPlasticity::sample_neuber();
        param.max_iterations = 1;
        param.tolerance = 1e-14;
        let neuber = Neuber::new(&param);
        let res = neuber.correct(&db, 22.0, 300.0);
        assert_eq!(res.status, CorrectionStatus::MaxIterExceeded);
        assert!(res.stress.is_finite());
        assert_eq!(res.iterations, 1);
    }

    #[test]
    fn plateau_extrapolation_is_used() {
        let db = steel_db();
        let mut param = ParamPlasticity::sample_neuber();
        param.extrapolation = Extrapolation::Plateau;
        let neuber = Neuber::new(&param);
        // far beyond the table: plastic strain clamps at 0.1
        let res = neuber.correct(&db, 22.0, 2000.0);
        assert!(res.plastic_strain <= 0.1 + 1e-12);
    }
}
