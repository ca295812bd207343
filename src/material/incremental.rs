use super::{von_mises_of, CorrectedHistory, CorrectionResult, CorrectionTrait, MaterialDatabase};
use crate::base::{CorrectionMethod, CorrectionStatus, ParamPlasticity, TINY_STRESS};
use crate::StrError;

/// Weights of the double-dot product for components ordered xx, yy, zz, xy, yz, xz
const DDOT_WEIGHTS: [f64; 6] = [1.0, 1.0, 1.0, 2.0, 2.0, 2.0];

/// Implements the incremental tensor notch correction (experimental)
///
/// The method walks a six-component stress history sequentially. For each
/// step, the increment of deviatoric elastic strain energy
///
/// ```text
///        (sd' + sd) : (sd - sd')
/// ΔUe = —————————————————————————
///                 4 G
/// ```
///
/// (primes denote the previous step, sd the elastic deviator) drives a
/// plastic strain increment through the midpoint closure
///
/// ```text
/// Δεp σflow(εp + Δεp/2) = ΔUe
/// ```
///
/// iterated to tolerance. A two-pass contraction factor then scales the
/// deviatoric part of the elastic stress while the hydrostatic part passes
/// through unchanged (J2 assumption). Steps below the yield stress with no
/// accumulated plastic strain pass through unmodified, and the first step
/// is always taken as the given start state.
///
/// The accumulated plastic strain never decreases. Histories cannot be
/// split across time: the walk is strictly sequential.
pub struct IncrementalTensor {
    /// Holds the correction parameters
    param: ParamPlasticity,
}

impl IncrementalTensor {
    /// Allocates a new instance
    pub fn new(param: &ParamPlasticity) -> Self {
        IncrementalTensor { param: *param }
    }
}

impl CorrectionTrait for IncrementalTensor {
    /// Returns the method implemented by this correction
    fn method(&self) -> CorrectionMethod {
        CorrectionMethod::IncrementalTensor
    }

    /// Corrects one elastic equivalent stress value
    ///
    /// Walks a two-step uniaxial history from zero to the given stress.
    fn correct(&self, db: &MaterialDatabase, temperature: f64, sigma_elastic: f64) -> CorrectionResult {
        let history = [[0.0; 6], [sigma_elastic, 0.0, 0.0, 0.0, 0.0, 0.0]];
        match self.correct_history(db, temperature, &history) {
            Ok(out) => {
                let status = if !out.non_converged.is_empty() {
                    CorrectionStatus::MaxIterExceeded
                } else if out.plastic_strain[1] > 0.0 {
                    CorrectionStatus::Converged
                } else {
                    CorrectionStatus::ElasticInput
                };
                CorrectionResult {
                    stress: out.stress[1],
                    plastic_strain: out.plastic_strain[1],
                    status,
                    iterations: 0,
                }
            }
            Err(_) => CorrectionResult {
                stress: sigma_elastic,
                plastic_strain: 0.0,
                status: CorrectionStatus::Diverged,
                iterations: 0,
            },
        }
    }

    /// Corrects a six-component stress history sequentially
    fn correct_history(
        &self,
        db: &MaterialDatabase,
        temperature: f64,
        history: &[[f64; 6]],
    ) -> Result<CorrectedHistory, StrError> {
        if history.is_empty() {
            return Err("the stress history must have at least one step");
        }
        let extrapolation = self.param.extrapolation;
        let young = db.young(temperature, extrapolation);
        let shear = young / (2.0 * (1.0 + self.param.poisson));
        let yield_stress = db.yield_stress(temperature, extrapolation);

        let n = history.len();
        let vm_elastic: Vec<f64> = history.iter().map(|c| von_mises_of(c)).collect();

        let mut components = Vec::with_capacity(n);
        let mut stress = Vec::with_capacity(n);
        let mut plastic_strain = Vec::with_capacity(n);
        let mut non_converged = Vec::new();

        // the first step is the given start state
        components.push(history[0]);
        stress.push(vm_elastic[0]);
        plastic_strain.push(0.0);

        let mut eps_p = 0.0;
        for k in 1..n {
            // elastic passthrough while below yield with no plastic memory
            if f64::max(vm_elastic[k - 1], vm_elastic[k]) <= yield_stress && eps_p <= 0.0 {
                components.push(history[k]);
                stress.push(vm_elastic[k]);
                plastic_strain.push(eps_p);
                continue;
            }

            // increment of deviatoric elastic strain energy
            let dp = deviator_of(&history[k - 1]);
            let dn = deviator_of(&history[k]);
            let mut due = 0.0;
            for j in 0..6 {
                due += DDOT_WEIGHTS[j] * (dp[j] + dn[j]) * (dn[j] - dp[j]);
            }
            due /= 4.0 * shear + TINY_STRESS;

            // plastic strain increment by the midpoint closure
            let mut dep = 0.0;
            if due > 0.0 {
                let mut converged = false;
                for _ in 0..self.param.max_iterations {
                    let flow_mid = db.flow_stress(temperature, eps_p + 0.5 * dep, extrapolation);
                    let dep_new = due / (flow_mid + TINY_STRESS);
                    if f64::abs(dep_new - dep) <= self.param.tolerance * f64::max(f64::abs(dep_new), TINY_STRESS) {
                        dep = dep_new;
                        converged = true;
                        break;
                    }
                    dep = dep_new;
                }
                if !converged {
                    non_converged.push(k);
                }
            }

            // two-pass contraction of the deviatoric part; the flow stress
            // is taken at the plastic strain before the increment
            let vm_e = vm_elastic[k];
            let flow_now = db.flow_stress(temperature, eps_p, extrapolation);
            let mut scale = 1.0;
            for _ in 0..2 {
                let denom = f64::max(f64::max(scale * vm_e, flow_now), 1e-9);
                scale = 1.0 / (1.0 + young * dep / denom);
            }
            eps_p += f64::max(dep, 0.0);

            // hydrostatic part passes through
            let mean = (history[k][0] + history[k][1] + history[k][2]) / 3.0;
            let mut corrected = [0.0; 6];
            for j in 0..3 {
                corrected[j] = mean + scale * dn[j];
            }
            for j in 3..6 {
                corrected[j] = scale * dn[j];
            }
            components.push(corrected);
            stress.push(scale * vm_e);
            plastic_strain.push(eps_p);
        }
        Ok(CorrectedHistory {
            stress,
            plastic_strain,
            components: Some(components),
            non_converged,
        })
    }
}

/// Returns the deviatoric components ordered xx, yy, zz, xy, yz, xz
fn deviator_of(components: &[f64; 6]) -> [f64; 6] {
    let mean = (components[0] + components[1] + components[2]) / 3.0;
    [
        components[0] - mean,
        components[1] - mean,
        components[2] - mean,
        components[3],
        components[4],
        components[5],
    ]
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
