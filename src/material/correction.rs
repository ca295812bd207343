use super::{Glinka, IncrementalTensor, MaterialDatabase, Neuber};
use crate::base::{CorrectionMethod, CorrectionStatus, ParamPlasticity};
use crate::StrError;
use russell_tensor::{Mandel, Tensor2};
use serde::{Deserialize, Serialize};

/// Holds the outcome of one notch correction
#[derive(Clone, Copy, Debug, Deserialize, Serialize)]
pub struct CorrectionResult {
    /// Corrected (elastic-plastic) stress
    pub stress: f64,

    /// Accumulated plastic strain
    pub plastic_strain: f64,

    /// Status of the iteration
    pub status: CorrectionStatus,

    /// Number of iterations performed (scalar methods)
    pub iterations: usize,
}

/// Holds the corrected stress history of one node
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct CorrectedHistory {
    /// Corrected equivalent stress per step (ntime)
    pub stress: Vec<f64>,

    /// Accumulated plastic strain per step (ntime)
    pub plastic_strain: Vec<f64>,

    /// Corrected six-component stresses per step (tensor method only)
    pub components: Option<Vec<[f64; 6]>>,

    /// Indices of the steps whose iteration did not converge
    pub non_converged: Vec<usize>,
}

/// Specifies the essential functions for elastic-plastic notch corrections
pub trait CorrectionTrait: Send + Sync {
    /// Returns the method implemented by this correction
    fn method(&self) -> CorrectionMethod;

    /// Corrects one elastic equivalent stress value
    ///
    /// The input is a non-negative equivalent (von Mises) stress; values at
    /// or below the yield stress pass through unchanged.
    fn correct(&self, db: &MaterialDatabase, temperature: f64, sigma_elastic: f64) -> CorrectionResult;

    /// Corrects a six-component stress history
    ///
    /// The components of each step are ordered xx, yy, zz, xy, yz, xz.
    /// The default implementation applies the scalar correction to the
    /// von Mises stress of each step independently; the incremental tensor
    /// method replaces it by a sequential pass over the history.
    fn correct_history(
        &self,
        db: &MaterialDatabase,
        temperature: f64,
        history: &[[f64; 6]],
    ) -> Result<CorrectedHistory, StrError> {
        if history.is_empty() {
            return Err("the stress history must have at least one step");
        }
        let n = history.len();
        let mut stress = Vec::with_capacity(n);
        let mut plastic_strain = Vec::with_capacity(n);
        let mut non_converged = Vec::new();
        for (k, components) in history.iter().enumerate() {
            let res = self.correct(db, temperature, von_mises_of(components));
            stress.push(res.stress);
            plastic_strain.push(res.plastic_strain);
            if !res.status.is_ok() {
                non_converged.push(k);
            }
        }
        Ok(CorrectedHistory {
            stress,
            plastic_strain,
            components: None,
            non_converged,
        })
    }
}

/// Implements the notch correction chosen by the plasticity parameters
pub struct Corrector {
    /// Holds the actual correction implementation
    pub actual: Box<dyn CorrectionTrait>,
}

impl Corrector {
    /// Allocates a new instance
    pub fn new(param: &ParamPlasticity) -> Result<Self, StrError> {
        if let Some(_) = param.validate() {
            return Err("plasticity parameters are invalid");
        }
        let actual: Box<dyn CorrectionTrait> = match param.method {
            // Neuber's rule
            CorrectionMethod::Neuber => Box::new(Neuber::new(param)),

            // Glinka's equivalent strain energy density rule
            CorrectionMethod::Glinka => Box::new(Glinka::new(param)),

            // incremental tensor correction (experimental)
            CorrectionMethod::IncrementalTensor => {
                if !param.enable_incremental {
                    return Err("the incremental tensor method requires the enable_incremental flag");
                }
                Box::new(IncrementalTensor::new(param))
            }
        };
        Ok(Corrector { actual })
    }
}

/// Computes the von Mises stress of a component set ordered xx, yy, zz, xy, yz, xz
pub(crate) fn von_mises_of(components: &[f64; 6]) -> f64 {
    let mut sigma = Tensor2::new(Mandel::Symmetric);
    sigma.sym_set(0, 0, components[0]);
    sigma.sym_set(1, 1, components[1]);
    sigma.sym_set(2, 2, components[2]);
    sigma.sym_set(0, 1, components[3]);
    sigma.sym_set(1, 2, components[4]);
    sigma.sym_set(0, 2, components[5]);
    sigma.invariant_sigma_d()
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
