use crate::base::Extrapolation;
use crate::StrError;
use serde::{Deserialize, Serialize};

/// Implements a monotonic stress-strain curve at a fixed temperature
///
/// The curve is given by total-strain points starting at the origin; the
/// first segment is elastic and defines Young's modulus, and the stress at
/// the first point after the origin is the yield stress:
///
/// ```text
/// σ ↑                       ___.
///   |                 __.——
///   |          yield.—
///   |             /:
///   |            / :
///   |        E  /  :
///   |          /   :  plastic branch
///   |         /    :
///   |________/_____:___________________→ ε
///          origin
/// ```
///
/// Internally, every point at and beyond the yield also carries its plastic
/// strain
///
/// ```text
///             σk
/// εpk = εk - ————
///             E
/// ```
///
/// which supports the notch correction queries (flow stress, plastic
/// strain, and plastic strain energy).
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct MaterialCurve {
    /// Temperature at which the curve holds
    pub temperature: f64,

    /// Total strain values (npoint), strictly increasing from zero
    strain: Vec<f64>,

    /// Stress values (npoint), strictly increasing from zero
    stress: Vec<f64>,

    /// Young's modulus (slope of the first segment)
    young: f64,

    /// Plastic strains of the plastic branch; the first entry is zero
    epsp: Vec<f64>,

    /// Stresses of the plastic branch; the first entry is the yield stress
    flow: Vec<f64>,
}

impl MaterialCurve {
    /// Allocates a new instance from total-strain points
    ///
    /// The first point must be the origin (0, 0) and both strain and stress
    /// must be strictly increasing. A two-point curve is purely elastic.
    pub fn new(temperature: f64, strain: &[f64], stress: &[f64]) -> Result<Self, StrError> {
        if strain.len() != stress.len() {
            return Err("strain and stress arrays must have the same length");
        }
        let npoint = strain.len();
        if npoint < 2 {
            return Err("at least two curve points are required");
        }
        if strain[0] != 0.0 || stress[0] != 0.0 {
            return Err("the first curve point must be the origin");
        }
        for k in 1..npoint {
            if strain[k] <= strain[k - 1] {
                return Err("strain values must be strictly increasing");
            }
            if stress[k] <= stress[k - 1] {
                return Err("stress values must be strictly increasing");
            }
        }
        let young = stress[1] / strain[1];
        let mut epsp = Vec::with_capacity(npoint - 1);
        let mut flow = Vec::with_capacity(npoint - 1);
        for k in 1..npoint {
            let ep = strain[k] - stress[k] / young;
            if k > 1 && ep <= epsp[epsp.len() - 1] {
                return Err("the plastic strain derived from the curve must be increasing");
            }
            epsp.push(if k == 1 { 0.0 } else { ep });
            flow.push(stress[k]);
        }
        Ok(MaterialCurve {
            temperature,
            strain: strain.to_vec(),
            stress: stress.to_vec(),
            young,
            epsp,
            flow,
        })
    }

    /// Allocates a new instance from a plastic-strain table
    ///
    /// The table lists (plastic strain, stress) pairs of the plastic branch
    /// starting at (0, yield stress). The corresponding total strains are
    /// recovered through εk = σk/E + εpk.
    pub fn from_plastic_table(temperature: f64, young: f64, epsp: &[f64], flow: &[f64]) -> Result<Self, StrError> {
        if young <= 0.0 {
            return Err("Young's modulus must be positive");
        }
        if epsp.len() != flow.len() {
            return Err("plastic strain and stress arrays must have the same length");
        }
        if epsp.is_empty() {
            return Err("at least one plastic point is required");
        }
        if epsp[0] != 0.0 {
            return Err("the first plastic strain must be zero (yield point)");
        }
        let npoint = epsp.len() + 1;
        let mut strain = Vec::with_capacity(npoint);
        let mut stress = Vec::with_capacity(npoint);
        strain.push(0.0);
        stress.push(0.0);
        for k in 0..epsp.len() {
            strain.push(flow[k] / young + epsp[k]);
            stress.push(flow[k]);
        }
        MaterialCurve::new(temperature, &strain, &stress)
    }

    /// Returns Young's modulus (slope of the first segment)
    pub fn young(&self) -> f64 {
        self.young
    }

    /// Returns the yield stress (stress at the first point after the origin)
    pub fn yield_stress(&self) -> f64 {
        self.flow[0]
    }

    /// Returns the number of curve points (including the origin)
    pub fn npoint(&self) -> usize {
        self.strain.len()
    }

    /// Indicates whether the curve has a plastic branch beyond the yield point
    pub fn has_plastic(&self) -> bool {
        self.flow.len() > 1
    }

    /// Returns the plastic branch tables (plastic strains, stresses)
    pub fn plastic_table(&self) -> (&[f64], &[f64]) {
        (&self.epsp, &self.flow)
    }

    /// Returns the plastic strain corresponding to a stress level
    ///
    /// Stresses at or below the yield return zero. Beyond the last point,
    /// Linear extends the last segment whereas Plateau clamps the result.
    pub fn plastic_strain_at(&self, sigma: f64, extrapolation: Extrapolation) -> f64 {
        if sigma <= self.flow[0] || !self.has_plastic() {
            return 0.0;
        }
        let n = self.flow.len();
        if sigma <= self.flow[n - 1] {
            return interp(&self.flow, &self.epsp, sigma);
        }
        match extrapolation {
            Extrapolation::Linear => {
                let slope = (self.flow[n - 1] - self.flow[n - 2]) / (self.epsp[n - 1] - self.epsp[n - 2]);
                self.epsp[n - 1] + (sigma - self.flow[n - 1]) / slope
            }
            Extrapolation::Plateau => self.epsp[n - 1],
        }
    }

    /// Returns the flow stress corresponding to an accumulated plastic strain
    ///
    /// Non-positive plastic strains return the yield stress. Beyond the last
    /// point, Linear extends the last segment whereas Plateau clamps.
    pub fn flow_stress_at(&self, epsp: f64, extrapolation: Extrapolation) -> f64 {
        if epsp <= 0.0 || !self.has_plastic() {
            return self.flow[0];
        }
        let n = self.epsp.len();
        if epsp <= self.epsp[n - 1] {
            return interp(&self.epsp, &self.flow, epsp);
        }
        match extrapolation {
            Extrapolation::Linear => {
                let slope = (self.flow[n - 1] - self.flow[n - 2]) / (self.epsp[n - 1] - self.epsp[n - 2]);
                self.flow[n - 1] + (epsp - self.epsp[n - 1]) * slope
            }
            Extrapolation::Plateau => self.flow[n - 1],
        }
    }

    /// Returns the plastic strain energy density accumulated up to a stress level
    ///
    /// Integrates σ dεp over the plastic branch by the trapezoidal rule:
    ///
    /// ```text
    ///         εp(σ)
    /// Up(σ) =   ∫   σ(εp') dεp'
    ///          0
    /// ```
    pub fn plastic_energy_at(&self, sigma: f64, extrapolation: Extrapolation) -> f64 {
        if sigma <= self.flow[0] || !self.has_plastic() {
            return 0.0;
        }
        let target = self.plastic_strain_at(sigma, extrapolation);
        let mut energy = 0.0;
        let n = self.epsp.len();
        for j in 0..n - 1 {
            if self.epsp[j + 1] <= target {
                energy += 0.5 * (self.flow[j] + self.flow[j + 1]) * (self.epsp[j + 1] - self.epsp[j]);
            } else {
                let sig_here = self.flow_stress_at(target, extrapolation);
                energy += 0.5 * (self.flow[j] + sig_here) * (target - self.epsp[j]);
                return energy;
            }
        }
        // beyond the last tabulated point
        if target > self.epsp[n - 1] {
            let sig_end = match extrapolation {
                Extrapolation::Linear => sigma,
                Extrapolation::Plateau => self.flow[n - 1],
            };
            energy += 0.5 * (self.flow[n - 1] + sig_end) * (target - self.epsp[n - 1]);
        }
        energy
    }

    /// Returns a curve with its plastic branch resampled onto a given grid
    ///
    /// The grid must start at zero and be strictly increasing; the stress at
    /// each grid point follows from the flow-stress query with linear
    /// end-slope extrapolation.
    pub fn resample_plastic(&self, grid: &[f64]) -> Result<MaterialCurve, StrError> {
        if !self.has_plastic() {
            return Err("cannot resample a curve without a plastic branch");
        }
        let flow: Vec<f64> = grid
            .iter()
            .map(|ep| self.flow_stress_at(*ep, Extrapolation::Linear))
            .collect();
        MaterialCurve::from_plastic_table(self.temperature, self.young, grid, &flow)
    }

    /// Returns the curve of the original default material (aluminum at 22 ℃)
    pub fn sample_aluminum_22c() -> Self {
        MaterialCurve::from_plastic_table(22.0, 70000.0, &[0.0, 0.3007], &[400.0, 1004.3]).unwrap()
    }
}

/// Interpolates linearly on a strictly increasing abscissa table
///
/// The caller guarantees xa[0] < x ≤ xa[n-1].
fn interp(xa: &[f64], ya: &[f64], x: f64) -> f64 {
    let n = xa.len();
    for j in 1..n {
        if x <= xa[j] {
            let t = (x - xa[j - 1]) / (xa[j] - xa[j - 1]);
            return ya[j - 1] + t * (ya[j] - ya[j - 1]);
        }
    }
    ya[n - 1]
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
