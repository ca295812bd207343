use super::MaterialCurve;
use crate::base::Extrapolation;
use crate::StrError;
use serde::{Deserialize, Serialize};

/// Implements a set of stress-strain curves indexed by temperature
///
/// Upon construction, the plastic branches of all curves are resampled onto
/// a common plastic-strain grid (the densest curve wins) so that every
/// query can be evaluated row-wise and blended pointwise. A query at a
/// temperature between two reference rows is evaluated on both rows and the
/// results are interpolated linearly:
///
/// ```text
/// f(T) = (1 - ξ) f(T₁) + ξ f(T₂)        T₁ ≤ T ≤ T₂
/// ```
///
/// Outside the stored range, the configured extrapolation applies: Linear
/// keeps ξ beyond [0, 1] (extending the result along the last segment)
/// whereas Plateau clamps to the edge row. The database is immutable after
/// construction and can be shared among threads.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct MaterialDatabase {
    /// Reference curves with strictly increasing temperatures
    curves: Vec<MaterialCurve>,
}

impl MaterialDatabase {
    /// Allocates a new instance
    pub fn new(curves: Vec<MaterialCurve>) -> Result<Self, StrError> {
        if curves.is_empty() {
            return Err("at least one material curve is required");
        }
        for i in 1..curves.len() {
            if curves[i].temperature <= curves[i - 1].temperature {
                return Err("curve temperatures must be strictly increasing");
            }
        }
        let n_plastic = curves.iter().filter(|c| c.has_plastic()).count();
        if n_plastic == 0 {
            return Ok(MaterialDatabase { curves });
        }
        if n_plastic != curves.len() {
            return Err("curves must either all have a plastic branch or none");
        }
        // resample onto the densest plastic grid (first wins on ties)
        let mut densest = 0;
        for i in 1..curves.len() {
            if curves[i].npoint() > curves[densest].npoint() {
                densest = i;
            }
        }
        let grid = curves[densest].plastic_table().0.to_vec();
        let mut resampled = Vec::with_capacity(curves.len());
        for curve in &curves {
            resampled.push(curve.resample_plastic(&grid)?);
        }
        Ok(MaterialDatabase { curves: resampled })
    }

    /// Returns the number of reference curves
    pub fn ncurve(&self) -> usize {
        self.curves.len()
    }

    /// Returns the reference curves
    pub fn curves(&self) -> &[MaterialCurve] {
        &self.curves
    }

    /// Returns the reference curve closest to a temperature
    pub fn curve_at(&self, temperature: f64) -> &MaterialCurve {
        let mut best = 0;
        let mut dist = f64::abs(self.curves[0].temperature - temperature);
        for (i, curve) in self.curves.iter().enumerate() {
            let d = f64::abs(curve.temperature - temperature);
            if d < dist {
                best = i;
                dist = d;
            }
        }
        &self.curves[best]
    }

    /// Returns Young's modulus at a temperature
    pub fn young(&self, temperature: f64, extrapolation: Extrapolation) -> f64 {
        self.blend(temperature, extrapolation, |c| c.young())
    }

    /// Returns the yield stress at a temperature
    pub fn yield_stress(&self, temperature: f64, extrapolation: Extrapolation) -> f64 {
        self.blend(temperature, extrapolation, |c| c.yield_stress())
    }

    /// Returns the plastic strain at a stress level and temperature
    pub fn plastic_strain(&self, temperature: f64, sigma: f64, extrapolation: Extrapolation) -> f64 {
        self.blend(temperature, extrapolation, |c| c.plastic_strain_at(sigma, extrapolation))
    }

    /// Returns the flow stress at an accumulated plastic strain and temperature
    pub fn flow_stress(&self, temperature: f64, epsp: f64, extrapolation: Extrapolation) -> f64 {
        self.blend(temperature, extrapolation, |c| c.flow_stress_at(epsp, extrapolation))
    }

    /// Returns the plastic strain energy density at a stress level and temperature
    pub fn plastic_energy(&self, temperature: f64, sigma: f64, extrapolation: Extrapolation) -> f64 {
        self.blend(temperature, extrapolation, |c| c.plastic_energy_at(sigma, extrapolation))
    }

    /// Evaluates a row query on the bracketing curves and interpolates the results
    fn blend<F>(&self, temperature: f64, extrapolation: Extrapolation, query: F) -> f64
    where
        F: Fn(&MaterialCurve) -> f64,
    {
        let (lo, hi, xi) = self.bracket(temperature, extrapolation);
        if lo == hi {
            return query(&self.curves[lo]);
        }
        let f_lo = query(&self.curves[lo]);
        let f_hi = query(&self.curves[hi]);
        f_lo + xi * (f_hi - f_lo)
    }

    /// Returns the bracketing row indices and the interpolation parameter
    ///
    /// With Linear extrapolation, ξ may lie outside [0, 1] for temperatures
    /// beyond the stored range; with Plateau, the edge row is returned.
    fn bracket(&self, temperature: f64, extrapolation: Extrapolation) -> (usize, usize, f64) {
        let n = self.curves.len();
        if n == 1 {
            return (0, 0, 0.0);
        }
        let t_first = self.curves[0].temperature;
        let t_last = self.curves[n - 1].temperature;
        if temperature < t_first {
            return match extrapolation {
                Extrapolation::Linear => {
                    let t1 = self.curves[1].temperature;
                    (0, 1, (temperature - t_first) / (t1 - t_first))
                }
                Extrapolation::Plateau => (0, 0, 0.0),
            };
        }
        if temperature > t_last {
            return match extrapolation {
                Extrapolation::Linear => {
                    let t_prev = self.curves[n - 2].temperature;
                    (n - 2, n - 1, (temperature - t_prev) / (t_last - t_prev))
                }
                Extrapolation::Plateau => (n - 1, n - 1, 0.0),
            };
        }
        for j in 1..n {
            if temperature <= self.curves[j].temperature {
                let t_lo = self.curves[j - 1].temperature;
                let t_hi = self.curves[j].temperature;
                return (j - 1, j, (temperature - t_lo) / (t_hi - t_lo));
            }
        }
        (n - 1, n - 1, 0.0)
    }

    /// Returns a single-temperature database of the original default material
    pub fn sample_aluminum() -> Self {
        MaterialDatabase::new(vec![MaterialCurve::sample_aluminum_22c()]).unwrap()
    }

    /// Returns a two-temperature database for blending tests
    ///
    /// The 20 ℃ row matches the aluminum sample; the 100 ℃ row is softer
    /// (E = 60000, yield = 300).
    pub fn sample_two_temperature() -> Self {
        let cold = MaterialCurve::from_plastic_table(20.0, 70000.0, &[0.0, 0.3007], &[400.0, 1004.3]).unwrap();
        let hot = MaterialCurve::from_plastic_table(100.0, 60000.0, &[0.0, 0.25], &[300.0, 800.0]).unwrap();
        MaterialDatabase::new(vec![cold, hot]).unwrap()
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::MaterialDatabase;
    use crate::base::Extrapolation;
    use crate::material::MaterialCurve;
    use russell_lab::approx_eq;

    #[test]
    fn new_works() {
        let db = MaterialDatabase::sample_aluminum();
        assert_eq!(db.ncurve(), 1);
        approx_eq(db.young(22.0, Extrapolation::Linear), 70000.0, 1e-10);
        approx_eq(db.yield_stress(500.0, Extrapolation::Linear), 400.0, 1e-12);

        // resampling: both rows share the densest grid
        let db = MaterialDatabase::sample_two_temperature();
        assert_eq!(db.ncurve(), 2);
        let (grid_cold, _) = db.curves()[0].plastic_table();
        let (grid_hot, _) = db.curves()[1].plastic_table();
        assert_eq!(grid_cold, grid_hot);
    }

    #[test]
    fn new_captures_errors() {
        assert_eq!(
            MaterialDatabase::new(vec![]).err(),
            Some("at least one material curve is required")
        );
        let a = MaterialCurve::sample_aluminum_22c();
        let b = MaterialCurve::sample_aluminum_22c();
        assert_eq!(
            MaterialDatabase::new(vec![a, b]).err(),
            Some("curve temperatures must be strictly increasing")
        );
        let plastic = MaterialCurve::sample_aluminum_22c();
        let elastic = MaterialCurve::new(100.0, &[0.0, 0.002], &[0.0, 140.0]).unwrap();
        assert_eq!(
            MaterialDatabase::new(vec![plastic, elastic]).err(),
            Some("curves must either all have a plastic branch or none")
        );
    }

    #[test]
    fn blending_works() {
        let db = MaterialDatabase::sample_two_temperature();

        // on the rows
        approx_eq(db.young(20.0, Extrapolation::Linear), 70000.0, 1e-9);
        approx_eq(db.young(100.0, Extrapolation::Linear), 60000.0, 1e-9);
        approx_eq(db.yield_stress(20.0, Extrapolation::Linear), 400.0, 1e-12);

        // midway: results are averaged
        approx_eq(db.young(60.0, Extrapolation::Linear), 65000.0, 1e-9);
        approx_eq(db.yield_stress(60.0, Extrapolation::Linear), 350.0, 1e-9);
        let cold = db.plastic_strain(20.0, 500.0, Extrapolation::Linear);
        let hot = db.plastic_strain(100.0, 500.0, Extrapolation::Linear);
        approx_eq(
            db.plastic_strain(60.0, 500.0, Extrapolation::Linear),
            0.5 * (cold + hot),
            1e-12,
        );
        let cold = db.plastic_energy(20.0, 500.0, Extrapolation::Linear);
        let hot = db.plastic_energy(100.0, 500.0, Extrapolation::Linear);
        approx_eq(
            db.plastic_energy(60.0, 500.0, Extrapolation::Linear),
            0.5 * (cold + hot),
            1e-12,
        );
    }

    #[test]
    fn temperature_extrapolation_works() {
        let db = MaterialDatabase::sample_two_temperature();

        // beyond the last row: yield slope is -100/80 per ℃
        approx_eq(db.yield_stress(180.0, Extrapolation::Linear), 200.0, 1e-9);
        approx_eq(db.yield_stress(180.0, Extrapolation::Plateau), 300.0, 1e-12);

        // before the first row
        approx_eq(db.yield_stress(-60.0, Extrapolation::Linear), 500.0, 1e-9);
        approx_eq(db.yield_stress(-60.0, Extrapolation::Plateau), 400.0, 1e-12);
    }

    #[test]
    fn curve_at_works() {
        let db = MaterialDatabase::sample_two_temperature();
        assert_eq!(db.curve_at(30.0).temperature, 20.0);
        assert_eq!(db.curve_at(90.0).temperature, 100.0);
        assert_eq!(db.curve_at(-10.0).temperature, 20.0);
    }

    #[test]
    fn derive_works() {
        let db = MaterialDatabase::sample_two_temperature();
        let clone = db.clone();
        let json = serde_json::to_string(&clone).unwrap();
        let read: MaterialDatabase = serde_json::from_str(&json).unwrap();
        assert_eq!(read.ncurve(), 2);
        approx_eq(read.young(20.0, Extrapolation::Linear), 70000.0, 1e-9);
    }
}
