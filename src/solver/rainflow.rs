use crate::base::ParamFatigue;
use serde::{Deserialize, Serialize};

/// Holds one counted stress cycle
#[derive(Clone, Copy, Debug, Deserialize, Serialize)]
pub struct Cycle {
    /// Stress range Δσ of the cycle
    pub range: f64,

    /// Mean stress of the cycle
    pub mean: f64,

    /// Cycle weight: 1.0 for a closed cycle, 0.5 for a residual half cycle
    pub weight: f64,
}

/// Holds the cumulative fatigue damage of one stress history
///
/// The damage follows Miner's rule: every counted cycle contributes
/// `weight / N_fail(Δσ)` and the total never decreases. A total of one or
/// more raises the likely-failure flag; it is reported, never enforced.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct DamageRecord {
    /// Counted cycles in extraction order
    pub cycles: Vec<Cycle>,

    /// Cumulative damage D = Σ weight/N_fail
    pub damage: f64,

    /// Indicates D ≥ 1
    pub likely_failure: bool,
}

impl DamageRecord {
    /// Allocates a new (empty) instance
    pub fn new() -> Self {
        DamageRecord {
            cycles: Vec::new(),
            damage: 0.0,
            likely_failure: false,
        }
    }

    /// Appends one cycle and accumulates its damage
    ///
    /// Zero-range cycles are recorded but contribute no damage.
    pub fn append(&mut self, cycle: Cycle, fatigue: &ParamFatigue) {
        self.damage += fatigue.damage(cycle.range, cycle.weight);
        if self.damage >= 1.0 {
            self.likely_failure = true;
        }
        self.cycles.push(cycle);
    }

    /// Returns the summed weight of the cycles matching a stress range
    pub fn count_at(&self, range: f64, tol: f64) -> f64 {
        self.cycles
            .iter()
            .filter(|c| f64::abs(c.range - range) <= tol)
            .map(|c| c.weight)
            .sum()
    }
}

/// Reduces a history to its turning points
///
/// Keeps the first sample, every local extremum, and the last sample;
/// repeated values inside a monotone stroke collapse onto the stroke.
pub fn turning_points(history: &[f64]) -> Vec<f64> {
    let mut points = Vec::new();
    if history.is_empty() {
        return points;
    }
    points.push(history[0]);
    let mut last = history[0];
    let mut direction = 0;
    for &x in &history[1..] {
        if x == last {
            continue;
        }
        let new_direction = if x > last { 1 } else { -1 };
        if new_direction == direction {
            let m = points.len();
            points[m - 1] = x;
        } else {
            points.push(x);
            direction = new_direction;
        }
        last = x;
    }
    points
}

/// Counts stress cycles with the four-point rainflow method
///
/// Maintains a stack of unresolved turning points; whenever the last four
/// points A, B, C, D satisfy |C-B| ≤ |B-A| and |C-B| ≤ |D-C|, one closed
/// cycle of range |C-B| and mean (B+C)/2 is extracted and B, C leave the
/// stack. Points remaining at the end pair up as half cycles (weight 0.5).
/// The history must be the full, time-ordered sequence; partial or
/// reordered chunks produce meaningless counts.
pub fn count_cycles(history: &[f64]) -> Vec<Cycle> {
    let points = turning_points(history);
    let mut cycles = Vec::new();
    let mut stack: Vec<f64> = Vec::new();
    for &point in &points {
        stack.push(point);
        loop {
            let n = stack.len();
            if n < 4 {
                break;
            }
            let (a, b, c, d) = (stack[n - 4], stack[n - 3], stack[n - 2], stack[n - 1]);
            let inner = f64::abs(c - b);
            if inner <= f64::abs(b - a) && inner <= f64::abs(d - c) {
                cycles.push(Cycle {
                    range: inner,
                    mean: 0.5 * (b + c),
                    weight: 1.0,
                });
                stack.remove(n - 3);
                stack.remove(n - 3);
            } else {
                break;
            }
        }
    }
    for pair in stack.windows(2) {
        cycles.push(Cycle {
            range: f64::abs(pair[1] - pair[0]),
            mean: 0.5 * (pair[0] + pair[1]),
            weight: 0.5,
        });
    }
    cycles
}

/// Counts the cycles of a history and accumulates Miner damage
pub fn accumulate_damage(history: &[f64], fatigue: &ParamFatigue) -> DamageRecord {
    let mut record = DamageRecord::new();
    for cycle in count_cycles(history) {
        record.append(cycle, fatigue);
    }
    record
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
