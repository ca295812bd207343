use crate::StrError;

/// Approximates the first time derivative of a sampled history
///
/// Uses the five-point (fourth-order) central difference in the interior
/// and second-order one-sided/central formulas near the boundaries:
///
/// ```text
///         f[i-2] - 8 f[i-1] + 8 f[i+1] - f[i+2]
/// f'[i] = —————————————————————————————————————
///                        12 Δt
/// ```
///
/// The samples must be equally spaced; an irregular grid degrades the
/// accuracy order and must be handled by the caller (average step plus a
/// warning). With only two samples, both entries receive the slope of the
/// single interval.
pub fn deriv1_uniform(v: &mut [f64], f: &[f64], dt: f64) -> Result<(), StrError> {
    let n = f.len();
    if v.len() != n {
        return Err("derivative and history arrays must have the same length");
    }
    if n < 2 {
        return Err("at least two time points are required");
    }
    if dt <= 0.0 {
        return Err("the time step must be positive");
    }
    if n == 2 {
        let slope = (f[1] - f[0]) / dt;
        v[0] = slope;
        v[1] = slope;
        return Ok(());
    }
    v[0] = (-3.0 * f[0] + 4.0 * f[1] - f[2]) / (2.0 * dt);
    v[n - 1] = (3.0 * f[n - 1] - 4.0 * f[n - 2] + f[n - 3]) / (2.0 * dt);
    if n < 5 {
        for i in 1..n - 1 {
            v[i] = (f[i + 1] - f[i - 1]) / (2.0 * dt);
        }
        return Ok(());
    }
    v[1] = (f[2] - f[0]) / (2.0 * dt);
    v[n - 2] = (f[n - 1] - f[n - 3]) / (2.0 * dt);
    for i in 2..n - 2 {
        v[i] = (f[i - 2] - 8.0 * f[i - 1] + 8.0 * f[i + 1] - f[i + 2]) / (12.0 * dt);
    }
    Ok(())
}

/// Approximates the second time derivative of a sampled history
///
/// Uses the five-point (fourth-order) central difference in the interior:
///
/// ```text
///          -f[i-2] + 16 f[i-1] - 30 f[i] + 16 f[i+1] - f[i+2]
/// f''[i] = ——————————————————————————————————————————————————
///                             12 Δt²
/// ```
///
/// Boundary entries fall back to second-order one-sided/central formulas.
/// With fewer than three samples the curvature is unresolvable and the
/// output is zero.
pub fn deriv2_uniform(a: &mut [f64], f: &[f64], dt: f64) -> Result<(), StrError> {
    let n = f.len();
    if a.len() != n {
        return Err("derivative and history arrays must have the same length");
    }
    if n < 2 {
        return Err("at least two time points are required");
    }
    if dt <= 0.0 {
        return Err("the time step must be positive");
    }
    let dt2 = dt * dt;
    if n == 2 {
        a[0] = 0.0;
        a[1] = 0.0;
        return Ok(());
    }
    if n == 3 {
        let value = (f[0] - 2.0 * f[1] + f[2]) / dt2;
        a[0] = value;
        a[1] = value;
        a[2] = value;
        return Ok(());
    }
    a[0] = (2.0 * f[0] - 5.0 * f[1] + 4.0 * f[2] - f[3]) / dt2;
    a[n - 1] = (2.0 * f[n - 1] - 5.0 * f[n - 2] + 4.0 * f[n - 3] - f[n - 4]) / dt2;
    if n < 5 {
        for i in 1..n - 1 {
            a[i] = (f[i - 1] - 2.0 * f[i] + f[i + 1]) / dt2;
        }
        return Ok(());
    }
    a[1] = (f[0] - 2.0 * f[1] + f[2]) / dt2;
    a[n - 2] = (f[n - 3] - 2.0 * f[n - 2] + f[n - 1]) / dt2;
    for i in 2..n - 2 {
        a[i] = (-f[i - 2] + 16.0 * f[i - 1] - 30.0 * f[i] + 16.0 * f[i + 1] - f[i + 2]) / (12.0 * dt2);
    }
    Ok(())
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
