use std::f64::consts::PI;

/// Computes the von Mises equivalent stress of a component set
///
/// The components are ordered xx, yy, zz, xy, yz, xz:
///
/// ```text
///       ⎛ (σxx-σyy)² + (σyy-σzz)² + (σzz-σxx)²                        ⎞ ¹ᐟ²
/// σvm = ⎜ ————————————————————————————————————— + 3 (τxy²+τyz²+τxz²) ⎟
///       ⎝                  2                                          ⎠
/// ```
pub fn von_mises(components: &[f64; 6]) -> f64 {
    let (sx, sy, sz) = (components[0], components[1], components[2]);
    let (txy, tyz, txz) = (components[3], components[4], components[5]);
    let d = 0.5 * ((sx - sy) * (sx - sy) + (sy - sz) * (sy - sz) + (sz - sx) * (sz - sx));
    f64::sqrt(d + 3.0 * (txy * txy + tyz * tyz + txz * txz))
}

/// Computes the ordered principal stresses of a component set
///
/// Returns (s1, s2, s3) with s1 ≥ s2 ≥ s3, using the trigonometric solution
/// of the characteristic cubic. A tensor without shear components takes a
/// deterministic path instead: the diagonal is sorted by value (stable, so
/// equal values keep the x, y, z order). Equal principal values are a valid
/// result, not an error.
pub fn principal_stresses(components: &[f64; 6]) -> (f64, f64, f64) {
    let (sx, sy, sz) = (components[0], components[1], components[2]);
    let (txy, tyz, txz) = (components[3], components[4], components[5]);
    let p1 = txy * txy + tyz * tyz + txz * txz;
    if p1 == 0.0 {
        let mut diag = [sx, sy, sz];
        diag.sort_by(|a, b| b.partial_cmp(a).unwrap_or(std::cmp::Ordering::Equal));
        return (diag[0], diag[1], diag[2]);
    }
    let q = (sx + sy + sz) / 3.0;
    let p2 = (sx - q) * (sx - q) + (sy - q) * (sy - q) + (sz - q) * (sz - q) + 2.0 * p1;
    let p = f64::sqrt(p2 / 6.0);
    // half determinant of (A - q I) / p
    let (bx, by, bz) = ((sx - q) / p, (sy - q) / p, (sz - q) / p);
    let (bxy, byz, bxz) = (txy / p, tyz / p, txz / p);
    let det = bx * (by * bz - byz * byz) - bxy * (bxy * bz - byz * bxz) + bxz * (bxy * byz - by * bxz);
    let r = f64::max(-1.0, f64::min(1.0, det / 2.0));
    let phi = f64::acos(r) / 3.0;
    let s1 = q + 2.0 * p * f64::cos(phi);
    let s3 = q + 2.0 * p * f64::cos(phi + 2.0 * PI / 3.0);
    let s2 = 3.0 * q - s1 - s3;
    (s1, s2, s3)
}

/// Computes the magnitude of a three-component vector
pub fn magnitude3(x: f64, y: f64, z: f64) -> f64 {
    f64::sqrt(x * x + y * y + z * z)
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
