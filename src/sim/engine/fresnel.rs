//! Fresnel reflectance at a planar interface between two media.
//!
//! This is the single source of truth for every reflect-or-transmit decision
//! the photon walk makes. Unpolarized light is assumed: the reflectance is the
//! mean of the s- and p-polarized reflectances.

/// `|cos|` above this is treated as normal incidence.
pub const COS_ZERO: f64 = 1.0 - 1.0e-12;

/// `|cos|` below this is treated as grazing incidence.
pub const COS_90: f64 = 1.0e-6;

/// Result of a Fresnel evaluation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fresnel {
    /// Fraction of the incident power that is reflected, in [0, 1].
    pub reflectance: f64,
    /// Cosine of the transmission angle (0 on total internal reflection).
    pub cos_transmitted: f64,
}

/// Computes the reflectance going from index `n1` into `n2` at an angle whose
/// cosine is `cos_incidence`.
///
/// - equal indices: no reflection, direction unchanged
/// - near-normal incidence: `((n2 - n1) / (n2 + n1))^2`
/// - near-grazing incidence: full reflection
/// - otherwise Snell's law and the sum/difference-angle form of the Fresnel
///   equations; `sin(theta_t) >= 1` means total internal reflection
pub fn fresnel(n1: f64, n2: f64, cos_incidence: f64) -> Fresnel {
    if n1 == n2 {
        return Fresnel {
            reflectance: 0.0,
            cos_transmitted: cos_incidence,
        };
    }

    let ci = cos_incidence.abs();
    if ci > COS_ZERO {
        let r = (n2 - n1) / (n2 + n1);
        return Fresnel {
            reflectance: r * r,
            cos_transmitted: cos_incidence,
        };
    }
    if ci < COS_90 {
        return Fresnel {
            reflectance: 1.0,
            cos_transmitted: 0.0,
        };
    }

    let sin_i = (1.0 - ci * ci).sqrt();
    let sin_t = n1 / n2 * sin_i;
    if sin_t >= 1.0 {
        return Fresnel {
            reflectance: 1.0,
            cos_transmitted: 0.0,
        };
    }
    let cos_t = (1.0 - sin_t * sin_t).sqrt();

    // a+ = theta_i + theta_t, a- = theta_i - theta_t
    let cos_plus = ci * cos_t - sin_i * sin_t;
    let cos_minus = ci * cos_t + sin_i * sin_t;
    let sin_plus = sin_i * cos_t + ci * sin_t;
    let sin_minus = sin_i * cos_t - ci * sin_t;

    let reflectance = 0.5 * sin_minus * sin_minus * (cos_minus * cos_minus + cos_plus * cos_plus)
        / (sin_plus * sin_plus * cos_minus * cos_minus);

    Fresnel {
        reflectance,
        cos_transmitted: cos_t,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Textbook form: mean of the squared s and p amplitude coefficients.
    fn reference_reflectance(n1: f64, n2: f64, ci: f64) -> f64 {
        let si = (1.0 - ci * ci).sqrt();
        let st = n1 / n2 * si;
        let ct = (1.0 - st * st).sqrt();
        let rs = (n1 * ci - n2 * ct) / (n1 * ci + n2 * ct);
        let rp = (n2 * ci - n1 * ct) / (n2 * ci + n1 * ct);
        0.5 * (rs * rs + rp * rp)
    }

    #[test]
    fn test_equal_indices() {
        for &c in &[1.0, 0.7, 0.3, 1e-9] {
            let f = fresnel(1.4, 1.4, c);
            assert_eq!(f.reflectance, 0.0);
            assert_eq!(f.cos_transmitted, c);
        }
    }

    #[test]
    fn test_normal_incidence() {
        let f = fresnel(1.0, 1.5, 1.0);
        assert!((f.reflectance - 0.04).abs() < 1e-12);
        assert_eq!(f.cos_transmitted, 1.0);

        // Symmetric in the direction of travel
        let g = fresnel(1.5, 1.0, 1.0);
        assert!((g.reflectance - 0.04).abs() < 1e-12);
    }

    #[test]
    fn test_grazing_incidence() {
        let f = fresnel(1.0, 1.5, 1e-8);
        assert_eq!(f.reflectance, 1.0);
        assert_eq!(f.cos_transmitted, 0.0);
    }

    #[test]
    fn test_matches_amplitude_form() {
        for &(n1, n2) in &[(1.0_f64, 1.5_f64), (1.5, 1.0), (1.33, 1.4), (1.4, 1.0)] {
            for &ci in &[0.95_f64, 0.8, 0.6, 0.9999] {
                let st = n1 / n2 * (1.0 - ci * ci).sqrt();
                if st >= 1.0 {
                    continue;
                }
                let f = fresnel(n1, n2, ci);
                let r = reference_reflectance(n1, n2, ci);
                assert!(
                    (f.reflectance - r).abs() < 1e-10,
                    "n1={n1} n2={n2} cos={ci}: got {} expected {r}",
                    f.reflectance
                );
                let ct = (1.0 - st * st).sqrt();
                assert!((f.cos_transmitted - ct).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn test_total_internal_reflection() {
        // Critical angle for 1.5 -> 1.0 is asin(1/1.5) ~ 41.8 deg
        let ci = (60.0_f64).to_radians().cos();
        let f = fresnel(1.5, 1.0, ci);
        assert_eq!(f.reflectance, 1.0);
        assert_eq!(f.cos_transmitted, 0.0);
    }

    #[test]
    fn test_reflectance_bounded() {
        let mut c = 0.001;
        while c < 1.0 {
            let f = fresnel(1.0, 1.4, c);
            assert!((0.0..=1.0).contains(&f.reflectance), "cos={c}");
            c += 0.01;
        }
        // Oblique incidence reflects more than near-normal incidence
        assert!(fresnel(1.0, 1.4, 0.1).reflectance > fresnel(1.0, 1.4, 0.9).reflectance);
    }
}
