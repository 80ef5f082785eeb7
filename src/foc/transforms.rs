// Coordinate transformations for the observer
// Park / inverse Park in sin/cos form plus angle helpers

use core::f32::consts::{PI, TAU};
use libm::{cosf, sinf};

// Enable idsp-based fast trigonometric functions
const USE_IDSP_COSSIN: bool = true;

/// Wrap an angle into (-π, π]
#[inline]
pub fn wrap_angle(angle: f32) -> f32 {
    let mut wrapped = angle % TAU;
    if wrapped > PI {
        wrapped -= TAU;
    } else if wrapped <= -PI {
        wrapped += TAU;
    }
    wrapped
}

/// Sine and cosine of an electrical angle
///
/// # Returns
/// Tuple of (sin, cos)
///
/// # Implementation
/// Uses idsp::cossin() (~40 cycles on Cortex-M) unless USE_IDSP_COSSIN is
/// cleared, in which case libm::sinf/cosf are used.
#[inline]
pub fn sin_cos(theta: f32) -> (f32, f32) {
    if USE_IDSP_COSSIN {
        sin_cos_idsp(theta)
    } else {
        sin_cos_libm(theta)
    }
}

/// sin/cos using idsp::cossin() (fast, fixed-point phase)
#[inline]
pub fn sin_cos_idsp(theta: f32) -> (f32, f32) {
    // idsp uses i32::MIN..i32::MAX to represent -π..π
    const SCALE: f32 = 2147483648.0 / PI; // 2^31 / π
    const I32_TO_F32: f32 = 1.0 / 2147483648.0; // 1 / 2^31

    // Saturating cast: π maps to i32::MAX
    let phase: i32 = (wrap_angle(theta) * SCALE) as i32;
    let (cos_i32, sin_i32) = idsp::cossin(phase);

    (sin_i32 as f32 * I32_TO_F32, cos_i32 as f32 * I32_TO_F32)
}

/// sin/cos using libm (slower, reference)
#[inline]
pub fn sin_cos_libm(theta: f32) -> (f32, f32) {
    (sinf(theta), cosf(theta))
}

/// Park transformation (αβ → dq) with precomputed trigonometry
///
/// # Arguments
/// * `alpha`, `beta` - Stationary-frame components
/// * `sin_theta`, `cos_theta` - Trigonometry of the frame angle
///
/// # Returns
/// Tuple of (d, q)
#[inline]
pub fn park(alpha: f32, beta: f32, sin_theta: f32, cos_theta: f32) -> (f32, f32) {
    let d = alpha * cos_theta + beta * sin_theta;
    let q = beta * cos_theta - alpha * sin_theta;
    (d, q)
}

/// Inverse Park transformation (dq → αβ) with precomputed trigonometry
///
/// # Returns
/// Tuple of (alpha, beta)
#[inline]
pub fn inverse_park_sin_cos(d: f32, q: f32, sin_theta: f32, cos_theta: f32) -> (f32, f32) {
    let alpha = d * cos_theta - q * sin_theta;
    let beta = d * sin_theta + q * cos_theta;
    (alpha, beta)
}

/// Inverse Park transformation (dq → αβ)
///
/// # Arguments
/// * `vd` - d-axis component (aligned with rotor flux)
/// * `vq` - q-axis component (torque producing)
/// * `theta` - Electrical angle in radians
pub fn inverse_park(vd: f32, vq: f32, theta: f32) -> (f32, f32) {
    let (sin_theta, cos_theta) = sin_cos(theta);
    inverse_park_sin_cos(vd, vq, sin_theta, cos_theta)
}

/// Squared magnitude of a two-component vector
#[inline]
pub fn magnitude_sq(v: [f32; 2]) -> f32 {
    v[0] * v[0] + v[1] * v[1]
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 0.0001;

    fn approx_eq(a: f32, b: f32) -> bool {
        (a - b).abs() < EPSILON
    }

    #[test]
    fn test_inverse_park_zero_angle() {
        let (v_alpha, v_beta) = inverse_park(1.0, 0.0, 0.0);
        assert!(approx_eq(v_alpha, 1.0));
        assert!(approx_eq(v_beta, 0.0));
    }

    #[test]
    fn test_inverse_park_quarter_turn() {
        let (v_alpha, v_beta) = inverse_park(1.0, 0.0, PI / 2.0);
        assert!(approx_eq(v_alpha, 0.0));
        assert!(approx_eq(v_beta, 1.0));
    }

    #[test]
    fn test_park_undoes_inverse_park() {
        let (s, c) = sin_cos(0.7);
        let (alpha, beta) = inverse_park_sin_cos(2.0, -3.0, s, c);
        let (d, q) = park(alpha, beta, s, c);
        assert!(approx_eq(d, 2.0));
        assert!(approx_eq(q, -3.0));
    }

    #[test]
    fn test_idsp_matches_libm() {
        let mut theta = -PI;
        while theta <= PI {
            let (s_fast, c_fast) = sin_cos_idsp(theta);
            let (s_ref, c_ref) = sin_cos_libm(theta);
            assert!(approx_eq(s_fast, s_ref), "sin mismatch at {}", theta);
            assert!(approx_eq(c_fast, c_ref), "cos mismatch at {}", theta);
            theta += 0.01;
        }
    }

    #[test]
    fn test_wrap_angle() {
        assert!(approx_eq(wrap_angle(0.0), 0.0));
        assert_eq!(wrap_angle(PI), PI);
        assert!(approx_eq(wrap_angle(-PI), PI));
        assert!(approx_eq(wrap_angle(3.0 * PI / 2.0), -PI / 2.0));
        assert!(approx_eq(wrap_angle(7.0), 7.0 - TAU));
        assert!(approx_eq(wrap_angle(-7.0), -7.0 + TAU));
        assert!(approx_eq(wrap_angle(10.0 * TAU + 1.0), 1.0));
    }

    #[test]
    fn test_wrap_angle_range() {
        let mut angle = -50.0;
        while angle < 50.0 {
            let wrapped = wrap_angle(angle);
            assert!(wrapped > -PI && wrapped <= PI, "{} -> {}", angle, wrapped);
            angle += 0.013;
        }
    }

    #[test]
    fn test_magnitude_sq() {
        assert!(approx_eq(magnitude_sq([3.0, 4.0]), 25.0));
    }
}
