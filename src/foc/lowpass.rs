//! One-pole low-pass filtering
//!
//! y(n) = y(n-1) + α·(x(n) - y(n-1)), with α derived from the corner
//! frequency by exponential smoothing: α = 1 - exp(-ωb·T).

use core::f32::consts::TAU;
use libm::expm1f;

/// Smoothing coefficient for a corner of `bandwidth_hz * multiplier`
///
/// # Arguments
/// * `bandwidth_hz` - Base bandwidth [Hz]
/// * `t_s` - Sample period [s]
/// * `multiplier` - Corner frequency relative to `bandwidth_hz`
///
/// # Returns
/// Coefficient in (0, 1) for any positive bandwidth and sample period
pub fn lowpass_coefficient(bandwidth_hz: f32, t_s: f32, multiplier: f32) -> f32 {
    let wb = TAU * bandwidth_hz;
    // 1 - exp(-x) without cancellation for small x
    -expm1f(-wb * t_s * multiplier)
}

/// Advance a one-pole filter state towards `measurement`
#[inline]
pub fn filter(state: &mut f32, measurement: f32, coeff: f32) -> f32 {
    *state += coeff * (measurement - *state);
    *state
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coefficient_matches_exponential_law() {
        let coeff = lowpass_coefficient(100.0, 50.0e-6, 1.0);
        let expected = 1.0 - libm::expf(-TAU * 100.0 * 50.0e-6);
        assert!((coeff - expected).abs() < 1e-6);
    }

    #[test]
    fn test_coefficient_range() {
        for &bw in &[0.1f32, 1.0, 10.0, 50.0, 100.0] {
            for &t in &[1.0e-5f32, 2.5e-5, 5.0e-5, 1.0e-4] {
                let current = lowpass_coefficient(bw, t, 50.0);
                let velocity = lowpass_coefficient(bw, t, 1.0);
                assert!(velocity > 0.0 && velocity < 1.0);
                assert!(current > 0.0 && current < 1.0);
                assert!(velocity < current);
            }
        }
    }

    #[test]
    fn test_filter_converges() {
        let mut y = 0.0;
        for _ in 0..200 {
            filter(&mut y, 2.0, 0.1);
        }
        assert!((y - 2.0).abs() < 1e-3);
    }

    #[test]
    fn test_filter_unity_coefficient_passes_through() {
        let mut y = 5.0;
        assert_eq!(filter(&mut y, -1.0, 1.0), -1.0);
    }
}
