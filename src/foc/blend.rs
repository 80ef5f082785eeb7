// Open-loop / closed-loop blending of the rotor state
// At low speed the back-EMF carries no angle information, so the observer
// output is faded towards the forced-commutation angle and speed.

use super::transforms::wrap_angle;

/// Angle and velocity pair used on both sides of the blend
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RotorState {
    /// Electrical angle [rad], in (-π, π]
    pub angle_rad: f32,
    /// Electrical angular velocity [rad/s]
    pub angular_velocity_rad_per_s: f32,
}

impl RotorState {
    pub const fn new(angle_rad: f32, angular_velocity_rad_per_s: f32) -> Self {
        Self {
            angle_rad,
            angular_velocity_rad_per_s,
        }
    }
}

/// Linear interpolation between open-loop and observer state
///
/// # Arguments
/// * `open_loop` - Forced-commutation state
/// * `closed_loop` - Observer-corrected state
/// * `closed_loop_frac` - 0.0 = fully open loop, 1.0 = fully closed loop (clamped)
///
/// The angle is interpolated along the shortest arc and re-wrapped. The end
/// points return the corresponding input unchanged.
pub fn blend_open_loop(
    open_loop: RotorState,
    closed_loop: RotorState,
    closed_loop_frac: f32,
) -> RotorState {
    let frac = closed_loop_frac.clamp(0.0, 1.0);

    if frac <= 0.0 {
        return open_loop;
    }
    if frac >= 1.0 {
        return closed_loop;
    }

    let angle_error = wrap_angle(closed_loop.angle_rad - open_loop.angle_rad);
    RotorState {
        angle_rad: wrap_angle(open_loop.angle_rad + frac * angle_error),
        angular_velocity_rad_per_s: open_loop.angular_velocity_rad_per_s
            + frac
                * (closed_loop.angular_velocity_rad_per_s - open_loop.angular_velocity_rad_per_s),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::f32::consts::PI;

    const EPSILON: f32 = 1e-5;

    fn approx_eq(a: f32, b: f32) -> bool {
        (a - b).abs() < EPSILON
    }

    #[test]
    fn test_end_points_are_exact() {
        let open = RotorState::new(0.3, 100.0);
        let closed = RotorState::new(-2.9, 250.0);
        assert_eq!(blend_open_loop(open, closed, 0.0), open);
        assert_eq!(blend_open_loop(open, closed, 1.0), closed);
    }

    #[test]
    fn test_fraction_is_clamped() {
        let open = RotorState::new(0.3, 100.0);
        let closed = RotorState::new(-2.9, 250.0);
        assert_eq!(blend_open_loop(open, closed, -0.5), open);
        assert_eq!(blend_open_loop(open, closed, 1.5), closed);
    }

    #[test]
    fn test_midpoint() {
        let open = RotorState::new(0.2, 100.0);
        let closed = RotorState::new(0.6, 200.0);
        let mixed = blend_open_loop(open, closed, 0.5);
        assert!(approx_eq(mixed.angle_rad, 0.4));
        assert!(approx_eq(mixed.angular_velocity_rad_per_s, 150.0));
    }

    #[test]
    fn test_shortest_arc_across_wrap() {
        // 3.0 and -3.0 are 0.283 rad apart across ±π, not 6 rad
        let open = RotorState::new(3.0, 0.0);
        let closed = RotorState::new(-3.0, 0.0);
        let mixed = blend_open_loop(open, closed, 0.5);
        assert!(approx_eq(mixed.angle_rad.abs(), PI));
        assert!(mixed.angle_rad > -PI && mixed.angle_rad <= PI);
    }
}
