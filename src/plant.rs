//! Simulated surface-mount PMSM
//!
//! Stationary-frame RL winding with a back-EMF of φ·ω·(-sin θ, cos θ),
//! driven at a fixed electrical speed. Used by the bench firmware and the
//! unit tests in place of a power stage.

use crate::config::MotorParams;
use crate::foc::transforms::{sin_cos, wrap_angle};

/// Euler sub-steps per control period
const SUBSTEPS: u32 = 20;

/// Constant-speed motor model
#[derive(Debug, Clone)]
pub struct MotorPlant {
    params: MotorParams,
    /// Electrical angle [rad]
    angle_rad: f32,
    /// Electrical angular velocity [rad/s]
    angular_velocity_rad_per_s: f32,
    /// Stator current [A]
    i_ab_a: [f32; 2],
}

impl MotorPlant {
    /// Motor at angle zero with no current
    pub fn new(params: MotorParams, angular_velocity_rad_per_s: f32) -> Self {
        Self {
            params,
            angle_rad: 0.0,
            angular_velocity_rad_per_s,
            i_ab_a: [0.0, 0.0],
        }
    }

    pub fn with_angle(mut self, angle_rad: f32) -> Self {
        self.angle_rad = wrap_angle(angle_rad);
        self
    }

    pub fn set_angular_velocity(&mut self, angular_velocity_rad_per_s: f32) {
        self.angular_velocity_rad_per_s = angular_velocity_rad_per_s;
    }

    /// Apply `v_ab_v` for one period and return the current at its end
    pub fn step(&mut self, v_ab_v: [f32; 2], t_s: f32) -> [f32; 2] {
        let dt = t_s / SUBSTEPS as f32;
        let MotorParams {
            rs_r,
            ls_h,
            phi_v_s_per_rad,
        } = self.params;
        let emf_gain = phi_v_s_per_rad * self.angular_velocity_rad_per_s;

        for j in 0..SUBSTEPS {
            let theta = self.angle_rad + self.angular_velocity_rad_per_s * dt * (j as f32 + 0.5);
            let (sin_theta, cos_theta) = sin_cos(theta);
            let emf = [-emf_gain * sin_theta, emf_gain * cos_theta];

            for k in 0..2 {
                let di = (v_ab_v[k] - rs_r * self.i_ab_a[k] - emf[k]) / ls_h;
                self.i_ab_a[k] += di * dt;
            }
        }

        self.angle_rad = wrap_angle(self.angle_rad + self.angular_velocity_rad_per_s * t_s);
        self.i_ab_a
    }

    /// Electrical angle [rad], in (-π, π]
    pub fn angle(&self) -> f32 {
        self.angle_rad
    }

    pub fn angular_velocity(&self) -> f32 {
        self.angular_velocity_rad_per_s
    }

    pub fn current(&self) -> [f32; 2] {
        self.i_ab_a
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foc::transforms::park;
    use core::f32::consts::PI;

    const T: f32 = 50.0e-6;

    #[test]
    fn test_dc_steady_state() {
        let params = MotorParams::default();
        let mut plant = MotorPlant::new(params, 0.0);
        for _ in 0..1000 {
            plant.step([0.24, -0.12], T);
        }
        let i = plant.current();
        assert!((i[0] - 0.24 / params.rs_r).abs() < 1e-3);
        assert!((i[1] + 0.12 / params.rs_r).abs() < 1e-3);
    }

    #[test]
    fn test_open_circuit_back_emf_drives_current() {
        // Zero voltage while spinning: current opposes the back-EMF on q
        let params = MotorParams::default();
        let omega = 1000.0;
        let mut plant = MotorPlant::new(params, omega);
        for _ in 0..2000 {
            plant.step([0.0, 0.0], T);
        }
        let i = plant.current();
        let (s, c) = sin_cos(plant.angle());
        let (_, i_q) = park(i[0], i[1], s, c);
        assert!(i_q < 0.0);
    }

    #[test]
    fn test_angle_advances() {
        let mut plant = MotorPlant::new(MotorParams::default(), 1000.0).with_angle(3.0);
        plant.step([0.0, 0.0], T);
        assert!((plant.angle() - wrap_angle(3.0 + 1000.0 * T)).abs() < 1e-6);
        assert!(plant.angle() > -PI && plant.angle() <= PI);
    }

    #[test]
    fn test_speed_change() {
        let mut plant = MotorPlant::new(MotorParams::default(), 500.0);
        assert_eq!(plant.angular_velocity(), 500.0);
        plant.step([0.0, 0.0], T);
        let angle = plant.angle();

        plant.set_angular_velocity(0.0);
        assert_eq!(plant.angular_velocity(), 0.0);
        plant.step([0.0, 0.0], T);
        assert_eq!(plant.angle(), angle);
    }
}
