// Sensorless rotor-state observer
// Tracks electrical angle and speed from the back-EMF signature in the
// stator current, using a discretized RL model and a 2x2 angle/velocity
// covariance.

use super::blend::{blend_open_loop, RotorState};
use super::covariance::Covariance2;
use super::lowpass::{filter, lowpass_coefficient};
use super::transforms::{inverse_park_sin_cos, park, sin_cos, wrap_angle};
use crate::config::{ControlParams, MotorParams, ObserverTuning};

/// Current filter corner relative to the control bandwidth
/// (one decade above the current loop, which is one decade above the speed loop)
const CURRENT_LPF_BANDWIDTH_MULTIPLIER: f32 = 50.0;

/// Velocity filter corner relative to the control bandwidth
const VELOCITY_LPF_BANDWIDTH_MULTIPLIER: f32 = 1.0;

/// Latest rotor and current estimate
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MotorState {
    /// Angular acceleration [rad/s²]
    pub angular_acceleration_rad_per_s2: f32,
    /// Electrical angular velocity [rad/s]
    pub angular_velocity_rad_per_s: f32,
    /// Electrical angle [rad], in (-π, π]
    pub angle_rad: f32,
    /// Filtered d/q current [A]
    pub i_dq_a: [f32; 2],
}

impl MotorState {
    pub const fn new() -> Self {
        Self {
            angular_acceleration_rad_per_s2: 0.0,
            angular_velocity_rad_per_s: 0.0,
            angle_rad: 0.0,
            i_dq_a: [0.0, 0.0],
        }
    }
}

impl Default for MotorState {
    fn default() -> Self {
        Self::new()
    }
}

/// Sensorless angle/velocity/current observer
#[derive(Debug, Clone, PartialEq)]
pub struct StateEstimator {
    state_estimate: MotorState,

    /// 1 - R / L * T
    a: f32,
    /// phi / L * T
    b: f32,
    /// T / L
    c: f32,
    t: f32,
    t_inv: f32,

    i_dq_lpf_coeff: f32,
    angular_velocity_lpf_coeff: f32,

    tuning: ObserverTuning,
    state_covariance: Covariance2,

    /// Observer velocity before output filtering
    angular_velocity_rad_per_s: f32,
    /// Low-pass state of the corrected velocity
    filtered_velocity_rad_per_s: f32,

    last_i_ab_a: [f32; 2],
    next_sin_theta: f32,
    next_cos_theta: f32,
}

impl StateEstimator {
    /// Create an observer; `set_params` must be called before the first update
    pub fn new(tuning: ObserverTuning) -> Self {
        Self {
            state_estimate: MotorState::new(),
            a: 0.0,
            b: 0.0,
            c: 0.0,
            t: 0.0,
            t_inv: 0.0,
            i_dq_lpf_coeff: 0.0,
            angular_velocity_lpf_coeff: 0.0,
            tuning,
            state_covariance: Covariance2::new(
                tuning.initial_covariance_diag,
                tuning.initial_covariance_off_diag,
            ),
            angular_velocity_rad_per_s: 0.0,
            filtered_velocity_rad_per_s: 0.0,
            last_i_ab_a: [0.0, 0.0],
            next_sin_theta: 0.0,
            next_cos_theta: 1.0,
        }
    }

    /// Derive the discretized model and filter coefficients
    ///
    /// # Arguments
    /// * `params` - Motor electrical constants (inductance must be positive)
    /// * `control_params` - Control bandwidth the filters are scaled from
    /// * `t_s` - Sample period [s] (must be positive)
    ///
    /// The current state estimate is left untouched.
    pub fn set_params(&mut self, params: &MotorParams, control_params: &ControlParams, t_s: f32) {
        assert!(t_s > 0.0, "sample period must be positive");
        assert!(params.ls_h > 0.0, "inductance must be positive");

        self.a = 1.0 - params.rs_r / params.ls_h * t_s;
        self.b = params.phi_v_s_per_rad / params.ls_h * t_s;
        self.c = t_s / params.ls_h;
        self.t = t_s;
        self.t_inv = 1.0 / t_s;

        self.i_dq_lpf_coeff =
            lowpass_coefficient(control_params.bandwidth_hz, t_s, CURRENT_LPF_BANDWIDTH_MULTIPLIER);
        self.angular_velocity_lpf_coeff = lowpass_coefficient(
            control_params.bandwidth_hz,
            t_s,
            VELOCITY_LPF_BANDWIDTH_MULTIPLIER,
        );

        info!(
            "Observer params: R={} L={} phi={} T={} -> a={} b={} c={}",
            params.rs_r,
            params.ls_h,
            params.phi_v_s_per_rad,
            t_s,
            self.a,
            self.b,
            self.c
        );
        info!(
            "  LPF coeff: i_dq={}, velocity={}",
            self.i_dq_lpf_coeff,
            self.angular_velocity_lpf_coeff
        );
    }

    /// Replace the noise model
    ///
    /// Noise terms and the acceleration limit apply from the next update.
    /// The initial covariance entries only apply at the next `reset_state`.
    pub fn set_tuning(&mut self, tuning: ObserverTuning) {
        self.tuning = tuning;
    }

    /// Reset the estimate to standstill with no confidence in angle or speed
    pub fn reset_state(&mut self) {
        debug!("Observer state reset");

        self.state_estimate = MotorState::new();
        self.angular_velocity_rad_per_s = 0.0;
        self.filtered_velocity_rad_per_s = 0.0;
        self.last_i_ab_a = [0.0, 0.0];
        self.next_sin_theta = 0.0;
        self.next_cos_theta = 1.0;
        self.state_covariance = Covariance2::new(
            self.tuning.initial_covariance_diag,
            self.tuning.initial_covariance_off_diag,
        );
    }

    /// Run one predict/correct cycle
    ///
    /// # Arguments
    /// * `i_ab_a` - Measured stationary-frame current [A]
    /// * `v_ab_v` - Stationary-frame voltage applied since the previous tick [V]
    /// * `speed_setpoint` - Open-loop commanded speed [rad/s]
    /// * `closed_loop_frac` - 0.0 = forced commutation, 1.0 = observer only
    pub fn update_state_estimate(
        &mut self,
        i_ab_a: [f32; 2],
        v_ab_v: [f32; 2],
        speed_setpoint: f32,
        closed_loop_frac: f32,
    ) {
        debug_assert!(self.t > 0.0, "set_params not called");
        debug_assert!(i_ab_a.iter().chain(v_ab_v.iter()).all(|x| x.is_finite()));
        debug_assert!(speed_setpoint.is_finite() && closed_loop_frac.is_finite());

        let prev_angle = self.state_estimate.angle_rad;
        let prev_velocity = self.angular_velocity_rad_per_s;

        // 1. Model prediction in the previous d/q frame; back-EMF only on q
        let (sin_prev, cos_prev) = sin_cos(prev_angle);
        let (last_i_d, last_i_q) =
            park(self.last_i_ab_a[0], self.last_i_ab_a[1], sin_prev, cos_prev);
        let (v_d, v_q) = park(v_ab_v[0], v_ab_v[1], sin_prev, cos_prev);

        let pred_i_d = self.a * last_i_d + self.c * v_d;
        let pred_i_q = self.a * last_i_q + self.c * v_q - self.b * prev_velocity;
        let (pred_i_alpha, pred_i_beta) =
            inverse_park_sin_cos(pred_i_d, pred_i_q, sin_prev, cos_prev);

        let predicted_angle = wrap_angle(prev_angle + prev_velocity * self.t);

        // 2. Innovation, expressed in the predicted frame.
        // r_d ≈ b·ω·(angle error), r_q ≈ -b·(velocity error)
        let (sin_pred, cos_pred) = sin_cos(predicted_angle);
        let (residual_d, residual_q) = park(
            i_ab_a[0] - pred_i_alpha,
            i_ab_a[1] - pred_i_beta,
            sin_pred,
            cos_pred,
        );

        // 3. Covariance propagate + update, then correct angle and velocity
        self.state_covariance.predict(
            self.t,
            self.tuning.angle_process_noise,
            self.tuning.velocity_process_noise,
        );
        let gain = self.state_covariance.update(
            self.b * prev_velocity,
            -self.b,
            self.tuning.current_measurement_noise,
        );
        let (d_angle, d_velocity) = gain.apply(residual_d, residual_q);

        let corrected = RotorState::new(
            wrap_angle(predicted_angle + d_angle),
            prev_velocity + d_velocity,
        );

        // 4. Fade towards forced commutation at low speed
        let open_loop = RotorState::new(
            wrap_angle(prev_angle + speed_setpoint * self.t),
            speed_setpoint,
        );
        let observer = blend_open_loop(open_loop, corrected, closed_loop_frac);

        // 5. Acceleration from consecutive velocity estimates
        let limit = self.tuning.max_angular_acceleration;
        let acceleration = ((observer.angular_velocity_rad_per_s - prev_velocity) * self.t_inv)
            .clamp(-limit, limit);

        self.angular_velocity_rad_per_s = observer.angular_velocity_rad_per_s;

        // 6. Output filtering; the reported velocity uses the same blend
        let filtered_velocity = filter(
            &mut self.filtered_velocity_rad_per_s,
            corrected.angular_velocity_rad_per_s,
            self.angular_velocity_lpf_coeff,
        );
        let reported = blend_open_loop(
            open_loop,
            RotorState::new(corrected.angle_rad, filtered_velocity),
            closed_loop_frac,
        );

        let (sin_theta, cos_theta) = sin_cos(observer.angle_rad);
        let (i_d, i_q) = park(i_ab_a[0], i_ab_a[1], sin_theta, cos_theta);
        filter(&mut self.state_estimate.i_dq_a[0], i_d, self.i_dq_lpf_coeff);
        filter(&mut self.state_estimate.i_dq_a[1], i_q, self.i_dq_lpf_coeff);

        self.state_estimate.angle_rad = observer.angle_rad;
        self.state_estimate.angular_velocity_rad_per_s = reported.angular_velocity_rad_per_s;
        self.state_estimate.angular_acceleration_rad_per_s2 = acceleration;

        // 7. Voltage computed now is applied one tick later
        let next_angle =
            wrap_angle(observer.angle_rad + observer.angular_velocity_rad_per_s * self.t);
        let (next_sin, next_cos) = sin_cos(next_angle);
        self.next_sin_theta = next_sin;
        self.next_cos_theta = next_cos;

        // 8. Model input for the next prediction
        self.last_i_ab_a = i_ab_a;
    }

    /// Latest estimate
    pub fn get_state_estimate(&self) -> MotorState {
        self.state_estimate
    }

    /// Convert a d/q voltage command to the stationary frame at the angle the
    /// rotor will have when the command is applied
    pub fn get_est_v_alpha_beta_from_v_dq(&self, v_dq: [f32; 2]) -> [f32; 2] {
        let (alpha, beta) =
            inverse_park_sin_cos(v_dq[0], v_dq[1], self.next_sin_theta, self.next_cos_theta);
        [alpha, beta]
    }

    /// Current angle/velocity covariance
    pub fn get_covariance(&self) -> Covariance2 {
        self.state_covariance
    }

    /// Sample period set by the last `set_params` call [s]
    pub fn sample_period(&self) -> f32 {
        self.t
    }
}

impl Default for StateEstimator {
    fn default() -> Self {
        Self::new(ObserverTuning::default())
    }
}
