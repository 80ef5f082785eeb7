//! 推定器の設定パラメータ（デフォルト値）

use core::f32::consts::TAU;

/// 制御周期 [μs]（20kHz = 50μs）（デフォルト値）
pub const DEFAULT_CONTROL_PERIOD_US: u64 = 50;

/// 制御周期 [s]
pub const DEFAULT_SAMPLE_PERIOD_S: f32 = DEFAULT_CONTROL_PERIOD_US as f32 / 1_000_000.0;

/// 相抵抗 [Ω]（デフォルト値）
pub const DEFAULT_RS_R: f32 = 0.12;

/// 相インダクタンス [H]（デフォルト値）
pub const DEFAULT_LS_H: f32 = 120.0e-6;

/// 鎖交磁束 [V·s/rad]（デフォルト値）
pub const DEFAULT_PHI_V_S_PER_RAD: f32 = 0.0045;

/// 速度制御帯域 [Hz]（デフォルト値）
pub const DEFAULT_BANDWIDTH_HZ: f32 = 100.0;

/// Physical constants of the motor, as identified or taken from a datasheet.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MotorParams {
    /// Stator resistance [Ω]
    pub rs_r: f32,
    /// Stator inductance [H]
    pub ls_h: f32,
    /// Rotor flux linkage [V·s/rad]
    pub phi_v_s_per_rad: f32,
}

impl Default for MotorParams {
    fn default() -> Self {
        Self {
            rs_r: DEFAULT_RS_R,
            ls_h: DEFAULT_LS_H,
            phi_v_s_per_rad: DEFAULT_PHI_V_S_PER_RAD,
        }
    }
}

/// Control-loop tuning the observer filters are derived from.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ControlParams {
    /// Desired closed-loop bandwidth [Hz]
    pub bandwidth_hz: f32,
}

impl Default for ControlParams {
    fn default() -> Self {
        Self {
            bandwidth_hz: DEFAULT_BANDWIDTH_HZ,
        }
    }
}

/// Noise model and limits of the angle/velocity observer.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ObserverTuning {
    /// Angle process noise per tick [rad²]
    pub angle_process_noise: f32,
    /// Velocity process noise per tick [(rad/s)²]
    pub velocity_process_noise: f32,
    /// Current measurement noise [A²]
    pub current_measurement_noise: f32,
    /// Limit applied to the reported angular acceleration [rad/s²]
    pub max_angular_acceleration: f32,
    /// Covariance diagonal after a reset
    pub initial_covariance_diag: f32,
    /// Covariance off-diagonal after a reset
    pub initial_covariance_off_diag: f32,
}

impl Default for ObserverTuning {
    fn default() -> Self {
        Self {
            angle_process_noise: 1.0e-6,
            velocity_process_noise: 1.0,
            current_measurement_noise: 1.0e-2,
            max_angular_acceleration: 5.0e4,
            initial_covariance_diag: 100.0,
            initial_covariance_off_diag: 10.0,
        }
    }
}

/// One operating point of the open-loop identification sequence.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ExcitationStage {
    /// Excitation voltage magnitude [V]
    pub voltage_v: f32,
    /// Electrical frequency of the rotating voltage vector [Hz]
    pub frequency_hz: f32,
    /// Ticks to wait for steady state before sampling
    pub settle_samples: u16,
}

impl ExcitationStage {
    pub const fn new(voltage_v: f32, frequency_hz: f32, settle_samples: u16) -> Self {
        Self {
            voltage_v,
            frequency_hz,
            settle_samples,
        }
    }

    /// 電気角速度 [rad/s]
    #[inline]
    pub fn omega_rad_per_s(&self) -> f32 {
        TAU * self.frequency_hz
    }
}

/// Number of operating points captured by the identification sequence.
pub const IDENTIFICATION_STAGES: usize = 4;

/// Excitation schedule of the identification sequence.
///
/// The least-squares reduction needs at least two distinct frequencies; the
/// default uses two frequencies at two amplitudes each.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct IdentificationSchedule {
    pub stages: [ExcitationStage; IDENTIFICATION_STAGES],
}

impl IdentificationSchedule {
    /// 各ステージの電気角速度 [rad/s]
    pub fn omegas(&self) -> [f32; IDENTIFICATION_STAGES] {
        let mut out = [0.0; IDENTIFICATION_STAGES];
        for (o, stage) in out.iter_mut().zip(self.stages.iter()) {
            *o = stage.omega_rad_per_s();
        }
        out
    }
}

impl Default for IdentificationSchedule {
    fn default() -> Self {
        // 100ms @ 20kHz で定常状態に達するまで待機
        const SETTLE: u16 = 2000;
        Self {
            stages: [
                ExcitationStage::new(1.0, 200.0, SETTLE),
                ExcitationStage::new(2.0, 200.0, SETTLE),
                ExcitationStage::new(2.0, 1000.0, SETTLE),
                ExcitationStage::new(4.0, 1000.0, SETTLE),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_sample_period() {
        assert!((DEFAULT_SAMPLE_PERIOD_S - 50.0e-6).abs() < 1e-9);
    }

    #[test]
    fn test_default_schedule_has_two_frequencies() {
        let omegas = IdentificationSchedule::default().omegas();
        assert_eq!(omegas[0], omegas[1]);
        assert_eq!(omegas[2], omegas[3]);
        assert!(omegas[2] > omegas[0]);
        assert!((omegas[0] - TAU * 200.0).abs() < 1e-3);
    }
}
