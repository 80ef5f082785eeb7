//! 巻線抵抗・インダクタンス同定モジュール
//!
//! 回転子を回さずに、既知の振幅・周波数の回転電圧ベクトルを印加し、
//! 定常状態での電流振幅を記録する。複数の動作点から
//! |Z|² = R² + L²ω² を最小二乗で当てはめて R と L を求める。

use super::transforms::{inverse_park, magnitude_sq, wrap_angle};
use crate::config::{IdentificationSchedule, IDENTIFICATION_STAGES};
use libm::sqrtf;

/// 同定結果
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MotorImpedance {
    /// 相抵抗 [Ω]
    pub rs_r: f32,
    /// 相インダクタンス [H]
    pub ls_h: f32,
}

/// 同定計算のエラー型
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum IdentificationError {
    /// 励磁周波数が1種類しかなく、R と L を分離できない
    IllConditioned,

    /// 電流が検出されなかった（配線・ドライバ異常）
    NoCurrent,

    /// 当てはめ結果の R² または L² が負
    NonPhysical,
}

/// R/L 同定シーケンス
#[derive(Debug, Clone)]
pub struct ParameterEstimator {
    /// 励磁スケジュール
    schedule: IdentificationSchedule,
    /// 各ステージの |V|² [V²]
    sample_voltages: [f32; IDENTIFICATION_STAGES],
    /// 各ステージの |I|² [A²]
    sample_currents: [f32; IDENTIFICATION_STAGES],
    /// 現在の励磁電気角速度 [rad/s]
    open_loop_angular_velocity_rad_per_s: f32,
    /// 励磁電圧ベクトルの角度 [rad]
    open_loop_angle_rad: f32,
    /// 現在の励磁電圧 [V]
    v: f32,
    /// 制御周期 [s]
    t: f32,
    /// 現在のステージ番号（IDENTIFICATION_STAGES で完了）
    test_idx: u16,
    /// サンプリングまでの残りティック数
    open_loop_test_samples: u16,
}

impl ParameterEstimator {
    /// 新しい同定シーケンスを作成（完了状態で待機）
    pub fn new(schedule: IdentificationSchedule) -> Self {
        Self {
            schedule,
            sample_voltages: [0.0; IDENTIFICATION_STAGES],
            sample_currents: [0.0; IDENTIFICATION_STAGES],
            open_loop_angular_velocity_rad_per_s: 0.0,
            open_loop_angle_rad: 0.0,
            v: 0.0,
            t: 0.0,
            test_idx: IDENTIFICATION_STAGES as u16,
            open_loop_test_samples: 0,
        }
    }

    /// 同定を開始（途中でも最初からやり直す）
    ///
    /// # 引数
    /// * `t` - 制御周期 [s]
    pub fn start_estimation(&mut self, t: f32) {
        assert!(t > 0.0, "sample period must be positive");

        info!("Starting R/L identification...");
        info!("  Stages: {}", IDENTIFICATION_STAGES);

        self.t = t;
        self.sample_voltages = [0.0; IDENTIFICATION_STAGES];
        self.sample_currents = [0.0; IDENTIFICATION_STAGES];
        self.open_loop_angle_rad = 0.0;
        self.test_idx = 0;
        self.load_stage(0);
    }

    fn load_stage(&mut self, idx: usize) {
        let stage = self.schedule.stages[idx];
        self.v = stage.voltage_v;
        self.open_loop_angular_velocity_rad_per_s = stage.omega_rad_per_s();
        // 最低1ティックは待つ
        self.open_loop_test_samples = stage.settle_samples.max(1);

        debug!(
            "Identification stage {}: {} V @ {} Hz",
            idx,
            stage.voltage_v,
            stage.frequency_hz
        );
    }

    /// 1ティック分シーケンスを進める
    ///
    /// # 引数
    /// * `i_ab` - 測定電流（αβ座標系）[A]
    /// * `v_ab` - 前回印加した電圧（αβ座標系）[V]
    ///
    /// 完了後の呼び出しは何もしない。
    pub fn update_parameter_estimate(&mut self, i_ab: [f32; 2], v_ab: [f32; 2]) {
        if self.is_estimation_complete() {
            return;
        }

        self.open_loop_angle_rad = wrap_angle(
            self.open_loop_angle_rad + self.open_loop_angular_velocity_rad_per_s * self.t,
        );

        self.open_loop_test_samples = self.open_loop_test_samples.saturating_sub(1);
        if self.open_loop_test_samples > 0 {
            return;
        }

        // 定常状態に達したのでサンプルを記録
        let idx = self.test_idx as usize;
        self.sample_voltages[idx] = magnitude_sq(v_ab);
        self.sample_currents[idx] = magnitude_sq(i_ab);
        debug!(
            "  Sample {}: |V|²={} |I|²={}",
            idx,
            self.sample_voltages[idx],
            self.sample_currents[idx]
        );

        self.test_idx += 1;
        if self.is_estimation_complete() {
            info!("R/L identification samples complete");
        } else {
            self.load_stage(self.test_idx as usize);
        }
    }

    /// 次に印加する励磁電圧（αβ座標系）[V]
    ///
    /// 完了後はゼロベクトルを返す。
    pub fn get_v_alpha_beta_v(&self) -> [f32; 2] {
        if self.is_estimation_complete() {
            return [0.0, 0.0];
        }
        let (alpha, beta) = inverse_park(self.v, 0.0, self.open_loop_angle_rad);
        [alpha, beta]
    }

    /// 全ステージのサンプリングが完了したか
    pub fn is_estimation_complete(&self) -> bool {
        self.test_idx as usize >= IDENTIFICATION_STAGES
    }

    /// 現在のステージ番号
    #[inline]
    pub fn get_stage(&self) -> u16 {
        self.test_idx
    }

    /// 記録したサンプル (|V|², |I|²)
    pub fn get_samples(&self) -> ([f32; IDENTIFICATION_STAGES], [f32; IDENTIFICATION_STAGES]) {
        (self.sample_voltages, self.sample_currents)
    }

    /// 各ステージの励磁電気角速度 [rad/s]
    pub fn excitation_omegas(&self) -> [f32; IDENTIFICATION_STAGES] {
        self.schedule.omegas()
    }

    /// 記録済みサンプルから R と L を計算
    pub fn calculate_r_l(&self) -> Result<MotorImpedance, IdentificationError> {
        let result = Self::calculate_r_l_from_samples(
            &self.sample_voltages,
            &self.sample_currents,
            &self.excitation_omegas(),
        );

        match &result {
            Ok(imp) => info!("Identified R={} L={}", imp.rs_r, imp.ls_h),
            Err(e) => warn!("R/L identification failed: {:?}", e),
        }
        result
    }

    /// |V|²/|I|² = R² + L²ω² を最小二乗で当てはめる
    ///
    /// # Arguments
    /// * `v_sq` - 電圧振幅の二乗 [V²]
    /// * `i_sq` - 電流振幅の二乗 [A²]
    /// * `omega` - 励磁電気角速度 [rad/s]
    ///
    /// # Returns
    /// * `Ok(MotorImpedance)` - 当てはめ成功
    /// * `Err(IdentificationError)` - 周波数が1種類、電流ゼロ、または非物理的な結果
    pub fn calculate_r_l_from_samples(
        v_sq: &[f32; IDENTIFICATION_STAGES],
        i_sq: &[f32; IDENTIFICATION_STAGES],
        omega: &[f32; IDENTIFICATION_STAGES],
    ) -> Result<MotorImpedance, IdentificationError> {
        // NaN も弾く
        if i_sq.iter().any(|&i| !(i > 0.0)) {
            return Err(IdentificationError::NoCurrent);
        }

        let n = IDENTIFICATION_STAGES as f32;
        let mut x = [0.0f32; IDENTIFICATION_STAGES];
        let mut y = [0.0f32; IDENTIFICATION_STAGES];
        for k in 0..IDENTIFICATION_STAGES {
            x[k] = omega[k] * omega[k];
            y[k] = v_sq[k] / i_sq[k];
        }

        let x_mean = x.iter().sum::<f32>() / n;
        let y_mean = y.iter().sum::<f32>() / n;

        let mut sxx = 0.0;
        let mut sxy = 0.0;
        let mut x_sq_sum = 0.0;
        for (&xk, &yk) in x.iter().zip(y.iter()) {
            let dx = xk - x_mean;
            sxx += dx * dx;
            sxy += dx * (yk - y_mean);
            x_sq_sum += xk * xk;
        }

        // ω² の分散が無ければ R と L は分離できない
        if !(sxx > 1.0e-6 * x_sq_sum) {
            return Err(IdentificationError::IllConditioned);
        }

        let l_sq = sxy / sxx;
        let r_sq = y_mean - l_sq * x_mean;
        if l_sq < 0.0 || r_sq < 0.0 {
            return Err(IdentificationError::NonPhysical);
        }

        Ok(MotorImpedance {
            rs_r: sqrtf(r_sq),
            ls_h: sqrtf(l_sq),
        })
    }
}

impl Default for ParameterEstimator {
    fn default() -> Self {
        Self::new(IdentificationSchedule::default())
    }
}
