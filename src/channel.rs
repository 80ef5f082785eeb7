//! モーターチャンネル
//!
//! 1軸分の推定器をまとめ、通常の状態推定と R/L 同定シーケンスを切り替える。
//! 同定が完了すると結果をモーターパラメータに反映し、状態推定器を再設定する。

use crate::config::{ControlParams, IdentificationSchedule, MotorParams, ObserverTuning};
use crate::foc::{
    IdentificationError, MotorImpedance, MotorState, ParameterEstimator, StateEstimator,
};

/// チャンネルの動作モード
#[derive(Debug, Clone)]
pub enum ChannelMode {
    /// 状態推定中
    Observing,
    /// R/L 同定中（回転子は停止している前提）
    Identifying(ParameterEstimator),
}

/// `update` の結果として通知するイベント
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ChannelEvent {
    None,
    /// 同定シーケンスが終了した（成功時はパラメータ反映済み）
    IdentificationComplete(Result<MotorImpedance, IdentificationError>),
}

/// 1軸分の推定器
#[derive(Debug, Clone)]
pub struct MotorChannel {
    state_estimator: StateEstimator,
    mode: ChannelMode,
    motor_params: MotorParams,
    control_params: ControlParams,
    schedule: IdentificationSchedule,
    /// 制御周期 [s]
    t_s: f32,
}

impl MotorChannel {
    /// 新しいチャンネルを作成（状態推定モードで開始）
    ///
    /// # 引数
    /// * `motor_params` - 初期モーターパラメータ
    /// * `control_params` - 制御帯域
    /// * `tuning` - 推定器のノイズモデル
    /// * `schedule` - 同定シーケンスの励磁スケジュール
    /// * `t_s` - 制御周期 [s]
    pub fn new(
        motor_params: MotorParams,
        control_params: ControlParams,
        tuning: ObserverTuning,
        schedule: IdentificationSchedule,
        t_s: f32,
    ) -> Self {
        let mut state_estimator = StateEstimator::new(tuning);
        state_estimator.set_params(&motor_params, &control_params, t_s);
        state_estimator.reset_state();

        Self {
            state_estimator,
            mode: ChannelMode::Observing,
            motor_params,
            control_params,
            schedule,
            t_s,
        }
    }

    /// パラメータを更新（推定値は保持）
    pub fn set_params(&mut self, motor_params: MotorParams, control_params: ControlParams) {
        self.motor_params = motor_params;
        self.control_params = control_params;
        self.state_estimator
            .set_params(&self.motor_params, &self.control_params, self.t_s);
    }

    /// 状態推定をリセット
    pub fn reset(&mut self) {
        self.state_estimator.reset_state();
    }

    /// R/L 同定を開始（実行中なら最初からやり直す）
    pub fn start_identification(&mut self) {
        let mut estimator = ParameterEstimator::new(self.schedule);
        estimator.start_estimation(self.t_s);
        self.mode = ChannelMode::Identifying(estimator);
    }

    /// 1制御周期分の更新
    ///
    /// # 引数
    /// * `i_ab_a` - 測定電流（αβ座標系）[A]
    /// * `v_ab_v` - 前回印加した電圧（αβ座標系）[V]
    /// * `speed_setpoint` - オープンループ速度指令 [rad/s]
    /// * `closed_loop_frac` - クローズドループ比率（0.0～1.0）
    pub fn update(
        &mut self,
        i_ab_a: [f32; 2],
        v_ab_v: [f32; 2],
        speed_setpoint: f32,
        closed_loop_frac: f32,
    ) -> ChannelEvent {
        let result = match &mut self.mode {
            ChannelMode::Observing => {
                self.state_estimator.update_state_estimate(
                    i_ab_a,
                    v_ab_v,
                    speed_setpoint,
                    closed_loop_frac,
                );
                return ChannelEvent::None;
            }
            ChannelMode::Identifying(estimator) => {
                estimator.update_parameter_estimate(i_ab_a, v_ab_v);
                if !estimator.is_estimation_complete() {
                    return ChannelEvent::None;
                }
                estimator.calculate_r_l()
            }
        };

        self.finish_identification(result)
    }

    fn finish_identification(
        &mut self,
        result: Result<MotorImpedance, IdentificationError>,
    ) -> ChannelEvent {
        match result {
            Ok(imp) => {
                info!("Applying identified R={} L={}", imp.rs_r, imp.ls_h);
                self.motor_params.rs_r = imp.rs_r;
                self.motor_params.ls_h = imp.ls_h;
                self.state_estimator
                    .set_params(&self.motor_params, &self.control_params, self.t_s);
            }
            Err(e) => {
                error!("Identification failed, keeping previous parameters: {:?}", e);
            }
        }

        self.state_estimator.reset_state();
        self.mode = ChannelMode::Observing;
        ChannelEvent::IdentificationComplete(result)
    }

    /// 次周期に印加する電圧（αβ座標系）[V]
    ///
    /// 同定中は `v_dq` を無視して励磁電圧を返す。
    pub fn voltage_command(&self, v_dq: [f32; 2]) -> [f32; 2] {
        match &self.mode {
            ChannelMode::Observing => self.state_estimator.get_est_v_alpha_beta_from_v_dq(v_dq),
            ChannelMode::Identifying(estimator) => estimator.get_v_alpha_beta_v(),
        }
    }

    /// 推定状態（同定中は None）
    pub fn state_estimate(&self) -> Option<MotorState> {
        match self.mode {
            ChannelMode::Observing => Some(self.state_estimator.get_state_estimate()),
            ChannelMode::Identifying(_) => None,
        }
    }

    pub fn mode(&self) -> &ChannelMode {
        &self.mode
    }

    pub fn is_identifying(&self) -> bool {
        matches!(self.mode, ChannelMode::Identifying(_))
    }

    pub fn motor_params(&self) -> MotorParams {
        self.motor_params
    }

    pub fn state_estimator(&self) -> &StateEstimator {
        &self.state_estimator
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ExcitationStage, DEFAULT_SAMPLE_PERIOD_S};
    use crate::foc::transforms::magnitude_sq;
    use crate::plant::MotorPlant;

    const T: f32 = DEFAULT_SAMPLE_PERIOD_S;

    fn schedule(low_hz: f32, high_hz: f32) -> IdentificationSchedule {
        IdentificationSchedule {
            stages: [
                ExcitationStage::new(1.0, low_hz, 400),
                ExcitationStage::new(2.0, low_hz, 400),
                ExcitationStage::new(2.0, high_hz, 400),
                ExcitationStage::new(4.0, high_hz, 400),
            ],
        }
    }

    fn channel(schedule: IdentificationSchedule) -> MotorChannel {
        MotorChannel::new(
            MotorParams::default(),
            ControlParams::default(),
            ObserverTuning::default(),
            schedule,
            T,
        )
    }

    /// 回転子固定のプラントで同定を最後まで回す
    fn run_identification(ch: &mut MotorChannel, plant_params: MotorParams) -> ChannelEvent {
        let mut plant = MotorPlant::new(plant_params, 0.0);
        ch.start_identification();
        for _ in 0..100_000 {
            let v_ab = ch.voltage_command([0.0, 0.0]);
            let i_ab = plant.step(v_ab, T);
            match ch.update(i_ab, v_ab, 0.0, 0.0) {
                ChannelEvent::None => {}
                event => return event,
            }
        }
        panic!("identification did not finish");
    }

    #[test]
    fn test_starts_observing() {
        let ch = channel(IdentificationSchedule::default());
        assert!(!ch.is_identifying());
        assert_eq!(ch.state_estimate(), Some(MotorState::new()));
    }

    #[test]
    fn test_identification_hides_state_and_drives_excitation() {
        let mut ch = channel(IdentificationSchedule::default());
        ch.start_identification();
        assert!(ch.is_identifying());
        assert_eq!(ch.state_estimate(), None);

        // d/q 指令は無視され、第1ステージの励磁電圧が出る
        let v_ab = ch.voltage_command([0.0, 10.0]);
        assert!((magnitude_sq(v_ab) - 1.0).abs() < 1e-3);
    }

    #[test]
    fn test_identification_updates_params() {
        let plant_params = MotorParams {
            rs_r: 0.2,
            ls_h: 150.0e-6,
            ..MotorParams::default()
        };
        let mut ch = channel(schedule(200.0, 1000.0));

        let event = run_identification(&mut ch, plant_params);
        let imp = match event {
            ChannelEvent::IdentificationComplete(Ok(imp)) => imp,
            other => panic!("unexpected event {:?}", other),
        };

        assert!(!ch.is_identifying());
        assert_eq!(ch.motor_params().rs_r, imp.rs_r);
        assert_eq!(ch.motor_params().ls_h, imp.ls_h);
        assert_eq!(
            ch.motor_params().phi_v_s_per_rad,
            MotorParams::default().phi_v_s_per_rad
        );
        assert!((imp.rs_r - 0.2).abs() / 0.2 < 0.03, "R={}", imp.rs_r);
        assert!((imp.ls_h - 150.0e-6).abs() / 150.0e-6 < 0.03, "L={}", imp.ls_h);

        // 再設定後の推定器はリセット状態
        assert_eq!(ch.state_estimate(), Some(MotorState::new()));
        let t = ch.state_estimator().sample_period();
        assert_eq!(t, T);
    }

    #[test]
    fn test_failed_identification_keeps_params() {
        let mut ch = channel(schedule(500.0, 500.0));
        let event = run_identification(&mut ch, MotorParams::default());

        assert_eq!(
            event,
            ChannelEvent::IdentificationComplete(Err(IdentificationError::IllConditioned))
        );
        assert!(!ch.is_identifying());
        assert_eq!(ch.motor_params(), MotorParams::default());
    }

    #[test]
    fn test_reset_returns_to_standstill() {
        let mut ch = channel(IdentificationSchedule::default());
        for _ in 0..50 {
            ch.update([1.0, 0.5], [2.0, 0.0], 400.0, 0.0);
        }
        assert_ne!(ch.state_estimate(), Some(MotorState::new()));

        ch.reset();
        assert_eq!(ch.state_estimate(), Some(MotorState::new()));
        assert_eq!(
            ch.state_estimator().get_covariance().as_array(),
            [100.0, 10.0, 10.0, 100.0]
        );
    }

    #[test]
    fn test_restart_identification() {
        let mut ch = channel(IdentificationSchedule::default());
        ch.start_identification();
        for _ in 0..10 {
            let v_ab = ch.voltage_command([0.0, 0.0]);
            ch.update([0.1, 0.0], v_ab, 0.0, 0.0);
        }
        ch.start_identification();
        match ch.mode() {
            ChannelMode::Identifying(pe) => assert_eq!(pe.get_stage(), 0),
            ChannelMode::Observing => panic!("expected identification"),
        }
    }

    #[test]
    fn test_observing_follows_open_loop() {
        let mut ch = channel(IdentificationSchedule::default());
        for _ in 0..100 {
            ch.update([0.0, 0.0], [0.0, 0.0], 400.0, 0.0);
        }
        let state = ch.state_estimate().unwrap();
        assert_eq!(state.angular_velocity_rad_per_s, 400.0);
    }
}
