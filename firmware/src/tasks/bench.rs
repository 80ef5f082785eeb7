//! ベンチタスク
//!
//! 模擬モーターを相手に R/L 同定 → オープンループ始動 → 推定器への移行を実行します。
//! 電流センサ・PWMの代わりにプラントモデルを使用するため、実時間ではなく
//! 計算可能な最大速度で進み、スライスごとに他タスクへ譲ります。

use embassy_futures::yield_now;

use crate::benchmark::cycles;
use crate::config::bench::*;
use crate::config::*;
use crate::state::{BenchPhase, BENCH_STATUS, IDENTIFIED_IMPEDANCE};
use g4_observer::{ChannelEvent, MotorChannel, MotorPlant};

/// フェーズ内の経過ティックからクローズドループ比率を計算
fn closed_loop_frac(phase: BenchPhase, phase_ticks: u32) -> f32 {
    match phase {
        BenchPhase::Identification | BenchPhase::OpenLoop => 0.0,
        BenchPhase::Handover => (phase_ticks as f32 / HANDOVER_TICKS as f32).min(1.0),
        BenchPhase::ClosedLoop => 1.0,
    }
}

/// q軸電流を保持するためのフィードフォワード電圧 [V]
fn feedforward_v_dq(params: &MotorParams, omega: f32) -> [f32; 2] {
    [
        -omega * params.ls_h * I_Q_TARGET_A,
        params.rs_r * I_Q_TARGET_A + params.phi_v_s_per_rad * omega,
    ]
}

/// ベンチタスク
#[embassy_executor::task]
pub async fn bench_task() {
    info!("Bench task started (simulated motor)");

    let t_s = DEFAULT_SAMPLE_PERIOD_S;

    // 模擬モーターの真値
    let plant_params = MotorParams::default();

    // 推定器はデータシートからずれた値で開始し、同定で補正する
    let initial_params = MotorParams {
        rs_r: plant_params.rs_r * 1.5,
        ls_h: plant_params.ls_h * 0.7,
        ..plant_params
    };
    let mut channel = MotorChannel::new(
        initial_params,
        ControlParams::default(),
        ObserverTuning::default(),
        IdentificationSchedule::default(),
        t_s,
    );

    info!(
        "  Plant: R={} L={} phi={}",
        plant_params.rs_r,
        plant_params.ls_h,
        plant_params.phi_v_s_per_rad
    );
    info!(
        "  Initial guess: R={} L={}",
        initial_params.rs_r,
        initial_params.ls_h
    );

    // 同定中は回転子固定
    let mut plant = MotorPlant::new(plant_params, 0.0);
    let mut phase = BenchPhase::Identification;
    let mut phase_ticks: u32 = 0;
    let mut ticks: u32 = 0;
    let mut max_tick_cycles: u32 = 0;
    let mut v_ab = [0.0, 0.0];

    channel.start_identification();

    loop {
        for _ in 0..TICKS_PER_SLICE {
            let start = cycles();

            let i_ab = plant.step(v_ab, t_s);
            let frac = closed_loop_frac(phase, phase_ticks);
            let speed_setpoint = match phase {
                BenchPhase::Identification => 0.0,
                _ => PLANT_SPEED_RAD_PER_S,
            };

            let event = channel.update(i_ab, v_ab, speed_setpoint, frac);

            let omega = channel
                .state_estimate()
                .map(|s| s.angular_velocity_rad_per_s)
                .unwrap_or(0.0);
            let v_dq = feedforward_v_dq(&channel.motor_params(), omega);
            v_ab = channel.voltage_command(v_dq);

            max_tick_cycles = max_tick_cycles.max(cycles().wrapping_sub(start));
            ticks = ticks.wrapping_add(1);
            phase_ticks += 1;

            // フェーズ遷移
            match (phase, event) {
                (BenchPhase::Identification, ChannelEvent::IdentificationComplete(result)) => {
                    if let Ok(imp) = result {
                        *IDENTIFIED_IMPEDANCE.lock().await = Some(imp);
                    }
                    info!("Identification finished after {} ticks", phase_ticks);
                    info!("Starting open-loop at {} rad/s", PLANT_SPEED_RAD_PER_S);

                    plant = MotorPlant::new(plant_params, PLANT_SPEED_RAD_PER_S)
                        .with_angle(PLANT_INITIAL_ANGLE_RAD);
                    v_ab = [0.0, 0.0];
                    phase = BenchPhase::OpenLoop;
                    phase_ticks = 0;
                }
                (BenchPhase::OpenLoop, _) if phase_ticks >= OPEN_LOOP_TICKS => {
                    info!("Handing over to observer");
                    phase = BenchPhase::Handover;
                    phase_ticks = 0;
                }
                (BenchPhase::Handover, _) if phase_ticks >= HANDOVER_TICKS => {
                    info!("Closed loop");
                    phase = BenchPhase::ClosedLoop;
                    phase_ticks = 0;
                }
                _ => {}
            }
        }

        // ステータス更新
        {
            let mut status = BENCH_STATUS.lock().await;
            status.phase = phase;
            status.estimate = channel.state_estimate();
            status.true_angle_rad = plant.angle();
            status.closed_loop_frac = closed_loop_frac(phase, phase_ticks);
            status.max_tick_cycles = max_tick_cycles;
            status.ticks = ticks;
        }

        yield_now().await;
    }
}
