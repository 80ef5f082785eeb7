//! テレメトリタスク
//!
//! ベンチのステータスを定期的にログ出力します。

use embassy_time::{Duration, Ticker};
use libm::fabsf;

use crate::config::TELEMETRY_PERIOD_MS;
use crate::state::{BENCH_STATUS, IDENTIFIED_IMPEDANCE};
use g4_observer::foc::wrap_angle;

/// テレメトリタスク
#[embassy_executor::task]
pub async fn telemetry_task() {
    info!("Telemetry task started");

    let mut ticker = Ticker::every(Duration::from_millis(TELEMETRY_PERIOD_MS));

    loop {
        ticker.next().await;

        let status = *BENCH_STATUS.lock().await;
        let impedance = *IDENTIFIED_IMPEDANCE.lock().await;

        match status.estimate {
            Some(state) => {
                let angle_error = wrap_angle(status.true_angle_rad - state.angle_rad);
                info!(
                    "[{:?}] ticks={} frac={} omega={} rad/s, angle err={} rad, i_dq=({}, {})",
                    status.phase,
                    status.ticks,
                    status.closed_loop_frac,
                    state.angular_velocity_rad_per_s,
                    angle_error,
                    state.i_dq_a[0],
                    state.i_dq_a[1]
                );
                if fabsf(angle_error) > 0.5 && status.closed_loop_frac >= 1.0 {
                    warn!("Observer angle error is large: {} rad", angle_error);
                }
            }
            None => {
                info!("[{:?}] ticks={} (identifying)", status.phase, status.ticks);
            }
        }

        if let Some(imp) = impedance {
            debug!("  Identified R={} L={}", imp.rs_r, imp.ls_h);
        }
        debug!("  Max tick: {} cycles", status.max_tick_cycles);
    }
}
