//! ベンチマークモジュール
//!
//! 推定器の処理時間をDWTサイクルカウンタで測定します。

use core::sync::atomic::{compiler_fence, Ordering};
use cortex_m::peripheral::DWT;

use crate::config::{ControlParams, MotorParams, DEFAULT_SAMPLE_PERIOD_S};
use g4_observer::foc::transforms::{sin_cos_idsp, sin_cos_libm};
use g4_observer::StateEstimator;

/// DWTサイクルカウンタを有効化
///
/// # Safety
/// Cortex-Mペリフェラルへの直接アクセスを含む
pub unsafe fn enable_cycle_counter() {
    let mut cp = cortex_m::Peripherals::steal();
    cp.DCB.enable_trace();
    cp.DWT.enable_cycle_counter();
}

/// 現在のサイクルカウント
#[inline]
pub fn cycles() -> u32 {
    DWT::cycle_count()
}

/// sin/cos（idsp と libm）のベンチマークを実行して結果を表示
///
/// # 引数
/// * `iterations` - ベンチマーク実行回数
pub fn run_sin_cos_benchmark(iterations: u32) {
    info!("Running sin_cos() benchmark...");

    let theta = 1.57; // ~90度

    let start_idsp = cycles();
    let mut result_idsp = (0.0, 0.0);
    for _ in 0..iterations {
        result_idsp = sin_cos_idsp(theta);
        // 最適化による削除を防ぐ
        compiler_fence(Ordering::SeqCst);
    }
    let ticks_idsp = cycles().wrapping_sub(start_idsp);

    let start_libm = cycles();
    let mut result_libm = (0.0, 0.0);
    for _ in 0..iterations {
        result_libm = sin_cos_libm(theta);
        compiler_fence(Ordering::SeqCst);
    }
    let ticks_libm = cycles().wrapping_sub(start_libm);

    let cycles_per_call_idsp = (ticks_idsp / iterations).max(1);
    let cycles_per_call_libm = ticks_libm / iterations;
    let speedup_x10 = (cycles_per_call_libm * 10) / cycles_per_call_idsp; // 10倍してdefmtで表示

    info!("Benchmark results ({} iterations):", iterations);
    info!("  idsp::cossin():  {} cycles/call", cycles_per_call_idsp);
    info!("  libm::sinf/cosf: {} cycles/call", cycles_per_call_libm);
    info!(
        "  Speedup: {}.{}x faster with idsp",
        speedup_x10 / 10,
        speedup_x10 % 10
    );
    info!(
        "  Error: sin={}, cos={}",
        result_idsp.0 - result_libm.0,
        result_idsp.1 - result_libm.1
    );
}

/// update_state_estimate() 1回あたりのサイクル数を測定
///
/// # 引数
/// * `iterations` - ベンチマーク実行回数
pub fn run_observer_benchmark(iterations: u32) {
    info!("Running update_state_estimate() benchmark...");

    let mut estimator = StateEstimator::default();
    estimator.set_params(
        &MotorParams::default(),
        &ControlParams::default(),
        DEFAULT_SAMPLE_PERIOD_S,
    );
    estimator.reset_state();

    let start = cycles();
    for k in 0..iterations {
        let phase = k as f32 * 0.05;
        estimator.update_state_estimate([phase, -phase], [1.0, 0.5], 1000.0, 1.0);
        compiler_fence(Ordering::SeqCst);
    }
    let total = cycles().wrapping_sub(start);

    // 170MHz、制御周期 50μs = 8500 サイクル
    let period_cycles = (170_000_000.0 * DEFAULT_SAMPLE_PERIOD_S) as u32;
    info!(
        "  {} cycles/update ({}% of {} cycle period)",
        total / iterations,
        (total / iterations) * 100 / period_cycles,
        period_cycles
    );
}
