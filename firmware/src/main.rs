#![no_std]
#![no_main]

// This mod MUST go first, so that the others see its macros.
mod fmt;

mod benchmark;
mod config;
mod hardware;
mod state;
mod tasks;

#[cfg(not(feature = "defmt"))]
use panic_halt as _;
#[cfg(feature = "defmt")]
use {defmt_rtt as _, panic_probe as _};

use embassy_executor::Spawner;
use embassy_time::{Duration, Timer};

use tasks::{bench_task, telemetry_task};

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    // ハードウェア初期化
    let config = hardware::create_clock_config();
    let _p = embassy_stm32::init(config);

    info!("═══════════════════════════════════════════════════════════════════");
    info!("");
    info!("        G4 Observer Bench • STM32G431VB @ 170MHz");
    info!("        Sensorless angle/velocity observer + R/L identification");
    info!("");
    info!("═══════════════════════════════════════════════════════════════════");

    // ベンチマーク実行
    unsafe {
        benchmark::enable_cycle_counter();
    }
    benchmark::run_sin_cos_benchmark(1000);
    benchmark::run_observer_benchmark(1000);

    info!("Starting observer bench...");

    spawner.spawn(telemetry_task()).unwrap();
    spawner.spawn(bench_task()).unwrap();

    // メインループ（将来の拡張用）
    loop {
        Timer::after(Duration::from_millis(100)).await;
    }
}
