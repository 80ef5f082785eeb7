//! グローバル共有状態管理
//!
//! タスク間で共有される状態をMutexで保護して管理します。

use embassy_sync::blocking_mutex::raw::ThreadModeRawMutex;
use embassy_sync::mutex::Mutex;

use g4_observer::{MotorImpedance, MotorState};

/// ベンチシーケンスのフェーズ
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BenchPhase {
    /// R/L 同定中
    Identification,
    /// オープンループ強制転流
    OpenLoop,
    /// オープンループ→推定器への移行中
    Handover,
    /// 推定器のみで運転
    ClosedLoop,
}

/// ベンチのステータス（テレメトリ用）
#[derive(Debug, Clone, Copy)]
pub struct BenchStatus {
    pub phase: BenchPhase,
    /// 最新の推定状態（同定中は None）
    pub estimate: Option<MotorState>,
    /// 模擬モーターの真の電気角 [rad]
    pub true_angle_rad: f32,
    /// クローズドループ比率
    pub closed_loop_frac: f32,
    /// 1ティックの処理サイクル数（最大値）
    pub max_tick_cycles: u32,
    /// 累計ティック数
    pub ticks: u32,
}

impl BenchStatus {
    pub const fn new() -> Self {
        Self {
            phase: BenchPhase::Identification,
            estimate: None,
            true_angle_rad: 0.0,
            closed_loop_frac: 0.0,
            max_tick_cycles: 0,
            ticks: 0,
        }
    }
}

/// ベンチステータス
pub static BENCH_STATUS: Mutex<ThreadModeRawMutex, BenchStatus> = Mutex::new(BenchStatus::new());

/// 同定結果（成功時のみ）
pub static IDENTIFIED_IMPEDANCE: Mutex<ThreadModeRawMutex, Option<MotorImpedance>> =
    Mutex::new(None);
