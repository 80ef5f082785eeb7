//! Configuration module
//!
//! ベンチ動作の設定値。推定器のパラメータはライブラリ側のデフォルト値を使用します。

// 推定器の設定を再エクスポート
pub use g4_observer::config::*;

/// ベンチシーケンスのパラメータ
pub mod bench {
    /// 模擬モーターの電気角速度 [rad/s]
    pub const PLANT_SPEED_RAD_PER_S: f32 = 1000.0;

    /// 模擬モーターの初期電気角 [rad]（推定器との初期誤差）
    pub const PLANT_INITIAL_ANGLE_RAD: f32 = 0.4;

    /// q軸電流目標 [A]
    pub const I_Q_TARGET_A: f32 = 1.0;

    /// オープンループ運転時間 [ティック]（100ms）
    pub const OPEN_LOOP_TICKS: u32 = 2000;

    /// クローズドループ比率を 0→1 に上げる時間 [ティック]（50ms）
    pub const HANDOVER_TICKS: u32 = 1000;

    /// 1スライスで処理するティック数（スライスごとに他タスクへ譲る）
    pub const TICKS_PER_SLICE: u32 = 100;
}

/// テレメトリのログ周期 [ms]
pub const TELEMETRY_PERIOD_MS: u64 = 1000;
