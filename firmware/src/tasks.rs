//! タスクモジュール
//!
//! 各タスクの実装を分離して管理します。

pub mod bench;
pub mod telemetry;

// タスク関数を再エクスポート
pub use bench::bench_task;
pub use telemetry::telemetry_task;
