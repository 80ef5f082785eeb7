//! Configuration module
//!
//! 推定器の物理パラメータ、チューニング値、同定スケジュールを提供します。

pub mod params;

// params.rsから主要な型と定数を再エクスポート
pub use params::*;
