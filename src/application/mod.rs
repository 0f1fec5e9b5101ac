//! アプリケーション層
//!
//! マニフェストの解析・検証サービスと、アクションごとのユースケース

pub mod services;
pub mod use_cases;
