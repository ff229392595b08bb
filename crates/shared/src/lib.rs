//! # Tsunami Notify 共有ユーティリティ
//!
//! 全クレートから使う横断的なユーティリティを提供する。
//!
//! ## 設計方針
//!
//! - ビジネスロジックを含まない純粋なユーティリティのみを配置
//! - ログ初期化の依存（tracing-subscriber）は `observability` feature の裏に置く

pub mod event_log;
pub mod observability;
