//! # ユースケース層
//!
//! 送信バッチのビジネスロジックを実装する。
//!
//! ## 設計方針
//!
//! - **依存性注入**: リポジトリ・メール送信を `Arc<dyn Trait>` で外部から注入
//! - **薄いランナー**: ランナーは反復と結果表示のみを担い、送信ロジックはユースケースに集約
//!
//! ## モジュール構成
//!
//! - `notification`: 通知の作成・レンダリング・送信

pub mod notification;

pub use notification::{
    DeliveryReporter,
    NotificationService,
    SendSummary,
    TemplateRenderer,
    TracingDeliveryReporter,
};
