//! # 通知ユースケース
//!
//! イベントに紐づくメール通知の生成・送信・結果記録を統合する。
//!
//! ## モジュール構成
//!
//! - [`template_renderer`] - tera テンプレートエンジンによるメール生成
//! - [`service`] - テンプレートレンダリング + 送信 + 送信日時の記録を統合するサービス
//! - [`reporter`] - 通知ごとの送信結果の出力先

pub mod reporter;
pub mod service;
pub mod template_renderer;

pub use reporter::{DeliveryReporter, TracingDeliveryReporter};
pub use service::{NotificationService, SendSummary};
pub use template_renderer::TemplateRenderer;
