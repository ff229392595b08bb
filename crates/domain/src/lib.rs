//! # Tsunami Notify ドメイン層
//!
//! イベント起点のメール通知に関するドメインモデルを定義する。
//!
//! ## 設計方針
//!
//! - **エンティティ**: 一意の識別子を持つオブジェクト（[`event::Event`], [`notification::Notification`]）
//! - **値オブジェクト**: 検証済みの不変値（[`event::EventType`], [`user::Email`]）
//! - **ドメインエラー**: ビジネスルール違反を表現するエラー型
//!
//! ## 依存関係の方向
//!
//! ```text
//! sender → infra → domain
//!    ↘                ↑
//!      shared ────────┘（依存なし）
//! ```
//!
//! ドメイン層は DB・テンプレートエンジン・メール送信に一切依存しない。
//!
//! ## モジュール構成
//!
//! - [`clock`] - 時刻プロバイダ
//! - [`error`] - ドメイン層エラー
//! - [`event`] - 通知のトリガーとなるイベント
//! - [`notification`] - 通知エンティティ、メールメッセージ、通知エラー
//! - [`user`] - 受信者解決に使うユーザー
//!
//! ## 使用例
//!
//! ```rust
//! use tsunami_notify_domain::event::EventType;
//!
//! let event_type = EventType::new("user.signup").unwrap();
//! assert_eq!(event_type.segments().collect::<Vec<_>>(), vec!["user", "signup"]);
//! ```

#[macro_use]
mod macros;

pub mod clock;
pub mod error;
pub mod event;
pub mod notification;
pub mod user;

pub use error::DomainError;
