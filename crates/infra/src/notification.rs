//! # メール送信
//!
//! 通知メールの送信を担当するインフラストラクチャモジュール。
//!
//! ## 設計方針
//!
//! - **トランスポートと接続の分離**: [`MailTransport`] はバッチごとに [`MailConnection`] を開く。
//!   1 バッチ内の全通知は同じ接続で送信し、バッチ終了時（drop 時）に解放する
//! - **3 つの実装**: SMTP（lettre）、SES（AWS SES v2）、Noop（ログ出力のみ）
//! - **環境変数切替**: `MAIL_BACKEND` でランタイム選択
//!
//! ## 使用例
//!
//! ```rust,ignore
//! let transport = SmtpMailTransport::new("localhost", 1025, None);
//! let connection = transport.connect().await?;
//! for email in emails {
//!     connection.send_email(&email).await?;
//! }
//! // connection の drop で接続を解放
//! ```

mod noop;
mod ses;
mod smtp;

use async_trait::async_trait;
pub use noop::NoopMailTransport;
pub use ses::SesMailTransport;
pub use smtp::SmtpMailTransport;
use tsunami_notify_domain::notification::{EmailMessage, NotificationError};

/// メール送信トランスポート
///
/// 送信先サーバーの設定を保持し、バッチ単位の接続を開く。
#[async_trait]
pub trait MailTransport: Send + Sync {
    /// 送信用の接続を開く
    ///
    /// 接続できない場合は `NotificationError::ConnectionFailed` を返す。
    async fn connect(&self) -> Result<Box<dyn MailConnection>, NotificationError>;
}

/// バッチ単位のメール送信接続
///
/// 複数のメールを同じ接続で送信できる。drop で解放される。
#[async_trait]
pub trait MailConnection: Send + Sync {
    /// メールを送信する
    async fn send_email(&self, email: &EmailMessage) -> Result<(), NotificationError>;
}
