//! Noop メール送信実装
//!
//! メールを実際に送信せず、ログ出力のみ行う。
//! ローカル開発や通知無効化時に使用する。

use async_trait::async_trait;
use tsunami_notify_domain::notification::{EmailMessage, NotificationError};

use super::{MailConnection, MailTransport};

/// Noop メール送信（ログ出力のみ）
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopMailTransport;

#[async_trait]
impl MailTransport for NoopMailTransport {
    async fn connect(&self) -> Result<Box<dyn MailConnection>, NotificationError> {
        Ok(Box::new(NoopMailConnection))
    }
}

struct NoopMailConnection;

#[async_trait]
impl MailConnection for NoopMailConnection {
    async fn send_email(&self, email: &EmailMessage) -> Result<(), NotificationError> {
        tracing::info!(
            from = %email.from,
            to = %email.to,
            subject = %email.subject,
            has_html = email.html_body.is_some(),
            "Noop: メール送信をスキップ"
        );
        Ok(())
    }
}
