//! SES メール送信実装
//!
//! AWS SES v2 API を使用してメールを送信する。
//! 本番環境で使用する。

use async_trait::async_trait;
use aws_sdk_sesv2::{
    Client,
    types::{Body, Content, Destination, EmailContent, Message},
};
use tsunami_notify_domain::notification::{EmailMessage, NotificationError};

use super::{MailConnection, MailTransport};

/// SES メール送信トランスポート
///
/// SES は HTTP API のため、接続はクライアントのハンドルを共有するだけ。
#[derive(Debug, Clone)]
pub struct SesMailTransport {
    client: Client,
}

impl SesMailTransport {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// 環境変数（`AWS_REGION` 等）から SES クライアントを構築する
    pub async fn from_env() -> Self {
        let config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        Self::new(Client::new(&config))
    }
}

#[async_trait]
impl MailTransport for SesMailTransport {
    async fn connect(&self) -> Result<Box<dyn MailConnection>, NotificationError> {
        Ok(Box::new(SesMailConnection {
            client: self.client.clone(),
        }))
    }
}

struct SesMailConnection {
    client: Client,
}

fn build_content(data: &str, part: &str) -> Result<Content, NotificationError> {
    Content::builder()
        .data(data)
        .charset("UTF-8")
        .build()
        .map_err(|e| NotificationError::SendFailed(format!("{part}構築失敗: {e}")))
}

#[async_trait]
impl MailConnection for SesMailConnection {
    async fn send_email(&self, email: &EmailMessage) -> Result<(), NotificationError> {
        let destination = Destination::builder().to_addresses(&email.to).build();

        let html = email
            .html_body
            .as_deref()
            .map(|html_body| build_content(html_body, "HTML 本文"))
            .transpose()?;

        let body = Body::builder()
            .text(build_content(&email.text_body, "テキスト本文")?)
            .set_html(html)
            .build();

        let content = EmailContent::builder()
            .simple(
                Message::builder()
                    .subject(build_content(&email.subject, "件名")?)
                    .body(body)
                    .build(),
            )
            .build();

        self.client
            .send_email()
            .from_email_address(&email.from)
            .destination(destination)
            .content(content)
            .send()
            .await
            .map_err(|e| NotificationError::SendFailed(format!("SES 送信失敗: {e}")))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_トレイトはsendとsyncを実装している() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SesMailTransport>();
        assert_send_sync::<SesMailConnection>();
    }

    #[test]
    fn test_本文コンテンツはutf8で構築される() {
        let content = build_content("こんにちは", "テキスト本文").unwrap();

        assert_eq!(content.data(), "こんにちは");
        assert_eq!(content.charset(), Some("UTF-8"));
    }
}
