//! SMTP メール送信実装
//!
//! lettre の `AsyncSmtpTransport` を使用してメールを送信する。
//! 開発環境では Mailpit（ローカル SMTP サーバー）に接続する。

use async_trait::async_trait;
use lettre::{
    AsyncSmtpTransport,
    AsyncTransport,
    Tokio1Executor,
    message::{Mailbox, Message, MultiPart, SinglePart, header::ContentType},
    transport::smtp::{PoolConfig, authentication::Credentials},
};
use tsunami_notify_domain::notification::{EmailMessage, NotificationError};

use super::{MailConnection, MailTransport};

/// SMTP メール送信トランスポート
///
/// 接続先の設定のみ保持し、[`MailTransport::connect`] のたびに新しい接続を開く。
#[derive(Clone)]
pub struct SmtpMailTransport {
    host:        String,
    port:        u16,
    credentials: Option<Credentials>,
}

impl SmtpMailTransport {
    /// 新しい SMTP トランスポートを作成
    ///
    /// # 引数
    ///
    /// - `host`: SMTP サーバーのホスト名（例: "localhost"）
    /// - `port`: SMTP サーバーのポート番号（例: 1025 for Mailpit）
    /// - `credentials`: 認証情報（ユーザー名, パスワード）。`None` なら認証しない
    pub fn new(host: impl Into<String>, port: u16, credentials: Option<(String, String)>) -> Self {
        Self {
            host: host.into(),
            port,
            credentials: credentials
                .map(|(username, password)| Credentials::new(username, password)),
        }
    }

    fn build_transport(&self) -> AsyncSmtpTransport<Tokio1Executor> {
        // builder_dangerous: TLS なしで接続（Mailpit 等のローカル SMTP 向け）
        let builder = AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&self.host)
            .port(self.port)
            .pool_config(PoolConfig::new().max_size(1));

        match &self.credentials {
            Some(credentials) => builder.credentials(credentials.clone()).build(),
            None => builder.build(),
        }
    }
}

#[async_trait]
impl MailTransport for SmtpMailTransport {
    async fn connect(&self) -> Result<Box<dyn MailConnection>, NotificationError> {
        let transport = self.build_transport();

        // 最初の送信前に到達可能性を確認し、接続失敗を送信失敗と区別する
        match transport.test_connection().await {
            Ok(true) => {}
            Ok(false) => {
                return Err(NotificationError::ConnectionFailed(format!(
                    "SMTP サーバーが応答しません: {}:{}",
                    self.host, self.port
                )));
            }
            Err(e) => {
                return Err(NotificationError::ConnectionFailed(format!(
                    "SMTP 接続失敗 ({}:{}): {e}",
                    self.host, self.port
                )));
            }
        }

        tracing::debug!(host = %self.host, port = self.port, "SMTP 接続を確立");

        Ok(Box::new(SmtpMailConnection { transport }))
    }
}

/// 1 バッチ分の SMTP 接続
///
/// プールサイズ 1 のトランスポートを保持するため、バッチ内の送信は同じ接続を再利用する。
struct SmtpMailConnection {
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

#[async_trait]
impl MailConnection for SmtpMailConnection {
    async fn send_email(&self, email: &EmailMessage) -> Result<(), NotificationError> {
        let message = build_message(email)?;

        self.transport
            .send(message)
            .await
            .map_err(|e| NotificationError::SendFailed(format!("SMTP 送信失敗: {e}")))?;

        Ok(())
    }
}

/// EmailMessage から lettre のメッセージを構築する
///
/// HTML 本文がある場合は multipart/alternative、ない場合は text/plain の単一パートにする。
fn build_message(email: &EmailMessage) -> Result<Message, NotificationError> {
    let from: Mailbox = email
        .from
        .parse()
        .map_err(|e| NotificationError::SendFailed(format!("送信元アドレス不正: {e}")))?;
    let to: Mailbox = email
        .to
        .parse()
        .map_err(|e| NotificationError::SendFailed(format!("宛先アドレス不正: {e}")))?;

    let builder = Message::builder().from(from).to(to).subject(&email.subject);

    let result = match &email.html_body {
        Some(html_body) => builder.multipart(
            MultiPart::alternative()
                .singlepart(
                    SinglePart::builder()
                        .header(ContentType::TEXT_PLAIN)
                        .body(email.text_body.clone()),
                )
                .singlepart(
                    SinglePart::builder()
                        .header(ContentType::TEXT_HTML)
                        .body(html_body.clone()),
                ),
        ),
        None => builder
            .header(ContentType::TEXT_PLAIN)
            .body(email.text_body.clone()),
    };

    result.map_err(|e| NotificationError::SendFailed(format!("メッセージ構築失敗: {e}")))
}
