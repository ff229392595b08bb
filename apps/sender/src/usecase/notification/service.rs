//! # 通知サービス
//!
//! 通知の作成と、テンプレートレンダリング → メール送信 → 送信日時の記録を統合するサービス。
//!
//! ## 設計方針
//!
//! - **バッチ単位の接続**: `send_all()` は 1 つの接続を開き、全件をその接続で送信する
//! - **1 件の失敗でバッチを止めない**: 失敗はレポーターに渡して件数に数え、次の通知へ進む
//! - **依存性注入**: リポジトリ・メール送信・時刻・レポーターはトレイトで抽象化

use std::sync::Arc;

use tsunami_notify_domain::{
    clock::Clock,
    event::Event,
    notification::{NewNotification, Notification, NotificationError, NotificationId, TemplateContext},
    user::{Email, User},
};
use tsunami_notify_infra::{
    notification::{MailConnection, MailTransport},
    repository::{FetchedNotifications, NotificationRepository, UserRepository},
};
use tsunami_notify_shared::{event_log::event, log_business_event};

use super::{DeliveryReporter, TemplateRenderer};
use crate::error::RunError;

/// バッチ送信の結果件数
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SendSummary {
    pub succeeded: usize,
    pub failed:    usize,
}

impl SendSummary {
    pub fn total(&self) -> usize {
        self.succeeded + self.failed
    }
}

/// 通知サービス
pub struct NotificationService {
    notifications: Arc<dyn NotificationRepository>,
    users:         Arc<dyn UserRepository>,
    transport:     Arc<dyn MailTransport>,
    renderer:      TemplateRenderer,
    reporter:      Arc<dyn DeliveryReporter>,
    clock:         Arc<dyn Clock>,
    from_address:  String,
}

impl NotificationService {
    pub fn new(
        notifications: Arc<dyn NotificationRepository>,
        users: Arc<dyn UserRepository>,
        transport: Arc<dyn MailTransport>,
        renderer: TemplateRenderer,
        reporter: Arc<dyn DeliveryReporter>,
        clock: Arc<dyn Clock>,
        from_address: impl Into<String>,
    ) -> Self {
        Self {
            notifications,
            users,
            transport,
            renderer,
            reporter,
            clock,
            from_address: from_address.into(),
        }
    }

    /// イベントに紐づく未送信の通知を作成する
    ///
    /// `context` が `None` の場合は空のコンテキストになる。
    pub async fn create(
        &self,
        event: Event,
        email: Email,
        context: Option<TemplateContext>,
    ) -> Result<Notification, NotificationError> {
        let notification = Notification::new(NewNotification {
            id: NotificationId::new(),
            event,
            email,
            context,
            now: self.clock.now(),
        });

        self.notifications
            .insert(&notification)
            .await
            .map_err(|e| NotificationError::PersistFailed(e.to_string()))?;

        log_business_event!(
            event.category = event::category::NOTIFICATION,
            event.action = event::action::NOTIFICATION_CREATED,
            event.entity_type = event::entity_type::NOTIFICATION,
            event.entity_id = %notification.id(),
            event.result = event::result::SUCCESS,
            notification.event_type = %notification.event().event_type(),
            "通知を作成"
        );

        Ok(notification)
    }

    /// 通知のテンプレートを 1 つレンダリングする
    ///
    /// 受信者ユーザーをメールアドレスで検索し（大文字小文字を無視）、コンテキストに渡す。
    pub async fn render_template(
        &self,
        notification: &Notification,
        name: &str,
    ) -> Result<String, NotificationError> {
        let recipient = self.find_recipient(notification.email()).await?;
        self.renderer
            .render_template(notification, recipient.as_ref(), name)
    }

    /// 通知を 1 件送信し、送信日時を記録した通知を返す
    ///
    /// `connection` が `None` の場合はこの送信のためだけに接続を開く。
    /// 結果（成功・失敗）はレポーターに渡す。
    #[tracing::instrument(skip_all, fields(notification_id = %notification.id()))]
    pub async fn send(
        &self,
        notification: &Notification,
        connection: Option<&dyn MailConnection>,
    ) -> Result<Notification, NotificationError> {
        match self.try_send(notification, connection).await {
            Ok(sent) => {
                self.reporter.sent(&sent);
                Ok(sent)
            }
            Err(e) => {
                self.reporter.failed(notification, &e);
                Err(e)
            }
        }
    }

    async fn try_send(
        &self,
        notification: &Notification,
        connection: Option<&dyn MailConnection>,
    ) -> Result<Notification, NotificationError> {
        let recipient = self.find_recipient(notification.email()).await?;
        let email =
            self.renderer
                .render_email(notification, recipient.as_ref(), &self.from_address)?;

        match connection {
            Some(connection) => connection.send_email(&email).await?,
            None => self.transport.connect().await?.send_email(&email).await?,
        }

        let now = self.clock.now();
        self.notifications
            .mark_sent(notification.id(), now)
            .await
            .map_err(|e| NotificationError::PersistFailed(e.to_string()))?;

        Ok(notification.clone().mark_sent(now))
    }

    /// 通知をまとめて送信する
    ///
    /// 1 つの接続を開いて全件を順に送信する。個々の失敗は件数に数えて処理を続ける。
    /// 接続を開けない場合は何も数えずにエラーを返す。対象が空の場合は接続しない。
    pub async fn send_all(
        &self,
        notifications: &[Notification],
    ) -> Result<SendSummary, NotificationError> {
        let mut summary = SendSummary::default();
        if notifications.is_empty() {
            return Ok(summary);
        }

        let connection = self.transport.connect().await?;

        for notification in notifications {
            match self.send(notification, Some(connection.as_ref())).await {
                Ok(_) => summary.succeeded += 1,
                Err(_) => summary.failed += 1,
            }
        }

        let result = if summary.failed == 0 {
            event::result::SUCCESS
        } else {
            event::result::FAILURE
        };
        log_business_event!(
            event.category = event::category::BATCH,
            event.action = event::action::BATCH_COMPLETED,
            event.result = result,
            batch.succeeded = summary.succeeded,
            batch.failed = summary.failed,
            "送信バッチ完了"
        );

        Ok(summary)
    }

    /// 未送信の通知をすべて送信する
    ///
    /// 復元できなかった行は送信せず、失敗として数える。
    pub async fn send_unsent(&self) -> Result<SendSummary, RunError> {
        let unsent = self.notifications.find_unsent().await?;
        tracing::debug!(
            count = unsent.notifications.len(),
            invalid = unsent.invalid.len(),
            "未送信の通知を取得"
        );
        Ok(self.send_fetched(&unsent).await?)
    }

    /// 指定した通知を送信状態に関係なく送信する
    ///
    /// 存在しない ID は警告を出して無視する。
    pub async fn send_by_ids(&self, ids: &[NotificationId]) -> Result<SendSummary, RunError> {
        let found = self.notifications.find_by_ids(ids).await?;
        if found.len() < ids.len() {
            let missing: Vec<String> = ids
                .iter()
                .filter(|id| !found.contains(id))
                .map(ToString::to_string)
                .collect();
            tracing::warn!(missing = ?missing, "指定された通知が見つかりません");
        }
        Ok(self.send_fetched(&found).await?)
    }

    async fn send_fetched(
        &self,
        fetched: &FetchedNotifications,
    ) -> Result<SendSummary, NotificationError> {
        let mut summary = self.send_all(&fetched.notifications).await?;
        for invalid in &fetched.invalid {
            self.reporter.rejected(invalid);
        }
        summary.failed += fetched.invalid.len();
        Ok(summary)
    }

    async fn find_recipient(&self, email: &Email) -> Result<Option<User>, NotificationError> {
        self.users
            .find_by_email_ignore_case(email)
            .await
            .map_err(|e| NotificationError::RecipientLookupFailed(e.to_string()))
    }
}
