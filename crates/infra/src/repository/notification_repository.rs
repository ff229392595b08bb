//! # NotificationRepository
//!
//! 通知の永続化を担当するリポジトリ。
//!
//! ## 設計方針
//!
//! - **イベントを JOIN で同時取得**: レンダリングに必要なイベントを 1 クエリで読み込む
//! - **未送信 = `sent_at IS NULL`**: 古い順（`created_at`, `id`）に返す
//! - **送信済みの記録は `sent_at` の更新のみ**: NULL への更新は型で表現できない
//! - **不正な行で一括取得を止めない**: ドメインの制約を満たさない行は
//!   [`FetchedNotifications::invalid`] に分け、残りの行はそのまま返す
//!
//! 同時に複数のバッチが走った場合、同じ通知を二重送信しうる（未送信確認と更新の間にロックを取らない）。

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::PgPool;
use tsunami_notify_domain::{
    event::{Event, EventId, EventRecord, EventType},
    notification::{Notification, NotificationId, NotificationRecord},
    user::Email,
};
use uuid::Uuid;

use crate::error::InfraError;

/// 通知リポジトリトレイト
#[async_trait]
pub trait NotificationRepository: Send + Sync {
    /// 通知を挿入する
    async fn insert(&self, notification: &Notification) -> Result<(), InfraError>;

    /// ID で通知を検索する
    async fn find_by_id(&self, id: &NotificationId) -> Result<Option<Notification>, InfraError>;

    /// 未送信の通知を古い順に取得する
    async fn find_unsent(&self) -> Result<FetchedNotifications, InfraError>;

    /// 指定した ID の通知を送信状態に関係なく取得する
    ///
    /// 存在しない ID は無視する。空の配列を渡した場合は空の結果を返す。
    async fn find_by_ids(
        &self,
        ids: &[NotificationId],
    ) -> Result<FetchedNotifications, InfraError>;

    /// 送信日時を記録する
    async fn mark_sent(
        &self,
        id: &NotificationId,
        sent_at: DateTime<Utc>,
    ) -> Result<(), InfraError>;
}

/// 復元できなかった通知の行
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidNotification {
    pub id:     NotificationId,
    pub reason: String,
}

/// 一括取得の結果
#[derive(Debug, Default)]
pub struct FetchedNotifications {
    /// 復元できた通知（取得順）
    pub notifications: Vec<Notification>,
    /// ドメインの制約を満たさず復元できなかった行
    pub invalid:       Vec<InvalidNotification>,
}

impl FetchedNotifications {
    /// 復元できた通知と不正な行の合計
    pub fn len(&self) -> usize {
        self.notifications.len() + self.invalid.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 結果に含まれる ID（復元できなかった行を含む）
    pub fn contains(&self, id: &NotificationId) -> bool {
        self.notifications.iter().any(|n| n.id() == id)
            || self.invalid.iter().any(|invalid| &invalid.id == id)
    }

    fn from_rows(rows: Vec<NotificationRow>) -> Self {
        let mut fetched = Self::default();
        for row in rows {
            let id = NotificationId::from_uuid(row.id);
            match Notification::try_from(row) {
                Ok(notification) => fetched.notifications.push(notification),
                Err(e) => {
                    tracing::warn!(notification_id = %id, error = %e, "通知の行を復元できません");
                    fetched.invalid.push(InvalidNotification {
                        id,
                        reason: e.to_string(),
                    });
                }
            }
        }
        fetched
    }
}

/// notifications と events を JOIN した行
#[derive(Debug, sqlx::FromRow)]
struct NotificationRow {
    id:               Uuid,
    email:            String,
    context:          Value,
    sent_at:          Option<DateTime<Utc>>,
    created_at:       DateTime<Utc>,
    event_id:         Uuid,
    event_type:       String,
    event_target:     Option<Value>,
    event_data:       Value,
    event_created_at: DateTime<Utc>,
}

impl TryFrom<NotificationRow> for Notification {
    type Error = InfraError;

    fn try_from(row: NotificationRow) -> Result<Self, Self::Error> {
        let Value::Object(context) = row.context else {
            return Err(InfraError::invalid_data(format!(
                "通知 {} のコンテキストがオブジェクトではありません",
                row.id
            )));
        };

        let event = Event::from_db(EventRecord {
            id:         EventId::from_uuid(row.event_id),
            event_type: EventType::new(row.event_type)?,
            target:     row.event_target,
            data:       row.event_data,
            created_at: row.event_created_at,
        });

        Ok(Notification::from_db(NotificationRecord {
            id: NotificationId::from_uuid(row.id),
            event,
            email: Email::new(row.email)?,
            context,
            sent_at: row.sent_at,
            created_at: row.created_at,
        }))
    }
}

const SELECT_NOTIFICATIONS: &str = r#"
    SELECT
        n.id,
        n.email,
        n.context,
        n.sent_at,
        n.created_at,
        e.id AS event_id,
        e.event_type,
        e.target AS event_target,
        e.data AS event_data,
        e.created_at AS event_created_at
    FROM notifications n
    INNER JOIN events e ON e.id = n.event_id
"#;

/// PostgreSQL 実装の NotificationRepository
#[derive(Debug, Clone)]
pub struct PostgresNotificationRepository {
    pool: PgPool,
}

impl PostgresNotificationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NotificationRepository for PostgresNotificationRepository {
    #[tracing::instrument(skip_all, level = "debug", fields(notification_id = %notification.id()))]
    async fn insert(&self, notification: &Notification) -> Result<(), InfraError> {
        sqlx::query(
            r#"
            INSERT INTO notifications (id, event_id, email, context, sent_at, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(notification.id().as_uuid())
        .bind(notification.event().id().as_uuid())
        .bind(notification.email().as_str())
        .bind(Value::Object(notification.context().clone()))
        .bind(notification.sent_at())
        .bind(notification.created_at())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    #[tracing::instrument(skip_all, level = "debug", fields(notification_id = %id))]
    async fn find_by_id(&self, id: &NotificationId) -> Result<Option<Notification>, InfraError> {
        let row = sqlx::query_as::<_, NotificationRow>(&format!(
            "{SELECT_NOTIFICATIONS} WHERE n.id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Notification::try_from).transpose()
    }

    #[tracing::instrument(skip_all, level = "debug")]
    async fn find_unsent(&self) -> Result<FetchedNotifications, InfraError> {
        let rows = sqlx::query_as::<_, NotificationRow>(&format!(
            "{SELECT_NOTIFICATIONS} WHERE n.sent_at IS NULL ORDER BY n.created_at, n.id"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(FetchedNotifications::from_rows(rows))
    }

    #[tracing::instrument(skip_all, level = "debug", fields(count = ids.len()))]
    async fn find_by_ids(
        &self,
        ids: &[NotificationId],
    ) -> Result<FetchedNotifications, InfraError> {
        if ids.is_empty() {
            return Ok(FetchedNotifications::default());
        }

        let uuids: Vec<Uuid> = ids.iter().map(|id| *id.as_uuid()).collect();
        let rows = sqlx::query_as::<_, NotificationRow>(&format!(
            "{SELECT_NOTIFICATIONS} WHERE n.id = ANY($1) ORDER BY n.created_at, n.id"
        ))
        .bind(&uuids)
        .fetch_all(&self.pool)
        .await?;

        Ok(FetchedNotifications::from_rows(rows))
    }

    #[tracing::instrument(skip_all, level = "debug", fields(notification_id = %id))]
    async fn mark_sent(
        &self,
        id: &NotificationId,
        sent_at: DateTime<Utc>,
    ) -> Result<(), InfraError> {
        let result = sqlx::query("UPDATE notifications SET sent_at = $2 WHERE id = $1")
            .bind(id.as_uuid())
            .bind(sent_at)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(InfraError::unexpected(format!(
                "送信日時を記録する通知が存在しません: {id}"
            )));
        }

        Ok(())
    }
}
