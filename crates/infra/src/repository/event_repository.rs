//! # EventRepository
//!
//! 通知のトリガーとなるイベントの永続化を担当するリポジトリ。
//!
//! イベントを削除すると、紐づく通知は FK の `ON DELETE CASCADE` で削除される。

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::PgPool;
use tsunami_notify_domain::event::{Event, EventId, EventRecord, EventType};
use uuid::Uuid;

use crate::error::InfraError;

/// イベントリポジトリトレイト
#[async_trait]
pub trait EventRepository: Send + Sync {
    /// イベントを挿入する
    async fn insert(&self, event: &Event) -> Result<(), InfraError>;

    /// ID でイベントを検索する
    async fn find_by_id(&self, id: &EventId) -> Result<Option<Event>, InfraError>;

    /// イベントを削除する（紐づく通知もカスケード削除される）
    ///
    /// 削除した場合は `true`、存在しなかった場合は `false` を返す。
    async fn delete(&self, id: &EventId) -> Result<bool, InfraError>;
}

/// events テーブルの行
#[derive(Debug, sqlx::FromRow)]
struct EventRow {
    id:         Uuid,
    event_type: String,
    target:     Option<Value>,
    data:       Value,
    created_at: DateTime<Utc>,
}

impl TryFrom<EventRow> for Event {
    type Error = InfraError;

    fn try_from(row: EventRow) -> Result<Self, Self::Error> {
        Ok(Event::from_db(EventRecord {
            id:         EventId::from_uuid(row.id),
            event_type: EventType::new(row.event_type)?,
            target:     row.target,
            data:       row.data,
            created_at: row.created_at,
        }))
    }
}

/// PostgreSQL 実装の EventRepository
#[derive(Debug, Clone)]
pub struct PostgresEventRepository {
    pool: PgPool,
}

impl PostgresEventRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EventRepository for PostgresEventRepository {
    #[tracing::instrument(skip_all, level = "debug", fields(event_id = %event.id()))]
    async fn insert(&self, event: &Event) -> Result<(), InfraError> {
        sqlx::query(
            r#"
            INSERT INTO events (id, event_type, target, data, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(event.id().as_uuid())
        .bind(event.event_type().as_str())
        .bind(event.target())
        .bind(event.data())
        .bind(event.created_at())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    #[tracing::instrument(skip_all, level = "debug", fields(event_id = %id))]
    async fn find_by_id(&self, id: &EventId) -> Result<Option<Event>, InfraError> {
        let row = sqlx::query_as::<_, EventRow>(
            r#"
            SELECT id, event_type, target, data, created_at
            FROM events
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Event::try_from).transpose()
    }

    #[tracing::instrument(skip_all, level = "debug", fields(event_id = %id))]
    async fn delete(&self, id: &EventId) -> Result<bool, InfraError> {
        let result = sqlx::query("DELETE FROM events WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
