//! テスト共通フィクスチャ
//!
//! DB を使用する統合テストで共通利用するエンティティ生成ヘルパー。
//! Rust の統合テスト規約に従い `tests/common/mod.rs` に配置。

// 各テストファイルが独立したクレートとしてコンパイルされるため、
// 使用しない関数に dead_code 警告が出る。モジュール全体で抑制する。
#![allow(dead_code)]

use chrono::{DateTime, Duration, Utc};
use serde_json::{Value, json};
use sqlx::PgPool;
use tsunami_notify_domain::{
    event::{Event, EventId, EventType, NewEvent},
    notification::{NewNotification, Notification, NotificationId, TemplateContext},
    user::{Email, User, UserId},
};
use tsunami_notify_infra::repository::{
    EventRepository,
    NotificationRepository,
    PostgresEventRepository,
    PostgresNotificationRepository,
    PostgresUserRepository,
    UserRepository,
};

/// テスト用の固定日時
pub fn test_now() -> DateTime<Utc> {
    DateTime::from_timestamp(1_700_000_000, 0).unwrap()
}

/// `test_now()` から `seconds` 秒後
pub fn later(seconds: i64) -> DateTime<Utc> {
    test_now() + Duration::seconds(seconds)
}

/// イベントを作成して保存する
pub async fn insert_event(pool: &PgPool, event_type: &str, target: Option<Value>) -> Event {
    let event = Event::new(NewEvent {
        id: EventId::new(),
        event_type: EventType::new(event_type).unwrap(),
        target,
        data: json!({}),
        now: test_now(),
    });
    PostgresEventRepository::new(pool.clone())
        .insert(&event)
        .await
        .expect("イベント作成に失敗");
    event
}

/// 通知を作成して保存する
pub async fn insert_notification(
    pool: &PgPool,
    event: &Event,
    email: &str,
    context: Option<TemplateContext>,
    created_at: DateTime<Utc>,
) -> Notification {
    let notification = Notification::new(NewNotification {
        id: NotificationId::new(),
        event: event.clone(),
        email: Email::new(email).unwrap(),
        context,
        now: created_at,
    });
    PostgresNotificationRepository::new(pool.clone())
        .insert(&notification)
        .await
        .expect("通知作成に失敗");
    notification
}

/// ドメインの検証を通さずに通知の行を直接挿入する
pub async fn insert_raw_notification(
    pool: &PgPool,
    event: &Event,
    email: &str,
    created_at: DateTime<Utc>,
) -> NotificationId {
    let id = NotificationId::new();
    sqlx::query(
        "INSERT INTO notifications (id, event_id, email, context, created_at) VALUES ($1, $2, $3, '{}', $4)",
    )
    .bind(id.as_uuid())
    .bind(event.id().as_uuid())
    .bind(email)
    .bind(created_at)
    .execute(pool)
    .await
    .expect("通知の行の挿入に失敗");
    id
}

/// ユーザーを作成して保存する
pub async fn insert_user(pool: &PgPool, email: &str, username: &str) -> User {
    let user = User::new(
        UserId::new(),
        Email::new(email).unwrap(),
        username,
        test_now(),
    );
    PostgresUserRepository::new(pool.clone())
        .insert(&user)
        .await
        .expect("ユーザー作成に失敗");
    user
}
