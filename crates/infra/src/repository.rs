//! # リポジトリ実装
//!
//! イベント・通知・ユーザーの永続化を提供する。
//!
//! ## 設計方針
//!
//! - **トレイトで抽象化**: ユースケース層はトレイト経由で利用し、テストではモックに差し替える
//! - **実行時クエリ**: `sqlx::query` / `sqlx::query_as` と `FromRow` で行を受け取り、ドメイン型に変換する
//! - **不正データの検出**: 行からドメイン型への変換で制約違反があれば `InfraErrorKind::InvalidData`。
//!   通知の一括取得では不正な行だけを分けて返す

pub mod event_repository;
pub mod notification_repository;
pub mod user_repository;

pub use event_repository::{EventRepository, PostgresEventRepository};
pub use notification_repository::{
    FetchedNotifications,
    InvalidNotification,
    NotificationRepository,
    PostgresNotificationRepository,
};
pub use user_repository::{PostgresUserRepository, UserRepository};
