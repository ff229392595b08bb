//! # Tsunami Notify インフラ層
//!
//! 外部システムとの接続・通信を担当するインフラストラクチャ層。
//!
//! ## 設計方針
//!
//! このクレートはユースケース層が利用するインターフェース（リポジトリトレイト、
//! メール送信トレイト）とその具体的な実装を提供する。外部システムの詳細を
//! カプセル化し、ユースケース層をインフラの変更から保護する。
//!
//! ## 依存関係
//!
//! ```text
//! sender → infra → domain
//!    ↘              ↑
//!      ─────────────┘
//! ```
//!
//! ## モジュール構成
//!
//! - [`db`] - PostgreSQL 接続プールとマイグレーション
//! - [`error`] - インフラ層エラー定義
//! - [`notification`] - メール送信（SMTP / SES / Noop）
//! - [`repository`] - リポジトリ実装
//!
//! ## 使用例
//!
//! ```rust,ignore
//! use tsunami_notify_infra::{db, repository::PostgresNotificationRepository};
//!
//! let pool = db::create_pool("postgres://localhost/tsunami_notify").await?;
//! db::run_migrations(&pool).await?;
//! let notifications = PostgresNotificationRepository::new(pool);
//! ```

pub mod db;
pub mod error;
#[cfg(any(test, feature = "test-utils"))]
pub mod mock;
pub mod notification;
pub mod repository;

pub use error::InfraError;
