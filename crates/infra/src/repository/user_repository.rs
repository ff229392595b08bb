//! # UserRepository
//!
//! 通知の受信者解決に使うユーザー検索を担当するリポジトリ。
//!
//! メールアドレスの大文字小文字を無視して一致するユーザーを 1 件返す。
//! 複数一致した場合は ID 順で最初のユーザーを返す。

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tsunami_notify_domain::user::{Email, User, UserId};
use uuid::Uuid;

use crate::error::InfraError;

/// ユーザーリポジトリトレイト
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// メールアドレスでユーザーを検索する（大文字小文字を無視）
    ///
    /// # 戻り値
    ///
    /// - `Ok(Some(user))`: ユーザーが見つかった場合
    /// - `Ok(None)`: ユーザーが見つからない場合
    /// - `Err(_)`: データベースエラー
    async fn find_by_email_ignore_case(&self, email: &Email) -> Result<Option<User>, InfraError>;

    /// ユーザーを挿入する
    async fn insert(&self, user: &User) -> Result<(), InfraError>;
}

#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id:         Uuid,
    email:      String,
    username:   String,
    created_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = InfraError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(User::new(
            UserId::from_uuid(row.id),
            Email::new(row.email)?,
            row.username,
            row.created_at,
        ))
    }
}

/// PostgreSQL 実装の UserRepository
#[derive(Debug, Clone)]
pub struct PostgresUserRepository {
    pool: PgPool,
}

impl PostgresUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    #[tracing::instrument(skip_all, level = "debug")]
    async fn find_by_email_ignore_case(&self, email: &Email) -> Result<Option<User>, InfraError> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, email, username, created_at
            FROM users
            WHERE lower(email) = lower($1)
            ORDER BY id
            LIMIT 1
            "#,
        )
        .bind(email.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(User::try_from).transpose()
    }

    #[tracing::instrument(skip_all, level = "debug", fields(user_id = %user.id()))]
    async fn insert(&self, user: &User) -> Result<(), InfraError> {
        sqlx::query(
            r#"
            INSERT INTO users (id, email, username, created_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(user.id().as_uuid())
        .bind(user.email().as_str())
        .bind(user.username())
        .bind(user.created_at())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_トレイトはsendとsyncを実装している() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<PostgresUserRepository>();
    }
}
