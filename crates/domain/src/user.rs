//! # ユーザー
//!
//! 通知の受信者解決に使うユーザーと、メールアドレス値オブジェクトを定義する。
//!
//! 通知はメールアドレスだけを保持し、ユーザーへの参照を持たない。
//! レンダリング時にメールアドレスの大文字小文字を無視した一致でユーザーを引き、
//! 見つかればテンプレートの `recipient` として渡す（見つからなくてもよい）。
//!
//! ## 使用例
//!
//! ```rust
//! use tsunami_notify_domain::user::Email;
//!
//! let email = Email::new("Alice@Example.com").unwrap();
//! assert!(email.matches_ignore_case("alice@example.com"));
//! ```

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::DomainError;

define_uuid_id! {
    /// ユーザー ID（一意識別子）
    pub struct UserId;
}

/// メールアドレスの最大長
const EMAIL_MAX_LENGTH: usize = 255;

/// メールアドレス（値オブジェクト）
///
/// `local@domain` の形式を要求する。
/// 大文字小文字は保存時のまま保持し、比較時のみ無視する。
/// 比較は Unicode の小文字化で行い、PostgreSQL の `lower()` と揃える。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, serde::Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Email(String);

impl Email {
    /// メールアドレスを作成する
    ///
    /// # バリデーション
    ///
    /// - 前後の空白を除去した上で空文字列ではない
    /// - `@` を含み、その前後が空ではない
    /// - 最大 255 文字
    pub fn new(value: impl Into<String>) -> Result<Self, DomainError> {
        let value = value.into().trim().to_string();

        if value.is_empty() {
            return Err(DomainError::Validation(
                "メールアドレスは必須です".to_string(),
            ));
        }

        let Some((local, domain)) = value.rsplit_once('@') else {
            return Err(DomainError::Validation(format!(
                "メールアドレスの形式が不正です: {value}"
            )));
        };

        if local.is_empty() || domain.is_empty() {
            return Err(DomainError::Validation(format!(
                "メールアドレスの形式が不正です: {value}"
            )));
        }

        if value.chars().count() > EMAIL_MAX_LENGTH {
            return Err(DomainError::Validation(format!(
                "メールアドレスは{EMAIL_MAX_LENGTH}文字以内である必要があります"
            )));
        }

        Ok(Self(value))
    }

    /// 大文字小文字を無視して比較する
    pub fn matches_ignore_case(&self, other: &str) -> bool {
        self.0.to_lowercase() == other.trim().to_lowercase()
    }

    /// 文字列参照を取得する
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// 所有権を持つ文字列に変換する
    pub fn into_string(self) -> String {
        self.0
    }
}

impl std::fmt::Display for Email {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for Email {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Email> for String {
    fn from(value: Email) -> Self {
        value.0
    }
}

/// ユーザーエンティティ
///
/// テンプレートには `recipient` としてシリアライズされた形で渡る。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    id:         UserId,
    email:      Email,
    username:   String,
    created_at: DateTime<Utc>,
}

impl User {
    pub fn new(id: UserId, email: Email, username: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id,
            email,
            username: username.into(),
            created_at: now,
        }
    }

    pub fn id(&self) -> &UserId {
        &self.id
    }

    pub fn email(&self) -> &Email {
        &self.email
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}
