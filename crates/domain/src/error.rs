//! # ドメイン層エラー定義
//!
//! 値オブジェクトの検証失敗やエンティティ不在を表現するエラー型。
//!
//! 送信フローで発生するエラー（テンプレート不在、送信失敗など）は
//! [`NotificationError`](crate::notification::NotificationError) が担当する。
//!
//! ## 使用例
//!
//! ```rust
//! use tsunami_notify_domain::DomainError;
//!
//! fn validate_name(name: &str) -> Result<(), DomainError> {
//!     if name.is_empty() {
//!         return Err(DomainError::Validation("名前は必須です".to_string()));
//!     }
//!     Ok(())
//! }
//! ```

use thiserror::Error;

/// ドメイン層で発生するエラー
#[derive(Debug, Error)]
pub enum DomainError {
    /// バリデーションエラー
    ///
    /// 入力値がビジネスルールに違反している場合に使用する。
    ///
    /// # 例
    ///
    /// - 必須フィールドが未入力
    /// - イベント種別の形式が不正
    /// - メールアドレスの形式が不正
    #[error("バリデーションエラー: {0}")]
    Validation(String),

    /// エンティティが見つからない
    ///
    /// # フィールド
    ///
    /// - `entity_type`: エンティティの種類（"Event", "Notification" など）
    /// - `id`: 検索に使用した識別子
    #[error("{entity_type} が見つかりません: {id}")]
    NotFound {
        /// エンティティの種類
        entity_type: &'static str,
        /// 検索に使用した識別子
        id:          String,
    },
}
