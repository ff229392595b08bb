//! # イベント
//!
//! 通知のトリガーとなる上流のドメインイベントを定義する。
//!
//! ## ドメイン用語
//!
//! | 型 | ドメイン用語 | 説明 |
//! |---|------------|------|
//! | [`Event`] | イベント | アプリケーションで発生した出来事の記録 |
//! | [`EventType`] | イベント種別 | `user.signup` のようなドット区切りの識別子 |
//!
//! ## 設計方針
//!
//! - **対象はスナップショット**: イベントの対象（target）は JSON スナップショットとして保持する
//! - **種別はテンプレート探索に使う**: ドット区切りの各セグメントがディレクトリ階層に対応する
//! - **削除はカスケード**: イベントを削除すると紐づく通知も削除される（DB 側の FK 制約）

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::DomainError;

define_uuid_id! {
    /// イベント ID（一意識別子）
    ///
    /// events テーブルの主キー。
    pub struct EventId;
}

/// イベント種別
///
/// ドット区切りの識別子（例: `user.signup`, `order.payment.failed`）。
/// テンプレートのディレクトリ名に使われるため、パス区切り文字や空セグメントを禁止する。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, serde::Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EventType(String);

impl EventType {
    /// イベント種別を作成する
    ///
    /// # バリデーション
    ///
    /// - 空文字列ではない
    /// - 空のセグメントを含まない（先頭・末尾のドット、連続するドットを含む）
    /// - `/` と `\` を含まない
    pub fn new(value: impl Into<String>) -> Result<Self, DomainError> {
        let value = value.into().trim().to_string();

        if value.is_empty() {
            return Err(DomainError::Validation(
                "イベント種別は必須です".to_string(),
            ));
        }

        if value.contains(['/', '\\']) {
            return Err(DomainError::Validation(format!(
                "イベント種別にパス区切り文字は使用できません: {value}"
            )));
        }

        if value.split('.').any(str::is_empty) {
            return Err(DomainError::Validation(format!(
                "イベント種別に空のセグメントがあります: {value}"
            )));
        }

        Ok(Self(value))
    }

    /// ドット区切りのセグメントを返す
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('.')
    }

    /// 文字列参照を取得する
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for EventType {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<EventType> for String {
    fn from(value: EventType) -> Self {
        value.0
    }
}

/// イベントエンティティ
///
/// テンプレートには `event` としてシリアライズされた形で渡る。
/// `target` は別キー（`target`）でも渡される。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Event {
    id:         EventId,
    event_type: EventType,
    target:     Option<Value>,
    data:       Value,
    created_at: DateTime<Utc>,
}

/// イベントの新規作成パラメータ
pub struct NewEvent {
    pub id:         EventId,
    pub event_type: EventType,
    pub target:     Option<Value>,
    pub data:       Value,
    pub now:        DateTime<Utc>,
}

/// イベントの DB 復元パラメータ
pub struct EventRecord {
    pub id:         EventId,
    pub event_type: EventType,
    pub target:     Option<Value>,
    pub data:       Value,
    pub created_at: DateTime<Utc>,
}

impl Event {
    /// 新しいイベントを作成する
    pub fn new(params: NewEvent) -> Self {
        Self {
            id:         params.id,
            event_type: params.event_type,
            target:     params.target,
            data:       params.data,
            created_at: params.now,
        }
    }

    /// 既存のデータから復元する
    pub fn from_db(record: EventRecord) -> Self {
        Self {
            id:         record.id,
            event_type: record.event_type,
            target:     record.target,
            data:       record.data,
            created_at: record.created_at,
        }
    }

    pub fn id(&self) -> &EventId {
        &self.id
    }

    pub fn event_type(&self) -> &EventType {
        &self.event_type
    }

    pub fn target(&self) -> Option<&Value> {
        self.target.as_ref()
    }

    pub fn data(&self) -> &Value {
        &self.data
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}
