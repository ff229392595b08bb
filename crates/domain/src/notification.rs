//! # 通知
//!
//! イベントに紐づくメール通知のドメインモデルを定義する。
//!
//! ## ドメイン用語
//!
//! | 型 | ドメイン用語 | 説明 |
//! |---|------------|------|
//! | [`Notification`] | 通知 | イベントと受信者に紐づく 1 通のメール |
//! | [`DeliveryState`] | 配信状態 | 未送信 → 送信済みの 2 状態 |
//! | [`EmailMessage`] | メールメッセージ | テンプレートレンダリングの出力 |
//!
//! ## 不変条件
//!
//! - `sent_at` は送信に成功するまで `None`
//! - 一度 `Some` になった `sent_at` が `None` に戻ることはない（[`Notification::mark_sent`] のみが変更する）
//!
//! ## テンプレート探索
//!
//! イベント種別 `a.b.c` の通知は、テンプレート `name` を次の順で探す（最初に見つかったものを使う）:
//!
//! 1. `tsunami_notify/a.b.c/{name}`
//! 2. `tsunami_notify/a/b/c/{name}`

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use strum::IntoStaticStr;
use thiserror::Error;

use crate::{event::Event, user::Email};

define_uuid_id! {
    /// 通知 ID（一意識別子）
    ///
    /// notifications テーブルの主キー。UUID v7 を使用。
    pub struct NotificationId;
}

/// テンプレートディレクトリの接頭辞
pub const TEMPLATE_PREFIX: &str = "tsunami_notify";

/// 件名テンプレート（必須）
pub const SUBJECT_TEMPLATE: &str = "subject.txt";
/// プレーンテキスト本文テンプレート（必須）
pub const TEXT_TEMPLATE: &str = "message.txt";
/// HTML 本文テンプレート（任意）
pub const HTML_TEMPLATE: &str = "message.html";

/// テンプレートに渡す任意のキー・値
pub type TemplateContext = Map<String, Value>;

/// 通知送信エラー
#[derive(Debug, Error)]
pub enum NotificationError {
    /// 候補パスのいずれにもテンプレートが存在しない
    #[error("テンプレートが見つかりません: {}", candidates.join(", "))]
    TemplateNotFound { candidates: Vec<String> },

    /// テンプレートレンダリングに失敗
    #[error("テンプレートレンダリングに失敗: {0}")]
    TemplateFailed(String),

    /// メール送信に失敗
    #[error("メール送信に失敗: {0}")]
    SendFailed(String),

    /// メール送信の接続確立に失敗
    #[error("メール送信の接続確立に失敗: {0}")]
    ConnectionFailed(String),

    /// 受信者ユーザーの検索に失敗
    #[error("受信者の検索に失敗: {0}")]
    RecipientLookupFailed(String),

    /// 送信結果の永続化に失敗
    #[error("送信結果の記録に失敗: {0}")]
    PersistFailed(String),
}

impl NotificationError {
    /// テンプレート不在エラーかどうか
    ///
    /// 任意テンプレート（`message.html`）の不在を許容する判定に使う。
    pub fn is_template_not_found(&self) -> bool {
        matches!(self, Self::TemplateNotFound { .. })
    }
}

/// 配信状態
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoStaticStr, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum DeliveryState {
    /// 未送信（`sent_at` が NULL）
    Unsent,
    /// 送信済み
    Sent,
}

/// メールメッセージ
///
/// テンプレートレンダリングの出力。メール送信コネクションに渡される。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    /// 送信元メールアドレス
    pub from:      String,
    /// 送信先メールアドレス
    pub to:        String,
    /// 件名（1 行）
    pub subject:   String,
    /// プレーンテキスト本文
    pub text_body: String,
    /// HTML 本文（テンプレートがなければ `None`）
    pub html_body: Option<String>,
}

/// 通知エンティティ
///
/// 紐づくイベントを保持する（読み込み時に JOIN で一緒に取得する）。
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    id:         NotificationId,
    event:      Event,
    email:      Email,
    context:    TemplateContext,
    sent_at:    Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

/// 通知の新規作成パラメータ
pub struct NewNotification {
    pub id:      NotificationId,
    pub event:   Event,
    pub email:   Email,
    pub context: Option<TemplateContext>,
    pub now:     DateTime<Utc>,
}

/// 通知の DB 復元パラメータ
pub struct NotificationRecord {
    pub id:         NotificationId,
    pub event:      Event,
    pub email:      Email,
    pub context:    TemplateContext,
    pub sent_at:    Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    /// 新しい通知を作成する（未送信状態）
    pub fn new(params: NewNotification) -> Self {
        Self {
            id:         params.id,
            event:      params.event,
            email:      params.email,
            context:    params.context.unwrap_or_default(),
            sent_at:    None,
            created_at: params.now,
        }
    }

    /// 既存のデータから復元する
    pub fn from_db(record: NotificationRecord) -> Self {
        Self {
            id:         record.id,
            event:      record.event,
            email:      record.email,
            context:    record.context,
            sent_at:    record.sent_at,
            created_at: record.created_at,
        }
    }

    /// 送信済みにした通知を返す
    ///
    /// 再送時は `sent_at` を新しい送信日時で上書きする（NULL には戻らない）。
    pub fn mark_sent(self, now: DateTime<Utc>) -> Self {
        Self {
            sent_at: Some(now),
            ..self
        }
    }

    /// テンプレートディレクトリの候補を優先順に返す
    ///
    /// 1. イベント種別そのまま（`tsunami_notify/a.b.c`）
    /// 2. ドットをディレクトリ区切りに置き換えたもの（`tsunami_notify/a/b/c`）
    pub fn template_directories(&self) -> Vec<String> {
        let event_type = self.event.event_type();
        let nested = event_type.segments().collect::<Vec<_>>().join("/");
        vec![
            format!("{TEMPLATE_PREFIX}/{event_type}"),
            format!("{TEMPLATE_PREFIX}/{nested}"),
        ]
    }

    /// 指定したテンプレート名の探索パスを優先順に返す
    pub fn template_candidates(&self, template_name: &str) -> Vec<String> {
        self.template_directories()
            .into_iter()
            .map(|directory| format!("{directory}/{template_name}"))
            .collect()
    }

    pub fn id(&self) -> &NotificationId {
        &self.id
    }

    pub fn event(&self) -> &Event {
        &self.event
    }

    pub fn email(&self) -> &Email {
        &self.email
    }

    pub fn context(&self) -> &TemplateContext {
        &self.context
    }

    pub fn sent_at(&self) -> Option<DateTime<Utc>> {
        self.sent_at
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn state(&self) -> DeliveryState {
        match self.sent_at {
            Some(_) => DeliveryState::Sent,
            None => DeliveryState::Unsent,
        }
    }

    pub fn is_sent(&self) -> bool {
        self.state() == DeliveryState::Sent
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use serde_json::json;

    use super::*;
    use crate::event::{EventId, EventType, NewEvent};

    fn test_now() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    fn make_event(event_type: &str) -> Event {
        Event::new(NewEvent {
            id:         EventId::new(),
            event_type: EventType::new(event_type).unwrap(),
            target:     None,
            data:       json!({}),
            now:        test_now(),
        })
    }

    fn make_notification(event_type: &str) -> Notification {
        Notification::new(NewNotification {
            id:      NotificationId::new(),
            event:   make_event(event_type),
            email:   Email::new("x@example.com").unwrap(),
            context: None,
            now:     test_now(),
        })
    }

    #[test]
    fn test_新規作成時は未送信で空のコンテキストを持つ() {
        let notification = make_notification("user.signup");

        assert_eq!(notification.sent_at(), None);
        assert_eq!(notification.state(), DeliveryState::Unsent);
        assert!(notification.context().is_empty());
        assert_eq!(notification.created_at(), test_now());
    }

    #[test]
    fn test_作成時に渡したコンテキストを保持する() {
        let mut context = TemplateContext::new();
        context.insert("coupon".to_string(), json!("WELCOME10"));

        let notification = Notification::new(NewNotification {
            id:      NotificationId::new(),
            event:   make_event("user.signup"),
            email:   Email::new("x@example.com").unwrap(),
            context: Some(context.clone()),
            now:     test_now(),
        });

        assert_eq!(notification.context(), &context);
    }

    #[test]
    fn test_mark_sentで送信日時が設定される() {
        let sent_at = test_now() + chrono::Duration::minutes(5);

        let notification = make_notification("user.signup").mark_sent(sent_at);

        assert_eq!(notification.sent_at(), Some(sent_at));
        assert!(notification.is_sent());
    }

    #[test]
    fn test_再送時は送信日時が上書きされnullには戻らない() {
        let first = test_now();
        let second = first + chrono::Duration::hours(1);

        let notification = make_notification("user.signup")
            .mark_sent(first)
            .mark_sent(second);

        assert_eq!(notification.sent_at(), Some(second));
    }

    #[test]
    fn test_user_signupの件名テンプレート探索パス() {
        let notification = make_notification("user.signup");

        assert_eq!(
            notification.template_candidates(SUBJECT_TEMPLATE),
            vec![
                "tsunami_notify/user.signup/subject.txt".to_string(),
                "tsunami_notify/user/signup/subject.txt".to_string(),
            ]
        );
    }

    #[rstest]
    #[case("a.b.c", "tsunami_notify/a.b.c", "tsunami_notify/a/b/c")]
    #[case("heartbeat", "tsunami_notify/heartbeat", "tsunami_notify/heartbeat")]
    fn test_テンプレートディレクトリはフラット形式と階層形式の順(
        #[case] event_type: &str,
        #[case] flat: &str,
        #[case] nested: &str,
    ) {
        let notification = make_notification(event_type);

        assert_eq!(
            notification.template_directories(),
            vec![flat.to_string(), nested.to_string()]
        );
    }

    #[test]
    fn test_delivery_stateの文字列表現() {
        assert_eq!(DeliveryState::Unsent.to_string(), "unsent");
        let sent: &str = DeliveryState::Sent.into();
        assert_eq!(sent, "sent");
    }

    #[test]
    fn test_template_not_foundは候補を列挙したメッセージになる() {
        let err = NotificationError::TemplateNotFound {
            candidates: vec!["a/subject.txt".to_string(), "b/subject.txt".to_string()],
        };

        assert!(err.is_template_not_found());
        assert_eq!(
            err.to_string(),
            "テンプレートが見つかりません: a/subject.txt, b/subject.txt"
        );
        assert!(!NotificationError::SendFailed("x".to_string()).is_template_not_found());
    }
}
