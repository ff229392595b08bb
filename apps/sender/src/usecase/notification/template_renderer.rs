//! # テンプレートレンダラー
//!
//! tera テンプレートエンジンで通知メールの件名・本文を生成する。
//!
//! ## 設計方針
//!
//! - **複数ルートの優先順**: ルートごとに `<root>/**/*` を読み込み、先頭のルートに後続を
//!   `Tera::extend` で合成する。同名テンプレートは先に読み込んだルートが勝つ
//! - **候補パスの先勝ち**: 通知のイベント種別から求めた候補パスを順に調べ、最初に存在するものを使う
//! - **コンテキスト**: `event` / `target` / `recipient` を組み込みで渡し、通知に保存された
//!   コンテキストのキーで上書きする
//! - **HTML は任意**: `message.html` が見つからない場合はプレーンテキストのみのメールにする
//!
//! `.html` のテンプレートは tera の自動エスケープが有効になる。`.txt` はエスケープしない。

use std::path::{Path, PathBuf};

use tera::{Context, Tera};
use tsunami_notify_domain::{
    notification::{
        EmailMessage,
        HTML_TEMPLATE,
        Notification,
        NotificationError,
        SUBJECT_TEMPLATE,
        TEXT_TEMPLATE,
    },
    user::User,
};

/// テンプレートレンダラー
///
/// tera テンプレートエンジンをラップし、[`Notification`] から [`EmailMessage`] を生成する。
pub struct TemplateRenderer {
    engine: Tera,
}

impl TemplateRenderer {
    /// テンプレートのルートディレクトリ群から読み込む
    ///
    /// `dirs` は先頭ほど優先度が高い。存在しないディレクトリは警告を出してスキップする。
    pub fn load(dirs: &[PathBuf]) -> Result<Self, NotificationError> {
        let mut engine: Option<Tera> = None;

        for dir in dirs {
            if !dir.is_dir() {
                tracing::warn!(dir = %dir.display(), "テンプレートディレクトリが存在しないためスキップ");
                continue;
            }

            let loaded = load_root(dir)?;
            tracing::debug!(
                dir = %dir.display(),
                count = loaded.get_template_names().count(),
                "テンプレートを読み込み"
            );

            match engine.as_mut() {
                // 既存のテンプレートは上書きされないため、先に読み込んだルートが優先される
                Some(current) => current
                    .extend(&loaded)
                    .map_err(|e| NotificationError::TemplateFailed(describe(&e)))?,
                None => engine = Some(loaded),
            }
        }

        Ok(Self::from_engine(engine.unwrap_or_default()))
    }

    /// 構築済みの tera インスタンスから作成する
    pub fn from_engine(engine: Tera) -> Self {
        Self { engine }
    }

    /// 名前付きの文字列テンプレートから作成する
    pub fn from_raw_templates(templates: &[(&str, &str)]) -> Result<Self, NotificationError> {
        let mut engine = Tera::default();
        engine
            .add_raw_templates(templates.iter().copied())
            .map_err(|e| NotificationError::TemplateFailed(describe(&e)))?;
        Ok(Self::from_engine(engine))
    }

    /// 通知のテンプレートを 1 つレンダリングする
    ///
    /// `name` の候補パス（[`Notification::template_candidates`]）を順に調べ、
    /// 最初に存在するテンプレートを使う。
    ///
    /// # エラー
    ///
    /// - `TemplateNotFound`: どの候補パスにもテンプレートがない
    /// - `TemplateFailed`: 構文エラー・未定義変数などのレンダリング失敗
    pub fn render_template(
        &self,
        notification: &Notification,
        recipient: Option<&User>,
        name: &str,
    ) -> Result<String, NotificationError> {
        let candidates = notification.template_candidates(name);
        let Some(found) = candidates.iter().find(|candidate| self.has_template(candidate)) else {
            return Err(NotificationError::TemplateNotFound { candidates });
        };

        let context = build_context(notification, recipient);
        self.engine
            .render(found, &context)
            .map_err(|e| NotificationError::TemplateFailed(describe(&e)))
    }

    /// 通知からメールメッセージを生成する
    ///
    /// `subject.txt` と `message.txt` は必須、`message.html` は任意。
    pub fn render_email(
        &self,
        notification: &Notification,
        recipient: Option<&User>,
        from_address: &str,
    ) -> Result<EmailMessage, NotificationError> {
        let subject =
            collapse_subject(&self.render_template(notification, recipient, SUBJECT_TEMPLATE)?)?;
        let text_body = self.render_template(notification, recipient, TEXT_TEMPLATE)?;

        let html_body = match self.render_template(notification, recipient, HTML_TEMPLATE) {
            Ok(html) => Some(html),
            Err(e) if e.is_template_not_found() => None,
            Err(e) => return Err(e),
        };

        Ok(EmailMessage {
            from: from_address.to_string(),
            to: notification.email().as_str().to_string(),
            subject,
            text_body,
            html_body,
        })
    }

    fn has_template(&self, name: &str) -> bool {
        self.engine.get_template_names().any(|n| n == name)
    }
}

fn load_root(dir: &Path) -> Result<Tera, NotificationError> {
    let glob = format!("{}/**/*", dir.display());
    Tera::new(&glob).map_err(|e| {
        NotificationError::TemplateFailed(format!(
            "テンプレートの読み込みに失敗 ({}): {}",
            dir.display(),
            describe(&e)
        ))
    })
}

/// テンプレートに渡すコンテキストを構築する
///
/// 組み込みキー（`event`, `target`, `recipient`）を先に入れ、保存済みのコンテキストで上書きする。
fn build_context(notification: &Notification, recipient: Option<&User>) -> Context {
    let event = notification.event();

    let mut context = Context::new();
    context.insert("event", event);
    context.insert("target", &event.target());
    context.insert("recipient", &recipient);

    for (key, value) in notification.context() {
        context.insert(key.as_str(), value);
    }

    context
}

/// 件名を 1 行にまとめる（メールヘッダーは改行を含められない）
fn collapse_subject(rendered: &str) -> Result<String, NotificationError> {
    let subject = rendered
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

    if subject.is_empty() {
        return Err(NotificationError::TemplateFailed(
            "件名が空です".to_string(),
        ));
    }

    Ok(subject)
}

/// tera のエラーは原因がネストするため、source を連結して 1 行にする
fn describe(error: &tera::Error) -> String {
    let mut message = error.to_string();
    let mut source = std::error::Error::source(error);
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

#[cfg(test)]
mod tests {
    use chrono::DateTime;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use serde_json::{Value, json};
    use tsunami_notify_domain::{
        event::{Event, EventId, EventType, NewEvent},
        notification::{NewNotification, NotificationId},
        user::{Email, UserId},
    };

    use super::*;

    fn make_notification(event_type: &str, target: Option<Value>, context: Value) -> Notification {
        let now = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let event = Event::new(NewEvent {
            id: EventId::new(),
            event_type: EventType::new(event_type).unwrap(),
            target,
            data: json!({"plan": "pro"}),
            now,
        });
        Notification::new(NewNotification {
            id: NotificationId::new(),
            event,
            email: Email::new("x@example.com").unwrap(),
            context: context.as_object().cloned(),
            now,
        })
    }

    fn signup() -> Notification {
        make_notification("user.signup", Some(json!({"username": "alice"})), json!({}))
    }

    fn make_user() -> User {
        User::new(
            UserId::new(),
            Email::new("X@Example.com").unwrap(),
            "alice",
            DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
        )
    }

    #[test]
    fn test_候補パスの最初に見つかったテンプレートを使う() {
        let renderer = TemplateRenderer::from_raw_templates(&[
            ("tsunami_notify/user.signup/subject.txt", "flat"),
            ("tsunami_notify/user/signup/subject.txt", "nested"),
        ])
        .unwrap();

        let rendered = renderer.render_template(&signup(), None, "subject.txt").unwrap();

        assert_eq!(rendered, "flat");
    }

    #[test]
    fn test_ドット区切りがない場合はネストしたディレクトリにフォールバックする() {
        let renderer = TemplateRenderer::from_raw_templates(&[(
            "tsunami_notify/user/signup/subject.txt",
            "nested",
        )])
        .unwrap();

        let rendered = renderer.render_template(&signup(), None, "subject.txt").unwrap();

        assert_eq!(rendered, "nested");
    }

    #[test]
    fn test_テンプレートがない場合は候補パスを列挙してエラーになる() {
        let renderer = TemplateRenderer::from_raw_templates(&[]).unwrap();

        let err = renderer.render_template(&signup(), None, "subject.txt").unwrap_err();

        match err {
            NotificationError::TemplateNotFound { candidates } => assert_eq!(
                candidates,
                vec![
                    "tsunami_notify/user.signup/subject.txt".to_string(),
                    "tsunami_notify/user/signup/subject.txt".to_string(),
                ]
            ),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_イベントとターゲットと受信者をコンテキストに渡す() {
        let renderer = TemplateRenderer::from_raw_templates(&[(
            "tsunami_notify/user.signup/message.txt",
            "{{ event.event_type }} {{ event.data.plan }} {{ target.username }} {{ recipient.username }}",
        )])
        .unwrap();
        let user = make_user();

        let rendered = renderer
            .render_template(&signup(), Some(&user), "message.txt")
            .unwrap();

        assert_eq!(rendered, "user.signup pro alice alice");
    }

    #[test]
    fn test_受信者がいない場合はnullになる() {
        let renderer = TemplateRenderer::from_raw_templates(&[(
            "tsunami_notify/user.signup/message.txt",
            "{% if recipient %}known{% else %}anonymous{% endif %}",
        )])
        .unwrap();

        let rendered = renderer.render_template(&signup(), None, "message.txt").unwrap();

        assert_eq!(rendered, "anonymous");
    }

    #[test]
    fn test_保存済みコンテキストは組み込みキーを上書きする() {
        let renderer = TemplateRenderer::from_raw_templates(&[(
            "tsunami_notify/user.signup/message.txt",
            "{{ target }} {{ coupon }}",
        )])
        .unwrap();
        let notification = make_notification(
            "user.signup",
            Some(json!({"username": "alice"})),
            json!({"target": "override", "coupon": "WELCOME10"}),
        );

        let rendered = renderer
            .render_template(&notification, None, "message.txt")
            .unwrap();

        assert_eq!(rendered, "override WELCOME10");
    }

    #[test]
    fn test_未定義変数はtemplate_failedになる() {
        let renderer = TemplateRenderer::from_raw_templates(&[(
            "tsunami_notify/user.signup/message.txt",
            "{{ missing.value }}",
        )])
        .unwrap();

        let err = renderer.render_template(&signup(), None, "message.txt").unwrap_err();

        assert!(matches!(err, NotificationError::TemplateFailed(_)));
    }

    #[test]
    fn test_html本文がなくてもメールを生成できる() {
        let renderer = TemplateRenderer::from_raw_templates(&[
            ("tsunami_notify/user.signup/subject.txt", "Welcome"),
            ("tsunami_notify/user.signup/message.txt", "Hello"),
        ])
        .unwrap();

        let email = renderer
            .render_email(&signup(), None, "webmaster@localhost")
            .unwrap();

        assert_eq!(
            email,
            EmailMessage {
                from:      "webmaster@localhost".to_string(),
                to:        "x@example.com".to_string(),
                subject:   "Welcome".to_string(),
                text_body: "Hello".to_string(),
                html_body: None,
            }
        );
    }

    #[test]
    fn test_html本文は自動エスケープされる() {
        let renderer = TemplateRenderer::from_raw_templates(&[
            ("tsunami_notify/user.signup/subject.txt", "Welcome"),
            ("tsunami_notify/user.signup/message.txt", "Hello {{ name }}"),
            ("tsunami_notify/user.signup/message.html", "<p>Hello {{ name }}</p>"),
        ])
        .unwrap();
        let notification = make_notification("user.signup", None, json!({"name": "<b>bob</b>"}));

        let email = renderer
            .render_email(&notification, None, "webmaster@localhost")
            .unwrap();

        assert_eq!(email.text_body, "Hello <b>bob</b>");
        assert_eq!(
            email.html_body.as_deref(),
            Some("<p>Hello &lt;b&gt;bob&lt;&#x2F;b&gt;</p>")
        );
    }

    #[rstest]
    #[case(&[("tsunami_notify/user.signup/message.txt", "Hello")])]
    #[case(&[("tsunami_notify/user.signup/subject.txt", "Welcome")])]
    fn test_件名か本文のテンプレートがない場合は生成に失敗する(#[case] templates: &[(&str, &str)]) {
        let renderer = TemplateRenderer::from_raw_templates(templates).unwrap();

        let err = renderer
            .render_email(&signup(), None, "webmaster@localhost")
            .unwrap_err();

        assert!(err.is_template_not_found());
    }

    #[test]
    fn test_html本文のレンダリング失敗は不在とは区別してエラーにする() {
        let renderer = TemplateRenderer::from_raw_templates(&[
            ("tsunami_notify/user.signup/subject.txt", "Welcome"),
            ("tsunami_notify/user.signup/message.txt", "Hello"),
            ("tsunami_notify/user.signup/message.html", "{{ missing.value }}"),
        ])
        .unwrap();

        let err = renderer
            .render_email(&signup(), None, "webmaster@localhost")
            .unwrap_err();

        assert!(matches!(err, NotificationError::TemplateFailed(_)));
    }

    #[rstest]
    #[case("Welcome\n", "Welcome")]
    #[case("  Welcome\n  to   Tsunami \n\n", "Welcome to   Tsunami")]
    fn test_件名は1行にまとめる(#[case] rendered: &str, #[case] expected: &str) {
        assert_eq!(collapse_subject(rendered).unwrap(), expected);
    }

    #[test]
    fn test_空の件名はエラー() {
        let err = collapse_subject(" \n \n").unwrap_err();

        assert!(matches!(err, NotificationError::TemplateFailed(_)));
    }

    #[test]
    fn test_存在しないディレクトリはスキップする() {
        let renderer =
            TemplateRenderer::load(&[PathBuf::from("/nonexistent/tsunami-notify/templates")])
                .unwrap();

        assert_eq!(renderer.engine.get_template_names().count(), 0);
    }

    #[test]
    fn test_先に指定したルートのテンプレートが優先される() {
        let base = std::env::temp_dir().join(format!("tsunami-notify-{}", uuid::Uuid::new_v4()));
        let high = base.join("high");
        let low = base.join("low");
        for (root, body) in [(&high, "high"), (&low, "low")] {
            let dir = root.join("tsunami_notify/user.signup");
            std::fs::create_dir_all(&dir).unwrap();
            std::fs::write(dir.join("subject.txt"), body).unwrap();
        }
        let only_low = low.join("tsunami_notify/user.signup/message.txt");
        std::fs::write(&only_low, "from low").unwrap();

        let renderer = TemplateRenderer::load(&[high.clone(), low.clone()]).unwrap();

        let subject = renderer.render_template(&signup(), None, "subject.txt").unwrap();
        let message = renderer.render_template(&signup(), None, "message.txt").unwrap();
        std::fs::remove_dir_all(&base).unwrap();

        assert_eq!(subject, "high");
        assert_eq!(message, "from low");
    }
}
