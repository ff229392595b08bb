//! # テスト用モック
//!
//! ユースケーステストで使用するインメモリのモックリポジトリとメール送信。
//! `test-utils` feature を有効にすることで、他クレートからも利用可能。
//!
//! ```toml
//! [dev-dependencies]
//! tsunami-notify-infra = { workspace = true, features = ["test-utils"] }
//! ```

use std::{
    collections::HashSet,
    sync::{
        Arc,
        Mutex,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tsunami_notify_domain::{
    event::{Event, EventId},
    notification::{EmailMessage, Notification, NotificationError, NotificationId},
    user::{Email, User},
};

use crate::{
    error::InfraError,
    notification::{MailConnection, MailTransport},
    repository::{
        EventRepository,
        FetchedNotifications,
        InvalidNotification,
        NotificationRepository,
        UserRepository,
    },
};

// ===== MockEventRepository =====

#[derive(Clone, Default)]
pub struct MockEventRepository {
    events: Arc<Mutex<Vec<Event>>>,
}

impl MockEventRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EventRepository for MockEventRepository {
    async fn insert(&self, event: &Event) -> Result<(), InfraError> {
        self.events.lock().unwrap().push(event.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: &EventId) -> Result<Option<Event>, InfraError> {
        Ok(self
            .events
            .lock()
            .unwrap()
            .iter()
            .find(|e| e.id() == id)
            .cloned())
    }

    async fn delete(&self, id: &EventId) -> Result<bool, InfraError> {
        let mut events = self.events.lock().unwrap();
        let before = events.len();
        events.retain(|e| e.id() != id);
        Ok(events.len() < before)
    }
}

// ===== MockNotificationRepository =====

#[derive(Clone, Default)]
pub struct MockNotificationRepository {
    notifications: Arc<Mutex<Vec<Notification>>>,
    invalid:       Arc<Mutex<Vec<InvalidNotification>>>,
    fail_on_mark:  Arc<AtomicBool>,
    fail_on_find:  Arc<AtomicBool>,
}

impl MockNotificationRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_notification(&self, notification: Notification) {
        self.notifications.lock().unwrap().push(notification);
    }

    /// 復元できない未送信の行を追加する
    pub fn add_invalid(&self, id: NotificationId, reason: impl Into<String>) {
        self.invalid.lock().unwrap().push(InvalidNotification {
            id,
            reason: reason.into(),
        });
    }

    /// 保存されている通知のスナップショット
    pub fn notifications(&self) -> Vec<Notification> {
        self.notifications.lock().unwrap().clone()
    }

    /// 以降の `mark_sent` をエラーにする
    pub fn fail_on_mark_sent(&self) {
        self.fail_on_mark.store(true, Ordering::SeqCst);
    }

    /// 以降の検索をエラーにする
    pub fn fail_on_find(&self) {
        self.fail_on_find.store(true, Ordering::SeqCst);
    }

    fn check_find(&self) -> Result<(), InfraError> {
        if self.fail_on_find.load(Ordering::SeqCst) {
            return Err(InfraError::unexpected("mock: 検索失敗"));
        }
        Ok(())
    }

    fn sorted(mut notifications: Vec<Notification>) -> Vec<Notification> {
        notifications.sort_by_key(|n| (n.created_at(), *n.id().as_uuid()));
        notifications
    }
}

#[async_trait]
impl NotificationRepository for MockNotificationRepository {
    async fn insert(&self, notification: &Notification) -> Result<(), InfraError> {
        self.notifications.lock().unwrap().push(notification.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: &NotificationId) -> Result<Option<Notification>, InfraError> {
        self.check_find()?;
        Ok(self
            .notifications
            .lock()
            .unwrap()
            .iter()
            .find(|n| n.id() == id)
            .cloned())
    }

    async fn find_unsent(&self) -> Result<FetchedNotifications, InfraError> {
        self.check_find()?;
        let unsent = self
            .notifications
            .lock()
            .unwrap()
            .iter()
            .filter(|n| !n.is_sent())
            .cloned()
            .collect();
        Ok(FetchedNotifications {
            notifications: Self::sorted(unsent),
            invalid:       self.invalid.lock().unwrap().clone(),
        })
    }

    async fn find_by_ids(
        &self,
        ids: &[NotificationId],
    ) -> Result<FetchedNotifications, InfraError> {
        self.check_find()?;
        let found = self
            .notifications
            .lock()
            .unwrap()
            .iter()
            .filter(|n| ids.contains(n.id()))
            .cloned()
            .collect();
        let invalid = self
            .invalid
            .lock()
            .unwrap()
            .iter()
            .filter(|invalid| ids.contains(&invalid.id))
            .cloned()
            .collect();
        Ok(FetchedNotifications {
            notifications: Self::sorted(found),
            invalid,
        })
    }

    async fn mark_sent(
        &self,
        id: &NotificationId,
        sent_at: DateTime<Utc>,
    ) -> Result<(), InfraError> {
        if self.fail_on_mark.load(Ordering::SeqCst) {
            return Err(InfraError::unexpected("mock: 送信日時の記録に失敗"));
        }

        let mut notifications = self.notifications.lock().unwrap();
        let Some(index) = notifications.iter().position(|n| n.id() == id) else {
            return Err(InfraError::unexpected(format!(
                "送信日時を記録する通知が存在しません: {id}"
            )));
        };
        let updated = notifications[index].clone().mark_sent(sent_at);
        notifications[index] = updated;
        Ok(())
    }
}

// ===== MockUserRepository =====

#[derive(Clone, Default)]
pub struct MockUserRepository {
    users:        Arc<Mutex<Vec<User>>>,
    fail_on_find: Arc<AtomicBool>,
}

impl MockUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_user(&self, user: User) {
        self.users.lock().unwrap().push(user);
    }

    /// 以降の検索をエラーにする
    pub fn fail_on_find(&self) {
        self.fail_on_find.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl UserRepository for MockUserRepository {
    async fn find_by_email_ignore_case(&self, email: &Email) -> Result<Option<User>, InfraError> {
        if self.fail_on_find.load(Ordering::SeqCst) {
            return Err(InfraError::unexpected("mock: ユーザー検索失敗"));
        }
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.email().matches_ignore_case(email.as_str()))
            .cloned())
    }

    async fn insert(&self, user: &User) -> Result<(), InfraError> {
        self.users.lock().unwrap().push(user.clone());
        Ok(())
    }
}

// ===== MockMailTransport =====

/// 送信したメールを記録するモックのメール送信
///
/// 宛先単位の失敗と、接続そのものの失敗を注入できる。
#[derive(Clone, Default)]
pub struct MockMailTransport {
    sent:               Arc<Mutex<Vec<EmailMessage>>>,
    failing_recipients: Arc<Mutex<HashSet<String>>>,
    fail_on_connect:    Arc<AtomicBool>,
    connections:        Arc<AtomicUsize>,
}

impl MockMailTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// 指定した宛先への送信を失敗させる
    pub fn fail_for(&self, recipient: impl Into<String>) {
        self.failing_recipients.lock().unwrap().insert(recipient.into());
    }

    /// 以降の接続確立を失敗させる
    pub fn fail_on_connect(&self) {
        self.fail_on_connect.store(true, Ordering::SeqCst);
    }

    /// 送信に成功したメール
    pub fn sent_emails(&self) -> Vec<EmailMessage> {
        self.sent.lock().unwrap().clone()
    }

    /// 開いた接続の数
    pub fn connection_count(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MailTransport for MockMailTransport {
    async fn connect(&self) -> Result<Box<dyn MailConnection>, NotificationError> {
        if self.fail_on_connect.load(Ordering::SeqCst) {
            return Err(NotificationError::ConnectionFailed(
                "mock: 接続失敗".to_string(),
            ));
        }
        self.connections.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockMailConnection {
            sent:               self.sent.clone(),
            failing_recipients: self.failing_recipients.clone(),
        }))
    }
}

struct MockMailConnection {
    sent:               Arc<Mutex<Vec<EmailMessage>>>,
    failing_recipients: Arc<Mutex<HashSet<String>>>,
}

#[async_trait]
impl MailConnection for MockMailConnection {
    async fn send_email(&self, email: &EmailMessage) -> Result<(), NotificationError> {
        if self.failing_recipients.lock().unwrap().contains(&email.to) {
            return Err(NotificationError::SendFailed(format!(
                "mock: {} への送信失敗",
                email.to
            )));
        }
        self.sent.lock().unwrap().push(email.clone());
        Ok(())
    }
}
