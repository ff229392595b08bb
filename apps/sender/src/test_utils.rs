//! テスト用ユーティリティ
//!
//! 送信結果を記録するモックレポーターを提供する。
//! インフラ層のモック（`tsunami_notify_infra::mock`）と組み合わせて使う。

use std::sync::{Arc, Mutex};

use tsunami_notify_domain::notification::{Notification, NotificationError, NotificationId};
use tsunami_notify_infra::repository::InvalidNotification;

use crate::usecase::DeliveryReporter;

/// 送信結果を記録するモックレポーター
#[derive(Clone, Default)]
pub struct MockDeliveryReporter {
    sent:   Arc<Mutex<Vec<NotificationId>>>,
    failed: Arc<Mutex<Vec<(NotificationId, String)>>>,
}

impl MockDeliveryReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// 成功として報告された通知 ID（報告順）
    pub fn sent_ids(&self) -> Vec<NotificationId> {
        self.sent.lock().unwrap().clone()
    }

    /// 失敗として報告された通知 ID（報告順）
    pub fn failed_ids(&self) -> Vec<NotificationId> {
        self.failed
            .lock()
            .unwrap()
            .iter()
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// 失敗として報告されたエラーメッセージ（報告順）
    pub fn failure_messages(&self) -> Vec<String> {
        self.failed
            .lock()
            .unwrap()
            .iter()
            .map(|(_, message)| message.clone())
            .collect()
    }
}

impl DeliveryReporter for MockDeliveryReporter {
    fn sent(&self, notification: &Notification) {
        self.sent.lock().unwrap().push(notification.id().clone());
    }

    fn failed(&self, notification: &Notification, error: &NotificationError) {
        self.failed
            .lock()
            .unwrap()
            .push((notification.id().clone(), error.to_string()));
    }

    fn rejected(&self, invalid: &InvalidNotification) {
        self.failed
            .lock()
            .unwrap()
            .push((invalid.id.clone(), invalid.reason.clone()));
    }
}
