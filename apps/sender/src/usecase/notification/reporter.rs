//! # 配信結果レポーター
//!
//! 通知 1 件ごとの送信結果を記録する注入可能な出力先。
//! 本番では構造化ログ（ビジネスイベント）として出力する。

use tsunami_notify_domain::notification::{Notification, NotificationError};
use tsunami_notify_infra::repository::InvalidNotification;
use tsunami_notify_shared::{
    event_log::{error as error_fields, event},
    log_business_event,
};

/// 配信結果の出力先
pub trait DeliveryReporter: Send + Sync {
    /// 送信に成功した（`sent_at` 記録済みの通知を受け取る）
    fn sent(&self, notification: &Notification);

    /// 送信に失敗した
    fn failed(&self, notification: &Notification, error: &NotificationError);

    /// 保存された行を通知として復元できず、送信できなかった
    fn rejected(&self, invalid: &InvalidNotification);
}

/// tracing のビジネスイベントとして出力するレポーター
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingDeliveryReporter;

impl DeliveryReporter for TracingDeliveryReporter {
    fn sent(&self, notification: &Notification) {
        log_business_event!(
            event.category = event::category::NOTIFICATION,
            event.action = event::action::NOTIFICATION_SENT,
            event.entity_type = event::entity_type::NOTIFICATION,
            event.entity_id = %notification.id(),
            event.result = event::result::SUCCESS,
            notification.event_type = %notification.event().event_type(),
            notification.recipient = %notification.email(),
            "通知メール送信成功"
        );
    }

    fn failed(&self, notification: &Notification, error: &NotificationError) {
        let (category, kind) = classify(error);
        log_business_event!(
            event.category = event::category::NOTIFICATION,
            event.action = event::action::NOTIFICATION_FAILED,
            event.entity_type = event::entity_type::NOTIFICATION,
            event.entity_id = %notification.id(),
            event.result = event::result::FAILURE,
            notification.event_type = %notification.event().event_type(),
            notification.recipient = %notification.email(),
            error.category = category,
            error.kind = kind,
            error = %error,
            "通知メール送信失敗"
        );
    }

    fn rejected(&self, invalid: &InvalidNotification) {
        log_business_event!(
            event.category = event::category::NOTIFICATION,
            event.action = event::action::NOTIFICATION_FAILED,
            event.entity_type = event::entity_type::NOTIFICATION,
            event.entity_id = %invalid.id,
            event.result = event::result::FAILURE,
            error.category = error_fields::category::INFRASTRUCTURE,
            error.kind = error_fields::kind::INVALID_DATA,
            error = %invalid.reason,
            "通知を復元できず送信失敗"
        );
    }
}

/// エラーを `error.category` / `error.kind` に分類する
fn classify(error: &NotificationError) -> (&'static str, &'static str) {
    match error {
        NotificationError::TemplateNotFound { .. } => (
            error_fields::category::TEMPLATE,
            error_fields::kind::TEMPLATE_NOT_FOUND,
        ),
        NotificationError::TemplateFailed(_) => (
            error_fields::category::TEMPLATE,
            error_fields::kind::TEMPLATE_RENDER,
        ),
        NotificationError::SendFailed(_) => (
            error_fields::category::EXTERNAL_SERVICE,
            error_fields::kind::MAIL_SEND,
        ),
        NotificationError::ConnectionFailed(_) => (
            error_fields::category::EXTERNAL_SERVICE,
            error_fields::kind::MAIL_CONNECTION,
        ),
        NotificationError::RecipientLookupFailed(_) | NotificationError::PersistFailed(_) => (
            error_fields::category::INFRASTRUCTURE,
            error_fields::kind::DATABASE,
        ),
    }
}
