//! # 送信バッチのエラー定義

use thiserror::Error;
use tsunami_notify_domain::notification::NotificationError;
use tsunami_notify_infra::InfraError;

/// 送信バッチ 1 回分の実行エラー
#[derive(Debug, Error)]
pub enum RunError {
    /// 一部の通知の送信に失敗した（バッチ自体は最後まで処理済み）
    #[error("{failed} notification(s) failed to send.")]
    SendFailures { failed: usize },

    /// 接続確立など、バッチ全体を中断する通知エラー
    #[error(transparent)]
    Notification(#[from] NotificationError),

    /// 通知の読み込みに失敗
    #[error("通知の読み込みに失敗: {0}")]
    Infra(#[from] InfraError),

    /// 結果の出力に失敗
    #[error("結果の出力に失敗: {0}")]
    Output(#[from] std::io::Error),
}
