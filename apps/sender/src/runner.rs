//! # 送信バッチランナー
//!
//! 1 回だけ送信する単発モードと、一定間隔で繰り返すループモードを提供する。
//!
//! ## 失敗の扱い
//!
//! | モード | 一部の送信失敗 | DB・接続エラー |
//! |--------|---------------|----------------|
//! | 単発 | [`RunError::SendFailures`] を返す（終了コード 1） | エラーを返す（終了コード 1） |
//! | ループ | `error` レベルでログ出力して継続 | `error` レベルでログ出力して継続 |
//!
//! 送信に失敗した通知は未送信のまま残り、次の反復（または次回の起動）で再送される。

use std::{io::Write, time::Duration};

use tokio::sync::watch;
use tsunami_notify_domain::notification::NotificationId;

use crate::{
    error::RunError,
    usecase::{NotificationService, SendSummary},
};

/// ループモードの反復間隔
pub const POLL_INTERVAL: Duration = Duration::from_secs(60);

/// 送信対象の選び方
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// 未送信の通知すべて
    Unsent,
    /// 指定した通知（送信済みでも再送する）
    Ids(Vec<NotificationId>),
}

/// 送信バッチを 1 回実行し、結果を `out` に出力する
///
/// 成功件数は、成功が 1 件以上あるか失敗が 0 件の場合に出力する。
/// 失敗が 1 件以上あれば [`RunError::SendFailures`] を返す。
pub async fn run_once<W: Write>(
    service: &NotificationService,
    selection: &Selection,
    out: &mut W,
) -> Result<SendSummary, RunError> {
    let summary = match selection {
        Selection::Unsent => service.send_unsent().await?,
        Selection::Ids(ids) => service.send_by_ids(ids).await?,
    };

    if summary.succeeded > 0 || summary.failed == 0 {
        writeln!(out, "{} notification(s) sent.", summary.succeeded)?;
    }

    if summary.failed > 0 {
        return Err(RunError::SendFailures {
            failed: summary.failed,
        });
    }

    Ok(summary)
}

/// 停止を指示されるまで未送信の通知の送信を繰り返す
///
/// 各反復のエラーはログ出力のみで、ループは継続する。
/// `shutdown` が `true` になると、反復の間または待機中に停止する（送信中の反復は中断しない）。
pub async fn run_forever<W: Write>(
    service: &NotificationService,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
    out: &mut W,
) {
    tracing::info!(interval_secs = interval.as_secs(), "ループモードで送信を開始");

    loop {
        if *shutdown.borrow() {
            break;
        }

        if let Err(e) = run_once(service, &Selection::Unsent, out).await {
            log_run_error(&e);
        }

        let stop = tokio::select! {
            _ = tokio::time::sleep(interval) => false,
            changed = shutdown.changed() => match changed {
                Ok(()) => *shutdown.borrow(),
                // 送信側が破棄された場合は停止できないので、通常どおり待機する
                Err(_) => {
                    tokio::time::sleep(interval).await;
                    false
                }
            },
        };
        if stop {
            break;
        }
    }

    tracing::info!("停止シグナルを受信したため送信ループを終了");
}

/// `signal` の完了で停止を指示する受信側を返す
///
/// シグナルの待機に失敗した場合は停止を指示せず、送信側を保持し続ける。
pub fn watch_shutdown<F>(signal: F) -> watch::Receiver<bool>
where
    F: Future<Output = std::io::Result<()>> + Send + 'static,
{
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        match signal.await {
            Ok(()) => {
                let _ = shutdown_tx.send(true);
            }
            Err(e) => {
                tracing::error!(error = %e, "停止シグナルの待機に失敗しました");
                std::future::pending::<()>().await;
            }
        }
    });
    shutdown_rx
}

/// 反復のエラーをログ出力する
pub fn log_run_error(error: &RunError) {
    match error {
        RunError::SendFailures { failed } => {
            tracing::error!(failed = *failed, "{error}");
        }
        RunError::Notification(e) => {
            tracing::error!(error = %e, "送信バッチが中断されました");
        }
        RunError::Infra(e) => {
            tracing::error!(error = %e, span_trace = %e.span_trace(), "通知の読み込みに失敗しました");
        }
        RunError::Output(e) => {
            tracing::error!(error = %e, "結果の出力に失敗しました");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ポーリング間隔は60秒() {
        assert_eq!(POLL_INTERVAL, Duration::from_secs(60));
    }

    #[tokio::test]
    async fn test_シグナルを受けると停止を指示する() {
        let mut shutdown = watch_shutdown(async { Ok(()) });

        shutdown.changed().await.unwrap();

        assert!(*shutdown.borrow());
    }

    #[tokio::test]
    async fn test_シグナルの待機に失敗しても送信側は破棄されない() {
        let signal = async { Err::<(), _>(std::io::Error::other("no signal handler")) };
        let mut shutdown = watch_shutdown(signal);

        let changed = tokio::time::timeout(Duration::from_millis(50), shutdown.changed()).await;

        assert!(changed.is_err(), "停止も送信側の破棄も通知されないこと");
        assert!(!*shutdown.borrow());
    }
}
