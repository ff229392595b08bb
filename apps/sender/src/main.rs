//! # send-notifications
//!
//! 未送信の通知をメール送信するバッチコマンド。
//!
//! ## 使い方
//!
//! ```bash
//! # 未送信の通知を 1 回送信（失敗があれば終了コード 1）
//! send-notifications
//!
//! # 60 秒ごとに送信を繰り返す（Ctrl-C で停止）
//! send-notifications --run-forever
//!
//! # 指定した通知を送信状態に関係なく送信
//! send-notifications --id 0190c1a4-... --id 0190c1a5-...
//! ```
//!
//! 環境変数は [`tsunami_notify_sender::config`] を参照。

use std::{process::ExitCode, sync::Arc};

use anyhow::Context as _;
use clap::Parser;
use tracing::Instrument as _;
use tsunami_notify_domain::{clock::SystemClock, notification::NotificationId};
use tsunami_notify_infra::{
    db,
    repository::{PostgresNotificationRepository, PostgresUserRepository},
};
use tsunami_notify_sender::{
    config::SenderConfig,
    runner::{self, POLL_INTERVAL, Selection},
    usecase::{NotificationService, TemplateRenderer, TracingDeliveryReporter},
};
use tsunami_notify_shared::observability::{TracingConfig, init_tracing};
use uuid::Uuid;

/// 未送信の通知メールを送信する
#[derive(Debug, Parser)]
#[command(name = "send-notifications", version)]
struct Cli {
    /// 60 秒ごとに送信を繰り返す（Ctrl-C で停止）
    #[arg(long = "run-forever", alias = "run_forever", conflicts_with = "ids")]
    run_forever: bool,

    /// 指定した通知のみを送信する（送信済みでも再送、複数指定可）
    #[arg(long = "id", value_name = "UUID")]
    ids: Vec<Uuid>,

    /// 送信前にデータベースマイグレーションを適用する
    #[arg(long)]
    migrate: bool,
}

/// サービス名（ログのルートスパンに付与する）
const SERVICE_NAME: &str = "send-notifications";

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    // .env ファイルを読み込む（存在する場合）
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let tracing_config = TracingConfig::from_env(SERVICE_NAME);
    init_tracing(&tracing_config);

    let span = tracing::info_span!("app", service = %tracing_config.service_name);
    run(cli).instrument(span).await
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let config = SenderConfig::from_env().context("設定の読み込みに失敗しました")?;

    let pool = db::create_pool(&config.database_url)
        .await
        .context("データベースに接続できません")?;
    if cli.migrate {
        db::run_migrations(&pool)
            .await
            .context("マイグレーションの適用に失敗しました")?;
        tracing::info!("マイグレーションを適用");
    }

    let renderer = TemplateRenderer::load(&config.template_dirs)
        .context("テンプレートの読み込みに失敗しました")?;

    let service = NotificationService::new(
        Arc::new(PostgresNotificationRepository::new(pool.clone())),
        Arc::new(PostgresUserRepository::new(pool)),
        config.mail.build_transport().await,
        renderer,
        Arc::new(TracingDeliveryReporter),
        Arc::new(SystemClock),
        config.from_address.clone(),
    );

    let mut stdout = std::io::stdout();

    if cli.run_forever {
        let shutdown_rx = runner::watch_shutdown(tokio::signal::ctrl_c());
        runner::run_forever(&service, POLL_INTERVAL, shutdown_rx, &mut stdout).await;
        return Ok(ExitCode::SUCCESS);
    }

    let selection = if cli.ids.is_empty() {
        Selection::Unsent
    } else {
        Selection::Ids(cli.ids.into_iter().map(NotificationId::from_uuid).collect())
    };

    match runner::run_once(&service, &selection, &mut stdout).await {
        Ok(_) => Ok(ExitCode::SUCCESS),
        Err(e) => {
            runner::log_run_error(&e);
            eprintln!("{e}");
            Ok(ExitCode::FAILURE)
        }
    }
}
