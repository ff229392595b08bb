//! # 送信バッチ設定
//!
//! 環境変数から送信バッチの設定を読み込む。
//!
//! ## 環境変数一覧
//!
//! | 変数名 | 必須 | デフォルト | 説明 |
//! |--------|------|------------|------|
//! | `DATABASE_URL` | **Yes** | - | PostgreSQL 接続 URL |
//! | `NOTIFY_TEMPLATE_DIRS` | No | `templates` | テンプレートのルート（カンマ区切り、先頭ほど優先） |
//! | `DEFAULT_FROM_ADDRESS` | No | `webmaster@localhost` | 全体のデフォルト送信元 |
//! | `NOTIFY_FROM_ADDRESS` | No | - | 通知用の送信元（設定時は `DEFAULT_FROM_ADDRESS` より優先） |
//! | `MAIL_BACKEND` | No | `noop` | `smtp` / `ses` / `noop` |
//! | `SMTP_HOST` | No | `localhost` | SMTP ホスト |
//! | `SMTP_PORT` | No | `1025` | SMTP ポート |
//! | `SMTP_USERNAME` / `SMTP_PASSWORD` | No | - | SMTP 認証情報（両方設定するか、両方未設定） |
//!
//! テストでプロセスの環境変数を書き換えずに済むよう、読み込みは
//! [`SenderConfig::from_lookup`] に任意の参照関数を渡して行える。

use std::{env, path::PathBuf, str::FromStr, sync::Arc};

use strum::{Display, EnumString};
use thiserror::Error;
use tsunami_notify_infra::notification::{
    MailTransport,
    NoopMailTransport,
    SesMailTransport,
    SmtpMailTransport,
};

const DEFAULT_TEMPLATE_DIRS: &str = "templates";
const DEFAULT_FROM_ADDRESS: &str = "webmaster@localhost";
const DEFAULT_SMTP_HOST: &str = "localhost";
const DEFAULT_SMTP_PORT: u16 = 1025;

/// 設定読み込みエラー
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// 必須の環境変数が未設定
    #[error("{0} が設定されていません")]
    Missing(&'static str),

    /// 環境変数の値が不正
    #[error("{name} の値が不正です ({value:?}): {reason}")]
    Invalid {
        name:   &'static str,
        value:  String,
        reason: String,
    },
}

/// メール送信バックエンド
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum MailBackend {
    /// lettre による SMTP 送信
    Smtp,
    /// AWS SES v2
    Ses,
    /// 送信せずログ出力のみ
    #[default]
    Noop,
}

/// メール送信設定
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailConfig {
    pub backend:          MailBackend,
    pub smtp_host:        String,
    pub smtp_port:        u16,
    /// SMTP 認証情報（ユーザー名, パスワード）
    pub smtp_credentials: Option<(String, String)>,
}

impl MailConfig {
    /// 設定に応じたメール送信トランスポートを構築する
    ///
    /// SES の認証情報は AWS のデフォルトチェーン（環境変数・プロファイル等）から読み込む。
    pub async fn build_transport(&self) -> Arc<dyn MailTransport> {
        tracing::info!(backend = %self.backend, "メール送信バックエンドを初期化");
        match self.backend {
            MailBackend::Smtp => Arc::new(SmtpMailTransport::new(
                self.smtp_host.clone(),
                self.smtp_port,
                self.smtp_credentials.clone(),
            )),
            MailBackend::Ses => Arc::new(SesMailTransport::from_env().await),
            MailBackend::Noop => Arc::new(NoopMailTransport),
        }
    }
}

/// 送信バッチ全体の設定
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SenderConfig {
    pub database_url:  String,
    /// テンプレートのルートディレクトリ（先頭ほど優先）
    pub template_dirs: Vec<PathBuf>,
    /// 通知メールの送信元アドレス
    pub from_address:  String,
    pub mail:          MailConfig,
}

impl SenderConfig {
    /// 環境変数から設定を読み込む
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// 参照関数から設定を読み込む
    ///
    /// 空文字列の値は未設定として扱う。
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let database_url = get("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;

        let template_dirs = parse_template_dirs(
            &get("NOTIFY_TEMPLATE_DIRS").unwrap_or_else(|| DEFAULT_TEMPLATE_DIRS.to_string()),
        );

        let from_address = get("NOTIFY_FROM_ADDRESS")
            .or_else(|| get("DEFAULT_FROM_ADDRESS"))
            .unwrap_or_else(|| DEFAULT_FROM_ADDRESS.to_string());

        let backend = match get("MAIL_BACKEND") {
            Some(value) => parse_var("MAIL_BACKEND", &value)?,
            None => MailBackend::default(),
        };

        let smtp_port = match get("SMTP_PORT") {
            Some(value) => parse_var("SMTP_PORT", &value)?,
            None => DEFAULT_SMTP_PORT,
        };

        let smtp_credentials = match (get("SMTP_USERNAME"), get("SMTP_PASSWORD")) {
            (Some(username), Some(password)) => Some((username, password)),
            (None, None) => None,
            (Some(_), None) => {
                return Err(ConfigError::Invalid {
                    name:   "SMTP_PASSWORD",
                    value:  String::new(),
                    reason: "SMTP_USERNAME を設定する場合は必須です".to_string(),
                });
            }
            (None, Some(_)) => {
                return Err(ConfigError::Invalid {
                    name:   "SMTP_USERNAME",
                    value:  String::new(),
                    reason: "SMTP_PASSWORD を設定する場合は必須です".to_string(),
                });
            }
        };

        Ok(Self {
            database_url,
            template_dirs,
            from_address,
            mail: MailConfig {
                backend,
                smtp_host: get("SMTP_HOST").unwrap_or_else(|| DEFAULT_SMTP_HOST.to_string()),
                smtp_port,
                smtp_credentials,
            },
        })
    }
}

fn parse_template_dirs(value: &str) -> Vec<PathBuf> {
    value
        .split(',')
        .map(str::trim)
        .filter(|dir| !dir.is_empty())
        .map(PathBuf::from)
        .collect()
}

fn parse_var<T>(name: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
        name,
        value: value.to_string(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<SenderConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        SenderConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_database_urlのみでデフォルト値が使われる() {
        let config = load(&[("DATABASE_URL", "postgres://localhost/tsunami")]).unwrap();

        assert_eq!(
            config,
            SenderConfig {
                database_url:  "postgres://localhost/tsunami".to_string(),
                template_dirs: vec![PathBuf::from("templates")],
                from_address:  "webmaster@localhost".to_string(),
                mail:          MailConfig {
                    backend:          MailBackend::Noop,
                    smtp_host:        "localhost".to_string(),
                    smtp_port:        1025,
                    smtp_credentials: None,
                },
            }
        );
    }

    #[test]
    fn test_database_url未設定はエラー() {
        let err = load(&[]).unwrap_err();

        assert_eq!(err, ConfigError::Missing("DATABASE_URL"));
    }

    #[test]
    fn test_テンプレートディレクトリはカンマ区切りで優先順を保つ() {
        let config = load(&[
            ("DATABASE_URL", "postgres://localhost/tsunami"),
            ("NOTIFY_TEMPLATE_DIRS", "overrides, templates,,"),
        ])
        .unwrap();

        assert_eq!(
            config.template_dirs,
            vec![PathBuf::from("overrides"), PathBuf::from("templates")]
        );
    }

    #[rstest]
    #[case(&[], "webmaster@localhost")]
    #[case(&[("DEFAULT_FROM_ADDRESS", "site@example.com")], "site@example.com")]
    #[case(
        &[("DEFAULT_FROM_ADDRESS", "site@example.com"), ("NOTIFY_FROM_ADDRESS", "notify@example.com")],
        "notify@example.com"
    )]
    #[case(&[("NOTIFY_FROM_ADDRESS", "")], "webmaster@localhost")]
    fn test_送信元アドレスは通知用の設定を優先する(
        #[case] vars: &[(&str, &str)],
        #[case] expected: &str,
    ) {
        let mut all = vec![("DATABASE_URL", "postgres://localhost/tsunami")];
        all.extend_from_slice(vars);

        let config = load(&all).unwrap();

        assert_eq!(config.from_address, expected);
    }

    #[rstest]
    #[case("smtp", MailBackend::Smtp)]
    #[case("ses", MailBackend::Ses)]
    #[case("noop", MailBackend::Noop)]
    fn test_メールバックエンドをパースできる(#[case] value: &str, #[case] expected: MailBackend) {
        let config = load(&[
            ("DATABASE_URL", "postgres://localhost/tsunami"),
            ("MAIL_BACKEND", value),
        ])
        .unwrap();

        assert_eq!(config.mail.backend, expected);
    }

    #[test]
    fn test_不正なメールバックエンドはエラー() {
        let err = load(&[
            ("DATABASE_URL", "postgres://localhost/tsunami"),
            ("MAIL_BACKEND", "pigeon"),
        ])
        .unwrap_err();

        assert!(matches!(err, ConfigError::Invalid { name: "MAIL_BACKEND", .. }));
    }

    #[test]
    fn test_不正なsmtpポートはエラー() {
        let err = load(&[
            ("DATABASE_URL", "postgres://localhost/tsunami"),
            ("SMTP_PORT", "not-a-port"),
        ])
        .unwrap_err();

        assert!(matches!(err, ConfigError::Invalid { name: "SMTP_PORT", .. }));
    }

    #[test]
    fn test_smtp認証情報は両方そろって有効になる() {
        let config = load(&[
            ("DATABASE_URL", "postgres://localhost/tsunami"),
            ("SMTP_USERNAME", "mailer"),
            ("SMTP_PASSWORD", "secret"),
        ])
        .unwrap();

        assert_eq!(
            config.mail.smtp_credentials,
            Some(("mailer".to_string(), "secret".to_string()))
        );
    }

    #[test]
    fn test_smtp認証情報の片方だけはエラー() {
        let err = load(&[
            ("DATABASE_URL", "postgres://localhost/tsunami"),
            ("SMTP_USERNAME", "mailer"),
        ])
        .unwrap_err();

        assert!(matches!(err, ConfigError::Invalid { name: "SMTP_PASSWORD", .. }));
    }
}
