use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::debug;

use crate::error::ScraperError;

pub const DEFAULT_WEBSITE_URL: &str = "https://app.littlehotelier.com/";

/// 待機時間の設定
#[derive(Debug, Clone, PartialEq)]
pub struct Timeouts {
    /// フォーム要素などの通常の出現待ち
    pub element: Duration,
    /// ログイン後のダッシュボード表示待ち
    pub dashboard: Duration,
    /// フィルター適用後のURL変化待ち
    pub filter: Duration,
    /// ポーリング間隔
    pub poll_interval: Duration,
    /// CSVダウンロードのHTTPタイムアウト
    pub download: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            element: Duration::from_secs(15),
            dashboard: Duration::from_secs(60),
            filter: Duration::from_secs(30),
            poll_interval: Duration::from_millis(250),
            download: Duration::from_secs(60),
        }
    }
}

/// ログイン情報（URL・ユーザー・パスワード）
///
/// `Debug` 出力ではパスワードを伏せる。
#[derive(Clone, PartialEq, Eq)]
pub struct AuthCredentials {
    pub url: String,
    pub identity: String,
    pub secret: String,
}

impl AuthCredentials {
    pub fn new(
        url: impl Into<String>,
        identity: impl Into<String>,
        secret: impl Into<String>,
    ) -> Self {
        Self {
            url: url.into(),
            identity: identity.into(),
            secret: secret.into(),
        }
    }
}

impl fmt::Debug for AuthCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthCredentials")
            .field("url", &self.url)
            .field("identity", &self.identity)
            .field("secret", &"********")
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct ScraperConfig {
    pub credentials: AuthCredentials,
    pub output_dir: PathBuf,
    pub headless: bool,
    pub debug: bool,
    pub chrome_path: Option<PathBuf>,
    pub timeouts: Timeouts,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            credentials: AuthCredentials::new(DEFAULT_WEBSITE_URL, "", ""),
            output_dir: PathBuf::from("."),
            headless: true,
            debug: false,
            chrome_path: None,
            timeouts: Timeouts::default(),
        }
    }
}

impl ScraperConfig {
    pub fn new(user_email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            credentials: AuthCredentials::new(DEFAULT_WEBSITE_URL, user_email, password),
            ..Default::default()
        }
    }

    pub fn with_website_url(mut self, url: impl Into<String>) -> Self {
        self.credentials.url = url.into();
        self
    }

    pub fn with_output_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_dir = path.into();
        self
    }

    pub fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn with_chrome_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.chrome_path = Some(path.into());
        self
    }

    pub fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// 必須項目（URL・メールアドレス・パスワード）がすべて揃っているか確認
    ///
    /// 欠けている項目はまとめて [`ScraperError::MissingConfiguration`] で返す。
    pub fn validate(&self) -> Result<(), ScraperError> {
        let mut missing = Vec::new();
        if self.credentials.url.trim().is_empty() {
            missing.push("WEBSITE_URL");
        }
        if self.credentials.identity.trim().is_empty() {
            missing.push("USER_EMAIL");
        }
        if self.credentials.secret.is_empty() {
            missing.push("USER_PASS");
        }

        if missing.is_empty() {
            Ok(())
        } else {
            Err(ScraperError::MissingConfiguration(missing))
        }
    }
}

/// `.env` 形式のテキストを解析（`KEY=value`、`#` 始まりはコメント）
pub fn parse_dotenv(contents: &str) -> HashMap<String, String> {
    contents
        .lines()
        .filter_map(|line| {
            let (key, value) = line.split_once('=')?;
            let key = key.trim();
            let key = key.strip_prefix("export ").unwrap_or(key).trim();
            if key.is_empty() || key.starts_with('#') {
                return None;
            }
            let value = value.trim().trim_matches('\'').trim_matches('"');
            Some((key.to_string(), value.to_string()))
        })
        .collect()
}

/// `.env` の値のうち、まだ設定されていない変数だけを選ぶ
pub fn missing_vars(
    vars: HashMap<String, String>,
    is_set: impl Fn(&str) -> bool,
) -> Vec<(String, String)> {
    let mut missing: Vec<_> = vars.into_iter().filter(|(key, _)| !is_set(key.as_str())).collect();
    missing.sort();
    missing
}

/// `.env` を読み込んで未設定の環境変数だけを補う
///
/// 既にプロセス環境にある値は上書きしない。ファイルが無ければ何もしない。
/// 環境変数を書き換えるので、他のスレッドを起動する前（tokio ランタイムの
/// 構築前）に呼ぶこと。
pub fn load_dotenv(path: &Path) -> std::io::Result<usize> {
    if !path.exists() {
        return Ok(0);
    }

    let vars = parse_dotenv(&std::fs::read_to_string(path)?);
    let missing = missing_vars(vars, |key| std::env::var_os(key).is_some());
    for (key, value) in &missing {
        std::env::set_var(key, value);
    }
    debug!("Loaded {} variables from {:?}", missing.len(), path);
    Ok(missing.len())
}
