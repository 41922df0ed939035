use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScraperError {
    #[error("設定が不足しています: {}", .0.join(", "))]
    MissingConfiguration(Vec<&'static str>),

    #[error("ブラウザ初期化エラー: {0}")]
    BrowserInit(String),

    #[error("ナビゲーションエラー: {0}")]
    Navigation(String),

    #[error("ブラウザ操作エラー: {0}")]
    Browser(String),

    #[error("ブラウザとの接続が切れました: {0}")]
    BrowserDisconnected(String),

    #[error("タイムアウト: {locator} が {timeout:?} 以内に見つかりません")]
    PresenceTimeout { locator: String, timeout: Duration },

    #[error("ログインフォームが見つかりません: {locator} ({timeout:?})")]
    LoginFormNotFound { locator: String, timeout: Duration },

    #[error("ログインエラー: {timeout:?} 以内にダッシュボードが表示されません (認証情報の誤り、またはサーバー遅延)")]
    AuthenticationTimeout { timeout: Duration },

    #[error("タイムアウト: 日付フィルタ適用後 {timeout:?} 以内にURLが変わりません")]
    FilterTimeout { timeout: Duration },

    #[error("要素に属性がありません: {locator} の {attribute}")]
    MissingAttribute { locator: String, attribute: String },

    #[error("ダウンロードエラー: HTTPステータス {status}")]
    DownloadFailed { status: u16 },

    #[error("HTTPエラー: {0}")]
    Http(#[from] reqwest::Error),

    #[error("URLエラー: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("CSVパースエラー: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSONエラー: {0}")]
    Json(#[from] serde_json::Error),

    #[error("ファイル操作エラー: {0}")]
    FileIO(#[from] std::io::Error),
}

impl ScraperError {
    /// 待機タイムアウト系のエラーかどうか
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            ScraperError::PresenceTimeout { .. }
                | ScraperError::LoginFormNotFound { .. }
                | ScraperError::AuthenticationTimeout { .. }
                | ScraperError::FilterTimeout { .. }
        )
    }

    /// ポーリング中に再試行しても意味がないエラー
    pub fn is_disconnected(&self) -> bool {
        matches!(self, ScraperError::BrowserDisconnected(_))
    }
}
