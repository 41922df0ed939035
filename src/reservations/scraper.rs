//! 予約エクスポートのワークフロー
//!
//! ログイン → 予約一覧 → 日付フィルター → CSVエクスポート → JSON保存

use tracing::{info, warn};

use crate::config::ScraperConfig;
use crate::dates::DateRange;
use crate::error::ScraperError;
use crate::session::BrowserSession;
use crate::traits::BrowserDriver;

use super::export::resolve_export;
use super::filter::{apply_date_filter, open_reservations};
use super::login::Authenticator;
use super::normalize::{download_csv, normalize_csv, write_records};
use super::types::ExportOutcome;

/// 予約エクスポートスクレイパー
///
/// ブラウザセッションを所有し、[`ReservationScraper::execute`] の終了時に
/// 成否にかかわらず必ず閉じる。
pub struct ReservationScraper<D: BrowserDriver> {
    config: ScraperConfig,
    session: BrowserSession<D>,
}

impl<D: BrowserDriver> ReservationScraper<D> {
    pub fn new(driver: D, config: ScraperConfig) -> Self {
        let session = BrowserSession::new(driver, config.timeouts.clone());
        Self { config, session }
    }

    /// ログイン実行
    pub async fn login(&self) -> Result<(), ScraperError> {
        Authenticator::new(&self.config.credentials)
            .with_debug(self.config.debug)
            .login(&self.session)
            .await
    }

    /// 予約一覧を開いて日付フィルターを適用
    pub async fn filter(&self, range: &DateRange) -> Result<String, ScraperError> {
        open_reservations(&self.session).await?;
        apply_date_filter(&self.session, range).await
    }

    /// CSVをダウンロードして正規化し、ファイルに保存
    pub async fn export(&self, range: &DateRange) -> Result<ExportOutcome, ScraperError> {
        let export = resolve_export(&self.session).await?;
        let client = export.client(self.config.timeouts.download)?;
        let csv = download_csv(&client, &export.url).await?;

        let records = normalize_csv(&csv)?;
        info!("{} reservations found.", records.len());

        let output_path = self.config.output_dir.join(range.output_file_name());
        write_records(&output_path, &records)?;

        Ok(ExportOutcome {
            output_path,
            records,
        })
    }

    /// 一括実行（login → filter → export → close）
    ///
    /// どの段階で失敗してもブラウザは閉じてからエラーを返す。
    pub async fn execute(self, range: &DateRange) -> Result<ExportOutcome, ScraperError> {
        let outcome = self.run(range).await;

        info!("Closing browser...");
        match self.session.close().await {
            Ok(()) => info!("Browser closed."),
            Err(e) => warn!("Failed to close browser: {}", e),
        }

        outcome
    }

    async fn run(&self, range: &DateRange) -> Result<ExportOutcome, ScraperError> {
        self.login().await?;
        self.filter(range).await?;
        self.export(range).await
    }
}
