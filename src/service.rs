use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use tower::Service;
use tracing::info;

use crate::chrome::ChromeDriver;
use crate::config::ScraperConfig;
use crate::dates::DateRange;
use crate::error::ScraperError;
use crate::reservations::{ExportOutcome, ReservationScraper};

/// エクスポートリクエスト
#[derive(Debug, Clone)]
pub struct ExportRequest {
    pub config: ScraperConfig,
    pub range: DateRange,
}

impl ExportRequest {
    pub fn new(config: ScraperConfig, range: DateRange) -> Self {
        Self { config, range }
    }
}

/// tower::Serviceを実装したエクスポートサービス
///
/// 1リクエストにつきChromeを1つ起動し、終了時に必ず閉じる。
#[derive(Debug, Clone, Default)]
pub struct ExportService {}

impl ExportService {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Service<ExportRequest> for ExportService {
    type Response = ExportOutcome;
    type Error = ScraperError;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: ExportRequest) -> Self::Future {
        info!(
            "Export request: user={}, range={} -> {}",
            req.config.credentials.identity, req.range.from, req.range.to
        );

        Box::pin(async move {
            // ブラウザを起動する前に設定を確認
            req.config.validate()?;

            let driver = ChromeDriver::launch(&req.config).await?;
            let outcome = ReservationScraper::new(driver, req.config)
                .execute(&req.range)
                .await?;

            info!(
                "Export finished: path={:?}, records={}",
                outcome.output_path,
                outcome.records.len()
            );
            Ok(outcome)
        })
    }
}
