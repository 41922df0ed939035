//! Little Hotelier 予約エクスポートライブラリ
//!
//! - ブラウザでログインし、予約一覧を日付範囲で絞り込む
//! - 画面のCSVエクスポートをブラウザのクッキーでダウンロード
//! - 必要な列だけを決まった順に並べてJSONで保存
//!
//! # 使用例
//!
//! ```rust,ignore
//! use reservation_scraper::{DateRange, ExportRequest, ExportService, ScraperConfig};
//! use tower::Service;
//!
//! #[tokio::main]
//! async fn main() {
//!     let mut service = ExportService::new();
//!
//!     let config = ScraperConfig::new("me@example.com", "password")
//!         .with_output_dir("./exports")
//!         .with_headless(false);
//!     let range = DateRange::parse("01-01-2025", "31-01-2025").unwrap();
//!
//!     let result = service.call(ExportRequest::new(config, range)).await.unwrap();
//!     println!("JSON saved: {:?}", result.output_path);
//! }
//! ```

pub mod chrome;
pub mod config;
pub mod dates;
pub mod error;
pub mod reservations;
pub mod service;
pub mod session;
pub mod traits;

#[cfg(test)]
mod testing;

// 主要な型をリエクスポート
pub use chrome::ChromeDriver;
pub use config::{AuthCredentials, ScraperConfig, Timeouts};
pub use dates::{DateEndpoint, DateInputError, DateRange};
pub use error::ScraperError;
pub use reservations::{ExportOutcome, ReservationRecord, ReservationScraper};
pub use service::{ExportRequest, ExportService};
pub use session::BrowserSession;
pub use traits::{BrowserDriver, Locator, SessionCookie};
