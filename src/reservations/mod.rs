//! 予約エクスポートモジュール
//!
//! Little Hotelier の予約一覧を日付で絞り込み、CSVエクスポートを
//! JSONに変換して保存する

mod export;
mod filter;
mod login;
mod normalize;
mod scraper;
mod types;

pub use export::{resolve_export, resolve_export_url};
pub use filter::{apply_date_filter, open_reservations};
pub use login::{Authenticator, LoginStage};
pub use normalize::{download_csv, normalize_csv, write_records};
pub use scraper::ReservationScraper;
pub use types::{ExportDescriptor, ExportOutcome, ReservationRecord, ALLOWED_COLUMNS};
