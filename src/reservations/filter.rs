//! 予約一覧の日付フィルター適用
//!
//! フィルター送信後はサーバー側でクエリ文字列付きのURLへ遷移するので、
//! URLの変化を「再描画完了」の合図として扱う。

use tracing::info;

use crate::dates::DateRange;
use crate::error::ScraperError;
use crate::session::BrowserSession;
use crate::traits::{BrowserDriver, Locator};

const RESERVATIONS_LINK_TEXT: &str = "Reservations";
const DATE_FROM_FIELD: &str = "reservation_filter[date_from_display]";
const DATE_TO_FIELD: &str = "reservation_filter[date_to_display]";
const SUBMIT_BUTTON: &str = "button[type='submit']";

/// ナビゲーションの「Reservations」から予約一覧を開く
///
/// フィルター入力欄が表示されるまで待ってから戻る。
pub async fn open_reservations<D: BrowserDriver>(
    session: &BrowserSession<D>,
) -> Result<(), ScraperError> {
    info!("Opening reservation list...");
    session
        .click(&Locator::link_text(RESERVATIONS_LINK_TEXT))
        .await?;
    session.wait_for(&Locator::name(DATE_FROM_FIELD), None).await
}

/// 日付フィルターを入力して送信し、URLが変わるまで待つ
///
/// 変化後のURLを返す。
pub async fn apply_date_filter<D: BrowserDriver>(
    session: &BrowserSession<D>,
    range: &DateRange,
) -> Result<String, ScraperError> {
    let date_from = range.from.display();
    let date_to = range.to.display();
    info!("Applying date filters: {} -> {}", date_from, date_to);

    let old_url = session.current_url().await?;

    session
        .replace_text(&Locator::name(DATE_FROM_FIELD), date_from)
        .await?;
    session
        .replace_text(&Locator::name(DATE_TO_FIELD), date_to)
        .await?;
    session.click(&Locator::css(SUBMIT_BUTTON)).await?;

    info!("Waiting for URL to update after applying filters...");
    let timeout = session.timeouts().filter;
    match session.wait_for_location_change(&old_url, timeout).await? {
        Some(new_url) => {
            info!("Filter applied: {}", new_url);
            Ok(new_url)
        }
        None => Err(ScraperError::FilterTimeout { timeout }),
    }
}
