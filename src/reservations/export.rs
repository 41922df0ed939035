//! ブラウザセッションからHTTPクライアントへの受け渡し

use tracing::{debug, info};
use url::Url;

use crate::error::ScraperError;
use crate::session::BrowserSession;
use crate::traits::{BrowserDriver, Locator};

use super::types::ExportDescriptor;

const EXPORT_LINK: &str = "a.export";

/// リンクの href を現在のURL基準で絶対URLに解決
pub fn resolve_export_url(current_url: &str, href: &str) -> Result<Url, ScraperError> {
    Ok(Url::parse(current_url)?.join(href)?)
}

/// エクスポートリンクとクッキーを取得する
pub async fn resolve_export<D: BrowserDriver>(
    session: &BrowserSession<D>,
) -> Result<ExportDescriptor, ScraperError> {
    info!("Getting CSV export link...");
    let href = session
        .attribute(&Locator::css(EXPORT_LINK), "href")
        .await?;
    let current_url = session.current_url().await?;
    let url = resolve_export_url(&current_url, &href)?;

    let cookies = session.driver().cookies().await?;
    debug!(
        "Transferring {} cookies: {:?}",
        cookies.len(),
        cookies.iter().map(|c| c.name.as_str()).collect::<Vec<_>>()
    );

    Ok(ExportDescriptor { url, cookies })
}
