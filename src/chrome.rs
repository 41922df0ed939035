//! chromiumoxide による [`BrowserDriver`] 実装

use std::fmt::Display;
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::element::Element;
use chromiumoxide::error::CdpError;
use chromiumoxide::page::ScreenshotParams;
use chromiumoxide::Page;
use futures::StreamExt;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::config::ScraperConfig;
use crate::error::ScraperError;
use crate::traits::{BrowserDriver, Locator, SessionCookie};

const CLEAR_INPUT_JS: &str = r#"
    function() {
        this.value = '';
        this.dispatchEvent(new Event('input', { bubbles: true }));
        this.dispatchEvent(new Event('change', { bubbles: true }));
    }
"#;

/// CDP のエラーを分類する
///
/// WebSocket・チャネルが死んでいる場合は接続断、それ以外（ノードが無い、
/// 実行コンテキストが破棄された等）はページ側のエラーとして扱う。
fn cdp_error(context: impl Display, e: CdpError) -> ScraperError {
    match e {
        CdpError::Ws(_) | CdpError::Io(_) | CdpError::ChannelSendError(_) | CdpError::NoResponse => {
            ScraperError::BrowserDisconnected(format!("{}: {}", context, e))
        }
        other => ScraperError::Browser(format!("{}: {}", context, other)),
    }
}

/// Chrome 1プロセス + 1ページ
pub struct ChromeDriver {
    browser: Browser,
    page: Page,
    handler: JoinHandle<()>,
    user_data_dir: PathBuf,
}

impl ChromeDriver {
    /// ブラウザを起動して空のページを開く
    pub async fn launch(config: &ScraperConfig) -> Result<Self, ScraperError> {
        info!("Initializing Chrome...");

        // 実行ごとに専用のプロファイルディレクトリを使う
        let unique_id = format!(
            "{}-{}",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                .as_nanos()
        );
        let user_data_dir = std::env::temp_dir().join(format!("reservation-scraper-{}", unique_id));

        let mut builder = BrowserConfig::builder()
            .user_data_dir(&user_data_dir)
            .window_size(1920, 1080)
            .request_timeout(Duration::from_secs(60))
            .arg("--disable-blink-features=AutomationControlled")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-gpu");

        if !config.headless {
            builder = builder.with_head();
        }

        if let Some(path) = &config.chrome_path {
            builder = builder.chrome_executable(path);
        }

        if config.debug {
            builder = builder.arg("--enable-logging=stderr").arg("--v=1");
        }

        let browser_config = builder
            .build()
            .map_err(|e| ScraperError::BrowserInit(format!("ブラウザ設定エラー: {}", e)))?;

        let (browser, mut handler) = Browser::launch(browser_config)
            .await
            .map_err(|e| ScraperError::BrowserInit(e.to_string()))?;

        // ブラウザイベントハンドラをバックグラウンドで実行
        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                debug!("Browser event: {:?}", event);
            }
        });

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| ScraperError::BrowserInit(e.to_string()))?;

        info!("Chrome initialized");
        Ok(Self {
            browser,
            page,
            handler,
            user_data_dir,
        })
    }

    async fn element(&self, locator: &Locator) -> Result<Element, ScraperError> {
        let found = match (locator.to_css(), locator.to_xpath()) {
            (Some(css), _) => self.page.find_element(css).await,
            (None, Some(xpath)) => self.page.find_xpath(xpath).await,
            (None, None) => {
                return Err(ScraperError::Browser(format!("unsupported locator {}", locator)))
            }
        };
        found.map_err(|e| cdp_error(locator, e))
    }
}

#[async_trait]
impl BrowserDriver for ChromeDriver {
    async fn goto(&self, url: &str) -> Result<(), ScraperError> {
        let navigation_error = |e: CdpError| match cdp_error(url, e) {
            ScraperError::Browser(message) => ScraperError::Navigation(message),
            other => other,
        };
        self.page.goto(url).await.map_err(navigation_error)?;
        self.page
            .wait_for_navigation()
            .await
            .map_err(navigation_error)?;
        Ok(())
    }

    async fn is_present(&self, locator: &Locator) -> Result<bool, ScraperError> {
        match self.element(locator).await {
            Ok(_) => Ok(true),
            Err(e) if e.is_disconnected() => Err(e),
            Err(e) => {
                debug!("Not present yet: {}", e);
                Ok(false)
            }
        }
    }

    async fn clear(&self, locator: &Locator) -> Result<(), ScraperError> {
        self.element(locator)
            .await?
            .call_js_fn(CLEAR_INPUT_JS, false)
            .await
            .map_err(|e| cdp_error(format!("clear {}", locator), e))?;
        Ok(())
    }

    async fn type_text(&self, locator: &Locator, text: &str) -> Result<(), ScraperError> {
        self.element(locator)
            .await?
            .focus()
            .await
            .map_err(|e| cdp_error(format!("focus {}", locator), e))?
            .type_str(text)
            .await
            .map_err(|e| cdp_error(format!("type {}", locator), e))?;
        Ok(())
    }

    async fn press_enter(&self, locator: &Locator) -> Result<(), ScraperError> {
        self.element(locator)
            .await?
            .press_key("Enter")
            .await
            .map_err(|e| cdp_error(format!("Enter on {}", locator), e))?;
        Ok(())
    }

    async fn click(&self, locator: &Locator) -> Result<(), ScraperError> {
        self.element(locator)
            .await?
            .click()
            .await
            .map_err(|e| cdp_error(format!("click {}", locator), e))?;
        Ok(())
    }

    async fn attribute(
        &self,
        locator: &Locator,
        name: &str,
    ) -> Result<Option<String>, ScraperError> {
        self.element(locator)
            .await?
            .attribute(name)
            .await
            .map_err(|e| cdp_error(format!("attribute {} of {}", name, locator), e))
    }

    async fn current_url(&self) -> Result<String, ScraperError> {
        let url = self
            .page
            .evaluate("window.location.href")
            .await
            .map_err(|e| cdp_error("location", e))?;
        url.into_value::<String>()
            .map_err(|e| ScraperError::Browser(format!("location: {}", e)))
    }

    async fn cookies(&self) -> Result<Vec<SessionCookie>, ScraperError> {
        let cookies = self
            .page
            .get_cookies()
            .await
            .map_err(|e| cdp_error("cookies", e))?;

        Ok(cookies
            .into_iter()
            .map(|c| SessionCookie {
                name: c.name,
                value: c.value,
                domain: c.domain,
                path: c.path,
            })
            .collect())
    }

    async fn screenshot(&self) -> Result<Vec<u8>, ScraperError> {
        self.page
            .screenshot(ScreenshotParams::builder().full_page(true).build())
            .await
            .map_err(|e| cdp_error("screenshot", e))
    }

    async fn close(&mut self) -> Result<(), ScraperError> {
        let result = self
            .browser
            .close()
            .await
            .map(|_| ())
            .map_err(|e| cdp_error("close", e));

        if let Err(e) = self.browser.wait().await {
            debug!("Failed to wait for browser exit: {}", e);
        }
        self.handler.abort();

        if let Err(e) = std::fs::remove_dir_all(&self.user_data_dir) {
            debug!("Failed to remove {:?}: {}", self.user_data_dir, e);
        }

        result
    }
}
