//! ブラウザセッション制御
//!
//! バックエンドを1つ所有し、「条件が成立するまでタイムアウト付きでポーリング」
//! という待機プリミティブを提供する。

use std::future::Future;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::config::Timeouts;
use crate::error::ScraperError;
use crate::traits::{BrowserDriver, Locator};

pub struct BrowserSession<D: BrowserDriver> {
    driver: D,
    timeouts: Timeouts,
}

impl<D: BrowserDriver> BrowserSession<D> {
    pub fn new(driver: D, timeouts: Timeouts) -> Self {
        Self { driver, timeouts }
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn timeouts(&self) -> &Timeouts {
        &self.timeouts
    }

    /// 条件が `true` になるまで待機
    ///
    /// 成立すれば `Ok(true)`、タイムアウトしたら `Ok(false)`。最低1回は評価する。
    /// 評価中のエラー（ページ遷移中の DOM/JS エラーなど）は未成立として再試行し、
    /// ブラウザとの接続断だけは即座に返す。
    pub async fn wait_until<F, Fut>(
        &self,
        timeout: Duration,
        mut condition: F,
    ) -> Result<bool, ScraperError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<bool, ScraperError>>,
    {
        let start = Instant::now();
        loop {
            match condition().await {
                Ok(true) => {
                    debug!("Condition met after {:?}", start.elapsed());
                    return Ok(true);
                }
                Ok(false) => {}
                Err(e) if e.is_disconnected() => return Err(e),
                Err(e) => debug!("Check failed, retrying: {}", e),
            }
            if start.elapsed() >= timeout {
                return Ok(false);
            }
            sleep(self.timeouts.poll_interval).await;
        }
    }

    /// 要素が出現するまで待機（既定タイムアウト、または `timeout` で上書き）
    pub async fn wait_for(
        &self,
        locator: &Locator,
        timeout: Option<Duration>,
    ) -> Result<(), ScraperError> {
        let timeout = timeout.unwrap_or(self.timeouts.element);
        let driver = &self.driver;

        let present = self
            .wait_until(timeout, move || driver.is_present(locator))
            .await?;

        if present {
            Ok(())
        } else {
            warn!("Timed out after {:?} waiting for {}", timeout, locator);
            Err(ScraperError::PresenceTimeout {
                locator: locator.to_string(),
                timeout,
            })
        }
    }

    /// 現在URLが `previous` から変わるまで待機。変化後のURLを返す。
    pub async fn wait_for_location_change(
        &self,
        previous: &str,
        timeout: Duration,
    ) -> Result<Option<String>, ScraperError> {
        let driver = &self.driver;
        let seen = Mutex::new(None);
        let seen_ref = &seen;

        let changed = self
            .wait_until(timeout, move || async move {
                let url = driver.current_url().await?;
                if url == previous {
                    return Ok::<bool, ScraperError>(false);
                }
                *seen_ref.lock().await = Some(url);
                Ok(true)
            })
            .await?;

        if changed {
            Ok(seen.into_inner())
        } else {
            Ok(None)
        }
    }

    pub async fn goto(&self, url: &str) -> Result<(), ScraperError> {
        self.driver.goto(url).await
    }

    /// 出現を待ってから入力し、Enter で確定
    pub async fn submit_text(&self, locator: &Locator, text: &str) -> Result<(), ScraperError> {
        self.wait_for(locator, None).await?;
        self.driver.type_text(locator, text).await?;
        self.driver.press_enter(locator).await
    }

    /// 出現を待ってから既存の値を消して入力
    pub async fn replace_text(&self, locator: &Locator, text: &str) -> Result<(), ScraperError> {
        self.wait_for(locator, None).await?;
        self.driver.clear(locator).await?;
        self.driver.type_text(locator, text).await
    }

    pub async fn click(&self, locator: &Locator) -> Result<(), ScraperError> {
        self.wait_for(locator, None).await?;
        self.driver.click(locator).await
    }

    /// 出現を待ってから属性を読む。属性が無ければ `MissingAttribute`。
    pub async fn attribute(&self, locator: &Locator, name: &str) -> Result<String, ScraperError> {
        self.wait_for(locator, None).await?;
        self.driver
            .attribute(locator, name)
            .await?
            .ok_or_else(|| ScraperError::MissingAttribute {
                locator: locator.to_string(),
                attribute: name.to_string(),
            })
    }

    pub async fn current_url(&self) -> Result<String, ScraperError> {
        self.driver.current_url().await
    }

    /// デバッグ用スクリーンショットを base64 data URL でログ出力
    pub async fn log_screenshot(&self, label: &str) {
        use base64::Engine;

        match self.driver.screenshot().await {
            Ok(png) => {
                let encoded = base64::engine::general_purpose::STANDARD.encode(&png);
                debug!("{} screenshot: data:image/png;base64,{}", label, encoded);
            }
            Err(e) => debug!("Failed to capture {} screenshot: {}", label, e),
        }
    }

    /// セッションを閉じる
    pub async fn close(mut self) -> Result<(), ScraperError> {
        self.driver.close().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{fast_timeouts, FakeDriver, FakePage};

    #[tokio::test]
    async fn test_wait_for_present_element() {
        let driver = FakeDriver::new(FakePage::new("https://hotel.test/").with_element(Locator::css("a.export")));
        let session = BrowserSession::new(driver, fast_timeouts());

        session.wait_for(&Locator::css("a.export"), None).await.unwrap();
    }

    #[tokio::test]
    async fn test_wait_for_element_appearing_later() {
        let driver = FakeDriver::new(FakePage::new("https://hotel.test/"));
        driver.reveal_after(Locator::id("late"), 3);
        let session = BrowserSession::new(driver, fast_timeouts());

        session.wait_for(&Locator::id("late"), None).await.unwrap();
    }

    #[tokio::test]
    async fn test_wait_for_times_out_with_locator() {
        let driver = FakeDriver::new(FakePage::new("https://hotel.test/"));
        let session = BrowserSession::new(driver, fast_timeouts());

        let err = session
            .wait_for(&Locator::css("a.missing"), Some(Duration::from_millis(30)))
            .await
            .unwrap_err();

        match err {
            ScraperError::PresenceTimeout { locator, timeout } => {
                assert_eq!(locator, "css=a.missing");
                assert_eq!(timeout, Duration::from_millis(30));
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_wait_until_evaluates_at_least_once_with_zero_timeout() {
        let driver = FakeDriver::new(FakePage::new("https://hotel.test/"));
        let session = BrowserSession::new(driver, fast_timeouts());

        let mut calls = 0;
        let met = session
            .wait_until(Duration::ZERO, || {
                calls += 1;
                async { Ok::<bool, ScraperError>(true) }
            })
            .await
            .unwrap();
        assert!(met);
        assert_eq!(calls, 1);
    }

    #[tokio::test]
    async fn test_wait_until_retries_after_failed_check() {
        let driver = FakeDriver::new(FakePage::new("https://hotel.test/"));
        let session = BrowserSession::new(driver, fast_timeouts());

        let mut calls = 0;
        let met = session
            .wait_until(Duration::from_millis(100), || {
                calls += 1;
                let first = calls == 1;
                async move {
                    if first {
                        Err(ScraperError::Browser("Execution context was destroyed".into()))
                    } else {
                        Ok(true)
                    }
                }
            })
            .await
            .unwrap();
        assert!(met);
        assert_eq!(calls, 2);
    }

    #[tokio::test]
    async fn test_wait_until_stops_on_disconnect() {
        let driver = FakeDriver::new(FakePage::new("https://hotel.test/"));
        let session = BrowserSession::new(driver, fast_timeouts());

        let mut calls = 0;
        let err = session
            .wait_until(Duration::from_millis(100), || {
                calls += 1;
                async { Err::<bool, _>(ScraperError::BrowserDisconnected("ws closed".into())) }
            })
            .await
            .unwrap_err();
        assert!(err.is_disconnected());
        assert_eq!(calls, 1);
    }

    #[tokio::test]
    async fn test_location_change_survives_failed_url_read() {
        let driver = FakeDriver::new(FakePage::new("https://hotel.test/reservations"));
        driver.navigate_with_failed_read("https://hotel.test/reservations?page=1");
        let session = BrowserSession::new(driver, fast_timeouts());

        let url = session
            .wait_for_location_change("https://hotel.test/reservations", Duration::from_millis(100))
            .await
            .unwrap();
        assert_eq!(url.as_deref(), Some("https://hotel.test/reservations?page=1"));
    }

    #[tokio::test]
    async fn test_wait_for_tolerates_transient_dom_errors() {
        let driver = FakeDriver::new(FakePage::new("https://hotel.test/").with_element(Locator::css("a.export")));
        driver.fail_presence_checks(2);
        let session = BrowserSession::new(driver, fast_timeouts());

        session.wait_for(&Locator::css("a.export"), None).await.unwrap();
    }

    #[tokio::test]
    async fn test_wait_for_propagates_disconnect() {
        let driver = FakeDriver::new(FakePage::new("https://hotel.test/"));
        driver.disconnect();
        let session = BrowserSession::new(driver, fast_timeouts());

        let err = session.wait_for(&Locator::css("a.export"), None).await.unwrap_err();
        assert!(matches!(err, ScraperError::BrowserDisconnected(_)));
    }

    #[tokio::test]
    async fn test_attribute_missing() {
        let driver = FakeDriver::new(FakePage::new("https://hotel.test/").with_element(Locator::css("a.export")));
        let session = BrowserSession::new(driver, fast_timeouts());

        let err = session.attribute(&Locator::css("a.export"), "href").await.unwrap_err();
        assert!(matches!(err, ScraperError::MissingAttribute { .. }));
    }

    #[tokio::test]
    async fn test_close_releases_driver() {
        let driver = FakeDriver::new(FakePage::new("https://hotel.test/"));
        let closed = driver.closed_flag();
        let session = BrowserSession::new(driver, fast_timeouts());

        session.close().await.unwrap();
        assert!(closed.load(std::sync::atomic::Ordering::SeqCst));
    }
}
