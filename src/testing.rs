//! テスト用のブラウザバックエンド
//!
//! 画面遷移はクリック・Enter に登録した反応関数で表現する。

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::config::Timeouts;
use crate::error::ScraperError;
use crate::traits::{BrowserDriver, Locator, SessionCookie};

pub(crate) fn fast_timeouts() -> Timeouts {
    Timeouts {
        element: Duration::from_millis(100),
        dashboard: Duration::from_millis(200),
        filter: Duration::from_millis(100),
        poll_interval: Duration::from_millis(5),
        download: Duration::from_secs(5),
    }
}

/// 初期ページ状態
#[derive(Default)]
pub(crate) struct FakePage {
    url: String,
    elements: Vec<Locator>,
    attributes: Vec<(Locator, String, String)>,
    cookies: Vec<SessionCookie>,
}

impl FakePage {
    pub(crate) fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
            ..Default::default()
        }
    }

    pub(crate) fn with_element(mut self, locator: Locator) -> Self {
        self.elements.push(locator);
        self
    }

    pub(crate) fn with_attribute(mut self, locator: Locator, name: &str, value: &str) -> Self {
        self.attributes
            .push((locator, name.to_string(), value.to_string()));
        self
    }

    pub(crate) fn with_cookie(mut self, name: &str, value: &str, domain: &str) -> Self {
        self.cookies.push(SessionCookie {
            name: name.to_string(),
            value: value.to_string(),
            domain: domain.to_string(),
            path: "/".to_string(),
        });
        self
    }
}

pub(crate) type Reaction = Arc<dyn Fn(&mut FakeState) + Send + Sync>;

#[derive(Default)]
pub(crate) struct FakeState {
    pub(crate) url: String,
    pub(crate) present: HashSet<Locator>,
    pub(crate) pending: HashMap<Locator, usize>,
    pub(crate) values: HashMap<Locator, String>,
    pub(crate) attributes: HashMap<(Locator, String), String>,
    pub(crate) cookies: Vec<SessionCookie>,
    pub(crate) events: Vec<String>,
    /// 次の N 回の URL 読み取りを遷移中のエラーにする
    pub(crate) failed_url_reads: usize,
    pub(crate) failed_presence_checks: usize,
    pub(crate) disconnected: bool,
    on_click: HashMap<Locator, Reaction>,
    on_enter: HashMap<Locator, Reaction>,
}

pub(crate) struct FakeDriver {
    state: Mutex<FakeState>,
    closed: Arc<AtomicBool>,
}

impl FakeDriver {
    pub(crate) fn new(page: FakePage) -> Self {
        let state = FakeState {
            url: page.url,
            present: page.elements.into_iter().collect(),
            attributes: page
                .attributes
                .into_iter()
                .map(|(loc, name, value)| ((loc, name), value))
                .collect(),
            cookies: page.cookies,
            ..Default::default()
        };
        Self {
            state: Mutex::new(state),
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    fn with_state<T>(&self, f: impl FnOnce(&mut FakeState) -> T) -> T {
        let mut state = self.state.lock().unwrap();
        f(&mut state)
    }

    /// `checks` 回目の存在確認で現れる要素
    pub(crate) fn reveal_after(&self, locator: Locator, checks: usize) {
        self.with_state(|s| {
            s.pending.insert(locator, checks);
        });
    }

    pub(crate) fn on_click(&self, locator: Locator, reaction: impl Fn(&mut FakeState) + Send + Sync + 'static) {
        self.with_state(|s| {
            s.on_click.insert(locator, Arc::new(reaction));
        });
    }

    pub(crate) fn on_enter(&self, locator: Locator, reaction: impl Fn(&mut FakeState) + Send + Sync + 'static) {
        self.with_state(|s| {
            s.on_enter.insert(locator, Arc::new(reaction));
        });
    }

    /// 遷移を起こし、直後の URL 読み取りを1回失敗させる
    pub(crate) fn navigate_with_failed_read(&self, url: &str) {
        self.with_state(|s| {
            s.url = url.to_string();
            s.failed_url_reads += 1;
        });
    }

    pub(crate) fn fail_presence_checks(&self, times: usize) {
        self.with_state(|s| s.failed_presence_checks += times);
    }

    /// ブラウザが落ちた状態にする
    pub(crate) fn disconnect(&self) {
        self.with_state(|s| s.disconnected = true);
    }

    pub(crate) fn closed_flag(&self) -> Arc<AtomicBool> {
        self.closed.clone()
    }

    pub(crate) fn events(&self) -> Vec<String> {
        self.with_state(|s| s.events.clone())
    }

    pub(crate) fn value_of(&self, locator: &Locator) -> Option<String> {
        self.with_state(|s| s.values.get(locator).cloned())
    }

    pub(crate) fn url(&self) -> String {
        self.with_state(|s| s.url.clone())
    }

    fn require(state: &FakeState, locator: &Locator) -> Result<(), ScraperError> {
        if state.present.contains(locator) {
            Ok(())
        } else {
            Err(ScraperError::Browser(format!("no element {}", locator)))
        }
    }

    fn react(&self, locator: &Locator, enter: bool) -> Result<(), ScraperError> {
        let mut state = self.state.lock().unwrap();
        Self::require(&state, locator)?;
        let kind = if enter { "enter" } else { "click" };
        state.events.push(format!("{} {}", kind, locator));
        let table = if enter { &state.on_enter } else { &state.on_click };
        if let Some(reaction) = table.get(locator).cloned() {
            reaction(&mut *state);
        }
        Ok(())
    }
}

#[async_trait]
impl BrowserDriver for FakeDriver {
    async fn goto(&self, url: &str) -> Result<(), ScraperError> {
        self.with_state(|s| {
            s.events.push(format!("goto {}", url));
            s.url = url.to_string();
        });
        Ok(())
    }

    async fn is_present(&self, locator: &Locator) -> Result<bool, ScraperError> {
        self.with_state(|s| {
            if s.disconnected {
                return Err(ScraperError::BrowserDisconnected("connection closed".into()));
            }
            if s.failed_presence_checks > 0 {
                s.failed_presence_checks -= 1;
                return Err(ScraperError::Browser("Could not find node with given id".into()));
            }
            if let Some(remaining) = s.pending.get_mut(locator) {
                *remaining = remaining.saturating_sub(1);
                if *remaining == 0 {
                    s.pending.remove(locator);
                    s.present.insert(locator.clone());
                }
            }
            Ok(s.present.contains(locator))
        })
    }

    async fn clear(&self, locator: &Locator) -> Result<(), ScraperError> {
        self.with_state(|s| {
            Self::require(s, locator)?;
            s.events.push(format!("clear {}", locator));
            s.values.remove(locator);
            Ok(())
        })
    }

    async fn type_text(&self, locator: &Locator, text: &str) -> Result<(), ScraperError> {
        self.with_state(|s| {
            Self::require(s, locator)?;
            s.events.push(format!("type {}", locator));
            s.values.entry(locator.clone()).or_default().push_str(text);
            Ok(())
        })
    }

    async fn press_enter(&self, locator: &Locator) -> Result<(), ScraperError> {
        self.react(locator, true)
    }

    async fn click(&self, locator: &Locator) -> Result<(), ScraperError> {
        self.react(locator, false)
    }

    async fn attribute(
        &self,
        locator: &Locator,
        name: &str,
    ) -> Result<Option<String>, ScraperError> {
        self.with_state(|s| {
            Self::require(s, locator)?;
            Ok(s.attributes.get(&(locator.clone(), name.to_string())).cloned())
        })
    }

    async fn current_url(&self) -> Result<String, ScraperError> {
        self.with_state(|s| {
            if s.disconnected {
                return Err(ScraperError::BrowserDisconnected("connection closed".into()));
            }
            if s.failed_url_reads > 0 {
                s.failed_url_reads -= 1;
                return Err(ScraperError::Browser("Execution context was destroyed".into()));
            }
            Ok(s.url.clone())
        })
    }

    async fn cookies(&self) -> Result<Vec<SessionCookie>, ScraperError> {
        Ok(self.with_state(|s| s.cookies.clone()))
    }

    async fn screenshot(&self) -> Result<Vec<u8>, ScraperError> {
        Ok(b"\x89PNG".to_vec())
    }

    async fn close(&mut self) -> Result<(), ScraperError> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}
