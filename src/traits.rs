use std::fmt;

use async_trait::async_trait;

use crate::error::ScraperError;

/// ページ上の要素の指定方法
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Locator {
    Css(String),
    Name(String),
    Id(String),
    XPath(String),
    /// `<a>` の表示テキスト完全一致
    LinkText(String),
}

impl Locator {
    pub fn css(selector: impl Into<String>) -> Self {
        Locator::Css(selector.into())
    }

    pub fn name(name: impl Into<String>) -> Self {
        Locator::Name(name.into())
    }

    pub fn id(id: impl Into<String>) -> Self {
        Locator::Id(id.into())
    }

    pub fn link_text(text: impl Into<String>) -> Self {
        Locator::LinkText(text.into())
    }

    /// CSSセレクタで表現できる場合はそれを返す
    pub fn to_css(&self) -> Option<String> {
        match self {
            Locator::Css(selector) => Some(selector.clone()),
            Locator::Name(name) => Some(format!("[name=\"{}\"]", name.replace('"', "\\\""))),
            Locator::Id(id) => Some(format!("[id=\"{}\"]", id.replace('"', "\\\""))),
            Locator::XPath(_) | Locator::LinkText(_) => None,
        }
    }

    /// XPath 表現（CSSで表せないものだけ）
    pub fn to_xpath(&self) -> Option<String> {
        match self {
            Locator::XPath(xpath) => Some(xpath.clone()),
            Locator::LinkText(text) => Some(format!(
                "//a[normalize-space(.)={}]",
                xpath_literal(text)
            )),
            _ => None,
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Css(s) => write!(f, "css={}", s),
            Locator::Name(s) => write!(f, "name={}", s),
            Locator::Id(s) => write!(f, "id={}", s),
            Locator::XPath(s) => write!(f, "xpath={}", s),
            Locator::LinkText(s) => write!(f, "link={}", s),
        }
    }
}

fn xpath_literal(text: &str) -> String {
    if !text.contains('\'') {
        format!("'{}'", text)
    } else if !text.contains('"') {
        format!("\"{}\"", text)
    } else {
        let parts: Vec<String> = text.split('\'').map(|p| format!("'{}'", p)).collect();
        format!("concat({})", parts.join(", \"'\", "))
    }
}

/// ブラウザから取り出したクッキー
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionCookie {
    pub name: String,
    pub value: String,
    pub domain: String,
    pub path: String,
}

/// ブラウザ自動化バックエンド
///
/// 要素の存在確認・属性取得・現在URL取得ができれば何でもよい。
/// 待機処理は [`crate::session::BrowserSession`] 側でこの上に組み立てる。
#[async_trait]
pub trait BrowserDriver: Send + Sync {
    /// URLへ遷移
    async fn goto(&self, url: &str) -> Result<(), ScraperError>;

    /// 要素が現在ページ上に存在するか（待機しない）
    async fn is_present(&self, locator: &Locator) -> Result<bool, ScraperError>;

    /// 入力欄を空にする
    async fn clear(&self, locator: &Locator) -> Result<(), ScraperError>;

    /// 入力欄に文字列を入力
    async fn type_text(&self, locator: &Locator, text: &str) -> Result<(), ScraperError>;

    /// 要素上で Enter キーを押す
    async fn press_enter(&self, locator: &Locator) -> Result<(), ScraperError>;

    async fn click(&self, locator: &Locator) -> Result<(), ScraperError>;

    async fn attribute(
        &self,
        locator: &Locator,
        name: &str,
    ) -> Result<Option<String>, ScraperError>;

    /// 現在表示中のURL
    async fn current_url(&self) -> Result<String, ScraperError>;

    /// ブラウザセッションが保持しているクッキー一覧
    async fn cookies(&self) -> Result<Vec<SessionCookie>, ScraperError>;

    /// ページ全体のスクリーンショット (PNG)
    async fn screenshot(&self) -> Result<Vec<u8>, ScraperError>;

    /// リソース解放
    async fn close(&mut self) -> Result<(), ScraperError>;
}
