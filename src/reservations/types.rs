//! 予約エクスポート関連の型定義

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use reqwest::cookie::Jar;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use url::Url;

use crate::error::ScraperError;
use crate::traits::SessionCookie;

/// 出力に残す列（この順で出力する）
pub const ALLOWED_COLUMNS: [&str; 16] = [
    "Status",
    "Guest first name",
    "Guest last name",
    "Booking reference",
    "Source",
    "Occupants",
    "Check in date",
    "Check out date",
    "Booked",
    "ETA",
    "Rooms",
    "Payment total",
    "Payment outstanding",
    "Invoice Number",
    "Guest email",
    "Guest phone number",
];

/// 予約1件分
///
/// 列名 → 値。欠損値は `null`。キーの並びは [`ALLOWED_COLUMNS`] の順。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReservationRecord(Map<String, Value>);

impl ReservationRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, field: impl Into<String>, value: Value) {
        self.0.insert(field.into(), value);
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// 列が存在し、値が `null` の場合 true
    pub fn is_null(&self, field: &str) -> bool {
        matches!(self.0.get(field), Some(Value::Null))
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// CSVエクスポートの取得先（絶対URL + 認可用クッキー）
#[derive(Debug, Clone)]
pub struct ExportDescriptor {
    pub url: Url,
    pub cookies: Vec<SessionCookie>,
}

impl ExportDescriptor {
    /// ブラウザのクッキーを移植した使い捨てのHTTPクライアントを作成
    ///
    /// クッキーはエクスポートURLのホストに対して `Path=/` で登録する。
    pub fn client(&self, timeout: Duration) -> Result<reqwest::Client, ScraperError> {
        let jar = Jar::default();
        for cookie in &self.cookies {
            jar.add_cookie_str(&format!("{}={}; Path=/", cookie.name, cookie.value), &self.url);
        }

        let client = reqwest::Client::builder()
            .cookie_provider(Arc::new(jar))
            .timeout(timeout)
            .build()?;
        Ok(client)
    }
}

/// エクスポート結果
#[derive(Debug, Clone)]
pub struct ExportOutcome {
    pub output_path: PathBuf,
    pub records: Vec<ReservationRecord>,
}
