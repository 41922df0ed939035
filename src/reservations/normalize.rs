//! CSVのダウンロードと正規化

use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Number, Value};
use tracing::{debug, info};
use url::Url;

use crate::error::ScraperError;

use super::types::{ReservationRecord, ALLOWED_COLUMNS};

/// 欠損値として扱うセル値
const NULL_MARKERS: [&str; 11] = [
    "", "NA", "N/A", "n/a", "NULL", "null", "NaN", "nan", "None", "<NA>", "#N/A",
];

static DECIMAL: Lazy<Regex> = Lazy::new(|| Regex::new(r"^-?(0|[1-9]\d*)\.\d+$").unwrap());

/// エクスポートURLからCSVを取得
pub async fn download_csv(client: &reqwest::Client, url: &Url) -> Result<String, ScraperError> {
    info!("Downloading CSV from: {}", url);
    let response = client.get(url.clone()).send().await?;

    let status = response.status();
    if !status.is_success() {
        return Err(ScraperError::DownloadFailed {
            status: status.as_u16(),
        });
    }

    let body = response.text().await?;
    debug!("Downloaded {} bytes", body.len());
    Ok(body)
}

fn is_null_marker(value: &str) -> bool {
    NULL_MARKERS.contains(&value)
}

/// 列全体の型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnKind {
    Integer,
    Float,
    Text,
}

impl ColumnKind {
    /// 非欠損セルがすべて整数なら Integer、すべて数値なら Float
    ///
    /// 先頭ゼロや `+` 付きの値は書式に意味があるので数値扱いしない。
    fn infer<'a>(cells: impl Iterator<Item = &'a str> + Clone) -> Self {
        let mut cells = cells.peekable();
        if cells.peek().is_none() {
            return ColumnKind::Text;
        }

        let is_integer = |v: &str| v.parse::<i64>().map(|n| n.to_string() == v).unwrap_or(false);
        if cells.clone().all(is_integer) {
            ColumnKind::Integer
        } else if cells.all(|v| is_integer(v) || DECIMAL.is_match(v)) {
            ColumnKind::Float
        } else {
            ColumnKind::Text
        }
    }

    fn to_value(self, cell: Option<String>) -> Value {
        let Some(cell) = cell else {
            return Value::Null;
        };
        match self {
            ColumnKind::Integer => cell
                .parse::<i64>()
                .map(Value::from)
                .unwrap_or(Value::String(cell)),
            ColumnKind::Float => cell
                .parse::<f64>()
                .ok()
                .and_then(Number::from_f64)
                .map(Value::Number)
                .unwrap_or(Value::String(cell)),
            ColumnKind::Text => Value::String(cell),
        }
    }
}

/// CSVテキストを予約レコードの一覧に変換
///
/// - 行の並びはCSVのまま
/// - 列は [`ALLOWED_COLUMNS`] の順に並べ、それ以外の列は捨てる
/// - CSVに無い許可列は出力にも含めない
/// - 空セル・欠けているセルは `null`
pub fn normalize_csv(text: &str) -> Result<Vec<ReservationRecord>, ScraperError> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers = reader.headers()?.clone();
    let columns: Vec<(&'static str, usize)> = ALLOWED_COLUMNS
        .iter()
        .filter_map(|name| {
            headers
                .iter()
                .position(|header| header.trim() == *name)
                .map(|index| (*name, index))
        })
        .collect();

    let skipped: Vec<&str> = headers
        .iter()
        .filter(|header| !ALLOWED_COLUMNS.contains(&header.trim()))
        .collect();
    if !skipped.is_empty() {
        debug!("Dropping columns: {:?}", skipped);
    }

    let mut rows: Vec<Vec<Option<String>>> = Vec::new();
    for result in reader.records() {
        let record = result?;
        rows.push(
            columns
                .iter()
                .map(|(_, index)| {
                    record
                        .get(*index)
                        .filter(|value| !is_null_marker(value))
                        .map(str::to_string)
                })
                .collect(),
        );
    }

    let kinds: Vec<ColumnKind> = (0..columns.len())
        .map(|i| ColumnKind::infer(rows.iter().filter_map(move |row| row[i].as_deref())))
        .collect();

    let records = rows
        .into_iter()
        .map(|row| {
            let mut record = ReservationRecord::new();
            for (((name, _), kind), cell) in columns.iter().zip(&kinds).zip(row) {
                record.insert(*name, kind.to_value(cell));
            }
            record
        })
        .collect();

    Ok(records)
}

/// レコード一覧をJSONで保存（既存ファイルは上書き）
///
/// 一時ファイルに書いてからリネームするので、途中で失敗しても
/// 中途半端なファイルは残らない。
pub fn write_records(path: &Path, records: &[ReservationRecord]) -> Result<(), ScraperError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let json = serde_json::to_string_pretty(records)?;
    let tmp_path = path.with_extension("json.tmp");
    std::fs::write(&tmp_path, json)?;
    std::fs::rename(&tmp_path, path)?;

    info!("Saved reservations to {:?}", path);
    Ok(())
}
