//! 日付入力の検証
//!
//! `DD-MM-YYYY` 形式の入力を検証し、画面のフィルター欄が要求する
//! `DD MON YYYY`（月は大文字の英略称）形式も合わせて保持する。

use std::fmt;

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

static DATE_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{2}-\d{2}-\d{4}$").unwrap());

const CANONICAL_FORMAT: &str = "%d-%m-%Y";
const DISPLAY_FORMAT: &str = "%d %b %Y";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DateInputError {
    #[error("Wrong format. Please use DD-MM-YYYY (e.g. 22-10-2025).")]
    InvalidFormat(String),

    #[error("Invalid date. {0} does not exist on the calendar (e.g. 30-02-2025 is invalid).")]
    InvalidCalendarDate(String),
}

/// 検証済みの日付（正規形と表示形）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateEndpoint {
    date: NaiveDate,
    canonical: String,
    display: String,
}

impl DateEndpoint {
    /// 入力文字列を検証する
    ///
    /// 形式が合わなければ暦のチェックは行わず `InvalidFormat`。
    pub fn parse(input: &str) -> Result<Self, DateInputError> {
        let input = input.trim();
        if !DATE_PATTERN.is_match(input) {
            return Err(DateInputError::InvalidFormat(input.to_string()));
        }

        let date = NaiveDate::parse_from_str(input, CANONICAL_FORMAT)
            .map_err(|_| DateInputError::InvalidCalendarDate(input.to_string()))?;

        Ok(Self {
            date,
            canonical: input.to_string(),
            display: date.format(DISPLAY_FORMAT).to_string().to_uppercase(),
        })
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    /// `DD-MM-YYYY`
    pub fn canonical(&self) -> &str {
        &self.canonical
    }

    /// `DD MON YYYY`
    pub fn display(&self) -> &str {
        &self.display
    }
}

impl fmt::Display for DateEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical)
    }
}

/// 有効な日付が得られるまで入力を繰り返す
///
/// `initial` があれば最初にそれを検証する。不正な入力は `on_invalid` に渡し、
/// `next_input` から次の入力を読む。回数の上限は無い。
pub fn read_until_valid<E>(
    initial: Option<String>,
    mut next_input: impl FnMut() -> Result<String, E>,
    mut on_invalid: impl FnMut(&DateInputError),
) -> Result<DateEndpoint, E> {
    let mut candidate = initial;
    loop {
        let input = match candidate.take() {
            Some(value) => value,
            None => next_input()?,
        };

        match DateEndpoint::parse(&input) {
            Ok(date) => return Ok(date),
            Err(e) => on_invalid(&e),
        }
    }
}

/// 期間（from と to の前後関係はチェックしない）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateRange {
    pub from: DateEndpoint,
    pub to: DateEndpoint,
}

impl DateRange {
    pub fn new(from: DateEndpoint, to: DateEndpoint) -> Self {
        Self { from, to }
    }

    pub fn parse(from: &str, to: &str) -> Result<Self, DateInputError> {
        Ok(Self::new(DateEndpoint::parse(from)?, DateEndpoint::parse(to)?))
    }

    /// 出力ファイル名 `reservations_{from}_to_{to}.json`
    pub fn output_file_name(&self) -> String {
        format!(
            "reservations_{}_to_{}.json",
            self.from.canonical(),
            self.to.canonical()
        )
    }
}
