//! Explicit date formats for spreadsheet columns.
//!
//! A text cell in a date column is parsed with the format configured for
//! that column; the content never decides which of day or month comes first.
//! Patterns are built from the tokens `YYYY`, `YY`, `MMM` (pt-BR month
//! abbreviation), `MM`/`M`, `DD`/`D` and literal separators.

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::PipelineError;
use crate::sheet::CellValue;
use crate::utils::normalize_text;

/// pt-BR month abbreviations, January first
pub const MONTHS_PT: [&str; 12] = [
    "jan", "fev", "mar", "abr", "mai", "jun", "jul", "ago", "set", "out", "nov", "dez",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token {
    Year4,
    Year2,
    Month,
    MonthAbbr,
    Day,
    Literal(char),
}

/// A parsed date pattern such as `DD/MM/YYYY` or `MMM/YY`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DateFormat {
    pattern: String,
    tokens: Vec<Token>,
}

impl DateFormat {
    pub fn parse(pattern: &str) -> Result<Self, PipelineError> {
        let upper: Vec<char> = pattern.trim().to_uppercase().chars().collect();
        let mut tokens = Vec::new();
        let mut i = 0;

        while i < upper.len() {
            let ch = upper[i];
            let run = upper[i..].iter().take_while(|c| **c == ch).count();
            let token = match (ch, run) {
                ('Y', 4) => Token::Year4,
                ('Y', 2) => Token::Year2,
                ('M', 3) => Token::MonthAbbr,
                ('M', 1..=2) => Token::Month,
                ('D', 1..=2) => Token::Day,
                ('Y' | 'M' | 'D', _) => {
                    return Err(PipelineError::Config(format!(
                        "invalid date pattern '{}': unexpected '{}'",
                        pattern,
                        ch.to_string().repeat(run)
                    )))
                }
                (c, _) => {
                    tokens.push(Token::Literal(c));
                    i += 1;
                    continue;
                }
            };
            tokens.push(token);
            i += run;
        }

        let has_year = tokens
            .iter()
            .any(|t| matches!(t, Token::Year4 | Token::Year2));
        let has_month = tokens
            .iter()
            .any(|t| matches!(t, Token::Month | Token::MonthAbbr));
        if !has_year || !has_month {
            return Err(PipelineError::Config(format!(
                "invalid date pattern '{}': needs a year and a month",
                pattern
            )));
        }

        Ok(Self {
            pattern: pattern.trim().to_string(),
            tokens,
        })
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Parse `raw` strictly against this format. A pattern without a day
    /// yields the first of the month.
    pub fn parse_value(&self, raw: &str) -> Option<NaiveDate> {
        let input: Vec<char> = raw.trim().chars().collect();
        let mut pos = 0;
        let (mut year, mut month, mut day) = (None, None, 1u32);

        for token in &self.tokens {
            match token {
                Token::Year4 => {
                    year = Some(take_digits(&input, &mut pos, 4, 4)? as i32);
                }
                Token::Year2 => {
                    year = Some(2000 + take_digits(&input, &mut pos, 2, 2)? as i32);
                }
                Token::Month => {
                    month = Some(take_digits(&input, &mut pos, 1, 2)?);
                }
                Token::Day => {
                    day = take_digits(&input, &mut pos, 1, 2)?;
                }
                Token::MonthAbbr => {
                    let start = pos;
                    while pos < input.len() && input[pos].is_alphabetic() {
                        pos += 1;
                    }
                    let word: String = input[start..pos].iter().collect();
                    month = Some(month_from_name(&word)?);
                }
                Token::Literal(c) => {
                    let next = input.get(pos)?;
                    if !next.to_uppercase().eq(c.to_uppercase()) {
                        return None;
                    }
                    pos += 1;
                }
            }
        }

        if pos != input.len() {
            return None;
        }
        NaiveDate::from_ymd_opt(year?, month?, day)
    }

    /// Normalize a cell from a date column.
    ///
    /// Native dates pass through, numbers are read as Excel serials and text
    /// must match this format.
    pub fn parse_cell(&self, field: &str, cell: &CellValue) -> Result<CellValue, PipelineError> {
        let mismatch = || PipelineError::DateFormatMismatch {
            field: field.to_string(),
            raw: cell.as_text(),
            format: self.pattern.clone(),
        };
        match cell {
            CellValue::Empty | CellValue::Date(_) => Ok(cell.clone()),
            CellValue::Number(n) => excel_serial_to_date(*n)
                .map(CellValue::Date)
                .ok_or_else(mismatch),
            CellValue::Text(s) => self
                .parse_value(s)
                .map(CellValue::Date)
                .ok_or_else(mismatch),
        }
    }
}

impl fmt::Display for DateFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.pattern)
    }
}

impl FromStr for DateFormat {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DateFormat::parse(s)
    }
}

impl TryFrom<String> for DateFormat {
    type Error = PipelineError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        DateFormat::parse(&value)
    }
}

impl From<DateFormat> for String {
    fn from(value: DateFormat) -> Self {
        value.pattern
    }
}

fn take_digits(input: &[char], pos: &mut usize, min: usize, max: usize) -> Option<u32> {
    let start = *pos;
    while *pos < input.len() && *pos - start < max && input[*pos].is_ascii_digit() {
        *pos += 1;
    }
    if *pos - start < min {
        return None;
    }
    input[start..*pos].iter().collect::<String>().parse().ok()
}

fn month_from_name(word: &str) -> Option<u32> {
    let norm = normalize_text(word);
    let prefix: String = norm.chars().take(3).collect();
    MONTHS_PT
        .iter()
        .position(|m| *m == prefix)
        .map(|idx| idx as u32 + 1)
}

/// Convert an Excel serial day number (1900 date system) to a date.
pub fn excel_serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || serial < 1.0 || serial > 2_958_465.0 {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    epoch.checked_add_signed(Duration::days(serial.floor() as i64))
}

/// `jan/25`
pub fn format_month_year(date: NaiveDate) -> String {
    format!(
        "{}/{:02}",
        MONTHS_PT[date.month0() as usize],
        date.year().rem_euclid(100)
    )
}

/// `10/01/2025`
pub fn format_date_br(date: NaiveDate) -> String {
    date.format("%d/%m/%Y").to_string()
}
