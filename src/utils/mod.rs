//! Utility functions for formatting and common operations
//!
//! Centralizes header/text normalization, CNPJ handling and the locale-aware
//! currency formatting used by the CLI and the report writer.

use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use unicode_normalization::{char::is_combining_mark, UnicodeNormalization};

use crate::error::PipelineError;

/// Number presentation conventions.
///
/// Amounts are always Brazilian Reais; the locale only decides separators
/// when rendering text and how ambiguous input like `1.234` is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Locale {
    #[default]
    #[serde(rename = "pt-BR")]
    PtBr,
    #[serde(rename = "en-US")]
    EnUs,
}

impl Locale {
    pub fn as_str(&self) -> &'static str {
        match self {
            Locale::PtBr => "pt-BR",
            Locale::EnUs => "en-US",
        }
    }

    /// Excel number format for currency cells
    pub fn currency_num_format(&self) -> &'static str {
        match self {
            Locale::PtBr => "[$R$-416] #,##0.00",
            Locale::EnUs => "[$R$-409] #,##0.00",
        }
    }

    /// Excel number format for month/year date cells (`jan/25`, `Jan/25`)
    pub fn month_year_num_format(&self) -> &'static str {
        match self {
            Locale::PtBr => "[$-416]mmm/yy",
            Locale::EnUs => "[$-409]mmm/yy",
        }
    }

    /// Returns (thousands separator, decimal separator)
    fn separators(&self) -> (char, char) {
        match self {
            Locale::PtBr => ('.', ','),
            Locale::EnUs => (',', '.'),
        }
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Locale {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('_', "-").as_str() {
            "pt-br" | "pt" => Ok(Locale::PtBr),
            "en-us" | "en" => Ok(Locale::EnUs),
            other => Err(PipelineError::Config(format!("unknown locale '{}'", other))),
        }
    }
}

/// Render an amount in Reais with the separators of `locale`.
///
/// # Examples
/// ```
/// use fluxo::utils::{format_currency, Locale};
/// use rust_decimal_macros::dec;
///
/// assert_eq!(format_currency(dec!(1234.56), Locale::PtBr), "R$ 1.234,56");
/// assert_eq!(format_currency(dec!(1234), Locale::EnUs), "R$ 1,234.00");
/// ```
pub fn format_currency(value: Decimal, locale: Locale) -> String {
    let (thousands, decimal) = locale.separators();
    let rounded = value.round_dp(2);
    let formatted = format!("{:.2}", rounded.abs());
    let (integer_part, fraction) = formatted.split_once('.').unwrap_or((&formatted, "00"));

    let mut grouped = String::with_capacity(integer_part.len() + integer_part.len() / 3);
    for (i, c) in integer_part.chars().enumerate() {
        if i > 0 && (integer_part.len() - i) % 3 == 0 {
            grouped.push(thousands);
        }
        grouped.push(c);
    }

    let sign = if rounded < Decimal::ZERO { "-" } else { "" };
    format!("R$ {}{}{}{}", sign, grouped, decimal, fraction)
}

/// Convert a spreadsheet float into a two-place decimal.
pub fn decimal_from_f64(value: f64) -> Option<Decimal> {
    Decimal::from_f64(value).map(|d| d.round_dp(2))
}

/// Parse a monetary amount written in either Brazilian or US notation.
///
/// When both separators are present the right-most one is the decimal mark.
/// A lone separator is read as the locale's decimal mark, or as a thousands
/// separator when every group after it has exactly three digits.
///
/// # Examples
/// ```
/// use fluxo::utils::{parse_amount, Locale};
/// use rust_decimal_macros::dec;
///
/// assert_eq!(parse_amount("R$ 1.234,56", Locale::PtBr), Some(dec!(1234.56)));
/// assert_eq!(parse_amount("1,234.56", Locale::PtBr), Some(dec!(1234.56)));
/// assert_eq!(parse_amount("abc", Locale::PtBr), None);
/// ```
pub fn parse_amount(raw: &str, locale: Locale) -> Option<Decimal> {
    let mut text: String = raw
        .replace("US$", "")
        .replace("R$", "")
        .replace('$', "")
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();

    let mut negative = false;
    if text.starts_with('(') && text.ends_with(')') && text.len() > 2 {
        negative = true;
        text = text[1..text.len() - 1].to_string();
    }
    if let Some(rest) = text.strip_prefix('-') {
        negative = !negative;
        text = rest.to_string();
    }
    if text.is_empty() || !text.chars().all(|c| c.is_ascii_digit() || c == '.' || c == ',') {
        return None;
    }

    let last_dot = text.rfind('.');
    let last_comma = text.rfind(',');
    let normalized = match (last_dot, last_comma) {
        (Some(d), Some(c)) => {
            let decimal = if d > c { '.' } else { ',' };
            normalize_separators(&text, decimal)
        }
        (Some(_), None) => single_separator(&text, '.', locale),
        (None, Some(_)) => single_separator(&text, ',', locale),
        (None, None) => text,
    };

    let value = Decimal::from_str(&normalized).ok()?;
    Some(if negative { -value } else { value })
}

fn single_separator(text: &str, sep: char, locale: Locale) -> String {
    let (_, decimal) = locale.separators();
    let groups: Vec<&str> = text.split(sep).collect();
    let thousands_shape = groups.len() > 1
        && !groups[0].is_empty()
        && groups[0].len() <= 3
        && groups[1..].iter().all(|g| g.len() == 3);

    if sep != decimal && thousands_shape {
        text.replace(sep, "")
    } else if groups.len() == 2 {
        normalize_separators(text, sep)
    } else {
        text.replace(sep, "")
    }
}

fn normalize_separators(text: &str, decimal: char) -> String {
    text.chars()
        .filter_map(|c| match c {
            c if c == decimal => Some('.'),
            '.' | ',' => None,
            c => Some(c),
        })
        .collect()
}

/// Strip diacritics while keeping case.
pub fn strip_accents(input: &str) -> String {
    input
        .nfkd()
        .filter(|ch| !is_combining_mark(*ch))
        .collect()
}

/// Canonical form used to compare headers, group names and keywords:
/// accents removed, lowercase, whitespace collapsed.
///
/// # Examples
/// ```
/// use fluxo::utils::normalize_text;
///
/// assert_eq!(normalize_text("  Grupo   Econômico "), "grupo economico");
/// ```
pub fn normalize_text(input: &str) -> String {
    strip_accents(input)
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Reduce a CNPJ (or CPF) to its digits.
pub fn cnpj_digits(raw: &str) -> String {
    raw.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Format a CNPJ as `00.000.000/0000-00`.
///
/// CPF-sized inputs get the `000.000.000-00` mask; anything else is returned
/// as its digits.
///
/// # Examples
/// ```
/// use fluxo::utils::format_cnpj;
///
/// assert_eq!(format_cnpj("12345678000190"), "12.345.678/0001-90");
/// assert_eq!(format_cnpj("12.345.678/0001-90"), "12.345.678/0001-90");
/// ```
pub fn format_cnpj(raw: &str) -> String {
    let d = cnpj_digits(raw);
    match d.len() {
        14 => format!(
            "{}.{}.{}/{}-{}",
            &d[0..2],
            &d[2..5],
            &d[5..8],
            &d[8..12],
            &d[12..14]
        ),
        11 => format!("{}.{}.{}-{}", &d[0..3], &d[3..6], &d[6..9], &d[9..11]),
        _ => d,
    }
}

static NON_WORD: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"[^A-Za-z0-9]+").ok());

/// Filesystem-safe fragment derived from a display name.
///
/// # Examples
/// ```
/// use fluxo::utils::file_slug;
///
/// assert_eq!(file_slug("Grupo Ação & Cia"), "Grupo_Acao_Cia");
/// ```
pub fn file_slug(name: &str) -> String {
    let ascii = strip_accents(name);
    let slug = match NON_WORD.as_ref() {
        Some(re) => re.replace_all(&ascii, "_").into_owned(),
        None => ascii,
    };
    let slug = slug.trim_matches('_');
    if slug.is_empty() {
        "sem_grupo".to_string()
    } else {
        slug.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_format_currency_basic() {
        assert_eq!(format_currency(dec!(1234.56), Locale::PtBr), "R$ 1.234,56");
        assert_eq!(format_currency(dec!(0.99), Locale::PtBr), "R$ 0,99");
        assert_eq!(format_currency(dec!(1000000), Locale::PtBr), "R$ 1.000.000,00");
        assert_eq!(format_currency(dec!(0), Locale::PtBr), "R$ 0,00");
        assert_eq!(format_currency(dec!(123), Locale::PtBr), "R$ 123,00");
    }

    #[test]
    fn test_format_currency_negative() {
        assert_eq!(format_currency(dec!(-1234.56), Locale::PtBr), "R$ -1.234,56");
        assert_eq!(format_currency(dec!(-0.01), Locale::PtBr), "R$ -0,01");
    }

    #[test]
    fn test_format_currency_en_us() {
        assert_eq!(format_currency(dec!(1234567.5), Locale::EnUs), "R$ 1,234,567.50");
    }

    #[test]
    fn test_decimal_from_f64_rounds_to_cents() {
        assert_eq!(decimal_from_f64(1500.0), Some(dec!(1500)));
        assert_eq!(decimal_from_f64(0.125), Some(dec!(0.12)));
        assert_eq!(decimal_from_f64(f64::NAN), None);
    }

    #[test]
    fn test_excel_formats_follow_locale() {
        assert_eq!(Locale::PtBr.month_year_num_format(), "[$-416]mmm/yy");
        assert_ne!(Locale::PtBr.currency_num_format(), Locale::EnUs.currency_num_format());
    }

    #[test]
    fn test_parse_amount_brazilian_and_us() {
        assert_eq!(parse_amount("1.234,56", Locale::PtBr), Some(dec!(1234.56)));
        assert_eq!(parse_amount("1,234.56", Locale::EnUs), Some(dec!(1234.56)));
        assert_eq!(parse_amount("R$ 2.500", Locale::PtBr), Some(dec!(2500)));
        assert_eq!(parse_amount("150,5", Locale::PtBr), Some(dec!(150.5)));
        assert_eq!(parse_amount("-10,00", Locale::PtBr), Some(dec!(-10.00)));
        assert_eq!(parse_amount("", Locale::PtBr), None);
    }

    #[test]
    fn test_parse_amount_lone_separator_follows_locale() {
        assert_eq!(parse_amount("1.234", Locale::PtBr), Some(dec!(1234)));
        assert_eq!(parse_amount("1.234", Locale::EnUs), Some(dec!(1.234)));
        assert_eq!(parse_amount("1,234", Locale::EnUs), Some(dec!(1234)));
        assert_eq!(parse_amount("1.5", Locale::PtBr), Some(dec!(1.5)));
    }

    #[test]
    fn test_normalize_text() {
        assert_eq!(normalize_text("CNPJ da Empresa"), "cnpj da empresa");
        assert_eq!(normalize_text("Situação\u{a0}Atual"), "situacao atual");
        assert_eq!(normalize_text(""), "");
    }

    #[test]
    fn test_cnpj_helpers() {
        assert_eq!(cnpj_digits("12.345.678/0001-90"), "12345678000190");
        assert_eq!(format_cnpj("123.456.789-01"), "123.456.789-01");
        assert_eq!(format_cnpj("123"), "123");
    }

    #[test]
    fn test_file_slug() {
        assert_eq!(file_slug("  Grupo Alfa  "), "Grupo_Alfa");
        assert_eq!(file_slug("///"), "sem_grupo");
    }

    #[test]
    fn test_locale_from_str() {
        assert_eq!("pt_BR".parse::<Locale>().unwrap(), Locale::PtBr);
        assert_eq!("en-US".parse::<Locale>().unwrap(), Locale::EnUs);
        assert!("fr".parse::<Locale>().is_err());
    }
}
