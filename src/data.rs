use std::{fmt, str::FromStr};

use anyhow::{Context, Result, anyhow, bail};
use chrono::{Datelike, NaiveDate, NaiveDateTime};
use heck::ToSnakeCase;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub const DEFAULT_DATE_FORMATS: &[&str] = &[
    "%m/%d/%Y",
    "%Y-%m-%d",
    "%m/%d/%y",
    "%Y/%m/%d",
    "%d-%m-%Y",
    "%d.%m.%Y",
];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

const CURRENCY_SYMBOLS: &[char] = &['$', '€', '£', '¥'];
const THOUSANDS_SEPARATORS: &[char] = &[',', '_', '\''];

/// Largest accepted magnitude for a numeric cell. Sums over any number of rows
/// that fit in memory stay far below the `Decimal` limit.
pub const MAX_CELL_MAGNITUDE: i64 = 1_000_000_000_000_000;

/// Calendar month bucket used for time-series rollups, rendered `YYYY-MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl YearMonth {
    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for YearMonth {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let (year, month) = value
            .trim()
            .split_once('-')
            .ok_or_else(|| anyhow!("Year-month '{value}' must look like YYYY-MM"))?;
        let year: i32 = year
            .parse()
            .with_context(|| format!("Parsing year from '{value}'"))?;
        let month: u32 = month
            .parse()
            .with_context(|| format!("Parsing month from '{value}'"))?;
        if !(1..=12).contains(&month) {
            bail!("Month {month} in '{value}' is out of range");
        }
        Ok(Self { year, month })
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TextCasing {
    #[default]
    Preserve,
    Title,
    Upper,
    Lower,
}

/// Blank cells and spreadsheet placeholders such as `N/A` or `#NULL!` read as null.
pub fn is_placeholder_token(value: &str) -> bool {
    let lowered = value.trim().to_ascii_lowercase();
    let stripped = lowered.trim_start_matches('#').trim_end_matches('!');
    stripped.is_empty()
        || matches!(stripped, "na" | "n/a" | "n.a." | "nan" | "null" | "none")
        || stripped.chars().all(|c| c == '-')
}

pub fn parse_naive_date<S: AsRef<str>>(value: &str, formats: &[S]) -> Result<NaiveDate> {
    let trimmed = value.trim();
    for fmt in formats {
        // Two-digit years must fall through to a `%y` format.
        if let Ok(parsed) = NaiveDate::parse_from_str(trimmed, fmt.as_ref())
            && parsed.year() >= 1000
        {
            return Ok(parsed);
        }
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(trimmed, fmt) {
            return Ok(parsed.date());
        }
    }
    Err(anyhow!("Failed to parse '{value}' as date"))
}

/// Locale-neutral decimal parsing that tolerates currency symbols, thousands
/// separators, accounting parentheses and scientific notation.
pub fn parse_currency_decimal(value: &str) -> Result<Decimal> {
    let trimmed = value.trim();
    let (negative_parens, body) = match trimmed
        .strip_prefix('(')
        .and_then(|inner| inner.strip_suffix(')'))
    {
        Some(inner) => (true, inner),
        None => (false, trimmed),
    };
    let cleaned: String = body
        .chars()
        .filter(|c| {
            !c.is_whitespace() && !CURRENCY_SYMBOLS.contains(c) && !THOUSANDS_SEPARATORS.contains(c)
        })
        .collect();
    if cleaned.is_empty() {
        bail!("Failed to parse '{value}' as decimal");
    }
    let parsed = Decimal::from_str(&cleaned)
        .or_else(|_| Decimal::from_scientific(&cleaned))
        .map_err(|_| anyhow!("Failed to parse '{value}' as decimal"))?;
    if parsed.abs() >= Decimal::from(MAX_CELL_MAGNITUDE) {
        bail!("Decimal '{value}' exceeds the accepted magnitude of {MAX_CELL_MAGNITUDE}");
    }
    if negative_parens {
        if parsed.is_sign_negative() {
            bail!("Failed to parse '{value}' as decimal");
        }
        Ok(-parsed)
    } else {
        Ok(parsed)
    }
}

pub fn normalize_text(value: &str, casing: TextCasing) -> Option<String> {
    let collapsed = value.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        return None;
    }
    Some(match casing {
        TextCasing::Preserve => collapsed,
        TextCasing::Upper => collapsed.to_uppercase(),
        TextCasing::Lower => collapsed.to_lowercase(),
        TextCasing::Title => title_case(&collapsed),
    })
}

fn title_case(value: &str) -> String {
    let mut output = String::with_capacity(value.len());
    let mut at_word_start = true;
    for ch in value.chars() {
        if ch.is_alphanumeric() || ch == '\'' {
            if at_word_start {
                output.extend(ch.to_uppercase());
            } else {
                output.extend(ch.to_lowercase());
            }
            at_word_start = false;
        } else {
            output.push(ch);
            at_word_start = true;
        }
    }
    output
}

/// Key used to match headers against the schema: lowercase letters and digits
/// only, so case, spacing and punctuation never matter.
pub fn header_key(name: &str) -> String {
    name.to_snake_case()
        .chars()
        .filter(|c| c.is_alphanumeric())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(value: &str) -> Decimal {
        Decimal::from_str(value).unwrap()
    }

    #[test]
    fn header_key_ignores_case_and_spacing() {
        assert_eq!(header_key("Order ID"), "orderid");
        assert_eq!(header_key("  order id "), "orderid");
        assert_eq!(header_key("OrderID"), "orderid");
        assert_eq!(header_key("ORDERID"), "orderid");
        assert_eq!(header_key("order_id"), "orderid");
        assert_eq!(header_key("Sub-Category"), "subcategory");
        assert_eq!(header_key("SUBCATEGORY"), "subcategory");
        assert_eq!(header_key("State/Province"), "stateprovince");
        assert_eq!(header_key("Product Name"), "productname");
    }

    #[test]
    fn parse_naive_date_prefers_month_first() {
        let expected = NaiveDate::from_ymd_opt(2016, 11, 8).unwrap();
        assert_eq!(
            parse_naive_date("11/8/2016", DEFAULT_DATE_FORMATS).unwrap(),
            expected
        );
        assert_eq!(
            parse_naive_date("2016-11-08", DEFAULT_DATE_FORMATS).unwrap(),
            expected
        );
        assert_eq!(
            parse_naive_date("2016-11-08 00:00:00", DEFAULT_DATE_FORMATS).unwrap(),
            expected
        );
        assert_eq!(
            parse_naive_date("11/8/16", DEFAULT_DATE_FORMATS).unwrap(),
            expected
        );
        assert!(parse_naive_date("31/31/2016", DEFAULT_DATE_FORMATS).is_err());
    }

    #[test]
    fn parse_currency_decimal_strips_symbols_and_separators() {
        assert_eq!(parse_currency_decimal("$1,234.50").unwrap(), dec("1234.50"));
        assert_eq!(parse_currency_decimal(" -383.031 ").unwrap(), dec("-383.031"));
        assert_eq!(parse_currency_decimal("(12.5)").unwrap(), dec("-12.5"));
        assert_eq!(parse_currency_decimal("€ 9").unwrap(), dec("9"));
        assert_eq!(parse_currency_decimal("1.5e2").unwrap(), dec("150"));
        assert!(parse_currency_decimal("twelve").is_err());
        assert!(parse_currency_decimal("$").is_err());
    }

    #[test]
    fn parse_currency_decimal_rejects_huge_magnitudes() {
        assert_eq!(
            parse_currency_decimal("999,999,999,999,999.99").unwrap(),
            dec("999999999999999.99")
        );
        let err = parse_currency_decimal("50000000000000000000000000000").unwrap_err();
        assert!(err.to_string().contains("exceeds the accepted magnitude"));
        assert!(parse_currency_decimal("(1e16)").is_err());
        assert!(parse_currency_decimal("-1000000000000000").is_err());
    }

    #[test]
    fn normalize_text_collapses_and_cases() {
        assert_eq!(
            normalize_text("  second   class ", TextCasing::Title).as_deref(),
            Some("Second Class")
        );
        assert_eq!(
            normalize_text("ca-2016-152156", TextCasing::Upper).as_deref(),
            Some("CA-2016-152156")
        );
        assert_eq!(
            normalize_text("GBC  DocuBind", TextCasing::Preserve).as_deref(),
            Some("GBC DocuBind")
        );
        assert_eq!(normalize_text("   ", TextCasing::Preserve), None);
    }

    #[test]
    fn placeholders_read_as_null() {
        for token in ["", "NA", "n/a", "NaN", "#NULL!", "--", "None"] {
            assert!(is_placeholder_token(token), "{token} should be a placeholder");
        }
        assert!(!is_placeholder_token("Nashville"));
        assert!(!is_placeholder_token("0"));
    }

    #[test]
    fn year_month_formats_and_orders() {
        let jan = YearMonth::from_date(NaiveDate::from_ymd_opt(2023, 1, 31).unwrap());
        let mar: YearMonth = "2023-03".parse().unwrap();
        assert_eq!(jan.to_string(), "2023-01");
        assert!(jan < mar);
        assert!("2023-13".parse::<YearMonth>().is_err());
    }
}
