//! Built-in converters for the well-known value kinds.
//!
//! All parsing is locale-invariant: `.` is the decimal separator and `,` is
//! accepted as a grouping separator on input so that values written with a
//! `#,##0.00`-style output pattern read back cleanly. Date parsing uses the
//! field's `format` pattern or the configured default pattern.

use bigdecimal::{BigDecimal, RoundingMode};
use chrono::{Days, NaiveDate};
use std::str::FromStr;
use std::sync::Arc;

use crate::cell::{Cell, FieldValue, ValueKind};
use crate::error::{ConvertError, ConvertResult};

use super::{ConvertContext, Converter};

/// The built-in converter for a kind. Total: every kind ships one.
pub(super) fn builtin(kind: ValueKind) -> Arc<dyn Converter> {
    match kind {
        ValueKind::Text => Arc::new(TextConverter),
        ValueKind::Int => Arc::new(IntConverter),
        ValueKind::Float => Arc::new(FloatConverter),
        ValueKind::Bool => Arc::new(BoolConverter),
        ValueKind::Date => Arc::new(DateConverter),
        ValueKind::Decimal => Arc::new(DecimalConverter),
    }
}

fn kind_mismatch(expected: ValueKind, got: &FieldValue) -> ConvertError {
    ConvertError::other(format!(
        "converter for {} received a {} value",
        expected,
        got.kind()
    ))
}

fn parse_error(cell: &Cell, expected: ValueKind) -> ConvertError {
    ConvertError::Parse {
        value: cell.to_text(),
        expected,
    }
}

// =============================================================================
// Text
// =============================================================================

/// Pass-through text conversion, trimming per configuration.
pub struct TextConverter;

impl Converter for TextConverter {
    fn from_cell(&self, cell: &Cell, ctx: &ConvertContext<'_>) -> ConvertResult<FieldValue> {
        if cell.is_blank(ctx.config.trim_values) {
            return Ok(FieldValue::Text(None));
        }
        let s = cell.to_text();
        let s = if ctx.config.trim_values {
            s.trim().to_string()
        } else {
            s
        };
        Ok(FieldValue::Text(Some(s)))
    }

    fn to_cell(&self, value: &FieldValue, _ctx: &ConvertContext<'_>) -> ConvertResult<Cell> {
        match value {
            FieldValue::Text(Some(s)) => Ok(Cell::Text(s.clone())),
            FieldValue::Text(None) => Ok(Cell::Empty),
            other => Err(kind_mismatch(ValueKind::Text, other)),
        }
    }
}

// =============================================================================
// Bool
// =============================================================================

const TRUTHY: &[&str] = &["true", "yes", "y", "1", "on"];
const FALSY: &[&str] = &["false", "no", "n", "0", "off"];

/// Recognizes the common textual spellings of booleans, case-insensitively.
pub struct BoolConverter;

impl Converter for BoolConverter {
    fn from_cell(&self, cell: &Cell, ctx: &ConvertContext<'_>) -> ConvertResult<FieldValue> {
        if cell.is_blank(ctx.config.trim_values) {
            return Ok(FieldValue::Bool(None));
        }
        match cell {
            Cell::Bool(b) => Ok(FieldValue::Bool(Some(*b))),
            Cell::Int(0) => Ok(FieldValue::Bool(Some(false))),
            Cell::Int(1) => Ok(FieldValue::Bool(Some(true))),
            Cell::Text(s) => {
                let lower = s.trim().to_lowercase();
                if TRUTHY.contains(&lower.as_str()) {
                    Ok(FieldValue::Bool(Some(true)))
                } else if FALSY.contains(&lower.as_str()) {
                    Ok(FieldValue::Bool(Some(false)))
                } else {
                    Err(parse_error(cell, ValueKind::Bool))
                }
            }
            _ => Err(parse_error(cell, ValueKind::Bool)),
        }
    }

    fn to_cell(&self, value: &FieldValue, _ctx: &ConvertContext<'_>) -> ConvertResult<Cell> {
        match value {
            FieldValue::Bool(Some(b)) => Ok(Cell::Bool(*b)),
            FieldValue::Bool(None) => Ok(Cell::Empty),
            other => Err(kind_mismatch(ValueKind::Bool, other)),
        }
    }
}

// =============================================================================
// Int
// =============================================================================

/// Whole-number conversion. Workbook floats with no fractional part are
/// accepted since spreadsheet formats store integers as floats.
pub struct IntConverter;

impl Converter for IntConverter {
    fn from_cell(&self, cell: &Cell, ctx: &ConvertContext<'_>) -> ConvertResult<FieldValue> {
        if cell.is_blank(ctx.config.trim_values) {
            return Ok(FieldValue::Int(None));
        }
        match cell {
            Cell::Int(i) => Ok(FieldValue::Int(Some(*i))),
            Cell::Float(f) if f.fract() == 0.0 => Ok(FieldValue::Int(Some(*f as i64))),
            Cell::Text(s) => strip_grouping(s)
                .parse::<i64>()
                .map(|i| FieldValue::Int(Some(i)))
                .map_err(|_| parse_error(cell, ValueKind::Int)),
            _ => Err(parse_error(cell, ValueKind::Int)),
        }
    }

    fn to_cell(&self, value: &FieldValue, ctx: &ConvertContext<'_>) -> ConvertResult<Cell> {
        match value {
            FieldValue::Int(Some(i)) => Ok(match ctx.format {
                Some(pattern) => Cell::Text(format_number(*i as f64, pattern)),
                None => Cell::Int(*i),
            }),
            FieldValue::Int(None) => Ok(Cell::Empty),
            other => Err(kind_mismatch(ValueKind::Int, other)),
        }
    }
}

// =============================================================================
// Float
// =============================================================================

pub struct FloatConverter;

impl Converter for FloatConverter {
    fn from_cell(&self, cell: &Cell, ctx: &ConvertContext<'_>) -> ConvertResult<FieldValue> {
        if cell.is_blank(ctx.config.trim_values) {
            return Ok(FieldValue::Float(None));
        }
        match cell {
            Cell::Float(f) => Ok(FieldValue::Float(Some(*f))),
            Cell::Int(i) => Ok(FieldValue::Float(Some(*i as f64))),
            Cell::Text(s) => strip_grouping(s)
                .parse::<f64>()
                .map(|f| FieldValue::Float(Some(f)))
                .map_err(|_| parse_error(cell, ValueKind::Float)),
            _ => Err(parse_error(cell, ValueKind::Float)),
        }
    }

    fn to_cell(&self, value: &FieldValue, ctx: &ConvertContext<'_>) -> ConvertResult<Cell> {
        match value {
            FieldValue::Float(Some(f)) => Ok(match ctx.format {
                Some(pattern) => Cell::Text(format_number(*f, pattern)),
                None => Cell::Float(*f),
            }),
            FieldValue::Float(None) => Ok(Cell::Empty),
            other => Err(kind_mismatch(ValueKind::Float, other)),
        }
    }
}

// =============================================================================
// Date
// =============================================================================

/// Calendar dates. Text cells are parsed with the field's pattern (or the
/// configured default); workbook serial date numbers are converted through
/// the 1900 epoch.
pub struct DateConverter;

/// Day zero of the 1900 date system, adjusted for the Lotus leap-year bug.
fn excel_epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(1899, 12, 30).expect("valid epoch date")
}

/// Workbook serial day number to calendar date. The time-of-day fraction is
/// dropped.
pub(crate) fn serial_to_date(serial: f64) -> Option<NaiveDate> {
    if serial < 0.0 {
        return None;
    }
    excel_epoch().checked_add_days(Days::new(serial.trunc() as u64))
}

impl Converter for DateConverter {
    fn from_cell(&self, cell: &Cell, ctx: &ConvertContext<'_>) -> ConvertResult<FieldValue> {
        if cell.is_blank(ctx.config.trim_values) {
            return Ok(FieldValue::Date(None));
        }
        let pattern = ctx.format.unwrap_or(&ctx.config.date_format);
        match cell {
            Cell::Date(d) => Ok(FieldValue::Date(Some(*d))),
            Cell::Text(s) => NaiveDate::parse_from_str(s.trim(), pattern)
                .map(|d| FieldValue::Date(Some(d)))
                .map_err(|_| ConvertError::Format {
                    value: s.trim().to_string(),
                    format: pattern.to_string(),
                }),
            Cell::Float(f) => serial_to_date(*f)
                .map(|d| FieldValue::Date(Some(d)))
                .ok_or_else(|| parse_error(cell, ValueKind::Date)),
            Cell::Int(i) => serial_to_date(*i as f64)
                .map(|d| FieldValue::Date(Some(d)))
                .ok_or_else(|| parse_error(cell, ValueKind::Date)),
            _ => Err(parse_error(cell, ValueKind::Date)),
        }
    }

    fn to_cell(&self, value: &FieldValue, ctx: &ConvertContext<'_>) -> ConvertResult<Cell> {
        let pattern = ctx.format.unwrap_or(&ctx.config.date_format);
        match value {
            FieldValue::Date(Some(d)) => Ok(Cell::Text(d.format(pattern).to_string())),
            FieldValue::Date(None) => Ok(Cell::Empty),
            other => Err(kind_mismatch(ValueKind::Date, other)),
        }
    }
}

// =============================================================================
// Decimal
// =============================================================================

/// Arbitrary-precision decimals, written as text to keep exactness across
/// storage formats.
pub struct DecimalConverter;

impl Converter for DecimalConverter {
    fn from_cell(&self, cell: &Cell, ctx: &ConvertContext<'_>) -> ConvertResult<FieldValue> {
        if cell.is_blank(ctx.config.trim_values) {
            return Ok(FieldValue::Decimal(None));
        }
        match cell {
            Cell::Text(s) => BigDecimal::from_str(&strip_grouping(s))
                .map(|d| FieldValue::Decimal(Some(d)))
                .map_err(|_| parse_error(cell, ValueKind::Decimal)),
            Cell::Int(i) => Ok(FieldValue::Decimal(Some(BigDecimal::from(*i)))),
            Cell::Float(f) => BigDecimal::try_from(*f)
                .map(|d| FieldValue::Decimal(Some(d)))
                .map_err(|_| parse_error(cell, ValueKind::Decimal)),
            _ => Err(parse_error(cell, ValueKind::Decimal)),
        }
    }

    fn to_cell(&self, value: &FieldValue, ctx: &ConvertContext<'_>) -> ConvertResult<Cell> {
        match value {
            FieldValue::Decimal(Some(d)) => Ok(match ctx.format {
                Some(pattern) => Cell::Text(format_decimal(d, pattern)),
                None => Cell::Text(d.to_string()),
            }),
            FieldValue::Decimal(None) => Ok(Cell::Empty),
            other => Err(kind_mismatch(ValueKind::Decimal, other)),
        }
    }
}

// =============================================================================
// Money
// =============================================================================

/// Currency-style decimal conversion: writes `$1,249.00`, parses any string
/// containing a decimal number surrounded by currency symbols and grouping.
///
/// Not active by default; register it for a field reference or globally:
///
/// ```ignore
/// sheetbind::register_named_converter("money", Arc::new(MoneyConverter));
/// ```
pub struct MoneyConverter;

impl Converter for MoneyConverter {
    fn from_cell(&self, cell: &Cell, ctx: &ConvertContext<'_>) -> ConvertResult<FieldValue> {
        if cell.is_blank(ctx.config.trim_values) {
            return Ok(FieldValue::Decimal(None));
        }
        let digits: String = cell
            .to_text()
            .chars()
            .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
            .collect();
        BigDecimal::from_str(&digits)
            .map(|d| FieldValue::Decimal(Some(d.with_scale_round(2, RoundingMode::HalfUp))))
            .map_err(|_| parse_error(cell, ValueKind::Decimal))
    }

    fn to_cell(&self, value: &FieldValue, _ctx: &ConvertContext<'_>) -> ConvertResult<Cell> {
        match value {
            FieldValue::Decimal(Some(d)) => {
                let plain = d.with_scale_round(2, RoundingMode::HalfUp).to_string();
                Ok(Cell::Text(format!("${}", group_thousands(&plain))))
            }
            FieldValue::Decimal(None) => Ok(Cell::Empty),
            other => Err(kind_mismatch(ValueKind::Decimal, other)),
        }
    }
}

// =============================================================================
// Number formatting helpers
// =============================================================================

/// Remove grouping separators before numeric parsing.
fn strip_grouping(s: &str) -> String {
    s.trim().replace(',', "")
}

/// Render a number with a `#,##0.00`-style pattern: a `,` anywhere in the
/// pattern enables thousands grouping, and the digits after `.` fix the
/// number of decimal places.
fn format_number(value: f64, pattern: &str) -> String {
    let decimals = pattern
        .split('.')
        .nth(1)
        .map(|frac| frac.chars().filter(|c| *c == '0' || *c == '#').count())
        .unwrap_or(0);
    let plain = format!("{:.*}", decimals, value);
    if pattern.contains(',') {
        group_thousands(&plain)
    } else {
        plain
    }
}

/// Same pattern handling for exact decimals.
fn format_decimal(value: &BigDecimal, pattern: &str) -> String {
    let decimals = pattern
        .split('.')
        .nth(1)
        .map(|frac| frac.chars().filter(|c| *c == '0' || *c == '#').count())
        .unwrap_or(0);
    let plain = value
        .with_scale_round(decimals as i64, RoundingMode::HalfUp)
        .to_string();
    if pattern.contains(',') {
        group_thousands(&plain)
    } else {
        plain
    }
}

/// Insert `,` every three digits in the integer part of a plain number.
fn group_thousands(plain: &str) -> String {
    let (sign, rest) = match plain.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", plain),
    };
    let (int_part, frac_part) = match rest.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (rest, None),
    };

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, c) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    match frac_part {
        Some(f) => format!("{}{}.{}", sign, grouped, f),
        None => format!("{}{}", sign, grouped),
    }
}
