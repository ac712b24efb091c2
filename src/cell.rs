//! Raw cell values and typed field values.
//!
//! [`Cell`] is the value exchanged with format adapters: whatever a storage
//! format natively stores at one row/column position. [`FieldValue`] is the
//! typed-but-nullable value of one record field. Converters translate between
//! the two; nothing else in the engine touches format-specific data.

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde::Serialize;

// =============================================================================
// Cell
// =============================================================================

/// One raw value at a row/column position in the abstract tabular view.
///
/// Delimited text only ever produces `Empty` and `Text`; workbook formats
/// additionally produce the native primitive variants.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Cell {
    /// Absent or blank cell.
    Empty,
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Date(NaiveDate),
}

impl Cell {
    /// Raw textual rendering, used for error context and delimited output.
    pub fn to_text(&self) -> String {
        match self {
            Cell::Empty => String::new(),
            Cell::Text(s) => s.clone(),
            Cell::Int(i) => i.to_string(),
            Cell::Float(f) => {
                if f.fract() == 0.0 && f.abs() < 1e15 {
                    format!("{}", *f as i64)
                } else {
                    f.to_string()
                }
            }
            Cell::Bool(b) => b.to_string(),
            Cell::Date(d) => d.format("%Y-%m-%d").to_string(),
        }
    }

    /// Whether this cell counts as blank. With `trim` set, whitespace-only
    /// text is blank too.
    pub fn is_blank(&self, trim: bool) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => {
                if trim {
                    s.trim().is_empty()
                } else {
                    s.is_empty()
                }
            }
            _ => false,
        }
    }
}

impl std::fmt::Display for Cell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_text())
    }
}

// =============================================================================
// ValueKind
// =============================================================================

/// Semantic type of a field, used as the converter dispatch key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    Text,
    Int,
    Float,
    Bool,
    Date,
    Decimal,
}

impl ValueKind {
    pub fn name(self) -> &'static str {
        match self {
            ValueKind::Text => "text",
            ValueKind::Int => "int",
            ValueKind::Float => "float",
            ValueKind::Bool => "bool",
            ValueKind::Date => "date",
            ValueKind::Decimal => "decimal",
        }
    }
}

impl std::fmt::Display for ValueKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// FieldValue
// =============================================================================

/// A typed field value. Every variant is nullable: an empty cell with no
/// default decodes to the `None` of the field's kind.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(Option<String>),
    Int(Option<i64>),
    Float(Option<f64>),
    Bool(Option<bool>),
    Date(Option<NaiveDate>),
    Decimal(Option<BigDecimal>),
}

impl FieldValue {
    /// The null value of the given kind.
    pub fn none(kind: ValueKind) -> Self {
        match kind {
            ValueKind::Text => FieldValue::Text(None),
            ValueKind::Int => FieldValue::Int(None),
            ValueKind::Float => FieldValue::Float(None),
            ValueKind::Bool => FieldValue::Bool(None),
            ValueKind::Date => FieldValue::Date(None),
            ValueKind::Decimal => FieldValue::Decimal(None),
        }
    }

    pub fn kind(&self) -> ValueKind {
        match self {
            FieldValue::Text(_) => ValueKind::Text,
            FieldValue::Int(_) => ValueKind::Int,
            FieldValue::Float(_) => ValueKind::Float,
            FieldValue::Bool(_) => ValueKind::Bool,
            FieldValue::Date(_) => ValueKind::Date,
            FieldValue::Decimal(_) => ValueKind::Decimal,
        }
    }

    pub fn is_none(&self) -> bool {
        match self {
            FieldValue::Text(v) => v.is_none(),
            FieldValue::Int(v) => v.is_none(),
            FieldValue::Float(v) => v.is_none(),
            FieldValue::Bool(v) => v.is_none(),
            FieldValue::Date(v) => v.is_none(),
            FieldValue::Decimal(v) => v.is_none(),
        }
    }

    // Accessors used by `Record::from_values` implementations. A kind
    // mismatch yields `None` rather than panicking.

    pub fn into_text(self) -> Option<String> {
        match self {
            FieldValue::Text(v) => v,
            _ => None,
        }
    }

    pub fn into_int(self) -> Option<i64> {
        match self {
            FieldValue::Int(v) => v,
            _ => None,
        }
    }

    pub fn into_float(self) -> Option<f64> {
        match self {
            FieldValue::Float(v) => v,
            _ => None,
        }
    }

    pub fn into_bool(self) -> Option<bool> {
        match self {
            FieldValue::Bool(v) => v,
            _ => None,
        }
    }

    pub fn into_date(self) -> Option<NaiveDate> {
        match self {
            FieldValue::Date(v) => v,
            _ => None,
        }
    }

    pub fn into_decimal(self) -> Option<BigDecimal> {
        match self {
            FieldValue::Decimal(v) => v,
            _ => None,
        }
    }
}
