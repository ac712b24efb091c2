//! Error types for the sheetbind mapping engine.
//!
//! This module defines a hierarchy of error types:
//!
//! - [`SchemaError`] - invalid field metadata, fatal for the whole operation
//! - [`ConvertError`] - a single cell failed to parse or format
//! - [`RowError`] - a cell/field failure with full row and column context
//! - [`SheetError`] - bad sheet selection
//! - [`ReadError`] / [`WriteError`] - top-level operation errors
//!
//! Error conversion is automatic via `From` implementations, allowing `?`
//! to work across error boundaries. Schema and sheet errors always abort an
//! operation; row-level errors abort a plain read but are collected by the
//! validator.

use serde::Serialize;
use thiserror::Error;

use crate::cell::ValueKind;

// =============================================================================
// Schema Errors
// =============================================================================

/// Errors while resolving field metadata into a column schema.
#[derive(Debug, Clone, Error)]
pub enum SchemaError {
    /// Two fields claim the same explicit column index.
    #[error("fields '{first}' and '{second}' both claim column index {index}")]
    DuplicateIndex {
        first: String,
        second: String,
        index: usize,
    },

    /// A field references a converter name that is not registered.
    #[error("unknown converter '{0}' (register it with register_named_converter)")]
    UnknownConverter(String),

    /// The record type declares no non-ignored fields.
    #[error("record type '{0}' has no mappable columns")]
    NoColumns(String),
}

// =============================================================================
// Conversion Errors
// =============================================================================

/// Errors converting between a raw cell and a typed field value.
#[derive(Debug, Clone, Error)]
pub enum ConvertError {
    /// The raw value cannot be parsed as the expected kind.
    #[error("cannot parse '{value}' as {expected}")]
    Parse { value: String, expected: ValueKind },

    /// The value does not match the declared format pattern.
    #[error("value '{value}' does not match format '{format}'")]
    Format { value: String, format: String },

    /// Anything a custom converter wants to report.
    #[error("{0}")]
    Other(String),
}

impl ConvertError {
    pub fn other(message: impl Into<String>) -> Self {
        ConvertError::Other(message.into())
    }
}

// =============================================================================
// Row Errors
// =============================================================================

/// A cell-level failure with enough context to pinpoint the offending cell
/// without re-reading the source: row number, column display name, raw value.
#[derive(Debug, Clone, Serialize)]
pub struct RowError {
    /// 1-based file row (the header is row 1).
    pub row: usize,
    /// Display name of the column.
    pub column: String,
    /// Human-readable reason.
    pub message: String,
    /// The offending raw value, when there was one.
    pub value: Option<String>,
}

impl RowError {
    pub fn new(row: usize, column: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            row,
            column: column.into(),
            message: message.into(),
            value: None,
        }
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }
}

impl std::fmt::Display for RowError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.value {
            Some(val) => write!(
                f,
                "Row {}, column '{}' (value '{}'): {}",
                self.row, self.column, val, self.message
            ),
            None => write!(f, "Row {}, column '{}': {}", self.row, self.column, self.message),
        }
    }
}

impl std::error::Error for RowError {}

// =============================================================================
// Sheet Errors
// =============================================================================

/// Errors selecting a sheet in a workbook.
#[derive(Debug, Clone, Error)]
pub enum SheetError {
    #[error("sheet '{name}' not found (available: {})", available.join(", "))]
    NameNotFound {
        name: String,
        available: Vec<String>,
    },

    #[error("sheet index {index} out of range (workbook has {count} sheets)")]
    IndexOutOfRange { index: usize, count: usize },
}

// =============================================================================
// Read Errors (top-level)
// =============================================================================

/// Errors while reading records from a source.
#[derive(Debug, Error)]
pub enum ReadError {
    #[error("failed to read source: {0}")]
    Io(#[from] std::io::Error),

    #[error("delimited parse error: {0}")]
    Csv(#[from] csv::Error),

    #[error("workbook error: {0}")]
    Workbook(String),

    #[error("failed to decode text encoding: {0}")]
    Encoding(String),

    #[error("source contains no header row")]
    EmptyFile,

    #[error("unsupported input format '{0}'")]
    UnsupportedFormat(String),

    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),

    #[error("sheet error: {0}")]
    Sheet(#[from] SheetError),

    #[error("{0}")]
    Row(#[from] RowError),
}

// =============================================================================
// Write Errors (top-level)
// =============================================================================

/// Errors while writing records to a destination.
#[derive(Debug, Error)]
pub enum WriteError {
    #[error("failed to write destination: {0}")]
    Io(#[from] std::io::Error),

    #[error("delimited write error: {0}")]
    Csv(#[from] csv::Error),

    #[error("workbook write error: {0}")]
    Xlsx(String),

    #[error("unsupported output format '{0}'")]
    UnsupportedFormat(String),

    #[error("workbook has no sheets to write")]
    NoSheets,

    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),

    #[error("conversion error: {0}")]
    Convert(#[from] ConvertError),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for schema resolution.
pub type SchemaResult<T> = Result<T, SchemaError>;

/// Result type for cell/value conversion.
pub type ConvertResult<T> = Result<T, ConvertError>;

/// Result type for read operations.
pub type ReadResult<T> = Result<T, ReadError>;

/// Result type for write operations.
pub type WriteResult<T> = Result<T, WriteError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_error_format() {
        let err = RowError::new(5, "Price", "cannot parse 'abc' as float").with_value("abc");
        let msg = err.to_string();
        assert!(msg.contains("Row 5"));
        assert!(msg.contains("column 'Price'"));
        assert!(msg.contains("value 'abc'"));
    }

    #[test]
    fn test_error_conversion_chain() {
        let row_err = RowError::new(3, "Name", "required field missing");
        let read_err: ReadError = row_err.into();
        assert!(read_err.to_string().contains("required field missing"));

        let schema_err = SchemaError::UnknownConverter("money".into());
        let read_err: ReadError = schema_err.into();
        assert!(read_err.to_string().contains("money"));
    }

    #[test]
    fn test_sheet_error_lists_available() {
        let err = SheetError::NameNotFound {
            name: "Orders".into(),
            available: vec!["Products".into(), "Employees".into()],
        };
        let msg = err.to_string();
        assert!(msg.contains("Orders"));
        assert!(msg.contains("Products, Employees"));
    }
}
