//! sheetbind - declarative mapping between typed records and tabular files.
//!
//! A record type describes its column bindings once, as ordered
//! [`FieldSpec`]s; the engine handles the rest: reading workbooks and
//! delimited text into typed records, writing records back out, streaming
//! large sources in batches, and validating files without aborting on the
//! first bad cell.
//!
//! ```no_run
//! use sheetbind::{FieldSpec, FieldValue, Record, ValueKind};
//!
//! struct Person {
//!     name: Option<String>,
//!     age: Option<i64>,
//! }
//!
//! impl Record for Person {
//!     const TYPE_NAME: &'static str = "demo::Person";
//!
//!     fn fields() -> Vec<FieldSpec> {
//!         vec![
//!             FieldSpec::new("Name", ValueKind::Text).required(),
//!             FieldSpec::new("Age", ValueKind::Int),
//!         ]
//!     }
//!
//!     fn values(&self) -> Vec<FieldValue> {
//!         vec![
//!             FieldValue::Text(self.name.clone()),
//!             FieldValue::Int(self.age),
//!         ]
//!     }
//!
//!     fn from_values(values: Vec<FieldValue>) -> Self {
//!         let mut it = values.into_iter();
//!         Self {
//!             name: it.next().and_then(FieldValue::into_text),
//!             age: it.next().and_then(FieldValue::into_int),
//!         }
//!     }
//! }
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let people: Vec<Person> = sheetbind::read("people.xlsx")?;
//! sheetbind::write("people.csv", &people)?;
//! # Ok(())
//! # }
//! ```

pub mod cell;
pub mod codec;
pub mod config;
pub mod convert;
pub mod error;
pub mod format;
pub mod schema;
pub mod stream;
pub mod validate;
pub mod workbook;

use std::path::Path;

// =============================================================================
// Re-exports
// =============================================================================

pub use cell::{Cell, FieldValue, ValueKind};
pub use config::{configure, reset_config, Config};
pub use convert::{
    register_converter, register_named_converter, reset_converters, ConvertContext, Converter,
};
pub use error::{
    ConvertError, ReadError, ReadResult, RowError, SchemaError, SheetError, WriteError,
    WriteResult,
};
pub use format::{Format, ReadOptions, WriteOptions};
pub use schema::{resolve_fields, ColumnSchema, FieldSpec, Record};
pub use stream::{Batches, StreamingReader};
pub use validate::{ReportStats, ValidationReport};
pub use workbook::{SheetSelector, WorkbookWriter};

// =============================================================================
// Facade operations
// =============================================================================

/// Read every record from a file, format detected by extension.
pub fn read<T: Record>(path: impl AsRef<Path>) -> ReadResult<Vec<T>> {
    read_with(path, &ReadOptions::default())
}

pub fn read_with<T: Record>(path: impl AsRef<Path>, options: &ReadOptions) -> ReadResult<Vec<T>> {
    stream_with(path, options)?.collect()
}

/// Open a lazy record iterator over a file.
pub fn stream<T: Record>(path: impl AsRef<Path>) -> ReadResult<StreamingReader<T>> {
    stream_with(path, &ReadOptions::default())
}

pub fn stream_with<T: Record>(
    path: impl AsRef<Path>,
    options: &ReadOptions,
) -> ReadResult<StreamingReader<T>> {
    StreamingReader::open(path.as_ref(), options)
}

/// Write records to a file as a single sheet, format detected by extension.
pub fn write<T: Record>(path: impl AsRef<Path>, records: &[T]) -> WriteResult<()> {
    write_with(path, records, &WriteOptions::default())
}

pub fn write_with<T: Record>(
    path: impl AsRef<Path>,
    records: &[T],
    options: &WriteOptions,
) -> WriteResult<()> {
    let name = options.sheet_name.clone().unwrap_or_else(|| "Sheet1".into());
    let config = options.config.clone().unwrap_or_else(Config::current);
    WorkbookWriter::new()
        .sheet_with(name, records, &config)?
        .write_with(path, options)
}

/// Validate a file against a record type without stopping at the first bad
/// cell. Collects every valid record and every field error in one pass.
pub fn validate<T: Record>(path: impl AsRef<Path>) -> ReadResult<ValidationReport<T>> {
    validate_with(path, &ReadOptions::default())
}

pub fn validate_with<T: Record>(
    path: impl AsRef<Path>,
    options: &ReadOptions,
) -> ReadResult<ValidationReport<T>> {
    let config = options.config.clone().unwrap_or_else(Config::current);
    let mut source = format::open_source(path.as_ref(), options)?;
    validate::validate_source(source.as_mut(), &config)
}

/// Read a file as raw cells: header names plus every data row, no schema
/// applied. The untyped access path for inspection tooling.
pub fn read_rows(
    path: impl AsRef<Path>,
    options: &ReadOptions,
) -> ReadResult<(Vec<String>, Vec<Vec<Cell>>)> {
    let mut source = format::open_source(path.as_ref(), options)?;
    let headers = source.headers().to_vec();
    let mut rows = Vec::new();
    while let Some(row) = source.next_row() {
        rows.push(row?);
    }
    Ok((headers, rows))
}

/// Sheet names of a workbook; delimited text reports a single implicit sheet.
pub fn sheet_names(path: impl AsRef<Path>) -> ReadResult<Vec<String>> {
    format::sheet_names(path.as_ref())
}

/// Start building a multi-sheet workbook.
pub fn workbook() -> WorkbookWriter {
    WorkbookWriter::new()
}
