//! Multi-sheet workbook assembly.
//!
//! [`WorkbookWriter`] collects heterogeneous record slices, one per sheet,
//! and writes them in one pass. Rows are encoded eagerly when a sheet is
//! added, so conversion failures surface at the `sheet` call rather than
//! halfway through a write.

use std::path::Path;

use tracing::debug;

use crate::cell::Cell;
use crate::codec;
use crate::config::Config;
use crate::error::{WriteError, WriteResult};
use crate::format::{detect_format, open_sink, Format, SheetHeader, WriteOptions};
use crate::schema::{self, Record};

/// How to pick a sheet out of a workbook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SheetSelector {
    Name(String),
    /// 0-based position in the workbook's sheet order.
    Index(usize),
}

impl From<&str> for SheetSelector {
    fn from(name: &str) -> Self {
        SheetSelector::Name(name.to_string())
    }
}

impl From<String> for SheetSelector {
    fn from(name: String) -> Self {
        SheetSelector::Name(name)
    }
}

impl From<usize> for SheetSelector {
    fn from(index: usize) -> Self {
        SheetSelector::Index(index)
    }
}

struct PendingSheet {
    name: String,
    names: Vec<String>,
    widths: Vec<Option<usize>>,
    rows: Vec<Vec<Cell>>,
}

/// Builder for a workbook with one sheet per record type.
///
/// ```no_run
/// # use sheetbind::WorkbookWriter;
/// # fn demo<P: sheetbind::Record, E: sheetbind::Record>(
/// #     products: &[P],
/// #     employees: &[E],
/// # ) -> Result<(), Box<dyn std::error::Error>> {
/// WorkbookWriter::new()
///     .sheet("Products", products)?
///     .sheet("Employees", employees)?
///     .write("report.xlsx")?;
/// # Ok(())
/// # }
/// ```
#[derive(Default)]
pub struct WorkbookWriter {
    sheets: Vec<PendingSheet>,
}

impl WorkbookWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a sheet holding the given records, encoded under the current
    /// process-wide configuration.
    pub fn sheet<T: Record>(self, name: impl Into<String>, records: &[T]) -> WriteResult<Self> {
        self.sheet_with(name, records, &Config::current())
    }

    /// Add a sheet encoded under an explicit configuration.
    pub fn sheet_with<T: Record>(
        mut self,
        name: impl Into<String>,
        records: &[T],
        config: &Config,
    ) -> WriteResult<Self> {
        let resolved = schema::resolve::<T>()?;

        let mut rows = Vec::with_capacity(records.len());
        for record in records {
            rows.push(codec::encode_row(record, &resolved, config)?);
        }

        self.sheets.push(PendingSheet {
            name: name.into(),
            names: resolved.header_names(),
            widths: resolved.widths(),
            rows,
        });
        Ok(self)
    }

    pub fn sheet_count(&self) -> usize {
        self.sheets.len()
    }

    pub fn write(self, path: impl AsRef<Path>) -> WriteResult<()> {
        self.write_with(path, &WriteOptions::default())
    }

    pub fn write_with(self, path: impl AsRef<Path>, options: &WriteOptions) -> WriteResult<()> {
        let path = path.as_ref();
        if self.sheets.is_empty() {
            return Err(WriteError::NoSheets);
        }
        if detect_format(path) == Some(Format::Delimited) && self.sheets.len() > 1 {
            return Err(WriteError::UnsupportedFormat(format!(
                "delimited output holds a single sheet, workbook has {}",
                self.sheets.len()
            )));
        }

        let mut sink = open_sink(path, options)?;
        for sheet in &self.sheets {
            sink.write_header(&SheetHeader {
                sheet_name: sheet.name.clone(),
                names: sheet.names.clone(),
                widths: sheet.widths.clone(),
                auto_size: options.auto_size,
                freeze_header: options.freeze_header,
            })?;
            for row in &sheet.rows {
                sink.write_row(row)?;
            }
        }
        debug!(path = %path.display(), sheets = self.sheets.len(), "workbook written");
        sink.finish()
    }
}
