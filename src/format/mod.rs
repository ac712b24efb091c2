//! Format adapters: the abstract "sheet of rows of cells" boundary.
//!
//! The engine core never parses bytes. It consumes a [`RowSource`] (lazy,
//! forward-only rows of raw cells, header consumed at open) and produces
//! into a [`RowSink`]. One adapter exists per storage format:
//!
//! - [`delimited`] - CSV/TSV via the `csv` crate, with encoding and
//!   delimiter auto-detection on read
//! - [`xlsx`] - workbooks via `calamine` (read, including legacy `.xls`)
//!   and `rust_xlsxwriter` (write)

pub mod delimited;
pub mod xlsx;

pub use delimited::{DelimitedSink, DelimitedSource};
pub use xlsx::{WorkbookSource, XlsxSink};

use std::path::Path;

use crate::cell::Cell;
use crate::config::Config;
use crate::error::{ReadError, ReadResult, WriteError, WriteResult};
use crate::workbook::SheetSelector;

// =============================================================================
// Row source / sink traits
// =============================================================================

/// Lazy, forward-only producer of raw rows. The header row is consumed when
/// the source is opened and exposed via [`headers`](RowSource::headers);
/// `next_row` yields data rows only.
pub trait RowSource {
    fn headers(&self) -> &[String];
    fn next_row(&mut self) -> Option<ReadResult<Vec<Cell>>>;
}

/// Header metadata handed to a sink before any rows.
#[derive(Debug, Clone)]
pub struct SheetHeader {
    pub sheet_name: String,
    /// Column names by position; gap positions carry empty names.
    pub names: Vec<String>,
    /// Column width hints by position, in characters.
    pub widths: Vec<Option<usize>>,
    pub auto_size: bool,
    pub freeze_header: bool,
}

/// Consumer of ordered rows. `write_header` starts a sheet and may be called
/// again to start another one on formats that support multiple sheets;
/// single-sheet formats reject the second call.
pub trait RowSink {
    fn write_header(&mut self, header: &SheetHeader) -> WriteResult<()>;
    fn write_row(&mut self, cells: &[Cell]) -> WriteResult<()>;
    /// Flush and close the destination. Consumes the sink; nothing is
    /// guaranteed on disk until this returns.
    fn finish(self: Box<Self>) -> WriteResult<()>;
}

impl std::fmt::Debug for dyn RowSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("RowSink")
    }
}

// =============================================================================
// Options
// =============================================================================

/// Per-operation read settings. `config` shadows the process-wide
/// configuration for this operation only.
#[derive(Debug, Clone, Default)]
pub struct ReadOptions {
    /// Delimiter for delimited sources; auto-detected when unset.
    pub delimiter: Option<u8>,
    /// Sheet to read in workbook sources; defaults to the first sheet.
    pub sheet: Option<SheetSelector>,
    pub config: Option<Config>,
}

/// Per-operation write settings.
#[derive(Debug, Clone, Default)]
pub struct WriteOptions {
    /// Delimiter for delimited output; defaults by extension (`tsv` is
    /// tab-separated, everything else comma).
    pub delimiter: Option<u8>,
    /// Sheet name for workbook output.
    pub sheet_name: Option<String>,
    /// Auto-size workbook columns from their content.
    pub auto_size: bool,
    /// Freeze the header row in workbook output.
    pub freeze_header: bool,
    pub config: Option<Config>,
}

// =============================================================================
// Format detection and dispatch
// =============================================================================

/// The three storage formats, detected from the file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// Delimited text (`csv`, `tsv`, `txt`); a single implicit sheet.
    Delimited,
    /// Modern workbook (`xlsx`, `xlsm`).
    Xlsx,
    /// Legacy binary workbook (`xls`); read-only in this engine.
    LegacyXls,
}

pub fn detect_format(path: &Path) -> Option<Format> {
    match path.extension()?.to_str()?.to_lowercase().as_str() {
        "csv" | "tsv" | "txt" => Some(Format::Delimited),
        "xlsx" | "xlsm" => Some(Format::Xlsx),
        "xls" => Some(Format::LegacyXls),
        _ => None,
    }
}

fn extension_label(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or("<none>")
        .to_string()
}

/// Open a row source for any supported format.
pub fn open_source(path: &Path, options: &ReadOptions) -> ReadResult<Box<dyn RowSource>> {
    match detect_format(path) {
        Some(Format::Delimited) => Ok(Box::new(DelimitedSource::open(path, options.delimiter)?)),
        Some(Format::Xlsx) | Some(Format::LegacyXls) => {
            Ok(Box::new(WorkbookSource::open(path, options.sheet.as_ref())?))
        }
        None => Err(ReadError::UnsupportedFormat(extension_label(path))),
    }
}

/// Open a row sink for any supported writable format.
pub fn open_sink(path: &Path, options: &WriteOptions) -> WriteResult<Box<dyn RowSink>> {
    match detect_format(path) {
        Some(Format::Delimited) => {
            let delimiter = options.delimiter.unwrap_or_else(|| {
                match path.extension().and_then(|e| e.to_str()) {
                    Some(ext) if ext.eq_ignore_ascii_case("tsv") => b'\t',
                    _ => b',',
                }
            });
            Ok(Box::new(DelimitedSink::open(path, delimiter)?))
        }
        Some(Format::Xlsx) => Ok(Box::new(XlsxSink::new(path))),
        Some(Format::LegacyXls) => Err(WriteError::UnsupportedFormat(
            "xls (legacy workbook writing is not supported; write xlsx instead)".to_string(),
        )),
        None => Err(WriteError::UnsupportedFormat(extension_label(path))),
    }
}

/// Enumerate sheet names. Delimited text behaves as a single implicit sheet.
pub fn sheet_names(path: &Path) -> ReadResult<Vec<String>> {
    match detect_format(path) {
        Some(Format::Delimited) => Ok(vec!["Sheet1".to_string()]),
        Some(Format::Xlsx) | Some(Format::LegacyXls) => xlsx::sheet_names(path),
        None => Err(ReadError::UnsupportedFormat(extension_label(path))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_format_detection() {
        assert_eq!(
            detect_format(&PathBuf::from("data.csv")),
            Some(Format::Delimited)
        );
        assert_eq!(
            detect_format(&PathBuf::from("Data.TSV")),
            Some(Format::Delimited)
        );
        assert_eq!(
            detect_format(&PathBuf::from("report.xlsx")),
            Some(Format::Xlsx)
        );
        assert_eq!(
            detect_format(&PathBuf::from("legacy.xls")),
            Some(Format::LegacyXls)
        );
        assert_eq!(detect_format(&PathBuf::from("notes.pdf")), None);
        assert_eq!(detect_format(&PathBuf::from("no_extension")), None);
    }

    #[test]
    fn test_legacy_write_rejected() {
        let err = open_sink(&PathBuf::from("out.xls"), &WriteOptions::default()).unwrap_err();
        assert!(matches!(err, WriteError::UnsupportedFormat(_)));
    }
}
