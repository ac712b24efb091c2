//! Workbook adapter.
//!
//! Reading goes through `calamine`, which handles both modern `.xlsx`
//! archives and the legacy `.xls` binary format behind one interface.
//! Writing goes through `rust_xlsxwriter` and supports multiple sheets per
//! destination.

use std::path::{Path, PathBuf};

use calamine::{open_workbook_auto, Data, Reader};
use rust_xlsxwriter::{Format as XlsxFormat, Workbook};
use tracing::debug;

use super::{RowSink, RowSource, SheetHeader};
use crate::cell::Cell;
use crate::convert::serial_to_date;
use crate::error::{ReadError, ReadResult, SheetError, WriteError, WriteResult};
use crate::workbook::SheetSelector;

/// Workbook sheet names are capped by the file format.
const MAX_SHEET_NAME: usize = 31;

// =============================================================================
// Reading
// =============================================================================

pub struct WorkbookSource {
    headers: Vec<String>,
    rows: std::vec::IntoIter<Vec<Cell>>,
}

impl std::fmt::Debug for WorkbookSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkbookSource")
            .field("headers", &self.headers)
            .finish_non_exhaustive()
    }
}

impl WorkbookSource {
    /// Open one sheet of a workbook. `selector` defaults to the first sheet.
    ///
    /// calamine materializes the whole sheet range up front; streaming in
    /// this adapter therefore bounds decoded records, not file I/O.
    pub fn open(path: &Path, selector: Option<&SheetSelector>) -> ReadResult<Self> {
        let mut workbook =
            open_workbook_auto(path).map_err(|e| ReadError::Workbook(e.to_string()))?;
        let names = workbook.sheet_names().to_vec();
        if names.is_empty() {
            return Err(ReadError::Workbook("workbook has no sheets".to_string()));
        }

        let index = match selector {
            None => 0,
            Some(SheetSelector::Index(i)) => {
                if *i >= names.len() {
                    return Err(SheetError::IndexOutOfRange {
                        index: *i,
                        count: names.len(),
                    }
                    .into());
                }
                *i
            }
            Some(SheetSelector::Name(name)) => names
                .iter()
                .position(|n| n == name)
                .ok_or_else(|| SheetError::NameNotFound {
                    name: name.clone(),
                    available: names.clone(),
                })?,
        };

        let range = workbook
            .worksheet_range_at(index)
            .ok_or_else(|| ReadError::Workbook(format!("sheet {index} has no data range")))?
            .map_err(|e| ReadError::Workbook(e.to_string()))?;
        debug!(
            path = %path.display(),
            sheet = %names[index],
            rows = range.height(),
            "opened workbook sheet"
        );

        let mut raw = range.rows();
        let headers = raw
            .next()
            .map(|row| row.iter().map(|d| map_cell(d).to_text()).collect())
            .ok_or(ReadError::EmptyFile)?;
        let rows: Vec<Vec<Cell>> = raw
            .map(|row| row.iter().map(map_cell).collect())
            .collect();

        Ok(Self {
            headers,
            rows: rows.into_iter(),
        })
    }
}

impl RowSource for WorkbookSource {
    fn headers(&self) -> &[String] {
        &self.headers
    }

    fn next_row(&mut self) -> Option<ReadResult<Vec<Cell>>> {
        self.rows.next().map(Ok)
    }
}

/// Enumerate the sheet names of a workbook in declaration order.
pub fn sheet_names(path: &Path) -> ReadResult<Vec<String>> {
    let workbook = open_workbook_auto(path).map_err(|e| ReadError::Workbook(e.to_string()))?;
    Ok(workbook.sheet_names().to_vec())
}

fn map_cell(data: &Data) -> Cell {
    match data {
        Data::Empty => Cell::Empty,
        Data::String(s) => {
            if s.is_empty() {
                Cell::Empty
            } else {
                Cell::Text(s.clone())
            }
        }
        Data::Int(i) => Cell::Int(*i),
        Data::Float(f) => Cell::Float(*f),
        Data::Bool(b) => Cell::Bool(*b),
        Data::DateTime(serial) => match serial_to_date(serial.as_f64()) {
            Some(date) => Cell::Date(date),
            None => Cell::Float(serial.as_f64()),
        },
        Data::DateTimeIso(s) => Cell::Text(s.clone()),
        other => Cell::Text(other.to_string()),
    }
}

// =============================================================================
// Writing
// =============================================================================

struct SheetState {
    index: usize,
    next_row: u32,
    auto_size: bool,
}

pub struct XlsxSink {
    path: PathBuf,
    workbook: Workbook,
    sheets: Vec<SheetState>,
}

impl XlsxSink {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            workbook: Workbook::new(),
            sheets: Vec::new(),
        }
    }
}

fn xe(e: rust_xlsxwriter::XlsxError) -> WriteError {
    WriteError::Xlsx(e.to_string())
}

fn sanitize_sheet_name(name: &str) -> String {
    name.chars().take(MAX_SHEET_NAME).collect()
}

impl RowSink for XlsxSink {
    fn write_header(&mut self, header: &SheetHeader) -> WriteResult<()> {
        let index = self.sheets.len();
        let worksheet = self.workbook.add_worksheet();
        worksheet
            .set_name(sanitize_sheet_name(&header.sheet_name))
            .map_err(xe)?;

        let bold = XlsxFormat::new().set_bold();
        for (col, name) in header.names.iter().enumerate() {
            worksheet
                .write_string_with_format(0, col as u16, name, &bold)
                .map_err(xe)?;
        }
        for (col, width) in header.widths.iter().enumerate() {
            if let Some(chars) = width {
                worksheet
                    .set_column_width(col as u16, *chars as f64)
                    .map_err(xe)?;
            }
        }
        if header.freeze_header {
            worksheet.set_freeze_panes(1, 0).map_err(xe)?;
        }

        self.sheets.push(SheetState {
            index,
            next_row: 1,
            auto_size: header.auto_size,
        });
        Ok(())
    }

    fn write_row(&mut self, cells: &[Cell]) -> WriteResult<()> {
        let state = self.sheets.last_mut().ok_or_else(|| {
            WriteError::Xlsx("row written before any sheet header".to_string())
        })?;
        let worksheet = self
            .workbook
            .worksheet_from_index(state.index)
            .map_err(xe)?;

        let row = state.next_row;
        for (col, cell) in cells.iter().enumerate() {
            let col = col as u16;
            match cell {
                Cell::Empty => {}
                Cell::Text(s) => {
                    worksheet.write_string(row, col, s).map_err(xe)?;
                }
                Cell::Int(i) => {
                    worksheet.write_number(row, col, *i as f64).map_err(xe)?;
                }
                Cell::Float(f) => {
                    worksheet.write_number(row, col, *f).map_err(xe)?;
                }
                Cell::Bool(b) => {
                    worksheet.write_boolean(row, col, *b).map_err(xe)?;
                }
                Cell::Date(_) => {
                    worksheet.write_string(row, col, cell.to_text()).map_err(xe)?;
                }
            }
        }
        state.next_row += 1;
        Ok(())
    }

    fn finish(mut self: Box<Self>) -> WriteResult<()> {
        for state in &self.sheets {
            if state.auto_size {
                self.workbook
                    .worksheet_from_index(state.index)
                    .map_err(xe)?
                    .autofit();
            }
        }
        self.workbook.save(&self.path).map_err(xe)?;
        debug!(path = %self.path.display(), sheets = self.sheets.len(), "workbook saved");
        Ok(())
    }
}
