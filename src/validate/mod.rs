//! Non-aborting validation.
//!
//! Validation decodes every row and keeps going past field errors, so one
//! pass yields both the clean records and the full error list. A row with
//! any field error contributes nothing to `valid_records`. Source-level
//! failures (I/O, malformed file) still abort the pass.

use std::collections::BTreeSet;
use std::time::Instant;

use serde::Serialize;
use tracing::debug;

use crate::cell::FieldValue;
use crate::codec;
use crate::config::Config;
use crate::error::{ReadResult, RowError};
use crate::format::RowSource;
use crate::schema::{self, ColumnSchema, Record};

/// Outcome of one validation pass.
#[derive(Debug)]
pub struct ValidationReport<T> {
    /// Every data row seen, including skipped empty rows.
    pub total_rows: usize,
    /// Records whose every field decoded cleanly, in file order.
    pub valid_records: Vec<T>,
    /// All field errors, in row order; a row may contribute several.
    pub errors: Vec<RowError>,
    /// Empty rows passed over under `skip_empty_rows`.
    pub skipped_rows: usize,
    pub duration_ms: u64,
}

/// The report's scalar counters, serializable for CLI/JSON output.
#[derive(Debug, Clone, Serialize)]
pub struct ReportStats {
    pub total_rows: usize,
    pub valid_count: usize,
    pub error_count: usize,
    pub skipped_rows: usize,
    pub success_rate: f64,
    pub duration_ms: u64,
}

impl<T> ValidationReport<T> {
    pub fn valid_count(&self) -> usize {
        self.valid_records.len()
    }

    /// Number of distinct invalid rows, not individual field errors.
    pub fn error_count(&self) -> usize {
        self.errors.iter().map(|e| e.row).collect::<BTreeSet<_>>().len()
    }

    /// Percentage of rows that decoded cleanly; 100.0 for an empty source.
    pub fn success_rate(&self) -> f64 {
        if self.total_rows == 0 {
            100.0
        } else {
            self.valid_count() as f64 / self.total_rows as f64 * 100.0
        }
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn stats(&self) -> ReportStats {
        ReportStats {
            total_rows: self.total_rows,
            valid_count: self.valid_count(),
            error_count: self.error_count(),
            skipped_rows: self.skipped_rows,
            success_rate: self.success_rate(),
            duration_ms: self.duration_ms,
        }
    }

    pub fn summary(&self) -> String {
        format!(
            "{} of {} rows valid ({:.1}%), {} invalid, {} skipped, {} ms",
            self.valid_count(),
            self.total_rows,
            self.success_rate(),
            self.error_count(),
            self.skipped_rows,
            self.duration_ms,
        )
    }
}

/// Validate every remaining row of `source` against the record's schema.
pub fn validate_source<T: Record>(
    source: &mut dyn RowSource,
    config: &Config,
) -> ReadResult<ValidationReport<T>> {
    let resolved = schema::resolve::<T>()?;
    run(source, &resolved, config, T::from_values)
}

/// Validation against a schema resolved at runtime, for callers without a
/// compile-time record type (the CLI's field-spec files). Valid rows come
/// back as declaration-ordered field values.
pub fn validate_untyped(
    source: &mut dyn RowSource,
    resolved: &ColumnSchema,
    config: &Config,
) -> ReadResult<ValidationReport<Vec<FieldValue>>> {
    run(source, resolved, config, |values| values)
}

fn run<T>(
    source: &mut dyn RowSource,
    resolved: &ColumnSchema,
    config: &Config,
    mut build: impl FnMut(Vec<FieldValue>) -> T,
) -> ReadResult<ValidationReport<T>> {
    let start = Instant::now();
    let mut report = ValidationReport {
        total_rows: 0,
        valid_records: Vec::new(),
        errors: Vec::new(),
        skipped_rows: 0,
        duration_ms: 0,
    };

    // Header is file row 1.
    let mut row = 1;
    while let Some(raw) = source.next_row() {
        let cells = raw?;
        row += 1;
        report.total_rows += 1;

        if config.skip_empty_rows && codec::row_is_empty(&cells, config) {
            report.skipped_rows += 1;
            continue;
        }

        let (values, mut field_errors) = codec::decode_fields(&cells, row, resolved, config);
        if field_errors.is_empty() {
            report.valid_records.push(build(values));
        } else {
            report.errors.append(&mut field_errors);
        }
    }

    report.duration_ms = start.elapsed().as_millis() as u64;
    debug!(
        total = report.total_rows,
        valid = report.valid_count(),
        invalid = report.error_count(),
        skipped = report.skipped_rows,
        "validation pass complete"
    );
    Ok(report)
}
