//! Streaming record reader.
//!
//! [`StreamingReader`] pulls one raw row at a time from a [`RowSource`],
//! decodes it against the record's resolved schema, and yields typed
//! records. Row numbers in errors are 1-based file rows, counting the
//! header, so the first data row is row 2. The iterator is terminal after
//! the first error.
//!
//! The one-at-a-time bound applies to decoded records. Delimited sources
//! also pull raw rows lazily from disk; workbook sources materialize the
//! sheet range when opened, so for those the bound does not cover raw cells.

use std::marker::PhantomData;
use std::path::Path;
use std::sync::Arc;

use tracing::debug;

use crate::codec;
use crate::config::Config;
use crate::error::ReadResult;
use crate::format::{open_source, ReadOptions, RowSource};
use crate::schema::{self, ColumnSchema, Record};

pub struct StreamingReader<T: Record> {
    source: Box<dyn RowSource>,
    schema: Arc<ColumnSchema>,
    config: Config,
    /// File row of the last consumed row; the header is row 1.
    row: usize,
    finished: bool,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Record> StreamingReader<T> {
    pub fn open(path: &Path, options: &ReadOptions) -> ReadResult<Self> {
        let config = options.config.clone().unwrap_or_else(Config::current);
        let schema = schema::resolve::<T>()?;
        let source = open_source(path, options)?;
        debug!(
            path = %path.display(),
            record = T::TYPE_NAME,
            columns = schema.columns().len(),
            "streaming reader opened"
        );
        Ok(Self {
            source,
            schema,
            config,
            row: 1,
            finished: false,
            _marker: PhantomData,
        })
    }

    /// Header names as read from the source, in file order.
    pub fn headers(&self) -> &[String] {
        self.source.headers()
    }

    /// Group the remaining records into batches of at most `size`.
    ///
    /// Panics if `size` is zero.
    pub fn batch(self, size: usize) -> Batches<T> {
        assert!(size > 0, "batch size must be positive");
        Batches {
            reader: self,
            size,
            pending_error: None,
        }
    }
}

impl<T: Record> Iterator for StreamingReader<T> {
    type Item = ReadResult<T>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.finished {
                return None;
            }
            let cells = match self.source.next_row() {
                None => {
                    self.finished = true;
                    return None;
                }
                Some(Err(e)) => {
                    self.finished = true;
                    return Some(Err(e));
                }
                Some(Ok(cells)) => cells,
            };
            self.row += 1;

            if self.config.skip_empty_rows && codec::row_is_empty(&cells, &self.config) {
                continue;
            }

            match codec::decode_row(&cells, self.row, &self.schema, &self.config) {
                Ok(record) => return Some(Ok(record)),
                Err(err) => {
                    self.finished = true;
                    return Some(Err(err.into()));
                }
            }
        }
    }
}

/// Batching wrapper over a [`StreamingReader`]. A read error surfaces after
/// the records decoded before it, so no successfully decoded record is lost.
pub struct Batches<T: Record> {
    reader: StreamingReader<T>,
    size: usize,
    pending_error: Option<crate::error::ReadError>,
}

impl<T: Record> Iterator for Batches<T> {
    type Item = ReadResult<Vec<T>>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(err) = self.pending_error.take() {
            return Some(Err(err));
        }

        let mut batch = Vec::with_capacity(self.size);
        while batch.len() < self.size {
            match self.reader.next() {
                None => break,
                Some(Ok(record)) => batch.push(record),
                Some(Err(err)) => {
                    if batch.is_empty() {
                        return Some(Err(err));
                    }
                    self.pending_error = Some(err);
                    break;
                }
            }
        }

        if batch.is_empty() {
            None
        } else {
            Some(Ok(batch))
        }
    }
}
