//! Delimited text adapter (CSV, TSV and friends).
//!
//! Reading auto-detects character encoding (`chardet` over a leading sample,
//! decoded with `encoding_rs`) and the delimiter (most frequent candidate in
//! the header line) when not supplied. UTF-8 files stream straight from
//! disk; legacy encodings are decoded in full before parsing.

use std::fs::File;
use std::io::{BufReader, Cursor, Read, Seek, SeekFrom};
use std::path::Path;

use tracing::debug;

use super::{RowSink, RowSource, SheetHeader};
use crate::cell::Cell;
use crate::error::{ReadError, ReadResult, WriteError, WriteResult};

/// Bytes sampled from the head of the file for encoding and delimiter
/// detection.
const DETECTION_SAMPLE: usize = 64 * 1024;

const DELIMITER_CANDIDATES: [u8; 4] = [b',', b';', b'\t', b'|'];

// =============================================================================
// Reading
// =============================================================================

pub struct DelimitedSource {
    headers: Vec<String>,
    records: csv::StringRecordsIntoIter<Box<dyn Read + Send>>,
}

impl std::fmt::Debug for DelimitedSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DelimitedSource")
            .field("headers", &self.headers)
            .finish_non_exhaustive()
    }
}

impl DelimitedSource {
    pub fn open(path: &Path, delimiter: Option<u8>) -> ReadResult<Self> {
        let mut file = File::open(path)?;

        let mut sample = vec![0u8; DETECTION_SAMPLE];
        let sampled = read_up_to(&mut file, &mut sample)?;
        sample.truncate(sampled);
        if sample.is_empty() {
            return Err(ReadError::EmptyFile);
        }

        let encoding = detect_encoding(&sample);
        let delimiter = delimiter.unwrap_or_else(|| detect_delimiter(&sample));
        debug!(
            path = %path.display(),
            encoding = %encoding,
            delimiter = %(delimiter as char),
            "opening delimited source"
        );

        file.seek(SeekFrom::Start(0))?;
        let reader: Box<dyn Read + Send> = if encoding == "utf-8" {
            Box::new(BufReader::new(file))
        } else {
            let mut bytes = Vec::new();
            file.read_to_end(&mut bytes)?;
            Box::new(Cursor::new(decode_bytes(&bytes, &encoding)?.into_bytes()))
        };

        let mut csv_reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .flexible(true)
            .has_headers(true)
            .from_reader(reader);

        let headers: Vec<String> = csv_reader
            .headers()?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();
        if headers.iter().all(|h| h.is_empty()) {
            return Err(ReadError::EmptyFile);
        }

        Ok(Self {
            headers,
            records: csv_reader.into_records(),
        })
    }
}

impl RowSource for DelimitedSource {
    fn headers(&self) -> &[String] {
        &self.headers
    }

    fn next_row(&mut self) -> Option<ReadResult<Vec<Cell>>> {
        let record = match self.records.next()? {
            Ok(record) => record,
            Err(e) => return Some(Err(e.into())),
        };
        let cells = record
            .iter()
            .map(|field| {
                if field.is_empty() {
                    Cell::Empty
                } else {
                    Cell::Text(field.to_string())
                }
            })
            .collect();
        Some(Ok(cells))
    }
}

fn read_up_to(file: &mut File, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = file.read(&mut buf[filled..])?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}

/// Normalized encoding label for the sampled bytes. chardet's charset names
/// vary in case and aliasing, so the result is collapsed to the labels
/// `encoding_rs` resolves.
fn detect_encoding(sample: &[u8]) -> String {
    let (charset, confidence, _) = chardet::detect(sample);
    let normalized = match charset.to_lowercase().as_str() {
        "ascii" | "utf-8" | "" => "utf-8".to_string(),
        s if s.starts_with("iso-8859") => "iso-8859-1".to_string(),
        s if s.starts_with("windows-125") => "windows-1252".to_string(),
        other => other.to_string(),
    };
    debug!(charset = %charset, confidence, normalized = %normalized, "encoding detected");
    normalized
}

fn decode_bytes(bytes: &[u8], label: &str) -> ReadResult<String> {
    let encoding = encoding_rs::Encoding::for_label(label.as_bytes())
        .ok_or_else(|| ReadError::Encoding(format!("unknown charset '{label}'")))?;
    let (decoded, _, had_errors) = encoding.decode(bytes);
    if had_errors {
        return Err(ReadError::Encoding(format!(
            "file is not valid {}",
            encoding.name()
        )));
    }
    Ok(decoded.into_owned())
}

/// Most frequent candidate delimiter in the first line of the sample.
/// Falls back to comma when nothing matches.
fn detect_delimiter(sample: &[u8]) -> u8 {
    let first_line = sample
        .split(|&b| b == b'\n')
        .next()
        .unwrap_or(sample);
    DELIMITER_CANDIDATES
        .iter()
        .copied()
        .map(|d| (d, first_line.iter().filter(|&&b| b == d).count()))
        .max_by_key(|&(_, count)| count)
        .filter(|&(_, count)| count > 0)
        .map(|(d, _)| d)
        .unwrap_or(b',')
}

// =============================================================================
// Writing
// =============================================================================

pub struct DelimitedSink {
    writer: csv::Writer<File>,
    header_written: bool,
}

impl DelimitedSink {
    pub fn open(path: &Path, delimiter: u8) -> WriteResult<Self> {
        let file = File::create(path)?;
        let writer = csv::WriterBuilder::new()
            .delimiter(delimiter)
            .from_writer(file);
        Ok(Self {
            writer,
            header_written: false,
        })
    }
}

impl RowSink for DelimitedSink {
    fn write_header(&mut self, header: &SheetHeader) -> WriteResult<()> {
        if self.header_written {
            return Err(WriteError::UnsupportedFormat(
                "delimited output holds a single sheet".to_string(),
            ));
        }
        self.writer.write_record(&header.names)?;
        self.header_written = true;
        Ok(())
    }

    fn write_row(&mut self, cells: &[Cell]) -> WriteResult<()> {
        self.writer
            .write_record(cells.iter().map(|c| c.to_text()))?;
        Ok(())
    }

    fn finish(mut self: Box<Self>) -> WriteResult<()> {
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn temp_csv(content: &[u8], suffix: &str) -> NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(content).unwrap();
        file.flush().unwrap();
        file
    }

    fn drain(source: &mut DelimitedSource) -> Vec<Vec<Cell>> {
        let mut rows = Vec::new();
        while let Some(row) = source.next_row() {
            rows.push(row.unwrap());
        }
        rows
    }

    #[test]
    fn test_reads_headers_and_rows() {
        let file = temp_csv(b"name,age\nAlice,30\nBob,25\n", ".csv");
        let mut source = DelimitedSource::open(file.path(), None).unwrap();

        assert_eq!(source.headers(), ["name", "age"]);
        let rows = drain(&mut source);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0][0], Cell::Text("Alice".into()));
        assert_eq!(rows[1][1], Cell::Text("25".into()));
    }

    #[test]
    fn test_empty_fields_become_empty_cells() {
        let file = temp_csv(b"a,b,c\n1,,3\n", ".csv");
        let mut source = DelimitedSource::open(file.path(), None).unwrap();
        let rows = drain(&mut source);
        assert_eq!(rows[0][1], Cell::Empty);
    }

    #[test]
    fn test_empty_file_rejected() {
        let file = temp_csv(b"", ".csv");
        let err = DelimitedSource::open(file.path(), None).unwrap_err();
        assert!(matches!(err, ReadError::EmptyFile));
    }

    #[test]
    fn test_detects_semicolon_delimiter() {
        let file = temp_csv(b"name;age\nAlice;30\n", ".csv");
        let mut source = DelimitedSource::open(file.path(), None).unwrap();
        assert_eq!(source.headers(), ["name", "age"]);
        let rows = drain(&mut source);
        assert_eq!(rows[0][0], Cell::Text("Alice".into()));
    }

    #[test]
    fn test_detects_tab_delimiter() {
        let file = temp_csv(b"name\tage\nAlice\t30\n", ".tsv");
        let source = DelimitedSource::open(file.path(), None).unwrap();
        assert_eq!(source.headers(), ["name", "age"]);
    }

    #[test]
    fn test_explicit_delimiter_wins() {
        let file = temp_csv(b"a;b,c\n1;2,3\n", ".csv");
        let source = DelimitedSource::open(file.path(), Some(b';')).unwrap();
        assert_eq!(source.headers(), ["a", "b,c"]);
    }

    #[test]
    fn test_latin1_content_is_decoded() {
        // "Café,Zürich" in ISO-8859-1.
        let bytes = b"name,city\nCaf\xe9,Z\xfcrich\n";
        let file = temp_csv(bytes, ".csv");
        let mut source = DelimitedSource::open(file.path(), None).unwrap();
        let rows = drain(&mut source);
        assert_eq!(rows[0][0], Cell::Text("Café".into()));
        assert_eq!(rows[0][1], Cell::Text("Zürich".into()));
    }

    #[test]
    fn test_ragged_rows_are_tolerated() {
        let file = temp_csv(b"a,b,c\n1,2\n1,2,3,4\n", ".csv");
        let mut source = DelimitedSource::open(file.path(), None).unwrap();
        let rows = drain(&mut source);
        assert_eq!(rows[0].len(), 2);
        assert_eq!(rows[1].len(), 4);
    }

    #[test]
    fn test_sink_round_trip() {
        let file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        let path = file.path().to_path_buf();

        let mut sink: Box<dyn RowSink> = Box::new(DelimitedSink::open(&path, b',').unwrap());
        sink.write_header(&SheetHeader {
            sheet_name: "Sheet1".into(),
            names: vec!["name".into(), "score".into()],
            widths: vec![None, None],
            auto_size: false,
            freeze_header: false,
        })
        .unwrap();
        sink.write_row(&[Cell::Text("Alice".into()), Cell::Float(9.5)])
            .unwrap();
        sink.finish().unwrap();

        let mut source = DelimitedSource::open(&path, None).unwrap();
        assert_eq!(source.headers(), ["name", "score"]);
        let rows = drain(&mut source);
        assert_eq!(rows[0][1], Cell::Text("9.5".into()));
    }

    #[test]
    fn test_second_header_rejected() {
        let file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        let mut sink = DelimitedSink::open(file.path(), b',').unwrap();
        let header = SheetHeader {
            sheet_name: "One".into(),
            names: vec!["a".into()],
            widths: vec![None],
            auto_size: false,
            freeze_header: false,
        };
        sink.write_header(&header).unwrap();
        let err = sink.write_header(&header).unwrap_err();
        assert!(matches!(err, WriteError::UnsupportedFormat(_)));
    }
}
