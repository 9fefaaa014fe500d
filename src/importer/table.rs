//! Header-checked CSV table reader
//!
//! Reads one archive table file. The header must name every required column;
//! column order is free and extra columns are ignored. Every data row must
//! have as many fields as the header.

use crate::error::{MudataError, Result};
use csv::{ReaderBuilder, StringRecordsIntoIter};
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

/// Byte offsets of the line terminators of one file
///
/// The csv reader skips blank lines without counting them, and a record's
/// reported byte position is where the reader resumed, before any skipped
/// blank lines. Line numbers are therefore derived from the raw bytes.
#[derive(Debug, Default)]
struct LineIndex {
    /// Offsets of every `\r` and `\n`, ascending
    terminators: Vec<u64>,
    /// Offsets of every `\n`, ascending
    newlines: Vec<u64>,
}

impl LineIndex {
    fn scan(source: impl Read) -> std::io::Result<Self> {
        let mut reader = BufReader::new(source);
        let mut index = Self::default();
        let mut offset = 0u64;
        loop {
            let buf = reader.fill_buf()?;
            if buf.is_empty() {
                break;
            }
            for (i, byte) in buf.iter().enumerate() {
                let at = offset + i as u64;
                match byte {
                    b'\n' => {
                        index.terminators.push(at);
                        index.newlines.push(at);
                    }
                    b'\r' => index.terminators.push(at),
                    _ => {}
                }
            }
            let len = buf.len();
            offset += len as u64;
            reader.consume(len);
        }
        Ok(index)
    }

    /// 1-based line of the record whose read resumed at byte `resume`
    fn record_line(&self, resume: u64) -> u64 {
        // step over the blank lines skipped before the record
        let mut start = resume;
        let mut i = self.terminators.partition_point(|&t| t < start);
        while self.terminators.get(i) == Some(&start) {
            start += 1;
            i += 1;
        }
        self.newlines.partition_point(|&n| n < start) as u64 + 1
    }
}

/// Required field values of one data row, in required-column order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRow {
    line: u64,
    names: &'static [&'static str],
    values: Vec<String>,
}

impl TableRow {
    /// 1-based line of the row in its file; the header is line 1
    pub fn line(&self) -> u64 {
        self.line
    }

    /// Value of a required column
    pub fn get(&self, name: &str) -> &str {
        self.names
            .iter()
            .position(|n| *n == name)
            .and_then(|i| self.values.get(i))
            .map(String::as_str)
            .unwrap_or("")
    }
}

/// Iterator over the data rows of one table file
pub struct TableReader {
    file: String,
    names: &'static [&'static str],
    positions: Vec<usize>,
    width: usize,
    records: StringRecordsIntoIter<File>,
    lines: LineIndex,
    rows_read: usize,
}

impl TableReader {
    /// Open a table file and check its header against the required columns
    pub fn open(path: &Path, required: &'static [&'static str]) -> Result<Self> {
        let file = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        let lines = LineIndex::scan(File::open(path)?)?;
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_path(path)
            .map_err(|e| MudataError::csv(&file, e))?;
        let header = reader
            .headers()
            .map_err(|e| MudataError::csv(&file, e))?
            .clone();

        let missing: Vec<String> = required
            .iter()
            .filter(|name| !header.iter().any(|h| h == **name))
            .map(|name| name.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(MudataError::MissingRequiredColumns {
                file,
                columns: missing,
            });
        }

        let positions = required
            .iter()
            .filter_map(|name| header.iter().position(|h| h == *name))
            .collect();

        Ok(Self {
            file,
            names: required,
            positions,
            width: header.len(),
            records: reader.into_records(),
            lines,
            rows_read: 0,
        })
    }

    pub fn file(&self) -> &str {
        &self.file
    }

    /// Number of fields every data row must have
    pub fn width(&self) -> usize {
        self.width
    }

    pub fn rows_read(&self) -> usize {
        self.rows_read
    }
}

impl Iterator for TableReader {
    type Item = Result<TableRow>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let record = match self.records.next()? {
                Ok(record) => record,
                Err(e) => return Some(Err(MudataError::csv(&self.file, e))),
            };
            // blank lines carry no fields
            if record.is_empty() {
                continue;
            }

            let line = record
                .position()
                .map(|p| self.lines.record_line(p.byte()))
                .unwrap_or(0);
            if record.len() != self.width {
                return Some(Err(MudataError::MalformedRow {
                    file: self.file.clone(),
                    line,
                    expected: self.width,
                    actual: record.len(),
                }));
            }

            self.rows_read += 1;
            let values = self
                .positions
                .iter()
                .map(|&i| record.get(i).unwrap_or("").to_string())
                .collect();
            return Some(Ok(TableRow {
                line,
                names: self.names,
                values,
            }));
        }
    }
}
