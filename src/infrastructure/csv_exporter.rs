//! CSV Exporter
//!
//! Persists assertion records as a table with the columns
//! `filepath, testclass, testname, assertion_type, line_number, assert_string`,
//! and reads such a table back for batch processing.

use std::io::{Read, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::domain::assertion::{AssertionKind, AssertionRecord};
use crate::error::{ProbeError, Result};
use crate::ports::RecordExporter;

/// One CSV row; field names are the column headers.
#[derive(Debug, Serialize)]
struct AssertionRow<'a> {
    filepath: &'a str,
    testclass: &'a str,
    testname: &'a str,
    assertion_type: AssertionKind,
    line_number: usize,
    assert_string: &'a str,
}

impl<'a> From<&'a AssertionRecord> for AssertionRow<'a> {
    fn from(record: &'a AssertionRecord) -> Self {
        Self {
            filepath: &record.filepath,
            testclass: &record.enclosing_class,
            testname: &record.enclosing_function,
            assertion_type: record.kind,
            line_number: record.line_number,
            assert_string: &record.source_text,
        }
    }
}

/// A row read back from a table; columns are matched by header name.
#[derive(Debug, Deserialize)]
struct OwnedAssertionRow {
    filepath: String,
    testclass: String,
    testname: String,
    assertion_type: AssertionKind,
    line_number: usize,
    assert_string: String,
}

impl From<OwnedAssertionRow> for AssertionRecord {
    fn from(row: OwnedAssertionRow) -> Self {
        Self {
            filepath: row.filepath,
            enclosing_class: row.testclass,
            enclosing_function: row.testname,
            kind: row.assertion_type,
            line_number: row.line_number,
            source_text: row.assert_string,
        }
    }
}

pub const HEADER: [&str; 6] = [
    "filepath",
    "testclass",
    "testname",
    "assertion_type",
    "line_number",
    "assert_string",
];

pub struct CsvExporter;

impl CsvExporter {
    /// Write `records` to any writer. The header row is always present.
    pub fn write_to<W: Write>(records: &[AssertionRecord], writer: W) -> Result<()> {
        let mut csv = csv::WriterBuilder::new().has_headers(false).from_writer(writer);
        csv.write_record(HEADER)?;
        for record in records {
            csv.serialize(AssertionRow::from(record))?;
        }
        csv.flush().map_err(ProbeError::Io)
    }

    /// Read a table written by `write_to` (or any CSV with the same headers).
    pub fn read_from<R: Read>(reader: R) -> Result<Vec<AssertionRecord>> {
        let mut csv = csv::Reader::from_reader(reader);
        let mut records = Vec::new();
        for row in csv.deserialize::<OwnedAssertionRow>() {
            records.push(row?.into());
        }
        Ok(records)
    }

    pub fn load(path: &Path) -> Result<Vec<AssertionRecord>> {
        let file = std::fs::File::open(path).map_err(|source| ProbeError::FileAccess {
            path: path.to_path_buf(),
            source,
        })?;
        Self::read_from(file)
    }
}

impl RecordExporter for CsvExporter {
    fn export(&self, records: &[AssertionRecord], path: &Path) -> Result<()> {
        let file = std::fs::File::create(path).map_err(|source| ProbeError::FileAccess {
            path: path.to_path_buf(),
            source,
        })?;
        Self::write_to(records, file)
    }
}
