//! Streaming reader over a replay operations file
//!
//! `OpsReader` wraps `csv::Reader`, deserializes one row at a time and hands
//! each row to `csv_format::convert_csv_record`. The file is never loaded
//! into memory as a whole.
//!
//! # Error Handling
//!
//! - Opening the file fails with `FileNotFound` or `IoError`
//! - A malformed row is yielded as `ParseError` carrying its line number,
//!   and iteration continues with the next row

use crate::io::csv_format::{convert_csv_record, CsvRecord, LedgerOp};
use crate::types::LoyaltyError;
use csv::{ReaderBuilder, Trim};
use std::fs::File;
use std::io::ErrorKind;
use std::path::Path;

/// Iterator over the operations of a replay file
#[derive(Debug)]
pub struct OpsReader {
    reader: csv::Reader<File>,
    line_num: u64,
}

impl OpsReader {
    /// Open a replay file
    ///
    /// Fields are trimmed and rows may omit the trailing amount column.
    pub fn new(path: &Path) -> Result<Self, LoyaltyError> {
        let file = File::open(path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => LoyaltyError::FileNotFound {
                path: path.display().to_string(),
            },
            _ => LoyaltyError::from(e),
        })?;

        let reader = ReaderBuilder::new()
            .trim(Trim::All)
            .flexible(true)
            .buffer_capacity(8 * 1024)
            .from_reader(file);

        Ok(Self {
            reader,
            line_num: 1,
        })
    }
}

impl Iterator for OpsReader {
    type Item = Result<LedgerOp, LoyaltyError>;

    fn next(&mut self) -> Option<Self::Item> {
        let row = self.reader.deserialize::<CsvRecord>().next()?;
        self.line_num += 1;
        let line = Some(self.line_num);

        Some(match row {
            Ok(csv_record) => convert_csv_record(csv_record)
                .map_err(|message| LoyaltyError::ParseError { line, message }),
            Err(e) => Err(LoyaltyError::ParseError {
                line,
                message: e.to_string(),
            }),
        })
    }
}
