//! Multi-record query results.

use csv::{ReaderBuilder, StringRecord};

use super::error::Result;
use super::reply::LINE_END;

/// One comma-separated row, fields in device order.
pub type Record = Vec<String>;

/// Rows of a validated multi-record reply, parsed lazily.
///
/// The device exchange has already completed by the time this exists.
/// Cloning replays the same buffer; it never queries the device again.
#[derive(Debug, Clone, Default)]
pub struct MultiRecords {
    body: String,
    pos: usize,
    declared: usize,
}

impl MultiRecords {
    /// No rows (the device reported an empty log).
    pub fn empty() -> Self {
        Self::default()
    }

    pub(crate) fn new(body: String, declared: usize) -> Self {
        Self { body, pos: 0, declared }
    }

    /// Record count announced in the reply footer (0 for an empty log).
    pub fn declared_count(&self) -> usize {
        self.declared
    }
}

impl Iterator for MultiRecords {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Result<Record>> {
        while self.pos < self.body.len() {
            let rest = &self.body[self.pos..];
            let (line, advance) = match rest.find(LINE_END) {
                Some(end) => (&rest[..end], end + LINE_END.len()),
                None => (rest, rest.len()),
            };
            self.pos += advance;

            if !line.is_empty() {
                return Some(parse_record(line));
            }
        }
        None
    }
}

/// Split one line into its fields. Quoted fields may contain commas.
pub fn parse_record(line: &str) -> Result<Record> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(line.as_bytes());

    let mut record = StringRecord::new();
    reader.read_record(&mut record)?;
    Ok(record.iter().map(str::to_string).collect())
}
