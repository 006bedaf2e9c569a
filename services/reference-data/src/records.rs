//! Streaming tabular record parser for broker reference files
//!
//! Reference files run to hundreds of thousands of rows, so records are
//! pulled one at a time from the underlying reader; memory use is constant
//! in file size. Column positions are resolved from the header row by name,
//! per the broker's [`RowSchema`], so the same reader serves every broker
//! family and tolerates column reordering.

use crate::config::RowSchema;
use crate::error::{RefResult, ReferenceError};
use csv::{ReaderBuilder, StringRecord};
use std::io::Read;
use tracing::warn;

// Cap per-scan warnings so a systematically bad file does not flood logs.
const MAX_ROW_WARNINGS: u64 = 10;

/// Malformed-row handling policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParsePolicy {
    /// Abort the scan on the first malformed row
    Strict,
    /// Skip malformed rows, keeping a count for diagnostics
    Lenient,
}

/// Option contract side
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionSide {
    /// Call option (CE)
    Call,
    /// Put option (PE)
    Put,
}

impl OptionSide {
    fn from_code(code: &str) -> Option<Self> {
        match code {
            "CE" => Some(OptionSide::Call),
            "PE" => Some(OptionSide::Put),
            _ => None,
        }
    }
}

/// One row of broker reference data, transient while streaming
///
/// Strike and expiry stay as the broker's raw text here; the indexer parses
/// them and decides what to do with unusable values.
#[derive(Debug, Clone)]
pub struct InstrumentRecord {
    /// Exchange code (e.g. "NFO")
    pub exchange: String,
    /// Underlying symbol (e.g. "NIFTY")
    pub symbol: String,
    /// Broker trading symbol
    pub trading_symbol: String,
    /// Opaque security/token id
    pub token: String,
    /// Instrument type (e.g. "OPTIDX")
    pub instrument: String,
    /// Option side, when the option-type column carries CE or PE
    pub option_side: Option<OptionSide>,
    /// Raw strike price text
    pub strike: String,
    /// Raw expiry date text in the broker's format
    pub expiry: String,
}

struct FieldIndices {
    exchange: usize,
    symbol: usize,
    trading_symbol: usize,
    token: usize,
    instrument: usize,
    option_type: usize,
    strike: usize,
    expiry: usize,
}

impl FieldIndices {
    fn resolve(headers: &StringRecord, schema: &RowSchema) -> RefResult<Self> {
        let find = |column: &'static str| {
            headers
                .iter()
                .position(|h| h.trim() == column)
                .ok_or(ReferenceError::MissingColumn { column })
        };

        Ok(Self {
            exchange: find(schema.columns.exchange)?,
            symbol: find(schema.columns.symbol)?,
            trading_symbol: find(schema.columns.trading_symbol)?,
            token: find(schema.columns.token)?,
            instrument: find(schema.columns.instrument)?,
            option_type: find(schema.columns.option_type)?,
            strike: find(schema.columns.strike)?,
            expiry: find(schema.columns.expiry)?,
        })
    }

    fn project(&self, row: &StringRecord) -> Option<InstrumentRecord> {
        Some(InstrumentRecord {
            exchange: row.get(self.exchange)?.to_owned(),
            symbol: row.get(self.symbol)?.to_owned(),
            trading_symbol: row.get(self.trading_symbol)?.to_owned(),
            token: row.get(self.token)?.to_owned(),
            instrument: row.get(self.instrument)?.to_owned(),
            option_side: OptionSide::from_code(row.get(self.option_type)?),
            strike: row.get(self.strike)?.to_owned(),
            expiry: row.get(self.expiry)?.to_owned(),
        })
    }
}

/// Pull-based reader over one reference file
///
/// Restartable per invocation (construct a new reader to rescan) and finite;
/// yields records until end of input. Under [`ParsePolicy::Lenient`],
/// malformed rows are skipped and counted; under [`ParsePolicy::Strict`] the
/// first malformed row ends the stream with an error.
pub struct RecordReader<R: Read> {
    reader: csv::Reader<R>,
    row: StringRecord,
    indices: FieldIndices,
    policy: ParsePolicy,
    skipped: u64,
}

impl<R: Read> RecordReader<R> {
    /// Create a reader over `read`, resolving columns from the header row.
    pub fn new(read: R, schema: &RowSchema, policy: ParsePolicy) -> RefResult<Self> {
        let mut reader = ReaderBuilder::new()
            .delimiter(schema.delimiter)
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(read);

        let headers = reader.headers()?.clone();
        let indices = FieldIndices::resolve(&headers, schema)?;

        Ok(Self {
            reader,
            row: StringRecord::new(),
            indices,
            policy,
            skipped: 0,
        })
    }

    /// Rows skipped so far under the lenient policy.
    pub fn skipped(&self) -> u64 {
        self.skipped
    }

    fn skip_row(&mut self, line: u64, reason: &str) {
        self.skipped += 1;
        if self.skipped <= MAX_ROW_WARNINGS {
            warn!(line, reason, "skipping malformed reference row");
        }
    }
}

impl<R: Read> Iterator for RecordReader<R> {
    type Item = RefResult<InstrumentRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.reader.read_record(&mut self.row) {
                Ok(false) => return None,
                Ok(true) => {
                    // The record's own position; the reader has already
                    // advanced past it.
                    let line = self.row.position().map_or(0, |p| p.line());
                    if let Some(record) = self.indices.project(&self.row) {
                        return Some(Ok(record));
                    }
                    match self.policy {
                        ParsePolicy::Strict => {
                            return Some(Err(ReferenceError::MalformedRow {
                                line,
                                reason: "wrong field count".to_string(),
                            }));
                        }
                        ParsePolicy::Lenient => self.skip_row(line, "wrong field count"),
                    }
                }
                Err(e) => {
                    let line = e
                        .position()
                        .map_or_else(|| self.reader.position().line(), |p| p.line());
                    match self.policy {
                        ParsePolicy::Strict => {
                            return Some(Err(ReferenceError::MalformedRow {
                                line,
                                reason: e.to_string(),
                            }));
                        }
                        ParsePolicy::Lenient => self.skip_row(line, "unreadable row"),
                    }
                }
            }
        }
    }
}
