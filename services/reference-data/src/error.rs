//! Error types for the reference-data pipeline

use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by option-chain queries
///
/// A cache miss is not an error; it is the normal trigger for the full
/// fetch/parse/index pipeline. A failure at any stage caches nothing, so the
/// next query retries from the freshness check onward.
#[derive(Error, Debug)]
pub enum ReferenceError {
    /// No reference source is registered for the requested exchange segment
    #[error("no {broker} reference source for exchange {exchange}")]
    UnknownExchange {
        /// Broker whose registry was consulted
        broker: String,
        /// The unrecognized exchange code
        exchange: String,
    },

    /// HTTP client could not be constructed
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    /// Transport-level download failure; any previously cached file is left
    /// untouched
    #[error("fetch failed for {url}: {source}")]
    Fetch {
        /// Source URL that was being fetched
        url: String,
        /// Underlying transport error
        #[source]
        source: reqwest::Error,
    },

    /// Source responded with a non-success status
    #[error("fetch of {url} returned HTTP {status}")]
    HttpStatus {
        /// Source URL that was being fetched
        url: String,
        /// The non-2xx status code
        status: reqwest::StatusCode,
    },

    /// Archive is corrupt or unreadable
    #[error("archive {path} unreadable: {source}")]
    Archive {
        /// Path of the local archive file
        path: PathBuf,
        /// Underlying zip error
        #[source]
        source: zip::result::ZipError,
    },

    /// Archive contained no entry matching the expected payload suffix
    #[error("no entry matching '{suffix}' in archive {path}")]
    MissingEntry {
        /// Path of the local archive file
        path: PathBuf,
        /// Suffix the payload entry was expected to carry
        suffix: String,
    },

    /// Header row lacks a column the broker schema requires
    #[error("reference file missing required column '{column}'")]
    MissingColumn {
        /// Name of the missing column
        column: &'static str,
    },

    /// Malformed row encountered under strict parsing
    #[error("malformed reference row at line {line}: {reason}")]
    MalformedRow {
        /// 1-based line number within the reference file
        line: u64,
        /// What made the row unusable
        reason: String,
    },

    /// Filesystem error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV-level read error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Background parse/index task did not complete
    #[error("indexing task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Type alias for reference-data results
pub type RefResult<T> = Result<T, ReferenceError>;
