//! Service configuration and the broker source registry
//!
//! Every broker-specific detail lives here as data: download URLs, local
//! file names, container kind, column names, expiry date format, and the
//! symbol match rule per exchange segment. The parsing and indexing code is
//! broker-agnostic and consumes these descriptors.

use crate::records::ParsePolicy;
use chrono::NaiveTime;
use rustc_hash::FxHashMap;
use std::path::PathBuf;
use std::time::Duration;

// Freshness cutoff: 01:30 UTC == 07:00 IST, after brokers publish the
// day's files.
const DEFAULT_CUTOFF_HOUR: u32 = 1;
const DEFAULT_CUTOFF_MINUTE: u32 = 30;

const DEFAULT_CACHE_TTL_SECS: u64 = 4 * 3600;
const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 30;

/// Reference-data service configuration
#[derive(Debug, Clone)]
pub struct ReferenceConfig {
    /// Directory holding the downloaded reference files
    pub symbols_dir: PathBuf,

    /// Daily wall-clock instant (UTC) after which cached files are stale
    pub cutoff_utc: NaiveTime,

    /// Time-to-live for computed option-chain results
    pub cache_ttl: Duration,

    /// Timeout applied to each reference-file download
    pub fetch_timeout: Duration,

    /// Malformed-row handling while parsing
    pub parse_policy: ParsePolicy,
}

impl Default for ReferenceConfig {
    fn default() -> Self {
        Self {
            symbols_dir: PathBuf::from("./symbols"),
            cutoff_utc: NaiveTime::from_hms_opt(DEFAULT_CUTOFF_HOUR, DEFAULT_CUTOFF_MINUTE, 0)
                .expect("01:30:00 is a valid wall-clock time"),
            cache_ttl: Duration::from_secs(DEFAULT_CACHE_TTL_SECS),
            fetch_timeout: Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECS),
            parse_policy: ParsePolicy::Lenient,
        }
    }
}

/// Supported broker reference-file families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Broker {
    /// Plain CSV scripmaster files published on S3
    Flattrade,
    /// Zipped text symbol files published on the broker API host
    Shoonya,
}

impl Broker {
    /// Broker name as used in logs and error messages
    pub fn as_str(&self) -> &'static str {
        match self {
            Broker::Flattrade => "flattrade",
            Broker::Shoonya => "shoonya",
        }
    }

    /// Default source registry for this broker, keyed by exchange code
    pub fn sources(&self) -> FxHashMap<String, SourceSpec> {
        let specs = match self {
            Broker::Flattrade => vec![
                (
                    "NFO",
                    SourceSpec {
                        url: "https://flattrade.s3.ap-south-1.amazonaws.com/scripmaster/Nfo_Index_Derivatives.csv".to_string(),
                        file_name: "Nfo_Index_Derivatives.csv".to_string(),
                        container: Container::Plain,
                        match_rule: MatchRule::Exact,
                        schema: FLATTRADE_SCHEMA,
                    },
                ),
                (
                    "BFO",
                    SourceSpec {
                        url: "https://flattrade.s3.ap-south-1.amazonaws.com/scripmaster/Bfo_Index_Derivatives.csv".to_string(),
                        file_name: "Bfo_Index_Derivatives.csv".to_string(),
                        container: Container::Plain,
                        match_rule: MatchRule::Exact,
                        schema: FLATTRADE_SCHEMA,
                    },
                ),
            ],
            Broker::Shoonya => vec![
                (
                    "NFO",
                    SourceSpec {
                        url: "https://api.shoonya.com/NFO_symbols.txt.zip".to_string(),
                        file_name: "NFO_symbols.txt.zip".to_string(),
                        container: Container::Zip,
                        match_rule: MatchRule::Exact,
                        schema: SHOONYA_SCHEMA,
                    },
                ),
                (
                    "BFO",
                    SourceSpec {
                        url: "https://api.shoonya.com/BFO_symbols.txt.zip".to_string(),
                        file_name: "BFO_symbols.txt.zip".to_string(),
                        container: Container::Zip,
                        // BFO index derivatives encode a different root token
                        // than the logical symbol, so matching is by mapped
                        // prefix rather than equality.
                        match_rule: MatchRule::MappedPrefix,
                        schema: SHOONYA_SCHEMA,
                    },
                ),
            ],
        };

        specs
            .into_iter()
            .map(|(exchange, spec)| (exchange.to_string(), spec))
            .collect()
    }
}

/// How the reference file is packaged at the source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Container {
    /// Raw tabular file
    Plain,
    /// Zip archive containing exactly one tabular text payload
    Zip,
}

/// How a requested underlying symbol is matched against the symbol column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchRule {
    /// Exact equality with the symbol column
    Exact,
    /// Prefix match against the mapped broker root token
    MappedPrefix,
}

/// Column names of one broker family's reference file
#[derive(Debug, Clone, Copy)]
pub struct ColumnNames {
    /// Exchange code column
    pub exchange: &'static str,
    /// Underlying symbol column
    pub symbol: &'static str,
    /// Trading symbol column
    pub trading_symbol: &'static str,
    /// Security/token id column
    pub token: &'static str,
    /// Instrument/segment type column
    pub instrument: &'static str,
    /// Option type (CE/PE) column
    pub option_type: &'static str,
    /// Strike price column
    pub strike: &'static str,
    /// Expiry date column
    pub expiry: &'static str,
}

/// Tabular layout of one broker family's reference file
#[derive(Debug, Clone, Copy)]
pub struct RowSchema {
    /// Field delimiter
    pub delimiter: u8,
    /// chrono format string for the expiry column
    pub expiry_format: &'static str,
    /// Instrument column value that marks an index option contract
    pub option_instrument: &'static str,
    /// Header names for the fields the indexer consumes
    pub columns: ColumnNames,
}

/// One downloadable reference source for one exchange segment
#[derive(Debug, Clone)]
pub struct SourceSpec {
    /// Download URL
    pub url: String,
    /// File name under the symbols directory
    pub file_name: String,
    /// Packaging of the payload
    pub container: Container,
    /// Symbol matching rule for chain queries against this source
    pub match_rule: MatchRule,
    /// Tabular layout of the payload
    pub schema: RowSchema,
}

/// Flattrade scripmaster layout (`Nfo_Index_Derivatives.csv` family)
pub const FLATTRADE_SCHEMA: RowSchema = RowSchema {
    delimiter: b',',
    expiry_format: "%d-%b-%Y",
    option_instrument: "OPTIDX",
    columns: ColumnNames {
        exchange: "Exchange",
        symbol: "Symbol",
        trading_symbol: "Tradingsymbol",
        token: "Token",
        instrument: "Instrument",
        option_type: "Optiontype",
        strike: "Strike",
        expiry: "Expiry",
    },
};

/// Shoonya symbol-file layout (`NFO_symbols.txt` family)
pub const SHOONYA_SCHEMA: RowSchema = RowSchema {
    delimiter: b',',
    expiry_format: "%d-%b-%Y",
    option_instrument: "OPTIDX",
    columns: ColumnNames {
        exchange: "Exchange",
        symbol: "Symbol",
        trading_symbol: "TradingSymbol",
        token: "Token",
        instrument: "Instrument",
        option_type: "OptionType",
        strike: "StrikePrice",
        expiry: "Expiry",
    },
};
