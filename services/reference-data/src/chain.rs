//! Option-chain classification and indexing
//!
//! Consumes a stream of [`InstrumentRecord`]s and accumulates the chain for
//! one (exchange, symbol) pair: call and put strike lists sorted ascending
//! by strike price, and the deduplicated calendar of future expiry dates.
//! Symbol matching is exact or mapped-prefix depending on the source.

use crate::config::{MatchRule, RowSchema};
use crate::error::RefResult;
use crate::records::{InstrumentRecord, OptionSide};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::{debug, warn};

const MAX_DROP_WARNINGS: u64 = 10;

/// Broker root token for logical index symbols whose BFO contracts encode a
/// different root than the symbol itself. Unmapped symbols pass through.
fn broker_root(symbol: &str) -> &str {
    match symbol {
        "SENSEX" => "BSXOPT",
        "BANKEX" => "BKXOPT",
        "SENSEX50" => "SX50OPT",
        other => other,
    }
}

/// One strike of the chain, as returned to callers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrikeEntry {
    /// Broker trading symbol of the contract
    pub trading_symbol: String,
    /// Opaque security/token id
    pub security_id: String,
    /// Expiry date as the broker publishes it
    pub expiry_date: String,
    /// Strike price
    pub strike_price: f64,
}

/// Complete option chain for one (exchange, symbol) pair
///
/// Call and put lists are disjoint and sorted ascending by strike price
/// (ties keep file order); expiry dates are distinct, ascending, and never
/// earlier than the day the chain was built.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionChainResult {
    /// Call (CE) strikes
    pub call_strikes: Vec<StrikeEntry>,
    /// Put (PE) strikes
    pub put_strikes: Vec<StrikeEntry>,
    /// Distinct future expiry dates, ISO-serialized
    pub expiry_dates: Vec<NaiveDate>,
}

/// Parameters of one chain lookup
#[derive(Debug, Clone, Copy)]
pub struct ChainQuery<'a> {
    /// Requested exchange code, compared case-sensitively
    pub exchange: &'a str,
    /// Requested logical underlying symbol
    pub symbol: &'a str,
    /// Symbol matching rule of the consulted source
    pub match_rule: MatchRule,
}

/// Result of an index pass plus drop diagnostics
#[derive(Debug)]
pub struct IndexOutcome {
    /// The computed chain
    pub chain: OptionChainResult,
    /// Option rows that matched the query but carried an unusable strike or
    /// expiry and were dropped
    pub dropped_rows: u64,
}

/// Build the option chain for `query` from a record stream.
///
/// A record contributes iff its exchange equals the requested exchange, its
/// symbol satisfies the match rule, and its instrument column marks an index
/// option. Matching records with neither a CE nor PE side are ignored;
/// matching records whose strike or expiry fails to parse are dropped and
/// counted rather than mis-sorted. Expiry dates strictly before `today` are
/// filtered out; same-day expiry is retained.
pub fn index_records<I>(
    records: I,
    query: ChainQuery<'_>,
    schema: &RowSchema,
    today: NaiveDate,
) -> RefResult<IndexOutcome>
where
    I: Iterator<Item = RefResult<InstrumentRecord>>,
{
    let mut calls: Vec<StrikeEntry> = Vec::new();
    let mut puts: Vec<StrikeEntry> = Vec::new();
    let mut expiries: BTreeSet<NaiveDate> = BTreeSet::new();
    let mut dropped = 0u64;

    for record in records {
        let record = record?;

        if record.exchange != query.exchange
            || !symbol_matches(&record, query)
            || record.instrument != schema.option_instrument
        {
            continue;
        }

        // Option rows that are neither CE nor PE are unclassifiable; skip
        // them without failing the whole scan.
        let Some(side) = record.option_side else {
            continue;
        };

        let Ok(strike_price) = record.strike.parse::<f64>() else {
            dropped += 1;
            if dropped <= MAX_DROP_WARNINGS {
                warn!(trading_symbol = %record.trading_symbol, strike = %record.strike, "dropping option row with unusable strike");
            }
            continue;
        };

        let Ok(expiry) = NaiveDate::parse_from_str(&record.expiry, schema.expiry_format) else {
            dropped += 1;
            if dropped <= MAX_DROP_WARNINGS {
                warn!(trading_symbol = %record.trading_symbol, expiry = %record.expiry, "dropping option row with unusable expiry");
            }
            continue;
        };

        let entry = StrikeEntry {
            trading_symbol: record.trading_symbol,
            security_id: record.token,
            expiry_date: record.expiry,
            strike_price,
        };

        match side {
            OptionSide::Call => calls.push(entry),
            OptionSide::Put => puts.push(entry),
        }
        expiries.insert(expiry);
    }

    // Stable sort keeps file order for equal strikes.
    calls.sort_by(|a, b| a.strike_price.total_cmp(&b.strike_price));
    puts.sort_by(|a, b| a.strike_price.total_cmp(&b.strike_price));

    let expiry_dates: Vec<NaiveDate> = expiries.into_iter().filter(|d| *d >= today).collect();

    debug!(
        exchange = query.exchange,
        symbol = query.symbol,
        calls = calls.len(),
        puts = puts.len(),
        expiries = expiry_dates.len(),
        dropped,
        "indexed option chain"
    );

    Ok(IndexOutcome {
        chain: OptionChainResult {
            call_strikes: calls,
            put_strikes: puts,
            expiry_dates,
        },
        dropped_rows: dropped,
    })
}

fn symbol_matches(record: &InstrumentRecord, query: ChainQuery<'_>) -> bool {
    match query.match_rule {
        MatchRule::Exact => record.symbol == query.symbol,
        MatchRule::MappedPrefix => record.symbol.starts_with(broker_root(query.symbol)),
    }
}
