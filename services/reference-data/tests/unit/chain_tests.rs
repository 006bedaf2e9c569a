//! Indexer tests: classification, match rules, sorting, date filtering

use chrono::NaiveDate;
use reference_data::chain::{index_records, ChainQuery};
use reference_data::config::{MatchRule, RowSchema, FLATTRADE_SCHEMA, SHOONYA_SCHEMA};
use reference_data::records::{ParsePolicy, RecordReader};

fn reader<'a>(csv: &'a str, schema: &RowSchema) -> RecordReader<&'a [u8]> {
    RecordReader::new(csv.as_bytes(), schema, ParsePolicy::Lenient).expect("reader")
}

fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

const NFO_QUERY: ChainQuery<'static> = ChainQuery {
    exchange: "NFO",
    symbol: "NIFTY",
    match_rule: MatchRule::Exact,
};

#[test]
fn three_row_scenario_routes_and_excludes() {
    let csv = "\
Exchange,Token,Lotsize,Symbol,Tradingsymbol,Expiry,Instrument,Optiontype,Strike
NFO,54452,25,NIFTY,NIFTY06JUN2421700CE,06-Jun-2024,OPTIDX,CE,21700
NFO,54453,25,NIFTY,NIFTY06JUN2421700PE,06-Jun-2024,OPTIDX,PE,21700
NFO,54460,15,BANKNIFTY,BANKNIFTY06JUN2448000CE,06-Jun-2024,OPTIDX,CE,48000
";
    let outcome = index_records(
        reader(csv, &FLATTRADE_SCHEMA),
        NFO_QUERY,
        &FLATTRADE_SCHEMA,
        day(2024, 6, 1),
    )
    .expect("index");
    let chain = outcome.chain;

    assert_eq!(chain.call_strikes.len(), 1);
    assert_eq!(chain.call_strikes[0].trading_symbol, "NIFTY06JUN2421700CE");
    assert_eq!(chain.call_strikes[0].security_id, "54452");
    assert_eq!(chain.call_strikes[0].strike_price, 21700.0);
    assert_eq!(chain.call_strikes[0].expiry_date, "06-Jun-2024");

    assert_eq!(chain.put_strikes.len(), 1);
    assert_eq!(chain.put_strikes[0].trading_symbol, "NIFTY06JUN2421700PE");

    assert_eq!(chain.expiry_dates, vec![day(2024, 6, 6)]);
    assert_eq!(outcome.dropped_rows, 0);
}

#[test]
fn mapped_prefix_matches_broker_root() {
    let csv = "\
Exchange,Token,LotSize,Symbol,TradingSymbol,Expiry,Instrument,OptionType,StrikePrice,TickSize
BFO,837101,10,BSXOPT24JUN,SENSEX24JUN80000CE,20-Jun-2024,OPTIDX,CE,80000,0.05
BFO,837102,10,BSXOPT24JUN,SENSEX24JUN80000PE,20-Jun-2024,OPTIDX,PE,80000,0.05
BFO,912001,15,BKXOPT24JUN,BANKEX24JUN60000CE,20-Jun-2024,OPTIDX,CE,60000,0.05
";
    let query = ChainQuery {
        exchange: "BFO",
        symbol: "SENSEX",
        match_rule: MatchRule::MappedPrefix,
    };
    let chain = index_records(
        reader(csv, &SHOONYA_SCHEMA),
        query,
        &SHOONYA_SCHEMA,
        day(2024, 6, 1),
    )
    .expect("index")
    .chain;

    // SENSEX maps to the BSXOPT root; the BANKEX (BKXOPT) row is excluded.
    assert_eq!(chain.call_strikes.len(), 1);
    assert_eq!(chain.call_strikes[0].trading_symbol, "SENSEX24JUN80000CE");
    assert_eq!(chain.put_strikes.len(), 1);
}

#[test]
fn unmapped_symbol_falls_through_as_prefix() {
    let csv = "\
Exchange,Token,LotSize,Symbol,TradingSymbol,Expiry,Instrument,OptionType,StrikePrice,TickSize
BFO,700001,10,MIDCAP24JUN,MIDCAP24JUN12000CE,20-Jun-2024,OPTIDX,CE,12000,0.05
";
    let query = ChainQuery {
        exchange: "BFO",
        symbol: "MIDCAP",
        match_rule: MatchRule::MappedPrefix,
    };
    let chain = index_records(
        reader(csv, &SHOONYA_SCHEMA),
        query,
        &SHOONYA_SCHEMA,
        day(2024, 6, 1),
    )
    .expect("index")
    .chain;

    assert_eq!(chain.call_strikes.len(), 1);
}

#[test]
fn strikes_sorted_ascending_with_stable_ties() {
    let csv = "\
Exchange,Token,Lotsize,Symbol,Tradingsymbol,Expiry,Instrument,Optiontype,Strike
NFO,3,25,NIFTY,NIFTY_C_21900,06-Jun-2024,OPTIDX,CE,21900
NFO,1,25,NIFTY,NIFTY_C_21700_A,06-Jun-2024,OPTIDX,CE,21700
NFO,2,25,NIFTY,NIFTY_C_21700_B,13-Jun-2024,OPTIDX,CE,21700
NFO,4,25,NIFTY,NIFTY_P_21800,06-Jun-2024,OPTIDX,PE,21800
NFO,5,25,NIFTY,NIFTY_P_21600,06-Jun-2024,OPTIDX,PE,21600
";
    let chain = index_records(
        reader(csv, &FLATTRADE_SCHEMA),
        NFO_QUERY,
        &FLATTRADE_SCHEMA,
        day(2024, 6, 1),
    )
    .expect("index")
    .chain;

    let call_order: Vec<&str> = chain
        .call_strikes
        .iter()
        .map(|s| s.trading_symbol.as_str())
        .collect();
    // Equal strikes keep file order.
    assert_eq!(
        call_order,
        vec!["NIFTY_C_21700_A", "NIFTY_C_21700_B", "NIFTY_C_21900"]
    );

    let put_strikes: Vec<f64> = chain.put_strikes.iter().map(|s| s.strike_price).collect();
    assert_eq!(put_strikes, vec![21600.0, 21800.0]);

    // No cross-contamination between the two lists.
    assert!(chain.call_strikes.iter().all(|s| s.trading_symbol.contains("_C_")));
    assert!(chain.put_strikes.iter().all(|s| s.trading_symbol.contains("_P_")));
}

#[test]
fn expiry_dates_deduped_filtered_and_sorted() {
    let csv = "\
Exchange,Token,Lotsize,Symbol,Tradingsymbol,Expiry,Instrument,Optiontype,Strike
NFO,1,25,NIFTY,NIFTY_A,13-Jun-2024,OPTIDX,CE,21700
NFO,2,25,NIFTY,NIFTY_B,06-Jun-2024,OPTIDX,CE,21800
NFO,3,25,NIFTY,NIFTY_C,06-Jun-2024,OPTIDX,PE,21700
NFO,4,25,NIFTY,NIFTY_D,30-May-2024,OPTIDX,CE,21900
";
    // Today is the 6th: the same-day expiry stays, the 30-May one is gone.
    let chain = index_records(
        reader(csv, &FLATTRADE_SCHEMA),
        NFO_QUERY,
        &FLATTRADE_SCHEMA,
        day(2024, 6, 6),
    )
    .expect("index")
    .chain;

    assert_eq!(chain.expiry_dates, vec![day(2024, 6, 6), day(2024, 6, 13)]);
}

#[test]
fn non_option_instruments_are_excluded() {
    let csv = "\
Exchange,Token,Lotsize,Symbol,Tradingsymbol,Expiry,Instrument,Optiontype,Strike
NFO,1,25,NIFTY,NIFTY26DEC24FUT,26-Dec-2024,FUTIDX,XX,0
NFO,2,25,NIFTY,NIFTY06JUN2421700CE,06-Jun-2024,OPTIDX,CE,21700
";
    let chain = index_records(
        reader(csv, &FLATTRADE_SCHEMA),
        NFO_QUERY,
        &FLATTRADE_SCHEMA,
        day(2024, 6, 1),
    )
    .expect("index")
    .chain;

    assert_eq!(chain.call_strikes.len(), 1);
    assert_eq!(chain.expiry_dates, vec![day(2024, 6, 6)]);
}

#[test]
fn unclassifiable_option_rows_are_ignored_without_failing() {
    let csv = "\
Exchange,Token,Lotsize,Symbol,Tradingsymbol,Expiry,Instrument,Optiontype,Strike
NFO,1,25,NIFTY,NIFTY_WEIRD,06-Jun-2024,OPTIDX,XX,21700
NFO,2,25,NIFTY,NIFTY06JUN2421700CE,06-Jun-2024,OPTIDX,CE,21700
";
    let outcome = index_records(
        reader(csv, &FLATTRADE_SCHEMA),
        NFO_QUERY,
        &FLATTRADE_SCHEMA,
        day(2024, 6, 1),
    )
    .expect("index");

    assert_eq!(outcome.chain.call_strikes.len(), 1);
    assert!(outcome.chain.put_strikes.is_empty());
}

#[test]
fn unusable_strike_or_expiry_drops_the_record() {
    let csv = "\
Exchange,Token,Lotsize,Symbol,Tradingsymbol,Expiry,Instrument,Optiontype,Strike
NFO,1,25,NIFTY,NIFTY_BAD_STRIKE,06-Jun-2024,OPTIDX,CE,abc
NFO,2,25,NIFTY,NIFTY_BAD_EXPIRY,notadate,OPTIDX,CE,21700
NFO,3,25,NIFTY,NIFTY_OK,06-Jun-2024,OPTIDX,CE,21800
";
    let outcome = index_records(
        reader(csv, &FLATTRADE_SCHEMA),
        NFO_QUERY,
        &FLATTRADE_SCHEMA,
        day(2024, 6, 1),
    )
    .expect("index");

    // Dropped, not sorted last: the lists stay consistent with each other.
    assert_eq!(outcome.dropped_rows, 2);
    assert_eq!(outcome.chain.call_strikes.len(), 1);
    assert_eq!(outcome.chain.call_strikes[0].trading_symbol, "NIFTY_OK");
    assert_eq!(outcome.chain.expiry_dates, vec![day(2024, 6, 6)]);
}
