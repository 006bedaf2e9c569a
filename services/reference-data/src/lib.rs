//! Broker reference-data core
//!
//! Ingests broker-published instrument-master files (plain CSV or zipped
//! text payloads, refreshed once per trading day) and answers option-chain
//! queries: all call/put strikes and future expiry dates for an underlying
//! symbol on an exchange segment.
//!
//! The pipeline behind [`OptionChainService::option_chain`] is: result-cache
//! probe, daily-cutoff freshness check, conditional atomic download, archive
//! extraction for zipped sources, streaming CSV parse, and classification
//! into sorted call/put strike lists plus a deduplicated expiry calendar.
//! Transport wiring, credential storage, and order pass-through live in the
//! surrounding application, which calls into this crate with an
//! `(exchange, symbol)` pair.

pub mod archive;
pub mod cache;
pub mod chain;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod freshness;
pub mod records;
pub mod service;

pub use chain::{OptionChainResult, StrikeEntry};
pub use config::{Broker, ReferenceConfig, SourceSpec};
pub use error::{RefResult, ReferenceError};
pub use records::ParsePolicy;
pub use service::OptionChainService;
