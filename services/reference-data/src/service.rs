//! Option-chain query orchestration
//!
//! One service instance serves one broker; the surrounding application holds
//! an instance per broker and routes requests by its own broker-selection
//! context. The query path is: cache probe, freshness-gated download,
//! archive extraction for zipped sources, streaming parse, index, cache
//! fill. All-or-nothing: a failure at any stage caches nothing.

use crate::archive;
use crate::cache::{CacheKey, ResultCache};
use crate::chain::{self, ChainQuery, IndexOutcome, OptionChainResult};
use crate::config::{Broker, Container, ReferenceConfig, SourceSpec};
use crate::error::{RefResult, ReferenceError};
use crate::fetcher::SourceFetcher;
use crate::records::{ParsePolicy, RecordReader};
use chrono::{NaiveDate, Utc};
use rustc_hash::FxHashMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use tracing::{debug, info, warn};

/// Suffix of the payload entry inside zipped sources.
const ARCHIVE_PAYLOAD_SUFFIX: &str = ".txt";

/// Option-chain query service for one broker's reference files
pub struct OptionChainService {
    broker: Broker,
    config: ReferenceConfig,
    sources: FxHashMap<String, SourceSpec>,
    fetcher: SourceFetcher,
    cache: ResultCache,
}

impl OptionChainService {
    /// Create a service over the broker's default source registry.
    pub fn new(broker: Broker, config: ReferenceConfig) -> RefResult<Self> {
        let sources = broker.sources();
        Self::with_sources(broker, config, sources)
    }

    /// Create a service with an explicit source registry.
    ///
    /// Lets deployments point at mirrored buckets and lets tests substitute
    /// local endpoints; everything else behaves as [`OptionChainService::new`].
    pub fn with_sources(
        broker: Broker,
        config: ReferenceConfig,
        sources: FxHashMap<String, SourceSpec>,
    ) -> RefResult<Self> {
        let fetcher = SourceFetcher::new(config.cutoff_utc, config.fetch_timeout)?;
        let cache = ResultCache::new(config.cache_ttl);

        Ok(Self {
            broker,
            config,
            sources,
            fetcher,
            cache,
        })
    }

    /// The broker this instance serves.
    pub fn broker(&self) -> Broker {
        self.broker
    }

    /// All call/put strikes and future expiry dates for (exchange, symbol).
    ///
    /// Served from cache when a live entry exists; otherwise runs the full
    /// pipeline and caches the result before returning it.
    pub async fn option_chain(
        &self,
        exchange: &str,
        symbol: &str,
    ) -> RefResult<OptionChainResult> {
        let key = CacheKey {
            exchange: exchange.to_string(),
            symbol: symbol.to_string(),
        };

        if let Some(hit) = self.cache.get(&key) {
            debug!(exchange, symbol, "option chain served from cache");
            return Ok(hit);
        }

        let source = self
            .sources
            .get(exchange)
            .cloned()
            .ok_or_else(|| ReferenceError::UnknownExchange {
                broker: self.broker.as_str().to_string(),
                exchange: exchange.to_string(),
            })?;

        let path = self.config.symbols_dir.join(&source.file_name);
        self.fetcher.ensure_fresh(&source.url, &path).await?;

        let policy = self.config.parse_policy;
        let exchange_owned = exchange.to_string();
        let symbol_owned = symbol.to_string();
        let outcome = tokio::task::spawn_blocking(move || {
            let today = Utc::now().date_naive();
            build_chain(&path, &source, &exchange_owned, &symbol_owned, policy, today)
        })
        .await??;

        if outcome.dropped_rows > 0 {
            warn!(
                exchange,
                symbol,
                dropped = outcome.dropped_rows,
                "dropped unusable reference rows while indexing"
            );
        }
        info!(
            exchange,
            symbol,
            calls = outcome.chain.call_strikes.len(),
            puts = outcome.chain.put_strikes.len(),
            expiries = outcome.chain.expiry_dates.len(),
            "indexed option chain"
        );

        self.cache.put(key, outcome.chain.clone());
        Ok(outcome.chain)
    }
}

/// Full scan of one reference file: extract if zipped, parse, index.
fn build_chain(
    path: &Path,
    source: &SourceSpec,
    exchange: &str,
    symbol: &str,
    policy: ParsePolicy,
    today: NaiveDate,
) -> RefResult<IndexOutcome> {
    let query = ChainQuery {
        exchange,
        symbol,
        match_rule: source.match_rule,
    };

    match source.container {
        Container::Plain => {
            let file = BufReader::new(File::open(path)?);
            index_stream(file, source, query, policy, today)
        }
        Container::Zip => archive::with_text_entry(path, ARCHIVE_PAYLOAD_SUFFIX, |entry| {
            index_stream(entry, source, query, policy, today)
        }),
    }
}

fn index_stream<R: Read>(
    read: R,
    source: &SourceSpec,
    query: ChainQuery<'_>,
    policy: ParsePolicy,
    today: NaiveDate,
) -> RefResult<IndexOutcome> {
    let mut records = RecordReader::new(read, &source.schema, policy)?;
    let mut outcome = chain::index_records(&mut records, query, &source.schema, today)?;
    outcome.dropped_rows += records.skipped();
    Ok(outcome)
}
