//! Conditional, atomic reference-file downloads
//!
//! Downloads are skipped entirely while the local copy is fresh. When a
//! download does run, the body is streamed to a `.part` sibling and renamed
//! onto the final path only after the transfer completes, so concurrent
//! readers never observe a half-written file and a failed fetch leaves any
//! previous copy intact. Fetches for the same destination serialize on a
//! per-path mutex.

use crate::error::{RefResult, ReferenceError};
use crate::freshness;
use chrono::{NaiveTime, Utc};
use futures_util::StreamExt;
use reqwest::Client;
use rustc_hash::FxHashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Freshness-gated reference-file downloader
pub struct SourceFetcher {
    client: Client,
    cutoff_utc: NaiveTime,
    locks: Mutex<FxHashMap<PathBuf, Arc<Mutex<()>>>>,
}

impl SourceFetcher {
    /// Create a fetcher with the given daily cutoff and per-request timeout.
    pub fn new(cutoff_utc: NaiveTime, timeout: Duration) -> RefResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ReferenceError::Client)?;

        Ok(Self {
            client,
            cutoff_utc,
            locks: Mutex::new(FxHashMap::default()),
        })
    }

    /// Download `url` to `dest` unless the local copy is still fresh.
    ///
    /// Returns `dest` on success either way. Idempotent with respect to
    /// freshness: a fresh file short-circuits without any network call.
    pub async fn ensure_fresh(&self, url: &str, dest: &Path) -> RefResult<PathBuf> {
        let lock = self.dest_lock(dest).await;
        let _guard = lock.lock().await;

        if !freshness::is_stale(dest, Utc::now(), self.cutoff_utc) {
            debug!(path = %dest.display(), "reference file is up to date, skipping download");
            return Ok(dest.to_path_buf());
        }

        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        info!(url, path = %dest.display(), "downloading reference file");
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ReferenceError::Fetch {
                url: url.to_string(),
                source: e,
            })?;

        if !response.status().is_success() {
            warn!(url, status = %response.status(), "reference source returned an error status");
            return Err(ReferenceError::HttpStatus {
                url: url.to_string(),
                status: response.status(),
            });
        }

        let part = partial_path(dest);
        match stream_to_file(response, url, &part).await {
            Ok(bytes) => {
                tokio::fs::rename(&part, dest).await?;
                info!(path = %dest.display(), bytes, "reference file updated");
                Ok(dest.to_path_buf())
            }
            Err(e) => {
                // Leave any previously fresh file untouched; only the
                // partial transfer is discarded.
                let _ = tokio::fs::remove_file(&part).await;
                warn!(url, error = %e, "reference download failed");
                Err(e)
            }
        }
    }

    async fn dest_lock(&self, dest: &Path) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks
            .entry(dest.to_path_buf())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

async fn stream_to_file(response: reqwest::Response, url: &str, part: &Path) -> RefResult<u64> {
    let mut stream = response.bytes_stream();
    let mut file = tokio::fs::File::create(part).await?;
    let mut bytes = 0u64;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| ReferenceError::Fetch {
            url: url.to_string(),
            source: e,
        })?;
        bytes += chunk.len() as u64;
        file.write_all(&chunk).await?;
    }

    file.flush().await?;
    Ok(bytes)
}

/// Sibling path the in-flight transfer is written to.
fn partial_path(dest: &Path) -> PathBuf {
    let mut name = dest.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".part");
    dest.with_file_name(name)
}
