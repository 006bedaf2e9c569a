//! Daily-cutoff freshness gate for cached reference files
//!
//! Brokers republish their instrument masters once per trading day. A local
//! copy is usable until the next cutoff instant passes; the file's mtime is
//! the only freshness signal. The cutoff is configuration, not arithmetic
//! buried in code, so the timezone behavior is tested explicitly.

use chrono::{DateTime, Duration, NaiveTime, Utc};
use std::path::Path;

/// Most recent cutoff instant at or before `now`.
///
/// If `now` precedes today's cutoff, yesterday's cutoff applies, so a file
/// written shortly after midnight stays fresh until the next cutoff rather
/// than going stale immediately.
pub fn latest_cutoff(now: DateTime<Utc>, cutoff: NaiveTime) -> DateTime<Utc> {
    let today = now.date_naive().and_time(cutoff).and_utc();
    if today <= now {
        today
    } else {
        today - Duration::days(1)
    }
}

/// True when the file at `path` must be re-fetched.
///
/// A missing or unreadable file is stale; otherwise the file is stale iff
/// its last-modified time is earlier than [`latest_cutoff`].
pub fn is_stale(path: &Path, now: DateTime<Utc>, cutoff: NaiveTime) -> bool {
    let Ok(meta) = std::fs::metadata(path) else {
        return true;
    };
    let Ok(modified) = meta.modified() else {
        return true;
    };
    let modified: DateTime<Utc> = modified.into();
    modified < latest_cutoff(now, cutoff)
}
