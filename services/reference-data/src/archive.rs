//! Zip payload extraction for compressed reference sources
//!
//! Some brokers publish the instrument master as a zip archive holding one
//! text payload. The matching entry is handed to the consumer as an
//! `io::Read` over the uncompressed bytes, so downstream parsing streams
//! instead of materializing the extracted file. The scoped-consumer shape
//! exists because a zip entry reader borrows its archive.

use crate::error::{RefResult, ReferenceError};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::debug;
use zip::ZipArchive;

/// Open `archive_path` and run `consume` over the uncompressed bytes of the
/// single entry whose name ends with `suffix`.
///
/// Entries that do not match are never decompressed. Fails with
/// [`ReferenceError::MissingEntry`] when nothing matches and
/// [`ReferenceError::Archive`] when the container is corrupt.
pub fn with_text_entry<T, F>(archive_path: &Path, suffix: &str, consume: F) -> RefResult<T>
where
    F: FnOnce(&mut dyn Read) -> RefResult<T>,
{
    let file = File::open(archive_path)?;
    let mut archive = ZipArchive::new(file).map_err(|e| ReferenceError::Archive {
        path: archive_path.to_path_buf(),
        source: e,
    })?;

    let entry_name = archive
        .file_names()
        .find(|name| name.ends_with(suffix))
        .map(str::to_owned)
        .ok_or_else(|| ReferenceError::MissingEntry {
            path: archive_path.to_path_buf(),
            suffix: suffix.to_string(),
        })?;

    let mut entry = archive
        .by_name(&entry_name)
        .map_err(|e| ReferenceError::Archive {
            path: archive_path.to_path_buf(),
            source: e,
        })?;

    debug!(archive = %archive_path.display(), entry = %entry_name, "extracting reference payload");
    consume(&mut entry)
}
