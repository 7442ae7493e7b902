//! Persistent key -> blob store for preloaded chunk batches
//!
//! Each cache key maps to one JSON blob `<encoded key>.json` under the cache
//! directory. Saving a key replaces the whole blob; nothing is merged. The
//! directory is shared between processes without locking, so concurrent saves
//! of one key are last-writer-wins.

use crate::cache::entry::CacheEntry;
use crate::cache::types::CacheKey;
use crate::error::{CagError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const BLOB_EXTENSION: &str = "json";
const TEMP_EXTENSION: &str = "tmp";
const FORMAT_VERSION: u32 = 1;

/// Longest encoded key whose temp file name (`<stem>.json.tmp`) still fits
/// the usual 255-byte file-name limit
pub const MAX_ENCODED_KEY_LEN: usize = 255 - ".json.tmp".len();

/// On-disk envelope written by [`KvCacheStore::save`]
#[derive(Serialize)]
struct BlobOut<'a> {
    format_version: u32,
    key: &'a str,
    saved_at: DateTime<Utc>,
    entries: &'a [CacheEntry],
}

/// On-disk envelope read by [`KvCacheStore::load`]
#[derive(Deserialize)]
struct BlobIn {
    format_version: u32,
    #[allow(dead_code)]
    key: String,
    #[allow(dead_code)]
    saved_at: DateTime<Utc>,
    entries: Vec<CacheEntry>,
}

/// Durable storage for preloaded cache entries
#[derive(Debug, Clone)]
pub struct KvCacheStore {
    cache_dir: PathBuf,
}

impl KvCacheStore {
    /// Open a store rooted at `cache_dir`, creating the directory if needed
    pub fn new(cache_dir: impl Into<PathBuf>) -> Result<Self> {
        let cache_dir = cache_dir.into();
        fs::create_dir_all(&cache_dir)?;
        info!("KV cache store at {:?}", cache_dir);
        Ok(Self { cache_dir })
    }

    /// Directory holding the blobs
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Persist `entries` under `key`, replacing any previous value
    ///
    /// Embeddings must be finite: JSON has no NaN or infinity, so such a blob
    /// could never be loaded back.
    pub fn save(&self, key: &str, entries: &[CacheEntry]) -> Result<PathBuf> {
        let path = self.blob_path(key)?;
        if let Some(position) = entries.iter().position(has_non_finite_embedding) {
            return Err(CagError::Serialization(format!(
                "entry {} under key {:?} has a non-finite embedding component",
                position, key
            )));
        }
        let blob = BlobOut {
            format_version: FORMAT_VERSION,
            key,
            saved_at: Utc::now(),
            entries,
        };
        let bytes = serde_json::to_vec(&blob)?;

        // Write beside the target, then swap it in.
        let temp_path = path.with_extension(format!("{}.{}", BLOB_EXTENSION, TEMP_EXTENSION));
        fs::write(&temp_path, bytes)?;
        if let Err(e) = fs::rename(&temp_path, &path) {
            let _ = fs::remove_file(&temp_path);
            return Err(e.into());
        }

        info!("KV cache saved: {:?} ({} entries)", path, entries.len());
        Ok(path)
    }

    /// Load the entries stored under `key`
    ///
    /// A key that was never saved is `Ok(None)`, not an error.
    pub fn load(&self, key: &str) -> Result<Option<Vec<CacheEntry>>> {
        let path = self.blob_path(key)?;

        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                warn!("KV cache not found for key: {}", key);
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        let blob: BlobIn = serde_json::from_slice(&bytes)?;
        if blob.format_version != FORMAT_VERSION {
            return Err(CagError::Serialization(format!(
                "unsupported cache format version {} in {:?}",
                blob.format_version, path
            )));
        }

        info!("KV cache loaded: {:?} ({} entries)", path, blob.entries.len());
        Ok(Some(blob.entries))
    }

    /// True when a blob exists for `key`
    pub fn contains(&self, key: &str) -> bool {
        self.blob_path(key).map(|p| p.is_file()).unwrap_or(false)
    }

    /// Delete the blob for `key`; returns whether one existed
    pub fn remove(&self, key: &str) -> Result<bool> {
        let path = self.blob_path(key)?;
        match fs::remove_file(&path) {
            Ok(()) => {
                debug!("Removed KV cache blob: {:?}", path);
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// All persisted keys, sorted
    pub fn keys(&self) -> Result<Vec<CacheKey>> {
        let mut keys = Vec::new();
        for entry in fs::read_dir(&self.cache_dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(BLOB_EXTENSION) {
                continue;
            }
            if let Some(key) = path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(decode_key)
            {
                keys.push(key);
            }
        }
        keys.sort();
        Ok(keys)
    }

    /// Delete every persisted blob; returns how many files were removed
    pub fn reset(&self) -> Result<usize> {
        let mut removed = 0;
        for entry in fs::read_dir(&self.cache_dir)? {
            let path = entry?.path();
            let is_blob = matches!(
                path.extension().and_then(|e| e.to_str()),
                Some(BLOB_EXTENSION) | Some(TEMP_EXTENSION)
            );
            if path.is_file() && is_blob {
                fs::remove_file(&path)?;
                removed += 1;
            }
        }
        info!("KV cache reset successfully ({} blobs removed)", removed);
        Ok(removed)
    }

    /// Path of the blob for `key`
    ///
    /// Keys are limited to [`MAX_ENCODED_KEY_LEN`] bytes once encoded; each
    /// byte outside `[A-Za-z0-9_-]` takes three.
    pub fn blob_path(&self, key: &str) -> Result<PathBuf> {
        if key.is_empty() {
            return Err(CagError::InvalidConfiguration(
                "cache key must not be empty".to_string(),
            ));
        }
        let stem = encode_key(key);
        if stem.len() > MAX_ENCODED_KEY_LEN {
            return Err(CagError::InvalidConfiguration(format!(
                "cache key too long: encodes to {} bytes, limit is {}",
                stem.len(),
                MAX_ENCODED_KEY_LEN
            )));
        }
        Ok(self
            .cache_dir
            .join(format!("{}.{}", stem, BLOB_EXTENSION)))
    }
}

fn has_non_finite_embedding(entry: &CacheEntry) -> bool {
    entry
        .embedding
        .as_ref()
        .is_some_and(|embedding| embedding.iter().any(|v| !v.is_finite()))
}

/// Encode a key as a file stem: `[A-Za-z0-9_-]` pass through, every other
/// byte becomes `%XX`. Injective, so distinct keys never share a file.
fn encode_key(key: &str) -> String {
    let mut encoded = String::with_capacity(key.len());
    for byte in key.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'_' {
            encoded.push(byte as char);
        } else {
            encoded.push_str(&format!("%{:02X}", byte));
        }
    }
    encoded
}

fn decode_key(stem: &str) -> Option<String> {
    let bytes = stem.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = stem.get(i + 1..i + 3)?;
            decoded.push(u8::from_str_radix(hex, 16).ok()?);
            i += 3;
        } else {
            decoded.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(decoded).ok()
}
