//! On-disk cache snapshot.
//!
//! The snapshot is a single JSON object mapping cache keys to base64-encoded
//! response bodies:
//!
//! ```text
//! { "GET /index.html": "PGh0bWw+Li4u", ... }
//! ```
//!
//! Each flush replaces the whole file. The new content is written to a
//! sibling temp file and renamed over the old one, so readers never observe
//! a half-written snapshot.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::cache::key::CacheKey;
use crate::cache::CacheError;

/// A response body as stored in the snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Payload(#[serde(with = "base64_payload")] pub Bytes);

/// Complete key → body mapping, ordered for stable output.
pub type Snapshot = BTreeMap<CacheKey, Payload>;

mod base64_payload {
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use bytes::Bytes;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &Bytes, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Bytes, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded.as_bytes())
            .map(Bytes::from)
            .map_err(serde::de::Error::custom)
    }
}

/// Read the snapshot at `path`.
///
/// Returns `Ok(None)` when the file does not exist.
pub fn read_snapshot(path: &Path) -> Result<Option<Snapshot>, CacheError> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(CacheError::io(path, e)),
    };

    let snapshot = serde_json::from_reader(BufReader::new(file))
        .map_err(|e| CacheError::json(path, e))?;
    Ok(Some(snapshot))
}

/// Replace the snapshot at `path` with `snapshot`.
pub fn write_snapshot(path: &Path, snapshot: &Snapshot) -> Result<(), CacheError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| CacheError::io(parent, e))?;
        }
    }

    let tmp_path = temp_path(path);
    let file = File::create(&tmp_path).map_err(|e| CacheError::io(&tmp_path, e))?;
    let mut writer = BufWriter::new(file);

    serde_json::to_writer(&mut writer, snapshot).map_err(|e| CacheError::json(&tmp_path, e))?;
    writer.flush().map_err(|e| CacheError::io(&tmp_path, e))?;
    writer
        .get_ref()
        .sync_all()
        .map_err(|e| CacheError::io(&tmp_path, e))?;
    drop(writer);

    fs::rename(&tmp_path, path).map_err(|e| CacheError::io(path, e))?;
    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
