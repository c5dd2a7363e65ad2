//! Asset Layer - Logical Paths and Inline Payloads
//!
//! Any text leaf starting with [`ASSET_PREFIX`] names a binary asset rather
//! than literal copy. [`is_asset_path`] is the single place that convention
//! is defined; resolver, discovery and packager all go through it.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;
use thiserror::Error;
use walkdir::WalkDir;

use crate::tree::Node;

/// Reserved prefix for logical asset paths.
pub const ASSET_PREFIX: &str = "/assets/";

pub fn is_asset_path(s: &str) -> bool {
    s.starts_with(ASSET_PREFIX)
}

/// `/assets/a.png` -> `assets/a.png`. Non-asset text is returned as-is.
pub fn relativize(s: &str) -> &str {
    if is_asset_path(s) {
        &s[1..]
    } else {
        s
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DataUriError {
    #[error("Not a data URI: missing ',' separator")]
    MissingSeparator,

    #[error("Invalid base64 payload: {0}")]
    InvalidPayload(String),
}

/// `data:<mime>;base64,<payload>`
pub fn encode_data_uri(mime_type: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", mime_type, STANDARD.encode(bytes))
}

/// Reverse of [`encode_data_uri`]: split on the first comma, decode the rest.
pub fn decode_data_uri(uri: &str) -> Result<Vec<u8>, DataUriError> {
    let (_, payload) = uri.split_once(',').ok_or(DataUriError::MissingSeparator)?;
    STANDARD
        .decode(payload.trim())
        .map_err(|e| DataUriError::InvalidPayload(e.to_string()))
}

/// Media type guessed from a file extension.
pub fn mime_for_path(path: &str) -> &'static str {
    let ext = path
        .rsplit('/')
        .next()
        .and_then(|file| file.rsplit_once('.'))
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "svg" => "image/svg+xml",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "webp" => "image/webp",
        "gif" => "image/gif",
        "ico" => "image/x-icon",
        "avif" => "image/avif",
        "css" => "text/css",
        "js" => "text/javascript",
        "json" => "application/json",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "html" | "htm" => "text/html",
        "txt" => "text/plain",
        _ => "application/octet-stream",
    }
}

/// A binary asset addressed by its logical path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetRecord {
    pub name: String,
    pub path: String,
    pub mime_type: String,
    #[serde(with = "base64_bytes")]
    pub bytes: Vec<u8>,
    pub size_bytes: u64,
}

impl AssetRecord {
    pub fn new(name: impl Into<String>, path: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        let size_bytes = bytes.len() as u64;
        Self {
            name: name.into(),
            path: path.into(),
            mime_type: mime_type.into(),
            bytes,
            size_bytes,
        }
    }

    /// Read an upload from disk. `relative` becomes `/assets/<relative>`.
    pub fn from_file(file: &Path, relative: &str) -> std::io::Result<Self> {
        let bytes = fs::read(file)?;
        let relative = relative.trim_start_matches('/').replace('\\', "/");
        let name = relative.rsplit('/').next().unwrap_or(&relative).to_string();
        let path = format!("{}{}", ASSET_PREFIX, relative);
        Ok(Self::new(name, path.clone(), mime_for_path(&path), bytes))
    }

    pub fn to_data_uri(&self) -> String {
        encode_data_uri(&self.mime_type, &self.bytes)
    }
}

/// Path-keyed asset collection. The first record inserted for a path wins,
/// so inserting uploads before static fetches gives uploads priority.
#[derive(Debug, Clone, Default)]
pub struct AssetSet {
    records: BTreeMap<String, AssetRecord>,
}

impl AssetSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false if the path was already taken.
    pub fn insert(&mut self, record: AssetRecord) -> bool {
        if self.records.contains_key(&record.path) {
            return false;
        }
        self.records.insert(record.path.clone(), record);
        true
    }

    pub fn extend<I: IntoIterator<Item = AssetRecord>>(&mut self, records: I) {
        for record in records {
            self.insert(record);
        }
    }

    pub fn contains(&self, path: &str) -> bool {
        self.records.contains_key(path)
    }

    pub fn get(&self, path: &str) -> Option<&AssetRecord> {
        self.records.get(path)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records in path order.
    pub fn iter(&self) -> impl Iterator<Item = &AssetRecord> {
        self.records.values()
    }

    /// Path -> data URI table used by the inline resolver.
    pub fn inline_table(&self) -> BTreeMap<String, String> {
        self.records
            .iter()
            .map(|(path, record)| (path.clone(), record.to_data_uri()))
            .collect()
    }
}

impl FromIterator<AssetRecord> for AssetSet {
    fn from_iter<I: IntoIterator<Item = AssetRecord>>(iter: I) -> Self {
        let mut set = AssetSet::new();
        set.extend(iter);
        set
    }
}

/// Read every regular file under `dir` as an upload, in file-name order.
/// Symlinks are not followed, so a link cycle is skipped rather than walked.
pub fn load_upload_dir(dir: &Path) -> std::io::Result<Vec<AssetRecord>> {
    let mut records = vec![];
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.map_err(std::io::Error::other)?;
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = entry
            .path()
            .strip_prefix(dir)
            .map(|p| p.to_string_lossy().replace('\\', "/"))
            .unwrap_or_default();
        records.push(AssetRecord::from_file(entry.path(), &relative)?);
    }
    Ok(records)
}

/// Replace every text leaf equal to a known asset path with its data URI.
pub fn resolve_for_inline(tree: &Node, assets: &AssetSet) -> Node {
    resolve_with_table(tree, &assets.inline_table())
}

pub(crate) fn resolve_with_table(tree: &Node, table: &BTreeMap<String, String>) -> Node {
    if table.is_empty() {
        return tree.clone();
    }
    tree.map_text(&mut |leaf| table.get(leaf).cloned())
}

/// Asset paths referenced by the tree that no upload covers, deduplicated,
/// in first-seen order.
pub fn collect_static_paths(tree: &Node, uploaded: &AssetSet) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut paths = vec![];
    tree.visit_text(&mut |leaf| {
        if is_asset_path(leaf) && !uploaded.contains(leaf) && seen.insert(leaf.to_string()) {
            paths.push(leaf.to_string());
        }
    });
    paths
}

mod base64_bytes {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD.decode(encoded).map_err(serde::de::Error::custom)
    }
}
