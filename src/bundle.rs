//! Bundle Packager - Document Plus Original Assets in One Archive
//!
//! A bundle holds `<name>.html` at the root and every asset under `assets/`,
//! keeping the logical directory nesting. The document is rendered with all
//! assets inline, exactly as a single-file export, and the binaries are
//! shipped next to it as well.
//!
//! Entry timestamps are pinned so identical inputs give identical archives.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::io::{Cursor, Write};
use thiserror::Error;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipWriter};

use crate::assets::{
    decode_data_uri, is_asset_path, relativize, resolve_with_table, AssetRecord, AssetSet,
    DataUriError, ASSET_PREFIX,
};
use crate::hashing::sha256_hex;
use crate::render::render;
use crate::tree::Node;

/// Archive directory holding every asset.
pub const ASSETS_DIR: &str = "assets/";

/// Used when a template name sanitizes to nothing.
pub const FALLBACK_BASE_NAME: &str = "landing_page";

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("Unsafe archive path: {0}")]
    UnsafePath(String),

    #[error("Duplicate archive entry: {0}")]
    DuplicateEntry(String),

    #[error("Asset {path} has an undecodable payload: {source}")]
    Decode {
        path: String,
        #[source]
        source: DataUriError,
    },

    #[error("Asset {0} missing from the inline table")]
    MissingPayload(String),

    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Document,
    Directory,
    Asset,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleEntry {
    pub path: String,
    pub kind: EntryKind,
    pub size_bytes: u64,
    /// Empty for directories.
    pub sha256: String,
}

#[derive(Debug, Clone)]
pub struct Bundle {
    pub archive: Vec<u8>,
    pub document: String,
    pub entries: Vec<BundleEntry>,
}

/// Lowercase, with every character outside `[a-z0-9]` replaced by `_`.
pub fn archive_base_name(name: &str) -> String {
    let base: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect();

    if base.is_empty() {
        FALLBACK_BASE_NAME.to_string()
    } else {
        base
    }
}

/// `/assets/a.png` -> `assets/a.png`, all other leaves untouched.
pub fn relativize_tree(tree: &Node) -> Node {
    tree.map_text(&mut |leaf| is_asset_path(leaf).then(|| relativize(leaf).to_string()))
}

/// Location of an asset inside the archive. Paths outside the reserved
/// prefix fall back to the asset's file name.
pub fn archive_path(record: &AssetRecord) -> Result<String, ArchiveError> {
    let sub = record
        .path
        .strip_prefix(ASSET_PREFIX)
        .unwrap_or(record.name.as_str());

    let unsafe_segment = sub.is_empty()
        || sub.contains('\\')
        || sub
            .split('/')
            .any(|seg| seg.is_empty() || seg == "." || seg == "..");
    if unsafe_segment {
        return Err(ArchiveError::UnsafePath(record.path.clone()));
    }

    Ok(format!("{}{}", ASSETS_DIR, sub))
}

/// Render the tree with inline assets and pack it with the asset binaries.
pub fn package_bundle(
    tree: &Node,
    template: &str,
    assets: &AssetSet,
    base_name: &str,
) -> Result<Bundle, ArchiveError> {
    if base_name.is_empty() || base_name.contains(|c: char| c == '/' || c == '\\') || base_name == ".." {
        return Err(ArchiveError::UnsafePath(base_name.to_string()));
    }

    // Same leaves as a single-file export; only unresolved paths go relative.
    let table = assets.inline_table();
    let data = relativize_tree(&resolve_with_table(tree, &table));
    let document = render(template, &data);

    let (archive, entries) = write_archive(&document, assets, &table, base_name)?;
    Ok(Bundle {
        archive,
        document,
        entries,
    })
}

fn entry_options() -> SimpleFileOptions {
    SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(DateTime::default())
        .unix_permissions(0o644)
}

fn directory_options() -> SimpleFileOptions {
    SimpleFileOptions::default()
        .last_modified_time(DateTime::default())
        .unix_permissions(0o755)
}

fn write_archive(
    document: &str,
    assets: &AssetSet,
    table: &BTreeMap<String, String>,
    base_name: &str,
) -> Result<(Vec<u8>, Vec<BundleEntry>), ArchiveError> {
    let mut files: BTreeMap<String, Vec<u8>> = BTreeMap::new();
    for record in assets.iter() {
        let path = archive_path(record)?;
        let uri = table
            .get(&record.path)
            .ok_or_else(|| ArchiveError::MissingPayload(record.path.clone()))?;
        let bytes = decode_data_uri(uri).map_err(|source| ArchiveError::Decode {
            path: record.path.clone(),
            source,
        })?;
        if files.insert(path.clone(), bytes).is_some() {
            return Err(ArchiveError::DuplicateEntry(path));
        }
    }

    let mut directories = BTreeSet::new();
    for path in files.keys() {
        let mut end = ASSETS_DIR.len();
        while let Some(pos) = path[end..].find('/') {
            end += pos + 1;
            directories.insert(path[..end].to_string());
        }
    }

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let mut entries = vec![];

    let document_name = format!("{}.html", base_name);
    zip.start_file(document_name.as_str(), entry_options())?;
    zip.write_all(document.as_bytes())?;
    entries.push(BundleEntry {
        path: document_name,
        kind: EntryKind::Document,
        size_bytes: document.len() as u64,
        sha256: sha256_hex(document.as_bytes()),
    });

    for dir in std::iter::once(ASSETS_DIR.to_string()).chain(directories) {
        zip.add_directory(dir.as_str(), directory_options())?;
        entries.push(BundleEntry {
            path: dir,
            kind: EntryKind::Directory,
            size_bytes: 0,
            sha256: String::new(),
        });
    }

    for (path, bytes) in &files {
        zip.start_file(path.as_str(), entry_options())?;
        zip.write_all(bytes)?;
        entries.push(BundleEntry {
            path: path.clone(),
            kind: EntryKind::Asset,
            size_bytes: bytes.len() as u64,
            sha256: sha256_hex(bytes),
        });
    }

    let archive = zip.finish()?.into_inner();
    Ok((archive, entries))
}
