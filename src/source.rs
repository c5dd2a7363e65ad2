//! Static Sources - Template Document and Static Asset Retrieval
//!
//! The template document and any asset not uploaded in the session live
//! under one static root, either an HTTP location or a local directory.
//! Asset paths are addressed by dropping the leading `/` of `/assets/...`
//! and resolving the remainder against that root.

use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;
use std::fs;
use std::path::{Component, PathBuf};
use std::thread;
use std::time::Duration;
use thiserror::Error;
use url::Url;

use crate::assets::{mime_for_path, relativize, AssetRecord};
use crate::tree::Node;

/// Template document, relative to the static root.
pub const TEMPLATE_DOCUMENT: &str = "template.html";

/// Default content tree, relative to the static root.
pub const DEFAULT_CONTENT: &str = "template.json";

/// Default timeout for static root requests (30 seconds)
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

pub const USER_AGENT: &str = concat!("landingforge/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Invalid resource path: {0}")]
    InvalidPath(String),

    #[error("HTTP {status} fetching {url}")]
    Status { url: Url, status: u16 },

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Template document is not valid UTF-8")]
    NotUtf8,

    #[error("Invalid default content: {0}")]
    InvalidContent(#[from] serde_json::Error),
}

/// Bytes retrieved from a static source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fetched {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
}

/// A fixed, well-known location for static files.
pub trait StaticSource: Sync {
    /// Fetch `relative` (no leading `/`) from the root.
    fn fetch(&self, relative: &str) -> Result<Fetched, SourceError>;

    /// Human-readable root, for logs and reports.
    fn describe(&self) -> String;
}

/// Reject absolute paths and `..` so a content tree cannot escape the root.
fn check_relative(relative: &str) -> Result<(), SourceError> {
    let invalid = relative.is_empty()
        || relative.starts_with('/')
        || relative.contains('\\')
        || relative.split('/').any(|seg| seg == "..");
    if invalid {
        return Err(SourceError::InvalidPath(relative.to_string()));
    }
    Ok(())
}

/// Static root served over HTTP.
pub struct HttpSource {
    client: Client,
    base: Url,
}

impl HttpSource {
    pub fn new(base: Url) -> Result<Self, SourceError> {
        Self::with_timeout(base, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(mut base: Url, timeout: Duration) -> Result<Self, SourceError> {
        // Url::join drops the last segment unless the base ends with '/'
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()?;
        Ok(Self { client, base })
    }
}

impl StaticSource for HttpSource {
    fn fetch(&self, relative: &str) -> Result<Fetched, SourceError> {
        check_relative(relative)?;
        let url = self.base.join(relative)?;

        let response = self.client.get(url.as_str()).send()?;
        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(SourceError::NotFound(url.to_string()));
        }
        if !status.is_success() {
            return Err(SourceError::Status {
                url,
                status: status.as_u16(),
            });
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.split(';').next().unwrap_or(v).trim().to_string())
            .filter(|v| !v.is_empty());
        let bytes = response.bytes()?.to_vec();

        Ok(Fetched {
            bytes,
            content_type,
        })
    }

    fn describe(&self) -> String {
        self.base.to_string()
    }
}

/// Static root on the local filesystem.
pub struct DirSource {
    root: PathBuf,
}

impl DirSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl StaticSource for DirSource {
    fn fetch(&self, relative: &str) -> Result<Fetched, SourceError> {
        check_relative(relative)?;
        let path = self.root.join(relative);
        if path.components().any(|c| matches!(c, Component::ParentDir)) {
            return Err(SourceError::InvalidPath(relative.to_string()));
        }
        if !path.is_file() {
            return Err(SourceError::NotFound(path.display().to_string()));
        }

        Ok(Fetched {
            bytes: fs::read(&path)?,
            content_type: None,
        })
    }

    fn describe(&self) -> String {
        self.root.display().to_string()
    }
}

/// Interpret a `--static-root` value: anything with an http(s) scheme is a
/// URL, everything else a directory.
pub fn source_from_root(root: &str) -> Result<Box<dyn StaticSource>, SourceError> {
    if root.starts_with("http://") || root.starts_with("https://") {
        Ok(Box::new(HttpSource::new(Url::parse(root)?)?))
    } else {
        Ok(Box::new(DirSource::new(root)))
    }
}

/// Load the template document. Absence is fatal for the request.
pub fn load_template_document(source: &dyn StaticSource) -> Result<String, SourceError> {
    let fetched = source.fetch(TEMPLATE_DOCUMENT)?;
    String::from_utf8(fetched.bytes).map_err(|_| SourceError::NotUtf8)
}

/// Load the default content tree that ships next to the template.
pub fn load_default_content(source: &dyn StaticSource) -> Result<Node, SourceError> {
    let fetched = source.fetch(DEFAULT_CONTENT)?;
    Ok(serde_json::from_slice(&fetched.bytes)?)
}

/// A static asset that could not be fetched.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct MissingAsset {
    pub path: String,
    pub reason: String,
}

/// Upper bound on fetch threads alive at once.
pub const MAX_CONCURRENT_FETCHES: usize = 16;

/// Fetch asset paths concurrently, at most [`MAX_CONCURRENT_FETCHES`] at a
/// time, and wait for all of them. Failures, including a thread that could
/// not be started, are reported per path; they never abort the batch.
pub fn fetch_static_assets(
    source: &dyn StaticSource,
    paths: &[String],
) -> (Vec<AssetRecord>, Vec<MissingAsset>) {
    let mut results: Vec<(String, Result<AssetRecord, String>)> = Vec::with_capacity(paths.len());
    for batch in paths.chunks(MAX_CONCURRENT_FETCHES) {
        thread::scope(|scope| {
            let handles: Vec<_> = batch
                .iter()
                .map(|path| {
                    let spawned = thread::Builder::new()
                        .name("static-fetch".to_string())
                        .spawn_scoped(scope, move || fetch_one(source, path));
                    (path, spawned)
                })
                .collect();

            for (path, spawned) in handles {
                let result = match spawned {
                    Ok(handle) => handle
                        .join()
                        .unwrap_or_else(|_| Err("fetch thread panicked".to_string())),
                    Err(e) => Err(format!("could not start fetch thread: {}", e)),
                };
                results.push((path.clone(), result));
            }
        });
    }

    let mut fetched = vec![];
    let mut missing = vec![];
    for (path, result) in results {
        match result {
            Ok(record) => {
                log::debug!("fetched static asset {} ({} bytes)", path, record.size_bytes);
                fetched.push(record);
            }
            Err(reason) => {
                log::warn!("skipping static asset {}: {}", path, reason);
                missing.push(MissingAsset { path, reason });
            }
        }
    }
    (fetched, missing)
}

fn fetch_one(source: &dyn StaticSource, path: &str) -> Result<AssetRecord, String> {
    let relative = relativize(path);
    let fetched = source.fetch(relative).map_err(|e| e.to_string())?;
    let name = path.rsplit('/').next().unwrap_or(path);
    let mime = fetched
        .content_type
        .unwrap_or_else(|| mime_for_path(path).to_string());
    Ok(AssetRecord::new(name, path, mime, fetched.bytes))
}
