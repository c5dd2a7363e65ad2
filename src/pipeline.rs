//! Export Pipeline - Single Entry Point
//!
//! Both export modes share one path: load the template document, discover
//! and fetch static assets the uploads do not cover, then render. Static
//! fetch failures degrade the output; a missing template or a broken
//! archive fails the request.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::assets::{collect_static_paths, resolve_for_inline, AssetSet};
use crate::bundle::{package_bundle, ArchiveError, BundleEntry};
use crate::hashing::{compute_report_hash, sha256_hex};
use crate::render::render;
use crate::source::{fetch_static_assets, load_template_document, MissingAsset, SourceError, StaticSource};
use crate::tree::Node;
use crate::validation::{ValidationResult, Validator};
use crate::ENGINE_VERSION;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Failed to load template document: {0}")]
    TemplateLoad(#[source] SourceError),

    #[error("Archive construction failed: {0}")]
    Archive(#[from] ArchiveError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportMode {
    SingleFile,
    Bundle,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportReport {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub engine_version: String,
    pub mode: ExportMode,
    pub static_root: String,
    pub document_sha256: String,
    pub uploaded_assets: usize,
    pub static_assets: usize,
    /// Archive entries; empty for single-file exports.
    pub entries: Vec<BundleEntry>,
    pub unresolved_assets: Vec<MissingAsset>,
    pub validation: ValidationResult,
    pub report_hash: String,
}

#[derive(Debug, Clone)]
pub struct RenderedPage {
    pub html: String,
    pub report: ExportReport,
}

#[derive(Debug, Clone)]
pub struct ExportedBundle {
    pub archive: Vec<u8>,
    pub report: ExportReport,
}

/// Assets available to one export: uploads first, then whatever static
/// fetches succeeded.
struct Gathered {
    assets: AssetSet,
    uploaded: usize,
    fetched: usize,
    missing: Vec<MissingAsset>,
}

/// The export pipeline - single entry point for rendering and packaging
pub struct ExportPipeline {
    source: Box<dyn StaticSource>,
    validator: Validator,
}

impl ExportPipeline {
    pub fn new(source: Box<dyn StaticSource>) -> Self {
        Self {
            source,
            validator: Validator::new(),
        }
    }

    pub fn source(&self) -> &dyn StaticSource {
        self.source.as_ref()
    }

    pub fn validate(&self, content: &Node) -> ValidationResult {
        self.validator.validate(content)
    }

    /// Asset paths the content references that uploads do not cover.
    pub fn static_paths(&self, content: &Node, uploaded: &AssetSet) -> Vec<String> {
        collect_static_paths(content, uploaded)
    }

    /// Single self-contained HTML document with every asset inline.
    pub fn render_page(&self, content: &Node, uploaded: &AssetSet) -> Result<RenderedPage, ExportError> {
        let template = self.load_template()?;
        let gathered = self.gather_assets(content, uploaded);

        let data = resolve_for_inline(content, &gathered.assets);
        let html = render(&template, &data);
        log::debug!("rendered single-file page ({} bytes)", html.len());

        let report = self.build_report(ExportMode::SingleFile, content, &html, vec![], gathered)?;
        Ok(RenderedPage { html, report })
    }

    /// Archive with `<base_name>.html` and the original asset binaries.
    pub fn export_bundle(
        &self,
        content: &Node,
        uploaded: &AssetSet,
        base_name: &str,
    ) -> Result<ExportedBundle, ExportError> {
        let template = self.load_template()?;
        let gathered = self.gather_assets(content, uploaded);

        let bundle = package_bundle(content, &template, &gathered.assets, base_name)?;
        log::debug!(
            "packaged bundle {} ({} entries, {} bytes)",
            base_name,
            bundle.entries.len(),
            bundle.archive.len()
        );

        let report = self.build_report(ExportMode::Bundle, content, &bundle.document, bundle.entries, gathered)?;
        Ok(ExportedBundle {
            archive: bundle.archive,
            report,
        })
    }

    fn load_template(&self) -> Result<String, ExportError> {
        log::debug!("loading template document from {}", self.source.describe());
        load_template_document(self.source.as_ref()).map_err(ExportError::TemplateLoad)
    }

    fn gather_assets(&self, content: &Node, uploaded: &AssetSet) -> Gathered {
        let paths = collect_static_paths(content, uploaded);
        log::debug!("{} static asset(s) to fetch", paths.len());
        let (fetched, missing) = fetch_static_assets(self.source.as_ref(), &paths);

        let mut assets = uploaded.clone();
        let fetched_count = fetched.len();
        assets.extend(fetched);
        Gathered {
            assets,
            uploaded: uploaded.len(),
            fetched: fetched_count,
            missing,
        }
    }

    fn build_report(
        &self,
        mode: ExportMode,
        content: &Node,
        document: &str,
        entries: Vec<BundleEntry>,
        gathered: Gathered,
    ) -> Result<ExportReport, ExportError> {
        let mut report = ExportReport {
            id: Uuid::new_v4().to_string(),
            created_at: Utc::now(),
            engine_version: ENGINE_VERSION.to_string(),
            mode,
            static_root: self.source.describe(),
            document_sha256: sha256_hex(document.as_bytes()),
            uploaded_assets: gathered.uploaded,
            static_assets: gathered.fetched,
            entries,
            unresolved_assets: gathered.missing,
            validation: self.validator.validate(content),
            report_hash: String::new(), // Computed after
        };

        report.report_hash = compute_report_hash(&report)?;
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::HttpSource;
    use mockito::Server;
    use serde_json::json;
    use url::Url;

    #[test]
    fn test_repeated_reference_fetched_once() {
        let mut server = Server::new();
        let template = server
            .mock("GET", "/template.html")
            .with_status(200)
            .with_body(r#"<img src="{{site.logoUrl}}"><img src="{{footer.logo}}">"#)
            .expect(1)
            .create();
        let logo = server
            .mock("GET", "/assets/logo.svg")
            .with_status(200)
            .with_body("<svg/>")
            .expect(1)
            .create();

        let content = Node::from(json!({
            "site": {"logoUrl": "/assets/logo.svg"},
            "footer": {"logo": "/assets/logo.svg"}
        }));
        let source = HttpSource::new(Url::parse(&server.url()).unwrap()).unwrap();
        let page = ExportPipeline::new(Box::new(source))
            .render_page(&content, &AssetSet::new())
            .unwrap();

        template.assert();
        logo.assert();
        assert_eq!(page.report.static_assets, 1);
        assert_eq!(page.html.matches("data:image/svg+xml;base64,").count(), 2);
    }

    #[test]
    fn test_uploaded_asset_not_fetched() {
        let mut server = Server::new();
        let _template = server
            .mock("GET", "/template.html")
            .with_status(200)
            .with_body("<img src=\"{{site.logoUrl}}\">")
            .create();
        let logo = server
            .mock("GET", "/assets/logo.svg")
            .expect(0)
            .create();

        let content = Node::from(json!({"site": {"logoUrl": "/assets/logo.svg"}}));
        let uploads: AssetSet = vec![crate::assets::AssetRecord::new(
            "logo.svg",
            "/assets/logo.svg",
            "image/svg+xml",
            b"<svg id='up'/>".to_vec(),
        )]
        .into_iter()
        .collect();
        let source = HttpSource::new(Url::parse(&server.url()).unwrap()).unwrap();
        let page = ExportPipeline::new(Box::new(source))
            .render_page(&content, &uploads)
            .unwrap();

        logo.assert();
        assert_eq!(page.report.uploaded_assets, 1);
        assert_eq!(page.report.static_assets, 0);
    }
}
