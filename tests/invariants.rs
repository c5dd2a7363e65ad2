//! Contract Invariant Tests
//!
//! These tests verify the export guarantees end to end against a static
//! root on disk.

use std::collections::BTreeSet;
use std::fs;
use std::io::{Cursor, Read};

use landingforge_core::{
    assets::{decode_data_uri, AssetRecord, AssetSet},
    pipeline::{ExportError, ExportMode},
    render, DirSource, ExportPipeline, Node,
};
use serde_json::json;
use tempfile::TempDir;

const TEMPLATE: &str = r#"<!doctype html>
<title>{{site.title}}</title>
<link rel="icon" href="{{site.favicon}}">
<img class="logo" src="{{site.logoUrl}}">
<h1>{{hero.headline}}</h1>
<ul>{{#features}}<li><img src="{{icon}}">{{@index}}. {{title}}</li>{{/features}}</ul>
<ol>{{#howItWorks}}<li>{{.}}</li>{{/howItWorks}}</ol>
{{#socialLinks.twitter}}<a class="tw" href="{{socialLinks.twitter}}">Twitter</a>{{/socialLinks.twitter}}
{{#socialLinks.facebook}}<a class="fb" href="{{socialLinks.facebook}}">Facebook</a>{{/socialLinks.facebook}}
<footer>{{footer.copyright}}</footer>
"#;

fn content() -> Node {
    Node::from(json!({
        "site": {
            "title": "Acme",
            "favicon": "/assets/favicon.ico",
            "logoUrl": "/assets/logo.svg"
        },
        "hero": {"headline": "Launch day", "subheadline": "Ship it"},
        "features": [
            {"title": "Fast", "icon": "/assets/icons/sub/fast.svg"},
            {"title": "Safe", "icon": "/assets/icons/safe.svg"}
        ],
        "howItWorks": ["Sign up", "Build", "Publish"],
        "socialLinks": {"twitter": "", "facebook": "https://facebook.com/acme"}
    }))
}

/// Static root with the template and two of the four referenced assets.
/// `favicon.ico` is left out on purpose.
fn static_root() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("template.html"), TEMPLATE).unwrap();
    fs::create_dir_all(dir.path().join("assets/icons/sub")).unwrap();
    fs::write(dir.path().join("assets/icons/sub/fast.svg"), b"<svg id='fast'/>").unwrap();
    fs::write(dir.path().join("assets/icons/safe.svg"), b"<svg id='safe'/>").unwrap();
    fs::write(dir.path().join("assets/logo.svg"), b"<svg id='static-logo'/>").unwrap();
    dir
}

fn uploads() -> AssetSet {
    vec![AssetRecord::new(
        "logo.svg",
        "/assets/logo.svg",
        "image/svg+xml",
        b"<svg id='uploaded-logo'/>".to_vec(),
    )]
    .into_iter()
    .collect()
}

fn pipeline(root: &TempDir) -> ExportPipeline {
    ExportPipeline::new(Box::new(DirSource::new(root.path())))
}

fn archive_files(bytes: &[u8]) -> std::collections::BTreeMap<String, Vec<u8>> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
    let mut files = std::collections::BTreeMap::new();
    for i in 0..archive.len() {
        let mut file = archive.by_index(i).unwrap();
        let mut buf = vec![];
        file.read_to_end(&mut buf).unwrap();
        files.insert(file.name().to_string(), buf);
    }
    files
}

/// Pull the data URI out of `src="..."` following `marker`.
fn src_after<'a>(html: &'a str, marker: &str) -> &'a str {
    let start = html.find(marker).unwrap() + marker.len();
    let rest = &html[start..];
    let open = rest.find("src=\"").unwrap() + 5;
    let close = rest[open..].find('"').unwrap();
    &rest[open..open + close]
}

#[test]
fn invariant_single_file_is_self_contained() {
    let root = static_root();
    let page = pipeline(&root).render_page(&content(), &uploads()).unwrap();

    assert!(page.html.contains("<title>Acme</title>"));
    assert!(page.html.contains("<li><img src=\"data:image/svg+xml;base64,"));
    assert!(page.html.contains("1. Fast</li>"));
    assert!(page.html.contains("2. Safe</li>"));
    assert!(page.html.contains("<li>Sign up</li><li>Build</li><li>Publish</li>"));
    assert!(page.html.contains("class=\"fb\" href=\"https://facebook.com/acme\""));
    assert!(!page.html.contains("class=\"tw\""));
    assert_eq!(page.report.mode, ExportMode::SingleFile);
}

#[test]
fn invariant_uploaded_asset_wins_over_static() {
    let root = static_root();
    let page = pipeline(&root).render_page(&content(), &uploads()).unwrap();

    let logo = decode_data_uri(src_after(&page.html, "class=\"logo\"")).unwrap();
    assert_eq!(logo, b"<svg id='uploaded-logo'/>");
    assert_eq!(page.report.uploaded_assets, 1);
    assert_eq!(page.report.static_assets, 2);
}

#[test]
fn invariant_missing_static_asset_degrades() {
    let root = static_root();
    let page = pipeline(&root).render_page(&content(), &uploads()).unwrap();

    assert!(page.html.contains("href=\"/assets/favicon.ico\""));
    let unresolved: Vec<_> = page
        .report
        .unresolved_assets
        .iter()
        .map(|m| m.path.as_str())
        .collect();
    assert_eq!(unresolved, vec!["/assets/favicon.ico"]);
}

#[test]
fn invariant_missing_template_is_fatal() {
    let root = tempfile::tempdir().unwrap();
    let result = pipeline(&root).render_page(&content(), &uploads());
    assert!(matches!(result, Err(ExportError::TemplateLoad(_))));

    let result = pipeline(&root).export_bundle(&content(), &uploads(), "acme");
    assert!(matches!(result, Err(ExportError::TemplateLoad(_))));
}

#[test]
fn invariant_bundle_layout() {
    let root = static_root();
    let bundle = pipeline(&root)
        .export_bundle(&content(), &uploads(), "acme")
        .unwrap();
    let files = archive_files(&bundle.archive);

    let names: BTreeSet<_> = files.keys().map(String::as_str).collect();
    let expected: BTreeSet<_> = [
        "acme.html",
        "assets/",
        "assets/icons/",
        "assets/icons/sub/",
        "assets/icons/sub/fast.svg",
        "assets/icons/safe.svg",
        "assets/logo.svg",
    ]
    .into_iter()
    .collect();
    assert_eq!(names, expected);

    assert_eq!(files["assets/logo.svg"], b"<svg id='uploaded-logo'/>");
    assert_eq!(files["assets/icons/sub/fast.svg"], b"<svg id='fast'/>");
    assert_eq!(bundle.report.mode, ExportMode::Bundle);
}

#[test]
fn invariant_bundle_document_is_inline_too() {
    let root = static_root();
    let bundle = pipeline(&root)
        .export_bundle(&content(), &uploads(), "acme")
        .unwrap();
    let files = archive_files(&bundle.archive);
    let html = String::from_utf8(files["acme.html"].clone()).unwrap();

    let logo = decode_data_uri(src_after(&html, "class=\"logo\"")).unwrap();
    assert_eq!(logo, b"<svg id='uploaded-logo'/>");
    // unfetchable asset falls back to a bundle-relative path
    assert!(html.contains("href=\"assets/favicon.ico\""));
    assert_eq!(
        bundle.report.document_sha256,
        landingforge_core::sha256_hex(html.as_bytes())
    );
}

#[test]
fn invariant_bundle_entry_names_stable() {
    let root = static_root();
    let pipeline = pipeline(&root);
    let first = pipeline.export_bundle(&content(), &uploads(), "acme").unwrap();
    let second = pipeline.export_bundle(&content(), &uploads(), "acme").unwrap();

    assert_eq!(first.archive, second.archive);
    assert_eq!(first.report.entries, second.report.entries);
    // run-specific fields differ, so the report hash does too
    assert_ne!(first.report.id, second.report.id);
}

#[test]
fn invariant_empty_assets_bundle_does_not_throw() {
    let root = static_root();
    let bare = Node::from(json!({"site": {"title": "No images"}}));
    let bundle = pipeline(&root)
        .export_bundle(&bare, &AssetSet::new(), "bare")
        .unwrap();
    let files = archive_files(&bundle.archive);

    let names: Vec<_> = files.keys().cloned().collect();
    assert_eq!(names, vec!["assets/", "bare.html"]);
}

#[test]
fn invariant_render_identity_without_markers() {
    let text = "<p>No markers { here } at all</p>";
    assert_eq!(render(text, &content()), text);
}

#[test]
fn invariant_report_validation_attached() {
    let root = static_root();
    let page = pipeline(&root).render_page(&content(), &uploads()).unwrap();

    // every required field is filled in
    assert!(page.report.validation.valid);
    assert!(!page.report.report_hash.is_empty());
}
