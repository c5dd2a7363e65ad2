//! LandingForge Core - Landing Page Compiler
//!
//! # Guarantees
//! 1. Rendering Is Total: unresolved markers stay visible, nothing panics
//! 2. Uploads Beat Static Files on the same path
//! 3. Missing Static Assets Degrade, Missing Templates Fail
//! 4. Deterministic Bundles: same inputs, same archive bytes
//! 5. No Ambient State: content and assets are passed into every export

pub mod tree;
pub mod render;
pub mod assets;
pub mod source;
pub mod bundle;
pub mod validation;
pub mod templates;
pub mod hashing;
pub mod config;
pub mod pipeline;

pub use tree::Node;
pub use render::render;
pub use assets::{AssetRecord, AssetSet, ASSET_PREFIX, is_asset_path, resolve_for_inline, collect_static_paths};
pub use source::{StaticSource, HttpSource, DirSource, SourceError};
pub use bundle::{package_bundle, archive_base_name, Bundle, ArchiveError};
pub use validation::{ValidationResult, ValidationRule, ValidationViolation, ViolationSeverity};
pub use templates::{LandingTemplate, default_content};
pub use hashing::{sha256_hex, canonical_json};
pub use config::ExportConfig;
pub use pipeline::{ExportPipeline, ExportReport, ExportError, RenderedPage, ExportedBundle};

pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");
