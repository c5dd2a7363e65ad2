//! LandingForge CLI - Export interface for the page editor
//!
//! Commands: scaffold, validate, assets, render, bundle
//! Outputs JSON to stdout
//! Returns 1 on bad input, 2 on export or validation failure

use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use landingforge_core::{
    archive_base_name,
    assets::{load_upload_dir, AssetSet},
    source::{load_default_content, source_from_root},
    default_content, ExportConfig, ExportPipeline, LandingTemplate, Node, StaticSource,
};

#[derive(Parser)]
#[command(name = "landingforge-cli")]
#[command(about = "LandingForge CLI - Landing Page Compiler")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Static root (URL or directory) holding template.html and assets/
    #[arg(short, long, global = true)]
    static_root: Option<String>,

    /// Directory of uploaded assets, mapped to /assets/<relative path>
    #[arg(short, long, global = true)]
    uploads: Option<String>,

    /// JSON config file (ExportConfig)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print a new landing template record with default content
    Scaffold {
        /// Template name
        #[arg(short, long, default_value = "New Template")]
        name: String,
    },

    /// Validate page content
    Validate {
        /// Content tree or landing template JSON file
        #[arg(long)]
        content: PathBuf,
    },

    /// List asset paths referenced by the content
    Assets {
        /// Content tree or landing template JSON file
        #[arg(long)]
        content: PathBuf,
    },

    /// Render a single self-contained HTML file
    Render {
        /// Content tree or landing template JSON file
        #[arg(long)]
        content: PathBuf,

        /// Output HTML file
        #[arg(short, long)]
        out: PathBuf,
    },

    /// Package HTML plus separate asset files into a ZIP
    Bundle {
        /// Content tree or landing template JSON file
        #[arg(long)]
        content: PathBuf,

        /// Bundle name (sanitized into the archive base name)
        #[arg(short, long)]
        name: Option<String>,

        /// Output ZIP file (defaults to <name>.zip)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
}

/// Content plus the assets and name it was saved with, if any.
struct Project {
    name: String,
    content: Node,
    assets: AssetSet,
}

fn fail(message: impl std::fmt::Display) -> ExitCode {
    let output = serde_json::json!({ "success": false, "error": message.to_string() });
    println!("{}", output);
    ExitCode::FAILURE
}

fn print_json(value: &impl serde::Serialize) -> Result<(), String> {
    let text = serde_json::to_string_pretty(value).map_err(|e| e.to_string())?;
    println!("{}", text);
    Ok(())
}

fn load_project(path: &Path) -> Result<Project, String> {
    let raw = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;

    if let Ok(record) = serde_json::from_str::<LandingTemplate>(&raw) {
        return Ok(Project {
            name: record.export_name(),
            assets: record.asset_set(),
            content: record.data,
        });
    }

    let content: Node = serde_json::from_str(&raw)
        .map_err(|e| format!("Invalid content {}: {}", path.display(), e))?;
    let name = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    Ok(Project {
        name,
        content,
        assets: AssetSet::new(),
    })
}

fn load_uploads(dir: &Path, into: &mut AssetSet) -> Result<(), String> {
    let records = load_upload_dir(dir)
        .map_err(|e| format!("Failed to read uploads {}: {}", dir.display(), e))?;
    // uploads saved inside the template record take precedence
    into.extend(records);
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => match ExportConfig::load(path) {
            Ok(c) => c,
            Err(e) => return fail(e),
        },
        None => ExportConfig::default(),
    }
    .merge(cli.static_root.clone(), cli.uploads.clone());

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(config.log_filter.as_str())).init();

    match run(cli.command, &config) {
        Ok(code) => code,
        Err(message) => fail(message),
    }
}

fn run(command: Commands, config: &ExportConfig) -> Result<ExitCode, String> {
    let source = source_from_root(&config.static_root).map_err(|e| e.to_string())?;
    let pipeline = ExportPipeline::new(source);

    if let Commands::Scaffold { name } = &command {
        let content = load_default_content(pipeline.source()).unwrap_or_else(|e| {
            log::info!("no default content at {} ({}), using built-in", pipeline.source().describe(), e);
            default_content()
        });
        print_json(&LandingTemplate::with_content(name.clone(), content))?;
        return Ok(ExitCode::SUCCESS);
    }

    let with_uploads = |path: &Path| -> Result<Project, String> {
        let mut project = load_project(path)?;
        if let Some(dir) = &config.uploads_dir {
            load_uploads(Path::new(dir), &mut project.assets)?;
        }
        Ok(project)
    };

    match command {
        Commands::Scaffold { .. } => Ok(ExitCode::SUCCESS),

        Commands::Validate { content } => {
            let project = load_project(&content)?;
            let result = pipeline.validate(&project.content);
            for message in result.messages() {
                log::warn!("{}", message);
            }
            print_json(&result)?;
            if result.valid {
                Ok(ExitCode::SUCCESS)
            } else {
                Ok(ExitCode::from(2)) // Validation failure
            }
        }

        Commands::Assets { content } => {
            let project = with_uploads(&content)?;
            let uploaded: Vec<_> = project.assets.iter().map(|a| a.path.clone()).collect();
            let static_paths = pipeline.static_paths(&project.content, &project.assets);
            print_json(&serde_json::json!({
                "uploaded": uploaded,
                "static": static_paths,
                "total": uploaded.len() + static_paths.len(),
            }))?;
            Ok(ExitCode::SUCCESS)
        }

        Commands::Render { content, out } => {
            let project = with_uploads(&content)?;
            match pipeline.render_page(&project.content, &project.assets) {
                Ok(page) => {
                    fs::write(&out, &page.html)
                        .map_err(|e| format!("Failed to write {}: {}", out.display(), e))?;
                    print_json(&serde_json::json!({
                        "success": true,
                        "output": out.display().to_string(),
                        "report": page.report,
                    }))?;
                    Ok(ExitCode::SUCCESS)
                }
                Err(e) => {
                    println!("{}", serde_json::json!({ "success": false, "error": e.to_string() }));
                    Ok(ExitCode::from(2))
                }
            }
        }

        Commands::Bundle { content, name, out } => {
            let project = with_uploads(&content)?;

            let available = project.assets.len()
                + pipeline.static_paths(&project.content, &project.assets).len();
            if available == 0 {
                return Err("No assets to export. Use render for pages without assets.".to_string());
            }

            let base_name = archive_base_name(name.as_deref().unwrap_or(&project.name));
            let out = out.unwrap_or_else(|| PathBuf::from(format!("{}.zip", base_name)));

            match pipeline.export_bundle(&project.content, &project.assets, &base_name) {
                Ok(bundle) => {
                    fs::write(&out, &bundle.archive)
                        .map_err(|e| format!("Failed to write {}: {}", out.display(), e))?;
                    print_json(&serde_json::json!({
                        "success": true,
                        "output": out.display().to_string(),
                        "report": bundle.report,
                    }))?;
                    Ok(ExitCode::SUCCESS)
                }
                Err(e) => {
                    println!("{}", serde_json::json!({ "success": false, "error": e.to_string() }));
                    Ok(ExitCode::from(2))
                }
            }
        }
    }
}
