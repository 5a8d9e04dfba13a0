//! tsf-ingest - Catalog refresh
//!
//! Replaces the catalog with the contents of the institution and degree
//! programme feeds, applies the trait overlays and rebuilds the programme
//! aggregate in one transaction. Exits non-zero when the refresh was rolled
//! back.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;
use tsf_common::config::{load_config, resolve_root_folder};
use tsf_common::db::init_database;
use tsf_ingest::{run_refresh, RefreshInputs, RefreshOptions, RefreshPaths};

#[derive(Debug, Parser)]
#[command(name = "tsf-ingest", version, about = "Refresh the study programme catalog")]
struct Args {
    /// Config file (TOML)
    #[arg(short, long, env = "TSF_CONFIG")]
    config: Option<PathBuf>,

    /// Root folder holding the database
    #[arg(short, long, env = "TSF_ROOT_FOLDER")]
    root_folder: Option<PathBuf>,

    /// Database file, overrides root folder and config
    #[arg(long)]
    database: Option<PathBuf>,

    /// Institutions feed (XML)
    #[arg(long)]
    institutions: PathBuf,

    /// Degree programmes feed (XML)
    #[arg(long)]
    programmes: PathBuf,

    /// Area of study trait overlay (delimited text)
    #[arg(long)]
    area_overlay: PathBuf,

    /// Field of study trait override overlay (delimited text)
    #[arg(long)]
    field_overlay: PathBuf,

    /// Level-2 question bank (id,text,trait)
    #[arg(long)]
    questions: Option<PathBuf>,

    /// Preferred language of localized feed text
    #[arg(long)]
    language: Option<String>,

    /// Print the refresh report as JSON on success
    #[arg(long)]
    report_json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = load_config(args.config.as_deref()).context("Failed to load configuration")?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        )
        .init();

    info!(
        "Starting tsf-ingest v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let db_path = match &args.database {
        Some(path) => path.clone(),
        None => {
            let root_folder = resolve_root_folder(args.root_folder.as_deref(), &config);
            config.database_path(&root_folder)
        }
    };
    info!("Database: {}", db_path.display());

    let pool = init_database(&db_path)
        .await
        .with_context(|| format!("Failed to open database {}", db_path.display()))?;

    let paths = RefreshPaths {
        institutions: args.institutions,
        programmes: args.programmes,
        area_overlay: args.area_overlay,
        field_overlay: args.field_overlay,
        questions: args.questions,
    };
    let inputs = RefreshInputs::read(&paths).context("Failed to read refresh inputs")?;

    let mut options =
        RefreshOptions::try_from(&config.ingest).context("Invalid [ingest] configuration")?;
    if let Some(language) = args.language {
        options.language = language;
    }

    let report = run_refresh(&pool, &inputs, &options)
        .await
        .context("Catalog refresh rolled back")?;

    if args.report_json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }

    pool.close().await;
    Ok(())
}
