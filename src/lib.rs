pub mod cache;
pub mod cli;
pub mod data;
pub mod extract;
pub mod names;
pub mod query;
pub mod resolve;
pub mod table;
pub mod workbook;

use std::{env, fs, sync::OnceLock};

use anyhow::{Context, Result, bail};
use clap::Parser;
use log::{LevelFilter, info, warn};

use crate::cache::DatasetCache;
use crate::cli::{Cli, Commands};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("exceedance_data", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Status(args) => handle_status(&args),
        Commands::Load(args) => handle_load(&args),
        Commands::Clients(args) => handle_clients(&args),
        Commands::History(args) => handle_history(&args),
        Commands::Predictions(args) => handle_predictions(&args),
        Commands::Ingest(args) => handle_ingest(&args),
    }
}

fn handle_status(args: &cli::StatusArgs) -> Result<()> {
    let cache = DatasetCache::new(&args.data_dir);
    let mut rows = Vec::new();
    for spec in cache.datasets() {
        let resolved = cache.resolve(spec.key);
        rows.push(vec![
            spec.key.to_string(),
            spec.expected_filename.to_string(),
            resolved.is_some().to_string(),
            resolved
                .map(|path| path.display().to_string())
                .unwrap_or_default(),
        ]);
    }
    let headers = vec![
        "dataset".to_string(),
        "expected file".to_string(),
        "exists".to_string(),
        "path".to_string(),
    ];
    table::print_table(&headers, &rows);
    Ok(())
}

fn handle_load(args: &cli::LoadArgs) -> Result<()> {
    info!("Loading datasets from {:?}", args.data_dir);
    let cache = DatasetCache::new(&args.data_dir);
    let frames = cache
        .load_all()
        .with_context(|| format!("Loading datasets from {:?}", args.data_dir))?;

    let mut rows = Vec::with_capacity(frames.len());
    for (key, frame) in &frames {
        rows.push(vec![
            key.clone(),
            frame.row_count().to_string(),
            frame.column_count().to_string(),
        ]);
    }
    let headers = vec![
        "dataset".to_string(),
        "rows".to_string(),
        "columns".to_string(),
    ];
    table::print_table(&headers, &rows);
    info!("Loaded {} table(s)", frames.len());
    Ok(())
}

fn handle_clients(args: &cli::ClientsArgs) -> Result<()> {
    let cache = DatasetCache::new(&args.data_dir);
    let clients = query::list_clients(&cache)?;
    if clients.is_empty() {
        warn!("No client records found in any loaded dataset");
    }
    println!("{}", serde_json::to_string_pretty(&clients)?);
    Ok(())
}

fn handle_history(args: &cli::HistoryArgs) -> Result<()> {
    let cache = DatasetCache::new(&args.data_dir);
    let rows = query::client_history(&cache, &args.name)?;
    if rows.is_empty() {
        warn!("No historical rows matched client '{}'", args.name);
    }
    println!("{}", serde_json::to_string_pretty(&rows)?);
    Ok(())
}

fn handle_predictions(args: &cli::PredictionsArgs) -> Result<()> {
    let cache = DatasetCache::new(&args.data_dir);
    let rows = match &args.name {
        Some(name) => {
            let rows = query::client_predictions(&cache, name)?;
            if rows.is_empty() {
                warn!("No prediction rows matched client '{name}'");
            }
            rows
        }
        None => query::list_predictions(&cache)?,
    };
    println!("{}", serde_json::to_string_pretty(&rows)?);
    Ok(())
}

fn handle_ingest(args: &cli::IngestArgs) -> Result<()> {
    if !resolve::is_spreadsheet(&args.input) {
        bail!(
            "Only spreadsheet files (.xls*) are supported, got {:?}",
            args.input
        );
    }
    let file_name = args
        .input
        .file_name()
        .with_context(|| format!("Input path {:?} has no file name", args.input))?;

    fs::create_dir_all(&args.data_dir)
        .with_context(|| format!("Creating data directory {:?}", args.data_dir))?;
    let destination = args.data_dir.join(file_name);
    fs::copy(&args.input, &destination)
        .with_context(|| format!("Copying {:?} to {destination:?}", args.input))?;

    // A fresh process re-resolves on the next query; long-lived callers
    // embedding the library clear their DatasetCache here instead.
    let name = file_name.to_string_lossy();
    let inferred = cache::EXPECTED_DATASETS
        .iter()
        .find(|spec| spec.expected_filename.to_lowercase() == name.to_lowercase());
    match inferred {
        Some(spec) => info!("Ingested {destination:?} as dataset '{}'", spec.key),
        None => info!("Ingested {destination:?} (no expected dataset bears this name)"),
    }
    Ok(())
}
