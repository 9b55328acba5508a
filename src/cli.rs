use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(author, version, about = "Resolve, cache, and query exceedance spreadsheet datasets", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Report which expected datasets resolve to a file on disk
    Status(StatusArgs),
    /// Load every resolvable dataset and print a per-table summary
    Load(LoadArgs),
    /// List distinct clients found across the loaded datasets as JSON
    Clients(ClientsArgs),
    /// Print a client's historical rows as JSON
    History(HistoryArgs),
    /// Print prediction rows as JSON, optionally filtered to one client
    Predictions(PredictionsArgs),
    /// Copy a spreadsheet file into the data directory
    Ingest(IngestArgs),
}

#[derive(Debug, Args)]
pub struct StatusArgs {
    /// Directory holding the spreadsheet files
    #[arg(short = 'd', long = "data-dir", default_value = "data")]
    pub data_dir: PathBuf,
}

#[derive(Debug, Args)]
pub struct LoadArgs {
    /// Directory holding the spreadsheet files
    #[arg(short = 'd', long = "data-dir", default_value = "data")]
    pub data_dir: PathBuf,
}

#[derive(Debug, Args)]
pub struct ClientsArgs {
    /// Directory holding the spreadsheet files
    #[arg(short = 'd', long = "data-dir", default_value = "data")]
    pub data_dir: PathBuf,
}

#[derive(Debug, Args)]
pub struct HistoryArgs {
    /// Client name to look up (matched ignoring case and surrounding whitespace)
    pub name: String,
    /// Directory holding the spreadsheet files
    #[arg(short = 'd', long = "data-dir", default_value = "data")]
    pub data_dir: PathBuf,
}

#[derive(Debug, Args)]
pub struct PredictionsArgs {
    /// Client name to filter by; all prediction rows when omitted
    pub name: Option<String>,
    /// Directory holding the spreadsheet files
    #[arg(short = 'd', long = "data-dir", default_value = "data")]
    pub data_dir: PathBuf,
}

#[derive(Debug, Args)]
pub struct IngestArgs {
    /// Spreadsheet file (.xls*) to copy into the data directory
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// Directory holding the spreadsheet files
    #[arg(short = 'd', long = "data-dir", default_value = "data")]
    pub data_dir: PathBuf,
}
