use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use serde_json::Value;
use sheet_notation::{PcSheet, ProcessorConfig, SourceLocation, SystemDataLoader};
use tracing::Level;

/// Render a character-sheet template to HTML.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Character JSON file
    character: PathBuf,
    /// Template file containing {{...}} notation
    template: PathBuf,
    /// Directory holding the rule-data JSON files
    #[arg(long, default_value = "data")]
    data_dir: PathBuf,
    /// Processor config as JSON (optional)
    #[arg(long)]
    config: Option<PathBuf>,
    /// Render failed notation inline instead of aborting
    #[arg(long)]
    lenient: bool,
    /// Seed for tooltip IDs, for reproducible output
    #[arg(long)]
    seed: Option<u64>,
    /// Log at debug level
    #[arg(long, short)]
    verbose: bool,
}

fn read_json(path: &Path, what: &str) -> Result<Value, String> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| format!("cannot read {what} {}: {e}", path.display()))?;
    serde_json::from_str(&text).map_err(|e| format!("invalid {what} {}: {e}", path.display()))
}

fn run(args: &Args) -> Result<String, String> {
    let mut config: ProcessorConfig = match &args.config {
        Some(path) => serde_json::from_value(read_json(path, "config")?)
            .map_err(|e| format!("invalid config {}: {e}", path.display()))?,
        None => ProcessorConfig::default(),
    };
    if args.lenient {
        config = config.with_strict(false);
    }
    if let Some(seed) = args.seed {
        config = config.with_seed(seed);
    }

    let character = read_json(&args.character, "character")?;
    let template = std::fs::read_to_string(&args.template)
        .map_err(|e| format!("cannot read template {}: {e}", args.template.display()))?;

    let loader = Arc::new(SystemDataLoader::new(args.data_dir.clone()));
    loader.preload_all();
    let sheet = PcSheet::with_config(character, loader, config);
    let location = SourceLocation::new(args.template.display().to_string(), 1);
    sheet.render(&template, Some(location)).map_err(|e| e.to_string())
}

fn main() -> ExitCode {
    // Parse CLI arguments.
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_max_level(if args.verbose { Level::DEBUG } else { Level::WARN })
        .with_writer(std::io::stderr)
        .init();

    match run(&args) {
        Ok(html) => {
            println!("{html}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
