use std::fs::File;
use std::io::{self, BufReader};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use heightmap::{generate, HeightmapRequest, PipelineOptions, Result};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "heightmap")]
#[command(version)]
#[command(about = "Resample, pad and quantize an elevation raster into a UInt16 heightmap")]
struct Args {
    /// Read the request document from this file instead of stdin
    #[arg(short, long)]
    request: Option<PathBuf>,

    /// Log level (overridden by RUST_LOG)
    #[arg(long, default_value = "warn", env = "HEIGHTMAP_LOG_LEVEL")]
    log_level: String,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,
}

fn init_tracing(args: &Args) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(args.log_level.to_lowercase()));

    // stdout carries the result line only.
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(true);

    if args.json_logs {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn run(args: &Args) -> Result<PathBuf> {
    let request = match &args.request {
        Some(path) => HeightmapRequest::from_reader(BufReader::new(File::open(path)?))?,
        None => HeightmapRequest::from_reader(io::stdin().lock())?,
    };
    generate(&request, &PipelineOptions::default())
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(&args);
    info!(version = env!("CARGO_PKG_VERSION"), "Starting heightmap");

    match run(&args) {
        Ok(path) => {
            println!("{}", path.display());
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{}", e);
            ExitCode::from(e.exit_code())
        }
    }
}
