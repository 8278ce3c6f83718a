//!
//! Export quantity declarations as metadata for downstream compilations.
//!
//! Usage: `measura-export <declarations> [--output FILE] [--config FILE]`
//!
//! Declarations are only exported when they resolve without errors.

use clap::Parser;
use std::path::PathBuf;
use std::process;
use tracing::{error, info, warn};

use measura_compiler::{compile_from_path, write_metadata};

#[derive(Parser, Debug)]
#[command(name = "measura-export")]
#[command(about = "Export quantity declarations as foreign metadata (.mqm)")]
struct Args {
    /// JSON declaration file, or a directory of them
    declarations: PathBuf,

    /// Explicit output file path
    #[arg(long = "output")]
    output: Option<PathBuf>,

    /// TOML compile options
    #[arg(long)]
    config: Option<PathBuf>,

    /// Metadata the declarations depend on (repeatable)
    #[arg(long = "foreign")]
    foreign: Vec<PathBuf>,
}

fn main() {
    measura_tools::init_logging();

    let args = Args::parse();

    let options = match measura_tools::load_options(args.config.as_deref(), &args.foreign) {
        Ok(options) => options,
        Err(err) => {
            error!("{}", err);
            process::exit(1);
        }
    };

    let (loaded, result) = match compile_from_path(&args.declarations, &options) {
        Ok(compiled) => compiled,
        Err(err) => {
            error!("{}", err);
            process::exit(1);
        }
    };

    if result.has_errors() {
        error!("{}", result.format_diagnostics(&loaded.files).trim_end());
        process::exit(1);
    }
    if !result.diagnostics.is_empty() {
        warn!("{}", result.format_diagnostics(&loaded.files).trim_end());
    }

    let output = args
        .output
        .unwrap_or_else(|| measura_tools::default_metadata_path(&args.declarations));

    if let Err(err) = write_metadata(&output, &loaded.declarations) {
        error!("{}", err);
        process::exit(1);
    }
    info!(
        "Exported {} declarations to {}",
        loaded.declarations.len(),
        output.display()
    );
}
