//!
//! Resolve quantity declarations and report diagnostics.
//!
//! Usage: `measura-check <declarations> [--config FILE] [--foreign FILE]... [--emit FILE]`

use clap::Parser;
use std::fs;
use std::path::PathBuf;
use std::process;
use tracing::{error, info, warn};

use measura_ast::Resolved;
use measura_compiler::compile_from_path;

#[derive(Parser, Debug)]
#[command(name = "measura-check")]
#[command(about = "Resolve quantity declarations and report diagnostics")]
struct Args {
    /// JSON declaration file, or a directory of them
    declarations: PathBuf,

    /// TOML compile options
    #[arg(long)]
    config: Option<PathBuf>,

    /// Metadata exported by another compilation (repeatable)
    #[arg(long = "foreign")]
    foreign: Vec<PathBuf>,

    /// Write resolved descriptors as JSON
    #[arg(long)]
    emit: Option<PathBuf>,

    /// Resolve on a single thread
    #[arg(long)]
    sequential: bool,

    /// Do not report declarations that change nothing
    #[arg(long = "no-redundancy")]
    no_redundancy: bool,
}

fn main() {
    measura_tools::init_logging();

    let args = Args::parse();

    if !args.declarations.exists() {
        error!("'{}' does not exist", args.declarations.display());
        process::exit(1);
    }

    let mut options = match measura_tools::load_options(args.config.as_deref(), &args.foreign) {
        Ok(options) => options,
        Err(err) => {
            error!("{}", err);
            process::exit(1);
        }
    };
    if args.sequential {
        options.parallel = false;
    }
    if args.no_redundancy {
        options.report_redundancy = false;
    }

    info!("Loading declarations from: {}", args.declarations.display());

    let (loaded, result) = match compile_from_path(&args.declarations, &options) {
        Ok(compiled) => compiled,
        Err(err) => {
            error!("{}", err);
            process::exit(1);
        }
    };
    let diagnostics = result.format_diagnostics(&loaded.files);

    if result.has_errors() {
        error!("Errors found:\n{}", diagnostics.trim_end());
        process::exit(1);
    }

    if !result.diagnostics.is_empty() {
        warn!("Warnings found:\n{}", diagnostics.trim_end());
    }

    let groups = result
        .resolved
        .values()
        .filter(|r| matches!(r, Resolved::Group(_)))
        .count();
    info!("Successfully resolved declarations");
    info!("  - Quantities: {}", result.resolved.len() - groups);
    info!("  - Groups: {}", groups);
    info!("  - Foreign: {}", result.foreign.len());

    if let Some(path) = &args.emit {
        let json = match serde_json::to_string_pretty(&result.resolved) {
            Ok(json) => json,
            Err(err) => {
                error!("Failed to serialize descriptors: {}", err);
                process::exit(1);
            }
        };
        if let Err(err) = fs::write(path, json) {
            error!("Failed to write {}: {}", path.display(), err);
            process::exit(1);
        }
        info!("Descriptors written to {}", path.display());
    }
}
