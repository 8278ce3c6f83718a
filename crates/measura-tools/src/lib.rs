//! Measura Tools
//!
//! CLI tools for checking and exporting quantity declarations.

use std::path::{Path, PathBuf};

use measura_compiler::{CompileOptions, LoadError};
use tracing_subscriber::{fmt, EnvFilter};

/// Initialize logging with a default filter.
///
/// Use `RUST_LOG` environment variable to override the default filter.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,measura_resolve=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// Options from an optional config file with command-line metadata appended.
pub fn load_options(
    config: Option<&Path>,
    foreign: &[PathBuf],
) -> Result<CompileOptions, LoadError> {
    let mut options = match config {
        Some(path) => CompileOptions::from_toml_file(path)?,
        None => CompileOptions::default(),
    };
    options.foreign_metadata.extend(foreign.iter().cloned());
    Ok(options)
}

/// Default metadata path next to the declarations: `<stem>.mqm`.
pub fn default_metadata_path(declarations: &Path) -> PathBuf {
    let stem = declarations
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "declarations".to_string());
    let dir = if declarations.is_dir() {
        declarations.to_path_buf()
    } else {
        declarations.parent().map(Path::to_path_buf).unwrap_or_default()
    };
    dir.join(format!("{}.mqm", stem))
}
