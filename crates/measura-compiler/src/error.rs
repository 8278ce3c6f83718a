//! Loading errors.
//!
//! Diagnostics about declarations are values in
//! [`CompileResult`](crate::CompileResult). The errors here are about getting
//! the declarations, configuration and metadata off disk in the first place.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to traverse {path}: {source}")]
    Walk {
        path: PathBuf,
        source: walkdir::Error,
    },
    #[error("invalid declarations in {path}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("invalid configuration in {path}: {source}")]
    Config {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("no declaration files found in {0}")]
    NoDeclarations(PathBuf),
    #[error("more than {max} declaration files in {path}")]
    TooManyFiles { path: PathBuf, max: usize },
    #[error("invalid metadata in {path}: {source}")]
    MetadataDecode {
        path: PathBuf,
        source: rmp_serde::decode::Error,
    },
    #[error("metadata in {path} has format version {found}, expected {expected}")]
    MetadataVersion {
        path: PathBuf,
        found: u32,
        expected: u32,
    },
    #[error("failed to encode metadata: {0}")]
    MetadataEncode(#[from] rmp_serde::encode::Error),
}

impl LoadError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, LoadError>;
