//! Foreign metadata persistence.
//!
//! A compilation can export its declarations so that a downstream
//! compilation can treat them as foreign. Metadata is MessagePack with named
//! fields, wrapped in a small versioned envelope.

use std::path::Path;

use measura_ast::Declaration;
use serde::{Deserialize, Serialize};

use crate::error::{LoadError, Result};

/// Current envelope version.
pub const METADATA_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForeignMetadata {
    pub version: u32,
    pub declarations: Vec<Declaration>,
}

impl ForeignMetadata {
    pub fn new(declarations: Vec<Declaration>) -> Self {
        Self {
            version: METADATA_VERSION,
            declarations,
        }
    }
}

/// Serializes declarations to a MessagePack byte vector.
pub fn encode_metadata(
    declarations: &[Declaration],
) -> std::result::Result<Vec<u8>, rmp_serde::encode::Error> {
    rmp_serde::to_vec_named(&ForeignMetadata::new(declarations.to_vec()))
}

/// Deserializes metadata from a MessagePack byte slice.
pub fn decode_metadata(
    data: &[u8],
) -> std::result::Result<ForeignMetadata, rmp_serde::decode::Error> {
    rmp_serde::from_slice(data)
}

pub fn write_metadata(path: &Path, declarations: &[Declaration]) -> Result<()> {
    let bytes = encode_metadata(declarations)?;
    std::fs::write(path, bytes).map_err(|e| LoadError::io(path, e))
}

/// Read the declarations of a metadata file.
pub fn read_metadata(path: &Path) -> Result<Vec<Declaration>> {
    let bytes = std::fs::read(path).map_err(|e| LoadError::io(path, e))?;
    let metadata = decode_metadata(&bytes).map_err(|source| LoadError::MetadataDecode {
        path: path.to_path_buf(),
        source,
    })?;
    if metadata.version != METADATA_VERSION {
        return Err(LoadError::MetadataVersion {
            path: path.to_path_buf(),
            found: metadata.version,
            expected: METADATA_VERSION,
        });
    }
    Ok(metadata.declarations)
}
