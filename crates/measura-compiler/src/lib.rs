// Allow unwrap in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]

//! Measura Compiler
//!
//! Unified entry point for resolving quantity declarations. Loads raw
//! declarations from JSON, foreign declarations from exported metadata, and
//! runs them through the resolution pipeline in one call.

pub mod config;
pub mod error;
pub mod metadata;

use std::fmt::Write;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use measura_ast::{Declaration, Resolved, TypeName};
use measura_resolve::{resolve_declarations, CancellationToken, CompileError, Severity};
use tracing::{debug, info};
use walkdir::WalkDir;

pub use config::CompileOptions;
pub use error::LoadError;
pub use metadata::{
    decode_metadata, encode_metadata, read_metadata, write_metadata, ForeignMetadata,
};

/// Span file ids are 16 bits wide.
const MAX_FILES: usize = u16::MAX as usize;

/// Declarations read from disk, with the files their spans refer to.
#[derive(Debug, Clone, Default)]
pub struct LoadedDeclarations {
    /// Indexed by span `file_id`
    pub files: Vec<PathBuf>,
    pub declarations: Vec<Declaration>,
}

/// Outcome of a compilation.
#[derive(Debug, Clone)]
pub struct CompileResult {
    pub resolved: IndexMap<TypeName, Resolved>,
    pub foreign: IndexMap<TypeName, Resolved>,
    pub diagnostics: Vec<CompileError>,
    pub cancelled: bool,
}

impl CompileResult {
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(CompileError::is_error)
    }

    /// No errors and not cancelled; warnings are allowed.
    pub fn success(&self) -> bool {
        !self.has_errors() && !self.cancelled
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == severity)
            .count()
    }

    pub fn get(&self, name: &TypeName) -> Option<&Resolved> {
        self.resolved.get(name).or_else(|| self.foreign.get(name))
    }

    /// Format diagnostics one per line, naming the file each span refers to.
    pub fn format_diagnostics(&self, files: &[PathBuf]) -> String {
        let mut out = String::new();
        for diagnostic in &self.diagnostics {
            let file = files
                .get(usize::from(diagnostic.span.file_id))
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "<unknown>".to_string());
            let _ = write!(
                out,
                "{}:{}: {}[{}]",
                file,
                diagnostic.span.start_line,
                diagnostic.severity,
                diagnostic.kind.name()
            );
            if let Some(entity) = &diagnostic.entity {
                let _ = write!(out, " {}", entity);
            }
            let _ = writeln!(out, ": {}", diagnostic.message);
            for label in &diagnostic.labels {
                let _ = writeln!(out, "    {}: {}", label.span, label.message);
            }
            for note in &diagnostic.notes {
                let _ = writeln!(out, "    = note: {}", note);
            }
        }
        out
    }
}

/// Primary entry point: resolve local declarations against foreign ones.
pub fn compile(
    declarations: &[Declaration],
    foreign: &[Declaration],
    options: &CompileOptions,
) -> CompileResult {
    compile_with_cancellation(declarations, foreign, options, CancellationToken::new())
}

/// Like [`compile`], stopping early once `cancellation` is cancelled.
pub fn compile_with_cancellation(
    declarations: &[Declaration],
    foreign: &[Declaration],
    options: &CompileOptions,
    cancellation: CancellationToken,
) -> CompileResult {
    let mut resolve_options = options.resolve_options();
    resolve_options.cancellation = cancellation;

    let output = resolve_declarations(declarations, foreign, options.policy(), &resolve_options);
    CompileResult {
        resolved: output.resolved,
        foreign: output.foreign,
        diagnostics: output.diagnostics,
        cancelled: output.cancelled,
    }
}

/// Load declarations from a JSON file or a directory of JSON files.
///
/// Directory traversal is recursive and sorted by path, so file ids are
/// stable between runs.
pub fn load_declarations(path: &Path) -> error::Result<LoadedDeclarations> {
    let files = if path.is_dir() {
        collect_json_files(path)?
    } else {
        vec![path.to_path_buf()]
    };
    if files.len() > MAX_FILES {
        return Err(LoadError::TooManyFiles {
            path: path.to_path_buf(),
            max: MAX_FILES,
        });
    }

    let mut loaded = LoadedDeclarations::default();
    for (file_id, file) in files.iter().enumerate() {
        let mut declarations = read_declaration_file(file)?;
        for declaration in &mut declarations {
            declaration.span_mut().file_id = file_id as u16;
        }
        debug!(file = %file.display(), count = declarations.len(), "declarations loaded");
        loaded.declarations.extend(declarations);
    }
    loaded.files = files;
    Ok(loaded)
}

fn collect_json_files(dir: &Path) -> error::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir) {
        let entry = entry.map_err(|source| LoadError::Walk {
            path: dir.to_path_buf(),
            source,
        })?;
        if entry.file_type().is_file() && entry.path().extension().is_some_and(|e| e == "json") {
            files.push(entry.into_path());
        }
    }
    if files.is_empty() {
        return Err(LoadError::NoDeclarations(dir.to_path_buf()));
    }
    // Ensure deterministic order
    files.sort();
    Ok(files)
}

fn read_declaration_file(path: &Path) -> error::Result<Vec<Declaration>> {
    let source = std::fs::read_to_string(path).map_err(|e| LoadError::io(path, e))?;
    serde_json::from_str(&source).map_err(|source| LoadError::Json {
        path: path.to_path_buf(),
        source,
    })
}

/// Read every metadata file named by the options, in order.
pub fn load_foreign(options: &CompileOptions) -> error::Result<Vec<Declaration>> {
    let mut declarations = Vec::new();
    for path in &options.foreign_metadata {
        let loaded = read_metadata(path)?;
        debug!(file = %path.display(), count = loaded.len(), "foreign metadata loaded");
        declarations.extend(loaded);
    }
    Ok(declarations)
}

/// Helper to load and compile declarations from a path.
pub fn compile_from_path(
    path: &Path,
    options: &CompileOptions,
) -> error::Result<(LoadedDeclarations, CompileResult)> {
    let loaded = load_declarations(path)?;
    let foreign = load_foreign(options)?;
    info!(
        files = loaded.files.len(),
        declarations = loaded.declarations.len(),
        foreign = foreign.len(),
        "compiling"
    );
    let result = compile(&loaded.declarations, &foreign, options);
    Ok((loaded, result))
}
