//! Compile options and their TOML form.
//!
//! ```toml
//! parallel = true
//! report_redundancy = false
//! foreign_metadata = ["../shared/physics.mqm"]
//! ```
//!
//! Relative metadata paths are taken relative to the file they appear in.

use std::path::{Path, PathBuf};

use measura_resolve::{DiagnosticPolicy, ReportAll, ResolveOptions, SuppressRedundancy};
use serde::Deserialize;

use crate::error::{LoadError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CompileOptions {
    /// Run per-entity stages on the rayon pool
    pub parallel: bool,
    /// Keep warnings about declarations that change nothing
    pub report_redundancy: bool,
    /// Metadata files exported by other compilations
    pub foreign_metadata: Vec<PathBuf>,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            parallel: true,
            report_redundancy: true,
            foreign_metadata: Vec::new(),
        }
    }
}

impl CompileOptions {
    pub fn from_toml_str(source: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(source)
    }

    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let source = std::fs::read_to_string(path).map_err(|e| LoadError::io(path, e))?;
        let mut options = Self::from_toml_str(&source).map_err(|source| LoadError::Config {
            path: path.to_path_buf(),
            source,
        })?;

        if let Some(dir) = path.parent() {
            for metadata in &mut options.foreign_metadata {
                if metadata.is_relative() {
                    *metadata = dir.join(&*metadata);
                }
            }
        }
        Ok(options)
    }

    /// Diagnostic policy for local declarations.
    pub fn policy(&self) -> &'static dyn DiagnosticPolicy {
        if self.report_redundancy {
            &ReportAll
        } else {
            &SuppressRedundancy
        }
    }

    pub fn resolve_options(&self) -> ResolveOptions {
        ResolveOptions {
            parallel: self.parallel,
            ..ResolveOptions::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use measura_ast::Span;
    use measura_resolve::{CompileError, ErrorKind};

    #[test]
    fn test_defaults_from_empty_file() {
        let options = CompileOptions::from_toml_str("").unwrap();
        assert_eq!(options, CompileOptions::default());
        assert!(options.parallel);
        assert!(options.report_redundancy);
    }

    #[test]
    fn test_partial_file() {
        let options = CompileOptions::from_toml_str("report_redundancy = false").unwrap();
        assert!(options.parallel);
        assert!(!options.report_redundancy);
    }

    #[test]
    fn test_unknown_key_rejected() {
        assert!(CompileOptions::from_toml_str("paralel = false").is_err());
    }

    #[test]
    fn test_relative_metadata_paths_follow_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("measura.toml");
        std::fs::write(
            &path,
            "foreign_metadata = [\"shared/physics.mqm\", \"/abs/other.mqm\"]\n",
        )
        .unwrap();

        let options = CompileOptions::from_toml_file(&path).unwrap();
        assert_eq!(
            options.foreign_metadata,
            vec![
                dir.path().join("shared/physics.mqm"),
                PathBuf::from("/abs/other.mqm")
            ]
        );
    }

    #[test]
    fn test_missing_file() {
        let err =
            CompileOptions::from_toml_file(Path::new("/nonexistent/measura.toml")).unwrap_err();
        assert!(matches!(err, LoadError::Io { .. }));
    }

    #[test]
    fn test_policy_follows_redundancy_flag() {
        let warning = CompileError::warning(ErrorKind::NoEffect, Span::zero(0), "no effect");
        let options = CompileOptions {
            report_redundancy: false,
            ..CompileOptions::default()
        };
        assert!(!options.policy().admits(&warning));
        assert!(CompileOptions::default().policy().admits(&warning));
    }
}
