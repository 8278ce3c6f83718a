//! Integration test harness for Measura.
//!
//! This crate provides utilities for end-to-end testing of the full
//! pipeline: Load → Process → Build → Validate → Resolve → Verify.

use measura_ast::{Declaration, Resolved, ResolvedGroup, ResolvedQuantity, TypeName};
use measura_compiler::{compile, CompileOptions, CompileResult};
use measura_resolve::{CompileError, ErrorKind, Severity};

/// Declarations of one compilation plus the foreign ones it can see.
#[derive(Debug, Clone, Default)]
pub struct DeclarationSet {
    local: Vec<Declaration>,
    foreign: Vec<Declaration>,
}

impl DeclarationSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a set from a JSON array of declarations.
    ///
    /// # Panics
    ///
    /// Panics if the JSON does not describe declarations.
    pub fn from_json(json: &str) -> Self {
        Self::new().with_json(json)
    }

    /// Append local declarations from a JSON array.
    pub fn with_json(mut self, json: &str) -> Self {
        self.local.extend(parse(json));
        self
    }

    /// Append foreign declarations from a JSON array.
    pub fn with_foreign_json(mut self, json: &str) -> Self {
        self.foreign.extend(parse(json));
        self
    }

    /// Use another set's local declarations as foreign ones, as if they
    /// had been exported by an earlier compilation.
    pub fn with_foreign(mut self, upstream: &DeclarationSet) -> Self {
        self.foreign.extend(upstream.local.iter().cloned());
        self
    }

    pub fn declarations(&self) -> &[Declaration] {
        &self.local
    }

    /// Compile with default options.
    pub fn compile(&self) -> Compiled {
        self.compile_with(&CompileOptions::default())
    }

    pub fn compile_with(&self, options: &CompileOptions) -> Compiled {
        Compiled {
            result: compile(&self.local, &self.foreign, options),
        }
    }
}

fn parse(json: &str) -> Vec<Declaration> {
    match serde_json::from_str(json) {
        Ok(declarations) => declarations,
        Err(err) => panic!("invalid declaration JSON: {}", err),
    }
}

/// A finished compilation with lookup helpers that panic on absence.
#[derive(Debug, Clone)]
pub struct Compiled {
    pub result: CompileResult,
}

fn name(s: &str) -> TypeName {
    match TypeName::parse(s) {
        Ok(name) => name,
        Err(err) => panic!("invalid type name '{}': {}", s, err),
    }
}

impl Compiled {
    pub fn resolved(&self, n: &str) -> Option<&Resolved> {
        self.result.get(&name(n))
    }

    pub fn is_resolved(&self, n: &str) -> bool {
        self.resolved(n).is_some()
    }

    /// Descriptor of a resolved quantity or group.
    pub fn quantity(&self, n: &str) -> &ResolvedQuantity {
        match self.resolved(n) {
            Some(resolved) => resolved.descriptor(),
            None => panic!("'{}' was not resolved; diagnostics: {:#?}", n, self.result.diagnostics),
        }
    }

    pub fn group(&self, n: &str) -> &ResolvedGroup {
        match self.resolved(n).and_then(Resolved::as_group) {
            Some(group) => group,
            None => panic!("'{}' is not a resolved group", n),
        }
    }

    /// Applicable unit instance names.
    pub fn units(&self, n: &str) -> Vec<&str> {
        self.quantity(n)
            .unit_instances
            .iter()
            .map(String::as_str)
            .collect()
    }

    pub fn diagnostics(&self) -> &[CompileError] {
        &self.result.diagnostics
    }

    pub fn kinds(&self) -> Vec<ErrorKind> {
        self.result.diagnostics.iter().map(|d| d.kind).collect()
    }

    /// Diagnostics about one entity.
    pub fn diagnostics_for(&self, n: &str) -> Vec<&CompileError> {
        let entity = name(n);
        self.result
            .diagnostics
            .iter()
            .filter(|d| d.entity.as_ref() == Some(&entity))
            .collect()
    }

    pub fn errors(&self) -> Vec<&CompileError> {
        self.result
            .diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Error)
            .collect()
    }

    /// # Panics
    ///
    /// Panics if the compilation reported anything.
    pub fn assert_clean(&self) {
        assert!(
            self.result.diagnostics.is_empty(),
            "unexpected diagnostics: {:#?}",
            self.result.diagnostics
        );
    }
}
