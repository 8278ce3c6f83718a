//! Diagnostics for quantity resolution.
//!
//! Every check in the pipeline reports through [`CompileError`] values rather
//! than failing. A run always finishes with whatever entities survived plus
//! the list of diagnostics explaining what was dropped.
//!
//! # Design
//!
//! - `CompileError`: single diagnostic with the entity it concerns
//! - `ErrorKind`: what was wrong, grouped by [`Class`]
//! - `Severity`: error, warning or note
//! - `DiagnosticPolicy`: injectable strategy deciding which diagnostics are kept
//! - `Diagnostics`: a collector bound to one policy
//! - `Outcome`: the `(optional value, diagnostics)` pair every stage returns
//!
//! # Examples
//!
//! ```
//! # use measura_resolve::error::*;
//! # use measura_ast::{Span, TypeName};
//! let name = TypeName::parse("Height").unwrap();
//! let error = CompileError::new(
//!     ErrorKind::SelfConversion,
//!     Span::zero(0),
//!     format!("'{}' lists a conversion to itself", name),
//! )
//! .for_entity(name);
//! assert_eq!(error.kind.class(), Class::Item);
//! ```

use std::fmt;

use measura_ast::{Span, TypeName};
use serde::Serialize;

/// A single diagnostic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompileError {
    pub kind: ErrorKind,
    pub severity: Severity,
    /// Entity the diagnostic concerns, once its name is known
    pub entity: Option<TypeName>,
    /// Primary source location
    pub span: Span,
    pub message: String,
    /// Related locations, e.g. the first definition of a duplicate
    pub labels: Vec<Label>,
    pub notes: Vec<String>,
}

/// Consequence class of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Class {
    /// The whole entity is excluded from the population
    Structural,
    /// One item of the entity is dropped; the entity survives
    Item,
    /// Nothing is removed; the declaration has no effect
    Redundancy,
}

/// What went wrong.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorKind {
    // Identity and role
    /// Name absent or empty
    MissingName,
    /// Name present but not a valid qualified name
    MalformedName,
    /// A role-defining reference (unit, original, group) is absent
    MissingReference,
    /// Declaration fits more than one role
    AmbiguousRole,
    /// Dimension outside its permitted range
    InvalidDimension,
    /// Identity or (group, dimension) slot already taken
    DuplicateName,

    // Chain structure
    /// Referenced quantity does not exist
    UndefinedQuantity,
    /// Referenced unit does not exist
    UndefinedUnit,
    /// Referenced quantity has the wrong capability
    CapabilityMismatch,
    /// Vector dimensions disagree
    DimensionMismatch,
    /// Specialization chain loops back on itself
    CyclicSpecialization,

    // Items
    /// Entry listed twice in one list
    DuplicateListing,
    /// Two derivation parameters share a name
    DuplicateParameter,
    /// Derivation expression is empty or uses an undeclared placeholder
    InvalidDerivation,
    /// Quantity converts to itself or its own group
    SelfConversion,
    /// Constant is unnamed, non-finite or clashes with another constant
    InvalidConstant,
    /// Operation references are missing or unsuitable for the operator
    InvalidOperation,
    /// Unit instance is malformed
    InvalidUnitInstance,
    /// Include/exclude/default entry names no instance of the unit
    UnrecognizedUnitName,
    /// Both unit inclusions and exclusions declared
    ContradictoryUnitLists,
    /// Default unit symbol given without a name
    IncompleteDefaultUnit,

    // Redundancy
    /// Include/exclude entry that changes nothing
    NoEffect,
    /// Override equal to the inherited value
    RedundantOverride,
    /// Difference quantity set while differences are disabled
    DifferenceDisabled,
}

impl ErrorKind {
    /// Consequence class. Reference kinds (`UndefinedQuantity` and friends)
    /// count as structural even when raised for a single dropped item.
    pub fn class(self) -> Class {
        use ErrorKind::*;
        match self {
            MissingName | MalformedName | MissingReference | AmbiguousRole | InvalidDimension
            | DuplicateName | CyclicSpecialization => Class::Structural,
            UndefinedQuantity | UndefinedUnit | CapabilityMismatch | DimensionMismatch => {
                Class::Structural
            }
            DuplicateListing | DuplicateParameter | InvalidDerivation | SelfConversion
            | InvalidConstant | InvalidOperation | InvalidUnitInstance | UnrecognizedUnitName
            | ContradictoryUnitLists | IncompleteDefaultUnit => Class::Item,
            NoEffect | RedundantOverride | DifferenceDisabled => Class::Redundancy,
        }
    }

    pub fn name(self) -> &'static str {
        use ErrorKind::*;
        match self {
            MissingName => "missing name",
            MalformedName => "malformed name",
            MissingReference => "missing reference",
            AmbiguousRole => "ambiguous role",
            InvalidDimension => "invalid dimension",
            DuplicateName => "duplicate name",
            UndefinedQuantity => "undefined quantity",
            UndefinedUnit => "undefined unit",
            CapabilityMismatch => "capability mismatch",
            DimensionMismatch => "dimension mismatch",
            CyclicSpecialization => "cyclic specialization",
            DuplicateListing => "duplicate listing",
            DuplicateParameter => "duplicate parameter",
            InvalidDerivation => "invalid derivation",
            SelfConversion => "self conversion",
            InvalidConstant => "invalid constant",
            InvalidOperation => "invalid operation",
            InvalidUnitInstance => "invalid unit instance",
            UnrecognizedUnitName => "unrecognized unit name",
            ContradictoryUnitLists => "contradictory unit lists",
            IncompleteDefaultUnit => "incomplete default unit",
            NoEffect => "no effect",
            RedundantOverride => "redundant override",
            DifferenceDisabled => "difference disabled",
        }
    }
}

/// Diagnostic severity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Severity {
    Note,
    Warning,
    Error,
}

/// Secondary labeled span in a diagnostic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Label {
    pub span: Span,
    pub message: String,
}

impl CompileError {
    /// Creates a new error diagnostic.
    pub fn new(kind: ErrorKind, span: Span, message: impl Into<String>) -> Self {
        Self {
            kind,
            severity: Severity::Error,
            entity: None,
            span,
            message: message.into(),
            labels: Vec::new(),
            notes: Vec::new(),
        }
    }

    /// Creates a new warning diagnostic.
    pub fn warning(kind: ErrorKind, span: Span, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            ..Self::new(kind, span, message)
        }
    }

    /// Attach the entity this diagnostic concerns.
    pub fn for_entity(mut self, entity: TypeName) -> Self {
        self.entity = Some(entity);
        self
    }

    pub fn with_label(mut self, span: Span, message: impl Into<String>) -> Self {
        self.labels.push(Label {
            span,
            message: message.into(),
        });
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Note => write!(f, "note"),
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}] {}", self.severity, self.kind.name(), self.span)?;
        if let Some(entity) = &self.entity {
            write!(f, " {}", entity)?;
        }
        write!(f, ": {}", self.message)
    }
}

/// Strategy deciding which diagnostics a pipeline run keeps.
///
/// Local declarations use [`ReportAll`]; declarations from other
/// compilations use [`Silent`], since their problems are not the current
/// compilation's to report.
pub trait DiagnosticPolicy: Send + Sync {
    fn admits(&self, diagnostic: &CompileError) -> bool;
}

/// Keeps every diagnostic.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReportAll;

impl DiagnosticPolicy for ReportAll {
    fn admits(&self, _diagnostic: &CompileError) -> bool {
        true
    }
}

/// Drops every diagnostic.
#[derive(Debug, Clone, Copy, Default)]
pub struct Silent;

impl DiagnosticPolicy for Silent {
    fn admits(&self, _diagnostic: &CompileError) -> bool {
        false
    }
}

/// Keeps everything except [`Class::Redundancy`] warnings.
#[derive(Debug, Clone, Copy, Default)]
pub struct SuppressRedundancy;

impl DiagnosticPolicy for SuppressRedundancy {
    fn admits(&self, diagnostic: &CompileError) -> bool {
        diagnostic.kind.class() != Class::Redundancy
    }
}

/// Diagnostic collector bound to a policy.
pub struct Diagnostics<'p> {
    policy: &'p dyn DiagnosticPolicy,
    entries: Vec<CompileError>,
}

impl<'p> Diagnostics<'p> {
    pub fn new(policy: &'p dyn DiagnosticPolicy) -> Self {
        Self {
            policy,
            entries: Vec::new(),
        }
    }

    pub fn push(&mut self, diagnostic: CompileError) {
        if self.policy.admits(&diagnostic) {
            self.entries.push(diagnostic);
        }
    }

    pub fn finish<T>(self, value: Option<T>) -> Outcome<T> {
        Outcome {
            value,
            diagnostics: self.entries,
        }
    }

    pub fn into_vec(self) -> Vec<CompileError> {
        self.entries
    }
}

/// Result of one stage for one entity.
///
/// `value` is `None` when the entity was excluded; the reasons are in
/// `diagnostics`. Callers concatenate diagnostics and carry on with sibling
/// entities regardless.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome<T> {
    pub value: Option<T>,
    pub diagnostics: Vec<CompileError>,
}

impl<T> Outcome<T> {
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        Outcome {
            value: self.value.map(f),
            diagnostics: self.diagnostics,
        }
    }

    /// Split into the value and the diagnostics, appending the latter to `sink`.
    pub fn drain_into(self, sink: &mut Vec<CompileError>) -> Option<T> {
        let Outcome {
            value,
            mut diagnostics,
        } = self;
        sink.append(&mut diagnostics);
        value
    }
}
