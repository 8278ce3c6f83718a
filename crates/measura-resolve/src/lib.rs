// Allow unwrap in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]

//! Quantity-type resolution.
//!
//! Turns raw quantity and unit declarations into flattened, self-contained
//! descriptors: every inherited property looked up, every aggregated list
//! concatenated along the specialization chain, and the applicable unit
//! instances computed from the include and exclude lists of each level.

pub mod cancel;
pub mod error;
pub mod resolve;

pub use cancel::CancellationToken;
pub use error::{
    CompileError, DiagnosticPolicy, ErrorKind, Outcome, ReportAll, Severity, Silent,
    SuppressRedundancy,
};
pub use resolve::*;
