//! Foundation types shared by every stage: source spans and type names.

pub mod name;
pub mod span;

pub use name::{NameError, TypeName};
pub use span::Span;
