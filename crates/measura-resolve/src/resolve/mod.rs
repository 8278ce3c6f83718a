//! Resolution stages, leaf-first.
//!
//! - [`process`]: per-declaration checks producing definitions
//! - [`population`]: the identity index and group member maps
//! - [`validation`]: cross-type checks against a population
//! - [`chain`], [`inheritance`], [`units`]: the inheritance walks
//! - [`foreign`]: merging definitions from other compilations
//! - [`pipeline`]: all of the above over a declaration set

pub mod chain;
pub mod foreign;
pub mod inheritance;
pub mod pipeline;
pub mod population;
pub mod process;
pub mod units;
pub mod validation;

#[cfg(test)]
pub(crate) mod test_support;

pub use inheritance::resolve;
pub use pipeline::{resolve_declarations, resolve_entity, ResolveOptions, ResolveOutput};
pub use population::{Duplicate, Population, PopulationBuilder};
pub use process::process;
pub use validation::{check_entity, validate, validate_against};
