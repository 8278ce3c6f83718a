// Allow unwrap in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]

//! Entity model for measura.
//!
//! This crate defines the data that flows through the resolution pipeline:
//!
//! - [`declaration`]: raw records as extracted from source
//! - [`model`]: processed, immutable unit and quantity definitions
//! - [`resolved`]: fully flattened descriptors handed to the emitter
//! - [`foundation`]: spans and qualified type names

pub mod declaration;
pub mod foundation;
pub mod model;
pub mod resolved;

pub use declaration::Declaration;
pub use foundation::{Span, TypeName};
pub use model::{Capability, Category, Definition, QuantityType, Role, UnitType};
pub use resolved::{Resolved, ResolvedGroup, ResolvedQuantity};
