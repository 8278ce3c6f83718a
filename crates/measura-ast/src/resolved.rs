//! Fully resolved quantity descriptors.
//!
//! A resolved descriptor has no remaining references to walk: every
//! inheritable property is concrete, every inheritable list holds the items of
//! all chain levels that opted in, and the applicable unit instances are
//! listed by name. Descriptors are what the emitter consumes.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::foundation::{Span, TypeName};
use crate::model::{Capability, Constant, Derivation, Operation, Powers};

/// A quantity with every inherited property made concrete.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedQuantity {
    pub name: TypeName,
    pub span: Span,
    pub capability: Capability,
    pub unit: TypeName,
    /// Parent of a specialization
    pub original: Option<TypeName>,
    /// Owning group of a group member
    pub group: Option<TypeName>,
    pub dimension: Option<u8>,

    pub implement_sum: bool,
    pub implement_difference: bool,
    /// Quantity produced by subtracting two values; the quantity itself unless overridden
    pub difference: TypeName,
    pub default_unit_name: Option<String>,
    pub default_unit_symbol: Option<String>,
    pub generate_documentation: bool,
    /// Magnitude scalar of a vector-family quantity
    pub scalar: Option<TypeName>,
    pub powers: Powers,

    pub derivations: Vec<Derivation>,
    pub constants: Vec<Constant>,
    pub conversions: Vec<TypeName>,
    pub operations: Vec<Operation>,
    /// Applicable unit instance names, in unit declaration order
    pub unit_instances: Vec<String>,
}

impl ResolvedQuantity {
    pub fn includes_unit(&self, instance: &str) -> bool {
        self.unit_instances.iter().any(|u| u == instance)
    }
}

/// A resolved vector group together with its members by dimension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedGroup {
    pub descriptor: ResolvedQuantity,
    pub members: BTreeMap<u8, TypeName>,
}

/// Output of the resolver for one entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Resolved {
    Quantity(ResolvedQuantity),
    Group(ResolvedGroup),
}

impl Resolved {
    pub fn name(&self) -> &TypeName {
        &self.descriptor().name
    }

    /// Quantity descriptor, for groups the group's own descriptor.
    pub fn descriptor(&self) -> &ResolvedQuantity {
        match self {
            Resolved::Quantity(quantity) => quantity,
            Resolved::Group(group) => &group.descriptor,
        }
    }

    pub fn as_group(&self) -> Option<&ResolvedGroup> {
        match self {
            Resolved::Group(group) => Some(group),
            Resolved::Quantity(_) => None,
        }
    }
}
