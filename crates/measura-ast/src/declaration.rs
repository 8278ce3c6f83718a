//! Raw declaration records.
//!
//! These are the records handed to the engine by the declaration extractor.
//! Every field is optional or defaulted: the extractor reports what it saw and
//! the local processor decides whether the record forms a usable definition.
//! References to other types are plain strings until processing parses them
//! into [`TypeName`](crate::foundation::TypeName)s.
//!
//! Declarations are serde-deserialisable so they can be read from JSON files
//! or decoded from persisted foreign metadata.

use serde::{Deserialize, Serialize};

use crate::foundation::Span;
use crate::model::{Capability, Operator};

/// A single raw declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Declaration {
    /// A unit type and its instances
    Unit(RawUnit),
    /// A scalar, vector, group or group member quantity
    Quantity(RawQuantity),
}

impl Declaration {
    /// Declared name, if any, for logging and diagnostics.
    pub fn name(&self) -> Option<&str> {
        match self {
            Declaration::Unit(unit) => unit.name.as_deref(),
            Declaration::Quantity(quantity) => quantity.name.as_deref(),
        }
    }

    /// Source location of the declaration.
    pub fn span(&self) -> Span {
        match self {
            Declaration::Unit(unit) => unit.span,
            Declaration::Quantity(quantity) => quantity.span,
        }
    }

    pub fn span_mut(&mut self) -> &mut Span {
        match self {
            Declaration::Unit(unit) => &mut unit.span,
            Declaration::Quantity(quantity) => &mut quantity.span,
        }
    }
}

/// Raw unit type declaration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawUnit {
    pub name: Option<String>,
    /// Quantity the unit measures
    pub quantity: Option<String>,
    pub instances: Vec<RawUnitInstance>,
    pub span: Span,
}

/// Raw unit instance, e.g. `Kilometre` of `Length`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawUnitInstance {
    pub name: Option<String>,
    pub plural: Option<String>,
    pub symbol: Option<String>,
    /// Multiplier relative to the SI reference instance; defaults to 1
    pub scale: Option<f64>,
    pub bias: Option<f64>,
    pub si_reference: bool,
}

/// Raw quantity declaration.
///
/// The role of the quantity is inferred during processing:
/// `group` + `dimension` make a group member, `original` a specialization
/// and `unit` a base.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawQuantity {
    pub name: Option<String>,
    pub capability: Capability,
    pub span: Span,

    /// Unit of a base quantity
    pub unit: Option<String>,
    /// Parent of a specialization
    pub original: Option<String>,
    /// Owning group of a group member
    pub group: Option<String>,
    /// Dimension of a standalone vector or a group member
    pub dimension: Option<u8>,

    /// Specialization inherit flags, or a member's inherit-from-group flags
    pub inherit: RawInheritFlags,
    /// A member's inherit-from-members flags
    pub inherit_from_members: RawInheritFlags,

    pub implement_sum: Option<bool>,
    pub implement_difference: Option<bool>,
    pub difference: Option<String>,
    pub default_unit_name: Option<String>,
    pub default_unit_symbol: Option<String>,
    pub generate_documentation: Option<bool>,
    /// Magnitude scalar of a vector quantity
    pub scalar: Option<String>,
    pub reciprocal: Option<String>,
    pub square: Option<String>,
    pub cube: Option<String>,
    pub square_root: Option<String>,
    pub cube_root: Option<String>,

    pub derivations: Vec<RawDerivation>,
    pub constants: Vec<RawConstant>,
    pub conversions: Vec<String>,
    pub operations: Vec<RawOperation>,
    pub include_units: Vec<String>,
    pub exclude_units: Vec<String>,
}

impl Default for RawQuantity {
    fn default() -> Self {
        Self {
            name: None,
            capability: Capability::Scalar,
            span: Span::default(),
            unit: None,
            original: None,
            group: None,
            dimension: None,
            inherit: RawInheritFlags::default(),
            inherit_from_members: RawInheritFlags::default(),
            implement_sum: None,
            implement_difference: None,
            difference: None,
            default_unit_name: None,
            default_unit_symbol: None,
            generate_documentation: None,
            scalar: None,
            reciprocal: None,
            square: None,
            cube: None,
            square_root: None,
            cube_root: None,
            derivations: Vec::new(),
            constants: Vec::new(),
            conversions: Vec::new(),
            operations: Vec::new(),
            include_units: Vec::new(),
            exclude_units: Vec::new(),
        }
    }
}

/// Tri-state inherit flags; an absent flag means "inherit".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawInheritFlags {
    pub units: Option<bool>,
    pub derivations: Option<bool>,
    pub constants: Option<bool>,
    pub conversions: Option<bool>,
    pub operations: Option<bool>,
}

impl RawInheritFlags {
    /// True when no flag was written at all.
    pub fn is_unset(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawDerivation {
    /// Formula with `{parameter}` placeholders, e.g. `{distance} / {time}`
    pub expression: Option<String>,
    pub parameters: Vec<RawParameter>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawParameter {
    pub name: Option<String>,
    pub quantity: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawConstant {
    pub name: Option<String>,
    pub value: Option<f64>,
    pub unit: Option<String>,
    /// Name of the generated "multiples of" accessor
    pub multiples: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawOperation {
    pub operator: Operator,
    pub other: Option<String>,
    pub result: Option<String>,
    #[serde(default)]
    pub mirror: bool,
}
