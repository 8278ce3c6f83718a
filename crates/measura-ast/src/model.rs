//! Processed entity model.
//!
//! Definitions produced by the local processor. Every reference has been
//! parsed into a [`TypeName`], every inherit flag made concrete and every
//! local list filtered of self-inconsistent entries. Entities are immutable
//! once built: later stages produce new values rather than editing these.
//!
//! # Shape
//!
//! A single [`QuantityType`] struct covers every capability. The capability
//! says *what* the quantity is (scalar, vector, group, group member) and the
//! [`Role`] says *where* it sits in an inheritance chain:
//!
//! ```text
//! Base { unit }                    chain root, owns the unit
//! Specialization { original, .. }  inherits from `original`
//! Member { group, dimension, .. }  the N-dimensional vector of a group
//! ```

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::foundation::{Span, TypeName};

/// What kind of quantity a declaration describes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    #[default]
    Scalar,
    /// A standalone vector quantity of fixed dimension
    Vector,
    /// A family of vectors differing only in dimension
    VectorGroup,
    /// The dimension-specific vector belonging to a group
    GroupMember,
}

impl Capability {
    /// True for vectors, groups and group members.
    pub fn is_vector_family(self) -> bool {
        !matches!(self, Capability::Scalar)
    }

    /// Whether a specialization of `self` may name `original` as its parent.
    pub fn can_specialize(self, original: Capability) -> bool {
        self == original && self != Capability::GroupMember
    }

    /// Whether a value of `self` may be converted to a value of `target`.
    pub fn can_convert_to(self, target: Capability) -> bool {
        match self {
            Capability::Scalar => target == Capability::Scalar,
            Capability::Vector | Capability::GroupMember => {
                matches!(target, Capability::Vector | Capability::GroupMember)
            }
            Capability::VectorGroup => target == Capability::VectorGroup,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Capability::Scalar => "scalar",
            Capability::Vector => "vector",
            Capability::VectorGroup => "vector group",
            Capability::GroupMember => "group member",
        }
    }
}

/// Inheritable item categories, each gated by its own inherit flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Units,
    Derivations,
    Constants,
    Conversions,
    Operations,
}

/// Concrete inherit flags; `true` continues the walk past this level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InheritFlags {
    pub units: bool,
    pub derivations: bool,
    pub constants: bool,
    pub conversions: bool,
    pub operations: bool,
}

impl Default for InheritFlags {
    fn default() -> Self {
        Self::all(true)
    }
}

impl InheritFlags {
    pub fn all(value: bool) -> Self {
        Self {
            units: value,
            derivations: value,
            constants: value,
            conversions: value,
            operations: value,
        }
    }

    pub fn get(&self, category: Category) -> bool {
        match category {
            Category::Units => self.units,
            Category::Derivations => self.derivations,
            Category::Constants => self.constants,
            Category::Conversions => self.conversions,
            Category::Operations => self.operations,
        }
    }
}

/// Position of a quantity in its inheritance chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Role {
    Base {
        unit: TypeName,
    },
    Specialization {
        original: TypeName,
        inherit: InheritFlags,
    },
    Member {
        group: TypeName,
        dimension: u8,
        from_group: InheritFlags,
        from_members: InheritFlags,
    },
}

/// Scalar-valued properties a level may set or leave to its ancestors.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Overrides {
    pub implement_sum: Option<bool>,
    pub implement_difference: Option<bool>,
    pub difference: Option<TypeName>,
    pub default_unit_name: Option<String>,
    pub default_unit_symbol: Option<String>,
    pub generate_documentation: Option<bool>,
    /// Magnitude scalar of a vector-family quantity
    pub scalar: Option<TypeName>,
    pub powers: Powers,
}

/// Related scalar quantities produced by raising a scalar to a power.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Powers {
    pub reciprocal: Option<TypeName>,
    pub square: Option<TypeName>,
    pub cube: Option<TypeName>,
    pub square_root: Option<TypeName>,
    pub cube_root: Option<TypeName>,
}

impl Powers {
    /// Named slots, for validation and redundancy checks.
    pub fn slots(&self) -> [(&'static str, Option<&TypeName>); 5] {
        [
            ("reciprocal", self.reciprocal.as_ref()),
            ("square", self.square.as_ref()),
            ("cube", self.cube.as_ref()),
            ("square root", self.square_root.as_ref()),
            ("cube root", self.cube_root.as_ref()),
        ]
    }

    pub fn is_empty(&self) -> bool {
        self.slots().iter().all(|(_, target)| target.is_none())
    }
}

/// A named formula over other quantities.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Derivation {
    pub expression: String,
    pub parameters: Vec<Parameter>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub quantity: TypeName,
}

/// A named magnitude expressed in one unit instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Constant {
    pub name: String,
    pub value: f64,
    pub unit_instance: String,
    pub multiples: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    Add,
    Subtract,
    Multiply,
    Divide,
    Dot,
    Cross,
}

impl Operator {
    pub fn symbol(self) -> &'static str {
        match self {
            Operator::Add => "+",
            Operator::Subtract => "-",
            Operator::Multiply => "*",
            Operator::Divide => "/",
            Operator::Dot => "dot",
            Operator::Cross => "cross",
        }
    }
}

/// An operator overload binding `self <op> other = result`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operation {
    pub operator: Operator,
    pub other: TypeName,
    pub result: TypeName,
    /// Also implement `other <op> self = result`
    pub mirror: bool,
}

/// A processed quantity declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuantityType {
    pub name: TypeName,
    pub span: Span,
    pub capability: Capability,
    pub role: Role,
    /// Dimension of a standalone vector; members carry theirs in [`Role::Member`]
    pub dimension: Option<u8>,
    pub overrides: Overrides,
    pub derivations: Vec<Derivation>,
    pub constants: Vec<Constant>,
    pub conversions: Vec<TypeName>,
    pub operations: Vec<Operation>,
    pub unit_inclusions: Vec<String>,
    pub unit_exclusions: Vec<String>,
}

impl QuantityType {
    /// Parent of a specialization.
    pub fn original(&self) -> Option<&TypeName> {
        match &self.role {
            Role::Specialization { original, .. } => Some(original),
            _ => None,
        }
    }

    /// Unit of a base quantity.
    pub fn unit(&self) -> Option<&TypeName> {
        match &self.role {
            Role::Base { unit } => Some(unit),
            _ => None,
        }
    }

    pub fn is_base(&self) -> bool {
        matches!(self.role, Role::Base { .. })
    }

    pub fn is_group(&self) -> bool {
        self.capability == Capability::VectorGroup
    }

    /// Owning group and dimension of a member.
    pub fn membership(&self) -> Option<(&TypeName, u8)> {
        match &self.role {
            Role::Member {
                group, dimension, ..
            } => Some((group, *dimension)),
            _ => None,
        }
    }

    /// Own dimension: the member dimension or the declared vector dimension.
    pub fn own_dimension(&self) -> Option<u8> {
        self.membership().map(|(_, d)| d).or(self.dimension)
    }

    /// Specialization inherit flags; bases and members report all-true.
    pub fn inherit_flags(&self) -> InheritFlags {
        match &self.role {
            Role::Specialization { inherit, .. } => *inherit,
            _ => InheritFlags::default(),
        }
    }
}

/// A processed unit type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitType {
    pub name: TypeName,
    pub quantity: TypeName,
    pub span: Span,
    /// Instances keyed by name, in declaration order
    pub instances: IndexMap<String, UnitInstance>,
}

impl UnitType {
    pub fn has_instance(&self, name: &str) -> bool {
        self.instances.contains_key(name)
    }

    /// Instance names in declaration order.
    pub fn instance_names(&self) -> impl Iterator<Item = &str> {
        self.instances.keys().map(String::as_str)
    }

    pub fn si_reference(&self) -> Option<&UnitInstance> {
        self.instances.values().find(|i| i.si_reference)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitInstance {
    pub name: String,
    pub plural: String,
    pub symbol: Option<String>,
    pub scale: f64,
    pub bias: Option<f64>,
    pub si_reference: bool,
}

/// Output of the local processor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Definition {
    Unit(UnitType),
    Quantity(QuantityType),
}

impl Definition {
    pub fn name(&self) -> &TypeName {
        match self {
            Definition::Unit(unit) => &unit.name,
            Definition::Quantity(quantity) => &quantity.name,
        }
    }

    pub fn span(&self) -> Span {
        match self {
            Definition::Unit(unit) => unit.span,
            Definition::Quantity(quantity) => quantity.span,
        }
    }
}
