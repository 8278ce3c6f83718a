//! Builders for processed definitions used by the unit tests of this crate.

#![allow(dead_code)]

use indexmap::IndexMap;
use measura_ast::model::{
    Category, Constant, Derivation, InheritFlags, Operation, Operator, Overrides, Parameter,
    UnitInstance,
};
use measura_ast::{
    Capability, Definition, QuantityType, ResolvedQuantity, Role, Span, TypeName, UnitType,
};

use super::inheritance::resolve;
use super::population::Population;

pub fn name(s: &str) -> TypeName {
    TypeName::parse(s).unwrap()
}

pub fn unit(n: &str, instances: &[&str]) -> Definition {
    let instances: IndexMap<String, UnitInstance> = instances
        .iter()
        .enumerate()
        .map(|(i, instance)| {
            (
                instance.to_string(),
                UnitInstance {
                    name: instance.to_string(),
                    plural: format!("{}s", instance),
                    symbol: None,
                    scale: 10f64.powi(i as i32),
                    bias: None,
                    si_reference: i == 0,
                },
            )
        })
        .collect();
    Definition::Unit(UnitType {
        name: name(n),
        quantity: name("Distance"),
        span: Span::zero(0),
        instances,
    })
}

/// `Length` with `Metre`, `Kilometre` and `Millimetre`.
pub fn length_unit() -> Definition {
    unit("Length", &["Metre", "Kilometre", "Millimetre"])
}

pub struct QuantityBuilder(QuantityType);

fn quantity(n: &str, capability: Capability, role: Role) -> QuantityBuilder {
    QuantityBuilder(QuantityType {
        name: name(n),
        span: Span::zero(0),
        capability,
        role,
        dimension: None,
        overrides: Overrides::default(),
        derivations: vec![],
        constants: vec![],
        conversions: vec![],
        operations: vec![],
        unit_inclusions: vec![],
        unit_exclusions: vec![],
    })
}

fn specialization(original: &str) -> Role {
    Role::Specialization {
        original: name(original),
        inherit: InheritFlags::default(),
    }
}

pub fn scalar_base(n: &str, u: &str) -> QuantityBuilder {
    quantity(n, Capability::Scalar, Role::Base { unit: name(u) })
}

pub fn scalar_spec(n: &str, original: &str) -> QuantityBuilder {
    quantity(n, Capability::Scalar, specialization(original))
}

pub fn vector_base(n: &str, u: &str, dimension: u8) -> QuantityBuilder {
    let mut builder = quantity(n, Capability::Vector, Role::Base { unit: name(u) });
    builder.0.dimension = Some(dimension);
    builder
}

pub fn vector_spec(n: &str, original: &str) -> QuantityBuilder {
    quantity(n, Capability::Vector, specialization(original))
}

pub fn group_base(n: &str, u: &str) -> QuantityBuilder {
    quantity(n, Capability::VectorGroup, Role::Base { unit: name(u) })
}

pub fn group_spec(n: &str, original: &str) -> QuantityBuilder {
    quantity(n, Capability::VectorGroup, specialization(original))
}

pub fn member(n: &str, group: &str, dimension: u8) -> QuantityBuilder {
    quantity(
        n,
        Capability::GroupMember,
        Role::Member {
            group: name(group),
            dimension,
            from_group: InheritFlags::default(),
            from_members: InheritFlags::default(),
        },
    )
}

fn set_flag(flags: &mut InheritFlags, category: Category, value: bool) {
    match category {
        Category::Units => flags.units = value,
        Category::Derivations => flags.derivations = value,
        Category::Constants => flags.constants = value,
        Category::Conversions => flags.conversions = value,
        Category::Operations => flags.operations = value,
    }
}

impl QuantityBuilder {
    pub fn implement_sum(mut self, value: bool) -> Self {
        self.0.overrides.implement_sum = Some(value);
        self
    }

    pub fn implement_difference(mut self, value: bool) -> Self {
        self.0.overrides.implement_difference = Some(value);
        self
    }

    pub fn generate_documentation(mut self, value: bool) -> Self {
        self.0.overrides.generate_documentation = Some(value);
        self
    }

    pub fn difference(mut self, target: &str) -> Self {
        self.0.overrides.difference = Some(name(target));
        self
    }

    pub fn default_unit(mut self, unit: &str, symbol: Option<&str>) -> Self {
        self.0.overrides.default_unit_name = Some(unit.to_string());
        self.0.overrides.default_unit_symbol = symbol.map(String::from);
        self
    }

    pub fn scalar(mut self, target: &str) -> Self {
        self.0.overrides.scalar = Some(name(target));
        self
    }

    pub fn square(mut self, target: &str) -> Self {
        self.0.overrides.powers.square = Some(name(target));
        self
    }

    pub fn dimension(mut self, dimension: u8) -> Self {
        self.0.dimension = Some(dimension);
        self
    }

    pub fn convert(mut self, target: &str) -> Self {
        self.0.conversions.push(name(target));
        self
    }

    pub fn derive(mut self, expression: &str, parameters: &[(&str, &str)]) -> Self {
        self.0.derivations.push(Derivation {
            expression: expression.to_string(),
            parameters: parameters
                .iter()
                .map(|(p, q)| Parameter {
                    name: p.to_string(),
                    quantity: name(q),
                })
                .collect(),
        });
        self
    }

    pub fn constant(mut self, n: &str, value: f64, unit_instance: &str) -> Self {
        self.0.constants.push(Constant {
            name: n.to_string(),
            value,
            unit_instance: unit_instance.to_string(),
            multiples: None,
        });
        self
    }

    pub fn operation(mut self, operator: Operator, other: &str, result: &str) -> Self {
        self.0.operations.push(Operation {
            operator,
            other: name(other),
            result: name(result),
            mirror: false,
        });
        self
    }

    pub fn include(mut self, units: &[&str]) -> Self {
        self.0.unit_inclusions = units.iter().map(|u| u.to_string()).collect();
        self
    }

    pub fn exclude(mut self, units: &[&str]) -> Self {
        self.0.unit_exclusions = units.iter().map(|u| u.to_string()).collect();
        self
    }

    /// Clear a specialization inherit flag.
    pub fn no_inherit(mut self, category: Category) -> Self {
        if let Role::Specialization { inherit, .. } = &mut self.0.role {
            set_flag(inherit, category, false);
        }
        self
    }

    pub fn from_group_off(mut self, category: Category) -> Self {
        if let Role::Member { from_group, .. } = &mut self.0.role {
            set_flag(from_group, category, false);
        }
        self
    }

    pub fn from_members_off(mut self, category: Category) -> Self {
        if let Role::Member { from_members, .. } = &mut self.0.role {
            set_flag(from_members, category, false);
        }
        self
    }

    pub fn build(self) -> QuantityType {
        self.0
    }

    pub fn def(self) -> Definition {
        Definition::Quantity(self.0)
    }
}

/// Resolve a quantity by name and return its descriptor.
pub fn resolve_named(population: &Population, n: &str) -> ResolvedQuantity {
    let quantity = population.quantity(&name(n)).unwrap();
    resolve(quantity, population).unwrap().descriptor().clone()
}
