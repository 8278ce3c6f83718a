//! Cross-type validation.
//!
//! Checks that need the population: does every referenced quantity and unit
//! exist, is it the right kind of quantity, and does each local declaration
//! actually change anything given what the quantity inherits.
//!
//! # Consequences
//!
//! | Check | On failure |
//! |-------|------------|
//! | original exists, same capability, chain reaches a base without cycles | quantity excluded |
//! | base unit exists | quantity excluded |
//! | member's group exists and is a group | quantity excluded |
//! | vector dimension agrees with the inherited one | quantity excluded |
//! | derivation, conversion, operation, constant references | item dropped |
//! | include/exclude/default unit names exist on the unit | item dropped |
//! | difference, magnitude scalar and power references | override dropped |
//! | include/exclude entry changes the inherited set | warning only |
//! | override differs from the inherited value | warning only |
//!
//! # Pipeline Position
//!
//! ```text
//! Process → Build → Check ⟲ → Validate → Build → Resolve
//!                   ^^^^^^^^^^^^^^^^^^
//!                   YOU ARE HERE
//! ```

use std::collections::HashSet;

use measura_ast::model::{Derivation, Operation, Operator, Overrides};
use measura_ast::{Capability, QuantityType, Span, TypeName, UnitType};

use super::chain::{Chain, ChainEnd};
use super::inheritance::{dimension_of, resolve_difference, search};
use super::population::Population;
use super::units::resolve_instances;
use crate::error::{CompileError, DiagnosticPolicy, Diagnostics, ErrorKind, Outcome};

/// Diagnostic context for one quantity.
struct Checker<'a, 'p> {
    quantity: &'a QuantityType,
    population: &'a Population,
    /// Quantities dropped earlier in the pass
    excluded: &'a HashSet<TypeName>,
    diags: Diagnostics<'p>,
}

impl<'a, 'p> Checker<'a, 'p> {
    fn span(&self) -> Span {
        self.quantity.span
    }

    fn error(&mut self, kind: ErrorKind, message: impl Into<String>) {
        let diagnostic = CompileError::new(kind, self.span(), message)
            .for_entity(self.quantity.name.clone());
        self.diags.push(diagnostic);
    }

    fn warn(&mut self, kind: ErrorKind, message: impl Into<String>) {
        let diagnostic = CompileError::warning(kind, self.span(), message)
            .for_entity(self.quantity.name.clone());
        self.diags.push(diagnostic);
    }

    fn absence(&self, name: &TypeName) -> &'static str {
        if self.excluded.contains(name) {
            "was excluded"
        } else {
            "is not defined"
        }
    }

    /// Report a reference to a quantity missing from the population.
    fn undefined(&mut self, name: &TypeName, message: String) {
        let mut diagnostic = CompileError::new(ErrorKind::UndefinedQuantity, self.span(), message)
            .for_entity(self.quantity.name.clone());
        if self.excluded.contains(name) {
            diagnostic = diagnostic.with_note(format!("see the errors reported for '{}'", name));
        }
        self.diags.push(diagnostic);
    }

    fn lookup(&mut self, name: &TypeName, what: &str) -> Option<&'a QuantityType> {
        let found = self.population.quantity(name);
        if found.is_none() {
            let message = format!("{} '{}' {}", what, name, self.absence(name));
            self.undefined(name, message);
        }
        found
    }
}

/// Validate one processed quantity against the population.
///
/// Returns the quantity with invalid items removed, or no value when the
/// quantity cannot take part in resolution at all.
pub fn validate(
    quantity: &QuantityType,
    population: &Population,
    policy: &dyn DiagnosticPolicy,
) -> Outcome<QuantityType> {
    validate_against(quantity, population, &HashSet::new(), policy)
}

/// Entity-level checks only: chain, capabilities, base unit and dimension.
///
/// `excluded` names quantities already dropped from `population`, so that
/// references to them are reported as exclusions rather than as unknown names.
pub fn check_entity(
    quantity: &QuantityType,
    population: &Population,
    excluded: &HashSet<TypeName>,
    policy: &dyn DiagnosticPolicy,
) -> Outcome<()> {
    let mut checker = Checker {
        quantity,
        population,
        excluded,
        diags: Diagnostics::new(policy),
    };
    let passed = check_structure(&mut checker).is_some();
    checker.diags.finish(passed.then_some(()))
}

/// Like [`validate`], for a population some quantities were already
/// excluded from.
pub fn validate_against(
    quantity: &QuantityType,
    population: &Population,
    excluded: &HashSet<TypeName>,
    policy: &dyn DiagnosticPolicy,
) -> Outcome<QuantityType> {
    let mut checker = Checker {
        quantity,
        population,
        excluded,
        diags: Diagnostics::new(policy),
    };

    let Some(unit) = check_structure(&mut checker) else {
        return checker.diags.finish(None);
    };

    let mut validated = quantity.clone();
    validated.derivations.retain(|d| check_derivation(&mut checker, d));
    validated.conversions.retain(|c| check_conversion(&mut checker, c));
    validated.operations.retain(|o| check_operation(&mut checker, o));
    validated
        .constants
        .retain(|c| check_unit_name(&mut checker, unit, &c.unit_instance, "constant unit"));
    validated
        .unit_inclusions
        .retain(|u| check_unit_name(&mut checker, unit, u, "included unit"));
    validated
        .unit_exclusions
        .retain(|u| check_unit_name(&mut checker, unit, u, "excluded unit"));
    check_overrides(&mut checker, unit, &mut validated.overrides);

    check_unit_redundancy(&mut checker, unit, &validated);
    check_override_redundancy(&mut checker, &validated);

    checker.diags.finish(Some(validated))
}

/// Entity-level checks. Returns the unit at the base of the chain.
fn check_structure<'a>(checker: &mut Checker<'a, '_>) -> Option<&'a UnitType> {
    let quantity = checker.quantity;
    let population = checker.population;

    let start = match quantity.membership() {
        Some((group_name, _)) => {
            let group = checker.lookup(group_name, "group")?;
            if !group.is_group() {
                checker.error(
                    ErrorKind::CapabilityMismatch,
                    format!(
                        "'{}' is a {}, not a vector group",
                        group_name,
                        group.capability.as_str()
                    ),
                );
                return None;
            }
            group
        }
        None => quantity,
    };

    let chain = Chain::walk(start, population);

    for pair in chain.levels.windows(2) {
        let (child, parent) = (pair[0], pair[1]);
        if !child.capability.can_specialize(parent.capability) {
            checker.error(
                ErrorKind::CapabilityMismatch,
                format!(
                    "'{}' is a {} and cannot specialize the {} '{}'",
                    child.name,
                    child.capability.as_str(),
                    parent.capability.as_str(),
                    parent.name
                ),
            );
            return None;
        }
    }

    match &chain.end {
        ChainEnd::Base => {}
        ChainEnd::Missing(missing) => {
            let absence = checker.absence(missing);
            let message = if chain.levels.len() == 1 {
                format!("original quantity '{}' {}", missing, absence)
            } else {
                format!(
                    "specialization chain is broken: '{}' {} ({})",
                    missing,
                    absence,
                    chain.describe()
                )
            };
            checker.undefined(missing, message);
            return None;
        }
        ChainEnd::Cycle(_) => {
            checker.error(
                ErrorKind::CyclicSpecialization,
                format!("cyclic specialization detected: {}", chain.describe()),
            );
            return None;
        }
        ChainEnd::Member => {
            let last = chain.levels.last().map(|q| q.name.to_string()).unwrap_or_default();
            checker.error(
                ErrorKind::CapabilityMismatch,
                format!("group member '{}' cannot be specialized", last),
            );
            return None;
        }
    }

    let base = chain.base()?;
    let unit_name = base.unit()?;
    let Some(unit) = population.unit(unit_name) else {
        checker.error(
            ErrorKind::UndefinedUnit,
            format!("unit '{}' of '{}' is not defined", unit_name, base.name),
        );
        return None;
    };

    if quantity.capability == Capability::Vector {
        let own = quantity.dimension;
        let inherited = chain.ancestors().iter().find_map(|level| level.dimension);
        if let (Some(own), Some(inherited)) = (own, inherited) {
            if own != inherited {
                checker.error(
                    ErrorKind::DimensionMismatch,
                    format!(
                        "dimension {} differs from the inherited dimension {}",
                        own, inherited
                    ),
                );
                return None;
            }
        }
    }

    Some(unit)
}

fn check_derivation(checker: &mut Checker<'_, '_>, derivation: &Derivation) -> bool {
    let mut valid = true;
    for parameter in &derivation.parameters {
        if checker.population.quantity(&parameter.quantity).is_none() {
            let message = format!(
                "parameter '{}' of derivation '{}' refers to '{}', which {}",
                parameter.name,
                derivation.expression,
                parameter.quantity,
                checker.absence(&parameter.quantity)
            );
            checker.undefined(&parameter.quantity, message);
            valid = false;
        }
    }
    valid
}

fn check_conversion(checker: &mut Checker<'_, '_>, target_name: &TypeName) -> bool {
    let quantity = checker.quantity;
    let Some(target) = checker.lookup(target_name, "conversion target") else {
        return false;
    };

    if let Some((group, _)) = quantity.membership() {
        if group == target_name {
            checker.error(
                ErrorKind::SelfConversion,
                format!("'{}' cannot convert to its own group '{}'", quantity.name, group),
            );
            return false;
        }
    }

    if !quantity.capability.can_convert_to(target.capability) {
        checker.error(
            ErrorKind::CapabilityMismatch,
            format!(
                "a {} cannot convert to the {} '{}'",
                quantity.capability.as_str(),
                target.capability.as_str(),
                target_name
            ),
        );
        return false;
    }

    let own = dimension_of(quantity, checker.population);
    let other = dimension_of(target, checker.population);
    if let (Some(own), Some(other)) = (own, other) {
        if own != other {
            checker.error(
                ErrorKind::DimensionMismatch,
                format!(
                    "cannot convert a {}-dimensional vector to the {}-dimensional '{}'",
                    own, other, target_name
                ),
            );
            return false;
        }
    }
    true
}

fn check_operation(checker: &mut Checker<'_, '_>, operation: &Operation) -> bool {
    let Some(other) = checker.lookup(&operation.other, "operand") else {
        return false;
    };
    if checker.lookup(&operation.result, "operation result").is_none() {
        return false;
    }

    let quantity = checker.quantity;
    if matches!(operation.operator, Operator::Dot | Operator::Cross) {
        let scalar_operand = [quantity, other]
            .into_iter()
            .find(|q| !q.capability.is_vector_family());
        if let Some(operand) = scalar_operand {
            checker.error(
                ErrorKind::InvalidOperation,
                format!(
                    "'{}' requires vector operands, '{}' is a {}",
                    operation.operator.symbol(),
                    operand.name,
                    operand.capability.as_str()
                ),
            );
            return false;
        }
    }

    if operation.operator == Operator::Cross {
        let dimension = dimension_of(quantity, checker.population);
        if dimension.is_some_and(|d| d != 3) {
            checker.error(
                ErrorKind::InvalidOperation,
                "the cross product is only defined for three-dimensional vectors",
            );
            return false;
        }
    }
    true
}

fn check_unit_name(
    checker: &mut Checker<'_, '_>,
    unit: &UnitType,
    instance: &str,
    what: &str,
) -> bool {
    if unit.has_instance(instance) {
        return true;
    }
    checker.error(
        ErrorKind::UnrecognizedUnitName,
        format!("{} '{}' is not an instance of '{}'", what, instance, unit.name),
    );
    false
}

fn check_overrides(checker: &mut Checker<'_, '_>, unit: &UnitType, overrides: &mut Overrides) {
    let capability = checker.quantity.capability;

    if let Some(name) = overrides.default_unit_name.clone() {
        if !check_unit_name(checker, unit, &name, "default unit") {
            overrides.default_unit_name = None;
            overrides.default_unit_symbol = None;
        }
    }

    if let Some(difference) = overrides.difference.clone() {
        let keep = match checker.lookup(&difference, "difference quantity") {
            Some(target) if capability.can_convert_to(target.capability) => true,
            Some(target) => {
                checker.error(
                    ErrorKind::CapabilityMismatch,
                    format!(
                        "difference of a {} cannot be the {} '{}'",
                        capability.as_str(),
                        target.capability.as_str(),
                        difference
                    ),
                );
                false
            }
            None => false,
        };
        if !keep {
            overrides.difference = None;
        }
    }

    if let Some(scalar) = overrides.scalar.clone() {
        if !check_scalar_reference(checker, &scalar, "magnitude scalar") {
            overrides.scalar = None;
        }
    }

    let powers = &mut overrides.powers;
    for (what, slot) in [
        ("reciprocal", &mut powers.reciprocal),
        ("square", &mut powers.square),
        ("cube", &mut powers.cube),
        ("square root", &mut powers.square_root),
        ("cube root", &mut powers.cube_root),
    ] {
        if let Some(target) = slot.clone() {
            if !check_scalar_reference(checker, &target, what) {
                *slot = None;
            }
        }
    }
}

fn check_scalar_reference(checker: &mut Checker<'_, '_>, target: &TypeName, what: &str) -> bool {
    let Some(quantity) = checker.lookup(target, what) else {
        return false;
    };
    if quantity.capability != Capability::Scalar {
        checker.error(
            ErrorKind::CapabilityMismatch,
            format!(
                "{} '{}' must be a scalar, not a {}",
                what,
                target,
                quantity.capability.as_str()
            ),
        );
        return false;
    }
    true
}

/// Warn about include/exclude entries that leave the inherited set unchanged.
fn check_unit_redundancy(checker: &mut Checker<'_, '_>, unit: &UnitType, validated: &QuantityType) {
    let Some(inherited) = resolve_instances(validated, checker.population, unit, true) else {
        return;
    };
    let inherited: HashSet<&str> = inherited.iter().map(String::as_str).collect();

    for name in &validated.unit_inclusions {
        if !inherited.contains(name.as_str()) {
            checker.warn(
                ErrorKind::NoEffect,
                format!("unit '{}' is not inherited, so including it has no effect", name),
            );
        }
    }
    for name in &validated.unit_exclusions {
        if !inherited.contains(name.as_str()) {
            checker.warn(
                ErrorKind::NoEffect,
                format!("unit '{}' is already excluded", name),
            );
        }
    }
}

/// Warn about overrides equal to what the quantity would inherit anyway.
fn check_override_redundancy(checker: &mut Checker<'_, '_>, validated: &QuantityType) {
    if validated.is_base() {
        return;
    }
    let population = checker.population;
    let overrides = &validated.overrides;

    let flags: [(&str, Option<bool>, fn(&Overrides) -> Option<bool>); 3] = [
        ("implement sum", overrides.implement_sum, |o| o.implement_sum),
        ("implement difference", overrides.implement_difference, |o| o.implement_difference),
        ("generate documentation", overrides.generate_documentation, |o| {
            o.generate_documentation
        }),
    ];
    for (what, own, get) in flags {
        let Some(own) = own else { continue };
        let inherited = search(validated, population, true, get)
            .map(|(value, _)| value)
            .unwrap_or(true);
        if own == inherited {
            checker.warn(
                ErrorKind::RedundantOverride,
                format!("{} is already {} through inheritance", what, own),
            );
        }
    }

    let names: [(&str, Option<&String>, fn(&Overrides) -> Option<String>); 2] = [
        ("default unit", overrides.default_unit_name.as_ref(), |o| {
            o.default_unit_name.clone()
        }),
        ("default unit symbol", overrides.default_unit_symbol.as_ref(), |o| {
            o.default_unit_symbol.clone()
        }),
    ];
    for (what, own, get) in names {
        let Some(own) = own else { continue };
        let inherited = search(validated, population, true, get).map(|(value, _)| value);
        if inherited.as_ref() == Some(own) {
            checker.warn(
                ErrorKind::RedundantOverride,
                format!("{} '{}' is already inherited", what, own),
            );
        }
    }

    if let Some(scalar) = &overrides.scalar {
        let inherited = search(validated, population, true, |o| o.scalar.clone());
        if inherited.map(|(value, _)| value).as_ref() == Some(scalar) {
            checker.warn(
                ErrorKind::RedundantOverride,
                format!("magnitude scalar '{}' is already inherited", scalar),
            );
        }
    }

    if let Some(difference) = &overrides.difference {
        let mut without = validated.clone();
        without.overrides.difference = None;
        if &resolve_difference(&without, population) == difference {
            checker.warn(
                ErrorKind::RedundantOverride,
                format!("difference quantity '{}' is already inherited", difference),
            );
        }
    }
}
