//! Local processing of raw declarations.
//!
//! Turns one raw declaration into a self-consistent [`Definition`] using only
//! the declaration itself. Nothing here looks at other types: whether a
//! referenced quantity exists is the validator's business.
//!
//! # What This Pass Does
//!
//! - Parses the identity and every reference into a [`TypeName`]
//! - Infers the [`Role`] from which references are present
//! - Checks member and vector dimensions
//! - Filters derivations, constants, conversions, operations and unit lists,
//!   dropping only the offending entry
//! - Resolves contradictory unit lists by keeping the inclusions
//!
//! A declaration without a usable identity or role yields no value. The
//! reasons are reported as diagnostics; nothing panics.
//!
//! # Pipeline Position
//!
//! ```text
//! Process → Build → Check ⟲ → Validate → Build → Resolve
//! ^^^^^^^
//! YOU ARE HERE
//! ```

use std::collections::HashSet;

use indexmap::IndexMap;
use measura_ast::declaration::{
    RawConstant, RawDerivation, RawInheritFlags, RawOperation, RawQuantity, RawUnit,
    RawUnitInstance,
};
use measura_ast::model::{
    Constant, Derivation, InheritFlags, Operation, Overrides, Parameter, Powers, UnitInstance,
};
use measura_ast::{
    Capability, Declaration, Definition, QuantityType, Role, Span, TypeName, UnitType,
};

use crate::error::{CompileError, DiagnosticPolicy, Diagnostics, ErrorKind, Outcome};

/// Valid dimensions of a group member.
pub const MEMBER_DIMENSIONS: [u8; 3] = [2, 3, 4];

/// Process any declaration.
pub fn process(declaration: &Declaration, policy: &dyn DiagnosticPolicy) -> Outcome<Definition> {
    match declaration {
        Declaration::Unit(raw) => process_unit(raw, policy).map(Definition::Unit),
        Declaration::Quantity(raw) => process_quantity(raw, policy).map(Definition::Quantity),
    }
}

/// Per-declaration diagnostic context.
struct Local<'p> {
    span: Span,
    entity: Option<TypeName>,
    diags: Diagnostics<'p>,
}

impl<'p> Local<'p> {
    fn new(span: Span, policy: &'p dyn DiagnosticPolicy) -> Self {
        Self {
            span,
            entity: None,
            diags: Diagnostics::new(policy),
        }
    }

    fn report(&mut self, diagnostic: CompileError) {
        let diagnostic = match &self.entity {
            Some(entity) => diagnostic.for_entity(entity.clone()),
            None => diagnostic,
        };
        self.diags.push(diagnostic);
    }

    fn error(&mut self, kind: ErrorKind, message: impl Into<String>) {
        self.report(CompileError::new(kind, self.span, message));
    }

    fn warn(&mut self, kind: ErrorKind, message: impl Into<String>) {
        self.report(CompileError::warning(kind, self.span, message));
    }

    /// Parse the declaration's own identity.
    fn identity(&mut self, raw: Option<&str>, what: &str) -> Option<TypeName> {
        let Some(raw) = raw.filter(|s| !s.trim().is_empty()) else {
            self.error(ErrorKind::MissingName, format!("{} declaration has no name", what));
            return None;
        };
        match TypeName::parse(raw) {
            Ok(name) => {
                self.entity = Some(name.clone());
                Some(name)
            }
            Err(e) => {
                self.error(ErrorKind::MalformedName, e.to_string());
                None
            }
        }
    }

    /// Parse a role-defining reference; absence is structural.
    fn required(&mut self, raw: Option<&str>, what: &str) -> Option<TypeName> {
        let Some(raw) = raw else {
            self.error(ErrorKind::MissingReference, format!("no {} specified", what));
            return None;
        };
        self.reference(raw, what)
    }

    /// Parse an optional reference; a malformed one is reported and dropped.
    fn optional(&mut self, raw: Option<&str>, what: &str) -> Option<TypeName> {
        raw.and_then(|raw| self.reference(raw, what))
    }

    fn reference(&mut self, raw: &str, what: &str) -> Option<TypeName> {
        match TypeName::parse(raw) {
            Ok(name) => Some(name),
            Err(e) => {
                self.error(ErrorKind::MalformedName, format!("{}: {}", what, e));
                None
            }
        }
    }

    fn finish<T>(self, value: Option<T>) -> Outcome<T> {
        self.diags.finish(value)
    }
}

/// Process a unit declaration.
///
/// # Errors
///
/// Yields no value when the unit has no usable name or measured quantity.
/// Malformed instances are dropped individually.
pub fn process_unit(raw: &RawUnit, policy: &dyn DiagnosticPolicy) -> Outcome<UnitType> {
    let mut local = Local::new(raw.span, policy);

    let name = local.identity(raw.name.as_deref(), "unit");
    let quantity = local.required(raw.quantity.as_deref(), "measured quantity");
    let (Some(name), Some(quantity)) = (name, quantity) else {
        return local.finish(None);
    };

    let mut instances: IndexMap<String, UnitInstance> = IndexMap::new();
    let mut has_reference = false;

    for raw_instance in &raw.instances {
        let Some(mut instance) = process_unit_instance(raw_instance, &mut local) else {
            continue;
        };
        if instances.contains_key(&instance.name) {
            local.warn(
                ErrorKind::DuplicateListing,
                format!("unit instance '{}' is declared more than once", instance.name),
            );
            continue;
        }
        if instance.si_reference {
            if has_reference {
                local.error(
                    ErrorKind::InvalidUnitInstance,
                    format!(
                        "unit instance '{}' cannot also be the SI reference",
                        instance.name
                    ),
                );
                instance.si_reference = false;
            }
            has_reference = true;
        }
        instances.insert(instance.name.clone(), instance);
    }

    if instances.is_empty() {
        local.warn(
            ErrorKind::InvalidUnitInstance,
            format!("unit '{}' declares no instances", name),
        );
    }

    local.finish(Some(UnitType {
        name,
        quantity,
        span: raw.span,
        instances,
    }))
}

fn process_unit_instance(raw: &RawUnitInstance, local: &mut Local<'_>) -> Option<UnitInstance> {
    let Some(name) = raw.name.as_deref().map(str::trim).filter(|s| !s.is_empty()) else {
        local.error(ErrorKind::InvalidUnitInstance, "unit instance has no name");
        return None;
    };

    let scale = raw.scale.unwrap_or(1.0);
    if !scale.is_finite() || scale <= 0.0 {
        local.error(
            ErrorKind::InvalidUnitInstance,
            format!("unit instance '{}' has invalid scale {}", name, scale),
        );
        return None;
    }
    if let Some(bias) = raw.bias.filter(|b| !b.is_finite()) {
        local.error(
            ErrorKind::InvalidUnitInstance,
            format!("unit instance '{}' has invalid bias {}", name, bias),
        );
        return None;
    }

    let plural = raw
        .plural
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .unwrap_or_else(|| format!("{}s", name));

    Some(UnitInstance {
        name: name.to_string(),
        plural,
        symbol: raw.symbol.clone().filter(|s| !s.trim().is_empty()),
        scale,
        bias: raw.bias,
        si_reference: raw.si_reference,
    })
}

/// Process a quantity declaration.
///
/// # Errors
///
/// Yields no value when the identity is missing or malformed, when the
/// role-defining references are absent or contradictory, or when a required
/// dimension is invalid. Everything else is repaired by dropping the
/// offending entry.
pub fn process_quantity(raw: &RawQuantity, policy: &dyn DiagnosticPolicy) -> Outcome<QuantityType> {
    let mut local = Local::new(raw.span, policy);

    let Some(name) = local.identity(raw.name.as_deref(), raw.capability.as_str()) else {
        return local.finish(None);
    };

    let Some(role) = process_role(raw, &mut local) else {
        return local.finish(None);
    };

    let Some(dimension) = process_dimension(raw, &role, &mut local) else {
        return local.finish(None);
    };

    let overrides = process_overrides(raw, &mut local);
    let derivations = process_derivations(&raw.derivations, &mut local);
    let constants = process_constants(&raw.constants, &mut local);
    let conversions = process_conversions(&raw.conversions, &name, &mut local);
    let operations = process_operations(&raw.operations, &mut local);

    let unit_inclusions = process_unit_list(&raw.include_units, "inclusion", &mut local);
    let mut unit_exclusions = process_unit_list(&raw.exclude_units, "exclusion", &mut local);
    if !unit_inclusions.is_empty() && !unit_exclusions.is_empty() {
        local.error(
            ErrorKind::ContradictoryUnitLists,
            "both unit inclusions and unit exclusions are declared; the exclusions are ignored",
        );
        unit_exclusions.clear();
    }

    local.finish(Some(QuantityType {
        name,
        span: raw.span,
        capability: raw.capability,
        role,
        dimension,
        overrides,
        derivations,
        constants,
        conversions,
        operations,
        unit_inclusions,
        unit_exclusions,
    }))
}

fn concrete_flags(raw: &RawInheritFlags) -> InheritFlags {
    InheritFlags {
        units: raw.units.unwrap_or(true),
        derivations: raw.derivations.unwrap_or(true),
        constants: raw.constants.unwrap_or(true),
        conversions: raw.conversions.unwrap_or(true),
        operations: raw.operations.unwrap_or(true),
    }
}

fn process_role(raw: &RawQuantity, local: &mut Local<'_>) -> Option<Role> {
    if raw.capability == Capability::GroupMember {
        if raw.unit.is_some() || raw.original.is_some() {
            local.error(
                ErrorKind::AmbiguousRole,
                "a group member takes its unit and parent from its group",
            );
            return None;
        }
        let group = local.required(raw.group.as_deref(), "owning group");
        let Some(dimension) = raw.dimension else {
            local.error(ErrorKind::MissingReference, "no member dimension specified");
            return None;
        };
        if !MEMBER_DIMENSIONS.contains(&dimension) {
            local.error(
                ErrorKind::InvalidDimension,
                format!("member dimension {} is not one of 2, 3 or 4", dimension),
            );
            return None;
        }
        return Some(Role::Member {
            group: group?,
            dimension,
            from_group: concrete_flags(&raw.inherit),
            from_members: concrete_flags(&raw.inherit_from_members),
        });
    }

    if raw.group.is_some() {
        local.error(
            ErrorKind::AmbiguousRole,
            format!("only group members belong to a group, not a {}", raw.capability.as_str()),
        );
        return None;
    }
    if !raw.inherit_from_members.is_unset() {
        local.warn(
            ErrorKind::NoEffect,
            "inherit-from-members flags only apply to group members",
        );
    }

    match (raw.unit.as_deref(), raw.original.as_deref()) {
        (Some(_), Some(_)) => {
            local.error(
                ErrorKind::AmbiguousRole,
                "a quantity cannot declare both a unit and an original quantity",
            );
            None
        }
        (Some(unit), None) => {
            if !raw.inherit.is_unset() {
                local.warn(ErrorKind::NoEffect, "a base quantity has nothing to inherit");
            }
            let unit = local.reference(unit, "unit")?;
            Some(Role::Base { unit })
        }
        (None, Some(original)) => {
            let original = local.reference(original, "original quantity")?;
            Some(Role::Specialization {
                original,
                inherit: concrete_flags(&raw.inherit),
            })
        }
        (None, None) => {
            local.error(
                ErrorKind::MissingReference,
                "a quantity must declare either a unit or an original quantity",
            );
            None
        }
    }
}

/// Returns `None` on a structural failure, `Some(dimension)` otherwise.
fn process_dimension(raw: &RawQuantity, role: &Role, local: &mut Local<'_>) -> Option<Option<u8>> {
    match raw.capability {
        Capability::GroupMember => Some(None),
        Capability::Vector => match (raw.dimension, role) {
            (Some(0), _) => {
                local.error(ErrorKind::InvalidDimension, "vector dimension must be at least 1");
                None
            }
            (None, Role::Base { .. }) => {
                local.error(
                    ErrorKind::MissingReference,
                    "a base vector must declare its dimension",
                );
                None
            }
            (dimension, _) => Some(dimension),
        },
        Capability::Scalar | Capability::VectorGroup => {
            if raw.dimension.is_some() {
                local.warn(
                    ErrorKind::NoEffect,
                    format!("a {} has no dimension; it is ignored", raw.capability.as_str()),
                );
            }
            Some(None)
        }
    }
}

fn process_overrides(raw: &RawQuantity, local: &mut Local<'_>) -> Overrides {
    let difference = local.optional(raw.difference.as_deref(), "difference quantity");
    if raw.implement_difference == Some(false) && difference.is_some() {
        local.warn(
            ErrorKind::DifferenceDisabled,
            "a difference quantity is specified but differences are not implemented",
        );
    }

    let default_unit_name = raw
        .default_unit_name
        .clone()
        .filter(|s| !s.trim().is_empty());
    let mut default_unit_symbol = raw
        .default_unit_symbol
        .clone()
        .filter(|s| !s.trim().is_empty());
    if default_unit_name.is_none() && default_unit_symbol.is_some() {
        local.warn(
            ErrorKind::IncompleteDefaultUnit,
            "a default unit symbol requires a default unit name; the symbol is ignored",
        );
        default_unit_symbol = None;
    }

    let mut scalar = local.optional(raw.scalar.as_deref(), "magnitude scalar");
    if scalar.is_some() && !raw.capability.is_vector_family() {
        local.warn(ErrorKind::NoEffect, "only vector quantities have a magnitude scalar");
        scalar = None;
    }

    let mut powers = Powers {
        reciprocal: local.optional(raw.reciprocal.as_deref(), "reciprocal"),
        square: local.optional(raw.square.as_deref(), "square"),
        cube: local.optional(raw.cube.as_deref(), "cube"),
        square_root: local.optional(raw.square_root.as_deref(), "square root"),
        cube_root: local.optional(raw.cube_root.as_deref(), "cube root"),
    };
    if !powers.is_empty() && raw.capability != Capability::Scalar {
        local.warn(ErrorKind::NoEffect, "only scalar quantities have power relations");
        powers = Powers::default();
    }

    Overrides {
        implement_sum: raw.implement_sum,
        implement_difference: raw.implement_difference,
        difference,
        default_unit_name,
        default_unit_symbol,
        generate_documentation: raw.generate_documentation,
        scalar,
        powers,
    }
}

/// Names inside `{...}` placeholders, in order of appearance.
fn placeholders(expression: &str) -> Result<Vec<&str>, String> {
    let mut names = Vec::new();
    let mut rest = expression;
    while let Some(open) = rest.find('{') {
        let after = &rest[open + 1..];
        let Some(close) = after.find('}') else {
            return Err("unclosed '{' in expression".to_string());
        };
        let name = after[..close].trim();
        if name.is_empty() {
            return Err("empty placeholder '{}' in expression".to_string());
        }
        names.push(name);
        rest = &after[close + 1..];
    }
    if rest.contains('}') {
        return Err("unmatched '}' in expression".to_string());
    }
    Ok(names)
}

fn process_derivations(raw: &[RawDerivation], local: &mut Local<'_>) -> Vec<Derivation> {
    let mut derivations: Vec<Derivation> = Vec::new();
    for raw_derivation in raw {
        let Some(derivation) = process_derivation(raw_derivation, local) else {
            continue;
        };
        if derivations.contains(&derivation) {
            local.warn(
                ErrorKind::DuplicateListing,
                format!("derivation '{}' is listed more than once", derivation.expression),
            );
            continue;
        }
        derivations.push(derivation);
    }
    derivations
}

fn process_derivation(raw: &RawDerivation, local: &mut Local<'_>) -> Option<Derivation> {
    let Some(expression) = raw.expression.as_deref().map(str::trim).filter(|s| !s.is_empty())
    else {
        local.error(ErrorKind::InvalidDerivation, "derivation has an empty expression");
        return None;
    };

    if raw.parameters.is_empty() {
        local.error(
            ErrorKind::InvalidDerivation,
            format!("derivation '{}' has an empty signature", expression),
        );
        return None;
    }

    let mut parameters = Vec::with_capacity(raw.parameters.len());
    let mut seen = HashSet::new();
    for raw_parameter in &raw.parameters {
        let Some(name) = raw_parameter
            .name
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
        else {
            local.error(
                ErrorKind::InvalidDerivation,
                format!("derivation '{}' has an unnamed parameter", expression),
            );
            return None;
        };
        if !seen.insert(name) {
            local.error(
                ErrorKind::DuplicateParameter,
                format!("derivation '{}' declares parameter '{}' twice", expression, name),
            );
            return None;
        }
        let Some(quantity) = raw_parameter
            .quantity
            .as_deref()
            .and_then(|q| local.reference(q, "derivation parameter"))
        else {
            local.error(
                ErrorKind::InvalidDerivation,
                format!("parameter '{}' of '{}' names no quantity", name, expression),
            );
            return None;
        };
        parameters.push(Parameter {
            name: name.to_string(),
            quantity,
        });
    }

    match placeholders(expression) {
        Ok(names) => {
            if let Some(unknown) = names.iter().find(|n| !seen.contains(*n)) {
                local.error(
                    ErrorKind::InvalidDerivation,
                    format!(
                        "derivation '{}' refers to undeclared parameter '{}'",
                        expression, unknown
                    ),
                );
                return None;
            }
        }
        Err(reason) => {
            local.error(
                ErrorKind::InvalidDerivation,
                format!("derivation '{}': {}", expression, reason),
            );
            return None;
        }
    }

    Some(Derivation {
        expression: expression.to_string(),
        parameters,
    })
}

fn process_constants(raw: &[RawConstant], local: &mut Local<'_>) -> Vec<Constant> {
    let mut constants: Vec<Constant> = Vec::new();
    for raw_constant in raw {
        let Some(name) = raw_constant.name.as_deref().map(str::trim).filter(|s| !s.is_empty())
        else {
            local.error(ErrorKind::InvalidConstant, "constant has no name");
            continue;
        };
        if constants.iter().any(|c| c.name == name) {
            local.error(
                ErrorKind::InvalidConstant,
                format!("constant '{}' is declared more than once", name),
            );
            continue;
        }
        let Some(value) = raw_constant.value.filter(|v| v.is_finite()) else {
            local.error(
                ErrorKind::InvalidConstant,
                format!("constant '{}' has no finite value", name),
            );
            continue;
        };
        let Some(unit_instance) = raw_constant
            .unit
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
        else {
            local.error(
                ErrorKind::InvalidConstant,
                format!("constant '{}' names no unit instance", name),
            );
            continue;
        };
        let multiples = raw_constant
            .multiples
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty());
        if multiples == Some(name) {
            local.error(
                ErrorKind::InvalidConstant,
                format!("constant '{}' cannot share its name with its multiples", name),
            );
            continue;
        }
        constants.push(Constant {
            name: name.to_string(),
            value,
            unit_instance: unit_instance.to_string(),
            multiples: multiples.map(String::from),
        });
    }
    constants
}

fn process_conversions(raw: &[String], own: &TypeName, local: &mut Local<'_>) -> Vec<TypeName> {
    let mut conversions: Vec<TypeName> = Vec::new();
    for raw_target in raw {
        let Some(target) = local.reference(raw_target, "conversion target") else {
            continue;
        };
        if &target == own {
            local.error(
                ErrorKind::SelfConversion,
                format!("'{}' lists a conversion to itself", own),
            );
            continue;
        }
        if conversions.contains(&target) {
            local.warn(
                ErrorKind::DuplicateListing,
                format!("conversion to '{}' is listed more than once", target),
            );
            continue;
        }
        conversions.push(target);
    }
    conversions
}

fn process_operations(raw: &[RawOperation], local: &mut Local<'_>) -> Vec<Operation> {
    let mut operations: Vec<Operation> = Vec::new();
    for raw_operation in raw {
        let symbol = raw_operation.operator.symbol();
        let other = raw_operation.other.as_deref().and_then(|o| local.reference(o, "operand"));
        let result = raw_operation.result.as_deref().and_then(|r| local.reference(r, "result"));
        let (Some(other), Some(result)) = (other, result) else {
            local.error(
                ErrorKind::InvalidOperation,
                format!("operation '{}' needs both an operand and a result", symbol),
            );
            continue;
        };
        if operations
            .iter()
            .any(|o| o.operator == raw_operation.operator && o.other == other)
        {
            local.warn(
                ErrorKind::DuplicateListing,
                format!("operation '{}' with '{}' is listed more than once", symbol, other),
            );
            continue;
        }
        operations.push(Operation {
            operator: raw_operation.operator,
            other,
            result,
            mirror: raw_operation.mirror,
        });
    }
    operations
}

fn process_unit_list(raw: &[String], what: &str, local: &mut Local<'_>) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for entry in raw {
        let entry = entry.trim();
        if entry.is_empty() {
            local.error(
                ErrorKind::UnrecognizedUnitName,
                format!("empty unit instance name in {} list", what),
            );
            continue;
        }
        if names.iter().any(|n| n == entry) {
            local.warn(
                ErrorKind::DuplicateListing,
                format!("unit instance '{}' is listed more than once in the {} list", entry, what),
            );
            continue;
        }
        names.push(entry.to_string());
    }
    names
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ReportAll, Severity, Silent};
    use measura_ast::declaration::RawParameter;
    use measura_ast::model::Operator;

    fn test_span() -> Span {
        Span::new(0, 0, 10, 1)
    }

    fn scalar_base(name: &str, unit: &str) -> RawQuantity {
        RawQuantity {
            name: Some(name.to_string()),
            unit: Some(unit.to_string()),
            span: test_span(),
            ..RawQuantity::default()
        }
    }

    fn has_kind(outcome: &Outcome<QuantityType>, kind: ErrorKind) -> bool {
        outcome.diagnostics.iter().any(|d| d.kind == kind)
    }

    #[test]
    fn test_base_scalar() {
        let outcome = process_quantity(&scalar_base("Distance", "Length"), &ReportAll);
        let quantity = outcome.value.unwrap();
        assert!(outcome.diagnostics.is_empty());
        assert_eq!(quantity.unit().unwrap().to_string(), "Length");
        assert!(quantity.is_base());
    }

    #[test]
    fn test_missing_name_yields_no_value() {
        let raw = RawQuantity {
            unit: Some("Length".into()),
            ..RawQuantity::default()
        };
        let outcome = process_quantity(&raw, &ReportAll);
        assert!(outcome.value.is_none());
        assert!(has_kind(&outcome, ErrorKind::MissingName));
    }

    #[test]
    fn test_missing_role_yields_no_value() {
        let raw = RawQuantity {
            name: Some("Orphan".into()),
            ..RawQuantity::default()
        };
        let outcome = process_quantity(&raw, &ReportAll);
        assert!(outcome.value.is_none());
        assert!(has_kind(&outcome, ErrorKind::MissingReference));
    }

    #[test]
    fn test_unit_and_original_is_ambiguous() {
        let raw = RawQuantity {
            original: Some("Distance".into()),
            ..scalar_base("Height", "Length")
        };
        let outcome = process_quantity(&raw, &ReportAll);
        assert!(outcome.value.is_none());
        assert!(has_kind(&outcome, ErrorKind::AmbiguousRole));
    }

    #[test]
    fn test_specialization_flags() {
        let raw = RawQuantity {
            name: Some("Height".into()),
            original: Some("Distance".into()),
            inherit: RawInheritFlags {
                units: Some(false),
                ..RawInheritFlags::default()
            },
            ..RawQuantity::default()
        };
        let quantity = process_quantity(&raw, &ReportAll).value.unwrap();
        let flags = quantity.inherit_flags();
        assert!(!flags.units);
        assert!(flags.conversions);
        assert_eq!(quantity.original().unwrap().to_string(), "Distance");
    }

    #[test]
    fn test_member_dimension_range() {
        for (dimension, valid) in [(1, false), (2, true), (3, true), (4, true), (5, false)] {
            let raw = RawQuantity {
                name: Some(format!("Position{}", dimension)),
                capability: Capability::GroupMember,
                group: Some("Position".into()),
                dimension: Some(dimension),
                ..RawQuantity::default()
            };
            let outcome = process_quantity(&raw, &ReportAll);
            assert_eq!(outcome.value.is_some(), valid, "dimension {}", dimension);
            if !valid {
                assert!(has_kind(&outcome, ErrorKind::InvalidDimension));
            }
        }
    }

    #[test]
    fn test_member_with_unit_is_ambiguous() {
        let raw = RawQuantity {
            capability: Capability::GroupMember,
            group: Some("Position".into()),
            dimension: Some(3),
            ..scalar_base("Position3", "Length")
        };
        assert!(process_quantity(&raw, &ReportAll).value.is_none());
    }

    #[test]
    fn test_base_vector_requires_dimension() {
        let raw = RawQuantity {
            capability: Capability::Vector,
            ..scalar_base("Velocity", "Speed")
        };
        let outcome = process_quantity(&raw, &ReportAll);
        assert!(outcome.value.is_none());

        let raw = RawQuantity {
            capability: Capability::Vector,
            dimension: Some(3),
            ..scalar_base("Velocity", "Speed")
        };
        assert_eq!(process_quantity(&raw, &ReportAll).value.unwrap().dimension, Some(3));
    }

    #[test]
    fn test_self_conversion_dropped() {
        let raw = RawQuantity {
            conversions: vec!["Distance".into(), "Length2".into()],
            ..scalar_base("Distance", "Length")
        };
        let outcome = process_quantity(&raw, &ReportAll);
        assert!(has_kind(&outcome, ErrorKind::SelfConversion));
        let quantity = outcome.value.unwrap();
        assert_eq!(quantity.conversions.len(), 1);
        assert_eq!(quantity.conversions[0].to_string(), "Length2");
    }

    #[test]
    fn test_duplicate_conversion_warns() {
        let raw = RawQuantity {
            conversions: vec!["Height".into(), "Height".into()],
            ..scalar_base("Distance", "Length")
        };
        let outcome = process_quantity(&raw, &ReportAll);
        let warning = outcome
            .diagnostics
            .iter()
            .find(|d| d.kind == ErrorKind::DuplicateListing)
            .unwrap();
        assert_eq!(warning.severity, Severity::Warning);
        assert_eq!(outcome.value.unwrap().conversions.len(), 1);
    }

    #[test]
    fn test_inclusion_wins_over_exclusion() {
        let raw = RawQuantity {
            include_units: vec!["Metre".into()],
            exclude_units: vec!["Kilometre".into()],
            ..scalar_base("Distance", "Length")
        };
        let outcome = process_quantity(&raw, &ReportAll);
        assert!(has_kind(&outcome, ErrorKind::ContradictoryUnitLists));
        let quantity = outcome.value.unwrap();
        assert_eq!(quantity.unit_inclusions, vec!["Metre".to_string()]);
        assert!(quantity.unit_exclusions.is_empty());
    }

    #[test]
    fn test_duplicate_derivation_parameter() {
        let raw = RawQuantity {
            derivations: vec![RawDerivation {
                expression: Some("{a} * {a}".into()),
                parameters: vec![
                    RawParameter {
                        name: Some("a".into()),
                        quantity: Some("Distance".into()),
                    },
                    RawParameter {
                        name: Some("a".into()),
                        quantity: Some("Distance".into()),
                    },
                ],
            }],
            ..scalar_base("Area", "AreaUnit")
        };
        let outcome = process_quantity(&raw, &ReportAll);
        assert!(has_kind(&outcome, ErrorKind::DuplicateParameter));
        assert!(outcome.value.unwrap().derivations.is_empty());
    }

    #[test]
    fn test_undeclared_placeholder() {
        let raw = RawQuantity {
            derivations: vec![RawDerivation {
                expression: Some("{distance} / {time}".into()),
                parameters: vec![RawParameter {
                    name: Some("distance".into()),
                    quantity: Some("Distance".into()),
                }],
            }],
            ..scalar_base("Speed", "SpeedUnit")
        };
        let outcome = process_quantity(&raw, &ReportAll);
        assert!(has_kind(&outcome, ErrorKind::InvalidDerivation));
        assert!(outcome.value.unwrap().derivations.is_empty());
    }

    #[test]
    fn test_placeholders() {
        assert_eq!(placeholders("{a} / {b}").unwrap(), vec!["a", "b"]);
        assert!(placeholders("{a").is_err());
        assert!(placeholders("a}").is_err());
        assert!(placeholders("{ }").is_err());
        assert!(placeholders("1 / 2").unwrap().is_empty());
    }

    #[test]
    fn test_constants_filtered() {
        let raw = RawQuantity {
            constants: vec![
                RawConstant {
                    name: Some("Planck".into()),
                    value: Some(1.616e-35),
                    unit: Some("Metre".into()),
                    multiples: Some("PlanckLengths".into()),
                },
                RawConstant {
                    name: Some("Planck".into()),
                    value: Some(1.0),
                    unit: Some("Metre".into()),
                    multiples: None,
                },
                RawConstant {
                    name: Some("Broken".into()),
                    value: Some(f64::NAN),
                    unit: Some("Metre".into()),
                    multiples: None,
                },
            ],
            ..scalar_base("Distance", "Length")
        };
        let outcome = process_quantity(&raw, &ReportAll);
        let quantity = outcome.value.unwrap();
        assert_eq!(quantity.constants.len(), 1);
        assert_eq!(quantity.constants[0].multiples.as_deref(), Some("PlanckLengths"));
        assert_eq!(
            outcome
                .diagnostics
                .iter()
                .filter(|d| d.kind == ErrorKind::InvalidConstant)
                .count(),
            2
        );
    }

    #[test]
    fn test_operation_requires_operands() {
        let raw = RawQuantity {
            operations: vec![
                RawOperation {
                    operator: Operator::Divide,
                    other: Some("Time".into()),
                    result: Some("Speed".into()),
                    mirror: false,
                },
                RawOperation {
                    operator: Operator::Multiply,
                    other: None,
                    result: Some("Area".into()),
                    mirror: false,
                },
            ],
            ..scalar_base("Distance", "Length")
        };
        let outcome = process_quantity(&raw, &ReportAll);
        assert!(has_kind(&outcome, ErrorKind::InvalidOperation));
        assert_eq!(outcome.value.unwrap().operations.len(), 1);
    }

    #[test]
    fn test_default_unit_symbol_requires_name() {
        let raw = RawQuantity {
            default_unit_symbol: Some("m".into()),
            ..scalar_base("Distance", "Length")
        };
        let outcome = process_quantity(&raw, &ReportAll);
        assert!(has_kind(&outcome, ErrorKind::IncompleteDefaultUnit));
        assert!(outcome.value.unwrap().overrides.default_unit_symbol.is_none());
    }

    #[test]
    fn test_difference_disabled_warns_but_keeps() {
        let raw = RawQuantity {
            implement_difference: Some(false),
            difference: Some("Displacement".into()),
            ..scalar_base("Position", "Length")
        };
        let outcome = process_quantity(&raw, &ReportAll);
        assert!(has_kind(&outcome, ErrorKind::DifferenceDisabled));
        assert!(outcome.value.unwrap().overrides.difference.is_some());
    }

    #[test]
    fn test_silent_policy_keeps_value() {
        let raw = RawQuantity {
            conversions: vec!["Distance".into()],
            ..scalar_base("Distance", "Length")
        };
        let outcome = process_quantity(&raw, &Silent);
        assert!(outcome.diagnostics.is_empty());
        assert!(outcome.value.unwrap().conversions.is_empty());
    }

    #[test]
    fn test_unit_instances() {
        let raw = RawUnit {
            name: Some("Length".into()),
            quantity: Some("Distance".into()),
            instances: vec![
                RawUnitInstance {
                    name: Some("Metre".into()),
                    si_reference: true,
                    ..RawUnitInstance::default()
                },
                RawUnitInstance {
                    name: Some("Kilometre".into()),
                    scale: Some(1000.0),
                    ..RawUnitInstance::default()
                },
                RawUnitInstance {
                    name: Some("Metre".into()),
                    ..RawUnitInstance::default()
                },
                RawUnitInstance {
                    name: Some("Nothing".into()),
                    scale: Some(0.0),
                    ..RawUnitInstance::default()
                },
            ],
            span: test_span(),
        };
        let outcome = process_unit(&raw, &ReportAll);
        let unit = outcome.value.unwrap();
        assert_eq!(unit.instance_names().collect::<Vec<_>>(), vec!["Metre", "Kilometre"]);
        assert_eq!(unit.instances["Metre"].plural, "Metres");
        assert_eq!(unit.si_reference().unwrap().name, "Metre");
        assert_eq!(outcome.diagnostics.len(), 2);
    }

    #[test]
    fn test_unit_requires_quantity() {
        let raw = RawUnit {
            name: Some("Length".into()),
            ..RawUnit::default()
        };
        let outcome = process_unit(&raw, &ReportAll);
        assert!(outcome.value.is_none());
        assert_eq!(outcome.diagnostics[0].kind, ErrorKind::MissingReference);
    }
}
