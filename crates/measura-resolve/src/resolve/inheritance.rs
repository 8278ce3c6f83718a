//! Inheritance resolution.
//!
//! Flattens a validated quantity and its ancestors into a [`Resolved`]
//! descriptor. Three kinds of property are resolved differently:
//!
//! 1. **Scalar properties** (implement-sum, difference, default unit, ...):
//!    first explicit value walking from the quantity toward its base, else
//!    the base default
//! 2. **Item lists** (derivations, constants, conversions, operations):
//!    concatenation of every level that opted in, requester first, never
//!    deduplicated
//! 3. **Unit instances**: set algebra over the levels that opted in, see
//!    [`units`](super::units)
//!
//! # Which Levels Contribute
//!
//! For a scalar, vector or group the contributing levels of a category are the
//! quantity itself, then each ancestor for as long as the level being left
//! has that category's inherit flag set.
//!
//! A group member walks its group's chain instead and tracks two gates per
//! category. At the requester, the member's own step always applies and its
//! group's step applies if the member inherits from its group. Moving up one
//! group level, with `anc` the ancestor group's member at the same dimension:
//!
//! ```text
//! member step  = member gate ∧ anc present
//! member gate' = member gate ∧ (anc absent ∨ anc inherits from members)
//! group gate   = (anc present ∧ anc inherits from group) ∨ group below inherits
//! ```
//!
//! The group gate of a level does not depend on the gates below it, so a
//! closed gate can reopen further up and every group level is visited. A
//! missing ancestor member is not an error; only its step is skipped.
//!
//! # Pipeline Position
//!
//! ```text
//! Process → Build → Check ⟲ → Validate → Build → Resolve
//!                                                ^^^^^^^
//!                                                YOU ARE HERE
//! ```

use measura_ast::model::{Category, Overrides, Powers, Role};
use measura_ast::{
    Capability, QuantityType, Resolved, ResolvedGroup, ResolvedQuantity, TypeName,
};

use super::chain::{group_levels, Chain, GroupLevel};
use super::population::Population;
use super::units;

/// Levels whose local items or unit steps apply to `quantity` for `category`,
/// requester first.
///
/// Returns `None` when the quantity's chain is broken.
pub fn contributors<'a>(
    quantity: &'a QuantityType,
    population: &'a Population,
    category: Category,
) -> Option<Vec<&'a QuantityType>> {
    match &quantity.role {
        Role::Member {
            from_group,
            from_members,
            ..
        } => {
            let levels = group_levels(quantity, population)?;
            Some(member_contributors(
                quantity,
                &levels,
                category,
                from_group.get(category),
                from_members.get(category),
            ))
        }
        _ => {
            let chain = Chain::walk(quantity, population);
            if !chain.is_complete() {
                return None;
            }
            let mut levels = vec![quantity];
            for pair in chain.levels.windows(2) {
                if !pair[0].inherit_flags().get(category) {
                    break;
                }
                levels.push(pair[1]);
            }
            Some(levels)
        }
    }
}

fn member_flags(member: &QuantityType, category: Category) -> (bool, bool) {
    match &member.role {
        Role::Member {
            from_group,
            from_members,
            ..
        } => (from_group.get(category), from_members.get(category)),
        _ => (false, false),
    }
}

fn member_contributors<'a>(
    requester: &'a QuantityType,
    levels: &[GroupLevel<'a>],
    category: Category,
    from_group: bool,
    from_members: bool,
) -> Vec<&'a QuantityType> {
    let mut contributions = vec![requester];
    let Some(first) = levels.first() else {
        return contributions;
    };

    let mut member_gate = from_members;
    if from_group {
        contributions.push(first.group);
    }

    for pair in levels.windows(2) {
        let (below, level) = (pair[0], pair[1]);
        let (anc_from_group, anc_from_members) = level
            .member
            .map(|m| member_flags(m, category))
            .unwrap_or((false, true));
        let member_step = member_gate && level.member.is_some();

        let group_gate = (level.member.is_some() && anc_from_group)
            || below.group.inherit_flags().get(category);

        if group_gate {
            contributions.push(level.group);
        }
        if let (true, Some(member)) = (member_step, level.member) {
            contributions.push(member);
        }

        member_gate = member_gate && anc_from_members;
    }

    contributions
}

/// Concatenate one item list over the contributing levels.
///
/// With `only_inherited` the requester's own items are left out.
pub fn collect<T: Clone>(
    quantity: &QuantityType,
    population: &Population,
    category: Category,
    only_inherited: bool,
    items: impl Fn(&QuantityType) -> &[T],
) -> Option<Vec<T>> {
    let levels = contributors(quantity, population, category)?;
    let skip = usize::from(only_inherited);
    Some(
        levels
            .into_iter()
            .skip(skip)
            .flat_map(|level| items(level).iter().cloned())
            .collect(),
    )
}

/// Levels searched for scalar properties, requester first.
///
/// A member searches itself and then its group chain.
fn scalar_levels<'a>(
    quantity: &'a QuantityType,
    population: &'a Population,
) -> Option<Vec<&'a QuantityType>> {
    match quantity.membership() {
        Some(_) => {
            let levels = group_levels(quantity, population)?;
            let mut search = vec![quantity];
            search.extend(levels.iter().map(|l| l.group));
            Some(search)
        }
        None => {
            let chain = Chain::walk(quantity, population);
            chain.is_complete().then_some(chain.levels)
        }
    }
}

/// First explicit value of a scalar property and the depth it was found at.
///
/// Depth 0 is the requester. With `skip_self` the requester is not searched,
/// giving the value the quantity would inherit without its own override.
pub fn search<T>(
    quantity: &QuantityType,
    population: &Population,
    skip_self: bool,
    get: impl Fn(&Overrides) -> Option<T>,
) -> Option<(T, usize)> {
    let levels = scalar_levels(quantity, population)?;
    levels
        .iter()
        .enumerate()
        .skip(usize::from(skip_self))
        .find_map(|(depth, level)| get(&level.overrides).map(|value| (value, depth)))
}

/// Resolve the difference quantity.
///
/// Defaults to the requester itself. A member inheriting a group's
/// difference takes that group's member of the same dimension instead.
pub fn resolve_difference(quantity: &QuantityType, population: &Population) -> TypeName {
    let found = search(quantity, population, false, |o| o.difference.clone());
    match (found, quantity.membership()) {
        (Some((difference, depth)), Some((_, dimension))) if depth > 0 => population
            .member(&difference, dimension)
            .map(|member| member.name.clone())
            .unwrap_or_else(|| quantity.name.clone()),
        (Some((difference, _)), _) => difference,
        (None, _) => quantity.name.clone(),
    }
}

/// Resolved value of a boolean property, defaulting to `true` at the base.
pub fn resolve_flag(
    quantity: &QuantityType,
    population: &Population,
    get: impl Fn(&Overrides) -> Option<bool>,
) -> bool {
    search(quantity, population, false, get)
        .map(|(value, _)| value)
        .unwrap_or(true)
}

fn first<T>(
    quantity: &QuantityType,
    population: &Population,
    get: impl Fn(&Overrides) -> Option<T>,
) -> Option<T> {
    search(quantity, population, false, get).map(|(value, _)| value)
}

fn resolve_powers(quantity: &QuantityType, population: &Population) -> Powers {
    Powers {
        reciprocal: first(quantity, population, |o| o.powers.reciprocal.clone()),
        square: first(quantity, population, |o| o.powers.square.clone()),
        cube: first(quantity, population, |o| o.powers.cube.clone()),
        square_root: first(quantity, population, |o| o.powers.square_root.clone()),
        cube_root: first(quantity, population, |o| o.powers.cube_root.clone()),
    }
}

/// The unit of the base at the end of the quantity's chain.
pub fn owning_unit<'a>(
    quantity: &'a QuantityType,
    population: &'a Population,
) -> Option<&'a TypeName> {
    let start = match quantity.membership() {
        Some((group, _)) => population.quantity(group)?,
        None => quantity,
    };
    Chain::walk(start, population).base()?.unit()
}

/// Dimension of a vector or member; the nearest declared one for vector specializations.
pub fn dimension_of(quantity: &QuantityType, population: &Population) -> Option<u8> {
    match quantity.capability {
        Capability::GroupMember => quantity.own_dimension(),
        Capability::Vector => Chain::walk(quantity, population)
            .levels
            .iter()
            .find_map(|level| level.dimension),
        Capability::Scalar | Capability::VectorGroup => None,
    }
}

/// Resolve one quantity against a population.
///
/// Returns `None` when the quantity's chain or unit cannot be found. The
/// validator excludes such quantities, so this only happens for populations
/// that were not validated.
pub fn resolve(quantity: &QuantityType, population: &Population) -> Option<Resolved> {
    let unit = owning_unit(quantity, population)?;
    let unit_type = population.unit(unit)?;

    let derivations = collect(quantity, population, Category::Derivations, false, |q| {
        q.derivations.as_slice()
    })?;
    let constants = collect(quantity, population, Category::Constants, false, |q| {
        q.constants.as_slice()
    })?;
    let conversions = collect(quantity, population, Category::Conversions, false, |q| {
        q.conversions.as_slice()
    })?;
    let operations = collect(quantity, population, Category::Operations, false, |q| {
        q.operations.as_slice()
    })?;
    let unit_instances = units::resolve_instances(quantity, population, unit_type, false)?;

    let scalar = if quantity.capability.is_vector_family() {
        first(quantity, population, |o| o.scalar.clone())
    } else {
        None
    };
    let powers = if quantity.capability == Capability::Scalar {
        resolve_powers(quantity, population)
    } else {
        Powers::default()
    };

    let descriptor = ResolvedQuantity {
        name: quantity.name.clone(),
        span: quantity.span,
        capability: quantity.capability,
        unit: unit.clone(),
        original: quantity.original().cloned(),
        group: quantity.membership().map(|(group, _)| group.clone()),
        dimension: dimension_of(quantity, population),
        implement_sum: resolve_flag(quantity, population, |o| o.implement_sum),
        implement_difference: resolve_flag(quantity, population, |o| o.implement_difference),
        difference: resolve_difference(quantity, population),
        default_unit_name: first(quantity, population, |o| o.default_unit_name.clone()),
        default_unit_symbol: first(quantity, population, |o| o.default_unit_symbol.clone()),
        generate_documentation: resolve_flag(quantity, population, |o| o.generate_documentation),
        scalar,
        powers,
        derivations,
        constants,
        conversions,
        operations,
        unit_instances,
    };

    if quantity.is_group() {
        let members = population
            .members_of(&quantity.name)
            .cloned()
            .unwrap_or_default();
        return Some(Resolved::Group(ResolvedGroup {
            descriptor,
            members,
        }));
    }
    Some(Resolved::Quantity(descriptor))
}
