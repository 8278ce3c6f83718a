//! Unit-instance set algebra.
//!
//! The applicable instances of a quantity start as every instance of its
//! unit. Walking the contributing levels from the base down to the requester,
//! each level applies exactly one step:
//!
//! - a non-empty inclusion list intersects the set with it
//! - otherwise a non-empty exclusion list subtracts it from the set
//! - otherwise the set is unchanged
//!
//! Inclusion and exclusion never coexist on one level after processing, so
//! every level is a single intersection with some set. The result therefore
//! does not depend on how often or in which order it is evaluated.

use std::collections::HashSet;

use measura_ast::model::Category;
use measura_ast::{QuantityType, UnitType};

use super::inheritance::contributors;
use super::population::Population;

/// Apply one level's step to the accumulated set.
pub fn apply_step(set: &mut HashSet<String>, level: &QuantityType) {
    if !level.unit_inclusions.is_empty() {
        set.retain(|name| level.unit_inclusions.contains(name));
    } else if !level.unit_exclusions.is_empty() {
        for name in &level.unit_exclusions {
            set.remove(name);
        }
    }
}

/// Resolve the instance set of `quantity` as names in unit declaration order.
///
/// With `only_inherited` the requester's own step is skipped, which yields
/// the set its ancestors alone would produce.
pub fn resolve_instances(
    quantity: &QuantityType,
    population: &Population,
    unit: &UnitType,
    only_inherited: bool,
) -> Option<Vec<String>> {
    let levels = contributors(quantity, population, Category::Units)?;

    let mut set: HashSet<String> = unit.instance_names().map(String::from).collect();
    for level in levels.iter().skip(usize::from(only_inherited)).rev() {
        apply_step(&mut set, level);
    }

    Some(
        unit.instance_names()
            .filter(|name| set.contains(*name))
            .map(String::from)
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolve::test_support::*;
    use measura_ast::Definition;

    fn metric_unit() -> Definition {
        unit("Length", &["m", "km", "mm"])
    }

    fn instances(population: &Population, n: &str, only_inherited: bool) -> Vec<String> {
        let quantity = population.quantity(&name(n)).unwrap();
        let unit = population.unit(&name("Length")).unwrap();
        resolve_instances(quantity, population, unit, only_inherited).unwrap()
    }

    #[test]
    fn test_base_without_lists_has_all_units() {
        let population =
            Population::build(vec![metric_unit(), scalar_base("Distance", "Length").def()]);
        assert_eq!(instances(&population, "Distance", false), vec!["m", "km", "mm"]);
    }

    #[test]
    fn test_exclude_then_include() {
        let population = Population::build(vec![
            metric_unit(),
            scalar_base("Base", "Length").def(),
            scalar_spec("A", "Base").exclude(&["km"]).def(),
            scalar_spec("B", "A").include(&["m"]).def(),
        ]);
        assert_eq!(instances(&population, "A", false), vec!["m", "mm"]);
        assert_eq!(instances(&population, "B", false), vec!["m"]);
        assert_eq!(instances(&population, "B", true), vec!["m", "mm"]);
    }

    #[test]
    fn test_inherit_false_starts_from_full_set() {
        let population = Population::build(vec![
            metric_unit(),
            scalar_base("Base", "Length").def(),
            scalar_spec("A", "Base").exclude(&["km"]).def(),
            scalar_spec("B", "A").no_inherit(Category::Units).def(),
        ]);
        assert_eq!(instances(&population, "B", false), vec!["m", "km", "mm"]);
    }

    #[test]
    fn test_inclusion_cannot_reintroduce_excluded_unit() {
        let population = Population::build(vec![
            metric_unit(),
            scalar_base("Base", "Length").exclude(&["km"]).def(),
            scalar_spec("A", "Base").include(&["km", "m"]).def(),
        ]);
        assert_eq!(instances(&population, "A", false), vec!["m"]);
    }

    #[test]
    fn test_result_keeps_unit_order() {
        let population = Population::build(vec![
            metric_unit(),
            scalar_base("Base", "Length").include(&["mm", "m"]).def(),
        ]);
        assert_eq!(instances(&population, "Base", false), vec!["m", "mm"]);
    }

    #[test]
    fn test_member_of_specialized_group() {
        let population = Population::build(vec![
            unit("Length", &["a", "b"]),
            group_base("G", "Length").def(),
            group_spec("S", "G").exclude(&["b"]).def(),
            member("G3", "G", 3)
                .from_members_off(Category::Units)
                .def(),
            member("S3", "S", 3)
                .from_members_off(Category::Units)
                .def(),
        ]);
        assert_eq!(instances(&population, "S3", false), vec!["a"]);
        assert_eq!(instances(&population, "G3", false), vec!["a", "b"]);
    }

    #[test]
    fn test_member_applies_ancestor_member_step() {
        let population = Population::build(vec![
            unit("Length", &["a", "b", "c"]),
            group_base("G", "Length").def(),
            group_spec("S", "G").def(),
            member("G3", "G", 3).exclude(&["c"]).def(),
            member("S3", "S", 3).def(),
            member("S2", "S", 2).def(),
        ]);
        assert_eq!(instances(&population, "S3", false), vec!["a", "b"]);
        // no member of G at dimension 2: only the group steps apply
        assert_eq!(instances(&population, "S2", false), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_member_without_group_inheritance() {
        let population = Population::build(vec![
            unit("Length", &["a", "b"]),
            group_base("G", "Length").exclude(&["b"]).def(),
            member("G3", "G", 3).from_group_off(Category::Units).def(),
        ]);
        assert_eq!(instances(&population, "G3", false), vec!["a", "b"]);
    }

    #[test]
    fn test_group_step_above_member_not_taking_from_group() {
        let population = Population::build(vec![
            unit("Length", &["a", "b"]),
            group_base("G", "Length").exclude(&["b"]).def(),
            group_spec("S", "G").def(),
            member("S3", "S", 3).from_group_off(Category::Units).def(),
        ]);
        // S inherits from G, so G's exclusion applies to S3 without a G3
        assert_eq!(instances(&population, "S3", false), vec!["a"]);
    }

    #[test]
    fn test_ancestor_member_reopens_group_gate() {
        let population = Population::build(vec![
            unit("Length", &["a", "b"]),
            group_base("G", "Length").exclude(&["b"]).def(),
            group_spec("S", "G").no_inherit(Category::Units).def(),
            member("G3", "G", 3).def(),
            member("S3", "S", 3).from_members_off(Category::Units).def(),
        ]);
        // G3 takes units from G even though S does not inherit them
        assert_eq!(instances(&population, "S3", false), vec!["a"]);
    }
}
