//! Specialization chain walks.
//!
//! Every stage that looks up the inheritance of a quantity walks the same
//! single-parent chain: the quantity, its original, that one's original, and
//! so on up to a base. [`Chain`] collects those levels once and records how
//! the walk ended, so callers never recurse over the population themselves.
//!
//! Each walk carries a visited set. A chain that loops back on itself ends
//! with [`ChainEnd::Cycle`] instead of running forever.

use std::collections::HashSet;

use measura_ast::{QuantityType, TypeName};

use super::population::Population;

/// How a chain walk ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainEnd {
    /// Reached a base quantity (the last level)
    Base,
    /// The named original is not in the population
    Missing(TypeName),
    /// The named original was already visited
    Cycle(TypeName),
    /// Reached a group member, which has no original of its own
    Member,
}

/// Levels of a specialization chain, requester first.
#[derive(Debug, Clone)]
pub struct Chain<'a> {
    pub levels: Vec<&'a QuantityType>,
    pub end: ChainEnd,
}

impl<'a> Chain<'a> {
    /// Walk from `start` toward its base.
    pub fn walk(start: &'a QuantityType, population: &'a Population) -> Self {
        let mut levels = vec![start];
        let mut visited: HashSet<&TypeName> = HashSet::from([&start.name]);
        let mut current = start;

        let end = loop {
            if current.membership().is_some() {
                break ChainEnd::Member;
            }
            let Some(original) = current.original() else {
                break ChainEnd::Base;
            };
            if !visited.insert(original) {
                break ChainEnd::Cycle(original.clone());
            }
            let Some(parent) = population.quantity(original) else {
                break ChainEnd::Missing(original.clone());
            };
            levels.push(parent);
            current = parent;
        };

        Self { levels, end }
    }

    /// The base at the end of a well-formed chain.
    pub fn base(&self) -> Option<&'a QuantityType> {
        match self.end {
            ChainEnd::Base => self.levels.last().copied(),
            _ => None,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.end == ChainEnd::Base
    }

    /// Levels above the requester.
    pub fn ancestors(&self) -> &[&'a QuantityType] {
        &self.levels[1..]
    }

    /// Format the names of the chain for cycle diagnostics, e.g. `A → B → A`.
    pub fn describe(&self) -> String {
        let mut names: Vec<String> = self.levels.iter().map(|q| q.name.to_string()).collect();
        if let ChainEnd::Cycle(name) | ChainEnd::Missing(name) = &self.end {
            names.push(name.to_string());
        }
        names.join(" → ")
    }
}

/// One step of a group member's walk: a group of the owning group's chain and
/// the member of that group at the requester's dimension, if any.
#[derive(Debug, Clone, Copy)]
pub struct GroupLevel<'a> {
    pub group: &'a QuantityType,
    pub member: Option<&'a QuantityType>,
}

/// Group levels for a member, starting with its own group and itself.
///
/// Returns `None` when the member's group is absent or its chain does not
/// reach a base.
pub fn group_levels<'a>(
    member: &'a QuantityType,
    population: &'a Population,
) -> Option<Vec<GroupLevel<'a>>> {
    let (group_name, dimension) = member.membership()?;
    let group = population.quantity(group_name)?;
    let chain = Chain::walk(group, population);
    if !chain.is_complete() {
        return None;
    }

    let levels = chain
        .levels
        .iter()
        .enumerate()
        .map(|(i, &group)| GroupLevel {
            group,
            member: if i == 0 {
                Some(member)
            } else {
                population.member(&group.name, dimension)
            },
        })
        .collect();
    Some(levels)
}

#[cfg(test)]
mod tests {
    use super::*;
    use measura_ast::model::{InheritFlags, Overrides};
    use measura_ast::{Capability, Definition, Role, Span};

    fn name(s: &str) -> TypeName {
        TypeName::parse(s).unwrap()
    }

    fn scalar(n: &str, original: Option<&str>) -> Definition {
        let role = match original {
            Some(o) => Role::Specialization {
                original: name(o),
                inherit: InheritFlags::default(),
            },
            None => Role::Base { unit: name("Length") },
        };
        Definition::Quantity(QuantityType {
            name: name(n),
            span: Span::zero(0),
            capability: Capability::Scalar,
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

    #[test]
    fn test_walk_to_base() {
        let population = Population::build(vec![
            scalar("Distance", None),
            scalar("Height", Some("Distance")),
            scalar("Altitude", Some("Height")),
        ]);
        let start = population.quantity(&name("Altitude")).unwrap();
        let chain = Chain::walk(start, &population);
        assert!(chain.is_complete());
        assert_eq!(chain.levels.len(), 3);
        assert_eq!(chain.base().unwrap().name, name("Distance"));
        assert_eq!(chain.ancestors().len(), 2);
    }

    #[test]
    fn test_walk_missing_original() {
        let population = Population::build(vec![scalar("Height", Some("Distance"))]);
        let start = population.quantity(&name("Height")).unwrap();
        let chain = Chain::walk(start, &population);
        assert_eq!(chain.end, ChainEnd::Missing(name("Distance")));
        assert!(chain.base().is_none());
    }

    #[test]
    fn test_walk_detects_cycle() {
        let population = Population::build(vec![
            scalar("A", Some("B")),
            scalar("B", Some("C")),
            scalar("C", Some("A")),
        ]);
        let start = population.quantity(&name("A")).unwrap();
        let chain = Chain::walk(start, &population);
        assert_eq!(chain.end, ChainEnd::Cycle(name("A")));
        assert_eq!(chain.describe(), "A → B → C → A");
    }

    #[test]
    fn test_walk_detects_self_cycle() {
        let population = Population::build(vec![scalar("A", Some("A"))]);
        let start = population.quantity(&name("A")).unwrap();
        let chain = Chain::walk(start, &population);
        assert_eq!(chain.end, ChainEnd::Cycle(name("A")));
        assert_eq!(chain.levels.len(), 1);
    }
}
