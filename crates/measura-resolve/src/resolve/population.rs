//! Population construction.
//!
//! Folds processed definitions into a read-only [`Population`]: one identity
//! space shared by units and quantities, plus the member index of every
//! vector group.
//!
//! # Rules
//!
//! - The first definition of an identity wins; later ones are recorded as
//!   [`Duplicate`]s and excluded from lookups
//! - Every group, base or specialization, gets a member map, empty if it has
//!   no members
//! - A member claims its `(group, dimension)` slot on a first-writer-wins
//!   basis; a member losing the race is a duplicate too
//!
//! # Pipeline Position
//!
//! ```text
//! Process → Build → Check ⟲ → Validate → Build → Resolve
//!           ^^^^^                        ^^^^^
//!              YOU ARE HERE (both)
//! ```
//!
//! Building is the barrier of the pipeline. [`PopulationBuilder`] is the only
//! way to make a [`Population`], and a population only exists once
//! [`PopulationBuilder::finish`] has folded every definition in.

use std::collections::{BTreeMap, HashSet};

use indexmap::IndexMap;
use measura_ast::{Definition, QuantityType, Span, TypeName, UnitType};

use crate::error::{CompileError, DiagnosticPolicy, Diagnostics, ErrorKind};

/// A definition excluded because its identity or member slot was taken.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Duplicate {
    pub name: TypeName,
    /// Span of the definition that was kept
    pub kept: Span,
    pub rejected: Span,
    /// For member conflicts: the group and dimension both claimed
    pub slot: Option<(TypeName, u8)>,
    /// Name of the member holding the slot, for member conflicts
    pub holder: Option<TypeName>,
}

/// Indexed, immutable set of committed entities.
#[derive(Debug, Clone, Default)]
pub struct Population {
    units: IndexMap<TypeName, UnitType>,
    quantities: IndexMap<TypeName, QuantityType>,
    members: IndexMap<TypeName, BTreeMap<u8, TypeName>>,
    foreign: HashSet<TypeName>,
    duplicates: Vec<Duplicate>,
}

impl Population {
    /// Build a population from processed definitions in one step.
    pub fn build(definitions: impl IntoIterator<Item = Definition>) -> Self {
        let mut builder = PopulationBuilder::new();
        for definition in definitions {
            builder.add(definition);
        }
        builder.finish()
    }

    pub fn unit(&self, name: &TypeName) -> Option<&UnitType> {
        self.units.get(name)
    }

    pub fn quantity(&self, name: &TypeName) -> Option<&QuantityType> {
        self.quantities.get(name)
    }

    pub fn units(&self) -> impl Iterator<Item = &UnitType> {
        self.units.values()
    }

    pub fn quantities(&self) -> impl Iterator<Item = &QuantityType> {
        self.quantities.values()
    }

    /// Members of a group by dimension; `None` only if `group` is not a known group.
    pub fn members_of(&self, group: &TypeName) -> Option<&BTreeMap<u8, TypeName>> {
        self.members.get(group)
    }

    /// The member of `group` at `dimension`, if one is attached.
    pub fn member(&self, group: &TypeName, dimension: u8) -> Option<&QuantityType> {
        self.members
            .get(group)
            .and_then(|members| members.get(&dimension))
            .and_then(|name| self.quantities.get(name))
    }

    /// Whether the entity came from another compilation.
    pub fn is_foreign(&self, name: &TypeName) -> bool {
        self.foreign.contains(name)
    }

    pub fn duplicates(&self) -> &[Duplicate] {
        &self.duplicates
    }

    pub fn quantity_count(&self) -> usize {
        self.quantities.len()
    }

    pub fn unit_count(&self) -> usize {
        self.units.len()
    }

    /// Diagnostics for every locally defined duplicate.
    ///
    /// Both sides of a collision are reported: the rejected definition and the
    /// one that was kept.
    pub fn duplicate_diagnostics(&self, policy: &dyn DiagnosticPolicy) -> Vec<CompileError> {
        let mut diags = Diagnostics::new(policy);
        for duplicate in &self.duplicates {
            match (&duplicate.slot, &duplicate.holder) {
                (Some((group, dimension)), Some(holder)) => {
                    diags.push(
                        CompileError::new(
                            ErrorKind::DuplicateName,
                            duplicate.rejected,
                            format!(
                                "group '{}' already has a member of dimension {} ('{}')",
                                group, dimension, holder
                            ),
                        )
                        .for_entity(duplicate.name.clone())
                        .with_label(duplicate.kept, "dimension first claimed here"),
                    );
                    diags.push(
                        CompileError::new(
                            ErrorKind::DuplicateName,
                            duplicate.kept,
                            format!(
                                "'{}' and '{}' both claim dimension {} of group '{}'",
                                holder, duplicate.name, dimension, group
                            ),
                        )
                        .for_entity(holder.clone())
                        .with_label(duplicate.rejected, "also claimed here"),
                    );
                }
                _ => {
                    diags.push(
                        CompileError::new(
                            ErrorKind::DuplicateName,
                            duplicate.rejected,
                            format!("'{}' is already defined", duplicate.name),
                        )
                        .for_entity(duplicate.name.clone())
                        .with_label(duplicate.kept, "first defined here"),
                    );
                    diags.push(
                        CompileError::new(
                            ErrorKind::DuplicateName,
                            duplicate.kept,
                            format!("'{}' is defined more than once", duplicate.name),
                        )
                        .for_entity(duplicate.name.clone())
                        .with_label(duplicate.rejected, "defined again here"),
                    );
                }
            }
        }
        diags.into_vec()
    }
}

/// Accumulates definitions until [`finish`](Self::finish) produces a population.
#[derive(Debug, Default)]
pub struct PopulationBuilder {
    units: IndexMap<TypeName, UnitType>,
    quantities: IndexMap<TypeName, QuantityType>,
    foreign: HashSet<TypeName>,
    duplicates: Vec<Duplicate>,
}

impl PopulationBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from the entities of an existing population.
    ///
    /// Member attachment is recomputed by [`finish`](Self::finish).
    pub fn from_population(population: &Population) -> Self {
        Self {
            units: population.units.clone(),
            quantities: population.quantities.clone(),
            foreign: population.foreign.clone(),
            duplicates: population.duplicates.clone(),
        }
    }

    /// Whether an identity is already taken.
    pub fn contains(&self, name: &TypeName) -> bool {
        self.units.contains_key(name) || self.quantities.contains_key(name)
    }

    pub fn contains_quantity(&self, name: &TypeName) -> bool {
        self.quantities.contains_key(name)
    }

    fn existing_span(&self, name: &TypeName) -> Option<Span> {
        self.units
            .get(name)
            .map(|u| u.span)
            .or_else(|| self.quantities.get(name).map(|q| q.span))
    }

    /// Add a definition; returns `false` if its identity was taken.
    pub fn add(&mut self, definition: Definition) -> bool {
        if let Some(kept) = self.existing_span(definition.name()) {
            self.duplicates.push(Duplicate {
                name: definition.name().clone(),
                kept,
                rejected: definition.span(),
                slot: None,
                holder: None,
            });
            return false;
        }
        match definition {
            Definition::Unit(unit) => {
                self.units.insert(unit.name.clone(), unit);
            }
            Definition::Quantity(quantity) => {
                self.quantities.insert(quantity.name.clone(), quantity);
            }
        }
        true
    }

    /// Add a definition from another compilation.
    ///
    /// Identity collisions are not recorded: the existing entry wins silently.
    pub fn add_foreign(&mut self, definition: Definition) -> bool {
        if self.contains(definition.name()) {
            return false;
        }
        self.foreign.insert(definition.name().clone());
        match definition {
            Definition::Unit(unit) => {
                self.units.insert(unit.name.clone(), unit);
            }
            Definition::Quantity(quantity) => {
                self.quantities.insert(quantity.name.clone(), quantity);
            }
        }
        true
    }

    /// Seed the member index and attach members.
    pub fn finish(mut self) -> Population {
        let mut members: IndexMap<TypeName, BTreeMap<u8, TypeName>> = self
            .quantities
            .values()
            .filter(|q| q.is_group())
            .map(|q| (q.name.clone(), BTreeMap::new()))
            .collect();

        let mut losers = Vec::new();
        for quantity in self.quantities.values() {
            let Some((group, dimension)) = quantity.membership() else {
                continue;
            };
            let Some(slots) = members.get_mut(group) else {
                continue;
            };
            let Some(holder) = slots.get(&dimension).cloned() else {
                slots.insert(dimension, quantity.name.clone());
                continue;
            };
            let kept = self
                .quantities
                .get(&holder)
                .map(|h| h.span)
                .unwrap_or_default();
            losers.push(quantity.name.clone());
            if !self.foreign.contains(&quantity.name) {
                self.duplicates.push(Duplicate {
                    name: quantity.name.clone(),
                    kept,
                    rejected: quantity.span,
                    slot: Some((group.clone(), dimension)),
                    holder: Some(holder),
                });
            }
        }

        for loser in &losers {
            self.quantities.shift_remove(loser);
            self.foreign.remove(loser);
        }

        Population {
            units: self.units,
            quantities: self.quantities,
            members,
            foreign: self.foreign,
            duplicates: self.duplicates,
        }
    }
}
