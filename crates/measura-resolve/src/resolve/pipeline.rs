//! End-to-end resolution of a declaration set.
//!
//! # Pipeline Position
//!
//! ```text
//! local   → Process → Build ─┐
//!                            ├→ Merge → Check ⟲ → Validate → Build → Resolve
//! foreign → Process → Build ─┘
//! ```
//!
//! Every per-entity stage is independent of its siblings and runs on the
//! rayon pool when [`ResolveOptions::parallel`] is set. Building is the
//! barrier between stages.
//!
//! Entity checks repeat over the surviving quantities until none drops out,
//! so a quantity whose original was excluded is excluded with its own
//! diagnostic. Item references are then validated against the survivors
//! only, which leaves no resolved quantity pointing at an excluded one.
//!
//! Foreign declarations go through the same stages under the [`Silent`]
//! policy; whatever is wrong with them was reported where they were
//! compiled.

use std::collections::HashSet;

use indexmap::IndexMap;
use measura_ast::{Declaration, Definition, QuantityType, Resolved, TypeName};
use rayon::prelude::*;
use tracing::{debug, info};

use super::foreign;
use super::inheritance::resolve;
use super::population::{Population, PopulationBuilder};
use super::process::process;
use super::validation::{check_entity, validate_against};
use crate::cancel::CancellationToken;
use crate::error::{CompileError, DiagnosticPolicy, Outcome, Silent};

/// How a resolution pass runs.
#[derive(Debug, Clone)]
pub struct ResolveOptions {
    /// Run per-entity stages on the rayon pool
    pub parallel: bool,
    pub cancellation: CancellationToken,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            parallel: true,
            cancellation: CancellationToken::new(),
        }
    }
}

impl ResolveOptions {
    pub fn sequential() -> Self {
        Self {
            parallel: false,
            ..Self::default()
        }
    }
}

/// Everything a resolution pass produced.
#[derive(Debug, Clone)]
pub struct ResolveOutput {
    /// Descriptors of local quantities, in declaration order
    pub resolved: IndexMap<TypeName, Resolved>,
    /// Descriptors of foreign quantities that took part in the pass
    pub foreign: IndexMap<TypeName, Resolved>,
    pub diagnostics: Vec<CompileError>,
    /// The validated population resolution ran against
    pub population: Population,
    /// Set when the pass stopped early; unresolved entities are missing
    pub cancelled: bool,
}

impl ResolveOutput {
    pub fn get(&self, name: &TypeName) -> Option<&Resolved> {
        self.resolved.get(name).or_else(|| self.foreign.get(name))
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(CompileError::is_error)
    }
}

fn run_each<T, U, F>(items: &[T], parallel: bool, f: F) -> Vec<U>
where
    T: Sync,
    U: Send,
    F: Fn(&T) -> U + Sync + Send,
{
    if parallel {
        items.par_iter().map(f).collect()
    } else {
        items.iter().map(f).collect()
    }
}

/// Foreign quantities are checked silently.
fn policy_for<'p>(
    merged: &Population,
    quantity: &QuantityType,
    policy: &'p dyn DiagnosticPolicy,
) -> &'p dyn DiagnosticPolicy {
    if merged.is_foreign(&quantity.name) {
        &Silent
    } else {
        policy
    }
}

/// Population of `merged`'s units and the given quantities, keeping their origin.
fn rebuild(merged: &Population, quantities: impl IntoIterator<Item = QuantityType>) -> Population {
    let mut builder = PopulationBuilder::new();
    let units = merged.units().cloned().map(Definition::Unit);
    let quantities = quantities.into_iter().map(Definition::Quantity);
    for definition in units.chain(quantities) {
        if merged.is_foreign(definition.name()) {
            builder.add_foreign(definition);
        } else {
            builder.add(definition);
        }
    }
    builder.finish()
}

fn process_all(
    declarations: &[Declaration],
    policy: &dyn DiagnosticPolicy,
    parallel: bool,
    diagnostics: &mut Vec<CompileError>,
) -> Vec<Definition> {
    run_each(declarations, parallel, |declaration| process(declaration, policy))
        .into_iter()
        .filter_map(|outcome| outcome.drain_into(diagnostics))
        .collect()
}

/// Resolve one quantity unless the pass was cancelled.
pub fn resolve_entity(
    quantity: &QuantityType,
    population: &Population,
    cancellation: &CancellationToken,
) -> Option<Resolved> {
    if cancellation.is_cancelled() {
        return None;
    }
    resolve(quantity, population)
}

/// Run every stage over local and foreign declarations.
pub fn resolve_declarations(
    local: &[Declaration],
    foreign: &[Declaration],
    policy: &dyn DiagnosticPolicy,
    options: &ResolveOptions,
) -> ResolveOutput {
    let parallel = options.parallel;
    let mut diagnostics = Vec::new();

    // 1. Processing (Parallel)
    let local_definitions = process_all(local, policy, parallel, &mut diagnostics);
    let foreign_definitions = process_all(foreign, &Silent, parallel, &mut Vec::new());
    debug!(
        local = local_definitions.len(),
        foreign = foreign_definitions.len(),
        "declarations processed"
    );

    // 2. Build and merge
    let local_population = Population::build(local_definitions);
    diagnostics.extend(local_population.duplicate_diagnostics(policy));
    let foreign_population = Population::build(foreign_definitions);
    let merged = foreign::merge(&local_population, &foreign_population);
    debug!(
        quantities = merged.quantity_count(),
        units = merged.unit_count(),
        "population built"
    );

    // 3. Entity checks (Parallel), repeated until no quantity drops out
    let mut excluded: HashSet<TypeName> = HashSet::new();
    let mut survivors: Vec<QuantityType> = merged.quantities().cloned().collect();
    let mut checked = merged.clone();
    loop {
        let outcomes = run_each(&survivors, parallel, |quantity| {
            check_entity(quantity, &checked, &excluded, policy_for(&merged, quantity, policy))
        });
        let before = survivors.len();
        let mut kept = Vec::with_capacity(before);
        for (quantity, outcome) in survivors.into_iter().zip(outcomes) {
            if outcome.drain_into(&mut diagnostics).is_some() {
                kept.push(quantity);
            } else {
                excluded.insert(quantity.name.clone());
            }
        }
        survivors = kept;
        if survivors.len() == before {
            break;
        }
        checked = rebuild(&merged, survivors.iter().cloned());
    }
    debug!(
        survivors = survivors.len(),
        excluded = excluded.len(),
        "entity checks complete"
    );

    // 4. Item validation (Parallel) against the survivors, then rebuild
    let outcomes: Vec<Outcome<QuantityType>> = run_each(&survivors, parallel, |quantity| {
        validate_against(quantity, &checked, &excluded, policy_for(&merged, quantity, policy))
    });
    let validated: Vec<QuantityType> = outcomes
        .into_iter()
        .filter_map(|outcome| outcome.drain_into(&mut diagnostics))
        .collect();
    let population = rebuild(&merged, validated);
    debug!(quantities = population.quantity_count(), "validated population built");

    // 5. Resolution (Parallel)
    let quantities: Vec<&QuantityType> = population.quantities().collect();
    let cancellation = &options.cancellation;
    let results = run_each(&quantities, parallel, |quantity| {
        resolve_entity(quantity, &population, cancellation)
    });

    let mut resolved = IndexMap::new();
    let mut foreign_resolved = IndexMap::new();
    for (quantity, result) in quantities.iter().zip(results) {
        let Some(result) = result else {
            debug!(quantity = %quantity.name, "not resolved");
            continue;
        };
        if population.is_foreign(&quantity.name) {
            foreign_resolved.insert(quantity.name.clone(), result);
        } else {
            resolved.insert(quantity.name.clone(), result);
        }
    }

    let cancelled = cancellation.is_cancelled();
    info!(
        resolved = resolved.len(),
        foreign = foreign_resolved.len(),
        diagnostics = diagnostics.len(),
        cancelled,
        "resolution complete"
    );

    ResolveOutput {
        resolved,
        foreign: foreign_resolved,
        diagnostics,
        population,
        cancelled,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ErrorKind, ReportAll};
    use measura_ast::declaration::{RawQuantity, RawUnit, RawUnitInstance};
    use measura_ast::{Capability, Span};

    fn raw_unit(name: &str, instances: &[&str]) -> Declaration {
        Declaration::Unit(RawUnit {
            name: Some(name.to_string()),
            quantity: Some("Distance".to_string()),
            instances: instances
                .iter()
                .map(|i| RawUnitInstance {
                    name: Some(i.to_string()),
                    scale: Some(1.0),
                    ..RawUnitInstance::default()
                })
                .collect(),
            span: Span::zero(0),
        })
    }

    fn raw_quantity(name: &str, unit: Option<&str>, original: Option<&str>) -> RawQuantity {
        RawQuantity {
            name: Some(name.to_string()),
            capability: Capability::Scalar,
            unit: unit.map(String::from),
            original: original.map(String::from),
            ..RawQuantity::default()
        }
    }

    fn name(s: &str) -> TypeName {
        TypeName::parse(s).unwrap()
    }

    fn scenario() -> Vec<Declaration> {
        let mut height = raw_quantity("Height", None, Some("Distance"));
        height.exclude_units = vec!["Kilometre".to_string()];
        vec![
            raw_unit("Length", &["Metre", "Kilometre", "Millimetre"]),
            Declaration::Quantity(raw_quantity("Distance", Some("Length"), None)),
            Declaration::Quantity(height),
        ]
    }

    #[test]
    fn test_resolves_local_chain() {
        let output =
            resolve_declarations(&scenario(), &[], &ReportAll, &ResolveOptions::sequential());
        assert!(output.diagnostics.is_empty(), "{:?}", output.diagnostics);
        assert_eq!(output.resolved.len(), 2);

        let height = output.get(&name("Height")).unwrap().descriptor();
        assert_eq!(height.unit_instances, vec!["Metre", "Millimetre"]);
        assert_eq!(height.difference, name("Height"));
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let sequential =
            resolve_declarations(&scenario(), &[], &ReportAll, &ResolveOptions::sequential());
        let parallel =
            resolve_declarations(&scenario(), &[], &ReportAll, &ResolveOptions::default());
        assert_eq!(sequential.resolved, parallel.resolved);
    }

    #[test]
    fn test_foreign_declarations_are_silent() {
        let local = vec![Declaration::Quantity(raw_quantity("Height", None, Some("Distance")))];
        let mut broken = raw_quantity("Broken", None, None);
        broken.name = Some(String::new());
        let foreign = vec![
            raw_unit("Length", &["Metre"]),
            Declaration::Quantity(raw_quantity("Distance", Some("Length"), None)),
            Declaration::Quantity(broken),
            Declaration::Quantity(raw_quantity("Orphan", None, Some("Nothing"))),
        ];
        let output =
            resolve_declarations(&local, &foreign, &ReportAll, &ResolveOptions::sequential());

        assert!(output.diagnostics.is_empty(), "{:?}", output.diagnostics);
        assert!(output.resolved.contains_key(&name("Height")));
        assert!(output.foreign.contains_key(&name("Distance")));
        assert!(output.get(&name("Orphan")).is_none());
    }

    #[test]
    fn test_invalid_entities_excluded_and_reported() {
        let mut declarations = scenario();
        declarations.push(Declaration::Quantity(raw_quantity("Width", None, Some("Breadth"))));
        declarations.push(Declaration::Quantity(raw_quantity("Distance", Some("Length"), None)));
        let output =
            resolve_declarations(&declarations, &[], &ReportAll, &ResolveOptions::sequential());

        let kinds: Vec<ErrorKind> = output.diagnostics.iter().map(|d| d.kind).collect();
        assert_eq!(
            kinds,
            vec![
                ErrorKind::DuplicateName,
                ErrorKind::DuplicateName,
                ErrorKind::UndefinedQuantity
            ]
        );
        assert!(output.has_errors());
        assert!(output.get(&name("Width")).is_none());
        assert!(output.get(&name("Height")).is_some());
    }

    #[test]
    fn test_cancelled_pass_resolves_nothing() {
        let options = ResolveOptions::sequential();
        options.cancellation.cancel();
        let output = resolve_declarations(&scenario(), &[], &ReportAll, &options);
        assert!(output.cancelled);
        assert!(output.resolved.is_empty());
    }

    #[test]
    fn test_exclusion_propagates_down_the_chain() {
        let mut displacement = raw_quantity("Displacement", Some("Length"), None);
        displacement.capability = Capability::Vector;
        displacement.dimension = Some(3);
        let mut shift = raw_quantity("Shift", None, Some("Displacement"));
        shift.capability = Capability::Vector;
        shift.dimension = Some(2);
        let mut nudge = raw_quantity("Nudge", None, Some("Shift"));
        nudge.capability = Capability::Vector;

        let declarations = vec![
            raw_unit("Length", &["Metre"]),
            Declaration::Quantity(displacement),
            Declaration::Quantity(shift),
            Declaration::Quantity(nudge),
        ];
        let output =
            resolve_declarations(&declarations, &[], &ReportAll, &ResolveOptions::sequential());

        let reported: Vec<(ErrorKind, String)> = output
            .diagnostics
            .iter()
            .map(|d| (d.kind, d.entity.as_ref().map(|e| e.to_string()).unwrap_or_default()))
            .collect();
        assert_eq!(
            reported,
            vec![
                (ErrorKind::DimensionMismatch, "Shift".to_string()),
                (ErrorKind::UndefinedQuantity, "Nudge".to_string()),
            ]
        );
        assert!(output.diagnostics[1].message.contains("'Shift' was excluded"));
        assert_eq!(output.resolved.len(), 1);
        assert!(output.get(&name("Nudge")).is_none());
    }

    #[test]
    fn test_references_to_excluded_quantities_dropped() {
        let mut width = raw_quantity("Width", Some("Length"), None);
        width.conversions = vec!["Orphan".to_string(), "Distance".to_string()];
        let mut declarations = scenario();
        declarations.push(Declaration::Quantity(raw_quantity("Orphan", None, Some("Nothing"))));
        declarations.push(Declaration::Quantity(width));
        let output =
            resolve_declarations(&declarations, &[], &ReportAll, &ResolveOptions::sequential());

        let kinds: Vec<ErrorKind> = output.diagnostics.iter().map(|d| d.kind).collect();
        assert_eq!(
            kinds,
            vec![ErrorKind::UndefinedQuantity, ErrorKind::UndefinedQuantity]
        );
        assert!(output.diagnostics[1].message.contains("'Orphan' was excluded"));

        let width = output.get(&name("Width")).unwrap().descriptor();
        assert_eq!(width.conversions, vec![name("Distance")]);
        for resolved in output.resolved.values() {
            let descriptor = resolved.descriptor();
            assert!(descriptor.conversions.iter().all(|c| output.resolved.contains_key(c)));
        }
    }
}
