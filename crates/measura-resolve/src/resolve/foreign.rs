//! Merging definitions from other compilations.
//!
//! Foreign definitions come from metadata exported by earlier compilations.
//! They are trusted: their diagnostics were reported where they were
//! compiled, so nothing here reports anything. A foreign entity whose
//! identity is already taken locally is dropped, and the local one wins.
//!
//! Units and base quantities attach immediately. Specializations and members
//! attach once the quantity they hang from is present, which may itself be
//! a foreign quantity attached in an earlier pass. Whatever is still
//! unattached when a pass makes no progress is left out.

use std::collections::VecDeque;

use measura_ast::{Definition, QuantityType, TypeName};
use tracing::debug;

use super::population::{Population, PopulationBuilder};

/// Quantity a foreign quantity needs before it can attach.
fn anchor(quantity: &QuantityType) -> Option<&TypeName> {
    quantity
        .membership()
        .map(|(group, _)| group)
        .or_else(|| quantity.original())
}

/// Merge a foreign population into a local one.
pub fn merge(local: &Population, foreign: &Population) -> Population {
    let mut builder = PopulationBuilder::from_population(local);
    let mut pending: VecDeque<&QuantityType> = VecDeque::new();

    for unit in foreign.units() {
        builder.add_foreign(Definition::Unit(unit.clone()));
    }
    for quantity in foreign.quantities() {
        if anchor(quantity).is_none() {
            builder.add_foreign(Definition::Quantity(quantity.clone()));
        } else {
            pending.push_back(quantity);
        }
    }

    loop {
        let before = pending.len();
        let mut waiting = VecDeque::with_capacity(before);
        while let Some(quantity) = pending.pop_front() {
            match anchor(quantity) {
                Some(parent) if !builder.contains_quantity(parent) => waiting.push_back(quantity),
                _ => {
                    builder.add_foreign(Definition::Quantity(quantity.clone()));
                }
            }
        }
        pending = waiting;
        if pending.is_empty() || pending.len() == before {
            break;
        }
    }

    for quantity in &pending {
        debug!(
            quantity = %quantity.name,
            "foreign quantity left out: '{}' is not available",
            anchor(quantity).map(|a| a.to_string()).unwrap_or_default()
        );
    }

    builder.finish()
}
