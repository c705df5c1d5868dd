//! # Confinement Resolver
//!
//! Derives the set of confinement contexts to validate against by scanning
//! every `confine` mapping in the merged view and expanding the combined
//! settings combinatorially.
//!
//! The enumeration is deliberately NOT a true Cartesian product: each
//! setting's list is indexed by `i mod len`, with `i` running up to the
//! product of all list lengths. When list lengths differ, shorter lists
//! cycle, so some combinations repeat while others are never produced.
//! Downstream content depends on the coverage this produces; do not
//! substitute a mathematically complete product.

use indexmap::IndexMap;

use cmlint_core::Value;

/// One concrete assignment of confinement-setting name to a single value.
pub type ConfinementContext = IndexMap<String, Value>;

/// Sections whose entries may carry a `confine` mapping.
pub const CONFINABLE_SECTIONS: [&str; 3] = ["profiles", "ce", "checks"];

/// Enumerate every confinement context discoverable in the merged view.
///
/// Returns an empty vector when no entry carries a confine mapping; the
/// driver then compiles unconfined only.
pub fn enumerate_contexts(merged: &Value) -> Vec<ConfinementContext> {
    let combined = combined_confines(merged);
    if combined.is_empty() {
        return Vec::new();
    }

    // Each setting's allowed values as a list, scalars wrapped as singletons.
    let settings: Vec<(&String, Vec<&Value>)> = combined
        .iter()
        .map(|(name, allowed)| (name, as_value_list(allowed)))
        .collect();

    let total: usize = settings.iter().map(|(_, values)| values.len()).product();

    let mut contexts = Vec::with_capacity(total);
    for i in 0..total {
        let mut context = ConfinementContext::new();
        for (name, values) in &settings {
            context.insert((*name).clone(), values[i % values.len()].clone());
        }
        contexts.push(context);
    }
    contexts
}

/// Merge every discovered confine mapping into one combined mapping of
/// setting name to value-or-list.
fn combined_confines(merged: &Value) -> IndexMap<String, Value> {
    let mut combined = Value::mapping();
    for section in CONFINABLE_SECTIONS {
        let Some(entries) = merged.get(section).and_then(|s| s.as_mapping().ok()) else {
            continue;
        };
        for entry in entries.values() {
            if let Some(confine) = entry.get("confine") {
                if confine.as_mapping().is_ok() {
                    combined.deep_merge(confine);
                }
            }
        }
    }
    match combined {
        Value::Mapping(map) => map,
        _ => IndexMap::new(),
    }
}

/// View a confine value as a list, wrapping a scalar in a singleton.
pub fn as_value_list(value: &Value) -> Vec<&Value> {
    match value {
        Value::Sequence(seq) => seq.iter().collect(),
        scalar => vec![scalar],
    }
}
