//! Overload selection by argument count.

use crate::argument::ArgumentSchema;

/// A candidate overload and how well it fits.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OverloadMatch {
    /// Position of the overload in declaration order.
    pub index: usize,
    /// Required arguments of the overload (higher = more specific).
    pub specificity: usize,
}

/// Lists the overloads that can take `provided` raw arguments, most
/// specific first.
///
/// Specificity is the number of required arguments. The sort is stable, so
/// overloads of equal specificity stay in declaration order.
#[must_use]
pub fn feasible_overloads(overloads: &[ArgumentSchema], provided: usize) -> Vec<OverloadMatch> {
    let mut matches: Vec<OverloadMatch> = overloads
        .iter()
        .enumerate()
        .filter(|(_, schema)| schema.accepts(provided))
        .map(|(index, schema)| OverloadMatch {
            index,
            specificity: schema.required(),
        })
        .collect();
    matches.sort_by(|a, b| b.specificity.cmp(&a.specificity));
    matches
}

/// Picks the overload to bind `provided` raw arguments against.
///
/// Returns `None` when no overload accepts that many arguments.
#[must_use]
pub fn select_overload(overloads: &[ArgumentSchema], provided: usize) -> Option<usize> {
    feasible_overloads(overloads, provided)
        .first()
        .map(|m| m.index)
}
