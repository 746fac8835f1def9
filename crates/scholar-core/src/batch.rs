//! Fixed-size partitioning with keyed reassembly.
//!
//! Responses to partitioned requests may come back in any order, so results
//! are merged by a caller-supplied correlation key rather than by position.

use std::collections::HashMap;
use std::hash::Hash;

/// Split `items` into groups of at most `size` elements (a `size` of 0 is
/// treated as 1). Order inside and across groups is preserved.
pub fn partition<T>(items: &[T], size: usize) -> std::slice::Chunks<'_, T> {
    items.chunks(size.max(1))
}

/// Merge per-group `(key, value)` responses into one lookup. A key seen in
/// more than one group keeps the last value.
pub fn reassemble<K, V, G>(groups: impl IntoIterator<Item = G>) -> HashMap<K, V>
where
    K: Eq + Hash,
    G: IntoIterator<Item = (K, V)>,
{
    groups.into_iter().flatten().collect()
}
