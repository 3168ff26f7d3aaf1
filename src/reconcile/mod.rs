//! Merges the local overlay with the latest remote page.

pub mod filters;

pub use filters::{
    CharacterFilters, FilterValue, PlanetFilters, QueryFilters, RecordFilter, contains_ci,
};

use crate::core::{Entry, Record};
use std::collections::HashSet;

/// Builds the display set from overlay and remote records.
///
/// Filters run first. Among the records that match, overlay records come
/// first and shadow remote records with the same id. A remote record whose
/// overlay twin fails the filter therefore still shows. The output keeps the
/// overlay-then-remote order and holds at most one entry per id.
pub fn reconcile<T: Record>(overlay: &[T], remote: &[T], filters: &T::Filters) -> Vec<Entry<T>> {
    let mut seen = HashSet::with_capacity(overlay.len() + remote.len());

    overlay
        .iter()
        .cloned()
        .map(Entry::Local)
        .chain(remote.iter().cloned().map(Entry::Remote))
        .filter(|entry| filters.matches(entry.record()))
        .filter(|entry| seen.insert(entry.id()))
        .collect()
}
