//! Overlap clustering for one week's occurrences.
//!
//! Two active occurrences conflict when they belong to different courses,
//! fall on the same day, and their half-open time intervals intersect
//! (`a.start < b.end && b.start < a.end`). Back-to-back meetings where one
//! ends exactly when the next starts are NOT conflicts. Transitive overlaps
//! collapse into one cluster via union-find.

use std::collections::HashMap;

use crate::dsu::DisjointSet;
use crate::model::Occurrence;

/// Annotate overlap clusters in place.
///
/// Only active occurrences (enabled and not skipped) participate; the rest
/// pass through untouched and are never marked conflicting. Every member of a
/// cluster of size >= 2 gets `is_conflict = true` and a shared group id.
/// Group ids are `conflict-1`, `conflict-2`, ... numbered in the order each
/// cluster's representative first appears in input order, so re-running on an
/// unchanged slice reproduces identical labels.
pub fn detect_conflicts(items: &mut [Occurrence]) {
    let active: Vec<usize> = items
        .iter()
        .enumerate()
        .filter(|(_, item)| item.enabled && !item.skip)
        .map(|(index, _)| index)
        .collect();

    let mut dsu = DisjointSet::new(items.len());

    // Pairwise over active occurrences only; one week holds tens of items,
    // not thousands, so O(n^2) is fine.
    for (position, &index_a) in active.iter().enumerate() {
        for &index_b in &active[position + 1..] {
            let a = &items[index_a];
            let b = &items[index_b];
            if a.course_id == b.course_id {
                continue;
            }
            if a.day_of_week != b.day_of_week {
                continue;
            }
            if a.start_time < b.end_time && b.start_time < a.end_time {
                dsu.union(index_a, index_b);
            }
        }
    }

    // Group members by representative, preserving first-encounter order.
    let mut group_order: Vec<usize> = Vec::new();
    let mut members_by_root: HashMap<usize, Vec<usize>> = HashMap::new();
    for &index in &active {
        let root = dsu.find(index);
        let members = members_by_root.entry(root).or_insert_with(|| {
            group_order.push(root);
            Vec::new()
        });
        members.push(index);
    }

    let mut conflict_counter = 1;
    for root in group_order {
        let members = &members_by_root[&root];
        if members.len() <= 1 {
            continue;
        }
        let group_id = format!("conflict-{conflict_counter}");
        conflict_counter += 1;
        for &member in members {
            items[member].is_conflict = true;
            items[member].conflict_group_id = Some(group_id.clone());
        }
    }
}
