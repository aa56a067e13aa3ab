// src/rank.rs
//! Total order over leads: posting date desc (sentinel last), score desc,
//! identity key desc.

use std::cmp::Ordering;

use crate::lead::Lead;
use crate::reconcile::Store;

/// `Less` means `a` is listed before `b`.
pub fn compare(a: &Lead, b: &Lead) -> Ordering {
    b.posted_date
        .cmp(&a.posted_date)
        .then_with(|| b.score.total_cmp(&a.score))
        .then_with(|| b.identity_key.cmp(&a.identity_key))
}

pub fn rank(store: &Store) -> Vec<Lead> {
    let mut out: Vec<Lead> = store.iter().cloned().collect();
    out.sort_by(compare);
    out
}

/// Keep the best `max` records, drop the rest from the store.
/// Returns the dropped identity keys in rank order.
pub fn trim_to_capacity(store: &mut Store, max: usize) -> Vec<String> {
    if store.len() <= max {
        return Vec::new();
    }
    let dropped: Vec<String> = rank(store)
        .into_iter()
        .skip(max)
        .map(|l| l.identity_key)
        .collect();
    for key in &dropped {
        store.remove(key);
    }
    tracing::info!(target: "reconcile", dropped = dropped.len(), max, "store trimmed to capacity");
    dropped
}
