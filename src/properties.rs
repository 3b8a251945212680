//! Property lists.
//!
//! Follows `namespace.rs`'s case-insensitive-name-keyed map convention,
//! with `Value` as the stored payload instead of a namespace slot.

use ahash::AHashMap;

use crate::{
    intern::{fold_case, StringId},
    value::Value,
};

/// Global map from (case-insensitive) plist name to its ordered property
/// pairs, also case-insensitive on the property name.
#[derive(Debug, Default)]
pub struct PropertyLists {
    lists: AHashMap<String, Vec<(StringId, String, Value)>>,
}

impl PropertyLists {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// `pprop name prop value`: overwrites an existing `(prop, value)` pair
    /// in place if `prop` already exists under `name`, otherwise appends.
    pub fn pprop(&mut self, name: &str, prop_id: StringId, prop: &str, value: Value) {
        let entries = self.lists.entry(fold_case(name)).or_default();
        let folded_prop = fold_case(prop);
        if let Some(slot) = entries.iter_mut().find(|(_, p, _)| *p == folded_prop) {
            slot.2 = value;
        } else {
            entries.push((prop_id, folded_prop, value));
        }
    }

    /// `gprop name prop`: the current value, or `None` if unset.
    #[must_use]
    pub fn gprop(&self, name: &str, prop: &str) -> Option<Value> {
        let folded_prop = fold_case(prop);
        self.lists.get(&fold_case(name))?.iter().find(|(_, p, _)| *p == folded_prop).map(|(_, _, v)| *v)
    }

    /// `remprop name prop`: deletes the pair if present.
    pub fn remprop(&mut self, name: &str, prop: &str) {
        let folded_prop = fold_case(prop);
        if let Some(entries) = self.lists.get_mut(&fold_case(name)) {
            entries.retain(|(_, p, _)| *p != folded_prop);
        }
    }

    /// `plist name`: a flat `[p v p v ...]` list of the property names
    /// (as their originally interned atoms) and values, materialised fresh
    /// on each call.
    #[must_use]
    pub fn plist(&self, name: &str) -> Vec<(StringId, Value)> {
        self.lists.get(&fold_case(name)).map(|entries| entries.iter().map(|(id, _, v)| (*id, *v)).collect()).unwrap_or_default()
    }

    /// Every property list's name and its (property, printed value) pairs,
    /// for session snapshotting.
    #[must_use]
    pub fn snapshot_all(&self, heap: &crate::heap::Heap, interns: &crate::intern::Interner) -> Vec<(String, Vec<(String, String)>)> {
        self.lists
            .iter()
            .map(|(name, entries)| {
                let pairs = entries.iter().map(|(prop_id, _, value)| (interns.get(*prop_id).to_owned(), value.display(heap, interns))).collect();
                (name.clone(), pairs)
            })
            .collect()
    }
}
