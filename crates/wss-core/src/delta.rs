//! Index-aligned structural diff between two grid generations.
//!
//! Channels are first serialized to plain key-value maps, then compared
//! position by position: a position present only in the new sequence is
//! an insert, one present only in the old sequence is a delete, and a
//! position whose attribute maps differ is an update keyed by the changed
//! attribute names. Two sequences of equal length and equal attribute
//! values produce an empty delta.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::channel::ChannelState;

/// One differing position in the diff.
#[derive(Debug, Clone, PartialEq)]
pub enum DeltaEntry {
    /// Channel exists only in the current grid.
    Insert(ChannelState),
    /// Channel exists only in the previous grid.
    Delete(ChannelState),
    /// Channel changed; maps attribute name to `(old, new)`.
    Update(BTreeMap<String, (Value, Value)>),
}

/// Structural difference between two channel sequences, keyed by index.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Delta {
    entries: BTreeMap<usize, DeltaEntry>,
}

fn to_map(state: &ChannelState) -> Map<String, Value> {
    match serde_json::to_value(state) {
        Ok(Value::Object(map)) => map,
        // ChannelState is a plain struct of primitives; it always
        // serializes to an object.
        _ => Map::new(),
    }
}

fn diff_maps(old: &Map<String, Value>, new: &Map<String, Value>) -> BTreeMap<String, (Value, Value)> {
    let mut changed = BTreeMap::new();
    for (key, new_value) in new {
        match old.get(key) {
            Some(old_value) if old_value == new_value => {}
            Some(old_value) => {
                changed.insert(key.clone(), (old_value.clone(), new_value.clone()));
            }
            None => {
                changed.insert(key.clone(), (Value::Null, new_value.clone()));
            }
        }
    }
    changed
}

impl Delta {
    /// Diff `previous` against `current`. Length mismatch becomes
    /// inserts/deletes at the tail.
    pub fn between(previous: &[ChannelState], current: &[ChannelState]) -> Self {
        let mut entries = BTreeMap::new();
        let len = previous.len().max(current.len());

        for index in 0..len {
            match (previous.get(index), current.get(index)) {
                (Some(old), Some(new)) => {
                    let changed = diff_maps(&to_map(old), &to_map(new));
                    if !changed.is_empty() {
                        entries.insert(index, DeltaEntry::Update(changed));
                    }
                }
                (None, Some(new)) => {
                    entries.insert(index, DeltaEntry::Insert(new.clone()));
                }
                (Some(old), None) => {
                    entries.insert(index, DeltaEntry::Delete(old.clone()));
                }
                (None, None) => unreachable!("index bounded by the longer sequence"),
            }
        }

        Self { entries }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn entries(&self) -> &BTreeMap<usize, DeltaEntry> {
        &self.entries
    }

    /// True if any position was inserted or deleted.
    pub fn has_inserts_or_deletes(&self) -> bool {
        self.entries
            .values()
            .any(|e| matches!(e, DeltaEntry::Insert(_) | DeltaEntry::Delete(_)))
    }

    /// True if any update touches one of the named attributes.
    pub fn updates_touch(&self, keys: &[&str]) -> bool {
        self.entries.values().any(|entry| match entry {
            DeltaEntry::Update(changed) => keys.iter().any(|k| changed.contains_key(*k)),
            _ => false,
        })
    }
}
