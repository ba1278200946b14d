// src/index/autocomplete.rs
// Keys ending in `s` feed their singular: `resources` -> `resource`.
// A value is published only once it has been seen a second time.
use std::collections::{BTreeMap, HashSet};

use crate::models::server::{FieldValue, ServerRecord};

pub type AutocompleteIndex = BTreeMap<String, BTreeMap<String, u32>>;

#[derive(Debug, Default)]
pub struct AutocompleteIndexer {
    indexed: HashSet<String>,
    backing: AutocompleteIndex,
    index: AutocompleteIndex,
}

impl AutocompleteIndexer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns whether the published index changed.
    pub fn add(&mut self, record: &ServerRecord) -> bool {
        if !self.indexed.insert(record.end_point.clone()) {
            return false;
        }

        let mut changed = false;

        for (key, value) in record.data.fields() {
            changed |= self.add_field(key, value);
        }

        for (key, value) in &record.data.vars {
            changed |= self.add_field(key, FieldValue::Str(value));
        }

        changed
    }

    pub fn index(&self) -> &AutocompleteIndex {
        &self.index
    }

    fn add_field(&mut self, key: &str, value: FieldValue<'_>) -> bool {
        let mut changed = false;

        if let Some(singular) = key.strip_suffix('s') {
            let bits: Vec<&str> = match value {
                FieldValue::List(items) => items.iter().map(String::as_str).collect(),
                FieldValue::Map(map) => map.keys().map(String::as_str).collect(),
                FieldValue::Str(s) => s.split(',').map(str::trim).collect(),
                _ => Vec::new(),
            };

            let mut unique: Vec<&str> = Vec::with_capacity(bits.len());
            for bit in bits {
                if !bit.is_empty() && !unique.contains(&bit) {
                    unique.push(bit);
                }
            }

            changed |= self.add_entries(singular, &unique);
        }

        if let FieldValue::Str(s) = value {
            if !s.is_empty() {
                changed |= self.add_entries(key, &[s]);
            }
        }

        changed
    }

    fn add_entries(&mut self, key: &str, entries: &[&str]) -> bool {
        if entries.is_empty() {
            return false;
        }

        let Self { backing, index, .. } = self;
        let seen = backing.entry(key.to_string()).or_default();
        let mut changed = false;

        for entry in entries {
            let lower = entry.to_lowercase();
            let count = seen.entry(lower.clone()).or_insert(0);
            *count += 1;

            if *count > 1 {
                index.entry(key.to_string()).or_default().insert(lower, *count);
                changed = true;
            }
        }

        changed
    }
}
