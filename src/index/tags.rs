// src/index/tags.rs
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};

use crate::index::locale::{canonical_locale, ROOT_LOCALE};
use crate::models::server::ServerRecord;

/// Published tag and locale frequencies.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagSnapshot {
    pub tags: BTreeMap<String, u32>,
    pub locales: BTreeMap<String, u32>,
}

/// Splits the comma separated `tags` variable into trimmed, lowercased,
/// de-duplicated tags.
pub fn server_tags(record: &ServerRecord) -> BTreeSet<String> {
    record
        .data
        .var("tags")
        .map(|raw| {
            raw.split(',')
                .map(|tag| tag.trim().to_lowercase())
                .filter(|tag| !tag.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

#[derive(Debug, Default)]
pub struct TagIndexer {
    indexed: HashSet<String>,
    index: BTreeMap<String, u32>,
}

impl TagIndexer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts each tag once per endpoint. Servers without tags are not
    /// remembered, so a later record for the same endpoint can still count.
    pub fn add(&mut self, record: &ServerRecord) -> bool {
        if self.indexed.contains(&record.end_point) || record.data.var("tags").is_none() {
            return false;
        }

        for tag in server_tags(record) {
            *self.index.entry(tag).or_insert(0) += 1;
        }

        self.indexed.insert(record.end_point.clone());
        true
    }

    pub fn index(&self) -> &BTreeMap<String, u32> {
        &self.index
    }
}

#[derive(Debug, Default)]
pub struct LocaleIndexer {
    indexed: HashSet<String>,
    index: BTreeMap<String, u32>,
}

impl LocaleIndexer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, record: &ServerRecord) -> bool {
        if self.indexed.contains(&record.end_point) {
            return false;
        }

        let Some(raw) = record.data.var("locale") else {
            return false;
        };

        self.indexed.insert(record.end_point.clone());

        let locale = canonical_locale(raw);
        if locale == ROOT_LOCALE {
            return false;
        }

        *self.index.entry(locale).or_insert(0) += 1;
        true
    }

    pub fn index(&self) -> &BTreeMap<String, u32> {
        &self.index
    }
}
