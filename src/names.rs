// src/names.rs
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashMap;
use unicode_normalization::UnicodeNormalization;

use crate::models::server::{ServerData, ServerRecord};

const MAX_HOSTNAME_CHARS: usize = 100;
const MAX_PROJECT_NAME_CHARS: usize = 50;
const MAX_PROJECT_DESC_CHARS: usize = 125;

lazy_static! {
    static ref COLOR_CODES: Regex = Regex::new(r"\^[0-9]").unwrap();
    static ref NON_ALNUM: Regex = Regex::new(r"[^a-zA-Z0-9]").unwrap();
    static ref LEADING_DIGITS: Regex = Regex::new(r"^[0-9]+").unwrap();
    static ref WHITESPACE: Regex = Regex::new(r"\s+").unwrap();
}

fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

fn tidy(s: &str, max: usize) -> String {
    let collapsed = WHITESPACE.replace_all(s.trim(), " ");
    truncate_chars(&collapsed, max).trim_end().to_string()
}

/// Display-safe `sv_projectName`: whitespace collapsed, length capped.
pub fn filter_project_name(name: &str) -> String {
    tidy(name, MAX_PROJECT_NAME_CHARS)
}

pub fn filter_project_desc(desc: &str) -> String {
    tidy(desc, MAX_PROJECT_DESC_CHARS)
}

/// Applies the project name and description filters to the record's vars in
/// place. Empty values are left alone.
pub fn tidy_project_vars(data: &mut ServerData) {
    if let Some(name) = data.vars.get_mut("sv_projectName").filter(|v| !v.is_empty()) {
        *name = filter_project_name(name);
    }
    if let Some(desc) = data.vars.get_mut("sv_projectDesc").filter(|v| !v.is_empty()) {
        *desc = filter_project_desc(desc);
    }
}

/// The name search literals are matched against: project name and
/// description when the server sets one, otherwise the (capped) hostname,
/// with colour codes and combining diacritics removed.
pub fn strip_name(data: &ServerData) -> String {
    let name = match data.var("sv_projectName") {
        Some(project) => format!(
            "{} {}",
            filter_project_name(project),
            filter_project_desc(data.var("sv_projectDesc").unwrap_or(""))
        ),
        None => truncate_chars(&data.hostname, MAX_HOSTNAME_CHARS).to_string(),
    };

    COLOR_CODES
        .replace_all(&name, "")
        .nfd()
        .filter(|c| !('\u{0300}'..='\u{036f}').contains(c))
        .collect()
}

/// Alphanumeric-only, lowercased stripped name without leading digits.
pub fn sort_name(data: &ServerData) -> String {
    let stripped = strip_name(data);
    let alnum = NON_ALNUM.replace_all(&stripped, "");
    LEADING_DIGITS.replace(&alnum, "").to_lowercase()
}

/// Per-endpoint stripped and sort names, computed once when a record is
/// ingested so comparisons never touch the raw hostname.
#[derive(Debug, Default)]
pub struct NameCache {
    strip_names: HashMap<String, String>,
    sort_names: HashMap<String, String>,
}

impl NameCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, record: &ServerRecord) {
        self.strip_names
            .insert(record.end_point.clone(), strip_name(&record.data));
        self.sort_names
            .insert(record.end_point.clone(), sort_name(&record.data));
    }

    pub fn strip_name(&self, end_point: &str) -> &str {
        self.strip_names.get(end_point).map_or("", String::as_str)
    }

    pub fn sort_name(&self, end_point: &str) -> &str {
        self.sort_names.get(end_point).map_or("", String::as_str)
    }

    pub fn clear(&mut self) {
        self.strip_names.clear();
        self.sort_names.clear();
    }

    pub fn len(&self) -> usize {
        self.strip_names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strip_names.is_empty()
    }
}
