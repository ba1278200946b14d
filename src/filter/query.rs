// src/filter/query.rs
//! Search box language: `drift`, `/dr[i1]ft/`, `tag:drifting`, each negated
//! by a leading `~`. All clauses must hold.
use lazy_static::lazy_static;
use log::debug;
use regex::{Regex, RegexBuilder};

use crate::models::server::{FieldValue, ServerData, ServerRecord};

lazy_static! {
    static ref SEARCH_TOKEN: Regex = Regex::new(r"(~?/.*?/|\S+)\s?").unwrap();
    static ref CATEGORY: Regex = Regex::new(r"^([^:]*?):(.*)$").unwrap();
    static ref REGEX_LITERAL: Regex = Regex::new(r"^/(.+)/$").unwrap();
}

#[derive(Debug, Clone)]
pub enum Matcher {
    /// Escaped literal over the stripped name.
    Name(Regex),
    /// `/.../` over the stripped name; lookaround and backreferences allowed.
    Pattern(fancy_regex::Regex),
    Category { category: String, pattern: Regex },
}

#[derive(Debug, Clone)]
pub struct Clause {
    pub matcher: Matcher,
    pub negate: bool,
}

#[derive(Debug, Clone, Default)]
pub struct SearchQuery {
    clauses: Vec<Clause>,
}

fn case_insensitive(pattern: &str) -> Result<Regex, regex::Error> {
    RegexBuilder::new(pattern).case_insensitive(true).build()
}

pub(crate) fn is_falsy(value: &str) -> bool {
    value.is_empty() || value == "false" || value == "0"
}

/// Resolves `category` against the record, in order:
///
/// 1. the record field of that name, if truthy, as text;
/// 2. the plural record field: any list element, any player name, or any
///    var name whose value is not `""`, `"false"` or `"0"`;
/// 3. the plural var, split on commas;
/// 4. the var of that name.
pub fn category_matches(data: &ServerData, category: &str, pattern: &Regex) -> bool {
    if let Some(value) = data.field(category).filter(FieldValue::is_truthy) {
        return pattern.is_match(&value.to_text());
    }

    let plural = format!("{}s", category);

    if let Some(value) = data.field(&plural) {
        return match value {
            FieldValue::List(items) => items.iter().any(|item| pattern.is_match(item)),
            FieldValue::Players(players) => players.iter().any(|p| pattern.is_match(&p.name)),
            FieldValue::Map(map) => map
                .iter()
                .any(|(key, value)| pattern.is_match(key) && !is_falsy(value)),
            _ => false,
        };
    }

    if let Some(values) = data.var(&plural) {
        return values.split(',').any(|value| pattern.is_match(value));
    }

    data.var(category)
        .map_or(false, |value| pattern.is_match(value))
}

impl Clause {
    pub fn matches(&self, record: &ServerRecord, strip_name: &str) -> bool {
        let hit = match &self.matcher {
            Matcher::Name(re) => re.is_match(strip_name),
            // hitting the backtrack limit counts as no match
            Matcher::Pattern(re) => re.is_match(strip_name).unwrap_or(false),
            Matcher::Category { category, pattern } => {
                category_matches(&record.data, category, pattern)
            }
        };

        hit != self.negate
    }
}

impl SearchQuery {
    pub fn parse(search_text: &str) -> Self {
        let mut clauses = Vec::new();

        for caps in SEARCH_TOKEN.captures_iter(search_text) {
            let mut group = &caps[1];
            let negate = group.starts_with('~');

            if negate {
                group = &group[1..];
            }

            if group.chars().count() < 2 {
                continue;
            }

            let clause = if let Some(cat) = CATEGORY.captures(group) {
                case_insensitive(&regex::escape(&cat[2]))
                    .map(|pattern| Matcher::Category {
                        category: cat[1].to_string(),
                        pattern,
                    })
                    .map_err(|e| e.to_string())
            } else if let Some(inner) = REGEX_LITERAL.captures(group) {
                fancy_regex::Regex::new(&format!("(?i){}", &inner[1]))
                    .map(Matcher::Pattern)
                    .map_err(|e| e.to_string())
            } else {
                case_insensitive(&regex::escape(group))
                    .map(Matcher::Name)
                    .map_err(|e| e.to_string())
            };

            match clause {
                Ok(matcher) => clauses.push(Clause { matcher, negate }),
                Err(e) => debug!("Dropping search clause {:?}: {}", group, e),
            }
        }

        Self { clauses }
    }

    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    pub fn matches(&self, record: &ServerRecord, strip_name: &str) -> bool {
        self.clauses.iter().all(|clause| clause.matches(record, strip_name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::server::Player;
    use crate::names::strip_name;

    fn record(hostname: &str, vars: &[(&str, &str)]) -> ServerRecord {
        let mut data = ServerData {
            hostname: hostname.to_string(),
            gametype: "Freeroam".to_string(),
            clients: 3,
            resources: vec!["chat".to_string(), "drift-counter".to_string()],
            ..ServerData::default()
        };
        for (k, v) in vars {
            data.vars.insert(k.to_string(), v.to_string());
        }
        data.players.push(Player {
            name: "Kai".to_string(),
            ..Player::default()
        });
        ServerRecord::new("abc123", data)
    }

    fn matches(query: &str, record: &ServerRecord) -> bool {
        SearchQuery::parse(query).matches(record, &strip_name(&record.data))
    }

    #[test]
    fn tag_and_negated_literal() {
        let server = record("No RP Here", &[("tags", "drifting,stunts")]);
        assert!(matches("tag:drifting ~roleplay", &server));
        assert!(!matches("tag:drifting ~here", &server));
        assert!(!matches("tag:racing", &server));
    }

    #[test]
    fn regex_clause_is_case_insensitive() {
        let server = record("Roleplay City", &[]);
        assert!(matches("/r.le ?play/", &server));
        assert!(matches("/^ROLE/", &server));
        assert!(!matches("~/city$/", &server));
    }

    #[test]
    fn regex_clause_supports_lookaround_and_backreferences() {
        let query = SearchQuery::parse("/^(?!drift)/");
        assert_eq!(query.clauses().len(), 1);
        assert!(!matches("/^(?!drift)/", &record("Drift Kings", &[])));
        assert!(matches("/^(?!drift)/", &record("Roleplay City", &[])));

        assert!(matches(r"/(o)\1/", &record("Boost Kings", &[])));
        assert!(!matches(r"/(o)\1/", &record("Drift Kings", &[])));
    }

    #[test]
    fn literal_is_escaped() {
        let server = record("Drift (EU)", &[]);
        assert!(matches("(eu)", &server));
        assert!(!matches("d.ift", &server));
    }

    #[test]
    fn literal_matches_stripped_name() {
        let server = record("^1Café ^7Kings", &[]);
        assert!(matches("cafe", &server));
        assert!(matches("kings", &server));
    }

    #[test]
    fn short_clauses_are_ignored() {
        assert!(SearchQuery::parse("a ~ ~b").is_empty());
        assert_eq!(SearchQuery::parse("ab").clauses().len(), 1);
    }

    #[test]
    fn invalid_regex_is_dropped() {
        let query = SearchQuery::parse("/(unclosed/ drift");
        assert_eq!(query.clauses().len(), 1);
        assert!(query.matches(&record("Drift Kings", &[]), "Drift Kings"));
    }

    #[test]
    fn category_lookup_order() {
        let server = record(
            "Drift Kings",
            &[("premium", "pt"), ("locale", "en-US"), ("onesync", "false")],
        );

        // direct field
        assert!(matches("gametype:free", &server));
        assert!(matches("clients:3", &server));
        // plural list field
        assert!(matches("resource:drift", &server));
        assert!(!matches("resource:mapmanager", &server));
        // plural map field with falsy exception
        assert!(matches("var:premium", &server));
        assert!(!matches("var:onesync", &server));
        // direct var
        assert!(matches("locale:en", &server));
        // player names
        assert!(matches("player:kai", &server));
        // nothing to look at
        assert!(!matches("nothing:here", &server));
        assert!(matches("~nothing:here", &server));
    }

    #[test]
    fn empty_resources_stop_the_lookup() {
        let mut server = record("Drift Kings", &[("resources", "chat")]);
        server.data.resources.clear();

        // the record field wins over the var even when empty
        assert!(!matches("resource:chat", &server));
    }

    #[test]
    fn matching_is_pure() {
        let server = record("Roleplay City", &[("tags", "rp")]);
        let query = SearchQuery::parse("tag:rp /city/ ~drift");
        let name = strip_name(&server.data);

        let first = query.matches(&server, &name);
        for _ in 0..10 {
            assert_eq!(query.matches(&server, &name), first);
        }
        assert!(first);
    }
}
