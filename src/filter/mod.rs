// src/filter/mod.rs
pub mod query;

use crate::index::{canonical_locale, server_tags};
use crate::models::filter::{FilterRequest, ListType};
use crate::models::server::{PingValue, ServerRecord};
use crate::names::NameCache;

pub use query::{category_matches, Clause, Matcher, SearchQuery};

/// Compiled form of a [`FilterRequest`]; build once per request and apply to
/// every record.
pub struct ServerFilter<'a> {
    request: &'a FilterRequest,
    query: SearchQuery,
}

impl<'a> ServerFilter<'a> {
    pub fn new(request: &'a FilterRequest) -> Self {
        Self {
            request,
            query: SearchQuery::parse(&request.filters.search_text),
        }
    }

    pub fn query(&self) -> &SearchQuery {
        &self.query
    }

    pub fn matches(&self, record: &ServerRecord, names: &NameCache) -> bool {
        let filters = &self.request.filters;
        let data = &record.data;

        if !self.query.matches(record, names.strip_name(&record.end_point)) {
            return false;
        }

        if !self.in_list(record) {
            return false;
        }

        if data.clients == 0 && filters.hide_empty {
            if !self.is_pinned(record) || !self.request.pin_config.pin_if_empty {
                return false;
            }
        }

        if data.clients >= data.sv_maxclients && filters.hide_full {
            return false;
        }

        if let Some(cap) = filters.max_ping {
            // Pending probes carry a label instead of a number and never pass.
            match record.ping {
                Some(PingValue::Millis(ms)) if ms <= cap => {}
                _ => return false,
            }
        }

        if self.hidden_by_tags(record) && !self.shown_as_pin(record) {
            return false;
        }

        if self.hidden_by_locales(record) && !self.shown_as_pin(record) {
            return false;
        }

        true
    }

    pub fn is_pinned(&self, record: &ServerRecord) -> bool {
        self.request.pin_config.is_pinned(&record.end_point)
    }

    fn shown_as_pin(&self, record: &ServerRecord) -> bool {
        self.is_pinned(record) && self.request.list_type == ListType::Browse
    }

    fn in_list(&self, record: &ServerRecord) -> bool {
        match self.request.list_type {
            ListType::Browse => true,
            ListType::Premium => record
                .data
                .var("premium")
                .map_or(false, |v| !query::is_falsy(v)),
            ListType::Favorites | ListType::History => self
                .request
                .list_endpoints
                .as_ref()
                .map_or(true, |endpoints| endpoints.contains(&record.end_point)),
        }
    }

    fn hidden_by_tags(&self, record: &ServerRecord) -> bool {
        let tag_list = &self.request.tags.tag_list;

        if tag_list.is_empty() {
            return false;
        }

        let tags = server_tags(record);

        tag_list
            .iter()
            .any(|(tag, &required)| tags.contains(tag) != required)
    }

    fn hidden_by_locales(&self, record: &ServerRecord) -> bool {
        let locale_list = &self.request.tags.locale_list;

        if locale_list.is_empty() {
            return false;
        }

        let server_locale = record.data.var("locale").map(canonical_locale);
        let mut matches_locales = false;

        for (locale, &active) in locale_list {
            let hit = server_locale.as_deref() == Some(locale.as_str());

            if active {
                if hit {
                    matches_locales = true;
                }
            } else {
                if hit {
                    return true;
                }

                // FIXME: a non-matching exclusion also satisfies the inclusion
                // check, so mixed include/exclude lists let every other
                // locale through. Confirm whether an included match should
                // be required.
                matches_locales = true;
            }
        }

        !matches_locales
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::server::ServerData;

    fn record(end_point: &str, clients: i32, max: i32, vars: &[(&str, &str)]) -> ServerRecord {
        let mut data = ServerData {
            hostname: format!("Server {}", end_point),
            clients,
            sv_maxclients: max,
            ..ServerData::default()
        };
        for (k, v) in vars {
            data.vars.insert(k.to_string(), v.to_string());
        }
        ServerRecord::new(end_point, data)
    }

    fn passes(request: &FilterRequest, record: &ServerRecord) -> bool {
        let mut names = NameCache::new();
        names.update(record);
        ServerFilter::new(request).matches(record, &names)
    }

    #[test]
    fn hide_empty_respects_pin_if_empty() {
        let empty = record("pinned", 0, 32, &[]);
        let mut request = FilterRequest::default();
        request.filters.hide_empty = true;

        assert!(!passes(&request, &empty));

        request.pin_config.pinned_servers.insert("pinned".to_string());
        assert!(!passes(&request, &empty));

        request.pin_config.pin_if_empty = true;
        assert!(passes(&request, &empty));
    }

    #[test]
    fn hide_full() {
        let mut request = FilterRequest::default();
        request.filters.hide_full = true;

        assert!(!passes(&request, &record("a", 32, 32, &[])));
        assert!(passes(&request, &record("a", 31, 32, &[])));
    }

    #[test]
    fn ping_cap_rejects_labels_and_missing() {
        let mut request = FilterRequest::default();
        request.filters.max_ping = Some(100);

        let mut server = record("a", 1, 32, &[]);
        assert!(!passes(&request, &server));

        server.ping = Some(PingValue::Millis(80));
        assert!(passes(&request, &server));

        server.ping = Some(PingValue::Millis(120));
        assert!(!passes(&request, &server));

        server.ping = Some(PingValue::Pending("...".to_string()));
        assert!(!passes(&request, &server));
    }

    #[test]
    fn tag_inclusion_and_exclusion() {
        let server = record("a", 1, 32, &[("tags", "Drifting, stunts")]);
        let mut request = FilterRequest::default();

        request.tags.tag_list.insert("drifting".to_string(), true);
        assert!(passes(&request, &server));

        request.tags.tag_list.insert("stunts".to_string(), false);
        assert!(!passes(&request, &server));

        request.tags.tag_list.clear();
        request.tags.tag_list.insert("racing".to_string(), true);
        assert!(!passes(&request, &server));
        assert!(!passes(&request, &record("b", 1, 32, &[])));
    }

    #[test]
    fn pinned_servers_bypass_tags_on_browse_only() {
        let server = record("pin", 1, 32, &[]);
        let mut request = FilterRequest::default();
        request.tags.tag_list.insert("racing".to_string(), true);
        request.pin_config.pinned_servers.insert("pin".to_string());

        assert!(passes(&request, &server));

        request.list_type = ListType::Favorites;
        assert!(!passes(&request, &server));
    }

    #[test]
    fn pinned_servers_bypass_locales_on_browse_only() {
        let pinned = record("pin", 1, 32, &[("locale", "fr-FR")]);
        let other = record("other", 1, 32, &[("locale", "fr-FR")]);
        let mut request = FilterRequest::default();
        request.tags.locale_list.insert("en-US".to_string(), true);
        request.pin_config.pinned_servers.insert("pin".to_string());

        assert!(passes(&request, &pinned));
        assert!(!passes(&request, &other));

        request.list_type = ListType::Favorites;
        assert!(!passes(&request, &pinned));
    }

    #[test]
    fn locale_inclusion_is_an_or() {
        let mut request = FilterRequest::default();
        request.tags.locale_list.insert("en-US".to_string(), true);
        request.tags.locale_list.insert("de-DE".to_string(), true);

        assert!(passes(&request, &record("a", 1, 32, &[("locale", "en_us")])));
        assert!(passes(&request, &record("b", 1, 32, &[("locale", "de-DE")])));
        assert!(!passes(&request, &record("c", 1, 32, &[("locale", "fr-FR")])));
        assert!(!passes(&request, &record("d", 1, 32, &[])));
    }

    #[test]
    fn locale_exclusion_flips_match_back_on() {
        let mut request = FilterRequest::default();
        request.tags.locale_list.insert("en-US".to_string(), true);
        request.tags.locale_list.insert("ru-RU".to_string(), false);

        // excluded locale hides
        assert!(!passes(&request, &record("a", 1, 32, &[("locale", "ru-RU")])));
        // unrelated locale passes because of the non-matching exclusion
        assert!(passes(&request, &record("b", 1, 32, &[("locale", "fr-FR")])));
    }

    #[test]
    fn premium_list_requires_premium_var() {
        let mut request = FilterRequest::default();
        request.list_type = ListType::Premium;

        assert!(passes(&request, &record("a", 1, 32, &[("premium", "pt")])));
        assert!(!passes(&request, &record("b", 1, 32, &[("premium", "0")])));
        assert!(!passes(&request, &record("c", 1, 32, &[])));
    }

    #[test]
    fn favorites_list_uses_membership() {
        let mut request = FilterRequest::default();
        request.list_type = ListType::Favorites;
        request.list_endpoints = Some(["fav".to_string()].into_iter().collect());

        assert!(passes(&request, &record("fav", 1, 32, &[])));
        assert!(!passes(&request, &record("other", 1, 32, &[])));
    }

    #[test]
    fn search_runs_before_post_filters() {
        let mut request = FilterRequest::default();
        request.filters.search_text = "tag:drifting ~roleplay".to_string();

        let mut server = record("a", 1, 32, &[("tags", "drifting,stunts")]);
        server.data.hostname = "No RP Here".to_string();
        assert!(passes(&request, &server));

        server.data.hostname = "Roleplay City".to_string();
        assert!(!passes(&request, &server));
    }
}
