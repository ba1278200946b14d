// src/sort.rs
use std::cmp::Ordering;

use crate::models::filter::{FilterRequest, ListType, SortDirection, SortKey, SortOrder};
use crate::models::server::{PingValue, ServerRecord};
use crate::names::NameCache;

/// Tie-breakers applied after the requested order.
const FALLBACK_ORDER: [SortOrder; 3] = [
    SortOrder { key: SortKey::UpvotePower, direction: SortDirection::Descending },
    SortOrder { key: SortKey::Players, direction: SortDirection::Descending },
    SortOrder { key: SortKey::Name, direction: SortDirection::Ascending },
];

/// Pins only float to the top on the browse list while searching, and on
/// every other list.
pub fn promotes_pins(request: &FilterRequest) -> bool {
    !(request.list_type == ListType::Browse && request.filters.search_text.is_empty())
}

fn ping_rank(record: &ServerRecord) -> u64 {
    match record.ping {
        Some(PingValue::Millis(ms)) => u64::from(ms),
        _ => u64::MAX,
    }
}

fn compare_key(a: &ServerRecord, b: &ServerRecord, key: SortKey, names: &NameCache) -> Ordering {
    match key {
        SortKey::Name => names.sort_name(&a.end_point).cmp(names.sort_name(&b.end_point)),
        SortKey::Ping => ping_rank(a).cmp(&ping_rank(b)),
        SortKey::Players => a.data.clients.cmp(&b.data.clients),
        SortKey::UpvotePower => a.data.upvote_power.cmp(&b.data.upvote_power),
    }
}

fn compare_order(a: &ServerRecord, b: &ServerRecord, order: SortOrder, names: &NameCache) -> Ordering {
    let ordering = compare_key(a, b, order.key, names);

    match order.direction {
        SortDirection::Ascending => ordering,
        SortDirection::Descending => ordering.reverse(),
    }
}

/// Stable sort: pins (when promoted), the requested order, then upvote
/// power, players and name.
pub fn sort_servers(servers: &mut [&ServerRecord], request: &FilterRequest, names: &NameCache) {
    let promote = promotes_pins(request);
    let pins = &request.pin_config;

    servers.sort_by(|a, b| {
        let pinned = if promote {
            // `true` sorts after `false`, so compare b to a
            pins.is_pinned(&b.end_point).cmp(&pins.is_pinned(&a.end_point))
        } else {
            Ordering::Equal
        };

        pinned
            .then_with(|| compare_order(a, b, request.sort_order, names))
            .then_with(|| {
                FALLBACK_ORDER
                    .iter()
                    .map(|&order| compare_order(a, b, order, names))
                    .find(|o| o.is_ne())
                    .unwrap_or(Ordering::Equal)
            })
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::server::ServerData;

    fn record(end_point: &str, hostname: &str, clients: i32, upvote_power: i32) -> ServerRecord {
        ServerRecord::new(
            end_point,
            ServerData {
                hostname: hostname.to_string(),
                clients,
                sv_maxclients: 64,
                upvote_power,
                ..ServerData::default()
            },
        )
    }

    fn sorted(records: &[ServerRecord], request: &FilterRequest) -> Vec<String> {
        let mut names = NameCache::new();
        for r in records {
            names.update(r);
        }

        let mut refs: Vec<&ServerRecord> = records.iter().collect();
        sort_servers(&mut refs, request, &names);
        refs.iter().map(|r| r.end_point.clone()).collect()
    }

    #[test]
    fn players_descending() {
        let records = vec![record("five", "A", 5, 0), record("twenty", "B", 20, 0), record("one", "C", 1, 0)];
        let mut request = FilterRequest::default();
        request.filters.search_text = "server".to_string();
        request.sort_order = SortOrder::from_pair("players", "-").unwrap();

        assert_eq!(sorted(&records, &request), vec!["twenty", "five", "one"]);
    }

    #[test]
    fn name_uses_sort_name() {
        let records = vec![
            record("b", "^2Bravo", 1, 0),
            record("a", "[EU] alpha", 1, 0),
            record("c", "99 Charlie", 1, 0),
        ];
        let request = FilterRequest::default();

        assert_eq!(sorted(&records, &request), vec!["b", "c", "a"]);
    }

    #[test]
    fn fallbacks_break_ties() {
        let records = vec![
            record("low", "Same", 10, 1),
            record("high", "Same", 10, 50),
            record("busy", "Same", 30, 1),
        ];
        let mut request = FilterRequest::default();
        request.sort_order = SortOrder::from_pair("name", "+").unwrap();

        assert_eq!(sorted(&records, &request), vec!["high", "busy", "low"]);
    }

    #[test]
    fn pins_promoted_only_when_searching_on_browse() {
        let records = vec![record("big", "Big", 100, 0), record("pin", "Pinned", 1, 0)];
        let mut request = FilterRequest::default();
        request.sort_order = SortOrder::from_pair("players", "-").unwrap();
        request.pin_config.pinned_servers.insert("pin".to_string());

        assert_eq!(sorted(&records, &request), vec!["big", "pin"]);

        request.filters.search_text = "i".to_string();
        assert_eq!(sorted(&records, &request), vec!["pin", "big"]);

        request.filters.search_text.clear();
        request.list_type = ListType::Favorites;
        assert_eq!(sorted(&records, &request), vec!["pin", "big"]);
    }

    #[test]
    fn unmeasured_ping_sorts_last() {
        let mut fast = record("fast", "A", 1, 0);
        fast.ping = Some(PingValue::Millis(20));
        let mut slow = record("slow", "B", 1, 0);
        slow.ping = Some(PingValue::Millis(200));
        let mut pending = record("pending", "C", 1, 0);
        pending.ping = Some(PingValue::Pending("...".to_string()));
        let unknown = record("unknown", "D", 1, 0);

        let mut request = FilterRequest::default();
        request.sort_order = SortOrder::from_pair("ping", "+").unwrap();

        assert_eq!(
            sorted(&[unknown, slow, pending, fast], &request),
            vec!["fast", "slow", "pending", "unknown"]
        );
    }
}
