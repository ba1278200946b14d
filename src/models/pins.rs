// src/models/pins.rs
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Operator-curated pin list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PinConfig {
    pub pin_if_empty: bool,
    pub pinned_servers: BTreeSet<String>,
    pub no_ad_server_id: Option<String>,
}

impl PinConfig {
    /// Lenient parse of the published `pins.json`; entries of the wrong type
    /// are dropped instead of failing the whole document.
    pub fn from_json(json: &serde_json::Value) -> Self {
        let pin_if_empty = json
            .get("pinIfEmpty")
            .map(|v| match v {
                serde_json::Value::Bool(b) => *b,
                serde_json::Value::Number(n) => n.as_f64().map_or(false, |n| n != 0.0),
                serde_json::Value::String(s) => !s.is_empty(),
                _ => false,
            })
            .unwrap_or(false);

        let pinned_servers = json
            .get("pinnedServers")
            .and_then(|v| v.as_array())
            .map(|list| {
                list.iter()
                    .filter_map(|entry| entry.as_str())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        let no_ad_server_id = json.get("noAdServerId").and_then(|v| match v {
            serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
            serde_json::Value::Number(n) => Some(n.to_string()),
            _ => None,
        });

        Self {
            pin_if_empty,
            pinned_servers,
            no_ad_server_id,
        }
    }

    pub fn is_pinned(&self, end_point: &str) -> bool {
        self.pinned_servers.contains(end_point)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn drops_non_string_pins() {
        let config = PinConfig::from_json(&json!({
            "pinIfEmpty": true,
            "pinnedServers": ["abc123", 42, null, "def456"],
            "noAdServerId": "xyz"
        }));

        assert!(config.pin_if_empty);
        assert_eq!(config.pinned_servers.len(), 2);
        assert!(config.is_pinned("abc123"));
        assert!(!config.is_pinned("42"));
        assert_eq!(config.no_ad_server_id.as_deref(), Some("xyz"));
    }

    #[test]
    fn missing_fields_default() {
        let config = PinConfig::from_json(&json!({}));
        assert_eq!(config, PinConfig::default());
    }
}
