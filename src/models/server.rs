// src/models/server.rs
use serde::{Deserialize, Deserializer, Serialize};
use std::borrow::Cow;
use std::collections::BTreeMap;

use crate::schema;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Player {
    pub name: String,
    pub identifiers: Vec<String>,
    pub endpoint: String,
    pub ping: i32,
    pub id: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerData {
    #[serde(rename = "sv_maxclients", alias = "svMaxclients")]
    pub sv_maxclients: i32,
    pub clients: i32,
    pub protocol: i32,
    pub hostname: String,
    pub gametype: String,
    pub mapname: String,
    pub resources: Vec<String>,
    pub server: String,
    pub players: Vec<Player>,
    #[serde(rename = "iconVersion")]
    pub icon_version: i32,
    #[serde(deserialize_with = "string_map")]
    pub vars: BTreeMap<String, String>,
    #[serde(rename = "enhancedHostSupport")]
    pub enhanced_host_support: bool,
    #[serde(rename = "upvotePower")]
    pub upvote_power: i32,
    #[serde(rename = "connectEndPoints")]
    pub connect_end_points: Vec<String>,
}

/// Client-side latency measurement attached to a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PingValue {
    Millis(u32),
    /// Placeholder label shown while a probe is outstanding (e.g. `"..."`).
    Pending(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServerRecord {
    #[serde(rename = "EndPoint")]
    pub end_point: String,
    #[serde(rename = "Data", default)]
    pub data: ServerData,
    #[serde(skip)]
    pub ping: Option<PingValue>,
}

/// Names of the record fields reachable from the search language, in wire
/// order.
pub const DATA_FIELDS: &[&str] = &[
    "svMaxclients",
    "clients",
    "protocol",
    "hostname",
    "gametype",
    "mapname",
    "resources",
    "server",
    "players",
    "iconVersion",
    "vars",
    "enhancedHostSupport",
    "upvotePower",
    "connectEndPoints",
];

/// A dynamically addressed field of [`ServerData`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldValue<'a> {
    Int(i32),
    Bool(bool),
    Str(&'a str),
    List(&'a [String]),
    Players(&'a [Player]),
    Map(&'a BTreeMap<String, String>),
}

impl<'a> FieldValue<'a> {
    /// Scalars are truthy when non-zero, non-empty or `true`; collections are
    /// always truthy, even when empty.
    pub fn is_truthy(&self) -> bool {
        match self {
            FieldValue::Int(v) => *v != 0,
            FieldValue::Bool(v) => *v,
            FieldValue::Str(v) => !v.is_empty(),
            FieldValue::List(_) | FieldValue::Players(_) | FieldValue::Map(_) => true,
        }
    }

    pub fn to_text(&self) -> Cow<'a, str> {
        match *self {
            FieldValue::Int(v) => Cow::Owned(v.to_string()),
            FieldValue::Bool(v) => Cow::Borrowed(if v { "true" } else { "false" }),
            FieldValue::Str(v) => Cow::Borrowed(v),
            FieldValue::List(items) => Cow::Owned(items.join(",")),
            FieldValue::Players(players) => Cow::Owned(
                players.iter().map(|p| p.name.as_str()).collect::<Vec<_>>().join(","),
            ),
            FieldValue::Map(map) => Cow::Owned(map.keys().cloned().collect::<Vec<_>>().join(",")),
        }
    }
}

impl ServerData {
    pub fn field(&self, name: &str) -> Option<FieldValue<'_>> {
        let value = match name {
            "svMaxclients" => FieldValue::Int(self.sv_maxclients),
            "clients" => FieldValue::Int(self.clients),
            "protocol" => FieldValue::Int(self.protocol),
            "hostname" => FieldValue::Str(&self.hostname),
            "gametype" => FieldValue::Str(&self.gametype),
            "mapname" => FieldValue::Str(&self.mapname),
            "resources" => FieldValue::List(&self.resources),
            "server" => FieldValue::Str(&self.server),
            "players" => FieldValue::Players(&self.players),
            "iconVersion" => FieldValue::Int(self.icon_version),
            "vars" => FieldValue::Map(&self.vars),
            "enhancedHostSupport" => FieldValue::Bool(self.enhanced_host_support),
            "upvotePower" => FieldValue::Int(self.upvote_power),
            "connectEndPoints" => FieldValue::List(&self.connect_end_points),
            _ => return None,
        };

        Some(value)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&'static str, FieldValue<'_>)> {
        DATA_FIELDS
            .iter()
            .filter_map(move |&name| self.field(name).map(|value| (name, value)))
    }

    pub fn var(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str).filter(|v| !v.is_empty())
    }
}

impl ServerRecord {
    pub fn new(end_point: impl Into<String>, data: ServerData) -> Self {
        Self {
            end_point: end_point.into(),
            data,
            ping: None,
        }
    }
}

impl From<schema::Player> for Player {
    fn from(player: schema::Player) -> Self {
        Self {
            name: player.name,
            identifiers: player.identifiers,
            endpoint: player.endpoint,
            ping: player.ping,
            id: player.id,
        }
    }
}

impl From<&Player> for schema::Player {
    fn from(player: &Player) -> Self {
        Self {
            name: player.name.clone(),
            identifiers: player.identifiers.clone(),
            endpoint: player.endpoint.clone(),
            ping: player.ping,
            id: player.id,
        }
    }
}

impl From<schema::ServerData> for ServerData {
    fn from(data: schema::ServerData) -> Self {
        Self {
            sv_maxclients: data.sv_maxclients,
            clients: data.clients,
            protocol: data.protocol,
            hostname: data.hostname,
            gametype: data.gametype,
            mapname: data.mapname,
            resources: data.resources,
            server: data.server,
            players: data.players.into_iter().map(Player::from).collect(),
            icon_version: data.icon_version,
            vars: data.vars,
            enhanced_host_support: data.enhanced_host_support,
            upvote_power: data.upvote_power,
            connect_end_points: data.connect_end_points,
        }
    }
}

impl From<&ServerData> for schema::ServerData {
    fn from(data: &ServerData) -> Self {
        Self {
            sv_maxclients: data.sv_maxclients,
            clients: data.clients,
            protocol: data.protocol,
            hostname: data.hostname.clone(),
            gametype: data.gametype.clone(),
            mapname: data.mapname.clone(),
            resources: data.resources.clone(),
            server: data.server.clone(),
            players: data.players.iter().map(schema::Player::from).collect(),
            icon_version: data.icon_version,
            vars: data.vars.clone(),
            enhanced_host_support: data.enhanced_host_support,
            upvote_power: data.upvote_power,
            connect_end_points: data.connect_end_points.clone(),
        }
    }
}

// The JSON frontend occasionally sends numbers or booleans as var values.
fn string_map<'de, D>(deserializer: D) -> Result<BTreeMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<BTreeMap<String, serde_json::Value>>::deserialize(deserializer)?;

    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .map(|(key, value)| {
            let value = match value {
                serde_json::Value::String(s) => s,
                serde_json::Value::Null => String::new(),
                other => other.to_string(),
            };
            (key, value)
        })
        .collect())
}
