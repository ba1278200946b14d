// src/models/filter.rs
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;
use crate::models::pins::PinConfig;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ServerFilters {
    pub search_text: String,
    pub hide_empty: bool,
    pub hide_full: bool,
    /// `None` disables the ping cap.
    pub max_ping: Option<u32>,
}

/// Explicit tag/locale choices: `true` requires the entry, `false` excludes it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ServerTags {
    pub tag_list: BTreeMap<String, bool>,
    pub locale_list: BTreeMap<String, bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SortKey {
    #[serde(rename = "name")]
    Name,
    #[serde(rename = "ping")]
    Ping,
    #[serde(rename = "players")]
    Players,
    #[serde(rename = "upvotePower")]
    UpvotePower,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SortDirection {
    #[serde(rename = "+")]
    Ascending,
    #[serde(rename = "-")]
    Descending,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SortOrder {
    pub key: SortKey,
    pub direction: SortDirection,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListType {
    #[default]
    Browse,
    Favorites,
    History,
    Premium,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FilterRequest {
    pub filters: ServerFilters,
    pub tags: ServerTags,
    pub sort_order: SortOrder,
    pub pin_config: PinConfig,
    pub list_type: ListType,
    /// Membership set for the favorites and history lists.
    pub list_endpoints: Option<BTreeSet<String>>,
}

impl FromStr for SortKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "name" => Ok(SortKey::Name),
            "ping" => Ok(SortKey::Ping),
            "players" => Ok(SortKey::Players),
            "upvotePower" => Ok(SortKey::UpvotePower),
            other => Err(Error::UnknownSortKey(other.to_string())),
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SortKey::Name => "name",
            SortKey::Ping => "ping",
            SortKey::Players => "players",
            SortKey::UpvotePower => "upvotePower",
        };
        f.write_str(name)
    }
}

impl SortOrder {
    pub fn new(key: SortKey, direction: SortDirection) -> Self {
        Self { key, direction }
    }

    /// Builds an order from the `["players", "-"]` pair form; any direction
    /// other than `-` sorts ascending.
    pub fn from_pair(key: &str, direction: &str) -> Result<Self, Error> {
        let direction = if direction == "-" {
            SortDirection::Descending
        } else {
            SortDirection::Ascending
        };

        Ok(Self::new(key.parse()?, direction))
    }
}

impl Default for SortOrder {
    fn default() -> Self {
        Self::new(SortKey::Name, SortDirection::Ascending)
    }
}

/// Accepts `players-`, `players+` or a bare `players` (ascending).
impl FromStr for SortOrder {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.strip_suffix('-') {
            Some(key) => Self::from_pair(key, "-"),
            None => Self::from_pair(s.strip_suffix('+').unwrap_or(s), "+"),
        }
    }
}

impl FromStr for ListType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "browse" => Ok(ListType::Browse),
            "favorites" => Ok(ListType::Favorites),
            "history" => Ok(ListType::History),
            "premium" => Ok(ListType::Premium),
            other => Err(Error::UnknownListType(other.to_string())),
        }
    }
}
