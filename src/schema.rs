// src/schema.rs
// Fields 7, 13, 14 and 15 are retired and skipped like unknown tags.
use std::collections::BTreeMap;

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Player {
    #[prost(string, tag = "1")]
    pub name: String,
    #[prost(string, repeated, tag = "2")]
    pub identifiers: Vec<String>,
    #[prost(string, tag = "3")]
    pub endpoint: String,
    #[prost(int32, tag = "4")]
    pub ping: i32,
    #[prost(int32, tag = "5")]
    pub id: i32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ServerData {
    #[prost(int32, tag = "1")]
    pub sv_maxclients: i32,
    #[prost(int32, tag = "2")]
    pub clients: i32,
    #[prost(int32, tag = "3")]
    pub protocol: i32,
    #[prost(string, tag = "4")]
    pub hostname: String,
    #[prost(string, tag = "5")]
    pub gametype: String,
    #[prost(string, tag = "6")]
    pub mapname: String,
    #[prost(string, repeated, tag = "8")]
    pub resources: Vec<String>,
    #[prost(string, tag = "9")]
    pub server: String,
    #[prost(message, repeated, tag = "10")]
    pub players: Vec<Player>,
    #[prost(int32, tag = "11")]
    pub icon_version: i32,
    #[prost(btree_map = "string, string", tag = "12")]
    pub vars: BTreeMap<String, String>,
    #[prost(bool, tag = "16")]
    pub enhanced_host_support: bool,
    #[prost(int32, tag = "17")]
    pub upvote_power: i32,
    #[prost(string, repeated, tag = "18")]
    pub connect_end_points: Vec<String>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Server {
    #[prost(string, tag = "1")]
    pub end_point: String,
    #[prost(message, optional, tag = "2")]
    pub data: Option<ServerData>,
}
