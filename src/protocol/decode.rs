// src/protocol/decode.rs
use prost::Message;

use crate::error::{Error, Result};
use crate::models::server::{ServerData, ServerRecord};
use crate::schema;

/// Decodes one frame into a record. Unknown field tags are skipped.
pub fn decode_server(frame: &[u8]) -> Result<ServerRecord> {
    let server = schema::Server::decode(frame)?;

    if server.end_point.is_empty() {
        return Err(Error::MissingEndPoint);
    }

    let data = server.data.map(ServerData::from).unwrap_or_default();
    Ok(ServerRecord::new(server.end_point, data))
}

pub fn encode_server(record: &ServerRecord) -> Vec<u8> {
    schema::Server {
        end_point: record.end_point.clone(),
        data: Some(schema::ServerData::from(&record.data)),
    }
    .encode_to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::server::Player;

    fn sample() -> ServerRecord {
        let mut data = ServerData {
            sv_maxclients: 48,
            clients: 12,
            protocol: 5,
            hostname: "^2Drift ^7Kings | Drifting & Racing".to_string(),
            gametype: "Freeroam".to_string(),
            mapname: "San Andreas".to_string(),
            resources: vec!["chat".to_string(), "drift-counter".to_string()],
            server: "FXServer-master v1.0.0.1 win32".to_string(),
            icon_version: 3,
            enhanced_host_support: true,
            upvote_power: 40,
            connect_end_points: vec!["127.0.0.1:30120".to_string()],
            ..ServerData::default()
        };
        data.vars.insert("tags".to_string(), "drifting,stunts".to_string());
        data.vars.insert("locale".to_string(), "en-US".to_string());
        data.players.push(Player {
            name: "kai".to_string(),
            identifiers: vec!["license:abc".to_string()],
            endpoint: "10.0.0.2:51234".to_string(),
            ping: 35,
            id: 1,
        });

        ServerRecord::new("abc123", data)
    }

    #[test]
    fn round_trips_all_fields() {
        let record = sample();
        let decoded = decode_server(&encode_server(&record)).unwrap();
        assert_eq!(decoded, record);
    }

    #[test]
    fn unknown_fields_are_skipped() {
        let mut wire = encode_server(&sample());
        // field 15 (varint) and field 40 (length-delimited), neither in the schema
        wire.extend_from_slice(&[0x78, 0x01]);
        wire.extend_from_slice(&[0xC2, 0x02, 0x03, b'x', b'y', b'z']);

        let decoded = decode_server(&wire).unwrap();
        assert_eq!(decoded, sample());
    }

    #[test]
    fn missing_data_yields_defaults() {
        let wire = schema::Server {
            end_point: "lonely".to_string(),
            data: None,
        }
        .encode_to_vec();

        let decoded = decode_server(&wire).unwrap();
        assert_eq!(decoded.end_point, "lonely");
        assert_eq!(decoded.data, ServerData::default());
    }

    #[test]
    fn rejects_garbage() {
        assert!(matches!(decode_server(&[0x0A, 0xFF]), Err(Error::Decode(_))));
        assert!(matches!(decode_server(&[]), Err(Error::MissingEndPoint)));
    }
}
