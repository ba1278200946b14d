// src/storage/memory.rs
use dashmap::DashMap;
use log::debug;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::models::server::{PingValue, ServerRecord};

/// Caller-side copy of every record the worker has announced, keyed by
/// endpoint, plus a fan-out to live subscribers.
#[derive(Default)]
pub struct ServerStore {
    servers: DashMap<String, ServerRecord>,
    subscribers: Mutex<Vec<mpsc::UnboundedSender<ServerRecord>>>,
}

impl ServerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces the records and forwards them to subscribers.
    /// Subscribers whose receiver is gone are dropped.
    pub fn upsert(&self, records: impl IntoIterator<Item = ServerRecord>) {
        let mut subscribers = self.subscribers.lock();

        for record in records {
            subscribers.retain(|tx| tx.send(record.clone()).is_ok());
            self.servers.insert(record.end_point.clone(), record);
        }
    }

    /// Every record already known is delivered first, then every later
    /// upsert. Replay and registration happen under the subscriber lock, so
    /// no record falls in between.
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<ServerRecord> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut subscribers = self.subscribers.lock();

        for entry in self.servers.iter() {
            // rx is still in scope, send cannot fail
            let _ = tx.send(entry.value().clone());
        }

        subscribers.push(tx);
        debug!("Server subscriber registered ({} active)", subscribers.len());

        rx
    }

    pub fn get(&self, end_point: &str) -> Option<ServerRecord> {
        self.servers.get(end_point).map(|r| r.value().clone())
    }

    pub fn get_servers(&self) -> Vec<ServerRecord> {
        self.servers.iter().map(|r| r.value().clone()).collect()
    }

    /// Records a ping result. Returns `false` for unknown endpoints.
    pub fn set_ping(&self, end_point: &str, ping: PingValue) -> bool {
        match self.servers.get_mut(end_point) {
            Some(mut record) => {
                record.ping = Some(ping);
                true
            }
            None => false,
        }
    }

    pub fn clear(&self) {
        self.servers.clear();
    }

    pub fn len(&self) -> usize {
        self.servers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.servers.is_empty()
    }
}
