// src/source.rs
use bytes::Bytes;
use futures::future::BoxFuture;
use futures::stream::BoxStream;
use futures::{StreamExt, TryStreamExt};
use log::{error, info};
use parking_lot::RwLock;
use reqwest::Client;

use crate::config::Config;
use crate::error::Result;
use crate::models::pins::PinConfig;
use crate::models::server::ServerRecord;

pub type ByteStream =
    BoxStream<'static, std::result::Result<Bytes, Box<dyn std::error::Error + Send + Sync>>>;

/// Where the frame stream comes from. Every call opens a fresh stream; the
/// worker calls it again from scratch on each retry.
pub trait ListSource: Send + Sync {
    fn open(&self) -> BoxFuture<'_, Result<ByteStream>>;
}

pub struct HttpListSource {
    client: Client,
    url: String,
}

impl HttpListSource {
    pub fn new(client: Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }
}

impl ListSource for HttpListSource {
    fn open(&self) -> BoxFuture<'_, Result<ByteStream>> {
        Box::pin(async move {
            info!("Fetching server list from {}", self.url);

            let response = self
                .client
                .get(&self.url)
                .send()
                .await?
                .error_for_status()?;

            let stream = response
                .bytes_stream()
                .map_err(|e| Box::new(e) as Box<dyn std::error::Error + Send + Sync>)
                .boxed();

            Ok(stream)
        })
    }
}

async fn try_fetch_single_server(client: &Client, config: &Config, address: &str) -> Result<ServerRecord> {
    let response = client
        .get(config.single_server_endpoint(address))
        .send()
        .await?
        .error_for_status()?;

    let mut record: ServerRecord = response.json().await?;

    if record.end_point.is_empty() {
        record.end_point = address.to_string();
    }

    Ok(record)
}

/// Looks a single server up through the JSON endpoint. Failures are logged
/// and reported as `None`; there is no retry.
pub async fn fetch_single_server(client: &Client, config: &Config, address: &str) -> Option<ServerRecord> {
    match try_fetch_single_server(client, config, address).await {
        Ok(record) => Some(record),
        Err(e) => {
            error!("Failed to load server {}: {}", address, e);
            None
        }
    }
}

pub async fn fetch_pin_config(client: &Client, url: &str) -> Result<PinConfig> {
    let json: serde_json::Value = client
        .get(url)
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;

    Ok(PinConfig::from_json(&json))
}

/// Process-lifetime cache of the pin configuration.
pub struct PinStore {
    client: Client,
    url: String,
    cached: RwLock<Option<PinConfig>>,
}

impl PinStore {
    pub fn new(client: Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
            cached: RwLock::new(None),
        }
    }

    /// Last fetched configuration, or the empty one if none was fetched yet.
    pub fn current(&self) -> PinConfig {
        self.cached.read().clone().unwrap_or_default()
    }

    pub fn is_loaded(&self) -> bool {
        self.cached.read().is_some()
    }

    pub fn set(&self, config: PinConfig) {
        *self.cached.write() = Some(config);
    }

    pub async fn refresh(&self) -> Result<PinConfig> {
        match fetch_pin_config(&self.client, &self.url).await {
            Ok(config) => {
                info!("Loaded pin config with {} pinned servers", config.pinned_servers.len());
                self.set(config.clone());
                Ok(config)
            }
            Err(e) => {
                error!("Failed to fetch pinned servers config: {}", e);
                Err(e)
            }
        }
    }

    /// Cached configuration, fetching it on first use.
    pub async fn get(&self) -> Result<PinConfig> {
        let cached = self.cached.read().clone();
        if let Some(config) = cached {
            return Ok(config);
        }

        self.refresh().await
    }
}
