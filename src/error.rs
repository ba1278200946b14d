// src/error.rs
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("A too large frame was passed: {0} bytes")]
    FrameTooLarge(usize),

    #[error("Stream ended in the middle of a frame ({0} bytes pending)")]
    TruncatedFrame(usize),

    #[error("Stream error: {0}")]
    Stream(Box<dyn std::error::Error + Send + Sync>),

    #[error("Invalid server message: {0}")]
    Decode(#[from] prost::DecodeError),

    #[error("Server message without endpoint")]
    MissingEndPoint,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unknown sortable: {0}")]
    UnknownSortKey(String),

    #[error("Unknown list type: {0}")]
    UnknownListType(String),

    #[error("Server worker is gone")]
    WorkerGone,
}
