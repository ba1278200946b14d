pub mod config;
pub mod error;
pub mod filter;
pub mod index;
pub mod models;
pub mod names;
pub mod protocol;
pub mod schema;
pub mod service;
pub mod sort;
pub mod source;
pub mod storage;
pub mod worker;

pub use config::Config;
pub use error::{Error, Result};
pub use service::{FiltersService, ServersService, SortedServers};
