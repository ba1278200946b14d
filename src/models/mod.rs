pub mod filter;
pub mod pins;
pub mod server;
