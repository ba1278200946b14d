pub mod memory;

pub use memory::ServerStore;
