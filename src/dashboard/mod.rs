pub mod server;
pub mod stats;
