//! Broadcast server and its configuration

pub mod broadcast;
pub mod config;

pub use broadcast::BroadcastServer;
pub use config::ServerConfig;
