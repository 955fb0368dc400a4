// Runtime configuration

pub mod app;

pub use app::{AppConfig, DatabaseSettings, StorageBackend};
