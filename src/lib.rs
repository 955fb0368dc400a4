//! SwimSmart: a swim-training log with coach dashboards, served over HTTP.

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod store;
