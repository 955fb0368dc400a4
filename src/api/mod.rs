// API routes and handlers

pub mod auth;
pub mod coach;
pub mod exports;
pub mod health;
pub mod me;
pub mod queries;
pub mod routes;
pub mod templates;

pub use routes::create_routes;
