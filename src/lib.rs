pub mod api;
pub mod catalog;
pub mod config;
pub mod models;
pub mod o11y;
pub mod routes;
pub mod services;
pub mod store;
