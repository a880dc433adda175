pub mod api;
pub mod config;
pub mod fetch;
pub mod infra;
pub mod server;
pub mod services;
