//! Hosted database (PostgREST) and auth service clients.

mod auth;
mod rest;

pub use auth::GoTrueClient;
pub use rest::PostgrestStore;
