//! Delifast partner API integration.
//!
//! Pure mapping helpers (`ids`, `status`, `cities`, `extract`) plus the
//! token-caching auth layer and the HTTP client that all partner calls go
//! through.

pub mod auth;
pub mod cities;
pub mod client;
pub mod extract;
pub mod ids;
pub mod status;
