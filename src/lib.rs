//! # Delifast Bridge Library
//!
//! Core functionality for the Shopify to Delifast delivery bridge:
//! the shipment lifecycle engine, partner API client, reconciliation jobs,
//! and the HTTP API surface.

pub mod auth;
pub mod config;
pub mod crypto;
pub mod db;
pub mod delifast;
pub mod error;
pub mod handlers;
pub mod jobs;
pub mod lifecycle;
pub mod mapper;
pub mod models;
pub mod repositories;
pub mod server;
pub mod shopify;
pub mod telemetry;
pub use migration;
