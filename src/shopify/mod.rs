//! Shopify-side types and the best-effort order annotation client.

pub mod annotate;
pub mod order;
