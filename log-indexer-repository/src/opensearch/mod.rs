//! OpenSearch implementation of the document store.
//!
//! Policies go through the Index State Management plugin, streams are
//! OpenSearch data streams, and documents are written with `create`
//! operations only.

mod client;
mod config;
mod documents;

pub use client::OpenSearchStore;
pub use config::OpenSearchConfig;
