//! Interface definitions for the document store.
//!
//! This module defines the abstract `DocumentStore` trait that every
//! lifecycle and ingestion component receives at construction, allowing
//! the OpenSearch backend to be swapped for the in-memory one in tests.

mod document_store;

pub use document_store::DocumentStore;
