//! # Log Indexer Repository
//!
//! This crate manages the lifecycle of time-series log data streams. It
//! defines the `DocumentStore` interface with an OpenSearch and an
//! in-memory implementation, the error taxonomy, and the components that
//! provision and tear down streams:
//!
//! - [`PolicyEngine`] registers rollover/retention policies
//! - [`TemplateManager`] registers the mapping and settings template bound to a policy
//! - [`StreamManager`] composes both into stream provisioning and teardown

pub mod errors;
pub mod interfaces;
pub mod lifecycle;
pub mod memory;
pub mod opensearch;
pub mod stream;
pub mod template;
pub mod types;

pub use errors::{EntityKind, LifecycleError, Step, StoreError};
pub use interfaces::DocumentStore;
pub use lifecycle::{Policy, PolicyEngine, Registration};
pub use memory::InMemoryStore;
pub use opensearch::{OpenSearchConfig, OpenSearchStore};
pub use stream::{PatternMode, Stream, StreamManager, StreamManagerConfig, StreamStatus};
pub use template::{build_template, IndexTemplate, TemplateManager};
pub use types::{BulkItem, BulkOp, BulkRequest, ItemStatus, StreamInfo};
