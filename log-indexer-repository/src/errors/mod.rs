//! Error types for the log indexer repository.

mod lifecycle_error;
mod store_error;

pub use lifecycle_error::{EntityKind, LifecycleError, Step};
pub use store_error::StoreError;
