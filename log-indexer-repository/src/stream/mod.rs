//! Data stream provisioning and teardown.

mod config;
mod manager;
mod model;

pub use config::{PatternMode, StreamManagerConfig};
pub use manager::StreamManager;
pub use model::{Stream, StreamStatus};
