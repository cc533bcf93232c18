//! Index templates: the schema and settings a stream's backing indices are
//! created with, and the binding to a lifecycle policy.

mod index_template;
mod manager;

pub use index_template::{build_template, pattern_matches, IndexTemplate, TemplateSettings};
pub use manager::TemplateManager;
