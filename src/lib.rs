pub mod cache;
pub mod cli;
pub mod config;
pub mod generator;
pub mod i18n;
pub mod llm;
pub mod search;
pub mod utils;

// Re-export commonly used types
pub use config::Config;
pub use generator::catalog::{SectionCatalog, SectionSpec};
pub use generator::progress::{ProgressEvent, ProgressReporter, ProgressSink};
pub use generator::types::{Report, ReportError};
pub use generator::workflow::{ReportPipeline, launch};
