pub mod catalog;
pub mod locator;
mod process;
pub mod report;
pub mod runtime;

pub use catalog::{Catalog, CatalogError, TargetCategory, TargetSpec};
pub use locator::{
    default_candidates, ToolCandidate, ToolError, ToolInvocation, ToolLocator, PROBE_TIMEOUT,
};
pub use report::{render_catalog, Reporter, Summary, SummaryEntry};
pub use runtime::{
    BatchRunner, GenerationResult, GenerationStatus, Generator, GENERATE_TIMEOUT,
};
