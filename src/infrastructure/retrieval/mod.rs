//! Retrieval source implementations

pub mod in_memory;
pub mod web_search;

pub use in_memory::InMemoryEvidenceSource;
pub use web_search::WebSearchSource;
