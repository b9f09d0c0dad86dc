//! Infrastructure layer - concrete adapters for external collaborators

pub mod http;
pub mod llm;
pub mod logging;
pub mod retrieval;
