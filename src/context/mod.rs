pub mod adjacency;
pub mod context_model;
pub mod extractor;
pub mod locator;
