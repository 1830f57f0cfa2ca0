pub mod engine;
pub mod prompt_model;
pub mod templates;
