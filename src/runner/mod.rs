pub mod runner;
pub mod target_model;
