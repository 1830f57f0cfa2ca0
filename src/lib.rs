pub mod cli;
pub mod context;
pub mod device;
pub mod error;
pub mod execution;
pub mod geometry;
pub mod hierarchy;
pub mod prompt;
pub mod report;
pub mod runner;
pub mod storage;
pub mod synthesis;
pub mod trace;
