pub mod jsonl;
pub mod store;
