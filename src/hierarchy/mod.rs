pub mod parser;
pub mod pruner;
pub mod ui_node;
