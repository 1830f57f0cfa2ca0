pub mod actions;
pub mod oracle;
