pub mod chat;
pub mod chat_model;
pub mod extractor;
