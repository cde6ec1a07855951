//! Embedded persistence for documents, chunks, and conversations

mod database;

pub use database::Database;
