//! Document ingestion: chunking and the processing pipeline

pub mod chunker;
pub mod processor;

pub use chunker::chunk_text;
pub use processor::{DocumentProcessor, ProcessOutcome};
