//! Query-time retrieval and answer orchestration

pub mod answer;

pub use answer::AnswerPipeline;
