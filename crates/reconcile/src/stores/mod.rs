#![forbid(unsafe_code)]

mod base_annotations;
mod knowledge_base;

pub use base_annotations::BaseAnnotations;
pub use knowledge_base::{Facts, KnowledgeBase};
