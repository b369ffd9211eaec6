//! Retrieval-augmented answering support.
//!
//! Routing decides whether a question is in-domain, augmentation retrieves
//! matching chunks and context assembly turns them into a system prompt.

pub mod augment;
pub mod context;
pub mod router;

pub use augment::retrieve_context;
pub use context::{build_rag_context, merge_context};
pub use router::should_use_rag;
