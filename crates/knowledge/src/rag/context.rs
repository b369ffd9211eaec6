//! Context assembly from retrieved chunks.

use crate::types::RetrievalResult;

/// Instruction placed ahead of the retrieved snippets.
pub const RAG_INSTRUCTION: &str = "Use the following reference snippets to answer the question. \
Stay faithful to them, and if they are not sufficient to answer, say that you do not know.";

/// Format results as `[Doc N] label` blocks under the instruction.
///
/// Returns `None` when there are no results.
pub fn build_rag_context(results: &[RetrievalResult]) -> Option<String> {
    if results.is_empty() {
        return None;
    }

    let blocks = results
        .iter()
        .enumerate()
        .map(|(i, result)| format!("[Doc {}] {}\n{}", i + 1, result.source_label(), result.document))
        .collect::<Vec<_>>()
        .join("\n\n");

    Some(format!("{}\n\n{}", RAG_INSTRUCTION, blocks))
}

/// Append the retrieved context after the caller's context.
pub fn merge_context(caller: Option<&str>, rag: Option<String>) -> Option<String> {
    let caller = caller.filter(|c| !c.trim().is_empty());

    match (caller, rag) {
        (Some(caller), Some(rag)) => Some(format!("{}\n\n{}", caller, rag)),
        (Some(caller), None) => Some(caller.to_string()),
        (None, rag) => rag,
    }
}
