//! Question routing: decides whether retrieval applies to a question.
//!
//! Only questions about the two in-domain products are augmented. Each name
//! matches with optional whitespace or a literal dot between its parts, or
//! as one concatenated token.

use std::sync::LazyLock;

use regex::RegexSet;

const DOMAIN_PATTERNS: [&str; 6] = [
    r"platform\s*ai",
    r"token\s*ai",
    r"platform\.ai",
    r"token\.ai",
    r"platformai",
    r"tokenai",
];

static DOMAIN_SET: LazyLock<RegexSet> = LazyLock::new(|| {
    RegexSet::new(DOMAIN_PATTERNS.iter().map(|p| format!("(?i){}", p)))
        .expect("valid domain patterns")
});

/// Whether `question` mentions an in-domain product.
pub fn should_use_rag(question: &str) -> bool {
    DOMAIN_SET.is_match(question)
}
