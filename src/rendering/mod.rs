//! Markdown rendering of retrieved knowledge.
//!
//! The [`KnowledgeContextFormatter`] produces the digest injected at session
//! start; [`format_knowledge_context`] is the plain-text shortcut.

mod knowledge_context;

pub use knowledge_context::{
    CURRENT_FILE_MISTAKES_PRIORITY, DEFAULT_MAX_TOKENS, FormatOptions, FormattedContext,
    KnowledgeContextFormatter, MISTAKES_TO_AVOID_PRIORITY, PATTERNS_PRIORITY, estimate_tokens,
    format_knowledge_context,
};
