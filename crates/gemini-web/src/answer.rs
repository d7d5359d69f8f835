//! Parsed results handed back to the caller

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One fully parsed answer turn.
///
/// Ownership transfers to the caller; the client only keeps the identifier
/// triple needed to continue the conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Answer {
    /// Primary text content (first fragment of the first draft).
    pub content: String,
    pub conversation_id: String,
    pub response_id: String,
    /// Factuality/citation markers, kept as raw tree values.
    pub factuality_queries: Vec<Value>,
    /// The query as echoed back by the provider.
    pub text_query: String,
    /// Alternative drafts; index 0 is the accepted branch.
    pub choices: Vec<Choice>,
    /// Absolute URLs found anywhere in the drafts tree.
    pub links: Vec<String>,
    /// Image URLs attached to the accepted draft.
    pub images: Vec<String>,
    /// Declared language of the first fenced code block, if any.
    pub program_lang: Option<String>,
    /// Body of the first fenced code block, if any.
    pub code: Option<String>,
    pub status_code: u16,
}

/// One candidate draft of an answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Choice {
    /// Continuation id used to branch the conversation from this draft.
    pub id: String,
    /// Content fragments; the first one is the draft text.
    pub content: Vec<String>,
}

impl Choice {
    /// The draft's text, when present.
    pub fn text(&self) -> Option<&str> {
        self.content.first().map(String::as_str)
    }
}

/// Synthesized speech for a piece of text.
#[derive(Debug, Clone)]
pub struct SpeechAudio {
    /// Decoded audio bytes (OGG).
    pub audio: Vec<u8>,
    pub status_code: u16,
}

/// Result of a share-link or sandbox export.
#[derive(Debug, Clone)]
pub struct ExportedUrl {
    pub url: String,
    pub status_code: u16,
}
