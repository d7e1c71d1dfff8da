//! Citation model (scripture reference extracted from an answer)

use serde::{Deserialize, Serialize};

use super::Span;

/// A scripture reference attached to an assistant answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    /// Canonical reference, e.g. "John 3:16"
    #[serde(rename = "ref")]
    pub reference: String,
    /// Quoted passage text (may be empty)
    #[serde(default)]
    pub text: String,
    /// Highlight ranges into the answer text
    #[serde(default)]
    pub spans: Vec<Span>,
}

impl Citation {
    /// Most citations kept per answer
    pub const MAX_PER_ANSWER: usize = 5;

    /// Citation with only a reference (no text, no spans)
    pub fn from_ref(reference: impl Into<String>) -> Self {
        Self {
            reference: reference.into(),
            text: String::new(),
            spans: Vec::new(),
        }
    }

    /// A citation without a reference cannot be navigated to
    pub fn is_valid(&self) -> bool {
        !self.reference.is_empty()
    }

    /// Drop invalid citations, dedupe by reference (first wins) and cap the list
    pub fn dedupe(citations: impl IntoIterator<Item = Self>) -> Vec<Self> {
        let mut out: Vec<Self> = Vec::new();
        for citation in citations {
            if !citation.is_valid() || out.iter().any(|c| c.reference == citation.reference) {
                continue;
            }
            out.push(citation);
            if out.len() == Self::MAX_PER_ANSWER {
                break;
            }
        }
        out
    }
}
