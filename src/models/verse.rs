//! Verse model and the daily verse cache entry

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Character range inside a text, `start..end`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    /// First character (inclusive)
    pub start: usize,
    /// Last character (exclusive)
    pub end: usize,
}

impl Span {
    /// Create a new span
    pub const fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Whether the span is non-empty and fits inside a text of `len` characters
    pub const fn fits(&self, len: usize) -> bool {
        self.start < self.end && self.end <= len
    }
}

/// Verse number: a single verse or a range such as `"1-4"`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VerseNumber {
    /// Single verse
    Single(u32),
    /// Range as sent by the backend
    Range(String),
}

impl std::fmt::Display for VerseNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Single(n) => write!(f, "{n}"),
            Self::Range(r) => write!(f, "{r}"),
        }
    }
}

/// A scripture passage as returned by the backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verse {
    /// Canonical reference, e.g. "John 3:16"
    #[serde(rename = "ref")]
    pub reference: String,
    /// Book name
    pub book: String,
    /// Chapter number
    pub chapter: u32,
    /// Verse number or range
    pub verse: VerseNumber,
    /// Passage text
    pub text: String,
    /// Highlight ranges into `text`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spans: Option<Vec<Span>>,
}

/// A daily verse stored per translation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedDailyVerse {
    /// The cached verse
    pub verse: Verse,
    /// When it was stored
    pub updated_at: DateTime<Utc>,
}

impl CachedDailyVerse {
    /// How long an entry may be served
    pub const MAX_AGE_HOURS: i64 = 24;

    /// Whether the entry may still be served at `now`
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now - self.updated_at <= chrono::Duration::hours(Self::MAX_AGE_HOURS)
    }
}
