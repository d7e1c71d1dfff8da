//! Data models for Bible Chat

mod citation;
mod locale;
mod message;
mod subscription;
mod verse;

pub use citation::Citation;
pub use locale::Locale;
pub use message::{Message, Role};
pub use subscription::{
    RestoreOutcome, SubscriptionState, SubscriptionStatus, VerifiedSubscription,
};
pub use verse::{CachedDailyVerse, Span, Verse, VerseNumber};
