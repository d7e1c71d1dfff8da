//! # Bible Chat
//!
//! Client core for a scripture chat app.
//!
//! ## Overview
//!
//! The backend answers questions about scripture and checks subscriptions;
//! the platform store sells them. This crate is what sits between those and
//! the screens: it turns answer text into citations and passage deeplinks,
//! keeps the subscription state honest across store events and server
//! checks, and caches the daily verse.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                          App                                │
//! │   Owns the state, applies worker results between awaits     │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!          ┌───────────────────┼───────────────────┐
//!          ▼                   ▼                   ▼
//! ┌─────────────────┐ ┌─────────────────┐ ┌─────────────────┐
//! │    UserStore    │ │     Worker      │ │   ChatSession   │
//! │                 │ │                 │ │                 │
//! │ • Subscription  │ │ • Chat          │ │ • Transcript    │
//! │ • Verse cache   │ │ • Scripture     │ │ • Citations     │
//! │ • Preferences   │ │ • Verification  │ │ • Deeplinks     │
//! └─────────────────┘ └─────────────────┘ └─────────────────┘
//!          │                   │                   │
//!          ▼                   ▼                   ▼
//! ┌─────────────────┐ ┌─────────────────┐ ┌─────────────────┐
//! │    Database     │ │       API       │ │    Reference    │
//! │                 │ │                 │ │                 │
//! │ • kv_store      │ │ • Backend trait │ │ • Parse refs    │
//! │ • bc_user_v1    │ │ • reqwest impl  │ │ • Normalize     │
//! └─────────────────┘ └─────────────────┘ └─────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`api`]: Backend contract and HTTP client
//! - [`app`]: State owner and async worker
//! - [`chat`]: Conversation transcript
//! - [`clock`]: Time source for cache staleness
//! - [`config`]: Configuration management
//! - [`db`]: `SQLite` key-value persistence
//! - [`iap`]: Store contract, purchase events and restore
//! - [`models`]: Data models (Citation, Verse, Subscription)
//! - [`paths`]: Data directory layout
//! - [`reference`]: Scripture reference parsing and deeplinks
//! - [`store`]: Persisted user state and the daily verse cache
//!
//! ## Example
//!
//! ```
//! use biblechat::Locale;
//! use biblechat::reference::{build_passage_deeplink, parse_citations};
//!
//! let refs = parse_citations("Read John 3:16 and Romans 8:28.", Locale::En);
//! assert_eq!(refs, vec!["John 3:16", "Romans 8:28"]);
//! assert_eq!(
//!     build_passage_deeplink("Jn 3:16", Locale::En),
//!     "app://passage/John%203%3A16"
//! );
//! ```

#![doc(html_root_url = "https://docs.rs/biblechat/0.3.0")]
#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::option_if_let_else)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::trivially_copy_pass_by_ref)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::use_self)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::should_implement_trait)]
#![allow(clippy::return_self_not_must_use)]

pub mod api;
pub mod app;
pub mod chat;
pub mod clock;
pub mod config;
pub mod db;
pub mod iap;
pub mod models;
pub mod paths;
pub mod reference;
pub mod store;

// Re-export main types for convenience
pub use api::{ApiClient, ApiError, Backend};
pub use app::App;
pub use chat::ChatSession;
pub use config::Config;
pub use db::Database;
pub use iap::{PurchaseError, PurchaseEvent, PurchaseOutcome};
pub use models::{Citation, Locale, SubscriptionState, SubscriptionStatus, Verse};
pub use store::{UserState, UserStore};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
