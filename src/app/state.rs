//! Application state

use crate::api::{ApiError, VerifyRequest};
use crate::chat::ChatSession;
use crate::config::Config;
use crate::iap::{PurchaseError, PurchaseEvent, PurchaseOutcome, RestoreOutcome};
use crate::models::{Locale, Verse};
use crate::store::UserStore;

use super::async_ops::{AsyncCommand, AsyncResult};

/// User-facing text for a failed fetch
fn failure_message(what: &str, error: &ApiError) -> String {
    if error.is_retryable() {
        format!("{what}: {error}. Try again later.")
    } else {
        format!("{what}: {error}")
    }
}

/// Application state.
///
/// Methods either change state right away or return the [`AsyncCommand`]
/// the caller should hand to the worker. Worker results come back through
/// [`App::apply`].
pub struct App {
    /// Configuration
    pub config: Config,
    /// Persisted user state
    pub store: UserStore,
    /// Current conversation
    pub chat: ChatSession,
    /// Today's verse, once known
    pub daily_verse: Option<Verse>,
    /// Passage being viewed
    pub passage: Option<Verse>,
    /// Status message for the user
    pub status_message: Option<String>,
}

impl App {
    /// Create the app state
    pub fn new(config: Config, store: UserStore) -> Self {
        Self {
            config,
            store,
            chat: ChatSession::new(),
            daily_verse: None,
            passage: None,
            status_message: None,
        }
    }

    /// Set status message
    pub fn set_status(&mut self, message: impl Into<String>) {
        self.status_message = Some(message.into());
    }

    /// Current locale
    pub fn locale(&self) -> Locale {
        self.store.locale()
    }

    // ==================== Chat ====================

    /// Ask a question. `None` when it was blank or the free answers are used up.
    pub fn ask(&mut self, text: &str) -> Option<AsyncCommand> {
        if self.store.is_gated(self.config.free_answer_limit) {
            self.set_status("Free answers used up. Subscribe to keep asking.");
            return None;
        }
        if !self.chat.add_user_message(text) {
            return None;
        }
        Some(AsyncCommand::Chat {
            text: text.trim().to_string(),
            locale: self.locale(),
        })
    }

    /// Open a passage by reference
    pub fn open_passage(&mut self, reference: &str) -> AsyncCommand {
        self.passage = None;
        AsyncCommand::Passage {
            reference: reference.to_string(),
            locale: self.locale(),
        }
    }

    // ==================== Daily verse ====================

    /// Show today's verse from the cache, or ask the worker for it
    pub fn load_daily_verse(&mut self) -> Option<AsyncCommand> {
        let translation = self.store.translation().to_string();
        if let Some(cached) = self.store.get_cached_daily_verse(&translation) {
            tracing::debug!("Daily verse served from cache ({})", translation);
            self.daily_verse = Some(cached.verse.clone());
            return None;
        }
        Some(self.refresh_daily_verse())
    }

    /// Fetch today's verse even when a cached one is fresh
    pub fn refresh_daily_verse(&self) -> AsyncCommand {
        AsyncCommand::DailyVerse {
            locale: self.locale(),
            translation: self.store.translation().to_string(),
        }
    }

    /// Switch locale and reload the daily verse for the new translation
    pub fn set_locale(&mut self, locale: Locale) -> Option<AsyncCommand> {
        if locale == self.locale() {
            return None;
        }
        self.store.set_locale(locale);
        self.daily_verse = None;
        self.load_daily_verse()
    }

    // ==================== Subscription ====================

    fn verify_request(&self) -> Option<VerifyRequest> {
        let transaction_id = self.store.subscription().original_transaction_id.clone()?;
        Some(VerifyRequest {
            platform: self.config.platform.clone(),
            original_transaction_id: Some(transaction_id.clone()),
            transaction_id,
        })
    }

    /// Verification at launch, issued at most once per session
    pub fn start_launch_sync(&mut self) -> Option<AsyncCommand> {
        let request = self.verify_request()?;
        let ticket = self.store.begin_launch_sync()?;
        tracing::info!("Launch sync #{} started", ticket.seq());
        Some(AsyncCommand::Verify { ticket, request })
    }

    /// Verify now; `None` when there is no transaction to check
    pub fn verify(&mut self) -> Option<AsyncCommand> {
        let request = self.verify_request()?;
        let ticket = self.store.begin_verification();
        Some(AsyncCommand::Verify { ticket, request })
    }

    /// Apply an event from the purchase listener
    pub fn handle_purchase_event(
        &mut self,
        event: &PurchaseEvent,
    ) -> Result<Option<AsyncCommand>, PurchaseError> {
        match event.outcome() {
            PurchaseOutcome::Purchased { transaction_id } => {
                self.store.apply_purchase(&transaction_id);
                self.set_status("Subscription active");
                Ok(self.verify())
            }
            PurchaseOutcome::Cancelled | PurchaseOutcome::Empty => Ok(None),
            PurchaseOutcome::Deferred => {
                self.set_status("Purchase pending approval");
                Ok(None)
            }
            PurchaseOutcome::Failed { error_code } => {
                self.set_status("Purchase failed");
                Err(PurchaseError::Failed { error_code })
            }
        }
    }

    /// Apply a restore result, verifying it when it changed the subscription
    pub fn apply_restore(&mut self, outcome: &RestoreOutcome) -> Option<AsyncCommand> {
        let changed = self.store.apply_restore(outcome);
        match outcome {
            RestoreOutcome::Found { .. } => self.set_status("Purchases restored"),
            RestoreOutcome::NotFound => self.set_status("No purchases to restore"),
        }
        if changed && self.store.subscription().needs_server_validation {
            self.verify()
        } else {
            None
        }
    }

    // ==================== Worker results ====================

    /// Apply a worker result. Returns a follow-up command, if any.
    pub fn apply(&mut self, result: AsyncResult) -> Option<AsyncCommand> {
        match result {
            AsyncResult::Answered { response } => {
                let locale = self.locale();
                self.chat.add_answer(response, locale);
                if !self.store.subscription().status.is_entitled() {
                    self.store.increment_answers_count();
                }
                None
            }
            AsyncResult::ChatFailed { error } => {
                self.chat.add_error("Something went wrong. Please try again.");
                self.set_status(failure_message("Chat failed", &error));
                None
            }
            AsyncResult::PassageLoaded { reference, verse } => {
                tracing::debug!("Passage loaded: {}", reference);
                self.passage = Some(verse);
                None
            }
            AsyncResult::PassageFailed { reference, error } => {
                self.set_status(failure_message(&format!("Could not load {reference}"), &error));
                None
            }
            AsyncResult::DailyVerseLoaded { translation, verse } => {
                if translation != self.store.translation() {
                    tracing::debug!("Dropping daily verse for inactive translation {}", translation);
                    return None;
                }
                self.store.set_cached_daily_verse(&translation, verse.clone());
                self.daily_verse = Some(verse);
                None
            }
            AsyncResult::DailyVerseFailed { translation, error } => {
                let cached = self
                    .store
                    .get_cached_daily_verse(&translation)
                    .map(|c| c.verse.clone());
                match cached {
                    Some(verse) if translation == self.store.translation() => {
                        tracing::warn!("Daily verse fetch failed, using cache: {}", error);
                        self.daily_verse = Some(verse);
                    }
                    _ => self.set_status(failure_message("Could not load today's verse", &error)),
                }
                None
            }
            AsyncResult::Verified { ticket, verified } => {
                if self.store.apply_verification(ticket, verified) {
                    let status = self.store.subscription().status;
                    self.set_status(format!("Subscription: {status}"));
                }
                None
            }
            AsyncResult::VerifyFailed { ticket, error } => {
                self.store.verification_failed(ticket, &error.to_string());
                None
            }
        }
    }
}
