//! User store: subscription state and the daily verse cache
//!
//! [`UserStore`] is the single owner of [`UserState`]. It is built once per
//! process with [`UserStore::hydrate`], every mutation writes the full state
//! back to its [`StateStorage`], and nothing else keeps a copy.
//!
//! A storage failure is logged and does not undo the in-memory change; the
//! next successful write carries the whole state again.

mod storage;

pub use storage::{MemoryStorage, StateStorage};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::clock::Clock;
use crate::models::{
    CachedDailyVerse, Locale, RestoreOutcome, SubscriptionState, Verse, VerifiedSubscription,
};

/// Storage key of the persisted state blob
pub const STATE_KEY: &str = "bc_user_v1";

/// Everything persisted across launches
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserState {
    /// Content locale
    #[serde(default)]
    pub locale: Locale,
    /// Active translation ID (`kjv`, `rst`)
    #[serde(default = "default_translation")]
    pub translation: String,
    /// Whether onboarding was finished
    #[serde(default)]
    pub onboarding_completed: bool,
    /// Subscription fields, stored flat in the blob
    #[serde(flatten)]
    pub subscription: SubscriptionState,
    /// Answers received on the free tier
    #[serde(default)]
    pub answers_count: u32,
    /// Daily verse per translation
    #[serde(default)]
    pub cached_daily_verses: BTreeMap<String, CachedDailyVerse>,
}

fn default_translation() -> String {
    Locale::default().default_translation().to_string()
}

impl Default for UserState {
    fn default() -> Self {
        Self {
            locale: Locale::default(),
            translation: default_translation(),
            onboarding_completed: false,
            subscription: SubscriptionState::default(),
            answers_count: 0,
            cached_daily_verses: BTreeMap::new(),
        }
    }
}

/// Handed out when a verification starts, presented when its result arrives
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct VerificationTicket(u64);

impl VerificationTicket {
    /// Sequence number of the verification
    pub const fn seq(&self) -> u64 {
        self.0
    }
}

/// Owner of the persisted user state
pub struct UserStore {
    state: UserState,
    storage: Box<dyn StateStorage>,
    clock: Arc<dyn Clock>,
    /// Last ticket handed out
    issued: u64,
    /// Newest ticket whose success was applied
    confirmed: Option<VerificationTicket>,
    /// Tickets up to this one predate the latest purchase or restore
    cycle_floor: u64,
    /// Launch sync already started this session
    launch_sync_started: bool,
}

impl UserStore {
    /// Load the persisted state, falling back to defaults
    pub fn hydrate(storage: Box<dyn StateStorage>, clock: Arc<dyn Clock>) -> Self {
        let state = match storage.load(STATE_KEY) {
            Ok(Some(raw)) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                tracing::warn!("Discarding unreadable user state: {}", e);
                UserState::default()
            }),
            Ok(None) => UserState::default(),
            Err(e) => {
                tracing::warn!("Failed to load user state: {}", e);
                UserState::default()
            }
        };

        tracing::debug!(
            "Hydrated user state: locale={}, status={}",
            state.locale,
            state.subscription.status
        );

        Self {
            state,
            storage,
            clock,
            issued: 0,
            confirmed: None,
            cycle_floor: 0,
            launch_sync_started: false,
        }
    }

    /// Current state
    pub fn state(&self) -> &UserState {
        &self.state
    }

    /// Current subscription state
    pub fn subscription(&self) -> &SubscriptionState {
        &self.state.subscription
    }

    /// Current locale
    pub fn locale(&self) -> Locale {
        self.state.locale
    }

    /// Current translation ID
    pub fn translation(&self) -> &str {
        &self.state.translation
    }

    fn persist(&self) {
        let raw = match serde_json::to_string(&self.state) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!("Failed to serialize user state: {}", e);
                return;
            }
        };
        if let Err(e) = self.storage.save(STATE_KEY, &raw) {
            tracing::warn!("Failed to persist user state: {}", e);
        }
    }

    // ==================== Preferences ====================

    /// Switch locale; the translation follows the locale default
    pub fn set_locale(&mut self, locale: Locale) {
        self.state.locale = locale;
        self.set_translation(locale.default_translation());
    }

    /// Switch translation, dropping the previous translation's daily verse
    pub fn set_translation(&mut self, translation: &str) {
        if self.state.translation != translation {
            let previous = std::mem::replace(&mut self.state.translation, translation.to_string());
            self.state.cached_daily_verses.remove(&previous);
            tracing::info!("Translation changed: {} -> {}", previous, translation);
        }
        self.persist();
    }

    /// Mark onboarding as done
    pub fn complete_onboarding(&mut self) {
        self.state.onboarding_completed = true;
        self.persist();
    }

    /// Count one more answer
    pub fn increment_answers_count(&mut self) {
        self.state.answers_count = self.state.answers_count.saturating_add(1);
        self.persist();
    }

    /// Reset the answer counter
    pub fn reset_answers_count(&mut self) {
        self.state.answers_count = 0;
        self.persist();
    }

    /// Whether a free user has used up the free answers
    pub fn is_gated(&self, free_answer_limit: u32) -> bool {
        !self.state.subscription.status.is_entitled() && self.state.answers_count >= free_answer_limit
    }

    // ==================== Subscription ====================

    /// Apply a successful purchase from the store listener (optimistic)
    pub fn apply_purchase(&mut self, transaction_id: &str) {
        self.state.subscription.apply_purchase(transaction_id);
        self.cycle_floor = self.issued;
        tracing::info!("Purchase recorded, awaiting server validation");
        self.persist();
    }

    /// Apply a restore-purchases result. Returns whether the state changed.
    pub fn apply_restore(&mut self, outcome: &RestoreOutcome) -> bool {
        let changed = self.state.subscription.apply_restore(outcome);
        if changed && matches!(outcome, RestoreOutcome::Found { .. }) {
            self.cycle_floor = self.issued;
        }
        if changed {
            tracing::info!("Restore applied: status={}", self.state.subscription.status);
            self.persist();
        } else {
            tracing::debug!("Restore left subscription unchanged");
        }
        changed
    }

    /// Start a verification and get its ticket
    pub fn begin_verification(&mut self) -> VerificationTicket {
        self.issued += 1;
        VerificationTicket(self.issued)
    }

    /// Start the launch-time verification.
    ///
    /// Returns a ticket only on the first call of the session, and only when
    /// there is something to verify.
    pub fn begin_launch_sync(&mut self) -> Option<VerificationTicket> {
        if self.launch_sync_started || !self.state.subscription.wants_verification() {
            return None;
        }
        self.launch_sync_started = true;
        Some(self.begin_verification())
    }

    /// Whether the launch verification was already started
    pub fn launch_sync_started(&self) -> bool {
        self.launch_sync_started
    }

    /// Apply what the backend reported.
    ///
    /// Results from a verification older than the newest applied one, or
    /// issued before the latest purchase or restore hit, are dropped.
    /// Returns whether the result was applied.
    pub fn apply_verification(
        &mut self,
        ticket: VerificationTicket,
        verified: VerifiedSubscription,
    ) -> bool {
        if ticket.seq() <= self.cycle_floor {
            tracing::debug!("Ignoring verification #{} from an earlier cycle", ticket.seq());
            return false;
        }
        if self.confirmed.is_some_and(|c| ticket < c) {
            tracing::debug!("Ignoring stale verification #{}", ticket.seq());
            return false;
        }
        self.confirmed = Some(ticket);
        self.state.subscription.apply_verification(verified);
        tracing::info!(
            "Subscription verified: status={}",
            self.state.subscription.status
        );
        self.persist();
        true
    }

    /// A verification failed; the current state stays as it is
    pub fn verification_failed(&self, ticket: VerificationTicket, reason: &str) {
        tracing::warn!(
            "Verification #{} failed, keeping status {}: {}",
            ticket.seq(),
            self.state.subscription.status,
            reason
        );
    }

    /// Back to a free subscription with no store data
    pub fn reset_subscription(&mut self) {
        self.state.subscription.reset();
        tracing::info!("Subscription reset");
        self.persist();
    }

    /// Wipe all persisted state.
    ///
    /// Verifications still in flight are discarded and the launch sync may
    /// run again.
    pub fn clear(&mut self) {
        self.state = UserState::default();
        self.cycle_floor = self.issued;
        self.confirmed = None;
        self.launch_sync_started = false;
        if let Err(e) = self.storage.remove(STATE_KEY) {
            tracing::warn!("Failed to remove user state: {}", e);
        }
    }

    // ==================== Daily verse cache ====================

    /// Store today's verse for a translation
    pub fn set_cached_daily_verse(&mut self, translation: &str, verse: Verse) {
        let entry = CachedDailyVerse {
            verse,
            updated_at: self.clock.now(),
        };
        self.state
            .cached_daily_verses
            .insert(translation.to_string(), entry);
        self.persist();
    }

    /// Cached verse for a translation, unless missing or older than 24 hours.
    ///
    /// Stale entries stay in place; only a translation switch or an explicit
    /// invalidation removes them.
    pub fn get_cached_daily_verse(&self, translation: &str) -> Option<&CachedDailyVerse> {
        let now = self.clock.now();
        self.state
            .cached_daily_verses
            .get(translation)
            .filter(|entry| entry.is_fresh(now))
    }

    /// Drop the cached verse for a translation
    pub fn invalidate_daily_verse_cache(&mut self, translation: &str) {
        if self.state.cached_daily_verses.remove(translation).is_some() {
            tracing::debug!("Invalidated daily verse cache for {}", translation);
        }
        self.persist();
    }
}
