//! Subscription state and its transitions
//!
//! The status is either an optimistic local guess (`needs_server_validation`
//! set, coming from a purchase or restore signal) or the last answer from the
//! backend. Only a successful verification clears the marker.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Subscription status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionStatus {
    /// No paid access
    #[default]
    Free,
    /// Free trial of the paid tier
    Trial,
    /// Paid and current
    Active,
    /// Paid access lapsed
    Expired,
}

impl SubscriptionStatus {
    /// Map a backend status string. Anything unknown counts as expired.
    pub fn from_server(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "active" => Self::Active,
            "trial" => Self::Trial,
            _ => Self::Expired,
        }
    }

    /// Whether this status grants paid access
    pub const fn is_entitled(&self) -> bool {
        matches!(self, Self::Active | Self::Trial)
    }

    /// Get the display name
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Free => "Free",
            Self::Trial => "Trial",
            Self::Active => "Active",
            Self::Expired => "Expired",
        }
    }
}

impl std::fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Result of looking through the store's purchase history
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestoreOutcome {
    /// A purchase of our product was found
    Found {
        /// Transaction of the matching purchase
        transaction_id: String,
    },
    /// History empty or no matching product
    NotFound,
}

/// Authoritative subscription data reported by the backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedSubscription {
    /// Status as reported
    pub status: SubscriptionStatus,
    /// End of the trial, if any
    pub trial_ends_at: Option<DateTime<Utc>>,
    /// Original transaction the entitlement is tied to
    pub original_transaction_id: Option<String>,
}

/// Client-side subscription state (persisted)
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionState {
    /// Current status
    #[serde(rename = "subscriptionStatus", default)]
    pub status: SubscriptionStatus,
    /// Status is a local guess awaiting backend confirmation
    #[serde(default)]
    pub needs_server_validation: bool,
    /// End of the trial, if known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trial_ends_at: Option<DateTime<Utc>>,
    /// Original store transaction
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_transaction_id: Option<String>,
}

impl SubscriptionState {
    /// Status confirmed by the backend and granting access
    pub const fn is_verified_entitlement(&self) -> bool {
        self.status.is_entitled() && !self.needs_server_validation
    }

    /// Launch sync should ask the backend about this state
    pub const fn wants_verification(&self) -> bool {
        self.needs_server_validation || self.original_transaction_id.is_some()
    }

    /// A purchase completed in the store (unverified)
    pub fn apply_purchase(&mut self, transaction_id: impl Into<String>) {
        self.status = SubscriptionStatus::Active;
        self.needs_server_validation = true;
        self.original_transaction_id = Some(transaction_id.into());
    }

    /// Apply a restore result.
    ///
    /// A miss drops an unverified guess back to free; neither a hit nor a
    /// miss touches an entitlement the backend has confirmed.
    /// Returns whether the state changed.
    pub fn apply_restore(&mut self, outcome: &RestoreOutcome) -> bool {
        let before = self.clone();
        match outcome {
            RestoreOutcome::Found { transaction_id } => {
                if !self.is_verified_entitlement() {
                    self.apply_purchase(transaction_id.clone());
                }
            }
            RestoreOutcome::NotFound => {
                if !self.is_verified_entitlement() {
                    self.status = SubscriptionStatus::Free;
                    self.needs_server_validation = false;
                }
            }
        }
        *self != before
    }

    /// Replace the status with what the backend reported
    pub fn apply_verification(&mut self, verified: VerifiedSubscription) {
        self.status = verified.status;
        self.needs_server_validation = false;
        self.trial_ends_at = verified.trial_ends_at;
        self.original_transaction_id = verified.original_transaction_id;
    }

    /// Back to a fresh free state
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
