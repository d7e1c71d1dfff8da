//! Bible Chat backend API
//!
//! The backend owns retrieval, answer generation and subscription checks.
//! This module only speaks its JSON contract.

pub mod client;

pub use client::ApiClient;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::future::Future;

use crate::models::{Citation, Locale, SubscriptionStatus, Verse, VerifiedSubscription};

/// Backend failures
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Transport failure or unreadable body
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    /// Non-success HTTP status
    #[error("Backend error {status}: {body}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body, if any
        body: String,
    },
    /// The backend answered with `success: false`
    #[error("Backend reported failure for {endpoint}")]
    Unsuccessful {
        /// Endpoint that failed
        endpoint: &'static str,
    },
}

impl ApiError {
    /// Whether trying again later may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network(e) => !e.is_decode(),
            Self::Status { status, .. } => *status >= 500 || *status == 429,
            Self::Unsuccessful { .. } => false,
        }
    }
}

/// Request body of `POST /api/chat`
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest<'a> {
    /// User question
    pub text: &'a str,
    /// Answer locale
    pub locale: Locale,
}

/// Response of `POST /api/chat`
#[derive(Debug, Clone, Deserialize)]
pub struct ChatResponse {
    /// Whether the backend produced an answer
    pub success: bool,
    /// Assistant answer
    #[serde(default)]
    pub answer: String,
    /// Structured citations (may be empty)
    #[serde(default)]
    pub citations: Vec<Citation>,
    /// False when the answer is not grounded in retrieved passages
    #[serde(default)]
    pub has_reliable_sources: bool,
}

/// `{success, data}` envelope of the scripture endpoints
#[derive(Debug, Deserialize)]
pub(crate) struct VerseEnvelope {
    pub success: bool,
    pub data: Option<Verse>,
}

/// Request body of `POST /api/subscription/verify`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyRequest {
    /// Store platform (`ios`)
    pub platform: String,
    /// Transaction to check
    pub transaction_id: String,
    /// Original transaction, preferred by the backend
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_transaction_id: Option<String>,
}

/// Response of `POST /api/subscription/verify`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyResponse {
    /// `active`, `trial` or anything else (expired)
    pub status: String,
    /// End of the trial
    #[serde(default)]
    pub trial_ends_at: Option<DateTime<Utc>>,
    /// Original transaction ID
    pub original_transaction_id: String,
}

impl VerifyResponse {
    /// Convert to the subscription model
    pub fn into_verified(self) -> VerifiedSubscription {
        VerifiedSubscription {
            status: SubscriptionStatus::from_server(&self.status),
            trial_ends_at: self.trial_ends_at,
            original_transaction_id: Some(self.original_transaction_id),
        }
    }
}

/// Operations the app needs from the backend
pub trait Backend: Send + Sync + 'static {
    /// Ask the assistant a question
    fn chat(
        &self,
        text: &str,
        locale: Locale,
    ) -> impl Future<Output = Result<ChatResponse, ApiError>> + Send;

    /// Fetch a passage by reference
    fn scripture(
        &self,
        reference: &str,
        locale: Locale,
    ) -> impl Future<Output = Result<Verse, ApiError>> + Send;

    /// Fetch today's verse
    fn daily_verse(&self, locale: Locale) -> impl Future<Output = Result<Verse, ApiError>> + Send;

    /// Ask the backend for the authoritative subscription status
    fn verify_subscription(
        &self,
        request: &VerifyRequest,
    ) -> impl Future<Output = Result<VerifyResponse, ApiError>> + Send;
}
