//! Async operations for the app core
//!
//! Network calls run on a worker task. The app sends commands over one
//! channel and reads results from another, so its state is only touched
//! between awaits.

use std::sync::Arc;
use tokio::sync::mpsc;

use crate::api::{ApiError, Backend, ChatResponse, VerifyRequest};
use crate::models::{Locale, Verse, VerifiedSubscription};
use crate::store::VerificationTicket;

/// Commands sent from the app to the async worker
#[derive(Debug, Clone)]
pub enum AsyncCommand {
    /// Ask the assistant
    Chat { text: String, locale: Locale },
    /// Fetch a passage
    Passage { reference: String, locale: Locale },
    /// Fetch today's verse for a translation
    DailyVerse { locale: Locale, translation: String },
    /// Check the subscription with the backend
    Verify {
        ticket: VerificationTicket,
        request: VerifyRequest,
    },
    /// Shutdown the worker
    Shutdown,
}

/// Results sent back from the async worker to the app
#[derive(Debug)]
pub enum AsyncResult {
    /// The assistant answered
    Answered { response: ChatResponse },
    /// The question could not be answered
    ChatFailed { error: ApiError },
    /// Passage fetched
    PassageLoaded { reference: String, verse: Verse },
    /// Passage fetch failed
    PassageFailed { reference: String, error: ApiError },
    /// Today's verse fetched
    DailyVerseLoaded { translation: String, verse: Verse },
    /// Today's verse could not be fetched
    DailyVerseFailed { translation: String, error: ApiError },
    /// The backend reported the subscription status
    Verified {
        ticket: VerificationTicket,
        verified: VerifiedSubscription,
    },
    /// Verification did not complete
    VerifyFailed {
        ticket: VerificationTicket,
        error: ApiError,
    },
}

/// Channel handles for communicating with the async worker
pub struct AsyncHandle {
    /// Send commands to the worker
    pub cmd_tx: mpsc::Sender<AsyncCommand>,
    /// Receive results from the worker
    pub result_rx: mpsc::Receiver<AsyncResult>,
}

impl AsyncHandle {
    /// Send a command and wait for the next result
    pub async fn request(&mut self, cmd: AsyncCommand) -> Option<AsyncResult> {
        self.cmd_tx.send(cmd).await.ok()?;
        self.result_rx.recv().await
    }

    /// Stop the worker
    pub async fn shutdown(&self) {
        let _ = self.cmd_tx.send(AsyncCommand::Shutdown).await;
    }
}

/// Spawn the async worker and return handles
pub fn spawn_worker<B: Backend>(backend: Arc<B>) -> AsyncHandle {
    let (cmd_tx, mut cmd_rx) = mpsc::channel::<AsyncCommand>(32);
    let (result_tx, result_rx) = mpsc::channel::<AsyncResult>(32);

    tokio::spawn(async move {
        while let Some(cmd) = cmd_rx.recv().await {
            let result = match cmd {
                AsyncCommand::Shutdown => break,
                AsyncCommand::Chat { text, locale } => handle_chat(&*backend, &text, locale).await,
                AsyncCommand::Passage { reference, locale } => {
                    handle_passage(&*backend, reference, locale).await
                }
                AsyncCommand::DailyVerse {
                    locale,
                    translation,
                } => handle_daily_verse(&*backend, locale, translation).await,
                AsyncCommand::Verify { ticket, request } => {
                    handle_verify(&*backend, ticket, &request).await
                }
            };
            if result_tx.send(result).await.is_err() {
                tracing::debug!("Result receiver dropped, stopping worker");
                break;
            }
        }
        tracing::debug!("Async worker stopped");
    });

    AsyncHandle { cmd_tx, result_rx }
}

async fn handle_chat<B: Backend>(backend: &B, text: &str, locale: Locale) -> AsyncResult {
    match backend.chat(text, locale).await {
        Ok(response) => AsyncResult::Answered { response },
        Err(e) => {
            tracing::warn!("Chat failed: {}", e);
            AsyncResult::ChatFailed { error: e }
        }
    }
}

async fn handle_passage<B: Backend>(backend: &B, reference: String, locale: Locale) -> AsyncResult {
    match backend.scripture(&reference, locale).await {
        Ok(verse) => AsyncResult::PassageLoaded { reference, verse },
        Err(error) => AsyncResult::PassageFailed { reference, error },
    }
}

async fn handle_daily_verse<B: Backend>(
    backend: &B,
    locale: Locale,
    translation: String,
) -> AsyncResult {
    match backend.daily_verse(locale).await {
        Ok(verse) => AsyncResult::DailyVerseLoaded { translation, verse },
        Err(error) => AsyncResult::DailyVerseFailed { translation, error },
    }
}

async fn handle_verify<B: Backend>(
    backend: &B,
    ticket: VerificationTicket,
    request: &VerifyRequest,
) -> AsyncResult {
    match backend.verify_subscription(request).await {
        Ok(response) => AsyncResult::Verified {
            ticket,
            verified: response.into_verified(),
        },
        Err(error) => AsyncResult::VerifyFailed { ticket, error },
    }
}
