//! Application core
//!
//! [`App`] owns the user store and the chat session and changes them
//! synchronously. Anything that needs the network becomes an
//! [`AsyncCommand`] for the worker started by [`spawn_worker`]; its
//! [`AsyncResult`] is fed back through [`App::apply`].

mod async_ops;
mod state;

pub use async_ops::{AsyncCommand, AsyncHandle, AsyncResult, spawn_worker};
pub use state::App;

use anyhow::{Context, Result};
use std::sync::Arc;

use crate::clock::SystemClock;
use crate::config::Config;
use crate::db::Database;
use crate::store::UserStore;

/// Open the app with state from the default database
pub fn open(config: Config) -> Result<App> {
    let db = Database::open().context("Failed to open database")?;
    let store = UserStore::hydrate(Box::new(db), Arc::new(SystemClock));
    Ok(App::new(config, store))
}

/// Run a command and every follow-up it triggers
pub async fn run_command(app: &mut App, handle: &mut AsyncHandle, cmd: AsyncCommand) -> Result<()> {
    let mut next = Some(cmd);
    while let Some(cmd) = next.take() {
        let result = handle
            .request(cmd)
            .await
            .context("Async worker stopped")?;
        next = app.apply(result);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{ApiError, Backend, ChatResponse, VerifyRequest, VerifyResponse};
    use crate::clock::ManualClock;
    use crate::models::{Citation, Locale, SubscriptionStatus, Verse, VerseNumber};
    use crate::store::MemoryStorage;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeBackend {
        verify_requests: Mutex<Vec<VerifyRequest>>,
        offline: bool,
    }

    fn verse(reference: &str, text: &str) -> Verse {
        Verse {
            reference: reference.to_string(),
            book: "John".to_string(),
            chapter: 3,
            verse: VerseNumber::Single(16),
            text: text.to_string(),
            spans: None,
        }
    }

    impl Backend for FakeBackend {
        async fn chat(&self, text: &str, _locale: Locale) -> Result<ChatResponse, ApiError> {
            if self.offline {
                return Err(ApiError::Status {
                    status: 503,
                    body: String::new(),
                });
            }
            Ok(ChatResponse {
                success: true,
                answer: format!("You asked: {text}. See John 3:16."),
                citations: vec![Citation::from_ref("John 3:16")],
                has_reliable_sources: true,
            })
        }

        async fn scripture(&self, reference: &str, _locale: Locale) -> Result<Verse, ApiError> {
            Ok(verse(reference, "For God so loved the world"))
        }

        async fn daily_verse(&self, _locale: Locale) -> Result<Verse, ApiError> {
            Ok(verse("John 3:16", "For God so loved the world"))
        }

        async fn verify_subscription(
            &self,
            request: &VerifyRequest,
        ) -> Result<VerifyResponse, ApiError> {
            self.verify_requests.lock().unwrap().push(request.clone());
            Ok(VerifyResponse {
                status: "active".to_string(),
                trial_ends_at: None,
                original_transaction_id: request.transaction_id.clone(),
            })
        }
    }

    fn app() -> App {
        let store = UserStore::hydrate(
            Box::new(MemoryStorage::new()),
            Arc::new(ManualClock::default()),
        );
        App::new(Config::default(), store)
    }

    #[tokio::test]
    async fn test_chat_round_trip_through_worker() {
        let mut app = app();
        let mut handle = spawn_worker(Arc::new(FakeBackend::default()));

        let cmd = app.ask("What is grace?").unwrap();
        run_command(&mut app, &mut handle, cmd).await.unwrap();

        let answer = app.chat.last().unwrap();
        assert!(!answer.is_user());
        assert_eq!(answer.citations[0].reference, "John 3:16");
        assert_eq!(app.store.state().answers_count, 1);
        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_chat_failure_recorded() {
        let mut app = app();
        let backend = FakeBackend {
            offline: true,
            ..FakeBackend::default()
        };
        let mut handle = spawn_worker(Arc::new(backend));

        let cmd = app.ask("Anyone there?").unwrap();
        run_command(&mut app, &mut handle, cmd).await.unwrap();
        assert!(!app.chat.loading);
        assert_eq!(app.store.state().answers_count, 0);
        let status = app.status_message.as_deref().unwrap();
        assert!(status.starts_with("Chat failed"));
        assert!(status.ends_with("Try again later."));
    }

    #[tokio::test]
    async fn test_launch_sync_through_worker() {
        let mut app = app();
        app.store.apply_purchase("tx-42");
        let backend = Arc::new(FakeBackend::default());
        let mut handle = spawn_worker(Arc::clone(&backend));

        let cmd = app.start_launch_sync().unwrap();
        run_command(&mut app, &mut handle, cmd).await.unwrap();

        assert_eq!(app.store.subscription().status, SubscriptionStatus::Active);
        assert!(!app.store.subscription().needs_server_validation);
        assert_eq!(
            backend.verify_requests.lock().unwrap()[0].original_transaction_id.as_deref(),
            Some("tx-42")
        );
        assert!(app.start_launch_sync().is_none());
    }

    #[tokio::test]
    async fn test_daily_verse_and_passage() {
        let mut app = app();
        let mut handle = spawn_worker(Arc::new(FakeBackend::default()));

        let cmd = app.load_daily_verse().unwrap();
        run_command(&mut app, &mut handle, cmd).await.unwrap();
        assert!(app.store.get_cached_daily_verse("kjv").is_some());

        let cmd = app.open_passage("Psalm 23:1");
        run_command(&mut app, &mut handle, cmd).await.unwrap();
        assert_eq!(app.passage.as_ref().unwrap().reference, "Psalm 23:1");
    }
}
