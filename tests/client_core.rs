//! End-to-end checks of the public API

use std::sync::Arc;

use biblechat::clock::ManualClock;
use biblechat::iap::{
    IapService, Product, PurchaseError, PurchaseEvent, PurchaseStore, ResponseCode, StorePurchase,
    purchase_channel,
};
use biblechat::models::{RestoreOutcome, SubscriptionStatus, Verse, VerseNumber};
use biblechat::reference::{
    build_passage_deeplink, find_first_match, normalize_ref, parse_citations,
    parse_passage_deeplink, truncate_citation,
};
use biblechat::{App, Config, Database, Locale, UserStore};
use chrono::Duration;
use tempfile::tempdir;

const PRODUCT: &str = "com.yourorg.biblechat.premium.weekly";

fn verse() -> Verse {
    Verse {
        reference: "Romans 8:28".to_string(),
        book: "Romans".to_string(),
        chapter: 8,
        verse: VerseNumber::Single(28),
        text: "And we know that all things work together for good".to_string(),
        spans: None,
    }
}

#[test]
fn resolver_properties() {
    let text = "John 3:16, John 3:16, Romans 8:28, Psalm 23:1, Genesis 1:1, Exodus 20:3, Mark 1:1";
    let refs = parse_citations(text, Locale::En);
    assert_eq!(refs.len(), 5);
    assert_eq!(refs[0], "John 3:16");
    assert_eq!(refs[1], "Romans 8:28");

    assert_eq!(normalize_ref("Мф 5:3", Locale::Ru), "Матфея 5:3");
    assert_eq!(normalize_ref("Genesis", Locale::En), "Genesis");

    let link = build_passage_deeplink("Jn 3:16", Locale::En);
    assert_eq!(parse_passage_deeplink(&link).as_deref(), Some("John 3:16"));

    let long = "Song of Solomon 2:1-17, with more";
    let shortened = truncate_citation(long, 25);
    assert_eq!(shortened.chars().count(), 25);
    assert!(shortened.ends_with('…'));

    assert!(find_first_match("anything", "").is_none());
}

#[test]
fn state_survives_restart_in_sqlite() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("biblechat.sqlite");
    let clock = ManualClock::default();

    {
        let db = Database::open_path(&path).unwrap();
        let mut store = UserStore::hydrate(Box::new(db), Arc::new(clock.clone()));
        store.apply_purchase("tx-100");
        store.set_cached_daily_verse("kjv", verse());
    }

    let db = Database::open_path(&path).unwrap();
    let mut store = UserStore::hydrate(Box::new(db), Arc::new(clock.clone()));
    assert_eq!(store.subscription().status, SubscriptionStatus::Active);
    assert!(store.subscription().needs_server_validation);
    assert_eq!(
        store.get_cached_daily_verse("kjv").map(|c| c.verse.reference.as_str()),
        Some("Romans 8:28")
    );

    // One launch sync per session
    assert!(store.begin_launch_sync().is_some());
    assert!(store.begin_launch_sync().is_none());

    clock.advance(Duration::hours(24) + Duration::seconds(1));
    assert!(store.get_cached_daily_verse("kjv").is_none());
}

struct HistoryStore {
    history: Vec<StorePurchase>,
}

impl PurchaseStore for HistoryStore {
    async fn connect(&self) -> Result<(), PurchaseError> {
        Ok(())
    }

    async fn products(&self, _product_ids: &[String]) -> Result<Vec<Product>, PurchaseError> {
        Ok(Vec::new())
    }

    async fn purchase(&self, _product_id: &str) -> Result<(), PurchaseError> {
        Ok(())
    }

    async fn purchase_history(&self) -> Result<Vec<StorePurchase>, PurchaseError> {
        Ok(self.history.clone())
    }
}

fn app() -> App {
    let store = UserStore::hydrate(
        Box::new(Database::open_in_memory().unwrap()),
        Arc::new(ManualClock::default()),
    );
    App::new(Config::default(), store)
}

#[test]
fn restore_flow_through_app() {
    let mut app = app();
    let store = HistoryStore {
        history: vec![StorePurchase {
            product_id: PRODUCT.to_string(),
            transaction_id: "tx-7".to_string(),
            original_transaction_id: Some("tx-1".to_string()),
        }],
    };

    let outcome = tokio_test::block_on(async {
        let mut service = IapService::new(store, PRODUCT);
        service.restore().await
    })
    .unwrap();
    assert_eq!(
        outcome,
        RestoreOutcome::Found {
            transaction_id: "tx-1".to_string()
        }
    );

    assert!(app.apply_restore(&outcome).is_some());
    let subscription = app.store.subscription();
    assert_eq!(subscription.status, SubscriptionStatus::Active);
    assert_eq!(subscription.original_transaction_id.as_deref(), Some("tx-1"));
}

#[test]
fn restore_miss_on_free_user() {
    let mut app = app();
    assert!(app.apply_restore(&RestoreOutcome::NotFound).is_none());
    assert_eq!(app.store.subscription().status, SubscriptionStatus::Free);
    assert!(!app.store.subscription().needs_server_validation);
}

#[test]
fn purchase_events_arrive_through_channel() {
    let mut app = app();
    let (sender, mut events) = purchase_channel();

    sender.deliver(PurchaseEvent {
        response_code: ResponseCode::Deferred,
        results: Vec::new(),
        error_code: None,
    });
    sender.deliver(PurchaseEvent {
        response_code: ResponseCode::Ok,
        results: vec![StorePurchase {
            product_id: PRODUCT.to_string(),
            transaction_id: "tx-55".to_string(),
            original_transaction_id: None,
        }],
        error_code: None,
    });

    let mut verify = None;
    while let Some(event) = events.try_next() {
        if let Some(cmd) = app.handle_purchase_event(&event).unwrap() {
            verify = Some(cmd);
        }
    }
    assert!(verify.is_some());
    assert_eq!(app.store.subscription().status, SubscriptionStatus::Active);
    assert_eq!(
        app.store.subscription().original_transaction_id.as_deref(),
        Some("tx-55")
    );
}
