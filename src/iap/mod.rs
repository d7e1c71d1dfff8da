//! In-app purchases
//!
//! The platform store is reached through [`PurchaseStore`]. Purchase results
//! do not come back from [`PurchaseStore::purchase`]; the platform binding
//! pushes them into a [`PurchaseEventSender`] and the app reads them from the
//! paired [`PurchaseEvents`]. That channel repeats: one message per store
//! event, for as long as the sender lives. Restores are one-shot and return
//! their result directly.

use serde::{Deserialize, Serialize};
use std::future::Future;
use tokio::sync::mpsc;

pub use crate::models::RestoreOutcome;

/// Store response codes delivered with purchase events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResponseCode {
    /// Request succeeded
    Ok,
    /// The user dismissed the purchase sheet
    UserCanceled,
    /// Waiting for approval (e.g. Ask to Buy)
    Deferred,
    /// Store error
    Error,
}

/// A purchase record from the store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorePurchase {
    /// Product that was bought
    pub product_id: String,
    /// Transaction of this purchase
    pub transaction_id: String,
    /// First transaction of the subscription chain, when the store reports it
    #[serde(default)]
    pub original_transaction_id: Option<String>,
}

/// A product offered by the store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    /// Store product ID
    pub product_id: String,
    /// Localized title
    pub title: String,
    /// Localized price, e.g. "$8.99"
    pub price_string: Option<String>,
}

/// What the purchase listener delivers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseEvent {
    /// Overall result
    pub response_code: ResponseCode,
    /// Purchases covered by this event
    #[serde(default)]
    pub results: Vec<StorePurchase>,
    /// Platform error code
    #[serde(default)]
    pub error_code: Option<i32>,
}

/// Meaning of a purchase event for the subscription
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PurchaseOutcome {
    /// Bought; the subscription becomes active pending verification
    Purchased {
        /// Transaction of the purchase
        transaction_id: String,
    },
    /// User cancelled; nothing changes
    Cancelled,
    /// Waiting for approval; nothing changes yet
    Deferred,
    /// Success reported without any purchase attached
    Empty,
    /// Store failure
    Failed {
        /// Platform error code
        error_code: Option<i32>,
    },
}

impl PurchaseEvent {
    /// Classify this event
    pub fn outcome(&self) -> PurchaseOutcome {
        match self.response_code {
            ResponseCode::Ok => self
                .results
                .first()
                .map_or(PurchaseOutcome::Empty, |p| PurchaseOutcome::Purchased {
                    transaction_id: p.transaction_id.clone(),
                }),
            ResponseCode::UserCanceled => PurchaseOutcome::Cancelled,
            ResponseCode::Deferred => PurchaseOutcome::Deferred,
            ResponseCode::Error => PurchaseOutcome::Failed {
                error_code: self.error_code,
            },
        }
    }
}

/// Purchase failures surfaced to the caller
#[derive(Debug, thiserror::Error)]
pub enum PurchaseError {
    /// No store on this platform
    #[error("In-app purchases are not available on this platform")]
    Unavailable,
    /// Could not reach the store
    #[error("Failed to initialize purchases: {0}")]
    Connect(String),
    /// The user cancelled the purchase sheet
    #[error("Purchase cancelled")]
    UserCancelled,
    /// The store rejected the purchase
    #[error("Purchase failed (code {error_code:?})")]
    Failed {
        /// Platform error code
        error_code: Option<i32>,
    },
    /// Any other store error
    #[error("Store error: {0}")]
    Store(String),
}

/// The platform purchase API
pub trait PurchaseStore: Send + Sync {
    /// Open the store connection
    fn connect(&self) -> impl Future<Output = Result<(), PurchaseError>> + Send;

    /// Look up products
    fn products(
        &self,
        product_ids: &[String],
    ) -> impl Future<Output = Result<Vec<Product>, PurchaseError>> + Send;

    /// Start a purchase; the result arrives as a [`PurchaseEvent`]
    fn purchase(&self, product_id: &str) -> impl Future<Output = Result<(), PurchaseError>> + Send;

    /// Previous purchases of this user
    fn purchase_history(&self)
    -> impl Future<Output = Result<Vec<StorePurchase>, PurchaseError>> + Send;
}

/// Sending half handed to the platform purchase listener
#[derive(Debug, Clone)]
pub struct PurchaseEventSender {
    tx: mpsc::UnboundedSender<PurchaseEvent>,
}

impl PurchaseEventSender {
    /// Deliver an event. Returns false once the receiver is gone.
    pub fn deliver(&self, event: PurchaseEvent) -> bool {
        self.tx.send(event).is_ok()
    }
}

/// Receiving half read by the app
#[derive(Debug)]
pub struct PurchaseEvents {
    rx: mpsc::UnboundedReceiver<PurchaseEvent>,
}

impl PurchaseEvents {
    /// Wait for the next event; `None` once every sender is dropped
    pub async fn next(&mut self) -> Option<PurchaseEvent> {
        self.rx.recv().await
    }

    /// Take an event if one is waiting
    pub fn try_next(&mut self) -> Option<PurchaseEvent> {
        self.rx.try_recv().ok()
    }
}

/// Create a purchase event channel
pub fn purchase_channel() -> (PurchaseEventSender, PurchaseEvents) {
    let (tx, rx) = mpsc::unbounded_channel();
    (PurchaseEventSender { tx }, PurchaseEvents { rx })
}

/// Result of starting a purchase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PurchaseRequest {
    /// Purchase sheet shown; wait for the event
    Pending,
    /// User backed out before the store took the request
    Cancelled,
}

/// Connect-once wrapper around a [`PurchaseStore`] for one product
pub struct IapService<S> {
    store: S,
    product_id: String,
    connected: bool,
}

impl<S: PurchaseStore> IapService<S> {
    /// Create a service selling `product_id`
    pub fn new(store: S, product_id: impl Into<String>) -> Self {
        Self {
            store,
            product_id: product_id.into(),
            connected: false,
        }
    }

    /// Product this service sells
    pub fn product_id(&self) -> &str {
        &self.product_id
    }

    /// Connect to the store (no-op once connected)
    pub async fn connect(&mut self) -> Result<(), PurchaseError> {
        if self.connected {
            tracing::debug!("Store already connected");
            return Ok(());
        }
        self.store.connect().await.map_err(|e| match e {
            PurchaseError::Connect(_) | PurchaseError::Unavailable => e,
            other => PurchaseError::Connect(other.to_string()),
        })?;
        self.connected = true;
        tracing::info!("Store connected");
        Ok(())
    }

    /// Load the product details
    pub async fn products(&mut self) -> Result<Vec<Product>, PurchaseError> {
        self.connect().await?;
        let products = self.store.products(&[self.product_id.clone()]).await?;
        tracing::debug!("Loaded {} products", products.len());
        Ok(products)
    }

    /// Start buying the product
    pub async fn purchase(&mut self) -> Result<PurchaseRequest, PurchaseError> {
        self.connect().await?;
        tracing::info!("Starting purchase of {}", self.product_id);
        match self.store.purchase(&self.product_id).await {
            Ok(()) => Ok(PurchaseRequest::Pending),
            Err(PurchaseError::UserCancelled) => {
                tracing::debug!("Purchase cancelled by user");
                Ok(PurchaseRequest::Cancelled)
            }
            Err(e) => {
                tracing::warn!("Purchase failed: {}", e);
                Err(e)
            }
        }
    }

    /// Look for an earlier purchase of the product
    pub async fn restore(&mut self) -> Result<RestoreOutcome, PurchaseError> {
        self.connect().await?;
        let history = self.store.purchase_history().await?;

        let found = history.into_iter().find(|p| p.product_id == self.product_id);
        match found {
            Some(purchase) => {
                tracing::info!("Restore found {}", purchase.product_id);
                Ok(RestoreOutcome::Found {
                    transaction_id: purchase
                        .original_transaction_id
                        .unwrap_or(purchase.transaction_id),
                })
            }
            None => {
                tracing::info!("Restore found no matching purchase");
                Ok(RestoreOutcome::NotFound)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const PRODUCT: &str = "com.yourorg.biblechat.premium.weekly";

    #[derive(Default)]
    struct FakeStore {
        connects: AtomicUsize,
        history: Mutex<Vec<StorePurchase>>,
        purchase_error: Mutex<Option<PurchaseError>>,
    }

    impl PurchaseStore for FakeStore {
        async fn connect(&self) -> Result<(), PurchaseError> {
            self.connects.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn products(&self, product_ids: &[String]) -> Result<Vec<Product>, PurchaseError> {
            Ok(product_ids
                .iter()
                .map(|id| Product {
                    product_id: id.clone(),
                    title: "Premium".to_string(),
                    price_string: Some("$8.99".to_string()),
                })
                .collect())
        }

        async fn purchase(&self, _product_id: &str) -> Result<(), PurchaseError> {
            match self.purchase_error.lock().unwrap().take() {
                Some(e) => Err(e),
                None => Ok(()),
            }
        }

        async fn purchase_history(&self) -> Result<Vec<StorePurchase>, PurchaseError> {
            Ok(self.history.lock().unwrap().clone())
        }
    }

    fn purchase(product_id: &str, transaction_id: &str) -> StorePurchase {
        StorePurchase {
            product_id: product_id.to_string(),
            transaction_id: transaction_id.to_string(),
            original_transaction_id: None,
        }
    }

    #[test]
    fn test_event_outcomes() {
        let mut event = PurchaseEvent {
            response_code: ResponseCode::Ok,
            results: vec![purchase(PRODUCT, "tx-1")],
            error_code: None,
        };
        assert_eq!(
            event.outcome(),
            PurchaseOutcome::Purchased {
                transaction_id: "tx-1".to_string()
            }
        );

        event.results.clear();
        assert_eq!(event.outcome(), PurchaseOutcome::Empty);

        event.response_code = ResponseCode::UserCanceled;
        assert_eq!(event.outcome(), PurchaseOutcome::Cancelled);

        event.response_code = ResponseCode::Error;
        event.error_code = Some(7);
        assert_eq!(event.outcome(), PurchaseOutcome::Failed { error_code: Some(7) });
    }

    #[tokio::test]
    async fn test_connects_once() {
        let mut service = IapService::new(FakeStore::default(), PRODUCT);
        service.connect().await.unwrap();
        let products = service.products().await.unwrap();
        assert_eq!(products[0].price_string.as_deref(), Some("$8.99"));
        assert_eq!(service.store.connects.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_restore_matches_product() {
        let store = FakeStore::default();
        store
            .history
            .lock()
            .unwrap()
            .extend([purchase("other.product", "tx-0"), purchase(PRODUCT, "tx-5")]);
        let mut service = IapService::new(store, PRODUCT);
        assert_eq!(
            service.restore().await.unwrap(),
            RestoreOutcome::Found {
                transaction_id: "tx-5".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_restore_empty_history() {
        let mut service = IapService::new(FakeStore::default(), PRODUCT);
        assert_eq!(service.restore().await.unwrap(), RestoreOutcome::NotFound);
    }

    #[tokio::test]
    async fn test_purchase_cancel_is_not_an_error() {
        let store = FakeStore::default();
        *store.purchase_error.lock().unwrap() = Some(PurchaseError::UserCancelled);
        let mut service = IapService::new(store, PRODUCT);
        assert_eq!(service.purchase().await.unwrap(), PurchaseRequest::Cancelled);

        *service.store.purchase_error.lock().unwrap() = Some(PurchaseError::Failed {
            error_code: Some(2),
        });
        assert!(matches!(
            service.purchase().await,
            Err(PurchaseError::Failed { error_code: Some(2) })
        ));
        assert_eq!(service.purchase().await.unwrap(), PurchaseRequest::Pending);
    }

    #[tokio::test]
    async fn test_channel_delivers_in_order() {
        let (tx, mut events) = purchase_channel();
        assert!(events.try_next().is_none());

        for code in [ResponseCode::Deferred, ResponseCode::UserCanceled] {
            tx.deliver(PurchaseEvent {
                response_code: code,
                results: Vec::new(),
                error_code: None,
            });
        }
        assert_eq!(events.next().await.unwrap().response_code, ResponseCode::Deferred);
        assert_eq!(events.try_next().unwrap().response_code, ResponseCode::UserCanceled);

        drop(tx);
        assert!(events.next().await.is_none());
    }
}
