//! Subscription persistence.

use async_trait::async_trait;
use std::path::Path;
use tracing::{debug, instrument};
use xrate_store::{FileStore, StoreError};

use crate::error::{NotifyError, NotifyResult};
use crate::model::Subscription;

/// Storage of subscriptions.
#[async_trait]
pub trait SubscriptionRepository: Send + Sync {
    /// Add a subscription. Fails with [`NotifyError::SubscriptionExists`]
    /// when the same address already follows the same topic.
    async fn add(&self, subscription: &Subscription) -> NotifyResult<()>;

    /// Every stored subscription. An empty store yields an empty list.
    async fn list(&self) -> NotifyResult<Vec<Subscription>>;
}

/// Repository backed by a [`FileStore`], one file per subscription.
#[derive(Debug, Clone)]
pub struct FileSubscriptionRepository {
    store: FileStore<Subscription>,
}

impl FileSubscriptionRepository {
    pub fn new(base_dir: impl AsRef<Path>) -> Self {
        Self {
            store: FileStore::new(base_dir),
        }
    }

    pub fn store(&self) -> &FileStore<Subscription> {
        &self.store
    }
}

#[async_trait]
impl SubscriptionRepository for FileSubscriptionRepository {
    #[instrument(skip(self, subscription), fields(key = %subscription.key()))]
    async fn add(&self, subscription: &Subscription) -> NotifyResult<()> {
        let store = self.store.clone();
        let key = subscription.key();
        let record = subscription.clone();

        let result = tokio::task::spawn_blocking(move || store.store(&key, &record)).await?;

        match result {
            Ok(()) => {
                debug!("Subscription stored");
                Ok(())
            }
            Err(StoreError::AlreadyExists { .. }) => Err(NotifyError::SubscriptionExists {
                address: subscription.address().as_str().to_string(),
                topic: subscription.topic.clone(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    async fn list(&self) -> NotifyResult<Vec<Subscription>> {
        let store = self.store.clone();

        match tokio::task::spawn_blocking(move || store.fetch_all()).await? {
            Ok(subscriptions) => Ok(subscriptions),
            Err(e) if e.is_not_found() => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }
}
