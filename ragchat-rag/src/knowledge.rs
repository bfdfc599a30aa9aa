//! Readiness gate between startup seeding and request handling.
//!
//! Seeding runs once, possibly while the server is already accepting
//! connections. [`knowledge_base`] returns a [`KnowledgePublisher`] for the
//! seeding task and a cloneable [`KnowledgeBase`] handle for request
//! handlers. Handlers call [`KnowledgeBase::wait`] before touching the store;
//! the store is published exactly once and is immutable afterwards.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{info, warn};

use crate::error::{RagError, Result};
use crate::store::DocumentStore;

#[derive(Debug, Clone)]
enum Readiness {
    Pending,
    Ready(Arc<DocumentStore>),
    Failed,
}

/// Create a linked publisher/handle pair in the pending state.
pub fn knowledge_base() -> (KnowledgePublisher, KnowledgeBase) {
    let (tx, rx) = watch::channel(Readiness::Pending);
    (KnowledgePublisher { tx }, KnowledgeBase { rx })
}

/// The seeding side of the readiness gate.
///
/// Dropping the publisher without calling [`publish`](KnowledgePublisher::publish)
/// is equivalent to [`fail`](KnowledgePublisher::fail).
#[derive(Debug)]
pub struct KnowledgePublisher {
    tx: watch::Sender<Readiness>,
}

impl KnowledgePublisher {
    /// Make the seeded store visible to every waiting and future request.
    pub fn publish(self, store: DocumentStore) {
        info!(documents = store.len(), dimensions = store.dimensions(), "knowledge base ready");
        self.tx.send_replace(Readiness::Ready(Arc::new(store)));
    }

    /// Mark seeding as abandoned; waiters receive [`RagError::SeedingFailed`].
    pub fn fail(self) {
        warn!("knowledge base seeding abandoned");
        self.tx.send_replace(Readiness::Failed);
    }
}

/// Request-side handle to the (eventually) seeded [`DocumentStore`].
#[derive(Debug, Clone)]
pub struct KnowledgeBase {
    rx: watch::Receiver<Readiness>,
}

impl KnowledgeBase {
    /// A handle that is ready immediately with the given store.
    pub fn ready(store: DocumentStore) -> Self {
        let (publisher, handle) = knowledge_base();
        publisher.tx.send_replace(Readiness::Ready(Arc::new(store)));
        handle
    }

    /// The store, if it has been published.
    pub fn current(&self) -> Option<Arc<DocumentStore>> {
        match &*self.rx.borrow() {
            Readiness::Ready(store) => Some(Arc::clone(store)),
            _ => None,
        }
    }

    /// Whether the store has been published.
    pub fn is_ready(&self) -> bool {
        matches!(&*self.rx.borrow(), Readiness::Ready(_))
    }

    /// Wait up to `timeout` for the store to be published.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::NotReady`] when the wait elapses and
    /// [`RagError::SeedingFailed`] when seeding was abandoned.
    pub async fn wait(&self, timeout: Duration) -> Result<Arc<DocumentStore>> {
        let mut rx = self.rx.clone();
        let outcome =
            tokio::time::timeout(timeout, rx.wait_for(|r| !matches!(r, Readiness::Pending))).await;

        match outcome {
            Err(_) => Err(RagError::NotReady { waited: timeout }),
            Ok(Err(_)) => Err(RagError::SeedingFailed),
            Ok(Ok(readiness)) => match &*readiness {
                Readiness::Ready(store) => Ok(Arc::clone(store)),
                _ => Err(RagError::SeedingFailed),
            },
        }
    }
}
