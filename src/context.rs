//! Wiring: one [`SyncContext`] per embedding application.

use crate::auth::IdentityProvider;
use crate::events::{ErrorBus, EventBus};
use crate::live::{LiveDocument, LiveQuery};
use crate::permission::ErrorReporter;
use crate::store::StoreClient;
use crate::types::DEFAULT_DATABASE;
use crate::writes::{WriteRouter, Writer};
use std::sync::Arc;

/// Sync layer configuration.
#[derive(Clone, Debug)]
pub struct SyncConfig {
    /// Database id used in qualified resource names.
    pub database: String,

    /// Max queued write completions before failure reports are dropped.
    pub write_queue: usize,

    /// Redundant target re-supplies tolerated before the diagnostic fires.
    pub retarget_warn_threshold: u32,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            database: DEFAULT_DATABASE.to_string(),
            write_queue: 256,
            retarget_warn_threshold: 3,
        }
    }
}

/// Ties the sync layer together: store client, identity provider, error
/// channel, permission reporting, and the write completion router.
///
/// Everything is constructor-injected; the context owns the only background
/// worker (the write router) and joins it on drop.
pub struct SyncContext {
    store: Arc<dyn StoreClient>,
    bus: ErrorBus,
    reporter: ErrorReporter,
    router: WriteRouter,
    config: SyncConfig,
}

impl SyncContext {
    pub fn new(
        store: Arc<dyn StoreClient>,
        identity: Arc<dyn IdentityProvider>,
        config: SyncConfig,
    ) -> Self {
        let bus: ErrorBus = EventBus::new();
        let reporter = ErrorReporter::new(identity, bus.clone(), config.database.clone());
        let router = WriteRouter::spawn(reporter.clone(), config.write_queue);
        Self {
            store,
            bus,
            reporter,
            router,
            config,
        }
    }

    /// The error channel; clone to subscribe or publish.
    pub fn bus(&self) -> &ErrorBus {
        &self.bus
    }

    pub fn reporter(&self) -> &ErrorReporter {
        &self.reporter
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// A non-blocking writer routed through this context's completion
    /// router.
    pub fn writer(&self) -> Writer {
        Writer::new(Arc::clone(&self.store), self.router.sender())
    }

    /// A fresh live collection subscription (idle until targeted).
    pub fn live_query(&self) -> LiveQuery {
        LiveQuery::new(
            Arc::clone(&self.store),
            self.reporter.clone(),
            self.config.retarget_warn_threshold,
        )
    }

    /// A fresh live document subscription (idle until targeted).
    pub fn live_document(&self) -> LiveDocument {
        LiveDocument::new(
            Arc::clone(&self.store),
            self.reporter.clone(),
            self.config.retarget_warn_threshold,
        )
    }
}
