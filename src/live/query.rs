//! Live collection subscription.

use super::state::SubscriptionState;
use crate::permission::ErrorReporter;
use crate::store::{StoreClient, WatchEvent, WatchHandle};
use crate::types::{DocRecord, QueryDescriptor, QuerySnapshot};
use crossbeam_channel::{RecvTimeoutError, TryRecvError};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Watches a collection query and mirrors its snapshots into local state.
///
/// Targets are compared structurally: re-supplying an equal descriptor is a
/// no-op rather than a teardown/reopen cycle, so callers cannot thrash the
/// channel by rebuilding descriptors each evaluation. Redundant re-supply
/// past the configured threshold is still flagged once, non-fatally.
pub struct LiveQuery {
    store: Arc<dyn StoreClient>,
    reporter: ErrorReporter,
    warn_threshold: u32,
    target: Option<QueryDescriptor>,
    watch: Option<WatchHandle<QuerySnapshot>>,
    state: SubscriptionState<Vec<DocRecord>>,
    redundant_retargets: u32,
    warned: bool,
}

impl LiveQuery {
    pub(crate) fn new(
        store: Arc<dyn StoreClient>,
        reporter: ErrorReporter,
        warn_threshold: u32,
    ) -> Self {
        Self {
            store,
            reporter,
            warn_threshold,
            target: None,
            watch: None,
            state: SubscriptionState::idle(),
            redundant_retargets: 0,
            warned: false,
        }
    }

    /// Change what this subscription watches.
    ///
    /// `None` resets to idle. A new descriptor closes the previous channel
    /// before opening the next one; an equal descriptor is deduplicated.
    pub fn set_target(&mut self, target: Option<QueryDescriptor>) {
        match target {
            None => {
                if let Some(watch) = self.watch.take() {
                    watch.close();
                }
                self.target = None;
                self.state = SubscriptionState::idle();
                self.redundant_retargets = 0;
                self.warned = false;
            }
            Some(descriptor) => {
                if self.target.as_ref() == Some(&descriptor) {
                    self.note_redundant_retarget(&descriptor);
                    return;
                }
                if let Some(watch) = self.watch.take() {
                    watch.close();
                }
                self.state.loading = true;
                self.state.error = None;
                self.watch = Some(self.store.watch_query(&descriptor));
                self.target = Some(descriptor);
                self.redundant_retargets = 0;
                self.warned = false;
            }
        }
    }

    fn note_redundant_retarget(&mut self, descriptor: &QueryDescriptor) {
        self.redundant_retargets += 1;
        if self.redundant_retargets >= self.warn_threshold && !self.warned {
            tracing::warn!(
                collection = %descriptor.collection,
                count = self.redundant_retargets,
                "live query target re-supplied without change; build the descriptor once and reuse it"
            );
            self.warned = true;
        }
    }

    /// Drain pending watch events into local state.
    pub fn pump(&mut self) {
        loop {
            let event = match self.watch.as_ref() {
                Some(watch) => watch.try_recv(),
                None => return,
            };
            match event {
                Ok(event) => self.apply(event),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    tracing::debug!("query watch channel closed by store");
                    self.watch = None;
                    break;
                }
            }
        }
    }

    /// Pump until the state settles out of loading or `timeout` elapses.
    /// Returns whether the state settled.
    pub fn wait_settled(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        self.pump();
        while self.state.loading {
            let Some(remaining) = deadline.checked_duration_since(Instant::now()) else {
                break;
            };
            let event = match self.watch.as_ref() {
                Some(watch) => watch.recv_timeout(remaining),
                None => break,
            };
            match event {
                Ok(event) => self.apply(event),
                Err(RecvTimeoutError::Timeout) => break,
                Err(RecvTimeoutError::Disconnected) => {
                    self.watch = None;
                    break;
                }
            }
        }
        !self.state.loading
    }

    fn apply(&mut self, event: WatchEvent<QuerySnapshot>) {
        match event {
            WatchEvent::Snapshot(snapshot) => {
                // Wholesale replacement; prior records are discarded
                self.state.data = Some(snapshot.docs);
                self.state.loading = false;
                self.state.error = None;
            }
            WatchEvent::Denied(denied) => {
                let error = self.reporter.report(denied.op, &denied.path, None);
                self.state.data = None;
                self.state.loading = false;
                self.state.error = Some(error);
            }
        }
    }

    pub fn state(&self) -> &SubscriptionState<Vec<DocRecord>> {
        &self.state
    }

    pub fn records(&self) -> Option<&[DocRecord]> {
        self.state.data.as_deref()
    }

    /// How many times the current target was redundantly re-supplied.
    pub fn redundant_retargets(&self) -> u32 {
        self.redundant_retargets
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::MemoryIdentity;
    use crate::events::EventBus;
    use crate::live::Phase;
    use crate::store::MemoryStore;
    use crate::types::{CollectionPath, DEFAULT_DATABASE};
    use serde_json::json;

    fn fixture() -> (Arc<MemoryStore>, LiveQuery) {
        let store = Arc::new(MemoryStore::new());
        let reporter = ErrorReporter::new(
            Arc::new(MemoryIdentity::new()),
            EventBus::new(),
            DEFAULT_DATABASE,
        );
        let query = LiveQuery::new(store.clone(), reporter, 3);
        (store, query)
    }

    fn sessions() -> QueryDescriptor {
        QueryDescriptor::collection(CollectionPath::parse("users/u1/chatSessions").unwrap())
    }

    #[test]
    fn test_redundant_retarget_is_deduplicated() {
        let (store, mut query) = fixture();

        query.set_target(Some(sessions()));
        assert_eq!(store.watch_count(), 1);

        // Freshly built but equal descriptors must not reopen the channel
        for _ in 0..5 {
            query.set_target(Some(sessions()));
        }
        assert_eq!(store.watch_count(), 1);
        assert_eq!(query.redundant_retargets(), 5);
    }

    #[test]
    fn test_retarget_closes_previous_watch() {
        let (store, mut query) = fixture();

        query.set_target(Some(sessions()));
        assert_eq!(store.watch_count(), 1);

        let other = QueryDescriptor::collection(
            CollectionPath::parse("users/u2/chatSessions").unwrap(),
        );
        query.set_target(Some(other));
        assert_eq!(store.watch_count(), 1);

        query.set_target(None);
        assert_eq!(store.watch_count(), 0);
        assert_eq!(query.state().phase(), Phase::Idle);
    }

    #[test]
    fn test_drop_tears_down_watch() {
        let (store, mut query) = fixture();
        query.set_target(Some(sessions()));
        assert_eq!(store.watch_count(), 1);
        drop(query);
        assert_eq!(store.watch_count(), 0);
    }

    #[test]
    fn test_pump_applies_snapshot() {
        let (store, mut query) = fixture();
        let mut fields = crate::types::Fields::new();
        fields.insert("subject".to_string(), json!("algebra"));
        store.create(
            &CollectionPath::parse("users/u1/chatSessions").unwrap(),
            fields,
        );

        query.set_target(Some(sessions()));
        assert!(query.state().is_loading());

        query.pump();
        assert_eq!(query.state().phase(), Phase::Ready);
        assert_eq!(query.records().unwrap().len(), 1);
    }
}
