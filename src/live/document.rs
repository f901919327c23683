//! Live single-document subscription.

use super::state::SubscriptionState;
use crate::permission::ErrorReporter;
use crate::store::{StoreClient, WatchEvent, WatchHandle};
use crate::types::{DocRecord, DocSnapshot, DocumentPath};
use crossbeam_channel::{RecvTimeoutError, TryRecvError};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Watches a single document.
///
/// The data slot is `Some(None)` once the store has confirmed the document
/// does not exist; that is a settled answer, not the pre-snapshot loading
/// state.
pub struct LiveDocument {
    store: Arc<dyn StoreClient>,
    reporter: ErrorReporter,
    warn_threshold: u32,
    target: Option<DocumentPath>,
    watch: Option<WatchHandle<DocSnapshot>>,
    state: SubscriptionState<Option<DocRecord>>,
    redundant_retargets: u32,
    warned: bool,
}

impl LiveDocument {
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

    /// Change which document this subscription watches.
    pub fn set_target(&mut self, target: Option<DocumentPath>) {
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
            Some(path) => {
                if self.target.as_ref() == Some(&path) {
                    self.redundant_retargets += 1;
                    if self.redundant_retargets >= self.warn_threshold && !self.warned {
                        tracing::warn!(
                            path = %path,
                            count = self.redundant_retargets,
                            "live document target re-supplied without change; build the path once and reuse it"
                        );
                        self.warned = true;
                    }
                    return;
                }
                if let Some(watch) = self.watch.take() {
                    watch.close();
                }
                self.state.loading = true;
                self.state.error = None;
                self.watch = Some(self.store.watch_document(&path));
                self.target = Some(path);
                self.redundant_retargets = 0;
                self.warned = false;
            }
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
                    tracing::debug!("document watch channel closed by store");
                    self.watch = None;
                    break;
                }
            }
        }
    }

    /// Pump until the state settles out of loading or `timeout` elapses.
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

    fn apply(&mut self, event: WatchEvent<DocSnapshot>) {
        match event {
            WatchEvent::Snapshot(snapshot) => {
                let record = snapshot
                    .data
                    .map(|fields| DocRecord::new(snapshot.id, fields));
                self.state.data = Some(record);
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

    pub fn state(&self) -> &SubscriptionState<Option<DocRecord>> {
        &self.state
    }

    /// The current record, if the document exists.
    pub fn record(&self) -> Option<&DocRecord> {
        self.state.data.as_ref().and_then(Option::as_ref)
    }

    /// Whether the store has confirmed the document does not exist.
    pub fn is_absent(&self) -> bool {
        matches!(self.state.data, Some(None))
    }

    /// How many times the current target was redundantly re-supplied.
    pub fn redundant_retargets(&self) -> u32 {
        self.redundant_retargets
    }
}
