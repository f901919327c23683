//! Observable state of a live subscription.

use crate::permission::PermissionError;

/// Lifecycle phase derived from the state triple.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    /// No target supplied.
    Idle,
    /// Target supplied, no snapshot yet.
    Loading,
    /// At least one snapshot received.
    Ready,
    /// The store refused the watch.
    Error,
}

/// The (data, loading, error) triple owned by a live component.
///
/// External code only reads it. Data is replaced wholesale on every
/// snapshot, never merged.
#[derive(Clone, Debug)]
pub struct SubscriptionState<T> {
    pub(crate) data: Option<T>,
    pub(crate) loading: bool,
    pub(crate) error: Option<PermissionError>,
}

impl<T> SubscriptionState<T> {
    pub(crate) fn idle() -> Self {
        Self {
            data: None,
            loading: false,
            error: None,
        }
    }

    pub fn data(&self) -> Option<&T> {
        self.data.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&PermissionError> {
        self.error.as_ref()
    }

    pub fn phase(&self) -> Phase {
        if self.error.is_some() {
            Phase::Error
        } else if self.loading {
            Phase::Loading
        } else if self.data.is_some() {
            Phase::Ready
        } else {
            Phase::Idle
        }
    }
}

impl<T> Default for SubscriptionState<T> {
    fn default() -> Self {
        Self::idle()
    }
}
