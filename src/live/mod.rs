//! Live subscriptions: keep local state consistent with the store.
//!
//! [`LiveQuery`] watches a collection, [`LiveDocument`] a single document.
//! Both expose a [`SubscriptionState`] triple (data, loading, error) and a
//! pull-based [`pump`](LiveQuery::pump) that drains pending snapshots on the
//! caller's thread; the layer assumes an event-loop host and spawns nothing.
//!
//! Lifecycle: absent target -> idle; new target -> loading (the previous
//! channel is closed before the next one opens); snapshot -> ready; store
//! denial -> error, with the diagnostic also broadcast on the error channel.
//! Dropping a component tears its watch down from any state.

mod document;
mod query;
mod state;

pub use document::LiveDocument;
pub use query::LiveQuery;
pub use state::{Phase, SubscriptionState};
