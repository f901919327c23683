//! Remote document store abstraction.
//!
//! The sync layer talks to "the store" through [`StoreClient`]: push-channel
//! watches for queries and single documents, plus deferred-result write
//! primitives. Production embeds a vendor-backed client; [`MemoryStore`] is
//! the in-process reference implementation with a deny-rule security policy
//! for exercising the failure paths.

mod client;
mod memory;

pub use client::{
    DeniedRequest, StoreClient, WatchEvent, WatchHandle, WatchId, WriteOutcome, WriteTicket,
};
pub use memory::MemoryStore;
