//! Event channel for decoupled error reporting.
//!
//! A small publish-subscribe registry mapping event names to ordered
//! listener lists. The bus is an explicit object, built by whoever owns the
//! wiring and handed to publishers and subscribers; there is no process-wide
//! singleton.
//!
//! # Example
//!
//! ```ignore
//! let bus: ErrorBus = EventBus::new();
//!
//! let id = bus.subscribe(PERMISSION_ERROR_EVENT, |err| {
//!     eprintln!("denied: {err}");
//! });
//!
//! // ... later
//! bus.unsubscribe(PERMISSION_ERROR_EVENT, id);
//! ```

mod bus;

pub use bus::{EventBus, ListenerId};

use crate::permission::PermissionError;

/// Event name carrying [`PermissionError`] payloads.
pub const PERMISSION_ERROR_EVENT: &str = "permission-error";

/// The bus instantiation used throughout the sync layer.
pub type ErrorBus = EventBus<PermissionError>;
