//! # Lyra Sync
//!
//! Client-side data layer for the Lyra tutoring app: live subscriptions
//! against a remote document store, non-blocking writes with side-channel
//! failure reporting, and the tutor prompt flows.
//!
//! ## Core Concepts
//!
//! - **Live subscriptions**: watch a query or a document; snapshots replace
//!   local state wholesale
//! - **Optimistic writes**: fire-and-forget create/set/update/delete; the
//!   UI moves on immediately
//! - **Error channel**: denied requests become structured permission
//!   diagnostics, broadcast to whoever listens
//! - **Flows**: named prompt templates executed against an inference client
//!
//! ## Example
//!
//! ```ignore
//! use lyra_sync::{model, MemoryStore, MemoryIdentity, SyncConfig, SyncContext};
//! use std::sync::Arc;
//!
//! let context = SyncContext::new(
//!     Arc::new(MemoryStore::new()),
//!     Arc::new(MemoryIdentity::new()),
//!     SyncConfig::default(),
//! );
//!
//! // Watch a student's sessions
//! let mut sessions = context.live_query();
//! sessions.set_target(Some(model::recent_sessions("u1", 10)));
//!
//! // Write without waiting; failures arrive on the error channel
//! let writer = context.writer();
//! writer.create(&model::chat_sessions("u1"), fields);
//! ```

pub mod auth;
pub mod context;
pub mod error;
pub mod events;
pub mod live;
pub mod model;
pub mod permission;
pub mod store;
pub mod tutor;
pub mod types;
pub mod writes;

// Re-exports
pub use auth::{Actor, AuthError, IdentityProvider, MemoryIdentity, ProviderProfile};
pub use context::{SyncConfig, SyncContext};
pub use error::{Result, SyncError};
pub use events::{ErrorBus, EventBus, ListenerId, PERMISSION_ERROR_EVENT};
pub use live::{LiveDocument, LiveQuery, Phase, SubscriptionState};
pub use model::{Author, ChatMessage, ChatSession, Role, TutorSettings, UserProfile};
pub use permission::{ErrorReporter, PermissionError, SecurityRuleContext};
pub use store::{
    DeniedRequest, MemoryStore, StoreClient, WatchEvent, WatchHandle, WatchId, WriteOutcome,
    WriteTicket,
};
pub use tutor::{
    FlowReply, FlowRequest, InferenceClient, InferenceError, PromptTemplate, ScriptedInference,
    TemplateError, Tutor, TUTOR_RESPONSE_FLOW,
};
pub use types::*;
pub use writes::Writer;
