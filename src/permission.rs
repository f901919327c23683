//! Structured permission-denial diagnostics.
//!
//! When the store rejects a request, the surrounding UI only needs a flag;
//! the developer debugging a security policy needs the full picture. A
//! [`PermissionError`] mirrors the shape of the policy evaluation request
//! that was denied: who asked, what verb, which resource, and the payload
//! for writes.

use crate::auth::{Actor, IdentityProvider};
use crate::events::{ErrorBus, PERMISSION_ERROR_EVENT};
use crate::types::{qualified_resource, Operation};
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// The denied request, mirrored as the security policy saw it.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityRuleContext {
    /// Identity snapshot, or `null` when no actor is signed in (or the
    /// identity lookup itself failed).
    pub auth: Option<Actor>,
    /// Request verb (`"get"`, `"list"`, `"create"`, ...).
    pub method: Operation,
    /// Fully qualified resource name.
    pub path: String,
    /// Payload for write requests.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_resource_data: Option<Value>,
}

/// A denied store request with its full diagnostic context.
///
/// Immutable once built; created at the moment a write or subscription
/// fails and consumed by a diagnostic listener.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PermissionError {
    pub context: SecurityRuleContext,
}

impl PermissionError {
    pub fn operation(&self) -> Operation {
        self.context.method
    }

    pub fn path(&self) -> &str {
        &self.context.path
    }
}

impl fmt::Display for PermissionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let context = serde_json::to_string_pretty(&self.context)
            .unwrap_or_else(|_| "<unserializable context>".to_string());
        write!(
            f,
            "permission denied: the following request was rejected by the store's security policy:\n{}",
            context
        )
    }
}

impl std::error::Error for PermissionError {}

/// Builds and publishes permission errors.
///
/// The identity lookup is best effort: an unavailable auth subsystem
/// degrades to `auth: null` instead of failing the construction.
#[derive(Clone)]
pub struct ErrorReporter {
    identity: Arc<dyn IdentityProvider>,
    bus: ErrorBus,
    database: String,
}

impl ErrorReporter {
    pub fn new(
        identity: Arc<dyn IdentityProvider>,
        bus: ErrorBus,
        database: impl Into<String>,
    ) -> Self {
        Self {
            identity,
            bus,
            database: database.into(),
        }
    }

    /// Build a permission error for a denied request on `raw_path`.
    pub fn denied(&self, op: Operation, raw_path: &str, payload: Option<Value>) -> PermissionError {
        let auth = match self.identity.current_actor() {
            Ok(actor) => actor,
            Err(e) => {
                tracing::debug!(error = %e, "identity lookup failed; building permission error without actor");
                None
            }
        };

        PermissionError {
            context: SecurityRuleContext {
                auth,
                method: op,
                path: qualified_resource(&self.database, raw_path),
                request_resource_data: if op.is_write() { payload } else { None },
            },
        }
    }

    /// Build a permission error and broadcast it on the error channel.
    /// Exactly one publish per call.
    pub fn report(&self, op: Operation, raw_path: &str, payload: Option<Value>) -> PermissionError {
        let error = self.denied(op, raw_path, payload);
        tracing::warn!(method = op.method(), path = raw_path, "store request denied");
        self.bus.publish(PERMISSION_ERROR_EVENT, &error);
        error
    }

    pub fn bus(&self) -> &ErrorBus {
        &self.bus
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::MemoryIdentity;
    use crate::events::EventBus;
    use crate::types::DEFAULT_DATABASE;
    use serde_json::json;

    fn reporter(identity: MemoryIdentity) -> ErrorReporter {
        ErrorReporter::new(Arc::new(identity), EventBus::new(), DEFAULT_DATABASE)
    }

    #[test]
    fn test_denied_qualifies_path_and_method() {
        let error = reporter(MemoryIdentity::new()).denied(
            Operation::List,
            "users/u1/chatSessions",
            None,
        );

        assert_eq!(
            error.path(),
            "/databases/(default)/documents/users/u1/chatSessions"
        );
        assert_eq!(error.context.method.method(), "list");
        assert!(error.context.auth.is_none());
    }

    #[test]
    fn test_denied_includes_actor_when_signed_in() {
        let identity = MemoryIdentity::new();
        identity.sign_in(Actor {
            uid: "u1".to_string(),
            display_name: Some("Ada".to_string()),
            email: Some("ada@example.edu".to_string()),
            email_verified: true,
            provider_data: vec![],
        });

        let error = reporter(identity).denied(Operation::Delete, "users/u1", None);
        let actor = error.context.auth.expect("actor snapshot");
        assert_eq!(actor.uid, "u1");
        assert_eq!(actor.display_name.as_deref(), Some("Ada"));
    }

    #[test]
    fn test_identity_failure_degrades_to_no_actor() {
        let identity = MemoryIdentity::new();
        identity.set_unavailable(true);

        // Must not fail the construction
        let error = reporter(identity).denied(Operation::Get, "users/u1", None);
        assert!(error.context.auth.is_none());
    }

    #[test]
    fn test_payload_only_kept_for_writes() {
        let identity = MemoryIdentity::new();
        let reporter = reporter(identity);

        let write = reporter.denied(
            Operation::Create,
            "users/u1/chatSessions",
            Some(json!({"subject": "algebra"})),
        );
        assert!(write.context.request_resource_data.is_some());

        let read = reporter.denied(
            Operation::List,
            "users/u1/chatSessions",
            Some(json!({"subject": "algebra"})),
        );
        assert!(read.context.request_resource_data.is_none());
    }

    #[test]
    fn test_display_embeds_context_json() {
        let error = reporter(MemoryIdentity::new()).denied(Operation::Get, "users/u1", None);
        let message = error.to_string();
        assert!(message.contains("permission denied"));
        assert!(message.contains("/databases/(default)/documents/users/u1"));
        assert!(message.contains("\"method\": \"get\""));
    }
}
