//! Identity collaborator: "who is the current actor, if anyone".
//!
//! The sync layer never authenticates anybody itself; it asks an
//! [`IdentityProvider`] for the current actor when building permission
//! diagnostics. The provider may legitimately fail before the auth
//! subsystem has finished initializing, and callers are expected to
//! degrade rather than propagate that failure.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Sign-in provider metadata attached to an actor.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderProfile {
    /// Provider id, e.g. `"password"` or `"google.com"`.
    pub provider_id: String,
}

/// Snapshot of the authenticated actor's identity.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Actor {
    /// Unique subject id.
    pub uid: String,
    pub display_name: Option<String>,
    pub email: Option<String>,
    pub email_verified: bool,
    pub provider_data: Vec<ProviderProfile>,
}

impl Actor {
    /// A minimal actor with just a subject id.
    pub fn with_uid(uid: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            display_name: None,
            email: None,
            email_verified: false,
            provider_data: Vec::new(),
        }
    }
}

/// Errors from the identity collaborator.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("auth subsystem not initialized")]
    NotInitialized,

    #[error("auth service unavailable: {0}")]
    Unavailable(String),
}

/// "Get current actor, or none."
pub trait IdentityProvider: Send + Sync {
    fn current_actor(&self) -> Result<Option<Actor>, AuthError>;
}

/// In-memory identity provider for tests and embedding hosts.
#[derive(Default)]
pub struct MemoryIdentity {
    state: RwLock<IdentityState>,
}

#[derive(Default)]
struct IdentityState {
    actor: Option<Actor>,
    unavailable: bool,
}

impl MemoryIdentity {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the current actor `actor`.
    pub fn sign_in(&self, actor: Actor) {
        let mut state = self.state.write();
        state.actor = Some(actor);
        state.unavailable = false;
    }

    pub fn sign_out(&self) {
        self.state.write().actor = None;
    }

    /// Simulate the not-yet-initialized auth subsystem.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.state.write().unavailable = unavailable;
    }
}

impl IdentityProvider for MemoryIdentity {
    fn current_actor(&self) -> Result<Option<Actor>, AuthError> {
        let state = self.state.read();
        if state.unavailable {
            return Err(AuthError::NotInitialized);
        }
        Ok(state.actor.clone())
    }
}
