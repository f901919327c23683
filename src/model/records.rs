//! Record shapes stored for the Lyra application.

use crate::error::{Result, SyncError};
use crate::types::{Fields, Timestamp};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Serialize a record into a store field map.
pub fn to_fields<T: Serialize>(record: &T) -> Result<Fields> {
    match serde_json::to_value(record)? {
        Value::Object(map) => Ok(map),
        other => Err(SyncError::Shape(format!(
            "record must serialize to an object, got {}",
            other
        ))),
    }
}

/// Account role.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Teacher,
}

/// Profile document at `users/{uid}`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub display_name: String,
    pub email: String,
    pub role: Role,
    pub created_at: Timestamp,
}

/// Session document at `users/{uid}/chatSessions/{session}`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatSession {
    pub subject: String,
    pub title: String,
    pub started_at: Timestamp,
}

/// Who authored a chat message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Author {
    Student,
    Tutor,
}

/// Message document at `users/{uid}/chatSessions/{session}/messages/{message}`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub author: Author,
    pub text: String,
    pub sent_at: Timestamp,
}

/// Teacher-customized tutor behavior at `tutorSettings/{subject}`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TutorSettings {
    pub subject: String,
    pub instructions: String,
    pub updated_at: Timestamp,
}
