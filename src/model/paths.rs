//! Canonical paths and queries for Lyra collections.

use crate::types::{CollectionPath, Direction, DocumentPath, QueryDescriptor};

/// The `users` root collection.
pub fn users() -> CollectionPath {
    CollectionPath::from_segments(vec!["users".to_string()])
}

/// `users/{uid}`
pub fn profile(uid: &str) -> DocumentPath {
    users().doc(uid)
}

/// `users/{uid}/chatSessions`
pub fn chat_sessions(uid: &str) -> CollectionPath {
    profile(uid).collection("chatSessions")
}

/// `users/{uid}/chatSessions/{session}`
pub fn chat_session(uid: &str, session: &str) -> DocumentPath {
    chat_sessions(uid).doc(session)
}

/// `users/{uid}/chatSessions/{session}/messages`
pub fn messages(uid: &str, session: &str) -> CollectionPath {
    chat_session(uid, session).collection("messages")
}

/// The `tutorSettings` root collection.
pub fn tutor_settings() -> CollectionPath {
    CollectionPath::from_segments(vec!["tutorSettings".to_string()])
}

/// `tutorSettings/{subject}`
pub fn tutor_settings_for(subject: &str) -> DocumentPath {
    tutor_settings().doc(subject)
}

/// A student's sessions, newest first.
pub fn recent_sessions(uid: &str, limit: usize) -> QueryDescriptor {
    QueryDescriptor::collection(chat_sessions(uid))
        .order_by("startedAt", Direction::Descending)
        .limit(limit)
}

/// A session's transcript in send order.
pub fn session_messages(uid: &str, session: &str) -> QueryDescriptor {
    QueryDescriptor::collection(messages(uid, session)).order_by("sentAt", Direction::Ascending)
}
