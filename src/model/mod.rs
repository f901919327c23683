//! Typed records for the Lyra tutoring domain.
//!
//! Students have a profile, chat sessions, and messages within a session;
//! teachers customize the tutor's instructions per subject. Records are
//! plain serde structs converted to and from the store's loose field maps.

mod paths;
mod records;

pub use paths::{
    chat_session, chat_sessions, messages, profile, recent_sessions, session_messages,
    tutor_settings, tutor_settings_for, users,
};
pub use records::{
    to_fields, Author, ChatMessage, ChatSession, Role, TutorSettings, UserProfile,
};
