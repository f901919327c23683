//! Flow execution against the inference collaborator.

use super::template::PromptTemplate;
use crate::error::Result;
use crate::model::{Author, ChatMessage, TutorSettings};
use crate::types::Fields;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Arc;
use thiserror::Error;

/// Name of the tutor-response flow.
pub const TUTOR_RESPONSE_FLOW: &str = "tutorResponse";

/// Instructions used when no teacher has customized the subject.
const DEFAULT_INSTRUCTIONS: &str =
    "Explain one step at a time and check understanding before moving on.";

const TUTOR_RESPONSE_TEMPLATE: &str = "\
You are Lyra, a patient {{subject}} tutor.
{{instructions}}

Conversation so far:
{{history}}

Student: {{question}}
Tutor:";

/// Errors from the inference collaborator.
#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("inference service unavailable: {0}")]
    Unavailable(String),

    #[error("inference request rejected: {0}")]
    Rejected(String),
}

/// A single prompt-execution request: the flow name, the structured input
/// that fills its placeholders, and the locally rendered prompt.
#[derive(Clone, Debug)]
pub struct FlowRequest {
    pub flow: String,
    pub input: Fields,
    pub prompt: String,
}

/// The flow's structured output.
#[derive(Clone, Debug, PartialEq)]
pub struct FlowReply {
    pub text: String,
}

/// One request in, one reply out. No streaming, no retries here.
pub trait InferenceClient: Send + Sync {
    fn execute(&self, request: FlowRequest) -> std::result::Result<FlowReply, InferenceError>;
}

/// Produces tutoring responses from session context and teacher settings.
pub struct Tutor {
    client: Arc<dyn InferenceClient>,
    template: PromptTemplate,
}

impl Tutor {
    pub fn new(client: Arc<dyn InferenceClient>) -> Self {
        Self {
            client,
            template: PromptTemplate::new(TUTOR_RESPONSE_FLOW, TUTOR_RESPONSE_TEMPLATE),
        }
    }

    /// Run the tutor-response flow for a student question.
    ///
    /// Teacher settings override the default instructions when present.
    pub fn respond(
        &self,
        subject: &str,
        settings: Option<&TutorSettings>,
        history: &[ChatMessage],
        question: &str,
    ) -> Result<String> {
        let instructions = settings
            .map(|s| s.instructions.clone())
            .unwrap_or_else(|| DEFAULT_INSTRUCTIONS.to_string());

        let mut input = Fields::new();
        input.insert("subject".to_string(), Value::String(subject.to_string()));
        input.insert("instructions".to_string(), Value::String(instructions));
        input.insert(
            "history".to_string(),
            Value::String(render_history(history)),
        );
        input.insert("question".to_string(), Value::String(question.to_string()));

        let prompt = self.template.render(&input)?;
        let reply = self.client.execute(FlowRequest {
            flow: self.template.name().to_string(),
            input,
            prompt,
        })?;
        Ok(reply.text)
    }
}

fn render_history(history: &[ChatMessage]) -> String {
    if history.is_empty() {
        return "(no messages yet)".to_string();
    }
    let lines: Vec<String> = history
        .iter()
        .map(|message| {
            let who = match message.author {
                Author::Student => "Student",
                Author::Tutor => "Tutor",
            };
            format!("{}: {}", who, message.text)
        })
        .collect();
    lines.join("\n")
}

/// Test double: replies from a queue, records every request.
#[derive(Default)]
pub struct ScriptedInference {
    replies: Mutex<VecDeque<String>>,
    requests: Mutex<Vec<FlowRequest>>,
}

impl ScriptedInference {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_reply(&self, text: impl Into<String>) {
        self.replies.lock().push_back(text.into());
    }

    pub fn requests(&self) -> Vec<FlowRequest> {
        self.requests.lock().clone()
    }
}

impl InferenceClient for ScriptedInference {
    fn execute(&self, request: FlowRequest) -> std::result::Result<FlowReply, InferenceError> {
        self.requests.lock().push(request);
        match self.replies.lock().pop_front() {
            Some(text) => Ok(FlowReply { text }),
            None => Err(InferenceError::Unavailable(
                "no scripted reply queued".to_string(),
            )),
        }
    }
}
