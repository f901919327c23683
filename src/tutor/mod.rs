//! Tutor prompt flows.
//!
//! A flow is a named prompt template plus the structured input that fills
//! its placeholders; execution is a single request/response against an
//! [`InferenceClient`]. Streaming, retries, and timeouts belong to the
//! client implementation, not this layer.

mod flow;
mod template;

pub use flow::{
    FlowReply, FlowRequest, InferenceClient, InferenceError, ScriptedInference, Tutor,
    TUTOR_RESPONSE_FLOW,
};
pub use template::{PromptTemplate, TemplateError};
