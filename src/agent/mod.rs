//! Agent module: core agent logic.
//!
//! This module contains:
//! - Message types
//! - LLM client trait and the OpenAI-compatible implementation
//! - Agent loop for processing tasks
//! - Context builder for prompts

mod context;
mod loop_impl;
mod message;

pub mod llm;

pub use context::Context;
pub use llm::{LlmClient, LlmResponse, OpenAiClient, Usage};
pub use loop_impl::AgentLoop;
pub use message::{Message, Response, Role, ToolCallRequest};
