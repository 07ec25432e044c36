//! Agent loop - alternates LLM calls and tool execution

use tracing::{debug, info};
use crate::Result;
use crate::error::Error;
use super::llm::LlmClient;
use super::message::{Message, Response, ToolCallRequest};
use super::context::Context;

/// The agent loop processes a task through LLM and tool execution
pub struct AgentLoop<C: LlmClient> {
    client: C,
    max_iterations: usize,
}

impl<C: LlmClient> AgentLoop<C> {
    /// Create a new agent loop
    pub fn new(client: C, max_iterations: usize) -> Self {
        Self {
            client,
            max_iterations,
        }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Run the agent loop for a single task
    pub async fn run(&self, task: &str, ctx: &Context) -> Result<Response> {
        let mut messages = ctx.build_messages(task);
        let tools = ctx.tool_runner.definitions();
        let mut executed = 0;

        info!("Starting agent run: {}", task);

        for iteration in 0..self.max_iterations {
            debug!("Iteration {}/{}", iteration + 1, self.max_iterations);

            let response = self.client.chat(&messages, &tools).await?;

            if !response.has_tool_calls() {
                let content = response.content.unwrap_or_default();
                info!("Agent completed with response: {} chars", content.len());
                return Ok(Response::new(content, executed));
            }

            messages.push(Message::assistant_with_tools(
                response.content.clone().unwrap_or_default(),
                response.tool_calls.clone(),
            ));

            // One call at a time, in the order the model asked for them
            for tool_call in &response.tool_calls {
                let result = self.execute_tool(ctx, tool_call).await;
                executed += 1;
                messages.push(Message::tool_result(&tool_call.id, result));
            }
        }

        Err(Error::MaxIterations)
    }

    async fn execute_tool(&self, ctx: &Context, tool_call: &ToolCallRequest) -> String {
        debug!("Executing tool: {} with args: {}", tool_call.name, tool_call.arguments);

        match ctx.tool_runner.execute(&tool_call.name, tool_call.arguments.clone()).await {
            Ok(result) => {
                debug!("Tool {} succeeded: {} chars", tool_call.name, result.len());
                result
            }
            Err(e) => {
                let error_msg = format!("Error: {}", e);
                debug!("Tool {} failed: {}", tool_call.name, error_msg);
                error_msg
            }
        }
    }
}
