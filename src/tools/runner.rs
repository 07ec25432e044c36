//! Tool runner - manages and executes tools

use std::collections::HashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use crate::Result;
use crate::error::Error;
use crate::gmail::Mailbox;
use super::Tool;
use super::calculator::CalculatorTool;
use super::gmail::{CountUnreadGmailTool, ReadGmailMessageTool, RecentGmailTool, SearchGmailTool};
use super::jokes::JokeTool;

/// Tool definition for LLM
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// Tool runner manages registered tools and executes them
pub struct ToolRunner {
    tools: HashMap<String, Box<dyn Tool>>,
}

impl ToolRunner {
    /// Create an empty tool runner
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Calculator and jokes only
    pub fn minimal() -> Self {
        let mut runner = Self::new();
        runner.register(CalculatorTool);
        runner.register(JokeTool);
        runner
    }

    /// Every tool, with Gmail registered only when the mailbox is available
    pub fn new_with_defaults(mailbox: Mailbox) -> Self {
        let mut runner = Self::minimal();

        if mailbox.is_available() {
            runner.register(SearchGmailTool::new(mailbox.clone()));
            runner.register(CountUnreadGmailTool::new(mailbox.clone()));
            runner.register(ReadGmailMessageTool::new(mailbox.clone()));
            runner.register(RecentGmailTool::new(mailbox));
        } else {
            tracing::info!("Gmail tools not available in this build");
        }

        runner
    }

    /// Register a tool
    pub fn register<T: Tool + 'static>(&mut self, tool: T) {
        self.tools.insert(tool.name().to_string(), Box::new(tool));
    }

    /// Get tool definitions for LLM, ordered by name
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        let mut definitions: Vec<ToolDefinition> = self.tools.values()
            .map(|t| t.to_definition())
            .collect();
        definitions.sort_by(|a, b| a.name.cmp(&b.name));
        definitions
    }

    /// Execute a tool by name
    pub async fn execute(&self, name: &str, params: Value) -> Result<String> {
        let tool = self.tools.get(name)
            .ok_or_else(|| Error::Tool(format!("Unknown tool: {}", name)))?;

        tool.execute(params).await
    }

    /// Check if a tool exists
    pub fn has(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// List registered tool names
    pub fn tool_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tools.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }
}

impl Default for ToolRunner {
    fn default() -> Self {
        Self::new()
    }
}
