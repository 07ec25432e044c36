//! Context builder for agent prompts.

use crate::config::Config;
use crate::gmail::Mailbox;
use crate::tools::ToolRunner;
use crate::Result;

use super::message::Message;

/// Context holds the tools and prompt for an agent run.
pub struct Context {
    pub tool_runner: ToolRunner,
}

impl Context {
    /// Context with every tool the build supports.
    pub fn new(config: &Config) -> Result<Self> {
        let mailbox = Mailbox::from_config(config)?;
        Ok(Self::with_tools(ToolRunner::new_with_defaults(mailbox)))
    }

    /// Context without Gmail, for quick runs.
    pub fn minimal() -> Self {
        Self::with_tools(ToolRunner::minimal())
    }

    pub fn with_tools(tool_runner: ToolRunner) -> Self {
        Self { tool_runner }
    }

    /// Create a test context with no tools.
    #[cfg(test)]
    pub fn test() -> Self {
        Self::with_tools(ToolRunner::new())
    }

    /// System prompt listing the registered tools.
    pub fn build_system_prompt(&self) -> String {
        let now = chrono::Local::now().format("%Y-%m-%d %H:%M (%A)");

        let mut prompt = format!(
            "# Courier\n\n\
             You are Courier, a helpful assistant that answers by calling tools when they help.\n\n\
             ## Current Time\n{}\n",
            now
        );

        let definitions = self.tool_runner.definitions();
        if !definitions.is_empty() {
            prompt.push_str("\n## Tools\n");
            for def in &definitions {
                prompt.push_str(&format!("- `{}`: {}\n", def.name, def.description));
            }
            prompt.push_str(
                "\nTool results may contain an \"error\" field or start with \"Error\". \
                 Report such failures to the user instead of retrying blindly.\n",
            );
        }

        prompt
    }

    /// System prompt followed by the task.
    pub fn build_messages(&self, task: &str) -> Vec<Message> {
        vec![Message::system(self.build_system_prompt()), Message::user(task)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::message::Role;

    #[test]
    fn test_prompt_lists_tools() {
        let ctx = Context::minimal();
        let prompt = ctx.build_system_prompt();
        assert!(prompt.contains("Courier"));
        assert!(prompt.contains("`calculator`"));
        assert!(prompt.contains("`tell_joke`"));
    }

    #[test]
    fn test_build_messages() {
        let ctx = Context::test();
        let messages = ctx.build_messages("Hello");

        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::System);
        assert!(!messages[0].content.contains("## Tools"));
        assert_eq!(messages[1].role, Role::User);
        assert_eq!(messages[1].content, "Hello");
    }
}
