//! Mock LLM client for testing.
//!
//! Provides deterministic responses based on input patterns, including
//! scripted tool calls, so the crew runner can be exercised offline.

use async_trait::async_trait;

use crate::error::Result;
use crate::llm::types::{LlmResponse, Message, Role, ToolCall, ToolDefinition};
use crate::llm::LlmClient;

/// Mock LLM client that returns canned responses based on input patterns.
///
/// Used for unit testing and for `provider = "mock"` without making real API calls.
#[derive(Debug, Clone, Default)]
pub struct MockLlmClient {
    /// Custom response mappings (pattern -> response).
    custom_responses: Vec<(String, String)>,
    /// Scripted tool calls (pattern -> [(tool, arguments)]).
    scripted_calls: Vec<(String, Vec<(String, String)>)>,
}

impl MockLlmClient {
    /// Creates a new mock client with default responses.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a custom response mapping.
    ///
    /// When the input contains `pattern`, the mock will return `response`.
    pub fn with_response(
        mut self,
        pattern: impl Into<String>,
        response: impl Into<String>,
    ) -> Self {
        self.custom_responses
            .push((pattern.into(), response.into()));
        self
    }

    /// Adds a scripted tool call.
    ///
    /// When the input contains `pattern` and `tool` is offered, the mock
    /// requests it with `arguments`. Calls added for the same pattern are
    /// requested together, in order.
    pub fn with_tool_call(
        mut self,
        pattern: impl Into<String>,
        tool: impl Into<String>,
        arguments: impl Into<String>,
    ) -> Self {
        let pattern = pattern.into();
        let call = (tool.into(), arguments.into());
        match self.scripted_calls.iter_mut().find(|(p, _)| *p == pattern) {
            Some((_, calls)) => calls.push(call),
            None => self.scripted_calls.push((pattern, vec![call])),
        }
        self
    }

    /// Generates a mock text response based on the input.
    fn mock_response(&self, input: &str) -> String {
        let input_lower = input.to_lowercase();

        for (pattern, response) in &self.custom_responses {
            if input_lower.contains(&pattern.to_lowercase()) {
                return response.clone();
            }
        }

        if input_lower.contains("package main") || input_lower.contains("golang") {
            return "```go\npackage main\n\nfunc main() {\n}\n```".to_string();
        }

        if input_lower.contains("create table") || input_lower.contains("data model") {
            return "```sql\nCREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT NOT NULL);\n```"
                .to_string();
        }

        "I don't understand that request. Could you please rephrase it?".to_string()
    }

    /// Picks the tool calls to request for `input`, limited to the offered tools.
    fn mock_tool_calls(&self, input: &str, tools: &[ToolDefinition]) -> Vec<ToolCall> {
        let offered = |name: &str| tools.iter().any(|t| t.name == name);
        let input_lower = input.to_lowercase();

        let mut requested: Vec<(String, String)> = self
            .scripted_calls
            .iter()
            .find(|(pattern, _)| input_lower.contains(&pattern.to_lowercase()))
            .map(|(_, calls)| calls.clone())
            .unwrap_or_default();

        if requested.is_empty() {
            if let Some(sql) = extract_sql_block(input) {
                let arguments = serde_json::json!({ "sql": sql }).to_string();
                requested.push(("execute_any_sql".to_string(), arguments));
            } else if input_lower.contains("analy") {
                requested.push(("analyze_database".to_string(), "{}".to_string()));
            } else if input_lower.contains("current database")
                || input_lower.contains("active database")
            {
                requested.push(("get_current_database".to_string(), "{}".to_string()));
            }
        }

        requested
            .into_iter()
            .filter(|(name, _)| offered(name))
            .enumerate()
            .map(|(i, (name, arguments))| {
                ToolCall::new(format!("mock_tool_call_{}", i + 1), name, arguments)
            })
            .collect()
    }

    /// Extracts the last user message content from a message list.
    fn extract_user_input(messages: &[Message]) -> String {
        messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.clone())
            .unwrap_or_default()
    }

    /// Returns the tool results sent after the last assistant message.
    fn pending_tool_results(messages: &[Message]) -> Vec<&str> {
        messages
            .iter()
            .rev()
            .take_while(|m| m.role == Role::Tool)
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect()
    }
}

/// Returns the body of the first ```sql fenced block in `text`.
fn extract_sql_block(text: &str) -> Option<String> {
    let start = text.find("```sql")? + "```sql".len();
    let rest = &text[start..];
    let end = rest.find("```")?;
    let sql = rest[..end].trim();
    (!sql.is_empty()).then(|| sql.to_string())
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, messages: &[Message]) -> Result<String> {
        let input = Self::extract_user_input(messages);
        Ok(self.mock_response(&input))
    }

    async fn complete_with_tools(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
    ) -> Result<LlmResponse> {
        // Tool results just came back: summarize them instead of calling again.
        let results = Self::pending_tool_results(messages);
        if !results.is_empty() {
            return Ok(LlmResponse::text(format!(
                "Here is what I did:\n\n{}",
                results.join("\n\n")
            )));
        }

        let input = Self::extract_user_input(messages);
        let tool_calls = self.mock_tool_calls(&input, tools);
        if !tool_calls.is_empty() {
            return Ok(LlmResponse::with_tool_calls(String::new(), tool_calls));
        }

        Ok(LlmResponse::text(self.mock_response(&input)))
    }
}
