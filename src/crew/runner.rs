//! The crew runner: a bounded tool-calling loop around an [`LlmClient`].

use std::time::Instant;

use tracing::{debug, info, warn};

use crate::crew::agents::AgentKind;
use crate::crew::task::Task;
use crate::error::Result;
use crate::llm::{Conversation, LlmClient, Message, ToolResult};
use crate::session::SessionContext;
use crate::tools::{tool_definitions, Toolbox};

/// Default number of tool-calling rounds per task.
pub const DEFAULT_MAX_TOOL_ROUNDS: usize = 8;

/// Runs tasks by letting the LLM call tools until it answers in text.
pub struct Crew {
    client: Box<dyn LlmClient>,
    toolbox: Toolbox,
    max_tool_rounds: usize,
}

impl Crew {
    pub fn new(client: Box<dyn LlmClient>, toolbox: Toolbox) -> Self {
        Self {
            client,
            toolbox,
            max_tool_rounds: DEFAULT_MAX_TOOL_ROUNDS,
        }
    }

    /// Sets the round limit. Zero is treated as one.
    pub fn with_max_tool_rounds(mut self, rounds: usize) -> Self {
        self.max_tool_rounds = rounds.max(1);
        self
    }

    pub fn toolbox(&self) -> &Toolbox {
        &self.toolbox
    }

    /// Classifies `input`, runs it as a task and records the exchange in
    /// `conversation`.
    pub async fn run_task(
        &self,
        session: &mut SessionContext,
        conversation: &mut Conversation,
        input: &str,
        agent: AgentKind,
    ) -> Result<String> {
        let task = Task::from_input(input, agent);
        let answer = self.kickoff(session, conversation, &task).await?;

        conversation.add_user(task.description.as_str());
        conversation.add_assistant(answer.as_str());
        Ok(answer)
    }

    /// Runs one task to completion.
    ///
    /// Every tool call the LLM requests goes through [`Toolbox::call`], so
    /// tool failures come back to the LLM as text rather than aborting the
    /// run. Only LLM failures are returned as errors.
    pub async fn kickoff(
        &self,
        session: &mut SessionContext,
        history: &Conversation,
        task: &Task,
    ) -> Result<String> {
        let start = Instant::now();
        let profile = task.agent.profile();
        let tools = tool_definitions(&profile.tools);

        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(Message::system(
            profile.system_prompt(&task.expected_output, session.peek()),
        ));
        messages.extend(history.messages().iter().cloned());
        messages.push(Message::user(task.description.as_str()));

        info!(agent = %task.agent, tool_count = tools.len(), "Starting task");

        let mut tool_calls_made = 0;
        for round in 1..=self.max_tool_rounds {
            let response = self.client.complete_with_tools(&messages, &tools).await?;
            debug!(
                round,
                has_tool_calls = response.has_tool_calls(),
                response_len = response.content.len(),
                "Received LLM response"
            );

            if !response.has_tool_calls() {
                info!(
                    agent = %task.agent,
                    rounds = round,
                    tool_calls = tool_calls_made,
                    total_duration_ms = start.elapsed().as_millis(),
                    "Task complete"
                );
                return Ok(response.content);
            }

            messages.push(Message::assistant_tool_calls(&response));
            for call in &response.tool_calls {
                let content = self
                    .toolbox
                    .call(session, &call.name, &call.arguments)
                    .await;
                messages.push(Message::tool(ToolResult {
                    tool_call_id: call.id.clone(),
                    content,
                }));
                tool_calls_made += 1;
            }
        }

        warn!(
            agent = %task.agent,
            max_tool_rounds = self.max_tool_rounds,
            "Tool round limit reached, asking for a final answer"
        );
        let response = self.client.complete_with_tools(&messages, &[]).await?;
        Ok(response.content)
    }
}
