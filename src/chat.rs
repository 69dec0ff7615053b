//! The chat front end.
//!
//! Reads one request per line, runs it through the crew and prints the
//! sanitized answer. Failures are shown inline and never end the loop.

use std::sync::OnceLock;

use regex::Regex;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{info, warn};

use crate::crew::{AgentKind, Crew};
use crate::error::{CrewError, Result};
use crate::llm::Conversation;
use crate::session::SessionContext;

/// Shown when the crew produced no text at all.
pub const NO_RESPONSE: &str = "⚠️ No response from the agents.";

const FENCE: &str = "```";

fn fence_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"```(\w*)[ \t]*\n?").expect("valid fence regex"))
}

/// Cleans up an agent answer for display.
///
/// Closes a dangling code fence and puts every fence (with its language tag,
/// if any) on a line of its own.
pub fn sanitize_markdown(text: &str) -> String {
    let text = text.trim();
    if text.is_empty() {
        return NO_RESPONSE.to_string();
    }

    let mut text = text.to_string();
    if text.matches(FENCE).count() % 2 == 1 {
        text.push('\n');
        text.push_str(FENCE);
    }

    fence_regex()
        .replace_all(&text, "```${1}\n")
        .trim_end()
        .to_string()
}

/// Runs one request and renders the outcome as chat text.
pub async fn respond(
    crew: &Crew,
    session: &mut SessionContext,
    conversation: &mut Conversation,
    agent: AgentKind,
    input: &str,
) -> String {
    match crew.run_task(session, conversation, input, agent).await {
        Ok(answer) => sanitize_markdown(&answer),
        Err(e) => {
            warn!(category = e.category(), "Chat request failed: {}", e);
            format!("⚠️ Error: {e}")
        }
    }
}

enum Command {
    Quit,
    Clear,
    Skip,
    Ask,
}

fn parse_command(line: &str) -> Command {
    match line.to_lowercase().as_str() {
        "exit" | "quit" | "/exit" | "/quit" => Command::Quit,
        "/clear" => Command::Clear,
        "" => Command::Skip,
        _ => Command::Ask,
    }
}

/// Runs the interactive loop until `exit`/`quit` or end of input.
pub async fn run_chat<R, W>(
    crew: &Crew,
    session: &mut SessionContext,
    agent: AgentKind,
    input: R,
    output: &mut W,
) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut conversation = Conversation::new();
    let mut lines = input.lines();

    write_out(
        output,
        &format!(
            "DevCrew chat ({agent} agent, database '{}'). Type 'exit' to quit, '/clear' to forget the conversation.\n",
            session.peek()
        ),
    )
    .await?;

    loop {
        write_out(output, "> ").await?;
        let Some(line) = lines
            .next_line()
            .await
            .map_err(|e| CrewError::internal(format!("Failed to read input: {e}")))?
        else {
            break;
        };
        let line = line.trim();

        match parse_command(line) {
            Command::Quit => break,
            Command::Skip => continue,
            Command::Clear => {
                conversation.clear();
                write_out(output, "Conversation cleared.\n").await?;
            }
            Command::Ask => {
                let answer = respond(crew, session, &mut conversation, agent, line).await;
                write_out(output, &format!("{answer}\n\n")).await?;
            }
        }
    }

    info!("Chat session ended");
    Ok(())
}

async fn write_out<W: AsyncWrite + Unpin>(output: &mut W, text: &str) -> Result<()> {
    output
        .write_all(text.as_bytes())
        .await
        .map_err(|e| CrewError::internal(format!("Failed to write output: {e}")))?;
    output
        .flush()
        .await
        .map_err(|e| CrewError::internal(format!("Failed to write output: {e}")))
}
