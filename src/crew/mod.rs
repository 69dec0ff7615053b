//! Agents, tasks and the runner that drives them.
//!
//! A [`Task`] is handed to one agent persona; the [`Crew`] sends it to the LLM
//! together with the persona's tools and executes whatever tool calls come
//! back until the LLM answers in text.

pub mod agents;
pub mod runner;
pub mod task;

pub use agents::{AgentKind, AgentProfile};
pub use runner::{Crew, DEFAULT_MAX_TOOL_ROUNDS};
pub use task::{Intent, Task};
