//! Agent personas.
//!
//! A persona is plain configuration: who the agent is and which tools it may
//! call. The runner turns it into a system prompt.

use std::fmt;
use std::str::FromStr;

use crate::db::DatabaseRef;
use crate::tools::ToolName;

/// Which persona runs a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AgentKind {
    /// Generates code and SQL data models; owns the database tools.
    #[default]
    Coder,
    /// Breaks tasks into steps.
    Planner,
    /// Looks up libraries, patterns and practices.
    Researcher,
}

impl AgentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Coder => "coder",
            Self::Planner => "planner",
            Self::Researcher => "researcher",
        }
    }

    /// Returns the persona for this kind.
    pub fn profile(&self) -> AgentProfile {
        match self {
            Self::Coder => AgentProfile::coder(),
            Self::Planner => AgentProfile::planner(),
            Self::Researcher => AgentProfile::researcher(),
        }
    }
}

impl FromStr for AgentKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "coder" => Ok(Self::Coder),
            "planner" => Ok(Self::Planner),
            "researcher" => Ok(Self::Researcher),
            _ => Err(format!(
                "Unknown agent: {} (expected coder, planner or researcher)",
                s
            )),
        }
    }
}

impl fmt::Display for AgentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Persona configuration for one agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentProfile {
    pub kind: AgentKind,
    pub role: String,
    pub goal: String,
    pub backstory: String,
    /// Tools advertised to the LLM when this agent runs.
    pub tools: Vec<ToolName>,
}

const SYSTEM_PROMPT_TEMPLATE: &str = r#"You are the {role}.

GOAL:
{goal}

BACKGROUND:
{backstory}

ACTIVE DATABASE:
{database}

INSTRUCTIONS:
- Work towards the expected output: {expected_output}
- Use the available tools to act on SQLite databases instead of describing SQL you did not run
- Omit db_name to use the active database
- Destructive statements are refused unless you pass force=true; only do so when the user asked for it
- Put code in fenced blocks with a language tag"#;

const NO_TOOLS_NOTE: &str = "\n- You have no tools; answer in text only";

impl AgentProfile {
    /// The Coder persona. Carries every database tool.
    pub fn coder() -> Self {
        Self {
            kind: AgentKind::Coder,
            role: "Coder Agent".to_string(),
            goal: "Generate code and SQL data models. Automatically creates SQLite databases \
                   when generating SQL schemas."
                .to_string(),
            backstory: "Engineer specialized in Go and relational databases.".to_string(),
            tools: ToolName::ALL.to_vec(),
        }
    }

    /// The Planner persona.
    pub fn planner() -> Self {
        Self {
            kind: AgentKind::Planner,
            role: "Planner Agent".to_string(),
            goal: "Understand the task and create an action plan divided into logical steps."
                .to_string(),
            backstory: "Experienced software architect, expert at decomposing complex tasks \
                        into clear, executable subtasks."
                .to_string(),
            tools: Vec::new(),
        }
    }

    /// The Researcher persona.
    pub fn researcher() -> Self {
        Self {
            kind: AgentKind::Researcher,
            role: "Researcher Agent".to_string(),
            goal: "Search for information, libraries, patterns and best practices related to \
                   the task."
                .to_string(),
            backstory: "Detail-oriented technical researcher focused on finding the best \
                        engineering solutions available."
                .to_string(),
            tools: Vec::new(),
        }
    }

    pub fn has_tools(&self) -> bool {
        !self.tools.is_empty()
    }

    /// Builds the system prompt for a task with the given expected output.
    pub fn system_prompt(&self, expected_output: &str, database: &DatabaseRef) -> String {
        let mut prompt = SYSTEM_PROMPT_TEMPLATE
            .replace("{role}", &self.role)
            .replace("{goal}", &self.goal)
            .replace("{backstory}", &self.backstory)
            .replace("{database}", database.as_str())
            .replace("{expected_output}", expected_output);
        if !self.has_tools() {
            prompt.push_str(NO_TOOLS_NOTE);
        }
        prompt
    }
}
