//! Command-line argument parsing for DevCrew.

use crate::config::Config;
use crate::crew::AgentKind;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Agent crew with guarded SQLite tools.
#[derive(Parser, Debug)]
#[command(name = "devcrew")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Config file path
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Database to use until the session selects another one
    #[arg(short = 'd', long, value_name = "NAME")]
    pub database: Option<String>,

    /// Directory relative database names are resolved against
    #[arg(long, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    /// LLM provider to use (overrides config and environment)
    #[arg(long, value_name = "PROVIDER")]
    pub llm: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// Start an interactive chat with the crew
    Chat {
        /// Agent answering the requests
        #[arg(short, long, value_name = "AGENT", default_value = "coder")]
        agent: AgentKind,
    },

    /// Run a single request through the crew and print the answer
    Run {
        /// The request, in plain language
        #[arg(value_name = "TEXT")]
        text: String,

        /// Agent handling the request (coder, planner or researcher)
        #[arg(short, long, value_name = "AGENT", default_value = "coder")]
        agent: AgentKind,
    },

    /// Invoke one tool directly, without the LLM
    Tool {
        /// Tool name (see `devcrew tools`)
        #[arg(value_name = "NAME")]
        name: String,

        /// Tool arguments as a JSON object
        #[arg(long, value_name = "JSON", default_value = "{}")]
        args: String,
    },

    /// List the available tools
    Tools,
}

impl Cli {
    /// Parses command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Returns the config file path to use.
    ///
    /// Uses the --config argument if provided, otherwise the default path.
    pub fn config_path(&self) -> PathBuf {
        self.config.clone().unwrap_or_else(Config::default_path)
    }

    /// Applies the flags that override configuration.
    pub fn apply_overrides(&self, config: &mut Config) {
        if let Some(database) = &self.database {
            config.database.default_name = database.clone();
        }
        if let Some(dir) = &self.data_dir {
            config.database.directory = dir.clone();
        }
        if let Some(provider) = &self.llm {
            config.llm.provider = provider.clone();
        }
    }

    /// Returns true if the command runs the interactive chat.
    pub fn is_interactive(&self) -> bool {
        matches!(self.command, Command::Chat { .. })
    }
}
