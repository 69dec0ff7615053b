//! DevCrew - an agent crew with guarded SQLite tools.

use devcrew::chat::{run_chat, sanitize_markdown};
use devcrew::cli::{Cli, Command};
use devcrew::config::Config;
use devcrew::crew::Crew;
use devcrew::db::SqliteExecutor;
use devcrew::error::Result;
use devcrew::llm::{create_client, Conversation};
use devcrew::logging;
use devcrew::session::SessionContext;
use devcrew::tools::{ToolName, Toolbox};
use tokio::io::BufReader;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    // Credentials may live in a .env file next to the working directory.
    dotenvy::dotenv().ok();

    let cli = Cli::parse_args();
    let interactive = cli.is_interactive();
    if interactive {
        logging::init_file_logging();
    } else {
        logging::init_stderr_logging();
    }

    if let Err(e) = run(cli).await {
        error!("{}: {}", e.category(), e);
        if interactive {
            eprintln!("{}: {}", e.category(), e);
        }
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config_path();
    info!("Loading config from: {}", config_path.display());

    // Precedence: CLI flags > environment > config file > defaults.
    let mut config = Config::load_from_file(&config_path)?;
    config.apply_env(|key| std::env::var(key).ok());
    cli.apply_overrides(&mut config);
    config.validate()?;

    let executor = SqliteExecutor::new(config.database.directory.clone())
        .with_limits(config.database.read_limits());
    let toolbox = Toolbox::new(executor);
    let mut session = SessionContext::new(config.database.default_database()?);

    match cli.command {
        Command::Tools => {
            for tool in ToolName::ALL {
                let definition = tool.definition();
                println!("{}\n    {}\n", definition.name, definition.description);
            }
        }
        Command::Tool { name, args } => {
            let text = toolbox.call(&mut session, &name, &args).await;
            println!("{text}");
        }
        Command::Run { text, agent } => {
            let crew = build_crew(&config, toolbox)?;
            let mut conversation = Conversation::new();
            let answer = crew
                .run_task(&mut session, &mut conversation, &text, agent)
                .await?;
            println!("{}", sanitize_markdown(&answer));
        }
        Command::Chat { agent } => {
            let crew = build_crew(&config, toolbox)?;
            let stdin = BufReader::new(tokio::io::stdin());
            let mut stdout = tokio::io::stdout();
            run_chat(&crew, &mut session, agent, stdin, &mut stdout).await?;
        }
    }

    Ok(())
}

fn build_crew(config: &Config, toolbox: Toolbox) -> Result<Crew> {
    let client = create_client(&config.llm)?;
    info!(
        provider = %config.llm.provider,
        model = %config.llm.model,
        "LLM client ready"
    );
    Ok(Crew::new(client, toolbox).with_max_tool_rounds(config.llm.max_tool_rounds))
}
