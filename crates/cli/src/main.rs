//! prospector CLI: the main entry point.
//!
//! Commands:
//! - `run`      Run the outreach agent on a request
//! - `tasks`    Print the task progress report
//! - `memory`   Inspect or edit remembered facts
//! - `config`   Validate or show configuration
//! - `onboard`  Create config and data directories

use clap::{Parser, Subcommand};
use prospector_config::RunMode;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(
    name = "prospector",
    about = "prospector: an AI sales development agent",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Config file (default: ~/.prospector/config.toml)
    #[arg(short, long, global = true, env = "PROSPECTOR_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the outreach agent
    Run {
        /// What the agent should do; asked on stdin when omitted
        #[arg(short, long)]
        prompt: Option<String>,

        /// interactive, auto or test (test implies dry run)
        #[arg(short, long)]
        mode: Option<RunMode>,

        /// Override the turn budget
        #[arg(long)]
        max_turns: Option<usize>,
    },

    /// Print the task progress report
    Tasks,

    /// Inspect or edit remembered facts
    Memory {
        #[command(subcommand)]
        action: MemoryAction,
    },

    /// Validate or show configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Create config and data directories
    Onboard,
}

#[derive(Subcommand)]
enum MemoryAction {
    /// List every remembered key
    List,
    /// Show one value and where it came from
    Get { key: String },
    /// Remember a value (parsed as JSON when possible)
    Set { key: String, value: String },
    /// Forget everything
    Clear {
        /// Required; clearing cannot be undone
        #[arg(long)]
        confirm: bool,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Check the configuration and adapter credentials
    Validate,
    /// Print the effective configuration
    Show,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "prospector=debug"
    } else {
        "prospector=info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);
    if cli.json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    let config = cli.config.as_deref();
    match cli.command {
        Commands::Run {
            prompt,
            mode,
            max_turns,
        } => commands::run::run(config, prompt, mode, max_turns).await?,
        Commands::Tasks => commands::tasks::run(config)?,
        Commands::Memory { action } => match action {
            MemoryAction::List => commands::memory::list(config).await?,
            MemoryAction::Get { key } => commands::memory::get(config, &key).await?,
            MemoryAction::Set { key, value } => commands::memory::set(config, &key, &value).await?,
            MemoryAction::Clear { confirm } => commands::memory::clear(config, confirm).await?,
        },
        Commands::Config { action } => match action {
            ConfigAction::Validate => commands::config_cmd::validate(config)?,
            ConfigAction::Show => commands::config_cmd::show(config)?,
        },
        Commands::Onboard => commands::onboard::run(config)?,
    }

    Ok(())
}
