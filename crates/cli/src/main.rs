//! NeuroCite CLI, the main entry point.
//!
//! Commands:
//! - `ask`      Answer one question with citations
//! - `gateway`  Start the HTTP API server
//! - `config`   Print the default configuration or the config path

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "neurocite",
    about = "NeuroCite: cited, multi-hop answers to neuroscience questions",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask a research question
    Ask {
        /// The question, in plain language
        question: String,

        /// Print the full response as JSON
        #[arg(long)]
        json: bool,

        /// Show each hop as it runs
        #[arg(long)]
        progress: bool,

        /// Print the hop trace after the answer
        #[arg(long)]
        trace: bool,
    },

    /// Start the HTTP gateway server
    Gateway {
        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Show configuration
    Config {
        /// Print the config file path instead
        #[arg(long)]
        path: bool,

        /// Load and validate the current configuration
        #[arg(long, conflicts_with = "path")]
        check: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Logs go to stderr so `ask --json` stays machine-readable.
    let filter = if cli.verbose { "debug" } else { "warn" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false);
    if cli.log_json {
        builder.json().init();
    } else {
        builder.init();
    }

    match cli.command {
        Commands::Ask {
            question,
            json,
            progress,
            trace,
        } => {
            commands::ask::run(
                &question,
                commands::ask::AskOptions {
                    json,
                    progress,
                    trace,
                },
            )
            .await?
        }
        Commands::Gateway { port } => commands::gateway::run(port).await?,
        Commands::Config { path, check } => {
            if path {
                commands::config_cmd::path()?
            } else if check {
                commands::config_cmd::check()?
            } else {
                commands::config_cmd::show_default()
            }
        }
    }

    Ok(())
}
