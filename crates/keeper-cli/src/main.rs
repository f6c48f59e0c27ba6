mod cmd;
mod output;
mod setup;

use clap::{Parser, Subcommand};
use setup::ConfigArgs;

#[derive(Parser)]
#[command(
    name = "keeper",
    about = "Automation keeper — watches an upkeep registry and performs due upkeeps",
    version,
    propagate_version = true
)]
struct Cli {
    #[command(flatten)]
    config: ConfigArgs,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    /// Defaults to `run`
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Poll the registry and perform upkeeps when due
    Run {
        /// Run a single tick and exit
        #[arg(long)]
        once: bool,
    },

    /// Evaluate the registry once without submitting anything
    Check,

    /// Validate the signing credential and print its address
    Identity,

    /// Show the effective configuration and validation warnings
    Config,
}

fn main() {
    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Commands::Run { once: false });

    let default_level = match &command {
        Commands::Run { .. } => tracing::Level::INFO,
        _ => tracing::Level::WARN,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let result = match command {
        Commands::Run { once } => cmd::run::run(&cli.config, once, cli.json),
        Commands::Check => cmd::check::run(&cli.config, cli.json),
        Commands::Identity => cmd::identity::run(cli.json),
        Commands::Config => cmd::config::run(&cli.config, cli.json),
    };

    if let Err(e) = result {
        // Print the full error chain (anyhow's alternate Display)
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
