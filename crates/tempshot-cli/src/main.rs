use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod capability;
mod commands;
mod terminal;

#[derive(Parser)]
#[command(name = "tempshot", version, about = "Pick how long a screenshot lives")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the selectable retention durations
    Catalog {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Overlay permission management
    Permission {
        #[command(subcommand)]
        action: commands::permission::PermissionAction,
    },
    /// Show the expiry prompt for an artifact and print the choice
    Prompt(commands::prompt::PromptArgs),
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("TEMPSHOT_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    init_tracing();
    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Catalog { json } => commands::catalog::run(json),
        Commands::Permission { action } => commands::permission::run(action),
        Commands::Prompt(args) => commands::prompt::run(args),
        Commands::Config { action } => commands::config::run(action),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
