//! mockview CLI — run mock interviews and review stored transcripts.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "mockview",
    version,
    about = "Mock technical interviews grounded in a reference corpus"
)]
struct Cli {
    /// Config file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run an interactive interview
    Interview {
        /// User to interview
        #[arg(long)]
        user: String,
    },

    /// List a user's sessions or show one transcript
    History {
        #[arg(long)]
        user: String,

        /// Session to show
        #[arg(long)]
        session: Option<i64>,

        /// Write the session transcript to this JSON file
        #[arg(long, requires = "session")]
        export: Option<PathBuf>,
    },

    /// List stored question/answer/feedback records
    Records {
        #[arg(long)]
        user: String,

        /// Only records whose question contains this keyword
        #[arg(long)]
        filter: Option<String>,
    },

    /// Manage users
    User {
        #[command(subcommand)]
        action: UserAction,
    },

    /// Check the configuration and a corpus file
    Validate {
        /// Corpus TOML file
        #[arg(long)]
        corpus: Option<PathBuf>,
    },

    /// Create a starter config and example corpus
    Init,
}

#[derive(Subcommand)]
enum UserAction {
    /// Register a new user
    Add { username: String },
    /// Deactivate a user; their history is kept
    Deactivate { username: String },
}

#[tokio::main]
async fn main() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("mockview=info,warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = cli.config;

    let result = match cli.command {
        Commands::Interview { user } => commands::interview::execute(user, config).await,
        Commands::History {
            user,
            session,
            export,
        } => commands::history::execute(user, session, export, config).await,
        Commands::Records { user, filter } => {
            commands::records::execute(user, filter, config).await
        }
        Commands::User { action } => match action {
            UserAction::Add { username } => commands::user::add(username, config).await,
            UserAction::Deactivate { username } => {
                commands::user::deactivate(username, config).await
            }
        },
        Commands::Validate { corpus } => commands::validate::execute(corpus, config),
        Commands::Init => commands::init::execute(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
