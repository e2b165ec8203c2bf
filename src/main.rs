#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::doc_markdown,
    clippy::missing_errors_doc,
    clippy::module_name_repetitions,
    clippy::similar_names,
    clippy::single_match_else,
    clippy::too_many_lines,
    clippy::uninlined_format_args
)]

use anyhow::Result;
use capchat::chat;
use capchat::config::Config;
use capchat::session::{FileSessionRepository, SessionRepository, SessionStore};
use capchat::util::format_caps;
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

/// `capchat` - tiny terminal chat with a persisted transcript and a prepaid
/// caps meter.
#[derive(Parser, Debug)]
#[command(name = "capchat")]
#[command(version)]
#[command(
    about = "Tiny terminal chat with a persisted transcript and a prepaid caps meter.",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Chat with the endpoint (interactive unless -m is given)
    Chat {
        /// Single message mode (don't enter interactive mode)
        #[arg(short, long)]
        message: Option<String>,
    },

    /// Print the persisted transcript
    History,

    /// Show caps remaining, the context flag, and where state lives
    Status,

    /// Set or show the context-inclusion preference
    Context {
        /// on, off, or show
        #[arg(value_parser = ["on", "off", "show"], default_value = "show")]
        setting: String,
    },

    /// Delete the persisted session (the next run starts fresh)
    Reset {
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging - respects RUST_LOG env var, defaults to INFO
    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let mut config = Config::load_or_init()?;
    config.apply_env_overrides();

    match cli.command.unwrap_or(Commands::Chat { message: None }) {
        Commands::Chat { message } => chat::run(config, message).await,

        Commands::History => {
            let store = open_store(&config)?;
            chat::render::transcript(store.messages());
            Ok(())
        }

        Commands::Status => {
            let store = open_store(&config)?;
            println!("💬 capchat");
            println!();
            println!("Version:    {}", env!("CARGO_PKG_VERSION"));
            println!("Endpoint:   {}", config.base_url);
            println!("Config:     {}", config.config_path.display());
            println!("State dir:  {}", config.state_dir.display());
            println!();
            println!("Messages:        {}", store.messages().len());
            println!(
                "Context:         {}",
                if store.include_context() { "on" } else { "off" }
            );
            println!("Caps remaining:  {}", format_caps(store.remaining_caps()));
            Ok(())
        }

        Commands::Context { setting } => {
            let mut store = open_store(&config)?;
            match setting.as_str() {
                "on" => store.set_include_context(true)?,
                "off" => store.set_include_context(false)?,
                _ => {}
            }
            println!(
                "Context inclusion: {}",
                if store.include_context() { "on" } else { "off" }
            );
            Ok(())
        }

        Commands::Reset { yes } => {
            let confirmed = yes
                || dialoguer::Confirm::new()
                    .with_prompt("Delete the persisted session?")
                    .default(false)
                    .interact()?;
            if !confirmed {
                println!("Nothing deleted.");
                return Ok(());
            }
            FileSessionRepository::new(&config.state_dir).clear()?;
            println!("Session cleared. The next run starts fresh.");
            Ok(())
        }
    }
}

fn open_store(config: &Config) -> Result<SessionStore> {
    SessionStore::open(Box::new(FileSessionRepository::new(&config.state_dir)))
}
