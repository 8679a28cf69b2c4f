//! Passkeep CLI
//!
//! Command-line driver for the Passkeep session subsystem.
//!
//! # Usage
//!
//! ```bash
//! # Log in with a provider token taken from the environment
//! PASSKEEP_GOOGLE_TOKEN=... PASSKEEP_GOOGLE_ID=... passkeep login google
//!
//! # Create an account when the identity is not registered yet
//! passkeep signup google --name alice
//!
//! # Show the stored session
//! passkeep status
//!
//! # Call an authenticated backend endpoint
//! passkeep request library/shelves
//!
//! # End the session
//! passkeep logout google
//! ```

mod config;
mod providers;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use futures::StreamExt;
use futures::stream::BoxStream;
use passkeep_core::{
    Outcome, PasskeepClient, Provider, SessionEvent, create_store,
};
use std::path::PathBuf;
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, fmt};

#[derive(Parser)]
#[command(name = "passkeep")]
#[command(about = "Session management for the Passkeep book client")]
#[command(version)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to the configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in with an identity provider
    Login {
        /// Provider name (google, kakao, naver)
        provider: Provider,
    },

    /// Create an account for an unregistered provider identity
    Signup {
        /// Provider name (google, kakao, naver)
        provider: Provider,

        /// Display name for the new account
        #[arg(short, long)]
        name: String,
    },

    /// End the current session
    Logout {
        /// Provider the session was opened with
        provider: Provider,
    },

    /// Show the stored session
    Status {
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Send an authenticated GET request to the backend
    Request {
        /// Path relative to the backend base URL
        path: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = config::load_config(cli.config.as_deref())?;

    init_logging(&config.log_level, cli.verbose);
    debug!("Loaded configuration from {:?}", config.config_path);

    let store = create_store(config.store, &config.data_dir);
    let client = PasskeepClient::new(&config.client, store, providers::env_registry())
        .context("Failed to set up session client")?;
    client
        .prewarm()
        .await
        .context("Failed to read stored session")?;

    match cli.command {
        Commands::Login { provider } => login(&client, provider).await,
        Commands::Signup { provider, name } => signup(&client, provider, &name).await,
        Commands::Logout { provider } => logout(&client, provider).await,
        Commands::Status { format } => status(&client, &format).await,
        Commands::Request { path } => request(&client, &path).await,
    }
}

fn init_logging(level: &str, verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
    };

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// Drain an event stream and return its terminal event.
async fn finish(mut events: BoxStream<'static, SessionEvent>) -> Result<SessionEvent> {
    while let Some(event) = events.next().await {
        if event.is_terminal() {
            return Ok(event);
        }
        debug!("Waiting for session operation");
    }
    bail!("session operation ended without a result")
}

async fn login(client: &PasskeepClient, provider: Provider) -> Result<()> {
    match finish(client.coordinator().login(provider)).await? {
        SessionEvent::LoggedIn => {
            print_session(client).await?;
            Ok(())
        }
        SessionEvent::SignupRequired { .. } => {
            println!("No account for this {} identity yet.", provider);
            println!("Run: passkeep signup {} --name <display name>", provider);
            Ok(())
        }
        SessionEvent::Failed { reason } => bail!("Login failed: {}", reason),
        other => bail!("Unexpected login result: {:?}", other),
    }
}

async fn signup(client: &PasskeepClient, provider: Provider, name: &str) -> Result<()> {
    let credential = match finish(client.coordinator().login(provider)).await? {
        SessionEvent::SignupRequired { credential } => credential,
        SessionEvent::LoggedIn => {
            println!("This {} identity already has an account.", provider);
            print_session(client).await?;
            return Ok(());
        }
        SessionEvent::Failed { reason } => bail!("Login failed: {}", reason),
        other => bail!("Unexpected login result: {:?}", other),
    };

    match finish(client.coordinator().signup(credential, name)).await? {
        SessionEvent::LoggedIn => {
            info!("Account created");
            print_session(client).await?;
            Ok(())
        }
        SessionEvent::Failed { reason } => bail!("Signup failed: {}", reason),
        other => bail!("Unexpected signup result: {:?}", other),
    }
}

async fn logout(client: &PasskeepClient, provider: Provider) -> Result<()> {
    match finish(client.coordinator().logout(provider)).await? {
        SessionEvent::LoggedOut => {
            println!("Logged out.");
            Ok(())
        }
        SessionEvent::Failed { reason } => bail!("Logout failed: {}", reason),
        other => bail!("Unexpected logout result: {:?}", other),
    }
}

async fn status(client: &PasskeepClient, format: &str) -> Result<()> {
    let session = client
        .coordinator()
        .current_session()
        .await
        .context("Failed to read stored session")?;
    let cached = client.cache().snapshot();

    match format {
        "json" => {
            let value = match &session {
                Some(session) => serde_json::json!({
                    "logged_in": true,
                    "provider": session.provider,
                    "display_name": session.display_name,
                    "token_cached_at": cached.loaded_at,
                }),
                None => serde_json::json!({
                    "logged_in": false,
                    "token_cached_at": cached.loaded_at,
                }),
            };
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
        _ => match session {
            Some(session) => {
                println!("Logged in as {} via {}", session.display_name, session.provider)
            }
            None => println!("Not logged in."),
        },
    }
    if let Some(loaded_at) = cached.loaded_at {
        debug!("Token cache loaded at {}", loaded_at);
    }
    Ok(())
}

async fn request(client: &PasskeepClient, path: &str) -> Result<()> {
    let mut outcomes = client.api().fetch::<serde_json::Value>(path);

    while let Some(outcome) = outcomes.next().await {
        match outcome {
            Outcome::Pending => debug!("Request to {} in flight", path),
            Outcome::Ok(body) => {
                println!("{}", serde_json::to_string_pretty(&body)?);
                return Ok(());
            }
            Outcome::Fail(reason) => bail!("Request failed: {}", reason),
        }
    }
    bail!("request ended without a result")
}

async fn print_session(client: &PasskeepClient) -> Result<()> {
    match client.coordinator().current_session().await? {
        Some(session) => println!("Logged in as {} via {}", session.display_name, session.provider),
        None => println!("Logged in."),
    }
    Ok(())
}
