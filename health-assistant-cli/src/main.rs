//! CLI entry point for the health assistant

use anyhow::Result;
use clap::{Parser, Subcommand};
use console::style;
use health_assistant_agent::{ConversationAgent, EmergencyDetector, ReplyOutcome};
use health_assistant_core::config::{Config, ConfigLoader};
use health_assistant_core::logging::init_logging;
use health_assistant_core::session::SessionManager;
use health_assistant_core::utils::{mask_secret, preview};
use health_assistant_manager::{run_server, AppState};
use health_assistant_providers::OpenAICompatClient;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "health-assistant")]
#[command(about = "Conversational health assistant with emergency detection")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration directory
    #[arg(short, long, global = true)]
    config_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API server
    Serve {
        /// Address to bind, overrides server.host
        #[arg(long)]
        host: Option<String>,
        /// Port to bind, overrides server.port
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Send one message to the assistant
    Chat {
        /// Message to send
        #[arg(short, long)]
        message: String,
        /// Session key for conversation continuity
        #[arg(short, long)]
        session: Option<String>,
    },
    /// Show resolved configuration
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    let cli = Cli::parse();

    let config_loader = if let Some(dir) = cli.config_dir {
        ConfigLoader::with_dir(dir)
    } else {
        ConfigLoader::new()
    };

    let config = config_loader.load()?;
    let _log_guard = init_logging(&config.logging);

    match cli.command {
        Commands::Serve { host, port } => {
            info!("Starting server");
            run_serve(config, host, port).await?;
        }
        Commands::Chat { message, session } => {
            info!("Processing message: {}", preview(&message, 80));
            run_chat(&config, &message, session).await?;
        }
        Commands::Status => {
            run_status(&config_loader, &config);
        }
    }

    Ok(())
}

fn build_agent(config: &Config) -> ConversationAgent {
    let provider = Arc::new(OpenAICompatClient::from_config(&config.provider));
    let sessions = Arc::new(SessionManager::new(config.sessions.max_sessions));
    ConversationAgent::from_config(provider, sessions, config)
}

async fn run_serve(mut config: Config, host: Option<String>, port: Option<u16>) -> Result<()> {
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }

    println!("{}", style("Starting Health Assistant API...").bold().cyan());
    println!("Model: {}", config.provider.model);
    println!("API base: {}", config.provider.api_base);
    println!("Listening on {}:{}", config.server.host, config.server.port);

    let state = AppState::new(Arc::new(build_agent(&config)));
    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

    let server = config.server.clone();
    let sessions = config.sessions.clone();
    let mut server_handle =
        tokio::spawn(async move { run_server(state, &server, &sessions, shutdown_rx).await });

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result?;
            println!("\n{}", style("Shutting down...").yellow());
            let _ = shutdown_tx.send(());
        }
        // The server only returns early on a bind or serve error.
        result = &mut server_handle => {
            return match result {
                Ok(inner) => inner,
                Err(e) => Err(e.into()),
            };
        }
    }

    match server_handle.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => error!("Server error: {}", e),
        Err(e) => error!("Server task failed: {}", e),
    }

    println!("{}", style("Server stopped.").green());
    Ok(())
}

async fn run_chat(config: &Config, message: &str, session: Option<String>) -> Result<()> {
    let agent = build_agent(config);
    let outcome = agent.process_message(message, session).await;

    let label = match &outcome {
        ReplyOutcome::Model(_) => style("model").green(),
        ReplyOutcome::Degraded { cause, .. } => {
            println!("{} {}", style("Model unavailable:").yellow(), cause);
            style("degraded").yellow()
        }
        ReplyOutcome::Emergency { .. } => style("emergency").red().bold(),
    };

    let reply = outcome.reply();
    println!("{}\n", reply.message);
    println!("Session: {}", reply.session_id);
    println!("Reply: {}", label);
    Ok(())
}

fn run_status(loader: &ConfigLoader, config: &Config) {
    println!("{}", style("Health Assistant Status").bold().cyan());
    println!("Version: {}\n", env!("CARGO_PKG_VERSION"));

    println!("{}", style("Configuration:").bold());
    println!("  Config directory: {}", loader.config_dir().display());
    let config_file = if loader.config_path().exists() {
        style("found").green()
    } else {
        style("not found, using defaults").dim()
    };
    println!("  Config file: {}", config_file);
    println!();

    println!("{}", style("Provider:").bold());
    println!("  API base: {}", config.provider.api_base);
    println!("  API key: {}", mask_secret(&config.provider.api_key));
    println!("  Model: {}", config.provider.model);
    println!("  Temperature: {}", config.provider.temperature);
    println!("  Max tokens: {}", config.provider.max_tokens);
    println!("  Timeout: {}s", config.provider.timeout_secs);
    println!();

    println!("{}", style("Agent:").bold());
    println!("  History window: {}", config.agent.history_window);
    let detector =
        EmergencyDetector::with_keywords(config.agent.extra_emergency_keywords.iter().cloned());
    println!("  Emergency keywords: {}", detector.len());
    println!();

    println!("{}", style("Sessions:").bold());
    println!("  Idle TTL: {}s", config.sessions.idle_ttl_secs);
    println!("  Max sessions: {}", config.sessions.max_sessions);
    println!();

    println!("{}", style("Server:").bold());
    println!("  Bind: {}:{}", config.server.host, config.server.port);
    println!("  CORS origins: {}", config.server.cors_origins.join(", "));
}
