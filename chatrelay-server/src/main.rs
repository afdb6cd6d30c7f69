use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use chatrelay_core::config::{self, RelayConfig};
use chatrelay_core::consumer::FnCallbacks;
use chatrelay_core::{AppState, AssistantOptions, ChatRequest, StreamConsumer};

const DEFAULT_FILTER: &str = "info,chatrelay_core=debug";

#[derive(Parser)]
#[command(name = "chatrelay")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the relay endpoint
    Serve {
        /// YAML or JSON config file; the environment is used when omitted
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Override the listen address
        #[arg(short, long)]
        bind: Option<String>,
    },

    /// Stream one reply from a running relay to the terminal
    Chat {
        #[arg(long, default_value = "http://127.0.0.1:3000/api/chat")]
        url: String,

        #[arg(short, long)]
        prompt: String,

        #[arg(short, long, default_value = "")]
        system: String,

        #[arg(short, long)]
        temperature: Option<f32>,

        #[arg(short, long)]
        max_tokens: Option<u32>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    match cli.command {
        Commands::Serve { config, bind } => serve(config, bind).await,
        Commands::Chat {
            url,
            prompt,
            system,
            temperature,
            max_tokens,
        } => {
            let mut options = AssistantOptions::new(system);
            if let Some(temperature) = temperature {
                options = options.with_temperature(temperature);
            }
            if let Some(max_tokens) = max_tokens {
                options = options.with_max_tokens(max_tokens);
            }
            chat(&url, ChatRequest::new(prompt).with_options(options)).await
        }
    }
}

async fn serve(path: Option<PathBuf>, bind: Option<String>) -> Result<()> {
    let mut config = match &path {
        Some(path) => config::load_from_path(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => RelayConfig::from_env().context("loading config from environment")?,
    };
    if let Some(bind) = bind {
        config.server.bind_addr = bind;
    }

    info!(
        "Relaying to {} with model {} (key {})",
        config.upstream.base_url,
        config.upstream.model,
        config.upstream.api_key.partial_redact()
    );

    let listener = TcpListener::bind(&config.server.bind_addr)
        .await
        .with_context(|| format!("binding {}", config.server.bind_addr))?;
    let state = AppState::from_config(config)?;

    chatrelay_core::serve(listener, state, shutdown_signal()).await?;
    info!("Relay stopped");
    Ok(())
}

async fn chat(url: &str, request: ChatRequest) -> Result<()> {
    let printed = Arc::new(AtomicUsize::new(0));
    let progress = Arc::clone(&printed);
    let callbacks = FnCallbacks::new(
        move |text: &str| {
            let start = progress.swap(text.len(), Ordering::SeqCst);
            let mut stdout = std::io::stdout().lock();
            let _ = stdout.write_all(text[start.min(text.len())..].as_bytes());
            let _ = stdout.flush();
        },
        || println!(),
    );

    let consumer = Arc::new(StreamConsumer::new(url, Arc::new(callbacks))?);

    let canceller = Arc::clone(&consumer);
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            canceller.cancel();
        }
    });

    let outcome = consumer.get_stream(&request).await;
    interrupt.abort();

    let outcome = outcome?;
    if outcome.is_cancelled() {
        warn!("Cancelled after {} bytes", outcome.text().len());
    }
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        return;
    }
    info!("Shutdown signal received");
}
