//! ACE Studio orchestrator - Main entry point
//!
//! Runs the generation orchestration pipeline against an ACE-Step backend
//! and serves the local HTTP/SSE surface. The `submit`, `library` and
//! `download` subcommands drive the same orchestrator from the terminal.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use ace_common::api::ModelVariant;
use ace_common::config::{self as common_config, TomlConfig, DEFAULT_LISTEN_PORT};
use ace_common::events::EventBus;
use ace_orchestrator::config::{resolve_backend_url, ProviderSettings};
use ace_orchestrator::models::Submission;
use ace_orchestrator::orchestrator::LibraryItem;
use ace_orchestrator::services::BackendClient;
use ace_orchestrator::{build_router, AppState, Orchestrator};
use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for ace-orchestrator
#[derive(Parser, Debug)]
#[command(name = "ace-orchestrator")]
#[command(about = "Song generation orchestrator for ACE Studio")]
#[command(version)]
struct Args {
    /// Port for the local HTTP surface
    #[arg(short, long, env = "ACE_ORCHESTRATOR_PORT")]
    port: Option<u16>,

    /// Backend base URL (overrides ACE_BACKEND_URL and the config file)
    #[arg(short, long)]
    backend_url: Option<String>,

    /// Config file (overrides ACE_STUDIO_CONFIG)
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the HTTP/SSE surface (default)
    Serve,

    /// Generate one song from an idea and wait until it is ready
    Submit {
        /// One-sentence song idea
        idea: String,

        #[arg(long)]
        instrumental: bool,

        /// base, turbo or shift (default: inventory default)
        #[arg(long)]
        variant: Option<ModelVariant>,

        #[arg(long, default_value_t = 40)]
        weirdness: u8,

        #[arg(long, default_value_t = 70)]
        style_influence: u8,
    },

    /// Print the merged library as JSON
    Library,

    /// Download a generation's audio as <title>.wav
    Download {
        id: String,

        #[arg(long, default_value = ".")]
        dir: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_path = common_config::resolve_config_path(args.config.as_deref());
    let toml_config = common_config::load_or_default(config_path.as_deref())
        .context("Failed to load configuration")?;

    init_tracing(&toml_config)?;

    let backend_url = resolve_backend_url(args.backend_url.as_deref(), &toml_config);
    let client = Arc::new(BackendClient::new(&backend_url).context("Failed to build backend client")?);

    let settings = ProviderSettings::resolve(&toml_config, client.as_ref()).await;
    let event_bus = EventBus::new(256);
    let orchestrator = Arc::new(Orchestrator::new(
        client,
        settings,
        toml_config.polling.clone(),
        event_bus,
    ));

    match args.command.unwrap_or(Command::Serve) {
        Command::Serve => {
            let port = args
                .port
                .or(toml_config.listen_port)
                .unwrap_or(DEFAULT_LISTEN_PORT);
            serve(orchestrator, port).await
        }
        Command::Submit {
            idea,
            instrumental,
            variant,
            weirdness,
            style_influence,
        } => {
            let mut submission = Submission::simple(idea, instrumental);
            submission.model_variant = variant;
            submission.weirdness = weirdness.min(100);
            submission.style_influence = style_influence.min(100);
            submit(orchestrator, submission, &toml_config).await
        }
        Command::Library => {
            orchestrator.poll_history().await;
            let library = orchestrator.library().await;
            println!("{}", serde_json::to_string_pretty(&library)?);
            Ok(())
        }
        Command::Download { id, dir } => {
            let path = orchestrator.download_audio(&id, &dir).await?;
            println!("{}", path.display());
            Ok(())
        }
    }
}

fn init_tracing(toml_config: &TomlConfig) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!(
            "ace_orchestrator={level},ace_common={level},tower_http=info",
            level = toml_config.logging.level
        )
        .into()
    });

    let file_layer = match &toml_config.logging.file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(std::sync::Mutex::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .with(file_layer)
        .init();
    Ok(())
}

async fn serve(orchestrator: Arc<Orchestrator>, port: u16) -> Result<()> {
    let cancel = CancellationToken::new();
    let pollers = orchestrator.spawn_pollers(cancel.clone());

    let app = build_router(AppState::new(Arc::clone(&orchestrator)));
    let addr = SocketAddr::from(([127, 0, 0, 1], port));

    info!("Starting ACE Studio orchestrator on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    cancel.cancel();
    for poller in pollers {
        if let Err(e) = poller.await {
            error!("Poller task ended abnormally: {}", e);
        }
    }

    info!("Server shutdown complete");
    Ok(())
}

async fn submit(
    orchestrator: Arc<Orchestrator>,
    submission: Submission,
    toml_config: &TomlConfig,
) -> Result<()> {
    orchestrator.poll_inventory().await;

    let report = orchestrator.submit_and_wait(submission).await?;
    for record in &report.steps {
        info!(step = record.step.as_str(), outcome = ?record.outcome, "Step");
    }

    let server_id = report
        .server_id
        .clone()
        .ok_or_else(|| anyhow!("Generation failed at step {:?}", report.fatal_step()))?;

    info!(server_id = %server_id, "Submitted; waiting for the backend to finish");

    let interval = Duration::from_millis(toml_config.polling.history_interval_ms);
    loop {
        tokio::time::sleep(interval).await;
        if let Some(poll) = orchestrator.poll_history().await {
            if let Some(retired) = poll.retired.iter().find(|r| r.temp_id == report.temp_id) {
                let library = orchestrator.library().await;
                let record = library.iter().find_map(|item| match item {
                    LibraryItem::Record(record) if record.id == retired.server_id => Some(record),
                    _ => None,
                });
                println!("{}", serde_json::to_string_pretty(&record)?);
                return Ok(());
            }
        }
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install terminate handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
