//! hed-bot - HED tag assistant
//!
//! Recommends Hierarchical Event Descriptor annotations for free-text event
//! descriptions: a language model proposes tags, the schema validates them
//! and the redundancy reducer removes tags implied by more specific ones.
//!
//! Default port: 5731

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use hed_common::config::{load_config, TomlConfig};
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use hed_bot::config::openai_settings;
use hed_bot::services::{
    OpenAiProposer, PromptBuilder, SchemaClient, SchemaDocument, TagProposer, TaggingService,
};
use hed_bot::{build_router, AppState};

/// Command-line arguments for hed-bot
#[derive(Parser, Debug)]
#[command(name = "hed-bot")]
#[command(about = "HED tag assistant")]
#[command(version)]
struct Args {
    /// Config file (overrides HED_BOT_CONFIG)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Local HED XML schema file
    #[arg(long, env = "HED_BOT_SCHEMA_FILE")]
    schema_file: Option<PathBuf>,

    /// HED XML schema URL
    #[arg(long, env = "HED_BOT_SCHEMA_URL")]
    schema_url: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP service (default)
    Serve {
        /// Address to bind
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on
        #[arg(short, long, env = "HED_BOT_PORT")]
        port: Option<u16>,
    },
    /// Reduce an annotation and print the result
    Reduce {
        annotation: String,
    },
    /// Recommend an annotation for one event description
    Tag {
        description: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // .env may carry OPENAI_API_KEY; absence is fine
    dotenv::dotenv().ok();

    let args = Args::parse();
    let loaded = load_config(args.config.as_deref()).context("Failed to load configuration")?;
    let config = loaded.config;

    init_tracing(&config.logging.level);

    info!(
        "Starting hed-bot v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );
    match &loaded.source {
        Some(path) => info!("Configuration: {}", path.display()),
        None => info!("Configuration: compiled defaults"),
    }

    let document = load_schema(&args, &config).await?;
    info!(
        version = document.schema.version().unwrap_or("unknown"),
        tags = document.schema.len(),
        "HED schema loaded"
    );

    let service = build_service(document, &config)?;

    match args.command.unwrap_or(Command::Serve {
        host: None,
        port: None,
    }) {
        Command::Serve { host, port } => {
            let host = host.unwrap_or(config.host);
            let port = port.unwrap_or(config.port);
            serve(service, &host, port).await
        }
        Command::Reduce { annotation } => {
            let outcome = service.reduce_text(&annotation)?;
            for s in &outcome.substitutions {
                eprintln!("substituted {} -> {}", s.original, s.replacement);
            }
            println!("{}", outcome.annotation);
            Ok(())
        }
        Command::Tag { description } => {
            let outcome = service.tag(&description).await?;
            println!("{}\n", outcome.explanation);
            println!("Proposed: {}", outcome.proposed);
            println!("Annotation: {}", outcome.annotation);
            Ok(())
        }
    }
}

fn init_tracing(level: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("hed_bot={level},hed_common={level},tower_http={level}").into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Local file wins over URL; CLI wins over config
async fn load_schema(args: &Args, config: &TomlConfig) -> Result<SchemaDocument> {
    if let Some(path) = args.schema_file.as_ref().or(config.schema_file.as_ref()) {
        return SchemaDocument::from_file(path)
            .with_context(|| format!("Failed to load schema from {}", path.display()));
    }

    let url = args.schema_url.as_deref().unwrap_or(&config.schema_url);
    let client = SchemaClient::new(url)?;
    client
        .fetch()
        .await
        .with_context(|| format!("Failed to load schema from {}", url))
}

fn build_service(document: SchemaDocument, config: &TomlConfig) -> Result<TaggingService> {
    let prompts = PromptBuilder::new(&document.schema, config.prompt_context, &document.xml);
    let proposer = OpenAiProposer::new(openai_settings(&config.llm), prompts)?;
    info!(model = proposer.model(), base_url = %config.llm.base_url, "Tag proposer ready");

    let exempt = config.exempt_set();
    if exempt.is_empty() {
        warn!("No exempt tags configured; every implied tag is removed");
    } else {
        info!(count = exempt.len(), "Exempt tags configured");
    }

    Ok(TaggingService::new(
        Arc::new(document.schema),
        Arc::new(proposer),
        exempt,
        config.fallback.build(),
    ))
}

async fn serve(service: TaggingService, host: &str, port: u16) -> Result<()> {
    let app = build_router(AppState::new(service));

    let listener = tokio::net::TcpListener::bind((host, port))
        .await
        .with_context(|| format!("Failed to bind to {}:{}", host, port))?;
    info!("hed-bot listening on http://{}:{}", host, port);
    info!("Health check: http://{}:{}/health", host, port);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
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
                warn!("Failed to install terminate handler: {}", e);
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
