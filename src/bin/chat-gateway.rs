// ABOUTME: Chat gateway server binary
// ABOUTME: Wires configuration, sidecars, and the router, then serves HTTP
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Chat Gateway Contributors

//! # Chat Gateway Server Binary
//!
//! Starts the encrypted relay gateway with its optional persistence and
//! notification sidecars.

use anyhow::Result;
use chat_gateway::{
    config::environment::ServerConfig, database::Database, logging, notifications::Notifier,
    resources::ServerResources, routes::gateway_router,
    upstream::{CompletionProvider, OpenAiProvider},
};
use clap::Parser;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "chat-gateway")]
#[command(about = "Chat Gateway - Encrypted streaming relay for a completion service")]
pub struct Args {
    /// Override HTTP port
    #[arg(long)]
    http_port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Load configuration from environment
    let mut config = ServerConfig::from_env()?;
    if let Some(http_port) = args.http_port {
        config.http_port = http_port;
    }

    // Initialize production logging
    logging::init_from_env()?;

    info!("Starting Chat Gateway");
    info!("{}", config.summary());

    // Optional persistence sidecar
    let database = match &config.database.url {
        Some(url) => {
            let database = Database::connect(url).await?;
            info!("Database initialized: {url}");
            Some(database)
        }
        None => {
            warn!("No database configured; exchange persistence is disabled");
            None
        }
    };

    // Upstream completion provider
    let provider = Arc::new(OpenAiProvider::from_config(&config.upstream)?);
    info!("Upstream provider ready (model: {})", provider.model());

    // Notification sidecar
    let notifier = Notifier::new(config.notification.endpoint.clone());
    if notifier.is_configured() {
        info!("Completion notifications enabled");
    }

    let http_port = config.http_port;
    let resources = Arc::new(ServerResources::new(config, provider, database, notifier));
    let router = gateway_router(resources);

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", http_port)).await?;
    info!("Gateway listening on port {http_port}");
    display_available_endpoints(http_port);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("Gateway shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to install shutdown handler: {e}");
    }
}

/// Display the gateway's endpoints (each is also mounted under /api)
fn display_available_endpoints(port: u16) {
    let host = std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());

    info!("=== Available API Endpoints ===");
    info!("   Chat Relay:   POST http://{host}:{port}/chat-process");
    info!("   Config:       POST http://{host}:{port}/config");
    info!("   Session:      POST http://{host}:{port}/session");
    info!("   Verify:       POST http://{host}:{port}/verify");
    info!("=== End of Endpoint List ===");
}
