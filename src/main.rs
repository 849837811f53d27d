//! Kirabot - Discord community bot.
//!
//! Runs a counting game, reaction roles and an interactive embed builder,
//! alongside a handful of text commands, a health endpoint and a self-ping
//! keep-alive loop.

mod common;
mod config;
mod discord;
mod engines;
mod store;
mod web;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::signal;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use common::error::AppError;
use common::init::InitGuard;
use config::{env::get_config_path, load_and_validate, Config};
use discord::{DiscordBotBuilder, Dispatcher};
use store::{CountingState, PgStore, StateStore};
use web::{health, keepalive, JokeClient};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    // Route panics through tracing
    std::panic::set_hook(Box::new(|panic| {
        error!("Unhandled panic: {}", panic);
    }));

    info!("Kirabot v{} starting...", env!("CARGO_PKG_VERSION"));

    let Some(guard) = InitGuard::acquire() else {
        warn!("Startup already in progress, skipping duplicate initialization");
        return Ok(());
    };

    let (config, store, counting) = match prepare().await {
        Ok(prepared) => prepared,
        Err(e) => {
            error!("Startup failed: {}", e);
            // Give a moment for error logs to flush
            tokio::time::sleep(Duration::from_secs(1)).await;
            std::process::exit(1);
        }
    };

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(15))
        .connect_timeout(Duration::from_secs(10))
        .build()?;

    let mut health_task = tokio::spawn(health::serve(config.web.port, shutdown_rx.clone()));
    let mut keepalive_task = tokio::spawn(keepalive::run(
        http.clone(),
        config.web.ping_url(),
        config.web.ping_interval(),
        shutdown_rx.clone(),
    ));

    let jokes = JokeClient::new(http, config.web.joke_url.clone(), Duration::from_secs(10));
    let dispatcher = Dispatcher::new(&config, store, counting, jokes, Instant::now());

    info!("Starting Discord bot...");
    let discord_bot = DiscordBotBuilder::new(
        config.discord.token.clone(),
        config.discord.presence.clone(),
        dispatcher,
        shutdown_rx,
    )
    .build()
    .await?;
    let mut discord_task = tokio::spawn(discord_bot.run());

    guard.commit();

    let shutdown = tokio::select! {
        biased;
        _ = shutdown_signal() => {
            info!("Shutdown signal received - stopping...");
            true
        }
        result = &mut health_task => {
            match result {
                Ok(Ok(())) => warn!("Web server exited"),
                Ok(Err(e)) => error!("Web server failed: {:#}", e),
                Err(e) => error!("Web server task panicked: {}", e),
            }
            false
        }
        _ = &mut keepalive_task => {
            error!("Self-ping task ended");
            false
        }
        _ = &mut discord_task => {
            error!("Discord task ended");
            false
        }
    };

    if let Err(e) = shutdown_tx.send(true) {
        debug!("Shutdown channel closed: {}", e);
    }

    if !shutdown {
        // Give a moment for error logs to flush
        tokio::time::sleep(Duration::from_secs(1)).await;
        std::process::exit(1);
    }

    let timeout = Duration::from_secs(5);
    match tokio::time::timeout(timeout, discord_task).await {
        Ok(Ok(())) => info!("Discord client stopped gracefully"),
        Ok(Err(e)) => warn!("Discord task panicked: {}", e),
        Err(_) => warn!("Discord shutdown timed out"),
    }

    info!("Exiting...");
    Ok(())
}

/// Load configuration and restore persisted state.
async fn prepare() -> Result<(Config, Arc<dyn StateStore>, CountingState), AppError> {
    let config_path = get_config_path();
    info!("Loading configuration from {}...", config_path);
    let config = load_and_validate(&config_path)?;

    info!("Configuration loaded successfully");
    info!("  Command prefix: {}", config.commands.prefix);
    info!("  Web port: {}", config.web.port);
    info!("  Self-ping target: {}", config.web.ping_url());

    let store = PgStore::connect(&config.database).await?;
    store.ensure_schema().await?;
    let counting = store.load_counting().await?;
    match counting.active_channel {
        Some(channel) => info!(
            "Counting game restored in channel {} at {}",
            channel, counting.next_expected
        ),
        None => info!("Counting game not configured"),
    }

    Ok((config, Arc::new(store), counting))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
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
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C"),
        _ = terminate => info!("Received SIGTERM"),
    }
}
