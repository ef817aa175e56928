//! # Promo Code Bot Main Entry Point
//!
//! Initializes logging, loads configuration, sets up the database,
//! and runs the Telegram bot next to the health check server.

use anyhow::Result;
use teloxide::prelude::*;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use promo_code_bot::bot::handlers::BotHandler;
use promo_code_bot::config::Config;
use promo_code_bot::database::connection::DatabaseManager;
use promo_code_bot::engine::session::InMemorySessionStore;
use promo_code_bot::engine::ClaimPolicyEngine;
use promo_code_bot::services::health::HealthService;
use promo_code_bot::store::{PoolKind, RowStore};
use promo_code_bot::utils::datetime::SystemClock;
use promo_code_bot::utils::logging::log_system_event;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "promo_code_bot=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;

    info!("Starting Promo Code Bot v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration loaded - Database: {}, HTTP Port: {}",
        config.database_url, config.http_port);
    info!("Claim policy: {:?}", config.policy);

    // Initialize database
    info!("Initializing database connection...");
    let db_manager = DatabaseManager::new(&config.database_url).await?;
    info!("Running database migrations...");
    db_manager.run_migrations().await?;
    let db_arc = Arc::new(db_manager);
    info!("Database initialized successfully");

    for pool in PoolKind::ALL {
        match db_arc.stock(pool).await {
            Ok(level) => info!("Pool {}: {} available, {} issued", pool, level.available, level.issued),
            Err(e) => tracing::warn!("Could not read {} stock: {}", pool, e),
        }
    }

    // Initialize claim engine
    let engine = Arc::new(ClaimPolicyEngine::new(
        db_arc.clone(),
        Arc::new(InMemorySessionStore::new()),
        Arc::new(SystemClock),
        config.policy.clone(),
    ));

    // Initialize bot
    info!("Initializing Telegram bot...");
    let bot = Bot::new(&config.telegram_bot_token);
    let handler = BotHandler::new(engine, config.intents.clone());
    info!("Telegram bot initialized successfully");

    // Initialize health service
    let health_service = HealthService::new(db_arc.clone());
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.http_port))
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind to port {}: {}", config.http_port, e))?;

    info!("Health check server starting on port {}", config.http_port);

    // Run both the bot and health server concurrently
    let bot_task = tokio::spawn(async move {
        Dispatcher::builder(bot, handler.schema())
            .enable_ctrlc_handler()
            .build()
            .dispatch()
            .await;
    });

    let health_task = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, health_service.router).await {
            tracing::error!("Health server error: {}", e);
        }
    });

    // Wait for either task to complete (which would indicate shutdown)
    tokio::select! {
        result1 = bot_task => {
            if let Err(e) = result1 {
                tracing::error!("Bot task error: {}", e);
            }
        }
        result2 = health_task => {
            if let Err(e) = result2 {
                tracing::error!("Health task error: {}", e);
            }
        }
    }

    log_system_event("Application stopped", None);
    Ok(())
}
