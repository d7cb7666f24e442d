//! services/bot/src/bin/bot.rs

use bot_lib::{
    adapters::{DbAdapter, SseCompletionAdapter, TelegramTransport},
    bot::{build_handler, maintenance::spawn_cache_sweeper, AppState, MessageDelivery, Pipeline, Repositories},
    config::Config,
    error::BotError,
};
use career_assistant_core::ConversationStore;
use sqlx::sqlite::SqlitePoolOptions;
use std::sync::Arc;
use teloxide::prelude::*;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), BotError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting bot...");

    // --- 2. Connect to Database & Run Migrations ---
    info!("Connecting to database...");
    let db_pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await?;
    let db_adapter = Arc::new(DbAdapter::new(db_pool));
    db_adapter.run_migrations().await?;
    info!("Database migrations complete.");

    // --- 3. Initialize Service Adapters ---
    let completion = Arc::new(SseCompletionAdapter::new(config.completion.clone())?);
    let bot = Bot::new(&config.telegram_token);
    let transport = Arc::new(TelegramTransport::new(bot.clone(), config.parse_mode));

    // --- 4. Build the Pipeline & Shared AppState ---
    let delivery = Arc::new(MessageDelivery::new(transport, config.delivery.clone()));
    let contexts = Arc::new(ConversationStore::new(config.history_depth));
    let repositories = Repositories {
        internships: db_adapter.clone(),
        jobs: db_adapter.clone(),
        courses: db_adapter,
    };
    let pipeline = Arc::new(Pipeline::new(
        repositories,
        completion,
        delivery.clone(),
        contexts,
        config.pipeline.clone(),
    ));
    let app_state = Arc::new(AppState {
        pipeline,
        delivery: delivery.clone(),
        config: config.clone(),
    });

    // --- 5. Start Background Maintenance ---
    let shutdown = CancellationToken::new();
    let sweeper = spawn_cache_sweeper(
        delivery,
        config.delivery.cache_sweep_interval,
        shutdown.clone(),
    );

    // --- 6. Run the Dispatcher ---
    info!("Bot is polling for updates.");
    Dispatcher::builder(bot, build_handler())
        .dependencies(dptree::deps![app_state])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    info!("Dispatcher stopped. Shutting down...");
    shutdown.cancel();
    sweeper
        .await
        .map_err(|e| BotError::Internal(format!("cache sweeper panicked: {}", e)))?;

    Ok(())
}
