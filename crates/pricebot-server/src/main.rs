//! pricebot HTTP Server
//!
//! Axum server answering Discord interactions, plus the background loop
//! that keeps price bot nicknames current and fires alerts.

mod commands;
mod config;
mod handlers;
mod interaction;
mod signature;
mod state;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pricebot_core::svckit::{AlertMonitor, NicknameUpdater, PortfolioLedger, RetryPolicy, TokenPool, spawn_price_loop};
use pricebot_core::{ChatGateway, PriceProvider, SentimentSource};
use pricebot_runtime::santiment::SantimentConfig;
use pricebot_runtime::{DiscordClient, DiscordConfig, SantimentClient, default_aggregator};

use crate::config::Settings;
use crate::handlers::{health_check, interactions};
use crate::signature::SignatureVerifier;
use crate::state::{AppState, Services};

const RESTART_SPACING: Duration = Duration::from_secs(2);

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Could not listen for ctrl-c");
    }
    tracing::info!("Shutting down...");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let settings = Settings::from_env()?;
    let verifier = SignatureVerifier::from_hex(&settings.public_key)?;

    let discord = Arc::new(DiscordClient::new(DiscordConfig::new(
        settings.discord_token.clone(),
        settings.application_id.clone(),
    ))?);
    let gateway: Arc<dyn ChatGateway> = discord.clone();

    // Price sources
    let aggregator = default_aggregator()?;
    tracing::info!("Price providers: {}", aggregator.provider_names().join(" → "));
    let prices: Arc<dyn PriceProvider> = Arc::new(aggregator);

    let sentiment: Option<Arc<dyn SentimentSource>> = match SantimentConfig::from_env() {
        Some(config) => {
            tracing::info!("✓ Santiment configured");
            let client: Arc<dyn SentimentSource> = Arc::new(SantimentClient::from_config(config)?);
            Some(client)
        }
        None => {
            tracing::warn!("⚠ SANTIMENT_API_KEY not set - market sentiment disabled");
            None
        }
    };

    // Stores
    let pool = Arc::new(TokenPool::new(settings.credentials.clone(), gateway.clone()));
    if pool.capacity() == 0 {
        tracing::warn!("⚠ No price bot tokens configured - /add will always fail");
        tracing::warn!("  Set BOT_TOKENS and BOT_CLIENT_IDS in .env");
    }
    let updater = Arc::new(NicknameUpdater::new(
        pool.clone(),
        prices.clone(),
        gateway.clone(),
        settings.schedule.clone(),
    ));
    let alerts = Arc::new(AlertMonitor::new(gateway, prices.clone(), settings.alert_cooldown));
    let ledger = Arc::new(PortfolioLedger::open(&settings.portfolio_file).await?);

    // Slash commands
    match discord.register_commands(&commands::definitions::all()).await {
        Ok(count) => tracing::info!("✓ Registered {} slash commands", count),
        Err(e) => tracing::warn!(error = %e, "⚠ Slash command registration failed"),
    }

    let poller = spawn_price_loop(updater.clone(), alerts.clone());

    // Build application state
    let state = AppState {
        services: Arc::new(Services {
            prices,
            sentiment,
            pool: pool.clone(),
            updater,
            alerts,
            ledger,
            announce_retry: RetryPolicy::default(),
            restart_spacing: RESTART_SPACING,
        }),
        discord: discord.clone(),
        verifier: Arc::new(verifier),
    };

    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Build router
    let app = Router::new()
        .route("/health", get(health_check))
        .route("/interactions", post(interactions))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&settings.bind_addr).await?;

    tracing::info!("══════════════════════════════════════════════════");
    tracing::info!("🚀 pricebot server running on http://{}", settings.bind_addr);
    tracing::info!("══════════════════════════════════════════════════");
    tracing::info!("");
    tracing::info!("Endpoints:");
    tracing::info!("  GET  /health        - Health check");
    tracing::info!("  POST /interactions  - Discord interactions endpoint");
    tracing::info!("");
    tracing::info!("Price bots available: {}", pool.capacity());

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    poller.abort();
    let released = pool.shutdown().await;
    discord.close_all().await;
    tracing::info!(released, "Price bots released, bye");

    Ok(())
}
