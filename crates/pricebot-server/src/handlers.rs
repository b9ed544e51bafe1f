//! HTTP Handlers

use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
};
use pricebot_core::Reply;
use pricebot_runtime::DiscordClient;
use serde::Serialize;

use crate::commands::{self, Command, Invocation};
use crate::interaction::{Interaction, InteractionResponse, kind};
use crate::signature::{SIGNATURE_HEADER, TIMESTAMP_HEADER};
use crate::state::AppState;

// ============================================================================
// Response Types
// ============================================================================

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub bots_total: usize,
    pub bots_leased: usize,
    pub alert_coins: usize,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

type HandlerError = (StatusCode, Json<ErrorResponse>);

fn reject(status: StatusCode, code: &str, error: impl Into<String>) -> HandlerError {
    (
        status,
        Json(ErrorResponse {
            error: error.into(),
            code: code.into(),
        }),
    )
}

// ============================================================================
// Handlers
// ============================================================================

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let services = &state.services;
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        bots_total: services.pool.capacity(),
        bots_leased: services.pool.leased_count().await,
        alert_coins: services.alerts.coins().await.len(),
    })
}

/// Discord interactions endpoint
pub async fn interactions(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<InteractionResponse>, HandlerError> {
    let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());
    let (Some(signature), Some(timestamp)) = (header(SIGNATURE_HEADER), header(TIMESTAMP_HEADER)) else {
        return Err(reject(StatusCode::UNAUTHORIZED, "MISSING_SIGNATURE", "missing signature headers"));
    };
    if !state.verifier.verify(signature, timestamp, &body) {
        tracing::warn!("Rejected interaction with an invalid signature");
        return Err(reject(StatusCode::UNAUTHORIZED, "INVALID_SIGNATURE", "invalid request signature"));
    }

    let interaction: Interaction = serde_json::from_slice(&body)
        .map_err(|e| reject(StatusCode::BAD_REQUEST, "INVALID_PAYLOAD", e.to_string()))?;

    match interaction.kind {
        kind::PING => Ok(Json(InteractionResponse::pong())),
        kind::AUTOCOMPLETE => {
            let choices = interaction
                .data
                .as_ref()
                .map(commands::autocomplete)
                .unwrap_or_default();
            Ok(Json(InteractionResponse::choices(&choices)))
        }
        kind::APPLICATION_COMMAND => Ok(Json(run_command(state, interaction).await)),
        other => Err(reject(
            StatusCode::BAD_REQUEST,
            "UNSUPPORTED_INTERACTION",
            format!("unsupported interaction type {other}"),
        )),
    }
}

async fn run_command(state: AppState, interaction: Interaction) -> InteractionResponse {
    let command = match interaction.data.as_ref().map(Command::parse) {
        Some(Ok(command)) => command,
        Some(Err(e)) => return InteractionResponse::message(&Reply::text(e.user_message()).ephemeral()),
        None => return InteractionResponse::message(&Reply::text("❌ Empty command").ephemeral()),
    };

    let ctx = Invocation {
        user_id: interaction.invoker().map(|u| u.id.clone()).unwrap_or_default(),
        username: interaction.invoker().map(|u| u.username.clone()).unwrap_or_default(),
        guild_id: interaction.guild_id.clone().unwrap_or_default(),
        channel_id: interaction.channel_id.clone().unwrap_or_default(),
    };

    if !command.is_deferred() {
        let mut reply = commands::execute(&state.services, &ctx, command).await;
        let followups = std::mem::take(&mut reply.followups);
        if !followups.is_empty() {
            let discord = state.discord.clone();
            let token = interaction.token;
            tokio::spawn(async move { send_followups(&discord, &token, &followups).await });
        }
        return InteractionResponse::message(&reply);
    }

    let private = commands::is_private(&state.services, &ctx, &command).await;
    tokio::spawn(async move {
        let name = command.name();
        let reply = commands::execute(&state.services, &ctx, command).await;
        if let Err(e) = state.discord.edit_original(&interaction.token, &reply).await {
            tracing::warn!(command = name, error = %e, "Could not deliver deferred reply");
            return;
        }
        send_followups(&state.discord, &interaction.token, &reply.followups).await;
    });

    InteractionResponse::deferred(private)
}

async fn send_followups(discord: &DiscordClient, token: &str, followups: &[Reply]) {
    for followup in followups {
        if let Err(e) = discord.create_followup(token, followup).await {
            tracing::warn!(error = %e, "Could not send follow-up message");
        }
    }
}
