//! Discord Client
//!
//! REST calls for nicknames, channel messages, interaction replies and
//! command registration, plus one gateway session per online satellite bot.

mod gateway;

use std::collections::HashMap;

use async_trait::async_trait;
use pricebot_core::message::{Embed, Reply};
use pricebot_core::{BotCredential, BotError, ChatGateway, Result};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde_json::{Value, json};
use tokio::sync::Mutex;

use self::gateway::GatewaySession;
use crate::http;

const PROVIDER_NAME: &str = "Discord";

/// Message flag hiding a reply from everyone but the invoker
pub const EPHEMERAL_FLAG: u64 = 1 << 6;

#[derive(Clone, Debug)]
pub struct DiscordConfig {
    pub api_base: String,
    pub gateway_url: String,

    /// Token of the main bot that answers commands and posts alerts
    pub bot_token: String,

    pub application_id: String,
    pub timeout_secs: u64,
}

impl DiscordConfig {
    pub fn new(bot_token: impl Into<String>, application_id: impl Into<String>) -> Self {
        Self {
            api_base: "https://discord.com/api/v10".into(),
            gateway_url: "wss://gateway.discord.gg/?v=10&encoding=json".into(),
            bot_token: bot_token.into(),
            application_id: application_id.into(),
            timeout_secs: 15,
        }
    }
}

/// JSON body for an interaction message, ephemeral replies carry the flag
pub fn message_payload(reply: &Reply) -> Value {
    let mut payload = json!({ "embeds": reply.embeds });
    if let Some(content) = &reply.content {
        payload["content"] = json!(content);
    }
    if reply.ephemeral {
        payload["flags"] = json!(EPHEMERAL_FLAG);
    }
    payload
}

fn discord_error(status: StatusCode) -> Option<BotError> {
    if status == StatusCode::TOO_MANY_REQUESTS {
        Some(BotError::RateLimited(PROVIDER_NAME.into()))
    } else if status.is_success() {
        None
    } else {
        Some(BotError::TransientSend(format!("{PROVIDER_NAME} returned status {}", status.as_u16())))
    }
}

pub struct DiscordClient {
    http: reqwest::Client,
    config: DiscordConfig,

    /// Open gateway sessions keyed by client id
    sessions: Mutex<HashMap<String, GatewaySession>>,
}

impl DiscordClient {
    pub fn new(config: DiscordConfig) -> Result<Self> {
        Ok(Self {
            http: http::client(config.timeout_secs)?,
            config,
            sessions: Mutex::new(HashMap::new()),
        })
    }

    pub fn application_id(&self) -> &str {
        &self.config.application_id
    }

    fn request(&self, method: Method, path: &str, token: Option<&str>) -> RequestBuilder {
        let builder = self.http.request(method, format!("{}{path}", self.config.api_base));
        match token {
            Some(token) => builder.header("Authorization", format!("Bot {token}")),
            None => builder,
        }
    }

    async fn execute(builder: RequestBuilder) -> Result<Response> {
        let response = builder.send().await?;
        match discord_error(response.status()) {
            None => Ok(response),
            Some(e) => {
                let body = response.text().await.unwrap_or_default();
                tracing::debug!(error = %e, body = %body, "Discord request failed");
                Err(e)
            }
        }
    }

    /// Replace the deferred "thinking" message with the final reply
    pub async fn edit_original(&self, interaction_token: &str, reply: &Reply) -> Result<()> {
        let mut payload = message_payload(reply);
        if let Some(object) = payload.as_object_mut() {
            object.remove("flags");
        }
        let path = format!("/webhooks/{}/{interaction_token}/messages/@original", self.config.application_id);
        Self::execute(self.request(Method::PATCH, &path, None).json(&payload)).await?;
        Ok(())
    }

    pub async fn create_followup(&self, interaction_token: &str, reply: &Reply) -> Result<()> {
        let path = format!("/webhooks/{}/{interaction_token}", self.config.application_id);
        Self::execute(self.request(Method::POST, &path, None).json(&message_payload(reply))).await?;
        Ok(())
    }

    /// Overwrite the application's global commands, returns how many Discord accepted
    pub async fn register_commands(&self, commands: &Value) -> Result<usize> {
        let path = format!("/applications/{}/commands", self.config.application_id);
        let response = Self::execute(
            self.request(Method::PUT, &path, Some(&self.config.bot_token))
                .json(commands),
        )
        .await?;
        let registered: Vec<Value> = response.json().await?;
        Ok(registered.len())
    }

    /// Close every gateway session still open
    pub async fn close_all(&self) {
        let sessions: Vec<GatewaySession> = self.sessions.lock().await.drain().map(|(_, s)| s).collect();
        for session in sessions {
            session.close().await;
        }
    }
}

#[async_trait]
impl ChatGateway for DiscordClient {
    async fn open_session(&self, credential: &BotCredential) -> Result<()> {
        let stale = self.sessions.lock().await.remove(&credential.client_id);
        if let Some(session) = stale {
            session.close().await;
        }

        let session = GatewaySession::connect(&self.config.gateway_url, &credential.token, &credential.client_id).await?;
        self.sessions
            .lock()
            .await
            .insert(credential.client_id.clone(), session);

        tracing::info!(client_id = %credential.client_id, "Gateway session opened");
        Ok(())
    }

    async fn close_session(&self, credential: &BotCredential) -> Result<()> {
        let session = self.sessions.lock().await.remove(&credential.client_id);
        if let Some(session) = session {
            session.close().await;
        }
        Ok(())
    }

    async fn set_nickname(&self, credential: &BotCredential, guild_id: &str, nickname: &str) -> Result<()> {
        let nick = if nickname.is_empty() { Value::Null } else { json!(nickname) };
        let path = format!("/guilds/{guild_id}/members/@me");
        Self::execute(
            self.request(Method::PATCH, &path, Some(&credential.token))
                .json(&json!({ "nick": nick })),
        )
        .await?;
        Ok(())
    }

    async fn send_embed(&self, channel_id: &str, embed: &Embed) -> Result<()> {
        let path = format!("/channels/{channel_id}/messages");
        Self::execute(
            self.request(Method::POST, &path, Some(&self.config.bot_token))
                .json(&json!({ "embeds": [embed] })),
        )
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pricebot_core::message::COLOR_GREEN;

    #[test]
    fn test_message_payload() {
        let reply = Reply::text("Added BTC").ephemeral();
        let payload = message_payload(&reply);
        assert_eq!(payload["content"], "Added BTC");
        assert_eq!(payload["flags"], 64);
        assert_eq!(payload["embeds"], json!([]));

        let reply = Reply::embed(Embed::new("BTC Price Info").color(COLOR_GREEN));
        let payload = message_payload(&reply);
        assert!(payload.get("flags").is_none());
        assert!(payload.get("content").is_none());
        assert_eq!(payload["embeds"][0]["title"], "BTC Price Info");
    }

    #[test]
    fn test_status_mapping() {
        assert!(discord_error(StatusCode::NO_CONTENT).is_none());
        assert!(matches!(discord_error(StatusCode::TOO_MANY_REQUESTS), Some(BotError::RateLimited(_))));
        assert!(matches!(discord_error(StatusCode::FORBIDDEN), Some(BotError::TransientSend(_))));
    }

    #[test]
    fn test_config_defaults() {
        let config = DiscordConfig::new("token", "123");
        assert_eq!(config.api_base, "https://discord.com/api/v10");
        assert!(config.gateway_url.starts_with("wss://"));
    }
}
