//! Chat Gateway
//!
//! The chat platform seen from the bot: satellite identities that can be
//! brought online and renamed, and a main identity that posts notifications.

mod mock;

pub use mock::{GatewayCall, MockGateway};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::message::Embed;

/// Nickname + View Channels + Send Messages
pub const INVITE_PERMISSIONS: u64 = 67584;

/// Identity of one satellite bot
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BotCredential {
    /// Bot token, never logged
    pub token: String,

    /// OAuth2 application id, used for invite links
    pub client_id: String,
}

impl BotCredential {
    pub fn new(token: impl Into<String>, client_id: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            client_id: client_id.into(),
        }
    }

    pub fn invite_url(&self) -> String {
        format!(
            "https://discord.com/api/oauth2/authorize?client_id={}&permissions={}&scope=bot%20applications.commands",
            self.client_id, INVITE_PERMISSIONS
        )
    }
}

impl std::fmt::Debug for BotCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BotCredential")
            .field("client_id", &self.client_id)
            .field("token", &"<redacted>")
            .finish()
    }
}

/// Chat platform operations used by the pool, the poller and the alert monitor
#[async_trait]
pub trait ChatGateway: Send + Sync {
    /// Bring a satellite identity online
    async fn open_session(&self, credential: &BotCredential) -> Result<()>;

    /// Take a satellite identity offline
    async fn close_session(&self, credential: &BotCredential) -> Result<()>;

    /// Rename a satellite identity inside a guild, empty resets the nickname
    async fn set_nickname(&self, credential: &BotCredential, guild_id: &str, nickname: &str) -> Result<()>;

    /// Post a notification through the main identity
    async fn send_embed(&self, channel_id: &str, embed: &Embed) -> Result<()>;
}
