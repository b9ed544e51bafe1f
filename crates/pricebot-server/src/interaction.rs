//! Discord interaction payloads
//!
//! Only the parts of the interaction object the bot reads are modeled.

use pricebot_core::{Coin, Reply};
use pricebot_runtime::discord::{EPHEMERAL_FLAG, message_payload};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

pub mod kind {
    pub const PING: u8 = 1;
    pub const APPLICATION_COMMAND: u8 = 2;
    pub const AUTOCOMPLETE: u8 = 4;
}

mod response_kind {
    pub const PONG: u8 = 1;
    pub const CHANNEL_MESSAGE: u8 = 4;
    pub const DEFERRED_CHANNEL_MESSAGE: u8 = 5;
    pub const AUTOCOMPLETE_RESULT: u8 = 8;
}

#[derive(Clone, Debug, Deserialize)]
pub struct Interaction {
    #[serde(rename = "type")]
    pub kind: u8,

    #[serde(default)]
    pub token: String,

    #[serde(default)]
    pub guild_id: Option<String>,

    #[serde(default)]
    pub channel_id: Option<String>,

    /// Present in guilds
    #[serde(default)]
    pub member: Option<Member>,

    /// Present in DMs
    #[serde(default)]
    pub user: Option<User>,

    #[serde(default)]
    pub data: Option<CommandData>,
}

impl Interaction {
    pub fn invoker(&self) -> Option<&User> {
        self.member.as_ref().map(|m| &m.user).or(self.user.as_ref())
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct Member {
    pub user: User,
}

#[derive(Clone, Debug, Deserialize)]
pub struct User {
    pub id: String,
    pub username: String,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct CommandData {
    pub name: String,

    #[serde(default)]
    pub options: Vec<CommandOption>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct CommandOption {
    pub name: String,

    #[serde(default)]
    pub value: Option<Value>,

    /// Set on the option being typed during autocomplete
    #[serde(default)]
    pub focused: bool,
}

impl CommandData {
    pub fn option(&self, name: &str) -> Option<&Value> {
        self.options
            .iter()
            .find(|o| o.name == name)
            .and_then(|o| o.value.as_ref())
    }

    pub fn focused(&self) -> Option<&CommandOption> {
        self.options.iter().find(|o| o.focused)
    }
}

/// Body returned from the interactions endpoint
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct InteractionResponse {
    #[serde(rename = "type")]
    pub kind: u8,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl InteractionResponse {
    pub const fn pong() -> Self {
        Self {
            kind: response_kind::PONG,
            data: None,
        }
    }

    pub fn message(reply: &Reply) -> Self {
        Self {
            kind: response_kind::CHANNEL_MESSAGE,
            data: Some(message_payload(reply)),
        }
    }

    /// "Bot is thinking..." placeholder, the visibility is fixed here
    pub fn deferred(ephemeral: bool) -> Self {
        Self {
            kind: response_kind::DEFERRED_CHANNEL_MESSAGE,
            data: ephemeral.then(|| json!({ "flags": EPHEMERAL_FLAG })),
        }
    }

    pub fn choices(coins: &[Coin]) -> Self {
        let choices: Vec<Value> = coins
            .iter()
            .map(|coin| json!({ "name": coin.display_name(), "value": coin.id }))
            .collect();
        Self {
            kind: response_kind::AUTOCOMPLETE_RESULT,
            data: Some(json!({ "choices": choices })),
        }
    }
}
