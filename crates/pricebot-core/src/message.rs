//! Chat Message Types
//!
//! Platform-neutral rich messages. Field names follow the Discord embed
//! object so they serialize straight into REST payloads.

use serde::{Deserialize, Serialize};

pub const COLOR_GREEN: u32 = 0x00ff00;
pub const COLOR_RED: u32 = 0xff0000;

/// A single embed field
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub inline: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbedFooter {
    pub text: String,
}

/// Rich message card
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Embed {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<u32>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<EmbedField>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub footer: Option<EmbedFooter>,

    /// RFC 3339
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

impl Embed {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Default::default()
        }
    }

    pub const fn color(mut self, color: u32) -> Self {
        self.color = Some(color);
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn field(mut self, name: impl Into<String>, value: impl Into<String>, inline: bool) -> Self {
        self.fields.push(EmbedField {
            name: name.into(),
            value: value.into(),
            inline,
        });
        self
    }

    pub fn footer(mut self, text: impl Into<String>) -> Self {
        self.footer = Some(EmbedFooter { text: text.into() });
        self
    }

    pub fn timestamp(mut self, at: chrono::DateTime<chrono::Utc>) -> Self {
        self.timestamp = Some(at.to_rfc3339());
        self
    }
}

/// Answer to a user command
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Reply {
    pub content: Option<String>,
    pub embeds: Vec<Embed>,

    /// Only visible to the invoking user
    pub ephemeral: bool,

    /// Sent as a follow-up message after the primary reply
    pub followups: Vec<Reply>,
}

impl Reply {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Default::default()
        }
    }

    pub fn embed(embed: Embed) -> Self {
        Self {
            embeds: vec![embed],
            ..Default::default()
        }
    }

    pub const fn ephemeral(mut self) -> Self {
        self.ephemeral = true;
        self
    }

    pub fn with_followup(mut self, followup: Self) -> Self {
        self.followups.push(followup);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embed_serializes_like_discord() {
        let embed = Embed::new("BTC Price Info")
            .color(COLOR_GREEN)
            .field("💰 Price", "$97500", true);

        let json = serde_json::to_value(&embed).unwrap();
        assert_eq!(json["title"], "BTC Price Info");
        assert_eq!(json["color"], 0x00ff00);
        assert_eq!(json["fields"][0]["inline"], true);
        assert!(json.get("footer").is_none());
    }
}
