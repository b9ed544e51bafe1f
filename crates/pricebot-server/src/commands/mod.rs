//! Slash commands
//!
//! Parsing of interaction data into [`Command`], the definitions registered
//! with Discord, execution against the services and reply rendering.

pub mod definitions;
pub mod handlers;
mod render;

use std::str::FromStr;

use pricebot_core::svckit::{AssetFilter, InvestmentKind};
use pricebot_core::{BotError, Result};
use rust_decimal::Decimal;
use serde_json::Value;

use crate::interaction::CommandData;

pub use handlers::{autocomplete, execute, is_private};

/// Commands whose coin option offers autocomplete
pub const AUTOCOMPLETE_COMMANDS: &[&str] = &[
    "price",
    "add",
    "remove",
    "setalert",
    "removealert",
    "setinvest",
    "removeinvest",
];

/// Who invoked a command and where
#[derive(Clone, Debug, Default)]
pub struct Invocation {
    pub user_id: String,
    pub username: String,
    pub guild_id: String,
    pub channel_id: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    Price { coin: String },
    Add { coin: String },
    Remove { coin: String },
    SetAlert {
        coin: String,
        upper: Option<Decimal>,
        lower: Option<Decimal>,
    },
    RemoveAlert { coin: String },
    ListAlerts,
    SetInvest {
        coin: String,
        amount: Decimal,
        buy_price: Decimal,
        kind: InvestmentKind,
        participants: Vec<String>,
    },
    RemoveInvest { coin: String },
    Assets { filter: AssetFilter },
    Invite,
    Restart,
    Clear,
    Help,
}

impl Command {
    pub fn parse(data: &CommandData) -> Result<Self> {
        let command = match data.name.as_str() {
            "price" => Self::Price { coin: coin_option(data)? },
            "add" => Self::Add { coin: coin_option(data)? },
            "remove" => Self::Remove { coin: coin_option(data)? },
            "setalert" => Self::SetAlert {
                coin: coin_option(data)?,
                upper: data.option("upper").and_then(decimal),
                lower: data.option("lower").and_then(decimal),
            },
            "removealert" => Self::RemoveAlert { coin: coin_option(data)? },
            "listalerts" => Self::ListAlerts,
            "setinvest" => Self::SetInvest {
                coin: coin_option(data)?,
                amount: number_option(data, "amount")?,
                buy_price: number_option(data, "buy_price")?,
                kind: match data.option("type").and_then(Value::as_str) {
                    Some(kind) => InvestmentKind::from_str(kind)?,
                    None => InvestmentKind::Personal,
                },
                participants: data
                    .option("participants")
                    .and_then(Value::as_str)
                    .map(parse_mentions)
                    .unwrap_or_default(),
            },
            "removeinvest" => Self::RemoveInvest { coin: coin_option(data)? },
            "assets" => Self::Assets {
                filter: AssetFilter::from_str(data.option("filter").and_then(Value::as_str).unwrap_or_default())?,
            },
            "invite" => Self::Invite,
            "restart" => Self::Restart,
            "clear" => Self::Clear,
            "help" => Self::Help,
            other => return Err(BotError::Validation(format!("Unknown command '/{other}'"))),
        };
        Ok(command)
    }

    /// Commands that call out to price providers or Discord answer with a deferred response
    pub const fn is_deferred(&self) -> bool {
        matches!(
            self,
            Self::Price { .. }
                | Self::Add { .. }
                | Self::SetAlert { .. }
                | Self::Assets { .. }
                | Self::Restart
                | Self::Clear
        )
    }

    pub const fn name(&self) -> &'static str {
        match self {
            Self::Price { .. } => "price",
            Self::Add { .. } => "add",
            Self::Remove { .. } => "remove",
            Self::SetAlert { .. } => "setalert",
            Self::RemoveAlert { .. } => "removealert",
            Self::ListAlerts => "listalerts",
            Self::SetInvest { .. } => "setinvest",
            Self::RemoveInvest { .. } => "removeinvest",
            Self::Assets { .. } => "assets",
            Self::Invite => "invite",
            Self::Restart => "restart",
            Self::Clear => "clear",
            Self::Help => "help",
        }
    }
}

fn coin_option(data: &CommandData) -> Result<String> {
    data.option("crypto")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .ok_or_else(|| BotError::Validation("Please choose a cryptocurrency".into()))
}

fn number_option(data: &CommandData, name: &str) -> Result<Decimal> {
    data.option(name)
        .and_then(decimal)
        .ok_or_else(|| BotError::Validation(format!("'{name}' must be a number")))
}

/// Number options arrive as JSON numbers; their text form keeps the digits the user typed
fn decimal(value: &Value) -> Option<Decimal> {
    let text = match value {
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.trim().to_string(),
        _ => return None,
    };
    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .ok()
}

/// "<@123> <@!456>" → ["123", "456"], anything that is not a user mention is ignored
pub fn parse_mentions(raw: &str) -> Vec<String> {
    let mut ids: Vec<String> = Vec::new();
    for token in raw.split(|c: char| c.is_whitespace() || c == ',') {
        let id = token.trim_matches(|c: char| matches!(c, '<' | '@' | '!' | '>'));
        if !id.is_empty() && id.chars().all(|c| c.is_ascii_digit()) && !ids.iter().any(|known| known == id) {
            ids.push(id.to_string());
        }
    }
    ids
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn data(value: Value) -> CommandData {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_parse_setalert() {
        let command = Command::parse(&data(json!({
            "name": "setalert",
            "options": [
                {"name": "crypto", "value": "bitcoin"},
                {"name": "upper", "value": 50000},
                {"name": "lower", "value": 40000.5}
            ]
        })))
        .unwrap();

        assert_eq!(
            command,
            Command::SetAlert {
                coin: "bitcoin".into(),
                upper: Some(dec!(50000)),
                lower: Some(dec!(40000.5)),
            }
        );
        assert!(command.is_deferred());
    }

    #[test]
    fn test_parse_setinvest() {
        let command = Command::parse(&data(json!({
            "name": "setinvest",
            "options": [
                {"name": "crypto", "value": "ethereum"},
                {"name": "amount", "value": 0.1},
                {"name": "buy_price", "value": 3000},
                {"name": "type", "value": "Collective"},
                {"name": "participants", "value": "<@111> <@!222>, <@111> bob"}
            ]
        })))
        .unwrap();

        assert_eq!(
            command,
            Command::SetInvest {
                coin: "ethereum".into(),
                amount: dec!(0.1),
                buy_price: dec!(3000),
                kind: InvestmentKind::Collective,
                participants: vec!["111".into(), "222".into()],
            }
        );
        assert!(!command.is_deferred());
    }

    #[test]
    fn test_parse_rejects_missing_options() {
        let err = Command::parse(&data(json!({ "name": "price", "options": [] }))).unwrap_err();
        assert!(matches!(err, BotError::Validation(_)));

        let err = Command::parse(&data(json!({
            "name": "setinvest",
            "options": [{"name": "crypto", "value": "bitcoin"}, {"name": "amount", "value": "lots"}]
        })))
        .unwrap_err();
        assert!(matches!(err, BotError::Validation(_)));

        assert!(Command::parse(&data(json!({ "name": "chart" }))).is_err());
    }

    #[test]
    fn test_assets_filter_defaults_to_all() {
        let command = Command::parse(&data(json!({ "name": "assets" }))).unwrap();
        assert_eq!(command, Command::Assets { filter: AssetFilter::All });
    }

    #[test]
    fn test_parse_mentions() {
        assert_eq!(parse_mentions("<@1> <@!2>"), vec!["1", "2"]);
        assert!(parse_mentions("@everyone someone").is_empty());
    }
}
