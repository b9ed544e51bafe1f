//! Application command definitions, bulk-registered at startup

use serde_json::{Value, json};

mod option_type {
    pub const STRING: u8 = 3;
    pub const NUMBER: u8 = 10;
}

fn crypto_option(description: &str) -> Value {
    json!({
        "type": option_type::STRING,
        "name": "crypto",
        "description": description,
        "required": true,
        "autocomplete": true,
    })
}

fn price_option(name: &str, description: &str, required: bool) -> Value {
    json!({
        "type": option_type::NUMBER,
        "name": name,
        "description": description,
        "required": required,
        "min_value": 0,
    })
}

fn command(name: &str, description: &str, options: Vec<Value>) -> Value {
    json!({
        "name": name,
        "description": description,
        "type": 1,
        "options": options,
    })
}

/// Every slash command the bot answers
pub fn all() -> Value {
    Value::Array(vec![
        command(
            "price",
            "Get cryptocurrency price information",
            vec![crypto_option("Cryptocurrency name (e.g., bitcoin, ethereum)")],
        ),
        command(
            "add",
            "Add a new price display bot",
            vec![crypto_option("Cryptocurrency to track (e.g., bitcoin)")],
        ),
        command(
            "remove",
            "Remove a price display bot",
            vec![crypto_option("Cryptocurrency to stop tracking")],
        ),
        command(
            "setalert",
            "Set price alert for a cryptocurrency",
            vec![
                crypto_option("Cryptocurrency name (e.g., bitcoin, ethereum)"),
                price_option("upper", "Alert when price goes above this value (e.g., 50000)", false),
                price_option("lower", "Alert when price goes below this value (e.g., 40000)", false),
            ],
        ),
        command(
            "removealert",
            "Remove price alert for a cryptocurrency",
            vec![crypto_option("Cryptocurrency to remove alert for")],
        ),
        command("listalerts", "List all active price alerts", vec![]),
        command(
            "setinvest",
            "Record a purchase in your portfolio",
            vec![
                crypto_option("Cryptocurrency you bought"),
                price_option("amount", "Amount of coins bought", true),
                price_option("buy_price", "Price paid per coin in USD", true),
                json!({
                    "type": option_type::STRING,
                    "name": "type",
                    "description": "Personal or collective investment",
                    "required": false,
                    "choices": [
                        { "name": "Personal", "value": "personal" },
                        { "name": "Collective", "value": "collective" },
                    ],
                }),
                json!({
                    "type": option_type::STRING,
                    "name": "participants",
                    "description": "Mention the other participants of a collective investment",
                    "required": false,
                }),
            ],
        ),
        command(
            "removeinvest",
            "Remove an investment from your portfolio",
            vec![crypto_option("Cryptocurrency to remove")],
        ),
        command(
            "assets",
            "Show your portfolio",
            vec![json!({
                "type": option_type::STRING,
                "name": "filter",
                "description": "Which investments to show",
                "required": false,
                "choices": [
                    { "name": "Personal", "value": "personal" },
                    { "name": "Collective", "value": "collective" },
                    { "name": "All", "value": "all" },
                ],
            })],
        ),
        command("invite", "Get invite links for available price bots", vec![]),
        command("restart", "Reconnect every price display bot", vec![]),
        command("clear", "Remove every price display bot", vec![]),
        command("help", "Show available commands", vec![]),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::AUTOCOMPLETE_COMMANDS;

    #[test]
    fn test_every_command_is_defined_once() {
        let commands = all();
        let names: Vec<&str> = commands
            .as_array()
            .unwrap()
            .iter()
            .map(|c| c["name"].as_str().unwrap())
            .collect();

        assert_eq!(names.len(), 13);
        for name in ["price", "add", "remove", "setalert", "removealert", "listalerts", "setinvest", "removeinvest", "assets", "invite", "restart", "clear", "help"] {
            assert_eq!(names.iter().filter(|n| **n == name).count(), 1, "{name}");
        }
    }

    #[test]
    fn test_autocomplete_flags_match() {
        let commands = all();
        for command in commands.as_array().unwrap() {
            let name = command["name"].as_str().unwrap();
            let autocompletes = command["options"]
                .as_array()
                .unwrap()
                .iter()
                .any(|o| o["autocomplete"] == true);
            assert_eq!(autocompletes, AUTOCOMPLETE_COMMANDS.contains(&name), "{name}");
        }
    }
}
