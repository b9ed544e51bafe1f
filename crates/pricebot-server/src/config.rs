//! Server Settings
//!
//! Everything is read from the environment (after `.env` is loaded).

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use pricebot_core::BotCredential;
use pricebot_core::svckit::{DEFAULT_ALERT_COOLDOWN, PollSchedule};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),

    #[error("{name} has an invalid value '{value}'")]
    Invalid { name: &'static str, value: String },

    #[error("BOT_TOKENS has {tokens} entries but BOT_CLIENT_IDS has {client_ids}")]
    CredentialMismatch { tokens: usize, client_ids: usize },
}

#[derive(Clone)]
pub struct Settings {
    /// Main bot: answers commands and posts alerts
    pub discord_token: String,
    pub application_id: String,

    /// Hex-encoded Ed25519 key used to verify inbound interactions
    pub public_key: String,

    /// Satellite bots whose nicknames show prices
    pub credentials: Vec<BotCredential>,

    pub portfolio_file: PathBuf,
    pub bind_addr: String,
    pub alert_cooldown: Duration,
    pub schedule: PollSchedule,
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or(ConfigError::Missing(name))
}

fn parsed<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match std::env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => raw.trim().parse().map_err(|_| ConfigError::Invalid {
            name,
            value: raw,
        }),
        _ => Ok(default),
    }
}

fn secs(name: &'static str, default: u64) -> Result<Duration, ConfigError> {
    parsed(name, default).map(Duration::from_secs)
}

/// Comma separated, blanks dropped
fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Pair tokens with client ids positionally
pub fn pair_credentials(tokens: &str, client_ids: &str) -> Result<Vec<BotCredential>, ConfigError> {
    let tokens = split_list(tokens);
    let client_ids = split_list(client_ids);
    if tokens.len() != client_ids.len() {
        return Err(ConfigError::CredentialMismatch {
            tokens: tokens.len(),
            client_ids: client_ids.len(),
        });
    }

    Ok(tokens
        .into_iter()
        .zip(client_ids)
        .map(|(token, client_id)| BotCredential::new(token, client_id))
        .collect())
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        let credentials = pair_credentials(
            &std::env::var("BOT_TOKENS").unwrap_or_default(),
            &std::env::var("BOT_CLIENT_IDS").unwrap_or_default(),
        )?;

        let defaults = PollSchedule::default();
        let concurrency: usize = parsed("POLL_CONCURRENCY", defaults.concurrency)?;
        let schedule = PollSchedule {
            fast_interval: secs("POLL_FAST_SECS", defaults.fast_interval.as_secs())?,
            warmup: secs("POLL_WARMUP_SECS", defaults.warmup.as_secs())?,
            steady_interval: secs("POLL_STEADY_SECS", defaults.steady_interval.as_secs())?,
            min_refresh_spacing: secs("MIN_REFRESH_SECS", defaults.min_refresh_spacing.as_secs())?,
            concurrency: concurrency.max(1),
        };
        if schedule.fast_interval.is_zero() || schedule.steady_interval.is_zero() {
            return Err(ConfigError::Invalid {
                name: "POLL_FAST_SECS/POLL_STEADY_SECS",
                value: "0".into(),
            });
        }

        Ok(Self {
            discord_token: required("DISCORD_TOKEN")?,
            application_id: required("DISCORD_APPLICATION_ID")?,
            public_key: required("DISCORD_PUBLIC_KEY")?,
            credentials,
            portfolio_file: std::env::var("PORTFOLIO_FILE")
                .unwrap_or_else(|_| "portfolios.json".into())
                .into(),
            bind_addr: std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into()),
            alert_cooldown: secs("ALERT_COOLDOWN_SECS", DEFAULT_ALERT_COOLDOWN.as_secs())?,
            schedule,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pair_credentials() {
        let credentials = pair_credentials("tok-a, tok-b,", "111,222").unwrap();
        assert_eq!(credentials.len(), 2);
        assert_eq!(credentials[1].token, "tok-b");
        assert_eq!(credentials[1].client_id, "222");

        assert!(pair_credentials("", "").unwrap().is_empty());
    }

    #[test]
    fn test_credential_count_mismatch() {
        let err = pair_credentials("tok-a,tok-b", "111").unwrap_err();
        assert!(matches!(err, ConfigError::CredentialMismatch { tokens: 2, client_ids: 1 }));
    }
}
