//! Error Types for pricebot

use thiserror::Error;

pub type Result<T> = std::result::Result<T, BotError>;

#[derive(Error, Debug)]
pub enum BotError {
    /// Unknown coin, investment, alert or tracked symbol
    #[error("Not found: {0}")]
    NotFound(String),

    /// Upstream answered HTTP 429
    #[error("Rate limited by {0}")]
    RateLimited(String),

    /// Every bot credential is leased
    #[error("No free bot credential left in the pool")]
    Exhausted,

    #[error("Already tracking {0}")]
    AlreadyTracked(String),

    #[error("Validation error: {0}")]
    Validation(String),

    /// Notification or nickname update failed, retried on the next poll tick
    #[error("Send failed: {0}")]
    TransientSend(String),

    /// Upstream answered with an unexpected status or body
    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl BotError {
    /// Rate limiting is the only category that moves the aggregator on to the next provider
    pub const fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited(_))
    }

    /// Check if the next poll tick may succeed where this one failed
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RateLimited(_) | Self::TransientSend(_) | Self::Network(_)
        )
    }

    /// Convert to a message suitable for a chat reply
    pub fn user_message(&self) -> String {
        match self {
            Self::NotFound(what) => format!("❌ {what} not found"),
            Self::RateLimited(_) => {
                "⏳ Price providers are rate limiting us, please try again later.".into()
            }
            Self::Exhausted => {
                "❌ No available bot tokens. Please remove some existing price bots first.".into()
            }
            Self::AlreadyTracked(symbol) => format!("❌ Already monitoring {symbol}"),
            Self::Validation(msg) => format!("⚠️ {msg}"),
            Self::TransientSend(_) => "❌ Could not reach Discord, please try again.".into(),
            Self::Provider(msg) => format!("❌ Price provider error: {msg}"),
            _ => "❌ An unexpected error occurred.".into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_rate_limit_triggers_fallback() {
        assert!(BotError::RateLimited("CoinGecko".into()).is_rate_limited());
        assert!(!BotError::NotFound("bitcoin".into()).is_rate_limited());
        assert!(!BotError::Provider("status 500".into()).is_rate_limited());
    }

    #[test]
    fn test_user_message() {
        let msg = BotError::AlreadyTracked("BTC".into()).user_message();
        assert_eq!(msg, "❌ Already monitoring BTC");

        let msg = BotError::Validation("Please set at least one target".into()).user_message();
        assert!(msg.starts_with("⚠️"));
    }
}
