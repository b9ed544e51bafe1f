//! Domain Models
//!
//! Core data types shared by the price sources, the bot pool, alerts and the ledger.
//! Uses `rust_decimal` for all monetary values - never use f64 for money!

use chrono::{DateTime, Utc};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A coin as the bot knows it
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Coin {
    /// Canonical (CoinGecko) identifier, e.g. "bitcoin"
    pub id: String,

    /// Ticker symbol, e.g. "BTC"
    pub symbol: String,
}

impl Coin {
    pub fn new(id: impl Into<String>, symbol: impl Into<String>) -> Self {
        Self {
            id: id.into().to_lowercase(),
            symbol: symbol.into().to_uppercase(),
        }
    }

    /// "BTC (Bitcoin)", the label used in autocomplete choices
    pub fn display_name(&self) -> String {
        format!("{} ({})", self.symbol, title_case(&self.id))
    }
}

impl std::fmt::Display for Coin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.symbol)
    }
}

/// Point-in-time price snapshot, normalized across providers
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PriceRecord {
    /// Price in USD
    pub price: Decimal,

    /// 24-hour change in percent
    pub change_24h: Decimal,

    /// Market capitalization in USD (zero when the provider has none)
    pub market_cap: Decimal,

    /// 24-hour traded volume in USD
    pub volume_24h: Decimal,

    /// Provider that answered
    pub source: String,

    pub fetched_at: DateTime<Utc>,
}

impl PriceRecord {
    pub fn new(price: Decimal, source: impl Into<String>) -> Self {
        Self {
            price,
            change_24h: Decimal::ZERO,
            market_cap: Decimal::ZERO,
            volume_24h: Decimal::ZERO,
            source: source.into(),
            fetched_at: Utc::now(),
        }
    }

    pub const fn with_change(mut self, change_24h: Decimal) -> Self {
        self.change_24h = change_24h;
        self
    }

    pub const fn with_market_cap(mut self, market_cap: Decimal) -> Self {
        self.market_cap = market_cap;
        self
    }

    pub const fn with_volume(mut self, volume_24h: Decimal) -> Self {
        self.volume_24h = volume_24h;
        self
    }
}

/// Convert a provider float into a decimal, NaN and infinities become zero
pub fn decimal_from_f64(value: f64) -> Decimal {
    Decimal::from_f64(value).unwrap_or_default()
}

fn title_case(id: &str) -> String {
    id.split('-')
        .map(|word| {
            let mut chars = word.chars();
            chars.next().map_or_else(String::new, |first| {
                first.to_uppercase().collect::<String>() + chars.as_str()
            })
        })
        .collect::<Vec<_>>()
        .join("-")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_coin_normalizes_case() {
        let coin = Coin::new("Bitcoin", "btc");
        assert_eq!(coin.id, "bitcoin");
        assert_eq!(coin.symbol, "BTC");
        assert_eq!(coin.display_name(), "BTC (Bitcoin)");
        assert_eq!(Coin::new("shiba-inu", "shib").display_name(), "SHIB (Shiba-Inu)");
    }

    #[test]
    fn test_decimal_from_f64() {
        assert_eq!(decimal_from_f64(1.5), dec!(1.5));
        assert_eq!(decimal_from_f64(f64::NAN), Decimal::ZERO);
    }
}
