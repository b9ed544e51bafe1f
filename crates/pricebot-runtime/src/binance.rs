//! Binance Price Provider
//!
//! Last fallback. Reads the 24h ticker of the coin's USDT pair. Binance has
//! no market cap, and volume is reported in USDT.

use async_trait::async_trait;
use pricebot_core::catalog;
use pricebot_core::{BotError, Coin, PriceProvider, PriceRecord, Result};
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::http;

pub const PROVIDER_NAME: &str = "Binance";

#[derive(Clone, Debug)]
pub struct BinanceConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for BinanceConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.binance.com".into(),
            timeout_secs: 10,
        }
    }
}

impl BinanceConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            base_url: std::env::var("BINANCE_BASE_URL").unwrap_or(defaults.base_url),
            ..defaults
        }
    }
}

/// Numbers arrive as strings
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Ticker24h {
    last_price: Decimal,
    price_change_percent: Decimal,
    quote_volume: Decimal,
}

pub struct BinanceProvider {
    client: reqwest::Client,
    config: BinanceConfig,
}

impl BinanceProvider {
    pub fn from_config(config: BinanceConfig) -> Result<Self> {
        Ok(Self {
            client: http::client(config.timeout_secs)?,
            config,
        })
    }

    pub fn from_env() -> Result<Self> {
        Self::from_config(BinanceConfig::from_env())
    }
}

fn parse_ticker(body: &str) -> Result<PriceRecord> {
    let ticker: Ticker24h = serde_json::from_str(body)?;
    Ok(PriceRecord::new(ticker.last_price, PROVIDER_NAME)
        .with_change(ticker.price_change_percent)
        .with_volume(ticker.quote_volume))
}

#[async_trait]
impl PriceProvider for BinanceProvider {
    async fn fetch(&self, coin: &Coin) -> Result<PriceRecord> {
        let symbol = catalog::binance_symbol(&coin.id).ok_or_else(|| {
            BotError::NotFound(format!("{} on Binance", coin.symbol))
        })?;

        let response = self
            .client
            .get(format!("{}/api/v3/ticker/24hr", self.config.base_url))
            .query(&[("symbol", symbol)])
            .send()
            .await?;

        let body = http::check_status(response, PROVIDER_NAME)?.text().await?;
        parse_ticker(&body)
    }

    fn name(&self) -> &str {
        PROVIDER_NAME
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_parse_ticker() {
        let body = r#"{
            "symbol": "BTCUSDT", "lastPrice": "97123.45000000",
            "priceChangePercent": "-0.812", "volume": "18000.5",
            "quoteVolume": "1750000000.12"
        }"#;
        let record = parse_ticker(body).unwrap();

        assert_eq!(record.price, dec!(97123.45));
        assert_eq!(record.change_24h, dec!(-0.812));
        assert_eq!(record.volume_24h, dec!(1750000000.12));
        assert!(record.market_cap.is_zero());
    }

    #[tokio::test]
    async fn test_unlisted_coin_is_not_found() {
        let provider = BinanceProvider::from_config(BinanceConfig::default()).unwrap();
        let result = provider.fetch(&Coin::new("not-on-binance", "NOB")).await;
        assert!(matches!(result, Err(BotError::NotFound(_))));
    }
}
