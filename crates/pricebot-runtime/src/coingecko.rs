//! CoinGecko Price Provider
//!
//! Primary source. Uses the public `simple/price` endpoint keyed by the
//! canonical coin id.

use std::collections::HashMap;

use async_trait::async_trait;
use pricebot_core::model::decimal_from_f64;
use pricebot_core::{BotError, Coin, PriceProvider, PriceRecord, Result};
use serde::Deserialize;

use crate::http;

pub const PROVIDER_NAME: &str = "CoinGecko";

#[derive(Clone, Debug)]
pub struct CoinGeckoConfig {
    pub base_url: String,

    /// Optional demo/pro key, sent as `x-cg-demo-api-key`
    pub api_key: Option<String>,

    pub timeout_secs: u64,
}

impl Default for CoinGeckoConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.coingecko.com/api/v3".into(),
            api_key: None,
            timeout_secs: 10,
        }
    }
}

impl CoinGeckoConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            base_url: std::env::var("COINGECKO_BASE_URL").unwrap_or(defaults.base_url),
            api_key: std::env::var("COINGECKO_API_KEY").ok().filter(|k| !k.is_empty()),
            ..defaults
        }
    }
}

#[derive(Debug, Deserialize)]
struct SimplePrice {
    usd: f64,
    #[serde(default)]
    usd_market_cap: Option<f64>,
    #[serde(default)]
    usd_24h_vol: Option<f64>,
    #[serde(default)]
    usd_24h_change: Option<f64>,
}

pub struct CoinGeckoProvider {
    client: reqwest::Client,
    config: CoinGeckoConfig,
}

impl CoinGeckoProvider {
    pub fn from_config(config: CoinGeckoConfig) -> Result<Self> {
        Ok(Self {
            client: http::client(config.timeout_secs)?,
            config,
        })
    }

    pub fn from_env() -> Result<Self> {
        Self::from_config(CoinGeckoConfig::from_env())
    }
}

fn parse_simple_price(body: &str, coin_id: &str) -> Result<PriceRecord> {
    let mut quotes: HashMap<String, SimplePrice> = serde_json::from_str(body)?;
    let quote = quotes
        .remove(coin_id)
        .ok_or_else(|| BotError::NotFound(format!("cryptocurrency '{coin_id}'")))?;

    Ok(PriceRecord::new(decimal_from_f64(quote.usd), PROVIDER_NAME)
        .with_change(decimal_from_f64(quote.usd_24h_change.unwrap_or_default()))
        .with_market_cap(decimal_from_f64(quote.usd_market_cap.unwrap_or_default()))
        .with_volume(decimal_from_f64(quote.usd_24h_vol.unwrap_or_default())))
}

#[async_trait]
impl PriceProvider for CoinGeckoProvider {
    async fn fetch(&self, coin: &Coin) -> Result<PriceRecord> {
        let mut request = self
            .client
            .get(format!("{}/simple/price", self.config.base_url))
            .query(&[
                ("ids", coin.id.as_str()),
                ("vs_currencies", "usd"),
                ("include_market_cap", "true"),
                ("include_24hr_vol", "true"),
                ("include_24hr_change", "true"),
            ]);
        if let Some(key) = &self.config.api_key {
            request = request.header("x-cg-demo-api-key", key);
        }

        let response = http::check_status(request.send().await?, PROVIDER_NAME)?;
        let body = response.text().await?;
        parse_simple_price(&body, &coin.id)
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
    fn test_parse_simple_price() {
        let body = r#"{"bitcoin":{"usd":97500.5,"usd_market_cap":1930000000000.0,"usd_24h_vol":25000000000.0,"usd_24h_change":-1.25}}"#;
        let record = parse_simple_price(body, "bitcoin").unwrap();

        assert_eq!(record.price, dec!(97500.5));
        assert_eq!(record.change_24h, dec!(-1.25));
        assert_eq!(record.volume_24h, dec!(25000000000));
        assert_eq!(record.source, "CoinGecko");
    }

    #[test]
    fn test_unknown_coin_is_not_found() {
        let result = parse_simple_price("{}", "notacoin");
        assert!(matches!(result, Err(BotError::NotFound(_))));
    }

    #[test]
    fn test_missing_optional_fields() {
        let record = parse_simple_price(r#"{"tether":{"usd":1.0}}"#, "tether").unwrap();
        assert_eq!(record.price, dec!(1));
        assert!(record.market_cap.is_zero());
    }
}
