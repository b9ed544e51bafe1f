//! CoinMarketCap Price Provider
//!
//! First fallback. Quotes are looked up by slug through the v2 endpoint and
//! require a Pro API key.

use std::collections::HashMap;

use async_trait::async_trait;
use pricebot_core::catalog;
use pricebot_core::model::decimal_from_f64;
use pricebot_core::{BotError, Coin, PriceProvider, PriceRecord, Result};
use serde::Deserialize;

use crate::http;

pub const PROVIDER_NAME: &str = "CoinMarketCap";

#[derive(Clone, Debug)]
pub struct CoinMarketCapConfig {
    pub base_url: String,
    pub api_key: String,
    pub timeout_secs: u64,
}

impl Default for CoinMarketCapConfig {
    fn default() -> Self {
        Self {
            base_url: "https://pro-api.coinmarketcap.com".into(),
            api_key: String::new(),
            timeout_secs: 10,
        }
    }
}

impl CoinMarketCapConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            base_url: std::env::var("COINMARKETCAP_BASE_URL").unwrap_or(defaults.base_url),
            api_key: std::env::var("COINMARKETCAP_API_KEY").unwrap_or_default(),
            ..defaults
        }
    }
}

#[derive(Debug, Deserialize)]
struct QuotesResponse {
    #[serde(default)]
    data: HashMap<String, CoinQuote>,
}

#[derive(Debug, Deserialize)]
struct CoinQuote {
    quote: UsdQuote,
}

#[derive(Debug, Deserialize)]
struct UsdQuote {
    #[serde(rename = "USD")]
    usd: UsdValues,
}

#[derive(Debug, Deserialize)]
struct UsdValues {
    #[serde(default)]
    price: Option<f64>,
    #[serde(default)]
    percent_change_24h: Option<f64>,
    #[serde(default)]
    market_cap: Option<f64>,
    #[serde(default)]
    volume_24h: Option<f64>,
}

pub struct CoinMarketCapProvider {
    client: reqwest::Client,
    config: CoinMarketCapConfig,
}

impl CoinMarketCapProvider {
    pub fn from_config(config: CoinMarketCapConfig) -> Result<Self> {
        if config.api_key.is_empty() {
            tracing::warn!("COINMARKETCAP_API_KEY is empty, CoinMarketCap fallback will be rejected upstream");
        }
        Ok(Self {
            client: http::client(config.timeout_secs)?,
            config,
        })
    }

    pub fn from_env() -> Result<Self> {
        Self::from_config(CoinMarketCapConfig::from_env())
    }
}

fn parse_quotes(body: &str, coin_id: &str) -> Result<PriceRecord> {
    let response: QuotesResponse = serde_json::from_str(body)?;
    let values = response
        .data
        .into_values()
        .next()
        .map(|coin| coin.quote.usd)
        .ok_or_else(|| BotError::NotFound(format!("cryptocurrency '{coin_id}'")))?;
    let price = values
        .price
        .ok_or_else(|| BotError::NotFound(format!("price for '{coin_id}'")))?;

    Ok(PriceRecord::new(decimal_from_f64(price), PROVIDER_NAME)
        .with_change(decimal_from_f64(values.percent_change_24h.unwrap_or_default()))
        .with_market_cap(decimal_from_f64(values.market_cap.unwrap_or_default()))
        .with_volume(decimal_from_f64(values.volume_24h.unwrap_or_default())))
}

#[async_trait]
impl PriceProvider for CoinMarketCapProvider {
    async fn fetch(&self, coin: &Coin) -> Result<PriceRecord> {
        let response = self
            .client
            .get(format!("{}/v2/cryptocurrency/quotes/latest", self.config.base_url))
            .query(&[("slug", catalog::cmc_slug(&coin.id))])
            .header("X-CMC_PRO_API_KEY", &self.config.api_key)
            .header("Accept", "application/json")
            .send()
            .await?;

        let body = http::check_status(response, PROVIDER_NAME)?.text().await?;
        parse_quotes(&body, &coin.id)
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
    fn test_parse_quotes() {
        let body = r#"{
            "status": {"error_code": 0},
            "data": {"1": {"id": 1, "slug": "bitcoin", "quote": {"USD": {
                "price": 96500.25, "percent_change_24h": 2.5,
                "market_cap": 1900000000000.0, "volume_24h": 31000000000.0
            }}}}
        }"#;
        let record = parse_quotes(body, "bitcoin").unwrap();

        assert_eq!(record.price, dec!(96500.25));
        assert_eq!(record.change_24h, dec!(2.5));
        assert_eq!(record.market_cap, dec!(1900000000000));
        assert_eq!(record.source, "CoinMarketCap");
    }

    #[test]
    fn test_empty_data_is_not_found() {
        let result = parse_quotes(r#"{"data": {}}"#, "bitcoin");
        assert!(matches!(result, Err(BotError::NotFound(_))));
    }
}
