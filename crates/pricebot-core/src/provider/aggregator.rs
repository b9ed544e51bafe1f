//! Fallback Price Aggregator
//!
//! Queries providers in a fixed order. Only a rate-limited answer moves on to
//! the next provider; any other failure is returned as is.

use std::sync::Arc;

use async_trait::async_trait;

use super::PriceProvider;
use crate::error::{BotError, Result};
use crate::model::{Coin, PriceRecord};

pub struct PriceAggregator {
    providers: Vec<Arc<dyn PriceProvider>>,
}

impl PriceAggregator {
    /// Providers are tried in the given order
    pub fn new(providers: Vec<Arc<dyn PriceProvider>>) -> Self {
        Self { providers }
    }

    pub fn provider_names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name()).collect()
    }
}

#[async_trait]
impl PriceProvider for PriceAggregator {
    async fn fetch(&self, coin: &Coin) -> Result<PriceRecord> {
        let mut last_error = None;

        for provider in &self.providers {
            match provider.fetch(coin).await {
                Ok(record) => {
                    tracing::debug!(coin = %coin.id, provider = provider.name(), price = %record.price, "Fetched price");
                    return Ok(record);
                }
                Err(e) if e.is_rate_limited() => {
                    tracing::warn!(coin = %coin.id, provider = provider.name(), "Rate limited, trying next provider");
                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_error.unwrap_or_else(|| BotError::Config("no price providers configured".into())))
    }

    fn name(&self) -> &str {
        "Aggregator"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::MockPriceProvider;
    use rust_decimal_macros::dec;

    fn btc() -> Coin {
        Coin::new("bitcoin", "BTC")
    }

    #[tokio::test]
    async fn test_first_provider_wins() {
        let a = Arc::new(MockPriceProvider::new("A").with_price("bitcoin", dec!(97000)));
        let b = Arc::new(MockPriceProvider::new("B").with_price("bitcoin", dec!(1)));
        let aggregator = PriceAggregator::new(vec![a.clone(), b.clone()]);

        let record = aggregator.fetch(&btc()).await.unwrap();
        assert_eq!(record.price, dec!(97000));
        assert_eq!(b.calls(), 0);
    }

    #[tokio::test]
    async fn test_rate_limit_falls_back_and_stops_at_success() {
        let a = Arc::new(MockPriceProvider::new("A").rate_limited());
        let b = Arc::new(MockPriceProvider::new("B").with_price("bitcoin", dec!(96500)));
        let c = Arc::new(MockPriceProvider::new("C").with_price("bitcoin", dec!(1)));
        let aggregator = PriceAggregator::new(vec![a.clone(), b.clone(), c.clone()]);

        let record = aggregator.fetch(&btc()).await.unwrap();
        assert_eq!(record.price, dec!(96500));
        assert_eq!(record.source, "B");
        assert_eq!(a.calls(), 1);
        assert_eq!(b.calls(), 1);
        assert_eq!(c.calls(), 0);
    }

    #[tokio::test]
    async fn test_other_errors_short_circuit() {
        let a = Arc::new(MockPriceProvider::new("A"));
        let b = Arc::new(MockPriceProvider::new("B").with_price("bitcoin", dec!(96500)));
        let aggregator = PriceAggregator::new(vec![a, b.clone()]);

        let err = aggregator.fetch(&btc()).await.unwrap_err();
        assert!(matches!(err, BotError::NotFound(_)));
        assert_eq!(b.calls(), 0);
    }

    #[tokio::test]
    async fn test_all_rate_limited_surfaces_last_error() {
        let aggregator = PriceAggregator::new(vec![
            Arc::new(MockPriceProvider::new("A").rate_limited()),
            Arc::new(MockPriceProvider::new("B").rate_limited()),
            Arc::new(MockPriceProvider::new("C").rate_limited()),
        ]);

        match aggregator.fetch(&btc()).await {
            Err(BotError::RateLimited(provider)) => assert_eq!(provider, "C"),
            other => panic!("expected rate limit from C, got {other:?}"),
        }
    }
}
