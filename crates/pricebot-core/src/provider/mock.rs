//! Mock Price Provider
//!
//! For testing and offline runs. Prices can be changed between calls to drive
//! alert and nickname scenarios.

use std::collections::HashMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use super::PriceProvider;
use crate::error::{BotError, Result};
use crate::model::{Coin, PriceRecord};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Behavior {
    Quote,
    RateLimited,
    Unavailable,
}

/// Mock provider with settable prices
pub struct MockPriceProvider {
    name: String,
    behavior: RwLock<Behavior>,
    prices: RwLock<HashMap<String, Decimal>>,
    calls: AtomicUsize,
}

impl MockPriceProvider {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            behavior: RwLock::new(Behavior::Quote),
            prices: RwLock::new(HashMap::new()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_price(self, coin_id: &str, price: Decimal) -> Self {
        self.set_price(coin_id, price);
        self
    }

    /// Every call answers with `RateLimited`
    pub fn rate_limited(self) -> Self {
        self.set_behavior(Behavior::RateLimited);
        self
    }

    /// Every call answers with a provider error
    pub fn unavailable(self) -> Self {
        self.set_behavior(Behavior::Unavailable);
        self
    }

    pub fn set_price(&self, coin_id: &str, price: Decimal) {
        if let Ok(mut prices) = self.prices.write() {
            prices.insert(coin_id.to_lowercase(), price);
        }
    }

    /// Switch between failing and answering at runtime
    pub fn set_rate_limited(&self, limited: bool) {
        self.set_behavior(if limited { Behavior::RateLimited } else { Behavior::Quote });
    }

    fn set_behavior(&self, behavior: Behavior) {
        if let Ok(mut current) = self.behavior.write() {
            *current = behavior;
        }
    }

    /// Number of fetches seen so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PriceProvider for MockPriceProvider {
    async fn fetch(&self, coin: &Coin) -> Result<PriceRecord> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let behavior = self.behavior.read().map(|b| *b).unwrap_or(Behavior::Quote);
        match behavior {
            Behavior::RateLimited => return Err(BotError::RateLimited(self.name.clone())),
            Behavior::Unavailable => {
                return Err(BotError::Provider(format!("{} returned status 503", self.name)));
            }
            Behavior::Quote => {}
        }

        let price = self
            .prices
            .read()
            .ok()
            .and_then(|prices| prices.get(&coin.id).copied())
            .ok_or_else(|| BotError::NotFound(format!("cryptocurrency '{}'", coin.id)))?;

        Ok(PriceRecord::new(price, self.name.clone())
            .with_change(dec!(2.5))
            .with_market_cap(price * dec!(19_000_000))
            .with_volume(dec!(25_000_000_000)))
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_provider() {
        let provider = MockPriceProvider::new("Mock").with_price("bitcoin", dec!(97500));

        let record = provider.fetch(&Coin::new("bitcoin", "BTC")).await.unwrap();
        assert_eq!(record.price, dec!(97500));
        assert_eq!(record.source, "Mock");

        provider.set_rate_limited(true);
        let err = provider.fetch(&Coin::new("bitcoin", "BTC")).await.unwrap_err();
        assert!(err.is_rate_limited());
        assert_eq!(provider.calls(), 2);
    }

    #[tokio::test]
    async fn test_unknown_coin() {
        let provider = MockPriceProvider::new("Mock");
        let result = provider.fetch(&Coin::new("notreal", "NOTREAL")).await;
        assert!(matches!(result, Err(BotError::NotFound(_))));
    }
}
