//! Price Providers
//!
//! Abstractions over upstream price APIs. The HTTP implementations live in
//! `pricebot-runtime`; this module holds the trait, the fallback aggregator
//! and an in-memory provider for tests.

mod aggregator;
mod mock;

pub use aggregator::PriceAggregator;
pub use mock::MockPriceProvider;

use async_trait::async_trait;

use crate::error::Result;
use crate::model::{Coin, PriceRecord};

/// Price provider trait (Strategy pattern)
///
/// Implement this for each upstream: CoinGecko, CoinMarketCap, Binance, etc.
#[async_trait]
pub trait PriceProvider: Send + Sync {
    /// Fetch the current price record for a coin
    async fn fetch(&self, coin: &Coin) -> Result<PriceRecord>;

    /// Provider name, shown in logs and embed footers
    fn name(&self) -> &str;
}
