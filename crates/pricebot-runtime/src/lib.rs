//! # pricebot-runtime
//!
//! Network-backed implementations of the `pricebot-core` traits.
//!
//! ## Price providers (fallback order)
//!
//! 1. **CoinGecko**: `simple/price`, no key required
//! 2. **CoinMarketCap**: `v2/cryptocurrency/quotes/latest`, Pro API key
//! 3. **Binance**: 24h ticker of the USDT pair
//!
//! ## Other integrations
//!
//! - **Santiment**: social sentiment (optional, needs an API key)
//! - **Discord**: REST calls plus gateway sessions for satellite bots
//!
//! ## Usage
//!
//! ```rust,ignore
//! use pricebot_runtime::default_aggregator;
//!
//! let prices = default_aggregator()?;
//! let record = prices.fetch(&Coin::new("bitcoin", "BTC")).await?;
//! ```

mod http;

pub mod binance;
pub mod coingecko;
pub mod coinmarketcap;
pub mod discord;
pub mod santiment;

use std::sync::Arc;

pub use binance::BinanceProvider;
pub use coingecko::CoinGeckoProvider;
pub use coinmarketcap::CoinMarketCapProvider;
pub use discord::{DiscordClient, DiscordConfig};
pub use santiment::SantimentClient;

use pricebot_core::{PriceAggregator, Result};

/// CoinGecko, then CoinMarketCap, then Binance, each configured from the environment
pub fn default_aggregator() -> Result<PriceAggregator> {
    Ok(PriceAggregator::new(vec![
        Arc::new(CoinGeckoProvider::from_env()?),
        Arc::new(CoinMarketCapProvider::from_env()?),
        Arc::new(BinanceProvider::from_env()?),
    ]))
}
