//! # pricebot-core
//!
//! Domain logic for a Discord price bot: a fallback price aggregator, a pool
//! of satellite bot credentials whose nicknames track coin prices, threshold
//! alerts and a small investment ledger.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────┐   fetch    ┌──────────────────────────────────┐
//! │ PriceProvider │◀───────────│ PriceAggregator                  │
//! │  (A, B, C)    │            │  A ──429──▶ B ──429──▶ C         │
//! └───────────────┘            └──────────────────────────────────┘
//!                                     ▲              ▲
//!                                     │              │
//!   ┌──────────────┐  snapshot  ┌─────┴──────────┐ ┌─┴────────────┐
//!   │  TokenPool   │◀───────────│NicknameUpdater │ │ AlertMonitor │
//!   │ free ⇄ leased│            └───────┬────────┘ └──────┬───────┘
//!   └──────────────┘                    │  ChatGateway    │
//!                                       ▼                 ▼
//!                                set_nickname       send_embed
//! ```
//!
//! Platform and HTTP specifics live behind the [`PriceProvider`] and
//! [`ChatGateway`] traits; `pricebot-runtime` implements them.

pub mod catalog;
pub mod error;
pub mod format;
pub mod gateway;
pub mod message;
pub mod model;
pub mod provider;
pub mod sentiment;
pub mod svckit;

pub use error::{BotError, Result};
pub use gateway::{BotCredential, ChatGateway};
pub use message::{Embed, Reply};
pub use model::{Coin, PriceRecord};
pub use provider::{PriceAggregator, PriceProvider};
pub use sentiment::{GreedFear, SentimentLabel, SentimentSource, SocialMetrics};
