//! Application State

use std::sync::Arc;
use std::time::Duration;

use pricebot_core::svckit::{AlertMonitor, NicknameUpdater, PortfolioLedger, RetryPolicy, TokenPool};
use pricebot_core::{PriceProvider, SentimentSource};
use pricebot_runtime::discord::DiscordClient;

use crate::signature::SignatureVerifier;

/// Domain services the commands operate on
pub struct Services {
    /// Fallback chain of price providers
    pub prices: Arc<dyn PriceProvider>,

    /// None when no Santiment key is configured
    pub sentiment: Option<Arc<dyn SentimentSource>>,

    pub pool: Arc<TokenPool>,
    pub updater: Arc<NicknameUpdater>,
    pub alerts: Arc<AlertMonitor>,
    pub ledger: Arc<PortfolioLedger>,

    /// Retries for the first nickname of a new price bot
    pub announce_retry: RetryPolicy,

    /// Pause between session restarts in `/restart`
    pub restart_spacing: Duration,
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub services: Arc<Services>,

    /// Edits deferred replies and sends follow-ups
    pub discord: Arc<DiscordClient>,

    pub verifier: Arc<SignatureVerifier>,
}
