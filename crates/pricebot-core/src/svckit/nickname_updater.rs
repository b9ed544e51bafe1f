//! Nickname Updater
//!
//! Keeps every leased bot's nickname in step with its coin's price.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use rust_decimal::Decimal;

use super::token_pool::{Lease, TokenPool};
use crate::error::Result;
use crate::format;
use crate::gateway::ChatGateway;
use crate::provider::PriceProvider;

/// Polling cadence: fast ticks while warming up, slower ticks afterwards
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PollSchedule {
    pub fast_interval: Duration,
    pub warmup: Duration,
    pub steady_interval: Duration,

    /// A lease refreshed more recently than this is skipped
    pub min_refresh_spacing: Duration,

    /// Upper bound on in-flight price fetches per tick
    pub concurrency: usize,
}

impl Default for PollSchedule {
    fn default() -> Self {
        Self {
            fast_interval: Duration::from_secs(5),
            warmup: Duration::from_secs(30),
            steady_interval: Duration::from_secs(30),
            min_refresh_spacing: Duration::from_secs(5),
            concurrency: 4,
        }
    }
}

/// Retries for the first nickname of a freshly leased bot
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 5,
            delay: Duration::from_secs(2),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TickReport {
    pub refreshed: usize,
    pub skipped: usize,
    pub failed: usize,
}

pub struct NicknameUpdater {
    pool: Arc<TokenPool>,
    prices: Arc<dyn PriceProvider>,
    gateway: Arc<dyn ChatGateway>,
    schedule: PollSchedule,
}

impl NicknameUpdater {
    pub fn new(
        pool: Arc<TokenPool>,
        prices: Arc<dyn PriceProvider>,
        gateway: Arc<dyn ChatGateway>,
        schedule: PollSchedule,
    ) -> Self {
        Self {
            pool,
            prices,
            gateway,
            schedule,
        }
    }

    pub const fn schedule(&self) -> &PollSchedule {
        &self.schedule
    }

    /// One poll tick over every lease
    pub async fn refresh_all(&self) -> TickReport {
        self.refresh_all_at(Utc::now()).await
    }

    pub async fn refresh_all_at(&self, now: DateTime<Utc>) -> TickReport {
        let min_spacing = chrono::Duration::from_std(self.schedule.min_refresh_spacing)
            .unwrap_or_else(|_| chrono::Duration::zero());

        let leases = self.pool.snapshot().await;
        let total = leases.len();
        let due: Vec<Lease> = leases
            .into_iter()
            .filter(|lease| lease.is_active() && lease.is_due(now, min_spacing))
            .collect();

        let mut report = TickReport {
            skipped: total - due.len(),
            ..TickReport::default()
        };

        let outcomes: Vec<bool> = stream::iter(due)
            .map(|lease| async move {
                match self.refresh(&lease, now).await {
                    Ok(price) => {
                        tracing::debug!(coin = %lease.coin.id, %price, "Nickname refreshed");
                        true
                    }
                    Err(e) => {
                        tracing::warn!(coin = %lease.coin.id, error = %e, "Nickname refresh failed, retrying next tick");
                        false
                    }
                }
            })
            .buffer_unordered(self.schedule.concurrency.max(1))
            .collect()
            .await;

        for ok in outcomes {
            if ok {
                report.refreshed += 1;
            } else {
                report.failed += 1;
            }
        }
        report
    }

    /// Set the first nickname of a new lease, retrying on failure. Never fails the lease.
    pub async fn announce(&self, lease: &Lease, price: Decimal, retry: RetryPolicy) -> bool {
        let nickname = format::nickname(&lease.coin, price);

        for attempt in 1..=retry.attempts {
            match self
                .gateway
                .set_nickname(&lease.credential, &lease.guild_id, &nickname)
                .await
            {
                Ok(()) => {
                    self.pool
                        .record_refresh(&lease.coin.id, &lease.credential.token, price, Utc::now())
                        .await;
                    return true;
                }
                Err(e) => {
                    tracing::warn!(coin = %lease.coin.id, attempt, error = %e, "Initial nickname update failed");
                    if attempt < retry.attempts && !retry.delay.is_zero() {
                        tokio::time::sleep(retry.delay).await;
                    }
                }
            }
        }

        tracing::error!(coin = %lease.coin.id, attempts = retry.attempts, "Giving up on initial nickname");
        false
    }

    async fn refresh(&self, lease: &Lease, now: DateTime<Utc>) -> Result<Decimal> {
        let record = self.prices.fetch(&lease.coin).await?;
        let nickname = format::nickname(&lease.coin, record.price);
        self.gateway
            .set_nickname(&lease.credential, &lease.guild_id, &nickname)
            .await?;
        self.pool
            .record_refresh(&lease.coin.id, &lease.credential.token, record.price, now)
            .await;
        Ok(record.price)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::{BotCredential, MockGateway};
    use crate::model::Coin;
    use crate::provider::MockPriceProvider;
    use rust_decimal_macros::dec;

    struct Fixture {
        pool: Arc<TokenPool>,
        gateway: Arc<MockGateway>,
        provider: Arc<MockPriceProvider>,
        updater: NicknameUpdater,
    }

    fn fixture() -> Fixture {
        let gateway = Arc::new(MockGateway::new());
        let provider = Arc::new(
            MockPriceProvider::new("Mock")
                .with_price("bitcoin", dec!(97512.6))
                .with_price("ethereum", dec!(3456.781)),
        );
        let pool = Arc::new(TokenPool::new(
            vec![
                BotCredential::new("token-a", "client-a"),
                BotCredential::new("token-b", "client-b"),
            ],
            gateway.clone(),
        ));
        let updater = NicknameUpdater::new(
            pool.clone(),
            provider.clone(),
            gateway.clone(),
            PollSchedule::default(),
        );
        Fixture {
            pool,
            gateway,
            provider,
            updater,
        }
    }

    #[tokio::test]
    async fn test_refresh_sets_nicknames() {
        let f = fixture();
        f.pool.lease(&Coin::new("bitcoin", "BTC"), "guild").await.unwrap();
        f.pool.lease(&Coin::new("ethereum", "ETH"), "guild").await.unwrap();

        let report = f.updater.refresh_all_at(Utc::now()).await;
        assert_eq!(report, TickReport { refreshed: 2, skipped: 0, failed: 0 });

        let mut nicknames = f.gateway.nicknames();
        nicknames.sort();
        assert_eq!(nicknames, vec!["BTC $97513", "ETH $3456.78"]);
        assert_eq!(f.pool.get("bitcoin").await.unwrap().last_price, Some(dec!(97512.6)));
    }

    #[tokio::test]
    async fn test_recent_refresh_is_skipped() {
        let f = fixture();
        f.pool.lease(&Coin::new("bitcoin", "BTC"), "guild").await.unwrap();
        let now = Utc::now();

        assert_eq!(f.updater.refresh_all_at(now).await.refreshed, 1);

        let soon = now + chrono::Duration::seconds(2);
        assert_eq!(f.updater.refresh_all_at(soon).await.skipped, 1);

        let later = now + chrono::Duration::seconds(6);
        assert_eq!(f.updater.refresh_all_at(later).await.refreshed, 1);
        assert_eq!(f.provider.calls(), 2);
    }

    #[tokio::test]
    async fn test_failed_fetch_leaves_lease_untouched() {
        let f = fixture();
        f.pool.lease(&Coin::new("bitcoin", "BTC"), "guild").await.unwrap();
        f.provider.set_rate_limited(true);

        let report = f.updater.refresh_all_at(Utc::now()).await;
        assert_eq!(report.failed, 1);

        let lease = f.pool.get("bitcoin").await.unwrap();
        assert!(lease.last_refresh.is_none());
        assert!(f.gateway.nicknames().is_empty());
    }

    #[tokio::test]
    async fn test_announce_retries_until_success() {
        let f = fixture();
        let lease = f.pool.lease(&Coin::new("bitcoin", "BTC"), "guild").await.unwrap();
        f.gateway.fail_next_nicknames(3);

        let retry = RetryPolicy { attempts: 5, delay: Duration::ZERO };
        assert!(f.updater.announce(&lease, dec!(97500), retry).await);
        assert_eq!(f.gateway.nicknames(), vec!["BTC $97500"]);
    }

    #[tokio::test]
    async fn test_announce_gives_up_but_keeps_lease() {
        let f = fixture();
        let lease = f.pool.lease(&Coin::new("bitcoin", "BTC"), "guild").await.unwrap();
        f.gateway.fail_next_nicknames(5);

        let retry = RetryPolicy { attempts: 5, delay: Duration::ZERO };
        assert!(!f.updater.announce(&lease, dec!(97500), retry).await);
        assert!(f.pool.get("bitcoin").await.is_some());
    }
}
