//! Background price loop
//!
//! Fast nickname refreshes during warm-up, then a steady cadence where each
//! tick checks alerts before refreshing nicknames.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use super::alert_monitor::AlertMonitor;
use super::nickname_updater::NicknameUpdater;

/// Spawn the poll loop. Runs until the returned handle is aborted.
pub fn spawn_price_loop(updater: Arc<NicknameUpdater>, alerts: Arc<AlertMonitor>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let schedule = updater.schedule().clone();
        let started = Instant::now();
        let warmup_end = started + schedule.warmup;

        tracing::info!(
            warmup_secs = schedule.warmup.as_secs(),
            steady_secs = schedule.steady_interval.as_secs(),
            "Price loop started"
        );

        let mut fast = tokio::time::interval(schedule.fast_interval);
        fast.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            fast.tick().await;
            if Instant::now() >= warmup_end {
                break;
            }
            let report = updater.refresh_all().await;
            tracing::debug!(?report, "Warm-up tick");
        }

        let mut steady = tokio::time::interval_at(Instant::now(), schedule.steady_interval);
        steady.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            steady.tick().await;
            let fired = alerts.check_all(schedule.concurrency).await;
            let report = updater.refresh_all().await;
            tracing::debug!(?report, alerts_fired = fired, "Poll tick");
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::gateway::{BotCredential, MockGateway};
    use crate::model::Coin;
    use crate::provider::MockPriceProvider;
    use crate::svckit::{AlertRequest, PollSchedule, TokenPool};
    use rust_decimal_macros::dec;

    #[tokio::test(start_paused = true)]
    async fn test_loop_refreshes_and_fires_alerts() {
        let gateway = Arc::new(MockGateway::new());
        let prices = Arc::new(MockPriceProvider::new("Mock").with_price("bitcoin", dec!(97500)));
        let pool = Arc::new(TokenPool::new(vec![BotCredential::new("t", "c")], gateway.clone()));
        pool.lease(&Coin::new("bitcoin", "BTC"), "guild").await.unwrap();

        let schedule = PollSchedule {
            fast_interval: Duration::from_secs(5),
            warmup: Duration::from_secs(10),
            steady_interval: Duration::from_secs(30),
            min_refresh_spacing: Duration::ZERO,
            concurrency: 2,
        };
        let updater = Arc::new(NicknameUpdater::new(pool, prices.clone(), gateway.clone(), schedule));
        let alerts = Arc::new(AlertMonitor::new(gateway.clone(), prices, Duration::from_secs(300)));
        alerts
            .set_alert(AlertRequest {
                coin: Coin::new("bitcoin", "BTC"),
                upper: Some(dec!(90000)),
                lower: None,
                channel_id: "alerts".into(),
                guild_id: "guild".into(),
            })
            .await
            .unwrap();

        let handle = spawn_price_loop(updater, alerts);
        tokio::time::sleep(Duration::from_secs(45)).await;
        handle.abort();

        assert!(gateway.nicknames().len() >= 3);
        assert_eq!(gateway.embeds().len(), 1);
    }
}
