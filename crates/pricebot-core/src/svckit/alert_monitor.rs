//! Price Alert Monitor
//!
//! Threshold alerts keyed by coin. Evaluation runs against a snapshot taken
//! under the read lock; notifications go out with no lock held and only the
//! alerts whose notification was delivered get their cooldown stamped.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use rust_decimal::Decimal;
use serde::Serialize;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{BotError, Result};
use crate::format;
use crate::gateway::ChatGateway;
use crate::message::{COLOR_RED, Embed};
use crate::model::{Coin, PriceRecord};
use crate::provider::PriceProvider;

pub const DEFAULT_ALERT_COOLDOWN: Duration = Duration::from_secs(300);

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Alert {
    pub id: Uuid,
    pub coin: Coin,

    /// Fires when the price reaches or exceeds this
    pub upper: Option<Decimal>,

    /// Fires when the price reaches or drops below this
    pub lower: Option<Decimal>,

    /// Channel notified when the alert fires
    pub channel_id: String,
    pub guild_id: String,

    pub created_at: DateTime<Utc>,
    pub last_fired: Option<DateTime<Utc>>,
}

/// Which bound an alert crossed
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Trigger {
    Upper(Decimal),
    Lower(Decimal),
}

impl Alert {
    pub fn in_cooldown(&self, now: DateTime<Utc>, cooldown: chrono::Duration) -> bool {
        self.last_fired.is_some_and(|fired| now - fired < cooldown)
    }

    /// Upper bound is checked first
    pub fn trigger(&self, price: Decimal) -> Option<Trigger> {
        if let Some(upper) = self.upper.filter(|upper| price >= *upper) {
            return Some(Trigger::Upper(upper));
        }
        self.lower
            .filter(|lower| price <= *lower)
            .map(Trigger::Lower)
    }
}

/// Input for `AlertMonitor::set_alert`
#[derive(Clone, Debug)]
pub struct AlertRequest {
    pub coin: Coin,
    pub upper: Option<Decimal>,
    pub lower: Option<Decimal>,
    pub channel_id: String,
    pub guild_id: String,
}

pub struct AlertMonitor {
    alerts: RwLock<HashMap<String, Vec<Alert>>>,
    gateway: Arc<dyn ChatGateway>,
    prices: Arc<dyn PriceProvider>,
    cooldown: chrono::Duration,
}

impl AlertMonitor {
    pub fn new(gateway: Arc<dyn ChatGateway>, prices: Arc<dyn PriceProvider>, cooldown: Duration) -> Self {
        Self {
            alerts: RwLock::new(HashMap::new()),
            gateway,
            prices,
            cooldown: chrono::Duration::from_std(cooldown).unwrap_or_else(|_| chrono::Duration::minutes(5)),
        }
    }

    /// Register an alert. Non-positive bounds count as unset.
    pub async fn set_alert(&self, request: AlertRequest) -> Result<Alert> {
        let upper = request.upper.filter(|v| *v > Decimal::ZERO);
        let lower = request.lower.filter(|v| *v > Decimal::ZERO);
        if upper.is_none() && lower.is_none() {
            return Err(BotError::Validation(
                "Please set at least one price target (upper or lower)".into(),
            ));
        }

        let alert = Alert {
            id: Uuid::new_v4(),
            coin: request.coin,
            upper,
            lower,
            channel_id: request.channel_id,
            guild_id: request.guild_id,
            created_at: Utc::now(),
            last_fired: None,
        };

        self.alerts
            .write()
            .await
            .entry(alert.coin.id.clone())
            .or_default()
            .push(alert.clone());

        tracing::info!(coin = %alert.coin.id, alert_id = %alert.id, "Alert set");
        Ok(alert)
    }

    /// Drop every alert for a coin, returns how many were removed
    pub async fn remove_alerts(&self, coin_id: &str) -> Result<usize> {
        let removed = self
            .alerts
            .write()
            .await
            .remove(coin_id)
            .ok_or_else(|| BotError::NotFound(format!("alerts for {}", coin_id.to_uppercase())))?;

        tracing::info!(coin = %coin_id, count = removed.len(), "Alerts removed");
        Ok(removed.len())
    }

    /// Every alert, grouped by coin and ordered by symbol
    pub async fn list_alerts(&self) -> Vec<(Coin, Vec<Alert>)> {
        let alerts = self.alerts.read().await;
        let mut grouped: Vec<(Coin, Vec<Alert>)> = alerts
            .values()
            .filter_map(|list| list.first().map(|first| (first.coin.clone(), list.clone())))
            .collect();
        grouped.sort_by(|a, b| a.0.symbol.cmp(&b.0.symbol));
        grouped
    }

    /// Coins with at least one alert
    pub async fn coins(&self) -> Vec<Coin> {
        self.alerts
            .read()
            .await
            .values()
            .filter_map(|list| list.first().map(|alert| alert.coin.clone()))
            .collect()
    }

    /// Evaluate the alerts of `coin` against a fresh price, returns how many fired
    pub async fn check_alerts(&self, record: &PriceRecord, coin: &Coin) -> usize {
        self.check_alerts_at(record, coin, Utc::now()).await
    }

    pub async fn check_alerts_at(&self, record: &PriceRecord, coin: &Coin, now: DateTime<Utc>) -> usize {
        let due: Vec<(Uuid, String, Trigger)> = {
            let alerts = self.alerts.read().await;
            let Some(list) = alerts.get(&coin.id) else {
                return 0;
            };
            list.iter()
                .filter(|alert| !alert.in_cooldown(now, self.cooldown))
                .filter_map(|alert| {
                    alert
                        .trigger(record.price)
                        .map(|trigger| (alert.id, alert.channel_id.clone(), trigger))
                })
                .collect()
        };

        let mut delivered = Vec::with_capacity(due.len());
        for (id, channel_id, trigger) in due {
            let embed = alert_embed(coin, record, trigger, now);
            match self.gateway.send_embed(&channel_id, &embed).await {
                Ok(()) => delivered.push(id),
                Err(e) => {
                    tracing::warn!(coin = %coin.id, alert_id = %id, error = %e, "Alert notification failed");
                }
            }
        }

        if !delivered.is_empty() {
            let mut alerts = self.alerts.write().await;
            if let Some(list) = alerts.get_mut(&coin.id) {
                for alert in list.iter_mut().filter(|alert| delivered.contains(&alert.id)) {
                    alert.last_fired = Some(now);
                }
            }
            tracing::info!(coin = %coin.id, fired = delivered.len(), price = %record.price, "Alerts fired");
        }

        delivered.len()
    }

    /// Fetch a price for every coin with alerts and evaluate them, `concurrency` coins at a time
    pub async fn check_all(&self, concurrency: usize) -> usize {
        let coins = self.coins().await;

        stream::iter(coins)
            .map(|coin| async move {
                match self.prices.fetch(&coin).await {
                    Ok(record) => self.check_alerts(&record, &coin).await,
                    Err(e) => {
                        tracing::warn!(coin = %coin.id, error = %e, "Price fetch for alerts failed");
                        0
                    }
                }
            })
            .buffer_unordered(concurrency.max(1))
            .fold(0, |total, fired| async move { total + fired })
            .await
    }
}

fn alert_embed(coin: &Coin, record: &PriceRecord, trigger: Trigger, now: DateTime<Utc>) -> Embed {
    let (side, target) = match trigger {
        Trigger::Upper(target) => ("upper", target),
        Trigger::Lower(target) => ("lower", target),
    };

    Embed::new("Price Alert Triggered!")
        .description(format!(
            "🚨 {} has reached your {side} target of {} (Current: {})",
            coin.symbol,
            format::fiat_price(target),
            format::fiat_price(record.price),
        ))
        .color(COLOR_RED)
        .field("24h Change", format::percentage(record.change_24h), true)
        .field("Volume (24h)", format::millions(record.volume_24h), true)
        .timestamp(now)
}
