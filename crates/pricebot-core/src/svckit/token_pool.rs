//! Bot Credential Pool
//!
//! A fixed set of satellite bot credentials leased out one per tracked coin.
//! The free list and the tracked-coin map sit behind a single `RwLock`; a
//! lease transaction takes the write half so two callers can never draw the
//! same credential. Sessions are opened and closed outside the lock, the
//! lease stays in a transitional state meanwhile so the credential is always
//! either free or accounted for in the map.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tokio::sync::RwLock;

use crate::error::{BotError, Result};
use crate::gateway::{BotCredential, ChatGateway};
use crate::model::Coin;

const SETTLE_TIMEOUT: Duration = Duration::from_secs(30);
const SETTLE_POLL: Duration = Duration::from_millis(25);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LeaseState {
    /// Credential drawn, session not yet confirmed
    Opening,
    Active,
    /// Session being torn down, credential not yet back in the pool
    Closing,
}

/// A credential checked out for one coin
#[derive(Clone, Debug)]
pub struct Lease {
    pub coin: Coin,
    pub credential: BotCredential,

    /// Guild the nickname is displayed in
    pub guild_id: String,

    pub state: LeaseState,

    /// Price currently shown in the nickname
    pub last_price: Option<Decimal>,

    /// Last successful nickname update
    pub last_refresh: Option<DateTime<Utc>>,

    pub leased_at: DateTime<Utc>,
}

impl Lease {
    fn opening(coin: Coin, credential: BotCredential, guild_id: &str) -> Self {
        Self {
            coin,
            credential,
            guild_id: guild_id.to_string(),
            state: LeaseState::Opening,
            last_price: None,
            last_refresh: None,
            leased_at: Utc::now(),
        }
    }

    pub fn is_active(&self) -> bool {
        self.state == LeaseState::Active
    }

    /// True when the last refresh is at least `min_spacing` old
    pub fn is_due(&self, now: DateTime<Utc>, min_spacing: chrono::Duration) -> bool {
        self.last_refresh.is_none_or(|last| now - last >= min_spacing)
    }
}

/// Outcome of `TokenPool::restart_all`
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RestartReport {
    pub restarted: usize,

    /// Symbols whose session could not be reopened, their credentials went back to the pool
    pub released: Vec<String>,
}

#[derive(Default)]
struct PoolState {
    available: VecDeque<BotCredential>,
    leases: HashMap<String, Lease>,
}

pub struct TokenPool {
    state: RwLock<PoolState>,
    gateway: Arc<dyn ChatGateway>,
    capacity: usize,
}

impl TokenPool {
    /// Duplicate tokens are dropped, each credential can only exist once
    pub fn new(credentials: Vec<BotCredential>, gateway: Arc<dyn ChatGateway>) -> Self {
        let mut available: VecDeque<BotCredential> = VecDeque::with_capacity(credentials.len());
        for credential in credentials {
            if available.iter().any(|c| c.token == credential.token) {
                tracing::warn!(client_id = %credential.client_id, "Duplicate bot token ignored");
                continue;
            }
            available.push_back(credential);
        }

        Self {
            capacity: available.len(),
            state: RwLock::new(PoolState {
                available,
                leases: HashMap::new(),
            }),
            gateway,
        }
    }

    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    pub async fn available_count(&self) -> usize {
        self.state.read().await.available.len()
    }

    pub async fn leased_count(&self) -> usize {
        self.state.read().await.leases.len()
    }

    /// Check out a credential for `coin` and bring its session online
    pub async fn lease(&self, coin: &Coin, guild_id: &str) -> Result<Lease> {
        let credential = {
            let mut state = self.state.write().await;
            if state.leases.contains_key(&coin.id) {
                return Err(BotError::AlreadyTracked(coin.symbol.clone()));
            }
            let credential = state.available.pop_front().ok_or(BotError::Exhausted)?;
            state.leases.insert(
                coin.id.clone(),
                Lease::opening(coin.clone(), credential.clone(), guild_id),
            );
            credential
        };

        if let Err(e) = self.gateway.open_session(&credential).await {
            tracing::warn!(coin = %coin.id, error = %e, "Session open failed, returning credential");
            let mut state = self.state.write().await;
            state.leases.remove(&coin.id);
            state.available.push_back(credential);
            return Err(e);
        }

        {
            let mut state = self.state.write().await;
            let lease = state
                .leases
                .get_mut(&coin.id)
                .ok_or_else(|| BotError::NotFound(format!("price bot for {}", coin.symbol)))?;
            if lease.state == LeaseState::Opening {
                lease.state = LeaseState::Active;
                tracing::info!(coin = %coin.id, client_id = %credential.client_id, "Price bot leased");
                return Ok(lease.clone());
            }
        }

        // Released while the session was opening
        tracing::info!(coin = %coin.id, "Price bot released before its session came up");
        if let Err(e) = self.gateway.close_session(&credential).await {
            tracing::warn!(coin = %coin.id, error = %e, "Session close failed");
        }
        self.return_credential(&coin.id).await;
        Err(BotError::Validation(format!("{} was released while connecting", coin.symbol)))
    }

    /// Tear down the session of `coin_id` and put its credential back
    pub async fn release(&self, coin_id: &str) -> Result<Lease> {
        let lease = {
            let mut state = self.state.write().await;
            let lease = state
                .leases
                .get_mut(coin_id)
                .ok_or_else(|| BotError::NotFound(format!("price bot for {coin_id}")))?;
            if !lease.is_active() {
                return Err(BotError::Validation(format!(
                    "{} is busy, try again in a moment",
                    lease.coin.symbol
                )));
            }
            lease.state = LeaseState::Closing;
            lease.clone()
        };

        if let Err(e) = self.gateway.close_session(&lease.credential).await {
            tracing::warn!(coin = %coin_id, error = %e, "Session close failed");
        }
        self.return_credential(coin_id).await;

        tracing::info!(coin = %coin_id, "Price bot released");
        Ok(lease)
    }

    /// Release every lease; `reset_nickname` clears the displayed nickname first.
    /// Leases still opening are flagged and hand their credential back once the open settles.
    pub async fn release_all(&self, reset_nickname: bool) -> usize {
        let (closing, pending) = {
            let mut state = self.state.write().await;
            let mut closing = Vec::new();
            let mut pending = Vec::new();
            for lease in state.leases.values_mut() {
                match lease.state {
                    LeaseState::Active => {
                        lease.state = LeaseState::Closing;
                        closing.push(lease.clone());
                    }
                    LeaseState::Opening => {
                        lease.state = LeaseState::Closing;
                        pending.push((lease.coin.id.clone(), lease.credential.token.clone()));
                    }
                    LeaseState::Closing => {}
                }
            }
            (closing, pending)
        };

        for lease in &closing {
            if reset_nickname {
                if let Err(e) = self.gateway.set_nickname(&lease.credential, &lease.guild_id, "").await {
                    tracing::warn!(coin = %lease.coin.id, error = %e, "Nickname reset failed");
                }
            }
            if let Err(e) = self.gateway.close_session(&lease.credential).await {
                tracing::warn!(coin = %lease.coin.id, error = %e, "Session close failed");
            }
            self.return_credential(&lease.coin.id).await;
        }

        if !pending.is_empty() {
            self.settle(&pending).await;
        }

        let count = closing.len() + pending.len();
        tracing::info!(count, "Released all price bots");
        count
    }

    /// Wait until the flagged in-flight leases are gone from the map
    async fn settle(&self, pending: &[(String, String)]) {
        let deadline = tokio::time::Instant::now() + SETTLE_TIMEOUT;
        loop {
            let waiting = {
                let state = self.state.read().await;
                pending
                    .iter()
                    .filter(|(coin_id, token)| {
                        state
                            .leases
                            .get(coin_id)
                            .is_some_and(|lease| &lease.credential.token == token)
                    })
                    .count()
            };
            if waiting == 0 {
                return;
            }
            if tokio::time::Instant::now() >= deadline {
                tracing::warn!(waiting, "Gave up waiting for sessions still opening");
                return;
            }
            tokio::time::sleep(SETTLE_POLL).await;
        }
    }

    /// Reset nicknames, close sessions and return every credential
    pub async fn clear_all(&self) -> usize {
        self.release_all(true).await
    }

    /// Process exit: close sessions and return every credential
    pub async fn shutdown(&self) -> usize {
        self.release_all(false).await
    }

    /// Close and reopen every session, spaced out to stay under platform rate limits
    pub async fn restart_all(&self, spacing: Duration) -> RestartReport {
        let leases: Vec<Lease> = self.snapshot().await.into_iter().filter(Lease::is_active).collect();
        let mut report = RestartReport::default();

        for (i, lease) in leases.iter().enumerate() {
            if i > 0 && !spacing.is_zero() {
                tokio::time::sleep(spacing).await;
            }

            if let Err(e) = self.gateway.close_session(&lease.credential).await {
                tracing::warn!(coin = %lease.coin.id, error = %e, "Session close failed during restart");
            }

            match self.gateway.open_session(&lease.credential).await {
                Ok(()) => report.restarted += 1,
                Err(e) => {
                    tracing::warn!(coin = %lease.coin.id, error = %e, "Session reopen failed, releasing");
                    if self.mark_closing(&lease.coin.id, &lease.credential.token).await {
                        self.return_credential(&lease.coin.id).await;
                        report.released.push(lease.coin.symbol.clone());
                    }
                }
            }
        }

        tracing::info!(restarted = report.restarted, released = report.released.len(), "Bot restart completed");
        report
    }

    /// Store a successful nickname update; timestamps never move backwards
    pub async fn record_refresh(&self, coin_id: &str, token: &str, price: Decimal, at: DateTime<Utc>) -> bool {
        let mut state = self.state.write().await;
        match state.leases.get_mut(coin_id) {
            Some(lease) if lease.credential.token == token => {
                lease.last_price = Some(price);
                lease.last_refresh = Some(lease.last_refresh.map_or(at, |prev| prev.max(at)));
                true
            }
            _ => false,
        }
    }

    pub async fn get(&self, coin_id: &str) -> Option<Lease> {
        self.state.read().await.leases.get(coin_id).cloned()
    }

    /// Copy of every lease, sorted by symbol
    pub async fn snapshot(&self) -> Vec<Lease> {
        let mut leases: Vec<Lease> = self.state.read().await.leases.values().cloned().collect();
        leases.sort_by(|a, b| a.coin.symbol.cmp(&b.coin.symbol));
        leases
    }

    /// Credentials not currently leased, for invite links
    pub async fn available_credentials(&self) -> Vec<BotCredential> {
        self.state.read().await.available.iter().cloned().collect()
    }

    /// Invite links of the credentials not currently leased
    pub async fn available_invites(&self) -> Vec<String> {
        self.available_credentials()
            .await
            .iter()
            .map(BotCredential::invite_url)
            .collect()
    }

    async fn mark_closing(&self, coin_id: &str, token: &str) -> bool {
        let mut state = self.state.write().await;
        match state.leases.get_mut(coin_id) {
            Some(lease) if lease.is_active() && lease.credential.token == token => {
                lease.state = LeaseState::Closing;
                true
            }
            _ => false,
        }
    }

    async fn return_credential(&self, coin_id: &str) {
        let mut state = self.state.write().await;
        if let Some(lease) = state.leases.remove(coin_id) {
            state.available.push_back(lease.credential);
        }
    }
}
