//! Portfolio Ledger
//!
//! Per-user investments with append-only cost-basis entries. A collective
//! investment is a single record reachable from the index of its creator and
//! of every participant, so an entry added by any of them is seen by all.
//!
//! The whole ledger is rewritten to one JSON document after each mutation.
//! Write failures are logged and the in-memory state stays authoritative.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use crate::error::{BotError, Result};
use crate::model::Coin;

const LEDGER_VERSION: u32 = 1;

/// Money and crypto quantities
const AMOUNT_DP: u32 = 8;

/// Percentages
const PERCENT_DP: u32 = 2;

fn round(value: Decimal, dp: u32) -> Decimal {
    value.round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero)
}

fn percent_of(part: Decimal, whole: Decimal) -> Decimal {
    if whole > Decimal::ZERO {
        round(part / whole * Decimal::ONE_HUNDRED, PERCENT_DP)
    } else {
        Decimal::ZERO
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvestmentKind {
    #[default]
    Personal,
    Collective,
}

impl FromStr for InvestmentKind {
    type Err = BotError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "personal" => Ok(Self::Personal),
            "collective" => Ok(Self::Collective),
            other => Err(BotError::Validation(format!("Unknown investment type '{other}'"))),
        }
    }
}

impl std::fmt::Display for InvestmentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Personal => f.write_str("personal"),
            Self::Collective => f.write_str("collective"),
        }
    }
}

/// One purchase
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvestmentEntry {
    pub amount: Decimal,

    /// Price paid per coin
    pub cost_basis: Decimal,

    pub entry_date: DateTime<Utc>,
}

impl InvestmentEntry {
    pub fn cost(&self) -> Decimal {
        round(self.amount * self.cost_basis, AMOUNT_DP)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Investment {
    pub id: Uuid,
    pub coin: Coin,
    pub kind: InvestmentKind,
    pub created_by: String,

    /// Other holders of a collective investment, never contains the creator
    #[serde(default)]
    pub participants: Vec<String>,

    pub entries: Vec<InvestmentEntry>,
    pub created_at: DateTime<Utc>,
}

impl Investment {
    /// Creator first, then participants
    pub fn holders(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.created_by.as_str()).chain(self.participants.iter().map(String::as_str))
    }

    pub fn total_amount(&self) -> Decimal {
        round(self.entries.iter().map(|e| e.amount).sum(), AMOUNT_DP)
    }

    pub fn total_cost(&self) -> Decimal {
        round(self.entries.iter().map(InvestmentEntry::cost).sum(), AMOUNT_DP)
    }

    /// Volume-weighted average price paid
    pub fn average_cost(&self) -> Decimal {
        let amount = self.total_amount();
        if amount.is_zero() {
            Decimal::ZERO
        } else {
            round(self.total_cost() / amount, AMOUNT_DP)
        }
    }
}

/// Profit and loss of one entry at the current price
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EntryValuation {
    pub entry: InvestmentEntry,
    pub current_value: Decimal,
    pub profit_loss: Decimal,
    pub profit_loss_pct: Decimal,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Valuation {
    pub total_amount: Decimal,
    pub avg_cost: Decimal,
    pub total_cost: Decimal,
    pub current_value: Decimal,
    pub profit_loss: Decimal,
    pub profit_loss_pct: Decimal,
    pub entries: Vec<EntryValuation>,
}

/// Derive totals and P/L from the entries, nothing is cached between calls
pub fn compute_valuation(investment: &Investment, price: Decimal) -> Valuation {
    let total_amount = investment.total_amount();
    let total_cost = investment.total_cost();
    let current_value = round(price * total_amount, AMOUNT_DP);
    let profit_loss = round(current_value - total_cost, AMOUNT_DP);

    let entries = investment
        .entries
        .iter()
        .map(|entry| {
            let cost = entry.cost();
            let current_value = round(price * entry.amount, AMOUNT_DP);
            let profit_loss = round(current_value - cost, AMOUNT_DP);
            EntryValuation {
                entry: entry.clone(),
                current_value,
                profit_loss,
                profit_loss_pct: percent_of(profit_loss, cost),
            }
        })
        .collect();

    Valuation {
        total_amount,
        avg_cost: investment.average_cost(),
        total_cost,
        current_value,
        profit_loss,
        profit_loss_pct: percent_of(profit_loss, total_cost),
        entries,
    }
}

/// An investment valued at a price
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Position {
    pub investment: Investment,
    pub price: Decimal,
    pub valuation: Valuation,
}

impl Position {
    pub fn new(investment: Investment, price: Decimal) -> Self {
        let valuation = compute_valuation(&investment, price);
        Self {
            investment,
            price,
            valuation,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Performance {
    pub coin: Coin,
    pub amount: Decimal,
    pub profit_loss: Decimal,
    pub profit_loss_pct: Decimal,

    /// Share of the portfolio's current value
    pub allocation_pct: Decimal,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PortfolioSummary {
    pub total_cost: Decimal,
    pub current_value: Decimal,
    pub profit_loss: Decimal,
    pub profit_loss_pct: Decimal,

    /// Top three by P/L percentage, empty unless more than two positions
    pub best: Vec<Performance>,

    /// Bottom three, worst first, empty unless more than two positions
    pub worst: Vec<Performance>,

    /// Every position, ordered by P/L percentage
    pub allocation: Vec<Performance>,
}

pub fn portfolio_summary(positions: &[Position]) -> PortfolioSummary {
    let total_cost = round(positions.iter().map(|p| p.valuation.total_cost).sum(), AMOUNT_DP);
    let current_value = round(positions.iter().map(|p| p.valuation.current_value).sum(), AMOUNT_DP);
    let profit_loss = round(current_value - total_cost, AMOUNT_DP);

    let mut allocation: Vec<Performance> = positions
        .iter()
        .map(|p| Performance {
            coin: p.investment.coin.clone(),
            amount: p.valuation.total_amount,
            profit_loss: p.valuation.profit_loss,
            profit_loss_pct: p.valuation.profit_loss_pct,
            allocation_pct: percent_of(p.valuation.current_value, current_value),
        })
        .collect();
    allocation.sort_by(|a, b| b.profit_loss_pct.cmp(&a.profit_loss_pct));

    let (best, worst) = if allocation.len() > 2 {
        (
            allocation.iter().take(3).cloned().collect(),
            allocation.iter().rev().take(3).cloned().collect(),
        )
    } else {
        (Vec::new(), Vec::new())
    };

    PortfolioSummary {
        total_cost,
        current_value,
        profit_loss,
        profit_loss_pct: percent_of(profit_loss, total_cost),
        best,
        worst,
        allocation,
    }
}

/// Which investments `assets` lists
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AssetFilter {
    Personal,
    Collective,
    #[default]
    All,
}

impl FromStr for AssetFilter {
    type Err = BotError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "personal" => Ok(Self::Personal),
            "collective" => Ok(Self::Collective),
            "all" | "" => Ok(Self::All),
            other => Err(BotError::Validation(format!("Unknown filter '{other}'"))),
        }
    }
}

/// Input for `PortfolioLedger::add_entry`
#[derive(Clone, Debug)]
pub struct EntryRequest {
    pub user_id: String,
    pub coin: Coin,
    pub amount: Decimal,
    pub cost_basis: Decimal,
    pub kind: InvestmentKind,

    /// Only used when a collective investment is created or extended
    pub participants: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Removal {
    /// The record is gone for every holder
    Deleted(Investment),

    /// The caller left a collective investment, the others keep it
    Left(Investment),
}

#[derive(Default, Serialize, Deserialize)]
struct LedgerDocument {
    version: u32,
    investments: Vec<Investment>,
}

#[derive(Default)]
struct LedgerState {
    investments: HashMap<Uuid, Investment>,

    /// user id -> coin id -> investment
    index: HashMap<String, HashMap<String, Uuid>>,
}

impl LedgerState {
    fn from_document(document: LedgerDocument) -> Self {
        let mut state = Self::default();
        for investment in document.investments {
            state.link(&investment);
            state.investments.insert(investment.id, investment);
        }
        state
    }

    fn to_document(&self) -> LedgerDocument {
        let mut investments: Vec<Investment> = self.investments.values().cloned().collect();
        investments.sort_by_key(|i| i.created_at);
        LedgerDocument {
            version: LEDGER_VERSION,
            investments,
        }
    }

    fn lookup(&self, user_id: &str, coin_id: &str) -> Option<Uuid> {
        self.index.get(user_id).and_then(|coins| coins.get(coin_id)).copied()
    }

    fn link(&mut self, investment: &Investment) {
        for holder in investment.holders() {
            self.index
                .entry(holder.to_string())
                .or_default()
                .insert(investment.coin.id.clone(), investment.id);
        }
    }

    fn unlink(&mut self, user_id: &str, coin_id: &str) {
        if let Some(coins) = self.index.get_mut(user_id) {
            coins.remove(coin_id);
            if coins.is_empty() {
                self.index.remove(user_id);
            }
        }
    }

    /// Participants that already hold a separate investment in the coin
    fn conflicting(&self, participants: &[String], coin_id: &str, own: Option<Uuid>) -> Option<String> {
        participants
            .iter()
            .find(|p| self.lookup(p, coin_id).is_some_and(|id| Some(id) != own))
            .cloned()
    }
}

pub struct PortfolioLedger {
    state: RwLock<LedgerState>,
    path: Option<PathBuf>,

    /// Orders concurrent saves so the newest snapshot is written last
    save_lock: Mutex<()>,
}

impl PortfolioLedger {
    /// Ledger that never touches disk
    pub fn in_memory() -> Self {
        Self {
            state: RwLock::new(LedgerState::default()),
            path: None,
            save_lock: Mutex::new(()),
        }
    }

    /// Load the ledger document at `path`, a missing file starts an empty ledger
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let state = match tokio::fs::read_to_string(&path).await {
            Ok(raw) if raw.trim().is_empty() => LedgerState::default(),
            Ok(raw) => LedgerState::from_document(serde_json::from_str(&raw)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => LedgerState::default(),
            Err(e) => return Err(e.into()),
        };

        tracing::info!(path = %path.display(), investments = state.investments.len(), "Portfolio ledger loaded");
        Ok(Self {
            state: RwLock::new(state),
            path: Some(path),
            save_lock: Mutex::new(()),
        })
    }

    /// Append an entry to the user's investment in the coin, creating it if needed
    pub async fn add_entry(&self, request: EntryRequest) -> Result<Investment> {
        if request.amount <= Decimal::ZERO {
            return Err(BotError::Validation("Amount must be greater than zero".into()));
        }
        if request.cost_basis <= Decimal::ZERO {
            return Err(BotError::Validation("Buy price must be greater than zero".into()));
        }

        let mut participants: Vec<String> = Vec::new();
        for p in request.participants {
            if p != request.user_id && !participants.contains(&p) {
                participants.push(p);
            }
        }

        let entry = InvestmentEntry {
            amount: request.amount,
            cost_basis: request.cost_basis,
            entry_date: Utc::now(),
        };
        let coin_id = request.coin.id.clone();

        let investment = {
            let mut state = self.state.write().await;
            let existing = state.lookup(&request.user_id, &coin_id);

            if let Some(conflict) = state.conflicting(&participants, &coin_id, existing) {
                return Err(BotError::Validation(format!(
                    "<@{conflict}> already has a separate {} investment",
                    request.coin.symbol
                )));
            }

            let investment = if let Some(id) = existing {
                let investment = state
                    .investments
                    .get_mut(&id)
                    .ok_or_else(|| BotError::NotFound(format!("investment in {}", request.coin.symbol)))?;
                if request.kind == InvestmentKind::Collective && investment.kind == InvestmentKind::Personal {
                    return Err(BotError::Validation(format!(
                        "You already hold a personal {} investment, remove it before starting a collective one",
                        request.coin.symbol
                    )));
                }
                investment.entries.push(entry);
                if investment.kind == InvestmentKind::Collective {
                    for p in participants {
                        if p != investment.created_by && !investment.participants.contains(&p) {
                            investment.participants.push(p);
                        }
                    }
                }
                investment.clone()
            } else {
                if request.kind == InvestmentKind::Collective && participants.is_empty() {
                    return Err(BotError::Validation(
                        "A collective investment needs at least one other participant".into(),
                    ));
                }
                let investment = Investment {
                    id: Uuid::new_v4(),
                    coin: request.coin,
                    kind: request.kind,
                    created_by: request.user_id,
                    participants: if request.kind == InvestmentKind::Collective {
                        participants
                    } else {
                        Vec::new()
                    },
                    entries: vec![entry],
                    created_at: Utc::now(),
                };
                state.investments.insert(investment.id, investment.clone());
                investment
            };

            state.link(&investment);
            investment
        };

        tracing::info!(
            coin = %coin_id,
            investment_id = %investment.id,
            kind = %investment.kind,
            entries = investment.entries.len(),
            "Investment entry added"
        );
        self.persist().await;
        Ok(investment)
    }

    /// The creator deletes the record for everyone; a participant only leaves it
    pub async fn remove(&self, user_id: &str, coin_id: &str) -> Result<Removal> {
        let removal = {
            let mut state = self.state.write().await;
            let id = state
                .lookup(user_id, coin_id)
                .ok_or_else(|| BotError::NotFound(format!("investment in {}", coin_id.to_uppercase())))?;

            let is_creator = state
                .investments
                .get(&id)
                .is_some_and(|investment| investment.created_by == user_id);

            if is_creator {
                let investment = state
                    .investments
                    .remove(&id)
                    .ok_or_else(|| BotError::NotFound(format!("investment in {}", coin_id.to_uppercase())))?;
                let holders: Vec<String> = investment.holders().map(str::to_string).collect();
                for holder in &holders {
                    state.unlink(holder, coin_id);
                }
                Removal::Deleted(investment)
            } else {
                state.unlink(user_id, coin_id);
                let investment = state
                    .investments
                    .get_mut(&id)
                    .ok_or_else(|| BotError::NotFound(format!("investment in {}", coin_id.to_uppercase())))?;
                investment.participants.retain(|p| p != user_id);
                Removal::Left(investment.clone())
            }
        };

        tracing::info!(coin = %coin_id, deleted = matches!(removal, Removal::Deleted(_)), "Investment removed");
        self.persist().await;
        Ok(removal)
    }

    pub async fn get(&self, user_id: &str, coin_id: &str) -> Option<Investment> {
        let state = self.state.read().await;
        state
            .lookup(user_id, coin_id)
            .and_then(|id| state.investments.get(&id).cloned())
    }

    /// Investments visible to the user, ordered by symbol
    pub async fn assets(&self, user_id: &str, filter: AssetFilter) -> Vec<Investment> {
        let state = self.state.read().await;
        let Some(coins) = state.index.get(user_id) else {
            return Vec::new();
        };

        let mut investments: Vec<Investment> = coins
            .values()
            .filter_map(|id| state.investments.get(id))
            .filter(|investment| match filter {
                AssetFilter::Personal => investment.kind == InvestmentKind::Personal,
                AssetFilter::Collective => investment.kind == InvestmentKind::Collective,
                AssetFilter::All => true,
            })
            .cloned()
            .collect();
        investments.sort_by(|a, b| a.coin.symbol.cmp(&b.coin.symbol));
        investments
    }

    async fn persist(&self) {
        let Some(path) = &self.path else {
            return;
        };

        let _guard = self.save_lock.lock().await;
        let json = {
            let state = self.state.read().await;
            serde_json::to_string_pretty(&state.to_document())
        };

        let result = match json {
            Ok(json) => write_atomic(path, json.as_bytes()).await,
            Err(e) => Err(e.into()),
        };
        if let Err(e) = result {
            tracing::warn!(path = %path.display(), error = %e, "Failed to save portfolio ledger");
        }
    }
}

async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, bytes).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn btc() -> Coin {
        Coin::new("bitcoin", "BTC")
    }

    fn personal(user: &str, coin: Coin, amount: Decimal, cost: Decimal) -> EntryRequest {
        EntryRequest {
            user_id: user.into(),
            coin,
            amount,
            cost_basis: cost,
            kind: InvestmentKind::Personal,
            participants: Vec::new(),
        }
    }

    fn collective(user: &str, participants: &[&str], amount: Decimal, cost: Decimal) -> EntryRequest {
        EntryRequest {
            kind: InvestmentKind::Collective,
            participants: participants.iter().map(|p| (*p).to_string()).collect(),
            ..personal(user, btc(), amount, cost)
        }
    }

    #[tokio::test]
    async fn test_average_cost() {
        let ledger = PortfolioLedger::in_memory();
        ledger.add_entry(personal("alice", btc(), dec!(0.5), dec!(20000))).await.unwrap();
        let investment = ledger.add_entry(personal("alice", btc(), dec!(0.3), dec!(22000))).await.unwrap();

        let valuation = compute_valuation(&investment, dec!(25000));
        assert_eq!(valuation.total_amount, dec!(0.8));
        assert_eq!(valuation.avg_cost, dec!(20750));
        assert_eq!(valuation.total_cost, dec!(16600));
        assert_eq!(valuation.current_value, dec!(20000));
        assert_eq!(valuation.profit_loss, dec!(3400));
        assert_eq!(valuation.profit_loss_pct, dec!(20.48));
        assert_eq!(valuation.entries.len(), 2);
    }

    #[tokio::test]
    async fn test_valuation_is_idempotent() {
        let ledger = PortfolioLedger::in_memory();
        let investment = ledger
            .add_entry(personal("alice", btc(), dec!(0.12345678), dec!(31234.56)))
            .await
            .unwrap();

        let first = compute_valuation(&investment, dec!(40000.01));
        let second = compute_valuation(&investment, dec!(40000.01));
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_rejects_non_positive_input() {
        let ledger = PortfolioLedger::in_memory();
        let zero = ledger.add_entry(personal("alice", btc(), dec!(0), dec!(100))).await;
        assert!(matches!(zero, Err(BotError::Validation(_))));

        let negative = ledger.add_entry(personal("alice", btc(), dec!(1), dec!(-1))).await;
        assert!(matches!(negative, Err(BotError::Validation(_))));
    }

    #[tokio::test]
    async fn test_collective_needs_participants() {
        let ledger = PortfolioLedger::in_memory();
        let err = ledger.add_entry(collective("alice", &["alice"], dec!(1), dec!(100))).await;
        assert!(matches!(err, Err(BotError::Validation(_))));
    }

    #[tokio::test]
    async fn test_collective_record_is_shared() {
        let ledger = PortfolioLedger::in_memory();
        ledger.add_entry(collective("alice", &["bob"], dec!(1), dec!(100))).await.unwrap();

        // Bob's entry lands in the same record
        let shared = ledger.add_entry(personal("bob", btc(), dec!(1), dec!(200))).await.unwrap();
        assert_eq!(shared.kind, InvestmentKind::Collective);
        assert_eq!(shared.entries.len(), 2);

        let alice_view = ledger.get("alice", "bitcoin").await.unwrap();
        assert_eq!(alice_view, shared);
        assert_eq!(ledger.assets("bob", AssetFilter::Collective).await.len(), 1);
        assert!(ledger.assets("bob", AssetFilter::Personal).await.is_empty());
    }

    #[tokio::test]
    async fn test_participant_with_own_position_is_rejected() {
        let ledger = PortfolioLedger::in_memory();
        ledger.add_entry(personal("bob", btc(), dec!(1), dec!(100))).await.unwrap();

        let err = ledger.add_entry(collective("alice", &["bob"], dec!(1), dec!(100))).await;
        assert!(matches!(err, Err(BotError::Validation(_))));
    }

    #[tokio::test]
    async fn test_collective_over_personal_position_is_rejected() {
        let ledger = PortfolioLedger::in_memory();
        ledger.add_entry(personal("alice", btc(), dec!(1), dec!(100))).await.unwrap();

        let err = ledger.add_entry(collective("alice", &["bob"], dec!(1), dec!(200))).await;
        assert!(matches!(err, Err(BotError::Validation(_))));

        let held = ledger.get("alice", "bitcoin").await.unwrap();
        assert_eq!(held.kind, InvestmentKind::Personal);
        assert_eq!(held.entries.len(), 1);
        assert!(ledger.get("bob", "bitcoin").await.is_none());
    }

    #[tokio::test]
    async fn test_participant_leaves_creator_deletes() {
        let ledger = PortfolioLedger::in_memory();
        ledger
            .add_entry(collective("alice", &["bob", "carol"], dec!(1), dec!(100)))
            .await
            .unwrap();

        match ledger.remove("bob", "bitcoin").await.unwrap() {
            Removal::Left(investment) => assert_eq!(investment.participants, vec!["carol"]),
            other => panic!("expected Left, got {other:?}"),
        }
        assert!(ledger.get("bob", "bitcoin").await.is_none());
        assert!(ledger.get("carol", "bitcoin").await.is_some());

        assert!(matches!(ledger.remove("alice", "bitcoin").await.unwrap(), Removal::Deleted(_)));
        assert!(ledger.get("carol", "bitcoin").await.is_none());
        assert!(matches!(ledger.remove("alice", "bitcoin").await, Err(BotError::NotFound(_))));
    }

    #[test]
    fn test_summary_lists_performers_above_two_positions() {
        let make = |id: &str, symbol: &str, cost: Decimal, price: Decimal| {
            let investment = Investment {
                id: Uuid::new_v4(),
                coin: Coin::new(id, symbol),
                kind: InvestmentKind::Personal,
                created_by: "alice".into(),
                participants: Vec::new(),
                entries: vec![InvestmentEntry {
                    amount: dec!(1),
                    cost_basis: cost,
                    entry_date: Utc::now(),
                }],
                created_at: Utc::now(),
            };
            Position::new(investment, price)
        };

        let two = vec![
            make("bitcoin", "BTC", dec!(100), dec!(150)),
            make("ethereum", "ETH", dec!(100), dec!(50)),
        ];
        let summary = portfolio_summary(&two);
        assert!(summary.best.is_empty());
        assert_eq!(summary.profit_loss, dec!(0));
        assert_eq!(summary.allocation[0].allocation_pct, dec!(75));

        let mut four = two;
        four.push(make("solana", "SOL", dec!(100), dec!(110)));
        four.push(make("cardano", "ADA", dec!(100), dec!(90)));
        let summary = portfolio_summary(&four);
        assert_eq!(summary.best[0].coin.symbol, "BTC");
        assert_eq!(summary.worst[0].coin.symbol, "ETH");
        assert_eq!(summary.best.len(), 3);
        assert_eq!(summary.worst.len(), 3);
    }

    #[tokio::test]
    async fn test_persists_and_reloads() {
        let path = std::env::temp_dir().join(format!("pricebot-ledger-{}.json", Uuid::new_v4()));

        let ledger = PortfolioLedger::open(&path).await.unwrap();
        ledger.add_entry(collective("alice", &["bob"], dec!(0.5), dec!(20000))).await.unwrap();
        ledger
            .add_entry(personal("alice", Coin::new("ethereum", "ETH"), dec!(2), dec!(3000)))
            .await
            .unwrap();

        let reloaded = PortfolioLedger::open(&path).await.unwrap();
        assert_eq!(reloaded.assets("alice", AssetFilter::All).await.len(), 2);
        let shared = reloaded.get("bob", "bitcoin").await.unwrap();
        assert_eq!(shared.created_by, "alice");
        assert_eq!(shared.entries[0].cost_basis, dec!(20000));

        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn test_failed_save_keeps_memory_state() {
        let path = std::env::temp_dir()
            .join(format!("pricebot-absent-{}", Uuid::new_v4()))
            .join("ledger.json");

        let ledger = PortfolioLedger::open(&path).await.unwrap();
        let investment = ledger.add_entry(personal("alice", btc(), dec!(1), dec!(100))).await.unwrap();

        assert!(!path.exists());
        assert_eq!(ledger.get("alice", "bitcoin").await, Some(investment));
    }

    #[tokio::test]
    async fn test_missing_file_starts_empty() {
        let path = std::env::temp_dir().join(format!("pricebot-missing-{}.json", Uuid::new_v4()));
        let ledger = PortfolioLedger::open(&path).await.unwrap();
        assert!(ledger.assets("alice", AssetFilter::All).await.is_empty());
    }
}
