//! Service Kit
//!
//! The stateful services behind the bot commands: credential pool, nickname
//! poller, alert monitor and portfolio ledger. Each owns its own lock.

mod alert_monitor;
mod nickname_updater;
mod portfolio_ledger;
mod scheduler;
mod token_pool;

pub use alert_monitor::{Alert, AlertMonitor, AlertRequest, DEFAULT_ALERT_COOLDOWN, Trigger};
pub use nickname_updater::{NicknameUpdater, PollSchedule, RetryPolicy, TickReport};
pub use portfolio_ledger::{
    AssetFilter, EntryRequest, EntryValuation, Investment, InvestmentEntry, InvestmentKind,
    Performance, PortfolioLedger, PortfolioSummary, Position, Removal, Valuation,
    compute_valuation, portfolio_summary,
};
pub use scheduler::spawn_price_loop;
pub use token_pool::{Lease, LeaseState, RestartReport, TokenPool};
