//! Command execution
//!
//! Each command turns into a [`Reply`]. Failures the user can act on become
//! reply text; everything else is logged and summarized.

use chrono::Utc;
use futures::future::join_all;
use pricebot_core::catalog::{self, MAX_AUTOCOMPLETE_CHOICES};
use pricebot_core::svckit::{AlertRequest, AssetFilter, EntryRequest, Investment, InvestmentKind, Position, Removal};
use pricebot_core::{BotError, Coin, Reply};
use rust_decimal::Decimal;

use super::render::{self, SENTIMENT_UNAVAILABLE};
use super::{AUTOCOMPLETE_COMMANDS, Command, Invocation};
use crate::interaction::CommandData;
use crate::state::Services;

pub async fn execute(services: &Services, ctx: &Invocation, command: Command) -> Reply {
    let name = command.name();
    tracing::info!(command = name, user_id = %ctx.user_id, guild_id = %ctx.guild_id, "Executing command");

    match command {
        Command::Price { coin } => price(services, &coin).await,
        Command::Add { coin } => add(services, ctx, &coin).await,
        Command::Remove { coin } => remove(services, &coin).await,
        Command::SetAlert { coin, upper, lower } => set_alert(services, ctx, &coin, upper, lower).await,
        Command::RemoveAlert { coin } => remove_alert(services, &coin).await,
        Command::ListAlerts => Reply::embed(render::alerts_embed(&services.alerts.list_alerts().await)),
        Command::SetInvest {
            coin,
            amount,
            buy_price,
            kind,
            participants,
        } => {
            let request = EntryRequest {
                user_id: ctx.user_id.clone(),
                coin: catalog::resolve(&coin),
                amount,
                cost_basis: buy_price,
                kind,
                participants,
            };
            set_invest(services, request).await
        }
        Command::RemoveInvest { coin } => remove_invest(services, ctx, &coin).await,
        Command::Assets { filter } => assets(services, ctx, filter).await,
        Command::Invite => Reply::embed(render::invite_embed(&services.pool.available_invites().await)).ephemeral(),
        Command::Restart => restart(services).await,
        Command::Clear => {
            let cleared = services.pool.clear_all().await;
            tracing::info!(cleared, "All price bots cleared");
            Reply::text("✅ Successfully cleared all price bots")
        }
        Command::Help => Reply::embed(render::help_embed()),
    }
}

/// Whether the reply must only be visible to the invoker. Deferred commands fix this up front.
pub async fn is_private(services: &Services, ctx: &Invocation, command: &Command) -> bool {
    match command {
        Command::Invite => true,
        Command::SetInvest { kind, .. } => *kind == InvestmentKind::Personal,
        Command::Assets { filter: AssetFilter::Personal } => true,
        Command::Assets { filter: AssetFilter::All } => services
            .ledger
            .assets(&ctx.user_id, AssetFilter::Collective)
            .await
            .is_empty(),
        _ => false,
    }
}

/// Coin choices for the option being typed
pub fn autocomplete(data: &CommandData) -> Vec<Coin> {
    if !AUTOCOMPLETE_COMMANDS.contains(&data.name.as_str()) {
        return Vec::new();
    }
    let query = data
        .focused()
        .and_then(|option| option.value.as_ref())
        .and_then(|value| value.as_str())
        .unwrap_or_default();
    catalog::search(query, MAX_AUTOCOMPLETE_CHOICES)
}

async fn price(services: &Services, input: &str) -> Reply {
    let coin = catalog::resolve(input);
    let record = match services.prices.fetch(&coin).await {
        Ok(record) => record,
        Err(e) => {
            tracing::warn!(coin = %coin.id, error = %e, "Price lookup failed");
            return Reply::text(format!("Error: {}", e.user_message()));
        }
    };

    let sentiment = match &services.sentiment {
        Some(source) => match source.greed_fear(&coin.id).await {
            Ok(Some(label)) => label.to_string(),
            Ok(None) => SENTIMENT_UNAVAILABLE.to_string(),
            Err(e) => {
                tracing::debug!(coin = %coin.id, error = %e, "Sentiment lookup failed");
                SENTIMENT_UNAVAILABLE.to_string()
            }
        },
        None => SENTIMENT_UNAVAILABLE.to_string(),
    };

    Reply::embed(render::price_embed(&coin, &record, &sentiment, Utc::now()))
}

async fn add(services: &Services, ctx: &Invocation, input: &str) -> Reply {
    if ctx.guild_id.is_empty() {
        return Reply::text("❌ Price bots can only be added inside a server");
    }

    let coin = catalog::resolve(input);
    let record = match services.prices.fetch(&coin).await {
        Ok(record) => record,
        Err(e) => {
            tracing::warn!(coin = %coin.id, error = %e, "Initial price fetch failed");
            return Reply::text(format!(
                "Error: Could not fetch price for {} . Please verify the cryptocurrency name.",
                coin.id
            ));
        }
    };

    let lease = match services.pool.lease(&coin, &ctx.guild_id).await {
        Ok(lease) => lease,
        Err(e @ (BotError::AlreadyTracked(_) | BotError::Exhausted)) => return Reply::text(e.user_message()),
        Err(e) => {
            tracing::error!(coin = %coin.id, error = %e, "Could not bring price bot online");
            return Reply::text(format!("❌ Error connecting bot: {e}"));
        }
    };

    services
        .updater
        .announce(&lease, record.price, services.announce_retry)
        .await;

    let every = services.updater.schedule().steady_interval.as_secs();
    Reply::embed(render::bot_created_embed(&coin, record.price, every, Utc::now()))
}

async fn remove(services: &Services, input: &str) -> Reply {
    let coin = catalog::resolve(input);
    match services.pool.release(&coin.id).await {
        Ok(lease) => Reply::text(format!("Removed price bot for {}", lease.coin.symbol)),
        Err(BotError::NotFound(_)) => Reply::text("No price bot found for this cryptocurrency"),
        Err(e) => Reply::text(e.user_message()),
    }
}

async fn set_alert(
    services: &Services,
    ctx: &Invocation,
    input: &str,
    upper: Option<Decimal>,
    lower: Option<Decimal>,
) -> Reply {
    let Some(coin) = catalog::lookup(input) else {
        return Reply::text(format!(
            "❌ Cryptocurrency '{input}' not found.\nPlease use autocomplete to select a valid cryptocurrency."
        ));
    };

    let request = AlertRequest {
        coin: coin.clone(),
        upper,
        lower,
        channel_id: ctx.channel_id.clone(),
        guild_id: ctx.guild_id.clone(),
    };
    let alert = match services.alerts.set_alert(request).await {
        Ok(alert) => alert,
        Err(BotError::Validation(_)) => {
            return Reply::text(
                "⚠️ Please set at least one target price (upper or lower)\n\
                 Example: `/setalert bitcoin upper:50000 lower:40000`",
            );
        }
        Err(e) => return Reply::text(e.user_message()),
    };

    let current = match services.prices.fetch(&coin).await {
        Ok(record) => Some(record.price),
        Err(e) => {
            tracing::warn!(coin = %coin.id, error = %e, "Reference price unavailable");
            None
        }
    };
    Reply::embed(render::alert_set_embed(&alert, current))
}

async fn remove_alert(services: &Services, input: &str) -> Reply {
    let coin = catalog::resolve(input);
    match services.alerts.remove_alerts(&coin.id).await {
        Ok(_) => Reply::text(format!("Removed all alerts for {}", coin.symbol)),
        Err(BotError::NotFound(_)) => Reply::text("No alerts found for this cryptocurrency"),
        Err(e) => Reply::text(e.user_message()),
    }
}

async fn set_invest(services: &Services, request: EntryRequest) -> Reply {
    let (amount, buy_price) = (request.amount, request.cost_basis);
    match services.ledger.add_entry(request).await {
        Ok(investment) => {
            let reply = Reply::text(render::investment_added(&investment, amount, buy_price));
            if investment.kind == InvestmentKind::Personal {
                reply.ephemeral()
            } else {
                reply
            }
        }
        Err(e) => Reply::text(e.user_message()).ephemeral(),
    }
}

async fn remove_invest(services: &Services, ctx: &Invocation, input: &str) -> Reply {
    let coin = catalog::resolve(input);
    match services.ledger.remove(&ctx.user_id, &coin.id).await {
        Ok(Removal::Deleted(investment)) => Reply::text(format!("Removed investment in {}", investment.coin.symbol)),
        Ok(Removal::Left(investment)) => Reply::text(format!(
            "You left the collective investment in {}",
            investment.coin.symbol
        )),
        Err(BotError::NotFound(_)) => Reply::text("No investment found for this cryptocurrency"),
        Err(e) => Reply::text(e.user_message()),
    }
}

/// Price every investment; ones without a price are left out
async fn positions(services: &Services, investments: Vec<Investment>) -> Vec<Position> {
    let quotes = join_all(investments.iter().map(|i| services.prices.fetch(&i.coin))).await;

    investments
        .into_iter()
        .zip(quotes)
        .filter_map(|(investment, quote)| match quote {
            Ok(record) => Some(Position::new(investment, record.price)),
            Err(e) => {
                tracing::warn!(coin = %investment.coin.id, error = %e, "Skipping investment without a price");
                None
            }
        })
        .collect()
}

async fn assets(services: &Services, ctx: &Invocation, filter: AssetFilter) -> Reply {
    let now = Utc::now();
    let user = ctx.user_id.as_str();

    match filter {
        AssetFilter::Personal => {
            let personal = services.ledger.assets(user, AssetFilter::Personal).await;
            if personal.is_empty() {
                return Reply::text("You have no personal investments.").ephemeral();
            }
            let positions = positions(services, personal).await;
            Reply::embed(render::portfolio_embed(&positions, "Personal", &ctx.username, now)).ephemeral()
        }
        AssetFilter::Collective => {
            let collective = services.ledger.assets(user, AssetFilter::Collective).await;
            if collective.is_empty() {
                return Reply::text("You have no collective investments.");
            }
            let positions = positions(services, collective).await;
            Reply::embed(render::portfolio_embed(&positions, "Collective", &ctx.username, now))
        }
        AssetFilter::All => {
            let all = services.ledger.assets(user, AssetFilter::All).await;
            if all.is_empty() {
                return Reply::text("You don't have any investments yet.").ephemeral();
            }

            let positions = positions(services, all).await;
            let collective: Vec<Position> = positions
                .iter()
                .filter(|p| p.investment.kind == InvestmentKind::Collective)
                .cloned()
                .collect();

            if collective.is_empty() {
                return Reply::embed(render::portfolio_embed(&positions, "Personal", &ctx.username, now)).ephemeral();
            }

            Reply::embed(render::portfolio_embed(&collective, "Collective", &ctx.username, now)).with_followup(
                Reply::embed(render::portfolio_embed(&positions, "Complete", &ctx.username, now)).ephemeral(),
            )
        }
    }
}

async fn restart(services: &Services) -> Reply {
    let report = services.pool.restart_all(services.restart_spacing).await;
    if report.released.is_empty() {
        Reply::text("✅ Successfully restarted all price bots")
    } else {
        Reply::text(format!(
            "⚠️ Restarted {} price bots; could not reconnect {}, their bots were removed",
            report.restarted,
            report.released.join(", ")
        ))
    }
}
