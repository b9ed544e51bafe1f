//! Embeds and texts for command replies

use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use pricebot_core::format;
use pricebot_core::message::{COLOR_GREEN, COLOR_RED};
use pricebot_core::svckit::{Alert, Investment, InvestmentKind, Position, portfolio_summary};
use pricebot_core::{Coin, Embed, PriceRecord};
use rust_decimal::Decimal;

/// Discord rejects embeds with more fields than this
pub const MAX_EMBED_FIELDS: usize = 25;

/// Discord limit on an embed field value
const MAX_FIELD_VALUE: usize = 1024;

pub const SENTIMENT_UNAVAILABLE: &str = "Data not available";

fn clip(mut value: String) -> String {
    if value.chars().count() > MAX_FIELD_VALUE {
        value = value.chars().take(MAX_FIELD_VALUE - 1).collect();
        value.push('…');
    }
    value
}

fn stamp(now: DateTime<Utc>) -> String {
    now.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

pub fn mentions(ids: &[String]) -> String {
    if ids.is_empty() {
        return "none".into();
    }
    ids.iter().map(|id| format!("<@{id}>")).collect::<Vec<_>>().join(", ")
}

pub fn price_embed(coin: &Coin, record: &PriceRecord, sentiment: &str, now: DateTime<Utc>) -> Embed {
    Embed::new(format!("{} Price Info", coin.symbol))
        .color(COLOR_GREEN)
        .field("💰 Price", format::fiat_price(record.price), true)
        .field("📈 24h Change", format::percentage(record.change_24h), true)
        .field("📊 Market Cap", format::millions(record.market_cap), true)
        .field("📉 24h Volume", format::millions(record.volume_24h), true)
        .field("🌟 Market Sentiment", sentiment, false)
        .footer(format!("Data from {} • {}", record.source, stamp(now)))
}

pub fn bot_created_embed(coin: &Coin, price: Decimal, every_secs: u64, now: DateTime<Utc>) -> Embed {
    Embed::new("✅ Price Bot Created")
        .color(COLOR_GREEN)
        .field("Cryptocurrency", coin.symbol.clone(), true)
        .field("Initial Price", format::display_price(coin, price), true)
        .field(
            "Status",
            format!("Bot is now active and will update every {every_secs} seconds"),
            false,
        )
        .footer(format!("Started at {}", now.format("%H:%M:%S UTC")))
}

pub fn alert_set_embed(alert: &Alert, current: Option<Decimal>) -> Embed {
    let mut embed = Embed::new(format!("⚡ Price Alert Set for {}", alert.coin.symbol))
        .color(COLOR_GREEN)
        .field(
            "Current Price",
            current.map_or_else(|| "Unavailable".into(), format::fiat_price),
            true,
        );
    if let Some(upper) = alert.upper {
        embed = embed.field("Upper Target", format::fiat_price(upper), true);
    }
    if let Some(lower) = alert.lower {
        embed = embed.field("Lower Target", format::fiat_price(lower), true);
    }
    embed
}

pub fn alerts_embed(groups: &[(Coin, Vec<Alert>)]) -> Embed {
    let embed = Embed::new("Active Price Alerts").color(COLOR_GREEN);
    let total: usize = groups.iter().map(|(_, alerts)| alerts.len()).sum();
    if total == 0 {
        return embed.description("No active alerts");
    }

    let mut embed = groups
        .iter()
        .flat_map(|(coin, alerts)| alerts.iter().map(move |alert| (coin, alert)))
        .take(MAX_EMBED_FIELDS)
        .fold(embed, |embed, (coin, alert)| {
            let bounds: Vec<String> = [("Upper", alert.upper), ("Lower", alert.lower)]
                .into_iter()
                .filter_map(|(label, bound)| bound.map(|b| format!("{label}: {}", format::fiat_price(b))))
                .collect();
            embed.field(coin.symbol.clone(), bounds.join("\n"), true)
        });

    if total > MAX_EMBED_FIELDS {
        embed = embed.footer(format!("Showing {MAX_EMBED_FIELDS} of {total} alerts"));
    }
    embed
}

pub fn invite_embed(invites: &[String]) -> Embed {
    let embed = Embed::new("Price Bot Invite Links")
        .color(COLOR_GREEN)
        .field(
            "Available Price Bots",
            format!("There are {} bots available for price display", invites.len()),
            false,
        );

    invites
        .iter()
        .take(MAX_EMBED_FIELDS - 1)
        .enumerate()
        .fold(embed, |embed, (i, url)| {
            embed.field(format!("Bot {}", i + 1), format!("[Click to invite]({url})"), false)
        })
        .footer("Use /add after inviting a bot")
}

pub fn help_embed() -> Embed {
    Embed::new("🤖 Bot Commands")
        .color(COLOR_GREEN)
        .field("/price [crypto]", "Get current price information\nExample: `/price bitcoin`", false)
        .field("/add [crypto]", "Add a new price display bot\nExample: `/add bitcoin`", false)
        .field("/remove [crypto]", "Remove a price display bot\nExample: `/remove bitcoin`", false)
        .field("/help", "Show this help message", false)
        .field(
            "/setalert [crypto] [upper] [lower]",
            "Set price alerts for a cryptocurrency\n\
             Example:\n\
             • /setalert bitcoin upper:50000 lower:40000\n\
             • /setalert ethereum upper:3000\n\
             • /setalert solana lower:20\n\n\
             Must set at least one target (upper or lower)",
            false,
        )
        .field(
            "/removealert [crypto]",
            "Remove price alerts for a cryptocurrency\nExample: /removealert bitcoin",
            false,
        )
        .field("/listalerts", "Show all your active price alerts", false)
        .field(
            "/setinvest [crypto] [amount] [buy_price] [type] [participants]",
            "Record a purchase, repeated purchases are averaged\nExample: /setinvest bitcoin amount:0.5 buy_price:20000",
            false,
        )
        .field("/removeinvest [crypto]", "Remove an investment from your portfolio", false)
        .field("/assets [filter]", "Show your portfolio with profit and loss", false)
        .field("/invite", "Get invite links for available price bots", false)
        .field("/restart, /clear", "Reconnect or remove every price display bot", false)
        .footer("Type crypto name to see suggestions")
}

/// Confirmation after `/setinvest`
pub fn investment_added(investment: &Investment, amount: Decimal, buy_price: Decimal) -> String {
    let mut text = format!(
        "Added to {} investment: {} {} at ${} per coin\nTotal Amount: {}\nAverage Buy Price: ${}",
        investment.kind,
        format::fixed(amount, 4),
        investment.coin.symbol,
        format::fixed(buy_price, 2),
        format::fixed(investment.total_amount(), 4),
        format::fixed(investment.average_cost(), 2),
    );
    if investment.kind == InvestmentKind::Collective {
        let _ = write!(text, "\nParticipants: {}", mentions(&investment.participants));
    }
    text
}

fn position_details(position: &Position) -> String {
    let valuation = &position.valuation;
    let mut text = format!(
        "Total Amount: {}\nAvg Buy Price: {}\nCurrent Price: {}\nTotal Investment: {}\nCurrent Value: {}\nTotal P/L: {} ({})",
        format::crypto_amount(valuation.total_amount),
        format::fiat_price(valuation.avg_cost),
        format::fiat_price(position.price),
        format::fiat_amount(valuation.total_cost),
        format::fiat_amount(valuation.current_value),
        format::fiat_amount(valuation.profit_loss),
        format::percentage(valuation.profit_loss_pct),
    );

    if !valuation.entries.is_empty() {
        text.push_str("\nEntries:");
        for (i, entry) in valuation.entries.iter().enumerate() {
            let _ = write!(
                text,
                "\n{}. {} @ {} ({}) | P/L: {} ({})",
                i + 1,
                format::crypto_amount(entry.entry.amount),
                format::fiat_price(entry.entry.cost_basis),
                entry.entry.entry_date.format("%Y-%m-%d"),
                format::fiat_amount(entry.profit_loss),
                format::percentage(entry.profit_loss_pct),
            );
        }
    }

    let investment = &position.investment;
    if investment.kind == InvestmentKind::Collective {
        let _ = write!(
            text,
            "\n\nParticipants: {}\nCreated by: <@{}>",
            mentions(&investment.participants),
            investment.created_by
        );
    }
    clip(text)
}

/// `label` is "Personal", "Collective" or "Complete"
pub fn portfolio_embed(positions: &[Position], label: &str, username: &str, now: DateTime<Utc>) -> Embed {
    let summary = portfolio_summary(positions);

    let mut embed = positions
        .iter()
        .take(MAX_EMBED_FIELDS - 1)
        .fold(Embed::new(format!("{label} Portfolio for {username}")), |embed, position| {
            embed.field(
                format!("{} ({})", position.investment.coin.symbol, position.investment.kind),
                position_details(position),
                true,
            )
        });

    let mut text = format!(
        "Total Investment: {}\nCurrent Value: {}\nTotal P/L: {} ({})\n",
        format::fiat_amount(summary.total_cost),
        format::fiat_amount(summary.current_value),
        format::fiat_amount(summary.profit_loss),
        format::percentage(summary.profit_loss_pct),
    );
    for (heading, performers) in [("Best Performers", &summary.best), ("Worst Performers", &summary.worst)] {
        if performers.is_empty() {
            continue;
        }
        let _ = write!(text, "\n{heading}:\n");
        for p in performers {
            let _ = writeln!(
                text,
                "{}: {} ({})",
                p.coin.symbol,
                format::percentage(p.profit_loss_pct),
                format::fiat_amount(p.profit_loss)
            );
        }
    }
    text.push_str("\nPortfolio Allocation:\n");
    for p in &summary.allocation {
        let _ = writeln!(
            text,
            "{}: {}% ({})",
            p.coin.symbol,
            format::fixed(p.allocation_pct, 2),
            format::crypto_amount(p.amount)
        );
    }

    embed = embed.field(format!("{label} Portfolio Summary"), clip(text), false);
    embed
        .color(if summary.profit_loss >= Decimal::ZERO { COLOR_GREEN } else { COLOR_RED })
        .footer(stamp(now))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pricebot_core::svckit::InvestmentEntry;
    use rust_decimal_macros::dec;

    fn investment(symbol: &str, kind: InvestmentKind, entries: &[(Decimal, Decimal)]) -> Investment {
        Investment {
            id: Default::default(),
            coin: Coin::new(symbol.to_lowercase(), symbol),
            kind,
            created_by: "1".into(),
            participants: if kind == InvestmentKind::Collective { vec!["2".into()] } else { Vec::new() },
            entries: entries
                .iter()
                .map(|(amount, cost_basis)| InvestmentEntry {
                    amount: *amount,
                    cost_basis: *cost_basis,
                    entry_date: Utc::now(),
                })
                .collect(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_price_embed_fields() {
        let coin = Coin::new("bitcoin", "BTC");
        let record = PriceRecord::new(dec!(97000), "CoinGecko")
            .with_change(dec!(1.5))
            .with_market_cap(dec!(1900000000000))
            .with_volume(dec!(25000000));
        let embed = price_embed(&coin, &record, "Greed 😀", Utc::now());

        assert_eq!(embed.title.as_deref(), Some("BTC Price Info"));
        assert_eq!(embed.fields[0].value, "$97000.00");
        assert_eq!(embed.fields[1].value, "+1.50%");
        assert_eq!(embed.fields[3].value, "$25.00M");
        assert_eq!(embed.fields[4].value, "Greed 😀");
        assert!(embed.footer.unwrap().text.starts_with("Data from CoinGecko • "));
    }

    #[test]
    fn test_alerts_embed() {
        assert_eq!(alerts_embed(&[]).description.as_deref(), Some("No active alerts"));
    }

    #[test]
    fn test_invite_embed() {
        let embed = invite_embed(&["https://invite/1".into(), "https://invite/2".into()]);
        assert_eq!(embed.fields.len(), 3);
        assert_eq!(embed.fields[0].value, "There are 2 bots available for price display");
        assert_eq!(embed.fields[2].name, "Bot 2");
        assert_eq!(embed.fields[2].value, "[Click to invite](https://invite/2)");
    }

    #[test]
    fn test_investment_added_text() {
        let personal = investment("BTC", InvestmentKind::Personal, &[(dec!(0.5), dec!(20000)), (dec!(0.3), dec!(22000))]);
        assert_eq!(
            investment_added(&personal, dec!(0.3), dec!(22000)),
            "Added to personal investment: 0.3000 BTC at $22000.00 per coin\nTotal Amount: 0.8000\nAverage Buy Price: $20750.00"
        );

        let shared = investment("ETH", InvestmentKind::Collective, &[(dec!(1), dec!(3000))]);
        assert!(investment_added(&shared, dec!(1), dec!(3000)).ends_with("\nParticipants: <@2>"));
    }

    #[test]
    fn test_portfolio_embed() {
        let positions = vec![
            Position::new(investment("BTC", InvestmentKind::Personal, &[(dec!(0.5), dec!(20000)), (dec!(0.3), dec!(22000))]), dec!(25000)),
            Position::new(investment("ETH", InvestmentKind::Collective, &[(dec!(1), dec!(3000))]), dec!(2500)),
        ];
        let embed = portfolio_embed(&positions, "Complete", "satoshi", Utc::now());

        assert_eq!(embed.title.as_deref(), Some("Complete Portfolio for satoshi"));
        assert_eq!(embed.fields.len(), 3);
        assert_eq!(embed.fields[0].name, "BTC (personal)");
        assert!(embed.fields[0].value.contains("Avg Buy Price: $20750.00"));
        assert!(embed.fields[0].value.contains("Total P/L: $3400.00 (+20.48%)"));
        assert!(embed.fields[1].value.contains("Created by: <@1>"));

        let summary = &embed.fields[2];
        assert_eq!(summary.name, "Complete Portfolio Summary");
        assert!(!summary.value.contains("Best Performers"));
        assert!(summary.value.contains("Portfolio Allocation:"));
        assert_eq!(embed.color, Some(COLOR_GREEN));
    }

    #[test]
    fn test_long_field_values_are_clipped() {
        let clipped = clip("x".repeat(2000));
        assert_eq!(clipped.chars().count(), MAX_FIELD_VALUE);
        assert!(clipped.ends_with('…'));
    }
}
