//! Display formatting for prices, amounts and nicknames

use rust_decimal::{Decimal, RoundingStrategy};

use crate::model::Coin;

/// Ticker shown without decimals, its price is too large for cents to matter
pub const INTEGER_PRICE_SYMBOL: &str = "BTC";

fn round(value: Decimal, dp: u32) -> Decimal {
    value.round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero)
}

fn price_precision(coin: &Coin) -> usize {
    if coin.symbol == INTEGER_PRICE_SYMBOL { 0 } else { 2 }
}

/// "$97500" for BTC, "$3450.25" for everything else
pub fn display_price(coin: &Coin, price: Decimal) -> String {
    let dp = price_precision(coin);
    format!("${:.dp$}", round(price, dp as u32))
}

/// Nickname shown by a satellite bot, e.g. "BTC $97500"
pub fn nickname(coin: &Coin, price: Decimal) -> String {
    format!("{} {}", coin.symbol, display_price(coin, price))
}

/// Crypto quantities keep 8 decimal places, trailing zeros dropped
pub fn crypto_amount(amount: Decimal) -> String {
    round(amount, 8).normalize().to_string()
}

/// Unit prices: 2 decimals at or above $1, 4 below
pub fn fiat_price(price: Decimal) -> String {
    if price.abs() >= Decimal::ONE {
        format!("${:.2}", round(price, 2))
    } else {
        format!("${:.4}", round(price, 4))
    }
}

/// Totals and profit/loss, sign in front of the dollar sign
pub fn fiat_amount(amount: Decimal) -> String {
    let rounded = round(amount, 2);
    if rounded.is_sign_negative() && !rounded.is_zero() {
        format!("-${:.2}", rounded.abs())
    } else {
        format!("${:.2}", rounded.abs())
    }
}

pub fn percentage(value: Decimal) -> String {
    let rounded = round(value, 2);
    if rounded > Decimal::ZERO {
        format!("+{rounded:.2}%")
    } else {
        format!("{rounded:.2}%")
    }
}

/// Plain number with a fixed number of decimals, e.g. amounts in command replies
pub fn fixed(value: Decimal, dp: u32) -> String {
    format!("{:.prec$}", round(value, dp), prec = dp as usize)
}

/// "$1234.57M"
pub fn millions(value: Decimal) -> String {
    format!("${:.2}M", round(value / Decimal::from(1_000_000), 2))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_nickname_precision() {
        let btc = Coin::new("bitcoin", "BTC");
        let eth = Coin::new("ethereum", "ETH");

        assert_eq!(nickname(&btc, dec!(97512.7)), "BTC $97513");
        assert_eq!(nickname(&eth, dec!(3450.1)), "ETH $3450.10");
        assert_eq!(display_price(&eth, dec!(0.381)), "$0.38");
    }

    #[test]
    fn test_fiat_price_magnitude() {
        assert_eq!(fiat_price(dec!(20750)), "$20750.00");
        assert_eq!(fiat_price(dec!(0.52341)), "$0.5234");
    }

    #[test]
    fn test_amounts_and_percentages() {
        assert_eq!(crypto_amount(dec!(0.80000000)), "0.8");
        assert_eq!(crypto_amount(dec!(1.123456789)), "1.12345679");
        assert_eq!(fiat_amount(dec!(-12.5)), "-$12.50");
        assert_eq!(fiat_amount(dec!(1600)), "$1600.00");
        assert_eq!(percentage(dec!(9.64)), "+9.64%");
        assert_eq!(percentage(dec!(-3.2)), "-3.20%");
        assert_eq!(millions(dec!(25000000)), "$25.00M");
        assert_eq!(fixed(dec!(0.8), 4), "0.8000");
    }
}
