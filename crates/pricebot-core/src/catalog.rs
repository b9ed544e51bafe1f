//! Coin Catalog
//!
//! Known coins and the per-provider identifiers they map to. Lookups accept a
//! canonical id ("bitcoin"), a ticker ("btc") or an autocomplete label
//! ("BTC (bitcoin)").

use crate::model::Coin;

/// Discord caps autocomplete answers at 25 choices
pub const MAX_AUTOCOMPLETE_CHOICES: usize = 25;

/// (canonical id, ticker)
const COINS: &[(&str, &str)] = &[
    ("bitcoin", "BTC"),
    ("ethereum", "ETH"),
    ("binancecoin", "BNB"),
    ("ripple", "XRP"),
    ("cardano", "ADA"),
    ("solana", "SOL"),
    ("dogecoin", "DOGE"),
    ("polkadot", "DOT"),
    ("matic-network", "MATIC"),
    ("avalanche-2", "AVAX"),
    ("worldcoin-wld", "WLD"),
    ("avail", "AVAIL"),
    ("starknet", "STRK"),
    ("tron", "TRX"),
    ("chainlink", "LINK"),
    ("uniswap", "UNI"),
    ("litecoin", "LTC"),
    ("bitcoin-cash", "BCH"),
    ("stellar", "XLM"),
    ("monero", "XMR"),
    ("cosmos", "ATOM"),
    ("ethereum-classic", "ETC"),
    ("filecoin", "FIL"),
    ("hedera-hashgraph", "HBAR"),
    ("near", "NEAR"),
    ("vechain", "VET"),
    ("algorand", "ALGO"),
    ("apecoin", "APE"),
    ("decentraland", "MANA"),
    ("the-sandbox", "SAND"),
    ("axie-infinity", "AXS"),
    ("aave", "AAVE"),
    ("tezos", "XTZ"),
    ("theta-token", "THETA"),
    ("fantom", "FTM"),
    ("maker", "MKR"),
    ("curve-dao-token", "CRV"),
    ("compound-governance-token", "COMP"),
    ("dash", "DASH"),
    ("zcash", "ZEC"),
    ("kusama", "KSM"),
    ("pancakeswap-token", "CAKE"),
    ("sushi", "SUSHI"),
    ("yearn-finance", "YFI"),
    ("1inch", "1INCH"),
    ("flow", "FLOW"),
    ("arweave", "AR"),
    ("immutable-x", "IMX"),
    ("thorchain", "RUNE"),
    ("render-token", "RNDR"),
    ("optimism", "OP"),
    ("arbitrum", "ARB"),
    ("sei-network", "SEI"),
    ("celestia", "TIA"),
    ("bonk", "BONK"),
    ("injective-protocol", "INJ"),
    ("stacks", "STX"),
    ("sui", "SUI"),
    ("pepe", "PEPE"),
    ("fetch-ai", "FET"),
    ("jupiter", "JUP"),
    ("raydium", "RAY"),
    ("synthetix-network-token", "SNX"),
    ("shiba-inu", "SHIB"),
    ("floki", "FLOKI"),
    ("gala", "GALA"),
    ("the-graph", "GRT"),
];

/// Binance spot tickers, coins without one are unsupported on Binance
const BINANCE_SYMBOLS: &[(&str, &str)] = &[
    ("bitcoin", "BTCUSDT"),
    ("ethereum", "ETHUSDT"),
    ("binancecoin", "BNBUSDT"),
    ("ripple", "XRPUSDT"),
    ("cardano", "ADAUSDT"),
    ("solana", "SOLUSDT"),
    ("dogecoin", "DOGEUSDT"),
    ("polkadot", "DOTUSDT"),
    ("matic-network", "MATICUSDT"),
    ("avalanche-2", "AVAXUSDT"),
    ("worldcoin-wld", "WLDUSDT"),
    ("tron", "TRXUSDT"),
    ("chainlink", "LINKUSDT"),
    ("uniswap", "UNIUSDT"),
    ("litecoin", "LTCUSDT"),
    ("stellar", "XLMUSDT"),
    ("filecoin", "FILUSDT"),
    ("hedera-hashgraph", "HBARUSDT"),
    ("near", "NEARUSDT"),
    ("vechain", "VETUSDT"),
    ("algorand", "ALGOUSDT"),
    ("tezos", "XTZUSDT"),
    ("fantom", "FTMUSDT"),
    ("apecoin", "APEUSDT"),
    ("shiba-inu", "SHIBUSDT"),
    ("the-sandbox", "SANDUSDT"),
    ("decentraland", "MANAUSDT"),
    ("theta-token", "THETAUSDT"),
    ("starknet", "STRKUSDT"),
];

/// CoinMarketCap slugs that differ from the canonical id
const CMC_SLUGS: &[(&str, &str)] = &[
    ("binancecoin", "binance-coin"),
    ("matic-network", "polygon"),
    ("avalanche-2", "avalanche"),
    ("worldcoin-wld", "worldcoin"),
    ("hedera-hashgraph", "hedera"),
    ("near", "near-protocol"),
    ("theta-token", "theta"),
    ("starknet", "starknet-token"),
];

fn lookup_pair<'a>(table: &'a [(&'a str, &'a str)], id: &str) -> Option<&'a str> {
    table.iter().find(|(key, _)| *key == id).map(|(_, value)| *value)
}

/// Strip an autocomplete label down to the id inside the parentheses
fn normalize_input(input: &str) -> String {
    let input = input.trim();
    let inner = match (input.find('('), input.rfind(')')) {
        (Some(open), Some(close)) if open < close => &input[open + 1..close],
        _ => input,
    };
    inner.trim().to_lowercase()
}

/// Strict lookup by canonical id or ticker
pub fn lookup(input: &str) -> Option<Coin> {
    let key = normalize_input(input);
    COINS
        .iter()
        .find(|(id, symbol)| *id == key || symbol.eq_ignore_ascii_case(&key))
        .map(|(id, symbol)| Coin::new(*id, *symbol))
}

/// Lenient lookup: unknown input is treated as a canonical id and its upper-cased form as ticker
pub fn resolve(input: &str) -> Coin {
    lookup(input).unwrap_or_else(|| {
        let key = normalize_input(input);
        Coin::new(key.clone(), key)
    })
}

pub fn binance_symbol(id: &str) -> Option<&'static str> {
    lookup_pair(BINANCE_SYMBOLS, id)
}

/// Falls back to the canonical id
pub fn cmc_slug(id: &str) -> &str {
    lookup_pair(CMC_SLUGS, id).unwrap_or(id)
}

/// Autocomplete: substring match on id or ticker, exact matches first, then shorter labels
pub fn search(query: &str, limit: usize) -> Vec<Coin> {
    let query = query.trim().to_lowercase();

    let mut matches: Vec<Coin> = COINS
        .iter()
        .filter(|(id, symbol)| id.contains(&query) || symbol.to_lowercase().contains(&query))
        .map(|(id, symbol)| Coin::new(*id, *symbol))
        .collect();

    matches.sort_by_key(|coin| {
        let exact = coin.id == query || coin.symbol.eq_ignore_ascii_case(&query);
        (!exact, coin.display_name().len(), coin.id.clone())
    });
    matches.truncate(limit);
    matches
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_by_id_symbol_and_label() {
        assert_eq!(lookup("bitcoin").unwrap().symbol, "BTC");
        assert_eq!(lookup("eth").unwrap().id, "ethereum");
        assert_eq!(lookup("SOL (solana)").unwrap().id, "solana");
        assert!(lookup("not-a-coin").is_none());
    }

    #[test]
    fn test_resolve_unknown_coin() {
        let coin = resolve("Mystery-Token");
        assert_eq!(coin.id, "mystery-token");
        assert_eq!(coin.symbol, "MYSTERY-TOKEN");
    }

    #[test]
    fn test_provider_identifiers() {
        assert_eq!(binance_symbol("bitcoin"), Some("BTCUSDT"));
        assert_eq!(binance_symbol("monero"), None);
        assert_eq!(cmc_slug("matic-network"), "polygon");
        assert_eq!(cmc_slug("solana"), "solana");
    }

    #[test]
    fn test_search_puts_exact_match_first() {
        let results = search("sol", MAX_AUTOCOMPLETE_CHOICES);
        assert_eq!(results[0].id, "solana");

        let all = search("", MAX_AUTOCOMPLETE_CHOICES);
        assert_eq!(all.len(), MAX_AUTOCOMPLETE_CHOICES);
    }
}
