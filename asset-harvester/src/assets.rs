//! Static table of common digital assets and their canonical (CoinGecko-style) ids.

/// `(id, symbol, name)`
pub const COMMON_ASSETS: &[(&str, &str, &str)] = &[
    ("bitcoin", "BTC", "Bitcoin"),
    ("ethereum", "ETH", "Ethereum"),
    ("tether", "USDT", "Tether"),
    ("usd-coin", "USDC", "USD Coin"),
    ("binancecoin", "BNB", "Binance Coin"),
    ("ripple", "XRP", "Ripple"),
    ("cardano", "ADA", "Cardano"),
    ("solana", "SOL", "Solana"),
    ("dogecoin", "DOGE", "Dogecoin"),
    ("polkadot", "DOT", "Polkadot"),
    ("polygon", "MATIC", "Polygon"),
    ("litecoin", "LTC", "Litecoin"),
    ("chainlink", "LINK", "Chainlink"),
    ("bitcoin-cash", "BCH", "Bitcoin Cash"),
    ("stellar", "XLM", "Stellar"),
    ("monero", "XMR", "Monero"),
    ("ethereum-classic", "ETC", "Ethereum Classic"),
    ("avalanche-2", "AVAX", "Avalanche"),
    ("wrapped-bitcoin", "WBTC", "Wrapped Bitcoin"),
    ("dai", "DAI", "Dai"),
    ("uniswap", "UNI", "Uniswap"),
    ("cosmos", "ATOM", "Cosmos"),
    ("shiba-inu", "SHIB", "Shiba Inu"),
    ("leo-token", "LEO", "LEO Token"),
    ("tron", "TRX", "TRON"),
    ("toncoin", "TON", "Toncoin"),
    ("near", "NEAR", "NEAR Protocol"),
    ("optimism", "OP", "Optimism"),
    ("arbitrum", "ARB", "Arbitrum"),
    ("pepe", "PEPE", "Pepe"),
    ("kaspa", "KAS", "Kaspa"),
    ("aptos", "APT", "Aptos"),
    ("stacks", "STX", "Stacks"),
    ("hedera-hashgraph", "HBAR", "Hedera"),
    ("filecoin", "FIL", "Filecoin"),
    ("vechain", "VET", "VeChain"),
    ("maker", "MKR", "Maker"),
    ("lido-dao", "LDO", "Lido DAO"),
    ("render-token", "RNDR", "Render"),
    ("thorchain", "RUNE", "THORChain"),
];

/// Canonical id for a symbol or full name, matched case-insensitively.
pub fn asset_id(item_name: &str) -> Option<&'static str> {
    let needle = item_name.trim();
    if needle.is_empty() {
        return None;
    }
    COMMON_ASSETS
        .iter()
        .find(|(_, symbol, name)| symbol.eq_ignore_ascii_case(needle) || name.eq_ignore_ascii_case(needle))
        .map(|(id, _, _)| *id)
}

pub fn is_known(item_name: &str) -> bool {
    asset_id(item_name).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symbols_and_names_map_to_the_same_id() {
        assert_eq!(asset_id("BTC"), Some("bitcoin"));
        assert_eq!(asset_id(" bitcoin "), Some("bitcoin"));
        assert_eq!(asset_id("usd coin"), Some("usd-coin"));
        assert_eq!(asset_id("NOTACOIN"), None);
        assert!(!is_known(""));
    }
}
