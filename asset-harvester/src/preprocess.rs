use interfaces::defs::Email;
use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;

/// Exchanges and platforms whose mail is worth a closer look.
pub const EXCHANGES: &[&str] = &[
    "coinbase",
    "binance",
    "kraken",
    "gemini",
    "crypto.com",
    "ftx",
    "coinspot",
    "bitfinex",
    "bitstamp",
    "btcmarkets",
    "btc markets",
    "independent reserve",
    "independentreserve",
    "newton",
    "swyftx",
    "kucoin",
    "okx",
    "bybit",
    "bitget",
    "gate.io",
    "uphold",
    "bitpanda",
    "bitbuy",
    "shakepay",
    "blockchain.com",
];

/// Asset names and generic asset vocabulary, matched case-insensitively.
pub const ASSET_NAMES: &[&str] = &[
    "bitcoin",
    "ethereum",
    "litecoin",
    "solana",
    "dogecoin",
    "cardano",
    "polkadot",
    "ripple",
    "tether",
    "usd coin",
    "binance coin",
    "polygon",
    "avalanche",
    "monero",
    "stellar",
    "chainlink",
    "crypto",
    "cryptocurrency",
    "cryptocurrencies",
    "stablecoin",
    "altcoin",
    "blockchain",
    "satoshi",
    "staking",
];

/// Tickers only count in upper case, so "sol" in prose does not trigger a match.
pub const ASSET_TICKERS: &[&str] = &[
    "BTC", "XBT", "ETH", "LTC", "SOL", "DOGE", "XDG", "ADA", "DOT", "XRP", "BNB", "USDT", "USDC",
    "MATIC", "AVAX", "XMR", "XLM", "LINK", "ATOM", "SHIB", "TRX", "TON", "UNI", "DAI", "BCH",
];

/// Verbs and nouns that accompany a real transaction.
pub const PURCHASE_TERMS: &[&str] = &[
    "bought",
    "buy",
    "purchase",
    "purchased",
    "order",
    "filled",
    "executed",
    "trade",
    "transaction",
    "deposit",
    "deposited",
    "withdrawal",
    "withdrawn",
    "credited",
    "earned",
    "received",
    "reward",
    "rewards",
    "receipt",
    "confirmation",
    "payout",
    "distribution",
    "sold",
];

/// Marketing and account-notice vocabulary. Any hit means skip.
pub const NON_PURCHASE_TERMS: &[&str] = &[
    "newsletter",
    "news",
    "webinar",
    "promotion",
    "promotional",
    "price alert",
    "announce",
    "announcement",
    "announcing",
    "listing",
    "will list",
    "terms of service",
    "terms of use",
    "privacy policy",
    "referral",
    "refer a friend",
    "invite friends",
    "new login",
    "new device",
    "security alert",
    "password reset",
    "verify your email",
    "blog",
    "market update",
    "weekly digest",
    "weekly recap",
    "giveaway",
    "airdrop",
    "survey",
];

fn alternation(terms: &[&str], case_insensitive: bool) -> Regex {
    let body = terms
        .iter()
        .map(|term| regex::escape(term).replace(' ', r"\s+"))
        .collect::<Vec<_>>()
        .join("|");
    let flags = if case_insensitive { "(?i)" } else { "" };
    crate::utils::static_regex(&format!(r"{}\b(?:{})\b", flags, body))
}

static EXCHANGE_RE: LazyLock<Regex> = LazyLock::new(|| alternation(EXCHANGES, true));
static ASSET_NAME_RE: LazyLock<Regex> = LazyLock::new(|| alternation(ASSET_NAMES, true));
static ASSET_TICKER_RE: LazyLock<Regex> = LazyLock::new(|| alternation(ASSET_TICKERS, false));
static PURCHASE_RE: LazyLock<Regex> = LazyLock::new(|| alternation(PURCHASE_TERMS, true));
static NON_PURCHASE_RE: LazyLock<Regex> = LazyLock::new(|| alternation(NON_PURCHASE_TERMS, true));

/// Why the filter let an email through or held it back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterVerdict {
    Proceed,
    NonPurchaseContent,
    NoAssetTerms,
    NoPurchaseAction,
}

impl FilterVerdict {
    pub fn is_skip(&self) -> bool {
        !matches!(self, FilterVerdict::Proceed)
    }

    pub fn reason(&self) -> &'static str {
        match self {
            FilterVerdict::Proceed => "passed keyword preprocessing",
            FilterVerdict::NonPurchaseContent => "contains marketing or informational content",
            FilterVerdict::NoAssetTerms => "no digital-asset or exchange terms found",
            FilterVerdict::NoPurchaseAction => "no transaction vocabulary found",
        }
    }
}

/// Whether the sender names a known exchange.
pub fn is_exchange_sender(sender: &str) -> bool {
    EXCHANGE_RE.is_match(sender)
}

/// Whether the text mentions any digital asset by name or ticker.
pub fn mentions_asset(text: &str) -> bool {
    ASSET_NAME_RE.is_match(text) || ASSET_TICKER_RE.is_match(text)
}

/// Keyword gate in front of the model calls. Exclusion always wins:
/// one marketing term is enough to skip, even alongside purchase terms.
pub fn decide(email: &Email) -> FilterVerdict {
    let full_text = format!("{} {} {}", email.subject, email.sender, email.body);

    if NON_PURCHASE_RE.is_match(&full_text) {
        return FilterVerdict::NonPurchaseContent;
    }

    if !is_exchange_sender(&email.sender) && !mentions_asset(&full_text) && !EXCHANGE_RE.is_match(&full_text) {
        return FilterVerdict::NoAssetTerms;
    }

    let content = format!("{} {}", email.subject, email.body);
    if !PURCHASE_RE.is_match(&content) {
        return FilterVerdict::NoPurchaseAction;
    }

    FilterVerdict::Proceed
}

pub fn should_skip(email: &Email) -> bool {
    let verdict = decide(email);
    if verdict.is_skip() {
        debug!(subject = %email.subject, reason = verdict.reason(), "Preprocessing skipped email");
    }
    verdict.is_skip()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tickers_are_case_sensitive() {
        assert!(mentions_asset("You received 2 SOL"));
        assert!(!mentions_asset("a sol y sombra"));
        assert!(mentions_asset("your Bitcoin wallet"));
    }

    #[test]
    fn multi_word_terms_tolerate_extra_whitespace() {
        let email = Email::new("Price  Alert: BTC", "alerts@coinbase.com", "", "BTC is up");
        assert_eq!(decide(&email), FilterVerdict::NonPurchaseContent);
    }

    #[test]
    fn exchange_domains_match_on_word_boundaries() {
        assert!(is_exchange_sender("Crypto.com <no-reply@crypto.com>"));
        assert!(is_exchange_sender("info@bitstamp.net"));
        assert!(!is_exchange_sender("hello@krakenfoods.example"));
    }
}
