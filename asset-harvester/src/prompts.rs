use crate::utils::static_regex;
use interfaces::defs::Email;
use regex::{Captures, Regex};
use std::collections::HashMap;
use std::sync::LazyLock;

pub const CLASSIFICATION: &str = "classification";
pub const EXTRACTION: &str = "extraction";

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| static_regex(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}"));

const CLASSIFICATION_TEMPLATE: &str = r#"You are an expert at analyzing cryptocurrency transaction emails. Determine if the following email content represents an ACTUAL cryptocurrency transaction (a purchase, deposit, withdrawal or staking reward), not marketing, news or other non-transactional content.

EMAIL CONTENT:
${email_content}

ANALYSIS CRITERIA:
- Look for ACTUAL purchase/buy transactions, order confirmations, trade executions, deposits, withdrawals or staking rewards/distributions
- Cryptocurrency exchanges: Coinbase, Binance, Kraken, Gemini, etc.
- Transaction indicators: "bought", "purchased", "order filled", "transaction completed", "payment processed", "staking reward", "earned", "distribution confirmation"
- Specific amounts and cryptocurrency names (Bitcoin, Ethereum, BTC, ETH, etc.)
- Transaction IDs, order numbers, or confirmation codes

EXCLUDE these types of emails:
- Marketing emails, newsletters, promotional content
- Price alerts, market analysis, or news updates
- Account notifications, security alerts, or general announcements
- Educational content, blog posts, or webinars
- Referral programs, contests, or airdrops
- Failed transactions or declined orders

Return a JSON object with this exact structure:
{
    "is_crypto_purchase": boolean,
    "confidence": float (0.0 to 1.0),
    "reasoning": "Brief explanation of your decision"
}
"#;

const EXTRACTION_TEMPLATE: &str = r#"You are an expert at extracting cryptocurrency transaction details from emails. Analyze the following email content and extract every transaction it describes.

EMAIL CONTENT:
${email_content}

EXTRACTION INSTRUCTIONS:
For each transaction extract:

1. TRANSACTION_TYPE: one of "buy", "deposit", "withdrawal", "staking_reward"
2. TOTAL_SPENT: the exact amount of fiat currency paid (look for "Total:", "Amount charged:", "You paid:", "Cost:")
3. CURRENCY: the fiat currency code (USD, EUR, GBP, CAD, AUD, etc.)
4. AMOUNT: the exact quantity of cryptocurrency received or moved (not the fiat amount)
5. ITEM_NAME: the cryptocurrency symbol or name exactly as written (BTC, Bitcoin, ETH, ...)
6. VENDOR: the exchange or platform name (Coinbase, Binance, Kraken, ...)
7. PURCHASE_DATE: the transaction timestamp, falling back to the email date
8. TRANSACTION_ID: order number, reference or transaction id, if present
9. FEE_AMOUNT / FEE_CURRENCY: any fee charged, if present

EXTRACTION EXAMPLES:
- "You bought 0.001 BTC for $25.00 USD" -> total_spent: 25.00, currency: "USD", amount: 0.001, item_name: "BTC", transaction_type: "buy"
- "Binance - Deposit Successful - You've received 0.1 BTC" -> total_spent: null, currency: null, amount: 0.1, item_name: "BTC", transaction_type: "deposit"
- "You just earned 0.0001 ETH in staking rewards" -> total_spent: null, currency: null, amount: 0.0001, item_name: "ETH", transaction_type: "staking_reward"
- A trade confirmation listing BTC and ETH fills -> two entries in "transactions"

IMPORTANT RULES:
- Extract EXACT numerical values, don't round or estimate
- Use null for any field you cannot determine with confidence
- If timezone is missing, assume ${default_timezone}

Return JSON with this exact structure:
{
    "transactions": [
        {
            "transaction_type": "buy" | "deposit" | "withdrawal" | "staking_reward",
            "total_spent": float or null,
            "currency": string or null,
            "amount": float or null,
            "item_name": string or null,
            "vendor": string or null,
            "purchase_date": string or null,
            "transaction_id": string or null,
            "fee_amount": float or null,
            "fee_currency": string or null,
            "confidence": float (0.0 to 1.0),
            "extraction_notes": "Any relevant notes about extraction quality or concerns"
        }
    ]
}

If the email describes no transaction, return {"transactions": []}.
"#;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    pub name: String,
    pub text: String,
}

impl PromptTemplate {
    pub fn new(name: &str, text: &str) -> Self {
        Self {
            name: name.to_string(),
            text: text.to_string(),
        }
    }

    /// Fill `${name}` placeholders. Unknown placeholders are left as they are.
    pub fn render(&self, context: &HashMap<&str, &str>) -> String {
        PLACEHOLDER
            .replace_all(&self.text, |caps: &Captures<'_>| match context.get(&caps[1]) {
                Some(value) => value.to_string(),
                None => caps[0].to_string(),
            })
            .into_owned()
    }
}

#[derive(Debug, Clone)]
pub struct PromptLibrary {
    templates: HashMap<String, PromptTemplate>,
}

impl PromptLibrary {
    pub fn new() -> Self {
        Self {
            templates: HashMap::new(),
        }
    }

    pub fn register(&mut self, name: &str, text: &str) {
        self.templates.insert(name.to_string(), PromptTemplate::new(name, text));
    }

    pub fn get(&self, name: &str) -> Option<&PromptTemplate> {
        self.templates.get(name)
    }

    /// Render a registered template. `None` if nothing is registered under `name`.
    pub fn render(&self, name: &str, context: &HashMap<&str, &str>) -> Option<String> {
        self.get(name).map(|template| template.render(context))
    }
}

impl Default for PromptLibrary {
    fn default() -> Self {
        let mut library = Self::new();
        library.register(CLASSIFICATION, CLASSIFICATION_TEMPLATE);
        library.register(EXTRACTION, EXTRACTION_TEMPLATE);
        library
    }
}

/// Headers and body in the shape the templates expect.
pub fn email_content(email: &Email) -> String {
    format!(
        "From: {}\nSubject: {}\nDate: {}\n\n{}",
        email.sender, email.subject, email.date, email.body
    )
}
