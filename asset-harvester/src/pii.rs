use crate::preprocess::{ASSET_NAMES, ASSET_TICKERS, EXCHANGES};
use crate::utils::static_regex;
use regex::{Captures, Regex};
use std::collections::HashSet;
use std::sync::LazyLock;

static EMAIL: LazyLock<Regex> =
    LazyLock::new(|| static_regex(r"(?i)[a-z0-9._%+-]+@[a-z0-9.-]+\.[a-z]{2,}"));
static CREDIT_CARD: LazyLock<Regex> =
    LazyLock::new(|| static_regex(r"\b\d{4}[-\s]?\d{4}[-\s]?\d{4}[-\s]?\d{4}\b"));
static IP_ADDRESS: LazyLock<Regex> =
    LazyLock::new(|| static_regex(r"\b\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3}\b"));
static PHONE: LazyLock<Regex> =
    LazyLock::new(|| static_regex(r"(\+?\d{1,3}[-.\s]?)?\(?\d{3}\)?[-.\s]?\d{3}[-.\s]?\d{4,6}\b"));
static STREET_ADDRESS: LazyLock<Regex> = LazyLock::new(|| {
    static_regex(
        r"\b\d{1,5}\s+[A-Z][a-z]+(?:\s+[A-Z][a-z]+)*\s+(?i:Street|St|Avenue|Ave|Road|Rd|Boulevard|Blvd|Drive|Dr|Lane|Ln|Court|Ct|Circle|Cir|Way)\b",
    )
});
static GREETING_NAME: LazyLock<Regex> = LazyLock::new(|| {
    static_regex(r"\b(Hi|Dear|Hello|Greetings)\s+([A-Z][a-z]+(?:[ \t]+[A-Z][a-z]+){0,2})")
});

/// Masks personal data before email text is sent to a model.
#[derive(Debug, Clone)]
pub struct PiiScrubber {
    skip_terms: HashSet<String>,
}

impl PiiScrubber {
    pub fn new<I, S>(skip_terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            skip_terms: skip_terms.into_iter().map(|t| t.as_ref().to_lowercase()).collect(),
        }
    }

    /// Asset and exchange vocabulary is never masked.
    pub fn with_asset_vocabulary() -> Self {
        Self::new(EXCHANGES.iter().chain(ASSET_NAMES).chain(ASSET_TICKERS))
    }

    fn should_mask(&self, text: &str) -> bool {
        !self.skip_terms.contains(&text.trim().to_lowercase())
    }

    fn mask(&self, re: &Regex, text: &str, placeholder: &str) -> String {
        re.replace_all(text, |caps: &Captures<'_>| {
            if self.should_mask(&caps[0]) {
                placeholder.to_string()
            } else {
                caps[0].to_string()
            }
        })
        .into_owned()
    }

    pub fn scrub(&self, text: &str) -> String {
        if text.is_empty() {
            return String::new();
        }

        let text = self.mask(&EMAIL, text, "[EMAIL]");
        let text = CREDIT_CARD.replace_all(&text, "[CREDIT_CARD]").into_owned();
        let text = IP_ADDRESS.replace_all(&text, "[IP_ADDRESS]").into_owned();
        let text = self.mask(&PHONE, &text, "[PHONE]");
        let text = self.mask(&STREET_ADDRESS, &text, "[ADDRESS]");

        GREETING_NAME
            .replace_all(&text, |caps: &Captures<'_>| {
                if self.should_mask(&caps[2]) {
                    format!("{} [NAME]", &caps[1])
                } else {
                    caps[0].to_string()
                }
            })
            .into_owned()
    }
}

impl Default for PiiScrubber {
    fn default() -> Self {
        Self::with_asset_vocabulary()
    }
}
