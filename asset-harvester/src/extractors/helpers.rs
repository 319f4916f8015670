use crate::types::RawTransaction;
use regex::{Captures, Regex};

/// Trimmed text of `group` from the first match, if any.
pub(crate) fn find_match(re: &Regex, text: &str, group: usize) -> Option<String> {
    re.captures(text)
        .and_then(|caps| caps.get(group))
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Trimmed text of an optional capture group.
pub(crate) fn group(caps: &Captures<'_>, index: usize) -> Option<String> {
    caps.get(index)
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Drop thousands separators (and a sentence-ending period) so the value parses as a plain decimal.
pub(crate) fn clean_number(value: &str) -> String {
    value.replace(',', "").trim_end_matches('.').to_string()
}

/// Fiat code for a bare currency symbol. `dollar` is the vendor's locale for `$`.
pub(crate) fn symbol_to_currency(symbol: &str, dollar: &'static str) -> &'static str {
    match symbol {
        "$" => dollar,
        "€" => "EUR",
        "£" => "GBP",
        "¥" => "JPY",
        _ => dollar,
    }
}

/// Explicit code first, then the symbol, then the vendor default.
pub(crate) fn resolve_currency(
    code: Option<String>,
    symbol: Option<String>,
    dollar: &'static str,
    fallback: &'static str,
) -> String {
    if let Some(code) = code {
        return code.to_uppercase();
    }
    match symbol {
        Some(symbol) => symbol_to_currency(&symbol, dollar).to_string(),
        None => fallback.to_string(),
    }
}

/// Candidate from the usual `<amount> <SYM> for [symbol]<total> [CODE]` layout,
/// captured as groups 1 to 5 in that order.
pub(crate) fn priced_candidate(
    vendor: &str,
    caps: &Captures<'_>,
    dollar: &'static str,
    fallback: &'static str,
) -> Option<RawTransaction> {
    let amount = group(caps, 1)?;
    let symbol = group(caps, 2)?;
    let total_spent = group(caps, 4).map(|v| clean_number(&v));
    let currency = resolve_currency(group(caps, 5), group(caps, 3), dollar, fallback);
    Some(
        RawTransaction::regex(vendor, &clean_number(&amount), &symbol.to_uppercase())
            .with_total(total_spent, Some(currency)),
    )
}

pub(crate) fn sender_has(sender: &str, domain: &str) -> bool {
    sender.to_lowercase().contains(domain)
}

pub(crate) fn subject_mentions(subject: &str, phrases: &[&str]) -> bool {
    let subject = subject.to_lowercase();
    phrases.iter().any(|phrase| subject.contains(phrase))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn currency_resolution_prefers_explicit_code() {
        assert_eq!(resolve_currency(Some("usd".into()), Some("€".into()), "USD", "USD"), "USD");
        assert_eq!(resolve_currency(None, Some("€".into()), "USD", "USD"), "EUR");
        assert_eq!(resolve_currency(None, Some("$".into()), "AUD", "AUD"), "AUD");
        assert_eq!(resolve_currency(None, None, "USD", "CAD"), "CAD");
    }

    #[test]
    fn numbers_lose_thousands_separators() {
        assert_eq!(clean_number("35,000.00"), "35000.00");
        assert_eq!(clean_number("100.00."), "100.00");
    }
}
