//! Deterministic vendor extractors, tried before any model call.

mod binance;
mod bitfinex;
mod bitstamp;
mod btcmarkets;
mod coinbase;
mod coinspot;
mod cryptocom;
mod ftx;
mod gemini;
pub(crate) mod helpers;
mod independent_reserve;
mod kraken;
mod newton;
mod swyftx;

pub use binance::BinanceExtractor;
pub use bitfinex::BitfinexExtractor;
pub use bitstamp::BitstampExtractor;
pub use btcmarkets::BtcMarketsExtractor;
pub use coinbase::CoinbaseExtractor;
pub use coinspot::CoinSpotExtractor;
pub use cryptocom::CryptoComExtractor;
pub use ftx::FtxExtractor;
pub use gemini::GeminiExtractor;
pub use independent_reserve::IndependentReserveExtractor;
pub use kraken::KrakenExtractor;
pub use newton::NewtonExtractor;
pub use swyftx::SwyftxExtractor;

use crate::types::RawTransaction;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractorError {
    #[error("{vendor}: could not read number '{value}'")]
    Numeric { vendor: &'static str, value: String },

    #[error("{vendor}: {message}")]
    Malformed { vendor: &'static str, message: String },
}

/// One vendor's pattern set.
pub trait VendorExtractor: Send + Sync {
    fn vendor(&self) -> &'static str;

    /// Cheap check on the headers (and, rarely, the body). Always requires the vendor's sender domain.
    fn can_handle(&self, subject: &str, sender: &str, body: &str) -> bool;

    fn extract(
        &self,
        subject: &str,
        sender: &str,
        body: &str,
    ) -> Result<Vec<RawTransaction>, ExtractorError>;
}

/// Ordered list of extractors. The first one that both accepts an email and
/// yields candidates wins; results are never merged.
pub struct ExtractorRegistry {
    extractors: Vec<Box<dyn VendorExtractor>>,
}

impl ExtractorRegistry {
    pub fn new() -> Self {
        Self { extractors: Vec::new() }
    }

    pub fn with_default_extractors() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(CoinbaseExtractor));
        registry.register(Box::new(BinanceExtractor));
        registry.register(Box::new(KrakenExtractor));
        registry.register(Box::new(GeminiExtractor));
        registry.register(Box::new(CryptoComExtractor));
        registry.register(Box::new(FtxExtractor));
        registry.register(Box::new(CoinSpotExtractor));
        registry.register(Box::new(BitfinexExtractor));
        registry.register(Box::new(BitstampExtractor));
        registry.register(Box::new(BtcMarketsExtractor));
        registry.register(Box::new(IndependentReserveExtractor));
        registry.register(Box::new(NewtonExtractor));
        registry.register(Box::new(SwyftxExtractor));
        registry
    }

    /// Append an extractor at the lowest priority.
    pub fn register(&mut self, extractor: Box<dyn VendorExtractor>) {
        debug!("Registering extractor: {}", extractor.vendor());
        self.extractors.push(extractor);
    }

    pub fn vendors(&self) -> Vec<&'static str> {
        self.extractors.iter().map(|e| e.vendor()).collect()
    }

    pub fn len(&self) -> usize {
        self.extractors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.extractors.is_empty()
    }

    /// Candidates from the first extractor that matches, or `None`.
    pub fn extract(&self, subject: &str, sender: &str, body: &str) -> Option<Vec<RawTransaction>> {
        for extractor in &self.extractors {
            if !extractor.can_handle(subject, sender, body) {
                continue;
            }
            match extractor.extract(subject, sender, body) {
                Ok(candidates) if !candidates.is_empty() => {
                    debug!(
                        vendor = extractor.vendor(),
                        count = candidates.len(),
                        "Extractor matched"
                    );
                    return Some(candidates);
                }
                Ok(_) => continue,
                Err(e) => {
                    warn!("Extractor {} failed, trying the next one: {}", extractor.vendor(), e);
                    continue;
                }
            }
        }
        None
    }
}

impl Default for ExtractorRegistry {
    fn default() -> Self {
        Self::with_default_extractors()
    }
}
