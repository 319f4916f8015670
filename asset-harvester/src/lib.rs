pub mod assets;
pub mod config;
pub mod dates;
pub mod dedup;
pub mod extractors;
pub mod llm;
pub mod metrics;
pub mod output;
pub mod pii;
pub mod pipeline;
pub mod preprocess;
pub mod prompts;
pub mod stages;
pub mod telemetry;
pub mod types;
pub mod utils;
pub mod validation;

pub use config::{ConfigError, Settings, SettingsLoader};
pub use dedup::DedupIndex;
pub use extractors::{ExtractorRegistry, VendorExtractor};
pub use llm::{build_gateway, GenerateOptions, LlmError, LlmGateway, ProviderError};
pub use metrics::MetricsTracker;
pub use output::{export_fields, JsonFileSink};
pub use pipeline::{BatchSummary, Harvester, ProgressCallback};
pub use preprocess::FilterVerdict;
pub use types::*;
pub use validation::{PurchaseValidator, ValidationIssue, ValidationPolicy};
