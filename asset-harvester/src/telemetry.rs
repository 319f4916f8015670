use crate::config::Settings;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install the global subscriber. `RUST_LOG` wins over `settings.log_level`.
/// Safe to call more than once; later calls are no-ops.
pub fn init_tracing(settings: &Settings) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{},asset_harvester={}", settings.log_level, settings.log_level)));

    let result = if settings.log_json_output {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().json().with_target(true))
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().with_target(true))
            .try_init()
    };

    if result.is_ok() {
        tracing::info!(
            log_level = %settings.log_level,
            json_format = settings.log_json_output,
            provider = %settings.llm_provider,
            "Tracing initialized"
        );
    }
}
