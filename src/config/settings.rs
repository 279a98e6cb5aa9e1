use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;

/// Runtime settings for the notification subsystem.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub delivery: DeliveryConfig,
}

/// Knobs for batch delivery.
#[derive(Debug, Clone, Deserialize)]
pub struct DeliveryConfig {
    /// Upper bound on in-flight emissions when a batch fans out in parallel.
    #[serde(default = "default_max_concurrent_emits")]
    pub max_concurrent_emits: usize,
}

fn default_max_concurrent_emits() -> usize {
    16
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            max_concurrent_emits: default_max_concurrent_emits(),
        }
    }
}

impl Settings {
    /// Load settings from optional config files and the environment.
    ///
    /// Layering matches the service convention: defaults, then
    /// `config/default`, then `config/<RUN_MODE>`, then environment
    /// variables (`DELIVERY__MAX_CONCURRENT_EMITS`, ...).
    pub fn new() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();

        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let builder = Config::builder()
            .set_default("delivery.max_concurrent_emits", 16)?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{run_mode}")).required(false))
            // Double underscore keeps multi-word keys intact.
            .add_source(Environment::default().separator("__").try_parsing(true));

        builder.build()?.try_deserialize()
    }
}
