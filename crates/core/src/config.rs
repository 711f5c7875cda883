use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

/// Root configuration. Loaded from an optional TOML/JSON file layered under
/// environment variables with the prefix `BEACON__`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct BeaconConfig {
    /// Per-tracker settings keyed by registered tracker name ("gtm", "sdk").
    /// Trackers without an entry stay uninitialized.
    #[serde(default)]
    pub trackers: BTreeMap<String, TrackerSettings>,
    #[serde(default)]
    pub polling: PollingConfig,
    #[serde(default)]
    pub product: ProductConfig,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct TrackerSettings {
    #[serde(default, alias = "trackingId")]
    pub tracking_id: Option<String>,
    #[serde(default)]
    pub proxy: bool,
    #[serde(default, alias = "proxyUrl")]
    pub proxy_url: Option<String>,
}

impl TrackerSettings {
    pub fn with_tracking_id(tracking_id: impl Into<String>) -> Self {
        Self {
            tracking_id: Some(tracking_id.into()),
            ..Default::default()
        }
    }
}

/// Bounded polling policy for data-layer waits.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
pub struct PollingConfig {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
}

impl PollingConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    /// Upper bound on how long a single wait can take.
    pub fn budget(&self) -> Duration {
        self.interval() * self.max_retries
    }
}

/// Fixed product metadata stamped onto every page-view record.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct ProductConfig {
    #[serde(default = "default_product_name")]
    pub name: String,
    #[serde(default = "default_product_platform")]
    pub platform: String,
    #[serde(default = "default_product_version")]
    pub version: String,
    #[serde(default = "default_person_id_type")]
    pub person_id_type: String,
}

// Default functions
fn default_max_retries() -> u32 {
    20
}
fn default_interval_ms() -> u64 {
    200
}
fn default_product_name() -> String {
    "courseware".to_string()
}
fn default_product_platform() -> String {
    "web".to_string()
}
fn default_product_version() -> String {
    "1.0".to_string()
}
fn default_person_id_type() -> String {
    "learner_id".to_string()
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            interval_ms: default_interval_ms(),
        }
    }
}

impl Default for ProductConfig {
    fn default() -> Self {
        Self {
            name: default_product_name(),
            platform: default_product_platform(),
            version: default_product_version(),
            person_id_type: default_person_id_type(),
        }
    }
}

impl BeaconConfig {
    /// Load configuration from an optional file and environment variables.
    pub fn load(path: Option<&Path>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path));
        }
        let builder = builder.add_source(
            config::Environment::with_prefix("BEACON")
                .separator("__")
                .try_parsing(true),
        );

        builder.build()?.try_deserialize()
    }

    /// Parse configuration from an inline TOML document.
    pub fn from_toml(source: &str) -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::File::from_str(source, config::FileFormat::Toml))
            .build()?
            .try_deserialize()
    }

    pub fn tracker(&self, name: &str) -> Option<&TrackerSettings> {
        self.trackers.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = BeaconConfig::default();
        assert!(config.trackers.is_empty());
        assert_eq!(config.polling.max_retries, 20);
        assert_eq!(config.polling.interval(), Duration::from_millis(200));
        assert_eq!(config.polling.budget(), Duration::from_secs(4));
        assert_eq!(config.product.person_id_type, "learner_id");
    }

    #[test]
    fn test_from_toml() {
        let config = BeaconConfig::from_toml(
            r#"
            [trackers.gtm]
            tracking_id = "GTM-ABC1234"
            proxy = true
            proxy_url = "https://collect.example.com"

            [trackers.sdk]
            proxy = false

            [polling]
            max_retries = 5
            "#,
        )
        .unwrap();

        let gtm = config.tracker("gtm").unwrap();
        assert_eq!(gtm.tracking_id.as_deref(), Some("GTM-ABC1234"));
        assert!(gtm.proxy);
        assert_eq!(gtm.proxy_url.as_deref(), Some("https://collect.example.com"));
        assert_eq!(config.tracker("sdk"), Some(&TrackerSettings::default()));
        assert!(config.tracker("ga").is_none());
        assert_eq!(config.polling.max_retries, 5);
        assert_eq!(config.polling.interval_ms, 200);
        assert_eq!(config.product.name, "courseware");
    }
}
