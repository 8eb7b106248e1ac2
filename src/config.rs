use serde::Deserialize;

use crate::error::Result;

const CONFIG_FILE: &str = "aip-extract";
const DEFAULT_LAYOUT_URL: &str = "https://api.unstructuredapp.io/general/v0/general";

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub layout: LayoutSettings,
    #[serde(default)]
    pub batch: BatchSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LayoutSettings {
    pub api_url: String,
    pub api_key: Option<String>,
    pub strategy: String,
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub backoff_ms: u64,
}

impl Default for LayoutSettings {
    fn default() -> Self {
        LayoutSettings {
            api_url: DEFAULT_LAYOUT_URL.to_string(),
            api_key: None,
            strategy: "auto".to_string(),
            timeout_secs: 300,
            max_retries: 3,
            backoff_ms: 2000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BatchSettings {
    /// Documents handed to the thread pool per progress tick.
    pub chunk_size: usize,
}

impl Default for BatchSettings {
    fn default() -> Self {
        BatchSettings { chunk_size: 64 }
    }
}

impl Settings {
    /// Load `aip-extract.toml` (optional) overlaid with `AIP_*` env vars,
    /// e.g. `AIP_LAYOUT__API_KEY`.
    pub fn load() -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(CONFIG_FILE).required(false))
            .add_source(
                config::Environment::with_prefix("AIP")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;
        Ok(settings.try_deserialize()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_without_sources() {
        let settings: Settings = config::Config::builder()
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();
        assert_eq!(settings.layout.api_url, DEFAULT_LAYOUT_URL);
        assert_eq!(settings.layout.strategy, "auto");
        assert!(settings.layout.api_key.is_none());
        assert_eq!(settings.batch.chunk_size, 64);
    }

    #[test]
    fn overrides_nested_values() {
        let settings: Settings = config::Config::builder()
            .set_override("layout.api_key", "secret")
            .unwrap()
            .set_override("layout.max_retries", 5)
            .unwrap()
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();
        assert_eq!(settings.layout.api_key.as_deref(), Some("secret"));
        assert_eq!(settings.layout.max_retries, 5);
        assert_eq!(settings.layout.timeout_secs, 300);
    }
}
