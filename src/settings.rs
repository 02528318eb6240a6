use std::path::PathBuf;

use serde::Deserialize;

use crate::statistics::ranking::{DEFAULT_MIN_RATINGS, DEFAULT_PRIOR_WEIGHT, DEFAULT_TOP_LIMIT};
use crate::store::json::DEFAULT_DOCUMENT;

const CONFIG_FILE_ENV: &str = "LIBRARY_CONFIG";
const DEFAULT_CONFIG_FILE: &str = "library.toml";
const ENV_PREFIX: &str = "LIBRARY";

/// Top-level configuration loaded from layered sources.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub storage: StorageSettings,
    #[serde(default)]
    pub log: LogSettings,
    #[serde(default)]
    pub analytics: AnalyticsSettings,
}

impl Settings {
    /// Layers `.env`, the config file (`library.toml` or `$LIBRARY_CONFIG`),
    /// then `LIBRARY_*` environment variables, with `__` between nesting levels
    /// (`LIBRARY_STORAGE__PATH`, `LIBRARY_ANALYTICS__TOP_LIMIT`).
    pub fn load() -> Result<Self, config::ConfigError> {
        // A missing `.env` is fine.
        let _ = dotenvy::dotenv();

        let config_path = std::env::var(CONFIG_FILE_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_FILE));

        Self::from_sources(
            config::Config::builder()
                .add_source(config::File::from(config_path).required(false))
                .add_source(
                    config::Environment::with_prefix(ENV_PREFIX)
                        .prefix_separator("_")
                        .separator("__")
                        .try_parsing(true),
                ),
        )
    }

    fn from_sources(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<Self, config::ConfigError> {
        builder.build()?.try_deserialize()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageSettings {
    #[serde(default = "StorageSettings::default_path")]
    pub path: PathBuf,
}

impl StorageSettings {
    fn default_path() -> PathBuf {
        PathBuf::from(DEFAULT_DOCUMENT)
    }
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            path: Self::default_path(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogSettings {
    /// `tracing_subscriber::EnvFilter` directive, overridden by `RUST_LOG`.
    #[serde(default = "LogSettings::default_filter")]
    pub filter: String,
}

impl LogSettings {
    fn default_filter() -> String {
        "info".to_string()
    }
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            filter: Self::default_filter(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnalyticsSettings {
    #[serde(default = "AnalyticsSettings::default_min_ratings")]
    pub min_ratings: u64,
    #[serde(default = "AnalyticsSettings::default_top_limit")]
    pub top_limit: usize,
    #[serde(default = "AnalyticsSettings::default_prior_weight")]
    pub prior_weight: f64,
    #[serde(default = "AnalyticsSettings::default_chart_dir")]
    pub chart_dir: PathBuf,
}

impl AnalyticsSettings {
    fn default_min_ratings() -> u64 {
        DEFAULT_MIN_RATINGS
    }

    fn default_top_limit() -> usize {
        DEFAULT_TOP_LIMIT
    }

    fn default_prior_weight() -> f64 {
        DEFAULT_PRIOR_WEIGHT
    }

    fn default_chart_dir() -> PathBuf {
        PathBuf::from(".")
    }
}

impl Default for AnalyticsSettings {
    fn default() -> Self {
        Self {
            min_ratings: Self::default_min_ratings(),
            top_limit: Self::default_top_limit(),
            prior_weight: Self::default_prior_weight(),
            chart_dir: Self::default_chart_dir(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::{Config, File, FileFormat};

    #[test]
    fn test_default_storage_path_is_books_json() {
        let settings = Settings::default();
        assert_eq!(settings.storage.path, PathBuf::from("books.json"));
        assert_eq!(settings.log.filter, "info");
        assert_eq!(settings.analytics.min_ratings, 1000);
        assert_eq!(settings.analytics.top_limit, 10);
    }

    #[test]
    fn test_empty_sources_fall_back_to_defaults() {
        let settings = Settings::from_sources(Config::builder()).unwrap();
        assert_eq!(settings.storage.path, PathBuf::from("books.json"));
        assert_eq!(settings.analytics.prior_weight, 50.0);
    }

    #[test]
    fn test_file_values_override_defaults() {
        let toml = r#"
            [storage]
            path = "/tmp/shelf.json"

            [analytics]
            top_limit = 3
        "#;
        let builder = Config::builder().add_source(File::from_str(toml, FileFormat::Toml));
        let settings = Settings::from_sources(builder).unwrap();
        assert_eq!(settings.storage.path, PathBuf::from("/tmp/shelf.json"));
        assert_eq!(settings.analytics.top_limit, 3);
        assert_eq!(settings.analytics.min_ratings, 1000);
        assert_eq!(settings.log.filter, "info");
    }
}
