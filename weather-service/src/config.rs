use anyhow::bail;
use serde::Deserialize;
use std::fs;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_connections: 8,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Directory of per-station `*.txt` feed files.
    pub wx_dir: String,
    pub batch_size: usize,
    /// Re-read the feed even when observations already exist.
    pub force: bool,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            wx_dir: "wx_data".to_string(),
            batch_size: 5000,
            force: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub bind_addr: String,
    pub default_page_size: i64,
    pub max_page_size: i64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8000".to_string(),
            default_page_size: 25,
            max_page_size: 500,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    pub bind_addr: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub ingest: IngestConfig,
    pub api: ApiConfig,
    pub metrics: Option<MetricsConfig>,
}

impl AppConfig {
    /// Load configuration from the TOML file named by `WEATHER_CONFIG`
    /// (default `weather-config.toml`), then apply environment overrides.
    ///
    /// A missing file is fine, everything has a default; a file that exists
    /// but does not parse is a fatal configuration fault. `DATABASE_URL`
    /// overrides `database.url` and `FORCE_INGEST` overrides `ingest.force`.
    pub fn load() -> anyhow::Result<Self> {
        use std::env;

        let path = env::var("WEATHER_CONFIG").unwrap_or_else(|_| "weather-config.toml".to_string());
        let mut cfg = match fs::read_to_string(&path) {
            Ok(contents) => Self::from_toml(&contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => AppConfig::default(),
            Err(e) => bail!("failed to read config file {path}: {e}"),
        };

        if let Ok(url) = env::var("DATABASE_URL") {
            cfg.database.url = url;
        }
        if let Ok(force) = env::var("FORCE_INGEST") {
            cfg.ingest.force = env_truthy(&force);
        }

        if cfg.database.url.is_empty() {
            bail!("database.url is not set; configure it in {path} or via DATABASE_URL");
        }

        Ok(cfg)
    }

    fn from_toml(contents: &str) -> anyhow::Result<Self> {
        let cfg: AppConfig = toml::from_str(contents)?;
        Ok(cfg)
    }
}

fn env_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "y"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_cover_everything_but_the_url() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.database.url, "");
        assert_eq!(cfg.database.max_connections, 8);
        assert_eq!(cfg.ingest.wx_dir, "wx_data");
        assert_eq!(cfg.ingest.batch_size, 5000);
        assert!(!cfg.ingest.force);
        assert_eq!(cfg.api.bind_addr, "0.0.0.0:8000");
        assert_eq!(cfg.api.default_page_size, 25);
        assert_eq!(cfg.api.max_page_size, 500);
        assert!(cfg.metrics.is_none());
    }

    #[test]
    fn partial_toml_falls_back_to_defaults() {
        let cfg = AppConfig::from_toml(
            r#"
            [database]
            url = "postgres://localhost/weather"

            [api]
            default_page_size = 50
            "#,
        )
        .unwrap();

        assert_eq!(cfg.database.url, "postgres://localhost/weather");
        assert_eq!(cfg.database.max_connections, 8);
        assert_eq!(cfg.api.default_page_size, 50);
        assert_eq!(cfg.api.max_page_size, 500);
        assert_eq!(cfg.ingest.batch_size, 5000);
    }

    #[test]
    fn metrics_section_is_opt_in() {
        let cfg = AppConfig::from_toml(
            r#"
            [metrics]
            bind_addr = "0.0.0.0:9100"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.metrics.unwrap().bind_addr, "0.0.0.0:9100");
    }

    #[test]
    fn malformed_toml_is_an_error() {
        assert!(AppConfig::from_toml("[database\nurl = 1").is_err());
    }

    #[test]
    fn env_truthy_accepts_common_spellings() {
        for v in ["1", "true", "TRUE", "yes", "Y", " true "] {
            assert!(env_truthy(v), "{v} should be truthy");
        }
        for v in ["0", "false", "no", "", "off"] {
            assert!(!env_truthy(v), "{v} should be falsy");
        }
    }
}
