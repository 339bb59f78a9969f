use std::{env, time::Duration};

use url::Url;

use super::env::{AppConfig, ClassifierConfig, ConfigError, DirectoryConfig, LoggingConfig};

pub fn load_config() -> Result<AppConfig, ConfigError> {
    AppConfig::from_env()
}

impl AppConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Self::from_source(|key| env::var(key).ok())
    }

    fn from_source(get: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |key: &str| get(key).filter(|v| !v.trim().is_empty());

        let raw_url =
            var("CLASSIFIER_API_URL").ok_or(ConfigError::Missing("CLASSIFIER_API_URL"))?;
        let classifier = ClassifierConfig {
            base_url: parse_base_url(raw_url.trim())?,
            timeout: Duration::from_millis(parse_or(
                var("CLASSIFIER_TIMEOUT_MS"),
                "CLASSIFIER_TIMEOUT_MS",
                10_000u64,
            )?),
        };

        let default_threshold = parse_or(var("DEFAULT_THRESHOLD"), "DEFAULT_THRESHOLD", 0.6f64)?;
        if !(0.0..=1.0).contains(&default_threshold) {
            return Err(ConfigError::Invalid {
                key: "DEFAULT_THRESHOLD",
                reason: format!("{default_threshold} is outside 0.0..=1.0"),
            });
        }

        let directories = DirectoryConfig {
            logs_dir: var("LOGS_DIR").unwrap_or_else(|| "logs".to_string()),
            data_dir: var("DATA_DIR").unwrap_or_else(|| "data".to_string()),
            db_filename: var("DB_FILENAME").unwrap_or_else(|| "predictions.db".to_string()),
        };

        let logging = LoggingConfig {
            level: var("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
        };

        let timezone = var("DISPLAY_TIMEZONE").unwrap_or_else(|| "UTC".to_string());

        Ok(Self {
            classifier,
            default_threshold,
            directories,
            logging,
            timezone,
        })
    }
}

fn parse_base_url(raw: &str) -> Result<Url, ConfigError> {
    let invalid = |reason: String| ConfigError::Invalid {
        key: "CLASSIFIER_API_URL",
        reason,
    };
    let mut url = Url::parse(raw).map_err(|err| invalid(err.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme {}", url.scheme())));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url.set_query(None);
    Ok(url)
}

fn parse_or<T: std::str::FromStr>(
    value: Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match value {
        None => Ok(default),
        Some(raw) => raw.trim().parse::<T>().map_err(|_| ConfigError::Invalid {
            key,
            reason: format!("cannot parse {raw:?}"),
        }),
    }
}
