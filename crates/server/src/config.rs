//! Runtime configuration read from the environment (and `.env`, loaded in `main`).

use std::{path::PathBuf, str::FromStr, time::Duration};

use thiserror::Error;
use url::Url;
use utils::assets::{database_path, uploads_dir};

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 3001;
const DEFAULT_MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;
const DEFAULT_PAYMENT_TERMS_DAYS: i64 = 30;
const DEFAULT_ESTIMATE_VALIDITY_DAYS: i64 = 30;
const DEFAULT_MAINTENANCE_INTERVAL_SECS: u64 = 3600;
const DEFAULT_ACTIVITY_RETENTION_DAYS: i64 = 365;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name}={value:?} is invalid: {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub upload_dir: PathBuf,
    pub max_upload_bytes: u64,
    /// Base of the links handed out by share endpoints
    pub public_base_url: String,
    pub default_payment_terms_days: i64,
    pub estimate_validity_days: i64,
    pub maintenance_interval: Duration,
    pub activity_retention_days: i64,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let host = var("HOST").unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = parse(&var, "PORT", DEFAULT_PORT)?;
        let database_url = var("DATABASE_URL")
            .unwrap_or_else(|| format!("sqlite://{}", database_path().to_string_lossy()));
        let upload_dir = var("UPLOAD_DIR").map(PathBuf::from).unwrap_or_else(uploads_dir);

        let public_base_url = var("PUBLIC_BASE_URL").unwrap_or_else(|| format!("http://{}:{}", host, port));
        if let Err(e) = Url::parse(&public_base_url) {
            return Err(ConfigError::Invalid {
                name: "PUBLIC_BASE_URL",
                value: public_base_url,
                reason: e.to_string(),
            });
        }

        let config = Self {
            max_upload_bytes: positive(&var, "MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES)?,
            default_payment_terms_days: non_negative(&var, "DEFAULT_PAYMENT_TERMS_DAYS", DEFAULT_PAYMENT_TERMS_DAYS)?,
            estimate_validity_days: non_negative(&var, "ESTIMATE_VALIDITY_DAYS", DEFAULT_ESTIMATE_VALIDITY_DAYS)?,
            maintenance_interval: Duration::from_secs(positive(
                &var,
                "MAINTENANCE_INTERVAL_SECS",
                DEFAULT_MAINTENANCE_INTERVAL_SECS,
            )?),
            activity_retention_days: positive(&var, "ACTIVITY_RETENTION_DAYS", DEFAULT_ACTIVITY_RETENTION_DAYS)?,
            host,
            port,
            database_url,
            upload_dir,
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        };
        Ok(config)
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse<T>(var: &impl Fn(&str) -> Option<String>, name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match var(name) {
        None => Ok(default),
        Some(value) => value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            name,
            reason: e.to_string(),
            value,
        }),
    }
}

fn positive<T>(var: &impl Fn(&str) -> Option<String>, name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr + PartialOrd + Default + ToString,
    T::Err: std::fmt::Display,
{
    let value = parse(var, name, default)?;
    if value <= T::default() {
        return Err(ConfigError::Invalid {
            name,
            value: value.to_string(),
            reason: "must be greater than zero".to_string(),
        });
    }
    Ok(value)
}

fn non_negative(var: &impl Fn(&str) -> Option<String>, name: &'static str, default: i64) -> Result<i64, ConfigError> {
    let value = parse(var, name, default)?;
    if value < 0 {
        return Err(ConfigError::Invalid {
            name,
            value: value.to_string(),
            reason: "must be zero or greater".to_string(),
        });
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults() {
        let config = config(&[]).unwrap();
        assert_eq!(config.bind_addr(), "127.0.0.1:3001");
        assert_eq!(config.public_base_url, "http://127.0.0.1:3001");
        assert_eq!(config.max_upload_bytes, 10 * 1024 * 1024);
        assert_eq!(config.default_payment_terms_days, 30);
        assert_eq!(config.maintenance_interval, Duration::from_secs(3600));
        assert_eq!(config.activity_retention_days, 365);
        assert!(config.database_url.starts_with("sqlite://"));
    }

    #[test]
    fn overrides_and_trailing_slash() {
        let config = config(&[
            ("PORT", "8080"),
            ("PUBLIC_BASE_URL", "https://office.example.com/"),
            ("DEFAULT_PAYMENT_TERMS_DAYS", "0"),
            ("UPLOAD_DIR", "/var/lib/backoffice/uploads"),
        ])
        .unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.public_base_url, "https://office.example.com");
        assert_eq!(config.default_payment_terms_days, 0);
        assert_eq!(config.upload_dir, PathBuf::from("/var/lib/backoffice/uploads"));
    }

    #[test]
    fn invalid_values_name_the_variable() {
        let err = config(&[("PORT", "eighty")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "PORT", .. }));

        let err = config(&[("MAX_UPLOAD_BYTES", "0")]).unwrap_err();
        assert!(err.to_string().contains("must be greater than zero"));

        let err = config(&[("PUBLIC_BASE_URL", "not a url")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "PUBLIC_BASE_URL", .. }));
    }
}
