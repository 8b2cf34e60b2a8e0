use std::env;
use std::fmt;

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing environment variable '{0}'")]
    Missing(&'static str),
    #[error("Invalid {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub db_pool_size: u32,
    pub payment_gateway_secret: String,
}

impl AppConfig {
    /// Reads the process environment after loading `.env` if present.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &'static str| {
            lookup(name)
                .filter(|v| !v.trim().is_empty())
                .ok_or(ConfigError::Missing(name))
        };

        let port = match lookup("PORT") {
            Some(raw) => raw.trim().parse::<u16>().map_err(|e| ConfigError::Invalid {
                name: "PORT",
                reason: e.to_string(),
            })?,
            None => 8080,
        };
        let db_pool_size = match lookup("DB_POOL_SIZE") {
            Some(raw) => raw
                .trim()
                .parse::<u32>()
                .ok()
                .filter(|size| *size > 0)
                .ok_or_else(|| ConfigError::Invalid {
                    name: "DB_POOL_SIZE",
                    reason: format!("'{raw}' is not a positive integer"),
                })?,
            None => 10,
        };

        Ok(Self {
            database_url: required("DATABASE_URL")?,
            host: lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port,
            db_pool_size,
            payment_gateway_secret: required("PAYMENT_GATEWAY_SECRET")?,
        })
    }
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("database_url", &"<redacted>")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("db_pool_size", &self.db_pool_size)
            .field("payment_gateway_secret", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|name| vars.get(name).cloned())
    }

    const REQUIRED: [(&str, &str); 2] = [
        ("DATABASE_URL", "postgres://localhost/orders"),
        ("PAYMENT_GATEWAY_SECRET", "whsec_123"),
    ];

    #[test]
    fn defaults_apply_when_optional_vars_absent() {
        let config = load(&REQUIRED).expect("config should load");

        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 8080);
        assert_eq!(config.db_pool_size, 10);
        assert_eq!(config.payment_gateway_secret, "whsec_123");
    }

    #[test]
    fn overrides_are_parsed() {
        let mut vars = REQUIRED.to_vec();
        vars.extend([("HOST", "127.0.0.1"), ("PORT", "9090"), ("DB_POOL_SIZE", "3")]);

        let config = load(&vars).expect("config should load");

        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 9090);
        assert_eq!(config.db_pool_size, 3);
    }

    #[test]
    fn missing_or_blank_secret_is_rejected() {
        assert_eq!(
            load(&REQUIRED[..1]).unwrap_err(),
            ConfigError::Missing("PAYMENT_GATEWAY_SECRET")
        );
        assert_eq!(
            load(&[REQUIRED[0], ("PAYMENT_GATEWAY_SECRET", "  ")]).unwrap_err(),
            ConfigError::Missing("PAYMENT_GATEWAY_SECRET")
        );
        assert_eq!(load(&REQUIRED[1..]).unwrap_err(), ConfigError::Missing("DATABASE_URL"));
    }

    #[test]
    fn malformed_numbers_are_invalid() {
        let mut bad_port = REQUIRED.to_vec();
        bad_port.push(("PORT", "eighty"));
        assert!(matches!(load(&bad_port), Err(ConfigError::Invalid { name: "PORT", .. })));

        let mut zero_pool = REQUIRED.to_vec();
        zero_pool.push(("DB_POOL_SIZE", "0"));
        assert!(matches!(
            load(&zero_pool),
            Err(ConfigError::Invalid { name: "DB_POOL_SIZE", .. })
        ));
    }

    #[test]
    fn debug_output_redacts_secrets() {
        let rendered = format!("{:?}", load(&REQUIRED).unwrap());
        assert!(!rendered.contains("whsec_123"));
        assert!(!rendered.contains("postgres://"));
    }
}
