//! Application configuration management.
//!
//! This module handles loading configuration from environment variables.
//! It uses the `envy` crate to automatically deserialize environment variables into a type-safe struct.

use std::time::Duration;

use serde::Deserialize;

/// Application configuration loaded from environment variables.
///
/// # Environment Variables
///
/// - `DATABASE_URL` (required): PostgreSQL connection string
/// - `SERVER_PORT` (optional): HTTP server port, defaults to 8082
/// - `DB_MAX_CONNECTIONS` (optional): pool size, defaults to 5
/// - `DB_TIMEOUT_SECS` (optional): per-call database deadline, defaults to 3
/// - `TOKEN_TTL_HOURS` (optional): lifetime of a login token, defaults to 24
/// - `TOKEN_REAP_INTERVAL_SECS` (optional): expired-token purge interval, 0 disables, defaults to 3600
/// - `CORS_ALLOWED_ORIGINS` (optional): comma separated origin list, any origin when unset
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database_url: String,

    #[serde(default = "default_port")]
    pub server_port: u16,

    #[serde(default = "default_max_connections")]
    pub db_max_connections: u32,

    #[serde(default = "default_timeout_secs")]
    pub db_timeout_secs: u64,

    #[serde(default = "default_token_ttl_hours")]
    pub token_ttl_hours: i64,

    #[serde(default = "default_reap_interval_secs")]
    pub token_reap_interval_secs: u64,

    #[serde(default)]
    pub cors_allowed_origins: Option<String>,
}

fn default_port() -> u16 {
    8082
}

fn default_max_connections() -> u32 {
    5
}

fn default_timeout_secs() -> u64 {
    3
}

fn default_token_ttl_hours() -> i64 {
    24
}

fn default_reap_interval_secs() -> u64 {
    3600
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// This method first attempts to load a `.env` file (which is optional),
    /// then reads environment variables and deserializes them into a Config struct.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Required environment variables are missing (e.g., DATABASE_URL)
    /// - Environment variable values cannot be parsed into expected types
    pub fn from_env() -> Result<Self, envy::Error> {
        // Try to load .env file if it exists (does nothing if not found)
        dotenvy::dotenv().ok();

        // Field names are automatically converted: database_url -> DATABASE_URL
        envy::from_env::<Config>()
    }

    pub fn db_timeout(&self) -> Duration {
        Duration::from_secs(self.db_timeout_secs)
    }

    pub fn token_ttl(&self) -> chrono::Duration {
        chrono::Duration::hours(self.token_ttl_hours)
    }

    /// `None` when the reaper is switched off.
    pub fn token_reap_interval(&self) -> Option<Duration> {
        (self.token_reap_interval_secs > 0).then(|| Duration::from_secs(self.token_reap_interval_secs))
    }

    /// Parsed `CORS_ALLOWED_ORIGINS`, empty when unset.
    pub fn cors_origins(&self) -> Vec<String> {
        self.cors_allowed_origins
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(str::to_string)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn defaults_apply_when_only_database_url_is_set() {
        let config: Config =
            envy::from_iter(vars(&[("DATABASE_URL", "postgres://localhost/blog")])).unwrap();

        assert_eq!(config.server_port, 8082);
        assert_eq!(config.db_max_connections, 5);
        assert_eq!(config.db_timeout(), Duration::from_secs(3));
        assert_eq!(config.token_ttl(), chrono::Duration::hours(24));
        assert_eq!(config.token_reap_interval(), Some(Duration::from_secs(3600)));
        assert!(config.cors_origins().is_empty());
    }

    #[test]
    fn missing_database_url_is_an_error() {
        let result = envy::from_iter::<_, Config>(vars(&[("SERVER_PORT", "9000")]));
        assert!(result.is_err());
    }

    #[test]
    fn zero_reap_interval_disables_reaper() {
        let config: Config = envy::from_iter(vars(&[
            ("DATABASE_URL", "postgres://localhost/blog"),
            ("TOKEN_REAP_INTERVAL_SECS", "0"),
        ]))
        .unwrap();

        assert_eq!(config.token_reap_interval(), None);
    }

    #[test]
    fn cors_origins_are_split_and_trimmed() {
        let config: Config = envy::from_iter(vars(&[
            ("DATABASE_URL", "postgres://localhost/blog"),
            ("CORS_ALLOWED_ORIGINS", "http://localhost:8081, https://blog.example.com,"),
        ]))
        .unwrap();

        assert_eq!(
            config.cors_origins(),
            vec!["http://localhost:8081", "https://blog.example.com"]
        );
    }
}
