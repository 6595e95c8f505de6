//! Application configuration management.
//!
//! This module handles loading configuration from environment variables.
//! It uses the `envy` crate to deserialize environment variables into a type-safe struct.

use serde::Deserialize;

/// Application configuration loaded from environment variables.
///
/// # Environment Variables
///
/// - `DATABASE_URL` (required): PostgreSQL connection string
/// - `SERVER_PORT` (optional): HTTP server port, defaults to 3000
/// - `DB_MAX_CONNECTIONS` (optional): pool size, defaults to 5
/// - `DEFAULT_CREDIT_LIMIT_CENTS` (optional): credit limit for new customers, defaults to 50000
/// - `DEFAULT_GRACE_PERIOD_DAYS` (optional): grace period for new customers, defaults to 7
/// - `OVERDUE_THRESHOLD_DAYS` (optional): age at which debt counts as overdue, defaults to 30
/// - `RECENT_CUSTOMERS_LIMIT` (optional): size of the "recent" customer list, defaults to 4
/// - `SEED_DEMO_DATA` (optional): seed demo records into an empty database, defaults to false
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database_url: String,

    #[serde(default = "default_port")]
    pub server_port: u16,

    #[serde(default = "default_max_connections")]
    pub db_max_connections: u32,

    #[serde(default = "default_credit_limit_cents")]
    pub default_credit_limit_cents: i64,

    #[serde(default = "default_grace_period_days")]
    pub default_grace_period_days: i32,

    #[serde(default = "default_overdue_threshold_days")]
    pub overdue_threshold_days: i64,

    #[serde(default = "default_recent_customers_limit")]
    pub recent_customers_limit: i64,

    #[serde(default)]
    pub seed_demo_data: bool,
}

fn default_port() -> u16 {
    3000
}

fn default_max_connections() -> u32 {
    5
}

fn default_credit_limit_cents() -> i64 {
    50_000
}

fn default_grace_period_days() -> i32 {
    7
}

fn default_overdue_threshold_days() -> i64 {
    30
}

fn default_recent_customers_limit() -> i64 {
    4
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
        dotenvy::dotenv().ok();

        // Field names are converted: database_url -> DATABASE_URL
        envy::from_env::<Config>()
    }

    /// Configuration with every optional value at its default.
    pub fn with_database_url(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            server_port: default_port(),
            db_max_connections: default_max_connections(),
            default_credit_limit_cents: default_credit_limit_cents(),
            default_grace_period_days: default_grace_period_days(),
            overdue_threshold_days: default_overdue_threshold_days(),
            recent_customers_limit: default_recent_customers_limit(),
            seed_demo_data: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn optional_values_fall_back_to_defaults() {
        let vars = vec![(
            "DATABASE_URL".to_string(),
            "postgres://localhost/pharmacy".to_string(),
        )];
        let config: Config = envy::from_iter(vars).unwrap();

        assert_eq!(config.server_port, 3000);
        assert_eq!(config.db_max_connections, 5);
        assert_eq!(config.default_credit_limit_cents, 50_000);
        assert_eq!(config.default_grace_period_days, 7);
        assert_eq!(config.overdue_threshold_days, 30);
        assert_eq!(config.recent_customers_limit, 4);
        assert!(!config.seed_demo_data);
    }

    #[test]
    fn values_are_read_from_upper_case_names() {
        let vars = vec![
            ("DATABASE_URL".to_string(), "postgres://db/x".to_string()),
            ("SERVER_PORT".to_string(), "8080".to_string()),
            ("SEED_DEMO_DATA".to_string(), "true".to_string()),
            ("OVERDUE_THRESHOLD_DAYS".to_string(), "45".to_string()),
        ];
        let config: Config = envy::from_iter(vars).unwrap();

        assert_eq!(config.server_port, 8080);
        assert!(config.seed_demo_data);
        assert_eq!(config.overdue_threshold_days, 45);
    }

    #[test]
    fn missing_database_url_is_an_error() {
        let vars: Vec<(String, String)> = Vec::new();
        assert!(envy::from_iter::<_, Config>(vars).is_err());
    }
}
