//! Server configuration

use crate::auth::{MAX_BCRYPT_COST, MIN_BCRYPT_COST};

/// JWT secret used when `JWT_SECRET` is not set. Fine for development only.
pub const DEFAULT_JWT_SECRET: &str = "your-secret-key";

/// Server configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub bind_address: String,
    pub environment: String,
    pub jwt_secret: String,
    pub jwt_expiration_hours: i64,
    pub cors_origins: Vec<String>,
    pub rate_limit_rps: u32,
    /// Record GET requests in the audit trail as well
    pub audit_log_reads: bool,
    pub bcrypt_cost: u32,
    pub admin_email: String,
    pub admin_password: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup. Unparseable values
    /// fall back to their defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        Self {
            database_url: get(
                "DATABASE_URL",
                "host=localhost user=postgres dbname=omlbackend",
            ),
            bind_address: get("BIND_ADDRESS", "0.0.0.0:8080"),
            environment: get("APP_ENV", "development"),
            jwt_secret: get("JWT_SECRET", DEFAULT_JWT_SECRET),
            jwt_expiration_hours: parse_or(lookup("JWT_EXPIRATION_HOURS"), 24)
                .max(1),
            cors_origins: get("CORS_ORIGINS", "*")
                .split(',')
                .map(|o| o.trim().to_string())
                .filter(|o| !o.is_empty())
                .collect(),
            rate_limit_rps: parse_or(lookup("RATE_LIMIT_RPS"), 100).max(1),
            audit_log_reads: parse_or(lookup("AUDIT_LOG_READS"), false),
            bcrypt_cost: parse_or(lookup("BCRYPT_COST"), bcrypt::DEFAULT_COST)
                .clamp(MIN_BCRYPT_COST, MAX_BCRYPT_COST),
            admin_email: get("ADMIN_EMAIL", "admin@example.com"),
            admin_password: get("ADMIN_PASSWORD", "admin123"),
        }
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// True when a production deployment still runs on the built-in secret
    pub fn uses_default_secret_in_production(&self) -> bool {
        self.is_production() && self.jwt_secret == DEFAULT_JWT_SECRET
    }
}

fn parse_or<T: std::str::FromStr>(value: Option<String>, default: T) -> T {
    value.and_then(|v| v.trim().parse().ok()).unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config(&[]);
        assert_eq!(config.bind_address, "0.0.0.0:8080");
        assert_eq!(config.jwt_expiration_hours, 24);
        assert_eq!(config.cors_origins, vec!["*".to_string()]);
        assert!(!config.audit_log_reads);
        assert!(!config.is_production());
    }

    #[test]
    fn test_invalid_numbers_fall_back() {
        let config = config(&[
            ("JWT_EXPIRATION_HOURS", "soon"),
            ("RATE_LIMIT_RPS", "0"),
            ("AUDIT_LOG_READS", "yes"),
        ]);
        assert_eq!(config.jwt_expiration_hours, 24);
        assert_eq!(config.rate_limit_rps, 1);
        assert!(!config.audit_log_reads);
    }

    #[test]
    fn test_overrides() {
        let config = config(&[
            ("APP_ENV", "production"),
            ("CORS_ORIGINS", "https://a.example, https://b.example"),
            ("AUDIT_LOG_READS", "true"),
            ("BCRYPT_COST", "4"),
        ]);
        assert!(config.is_production());
        assert!(config.uses_default_secret_in_production());
        assert_eq!(config.cors_origins.len(), 2);
        assert!(config.audit_log_reads);
        assert_eq!(config.bcrypt_cost, 4);
    }

    #[test]
    fn test_bcrypt_cost_is_clamped() {
        assert_eq!(config(&[("BCRYPT_COST", "1")]).bcrypt_cost, MIN_BCRYPT_COST);
        assert_eq!(config(&[("BCRYPT_COST", "99")]).bcrypt_cost, MAX_BCRYPT_COST);
        assert_eq!(config(&[]).bcrypt_cost, bcrypt::DEFAULT_COST);
    }
}
