use crate::domain::{Money, Percent, PlatformDefaults};
use crate::domain::settings::is_valid_currency;
use crate::ledger::Paging;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub database_path: String,
    pub default_currency: String,
    pub default_commission_percent: Percent,
    pub default_convenience_fee: Money,
    pub default_page_size: u32,
    pub max_page_size: u32,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnv(String),
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_map(std::env::vars().collect())
    }

    pub fn from_env_map(env_map: HashMap<String, String>) -> Result<Self, ConfigError> {
        let port = env_map
            .get("PORT")
            .map(|s| s.as_str())
            .unwrap_or("8080")
            .parse::<u16>()
            .map_err(|_| {
                ConfigError::InvalidValue("PORT".to_string(), "must be a valid u16".to_string())
            })?;

        let database_path = env_map
            .get("DATABASE_PATH")
            .cloned()
            .ok_or_else(|| ConfigError::MissingEnv("DATABASE_PATH".to_string()))?;

        let default_currency = env_map
            .get("DEFAULT_CURRENCY")
            .map(|s| s.trim().to_ascii_uppercase())
            .unwrap_or_else(|| "LKR".to_string());
        if !is_valid_currency(&default_currency) {
            return Err(ConfigError::InvalidValue(
                "DEFAULT_CURRENCY".to_string(),
                format!("must be 3-8 letters, got {}", default_currency),
            ));
        }

        let default_commission_percent = Percent::parse(
            env_map
                .get("DEFAULT_COMMISSION_PERCENT")
                .map(|s| s.as_str())
                .unwrap_or("10.00"),
        )
        .ok_or_else(|| {
            ConfigError::InvalidValue(
                "DEFAULT_COMMISSION_PERCENT".to_string(),
                "must be a number between 0 and 100".to_string(),
            )
        })?;

        let default_convenience_fee = env_map
            .get("DEFAULT_CONVENIENCE_FEE")
            .map(|s| s.as_str())
            .unwrap_or("0")
            .parse::<Money>()
            .ok()
            .filter(|fee| !fee.is_negative() && *fee <= Money::max_amount())
            .ok_or_else(|| {
                ConfigError::InvalidValue(
                    "DEFAULT_CONVENIENCE_FEE".to_string(),
                    format!("must be between 0 and {}", Money::max_amount()),
                )
            })?;

        let default_page_size = parse_page_size(&env_map, "DEFAULT_PAGE_SIZE", "20")?;
        let max_page_size = parse_page_size(&env_map, "MAX_PAGE_SIZE", "200")?;
        if default_page_size > max_page_size {
            return Err(ConfigError::InvalidValue(
                "DEFAULT_PAGE_SIZE".to_string(),
                format!("must not exceed MAX_PAGE_SIZE ({})", max_page_size),
            ));
        }

        Ok(Config {
            port,
            database_path,
            default_currency,
            default_commission_percent,
            default_convenience_fee,
            default_page_size,
            max_page_size,
        })
    }

    /// Values seeded into platform settings on first read.
    pub fn platform_defaults(&self) -> PlatformDefaults {
        PlatformDefaults {
            currency: self.default_currency.clone(),
            commission_percent: self.default_commission_percent,
            convenience_fee: self.default_convenience_fee,
        }
    }

    pub fn paging(&self) -> Paging {
        Paging {
            default_size: self.default_page_size,
            max_size: self.max_page_size,
        }
    }
}

fn parse_page_size(
    env_map: &HashMap<String, String>,
    key: &str,
    default: &str,
) -> Result<u32, ConfigError> {
    env_map
        .get(key)
        .map(|s| s.as_str())
        .unwrap_or(default)
        .parse::<u32>()
        .ok()
        .filter(|n| *n > 0)
        .ok_or_else(|| ConfigError::InvalidValue(key.to_string(), "must be a positive integer".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup_required_env() -> HashMap<String, String> {
        let mut map = HashMap::new();
        map.insert("DATABASE_PATH".to_string(), "/tmp/test.db".to_string());
        map
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_env_map(setup_required_env()).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.default_currency, "LKR");
        assert_eq!(config.default_commission_percent, Percent::parse("10").unwrap());
        assert!(config.default_convenience_fee.is_zero());
        assert_eq!(config.default_page_size, 20);
        assert_eq!(config.max_page_size, 200);
    }

    #[test]
    fn test_missing_database_path() {
        let mut env_map = setup_required_env();
        env_map.remove("DATABASE_PATH");
        let result = Config::from_env_map(env_map);
        match result {
            Err(ConfigError::MissingEnv(s)) => assert_eq!(s, "DATABASE_PATH"),
            _ => panic!("Expected MissingEnv error"),
        }
    }

    #[test]
    fn test_invalid_port() {
        let mut env_map = setup_required_env();
        env_map.insert("PORT".to_string(), "not_a_number".to_string());
        let result = Config::from_env_map(env_map);
        match result {
            Err(ConfigError::InvalidValue(k, _)) => assert_eq!(k, "PORT"),
            _ => panic!("Expected InvalidValue error"),
        }
    }

    #[test]
    fn test_commission_out_of_range() {
        let mut env_map = setup_required_env();
        env_map.insert("DEFAULT_COMMISSION_PERCENT".to_string(), "100.5".to_string());
        let result = Config::from_env_map(env_map);
        match result {
            Err(ConfigError::InvalidValue(k, _)) => assert_eq!(k, "DEFAULT_COMMISSION_PERCENT"),
            _ => panic!("Expected InvalidValue error"),
        }
    }

    #[test]
    fn test_negative_convenience_fee() {
        let mut env_map = setup_required_env();
        env_map.insert("DEFAULT_CONVENIENCE_FEE".to_string(), "-1".to_string());
        let result = Config::from_env_map(env_map);
        match result {
            Err(ConfigError::InvalidValue(k, _)) => assert_eq!(k, "DEFAULT_CONVENIENCE_FEE"),
            _ => panic!("Expected InvalidValue error"),
        }
    }

    #[test]
    fn test_oversized_convenience_fee() {
        let mut env_map = setup_required_env();
        env_map.insert(
            "DEFAULT_CONVENIENCE_FEE".to_string(),
            "1000000000000.01".to_string(),
        );
        assert!(matches!(
            Config::from_env_map(env_map),
            Err(ConfigError::InvalidValue(k, _)) if k == "DEFAULT_CONVENIENCE_FEE"
        ));
    }

    #[test]
    fn test_currency_is_uppercased() {
        let mut env_map = setup_required_env();
        env_map.insert("DEFAULT_CURRENCY".to_string(), "usd".to_string());
        let config = Config::from_env_map(env_map).unwrap();
        assert_eq!(config.platform_defaults().currency, "USD");
    }

    #[test]
    fn test_page_size_bounds() {
        let mut env_map = setup_required_env();
        env_map.insert("DEFAULT_PAGE_SIZE".to_string(), "500".to_string());
        env_map.insert("MAX_PAGE_SIZE".to_string(), "100".to_string());
        match Config::from_env_map(env_map) {
            Err(ConfigError::InvalidValue(k, _)) => assert_eq!(k, "DEFAULT_PAGE_SIZE"),
            _ => panic!("Expected InvalidValue error"),
        }

        let mut env_map = setup_required_env();
        env_map.insert("MAX_PAGE_SIZE".to_string(), "0".to_string());
        match Config::from_env_map(env_map) {
            Err(ConfigError::InvalidValue(k, _)) => assert_eq!(k, "MAX_PAGE_SIZE"),
            _ => panic!("Expected InvalidValue error"),
        }
    }
}
