//! Runtime configuration read from the environment.

use std::env;

use thiserror::Error;

use crate::domain::subscription::{SubscriptionPlans, DEFAULT_PLAN_IDS};

pub const DEFAULT_PORT: u16 = 8083;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    pub port: u16,
    /// In-memory storage when unset.
    pub database_url: Option<String>,
    pub nats_url: Option<String>,
    /// Hosted checkout is disabled when unset.
    pub payment_provider_url: Option<String>,
    /// Base of the return URLs handed to the payment provider.
    pub public_base_url: String,
    pub subscription_plans: SubscriptionPlans,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> { Self::from_lookup(|name| env::var(name).ok()) }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let port = match var("PORT") {
            Some(value) => value.parse().map_err(|_| ConfigError::Invalid { name: "PORT", value })?,
            None => DEFAULT_PORT,
        };
        let subscription_plans = match var("SUBSCRIPTION_PLAN_IDS") {
            Some(ids) => SubscriptionPlans::new(ids.split(',').map(str::trim).map(str::to_string)),
            None => SubscriptionPlans::new(DEFAULT_PLAN_IDS),
        };

        Ok(Self {
            port,
            database_url: var("DATABASE_URL"),
            nats_url: var("NATS_URL"),
            payment_provider_url: var("PAYMENT_PROVIDER_URL"),
            public_base_url: var("PUBLIC_BASE_URL").unwrap_or_else(|| format!("http://localhost:{port}")),
            subscription_plans,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_defaults() {
        let c = config(&[]).unwrap();
        assert_eq!(c.port, 8083);
        assert_eq!(c.public_base_url, "http://localhost:8083");
        assert!(c.database_url.is_none());
        assert!(c.subscription_plans.contains(&"plan-anual".into()));
    }

    #[test]
    fn test_overrides() {
        let c = config(&[("PORT", "9000"), ("SUBSCRIPTION_PLAN_IDS", "gold, silver,,"), ("DATABASE_URL", " ")]).unwrap();
        assert_eq!(c.port, 9000);
        assert_eq!(c.subscription_plans.iter().count(), 2);
        assert!(c.subscription_plans.contains(&"silver".into()));
        assert!(c.database_url.is_none());
    }

    #[test]
    fn test_bad_port() {
        assert_eq!(config(&[("PORT", "http")]), Err(ConfigError::Invalid { name: "PORT", value: "http".into() }));
    }
}
