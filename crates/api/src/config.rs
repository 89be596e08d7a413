//! Environment-driven API configuration.

use std::net::SocketAddr;

use crudstack_core::query::{ListDefaults, Sort};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}

/// Runtime settings for the API process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    pub bind_addr: SocketAddr,
    /// Paging defaults for list endpoints.
    pub list_defaults: ListDefaults,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            list_defaults: ListDefaults::default(),
        }
    }
}

impl ApiConfig {
    /// Read `API_BIND_ADDR`, `API_DEFAULT_PER_PAGE`, `API_MAX_PER_PAGE` and
    /// `API_DEFAULT_SORT`; unset variables keep their defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = ApiConfig::default();

        if let Some(value) = lookup("API_BIND_ADDR") {
            config.bind_addr = value.parse().map_err(|_| ConfigError::Invalid {
                key: "API_BIND_ADDR",
                value: value.clone(),
            })?;
        }

        if let Some(value) = lookup("API_DEFAULT_PER_PAGE") {
            config.list_defaults.per_page = parse_positive("API_DEFAULT_PER_PAGE", &value)?;
        }

        if let Some(value) = lookup("API_MAX_PER_PAGE") {
            config.list_defaults.max_per_page = parse_positive("API_MAX_PER_PAGE", &value)?;
        }

        if let Some(value) = lookup("API_DEFAULT_SORT") {
            config.list_defaults.sort = value.parse::<Sort>().map_err(|_| ConfigError::Invalid {
                key: "API_DEFAULT_SORT",
                value: value.clone(),
            })?;
        }

        Ok(config)
    }
}

fn parse_positive(key: &'static str, value: &str) -> Result<u32, ConfigError> {
    value
        .trim()
        .parse::<u32>()
        .ok()
        .filter(|v| *v > 0)
        .ok_or_else(|| ConfigError::Invalid {
            key,
            value: value.to_string(),
        })
}
