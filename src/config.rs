use std::path::PathBuf;

use thiserror::Error;

use crate::models::{MeasurementUnit, UnknownUnit};

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_AMOUNT: f64 = 1.0;

#[derive(Debug, Error)]
pub(crate) enum ConfigError {
    #[error("invalid value {value:?} for {key}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

impl ConfigError {
    fn invalid(key: &'static str, value: &str, reason: impl ToString) -> Self {
        ConfigError::Invalid {
            key,
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// How recipe names are compared by name-or-id lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum NameMatch {
    Exact,
    IgnoreCase,
}

impl NameMatch {
    pub(crate) fn matches(self, candidate: &str, wanted: &str) -> bool {
        match self {
            NameMatch::Exact => candidate == wanted,
            NameMatch::IgnoreCase => candidate.to_lowercase() == wanted.to_lowercase(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct LayerConfig {
    pub name_match: NameMatch,
    pub default_amount: f64,
    pub default_unit: MeasurementUnit,
}

impl Default for LayerConfig {
    fn default() -> Self {
        LayerConfig {
            name_match: NameMatch::Exact,
            default_amount: DEFAULT_AMOUNT,
            default_unit: MeasurementUnit::Units,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Config {
    pub host: String,
    pub port: u16,
    pub snapshot_path: Option<PathBuf>,
    pub layer: LayerConfig,
}

impl Config {
    pub(crate) fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let host = lookup("BIND_HOST").unwrap_or_else(|| DEFAULT_HOST.to_string());

        let port = match lookup("BIND_PORT") {
            Some(raw) => raw
                .trim()
                .parse::<u16>()
                .map_err(|e| ConfigError::invalid("BIND_PORT", &raw, e))?,
            None => DEFAULT_PORT,
        };

        let snapshot_path = lookup("SNAPSHOT_PATH")
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from);

        let name_match = match lookup("RECIPE_NAME_MATCH") {
            Some(raw) => match raw.trim().to_ascii_lowercase().as_str() {
                "exact" => NameMatch::Exact,
                "ignore-case" => NameMatch::IgnoreCase,
                _ => {
                    return Err(ConfigError::invalid(
                        "RECIPE_NAME_MATCH",
                        &raw,
                        "expected `exact` or `ignore-case`",
                    ))
                }
            },
            None => NameMatch::Exact,
        };

        let default_amount = match lookup("DEFAULT_AMOUNT") {
            Some(raw) => {
                let amount = raw
                    .trim()
                    .parse::<f64>()
                    .map_err(|e| ConfigError::invalid("DEFAULT_AMOUNT", &raw, e))?;
                if !amount.is_finite() || amount < 0.0 {
                    return Err(ConfigError::invalid(
                        "DEFAULT_AMOUNT",
                        &raw,
                        "must be a non-negative number",
                    ));
                }
                amount
            }
            None => DEFAULT_AMOUNT,
        };

        let default_unit = match lookup("DEFAULT_UNIT") {
            Some(raw) => raw
                .parse::<MeasurementUnit>()
                .map_err(|e: UnknownUnit| ConfigError::invalid("DEFAULT_UNIT", &raw, e))?,
            None => MeasurementUnit::Units,
        };

        Ok(Config {
            host,
            port,
            snapshot_path,
            layer: LayerConfig {
                name_match,
                default_amount,
                default_unit,
            },
        })
    }
}
