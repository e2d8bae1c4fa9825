//! Application configuration.
//!
//! Reads configuration from environment variables:
//! - `GRML_DUPLICATE_POLICY`: `legacy` (default) or `reject`
//! - `GRML_TEXT_ORDERING`: `scan` (default) or `topological`

use grml_core::graph::DuplicatePolicy;
use grml_view::OrderingStrategy;
use serde::{Deserialize, Serialize};

use crate::error::AppError;

pub const DUPLICATE_POLICY_VAR: &str = "GRML_DUPLICATE_POLICY";
pub const TEXT_ORDERING_VAR: &str = "GRML_TEXT_ORDERING";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub duplicate_policy: DuplicatePolicy,
    pub text_ordering: OrderingStrategy,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Builds the config from a variable lookup. Unset variables keep their
    /// defaults.
    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let mut config = AppConfig::default();
        if let Some(value) = lookup(DUPLICATE_POLICY_VAR) {
            config.duplicate_policy = match value.trim().to_ascii_lowercase().as_str() {
                "legacy" => DuplicatePolicy::Legacy,
                "reject" => DuplicatePolicy::Reject,
                _ => {
                    return Err(AppError::Config {
                        key: DUPLICATE_POLICY_VAR.to_string(),
                        value,
                    })
                }
            };
        }
        if let Some(value) = lookup(TEXT_ORDERING_VAR) {
            config.text_ordering = value.parse().map_err(|_| AppError::Config {
                key: TEXT_ORDERING_VAR.to_string(),
                value: value.clone(),
            })?;
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_when_unset() {
        let config = AppConfig::from_vars(|_| None).unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.duplicate_policy, DuplicatePolicy::Legacy);
        assert_eq!(config.text_ordering, OrderingStrategy::ScanFromEnd);
    }

    #[test]
    fn reads_both_variables() {
        let config = AppConfig::from_vars(|key| match key {
            DUPLICATE_POLICY_VAR => Some("Reject".into()),
            TEXT_ORDERING_VAR => Some("topological".into()),
            _ => None,
        })
        .unwrap();
        assert_eq!(config.duplicate_policy, DuplicatePolicy::Reject);
        assert_eq!(config.text_ordering, OrderingStrategy::Topological);
    }

    #[test]
    fn rejects_unknown_values() {
        let err = AppConfig::from_vars(|key| (key == DUPLICATE_POLICY_VAR).then(|| "maybe".into()))
            .unwrap_err();
        assert!(matches!(err, AppError::Config { ref value, .. } if value == "maybe"));
    }

    #[test]
    fn deserializes_partial_json() {
        let config: AppConfig = serde_json::from_str(r#"{"duplicate_policy":"reject"}"#).unwrap();
        assert_eq!(config.duplicate_policy, DuplicatePolicy::Reject);
        assert_eq!(config.text_ordering, OrderingStrategy::ScanFromEnd);
    }
}
