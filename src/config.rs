//! Configuration types.

use std::path::PathBuf;

use crate::error::ConfigError;

/// Default number of scholarships returned by a lookup.
pub const DEFAULT_TOP_K: usize = 5;

/// Application configuration, read from the environment.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Scholarship dataset (JSON array of records).
    pub dataset_path: PathBuf,
    /// libSQL database file backing session state and pending reviews.
    pub db_path: PathBuf,
    /// `top_k` used when a caller does not pass one.
    pub default_top_k: usize,
    /// User id stamped on sessions created by the binary.
    pub user_id: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            dataset_path: PathBuf::from("./datasets/scholarships_clean.json"),
            db_path: PathBuf::from("./data/scholarship-assist.db"),
            default_top_k: DEFAULT_TOP_K,
            user_id: "default".to_string(),
        }
    }
}

impl AppConfig {
    /// Build configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let dataset_path = lookup("SCHOLARSHIP_DATASET_PATH")
            .map(PathBuf::from)
            .unwrap_or(defaults.dataset_path);

        let db_path = lookup("SCHOLARSHIP_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or(defaults.db_path);

        let default_top_k = match lookup("SCHOLARSHIP_TOP_K") {
            Some(raw) => parse_top_k(&raw)?,
            None => defaults.default_top_k,
        };

        let user_id = lookup("SCHOLARSHIP_USER_ID")
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(defaults.user_id);

        Ok(Self {
            dataset_path,
            db_path,
            default_top_k,
            user_id,
        })
    }
}

fn parse_top_k(raw: &str) -> Result<usize, ConfigError> {
    let value: usize = raw.trim().parse().map_err(|e| ConfigError::InvalidValue {
        key: "SCHOLARSHIP_TOP_K".into(),
        message: format!("{e}"),
    })?;
    if value == 0 {
        return Err(ConfigError::InvalidValue {
            key: "SCHOLARSHIP_TOP_K".into(),
            message: "must be greater than zero".into(),
        });
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        let config = AppConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config.default_top_k, DEFAULT_TOP_K);
        assert_eq!(config.user_id, "default");
        assert!(config.dataset_path.ends_with("scholarships_clean.json"));
    }

    #[test]
    fn overrides_from_env() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("SCHOLARSHIP_DATASET_PATH", "/tmp/data.json"),
            ("SCHOLARSHIP_TOP_K", "10"),
            ("SCHOLARSHIP_USER_ID", "rifat"),
        ]))
        .unwrap();
        assert_eq!(config.dataset_path, PathBuf::from("/tmp/data.json"));
        assert_eq!(config.default_top_k, 10);
        assert_eq!(config.user_id, "rifat");
    }

    #[test]
    fn rejects_zero_and_garbage_top_k() {
        assert!(AppConfig::from_lookup(lookup_from(&[("SCHOLARSHIP_TOP_K", "0")])).is_err());
        assert!(AppConfig::from_lookup(lookup_from(&[("SCHOLARSHIP_TOP_K", "five")])).is_err());
    }
}
