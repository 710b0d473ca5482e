use dotenv::dotenv;
use std::env;
use std::path::PathBuf;

pub const DATA_PATH_ENV_VAR: &str = "INTAKE_TRACKER_DATA";
pub const REFERENCE_CSV_ENV_VAR: &str = "INTAKE_TRACKER_REFERENCE_CSV";
pub const LOG_LEVEL_ENV_VAR: &str = "INTAKE_TRACKER_LOG";

const DEFAULT_DATA_PATH: &str = "tracker.json";
const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub data_path: PathBuf,
    pub reference_csv: Option<PathBuf>,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from(DEFAULT_DATA_PATH),
            reference_csv: None,
            log_level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

impl Config {
    /// Reads settings from the environment, loading `.env` first.
    pub fn from_env() -> Self {
        dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        Self {
            data_path: non_empty(DATA_PATH_ENV_VAR)
                .map(PathBuf::from)
                .unwrap_or(defaults.data_path),
            reference_csv: non_empty(REFERENCE_CSV_ENV_VAR).map(PathBuf::from),
            log_level: non_empty(LOG_LEVEL_ENV_VAR).unwrap_or(defaults.log_level),
        }
    }

    /// Command-line values win over the environment.
    pub fn with_overrides(
        mut self,
        data_path: Option<PathBuf>,
        reference_csv: Option<PathBuf>,
        log_level: Option<String>,
    ) -> Self {
        if let Some(path) = data_path {
            self.data_path = path;
        }
        if reference_csv.is_some() {
            self.reference_csv = reference_csv;
        }
        if let Some(level) = log_level {
            self.log_level = level;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_when_env_is_empty() {
        let config = Config::from_lookup(|_| None);
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_reads_env_values() {
        let vars: HashMap<&str, &str> = [
            (DATA_PATH_ENV_VAR, "/tmp/meals.json"),
            (REFERENCE_CSV_ENV_VAR, "reference.csv"),
            (LOG_LEVEL_ENV_VAR, "  "),
        ]
        .into_iter()
        .collect();
        let config = Config::from_lookup(|key| vars.get(key).map(|v| v.to_string()));
        assert_eq!(config.data_path, PathBuf::from("/tmp/meals.json"));
        assert_eq!(config.reference_csv, Some(PathBuf::from("reference.csv")));
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_overrides_win() {
        let config = Config::default().with_overrides(
            Some(PathBuf::from("other.json")),
            None,
            Some("debug".to_string()),
        );
        assert_eq!(config.data_path, PathBuf::from("other.json"));
        assert_eq!(config.reference_csv, None);
        assert_eq!(config.log_level, "debug");
    }
}
