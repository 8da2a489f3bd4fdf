use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Where probe summaries and quality scores are stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Directory holding the daily `<YYYY-MM-DD>.csv` probe files.
    pub data_dir: PathBuf,
    /// Cumulative quality score file, relative to `data_dir`.
    pub score_file: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("."),
            score_file: PathBuf::from("quality_scores.csv"),
        }
    }
}

impl AppConfig {
    /// Loads the JSON config at `path`, or the defaults when no path is given.
    /// A path that cannot be read or parsed is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("parsing config {}", path.display()))
    }

    pub fn daily_file(&self, date: NaiveDate) -> PathBuf {
        self.data_dir.join(format!("{}.csv", date.format("%Y-%m-%d")))
    }

    pub fn score_path(&self) -> PathBuf {
        self.data_dir.join(&self.score_file)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn defaults_without_file() {
        let config = AppConfig::load(None).unwrap();
        assert_eq!(config, AppConfig::default());
        let date = NaiveDate::from_ymd_opt(2017, 1, 26).unwrap();
        assert_eq!(config.daily_file(date), PathBuf::from("./2017-01-26.csv"));
        assert_eq!(config.score_path(), PathBuf::from("./quality_scores.csv"));
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let path = std::env::temp_dir()
            .join(format!("common-config-{}.json", std::process::id()));
        fs::write(&path, r#"{ "data_dir": "/var/lib/netquality" }"#).unwrap();
        let config = AppConfig::load(Some(&path)).unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/var/lib/netquality"));
        assert_eq!(config.score_file, PathBuf::from("quality_scores.csv"));
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn unreadable_config_is_an_error() {
        let path = std::env::temp_dir().join("common-config-does-not-exist.json");
        assert!(AppConfig::load(Some(&path)).is_err());
    }
}
