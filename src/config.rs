// Configuration for alignment runs

use crate::alignment::ScoringParams;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Run configuration, loaded from a TOML file when one exists.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path to the SQLite database holding features and results
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Results accumulated per worker before a transactional flush
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Pairs between progress reports
    #[serde(default = "default_progress_interval")]
    pub progress_interval: usize,

    /// Worker thread count (0 = one per available core)
    #[serde(default)]
    pub worker_threads: usize,

    /// Global alignment scoring parameters
    #[serde(default)]
    pub scoring: ScoringParams,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            batch_size: default_batch_size(),
            progress_interval: default_progress_interval(),
            worker_threads: 0,
            scoring: ScoringParams::default(),
        }
    }
}

impl Config {
    /// Load config from disk or return default
    pub fn load_or_default(path: &Path) -> Self {
        if path.exists() {
            match std::fs::read_to_string(path) {
                Ok(contents) => match toml::from_str(&contents) {
                    Ok(config) => return config,
                    Err(e) => {
                        log::warn!("Failed to parse config {}: {}", path.display(), e);
                    }
                },
                Err(e) => {
                    log::warn!("Failed to read config file {}: {}", path.display(), e);
                }
            }
        }

        Self::default()
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("folkroot.db")
}

fn default_batch_size() -> usize {
    10_000
}

fn default_progress_interval() -> usize {
    100
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_config_fills_defaults() {
        let config: Config = toml::from_str("db_path = \"test.db\"").unwrap();
        assert_eq!(config.db_path, PathBuf::from("test.db"));
        assert_eq!(config.batch_size, 10_000);
        assert_eq!(config.progress_interval, 100);
        assert_eq!(config.worker_threads, 0);
        assert_eq!(config.scoring.mismatch_penalty, 1);
    }

    #[test]
    fn scoring_section_overrides() {
        let config: Config =
            toml::from_str("[scoring]\nmatch_score = -1\ngap_penalty = 2\n").unwrap();
        assert_eq!(config.scoring.match_score, -1);
        assert_eq!(config.scoring.gap_penalty, 2);
        assert_eq!(config.scoring.mismatch_penalty, 1);
    }
}
