//! Configuration management with layered hierarchy

use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Name of the per-directory config file
pub const LOCAL_CONFIG_FILE: &str = "heatlab.yaml";

/// heatlab configuration with layered hierarchy
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory `sim build` writes pages to when no output path is given
    pub output_dir: Option<PathBuf>,

    /// Seed for quiz choice shuffling (random when unset)
    pub shuffle_seed: Option<u64>,

    /// Extra YAML question bank loaded next to the built-in questions
    pub question_bank: Option<PathBuf>,
}

impl Config {
    /// Load configuration from all sources, merging in priority order
    pub fn load() -> Self {
        let mut config = Config::default();

        // 1. Global user config (~/.config/heatlab/config.yaml)
        if let Some(global_path) = Self::global_config_path() {
            config.merge_file(&global_path);
        }

        // 2. Config in the working directory (./heatlab.yaml)
        config.merge_file(Path::new(LOCAL_CONFIG_FILE));

        // 3. Environment variables
        if let Ok(dir) = std::env::var("HEATLAB_OUTPUT_DIR") {
            config.output_dir = Some(PathBuf::from(dir));
        }
        if let Ok(seed) = std::env::var("HEATLAB_SEED") {
            match seed.parse() {
                Ok(seed) => config.shuffle_seed = Some(seed),
                Err(_) => warn!("Ignoring HEATLAB_SEED={}: not an unsigned integer", seed),
            }
        }
        if let Ok(bank) = std::env::var("HEATLAB_BANK") {
            config.question_bank = Some(PathBuf::from(bank));
        }

        config
    }

    /// Get the path to the global config file
    fn global_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "heatlab")
            .map(|dirs| dirs.config_dir().join("config.yaml"))
    }

    fn merge_file(&mut self, path: &Path) {
        if !path.exists() {
            return;
        }
        let parsed = std::fs::read_to_string(path)
            .map_err(|e| e.to_string())
            .and_then(|contents| serde_yml::from_str::<Config>(&contents).map_err(|e| e.to_string()));
        match parsed {
            Ok(other) => {
                debug!(path = %path.display(), "Loaded config");
                self.merge(other);
            }
            Err(e) => warn!(path = %path.display(), "Ignoring unreadable config: {}", e),
        }
    }

    /// Merge another config into this one (other takes precedence)
    fn merge(&mut self, other: Config) {
        if other.output_dir.is_some() {
            self.output_dir = other.output_dir;
        }
        if other.shuffle_seed.is_some() {
            self.shuffle_seed = other.shuffle_seed;
        }
        if other.question_bank.is_some() {
            self.question_bank = other.question_bank;
        }
    }

    /// Where generated pages go
    pub fn output_dir(&self) -> PathBuf {
        self.output_dir.clone().unwrap_or_else(|| PathBuf::from("."))
    }
}
