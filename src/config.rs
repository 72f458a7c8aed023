use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::ConfigError;
use crate::trainer::TrainerParams;
use crate::training::{LoopSettings, ShuffleMode};

/// Top-level application configuration, loadable from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub environment: EnvironmentConfig,
    pub training: TrainingConfig,
    pub checkpoint: CheckpointConfig,
    pub evaluation: EvaluationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvironmentConfig {
    pub scenario: String,
    pub max_episode_len: usize,
    pub num_episodes: usize,
    pub num_adversaries: usize,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        EnvironmentConfig {
            scenario: "simple_spread".to_string(),
            max_episode_len: 25,
            num_episodes: 60_000,
            num_adversaries: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    pub lr: f64,
    pub gamma: f64,
    pub batch_size: usize,
    pub num_units: usize,
    pub replay_capacity: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shuffle: Option<ShuffleMode>,
    pub shared: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        TrainingConfig {
            lr: 1e-2,
            gamma: 0.95,
            batch_size: 1024,
            num_units: 128,
            replay_capacity: 1_000_000,
            shuffle: None,
            shared: false,
            seed: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckpointConfig {
    /// Empty means "use the scenario name".
    pub exp_name: String,
    pub save_dir: PathBuf,
    pub save_rate: usize,
    /// Falls back to `save_dir` when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub load_dir: Option<PathBuf>,
    pub restore: bool,
}

impl Default for CheckpointConfig {
    fn default() -> Self {
        CheckpointConfig {
            exp_name: String::new(),
            save_dir: PathBuf::from("/tmp/policy/"),
            save_rate: 1000,
            load_dir: None,
            restore: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluationConfig {
    pub display: bool,
    pub benchmark: bool,
    pub benchmark_iters: u64,
    pub benchmark_dir: PathBuf,
    pub plots_dir: PathBuf,
    pub save_replay: bool,
    pub deterministic: bool,
    /// Video path without extension; recording implies display.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record: Option<PathBuf>,
    pub render_delay_ms: u64,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        EvaluationConfig {
            display: false,
            benchmark: false,
            benchmark_iters: 100_000,
            benchmark_dir: PathBuf::from("./benchmark_files/"),
            plots_dir: PathBuf::from("./learning_curves/"),
            save_replay: false,
            deterministic: false,
            record: None,
            render_delay_ms: 10,
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        let config: AppConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the file
    /// does not exist.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::load(path)
        } else {
            warn!(path = %path.display(), "config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.environment.scenario.is_empty() {
            return Err(ConfigError::Validation(
                "environment.scenario must not be empty".into(),
            ));
        }
        if self.environment.max_episode_len == 0 {
            return Err(ConfigError::Validation(
                "environment.max_episode_len must be > 0".into(),
            ));
        }
        if self.environment.num_episodes == 0 {
            return Err(ConfigError::Validation(
                "environment.num_episodes must be > 0".into(),
            ));
        }
        if self.training.lr <= 0.0 {
            return Err(ConfigError::Validation("training.lr must be > 0".into()));
        }
        if self.training.gamma < 0.0 || self.training.gamma > 1.0 {
            return Err(ConfigError::Validation(
                "training.gamma must be in [0, 1]".into(),
            ));
        }
        if self.training.batch_size == 0 {
            return Err(ConfigError::Validation(
                "training.batch_size must be > 0".into(),
            ));
        }
        if self.training.replay_capacity == 0 {
            return Err(ConfigError::Validation(
                "training.replay_capacity must be > 0".into(),
            ));
        }
        if self.checkpoint.save_rate == 0 {
            return Err(ConfigError::Validation(
                "checkpoint.save_rate must be > 0".into(),
            ));
        }
        Ok(())
    }

    /// Generate a TOML string with all default values (useful for creating
    /// example config files).
    pub fn default_toml() -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(&AppConfig::default())
    }

    pub fn exp_name(&self) -> &str {
        if self.checkpoint.exp_name.is_empty() {
            &self.environment.scenario
        } else {
            &self.checkpoint.exp_name
        }
    }

    pub fn load_dir(&self) -> &Path {
        self.checkpoint
            .load_dir
            .as_deref()
            .unwrap_or(&self.checkpoint.save_dir)
    }

    /// Display, restore and benchmark runs all start from a saved checkpoint.
    pub fn should_load(&self) -> bool {
        self.display() || self.checkpoint.restore || self.evaluation.benchmark
    }

    pub fn display(&self) -> bool {
        self.evaluation.display || self.evaluation.record.is_some()
    }

    pub fn trainer_params(&self) -> TrainerParams {
        TrainerParams {
            lr: self.training.lr,
            gamma: self.training.gamma,
            batch_size: self.training.batch_size,
            num_units: self.training.num_units,
            max_episode_len: self.environment.max_episode_len,
            replay_capacity: self.training.replay_capacity,
            shared: self.training.shared,
            deterministic: self.evaluation.deterministic,
            seed: self.training.seed,
        }
    }

    pub fn loop_settings(&self) -> LoopSettings {
        LoopSettings {
            max_episode_len: self.environment.max_episode_len,
            num_episodes: self.environment.num_episodes,
            save_rate: self.checkpoint.save_rate,
            shuffle: self.training.shuffle,
            shared: self.training.shared,
            benchmark: self.evaluation.benchmark,
            benchmark_iters: self.evaluation.benchmark_iters,
            save_replay: self.evaluation.save_replay,
            render_delay: Duration::from_millis(self.evaluation.render_delay_ms),
            num_adversaries: self.environment.num_adversaries,
            exp_name: self.exp_name().to_string(),
            benchmark_dir: self.evaluation.benchmark_dir.clone(),
            plots_dir: self.evaluation.plots_dir.clone(),
        }
    }
}
