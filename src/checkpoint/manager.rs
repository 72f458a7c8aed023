use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::info;

use crate::checkpoint::metadata::{CheckpointMetadata, CheckpointMetrics, RunDescriptor};
use crate::error::CheckpointError;
use crate::trainer::AgentTrainer;

const METADATA_FILE: &str = "metadata.json";

/// Configuration for the checkpoint manager.
#[derive(Debug, Clone)]
pub struct CheckpointManagerConfig {
    pub save_dir: PathBuf,
}

impl Default for CheckpointManagerConfig {
    fn default() -> Self {
        CheckpointManagerConfig {
            save_dir: PathBuf::from("/tmp/policy/"),
        }
    }
}

/// Everything read back from a checkpoint directory.
#[derive(Debug)]
pub struct CheckpointData {
    pub path: PathBuf,
    pub metadata: CheckpointMetadata,
    /// Trainer state JSON keyed by trainer name.
    pub states: HashMap<String, String>,
}

/// Saves trainer state into a single checkpoint directory, overwriting the
/// previous save, and restores trainers from one.
pub struct CheckpointManager {
    config: CheckpointManagerConfig,
    run: RunDescriptor,
}

fn state_file(name: &str) -> String {
    format!("{name}.json")
}

fn read(path: &Path) -> Result<String, CheckpointError> {
    fs::read_to_string(path).map_err(|source| CheckpointError::Read {
        path: path.to_path_buf(),
        source,
    })
}

impl CheckpointManager {
    pub fn new(config: CheckpointManagerConfig, run: RunDescriptor) -> Self {
        CheckpointManager { config, run }
    }

    pub fn save_dir(&self) -> &Path {
        &self.config.save_dir
    }

    /// Write every trainer's state plus metadata. Trainers sharing a name
    /// share parameters, so only the first of them is written.
    pub fn save<T: AgentTrainer>(
        &self,
        trainers: &[T],
        train_step: u64,
        episodes: usize,
        metrics: CheckpointMetrics,
    ) -> Result<PathBuf, CheckpointError> {
        let dir = &self.config.save_dir;
        fs::create_dir_all(dir)?;

        let mut names: Vec<String> = Vec::with_capacity(trainers.len());
        for trainer in trainers {
            let name = trainer.name().to_string();
            if !names.contains(&name) {
                fs::write(dir.join(state_file(&name)), trainer.training_state_json()?)?;
            }
            names.push(name);
        }

        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();
        let metadata = CheckpointMetadata {
            train_step,
            episodes,
            timestamp,
            run: self.run.clone(),
            trainers: names,
            metrics,
        };
        fs::write(dir.join(METADATA_FILE), serde_json::to_string_pretty(&metadata)?)?;

        info!(dir = %dir.display(), train_step, episodes, "checkpoint saved");
        Ok(dir.clone())
    }

    /// Read metadata and every trainer state from `dir`.
    pub fn load(dir: &Path) -> Result<CheckpointData, CheckpointError> {
        if !dir.is_dir() {
            return Err(CheckpointError::DirNotFound(dir.to_path_buf()));
        }
        let meta_path = dir.join(METADATA_FILE);
        if !meta_path.exists() {
            return Err(CheckpointError::MissingMetadata(dir.to_path_buf()));
        }
        let metadata: CheckpointMetadata =
            serde_json::from_str(&read(&meta_path)?).map_err(|source| CheckpointError::Parse {
                path: meta_path,
                source,
            })?;

        let mut states = HashMap::new();
        for name in &metadata.trainers {
            if states.contains_key(name) {
                continue;
            }
            let path = dir.join(state_file(name));
            if !path.exists() {
                return Err(CheckpointError::MissingTrainer {
                    dir: dir.to_path_buf(),
                    name: name.clone(),
                });
            }
            states.insert(name.clone(), read(&path)?);
        }

        Ok(CheckpointData {
            path: dir.to_path_buf(),
            metadata,
            states,
        })
    }

    /// Load `dir` and restore each trainer from the state saved under its name.
    pub fn restore<T: AgentTrainer>(
        dir: &Path,
        trainers: &mut [T],
    ) -> Result<CheckpointMetadata, CheckpointError> {
        let data = Self::load(dir)?;
        for trainer in trainers.iter_mut() {
            let name = trainer.name().to_string();
            let json = data
                .states
                .get(&name)
                .ok_or_else(|| CheckpointError::MissingTrainer {
                    dir: dir.to_path_buf(),
                    name: name.clone(),
                })?;
            trainer
                .restore_training_state_json(json)
                .map_err(|e| CheckpointError::Restore {
                    name,
                    reason: e.to_string(),
                })?;
        }
        info!(
            dir = %dir.display(),
            train_step = data.metadata.train_step,
            episodes = data.metadata.episodes,
            "checkpoint restored"
        );
        Ok(data.metadata)
    }
}
