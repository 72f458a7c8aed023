use serde::{Deserialize, Serialize};

use crate::trainer::TrainerParams;

/// Reward summary at checkpoint time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CheckpointMetrics {
    pub mean_episode_reward: f64,
    pub agent_episode_rewards: Vec<f64>,
}

/// Run-level facts that every checkpoint of a run repeats.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunDescriptor {
    pub scenario: String,
    pub exp_name: String,
    pub hyperparameters: TrainerParams,
}

/// Top-level checkpoint metadata written to metadata.json.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointMetadata {
    pub train_step: u64,
    pub episodes: usize,
    pub timestamp: u64,
    #[serde(flatten)]
    pub run: RunDescriptor,
    /// Trainer names in original (unshuffled) order.
    pub trainers: Vec<String>,
    pub metrics: CheckpointMetrics,
}
