//! Per-agent trainers: the interface the control loop drives, the replay
//! buffer they sample from, and a uniform-random reference trainer.

mod random;
pub mod replay_buffer;

pub use random::RandomTrainer;
pub use replay_buffer::ReplayBuffer;

use std::error::Error;

use serde::{Deserialize, Serialize};

use crate::env::{Action, MultiAgentEnv};

/// One stored transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Experience {
    pub obs: Vec<f32>,
    pub action: Vec<f32>,
    pub reward: f64,
    pub next_obs: Vec<f32>,
    pub done: bool,
}

/// Replay indices chosen by the updating trainer; every peer answers with
/// the transitions stored at the same indices.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleRequest {
    pub indices: Vec<usize>,
}

/// A peer's answer to a [`SampleRequest`].
#[derive(Debug, Clone)]
pub struct PeerSample {
    pub trainer: String,
    pub batch: Vec<Experience>,
}

/// Statistics reported by an update that actually trained.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateStats {
    pub batch_size: usize,
    pub mean_reward: f64,
    pub target_estimate: f64,
}

/// Hyperparameters shared by every trainer of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainerParams {
    pub lr: f64,
    pub gamma: f64,
    pub batch_size: usize,
    pub num_units: usize,
    pub max_episode_len: usize,
    pub replay_capacity: usize,
    pub shared: bool,
    pub deterministic: bool,
    pub seed: Option<u64>,
}

impl Default for TrainerParams {
    fn default() -> Self {
        TrainerParams {
            lr: 1e-2,
            gamma: 0.95,
            batch_size: 1024,
            num_units: 128,
            max_episode_len: 25,
            replay_capacity: 1_000_000,
            shared: false,
            deterministic: false,
            seed: None,
        }
    }
}

impl TrainerParams {
    /// Number of stored transitions required before updates start.
    pub fn min_replay_len(&self) -> usize {
        self.batch_size * self.max_episode_len
    }
}

/// The interface the control loop uses to drive one agent's learner.
///
/// Updates run in two phases so that a trainer can read every peer's replay
/// buffer: [`sample_request`](AgentTrainer::sample_request) picks indices,
/// the loop collects [`peer_sample`](AgentTrainer::peer_sample) from the
/// whole roster, then hands the answers to [`update`](AgentTrainer::update).
pub trait AgentTrainer {
    /// Parameter-scope name; shared trainers report the same name.
    fn name(&self) -> &str;

    /// Choose an action from this agent's own latest observation.
    fn action(&mut self, obs: &[f32]) -> Action;

    /// Record one transition into this trainer's replay mechanism.
    fn experience(
        &mut self,
        obs: &[f32],
        action: &[f32],
        reward: f64,
        next_obs: &[f32],
        done: bool,
        terminal: bool,
    );

    /// Called on every trainer before any of them updates.
    fn preupdate(&mut self);

    /// Decide whether this step trains and, if so, which replay slots to use.
    fn sample_request(&mut self, _train_step: u64) -> Option<SampleRequest> {
        None
    }

    /// Transitions stored at the requested slots.
    fn peer_sample(&self, request: &SampleRequest) -> PeerSample;

    /// Train from the roster's samples. `peers` is empty when this trainer
    /// made no sample request for the step.
    fn update(
        &mut self,
        peers: &[PeerSample],
        train_step: u64,
    ) -> Result<Option<UpdateStats>, Box<dyn Error>>;

    /// Replay contents, dumped alongside benchmark traces.
    fn replay_storage(&self) -> &[Experience];

    /// Serialized learner state for checkpoints.
    fn training_state_json(&self) -> Result<String, serde_json::Error>;

    /// Restore learner state written by [`training_state_json`](AgentTrainer::training_state_json).
    fn restore_training_state_json(&mut self, json: &str) -> Result<(), Box<dyn Error>>;
}

/// Parameter-scope names for `n` agents of which the first
/// `num_adversaries` are adversaries.
pub fn trainer_names(n: usize, num_adversaries: usize, shared: bool) -> Vec<String> {
    (0..n)
        .map(|i| match (shared, i < num_adversaries) {
            (true, true) => "bad".to_string(),
            (true, false) => "good".to_string(),
            (false, _) => format!("agent_{i}"),
        })
        .collect()
}

/// Build one [`RandomTrainer`] per agent of `env`.
pub fn build_random_trainers<E: MultiAgentEnv>(
    env: &E,
    num_adversaries: usize,
    params: &TrainerParams,
) -> Vec<RandomTrainer> {
    let num_adversaries = num_adversaries.min(env.n());
    trainer_names(env.n(), num_adversaries, params.shared)
        .into_iter()
        .enumerate()
        .map(|(i, name)| RandomTrainer::new(name, i, env.action_space(i), params.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_without_sharing() {
        assert_eq!(
            trainer_names(3, 1, false),
            vec!["agent_0", "agent_1", "agent_2"]
        );
    }

    #[test]
    fn test_names_with_sharing() {
        assert_eq!(trainer_names(3, 1, true), vec!["bad", "good", "good"]);
        assert_eq!(trainer_names(2, 0, true), vec!["good", "good"]);
    }

    #[test]
    fn test_min_replay_len() {
        let params = TrainerParams {
            batch_size: 8,
            max_episode_len: 5,
            ..Default::default()
        };
        assert_eq!(params.min_replay_len(), 40);
    }

    #[test]
    fn test_build_caps_adversaries() {
        let env = crate::env::scenarios::load("simple", false, Some(0)).unwrap();
        let params = TrainerParams {
            shared: true,
            ..Default::default()
        };
        let trainers = build_random_trainers(&env, 5, &params);
        assert_eq!(trainers.len(), 1);
        assert_eq!(trainers[0].name(), "bad");
    }
}
