use std::error::Error;

use rand::rngs::StdRng;
use rand::Rng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use super::{
    AgentTrainer, Experience, PeerSample, ReplayBuffer, SampleRequest, TrainerParams, UpdateStats,
};
use crate::env::{Action, Space};

/// Steps between two updates once the replay buffer is warm.
const UPDATE_EVERY: u64 = 100;

/// Checkpointed state of a [`RandomTrainer`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomTrainerState {
    pub name: String,
    pub agent_index: usize,
    pub update_count: u64,
    pub params: TrainerParams,
}

/// A trainer whose policy samples uniformly random logits.
///
/// It never learns, but it stores experience and follows the same update
/// cadence as an actor-critic learner, so every hook of the control loop is
/// exercised with realistic timing.
pub struct RandomTrainer {
    name: String,
    agent_index: usize,
    action_dim: usize,
    params: TrainerParams,
    replay: ReplayBuffer,
    rng: StdRng,
    pending: Option<Vec<usize>>,
    update_count: u64,
}

impl RandomTrainer {
    pub fn new(name: String, agent_index: usize, action_space: Space, params: TrainerParams) -> Self {
        // Deterministic runs derive every stream from the run seed.
        let seed = params
            .seed
            .filter(|_| params.deterministic)
            .map(|s| s.wrapping_add(agent_index as u64));
        let (rng, replay) = match seed {
            Some(s) => (
                StdRng::seed_from_u64(s),
                ReplayBuffer::with_seed(params.replay_capacity, s ^ 0x9e37_79b9),
            ),
            None => (
                StdRng::from_os_rng(),
                ReplayBuffer::new(params.replay_capacity),
            ),
        };
        RandomTrainer {
            name,
            agent_index,
            action_dim: action_space.dim(),
            params,
            replay,
            rng,
            pending: None,
            update_count: 0,
        }
    }

    pub fn agent_index(&self) -> usize {
        self.agent_index
    }

    pub fn update_count(&self) -> u64 {
        self.update_count
    }

    pub fn replay_len(&self) -> usize {
        self.replay.len()
    }

    pub fn state(&self) -> RandomTrainerState {
        RandomTrainerState {
            name: self.name.clone(),
            agent_index: self.agent_index,
            update_count: self.update_count,
            params: self.params.clone(),
        }
    }
}

fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|l| (l - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, n) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if n == 0 {
        0.0
    } else {
        sum / n as f64
    }
}

impl AgentTrainer for RandomTrainer {
    fn name(&self) -> &str {
        &self.name
    }

    fn action(&mut self, _obs: &[f32]) -> Action {
        let logits: Vec<f32> = (0..self.action_dim)
            .map(|_| self.rng.random_range(-1.0..1.0))
            .collect();
        if self.params.deterministic {
            let best = logits
                .iter()
                .enumerate()
                .max_by(|a, b| a.1.total_cmp(b.1))
                .map_or(0, |(i, _)| i);
            let mut one_hot = vec![0.0; self.action_dim];
            if let Some(slot) = one_hot.get_mut(best) {
                *slot = 1.0;
            }
            one_hot
        } else {
            softmax(&logits)
        }
    }

    fn experience(
        &mut self,
        obs: &[f32],
        action: &[f32],
        reward: f64,
        next_obs: &[f32],
        done: bool,
        _terminal: bool,
    ) {
        self.replay.push(Experience {
            obs: obs.to_vec(),
            action: action.to_vec(),
            reward,
            next_obs: next_obs.to_vec(),
            done,
        });
    }

    fn preupdate(&mut self) {
        self.pending = None;
    }

    fn sample_request(&mut self, train_step: u64) -> Option<SampleRequest> {
        if self.replay.len() < self.params.min_replay_len() {
            return None;
        }
        if train_step % UPDATE_EVERY != 0 {
            return None;
        }
        let indices = self.replay.make_index(self.params.batch_size);
        self.pending = Some(indices.clone());
        Some(SampleRequest { indices })
    }

    fn peer_sample(&self, request: &SampleRequest) -> PeerSample {
        PeerSample {
            trainer: self.name.clone(),
            batch: self.replay.sample_index(&request.indices),
        }
    }

    fn update(
        &mut self,
        peers: &[PeerSample],
        _train_step: u64,
    ) -> Result<Option<UpdateStats>, Box<dyn Error>> {
        let Some(indices) = self.pending.take() else {
            return Ok(None);
        };
        if peers.is_empty() {
            return Ok(None);
        }
        let own = self.replay.sample_index(&indices);
        let peer_mean = mean(peers.iter().flat_map(|p| p.batch.iter().map(|e| e.reward)));
        let gamma = self.params.gamma;
        let target_estimate = mean(own.iter().map(|e| {
            let not_done = if e.done { 0.0 } else { 1.0 };
            e.reward + gamma * not_done * peer_mean
        }));

        self.update_count += 1;
        Ok(Some(UpdateStats {
            batch_size: own.len(),
            mean_reward: mean(own.iter().map(|e| e.reward)),
            target_estimate,
        }))
    }

    fn replay_storage(&self) -> &[Experience] {
        self.replay.storage()
    }

    fn training_state_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.state())
    }

    fn restore_training_state_json(&mut self, json: &str) -> Result<(), Box<dyn Error>> {
        let state: RandomTrainerState = serde_json::from_str(json)?;
        if state.name != self.name {
            return Err(format!(
                "state belongs to '{}', not '{}'",
                state.name, self.name
            )
            .into());
        }
        self.update_count = state.update_count;
        Ok(())
    }
}
