use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::RunError;
use crate::trainer::{AgentTrainer, PeerSample, UpdateStats};

/// When the roster order is re-drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ShuffleMode {
    /// Once per episode boundary.
    Episode,
    /// Before every action selection.
    Timestep,
}

/// Result of one update pass over the roster.
#[derive(Debug, Clone, Default)]
pub struct UpdatePass {
    /// Number of `update` calls made.
    pub calls: usize,
    /// Stats of the updates that actually trained.
    pub stats: Vec<(String, UpdateStats)>,
}

/// Ordered trainer indices pairing trainers with environment slots:
/// position `k` acts for observation slot `k`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Roster {
    order: Vec<usize>,
}

impl Roster {
    pub fn new(n: usize) -> Self {
        Roster {
            order: (0..n).collect(),
        }
    }

    pub fn order(&self) -> &[usize] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Uniformly permute the order.
    pub fn shuffle<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.order.shuffle(rng);
    }

    pub fn preupdate_all<T: AgentTrainer>(&self, trainers: &mut [T]) {
        for &i in &self.order {
            trainers[i].preupdate();
        }
    }

    /// Update every trainer in roster order, or only the first one when the
    /// trainers share parameters.
    pub fn update_all<T: AgentTrainer>(
        &self,
        trainers: &mut [T],
        train_step: u64,
        shared: bool,
    ) -> Result<UpdatePass, RunError> {
        let mut pass = UpdatePass::default();
        for &i in &self.order {
            let peers: Vec<PeerSample> = match trainers[i].sample_request(train_step) {
                Some(request) => self
                    .order
                    .iter()
                    .map(|&j| trainers[j].peer_sample(&request))
                    .collect(),
                None => Vec::new(),
            };
            let trainer = &mut trainers[i];
            let stats = trainer
                .update(&peers, train_step)
                .map_err(|e| RunError::Trainer {
                    name: trainer.name().to_string(),
                    reason: e.to_string(),
                })?;
            pass.calls += 1;
            if let Some(stats) = stats {
                debug!(trainer = trainer.name(), train_step, ?stats, "trainer updated");
                pass.stats.push((trainer.name().to_string(), stats));
            }
            if shared {
                break;
            }
        }
        Ok(pass)
    }
}
