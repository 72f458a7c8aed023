/// Episode reward bookkeeping: one running total per episode, aggregate and
/// per agent, plus the windowed curves recorded at each checkpoint.
///
/// The last entry of each ledger is the episode in progress, so both ledgers
/// always hold `completed() + 1` entries.
#[derive(Debug, Clone)]
pub struct RewardLedger {
    episode_rewards: Vec<f64>,
    agent_rewards: Vec<Vec<f64>>,
    final_rewards: Vec<f64>,
    final_agent_rewards: Vec<f64>,
}

/// Windowed means captured at a checkpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct RewardSummary {
    pub mean_episode_reward: f64,
    pub agent_episode_rewards: Vec<f64>,
}

impl RewardLedger {
    pub fn new(num_agents: usize) -> Self {
        RewardLedger {
            episode_rewards: vec![0.0],
            agent_rewards: vec![vec![0.0]; num_agents],
            final_rewards: Vec::new(),
            final_agent_rewards: Vec::new(),
        }
    }

    /// Add one step's rewards (indexed by environment slot) to the open episode.
    pub fn add_step(&mut self, rewards: &[f64]) {
        for (slot, &rew) in rewards.iter().enumerate() {
            if let Some(total) = self.episode_rewards.last_mut() {
                *total += rew;
            }
            if let Some(total) = self.agent_rewards.get_mut(slot).and_then(|a| a.last_mut()) {
                *total += rew;
            }
        }
    }

    /// Close the open episode and start a new zero entry.
    pub fn close_episode(&mut self) {
        self.episode_rewards.push(0.0);
        for agent in &mut self.agent_rewards {
            agent.push(0.0);
        }
    }

    pub fn completed(&self) -> usize {
        self.episode_rewards.len() - 1
    }

    pub fn len(&self) -> usize {
        self.episode_rewards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.episode_rewards.is_empty()
    }

    pub fn episode_rewards(&self) -> &[f64] {
        &self.episode_rewards
    }

    pub fn agent_rewards(&self) -> &[Vec<f64>] {
        &self.agent_rewards
    }

    /// Reward of the episode in progress.
    pub fn current(&self) -> f64 {
        self.episode_rewards.last().copied().unwrap_or(0.0)
    }

    /// Mean total reward over the last `window` ledger entries, the episode
    /// in progress included.
    pub fn rolling_mean(&self, window: usize) -> f64 {
        windowed_mean(&self.episode_rewards, window)
    }

    /// Per-agent mean reward over the last `window` ledger entries.
    pub fn agent_rolling_means(&self, window: usize) -> Vec<f64> {
        self.agent_rewards
            .iter()
            .map(|rewards| windowed_mean(rewards, window))
            .collect()
    }

    /// Compute the windowed means and append them to the learning curves.
    pub fn record_checkpoint(&mut self, window: usize) -> RewardSummary {
        let summary = RewardSummary {
            mean_episode_reward: self.rolling_mean(window),
            agent_episode_rewards: self.agent_rolling_means(window),
        };
        self.final_rewards.push(summary.mean_episode_reward);
        self.final_agent_rewards
            .extend_from_slice(&summary.agent_episode_rewards);
        summary
    }

    /// Aggregate learning curve, one point per checkpoint.
    pub fn final_rewards(&self) -> &[f64] {
        &self.final_rewards
    }

    /// Per-agent learning curve, agent-major within each checkpoint.
    pub fn final_agent_rewards(&self) -> &[f64] {
        &self.final_agent_rewards
    }
}

/// Mean over the last `window` entries. At a checkpoint the trailing entry is
/// the freshly opened zero, and it counts toward the window.
fn windowed_mean(entries: &[f64], window: usize) -> f64 {
    let tail = &entries[entries.len().saturating_sub(window)..];
    if tail.is_empty() {
        return 0.0;
    }
    tail.iter().sum::<f64>() / tail.len() as f64
}
