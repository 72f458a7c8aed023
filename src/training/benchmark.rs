/// Diagnostic records collected during a run: one slot per episode, each
/// holding one record sequence per agent. The last slot is the open episode.
#[derive(Debug, Clone)]
pub struct BenchmarkBuffer<I> {
    num_agents: usize,
    episodes: Vec<Vec<Vec<I>>>,
}

impl<I: Clone> BenchmarkBuffer<I> {
    pub fn new(num_agents: usize) -> Self {
        BenchmarkBuffer {
            num_agents,
            episodes: vec![Self::empty_slot(num_agents)],
        }
    }

    fn empty_slot(num_agents: usize) -> Vec<Vec<I>> {
        vec![Vec::new(); num_agents]
    }

    /// Append one step's records (indexed by environment slot) to the open episode.
    pub fn push_step(&mut self, infos: Vec<I>) {
        if let Some(slot) = self.episodes.last_mut() {
            for (agent, info) in slot.iter_mut().zip(infos) {
                agent.push(info);
            }
        }
    }

    /// Start a fresh slot for the next episode.
    pub fn open_episode(&mut self) {
        self.episodes.push(Self::empty_slot(self.num_agents));
    }

    /// Every episode slot except the open one.
    pub fn closed(&self) -> &[Vec<Vec<I>>] {
        &self.episodes[..self.episodes.len().saturating_sub(1)]
    }

    /// Number of slots, including the open one.
    pub fn len(&self) -> usize {
        self.episodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.episodes.is_empty()
    }

    /// Drop everything and start over with a single empty slot.
    pub fn clear(&mut self) {
        self.episodes.clear();
        self.episodes.push(Self::empty_slot(self.num_agents));
    }
}
