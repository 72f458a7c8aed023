use rand::rngs::StdRng;
use rand::Rng;
use rand::SeedableRng;

use crate::trainer::Experience;

/// Fixed-capacity ring buffer of transitions, sampled by index so that
/// several agents can draw the same timesteps from their own buffers.
pub struct ReplayBuffer {
    buffer: Vec<Experience>,
    capacity: usize,
    position: usize,
    rng: StdRng,
}

impl ReplayBuffer {
    pub fn new(capacity: usize) -> Self {
        Self::with_rng(capacity, StdRng::from_os_rng())
    }

    pub fn with_seed(capacity: usize, seed: u64) -> Self {
        Self::with_rng(capacity, StdRng::seed_from_u64(seed))
    }

    fn with_rng(capacity: usize, rng: StdRng) -> Self {
        assert!(capacity > 0, "replay capacity must be positive");
        ReplayBuffer {
            buffer: Vec::with_capacity(capacity.min(4096)),
            capacity,
            position: 0,
            rng,
        }
    }

    /// Add an experience to the buffer. Overwrites oldest when full.
    pub fn push(&mut self, experience: Experience) {
        if self.buffer.len() < self.capacity {
            self.buffer.push(experience);
        } else {
            self.buffer[self.position] = experience;
        }
        self.position = (self.position + 1) % self.capacity;
    }

    /// Draw `batch_size` indices uniformly, with replacement.
    pub fn make_index(&mut self, batch_size: usize) -> Vec<usize> {
        assert!(!self.buffer.is_empty(), "Cannot sample from an empty buffer");
        let len = self.buffer.len();
        (0..batch_size)
            .map(|_| self.rng.random_range(0..len))
            .collect()
    }

    /// Collect the experiences stored at `indices`. Indices past the end wrap.
    pub fn sample_index(&self, indices: &[usize]) -> Vec<Experience> {
        if self.buffer.is_empty() {
            return Vec::new();
        }
        indices
            .iter()
            .map(|&i| self.buffer[i % self.buffer.len()].clone())
            .collect()
    }

    /// Raw storage in slot order.
    pub fn storage(&self) -> &[Experience] {
        &self.buffer
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
