use rand::rngs::StdRng;
use rand::Rng;

use super::{Diagnostics, Scenario};
use crate::env::{Body, Observation, World};

/// Distance under which a landmark counts as occupied.
const OCCUPIED_DIST: f64 = 0.1;

/// Cooperative navigation: `n` agents must cover `n` landmarks while
/// avoiding each other.
#[derive(Debug, Clone, Copy)]
pub struct SimpleSpread {
    pub num_agents: usize,
    pub num_landmarks: usize,
}

impl Default for SimpleSpread {
    fn default() -> Self {
        SimpleSpread {
            num_agents: 3,
            num_landmarks: 3,
        }
    }
}

impl SimpleSpread {
    fn collisions(&self, agent: usize, world: &World) -> u32 {
        let me = &world.agents[agent];
        world
            .agents
            .iter()
            .enumerate()
            .filter(|&(j, other)| j != agent && me.collide && other.collides_with(me))
            .count() as u32
    }

    /// Sum over landmarks of the distance to the closest agent.
    fn coverage(&self, world: &World) -> (f64, u32) {
        let mut total = 0.0;
        let mut occupied = 0;
        for l in &world.landmarks {
            let nearest = world
                .agents
                .iter()
                .map(|a| a.distance(l))
                .fold(f64::INFINITY, f64::min);
            total += nearest;
            if nearest < OCCUPIED_DIST {
                occupied += 1;
            }
        }
        (total, occupied)
    }
}

impl Scenario for SimpleSpread {
    fn make_world(&self) -> World {
        let agents = (0..self.num_agents).map(|_| Body::agent(0.15)).collect();
        let landmarks = (0..self.num_landmarks)
            .map(|_| Body::landmark(0.05))
            .collect();
        World::new(agents, landmarks)
    }

    fn reset_world(&self, world: &mut World, rng: &mut StdRng) {
        for body in world.agents.iter_mut().chain(world.landmarks.iter_mut()) {
            body.pos = [rng.random_range(-1.0..1.0), rng.random_range(-1.0..1.0)];
            body.vel = [0.0; 2];
            body.force = [0.0; 2];
        }
    }

    fn reward(&self, agent: usize, world: &World) -> f64 {
        let (coverage, _) = self.coverage(world);
        -coverage - f64::from(self.collisions(agent, world))
    }

    fn observation(&self, agent: usize, world: &World) -> Observation {
        let me = &world.agents[agent];
        let rel = |b: &Body| [(b.pos[0] - me.pos[0]) as f32, (b.pos[1] - me.pos[1]) as f32];

        let mut obs = vec![
            me.vel[0] as f32,
            me.vel[1] as f32,
            me.pos[0] as f32,
            me.pos[1] as f32,
        ];
        for l in &world.landmarks {
            obs.extend(rel(l));
        }
        let others = world
            .agents
            .iter()
            .enumerate()
            .filter(|&(j, _)| j != agent)
            .map(|(_, b)| b);
        for other in others.clone() {
            obs.extend(rel(other));
        }
        // Agents never speak in this scenario; the channel stays zeroed.
        obs.extend(others.flat_map(|_| [0.0f32; 2]));
        obs
    }

    fn benchmark_data(&self, agent: usize, world: &World) -> Diagnostics {
        let (min_dists, occupied_landmarks) = self.coverage(world);
        Diagnostics {
            reward: self.reward(agent, world),
            collisions: self.collisions(agent, world),
            min_dists,
            occupied_landmarks,
        }
    }

    fn collaborative(&self) -> bool {
        true
    }
}
