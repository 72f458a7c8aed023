use rand::rngs::StdRng;
use rand::Rng;

use super::{Diagnostics, Scenario};
use crate::env::{Body, Observation, World};

/// One agent, one landmark; reward is the negative squared distance.
#[derive(Debug, Clone, Copy, Default)]
pub struct Simple;

impl Scenario for Simple {
    fn make_world(&self) -> World {
        let mut agent = Body::agent(0.05);
        agent.collide = false;
        agent.color = [64, 64, 64];
        let mut landmark = Body::landmark(0.05);
        landmark.color = [191, 64, 64];
        World::new(vec![agent], vec![landmark])
    }

    fn reset_world(&self, world: &mut World, rng: &mut StdRng) {
        for body in world.agents.iter_mut().chain(world.landmarks.iter_mut()) {
            body.pos = [rng.random_range(-1.0..1.0), rng.random_range(-1.0..1.0)];
            body.vel = [0.0; 2];
            body.force = [0.0; 2];
        }
    }

    fn reward(&self, agent: usize, world: &World) -> f64 {
        let d = world.agents[agent].distance(&world.landmarks[0]);
        -(d * d)
    }

    fn observation(&self, agent: usize, world: &World) -> Observation {
        let a = &world.agents[agent];
        let mut obs = vec![a.vel[0] as f32, a.vel[1] as f32];
        for l in &world.landmarks {
            obs.push((l.pos[0] - a.pos[0]) as f32);
            obs.push((l.pos[1] - a.pos[1]) as f32);
        }
        obs
    }

    fn benchmark_data(&self, agent: usize, world: &World) -> Diagnostics {
        let a = &world.agents[agent];
        let dist = a.distance(&world.landmarks[0]);
        Diagnostics {
            reward: self.reward(agent, world),
            collisions: 0,
            min_dists: dist,
            occupied_landmarks: u32::from(dist < a.size + world.landmarks[0].size),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn test_reward_is_negative_squared_distance() {
        let mut world = Simple.make_world();
        world.agents[0].pos = [0.0, 0.0];
        world.landmarks[0].pos = [0.3, 0.4];
        assert!((Simple.reward(0, &world) + 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_observation_layout() {
        let mut world = Simple.make_world();
        Simple.reset_world(&mut world, &mut StdRng::seed_from_u64(0));
        world.agents[0].pos = [0.1, 0.1];
        world.landmarks[0].pos = [0.6, -0.4];
        let obs = Simple.observation(0, &world);
        assert_eq!(obs.len(), 4);
        assert!((obs[2] - 0.5).abs() < 1e-6);
        assert!((obs[3] + 0.5).abs() < 1e-6);
    }
}
