//! Scenario registry and the particle-world adapter that turns a scenario
//! into a [`MultiAgentEnv`].

mod simple;
mod simple_spread;

pub use simple::Simple;
pub use simple_spread::SimpleSpread;

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::env::{
    Action, Entity, EntityKind, MultiAgentEnv, Observation, Scene, Space, Transition, World,
};
use crate::error::EnvError;

/// Names accepted by [`load`].
pub const SCENARIOS: &[&str] = &["simple", "simple_spread"];

/// Action vectors carry five entries: no-op, +x, -x, +y, -y.
const ACTION_DIM: usize = 5;

/// Scales action entries into forces.
const SENSITIVITY: f64 = 5.0;

/// Per-agent diagnostic record collected for benchmarking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostics {
    pub reward: f64,
    pub collisions: u32,
    pub min_dists: f64,
    pub occupied_landmarks: u32,
}

/// Rules that specialise the particle world.
pub trait Scenario {
    fn make_world(&self) -> World;

    fn reset_world(&self, world: &mut World, rng: &mut StdRng);

    fn reward(&self, agent: usize, world: &World) -> f64;

    fn observation(&self, agent: usize, world: &World) -> Observation;

    fn benchmark_data(&self, agent: usize, world: &World) -> Diagnostics;

    /// Whether all agents receive the summed reward.
    fn collaborative(&self) -> bool {
        false
    }
}

/// Look up a scenario by name and build its environment.
pub fn load(name: &str, benchmark: bool, seed: Option<u64>) -> Result<ParticleEnv, EnvError> {
    let scenario: Box<dyn Scenario> = match name {
        "simple" => Box::new(Simple),
        "simple_spread" => Box::new(SimpleSpread::default()),
        other => return Err(EnvError::UnknownScenario(other.to_string())),
    };
    Ok(ParticleEnv::new(scenario, benchmark, seed))
}

/// Multi-agent environment backed by a particle world and a scenario.
pub struct ParticleEnv {
    world: World,
    scenario: Box<dyn Scenario>,
    benchmark: bool,
    rng: StdRng,
}

impl ParticleEnv {
    pub fn new(scenario: Box<dyn Scenario>, benchmark: bool, seed: Option<u64>) -> Self {
        let mut rng = match seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_os_rng(),
        };
        let mut world = scenario.make_world();
        scenario.reset_world(&mut world, &mut rng);
        ParticleEnv {
            world,
            scenario,
            benchmark,
            rng,
        }
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    fn observations(&self) -> Vec<Observation> {
        (0..self.world.agents.len())
            .map(|i| self.scenario.observation(i, &self.world))
            .collect()
    }
}

impl MultiAgentEnv for ParticleEnv {
    /// `None` unless the environment was built for benchmarking.
    type Info = Option<Diagnostics>;

    fn n(&self) -> usize {
        self.world.agents.len()
    }

    fn observation_space(&self, agent: usize) -> Space {
        Space::Box(self.scenario.observation(agent, &self.world).len())
    }

    fn action_space(&self, _agent: usize) -> Space {
        Space::Discrete(ACTION_DIM)
    }

    fn reset(&mut self) -> Vec<Observation> {
        self.scenario.reset_world(&mut self.world, &mut self.rng);
        self.observations()
    }

    fn step(&mut self, actions: &[Action]) -> Result<Transition<Self::Info>, EnvError> {
        let n = self.n();
        if actions.len() != n {
            return Err(EnvError::ActionCount {
                expected: n,
                got: actions.len(),
            });
        }
        for (i, (agent, action)) in self.world.agents.iter_mut().zip(actions).enumerate() {
            if action.len() != ACTION_DIM {
                return Err(EnvError::ActionDim {
                    agent: i,
                    expected: ACTION_DIM,
                    got: action.len(),
                });
            }
            agent.force = [
                f64::from(action[1] - action[2]) * SENSITIVITY,
                f64::from(action[3] - action[4]) * SENSITIVITY,
            ];
        }
        self.world.step();

        let mut rewards: Vec<f64> = (0..n)
            .map(|i| self.scenario.reward(i, &self.world))
            .collect();
        if self.scenario.collaborative() {
            let total: f64 = rewards.iter().sum();
            rewards = vec![total; n];
        }
        let infos = (0..n)
            .map(|i| {
                self.benchmark
                    .then(|| self.scenario.benchmark_data(i, &self.world))
            })
            .collect();

        Ok(Transition {
            observations: self.observations(),
            rewards,
            dones: vec![false; n],
            infos,
        })
    }

    fn render(&self) -> Scene {
        let landmarks = self.world.landmarks.iter().enumerate().map(|(i, b)| Entity {
            kind: EntityKind::Landmark,
            index: i,
            position: b.pos,
            size: b.size,
            color: b.color,
        });
        let agents = self.world.agents.iter().enumerate().map(|(i, b)| Entity {
            kind: EntityKind::Agent,
            index: i,
            position: b.pos,
            size: b.size,
            color: b.color,
        });
        Scene {
            entities: landmarks.chain(agents).collect(),
        }
    }
}
