//! Multi-agent environment interface, the particle world, and the scenario
//! registry used by the training driver.

pub mod scenarios;
mod world;

pub use world::{Body, World};

use std::fmt::Debug;

use serde::Serialize;

use crate::error::EnvError;

/// Per-agent observation vector.
pub type Observation = Vec<f32>;

/// Per-agent action vector.
pub type Action = Vec<f32>;

/// Shape of an observation or action space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Space {
    /// A flat continuous vector of the given length.
    Box(usize),
    /// `n` discrete choices, exchanged as a length-`n` vector.
    Discrete(usize),
}

impl Space {
    /// Length of the vector used to carry a value of this space.
    pub fn dim(&self) -> usize {
        match *self {
            Space::Box(n) | Space::Discrete(n) => n,
        }
    }
}

/// Everything the environment reports after one joint step.
#[derive(Debug, Clone)]
pub struct Transition<I> {
    pub observations: Vec<Observation>,
    pub rewards: Vec<f64>,
    pub dones: Vec<bool>,
    pub infos: Vec<I>,
}

/// What kind of object a scene entity is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Agent,
    Landmark,
}

/// A drawable object in world coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    pub kind: EntityKind,
    pub index: usize,
    pub position: [f64; 2],
    pub size: f64,
    pub color: [u8; 3],
}

impl Entity {
    /// Text label overlaid next to the entity.
    pub fn label(&self) -> String {
        match self.kind {
            EntityKind::Agent => format!("Agent {}", self.index),
            EntityKind::Landmark => format!("LM{}", self.index),
        }
    }
}

/// A renderable snapshot of the environment.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Scene {
    pub entities: Vec<Entity>,
}

impl Scene {
    pub fn agents(&self) -> impl Iterator<Item = &Entity> {
        self.entities.iter().filter(|e| e.kind == EntityKind::Agent)
    }

    pub fn landmarks(&self) -> impl Iterator<Item = &Entity> {
        self.entities
            .iter()
            .filter(|e| e.kind == EntityKind::Landmark)
    }
}

/// A simulation shared by `n()` agents that act simultaneously.
pub trait MultiAgentEnv {
    /// Per-agent diagnostic record emitted on every step.
    type Info: Clone + Debug + Serialize;

    /// Number of agents.
    fn n(&self) -> usize;

    fn observation_space(&self, agent: usize) -> Space;

    fn action_space(&self, agent: usize) -> Space;

    /// Start a new episode and return the initial joint observation.
    fn reset(&mut self) -> Vec<Observation>;

    /// Apply one action per agent and advance the simulation by one step.
    fn step(&mut self, actions: &[Action]) -> Result<Transition<Self::Info>, EnvError>;

    /// Snapshot of the current state for display and recording.
    fn render(&self) -> Scene;
}
