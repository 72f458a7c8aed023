/// A point mass in the particle world.
#[derive(Debug, Clone, PartialEq)]
pub struct Body {
    pub pos: [f64; 2],
    pub vel: [f64; 2],
    pub size: f64,
    pub mass: f64,
    pub movable: bool,
    pub collide: bool,
    pub color: [u8; 3],
    /// Control force requested for the current step.
    pub force: [f64; 2],
}

impl Body {
    pub fn agent(size: f64) -> Self {
        Body {
            pos: [0.0; 2],
            vel: [0.0; 2],
            size,
            mass: 1.0,
            movable: true,
            collide: true,
            color: [89, 89, 217],
            force: [0.0; 2],
        }
    }

    pub fn landmark(size: f64) -> Self {
        Body {
            pos: [0.0; 2],
            vel: [0.0; 2],
            size,
            mass: 1.0,
            movable: false,
            collide: false,
            color: [64, 64, 64],
            force: [0.0; 2],
        }
    }

    pub fn distance(&self, other: &Body) -> f64 {
        let dx = self.pos[0] - other.pos[0];
        let dy = self.pos[1] - other.pos[1];
        (dx * dx + dy * dy).sqrt()
    }

    pub fn collides_with(&self, other: &Body) -> bool {
        self.distance(other) < self.size + other.size
    }
}

/// Kinematic 2-D world: agents push themselves around, landmarks stay put.
#[derive(Debug, Clone)]
pub struct World {
    pub agents: Vec<Body>,
    pub landmarks: Vec<Body>,
    pub dt: f64,
    pub damping: f64,
    pub contact_force: f64,
    pub contact_margin: f64,
}

impl World {
    pub fn new(agents: Vec<Body>, landmarks: Vec<Body>) -> Self {
        World {
            agents,
            landmarks,
            dt: 0.1,
            damping: 0.25,
            contact_force: 1e2,
            contact_margin: 1e-3,
        }
    }

    /// Advance one timestep using the control forces stored on each agent.
    pub fn step(&mut self) {
        let mut forces: Vec<[f64; 2]> = self
            .agents
            .iter()
            .map(|a| if a.movable { a.force } else { [0.0; 2] })
            .collect();

        for a in 0..self.agents.len() {
            for b in (a + 1)..self.agents.len() {
                let (fa, fb) = self.collision_force(&self.agents[a], &self.agents[b]);
                if let Some(f) = fa {
                    forces[a][0] += f[0];
                    forces[a][1] += f[1];
                }
                if let Some(f) = fb {
                    forces[b][0] += f[0];
                    forces[b][1] += f[1];
                }
            }
            for l in 0..self.landmarks.len() {
                let (fa, _) = self.collision_force(&self.agents[a], &self.landmarks[l]);
                if let Some(f) = fa {
                    forces[a][0] += f[0];
                    forces[a][1] += f[1];
                }
            }
        }

        let (dt, damping) = (self.dt, self.damping);
        for (agent, force) in self.agents.iter_mut().zip(forces) {
            if !agent.movable {
                continue;
            }
            for d in 0..2 {
                agent.vel[d] = agent.vel[d] * (1.0 - damping) + force[d] / agent.mass * dt;
                agent.pos[d] += agent.vel[d] * dt;
            }
        }
    }

    /// Soft contact force between two overlapping bodies.
    fn collision_force(&self, a: &Body, b: &Body) -> (Option<[f64; 2]>, Option<[f64; 2]>) {
        if !a.collide || !b.collide {
            return (None, None);
        }
        let delta = [a.pos[0] - b.pos[0], a.pos[1] - b.pos[1]];
        let dist = (delta[0] * delta[0] + delta[1] * delta[1]).sqrt();
        if dist == 0.0 {
            return (None, None);
        }
        let k = self.contact_margin;
        let penetration = softplus(-(dist - (a.size + b.size)) / k) * k;
        let scale = self.contact_force * penetration / dist;
        let force = [delta[0] * scale, delta[1] * scale];
        let fa = a.movable.then_some(force);
        let fb = b.movable.then_some([-force[0], -force[1]]);
        (fa, fb)
    }
}

/// `ln(1 + e^x)` without overflow for large `x`.
fn softplus(x: f64) -> f64 {
    x.max(0.0) + (-x.abs()).exp().ln_1p()
}
