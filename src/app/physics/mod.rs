//! Force-directed layout engine.
//!
//! A [`Simulation`] owns node positions outright. Rendering only ever sees a
//! [`TickSnapshot`], and the drag controller is limited to pinning one node
//! and moving the alpha target.

mod forces;
mod quadtree;

use std::collections::HashMap;

use eframe::egui::Vec2;
use tracing::debug;

use crate::config::SimulationConfig;

use forces::standard_forces;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(in crate::app) enum ForceStage {
    /// Adds to node velocities before integration.
    Velocity,
    /// Moves free node positions after integration.
    Constraint,
}

/// One contribution to the layout. Forces are run in registration order
/// within their stage.
pub(in crate::app) trait Force {
    fn name(&self) -> &'static str;

    fn stage(&self) -> ForceStage {
        ForceStage::Velocity
    }

    fn initialize(&mut self, _nodes: &[SimNode], _links: &[SimLink]) {}

    fn apply(&mut self, nodes: &mut [SimNode], links: &[SimLink], alpha: f32);
}

#[derive(Clone, Debug)]
pub(in crate::app) struct SimNode {
    pub(in crate::app) id: String,
    pub(in crate::app) position: Vec2,
    pub(in crate::app) velocity: Vec2,
    pub(in crate::app) pin: Option<Vec2>,
}

impl SimNode {
    pub(in crate::app) fn new(id: String, position: Vec2) -> Self {
        Self {
            id,
            position,
            velocity: Vec2::ZERO,
            pin: None,
        }
    }

    pub(in crate::app) fn is_pinned(&self) -> bool {
        self.pin.is_some()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(in crate::app) struct SimLink {
    pub(in crate::app) source: usize,
    pub(in crate::app) target: usize,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub(in crate::app) struct LinkFrame {
    pub(in crate::app) source: usize,
    pub(in crate::app) target: usize,
    pub(in crate::app) from: Vec2,
    pub(in crate::app) to: Vec2,
}

/// Fully computed state after a tick, handed to the render layer.
#[derive(Clone, Debug, PartialEq)]
pub(in crate::app) struct TickSnapshot {
    pub(in crate::app) generation: u64,
    pub(in crate::app) alpha: f32,
    pub(in crate::app) positions: Vec<Vec2>,
    pub(in crate::app) pinned: Vec<bool>,
    pub(in crate::app) links: Vec<LinkFrame>,
}

pub(in crate::app) struct Simulation {
    generation: u64,
    nodes: Vec<SimNode>,
    links: Vec<SimLink>,
    forces: Vec<Box<dyn Force>>,
    alpha: f32,
    alpha_min: f32,
    alpha_decay: f32,
    alpha_target: f32,
    velocity_decay: f32,
    running: bool,
    stopped: bool,
}

impl Simulation {
    pub(in crate::app) fn new(
        generation: u64,
        nodes: Vec<SimNode>,
        links: Vec<SimLink>,
        config: &SimulationConfig,
    ) -> Self {
        Self::with_forces(generation, nodes, links, config, standard_forces(config))
    }

    pub(in crate::app) fn with_forces(
        generation: u64,
        nodes: Vec<SimNode>,
        links: Vec<SimLink>,
        config: &SimulationConfig,
        forces: Vec<Box<dyn Force>>,
    ) -> Self {
        let links = links
            .into_iter()
            .filter(|link| link.source < nodes.len() && link.target < nodes.len())
            .collect::<Vec<_>>();

        let mut simulation = Self {
            generation,
            nodes,
            links,
            forces: Vec::new(),
            alpha: 1.0,
            alpha_min: config.alpha_min,
            alpha_decay: config.alpha_decay,
            alpha_target: 0.0,
            velocity_decay: config.velocity_decay,
            running: true,
            stopped: false,
        };
        simulation.set_forces(forces);
        debug!(
            generation,
            nodes = simulation.nodes.len(),
            links = simulation.links.len(),
            "simulation started"
        );
        simulation
    }

    pub(in crate::app) fn set_forces(&mut self, mut forces: Vec<Box<dyn Force>>) {
        for force in &mut forces {
            force.initialize(&self.nodes, &self.links);
        }
        self.forces = forces;
    }

    /// Swaps in new tunables while keeping positions, then reheats.
    pub(in crate::app) fn reconfigure(&mut self, config: &SimulationConfig) {
        self.alpha_min = config.alpha_min;
        self.alpha_decay = config.alpha_decay;
        self.velocity_decay = config.velocity_decay;
        self.set_forces(standard_forces(config));
        self.reheat(config.reheat_alpha_target);
    }

    pub(in crate::app) fn alpha(&self) -> f32 {
        self.alpha
    }

    pub(in crate::app) fn is_running(&self) -> bool {
        self.running && !self.stopped
    }

    #[cfg(test)]
    pub(in crate::app) fn is_stopped(&self) -> bool {
        self.stopped
    }

    pub(in crate::app) fn position(&self, index: usize) -> Option<Vec2> {
        self.nodes.get(index).map(|node| node.position)
    }

    /// Last known position per id. Duplicate ids resolve to the last node.
    pub(in crate::app) fn positions_by_id(&self) -> HashMap<String, Vec2> {
        self.nodes
            .iter()
            .map(|node| (node.id.clone(), node.position))
            .collect()
    }

    /// Holds a node at `position`, moving it there immediately.
    pub(in crate::app) fn pin(&mut self, index: usize, position: Vec2) {
        if self.stopped {
            return;
        }
        if let Some(node) = self.nodes.get_mut(index) {
            node.pin = Some(position);
            node.position = position;
            node.velocity = Vec2::ZERO;
        }
    }

    pub(in crate::app) fn unpin(&mut self, index: usize) {
        if let Some(node) = self.nodes.get_mut(index) {
            node.pin = None;
        }
    }

    pub(in crate::app) fn set_alpha_target(&mut self, target: f32) {
        self.alpha_target = target.clamp(0.0, 1.0);
    }

    /// Resumes ticking after settling. No effect once stopped.
    pub(in crate::app) fn restart(&mut self) {
        if !self.stopped {
            self.running = true;
        }
    }

    pub(in crate::app) fn reheat(&mut self, alpha: f32) {
        self.alpha = self.alpha.max(alpha.clamp(0.0, 1.0));
        self.restart();
    }

    /// Permanently halts the simulation; later ticks are no-ops.
    pub(in crate::app) fn stop(&mut self) {
        if !self.stopped {
            debug!(generation = self.generation, "simulation stopped");
        }
        self.stopped = true;
        self.running = false;
    }

    pub(in crate::app) fn tick(&mut self) -> Option<TickSnapshot> {
        if !self.is_running() {
            return None;
        }

        self.alpha += (self.alpha_target - self.alpha) * self.alpha_decay;
        let alpha = self.alpha;

        for force in &mut self.forces {
            if force.stage() == ForceStage::Velocity {
                force.apply(&mut self.nodes, &self.links, alpha);
            }
        }

        let retain = 1.0 - self.velocity_decay;
        for node in &mut self.nodes {
            match node.pin {
                Some(pin) => {
                    node.position = pin;
                    node.velocity = Vec2::ZERO;
                }
                None => {
                    node.velocity *= retain;
                    node.position += node.velocity;
                }
            }
        }

        for force in &mut self.forces {
            if force.stage() == ForceStage::Constraint {
                force.apply(&mut self.nodes, &self.links, alpha);
            }
        }

        if self.alpha < self.alpha_min && self.alpha_target < self.alpha_min {
            self.running = false;
            debug!(generation = self.generation, "simulation settled");
        }

        Some(self.snapshot())
    }

    pub(in crate::app) fn snapshot(&self) -> TickSnapshot {
        let positions = self.nodes.iter().map(|node| node.position).collect::<Vec<_>>();
        let links = self
            .links
            .iter()
            .map(|link| LinkFrame {
                source: link.source,
                target: link.target,
                from: positions[link.source],
                to: positions[link.target],
            })
            .collect();

        TickSnapshot {
            generation: self.generation,
            alpha: self.alpha,
            pinned: self.nodes.iter().map(SimNode::is_pinned).collect(),
            positions,
            links,
        }
    }

    #[cfg(test)]
    pub(in crate::app) fn force_names(&self) -> Vec<&'static str> {
        self.forces.iter().map(|force| force.name()).collect()
    }
}
