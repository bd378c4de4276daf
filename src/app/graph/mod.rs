mod interaction;
mod project;
mod view;

#[cfg(test)]
use std::collections::HashMap;

use eframe::egui::{Pos2, Vec2};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{debug, info};

use crate::blueprint::{Blueprint, GraphNode};
use crate::config::SimulationConfig;

use super::physics::{SimLink, SimNode, Simulation, TickSnapshot};

pub(in crate::app) use interaction::{DragController, GestureOutcome, node_under_pointer};
pub(in crate::app) use project::{ActiveEdge, Projection, Seeding, project};

/// What the active node set was derived from. A change in either field
/// rebuilds the projection; nothing else does.
#[derive(Clone, Debug, PartialEq, Eq)]
struct ProjectionKey {
    blueprint: i64,
    filter: Option<String>,
}

/// Owns the projection, the one live simulation over it and the drag
/// gesture in progress.
pub(in crate::app) struct GraphCanvas {
    config: SimulationConfig,
    rng: StdRng,
    key: Option<ProjectionKey>,
    projection: Projection,
    simulation: Option<Simulation>,
    snapshot: Option<TickSnapshot>,
    drag: DragController,
    generation: u64,
}

impl GraphCanvas {
    pub(in crate::app) fn new(config: SimulationConfig, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Self {
            config,
            rng,
            key: None,
            projection: Projection::default(),
            simulation: None,
            snapshot: None,
            drag: DragController::default(),
            generation: 0,
        }
    }

    pub(in crate::app) fn generation(&self) -> u64 {
        self.generation
    }

    pub(in crate::app) fn projection(&self) -> &Projection {
        &self.projection
    }

    pub(in crate::app) fn node(&self, index: usize) -> Option<&GraphNode> {
        self.projection.nodes.get(index)
    }

    /// The latest snapshot, provided it belongs to the live simulation.
    pub(in crate::app) fn snapshot(&self) -> Option<&TickSnapshot> {
        self.snapshot
            .as_ref()
            .filter(|snapshot| snapshot.generation == self.generation)
    }

    pub(in crate::app) fn is_running(&self) -> bool {
        self.simulation.as_ref().is_some_and(Simulation::is_running)
    }

    pub(in crate::app) fn is_holding(&self) -> bool {
        self.drag.active_node().is_some()
    }

    pub(in crate::app) fn alpha(&self) -> Option<f32> {
        self.simulation.as_ref().map(Simulation::alpha)
    }

    /// Brings the projection in line with the blueprint and filter. Returns
    /// whether a rebuild happened.
    pub(in crate::app) fn sync(&mut self, blueprint: Option<&Blueprint>, filter: Option<&str>) -> bool {
        let Some(blueprint) = blueprint else {
            if self.key.is_some() {
                self.unmount();
            }
            return false;
        };

        let key = ProjectionKey {
            blueprint: blueprint.identity(),
            filter: filter.map(str::to_owned),
        };
        if self.key.as_ref() == Some(&key) {
            return false;
        }

        self.rebuild(blueprint, key);
        true
    }

    fn rebuild(&mut self, blueprint: &Blueprint, key: ProjectionKey) {
        let prior = self
            .simulation
            .as_ref()
            .map(Simulation::positions_by_id)
            .unwrap_or_default();
        self.retire_simulation();

        let seeding = Seeding {
            center: Vec2::ZERO,
            jitter_radius: self.config.jitter_radius,
        };
        let projection = project(blueprint, key.filter.as_deref(), &prior, seeding, &mut self.rng);
        info!(
            blueprint = key.blueprint,
            filter = key.filter.as_deref().unwrap_or("<all>"),
            nodes = projection.nodes.len(),
            edges = projection.edges.len(),
            reused = projection.reused,
            seeded = projection.seeded,
            "graph projection rebuilt"
        );

        self.generation = self.generation.wrapping_add(1);
        if !projection.is_empty() {
            let nodes = projection
                .nodes
                .iter()
                .zip(&projection.positions)
                .map(|(node, position)| SimNode::new(node.id.clone(), *position))
                .collect();
            let links = projection
                .edges
                .iter()
                .map(|edge| SimLink {
                    source: edge.source,
                    target: edge.target,
                })
                .collect();

            let simulation = Simulation::new(self.generation, nodes, links, &self.config);
            self.snapshot = Some(simulation.snapshot());
            self.simulation = Some(simulation);
        }

        self.projection = projection;
        self.key = Some(key);
    }

    /// Stops and discards the simulation, releasing any held node first.
    fn retire_simulation(&mut self) {
        self.drag.cancel(self.simulation.as_mut());
        if let Some(mut simulation) = self.simulation.take() {
            simulation.stop();
        }
        self.snapshot = None;
    }

    /// Tears the canvas down. Nothing ticks afterwards until the next sync.
    pub(in crate::app) fn unmount(&mut self) {
        if self.key.is_none() && self.simulation.is_none() {
            return;
        }

        self.retire_simulation();
        self.projection = Projection::default();
        self.key = None;
        debug!("graph canvas unmounted");
    }

    /// Advances one frame. Returns whether positions changed.
    pub(in crate::app) fn tick(&mut self) -> bool {
        let Some(simulation) = self.simulation.as_mut() else {
            return false;
        };

        match simulation.tick() {
            Some(snapshot) => {
                self.snapshot = Some(snapshot);
                true
            }
            None => false,
        }
    }

    pub(in crate::app) fn reconfigure(&mut self, config: SimulationConfig) {
        self.config = config.sanitized();
        if let Some(simulation) = self.simulation.as_mut() {
            simulation.reconfigure(&self.config);
        }
    }

    pub(in crate::app) fn reheat(&mut self) {
        if let Some(simulation) = self.simulation.as_mut() {
            simulation.reheat(self.config.reheat_alpha_target);
        }
    }

    pub(in crate::app) fn press(&mut self, index: usize, pointer_world: Vec2, pointer_screen: Pos2) {
        let reheat_target = self.config.reheat_alpha_target;
        if let Some(simulation) = self.simulation.as_mut() {
            self.drag
                .press(simulation, index, pointer_world, pointer_screen, reheat_target);
            self.snapshot = Some(simulation.snapshot());
        }
    }

    pub(in crate::app) fn drag_to(&mut self, pointer_world: Vec2, pointer_screen: Pos2) {
        let tolerance = self.config.click_tolerance;
        if let Some(simulation) = self.simulation.as_mut() {
            self.drag
                .drag(simulation, pointer_world, pointer_screen, tolerance);
            self.snapshot = Some(simulation.snapshot());
        }
    }

    /// Ends the gesture. A click hands exactly one node to `on_select`.
    pub(in crate::app) fn release(&mut self, on_select: impl FnOnce(&GraphNode)) -> GestureOutcome {
        let Some(simulation) = self.simulation.as_mut() else {
            self.drag.cancel(None);
            return GestureOutcome::None;
        };

        let outcome = self.drag.release(simulation);
        if let GestureOutcome::Click(index) = outcome
            && let Some(node) = self.projection.nodes.get(index)
        {
            on_select(node);
        }
        outcome
    }

    pub(in crate::app) fn cancel_gesture(&mut self) {
        self.drag.cancel(self.simulation.as_mut());
    }

    #[cfg(test)]
    pub(in crate::app) fn positions_by_id(&self) -> HashMap<String, Vec2> {
        self.simulation
            .as_ref()
            .map(Simulation::positions_by_id)
            .unwrap_or_default()
    }
}

impl Drop for GraphCanvas {
    fn drop(&mut self) {
        self.unmount();
    }
}

#[cfg(test)]
mod tests {
    use eframe::egui::{pos2, vec2};

    use super::*;
    use crate::blueprint::{GraphEdge, NodeKind, NodeStatus};

    fn node(id: &str, tech: &str) -> GraphNode {
        GraphNode {
            id: id.to_owned(),
            label: id.to_uppercase(),
            kind: NodeKind::Service,
            tech: tech.to_owned(),
            status: NodeStatus::Optimal,
            details: None,
        }
    }

    fn edge(source: &str, target: &str) -> GraphEdge {
        GraphEdge {
            source: source.to_owned(),
            target: target.to_owned(),
            protocol: "HTTP".to_owned(),
            latency: 30.0,
        }
    }

    fn blueprint(timestamp: i64) -> Blueprint {
        Blueprint {
            nodes: vec![node("a", "Y"), node("b", "X"), node("c", "Y")],
            edges: vec![edge("a", "b"), edge("b", "c")],
            timestamp: Some(timestamp),
            ..Blueprint::default()
        }
    }

    fn canvas() -> GraphCanvas {
        GraphCanvas::new(SimulationConfig::default(), Some(42))
    }

    fn settle(canvas: &mut GraphCanvas) {
        let mut ticks = 0;
        while canvas.tick() {
            ticks += 1;
            assert!(ticks < 10_000);
        }
    }

    fn world_of(canvas: &GraphCanvas, index: usize) -> Vec2 {
        canvas.snapshot().expect("live snapshot").positions[index]
    }

    #[test]
    fn no_blueprint_means_no_simulation() {
        let mut canvas = canvas();

        assert!(!canvas.sync(None, None));
        assert!(!canvas.tick());
        assert!(canvas.snapshot().is_none());
    }

    #[test]
    fn unrelated_syncs_do_not_rebuild() {
        let mut canvas = canvas();
        let blueprint = blueprint(1);
        assert!(canvas.sync(Some(&blueprint), None));
        for _ in 0..10 {
            canvas.tick();
        }
        let before = canvas.positions_by_id();

        assert!(!canvas.sync(Some(&blueprint), None));
        assert_eq!(canvas.positions_by_id(), before);
    }

    #[test]
    fn new_blueprint_identity_keeps_surviving_positions() {
        let mut canvas = canvas();
        canvas.sync(Some(&blueprint(1)), None);
        settle(&mut canvas);
        let before = canvas.positions_by_id();

        let mut next = blueprint(2);
        next.nodes.push(node("d", "Y"));
        assert!(canvas.sync(Some(&next), None));

        let after = canvas.positions_by_id();
        for id in ["a", "b", "c"] {
            assert_eq!(after[id], before[id]);
        }
        assert!(after["d"].x.abs() <= 50.0 && after["d"].y.abs() <= 50.0);
    }

    #[test]
    fn filter_round_trip_scenario() {
        let mut canvas = canvas();
        let blueprint = blueprint(1);
        canvas.sync(Some(&blueprint), None);
        settle(&mut canvas);

        assert!(canvas.sync(Some(&blueprint), Some("X")));
        assert_eq!(canvas.projection().nodes.len(), 1);
        assert!(canvas.projection().edges.is_empty());
        for _ in 0..30 {
            canvas.tick();
        }
        let b_position = canvas.positions_by_id()["b"];

        assert!(canvas.sync(Some(&blueprint), None));
        let restored = canvas.positions_by_id();
        assert_eq!(canvas.projection().edges.len(), 2);
        assert_eq!(restored["b"], b_position);
        for id in ["a", "c"] {
            assert!(restored[id].x.abs() <= 50.0 && restored[id].y.abs() <= 50.0);
        }
    }

    #[test]
    fn rebuild_invalidates_old_generation() {
        let mut canvas = canvas();
        canvas.sync(Some(&blueprint(1)), None);
        let first_generation = canvas.snapshot().expect("snapshot").generation;

        canvas.sync(Some(&blueprint(2)), None);
        let second_generation = canvas.snapshot().expect("snapshot").generation;

        assert!(second_generation > first_generation);
    }

    #[test]
    fn unmount_stops_all_ticking() {
        let mut canvas = canvas();
        canvas.sync(Some(&blueprint(1)), None);
        canvas.tick();
        canvas.unmount();

        assert!(!canvas.tick());
        assert!(canvas.snapshot().is_none());
        assert!(canvas.positions_by_id().is_empty());
        assert!(!canvas.is_running());
    }

    #[test]
    fn clearing_the_blueprint_unmounts() {
        let mut canvas = canvas();
        canvas.sync(Some(&blueprint(1)), None);
        canvas.sync(None, None);

        assert!(!canvas.tick());
        assert!(canvas.projection().is_empty());
    }

    #[test]
    fn click_selects_exactly_once() {
        let mut canvas = canvas();
        canvas.sync(Some(&blueprint(1)), None);
        let world = world_of(&canvas, 1);
        let mut selected = Vec::new();

        canvas.press(1, world, pos2(100.0, 100.0));
        canvas.drag_to(world + vec2(0.5, 0.0), pos2(100.5, 100.0));
        let outcome = canvas.release(|node| selected.push(node.id.clone()));

        assert_eq!(outcome, GestureOutcome::Click(1));
        assert_eq!(selected, vec!["b".to_owned()]);
    }

    #[test]
    fn drag_never_selects() {
        let mut canvas = canvas();
        canvas.sync(Some(&blueprint(1)), None);
        let world = world_of(&canvas, 0);
        let mut selections = 0;

        canvas.press(0, world, pos2(100.0, 100.0));
        canvas.drag_to(world + vec2(60.0, 10.0), pos2(160.0, 110.0));
        canvas.tick();
        assert_eq!(world_of(&canvas, 0), world + vec2(60.0, 10.0));
        let outcome = canvas.release(|_| selections += 1);

        assert_eq!(outcome, GestureOutcome::Drag(0));
        assert_eq!(selections, 0);
    }

    #[test]
    fn dragged_node_follows_pointer_between_ticks() {
        let mut canvas = canvas();
        canvas.sync(Some(&blueprint(1)), None);
        let start = world_of(&canvas, 0);

        canvas.press(0, start, pos2(100.0, 100.0));
        assert!(canvas.snapshot().expect("live snapshot").pinned[0]);
        canvas.drag_to(start + vec2(150.0, 0.0), pos2(250.0, 100.0));

        assert_eq!(world_of(&canvas, 0), start + vec2(150.0, 0.0));
        assert_eq!(canvas.release(|_| {}), GestureOutcome::Drag(0));
    }

    #[test]
    fn grab_reheats_a_settled_layout() {
        let mut canvas = canvas();
        canvas.sync(Some(&blueprint(1)), None);
        settle(&mut canvas);
        assert!(!canvas.is_running());

        let world = world_of(&canvas, 2);
        canvas.press(2, world, pos2(0.0, 0.0));
        assert!(canvas.is_running());
        assert!(canvas.is_holding());

        canvas.release(|_| {});
        settle(&mut canvas);
        assert!(!canvas.is_running());
    }

    #[test]
    fn rebuild_mid_drag_releases_the_gesture() {
        let mut canvas = canvas();
        let blueprint = blueprint(1);
        canvas.sync(Some(&blueprint), None);
        let world = world_of(&canvas, 1);
        canvas.press(1, world, pos2(0.0, 0.0));

        canvas.sync(Some(&blueprint), Some("X"));

        assert!(!canvas.is_holding());
        assert_eq!(canvas.release(|_| panic!("no selection after rebuild")), GestureOutcome::None);
        assert!(!canvas.snapshot().expect("fresh snapshot").pinned[0]);
    }

    #[test]
    fn empty_filter_result_has_no_simulation() {
        let mut canvas = canvas();
        canvas.sync(Some(&blueprint(1)), Some("nothing"));

        assert!(canvas.projection().is_empty());
        assert!(!canvas.tick());
        assert!(canvas.snapshot().is_none());
    }
}
