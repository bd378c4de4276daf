use eframe::egui::Vec2;

use crate::config::SimulationConfig;
use crate::util::pair_direction;

use super::quadtree::QuadTree;
use super::{Force, ForceStage, SimLink, SimNode};

const CHARGE_DISTANCE_MIN_SQ: f32 = 1.0;

pub(super) fn standard_forces(config: &SimulationConfig) -> Vec<Box<dyn Force>> {
    vec![
        Box::new(LinkForce::new(config.link_distance)),
        Box::new(ManyBodyForce::new(config.charge, config.theta)),
        Box::new(CenterForce::new(Vec2::ZERO, config.center_strength)),
        Box::new(CollisionForce::new(
            config.collision_radius,
            config.collision_iterations,
        )),
    ]
}

/// Springs between linked nodes. A link's strength is the inverse degree of
/// its less connected endpoint, and the correction is split by degree.
pub(super) struct LinkForce {
    distance: f32,
    strengths: Vec<f32>,
    biases: Vec<f32>,
}

impl LinkForce {
    pub(super) fn new(distance: f32) -> Self {
        Self {
            distance,
            strengths: Vec::new(),
            biases: Vec::new(),
        }
    }
}

impl Force for LinkForce {
    fn name(&self) -> &'static str {
        "link"
    }

    fn initialize(&mut self, nodes: &[SimNode], links: &[SimLink]) {
        let mut degree = vec![0usize; nodes.len()];
        for link in links {
            if link.source < nodes.len() && link.target < nodes.len() {
                degree[link.source] += 1;
                degree[link.target] += 1;
            }
        }

        let degree_of = |index: usize| degree.get(index).copied().unwrap_or(0);
        self.strengths = links
            .iter()
            .map(|link| 1.0 / degree_of(link.source).min(degree_of(link.target)).max(1) as f32)
            .collect();
        self.biases = links
            .iter()
            .map(|link| {
                let source = degree_of(link.source) as f32;
                let target = degree_of(link.target) as f32;
                if source + target > 0.0 {
                    source / (source + target)
                } else {
                    0.5
                }
            })
            .collect();
    }

    fn apply(&mut self, nodes: &mut [SimNode], links: &[SimLink], alpha: f32) {
        for (index, link) in links.iter().enumerate() {
            let (source, target) = (link.source, link.target);
            if source == target || source >= nodes.len() || target >= nodes.len() {
                continue;
            }
            let (Some(&strength), Some(&bias)) = (self.strengths.get(index), self.biases.get(index))
            else {
                continue;
            };

            let mut delta = (nodes[target].position + nodes[target].velocity)
                - (nodes[source].position + nodes[source].velocity);
            if delta.length_sq() <= f32::EPSILON {
                delta = pair_direction(target, source) * 1e-3;
            }
            let distance = delta.length();
            let correction = delta * ((distance - self.distance) / distance * alpha * strength);

            nodes[target].velocity -= correction * bias;
            nodes[source].velocity += correction * (1.0 - bias);
        }
    }
}

/// Pairwise charge, approximated with Barnes-Hut over a quadtree.
pub(super) struct ManyBodyForce {
    strength: f32,
    theta: f32,
}

impl ManyBodyForce {
    pub(super) fn new(strength: f32, theta: f32) -> Self {
        Self { strength, theta }
    }

    fn accumulate(
        &self,
        cell: &QuadTree,
        index: usize,
        positions: &[Vec2],
        weight: f32,
        push: &mut Vec2,
    ) {
        if cell.count == 0 {
            return;
        }

        let point = positions[index];
        if cell.is_leaf() {
            for &other in &cell.points {
                if other != index {
                    *push += charge(positions[other] - point, weight, index, other);
                }
            }
            return;
        }

        let offset = cell.centroid - point;
        let width = cell.bounds.width();
        if !cell.bounds.contains(point) && width * width < self.theta * self.theta * offset.length_sq()
        {
            *push += charge(offset, weight * cell.count as f32, index, usize::MAX);
            return;
        }

        for child in cell.children() {
            self.accumulate(child, index, positions, weight, push);
        }
    }
}

/// Velocity change on a node from a charge sitting at `offset` from it.
fn charge(offset: Vec2, weight: f32, index: usize, other: usize) -> Vec2 {
    let mut distance_sq = offset.length_sq();
    let offset = if distance_sq <= f32::EPSILON {
        distance_sq = 1.0;
        -pair_direction(index, other)
    } else {
        offset
    };
    if distance_sq < CHARGE_DISTANCE_MIN_SQ {
        distance_sq = (CHARGE_DISTANCE_MIN_SQ * distance_sq).sqrt();
    }
    offset * (weight / distance_sq)
}

impl Force for ManyBodyForce {
    fn name(&self) -> &'static str {
        "many-body"
    }

    fn apply(&mut self, nodes: &mut [SimNode], _links: &[SimLink], alpha: f32) {
        if nodes.len() < 2 || self.strength == 0.0 {
            return;
        }

        let positions = nodes.iter().map(|node| node.position).collect::<Vec<_>>();
        let Some(tree) = QuadTree::build(&positions) else {
            return;
        };

        let weight = self.strength * alpha;
        for (index, node) in nodes.iter_mut().enumerate() {
            let mut push = Vec2::ZERO;
            self.accumulate(&tree, index, &positions, weight, &mut push);
            node.velocity += push;
        }
    }
}

/// Translates free nodes so their centroid drifts toward `center`.
pub(super) struct CenterForce {
    center: Vec2,
    strength: f32,
}

impl CenterForce {
    pub(super) fn new(center: Vec2, strength: f32) -> Self {
        Self { center, strength }
    }
}

impl Force for CenterForce {
    fn name(&self) -> &'static str {
        "center"
    }

    fn stage(&self) -> ForceStage {
        ForceStage::Constraint
    }

    fn apply(&mut self, nodes: &mut [SimNode], _links: &[SimLink], _alpha: f32) {
        if self.strength <= 0.0 {
            return;
        }

        let (sum, free) = nodes
            .iter()
            .filter(|node| !node.is_pinned())
            .fold((Vec2::ZERO, 0usize), |(sum, free), node| (sum + node.position, free + 1));
        if free == 0 {
            return;
        }

        let shift = (self.center - sum / free as f32) * self.strength;
        for node in nodes.iter_mut().filter(|node| !node.is_pinned()) {
            node.position += shift;
        }
    }
}

/// Hard minimum separation between node centers, resolved on positions after
/// integration. Pinned nodes are never displaced; their partner takes the
/// whole correction.
pub(super) struct CollisionForce {
    radius: f32,
    iterations: usize,
}

impl CollisionForce {
    pub(super) fn new(radius: f32, iterations: usize) -> Self {
        Self {
            radius,
            iterations: iterations.max(1),
        }
    }
}

impl Force for CollisionForce {
    fn name(&self) -> &'static str {
        "collision"
    }

    fn stage(&self) -> ForceStage {
        ForceStage::Constraint
    }

    fn apply(&mut self, nodes: &mut [SimNode], _links: &[SimLink], _alpha: f32) {
        let min_distance = self.radius * 2.0;
        if min_distance <= 0.0 || nodes.len() < 2 {
            return;
        }

        let mut positions = Vec::with_capacity(nodes.len());
        let mut pairs = Vec::new();
        for _ in 0..self.iterations {
            positions.clear();
            positions.extend(nodes.iter().map(|node| node.position));
            let Some(tree) = QuadTree::build(&positions) else {
                return;
            };

            pairs.clear();
            collect_close_pairs(&tree, &tree, true, min_distance * min_distance, &mut pairs);

            let mut separated_any = false;
            for &(first, second) in &pairs {
                separated_any |= separate(nodes, first, second, min_distance);
            }
            if !separated_any {
                break;
            }
        }
    }
}

fn separate(nodes: &mut [SimNode], first: usize, second: usize, min_distance: f32) -> bool {
    let (first_free, second_free) = (!nodes[first].is_pinned(), !nodes[second].is_pinned());
    if !first_free && !second_free {
        return false;
    }

    let offset = nodes[first].position - nodes[second].position;
    let distance = offset.length();
    if distance >= min_distance {
        return false;
    }

    let direction = if distance > 1e-4 {
        offset / distance
    } else {
        pair_direction(first, second)
    };
    let overlap = min_distance - distance;
    let (first_share, second_share) = match (first_free, second_free) {
        (true, true) => (0.5, 0.5),
        (true, false) => (1.0, 0.0),
        _ => (0.0, 1.0),
    };

    nodes[first].position += direction * (overlap * first_share);
    nodes[second].position -= direction * (overlap * second_share);
    true
}

fn collect_close_pairs(
    cell_a: &QuadTree,
    cell_b: &QuadTree,
    same_cell: bool,
    reach_sq: f32,
    pairs: &mut Vec<(usize, usize)>,
) {
    if cell_a.bounds.gap_sq(cell_b.bounds) > reach_sq {
        return;
    }

    match (cell_a.is_leaf(), cell_b.is_leaf()) {
        (true, true) if same_cell => {
            for (offset, &first) in cell_a.points.iter().enumerate() {
                for &second in &cell_a.points[offset + 1..] {
                    pairs.push((first, second));
                }
            }
        }
        (true, true) => {
            for &first in &cell_a.points {
                for &second in &cell_b.points {
                    pairs.push((first, second));
                }
            }
        }
        _ if same_cell => {
            let children = cell_a.children().collect::<Vec<_>>();
            for (offset, first) in children.iter().enumerate() {
                collect_close_pairs(first, first, true, reach_sq, pairs);
                for second in &children[offset + 1..] {
                    collect_close_pairs(first, second, false, reach_sq, pairs);
                }
            }
        }
        (a_is_leaf, b_is_leaf) => {
            let split_a =
                !a_is_leaf && (b_is_leaf || cell_a.bounds.half_extent >= cell_b.bounds.half_extent);
            if split_a {
                for child in cell_a.children() {
                    collect_close_pairs(child, cell_b, false, reach_sq, pairs);
                }
            } else {
                for child in cell_b.children() {
                    collect_close_pairs(cell_a, child, false, reach_sq, pairs);
                }
            }
        }
    }
}
