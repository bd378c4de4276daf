use std::collections::HashMap;

use eframe::egui::{Vec2, vec2};
use rand::Rng;

use crate::blueprint::{Blueprint, GraphNode};

/// Where genuinely new nodes are dropped.
#[derive(Clone, Copy, Debug)]
pub(in crate::app) struct Seeding {
    pub(in crate::app) center: Vec2,
    pub(in crate::app) jitter_radius: f32,
}

#[derive(Clone, Debug, PartialEq)]
pub(in crate::app) struct ActiveEdge {
    pub(in crate::app) source: usize,
    pub(in crate::app) target: usize,
    pub(in crate::app) protocol: String,
    pub(in crate::app) latency: f32,
}

/// The filtered node/edge set currently on the canvas.
#[derive(Clone, Debug, Default)]
pub(in crate::app) struct Projection {
    pub(in crate::app) nodes: Vec<GraphNode>,
    pub(in crate::app) positions: Vec<Vec2>,
    pub(in crate::app) edges: Vec<ActiveEdge>,
    pub(in crate::app) index_by_id: HashMap<String, usize>,
    pub(in crate::app) reused: usize,
    pub(in crate::app) seeded: usize,
}

impl Projection {
    pub(in crate::app) fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Derives the active graph. Nodes are kept when their `tech` equals the
/// filter exactly; edges survive only with both endpoints present. Duplicate
/// ids are all kept as nodes, but id lookups resolve to the last one.
pub(in crate::app) fn project(
    blueprint: &Blueprint,
    filter: Option<&str>,
    prior: &HashMap<String, Vec2>,
    seeding: Seeding,
    rng: &mut impl Rng,
) -> Projection {
    let half_jitter = seeding.jitter_radius.max(0.0) * 0.5;
    let mut projection = Projection::default();

    for node in &blueprint.nodes {
        if filter.is_some_and(|tech| node.tech != tech) {
            continue;
        }

        let position = match prior.get(&node.id) {
            Some(&position) => {
                projection.reused += 1;
                position
            }
            None => {
                projection.seeded += 1;
                seeding.center
                    + vec2(
                        rng.gen_range(-half_jitter..=half_jitter),
                        rng.gen_range(-half_jitter..=half_jitter),
                    )
            }
        };

        projection
            .index_by_id
            .insert(node.id.clone(), projection.nodes.len());
        projection.nodes.push(node.clone());
        projection.positions.push(position);
    }

    projection.edges = blueprint
        .edges
        .iter()
        .filter_map(|edge| {
            let source = *projection.index_by_id.get(&edge.source)?;
            let target = *projection.index_by_id.get(&edge.target)?;
            Some(ActiveEdge {
                source,
                target,
                protocol: edge.protocol.clone(),
                latency: edge.latency.max(0.0),
            })
        })
        .collect();

    projection
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;
    use crate::blueprint::{GraphEdge, NodeKind, NodeStatus};

    const SEEDING: Seeding = Seeding {
        center: Vec2::ZERO,
        jitter_radius: 100.0,
    };

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
            latency: 20.0,
        }
    }

    fn abc() -> Blueprint {
        Blueprint {
            nodes: vec![node("a", "Y"), node("b", "X"), node("c", "Y")],
            edges: vec![edge("a", "b"), edge("b", "c")],
            timestamp: Some(1),
            ..Blueprint::default()
        }
    }

    fn positions_by_id(projection: &Projection) -> HashMap<String, Vec2> {
        projection
            .nodes
            .iter()
            .zip(&projection.positions)
            .map(|(node, position)| (node.id.clone(), *position))
            .collect()
    }

    #[test]
    fn every_edge_endpoint_is_an_active_node() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut blueprint = abc();
        blueprint.edges.push(edge("a", "missing"));
        blueprint.edges.push(edge("ghost", "c"));

        for filter in [None, Some("X"), Some("Y"), Some("nothing")] {
            let projection = project(&blueprint, filter, &HashMap::new(), SEEDING, &mut rng);
            for active in &projection.edges {
                assert!(active.source < projection.nodes.len());
                assert!(active.target < projection.nodes.len());
            }
        }
    }

    #[test]
    fn new_nodes_are_seeded_within_jitter_of_center() {
        let mut rng = StdRng::seed_from_u64(7);
        let seeding = Seeding {
            center: vec2(30.0, -20.0),
            jitter_radius: 100.0,
        };
        let projection = project(&abc(), None, &HashMap::new(), seeding, &mut rng);

        assert_eq!(projection.seeded, 3);
        for position in &projection.positions {
            let offset = *position - seeding.center;
            assert!(offset.x.abs() <= 50.0 && offset.y.abs() <= 50.0, "{offset:?}");
        }
        assert_ne!(projection.positions[0], projection.positions[1]);
    }

    #[test]
    fn rederiving_reuses_prior_positions() {
        let mut rng = StdRng::seed_from_u64(3);
        let first = project(&abc(), None, &HashMap::new(), SEEDING, &mut rng);
        let second = project(&abc(), None, &positions_by_id(&first), SEEDING, &mut rng);

        assert_eq!(second.positions, first.positions);
        assert_eq!(second.reused, 3);
        assert_eq!(second.seeded, 0);
    }

    #[test]
    fn filter_round_trip_reseeds_removed_nodes() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut prior = HashMap::new();
        prior.insert("a".to_owned(), vec2(500.0, 500.0));
        prior.insert("b".to_owned(), vec2(-300.0, 120.0));
        prior.insert("c".to_owned(), vec2(600.0, -600.0));

        let narrowed = project(&abc(), Some("X"), &prior, SEEDING, &mut rng);
        assert_eq!(narrowed.nodes.len(), 1);
        assert_eq!(narrowed.nodes[0].id, "b");
        assert!(narrowed.edges.is_empty());

        let widened = project(&abc(), None, &positions_by_id(&narrowed), SEEDING, &mut rng);
        let positions = positions_by_id(&widened);
        assert_eq!(widened.nodes.len(), 3);
        assert_eq!(widened.edges.len(), 2);
        assert_eq!(positions["b"], vec2(-300.0, 120.0));
        for id in ["a", "c"] {
            assert!(positions[id].x.abs() <= 50.0 && positions[id].y.abs() <= 50.0);
        }
    }

    #[test]
    fn filter_matches_tech_exactly() {
        let mut rng = StdRng::seed_from_u64(5);
        let blueprint = Blueprint {
            nodes: vec![node("a", "Postgres"), node("b", "postgres"), node("c", "Postgres 16")],
            ..Blueprint::default()
        };
        let projection = project(&blueprint, Some("Postgres"), &HashMap::new(), SEEDING, &mut rng);

        assert_eq!(projection.nodes.len(), 1);
        assert_eq!(projection.nodes[0].id, "a");
    }

    #[test]
    fn duplicate_ids_do_not_panic_and_resolve_to_last() {
        let mut rng = StdRng::seed_from_u64(9);
        let blueprint = Blueprint {
            nodes: vec![node("a", "X"), node("a", "X"), node("b", "X")],
            edges: vec![edge("a", "b")],
            ..Blueprint::default()
        };
        let projection = project(&blueprint, None, &HashMap::new(), SEEDING, &mut rng);

        assert_eq!(projection.nodes.len(), 3);
        assert_eq!(projection.index_by_id["a"], 1);
        assert_eq!(projection.edges[0].source, 1);
    }

    #[test]
    fn zero_jitter_stacks_on_center() {
        let mut rng = StdRng::seed_from_u64(2);
        let seeding = Seeding {
            center: vec2(5.0, 5.0),
            jitter_radius: 0.0,
        };
        let projection = project(&abc(), None, &HashMap::new(), seeding, &mut rng);

        assert!(projection.positions.iter().all(|position| *position == vec2(5.0, 5.0)));
    }
}
