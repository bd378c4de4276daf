use std::collections::HashSet;

use eframe::egui::{
    Align2, Color32, FontId, Painter, Pos2, Rect, Shape, Stroke, Vec2, pos2, vec2,
};

use crate::blueprint::{GraphNode, NodeKind, NodeStatus};

use super::graph::ActiveEdge;
use super::physics::TickSnapshot;

pub(super) const NODE_RADIUS: f32 = 26.0;
const FLOW_PERIOD_FLOOR_SECS: f32 = 0.6;
const FLOW_LATENCY_SCALE_MS: f32 = 250.0;

#[derive(Clone, Copy, Debug)]
pub(super) struct ViewTransform {
    rect: Rect,
    pan: Vec2,
    zoom: f32,
}

impl ViewTransform {
    pub(super) fn new(rect: Rect, pan: Vec2, zoom: f32) -> Self {
        Self { rect, pan, zoom }
    }

    pub(super) fn world_to_screen(self, world: Vec2) -> Pos2 {
        self.rect.center() + self.pan + world * self.zoom
    }

    pub(super) fn screen_to_world(self, screen: Pos2) -> Vec2 {
        (screen - self.rect.center() - self.pan) / self.zoom
    }

    fn node_radius(self) -> f32 {
        (NODE_RADIUS * self.zoom).clamp(4.0, 80.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(super) enum NodeShape {
    Circle,
    Polygon { sides: usize, rotation_deg: i32 },
}

impl NodeShape {
    fn for_kind(kind: NodeKind) -> Self {
        match kind {
            NodeKind::Service => Self::Circle,
            NodeKind::Database => Self::Polygon { sides: 4, rotation_deg: 45 },
            NodeKind::Gateway => Self::Polygon { sides: 4, rotation_deg: 0 },
            NodeKind::Queue => Self::Polygon { sides: 6, rotation_deg: 0 },
            NodeKind::Cache => Self::Polygon { sides: 8, rotation_deg: 22 },
            NodeKind::Client => Self::Polygon { sides: 3, rotation_deg: -90 },
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub(super) struct NodePrimitive {
    pub(super) index: usize,
    pub(super) center: Pos2,
    pub(super) radius: f32,
    pub(super) shape: NodeShape,
    pub(super) fill: Color32,
    pub(super) stroke: Stroke,
    pub(super) halo: Option<Color32>,
    pub(super) label: String,
    pub(super) caption: String,
    pub(super) show_caption: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub(super) struct EdgePrimitive {
    pub(super) from: Pos2,
    pub(super) to: Pos2,
    pub(super) target_radius: f32,
    pub(super) stroke: Stroke,
    pub(super) flow_period_secs: f32,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub(super) struct Frame {
    pub(super) nodes: Vec<NodePrimitive>,
    pub(super) edges: Vec<EdgePrimitive>,
}

#[derive(Clone, Copy, Debug, Default)]
pub(super) struct Emphasis<'a> {
    pub(super) selected: Option<usize>,
    pub(super) hovered: Option<usize>,
    pub(super) matches: Option<&'a HashSet<usize>>,
}

pub(super) fn status_color(status: NodeStatus) -> Color32 {
    match status {
        NodeStatus::Optimal => Color32::from_rgb(72, 187, 120),
        NodeStatus::Warning => Color32::from_rgb(236, 178, 64),
        NodeStatus::Critical => Color32::from_rgb(229, 83, 75),
    }
}

/// Seconds for one flow dot to cross an edge. Slower for higher latency,
/// never below the floor.
pub(super) fn flow_period_secs(latency_ms: f32) -> f32 {
    let latency = if latency_ms.is_finite() {
        latency_ms.max(0.0)
    } else {
        0.0
    };
    (FLOW_PERIOD_FLOOR_SECS + latency / FLOW_LATENCY_SCALE_MS).max(FLOW_PERIOD_FLOOR_SECS)
}

pub(super) fn flow_point(from: Pos2, to: Pos2, period_secs: f32, time_secs: f64) -> Pos2 {
    let phase = (time_secs / f64::from(period_secs.max(FLOW_PERIOD_FLOOR_SECS))).fract() as f32;
    from + (to - from) * phase
}

/// Maps one snapshot to screen primitives. Reads only; returns an empty frame
/// when the snapshot does not describe `nodes`.
pub(super) fn project_frame(
    nodes: &[GraphNode],
    edges: &[ActiveEdge],
    snapshot: &TickSnapshot,
    transform: ViewTransform,
    emphasis: Emphasis<'_>,
) -> Frame {
    if snapshot.positions.len() != nodes.len() || snapshot.links.len() != edges.len() {
        return Frame::default();
    }

    let radius = transform.node_radius();
    let focus_active = emphasis.matches.is_some_and(|matches| !matches.is_empty());

    let node_primitives = nodes
        .iter()
        .zip(&snapshot.positions)
        .enumerate()
        .map(|(index, (node, position))| {
            let selected = emphasis.selected == Some(index);
            let hovered = emphasis.hovered == Some(index);
            let matched = emphasis
                .matches
                .is_some_and(|matches| matches.contains(&index));

            let base = status_color(node.status);
            let fill = if focus_active && !matched && !selected {
                dim_color(base, 0.4)
            } else if hovered {
                blend_color(base, Color32::WHITE, 0.25)
            } else {
                base
            };

            let stroke = if selected {
                Stroke::new(3.0, Color32::from_rgb(245, 206, 93))
            } else if snapshot.pinned.get(index).copied().unwrap_or(false) {
                Stroke::new(2.4, Color32::from_gray(235))
            } else {
                Stroke::new(1.2, Color32::from_rgba_unmultiplied(15, 15, 15, 200))
            };

            let halo = match node.status {
                NodeStatus::Critical => Some(Color32::from_rgba_unmultiplied(229, 83, 75, 70)),
                _ if matched => Some(Color32::from_rgba_unmultiplied(103, 196, 255, 60)),
                _ => None,
            };

            NodePrimitive {
                index,
                center: transform.world_to_screen(*position),
                radius,
                shape: NodeShape::for_kind(node.kind),
                fill,
                stroke,
                halo,
                label: node.label.clone(),
                caption: node.tech.clone(),
                show_caption: selected || hovered || transform.zoom >= 0.75,
            }
        })
        .collect();

    let edge_primitives = snapshot
        .links
        .iter()
        .zip(edges)
        .map(|(link, edge)| {
            let touches_selection = emphasis
                .selected
                .is_some_and(|selected| selected == link.source || selected == link.target);
            let stroke = if touches_selection {
                Stroke::new(2.4, Color32::from_rgb(241, 146, 94))
            } else {
                Stroke::new(1.4, Color32::from_rgba_unmultiplied(140, 150, 165, 170))
            };

            EdgePrimitive {
                from: transform.world_to_screen(link.from),
                to: transform.world_to_screen(link.to),
                target_radius: radius,
                stroke,
                flow_period_secs: flow_period_secs(edge.latency),
            }
        })
        .collect();

    Frame {
        nodes: node_primitives,
        edges: edge_primitives,
    }
}

pub(super) fn paint_frame(painter: &Painter, frame: &Frame, time_secs: f64) {
    for edge in &frame.edges {
        paint_edge(painter, edge, time_secs);
    }
    for node in &frame.nodes {
        paint_node(painter, node);
    }
}

fn paint_edge(painter: &Painter, edge: &EdgePrimitive, time_secs: f64) {
    let span = edge.to - edge.from;
    let length = span.length();
    if length <= edge.target_radius {
        return;
    }

    let direction = span / length;
    let tip = edge.to - direction * edge.target_radius;
    painter.line_segment([edge.from, tip], edge.stroke);

    let normal = vec2(-direction.y, direction.x);
    let head = (edge.stroke.width * 4.0).max(7.0);
    let base = tip - direction * head;
    painter.add(Shape::convex_polygon(
        vec![tip, base + normal * (head * 0.5), base - normal * (head * 0.5)],
        edge.stroke.color,
        Stroke::NONE,
    ));

    let dot = flow_point(edge.from, tip, edge.flow_period_secs, time_secs);
    painter.circle_filled(dot, edge.stroke.width + 1.6, Color32::from_rgb(130, 200, 255));
}

fn paint_node(painter: &Painter, node: &NodePrimitive) {
    if let Some(halo) = node.halo {
        painter.circle_filled(node.center, node.radius * 1.45, halo);
    }

    match node.shape {
        NodeShape::Circle => {
            painter.circle_filled(node.center, node.radius, node.fill);
            painter.circle_stroke(node.center, node.radius, node.stroke);
        }
        NodeShape::Polygon {
            sides,
            rotation_deg,
        } => {
            painter.add(Shape::convex_polygon(
                regular_polygon(node.center, node.radius, sides, rotation_deg),
                node.fill,
                node.stroke,
            ));
        }
    }

    let label_anchor = node.center + vec2(0.0, node.radius + 4.0);
    painter.text(
        label_anchor,
        Align2::CENTER_TOP,
        &node.label,
        FontId::proportional(13.0),
        Color32::from_gray(238),
    );
    if node.show_caption && !node.caption.is_empty() {
        painter.text(
            label_anchor + vec2(0.0, 16.0),
            Align2::CENTER_TOP,
            &node.caption,
            FontId::proportional(11.0),
            Color32::from_gray(160),
        );
    }
}

fn regular_polygon(center: Pos2, radius: f32, sides: usize, rotation_deg: i32) -> Vec<Pos2> {
    let sides = sides.max(3);
    let rotation = (rotation_deg as f32).to_radians();
    (0..sides)
        .map(|side| {
            let angle = rotation + (side as f32 / sides as f32) * std::f32::consts::TAU;
            pos2(
                center.x + radius * angle.cos(),
                center.y + radius * angle.sin(),
            )
        })
        .collect()
}

pub(super) fn blend_color(base: Color32, overlay: Color32, amount: f32) -> Color32 {
    let amount = amount.clamp(0.0, 1.0);
    let mix = |a: u8, b: u8| (a as f32 * (1.0 - amount) + b as f32 * amount) as u8;
    Color32::from_rgba_unmultiplied(
        mix(base.r(), overlay.r()),
        mix(base.g(), overlay.g()),
        mix(base.b(), overlay.b()),
        mix(base.a(), overlay.a()),
    )
}

pub(super) fn dim_color(color: Color32, factor: f32) -> Color32 {
    let factor = factor.clamp(0.0, 1.0);
    Color32::from_rgba_unmultiplied(
        (color.r() as f32 * factor) as u8,
        (color.g() as f32 * factor) as u8,
        (color.b() as f32 * factor) as u8,
        (color.a() as f32 * (0.45 + factor * 0.55)) as u8,
    )
}

pub(super) fn draw_background(painter: &Painter, transform: ViewTransform) {
    let rect = transform.rect;
    painter.rect_filled(rect, 0.0, Color32::from_rgb(17, 21, 28));

    let step = (64.0 * transform.zoom.clamp(0.5, 2.0)).max(24.0);
    let origin = rect.center() + transform.pan;
    let stroke = Stroke::new(1.0, Color32::from_rgba_unmultiplied(60, 70, 84, 60));

    let mut x = rect.left() + (origin.x - rect.left()).rem_euclid(step);
    while x < rect.right() {
        painter.line_segment([pos2(x, rect.top()), pos2(x, rect.bottom())], stroke);
        x += step;
    }

    let mut y = rect.top() + (origin.y - rect.top()).rem_euclid(step);
    while y < rect.bottom() {
        painter.line_segment([pos2(rect.left(), y), pos2(rect.right(), y)], stroke);
        y += step;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::physics::LinkFrame;

    fn transform() -> ViewTransform {
        ViewTransform::new(
            Rect::from_min_size(Pos2::ZERO, vec2(800.0, 600.0)),
            Vec2::ZERO,
            1.0,
        )
    }

    fn node(id: &str, kind: NodeKind, status: NodeStatus) -> GraphNode {
        GraphNode {
            id: id.to_owned(),
            label: id.to_uppercase(),
            kind,
            tech: "Rust".to_owned(),
            status,
            details: None,
        }
    }

    fn snapshot() -> TickSnapshot {
        TickSnapshot {
            generation: 1,
            alpha: 0.5,
            positions: vec![vec2(-100.0, 0.0), vec2(100.0, 50.0)],
            pinned: vec![false, true],
            links: vec![LinkFrame {
                source: 0,
                target: 1,
                from: vec2(-100.0, 0.0),
                to: vec2(100.0, 50.0),
            }],
        }
    }

    fn edges(latency: f32) -> Vec<ActiveEdge> {
        vec![ActiveEdge {
            source: 0,
            target: 1,
            protocol: "gRPC".to_owned(),
            latency,
        }]
    }

    #[test]
    fn transforms_round_trip() {
        let transform = ViewTransform::new(
            Rect::from_min_size(pos2(10.0, 20.0), vec2(400.0, 300.0)),
            vec2(15.0, -8.0),
            1.7,
        );
        let world = vec2(-42.0, 77.0);
        let back = transform.screen_to_world(transform.world_to_screen(world));

        assert!((back - world).length() < 1e-3);
    }

    #[test]
    fn primitives_follow_snapshot_coordinates() {
        let nodes = vec![
            node("a", NodeKind::Service, NodeStatus::Optimal),
            node("b", NodeKind::Database, NodeStatus::Critical),
        ];
        let snapshot = snapshot();
        let frame = project_frame(&nodes, &edges(40.0), &snapshot, transform(), Emphasis::default());

        assert_eq!(frame.nodes[0].center, pos2(300.0, 300.0));
        assert_eq!(frame.nodes[1].center, pos2(500.0, 350.0));
        assert_eq!(frame.edges[0].from, frame.nodes[0].center);
        assert_eq!(frame.edges[0].to, frame.nodes[1].center);
        assert_eq!(frame.nodes[0].shape, NodeShape::Circle);
        assert!(frame.nodes[1].halo.is_some());
        assert_eq!(frame.nodes[1].stroke.width, 2.4);
    }

    #[test]
    fn statuses_have_distinct_colors() {
        let colors = [
            status_color(NodeStatus::Optimal),
            status_color(NodeStatus::Warning),
            status_color(NodeStatus::Critical),
        ];

        assert_ne!(colors[0], colors[1]);
        assert_ne!(colors[1], colors[2]);
        assert_ne!(colors[0], colors[2]);
    }

    #[test]
    fn flow_period_grows_with_latency_and_has_floor() {
        assert_eq!(flow_period_secs(0.0), FLOW_PERIOD_FLOOR_SECS);
        assert_eq!(flow_period_secs(-50.0), FLOW_PERIOD_FLOOR_SECS);
        assert_eq!(flow_period_secs(f32::NAN), FLOW_PERIOD_FLOOR_SECS);
        assert!(flow_period_secs(500.0) > flow_period_secs(50.0));
    }

    #[test]
    fn flow_point_stays_on_segment() {
        let from = pos2(0.0, 0.0);
        let to = pos2(100.0, 0.0);
        for step in 0..40 {
            let point = flow_point(from, to, 0.9, step as f64 * 0.173);
            assert!((0.0..=100.0).contains(&point.x));
            assert_eq!(point.y, 0.0);
        }
    }

    #[test]
    fn mismatched_snapshot_renders_nothing() {
        let nodes = vec![node("a", NodeKind::Queue, NodeStatus::Warning)];
        let frame = project_frame(&nodes, &edges(10.0), &snapshot(), transform(), Emphasis::default());

        assert_eq!(frame, Frame::default());
    }

    #[test]
    fn search_focus_dims_non_matching_nodes() {
        let nodes = vec![
            node("a", NodeKind::Service, NodeStatus::Optimal),
            node("b", NodeKind::Service, NodeStatus::Optimal),
        ];
        let matches = HashSet::from([1usize]);
        let emphasis = Emphasis {
            matches: Some(&matches),
            ..Emphasis::default()
        };
        let frame = project_frame(&nodes, &edges(0.0), &snapshot(), transform(), emphasis);

        assert_ne!(frame.nodes[0].fill, status_color(NodeStatus::Optimal));
        assert_eq!(frame.nodes[1].fill, status_color(NodeStatus::Optimal));
    }
}
