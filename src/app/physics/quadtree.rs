use eframe::egui::{Vec2, vec2};

const LEAF_CAPACITY: usize = 8;
const MAX_DEPTH: usize = 12;

#[derive(Clone, Copy, Debug)]
pub(super) struct Square {
    pub(super) center: Vec2,
    pub(super) half_extent: f32,
}

impl Square {
    fn enclosing(points: &[Vec2]) -> Option<Self> {
        let mut min = vec2(f32::INFINITY, f32::INFINITY);
        let mut max = vec2(f32::NEG_INFINITY, f32::NEG_INFINITY);
        for point in points {
            min = min.min(*point);
            max = max.max(*point);
        }

        if !(min.x.is_finite() && min.y.is_finite() && max.x.is_finite() && max.y.is_finite()) {
            return None;
        }

        let span = (max - min).max_elem().max(1.0);
        Some(Self {
            center: (min + max) * 0.5,
            half_extent: span * 0.5 + 1.0,
        })
    }

    pub(super) fn contains(self, point: Vec2) -> bool {
        (point.x - self.center.x).abs() <= self.half_extent
            && (point.y - self.center.y).abs() <= self.half_extent
    }

    pub(super) fn width(self) -> f32 {
        self.half_extent * 2.0
    }

    /// Squared gap between two squares; zero when they touch or overlap.
    pub(super) fn gap_sq(self, other: Self) -> f32 {
        let reach = self.half_extent + other.half_extent;
        let gap_x = ((self.center.x - other.center.x).abs() - reach).max(0.0);
        let gap_y = ((self.center.y - other.center.y).abs() - reach).max(0.0);
        gap_x * gap_x + gap_y * gap_y
    }

    fn quadrant(self, point: Vec2) -> usize {
        usize::from(point.x >= self.center.x) | (usize::from(point.y >= self.center.y) << 1)
    }

    fn child(self, quadrant: usize) -> Self {
        let quarter = self.half_extent * 0.5;
        let x = if quadrant & 1 == 0 { -quarter } else { quarter };
        let y = if quadrant & 2 == 0 { -quarter } else { quarter };
        Self {
            center: self.center + vec2(x, y),
            half_extent: quarter,
        }
    }
}

/// Region quadtree over node positions. Internal cells aggregate the point
/// count and centroid used by the Barnes-Hut charge approximation.
pub(super) struct QuadTree {
    pub(super) bounds: Square,
    pub(super) centroid: Vec2,
    pub(super) count: usize,
    pub(super) points: Vec<usize>,
    pub(super) children: [Option<Box<QuadTree>>; 4],
}

impl QuadTree {
    pub(super) fn build(positions: &[Vec2]) -> Option<Self> {
        let bounds = Square::enclosing(positions)?;
        Some(Self::split(bounds, (0..positions.len()).collect(), positions, 0))
    }

    fn split(bounds: Square, points: Vec<usize>, positions: &[Vec2], depth: usize) -> Self {
        let count = points.len();
        let centroid = if count == 0 {
            bounds.center
        } else {
            points
                .iter()
                .fold(Vec2::ZERO, |sum, &index| sum + positions[index])
                / count as f32
        };

        let mut cell = Self {
            bounds,
            centroid,
            count,
            points,
            children: std::array::from_fn(|_| None),
        };

        if depth >= MAX_DEPTH || cell.points.len() <= LEAF_CAPACITY {
            return cell;
        }

        let mut buckets: [Vec<usize>; 4] = std::array::from_fn(|_| Vec::new());
        for &index in &cell.points {
            buckets[bounds.quadrant(positions[index])].push(index);
        }

        // Coincident clusters cannot be separated by splitting further.
        if buckets.iter().filter(|bucket| !bucket.is_empty()).count() <= 1 {
            return cell;
        }

        for (quadrant, bucket) in buckets.into_iter().enumerate() {
            if !bucket.is_empty() {
                cell.children[quadrant] = Some(Box::new(Self::split(
                    bounds.child(quadrant),
                    bucket,
                    positions,
                    depth + 1,
                )));
            }
        }
        cell.points.clear();
        cell
    }

    pub(super) fn is_leaf(&self) -> bool {
        self.children.iter().all(Option::is_none)
    }

    pub(super) fn children(&self) -> impl Iterator<Item = &QuadTree> {
        self.children.iter().filter_map(|child| child.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(count: usize) -> Vec<Vec2> {
        (0..count)
            .map(|index| vec2((index % 10) as f32 * 30.0, (index / 10) as f32 * 30.0))
            .collect()
    }

    fn collect_points(cell: &QuadTree, out: &mut Vec<usize>) {
        out.extend_from_slice(&cell.points);
        for child in cell.children() {
            collect_points(child, out);
        }
    }

    #[test]
    fn every_point_lands_in_exactly_one_leaf() {
        let positions = grid(64);
        let tree = QuadTree::build(&positions).expect("finite points");

        let mut seen = Vec::new();
        collect_points(&tree, &mut seen);
        seen.sort_unstable();

        assert_eq!(seen, (0..64).collect::<Vec<_>>());
        assert_eq!(tree.count, 64);
        assert!(!tree.is_leaf());
    }

    #[test]
    fn root_centroid_is_mean_position() {
        let positions = vec![vec2(0.0, 0.0), vec2(10.0, 0.0), vec2(10.0, 10.0), vec2(0.0, 10.0)];
        let tree = QuadTree::build(&positions).expect("finite points");

        assert!((tree.centroid - vec2(5.0, 5.0)).length() < 1e-5);
        for position in &positions {
            assert!(tree.bounds.contains(*position));
        }
    }

    #[test]
    fn coincident_points_stay_in_one_leaf() {
        let positions = vec![vec2(4.0, 4.0); 40];
        let tree = QuadTree::build(&positions).expect("finite points");

        assert!(tree.is_leaf());
        assert_eq!(tree.points.len(), 40);
    }

    #[test]
    fn non_finite_positions_build_nothing() {
        assert!(QuadTree::build(&[vec2(f32::NAN, 0.0)]).is_none());
        assert!(QuadTree::build(&[]).is_none());
    }
}
