use eframe::egui::{Vec2, vec2};

/// Deterministic unit direction for a pair of coincident points. Swapping the
/// arguments flips the direction so the pair separates.
pub fn pair_direction(from: usize, to: usize) -> Vec2 {
    let (low, high) = if from < to { (from, to) } else { (to, from) };
    let angle = ((low as f32) * 0.618_034 + (high as f32) * 0.414_214) * std::f32::consts::TAU;
    let direction = vec2(angle.cos(), angle.sin());
    if from < to { direction } else { -direction }
}

pub fn format_latency(latency_ms: f32) -> String {
    if latency_ms >= 1000.0 {
        format!("{:.2} s", latency_ms / 1000.0)
    } else {
        format!("{latency_ms:.0} ms")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pair_direction_is_antisymmetric_unit_vector() {
        let forward = pair_direction(3, 11);
        let backward = pair_direction(11, 3);

        assert!((forward.length() - 1.0).abs() < 1e-5);
        assert!((forward + backward).length() < 1e-6);
    }

    #[test]
    fn latency_formatting_switches_units() {
        assert_eq!(format_latency(42.4), "42 ms");
        assert_eq!(format_latency(1500.0), "1.50 s");
    }
}
