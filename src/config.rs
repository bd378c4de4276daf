use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Tunables for the layout simulation and the drag gesture.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub link_distance: f32,
    /// Many-body strength; negative values repel.
    pub charge: f32,
    pub theta: f32,
    pub center_strength: f32,
    /// Half of the minimum center-to-center separation.
    pub collision_radius: f32,
    pub collision_iterations: usize,
    pub alpha_min: f32,
    pub alpha_decay: f32,
    pub velocity_decay: f32,
    pub reheat_alpha_target: f32,
    pub jitter_radius: f32,
    /// Screen pixels a press may travel before it counts as a drag.
    pub click_tolerance: f32,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        let alpha_min = 0.001_f32;
        Self {
            link_distance: 180.0,
            charge: -400.0,
            theta: 0.9,
            center_strength: 0.1,
            collision_radius: 40.0,
            collision_iterations: 4,
            alpha_min,
            alpha_decay: 1.0 - alpha_min.powf(1.0 / 300.0),
            velocity_decay: 0.4,
            reheat_alpha_target: 0.3,
            jitter_radius: 100.0,
            click_tolerance: 3.0,
        }
    }
}

impl SimulationConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read physics config {}", path.display()))?;
        let config: Self = serde_json::from_str(&raw)
            .with_context(|| format!("invalid physics config {}", path.display()))?;
        Ok(config.sanitized())
    }

    pub fn sanitized(self) -> Self {
        let defaults = Self::default();
        let finite_or = |value: f32, fallback: f32| if value.is_finite() { value } else { fallback };

        Self {
            link_distance: finite_or(self.link_distance, defaults.link_distance).max(0.0),
            charge: finite_or(self.charge, defaults.charge),
            theta: finite_or(self.theta, defaults.theta).clamp(0.1, 2.0),
            center_strength: finite_or(self.center_strength, defaults.center_strength)
                .clamp(0.0, 1.0),
            collision_radius: finite_or(self.collision_radius, defaults.collision_radius)
                .max(0.0),
            collision_iterations: self.collision_iterations.clamp(1, 16),
            alpha_min: finite_or(self.alpha_min, defaults.alpha_min).clamp(0.0, 1.0),
            alpha_decay: finite_or(self.alpha_decay, defaults.alpha_decay).clamp(0.0001, 1.0),
            velocity_decay: finite_or(self.velocity_decay, defaults.velocity_decay)
                .clamp(0.0, 1.0),
            reheat_alpha_target: finite_or(self.reheat_alpha_target, defaults.reheat_alpha_target)
                .clamp(0.0, 1.0),
            jitter_radius: finite_or(self.jitter_radius, defaults.jitter_radius).max(0.0),
            click_tolerance: finite_or(self.click_tolerance, defaults.click_tolerance).max(0.0),
        }
    }
}
