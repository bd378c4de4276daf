use eframe::egui::{self, Ui};

use super::super::ViewModel;

/// A clamped slider that takes focus on hover so the arrow keys step it.
fn physics_slider(
    ui: &mut Ui,
    value: &mut f32,
    min: f32,
    max: f32,
    text: &str,
    hover: &str,
) -> bool {
    let response = ui
        .add(
            egui::Slider::new(value, min..=max)
                .text(text)
                .clamping(egui::SliderClamping::Always),
        )
        .on_hover_text(hover);
    if response.hovered() {
        response.request_focus();
    }
    response.changed()
}

impl ViewModel {
    pub(in crate::app) fn draw_controls(&mut self, ui: &mut Ui) {
        ui.heading("Graph Controls");
        ui.separator();
        ui.add_space(4.0);

        ui.label("Search (label or technology)")
            .on_hover_text("Fuzzy-highlight matching components without changing the layout.");
        ui.text_edit_singleline(&mut self.search);

        ui.separator();

        let current = self.filter.clone().unwrap_or_else(|| "All".to_owned());
        let mut picked = None;
        egui::ComboBox::from_label("Technology")
            .selected_text(current)
            .show_ui(ui, |ui| {
                if ui.selectable_label(self.filter.is_none(), "All").clicked() {
                    picked = Some(None);
                }
                for tech in &self.tech_values {
                    let is_active = self.filter.as_deref() == Some(tech.as_str());
                    if ui.selectable_label(is_active, tech.as_str()).clicked() {
                        picked = Some(Some(tech.clone()));
                    }
                }
            })
            .response
            .on_hover_text("Show only components built with one technology.");
        if let Some(filter) = picked {
            self.set_filter(filter);
        }

        ui.separator();

        ui.checkbox(&mut self.live_physics, "Live physics simulation")
            .on_hover_text("Advance the force layout every frame.");

        ui.horizontal(|ui| {
            if ui
                .button("Reheat")
                .on_hover_text("Restart the layout so it can settle again.")
                .clicked()
            {
                self.canvas.reheat();
            }
            match self.canvas.alpha() {
                Some(alpha) if self.canvas.is_running() => {
                    ui.label(format!("alpha {alpha:.3}"));
                }
                Some(_) => {
                    ui.label("settled");
                }
                None => {
                    ui.label("idle");
                }
            }
        });

        ui.collapsing("Physics tuning", |ui| {
            let mut changed = false;
            let physics = &mut self.physics;

            changed |= physics_slider(
                ui,
                &mut physics.link_distance,
                40.0,
                400.0,
                "Link distance",
                "Resting length of every connection.",
            );
            let mut repulsion = -physics.charge;
            if physics_slider(
                ui,
                &mut repulsion,
                0.0,
                1500.0,
                "Repulsion",
                "How strongly components push each other apart.",
            ) {
                physics.charge = -repulsion;
                changed = true;
            }
            changed |= physics_slider(
                ui,
                &mut physics.center_strength,
                0.0,
                1.0,
                "Centering",
                "How quickly the free components drift back to the origin.",
            );
            changed |= physics_slider(
                ui,
                &mut physics.collision_radius,
                0.0,
                100.0,
                "Collision radius",
                "Half of the minimum distance kept between component centers.",
            );
            changed |= physics_slider(
                ui,
                &mut physics.velocity_decay,
                0.05,
                0.9,
                "Velocity decay",
                "Fraction of velocity lost every tick.",
            );

            if ui.button("Reset to defaults").clicked() {
                *physics = Default::default();
                changed = true;
            }

            if changed {
                self.canvas.reconfigure(self.physics);
            }
        });
    }
}
