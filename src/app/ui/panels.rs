use eframe::egui::{self, Align, Context, Layout, Vec2};
use tracing::info;

use crate::blueprint::Blueprint;
use crate::config::SimulationConfig;

use super::super::graph::GraphCanvas;
use super::super::ViewModel;

impl ViewModel {
    pub(in crate::app) fn new(
        blueprint: Blueprint,
        filter: Option<String>,
        physics: SimulationConfig,
        seed: Option<u64>,
    ) -> Self {
        let tech_values = blueprint.tech_values();
        let filter = filter.filter(|tech| !tech.trim().is_empty());

        Self {
            blueprint,
            filter,
            tech_values,
            search: String::new(),
            selected: None,
            hovered: None,
            pan: Vec2::ZERO,
            zoom: 1.0,
            live_physics: true,
            physics: physics.sanitized(),
            canvas: GraphCanvas::new(physics, seed),
            search_match_cache: None,
        }
    }

    pub(in crate::app) fn show(
        &mut self,
        ctx: &Context,
        source: Option<&str>,
        reload_requested: &mut bool,
        is_loading: bool,
    ) {
        egui::TopBottomPanel::top("top_bar")
            .resizable(false)
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.heading("blueprint-graph");
                    ui.separator();
                    if let Some(source) = source {
                        ui.label(format!("file: {source}"));
                    }
                    ui.label(format!("components: {}", self.blueprint.nodes.len()));
                    ui.label(format!("connections: {}", self.blueprint.edges.len()));

                    let reload_button = ui.add_enabled(
                        !is_loading && source.is_some(),
                        egui::Button::new("Reload blueprint"),
                    );
                    if reload_button.clicked() {
                        *reload_requested = true;
                    }
                    if is_loading {
                        ui.spinner();
                    }

                    ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                        let projection = self.canvas.projection();
                        ui.label(format!(
                            "visible: {} nodes, {} edges",
                            projection.nodes.len(),
                            projection.edges.len()
                        ));
                    });
                });
            });

        egui::SidePanel::left("controls")
            .resizable(true)
            .default_width(300.0)
            .show(ctx, |ui| self.draw_controls(ui));

        egui::SidePanel::right("details")
            .resizable(true)
            .default_width(340.0)
            .show(ctx, |ui| self.draw_details(ui));

        egui::CentralPanel::default().show(ctx, |ui| self.draw_graph(ui));
    }

    pub(in crate::app) fn set_selected(&mut self, selected: Option<String>) {
        if self.selected == selected {
            return;
        }

        if let Some(id) = &selected {
            info!(node = %id, "node selected");
        }
        self.selected = selected;
    }

    pub(in crate::app) fn set_filter(&mut self, filter: Option<String>) {
        if self.filter == filter {
            return;
        }

        info!(filter = filter.as_deref().unwrap_or("all"), "technology filter changed");
        self.filter = filter;
        self.hovered = None;
    }

    /// Swaps in a freshly loaded blueprint. The canvas keeps its layout and
    /// decides on the next frame whether the identity changed.
    pub(in crate::app) fn replace_blueprint(&mut self, blueprint: Blueprint) {
        self.tech_values = blueprint.tech_values();
        if let Some(id) = &self.selected
            && blueprint.node(id).is_none()
        {
            self.selected = None;
        }

        info!(
            nodes = blueprint.nodes.len(),
            edges = blueprint.edges.len(),
            identity = blueprint.identity(),
            "blueprint reloaded"
        );
        self.blueprint = blueprint;
        self.hovered = None;
        self.search_match_cache = None;
    }
}
