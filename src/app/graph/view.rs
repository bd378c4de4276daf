use std::collections::HashSet;
use std::sync::Arc;

use eframe::egui::{self, Align2, Color32, FontId, Sense, Ui, vec2};
use fuzzy_matcher::FuzzyMatcher;
use fuzzy_matcher::skim::SkimMatcherV2;

use super::super::render::{
    Emphasis, ViewTransform, draw_background, paint_frame, project_frame,
};
use super::super::{SearchMatchCache, ViewModel};
use super::node_under_pointer;

fn fuzzy_matches(matcher: &SkimMatcherV2, text: &str, query: &str) -> bool {
    matcher.fuzzy_match(text, query).is_some()
        || matcher
            .fuzzy_match(&text.to_lowercase(), &query.to_lowercase())
            .is_some()
}

impl ViewModel {
    fn cached_search_matches(&mut self) -> Option<Arc<HashSet<usize>>> {
        let query = self.search.trim();
        if query.is_empty() {
            return None;
        }

        let generation = self.canvas.generation();
        if let Some(cached) = &self.search_match_cache
            && cached.generation == generation
            && cached.query == query
        {
            return Some(Arc::clone(&cached.matches));
        }

        let matcher = SkimMatcherV2::default();
        let matches = self
            .canvas
            .projection()
            .nodes
            .iter()
            .enumerate()
            .filter(|(_, node)| {
                fuzzy_matches(&matcher, &node.label, query)
                    || fuzzy_matches(&matcher, &node.tech, query)
            })
            .map(|(index, _)| index)
            .collect::<HashSet<_>>();
        let matches = Arc::new(matches);

        self.search_match_cache = Some(SearchMatchCache {
            query: query.to_owned(),
            generation,
            matches: Arc::clone(&matches),
        });
        Some(matches)
    }

    pub(in crate::app) fn draw_graph(&mut self, ui: &mut Ui) {
        if self.canvas.sync(Some(&self.blueprint), self.filter.as_deref()) {
            self.hovered = None;
        }

        let (rect, response) = ui.allocate_exact_size(ui.available_size(), Sense::click_and_drag());
        let painter = ui.painter_at(rect);

        self.handle_graph_zoom(ui, rect, &response);
        self.handle_graph_pan(&response);
        let transform = ViewTransform::new(rect, self.pan, self.zoom);
        draw_background(&painter, transform);

        if self.canvas.projection().is_empty() {
            painter.text(
                rect.center(),
                Align2::CENTER_CENTER,
                "No components match the current technology filter.",
                FontId::proportional(15.0),
                Color32::from_gray(180),
            );
            return;
        }

        if self.live_physics || self.canvas.is_holding() {
            self.canvas.tick();
        }

        let matches = self.cached_search_matches();
        let projection = self.canvas.projection();
        let selected = self
            .selected
            .as_ref()
            .and_then(|id| projection.index_by_id.get(id).copied());
        let Some(snapshot) = self.canvas.snapshot() else {
            return;
        };

        let frame = project_frame(
            &projection.nodes,
            &projection.edges,
            snapshot,
            transform,
            Emphasis {
                selected,
                hovered: self.hovered,
                matches: matches.as_deref(),
            },
        );
        let has_edges = !frame.edges.is_empty();

        let (time, pressed, released, pointer, has_pointer) = ui.input(|input| {
            (
                input.time,
                input.pointer.primary_pressed(),
                input.pointer.primary_released(),
                input.pointer.interact_pos(),
                input.pointer.has_pointer(),
            )
        });
        paint_frame(&painter, &frame, time);

        self.hovered = pointer
            .filter(|position| rect.contains(*position))
            .and_then(|position| node_under_pointer(&frame.nodes, position));

        if pressed
            && response.hovered()
            && let (Some(index), Some(position)) = (self.hovered, pointer)
        {
            self.canvas
                .press(index, transform.screen_to_world(position), position);
        } else if response.clicked_by(egui::PointerButton::Primary) && self.hovered.is_none() {
            self.set_selected(None);
        }

        if self.canvas.is_holding() {
            if let Some(position) = pointer {
                self.canvas
                    .drag_to(transform.screen_to_world(position), position);
            }

            if released {
                let mut picked = None;
                self.canvas
                    .release(|node| picked = Some(node.id.clone()));
                if let Some(id) = picked {
                    self.set_selected(Some(id));
                }
            } else if !has_pointer {
                self.canvas.cancel_gesture();
            }
        }

        if self.canvas.is_holding() {
            ui.ctx().set_cursor_icon(egui::CursorIcon::Grabbing);
        } else if self.hovered.is_some() {
            ui.ctx().set_cursor_icon(egui::CursorIcon::Grab);
        }

        if let Some(node) = self.hovered.and_then(|index| self.canvas.node(index)) {
            painter.text(
                rect.left_top() + vec2(10.0, 10.0),
                Align2::LEFT_TOP,
                format!(
                    "{}  |  {}  |  {}  |  {}",
                    node.label,
                    node.kind.label(),
                    node.tech,
                    node.status.label()
                ),
                FontId::proportional(13.0),
                Color32::from_gray(240),
            );
        }

        if self.canvas.is_running() || self.canvas.is_holding() || has_edges {
            ui.ctx().request_repaint();
        }
    }
}
