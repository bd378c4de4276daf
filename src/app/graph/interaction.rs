use eframe::egui::{self, Pos2, Rect, Ui, Vec2};
use tracing::debug;

use super::super::ViewModel;
use super::super::physics::Simulation;
use super::super::render::{NodePrimitive, ViewTransform};

#[derive(Clone, Copy, Debug, Default, PartialEq)]
enum DragPhase {
    #[default]
    Idle,
    Holding {
        node: usize,
        grab_offset: Vec2,
        press_screen: Pos2,
        moved: bool,
    },
}

/// What a finished gesture amounted to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(in crate::app) enum GestureOutcome {
    None,
    Click(usize),
    Drag(usize),
}

/// Per-gesture pin/reheat state machine. It only ever writes the pin of the
/// node it grabbed and the simulation's alpha target.
#[derive(Clone, Copy, Debug, Default)]
pub(in crate::app) struct DragController {
    phase: DragPhase,
}

impl DragController {
    pub(in crate::app) fn active_node(&self) -> Option<usize> {
        match self.phase {
            DragPhase::Idle => None,
            DragPhase::Holding { node, .. } => Some(node),
        }
    }

    #[cfg(test)]
    pub(in crate::app) fn is_dragging(&self) -> bool {
        matches!(self.phase, DragPhase::Holding { moved: true, .. })
    }

    pub(in crate::app) fn press(
        &mut self,
        simulation: &mut Simulation,
        node: usize,
        pointer_world: Vec2,
        pointer_screen: Pos2,
        reheat_target: f32,
    ) {
        if self.active_node().is_some() {
            self.cancel(Some(simulation));
        }
        let Some(position) = simulation.position(node) else {
            return;
        };

        simulation.pin(node, position);
        simulation.set_alpha_target(reheat_target);
        simulation.restart();
        self.phase = DragPhase::Holding {
            node,
            grab_offset: position - pointer_world,
            press_screen: pointer_screen,
            moved: false,
        };
        debug!(node, "node grabbed");
    }

    pub(in crate::app) fn drag(
        &mut self,
        simulation: &mut Simulation,
        pointer_world: Vec2,
        pointer_screen: Pos2,
        click_tolerance: f32,
    ) {
        let DragPhase::Holding {
            node,
            grab_offset,
            press_screen,
            moved,
        } = &mut self.phase
        else {
            return;
        };

        if !*moved && press_screen.distance(pointer_screen) <= click_tolerance {
            return;
        }
        *moved = true;
        simulation.pin(*node, pointer_world + *grab_offset);
    }

    pub(in crate::app) fn release(&mut self, simulation: &mut Simulation) -> GestureOutcome {
        let DragPhase::Holding { node, moved, .. } = std::mem::take(&mut self.phase) else {
            return GestureOutcome::None;
        };

        simulation.unpin(node);
        simulation.set_alpha_target(0.0);
        debug!(node, moved, "node released");
        if moved {
            GestureOutcome::Drag(node)
        } else {
            GestureOutcome::Click(node)
        }
    }

    /// Abandons the gesture without a selection, e.g. when the canvas is
    /// torn down or rebuilt mid-drag.
    pub(in crate::app) fn cancel(&mut self, simulation: Option<&mut Simulation>) {
        let DragPhase::Holding { node, .. } = std::mem::take(&mut self.phase) else {
            return;
        };

        if let Some(simulation) = simulation {
            simulation.unpin(node);
            simulation.set_alpha_target(0.0);
        }
        debug!(node, "drag cancelled");
    }
}

pub(in crate::app) fn node_under_pointer(nodes: &[NodePrimitive], pointer: Pos2) -> Option<usize> {
    nodes
        .iter()
        .filter_map(|node| {
            let distance = node.center.distance(pointer);
            (distance <= node.radius).then_some((node.index, distance))
        })
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(index, _)| index)
}

impl ViewModel {
    pub(in crate::app) fn handle_graph_zoom(
        &mut self,
        ui: &Ui,
        rect: Rect,
        response: &egui::Response,
    ) {
        if !response.hovered() {
            return;
        }

        let scroll = ui.input(|input| input.raw_scroll_delta.y);
        if scroll.abs() <= f32::EPSILON {
            return;
        }

        let pointer = ui
            .input(|input| input.pointer.hover_pos())
            .unwrap_or_else(|| rect.center());
        let before = ViewTransform::new(rect, self.pan, self.zoom);
        let world = before.screen_to_world(pointer);

        let zoom_factor = (1.0 + (scroll * 0.0018)).clamp(0.85, 1.15);
        self.zoom = (self.zoom * zoom_factor).clamp(0.1, 5.0);
        self.pan = pointer - rect.center() - (world * self.zoom);
    }

    pub(in crate::app) fn handle_graph_pan(&mut self, response: &egui::Response) {
        if response.dragged_by(egui::PointerButton::Secondary)
            || response.dragged_by(egui::PointerButton::Middle)
        {
            self.pan += response.drag_delta();
        }
    }
}
