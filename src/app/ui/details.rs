use eframe::egui::{self, Color32, RichText, Ui};
use serde_json::Value;

use crate::blueprint::SecurityReport;
use crate::util::format_latency;

use super::super::ViewModel;

fn metric_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Number(number) => number.to_string(),
        Value::Bool(flag) => flag.to_string(),
        Value::Null => "-".to_owned(),
        other => other.to_string(),
    }
}

fn severity_color(severity: &str) -> Color32 {
    match severity.to_ascii_lowercase().as_str() {
        "critical" | "high" => Color32::from_rgb(239, 83, 80),
        "medium" | "warning" => Color32::from_rgb(255, 183, 77),
        _ => Color32::from_gray(190),
    }
}

impl ViewModel {
    pub(in crate::app) fn draw_details(&mut self, ui: &mut Ui) {
        egui::ScrollArea::vertical()
            .id_salt("details_scroll")
            .auto_shrink([false, false])
            .show(ui, |ui| {
                self.draw_selection(ui);
                ui.separator();
                self.draw_metrics(ui);
                if let Some(report) = &self.blueprint.security_report {
                    ui.separator();
                    draw_security_report(ui, report);
                }
            });
    }

    fn draw_selection(&mut self, ui: &mut Ui) {
        ui.heading("Selection Details");
        ui.add_space(6.0);

        let Some(selected_id) = self.selected.clone() else {
            ui.label("Click a component in the graph to inspect it.");
            return;
        };

        let Some(node) = self.blueprint.node(&selected_id) else {
            ui.label("Selected component no longer exists in this blueprint.");
            return;
        };

        ui.label(RichText::new(node.label.as_str()).strong());
        ui.small(node.id.as_str());
        ui.add_space(6.0);

        ui.label(format!("Kind: {}", node.kind.label()));
        if !node.tech.is_empty() {
            ui.label(format!("Technology: {}", node.tech));
        }
        ui.label(format!("Status: {}", node.status.label()));
        if let Some(details) = &node.details {
            ui.add_space(4.0);
            ui.label(details.as_str());
        }

        ui.separator();
        ui.label(RichText::new("Connections").strong());

        let mut jump_to = None;
        let mut any = false;
        for edge in self.blueprint.edges_touching(&selected_id) {
            any = true;
            let outgoing = edge.source == selected_id;
            let other_id = if outgoing { &edge.target } else { &edge.source };
            let other_label = self
                .blueprint
                .node(other_id)
                .map(|other| other.label.as_str())
                .unwrap_or(other_id.as_str());
            let arrow = if outgoing { "->" } else { "<-" };
            let protocol = if edge.protocol.is_empty() {
                "?"
            } else {
                edge.protocol.as_str()
            };

            let text = format!(
                "{arrow} {other_label}  ({protocol}, {})",
                format_latency(edge.latency)
            );
            if ui.link(text).on_hover_text(other_id.as_str()).clicked() {
                jump_to = Some(other_id.clone());
            }
        }
        if !any {
            ui.label("No connections.");
        }

        if let Some(id) = jump_to {
            self.set_selected(Some(id));
        }
    }

    fn draw_metrics(&self, ui: &mut Ui) {
        ui.label(RichText::new("Simulated metrics").strong());
        if self.blueprint.metrics.is_empty() {
            ui.label("No metrics in this blueprint.");
            return;
        }

        egui::Grid::new("metrics_grid")
            .num_columns(2)
            .striped(true)
            .show(ui, |ui| {
                for (name, value) in &self.blueprint.metrics {
                    ui.label(name.as_str());
                    ui.label(metric_text(value));
                    ui.end_row();
                }
            });
    }
}

fn draw_security_report(ui: &mut Ui, report: &SecurityReport) {
    ui.label(RichText::new("Security report").strong());
    if let Some(score) = report.score {
        ui.label(format!("Score: {score:.0}"));
    }
    if let Some(summary) = &report.summary {
        ui.label(summary.as_str());
    }

    for finding in &report.findings {
        ui.add_space(4.0);
        ui.horizontal_wrapped(|ui| {
            ui.label(
                RichText::new(finding.severity.to_uppercase())
                    .color(severity_color(&finding.severity))
                    .strong(),
            );
            ui.label(finding.title.as_str());
        });
        if !finding.description.is_empty() {
            ui.small(finding.description.as_str());
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn metric_text_prints_scalars_plainly() {
        assert_eq!(metric_text(&json!("99.9%")), "99.9%");
        assert_eq!(metric_text(&json!(120)), "120");
        assert_eq!(metric_text(&json!(null)), "-");
        assert_eq!(metric_text(&json!([1, 2])), "[1,2]");
    }

    #[test]
    fn unknown_severity_is_neutral() {
        assert_eq!(severity_color("info"), Color32::from_gray(190));
        assert_eq!(severity_color("HIGH"), severity_color("critical"));
    }
}
