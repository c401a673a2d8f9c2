use eframe::egui::{self, RichText, Ui};
use graph_lens::Intent;
use graph_lens::util::truncate_label;

use super::super::Workbench;

const QUICK_FIND_LIMIT: usize = 12;

impl Workbench {
    pub(in crate::app) fn draw_details(&mut self, ui: &mut Ui) {
        ui.heading("Selection Details");
        ui.add_space(6.0);

        let mut pending_selection = None;
        self.draw_selection(ui, &mut pending_selection);

        ui.separator();
        self.draw_quick_find(ui, &mut pending_selection);

        ui.separator();
        self.draw_warnings(ui);

        if let Some(id) = pending_selection {
            self.view.dispatch(Intent::Select(Some(id)));
        }
    }

    fn draw_selection(&self, ui: &mut Ui, pending_selection: &mut Option<String>) {
        let Some(node) = self.view.selected_node() else {
            ui.label("Select a node from the graph or the quick-find list.");
            return;
        };

        ui.label(RichText::new(node.label.as_str()).strong());
        ui.small(node.id.as_str());
        ui.add_space(6.0);

        egui::Grid::new("node_fields")
            .num_columns(2)
            .striped(true)
            .show(ui, |ui| {
                ui.label("Type");
                ui.label(node.kind.as_str());
                ui.end_row();

                ui.label("Importance");
                ui.label(
                    node.importance
                        .map_or_else(|| "n/a".to_owned(), |score| format!("{score:.2}")),
                );
                ui.end_row();

                if let Some(cluster_id) = &node.cluster_id {
                    let name = self
                        .view
                        .model()
                        .and_then(|model| model.cluster(cluster_id))
                        .map_or(cluster_id.as_str(), |cluster| cluster.name.as_str());
                    ui.label("Cluster");
                    ui.label(name);
                    ui.end_row();
                }

                for (key, value) in &node.metadata {
                    ui.label(key.as_str());
                    ui.label(truncate_label(&value.to_string(), 64));
                    ui.end_row();
                }
            });

        ui.separator();
        ui.label(RichText::new("Neighbors in view").strong());

        let neighbors = self.neighbor_ids(&node.id);
        if neighbors.is_empty() {
            ui.label("No displayed edges touch this node.");
            return;
        }
        for (id, label) in neighbors {
            if ui.link(label).on_hover_text(id.as_str()).clicked() {
                *pending_selection = Some(id);
            }
        }
    }

    fn neighbor_ids(&self, id: &str) -> Vec<(String, String)> {
        let Some(model) = self.view.model() else {
            return Vec::new();
        };
        let displayed = self.view.displayed();
        let Some(position) = displayed.position_of_id(model, id) else {
            return Vec::new();
        };

        let mut neighbors = displayed
            .edges
            .iter()
            .filter_map(|edge| {
                if edge.source == position {
                    Some(edge.target)
                } else if edge.target == position {
                    Some(edge.source)
                } else {
                    None
                }
            })
            .filter(|&other| other != position)
            .collect::<Vec<_>>();
        neighbors.sort_unstable();
        neighbors.dedup();

        neighbors
            .into_iter()
            .map(|other| {
                let node = displayed.node(model, other);
                (node.id.clone(), node.label.clone())
            })
            .collect()
    }

    fn draw_quick_find(&mut self, ui: &mut Ui, pending_selection: &mut Option<String>) {
        ui.label(RichText::new("Quick find").strong())
            .on_hover_text("Fuzzy match over every node label, including filtered-out ones.");
        ui.text_edit_singleline(&mut self.quick_find);

        let Some(model) = self.view.model() else {
            return;
        };
        let displayed = self.view.displayed();

        for index in model.fuzzy_find(&self.quick_find, QUICK_FIND_LIMIT) {
            let node = &model.nodes[index];
            let in_view = displayed.position_of(index).is_some();
            let label = if in_view {
                node.label.clone()
            } else {
                format!("{}  [filtered out]", node.label)
            };

            let response = ui
                .add_enabled(in_view, egui::Link::new(label))
                .on_hover_text(node.id.as_str());
            if response.clicked() {
                *pending_selection = Some(node.id.clone());
            }
        }
    }

    fn draw_warnings(&self, ui: &mut Ui) {
        let warnings = self.view.warnings();
        if warnings.is_empty() {
            return;
        }

        ui.collapsing(format!("Dataset warnings ({})", warnings.len()), |ui| {
            for warning in warnings {
                ui.small(warning.to_string());
            }
        });
    }
}
