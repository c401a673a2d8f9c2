use std::ops::RangeInclusive;

use eframe::egui::{self, Ui};
use graph_lens::{ColorMode, TypeFilter};

use super::super::Workbench;

const ALL_TYPES: &str = "all";

fn physics_slider(ui: &mut Ui, value: &mut f32, range: RangeInclusive<f32>, text: &str, hover: &str) -> bool {
    ui.add(
        egui::Slider::new(value, range)
            .text(text)
            .clamping(egui::SliderClamping::Always),
    )
    .on_hover_text(hover)
    .changed()
}

fn type_label(types: &TypeFilter) -> String {
    match types {
        TypeFilter::All => ALL_TYPES.to_owned(),
        TypeFilter::Only(kinds) => kinds.iter().cloned().collect::<Vec<_>>().join(", "),
    }
}

impl Workbench {
    pub(in crate::app) fn draw_controls(&mut self, ui: &mut Ui) {
        ui.heading("Filters");
        ui.add_space(4.0);

        ui.label("Search")
            .on_hover_text("Case-insensitive match on label, type and searchable metadata.");
        if ui.text_edit_singleline(&mut self.search).changed() {
            let search = self.search.clone();
            self.view.update_filter(|filter| filter.search = search);
        }

        self.draw_type_filter(ui);
        self.draw_node_cap(ui);

        ui.separator();
        self.draw_group_choices(ui);

        ui.separator();
        ui.label("Color nodes by");
        ui.horizontal(|ui| {
            let color_by = &mut self.view.config_mut().color_by;
            ui.selectable_value(color_by, ColorMode::Type, "Type");
            ui.selectable_value(color_by, ColorMode::Importance, "Importance");
        });

        ui.separator();
        ui.checkbox(&mut self.live_physics, "Live physics simulation")
            .on_hover_text("Advance the layout every frame while it is still moving.");
        ui.checkbox(&mut self.show_quadtree_overlay, "Show quadtree overlay")
            .on_hover_text("Draw the Barnes-Hut partitions over the graph canvas.");
        ui.checkbox(&mut self.show_fps_bar, "FPS display")
            .on_hover_text("Show a live FPS readout in the header.");

        ui.collapsing("FPS display tuning", |ui| {
            ui.add_enabled_ui(self.show_fps_bar, |ui| {
                ui.checkbox(&mut self.fps.show_average, "Show average FPS");
                ui.checkbox(&mut self.fps.show_low, "Show low FPS");
                ui.checkbox(&mut self.fps.show_frame_time, "Show frame time");
            });
        });

        ui.collapsing("Physics tuning", |ui| self.draw_physics_tuning(ui));
    }

    fn draw_type_filter(&mut self, ui: &mut Ui) {
        let Some(model) = self.view.model() else {
            return;
        };
        let kinds = model
            .node_types()
            .into_iter()
            .map(str::to_owned)
            .collect::<Vec<_>>();
        let current = self.view.filter().types.clone();

        let mut chosen = None;
        egui::ComboBox::from_label("Node type")
            .selected_text(type_label(&current))
            .show_ui(ui, |ui| {
                if ui
                    .selectable_label(current == TypeFilter::All, ALL_TYPES)
                    .clicked()
                {
                    chosen = Some(TypeFilter::All);
                }
                for kind in kinds {
                    let active = current.matches(&kind) && current != TypeFilter::All;
                    if ui.selectable_label(active, kind.as_str()).clicked() {
                        chosen = Some(TypeFilter::single(kind));
                    }
                }
            });

        if let Some(types) = chosen {
            self.view.update_filter(|filter| filter.types = types);
        }
    }

    fn draw_node_cap(&mut self, ui: &mut Ui) {
        let node_count = self.view.model().map_or(0, |model| model.node_count());
        let mut max_nodes = self.view.filter().max_nodes;
        let mut capped = max_nodes.is_some();

        let mut changed = ui
            .checkbox(&mut capped, "Cap rendered nodes")
            .on_hover_text("Keep only the most important nodes when the view is large.")
            .changed();

        if capped {
            let mut limit = max_nodes.unwrap_or(200);
            let upper = node_count.max(limit).max(2);
            changed |= ui
                .add(
                    egui::Slider::new(&mut limit, 1..=upper)
                        .step_by(5.0)
                        .text("Max nodes"),
                )
                .changed();
            max_nodes = Some(limit);
        } else {
            max_nodes = None;
        }

        if changed {
            self.view.update_filter(|filter| filter.max_nodes = max_nodes);
        }
    }

    fn draw_group_choices(&mut self, ui: &mut Ui) {
        let Some(model) = self.view.model() else {
            return;
        };
        let clusters = model
            .clusters
            .iter()
            .map(|cluster| (cluster.id.clone(), cluster.name.clone()))
            .collect::<Vec<_>>();
        let pathways = model
            .pathways
            .iter()
            .map(|pathway| (pathway.id.clone(), pathway.name.clone()))
            .collect::<Vec<_>>();

        let current_cluster = self.view.filter().cluster_id.clone();
        if let Some(choice) = group_combo(ui, "Cluster", &clusters, current_cluster.as_deref()) {
            self.view.choose_cluster(choice);
        }

        let current_pathway = self.view.filter().pathway_id.clone();
        if let Some(choice) = group_combo(ui, "Pathway", &pathways, current_pathway.as_deref()) {
            self.view.choose_pathway(choice);
        }

        ui.checkbox(&mut self.view.config_mut().show_pathways, "Show pathways")
            .on_hover_text("Trace every pathway through its displayed members.");
    }

    fn draw_physics_tuning(&mut self, ui: &mut Ui) {
        let mut physics = self.view.config().physics.clone();
        let mut changed = false;

        changed |= physics_slider(
            ui,
            &mut physics.charge_strength,
            -800.0..=-10.0,
            "Repulsion",
            "How strongly nodes push away from each other.",
        );
        changed |= physics_slider(
            ui,
            &mut physics.link_strength,
            0.01..=1.0,
            "Edge spring",
            "How strongly connected nodes pull toward their target distance.",
        );
        changed |= physics_slider(
            ui,
            &mut physics.link_base_distance,
            10.0..=200.0,
            "Edge length",
            "Rest length of an edge before its weight is applied.",
        );
        changed |= physics_slider(
            ui,
            &mut physics.center_strength,
            0.0..=0.3,
            "Gravity",
            "Pull toward the layout center.",
        );
        changed |= physics_slider(
            ui,
            &mut physics.collision_margin,
            0.0..=12.0,
            "Collision margin",
            "Extra spacing kept between node discs.",
        );
        changed |= physics_slider(
            ui,
            &mut physics.velocity_decay,
            0.05..=0.9,
            "Velocity decay",
            "Fraction of velocity lost each tick.",
        );

        if changed {
            self.view.set_physics(physics);
        }

        if ui.button("Reheat layout").clicked() {
            self.view.reheat();
        }
    }
}

/// Returns `Some(choice)` when the user picked a different entry.
fn group_combo(
    ui: &mut Ui,
    label: &str,
    entries: &[(String, String)],
    current: Option<&str>,
) -> Option<Option<String>> {
    if entries.is_empty() {
        return None;
    }

    let selected_text = current
        .and_then(|id| entries.iter().find(|(entry, _)| entry == id))
        .map_or("none", |(_, name)| name.as_str());

    let mut chosen = None;
    egui::ComboBox::from_label(label)
        .selected_text(selected_text)
        .show_ui(ui, |ui| {
            if ui.selectable_label(current.is_none(), "none").clicked() {
                chosen = Some(None);
            }
            for (id, name) in entries {
                if ui
                    .selectable_label(current == Some(id.as_str()), name.as_str())
                    .clicked()
                {
                    chosen = Some(Some(id.clone()));
                }
            }
        });

    chosen.filter(|choice| choice.as_deref() != current)
}
