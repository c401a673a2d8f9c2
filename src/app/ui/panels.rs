use std::path::Path;

use eframe::egui::{self, Align, Context, Layout, RichText};
use graph_lens::{GraphError, GraphView};

use super::super::Workbench;
use super::{FpsCounter, HostRequest};

impl Workbench {
    pub(in crate::app) fn new(view: GraphView) -> Self {
        Self {
            search: view.filter().search.clone(),
            view,
            quick_find: String::new(),
            live_physics: true,
            show_quadtree_overlay: false,
            show_fps_bar: true,
            fps: FpsCounter::default(),
            visible_node_count: 0,
            visible_edge_count: 0,
            fit_requested: true,
        }
    }

    pub(in crate::app) fn show(
        &mut self,
        ctx: &Context,
        dataset: &Path,
        request: &mut HostRequest,
        is_loading: bool,
    ) {
        self.fps.update(ctx);

        egui::TopBottomPanel::top("top_bar")
            .resizable(false)
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.heading("graph-lens");
                    ui.separator();
                    ui.label(format!("dataset: {}", dataset.display()));
                    if let Some(model) = self.view.model() {
                        ui.label(format!("nodes: {}", model.node_count()));
                        ui.label(format!("edges: {}", model.edge_count()));
                    }
                    let reload_button =
                        ui.add_enabled(!is_loading, egui::Button::new("Reload dataset"));
                    if reload_button.clicked() {
                        request.reload = true;
                    }
                    if ui.button("Reset").clicked() {
                        request.reset = true;
                    }
                    if ui.button("Fit to view").clicked() {
                        self.fit_requested = true;
                    }
                    ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                        ui.label(format!(
                            "visible graph: {} nodes / {} edges",
                            self.visible_node_count, self.visible_edge_count
                        ));
                        if let Some(simulation) = self.view.simulation() {
                            ui.label(format!(
                                "alpha {:.3} | ticks {}",
                                simulation.alpha(),
                                simulation.tick_count()
                            ));
                        }
                        if self.show_fps_bar {
                            ui.label(self.fps.display_text());
                        }
                    });
                });

                if let Some(message) = self.view.fetch_error() {
                    ui.horizontal(|ui| {
                        ui.colored_label(
                            egui::Color32::from_rgb(240, 160, 90),
                            format!("Reload failed, showing the last good graph: {message}"),
                        );
                        if ui.add_enabled(!is_loading, egui::Button::new("Retry")).clicked() {
                            request.reload = true;
                        }
                    });
                }
            });

        egui::SidePanel::left("controls")
            .resizable(true)
            .default_width(320.0)
            .show(ctx, |ui| {
                egui::ScrollArea::vertical().show(ui, |ui| self.draw_controls(ui));
            });

        egui::SidePanel::right("details")
            .resizable(true)
            .default_width(340.0)
            .show(ctx, |ui| {
                egui::ScrollArea::vertical().show(ui, |ui| self.draw_details(ui));
            });

        egui::CentralPanel::default().show(ctx, |ui| match self.view.check_renderable() {
            Ok(()) if self.view.model().is_none() => {
                ui.vertical_centered(|ui| {
                    ui.add_space(120.0);
                    if is_loading {
                        ui.heading("Loading graph dataset...");
                        ui.add_space(8.0);
                        ui.spinner();
                    } else {
                        ui.heading("No dataset loaded");
                        ui.label("Use \"Reload dataset\" to read it again.");
                    }
                });
            }
            Ok(()) => self.draw_graph(ui),
            Err(error) => {
                self.visible_node_count = 0;
                self.visible_edge_count = 0;
                ui.vertical_centered(|ui| {
                    ui.add_space(120.0);
                    ui.heading(empty_state_title(&error));
                    ui.label(RichText::new(error.to_string()).weak());
                });
            }
        });
    }
}

fn empty_state_title(error: &GraphError) -> &'static str {
    match error {
        GraphError::MalformedDataset(_) => "No data",
        GraphError::EmptyResult => "No nodes match the current filters",
        GraphError::FetchFailure(_) => "Dataset unavailable",
    }
}
