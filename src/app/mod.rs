use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;

use eframe::egui::{self, Context};
use graph_lens::{GraphError, GraphModel, GraphView, GraphViewConfig, NormalizeOptions, Normalized};
use tracing::{debug, info};

mod canvas;
mod render_utils;
mod ui;

use ui::FpsCounter;

type LoadResult = Result<Normalized, GraphError>;

pub struct GraphLensApp {
    dataset: PathBuf,
    config: GraphViewConfig,
    state: AppState,
    reload_rx: Option<Receiver<LoadResult>>,
}

enum AppState {
    Loading { rx: Receiver<LoadResult> },
    Ready(Box<Workbench>),
    Error(String),
}

/// Everything the window shows around one [`GraphView`].
struct Workbench {
    view: GraphView,
    search: String,
    quick_find: String,
    live_physics: bool,
    show_quadtree_overlay: bool,
    show_fps_bar: bool,
    fps: FpsCounter,
    visible_node_count: usize,
    visible_edge_count: usize,
    fit_requested: bool,
}

impl GraphLensApp {
    pub fn new(_cc: &eframe::CreationContext<'_>, dataset: PathBuf, config: GraphViewConfig) -> Self {
        let options = NormalizeOptions {
            allow_self_loops: config.allow_self_loops,
        };
        let state = AppState::Loading {
            rx: Self::spawn_load(dataset.clone(), options),
        };
        Self {
            dataset,
            config,
            state,
            reload_rx: None,
        }
    }

    fn spawn_load(dataset: PathBuf, options: NormalizeOptions) -> Receiver<LoadResult> {
        let (tx, rx) = mpsc::channel();

        thread::spawn(move || {
            let result = read_dataset(&dataset, options);
            let _ = tx.send(result);
        });

        rx
    }

    fn normalize_options(&self) -> NormalizeOptions {
        NormalizeOptions {
            allow_self_loops: self.config.allow_self_loops,
        }
    }

    fn workbench(&self, outcome: LoadResult) -> AppState {
        if let Err(GraphError::FetchFailure(message)) = outcome {
            return AppState::Error(message);
        }
        let mut view = GraphView::new(self.config.clone());
        view.on_select(|node| match node {
            Some(node) => info!(id = %node.id, label = %node.label, "node selected"),
            None => info!("selection cleared"),
        });
        view.on_group_chosen(|choice| info!(?choice, "group chosen"));
        view.receive(outcome);
        AppState::Ready(Box::new(Workbench::new(view)))
    }
}

fn read_dataset(path: &Path, options: NormalizeOptions) -> LoadResult {
    debug!(path = %path.display(), "reading dataset");
    let raw = fs::read_to_string(path)
        .map_err(|error| GraphError::FetchFailure(format!("{}: {error}", path.display())))?;
    GraphModel::from_json_str(&raw, options)
}

impl eframe::App for GraphLensApp {
    fn update(&mut self, ctx: &Context, _frame: &mut eframe::Frame) {
        let mut transition = None;

        match &mut self.state {
            AppState::Loading { rx } => {
                match rx.try_recv() {
                    Ok(outcome) => transition = Some(outcome),
                    Err(TryRecvError::Empty) => {}
                    Err(TryRecvError::Disconnected) => {
                        transition = Some(Err(GraphError::FetchFailure(
                            "background load worker disconnected".to_owned(),
                        )));
                    }
                }

                egui::CentralPanel::default().show(ctx, |ui| {
                    ui.vertical_centered(|ui| {
                        ui.add_space(120.0);
                        ui.heading("Loading graph dataset...");
                        ui.add_space(8.0);
                        ui.spinner();
                    });
                });
                ctx.request_repaint();
            }
            AppState::Error(error) => {
                let mut retry = false;
                egui::CentralPanel::default().show(ctx, |ui| {
                    ui.heading("Failed to load the graph dataset");
                    ui.add_space(6.0);
                    ui.label(error.as_str());
                    ui.add_space(10.0);
                    retry = ui.button("Retry").clicked();
                });
                if retry {
                    self.state = AppState::Loading {
                        rx: Self::spawn_load(self.dataset.clone(), self.normalize_options()),
                    };
                }
            }
            AppState::Ready(workbench) => {
                let mut request = ui::HostRequest::default();
                let is_reloading = self.reload_rx.is_some();
                workbench.show(ctx, &self.dataset, &mut request, is_reloading);

                if request.reset {
                    workbench.view.reset();
                    self.reload_rx = None;
                }

                if request.reload {
                    // A newer request replaces any pending one.
                    self.reload_rx = Some(Self::spawn_load(
                        self.dataset.clone(),
                        workbench.view.normalize_options(),
                    ));
                }

                if let Some(rx) = self.reload_rx.take() {
                    match rx.try_recv() {
                        Ok(outcome) => {
                            workbench.view.receive(outcome);
                            workbench.fit_requested = true;
                        }
                        Err(TryRecvError::Empty) => {
                            self.reload_rx = Some(rx);
                            ctx.request_repaint();
                        }
                        Err(TryRecvError::Disconnected) => {
                            workbench
                                .view
                                .fetch_failed("background load worker disconnected");
                        }
                    }
                }
            }
        }

        if let Some(outcome) = transition {
            self.state = self.workbench(outcome);
        }
    }
}
