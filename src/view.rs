//! One mounted graph view: canonical model, filter, displayed set, simulation,
//! interaction state and host callbacks, owned together.

use std::fmt;

use tracing::{info, warn};

use crate::config::GraphViewConfig;
use crate::error::GraphError;
use crate::filter::{DisplayedGraph, ViewFilter, apply_filter};
use crate::interaction::{
    Intent, InteractionEvent, InteractionState, ViewTransform, Viewport,
};
use crate::layout::{Simulation, SimulationConfig};
use crate::model::{GraphModel, Node, NormalizeOptions, NormalizeWarning, Normalized};
use crate::render::{Frame, FrameOptions, build_frame};

/// Upper bound of ticks a host frame may request.
pub const MAX_TICKS_PER_FRAME: usize = 4;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ViewStatus {
    /// Nothing has been loaded yet.
    Idle,
    /// The last payload could not be normalized; nothing is simulated.
    NoData(String),
    /// A valid dataset, but no node survives the current filter.
    Empty,
    Ready,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GroupChoice {
    Cluster(Option<String>),
    Pathway(Option<String>),
}

type SelectCallback = Box<dyn FnMut(Option<&Node>)>;
type GroupCallback = Box<dyn FnMut(&GroupChoice)>;

pub struct GraphView {
    config: GraphViewConfig,
    viewport: Viewport,
    model: Option<GraphModel>,
    warnings: Vec<NormalizeWarning>,
    filter: ViewFilter,
    displayed: DisplayedGraph,
    simulation: Option<Simulation>,
    interaction: InteractionState,
    status: ViewStatus,
    fetch_error: Option<String>,
    on_select: Option<SelectCallback>,
    on_group: Option<GroupCallback>,
}

impl fmt::Debug for GraphView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphView")
            .field("status", &self.status)
            .field("filter", &self.filter)
            .field("displayed_nodes", &self.displayed.node_count())
            .field("displayed_edges", &self.displayed.edge_count())
            .field("fetch_error", &self.fetch_error)
            .finish_non_exhaustive()
    }
}

impl GraphView {
    pub fn new(config: GraphViewConfig) -> Self {
        let (min_zoom, max_zoom) = config.zoom_limits();
        Self {
            viewport: Viewport::new(config.width, config.height),
            filter: config.initial_filter(),
            interaction: InteractionState::new(ViewTransform::new(min_zoom, max_zoom)),
            config,
            model: None,
            warnings: Vec::new(),
            displayed: DisplayedGraph::default(),
            simulation: None,
            status: ViewStatus::Idle,
            fetch_error: None,
            on_select: None,
            on_group: None,
        }
    }

    pub fn on_select(&mut self, callback: impl FnMut(Option<&Node>) + 'static) {
        self.on_select = Some(Box::new(callback));
    }

    pub fn on_group_chosen(&mut self, callback: impl FnMut(&GroupChoice) + 'static) {
        self.on_group = Some(Box::new(callback));
    }

    pub fn config(&self) -> &GraphViewConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut GraphViewConfig {
        &mut self.config
    }

    pub fn normalize_options(&self) -> NormalizeOptions {
        NormalizeOptions {
            allow_self_loops: self.config.allow_self_loops,
        }
    }

    pub fn status(&self) -> &ViewStatus {
        &self.status
    }

    pub fn fetch_error(&self) -> Option<&str> {
        self.fetch_error.as_deref()
    }

    pub fn warnings(&self) -> &[NormalizeWarning] {
        &self.warnings
    }

    pub fn model(&self) -> Option<&GraphModel> {
        self.model.as_ref()
    }

    pub fn filter(&self) -> &ViewFilter {
        &self.filter
    }

    pub fn displayed(&self) -> &DisplayedGraph {
        &self.displayed
    }

    pub fn simulation(&self) -> Option<&Simulation> {
        self.simulation.as_ref()
    }

    pub fn simulation_mut(&mut self) -> Option<&mut Simulation> {
        self.simulation.as_mut()
    }

    pub fn interaction(&self) -> &InteractionState {
        &self.interaction
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    pub fn selected_node(&self) -> Option<&Node> {
        let id = self.interaction.selected()?;
        self.model.as_ref()?.node(id)
    }

    /// Maps the current state onto the error taxonomy a host renders.
    pub fn check_renderable(&self) -> Result<(), GraphError> {
        match &self.status {
            ViewStatus::NoData(reason) => Err(GraphError::MalformedDataset(reason.clone())),
            ViewStatus::Empty => Err(GraphError::EmptyResult),
            ViewStatus::Idle => match &self.fetch_error {
                Some(message) => Err(GraphError::FetchFailure(message.clone())),
                None => Ok(()),
            },
            ViewStatus::Ready => Ok(()),
        }
    }

    /// Accepts the outcome of a fetch + normalize round.
    pub fn receive(&mut self, outcome: Result<Normalized, GraphError>) {
        match outcome {
            Ok(normalized) => self.replace_model(normalized),
            Err(GraphError::FetchFailure(message)) => self.fetch_failed(message),
            Err(GraphError::MalformedDataset(reason)) => self.reject_dataset(reason),
            Err(GraphError::EmptyResult) => {
                self.replace_model(Normalized {
                    model: GraphModel::default(),
                    warnings: Vec::new(),
                });
            }
        }
    }

    pub fn load_json(&mut self, raw: &str) -> Result<(), GraphError> {
        let outcome = GraphModel::from_json_str(raw, self.normalize_options());
        let result = outcome.as_ref().map(|_| ()).map_err(Clone::clone);
        self.receive(outcome);
        result
    }

    pub fn replace_model(&mut self, normalized: Normalized) {
        info!(
            nodes = normalized.model.node_count(),
            edges = normalized.model.edge_count(),
            warnings = normalized.warnings.len(),
            "replacing graph model"
        );
        self.fetch_error = None;
        self.warnings = normalized.warnings;
        self.model = Some(normalized.model);
        self.simulation = None;
        self.recompute(false);
    }

    /// Keeps whatever is displayed and records the failure for the host.
    pub fn fetch_failed(&mut self, message: impl Into<String>) {
        let message = message.into();
        warn!(%message, "dataset fetch failed; keeping current graph");
        self.fetch_error = Some(message);
    }

    /// Clears everything loaded so far.
    pub fn reset(&mut self) {
        self.stop();
        self.model = None;
        self.warnings.clear();
        self.displayed = DisplayedGraph::default();
        self.fetch_error = None;
        self.status = ViewStatus::Idle;
        if self.interaction.reset().is_some() {
            self.emit_selection(None);
        }
    }

    fn reject_dataset(&mut self, reason: String) {
        warn!(%reason, "rejecting malformed dataset");
        self.stop();
        self.model = None;
        self.warnings.clear();
        self.displayed = DisplayedGraph::default();
        self.fetch_error = None;
        self.status = ViewStatus::NoData(reason);
        self.notify_selection_cleared();
    }

    fn stop(&mut self) {
        self.simulation = None;
    }

    pub fn set_filter(&mut self, filter: ViewFilter) {
        if filter == self.filter {
            return;
        }
        self.filter = filter;
        self.recompute(true);
    }

    pub fn update_filter(&mut self, update: impl FnOnce(&mut ViewFilter)) {
        let mut next = self.filter.clone();
        update(&mut next);
        self.set_filter(next);
    }

    pub fn choose_cluster(&mut self, cluster_id: Option<String>) {
        self.update_filter(|filter| filter.cluster_id = cluster_id.clone());
        if let Some(callback) = self.on_group.as_mut() {
            callback(&GroupChoice::Cluster(cluster_id));
        }
    }

    pub fn choose_pathway(&mut self, pathway_id: Option<String>) {
        self.update_filter(|filter| filter.pathway_id = pathway_id.clone());
        if let Some(callback) = self.on_group.as_mut() {
            callback(&GroupChoice::Pathway(pathway_id));
        }
    }

    /// New force parameters take effect through a warm restart.
    pub fn set_physics(&mut self, physics: SimulationConfig) {
        let physics = physics.sanitized();
        if physics == self.config.physics {
            return;
        }
        self.config.physics = physics;
        self.recompute(true);
    }

    pub fn reheat(&mut self) {
        if let Some(simulation) = self.simulation.as_mut() {
            simulation.restart();
        }
    }

    /// Rebuilds the displayed set and starts a fresh simulation. The previous
    /// one only lends its positions and never ticks again.
    fn recompute(&mut self, warm_start: bool) {
        let Some(model) = self.model.as_ref() else {
            return;
        };

        let displayed = apply_filter(model, &self.filter);
        let previous = self.simulation.take();
        let pinned_drag = self
            .interaction
            .dragging()
            .and_then(|id| previous.as_ref()?.position_of(id));

        if displayed.is_empty() {
            drop(previous);
            self.displayed = displayed;
            self.status = ViewStatus::Empty;
        } else {
            let seed = if warm_start { previous.as_ref() } else { None };
            let mut simulation =
                Simulation::for_graph(model, &displayed, self.config.physics.clone(), seed);
            drop(previous);
            self.interaction.carry_drag(&mut simulation, pinned_drag);
            self.simulation = Some(simulation);
            self.displayed = displayed;
            self.status = ViewStatus::Ready;
        }

        if let Some(InteractionEvent::SelectionChanged(None)) =
            self.interaction.retain_known(self.simulation.as_ref())
        {
            self.emit_selection(None);
        }
    }

    pub fn dispatch(&mut self, intent: Intent) {
        let event = self
            .interaction
            .apply(intent, self.simulation.as_mut(), &self.viewport);
        if let Some(InteractionEvent::SelectionChanged(selected)) = event {
            self.emit_selection(selected.as_deref());
        }
    }

    fn notify_selection_cleared(&mut self) {
        if self.interaction.selected().is_some() {
            self.interaction
                .apply(Intent::Select(None), None, &self.viewport);
            self.emit_selection(None);
        }
    }

    fn emit_selection(&mut self, selected: Option<&str>) {
        let Some(callback) = self.on_select.as_mut() else {
            return;
        };
        let record = selected.and_then(|id| self.model.as_ref()?.node(id));
        callback(record);
    }

    /// Node id under a screen-space pointer.
    pub fn node_at(&self, pointer: emath::Pos2) -> Option<&str> {
        let simulation = self.simulation.as_ref()?;
        let index = self
            .interaction
            .hit_test(simulation, &self.viewport, pointer)?;
        Some(simulation.id(index))
    }

    /// One cooperative tick; returns whether the layout still moves.
    pub fn tick(&mut self) -> bool {
        self.simulation.as_mut().is_some_and(Simulation::tick)
    }

    /// Ticks for one host frame of `delta_seconds`, at most [`MAX_TICKS_PER_FRAME`].
    pub fn advance(&mut self, delta_seconds: f32) -> bool {
        let ticks = ((delta_seconds * 60.0).round() as usize).clamp(1, MAX_TICKS_PER_FRAME);
        let mut active = false;
        for _ in 0..ticks {
            active = self.tick();
            if !active {
                break;
            }
        }
        active
    }

    pub fn run_until_settled(&mut self, max_ticks: usize) -> usize {
        self.simulation
            .as_mut()
            .map_or(0, |simulation| simulation.run(max_ticks))
    }

    pub fn fit_to_view(&mut self, padding: f32) {
        if let Some(bounds) = self.simulation.as_ref().and_then(Simulation::bounds) {
            self.interaction
                .transform
                .fit_to(&self.viewport, bounds, padding);
        }
    }

    pub fn frame(&self) -> Frame {
        let (Some(model), Some(simulation)) = (self.model.as_ref(), self.simulation.as_ref())
        else {
            return Frame::default();
        };

        build_frame(
            model,
            &self.displayed,
            simulation,
            &self.interaction,
            &self.viewport,
            FrameOptions {
                color_by: self.config.color_by,
                show_clusters: self.filter.cluster_id.is_none() && !model.clusters.is_empty(),
                show_pathways: self.config.show_pathways,
                hover_fields: &self.config.hover_fields,
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;

    const DATASET: &str = r#"{
        "nodes": [
            {"id": "a", "label": "Alpha", "type": "issue", "importanceScore": 0.9},
            {"id": "b", "label": "Beta", "type": "issue", "importanceScore": 0.4},
            {"id": "c", "label": "Gamma", "type": "person"}
        ],
        "edges": [
            {"id": "ab", "source": "a", "target": "b"},
            {"id": "bc", "source": "b", "target": "c", "type": "pathway"}
        ],
        "clusters": [{"id": "k", "name": "K", "nodes": ["a", "b"]}]
    }"#;

    #[test]
    fn malformed_payload_shows_no_data_and_never_simulates() {
        let mut view = GraphView::new(GraphViewConfig::default());
        view.load_json(DATASET).unwrap();
        assert_eq!(view.status(), &ViewStatus::Ready);

        let error = view.load_json(r#"{"edges": []}"#).unwrap_err();
        assert!(matches!(error, GraphError::MalformedDataset(_)));
        assert!(matches!(view.status(), ViewStatus::NoData(_)));
        assert!(view.simulation().is_none());
        assert!(!view.tick());
        assert!(matches!(
            view.check_renderable(),
            Err(GraphError::MalformedDataset(_))
        ));
    }

    #[test]
    fn fetch_failure_keeps_the_graph() {
        let mut view = GraphView::new(GraphViewConfig::default());
        view.load_json(DATASET).unwrap();
        view.run_until_settled(10);

        view.receive(Err(GraphError::FetchFailure("503".to_owned())));
        assert_eq!(view.fetch_error(), Some("503"));
        assert_eq!(view.status(), &ViewStatus::Ready);
        assert_eq!(view.displayed().node_count(), 3);
        assert_eq!(view.frame().nodes.len(), 3);

        view.reset();
        assert_eq!(view.status(), &ViewStatus::Idle);
        assert!(view.frame().nodes.is_empty());
    }

    #[test]
    fn reset_clears_the_whole_interaction() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let mut view = GraphView::new(GraphViewConfig::default());
        view.on_select(move |node| sink.borrow_mut().push(node.map(|node| node.id.clone())));
        view.load_json(DATASET).unwrap();

        view.dispatch(Intent::Zoom {
            anchor: emath::pos2(100.0, 100.0),
            factor: 1.15,
        });
        view.dispatch(Intent::Hover(Some("b".to_owned())));
        view.dispatch(Intent::Select(Some("a".to_owned())));
        let pointer = view.interaction().transform.world_to_screen(
            view.viewport(),
            view.simulation().unwrap().position_of("c").unwrap(),
        );
        view.dispatch(Intent::DragStart {
            node_id: "c".to_owned(),
            pointer,
        });

        view.reset();
        let interaction = view.interaction();
        assert_eq!(interaction.transform.zoom, 1.0);
        assert_eq!(interaction.transform.pan, emath::Vec2::ZERO);
        assert_eq!(interaction.hovered(), None);
        assert_eq!(interaction.dragging(), None);
        assert_eq!(interaction.selected(), None);
        assert_eq!(*seen.borrow(), [Some("a".to_owned()), None]);
    }

    #[test]
    fn filter_change_restarts_at_full_temperature() {
        let mut view = GraphView::new(GraphViewConfig::default());
        view.load_json(DATASET).unwrap();
        view.run_until_settled(10_000);
        assert!(view.simulation().unwrap().is_settled());

        view.update_filter(|filter| filter.search = "a".to_owned());
        let simulation = view.simulation().unwrap();
        assert_eq!(simulation.alpha(), 1.0);
        assert_eq!(simulation.tick_count(), 0);
        assert_eq!(view.displayed().node_ids(view.model().unwrap()), ["a", "b", "c"]);
    }

    #[test]
    fn selection_callback_receives_canonical_record() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);

        let mut view = GraphView::new(GraphViewConfig::default());
        view.on_select(move |node| sink.borrow_mut().push(node.map(|node| node.label.clone())));
        view.load_json(DATASET).unwrap();

        view.dispatch(Intent::Select(Some("b".to_owned())));
        view.dispatch(Intent::Select(Some("b".to_owned())));
        view.update_filter(|filter| filter.types = crate::filter::TypeFilter::single("person"));

        assert_eq!(*seen.borrow(), [Some("Beta".to_owned()), None]);
    }

    #[test]
    fn group_choice_updates_filter_and_notifies() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);

        let mut view = GraphView::new(GraphViewConfig::default());
        view.on_group_chosen(move |choice| sink.borrow_mut().push(choice.clone()));
        view.load_json(DATASET).unwrap();

        view.choose_cluster(Some("k".to_owned()));
        assert_eq!(view.displayed().node_count(), 2);
        assert_eq!(
            *seen.borrow(),
            [GroupChoice::Cluster(Some("k".to_owned()))]
        );
    }

    #[test]
    fn advance_is_bounded_per_frame() {
        let mut view = GraphView::new(GraphViewConfig::default());
        view.load_json(DATASET).unwrap();
        view.advance(1.0);
        assert_eq!(
            view.simulation().unwrap().tick_count(),
            MAX_TICKS_PER_FRAME as u64
        );
    }

    #[test]
    fn frame_dims_everything_outside_the_neighborhood() {
        let mut view = GraphView::new(GraphViewConfig::default());
        view.load_json(DATASET).unwrap();
        view.dispatch(Intent::Select(Some("a".to_owned())));

        let frame = view.frame();
        assert_eq!(frame.node("a").unwrap().opacity, 1.0);
        assert_eq!(frame.node("b").unwrap().opacity, 1.0);
        assert!(frame.node("c").unwrap().opacity < 1.0);
        assert!(frame.edge("ab").unwrap().highlighted);
        assert!(frame.edge("bc").unwrap().opacity < 1.0);
        assert!(frame.node("a").unwrap().selected);
        assert!(frame.node("a").unwrap().emphasized);
    }
}
