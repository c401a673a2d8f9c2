//! Pointer intents and the state they act on.
//!
//! Pointer handlers never touch the simulation directly; they emit an
//! [`Intent`] which [`InteractionState::apply`] turns into transform changes or
//! pin/unpin edits.

mod highlight;
mod overlay;
mod transform;

use emath::{Pos2, Vec2};
use tracing::trace;

pub use highlight::{
    DIMMED_OPACITY, FULL_OPACITY, HighlightSet, edge_opacity, neighborhood, node_opacity,
};
pub use overlay::{ClusterRegion, HoverInfo, PathwayTrace, cluster_regions, pathway_traces};
pub use transform::{ViewTransform, Viewport};

use crate::layout::Simulation;

#[derive(Clone, Debug, PartialEq)]
pub enum Intent {
    DragStart { node_id: String, pointer: Pos2 },
    DragMove { pointer: Pos2 },
    DragEnd,
    Select(Option<String>),
    Hover(Option<String>),
    Pan { delta: Vec2 },
    Zoom { anchor: Pos2, factor: f32 },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InteractionEvent {
    SelectionChanged(Option<String>),
}

#[derive(Clone, Debug, PartialEq)]
struct DragState {
    node_id: String,
}

#[derive(Clone, Debug, Default)]
pub struct InteractionState {
    pub transform: ViewTransform,
    drag: Option<DragState>,
    selected: Option<String>,
    hovered: Option<String>,
}

impl InteractionState {
    pub fn new(transform: ViewTransform) -> Self {
        Self {
            transform,
            ..Self::default()
        }
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn hovered(&self) -> Option<&str> {
        self.hovered.as_deref()
    }

    pub fn dragging(&self) -> Option<&str> {
        self.drag.as_ref().map(|drag| drag.node_id.as_str())
    }

    pub fn apply(
        &mut self,
        intent: Intent,
        simulation: Option<&mut Simulation>,
        viewport: &Viewport,
    ) -> Option<InteractionEvent> {
        trace!(?intent, "applying intent");
        match intent {
            Intent::DragStart { node_id, pointer } => {
                let simulation = simulation?;
                let index = simulation.index_of(&node_id)?;
                if let Some(previous) = self.drag.take()
                    && let Some(previous_index) = simulation.index_of(&previous.node_id)
                {
                    simulation.unpin(previous_index);
                }

                simulation.pin(index, self.transform.screen_to_world(viewport, pointer));
                simulation.reheat();
                self.drag = Some(DragState { node_id });
                None
            }
            Intent::DragMove { pointer } => {
                let drag = self.drag.as_ref()?;
                let simulation = simulation?;
                let index = simulation.index_of(&drag.node_id)?;
                simulation.pin(index, self.transform.screen_to_world(viewport, pointer));
                None
            }
            Intent::DragEnd => {
                let drag = self.drag.take()?;
                let simulation = simulation?;
                if let Some(index) = simulation.index_of(&drag.node_id) {
                    simulation.unpin(index);
                }
                simulation.release_heat();
                None
            }
            Intent::Select(selected) => {
                if self.selected == selected {
                    return None;
                }
                self.selected = selected.clone();
                Some(InteractionEvent::SelectionChanged(selected))
            }
            Intent::Hover(hovered) => {
                self.hovered = hovered;
                None
            }
            Intent::Pan { delta } => {
                self.transform.pan_by(delta);
                None
            }
            Intent::Zoom { anchor, factor } => {
                self.transform.zoom_at(viewport, anchor, factor);
                None
            }
        }
    }

    /// Back to the initial view: identity transform within the same zoom
    /// limits, nothing hovered, dragged or selected.
    pub fn reset(&mut self) -> Option<InteractionEvent> {
        let (min_zoom, max_zoom) = self.transform.zoom_limits();
        let had_selection = self.selected.is_some();
        *self = Self::new(ViewTransform::new(min_zoom, max_zoom));
        had_selection.then_some(InteractionEvent::SelectionChanged(None))
    }

    /// Closest body whose on-screen disc contains `pointer`.
    pub fn hit_test(
        &self,
        simulation: &Simulation,
        viewport: &Viewport,
        pointer: Pos2,
    ) -> Option<usize> {
        (0..simulation.len())
            .filter_map(|index| {
                let center = self
                    .transform
                    .world_to_screen(viewport, simulation.position(index));
                let radius = simulation.collision_radius(index) * self.transform.zoom;
                let distance = center.distance(pointer);
                (distance <= radius.max(3.0)).then_some((index, distance))
            })
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(index, _)| index)
    }

    /// Drops selection, hover and drag that point at ids no longer displayed.
    pub fn retain_known(&mut self, simulation: Option<&Simulation>) -> Option<InteractionEvent> {
        let known = |id: &str| simulation.is_some_and(|sim| sim.index_of(id).is_some());

        if self.hovered.as_deref().is_some_and(|id| !known(id)) {
            self.hovered = None;
        }
        if self.drag.as_ref().is_some_and(|drag| !known(&drag.node_id)) {
            self.drag = None;
        }
        if self.selected.as_deref().is_some_and(|id| !known(id)) {
            self.selected = None;
            return Some(InteractionEvent::SelectionChanged(None));
        }
        None
    }

    /// Re-applies an in-progress drag to a freshly started simulation.
    pub fn carry_drag(&self, simulation: &mut Simulation, previous_position: Option<Vec2>) {
        if let Some(drag) = &self.drag
            && let Some(index) = simulation.index_of(&drag.node_id)
        {
            let position = previous_position.unwrap_or_else(|| simulation.position(index));
            simulation.pin(index, position);
            simulation.reheat();
        }
    }
}

#[cfg(test)]
mod tests {
    use emath::{pos2, vec2};

    use super::*;
    use crate::layout::{Body, SimulationConfig, Spring};

    fn simulation() -> Simulation {
        let bodies = ["a", "b", "c"]
            .into_iter()
            .map(|id| Body {
                id: id.to_owned(),
                size: 10.0,
                importance: 0.0,
            })
            .collect();
        let springs = [
            Spring {
                source: 0,
                target: 1,
                weight: 1.0,
                kind: "related".to_owned(),
            },
            Spring {
                source: 1,
                target: 2,
                weight: 1.0,
                kind: "related".to_owned(),
            },
        ];
        Simulation::new(bodies, &springs, SimulationConfig::default())
    }

    #[test]
    fn drag_pins_to_transformed_pointer() {
        let viewport = Viewport::new(800.0, 600.0);
        let mut state = InteractionState::default();
        state.transform.set_zoom(2.0);
        state.transform.pan_by(vec2(40.0, 0.0));
        let mut sim = simulation();

        state.apply(
            Intent::DragStart {
                node_id: "b".to_owned(),
                pointer: pos2(400.0, 300.0),
            },
            Some(&mut sim),
            &viewport,
        );
        assert_eq!(state.dragging(), Some("b"));
        assert!(sim.is_pinned(1));
        assert_eq!(
            sim.position(1),
            state.transform.screen_to_world(&viewport, pos2(400.0, 300.0))
        );
        assert_eq!(sim.alpha_target(), sim.config().alpha_reheat);

        let pointer = pos2(520.0, 180.0);
        state.apply(Intent::DragMove { pointer }, Some(&mut sim), &viewport);
        sim.tick();
        assert_eq!(
            sim.position(1),
            state.transform.screen_to_world(&viewport, pointer)
        );

        state.apply(Intent::DragEnd, Some(&mut sim), &viewport);
        assert!(!sim.is_pinned(1));
        assert_eq!(sim.alpha_target(), 0.0);
        assert_eq!(state.dragging(), None);
    }

    #[test]
    fn select_reports_only_changes() {
        let viewport = Viewport::new(100.0, 100.0);
        let mut state = InteractionState::default();

        let first = state.apply(Intent::Select(Some("a".to_owned())), None, &viewport);
        assert_eq!(
            first,
            Some(InteractionEvent::SelectionChanged(Some("a".to_owned())))
        );
        assert_eq!(
            state.apply(Intent::Select(Some("a".to_owned())), None, &viewport),
            None
        );
        assert_eq!(
            state.apply(Intent::Select(None), None, &viewport),
            Some(InteractionEvent::SelectionChanged(None))
        );
    }

    #[test]
    fn hover_does_not_touch_the_simulation() {
        let viewport = Viewport::new(100.0, 100.0);
        let mut state = InteractionState::default();
        let mut sim = simulation();
        let before = sim.positions().to_vec();

        state.apply(Intent::Hover(Some("c".to_owned())), Some(&mut sim), &viewport);
        assert_eq!(state.hovered(), Some("c"));
        assert_eq!(sim.positions(), before.as_slice());
        assert_eq!(sim.alpha_target(), 0.0);
    }

    #[test]
    fn hit_test_finds_node_under_pointer() {
        let viewport = Viewport::new(800.0, 600.0);
        let state = InteractionState::default();
        let sim = simulation();

        let target = state.transform.world_to_screen(&viewport, sim.position(2));
        assert_eq!(state.hit_test(&sim, &viewport, target), Some(2));
        assert_eq!(state.hit_test(&sim, &viewport, pos2(-500.0, -500.0)), None);
    }

    #[test]
    fn retain_known_clears_stale_selection() {
        let viewport = Viewport::new(100.0, 100.0);
        let mut state = InteractionState::default();
        state.apply(Intent::Select(Some("gone".to_owned())), None, &viewport);

        let sim = simulation();
        assert_eq!(
            state.retain_known(Some(&sim)),
            Some(InteractionEvent::SelectionChanged(None))
        );
        assert_eq!(state.selected(), None);
    }

    #[test]
    fn reset_restores_the_initial_view_within_zoom_limits() {
        let viewport = Viewport::new(800.0, 600.0);
        let mut state = InteractionState::new(ViewTransform::new(0.5, 4.0));
        let mut sim = simulation();
        state.apply(Intent::Zoom { anchor: pos2(10.0, 10.0), factor: 3.0 }, None, &viewport);
        state.apply(Intent::Pan { delta: vec2(25.0, -5.0) }, None, &viewport);
        state.apply(Intent::Hover(Some("a".to_owned())), None, &viewport);
        state.apply(Intent::Select(Some("a".to_owned())), None, &viewport);
        state.apply(
            Intent::DragStart {
                node_id: "c".to_owned(),
                pointer: pos2(300.0, 300.0),
            },
            Some(&mut sim),
            &viewport,
        );

        assert_eq!(
            state.reset(),
            Some(InteractionEvent::SelectionChanged(None))
        );
        assert_eq!(state.transform.pan, Vec2::ZERO);
        assert_eq!(state.transform.zoom, 1.0);
        assert_eq!(state.transform.zoom_limits(), (0.5, 4.0));
        assert_eq!(state.hovered(), None);
        assert_eq!(state.dragging(), None);
        assert_eq!(state.selected(), None);
        assert_eq!(state.reset(), None);
    }
}
