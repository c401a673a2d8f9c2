//! Headless render primitives built from the current simulation state.
//!
//! Everything here is in screen space; a painter only has to draw what it gets.

use emath::{Pos2, Rect};

use crate::config::ColorMode;
use crate::filter::DisplayedGraph;
use crate::interaction::{
    HighlightSet, HoverInfo, InteractionState, Viewport, cluster_regions, edge_opacity,
    neighborhood, node_opacity, pathway_traces,
};
use crate::layout::Simulation;
use crate::model::{GraphModel, Rgb};
use crate::util::truncate_label;

const LABEL_MAX_CHARS: usize = 32;
const LABEL_RADIUS_THRESHOLD: f32 = 14.0;
const LABEL_ZOOM_THRESHOLD: f32 = 1.35;
const EDGE_LABEL_ZOOM_THRESHOLD: f32 = 1.2;
const EMPHASIS_THRESHOLD: f32 = 0.7;

#[derive(Clone, Debug, PartialEq)]
pub struct NodePrimitive {
    pub id: String,
    pub center: Pos2,
    pub radius: f32,
    pub color: Rgb,
    pub opacity: f32,
    pub label: Option<String>,
    pub selected: bool,
    pub hovered: bool,
    pub emphasized: bool,
    pub pinned: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct EdgePrimitive {
    pub id: String,
    pub from: Pos2,
    pub to: Pos2,
    pub width: f32,
    pub opacity: f32,
    pub highlighted: bool,
    pub label: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct RegionPrimitive {
    pub rect: Rect,
    pub label: String,
    pub color: Rgb,
}

#[derive(Clone, Debug, PartialEq)]
pub struct PathPrimitive {
    pub points: Vec<Pos2>,
    pub label: String,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameOptions<'a> {
    pub color_by: ColorMode,
    pub show_clusters: bool,
    pub show_pathways: bool,
    pub hover_fields: &'a [String],
}

/// One drawable snapshot, in paint order: regions, paths, edges, nodes.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Frame {
    pub regions: Vec<RegionPrimitive>,
    pub paths: Vec<PathPrimitive>,
    pub edges: Vec<EdgePrimitive>,
    pub nodes: Vec<NodePrimitive>,
    pub hover: Option<HoverInfo>,
}

impl Frame {
    pub fn node(&self, id: &str) -> Option<&NodePrimitive> {
        self.nodes.iter().find(|node| node.id == id)
    }

    pub fn edge(&self, id: &str) -> Option<&EdgePrimitive> {
        self.edges.iter().find(|edge| edge.id == id)
    }
}

pub fn highlight_for(
    model: &GraphModel,
    displayed: &DisplayedGraph,
    interaction: &InteractionState,
) -> Option<HighlightSet> {
    let selected = interaction.selected()?;
    let position = displayed.position_of_id(model, selected)?;
    Some(neighborhood(displayed, position))
}

pub fn build_frame(
    model: &GraphModel,
    displayed: &DisplayedGraph,
    simulation: &Simulation,
    interaction: &InteractionState,
    viewport: &Viewport,
    options: FrameOptions<'_>,
) -> Frame {
    let transform = &interaction.transform;
    let zoom = transform.zoom;
    let highlight = highlight_for(model, displayed, interaction);
    let to_screen = |position| transform.world_to_screen(viewport, position);

    let regions = if options.show_clusters {
        cluster_regions(model, displayed, simulation)
            .into_iter()
            .map(|region| RegionPrimitive {
                rect: transform.world_rect_to_screen(viewport, region.bounds),
                label: format!("{} ({})", region.name, region.member_count),
                color: region.color,
            })
            .collect()
    } else {
        Vec::new()
    };

    let paths = if options.show_pathways {
        pathway_traces(model, displayed, simulation)
            .into_iter()
            .map(|trace| PathPrimitive {
                points: trace.points.into_iter().map(to_screen).collect(),
                label: trace.name,
            })
            .collect()
    } else {
        Vec::new()
    };

    let edges = displayed
        .edges
        .iter()
        .enumerate()
        .filter(|(_, edge)| edge.source < simulation.len() && edge.target < simulation.len())
        .map(|(index, edge)| {
            let record = &model.edges[edge.edge];
            let highlighted = highlight.as_ref().is_some_and(|set| set.contains_edge(index));
            let width = ((1.0 + record.weight.sqrt()) * zoom.sqrt()).clamp(0.5, 6.0);
            EdgePrimitive {
                id: record.id.clone(),
                from: to_screen(simulation.position(edge.source)),
                to: to_screen(simulation.position(edge.target)),
                width: if highlighted { width * 1.6 } else { width },
                opacity: edge_opacity(highlight.as_ref(), index),
                highlighted,
                label: record
                    .label
                    .as_ref()
                    .filter(|_| zoom > EDGE_LABEL_ZOOM_THRESHOLD)
                    .cloned(),
            }
        })
        .collect();

    let selected = interaction.selected();
    let hovered = interaction.hovered();
    let nodes = (0..displayed.node_count().min(simulation.len()))
        .map(|position| {
            let node = displayed.node(model, position);
            let importance = node.importance_or_zero();
            let radius = simulation.collision_radius(position) * zoom;
            let is_selected = selected == Some(node.id.as_str());
            let is_hovered = hovered == Some(node.id.as_str());
            let in_highlight = highlight
                .as_ref()
                .is_some_and(|set| set.contains_node(position));
            let show_label = is_selected
                || is_hovered
                || in_highlight
                || radius > LABEL_RADIUS_THRESHOLD
                || zoom > LABEL_ZOOM_THRESHOLD;

            NodePrimitive {
                id: node.id.clone(),
                center: to_screen(simulation.position(position)),
                radius,
                color: match options.color_by {
                    ColorMode::Type => node.color,
                    ColorMode::Importance => Rgb::for_score(importance),
                },
                opacity: node_opacity(highlight.as_ref(), position),
                label: show_label.then(|| truncate_label(&node.label, LABEL_MAX_CHARS)),
                selected: is_selected,
                hovered: is_hovered,
                emphasized: importance >= EMPHASIS_THRESHOLD,
                pinned: simulation.is_pinned(position),
            }
        })
        .collect();

    let hover = hovered
        .and_then(|id| model.node(id))
        .map(|node| HoverInfo::for_node(node, options.hover_fields));

    Frame {
        regions,
        paths,
        edges,
        nodes,
        hover,
    }
}
