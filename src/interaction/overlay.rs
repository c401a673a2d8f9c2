use std::collections::HashSet;

use emath::{Rect, Vec2, vec2};

use crate::filter::DisplayedGraph;
use crate::layout::Simulation;
use crate::model::{GraphModel, Node, Rgb};

const DEFAULT_HOVER_FIELDS: usize = 4;
const REGION_PADDING: f32 = 18.0;

/// Transient info shown while the pointer rests on a node.
#[derive(Clone, Debug, PartialEq)]
pub struct HoverInfo {
    pub id: String,
    pub label: String,
    pub kind: String,
    pub fields: Vec<(String, String)>,
}

impl HoverInfo {
    /// With no `fields` requested, the first few metadata entries are shown.
    pub fn for_node(node: &Node, fields: &[String]) -> Self {
        let fields = if fields.is_empty() {
            node.metadata
                .iter()
                .take(DEFAULT_HOVER_FIELDS)
                .map(|(key, value)| (key.clone(), value.to_string()))
                .collect()
        } else {
            fields
                .iter()
                .filter_map(|key| {
                    node.metadata
                        .get(key)
                        .map(|value| (key.clone(), value.to_string()))
                })
                .collect()
        };

        Self {
            id: node.id.clone(),
            label: node.label.clone(),
            kind: node.kind.clone(),
            fields,
        }
    }
}

/// World-space region drawn behind the members of one cluster.
#[derive(Clone, Debug, PartialEq)]
pub struct ClusterRegion {
    pub id: String,
    pub name: String,
    pub bounds: Rect,
    pub member_count: usize,
    pub color: Rgb,
}

/// World-space polyline through a pathway's displayed members, in pathway order.
#[derive(Clone, Debug, PartialEq)]
pub struct PathwayTrace {
    pub id: String,
    pub name: String,
    pub points: Vec<Vec2>,
}

pub fn cluster_regions(
    model: &GraphModel,
    displayed: &DisplayedGraph,
    simulation: &Simulation,
) -> Vec<ClusterRegion> {
    model
        .clusters
        .iter()
        .filter_map(|cluster| {
            let members = cluster
                .node_ids
                .iter()
                .map(String::as_str)
                .collect::<HashSet<_>>();

            let indices = members
                .into_iter()
                .filter(|id| displayed.position_of_id(model, id).is_some())
                .filter_map(|id| simulation.index_of(id))
                .collect::<Vec<_>>();
            let bounds = simulation.bounds_of(indices.iter().copied())?;

            Some(ClusterRegion {
                id: cluster.id.clone(),
                name: cluster.name.clone(),
                bounds: bounds.expand2(vec2(REGION_PADDING, REGION_PADDING)),
                member_count: indices.len(),
                color: Rgb::for_type(&cluster.id),
            })
        })
        .collect()
}

pub fn pathway_traces(
    model: &GraphModel,
    displayed: &DisplayedGraph,
    simulation: &Simulation,
) -> Vec<PathwayTrace> {
    model
        .pathways
        .iter()
        .filter_map(|pathway| {
            let points = pathway
                .node_ids
                .iter()
                .filter(|id| displayed.position_of_id(model, id).is_some())
                .filter_map(|id| simulation.position_of(id))
                .collect::<Vec<_>>();
            (points.len() >= 2).then(|| PathwayTrace {
                id: pathway.id.clone(),
                name: pathway.name.clone(),
                points,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::config::SimulationConfig;
    use crate::filter::{ViewFilter, apply_filter};
    use crate::model::{NormalizeOptions, normalize};

    fn model() -> GraphModel {
        normalize(
            &json!({
                "nodes": [
                    {"id": "a", "clusterId": "c1", "metadata": {"team": "core", "age": 3, "zone": "eu",
                                                            "lead": "kim", "rank": 1}},
                    {"id": "b", "clusterId": "c1"},
                    {"id": "c"},
                    {"id": "d"}
                ],
                "clusters": [{"id": "c1", "name": "Core", "nodes": ["c"]}, {"id": "empty", "nodes": []}],
                "pathways": [{"id": "p", "name": "Path", "nodes": ["d", "a", "missing"]}]
            }),
            NormalizeOptions::default(),
        )
        .unwrap()
        .model
    }

    #[test]
    fn hover_shows_requested_fields_or_first_entries() {
        let model = model();
        let node = model.node("a").unwrap();

        let picked = HoverInfo::for_node(node, &["zone".to_owned(), "unknown".to_owned()]);
        assert_eq!(picked.fields, [("zone".to_owned(), "eu".to_owned())]);

        let default = HoverInfo::for_node(node, &[]);
        assert_eq!(default.fields.len(), 4);
    }

    #[test]
    fn regions_cover_members_from_both_sources() {
        let model = model();
        let displayed = apply_filter(&model, &ViewFilter::default());
        let sim = Simulation::for_graph(&model, &displayed, SimulationConfig::default(), None);

        let regions = cluster_regions(&model, &displayed, &sim);
        assert_eq!(regions.len(), 1);
        let region = &regions[0];
        assert_eq!(region.member_count, 3);
        for id in ["a", "b", "c"] {
            let position = sim.position_of(id).unwrap();
            assert!(region.bounds.contains(emath::pos2(position.x, position.y)));
        }
    }

    #[test]
    fn traces_follow_pathway_order() {
        let model = model();
        let displayed = apply_filter(&model, &ViewFilter::default());
        let sim = Simulation::for_graph(&model, &displayed, SimulationConfig::default(), None);

        let traces = pathway_traces(&model, &displayed, &sim);
        assert_eq!(traces.len(), 1);
        assert_eq!(
            traces[0].points,
            [sim.position_of("d").unwrap(), sim.position_of("a").unwrap()]
        );
    }
}
