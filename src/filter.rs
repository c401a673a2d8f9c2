use std::collections::{BTreeSet, HashSet};

use tracing::debug;

use crate::model::{GraphModel, Node};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum TypeFilter {
    #[default]
    All,
    Only(BTreeSet<String>),
}

impl TypeFilter {
    /// `"all"` (or empty) is the identity filter; otherwise a comma-separated list.
    pub fn parse(text: &str) -> Self {
        let kinds = text
            .split(',')
            .map(str::trim)
            .filter(|kind| !kind.is_empty())
            .map(str::to_owned)
            .collect::<BTreeSet<_>>();

        if kinds.is_empty() || kinds.iter().any(|kind| kind.eq_ignore_ascii_case("all")) {
            Self::All
        } else {
            Self::Only(kinds)
        }
    }

    pub fn single(kind: impl Into<String>) -> Self {
        Self::Only(BTreeSet::from([kind.into()]))
    }

    pub fn matches(&self, kind: &str) -> bool {
        match self {
            Self::All => true,
            Self::Only(kinds) => kinds.contains(kind),
        }
    }
}

/// The user's current predicates over the canonical model.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ViewFilter {
    pub search: String,
    pub types: TypeFilter,
    pub max_nodes: Option<usize>,
    pub cluster_id: Option<String>,
    pub pathway_id: Option<String>,
    pub searchable_metadata: Vec<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DisplayedEdge {
    /// Index into `GraphModel::edges`.
    pub edge: usize,
    /// Position of the source in `DisplayedGraph::nodes`.
    pub source: usize,
    /// Position of the target in `DisplayedGraph::nodes`.
    pub target: usize,
}

/// Subset of the canonical model selected by a `ViewFilter`.
///
/// `nodes` holds model indices in ascending (original) order. Edge endpoints
/// always refer to positions inside `nodes`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DisplayedGraph {
    pub nodes: Vec<usize>,
    pub edges: Vec<DisplayedEdge>,
}

impl DisplayedGraph {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Position of a model node inside the displayed set.
    pub fn position_of(&self, model_index: usize) -> Option<usize> {
        self.nodes.binary_search(&model_index).ok()
    }

    pub fn position_of_id(&self, model: &GraphModel, id: &str) -> Option<usize> {
        model
            .index_of(id)
            .and_then(|index| self.position_of(index))
    }

    pub fn node<'a>(&self, model: &'a GraphModel, position: usize) -> &'a Node {
        &model.nodes[self.nodes[position]]
    }

    pub fn node_ids<'a>(&self, model: &'a GraphModel) -> Vec<&'a str> {
        self.nodes
            .iter()
            .map(|&index| model.nodes[index].id.as_str())
            .collect()
    }
}

fn matches_search(node: &Node, needle: &str, searchable_metadata: &[String]) -> bool {
    if needle.is_empty() {
        return true;
    }

    if node.label.to_lowercase().contains(needle) || node.kind.to_lowercase().contains(needle) {
        return true;
    }

    searchable_metadata.iter().any(|key| {
        node.metadata
            .get(key)
            .is_some_and(|value| value.to_string().to_lowercase().contains(needle))
    })
}

fn group_members<'a>(ids: &'a [String]) -> HashSet<&'a str> {
    ids.iter().map(String::as_str).collect()
}

/// Derives the displayed subset. Never mutates the model.
///
/// The node cap keeps the highest `importance` nodes (missing scores rank as
/// zero); ties keep original order, and survivors are emitted in original order.
/// Edges are rebuilt afterwards so that both endpoints are always displayed.
pub fn apply_filter(model: &GraphModel, filter: &ViewFilter) -> DisplayedGraph {
    let needle = filter.search.trim().to_lowercase();

    // An unknown cluster or pathway id restricts to nothing.
    let cluster_members = filter.cluster_id.as_deref().map(|id| {
        model
            .cluster(id)
            .map(|cluster| group_members(&cluster.node_ids))
            .unwrap_or_default()
    });
    let pathway_members = filter.pathway_id.as_deref().map(|id| {
        model
            .pathway(id)
            .map(|pathway| group_members(&pathway.node_ids))
            .unwrap_or_default()
    });

    let mut candidates = model
        .nodes
        .iter()
        .enumerate()
        .filter(|(_, node)| filter.types.matches(&node.kind))
        .filter(|(_, node)| matches_search(node, &needle, &filter.searchable_metadata))
        .filter(|(_, node)| {
            cluster_members
                .as_ref()
                .is_none_or(|members| members.contains(node.id.as_str()))
        })
        .filter(|(_, node)| {
            pathway_members
                .as_ref()
                .is_none_or(|members| members.contains(node.id.as_str()))
        })
        .map(|(index, _)| index)
        .collect::<Vec<_>>();

    if let Some(cap) = filter.max_nodes
        && candidates.len() > cap
    {
        let mut ranked = candidates.clone();
        ranked.sort_by(|a, b| {
            model.nodes[*b]
                .importance_or_zero()
                .total_cmp(&model.nodes[*a].importance_or_zero())
        });
        ranked.truncate(cap);
        ranked.sort_unstable();
        candidates = ranked;
    }

    let mut edges = Vec::new();
    for edge_index in 0..model.edge_count() {
        let (source, target) = model.endpoints(edge_index);
        if let (Ok(source), Ok(target)) = (
            candidates.binary_search(&source),
            candidates.binary_search(&target),
        ) {
            edges.push(DisplayedEdge {
                edge: edge_index,
                source,
                target,
            });
        }
    }

    debug!(
        nodes = candidates.len(),
        edges = edges.len(),
        "recomputed displayed graph"
    );

    DisplayedGraph {
        nodes: candidates,
        edges,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::model::{NormalizeOptions, normalize};

    fn model() -> GraphModel {
        normalize(
            &json!({
                "nodes": [
                    {"id": "a", "label": "Auth Service", "type": "service", "importanceScore": 0.2,
                     "metadata": {"owner": "identity-team"}},
                    {"id": "b", "label": "Billing", "type": "service", "importanceScore": 0.9},
                    {"id": "c", "label": "Authorization Flow", "type": "concept", "importanceScore": 0.6},
                    {"id": "d", "label": "Dana", "type": "person"}
                ],
                "edges": [
                    {"id": "ab", "source": "a", "target": "b"},
                    {"id": "bc", "source": "b", "target": "c"},
                    {"id": "cd", "source": "c", "target": "d"}
                ],
                "clusters": [{"id": "k1", "name": "Platform", "nodes": ["a", "b", "zz"]}],
                "pathways": [{"id": "p1", "name": "Login", "nodes": ["a", "c"]}]
            }),
            NormalizeOptions::default(),
        )
        .unwrap()
        .model
    }

    #[test]
    fn type_filter_parses_all_and_lists() {
        assert_eq!(TypeFilter::parse("all"), TypeFilter::All);
        assert_eq!(TypeFilter::parse(""), TypeFilter::All);
        assert_eq!(
            TypeFilter::parse("person, concept"),
            TypeFilter::Only(BTreeSet::from(["concept".to_owned(), "person".to_owned()]))
        );
    }

    #[test]
    fn type_filter_rebuilds_edges() {
        let model = model();
        let displayed = apply_filter(
            &model,
            &ViewFilter {
                types: TypeFilter::single("service"),
                ..ViewFilter::default()
            },
        );
        assert_eq!(displayed.node_ids(&model), ["a", "b"]);
        assert_eq!(displayed.edges.len(), 1);
        assert_eq!(model.edges[displayed.edges[0].edge].id, "ab");
    }

    #[test]
    fn search_consults_only_marked_metadata() {
        let model = model();
        let mut filter = ViewFilter {
            search: "identity".to_owned(),
            ..ViewFilter::default()
        };
        assert!(apply_filter(&model, &filter).is_empty());

        filter.searchable_metadata = vec!["owner".to_owned()];
        assert_eq!(apply_filter(&model, &filter).node_ids(&model), ["a"]);
    }

    #[test]
    fn search_matches_type_case_insensitively() {
        let model = model();
        let displayed = apply_filter(
            &model,
            &ViewFilter {
                search: "PERSON".to_owned(),
                ..ViewFilter::default()
            },
        );
        assert_eq!(displayed.node_ids(&model), ["d"]);
    }

    #[test]
    fn cluster_and_pathway_restrictions_intersect() {
        let model = model();
        let cluster_only = apply_filter(
            &model,
            &ViewFilter {
                cluster_id: Some("k1".to_owned()),
                ..ViewFilter::default()
            },
        );
        assert_eq!(cluster_only.node_ids(&model), ["a", "b"]);

        let both = apply_filter(
            &model,
            &ViewFilter {
                cluster_id: Some("k1".to_owned()),
                pathway_id: Some("p1".to_owned()),
                ..ViewFilter::default()
            },
        );
        assert_eq!(both.node_ids(&model), ["a"]);
        assert!(both.edges.is_empty());

        let unknown = apply_filter(
            &model,
            &ViewFilter {
                pathway_id: Some("missing".to_owned()),
                ..ViewFilter::default()
            },
        );
        assert!(unknown.is_empty());
    }

    #[test]
    fn node_cap_treats_missing_scores_as_zero() {
        let model = model();
        let displayed = apply_filter(
            &model,
            &ViewFilter {
                max_nodes: Some(3),
                ..ViewFilter::default()
            },
        );
        assert_eq!(displayed.node_ids(&model), ["a", "b", "c"]);
        assert_eq!(displayed.edges.len(), 2);
    }

    #[test]
    fn positions_resolve_through_binary_search() {
        let model = model();
        let displayed = apply_filter(
            &model,
            &ViewFilter {
                types: TypeFilter::parse("concept,person"),
                ..ViewFilter::default()
            },
        );
        assert_eq!(displayed.position_of_id(&model, "d"), Some(1));
        assert_eq!(displayed.position_of_id(&model, "a"), None);
        assert_eq!(displayed.node(&model, 0).id, "c");
    }
}
