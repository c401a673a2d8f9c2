use std::collections::BTreeSet;

use crate::filter::DisplayedGraph;

pub const FULL_OPACITY: f32 = 1.0;
pub const DIMMED_OPACITY: f32 = 0.15;

/// Selected node, its direct neighbors, and the edges touching it.
/// Node entries are positions in the displayed set, edge entries are indices
/// into `DisplayedGraph::edges`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HighlightSet {
    pub selected: usize,
    pub nodes: BTreeSet<usize>,
    pub edges: BTreeSet<usize>,
}

impl HighlightSet {
    pub fn contains_node(&self, position: usize) -> bool {
        self.nodes.contains(&position)
    }

    pub fn contains_edge(&self, edge: usize) -> bool {
        self.edges.contains(&edge)
    }
}

pub fn neighborhood(displayed: &DisplayedGraph, selected: usize) -> HighlightSet {
    let mut nodes = BTreeSet::from([selected]);
    let mut edges = BTreeSet::new();

    for (edge_index, edge) in displayed.edges.iter().enumerate() {
        if edge.source == selected {
            nodes.insert(edge.target);
            edges.insert(edge_index);
        } else if edge.target == selected {
            nodes.insert(edge.source);
            edges.insert(edge_index);
        }
    }

    HighlightSet {
        selected,
        nodes,
        edges,
    }
}

pub fn node_opacity(highlight: Option<&HighlightSet>, position: usize) -> f32 {
    match highlight {
        Some(set) if !set.contains_node(position) => DIMMED_OPACITY,
        _ => FULL_OPACITY,
    }
}

pub fn edge_opacity(highlight: Option<&HighlightSet>, edge: usize) -> f32 {
    match highlight {
        Some(set) if !set.contains_edge(edge) => DIMMED_OPACITY,
        _ => FULL_OPACITY,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::DisplayedEdge;

    fn displayed() -> DisplayedGraph {
        DisplayedGraph {
            nodes: vec![0, 1, 2, 3],
            edges: vec![
                DisplayedEdge {
                    edge: 0,
                    source: 0,
                    target: 1,
                },
                DisplayedEdge {
                    edge: 1,
                    source: 2,
                    target: 1,
                },
                DisplayedEdge {
                    edge: 2,
                    source: 3,
                    target: 3,
                },
            ],
        }
    }

    #[test]
    fn includes_both_edge_directions() {
        let set = neighborhood(&displayed(), 1);
        assert_eq!(set.nodes, BTreeSet::from([0, 1, 2]));
        assert_eq!(set.edges, BTreeSet::from([0, 1]));
    }

    #[test]
    fn self_loop_is_a_touching_edge() {
        let set = neighborhood(&displayed(), 3);
        assert_eq!(set.nodes, BTreeSet::from([3]));
        assert_eq!(set.edges, BTreeSet::from([2]));
    }

    #[test]
    fn opacity_dims_only_outside_the_set() {
        let set = neighborhood(&displayed(), 0);
        assert_eq!(node_opacity(Some(&set), 1), FULL_OPACITY);
        assert_eq!(node_opacity(Some(&set), 2), DIMMED_OPACITY);
        assert_eq!(edge_opacity(Some(&set), 1), DIMMED_OPACITY);
        assert_eq!(node_opacity(None, 2), FULL_OPACITY);
    }
}
