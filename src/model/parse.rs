use std::collections::HashSet;
use std::fmt;

use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::{Cluster, DEFAULT_NODE_SIZE, Edge, GraphModel, MetaValue, Metadata, Node, Pathway, Rgb};
use crate::error::{GraphError, Result};

#[derive(Clone, Copy, Debug)]
pub struct NormalizeOptions {
    pub allow_self_loops: bool,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            allow_self_loops: true,
        }
    }
}

/// Non-fatal problems found while normalizing a payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NormalizeWarning {
    MissingNodeId { position: usize },
    InvalidNode { position: usize, reason: String },
    DuplicateNodeId { id: String },
    InvalidEdge { position: usize, reason: String },
    DanglingEdge { id: String, source: String, target: String },
    SelfLoopDropped { id: String },
    InvalidGroup { position: usize, reason: String },
}

impl fmt::Display for NormalizeWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingNodeId { position } => write!(f, "node #{position} has no id"),
            Self::InvalidNode { position, reason } => write!(f, "node #{position}: {reason}"),
            Self::DuplicateNodeId { id } => write!(f, "duplicate node id {id:?}"),
            Self::InvalidEdge { position, reason } => write!(f, "edge #{position}: {reason}"),
            Self::DanglingEdge { id, source, target } => {
                write!(f, "edge {id:?} references missing node ({source} -> {target})")
            }
            Self::SelfLoopDropped { id } => write!(f, "self-loop edge {id:?} dropped"),
            Self::InvalidGroup { position, reason } => write!(f, "group #{position}: {reason}"),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Normalized {
    pub model: GraphModel,
    pub warnings: Vec<NormalizeWarning>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
enum RawId {
    Text(String),
    Number(serde_json::Number),
    Object { id: Box<RawId> },
}

impl RawId {
    fn into_string(self) -> String {
        match self {
            Self::Text(text) => text,
            Self::Number(number) => number.to_string(),
            Self::Object { id } => id.into_string(),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
struct RawNode {
    #[serde(default)]
    id: Option<RawId>,
    #[serde(default, alias = "name")]
    label: Option<RawId>,
    #[serde(default, rename = "type", alias = "group")]
    kind: Option<RawId>,
    #[serde(default, alias = "val")]
    size: Option<Value>,
    #[serde(default)]
    color: Option<Value>,
    #[serde(default, rename = "importanceScore", alias = "importance")]
    importance_score: Option<Value>,
    #[serde(default, rename = "clusterId", alias = "cluster")]
    cluster_id: Option<RawId>,
    #[serde(default)]
    metadata: Option<Value>,
}

#[derive(Clone, Debug, Deserialize)]
struct RawEdge {
    #[serde(default)]
    id: Option<RawId>,
    source: RawId,
    target: RawId,
    #[serde(default, rename = "type")]
    kind: Option<RawId>,
    #[serde(default, alias = "value", alias = "strength")]
    weight: Option<Value>,
    #[serde(default)]
    label: Option<RawId>,
    #[serde(default)]
    metadata: Option<Value>,
}

#[derive(Clone, Debug, Deserialize)]
struct RawCluster {
    id: RawId,
    #[serde(default)]
    name: Option<String>,
    #[serde(default, rename = "centerNodeId")]
    center_node_id: Option<RawId>,
    #[serde(default, alias = "nodeIds", alias = "members")]
    nodes: Vec<RawId>,
    #[serde(default, rename = "cohesionScore", alias = "cohesion")]
    cohesion_score: Option<f64>,
    #[serde(default)]
    metrics: Option<Map<String, Value>>,
}

#[derive(Clone, Debug, Deserialize)]
struct RawPathway {
    id: RawId,
    #[serde(default)]
    name: Option<String>,
    #[serde(default, alias = "nodeIds", alias = "steps")]
    nodes: Vec<RawId>,
}

/// Metadata is opaque: an object keeps its fields, any other value is kept
/// under a single `value` key.
fn metadata_from(value: Option<&Value>) -> Metadata {
    match value {
        None | Some(Value::Null) => Metadata::new(),
        Some(Value::Object(entries)) => entries
            .iter()
            .map(|(key, value)| (key.clone(), MetaValue::from_json(value)))
            .collect(),
        Some(other) => Metadata::from([("value".to_owned(), MetaValue::from_json(other))]),
    }
}

/// Reads a number that may also arrive as a numeric string.
fn number_from(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

fn array_field<'a>(object: &'a Map<String, Value>, keys: &[&str]) -> Result<Option<&'a [Value]>> {
    for key in keys {
        match object.get(*key) {
            None | Some(Value::Null) => continue,
            Some(Value::Array(items)) => return Ok(Some(items)),
            Some(_) => {
                return Err(GraphError::MalformedDataset(format!(
                    "`{key}` must be an array"
                )));
            }
        }
    }
    Ok(None)
}

fn normalize_node(position: usize, value: &Value) -> std::result::Result<Node, NormalizeWarning> {
    if !value.is_object() {
        return Err(NormalizeWarning::InvalidNode {
            position,
            reason: "entry is not an object".to_owned(),
        });
    }

    let raw = RawNode::deserialize(value).map_err(|error| NormalizeWarning::InvalidNode {
        position,
        reason: error.to_string(),
    })?;

    let id = raw
        .id
        .map(RawId::into_string)
        .filter(|id| !id.trim().is_empty())
        .ok_or(NormalizeWarning::MissingNodeId { position })?;

    let kind = raw
        .kind
        .map(RawId::into_string)
        .filter(|kind| !kind.is_empty())
        .unwrap_or_else(|| "default".to_owned());
    let size = number_from(raw.size.as_ref())
        .map(|size| size as f32)
        .filter(|size| size.is_finite() && *size > 0.0)
        .unwrap_or(DEFAULT_NODE_SIZE);
    let importance = number_from(raw.importance_score.as_ref())
        .map(|score| score as f32)
        .filter(|score| score.is_finite())
        .map(|score| score.clamp(0.0, 1.0));
    let color = raw
        .color
        .as_ref()
        .and_then(Value::as_str)
        .and_then(Rgb::parse_hex)
        .unwrap_or_else(|| Rgb::for_type(&kind));

    Ok(Node {
        label: raw
            .label
            .map(RawId::into_string)
            .unwrap_or_else(|| id.clone()),
        id,
        kind,
        size,
        color,
        importance,
        cluster_id: raw.cluster_id.map(RawId::into_string),
        metadata: metadata_from(raw.metadata.as_ref()),
    })
}

fn normalize_edge(position: usize, value: &Value) -> std::result::Result<Edge, NormalizeWarning> {
    let raw = RawEdge::deserialize(value).map_err(|error| NormalizeWarning::InvalidEdge {
        position,
        reason: error.to_string(),
    })?;

    let source = raw.source.into_string();
    let target = raw.target.into_string();
    let id = raw
        .id
        .map(RawId::into_string)
        .unwrap_or_else(|| format!("{source}->{target}#{position}"));
    let weight = number_from(raw.weight.as_ref())
        .map(|weight| weight as f32)
        .filter(|weight| weight.is_finite())
        .map(|weight| weight.max(0.0))
        .unwrap_or(1.0);

    Ok(Edge {
        id,
        source,
        target,
        kind: raw
            .kind
            .map(RawId::into_string)
            .filter(|kind| !kind.is_empty())
            .unwrap_or_else(|| "related".to_owned()),
        weight,
        label: raw.label.map(RawId::into_string),
        metadata: metadata_from(raw.metadata.as_ref()),
    })
}

fn normalize_cluster(raw: RawCluster) -> Cluster {
    let cohesion = raw.cohesion_score.or_else(|| {
        raw.metrics
            .as_ref()
            .and_then(|metrics| metrics.get("cohesion").or_else(|| metrics.get("cohesionScore")))
            .and_then(Value::as_f64)
    });
    let id = raw.id.into_string();

    Cluster {
        name: raw.name.unwrap_or_else(|| id.clone()),
        id,
        center_node_id: raw.center_node_id.map(RawId::into_string),
        node_ids: raw.nodes.into_iter().map(RawId::into_string).collect(),
        cohesion: cohesion.map(|value| value as f32),
    }
}

fn normalize_pathway(raw: RawPathway) -> Pathway {
    let id = raw.id.into_string();
    Pathway {
        name: raw.name.unwrap_or_else(|| id.clone()),
        id,
        node_ids: raw.nodes.into_iter().map(RawId::into_string).collect(),
    }
}

/// A cluster's members are its listed ids plus every node whose `clusterId`
/// names it, listed ids first.
fn attach_cluster_members(clusters: &mut [Cluster], nodes: &[Node]) {
    for cluster in clusters {
        let mut seen = cluster.node_ids.iter().cloned().collect::<HashSet<_>>();
        for node in nodes {
            if node.cluster_id.as_deref() == Some(cluster.id.as_str()) && seen.insert(node.id.clone()) {
                cluster.node_ids.push(node.id.clone());
            }
        }
    }
}

/// Reshapes a parsed payload into the canonical model.
///
/// Bad node entries are skipped with a warning; edges whose endpoints are not
/// among the surviving nodes are dropped. Only a payload whose overall shape is
/// wrong fails, and then nothing of it is applied.
pub fn normalize(payload: &Value, options: NormalizeOptions) -> Result<Normalized> {
    let object = payload
        .as_object()
        .ok_or_else(|| GraphError::MalformedDataset("payload is not an object".to_owned()))?;

    let raw_nodes = array_field(object, &["nodes"])?
        .ok_or_else(|| GraphError::MalformedDataset("payload has no `nodes` array".to_owned()))?;
    let raw_edges = array_field(object, &["edges", "links"])?.unwrap_or_default();
    let raw_clusters = array_field(object, &["clusters"])?.unwrap_or_default();
    let raw_pathways = array_field(object, &["pathways"])?.unwrap_or_default();

    let mut warnings = Vec::new();
    let mut nodes = Vec::with_capacity(raw_nodes.len());
    let mut known_ids = HashSet::with_capacity(raw_nodes.len());

    for (position, value) in raw_nodes.iter().enumerate() {
        match normalize_node(position, value) {
            Ok(node) => {
                if known_ids.insert(node.id.clone()) {
                    nodes.push(node);
                } else {
                    warn!(id = %node.id, "dropping duplicate node id");
                    warnings.push(NormalizeWarning::DuplicateNodeId { id: node.id });
                }
            }
            Err(warning) => {
                warn!(%warning, "discarding node entry");
                warnings.push(warning);
            }
        }
    }

    let mut edges = Vec::with_capacity(raw_edges.len());
    for (position, value) in raw_edges.iter().enumerate() {
        let edge = match normalize_edge(position, value) {
            Ok(edge) => edge,
            Err(warning) => {
                warn!(%warning, "discarding edge entry");
                warnings.push(warning);
                continue;
            }
        };

        if !known_ids.contains(&edge.source) || !known_ids.contains(&edge.target) {
            debug!(id = %edge.id, source = %edge.source, target = %edge.target, "dropping dangling edge");
            warnings.push(NormalizeWarning::DanglingEdge {
                id: edge.id,
                source: edge.source,
                target: edge.target,
            });
            continue;
        }

        if edge.is_self_loop() && !options.allow_self_loops {
            debug!(id = %edge.id, "dropping self-loop");
            warnings.push(NormalizeWarning::SelfLoopDropped { id: edge.id });
            continue;
        }

        edges.push(edge);
    }

    let mut clusters = Vec::with_capacity(raw_clusters.len());
    for (position, value) in raw_clusters.iter().enumerate() {
        match RawCluster::deserialize(value) {
            Ok(raw) => clusters.push(normalize_cluster(raw)),
            Err(error) => warnings.push(NormalizeWarning::InvalidGroup {
                position,
                reason: error.to_string(),
            }),
        }
    }

    let mut pathways = Vec::with_capacity(raw_pathways.len());
    for (position, value) in raw_pathways.iter().enumerate() {
        match RawPathway::deserialize(value) {
            Ok(raw) => pathways.push(normalize_pathway(raw)),
            Err(error) => warnings.push(NormalizeWarning::InvalidGroup {
                position,
                reason: error.to_string(),
            }),
        }
    }

    attach_cluster_members(&mut clusters, &nodes);

    let metadata = metadata_from(object.get("metadata"));

    debug!(
        nodes = nodes.len(),
        edges = edges.len(),
        clusters = clusters.len(),
        pathways = pathways.len(),
        warnings = warnings.len(),
        "normalized dataset"
    );

    Ok(Normalized {
        model: GraphModel::from_parts(nodes, edges, clusters, pathways, metadata),
        warnings,
    })
}
