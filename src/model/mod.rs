mod parse;

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use fuzzy_matcher::FuzzyMatcher;
use fuzzy_matcher::skim::SkimMatcherV2;
use serde_json::Value;

pub use parse::{NormalizeOptions, NormalizeWarning, Normalized, normalize};

use crate::error::Result;

pub const DEFAULT_NODE_SIZE: f32 = 8.0;

const TYPE_PALETTE: [Rgb; 10] = [
    Rgb::new(0x1f, 0x77, 0xb4),
    Rgb::new(0xff, 0x7f, 0x0e),
    Rgb::new(0x2c, 0xa0, 0x2c),
    Rgb::new(0xd6, 0x27, 0x28),
    Rgb::new(0x94, 0x67, 0xbd),
    Rgb::new(0x8c, 0x56, 0x4b),
    Rgb::new(0xe3, 0x77, 0xc2),
    Rgb::new(0x7f, 0x7f, 0x7f),
    Rgb::new(0xbc, 0xbd, 0x22),
    Rgb::new(0x17, 0xbe, 0xcf),
];

/// Opaque display data attached to nodes and edges.
#[derive(Clone, Debug, PartialEq)]
pub enum MetaValue {
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
    List(Vec<MetaValue>),
    Map(BTreeMap<String, MetaValue>),
}

pub type Metadata = BTreeMap<String, MetaValue>;

impl MetaValue {
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(flag) => Self::Bool(*flag),
            Value::Number(number) => Self::Number(number.as_f64().unwrap_or_default()),
            Value::String(text) => Self::Text(text.clone()),
            Value::Array(items) => Self::List(items.iter().map(Self::from_json).collect()),
            Value::Object(entries) => Self::Map(
                entries
                    .iter()
                    .map(|(key, value)| (key.clone(), Self::from_json(value)))
                    .collect(),
            ),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(value) => Some(*value),
            _ => None,
        }
    }
}

impl fmt::Display for MetaValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Bool(flag) => write!(f, "{flag}"),
            Self::Number(value) if value.fract() == 0.0 && value.abs() < 1e15 => {
                write!(f, "{}", *value as i64)
            }
            Self::Number(value) => write!(f, "{value:.3}"),
            Self::Text(text) => f.write_str(text),
            Self::List(items) => {
                let parts = items.iter().map(ToString::to_string).collect::<Vec<_>>();
                write!(f, "[{}]", parts.join(", "))
            }
            Self::Map(entries) => write!(f, "{{{} fields}}", entries.len()),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Accepts `#rrggbb` and `#rgb`.
    pub fn parse_hex(text: &str) -> Option<Self> {
        let hex = text.trim().strip_prefix('#')?;
        if !hex.bytes().all(|byte| byte.is_ascii_hexdigit()) {
            return None;
        }
        let channel = |digits: &str| u8::from_str_radix(digits, 16).ok();
        match hex.len() {
            6 => Some(Self::new(
                channel(&hex[0..2])?,
                channel(&hex[2..4])?,
                channel(&hex[4..6])?,
            )),
            3 => {
                let expand = |index: usize| channel(&hex[index..index + 1]).map(|v| v * 17);
                Some(Self::new(expand(0)?, expand(1)?, expand(2)?))
            }
            _ => None,
        }
    }

    pub fn for_type(kind: &str) -> Self {
        let hash = kind
            .bytes()
            .fold(0usize, |acc, byte| acc.wrapping_mul(31).wrapping_add(byte as usize));
        TYPE_PALETTE[hash % TYPE_PALETTE.len()]
    }

    /// Blue (low) to orange-red (high) ramp for a score in `[0, 1]`.
    pub fn for_score(score: f32) -> Self {
        let t = score.clamp(0.0, 1.0);
        Self::new(
            (55.0 + (190.0 * t)) as u8,
            (150.0 - (70.0 * t)) as u8,
            (215.0 - (155.0 * t)) as u8,
        )
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Node {
    pub id: String,
    pub label: String,
    pub kind: String,
    pub size: f32,
    pub color: Rgb,
    pub importance: Option<f32>,
    pub cluster_id: Option<String>,
    pub metadata: Metadata,
}

impl Node {
    pub fn importance_or_zero(&self) -> f32 {
        self.importance.unwrap_or(0.0)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Edge {
    pub id: String,
    pub source: String,
    pub target: String,
    pub kind: String,
    pub weight: f32,
    pub label: Option<String>,
    pub metadata: Metadata,
}

impl Edge {
    pub fn is_self_loop(&self) -> bool {
        self.source == self.target
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Cluster {
    pub id: String,
    pub name: String,
    pub center_node_id: Option<String>,
    pub node_ids: Vec<String>,
    pub cohesion: Option<f32>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Pathway {
    pub id: String,
    pub name: String,
    pub node_ids: Vec<String>,
}

/// Canonical node/edge model; replaced wholesale on every successful load.
#[derive(Clone, Debug, Default)]
pub struct GraphModel {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    pub clusters: Vec<Cluster>,
    pub pathways: Vec<Pathway>,
    pub metadata: Metadata,
    index_by_id: HashMap<String, usize>,
    endpoints: Vec<(usize, usize)>,
}

impl GraphModel {
    /// Builds a model from parts that already satisfy the id and endpoint invariants.
    /// Edges with unknown endpoints are skipped.
    pub fn from_parts(
        nodes: Vec<Node>,
        edges: Vec<Edge>,
        clusters: Vec<Cluster>,
        pathways: Vec<Pathway>,
        metadata: Metadata,
    ) -> Self {
        let mut index_by_id = HashMap::with_capacity(nodes.len());
        for (index, node) in nodes.iter().enumerate() {
            index_by_id.entry(node.id.clone()).or_insert(index);
        }

        let mut kept_edges = Vec::with_capacity(edges.len());
        let mut endpoints = Vec::with_capacity(edges.len());
        for edge in edges {
            if let (Some(&source), Some(&target)) =
                (index_by_id.get(&edge.source), index_by_id.get(&edge.target))
            {
                endpoints.push((source, target));
                kept_edges.push(edge);
            }
        }

        Self {
            nodes,
            edges: kept_edges,
            clusters,
            pathways,
            metadata,
            index_by_id,
            endpoints,
        }
    }

    pub fn from_json_str(raw: &str, options: NormalizeOptions) -> Result<Normalized> {
        let value: Value = serde_json::from_str(raw).map_err(|error| {
            crate::error::GraphError::MalformedDataset(format!("invalid JSON: {error}"))
        })?;
        normalize(&value, options)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.index_by_id.get(id).copied()
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.index_of(id).map(|index| &self.nodes[index])
    }

    /// Node indices of an edge's `(source, target)`.
    pub fn endpoints(&self, edge_index: usize) -> (usize, usize) {
        self.endpoints[edge_index]
    }

    pub fn cluster(&self, id: &str) -> Option<&Cluster> {
        self.clusters.iter().find(|cluster| cluster.id == id)
    }

    pub fn pathway(&self, id: &str) -> Option<&Pathway> {
        self.pathways.iter().find(|pathway| pathway.id == id)
    }

    /// Distinct node types in first-seen order.
    pub fn node_types(&self) -> Vec<&str> {
        let mut seen = Vec::new();
        for node in &self.nodes {
            if !seen.contains(&node.kind.as_str()) {
                seen.push(node.kind.as_str());
            }
        }
        seen
    }

    /// Ranks node labels against `query` with skim-style fuzzy matching.
    pub fn fuzzy_find(&self, query: &str, limit: usize) -> Vec<usize> {
        let query = query.trim();
        if query.is_empty() || limit == 0 {
            return Vec::new();
        }

        let matcher = SkimMatcherV2::default().ignore_case();
        let mut scored = self
            .nodes
            .iter()
            .enumerate()
            .filter_map(|(index, node)| {
                let label_score = matcher.fuzzy_match(&node.label, query);
                let id_score = matcher.fuzzy_match(&node.id, query);
                label_score.max(id_score).map(|score| (score, index))
            })
            .collect::<Vec<_>>();

        scored.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(&b.1)));
        scored.truncate(limit);
        scored.into_iter().map(|(_, index)| index).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: &str, label: &str) -> Node {
        Node {
            id: id.to_owned(),
            label: label.to_owned(),
            kind: "service".to_owned(),
            size: DEFAULT_NODE_SIZE,
            color: Rgb::for_type("service"),
            importance: None,
            cluster_id: None,
            metadata: Metadata::new(),
        }
    }

    #[test]
    fn parse_hex_accepts_short_and_long_forms() {
        assert_eq!(Rgb::parse_hex("#ff8000"), Some(Rgb::new(255, 128, 0)));
        assert_eq!(Rgb::parse_hex("#0f0"), Some(Rgb::new(0, 255, 0)));
        assert_eq!(Rgb::parse_hex("orange"), None);
        assert_eq!(Rgb::parse_hex("#12345"), None);
        assert_eq!(Rgb::parse_hex("#€€"), None);
        assert_eq!(Rgb::parse_hex("#€"), None);
        assert_eq!(Rgb::parse_hex("#+f+f+f"), None);
    }

    #[test]
    fn type_colors_are_stable() {
        assert_eq!(Rgb::for_type("person"), Rgb::for_type("person"));
    }

    #[test]
    fn fuzzy_find_ranks_close_labels_first() {
        let model = GraphModel::from_parts(
            vec![
                node("a", "Auth Service"),
                node("b", "Billing"),
                node("c", "Authorization Flow"),
            ],
            Vec::new(),
            Vec::new(),
            Vec::new(),
            Metadata::new(),
        );

        let found = model.fuzzy_find("auth", 5);
        assert!(found.contains(&0));
        assert!(found.contains(&2));
        assert!(!found.contains(&1));
        assert!(model.fuzzy_find("   ", 5).is_empty());
    }

    #[test]
    fn meta_value_display_is_compact() {
        assert_eq!(MetaValue::Number(3.0).to_string(), "3");
        assert_eq!(MetaValue::Number(0.25).to_string(), "0.250");
        assert_eq!(
            MetaValue::List(vec![MetaValue::Text("x".into()), MetaValue::Bool(true)]).to_string(),
            "[x, true]"
        );
    }
}
