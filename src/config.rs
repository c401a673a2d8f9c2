use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::filter::{TypeFilter, ViewFilter};

/// Tunables of the force simulation. Defaults follow d3-force.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SimulationConfig {
    pub link_base_distance: f32,
    pub link_distance_scale: f32,
    pub link_strength: f32,
    pub link_strength_by_type: BTreeMap<String, f32>,
    pub charge_strength: f32,
    pub importance_charge_boost: f32,
    pub center_strength: f32,
    pub collision_margin: f32,
    pub collision_importance_scale: f32,
    pub collision_iterations: usize,
    pub alpha: f32,
    pub alpha_min: f32,
    pub alpha_decay: f32,
    pub alpha_reheat: f32,
    pub velocity_decay: f32,
    pub barnes_hut_theta: f32,
    pub barnes_hut_min_nodes: usize,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        let alpha_min = 0.001_f32;
        Self {
            link_base_distance: 50.0,
            link_distance_scale: 30.0,
            link_strength: 0.3,
            link_strength_by_type: BTreeMap::from([("pathway".to_owned(), 0.8)]),
            charge_strength: -200.0,
            importance_charge_boost: 2.0,
            center_strength: 0.05,
            collision_margin: 2.0,
            collision_importance_scale: 0.5,
            collision_iterations: 3,
            alpha: 1.0,
            alpha_min,
            alpha_decay: 1.0 - alpha_min.powf(1.0 / 300.0),
            alpha_reheat: 0.3,
            velocity_decay: 0.4,
            barnes_hut_theta: 0.72,
            barnes_hut_min_nodes: 200,
        }
    }
}

impl SimulationConfig {
    pub fn link_distance(&self, weight: f32) -> f32 {
        self.link_base_distance + weight.max(0.0) * self.link_distance_scale
    }

    pub fn link_strength_for(&self, kind: &str) -> f32 {
        self.link_strength_by_type
            .get(kind)
            .copied()
            .unwrap_or(self.link_strength)
    }

    pub fn charge_for(&self, importance: f32) -> f32 {
        self.charge_strength * (1.0 + importance.clamp(0.0, 1.0) * self.importance_charge_boost)
    }

    pub fn collision_radius(&self, size: f32, importance: f32) -> f32 {
        size * (1.0 + importance.clamp(0.0, 1.0) * self.collision_importance_scale)
    }

    /// Clamps values that would make the integration diverge or never settle.
    pub fn sanitized(mut self) -> Self {
        self.alpha = self.alpha.clamp(0.0, 1.0);
        self.alpha_min = self.alpha_min.clamp(1e-6, 0.5);
        self.alpha_decay = self.alpha_decay.clamp(1e-4, 1.0);
        self.alpha_reheat = self.alpha_reheat.clamp(0.0, 1.0);
        self.velocity_decay = self.velocity_decay.clamp(0.0, 1.0);
        self.barnes_hut_theta = self.barnes_hut_theta.clamp(0.1, 2.0);
        self.collision_margin = self.collision_margin.max(0.0);
        self
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ColorMode {
    #[default]
    Type,
    Importance,
}

/// The host-facing configuration surface of one graph view.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GraphViewConfig {
    pub max_nodes: Option<usize>,
    pub node_type_filter: String,
    pub search_term: String,
    pub show_pathways: bool,
    pub active_cluster_id: Option<String>,
    pub active_pathway_id: Option<String>,
    pub width: f32,
    pub height: f32,
    pub searchable_metadata: Vec<String>,
    pub hover_fields: Vec<String>,
    pub zoom_range: [f32; 2],
    pub allow_self_loops: bool,
    pub color_by: ColorMode,
    pub physics: SimulationConfig,
}

impl Default for GraphViewConfig {
    fn default() -> Self {
        Self {
            max_nodes: Some(200),
            node_type_filter: "all".to_owned(),
            search_term: String::new(),
            show_pathways: false,
            active_cluster_id: None,
            active_pathway_id: None,
            width: 960.0,
            height: 640.0,
            searchable_metadata: Vec::new(),
            hover_fields: Vec::new(),
            zoom_range: [0.1, 10.0],
            allow_self_loops: true,
            color_by: ColorMode::Type,
            physics: SimulationConfig::default(),
        }
    }
}

impl GraphViewConfig {
    pub fn from_json_str(raw: &str) -> serde_json::Result<Self> {
        serde_json::from_str(raw)
    }

    pub fn initial_filter(&self) -> ViewFilter {
        ViewFilter {
            search: self.search_term.clone(),
            types: TypeFilter::parse(&self.node_type_filter),
            max_nodes: self.max_nodes,
            cluster_id: self.active_cluster_id.clone(),
            pathway_id: self.active_pathway_id.clone(),
            searchable_metadata: self.searchable_metadata.clone(),
        }
    }

    pub fn zoom_limits(&self) -> (f32, f32) {
        let [low, high] = self.zoom_range;
        let low = low.max(0.01);
        (low, high.max(low))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let config = GraphViewConfig::from_json_str(
            r#"{"maxNodes": 50, "nodeTypeFilter": "person,project", "physics": {"chargeStrength": -120}}"#,
        )
        .unwrap();

        assert_eq!(config.max_nodes, Some(50));
        assert_eq!(config.width, 960.0);
        assert_eq!(config.physics.charge_strength, -120.0);
        assert_eq!(config.physics.link_base_distance, 50.0);
        assert_eq!(
            config.initial_filter().types,
            TypeFilter::parse("person, project")
        );
    }

    #[test]
    fn pathway_links_pull_harder_than_generic_ones() {
        let physics = SimulationConfig::default();
        assert_eq!(physics.link_strength_for("pathway"), 0.8);
        assert_eq!(physics.link_strength_for("reference"), 0.3);
        assert_eq!(physics.link_distance(2.0), 110.0);
    }

    #[test]
    fn important_nodes_repel_harder() {
        let physics = SimulationConfig::default();
        assert!(physics.charge_for(1.0) < physics.charge_for(0.0));
        assert!(physics.collision_radius(10.0, 1.0) > physics.collision_radius(10.0, 0.0));
    }

    #[test]
    fn default_decay_settles_in_about_three_hundred_ticks() {
        let physics = SimulationConfig::default();
        let ticks = (physics.alpha_min.ln() / (1.0 - physics.alpha_decay).ln()).round();
        assert_eq!(ticks, 300.0);
    }
}
