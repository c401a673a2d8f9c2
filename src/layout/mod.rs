//! Iterative force layout over the displayed node set.
//!
//! A [`Simulation`] is created for one displayed node/edge set and discarded
//! when that set changes. Each [`Simulation::tick`] combines link, charge,
//! center and collision contributions, integrates with velocity decay, and
//! cools `alpha` toward `alpha_target`. Ticking stops once `alpha` drops below
//! `alpha_min` and nothing is holding the temperature up.

mod forces;
mod quadtree;

use std::collections::HashMap;

use emath::{Rect, Vec2, pos2, vec2};
use tracing::{debug, info, warn};

pub use crate::config::SimulationConfig;
pub use quadtree::QuadtreeCell;

use crate::filter::DisplayedGraph;
use crate::model::GraphModel;
use crate::util::stable_pair;
use forces::{
    CollisionBodies, CollisionParams, Link, accumulate_charge_for_node,
    accumulate_collision_pairs, apply_center, apply_charge_pairwise, apply_links,
    pair_correction, visit_collision_pairs,
};
use quadtree::{QuadNode, collect_quadtree_cells};

const INITIAL_RADIUS: f32 = 10.0;
const INITIAL_JITTER: f32 = 4.0;
const SETTLE_TOLERANCE: f32 = 1e-3;
const SETTLE_MAX_ROUNDS: usize = 32;
const SETTLE_SWEEPS_PER_ROUND: usize = 16;

/// Physical description of one displayed node.
#[derive(Clone, Debug, PartialEq)]
pub struct Body {
    pub id: String,
    pub size: f32,
    pub importance: f32,
}

/// Physical description of one displayed edge; endpoints are body positions.
#[derive(Clone, Debug, PartialEq)]
pub struct Spring {
    pub source: usize,
    pub target: usize,
    pub weight: f32,
    pub kind: String,
}

pub struct Simulation {
    config: SimulationConfig,
    ids: Vec<String>,
    index_by_id: HashMap<String, usize>,
    positions: Vec<Vec2>,
    velocities: Vec<Vec2>,
    pins: Vec<Option<Vec2>>,
    radii: Vec<f32>,
    charges: Vec<f32>,
    links: Vec<Link>,
    alpha: f32,
    alpha_target: f32,
    tick_count: u64,
    corrections: Vec<Vec2>,
    pinned_mask: Vec<bool>,
}

impl Simulation {
    pub fn new(bodies: Vec<Body>, springs: &[Spring], config: SimulationConfig) -> Self {
        Self::seeded(bodies, springs, config, None)
    }

    /// Like [`Simulation::new`], but bodies whose id existed in `previous` start at
    /// their old position. Velocities and temperature are always fresh.
    pub fn seeded(
        bodies: Vec<Body>,
        springs: &[Spring],
        config: SimulationConfig,
        previous: Option<&Simulation>,
    ) -> Self {
        let config = config.sanitized();
        let count = bodies.len();

        let positions = bodies
            .iter()
            .enumerate()
            .map(|(index, body)| {
                previous
                    .and_then(|sim| sim.position_of(&body.id))
                    .unwrap_or_else(|| initial_position(index, &body.id))
            })
            .collect::<Vec<_>>();
        let radii = bodies
            .iter()
            .map(|body| config.collision_radius(body.size, body.importance))
            .collect();
        let charges = bodies
            .iter()
            .map(|body| config.charge_for(body.importance))
            .collect();

        let mut degree = vec![0usize; count];
        for spring in springs {
            if spring.source < count && spring.target < count && spring.source != spring.target {
                degree[spring.source] += 1;
                degree[spring.target] += 1;
            }
        }

        let links = springs
            .iter()
            .filter(|spring| {
                spring.source < count && spring.target < count && spring.source != spring.target
            })
            .map(|spring| {
                let source_degree = degree[spring.source] as f32;
                let target_degree = degree[spring.target] as f32;
                Link {
                    source: spring.source,
                    target: spring.target,
                    distance: config.link_distance(spring.weight),
                    strength: config.link_strength_for(&spring.kind),
                    bias: source_degree / (source_degree + target_degree),
                }
            })
            .collect();

        let ids = bodies.into_iter().map(|body| body.id).collect::<Vec<_>>();
        let index_by_id = ids
            .iter()
            .enumerate()
            .map(|(index, id)| (id.clone(), index))
            .collect();

        if count > 0 {
            info!(nodes = count, links = springs.len(), "starting layout simulation");
        }

        let mut simulation = Self {
            alpha: config.alpha,
            alpha_target: 0.0,
            config,
            ids,
            index_by_id,
            positions,
            velocities: vec![Vec2::ZERO; count],
            pins: vec![None; count],
            radii,
            charges,
            links,
            tick_count: 0,
            corrections: Vec::new(),
            pinned_mask: Vec::new(),
        };
        if !simulation.is_active() {
            simulation.settle_collisions();
        }
        simulation
    }

    /// Builds bodies and springs for a displayed subset of `model`.
    pub fn for_graph(
        model: &GraphModel,
        displayed: &DisplayedGraph,
        config: SimulationConfig,
        previous: Option<&Simulation>,
    ) -> Self {
        let bodies = displayed
            .nodes
            .iter()
            .map(|&index| {
                let node = &model.nodes[index];
                Body {
                    id: node.id.clone(),
                    size: node.size,
                    importance: node.importance_or_zero(),
                }
            })
            .collect();
        let springs = displayed
            .edges
            .iter()
            .map(|edge| {
                let record = &model.edges[edge.edge];
                Spring {
                    source: edge.source,
                    target: edge.target,
                    weight: record.weight,
                    kind: record.kind.clone(),
                }
            })
            .collect::<Vec<_>>();

        Self::seeded(bodies, &springs, config, previous)
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    pub fn alpha_target(&self) -> f32 {
        self.alpha_target
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// Whether another tick would still move anything.
    pub fn is_active(&self) -> bool {
        !self.is_empty()
            && (self.alpha >= self.config.alpha_min || self.alpha_target >= self.config.alpha_min)
    }

    pub fn is_settled(&self) -> bool {
        !self.is_active()
    }

    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.index_by_id.get(id).copied()
    }

    pub fn id(&self, index: usize) -> &str {
        &self.ids[index]
    }

    pub fn position(&self, index: usize) -> Vec2 {
        self.positions[index]
    }

    pub fn positions(&self) -> &[Vec2] {
        &self.positions
    }

    pub fn position_of(&self, id: &str) -> Option<Vec2> {
        self.index_of(id).map(|index| self.positions[index])
    }

    pub fn velocity(&self, index: usize) -> Vec2 {
        self.velocities[index]
    }

    pub fn collision_radius(&self, index: usize) -> f32 {
        self.radii[index]
    }

    pub fn is_pinned(&self, index: usize) -> bool {
        self.pins[index].is_some()
    }

    /// Fixes a body at `position`. It keeps exerting forces on the others.
    pub fn pin(&mut self, index: usize, position: Vec2) {
        if let Some(pin) = self.pins.get_mut(index) {
            *pin = Some(position);
            self.positions[index] = position;
            self.velocities[index] = Vec2::ZERO;
        }
    }

    pub fn unpin(&mut self, index: usize) {
        if let Some(pin) = self.pins.get_mut(index) {
            *pin = None;
        }
    }

    /// Holds the temperature at the configured reheat level until released.
    pub fn reheat(&mut self) {
        self.alpha_target = self.config.alpha_reheat;
    }

    /// Lets the temperature decay naturally again.
    pub fn release_heat(&mut self) {
        self.alpha_target = 0.0;
    }

    /// Restarts the cooling schedule at full temperature.
    pub fn restart(&mut self) {
        self.alpha = self.config.alpha;
    }

    /// World-space bounding box of all bodies including their radii.
    pub fn bounds(&self) -> Option<Rect> {
        bounds_of(
            self.positions
                .iter()
                .zip(&self.radii)
                .map(|(position, radius)| (*position, *radius)),
        )
    }

    /// Bounding box of a subset of bodies including their radii.
    pub fn bounds_of(&self, indices: impl IntoIterator<Item = usize>) -> Option<Rect> {
        bounds_of(
            indices
                .into_iter()
                .filter(|&index| index < self.positions.len())
                .map(|index| (self.positions[index], self.radii[index])),
        )
    }

    pub fn quadtree_cells(&self) -> Vec<QuadtreeCell> {
        let mut cells = Vec::new();
        if let Some(tree) = QuadNode::build(&self.positions, &self.charges) {
            collect_quadtree_cells(&tree, 0, &mut cells);
        }
        cells
    }

    /// Advances the layout by one tick. Returns whether it is still active.
    pub fn tick(&mut self) -> bool {
        if !self.is_active() {
            return false;
        }

        self.alpha += (self.alpha_target - self.alpha) * self.config.alpha_decay;
        let alpha = self.alpha;

        apply_links(&self.positions, &mut self.velocities, &self.links, alpha);
        self.apply_charge(alpha);
        apply_center(
            &self.positions,
            &mut self.velocities,
            self.config.center_strength,
            alpha,
        );
        self.integrate();
        self.resolve_collisions();

        self.tick_count += 1;
        let active = self.is_active();
        if !active {
            self.settle_collisions();
            debug!(ticks = self.tick_count, "layout settled");
        }
        active
    }

    /// Ticks until settled or `max_ticks` elapsed; returns the ticks performed.
    pub fn run(&mut self, max_ticks: usize) -> usize {
        let mut performed = 0;
        while performed < max_ticks && self.is_active() {
            self.tick();
            performed += 1;
        }
        performed
    }

    fn apply_charge(&mut self, alpha: f32) {
        if self.len() < self.config.barnes_hut_min_nodes {
            apply_charge_pairwise(&self.positions, &self.charges, &mut self.velocities, alpha);
            return;
        }

        let Some(tree) = QuadNode::build(&self.positions, &self.charges) else {
            return;
        };
        for (index, velocity) in self.velocities.iter_mut().enumerate() {
            accumulate_charge_for_node(
                &tree,
                index,
                &self.positions,
                &self.charges,
                self.config.barnes_hut_theta,
                alpha,
                velocity,
            );
        }
    }

    fn integrate(&mut self) {
        let keep = 1.0 - self.config.velocity_decay;
        for ((position, velocity), pin) in self
            .positions
            .iter_mut()
            .zip(self.velocities.iter_mut())
            .zip(&self.pins)
        {
            match pin {
                Some(pinned) => {
                    *position = *pinned;
                    *velocity = Vec2::ZERO;
                }
                None => {
                    *velocity *= keep;
                    *position += *velocity;
                }
            }
        }
    }

    fn collision_params(&self) -> CollisionParams {
        let max_radius = self.radii.iter().copied().fold(0.0_f32, f32::max);
        let reach = max_radius * 2.0 + self.config.collision_margin;
        CollisionParams {
            margin: self.config.collision_margin,
            max_collision_distance_sq: reach * reach,
        }
    }

    fn refresh_pinned_mask(&mut self) {
        self.pinned_mask.clear();
        self.pinned_mask.extend(self.pins.iter().map(Option::is_some));
    }

    /// A few simultaneous projections per tick; cheap, but may leave residual
    /// overlap in dense neighborhoods.
    fn resolve_collisions(&mut self) {
        let count = self.len();
        if count < 2 {
            return;
        }

        let params = self.collision_params();
        self.refresh_pinned_mask();

        for _ in 0..self.config.collision_iterations {
            let Some(tree) = QuadNode::build(&self.positions, &self.charges) else {
                return;
            };

            self.corrections.clear();
            self.corrections.resize(count, Vec2::ZERO);
            accumulate_collision_pairs(
                &tree,
                &CollisionBodies {
                    positions: &self.positions,
                    radii: &self.radii,
                    pinned: &self.pinned_mask,
                },
                params,
                &mut self.corrections,
            );

            let mut moved = false;
            for (position, correction) in self.positions.iter_mut().zip(&self.corrections) {
                if *correction != Vec2::ZERO {
                    *position += *correction;
                    moved = true;
                }
            }
            if !moved {
                break;
            }
        }
    }

    /// Sequential projections until no pair overlaps by more than
    /// `SETTLE_TOLERANCE`. Candidate pairs are collected again every round
    /// and the pass ends once a fresh candidate set is already clear.
    fn settle_collisions(&mut self) {
        if self.len() < 2 {
            return;
        }

        let params = self.collision_params();
        self.refresh_pinned_mask();
        let mut pairs = Vec::new();

        for round in 0..SETTLE_MAX_ROUNDS {
            let Some(tree) = QuadNode::build(&self.positions, &self.charges) else {
                return;
            };
            pairs.clear();
            let reach_sq = params.max_collision_distance_sq;
            visit_collision_pairs(&tree, &tree, true, reach_sq, &mut |from, to| {
                pairs.push((from, to));
            });

            for sweep in 0..SETTLE_SWEEPS_PER_ROUND {
                let mut worst = 0.0_f32;
                for &(from, to) in &pairs {
                    let bodies = CollisionBodies {
                        positions: &self.positions,
                        radii: &self.radii,
                        pinned: &self.pinned_mask,
                    };
                    if let Some(correction) = pair_correction(from, to, &bodies, params.margin) {
                        self.positions[from] += correction.from;
                        self.positions[to] += correction.to;
                        worst = worst.max(correction.overlap);
                    }
                }

                if worst <= SETTLE_TOLERANCE {
                    if sweep == 0 {
                        debug!(rounds = round + 1, "collisions settled");
                        return;
                    }
                    break;
                }
            }
        }
        warn!(rounds = SETTLE_MAX_ROUNDS, "collision settling hit its round limit");
    }
}

fn bounds_of(bodies: impl Iterator<Item = (Vec2, f32)>) -> Option<Rect> {
    let mut rect: Option<Rect> = None;
    for (center, radius) in bodies {
        let body = Rect::from_center_size(pos2(center.x, center.y), vec2(radius, radius) * 2.0);
        rect = Some(match rect {
            Some(current) => current.union(body),
            None => body,
        });
    }
    rect
}

/// Phyllotaxis spiral with a small per-id jitter.
fn initial_position(index: usize, id: &str) -> Vec2 {
    let radius = INITIAL_RADIUS * (0.5 + index as f32).sqrt();
    let angle = index as f32 * std::f32::consts::PI * (3.0 - 5.0_f32.sqrt());
    let (jx, jy) = stable_pair(id);
    vec2(radius * angle.cos(), radius * angle.sin()) + vec2(jx, jy) * INITIAL_JITTER
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(id: &str, size: f32, importance: f32) -> Body {
        Body {
            id: id.to_owned(),
            size,
            importance,
        }
    }

    fn chain(count: usize) -> (Vec<Body>, Vec<Spring>) {
        let bodies = (0..count)
            .map(|index| body(&format!("n{index}"), 8.0, 0.0))
            .collect();
        let springs = (1..count)
            .map(|index| Spring {
                source: index - 1,
                target: index,
                weight: 1.0,
                kind: "related".to_owned(),
            })
            .collect();
        (bodies, springs)
    }

    #[test]
    fn empty_simulation_never_ticks() {
        let mut sim = Simulation::new(Vec::new(), &[], SimulationConfig::default());
        assert!(sim.is_settled());
        assert!(!sim.tick());
        assert_eq!(sim.run(1_000), 0);
        assert_eq!(sim.tick_count(), 0);
    }

    #[test]
    fn settles_after_alpha_decays() {
        let (bodies, springs) = chain(6);
        let mut sim = Simulation::new(bodies, &springs, SimulationConfig::default());
        let ticks = sim.run(10_000);

        assert!(sim.is_settled());
        assert!(sim.alpha() < sim.config().alpha_min);
        assert!((295..=305).contains(&ticks), "ticks = {ticks}");
    }

    #[test]
    fn cold_simulation_starts_without_overlaps() {
        let bodies = (0..30)
            .map(|index| body(&format!("n{index}"), 12.0, 1.0))
            .collect();
        let config = SimulationConfig {
            alpha: 0.0,
            ..SimulationConfig::default()
        };
        let sim = Simulation::new(bodies, &[], config);
        assert!(sim.is_settled());

        for a in 0..sim.len() {
            for b in (a + 1)..sim.len() {
                let distance = (sim.position(a) - sim.position(b)).length();
                let needed = sim.collision_radius(a) + sim.collision_radius(b);
                assert!(distance + 1e-2 >= needed, "{a} and {b}: {distance} < {needed}");
            }
        }
    }

    #[test]
    fn linked_nodes_end_closer_than_unlinked_ones() {
        let (bodies, springs) = chain(5);
        let mut sim = Simulation::new(bodies, &springs, SimulationConfig::default());
        sim.run(10_000);

        let linked = (sim.position(0) - sim.position(1)).length();
        let far = (sim.position(0) - sim.position(4)).length();
        assert!(linked < far);
    }

    #[test]
    fn reheat_keeps_ticking_until_released() {
        let (bodies, springs) = chain(3);
        let mut sim = Simulation::new(bodies, &springs, SimulationConfig::default());
        sim.run(10_000);
        assert!(sim.is_settled());

        sim.reheat();
        assert!(sim.is_active());
        for _ in 0..500 {
            assert!(sim.tick());
        }
        assert!(sim.alpha() > 0.25);

        sim.release_heat();
        sim.run(10_000);
        assert!(sim.is_settled());
    }

    #[test]
    fn pinned_body_stays_put() {
        let (bodies, springs) = chain(4);
        let mut sim = Simulation::new(bodies, &springs, SimulationConfig::default());
        let anchor = vec2(300.0, -120.0);
        sim.pin(2, anchor);

        for _ in 0..50 {
            sim.tick();
            assert_eq!(sim.position(2), anchor);
        }

        sim.unpin(2);
        sim.tick();
        assert!(!sim.is_pinned(2));
        assert_ne!(sim.position(2), anchor);
    }

    #[test]
    fn seeded_simulation_reuses_known_positions() {
        let (bodies, springs) = chain(4);
        let mut first = Simulation::new(bodies, &springs, SimulationConfig::default());
        first.run(50);
        let known = first.position_of("n2").unwrap();

        let next = Simulation::seeded(
            vec![body("n2", 8.0, 0.0), body("fresh", 8.0, 0.0)],
            &[],
            SimulationConfig::default(),
            Some(&first),
        );
        assert_eq!(next.position(0), known);
        assert_eq!(next.alpha(), 1.0);
        assert_eq!(next.velocity(0), Vec2::ZERO);
    }

    #[test]
    fn barnes_hut_path_still_separates_bodies() {
        let bodies = (0..60)
            .map(|index| body(&format!("b{index}"), 5.0, (index % 3) as f32 * 0.5))
            .collect::<Vec<_>>();
        let config = SimulationConfig {
            barnes_hut_min_nodes: 10,
            ..SimulationConfig::default()
        };
        let mut sim = Simulation::new(bodies, &[], config);
        sim.run(10_000);

        for a in 0..sim.len() {
            for b in (a + 1)..sim.len() {
                let distance = (sim.position(a) - sim.position(b)).length();
                let needed = sim.collision_radius(a) + sim.collision_radius(b);
                assert!(distance + 1e-2 >= needed, "{a} and {b} overlap");
            }
        }
        assert!(!sim.quadtree_cells().is_empty());
    }

    #[test]
    fn initial_placement_is_deterministic() {
        let (bodies, springs) = chain(8);
        let a = Simulation::new(bodies.clone(), &springs, SimulationConfig::default());
        let b = Simulation::new(bodies, &springs, SimulationConfig::default());
        assert_eq!(a.positions(), b.positions());
    }
}
