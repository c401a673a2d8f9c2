use emath::{Vec2, vec2};

use super::quadtree::QuadNode;
use crate::util::golden_direction;

const MIN_DISTANCE_SQ: f32 = 1.0;

#[derive(Clone, Copy, Debug)]
pub(super) struct Link {
    pub(super) source: usize,
    pub(super) target: usize,
    pub(super) distance: f32,
    pub(super) strength: f32,
    pub(super) bias: f32,
}

fn jiggle(a: usize, b: usize) -> Vec2 {
    let (x, y) = golden_direction(a, b);
    vec2(x, y) * 1e-3
}

/// Spring toward each link's rest length. The lighter endpoint (fewer links)
/// takes the larger share of the correction.
pub(super) fn apply_links(positions: &[Vec2], velocities: &mut [Vec2], links: &[Link], alpha: f32) {
    for link in links {
        let (source, target) = (link.source, link.target);
        if source == target {
            continue;
        }

        let mut delta =
            (positions[target] + velocities[target]) - (positions[source] + velocities[source]);
        if delta.length_sq() < 1e-12 {
            delta = jiggle(source, target);
        }

        let length = delta.length();
        let scale = (length - link.distance) / length * alpha * link.strength;
        let correction = delta * scale;

        velocities[target] -= correction * link.bias;
        velocities[source] += correction * (1.0 - link.bias);
    }
}

fn charge_between(point: Vec2, other: Vec2, charge: f32, alpha: f32, a: usize, b: usize) -> Vec2 {
    let mut delta = other - point;
    if delta.length_sq() < 1e-12 {
        delta = jiggle(a, b);
    }
    let distance_sq = delta.length_sq().max(MIN_DISTANCE_SQ);
    delta * (charge * alpha / distance_sq)
}

pub(super) fn apply_charge_pairwise(
    positions: &[Vec2],
    charges: &[f32],
    velocities: &mut [Vec2],
    alpha: f32,
) {
    for index in 0..positions.len() {
        for other in 0..positions.len() {
            if other == index {
                continue;
            }
            velocities[index] += charge_between(
                positions[index],
                positions[other],
                charges[other],
                alpha,
                index,
                other,
            );
        }
    }
}

pub(super) fn accumulate_charge_for_node(
    node: &QuadNode,
    index: usize,
    positions: &[Vec2],
    charges: &[f32],
    theta: f32,
    alpha: f32,
    velocity: &mut Vec2,
) {
    if node.count == 0 || node.charge == 0.0 {
        return;
    }

    let point = positions[index];

    if node.is_leaf() {
        for &other in &node.indices {
            if other == index {
                continue;
            }
            *velocity += charge_between(point, positions[other], charges[other], alpha, index, other);
        }
        return;
    }

    let delta = node.center - point;
    let distance = delta.length().max(1.0);
    let can_approximate = !node.bounds.contains(point)
        && (node.bounds.side_length() / distance) < theta
        && node.count > 1;

    if can_approximate {
        *velocity += delta * (node.charge * alpha / (distance * distance));
        return;
    }

    for child in node.children.iter().flatten() {
        accumulate_charge_for_node(child, index, positions, charges, theta, alpha, velocity);
    }
}

pub(super) fn apply_center(positions: &[Vec2], velocities: &mut [Vec2], strength: f32, alpha: f32) {
    for (position, velocity) in positions.iter().zip(velocities.iter_mut()) {
        *velocity -= *position * (strength * alpha);
    }
}

#[derive(Clone, Copy)]
pub(super) struct CollisionParams {
    pub(super) margin: f32,
    pub(super) max_collision_distance_sq: f32,
}

pub(super) struct CollisionBodies<'a> {
    pub(super) positions: &'a [Vec2],
    pub(super) radii: &'a [f32],
    pub(super) pinned: &'a [bool],
}

/// Displacements that push one overlapping pair apart.
#[derive(Clone, Copy, Debug)]
pub(super) struct PairCorrection {
    pub(super) from: Vec2,
    pub(super) to: Vec2,
    pub(super) overlap: f32,
}

/// A pinned body takes no share; the other one moves the whole overlap.
pub(super) fn pair_correction(
    from: usize,
    to: usize,
    bodies: &CollisionBodies<'_>,
    margin: f32,
) -> Option<PairCorrection> {
    let delta = bodies.positions[from] - bodies.positions[to];
    let distance = delta.length();
    let min_distance = bodies.radii[from] + bodies.radii[to] + margin;
    if distance >= min_distance {
        return None;
    }

    let direction = if distance > 1e-4 {
        delta / distance
    } else {
        let (x, y) = golden_direction(from, to);
        vec2(x, y)
    };

    let from_share = if bodies.pinned[from] { 0.0 } else { 1.0 };
    let to_share = if bodies.pinned[to] { 0.0 } else { 1.0 };
    let total = from_share + to_share;
    if total == 0.0 {
        return None;
    }

    let overlap = min_distance - distance;
    Some(PairCorrection {
        from: direction * overlap * (from_share / total),
        to: -direction * overlap * (to_share / total),
        overlap,
    })
}

/// Dual-tree walk that only descends into cell pairs close enough to collide
/// and hands every candidate pair to `visit`.
pub(super) fn visit_collision_pairs<F: FnMut(usize, usize)>(
    node_a: &QuadNode,
    node_b: &QuadNode,
    same_node: bool,
    max_distance_sq: f32,
    visit: &mut F,
) {
    if node_a.bounds.distance_sq_to(node_b.bounds) > max_distance_sq {
        return;
    }

    if node_a.is_leaf() && node_b.is_leaf() {
        if same_node {
            for (offset, &from) in node_a.indices.iter().enumerate() {
                for &to in &node_a.indices[offset + 1..] {
                    visit(from, to);
                }
            }
        } else {
            for &from in &node_a.indices {
                for &to in &node_b.indices {
                    visit(from, to);
                }
            }
        }
        return;
    }

    if same_node {
        for first in 0..4 {
            let Some(child_a) = node_a.children[first].as_deref() else {
                continue;
            };

            visit_collision_pairs(child_a, child_a, true, max_distance_sq, visit);

            for second in (first + 1)..4 {
                let Some(child_b) = node_a.children[second].as_deref() else {
                    continue;
                };
                visit_collision_pairs(child_a, child_b, false, max_distance_sq, visit);
            }
        }
        return;
    }

    let split_a = if node_a.is_leaf() {
        false
    } else if node_b.is_leaf() {
        true
    } else {
        node_a.bounds.half_extent >= node_b.bounds.half_extent
    };

    if split_a {
        for child in node_a.children.iter().flatten() {
            visit_collision_pairs(child, node_b, false, max_distance_sq, visit);
        }
    } else {
        for child in node_b.children.iter().flatten() {
            visit_collision_pairs(node_a, child, false, max_distance_sq, visit);
        }
    }
}

/// One simultaneous projection: every overlapping pair adds its correction to
/// `corrections`, positions are untouched.
pub(super) fn accumulate_collision_pairs(
    tree: &QuadNode,
    bodies: &CollisionBodies<'_>,
    params: CollisionParams,
    corrections: &mut [Vec2],
) {
    let reach_sq = params.max_collision_distance_sq;
    visit_collision_pairs(tree, tree, true, reach_sq, &mut |from, to| {
        if let Some(correction) = pair_correction(from, to, bodies, params.margin) {
            corrections[from] += correction.from;
            corrections[to] += correction.to;
        }
    });
}
