//! Adventure-map pathfinding: Dijkstra over the tile grid with the game's
//! movement rules. Two variants exist: the strict one follows the rules as the
//! human player experiences them, the AI one additionally reasons about
//! guarded tiles and movement spells.

mod ai;
mod player;

pub use ai::{AiPathfinderStateGuard, AiWorldPathfinder};
pub use player::PlayerWorldPathfinder;

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use ravenmoor_core::skill::{pathfinding_penalty_reduction, SkillLevel};

use crate::direction::Direction;
use crate::object::MapObjectKind;
use crate::tile::Ground;
use crate::world::World;

/// Minimum army-strength advantages required before the AI pathfinder treats a
/// guarded tile as passable.
pub const ARMY_ADVANTAGE_DESPERATE: f64 = 0.8;
pub const ARMY_ADVANTAGE_SMALL: f64 = 1.3;
pub const ARMY_ADVANTAGE_MEDIUM: f64 = 1.5;
pub const ARMY_ADVANTAGE_LARGE: f64 = 1.8;

/// Sentinel for unreachable tiles.
pub const UNREACHABLE: u32 = u32::MAX;

/// One explored tile of a pathfinder evaluation.
#[derive(Debug, Clone, Copy)]
pub struct WorldNode {
    pub from: i32,
    pub cost: u32,
    pub object: MapObjectKind,
    /// Movement points the hero still has after arriving here.
    pub remaining_move_points: u32,
}

impl WorldNode {
    pub fn unexplored() -> Self {
        WorldNode { from: -1, cost: UNREACHABLE, object: MapObjectKind::None, remaining_move_points: 0 }
    }

    pub fn is_reached(&self) -> bool {
        self.cost != UNREACHABLE
    }
}

/// One step of a built path. A step whose cells are not adjacent is a castle
/// teleport (Town Gate or Town Portal) and costs the spell on execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PathStep {
    pub from: i32,
    pub index: i32,
    pub direction: Direction,
    pub penalty: u32,
}

impl PathStep {
    pub fn is_castle_teleport(&self, world: &World) -> bool {
        world.approximate_distance(self.from, self.index) > 1
    }
}

pub fn path_penalty(path: &[PathStep]) -> u32 {
    path.iter().map(|step| step.penalty).sum()
}

/// Min-heap entry; ties broken by tile index to keep evaluation deterministic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FrontierEntry {
    cost: u32,
    index: i32,
}

impl Ord for FrontierEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        other.cost.cmp(&self.cost).then_with(|| other.index.cmp(&self.index))
    }
}

impl PartialOrd for FrontierEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

pub(crate) struct Frontier {
    heap: BinaryHeap<FrontierEntry>,
}

impl Frontier {
    pub fn new() -> Self {
        Frontier { heap: BinaryHeap::new() }
    }

    pub fn push(&mut self, index: i32, cost: u32) {
        self.heap.push(FrontierEntry { cost, index });
    }

    pub fn pop(&mut self) -> Option<(i32, u32)> {
        self.heap.pop().map(|entry| (entry.index, entry.cost))
    }
}

/// Movement cost of one step, with the "last move" rule: when the hero still
/// has movement points but fewer than the step needs, the step costs exactly
/// what is left. A hero with an empty budget starts a fresh day first.
///
/// Returns the charged cost and the movement points remaining after the step.
pub(crate) fn movement_penalty(
    world: &World,
    to: i32,
    direction: Direction,
    pathfinding: SkillLevel,
    remaining: u32,
    max_move_points: u32,
) -> (u32, u32) {
    let ground = world.tile(to).ground;

    let reduction = pathfinding_penalty_reduction(pathfinding);
    let extra = ground.penalty().saturating_sub(Ground::FASTEST_PENALTY);
    let mut penalty = Ground::FASTEST_PENALTY + (extra as f64 * (1.0 - reduction)) as u32;

    if direction.is_diagonal() {
        penalty = penalty * 7 / 5;
    }

    if remaining >= penalty {
        return (penalty, remaining - penalty);
    }
    if remaining > 0 {
        // Last move of the day.
        return (remaining, 0);
    }
    // A new day begins before this step.
    (penalty, max_move_points.saturating_sub(penalty))
}

/// Whether terrain and passability masks allow a step, ignoring armies and
/// objects. Water transitions are resolved by the caller since the boat rules
/// differ between the two variants.
pub(crate) fn is_step_allowed(world: &World, from: i32, direction: Direction) -> Option<i32> {
    let to = world.direction_index(from, direction)?;

    let from_tile = world.tile(from);
    let to_tile = world.tile(to);

    if !from_tile.allows_direction(direction) || !to_tile.allows_direction(direction.reflect()) {
        return None;
    }
    if to_tile.is_blocked() {
        return None;
    }

    Some(to)
}

/// Reconstructs the step list from the came-from chain of a node cache.
pub(crate) fn build_path_from_cache(world: &World, cache: &[WorldNode], start: i32, target: i32) -> Vec<PathStep> {
    if target < 0 || target as usize >= cache.len() || !cache[target as usize].is_reached() || target == start {
        return Vec::new();
    }

    let mut steps = Vec::new();
    let mut current = target;

    while current != start {
        let node = &cache[current as usize];
        if node.from < 0 {
            // Broken chain; treat the target as unreachable.
            return Vec::new();
        }

        let direction = Direction::ALL
            .iter()
            .copied()
            .find(|&dir| world.direction_index(node.from, dir) == Some(current));

        let penalty = node.cost - cache[node.from as usize].cost;
        match direction {
            Some(direction) => steps.push(PathStep { from: node.from, index: current, direction, penalty }),
            None => {
                // A castle teleport edge; only ever attached to the start.
                debug_assert_eq!(node.from, start);
                steps.push(PathStep { from: node.from, index: current, direction: Direction::Top, penalty });
            }
        }
        current = node.from;
    }

    steps.reverse();
    steps
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tile::Tile;

    fn flat_world(width: i32, height: i32) -> World {
        let tiles = (0..width * height).map(|index| Tile::new(index, Ground::Grass)).collect();
        World::new(width, height, tiles, 1)
    }

    #[test]
    fn last_move_rule_charges_what_is_left() {
        let world = flat_world(3, 3);
        let (cost, remaining) = movement_penalty(&world, 1, Direction::Right, SkillLevel::None, 40, 1500);
        assert_eq!(cost, 40);
        assert_eq!(remaining, 0);
    }

    #[test]
    fn empty_budget_starts_a_new_day() {
        let world = flat_world(3, 3);
        let (cost, remaining) = movement_penalty(&world, 1, Direction::Right, SkillLevel::None, 0, 1500);
        assert_eq!(cost, 100);
        assert_eq!(remaining, 1400);
    }

    #[test]
    fn diagonal_steps_cost_more() {
        let world = flat_world(3, 3);
        let (straight, _) = movement_penalty(&world, 1, Direction::Right, SkillLevel::None, 1500, 1500);
        let (diagonal, _) = movement_penalty(&world, 4, Direction::BottomRight, SkillLevel::None, 1500, 1500);
        assert!(diagonal > straight);
    }

    #[test]
    fn pathfinding_skill_reduces_rough_terrain_only() {
        let mut world = flat_world(3, 3);
        world.tile_mut(1).ground = Ground::Desert;

        let (novice, _) = movement_penalty(&world, 1, Direction::Right, SkillLevel::None, 1500, 1500);
        let (expert, _) = movement_penalty(&world, 1, Direction::Right, SkillLevel::Expert, 1500, 1500);
        assert!(expert < novice);
        assert_eq!(expert, Ground::FASTEST_PENALTY);
    }
}
