use ravenmoor_core::hero::Hero;
use ravenmoor_core::skill::{SkillKind, SkillLevel};
use ravenmoor_core::spell::Spell;

use super::{
    build_path_from_cache, is_step_allowed, movement_penalty, Frontier, PathStep, WorldNode, UNREACHABLE,
};
use crate::direction::Direction;
use crate::object::MapObjectKind;
use crate::world::World;

/// Pathfinder following the strict passability rules the human player plays
/// by. Action objects end a path; guarded tiles are destinations, never
/// corridors. The only extension is the Summon Boat shortcut onto open water.
pub struct PlayerWorldPathfinder {
    cache: Vec<WorldNode>,
    path_start: i32,
    color: ravenmoor_core::color::PlayerColor,
    remaining_move_points: u32,
    max_move_points: u32,
    pathfinding_skill: SkillLevel,
    summon_boat_available: bool,
}

impl Default for PlayerWorldPathfinder {
    fn default() -> Self {
        Self::new()
    }
}

impl PlayerWorldPathfinder {
    pub fn new() -> Self {
        PlayerWorldPathfinder {
            cache: Vec::new(),
            path_start: -1,
            color: ravenmoor_core::color::PlayerColor::None,
            remaining_move_points: 0,
            max_move_points: 0,
            pathfinding_skill: SkillLevel::None,
            summon_boat_available: false,
        }
    }

    pub fn reset(&mut self) {
        self.cache.clear();
        self.path_start = -1;
    }

    /// Re-runs the evaluation when any cached hero property changed.
    pub fn re_evaluate_if_needed(&mut self, world: &World, hero: &Hero) {
        let summon_boat = hero.can_cast_spell(Spell::SummonBoat);
        let unchanged = self.path_start == hero.position
            && self.color == hero.color
            && self.remaining_move_points == hero.move_points
            && self.max_move_points == hero.max_move_points()
            && self.pathfinding_skill == hero.skill_level(SkillKind::Pathfinding)
            && self.summon_boat_available == summon_boat
            && !self.cache.is_empty();
        if unchanged {
            return;
        }

        self.path_start = hero.position;
        self.color = hero.color;
        self.remaining_move_points = hero.move_points;
        self.max_move_points = hero.max_move_points();
        self.pathfinding_skill = hero.skill_level(SkillKind::Pathfinding);
        self.summon_boat_available = summon_boat;

        self.process_world_map(world);
    }

    pub fn get_distance(&self, target: i32) -> u32 {
        self.cache
            .get(target as usize)
            .filter(|node| node.is_reached())
            .map(|node| node.cost)
            .unwrap_or(UNREACHABLE)
    }

    pub fn reachable(&self, target: i32) -> bool {
        self.get_distance(target) != UNREACHABLE
    }

    /// Builds a path to the target; empty when unreachable.
    pub fn build_path(&self, world: &World, target: i32) -> Vec<PathStep> {
        build_path_from_cache(world, &self.cache, self.path_start, target)
    }

    fn process_world_map(&mut self, world: &World) {
        self.cache = vec![WorldNode::unexplored(); world.size() as usize];
        let start = self.path_start;
        self.cache[start as usize] = WorldNode {
            from: -1,
            cost: 0,
            object: world.tile(start).object_kind(true),
            remaining_move_points: self.remaining_move_points,
        };

        let mut frontier = Frontier::new();
        frontier.push(start, 0);

        while let Some((current, cost)) = frontier.pop() {
            if cost > self.cache[current as usize].cost {
                continue;
            }

            // Paths do not continue through action objects or guarded tiles.
            if current != start {
                let tile = world.tile(current);
                if tile.object_kind(false).is_action_object() || tile.is_guarded() {
                    continue;
                }
            }

            for direction in Direction::ALL {
                let Some(next) = is_step_allowed(world, current, direction) else {
                    continue;
                };
                if !self.is_water_step_allowed(world, current, next) {
                    continue;
                }

                let node = self.cache[current as usize];
                let (penalty, remaining) = movement_penalty(
                    world,
                    next,
                    direction,
                    self.pathfinding_skill,
                    node.remaining_move_points,
                    self.max_move_points,
                );
                let next_cost = node.cost + penalty;

                if next_cost < self.cache[next as usize].cost {
                    self.cache[next as usize] = WorldNode {
                        from: current,
                        cost: next_cost,
                        object: world.tile(next).object_kind(false),
                        remaining_move_points: remaining,
                    };
                    frontier.push(next, next_cost);
                }
            }
        }
    }

    fn is_water_step_allowed(&self, world: &World, from: i32, to: i32) -> bool {
        let from_water = world.tile(from).is_water();
        let to_water = world.tile(to).is_water();

        if from_water == to_water {
            return true;
        }
        if from_water {
            // Disembarking is always possible.
            return true;
        }

        // Boarding requires a boat, or a boat summoned onto open water.
        let to_tile = world.tile(to);
        if to_tile.object_kind(true) == MapObjectKind::Boat {
            return true;
        }
        self.summon_boat_available
            && to_tile.object.is_none()
            && self.remaining_move_points >= Spell::SummonBoat.cost()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::MapObject;
    use crate::tile::{Ground, Tile};
    use ravenmoor_core::color::PlayerColor;
    use ravenmoor_core::hero::HeroId;

    fn world_with_hero(width: i32, height: i32) -> (World, Hero) {
        let tiles = (0..width * height).map(|index| Tile::new(index, Ground::Grass)).collect();
        let world = World::new(width, height, tiles, 1);
        let hero = Hero::new(HeroId(0), "Mira", PlayerColor::Blue, 0);
        (world, hero)
    }

    #[test]
    fn straight_line_distance() {
        let (world, hero) = world_with_hero(5, 1);
        let mut pathfinder = PlayerWorldPathfinder::new();
        pathfinder.re_evaluate_if_needed(&world, &hero);

        assert_eq!(pathfinder.get_distance(4), 400);
        let path = pathfinder.build_path(&world, 4);
        assert_eq!(path.len(), 4);
        assert_eq!(path.last().unwrap().index, 4);
    }

    #[test]
    fn action_objects_end_the_path() {
        let (mut world, hero) = world_with_hero(5, 1);
        world.tile_mut(2).object = Some(MapObject::new(MapObjectKind::TreasureChest));

        let mut pathfinder = PlayerWorldPathfinder::new();
        pathfinder.re_evaluate_if_needed(&world, &hero);

        assert!(pathfinder.reachable(2));
        assert!(!pathfinder.reachable(3));
    }

    #[test]
    fn water_blocks_without_a_boat() {
        let (mut world, hero) = world_with_hero(5, 1);
        world.tile_mut(2).ground = Ground::Water;

        let mut pathfinder = PlayerWorldPathfinder::new();
        pathfinder.re_evaluate_if_needed(&world, &hero);
        assert!(!pathfinder.reachable(3));

        let mut world_with_boat = world.clone();
        world_with_boat.tile_mut(2).object = Some(MapObject::new(MapObjectKind::Boat));
        let mut pathfinder = PlayerWorldPathfinder::new();
        pathfinder.re_evaluate_if_needed(&world_with_boat, &hero);
        assert!(pathfinder.reachable(2));
    }
}
