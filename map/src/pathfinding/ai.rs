use std::ops::{Deref, DerefMut};

use ravenmoor_core::color::PlayerColor;
use ravenmoor_core::hero::Hero;
use ravenmoor_core::skill::{SkillKind, SkillLevel};
use ravenmoor_core::spell::Spell;
use tracing::trace;

use super::{
    build_path_from_cache, is_step_allowed, movement_penalty, Frontier, PathStep, WorldNode, UNREACHABLE,
};
use crate::direction::Direction;
use crate::object::MapObjectKind;
use crate::world::{World, HERO_SCOUT_RADIUS};

/// Upper bound on Dimension Door casts per hero per day.
const DIMENSION_DOOR_DAILY_LIMIT: u32 = 10;

/// Pathfinder variant for AI-controlled heroes. Unlike the strict variant it
/// treats guarded tiles as corridors when the army is strong enough, and it
/// knows about the movement spells (Summon Boat, Dimension Door, Town Gate and
/// Town Portal).
pub struct AiWorldPathfinder {
    cache: Vec<WorldNode>,
    path_start: i32,
    color: PlayerColor,
    remaining_move_points: u32,
    max_move_points: u32,
    pathfinding_skill: SkillLevel,
    army_strength: f64,
    artifact_bag_full: bool,
    summon_boat_available: bool,
    dimension_door_available: bool,
    town_gate_available: bool,
    town_portal_available: bool,
    town_portal_candidates: Vec<i32>,
    spell_points: u32,
    max_spell_points: u32,
    minimal_army_strength_advantage: f64,
    spell_points_reserve_ratio: f64,
    /// Set when a parameter setter invalidated the cache.
    dirty: bool,
}

impl Default for AiWorldPathfinder {
    fn default() -> Self {
        Self::new()
    }
}

impl AiWorldPathfinder {
    pub fn new() -> Self {
        AiWorldPathfinder {
            cache: Vec::new(),
            path_start: -1,
            color: PlayerColor::None,
            remaining_move_points: 0,
            max_move_points: 0,
            pathfinding_skill: SkillLevel::None,
            army_strength: -1.0,
            artifact_bag_full: false,
            summon_boat_available: false,
            dimension_door_available: false,
            town_gate_available: false,
            town_portal_available: false,
            town_portal_candidates: Vec::new(),
            spell_points: 0,
            max_spell_points: 0,
            minimal_army_strength_advantage: 1.0,
            spell_points_reserve_ratio: 0.5,
            dirty: true,
        }
    }

    pub fn reset(&mut self) {
        self.cache.clear();
        self.path_start = -1;
        self.dirty = true;
    }

    pub fn minimal_army_strength_advantage(&self) -> f64 {
        self.minimal_army_strength_advantage
    }

    pub fn set_minimal_army_strength_advantage(&mut self, advantage: f64) {
        if (self.minimal_army_strength_advantage - advantage).abs() > f64::EPSILON {
            self.minimal_army_strength_advantage = advantage;
            self.dirty = true;
        }
    }

    pub fn spell_points_reserve_ratio(&self) -> f64 {
        self.spell_points_reserve_ratio
    }

    pub fn set_spell_points_reserve_ratio(&mut self, ratio: f64) {
        if (self.spell_points_reserve_ratio - ratio).abs() > f64::EPSILON {
            self.spell_points_reserve_ratio = ratio;
            self.dirty = true;
        }
    }

    /// Spell points actually spendable on movement spells once the reserve is
    /// held back.
    fn spendable_spell_points(&self) -> u32 {
        let reserve = (self.max_spell_points as f64 * self.spell_points_reserve_ratio) as u32;
        self.spell_points.saturating_sub(reserve)
    }

    /// Re-evaluates for a hero if any input the cache depends on has changed.
    pub fn re_evaluate_if_needed(&mut self, world: &World, hero: &Hero) {
        let town_portal_candidates = Self::town_portal_candidates(world, hero);

        let unchanged = !self.dirty
            && !self.cache.is_empty()
            && self.path_start == hero.position
            && self.color == hero.color
            && self.remaining_move_points == hero.move_points
            && self.pathfinding_skill == hero.skill_level(SkillKind::Pathfinding)
            && (self.army_strength - hero.army.strength()).abs() < f64::EPSILON
            && self.artifact_bag_full == hero.bag.is_full()
            && self.summon_boat_available == hero.can_cast_spell(Spell::SummonBoat)
            && self.town_portal_candidates == town_portal_candidates
            && self.spell_points == hero.spell_points;
        if unchanged {
            return;
        }

        self.path_start = hero.position;
        self.color = hero.color;
        self.remaining_move_points = hero.move_points;
        self.max_move_points = hero.max_move_points();
        self.pathfinding_skill = hero.skill_level(SkillKind::Pathfinding);
        self.army_strength = hero.army.strength();
        self.artifact_bag_full = hero.bag.is_full();
        self.summon_boat_available = hero.can_cast_spell(Spell::SummonBoat);
        self.dimension_door_available =
            hero.have_spell(Spell::DimensionDoor) && hero.dimension_door_casts < DIMENSION_DOOR_DAILY_LIMIT;
        self.town_gate_available = hero.have_spell(Spell::TownGate);
        self.town_portal_available = hero.have_spell(Spell::TownPortal);
        self.town_portal_candidates = town_portal_candidates;
        self.spell_points = hero.spell_points;
        self.max_spell_points = hero.max_spell_points();
        self.dirty = false;

        trace!(start = self.path_start, "re-evaluating AI pathfinder");
        self.process_world_map(world);
    }

    /// Re-evaluates for a non-hero army (castle garrison, monster stack):
    /// plain movement only, no spells.
    pub fn re_evaluate_for_army(&mut self, world: &World, start: i32, color: PlayerColor, army_strength: f64) {
        let unchanged = !self.dirty
            && !self.cache.is_empty()
            && self.path_start == start
            && self.color == color
            && (self.army_strength - army_strength).abs() < f64::EPSILON
            && self.remaining_move_points == 0;
        if unchanged {
            return;
        }

        self.path_start = start;
        self.color = color;
        self.remaining_move_points = 0;
        self.max_move_points = 1500;
        self.pathfinding_skill = SkillLevel::Expert;
        self.army_strength = army_strength;
        self.artifact_bag_full = false;
        self.summon_boat_available = false;
        self.dimension_door_available = false;
        self.town_gate_available = false;
        self.town_portal_available = false;
        self.town_portal_candidates.clear();
        self.spell_points = 0;
        self.max_spell_points = 0;
        self.dirty = false;

        self.process_world_map(world);
    }

    /// Distance between an arbitrary start and target for the given army.
    /// Re-evaluates the cache; wrap calls in a state guard when nesting.
    pub fn get_army_distance(
        &mut self,
        world: &World,
        start: i32,
        target: i32,
        color: PlayerColor,
        army_strength: f64,
    ) -> u32 {
        self.re_evaluate_for_army(world, start, color, army_strength);
        self.get_distance(target)
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

    /// Builds a path to the target. When action objects lie on the way, the
    /// path is truncated at the first of them: the hero handles it first.
    pub fn build_path(&self, world: &World, target: i32) -> Vec<PathStep> {
        let mut path = build_path_from_cache(world, &self.cache, self.path_start, target);

        if let Some(stop) = path
            .iter()
            .position(|step| step.index != target && world.tile(step.index).object_kind(false).is_action_object())
        {
            path.truncate(stop + 1);
        }

        path
    }

    /// Action objects lying on the path to the target, in travel order,
    /// excluding the target itself.
    pub fn get_objects_on_the_way(&self, world: &World, target: i32) -> Vec<(i32, MapObjectKind)> {
        build_path_from_cache(world, &self.cache, self.path_start, target)
            .iter()
            .filter(|step| step.index != target)
            .filter_map(|step| {
                let kind = world.tile(step.index).object_kind(false);
                kind.is_action_object().then_some((step.index, kind))
            })
            .collect()
    }

    /// Builds a Dimension Door jump sequence toward the target: greedy
    /// maximum-length jumps onto visible, free, same-surface tiles, bounded by
    /// the spell-point budget (after the reserve) and the daily cast limit.
    pub fn build_dimension_door_path(&self, world: &World, hero: &Hero, target: i32) -> Vec<PathStep> {
        if !self.dimension_door_available || !world.is_valid_index(target) {
            return Vec::new();
        }

        let spell_cost = Spell::DimensionDoor.cost();
        let affordable_casts = if spell_cost == 0 { 0 } else { self.spendable_spell_points() / spell_cost };
        let max_casts = affordable_casts.min(DIMENSION_DOOR_DAILY_LIMIT - hero.dimension_door_casts.min(DIMENSION_DOOR_DAILY_LIMIT));
        if max_casts == 0 {
            return Vec::new();
        }

        let on_water = world.tile(self.path_start).is_water();
        let mut steps = Vec::new();
        let mut current = self.path_start;

        for _ in 0..max_casts {
            if current == target {
                break;
            }

            let (cx, cy) = world.point(current);
            let (tx, ty) = world.point(target);
            let jump = Spell::DIMENSION_DOOR_DISTANCE;
            let (dx, dy) = (tx - cx, ty - cy);
            let nx = cx + dx.clamp(-jump, jump);
            let ny = cy + dy.clamp(-jump, jump);

            let landing = Self::find_landing_tile(world, self.color, world.index(nx, ny), on_water);
            let Some(landing) = landing else {
                return Vec::new();
            };
            if landing == current {
                return Vec::new();
            }

            steps.push(PathStep {
                from: current,
                index: landing,
                direction: Direction::Top,
                penalty: Spell::DIMENSION_DOOR_MOVE_COST,
            });
            current = landing;
        }

        if current == target {
            steps
        } else {
            Vec::new()
        }
    }

    /// A landing tile must be visible, unoccupied and on the hero's surface.
    fn find_landing_tile(world: &World, color: PlayerColor, wanted: i32, on_water: bool) -> Option<i32> {
        let candidate_valid = |index: i32| {
            let tile = world.tile(index);
            !tile.is_fog(color)
                && !tile.is_blocked()
                && tile.is_water() == on_water
                && tile.object.is_none()
                && tile.hero.is_none()
        };

        if candidate_valid(wanted) {
            return Some(wanted);
        }
        Direction::ALL
            .iter()
            .filter_map(|&dir| world.direction_index(wanted, dir))
            .find(|&index| candidate_valid(index))
    }

    /// The most profitable tile for fog discovery. The boolean is true when
    /// fog borders the tile directly, i.e. moving there is likely to open a
    /// new area.
    pub fn get_fog_discovery_tile(&self, world: &World, hero: &Hero) -> (i32, bool) {
        let radius = HERO_SCOUT_RADIUS + ravenmoor_core::skill::scouting_bonus(hero.skill_level(SkillKind::Scouting));

        let mut best_tile = -1;
        let mut best_value = 0.0;
        let mut best_expands = false;

        for index in 0..world.size() {
            let node = &self.cache[index as usize];
            if !node.is_reached() || node.cost == 0 {
                continue;
            }
            if world.tile(index).is_fog(self.color) {
                continue;
            }

            let fog_count = world.fog_count_to_be_revealed(index, radius, self.color);
            if fog_count == 0 {
                continue;
            }

            // Prefer many new tiles over a short walk.
            let value = fog_count as f64 * 100.0 / (node.cost as f64 + 100.0);
            if value > best_value {
                best_value = value;
                best_tile = index;
                best_expands = Direction::ALL
                    .iter()
                    .filter_map(|&dir| world.direction_index(index, dir))
                    .any(|neighbour| world.tile(neighbour).is_fog(self.color));
            }
        }

        (best_tile, best_expands)
    }

    /// The closest free tile a stuck hero could step onto to unblock a
    /// passage. Returns -1 when the hero cannot move at all.
    pub fn get_nearest_tile_to_move(&self, world: &World) -> i32 {
        let mut best = -1;
        let mut best_cost = UNREACHABLE;

        for index in 0..world.size() {
            let node = &self.cache[index as usize];
            if !node.is_reached() || node.cost == 0 || node.cost >= best_cost {
                continue;
            }

            let tile = world.tile(index);
            if tile.object.is_some() || tile.hero.is_some() {
                continue;
            }

            best = index;
            best_cost = node.cost;
        }

        best
    }

    /// Heuristic for heroes jamming a chokepoint: stuck heroes with at most
    /// two open exits are likely standing in somebody's way.
    pub fn is_hero_possibly_blocking_way(world: &World, hero: &Hero) -> bool {
        let open_exits = Direction::ALL
            .iter()
            .filter(|&&dir| is_step_allowed(world, hero.position, dir).is_some())
            .count();
        open_exits <= 2
    }

    fn town_portal_candidates(world: &World, hero: &Hero) -> Vec<i32> {
        if !hero.have_spell(Spell::TownPortal) && !hero.have_spell(Spell::TownGate) {
            return Vec::new();
        }
        world
            .castles
            .iter()
            .filter(|castle| castle.color == hero.color && castle.hero.is_none())
            .map(|castle| castle.position)
            .collect()
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

            // A tile with a hero on it is a destination, never a corridor.
            if current != start && world.tile(current).hero.is_some() {
                continue;
            }

            for direction in Direction::ALL {
                let Some(next) = is_step_allowed(world, current, direction) else {
                    continue;
                };
                if !self.is_water_step_allowed(world, current, next) {
                    continue;
                }
                if !self.is_tile_accessible(world, next) {
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

        self.add_castle_teleport_edges(world);
    }

    /// Town Gate reaches the nearest friendly castle, Town Portal any of them.
    /// Both cost a flat movement fee and only improve already-known routes.
    fn add_castle_teleport_edges(&mut self, world: &World) {
        if self.town_portal_candidates.is_empty() {
            return;
        }
        let spendable = self.spendable_spell_points();

        let mut candidates: Vec<i32> = Vec::new();
        if self.town_portal_available && spendable >= Spell::TownPortal.cost() {
            candidates = self.town_portal_candidates.clone();
        } else if self.town_gate_available && spendable >= Spell::TownGate.cost() {
            if let Some(&nearest) = self
                .town_portal_candidates
                .iter()
                .min_by_key(|&&index| world.approximate_distance(self.path_start, index))
            {
                candidates.push(nearest);
            }
        }

        for index in candidates {
            let teleport_cost = Spell::DIMENSION_DOOR_MOVE_COST;
            if teleport_cost < self.cache[index as usize].cost {
                self.cache[index as usize] = WorldNode {
                    from: self.path_start,
                    cost: teleport_cost,
                    object: world.tile(index).object_kind(false),
                    remaining_move_points: self.remaining_move_points.saturating_sub(teleport_cost),
                };
            }
        }
    }

    fn is_water_step_allowed(&self, world: &World, from: i32, to: i32) -> bool {
        let from_water = world.tile(from).is_water();
        let to_water = world.tile(to).is_water();

        if from_water == to_water || from_water {
            return true;
        }

        let to_tile = world.tile(to);
        if to_tile.object_kind(true) == MapObjectKind::Boat {
            return true;
        }
        self.summon_boat_available
            && to_tile.object.is_none()
            && self.remaining_move_points >= Spell::SummonBoat.cost()
    }

    /// Tiles still hidden in the fog cannot be planned through, and guarded
    /// tiles are passable only with a sufficient army advantage.
    fn is_tile_accessible(&self, world: &World, index: i32) -> bool {
        let tile = world.tile(index);
        if self.color.is_valid() && tile.is_fog(self.color) {
            return false;
        }
        let guard_strength = tile.guard_strength();
        if guard_strength <= 0.0 {
            return true;
        }
        self.army_strength >= guard_strength * self.minimal_army_strength_advantage
    }
}

/// Scoped restorer for the pathfinder tuning parameters. Any nested
/// evaluation with temporary settings must go through this guard so the outer
/// caller observes unchanged values on every exit path.
pub struct AiPathfinderStateGuard<'a> {
    pathfinder: &'a mut AiWorldPathfinder,
    saved_advantage: f64,
    saved_reserve_ratio: f64,
}

impl<'a> AiPathfinderStateGuard<'a> {
    pub fn new(pathfinder: &'a mut AiWorldPathfinder) -> Self {
        let saved_advantage = pathfinder.minimal_army_strength_advantage();
        let saved_reserve_ratio = pathfinder.spell_points_reserve_ratio();
        AiPathfinderStateGuard { pathfinder, saved_advantage, saved_reserve_ratio }
    }
}

impl Drop for AiPathfinderStateGuard<'_> {
    fn drop(&mut self) {
        self.pathfinder.set_minimal_army_strength_advantage(self.saved_advantage);
        self.pathfinder.set_spell_points_reserve_ratio(self.saved_reserve_ratio);
    }
}

impl Deref for AiPathfinderStateGuard<'_> {
    type Target = AiWorldPathfinder;

    fn deref(&self) -> &AiWorldPathfinder {
        self.pathfinder
    }
}

impl DerefMut for AiPathfinderStateGuard<'_> {
    fn deref_mut(&mut self) -> &mut AiWorldPathfinder {
        self.pathfinder
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::{MapObject, ObjectPayload};
    use crate::tile::{Ground, Tile};
    use ravenmoor_core::artifact::Artifact;
    use ravenmoor_core::hero::HeroId;
    use ravenmoor_core::monster::MonsterId;
    use ravenmoor_core::troop::Troop;

    fn world_with_hero(width: i32, height: i32) -> (World, Hero) {
        let tiles = (0..width * height).map(|index| Tile::new(index, Ground::Grass)).collect();
        let mut world = World::new(width, height, tiles, 1);
        let mut hero = Hero::new(HeroId(0), "Mira", PlayerColor::Blue, 0);
        hero.army.join_troop(MonsterId::Swordsman, 10);
        for index in 0..world.size() {
            world.tile_mut(index).reveal(PlayerColor::Blue);
        }
        (world, hero)
    }

    #[test]
    fn guarded_tiles_gate_on_army_advantage() {
        let (mut world, hero) = world_with_hero(5, 1);
        world.tile_mut(2).object = Some(MapObject::with_payload(
            MapObjectKind::Monster,
            ObjectPayload::Troops(Troop::new(MonsterId::BlackDragon, 20)),
        ));

        let mut pathfinder = AiWorldPathfinder::new();
        pathfinder.set_minimal_army_strength_advantage(super::super::ARMY_ADVANTAGE_MEDIUM);
        pathfinder.re_evaluate_if_needed(&world, &hero);
        assert!(!pathfinder.reachable(4));

        // The same map with a trivial guard opens up.
        world.tile_mut(2).object = Some(MapObject::with_payload(
            MapObjectKind::Monster,
            ObjectPayload::Troops(Troop::new(MonsterId::Peasant, 1)),
        ));
        pathfinder.reset();
        pathfinder.re_evaluate_if_needed(&world, &hero);
        assert!(pathfinder.reachable(4));
    }

    #[test]
    fn state_guard_restores_parameters_on_every_exit() {
        let mut pathfinder = AiWorldPathfinder::new();
        pathfinder.set_minimal_army_strength_advantage(super::super::ARMY_ADVANTAGE_LARGE);
        pathfinder.set_spell_points_reserve_ratio(0.25);

        {
            let mut guard = AiPathfinderStateGuard::new(&mut pathfinder);
            guard.set_minimal_army_strength_advantage(super::super::ARMY_ADVANTAGE_DESPERATE);
            guard.set_spell_points_reserve_ratio(0.0);
            assert_eq!(guard.minimal_army_strength_advantage(), super::super::ARMY_ADVANTAGE_DESPERATE);
        }

        assert_eq!(pathfinder.minimal_army_strength_advantage(), super::super::ARMY_ADVANTAGE_LARGE);
        assert_eq!(pathfinder.spell_points_reserve_ratio(), 0.25);
    }

    #[test]
    fn dimension_door_path_respects_the_spell_point_reserve() {
        let (world, mut hero) = world_with_hero(20, 1);
        hero.bag.push(Artifact::MagicBook);
        hero.spell_book.push(Spell::DimensionDoor);
        hero.knowledge = 2; // 20 max spell points
        hero.spell_points = 20;

        let mut pathfinder = AiWorldPathfinder::new();
        pathfinder.set_spell_points_reserve_ratio(1.0);
        pathfinder.re_evaluate_if_needed(&world, &hero);
        assert!(pathfinder.build_dimension_door_path(&world, &hero, 14).is_empty());

        pathfinder.set_spell_points_reserve_ratio(0.0);
        pathfinder.re_evaluate_if_needed(&world, &hero);
        let path = pathfinder.build_dimension_door_path(&world, &hero, 14);
        assert_eq!(path.len(), 1);
        assert_eq!(path[0].index, 14);
    }

    #[test]
    fn objects_on_the_way_are_collected_in_travel_order() {
        let (mut world, hero) = world_with_hero(6, 1);
        world.tile_mut(2).object = Some(MapObject::new(MapObjectKind::TreasureChest));
        world.tile_mut(4).object = Some(MapObject::new(MapObjectKind::Campfire));

        let mut pathfinder = AiWorldPathfinder::new();
        pathfinder.re_evaluate_if_needed(&world, &hero);

        let objects = pathfinder.get_objects_on_the_way(&world, 5);
        assert_eq!(objects.len(), 2);
        assert_eq!(objects[0], (2, MapObjectKind::TreasureChest));
        assert_eq!(objects[1], (4, MapObjectKind::Campfire));

        // The walking path stops at the first object.
        let path = pathfinder.build_path(&world, 5);
        assert_eq!(path.last().unwrap().index, 2);
    }

    #[test]
    fn fog_discovery_prefers_tiles_opening_new_area() {
        let (mut world, hero) = world_with_hero(10, 3);
        // Hide the right half again.
        for y in 0..3 {
            for x in 6..10 {
                let index = world.index(x, y);
                world.tile_mut(index).fog.insert(PlayerColor::Blue);
            }
        }

        let mut pathfinder = AiWorldPathfinder::new();
        pathfinder.re_evaluate_if_needed(&world, &hero);

        let (tile, expands) = pathfinder.get_fog_discovery_tile(&world, &hero);
        assert!(tile >= 0);
        assert!(expands);
        let (x, _) = world.point(tile);
        assert!(x >= 2, "discovery tile should lean toward the fog border");
    }
}
