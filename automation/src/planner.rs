use std::collections::BTreeMap;

use map::object::MapObjectKind;
use map::pathfinding::AiWorldPathfinder;
use map::tile::Tile;
use map::world::World;
use ravenmoor_core::castle::CastleId;
use ravenmoor_core::color::PlayerColor;
use ravenmoor_core::difficulty::Difficulty;
use ravenmoor_core::hero::{Hero, HeroId, HeroRole};
use ravenmoor_core::resource::ResourceKind;
use tracing::{debug, trace};

use crate::budget::{new_budget, BudgetEntry};
use crate::commands::AdventureCommand;
use crate::priority::{EnemyArmy, PriorityTask, PriorityTaskType, RegionStats};

/// The adventure-map decision engine of one AI player. All per-turn caches
/// live here and are cleared at the start of every kingdom turn; the world is
/// only touched through the defined hooks.
pub struct Planner {
    pub(crate) difficulty: Difficulty,
    pub(crate) map_action_objects: BTreeMap<i32, MapObjectKind>,
    pub(crate) priority_targets: BTreeMap<i32, PriorityTask>,
    pub(crate) enemy_armies: BTreeMap<i32, EnemyArmy>,
    /// Strength of tile guards is constant within a turn but expensive to
    /// compute, so it is cached and invalidated per visited tile.
    pub(crate) tile_army_strengths: BTreeMap<i32, f64>,
    pub(crate) regions: Vec<RegionStats>,
    pub(crate) budget: [BudgetEntry; 7],
    pub(crate) pathfinder: AiWorldPathfinder,
}

impl Planner {
    pub fn new(difficulty: Difficulty) -> Self {
        Planner {
            difficulty,
            map_action_objects: BTreeMap::new(),
            priority_targets: BTreeMap::new(),
            enemy_armies: BTreeMap::new(),
            tile_army_strengths: BTreeMap::new(),
            regions: Vec::new(),
            budget: new_budget(),
            pathfinder: AiWorldPathfinder::new(),
        }
    }

    pub fn reset_pathfinder(&mut self) {
        self.pathfinder.reset();
    }

    pub(crate) fn is_priority_task(&self, index: i32) -> bool {
        self.priority_targets.contains_key(&index)
    }

    /// Attack and defend tasks demand immediate attention; reinforcement is
    /// merely advisory.
    pub(crate) fn is_critical_task(&self, index: i32) -> bool {
        self.priority_targets
            .get(&index)
            .map(|task| matches!(task.task_type, PriorityTaskType::Attack | PriorityTaskType::Defend))
            .unwrap_or(false)
    }

    /// Strength of the army guarding a tile, cached per turn.
    pub fn tile_army_strength(&mut self, world: &World, index: i32) -> f64 {
        *self
            .tile_army_strengths
            .entry(index)
            .or_insert_with(|| world.tile(index).guard_strength())
    }

    /// Keeps the action-object cache in sync with one tile.
    pub fn update_map_action_object_cache(&mut self, world: &World, index: i32) {
        let kind = world.tile(index).object_kind(false);
        if !kind.is_action_object() {
            self.map_action_objects.remove(&index);
            return;
        }
        self.map_action_objects.insert(index, kind);
    }

    /// Hook for newly revealed tiles: new objects become candidate targets
    /// and new enemy armies become threats.
    pub fn reveal_fog(&mut self, world: &mut World, index: i32, kingdom_color: PlayerColor) {
        let kind = world.tile(index).object_kind(false);
        if !kind.is_action_object() {
            return;
        }
        self.update_map_action_object_cache(world, index);
        self.update_priority_attack_target(world, kingdom_color, index);
    }

    /// Reconciles the priority table around a tile that may hold an enemy
    /// army (or used to hold one).
    pub fn update_priority_attack_target(&mut self, world: &mut World, kingdom_color: PlayerColor, index: i32) {
        let Some(enemy_army) = get_enemy_army_on_tile(world, kingdom_color, world.tile(index)) else {
            self.enemy_armies.remove(&index);
            return;
        };

        debug_assert_eq!(enemy_army.index, index);
        self.enemy_armies.insert(index, enemy_army);
        self.update_priority_for_enemy_army(world, kingdom_color, &enemy_army);
    }

    pub fn remove_priority_attack_target(&mut self, tile_index: i32) {
        let Some(task) = self.priority_targets.get(&tile_index) else {
            return;
        };
        if task.task_type != PriorityTaskType::Attack {
            return;
        }

        let secondaries: Vec<i32> = task.secondary_task_tiles.iter().copied().collect();
        for secondary in secondaries {
            debug_assert_ne!(secondary, tile_index);

            let Some(defense) = self.priority_targets.get_mut(&secondary) else {
                continue;
            };
            if defense.task_type != PriorityTaskType::Defend {
                continue;
            }

            defense.secondary_task_tiles.remove(&tile_index);
            if defense.secondary_task_tiles.is_empty() {
                // Nobody threatens this castle any more.
                self.priority_targets.remove(&secondary);
            }
        }

        self.priority_targets.remove(&tile_index);
    }

    /// Region safety: propagate the castle-derived seeds across neighbouring
    /// regions, weighting by neighbour count, highest seeds first, in batches
    /// so every region influences its neighbours exactly once.
    pub(crate) fn evaluate_region_safety(&mut self, world: &World) {
        let mut regions_to_check: Vec<(usize, i32)> = Vec::new();
        let mut last_positive = 0usize;

        for (region_id, stats) in self.regions.iter_mut().enumerate() {
            if (stats.friendly_castles > 0 && stats.enemy_castles > 0)
                || (stats.highest_threat > 0.0 && stats.enemy_castles == 0)
            {
                // Contested space, or enemy heroes roaming our region.
                stats.safety_factor = -50;
                stats.evaluated = true;
                regions_to_check.push((region_id, -50));
            } else if stats.enemy_castles > 0 {
                stats.safety_factor = -100;
                stats.evaluated = true;
                regions_to_check.push((region_id, -100));
            } else if stats.friendly_castles > 0 {
                stats.safety_factor = 100;
                stats.evaluated = true;
                regions_to_check.push((region_id, 100));
                last_positive += 1;
            } else {
                stats.safety_factor = 0;
                stats.evaluated = false;
            }
        }

        regions_to_check.sort_by(|left, right| right.1.cmp(&left.1));

        let mut current_entry = 0usize;
        let mut batch_start = 0usize;
        let mut batch_end = last_positive + 1;

        while current_entry < regions_to_check.len() {
            let region = world.region(regions_to_check[current_entry].0 as u32);

            for &neighbour in &region.neighbours {
                let stats = &mut self.regions[neighbour as usize];
                if !stats.evaluated {
                    stats.evaluated = true;
                    regions_to_check.push((neighbour as usize, stats.safety_factor));
                }

                let factor = self.regions[neighbour as usize].safety_factor;
                if factor != 0 {
                    // Integer division loses precision on purpose: influence
                    // decays to zero across the map.
                    regions_to_check[current_entry].1 += factor / region.neighbour_count().max(1) as i32;
                }
            }

            if region.neighbour_count() == 0 {
                // Islands are safer (or deadlier) thanks to boat penalties.
                regions_to_check[current_entry].1 = regions_to_check[current_entry].1 * 3 / 2;
            }

            if current_entry + 1 == batch_end {
                for &(region_id, factor) in &regions_to_check[batch_start..batch_end] {
                    self.regions[region_id].safety_factor = factor;
                    trace!(region = region_id, factor, "region safety");
                }
                batch_start = batch_end;
                batch_end = regions_to_check.len();
            }
            current_entry += 1;
        }
    }

    /// Scans the whole visible map: action objects, per-region counters and
    /// the enemy army cache.
    pub(crate) fn scan_map(&mut self, world: &World, my_color: PlayerColor, under_view_all: bool) {
        let map_size = world.size();

        for index in 0..map_size {
            let tile = world.tile(index);
            let mut kind = tile.object_kind(false);

            let region_id = tile.region as usize;
            if region_id >= self.regions.len() {
                debug_assert!(false, "tile region out of bounds");
                continue;
            }

            if !under_view_all && tile.is_fog(my_color) {
                continue;
            }
            if !kind.is_action_object() {
                continue;
            }

            self.map_action_objects.insert(index, kind);

            if kind == MapObjectKind::Hero {
                if let Some(hero) = world.hero_at(index) {
                    if hero.color == my_color && !hero.patrol {
                        self.regions[region_id].friendly_heroes += 1;
                    }
                }
                // The hero can stand on a castle entrance.
                kind = tile.object_kind(true);
            }

            if kind == MapObjectKind::Castle {
                if let Some(castle) = world.castle_entrance(index) {
                    if world.are_friends(castle.color, my_color) {
                        self.regions[region_id].friendly_castles += 1;
                    } else if castle.color.is_valid() {
                        self.regions[region_id].enemy_castles += 1;
                    }
                }
            }

            if let Some(enemy_army) = get_enemy_army_on_tile(world, my_color, tile) {
                if self.regions[region_id].highest_threat < enemy_army.strength {
                    self.regions[region_id].highest_threat = enemy_army.strength;
                }
                self.enemy_armies.insert(index, enemy_army);
            }
        }

        debug!(objects = self.map_action_objects.len(), armies = self.enemy_armies.len(), "map scanned");
    }

    /// Marks the resources the kingdom is short of for its next buildings as
    /// priorities, and the army upkeep resources as recurring costs.
    pub(crate) fn update_kingdom_budget(&mut self, world: &World, my_color: PlayerColor) {
        for entry in &mut self.budget {
            entry.reset();
        }

        let Some(kingdom) = world.kingdom(my_color) else {
            return;
        };

        // Gold is spent every turn on troops and heroes.
        if !kingdom.heroes.is_empty() {
            if let Some(entry) = self.budget.iter_mut().find(|entry| entry.resource == ResourceKind::Gold) {
                entry.recurring_cost = true;
            }
        }

        for &castle_id in &kingdom.castles {
            let castle = world.castle(castle_id);
            let Some(&wanted) = castle.buildable(&ravenmoor_core::resource::Funds::new(
                i32::MAX, i32::MAX, i32::MAX, i32::MAX, i32::MAX, i32::MAX, i32::MAX,
            ))
            .first() else {
                continue;
            };

            let cost = ravenmoor_core::castle::building::cost(wanted);
            for kind in ResourceKind::ALL {
                let missing = cost.get(kind) - kingdom.funds.get(kind);
                if missing <= 0 {
                    continue;
                }
                if let Some(entry) = self.budget.iter_mut().find(|entry| entry.resource == kind) {
                    entry.missing += missing;
                    entry.priority = true;
                }
            }
        }
    }

    /// The per-turn cache clear of step 1 of the kingdom turn.
    pub(crate) fn clear_turn_caches(&mut self, world: &World) {
        self.map_action_objects.clear();
        self.priority_targets.clear();
        self.enemy_armies.clear();
        self.tile_army_strengths.clear();
        self.regions.clear();
        self.regions.resize_with(world.region_count(), RegionStats::default);
    }

    /// Post-action hook: refreshes every cache the action may have touched.
    pub fn heroes_action_complete(
        &mut self,
        world: &mut World,
        hero_id: HeroId,
        tile_index: i32,
        object_kind: MapObjectKind,
    ) {
        if world.hero(hero_id).is_active() {
            if let Some(castle_id) = world.hero_in_castle(hero_id) {
                crate::castle_turn::reinforce_hero_in_castle(self, world, hero_id, castle_id);
            } else {
                world.hero_mut(hero_id).army.optimize_order();
            }
        }

        self.tile_army_strengths.remove(&tile_index);
        self.update_priority_targets(world, hero_id, tile_index, object_kind);
        self.update_map_action_object_cache(world, tile_index);
    }

    /// Priority-task reconciliation after a hero action on a castle or hero
    /// tile.
    pub(crate) fn update_priority_targets(
        &mut self,
        world: &mut World,
        hero_id: HeroId,
        tile_index: i32,
        object_kind: MapObjectKind,
    ) {
        if object_kind != MapObjectKind::Castle && object_kind != MapObjectKind::Hero {
            return;
        }

        let my_color = world.hero(hero_id).color;

        let update_tile = |planner: &mut Planner, world: &mut World| {
            match object_kind {
                MapObjectKind::Castle => {
                    let castle_info = world.castle_entrance(tile_index).map(|castle| (castle.id, castle.color));
                    match castle_info {
                        Some((castle_id, color)) if world.are_friends(color, my_color) => {
                            planner.enemy_armies.remove(&tile_index);
                            planner.update_priority_for_castle(world, my_color, castle_id);
                        }
                        Some(_) => planner.update_priority_attack_target(world, my_color, tile_index),
                        None => {
                            debug_assert!(false, "castle expected on tile");
                            planner.enemy_armies.remove(&tile_index);
                        }
                    }
                }
                MapObjectKind::Hero => {
                    let other_color = world.hero_at(tile_index).map(|other| other.color);
                    match other_color {
                        Some(color) if !world.are_friends(color, my_color) => {
                            planner.update_priority_attack_target(world, my_color, tile_index);
                        }
                        Some(_) => {}
                        None => {
                            // The other hero lost, but may have defended a castle.
                            if world.tile(tile_index).object_kind(true) == MapObjectKind::Castle {
                                planner.update_priority_attack_target(world, my_color, tile_index);
                            } else {
                                planner.enemy_armies.remove(&tile_index);
                            }
                        }
                    }
                }
                _ => unreachable!(),
            }
        };

        if !self.priority_targets.contains_key(&tile_index) {
            // A non-priority tile can become one after the battle, e.g. when
            // the surviving army has grown.
            update_tile(self, world);
            if !self.priority_targets.contains_key(&tile_index) {
                return;
            }
        }

        let task_type = self.priority_targets[&tile_index].task_type;
        match task_type {
            PriorityTaskType::Defend | PriorityTaskType::Reinforce => {
                if world.hero(hero_id).position != tile_index {
                    // The castle was just captured or the hero met its guest;
                    // the task itself is not done yet.
                    update_tile(self, world);
                    return;
                }

                debug_assert!(object_kind == MapObjectKind::Castle);
                world.hero_mut(hero_id).sleeper = true;
                self.priority_targets.remove(&tile_index);
            }
            PriorityTaskType::Attack => {
                self.remove_priority_attack_target(tile_index);
                update_tile(self, world);
            }
        }
    }

    pub(crate) fn update_priority_for_enemy_army(
        &mut self,
        world: &mut World,
        my_color: PlayerColor,
        enemy_army: &EnemyArmy,
    ) {
        let Some(kingdom) = world.kingdom(my_color) else {
            return;
        };
        let heroes = kingdom.heroes.clone();
        let castles = kingdom.castles.clone();

        // The reachability estimate must not be blocked by our own heroes,
        // and must use the optimistic pathfinder settings for enemy armies.
        let eraser = TemporaryHeroEraser::new(world, &heroes);
        let mut scope = PlannerPathfinderScope::new(self);
        scope.pathfinder.set_minimal_army_strength_advantage(map::pathfinding::ARMY_ADVANTAGE_DESPERATE);
        scope.pathfinder.set_spell_points_reserve_ratio(0.0);

        for castle_id in castles {
            scope.update_individual_priority_for_castle(eraser.world(), castle_id, enemy_army);
        }
    }

    pub(crate) fn update_priority_for_castle(&mut self, world: &mut World, my_color: PlayerColor, castle_id: CastleId) {
        let heroes = world.kingdom(my_color).map(|kingdom| kingdom.heroes.clone()).unwrap_or_default();
        let armies: Vec<EnemyArmy> = self.enemy_armies.values().copied().collect();

        let eraser = TemporaryHeroEraser::new(world, &heroes);
        let mut scope = PlannerPathfinderScope::new(self);
        scope.pathfinder.set_minimal_army_strength_advantage(map::pathfinding::ARMY_ADVANTAGE_DESPERATE);
        scope.pathfinder.set_spell_points_reserve_ratio(0.0);

        for enemy_army in armies {
            scope.update_individual_priority_for_castle(eraser.world(), castle_id, &enemy_army);
        }
    }

    /// Records the attack/defend task pair for one (castle, enemy army) pair.
    /// Returns true when the castle is genuinely in danger. Callers go through
    /// the `update_priority_*` wrappers which set up the pathfinder state.
    pub(crate) fn update_individual_priority_for_castle(
        &mut self,
        world: &World,
        castle_id: CastleId,
        enemy_army: &EnemyArmy,
    ) -> bool {
        // Roughly how far a maxed-out hero travels in a turn.
        const THREAT_DISTANCE_LIMIT: u32 = 3000;

        let castle = world.castle(castle_id);
        let castle_index = castle.position;

        // Skip the precise check when the army cannot possibly be a threat.
        if world.approximate_distance(enemy_army.index, castle_index) * map::tile::Ground::FASTEST_PENALTY
            > THREAT_DISTANCE_LIMIT
        {
            return false;
        }

        // The castle owner sees both the castle and the army; estimate the
        // path from his point of view rather than the enemy's possibly
        // fog-limited one.
        let dist = self.pathfinder.get_army_distance(
            world,
            enemy_army.index,
            castle_index,
            castle.color,
            enemy_army.strength,
        );
        if dist == 0 || dist == map::pathfinding::UNREACHABLE || dist >= THREAT_DISTANCE_LIMIT {
            return false;
        }

        let mut days_to_reach = dist.div_ceil(enemy_army.move_points.max(1));
        if days_to_reach > 3 {
            return false;
        }

        trace!(castle = castle.name.as_str(), enemy = enemy_army.index, "castle threatened");

        let mut enemy_strength = enemy_army.strength;
        while days_to_reach > 1 {
            // A distant threat loses half its weight per day of travel.
            enemy_strength /= 2.0;
            days_to_reach -= 1;
        }

        self.priority_targets
            .entry(enemy_army.index)
            .and_modify(|task| {
                task.secondary_task_tiles.insert(castle_index);
            })
            .or_insert_with(|| PriorityTask::with_secondary(PriorityTaskType::Attack, castle_index));

        self.priority_targets
            .entry(castle_index)
            .and_modify(|task| {
                task.secondary_task_tiles.insert(enemy_army.index);
            })
            .or_insert_with(|| PriorityTask::with_secondary(PriorityTaskType::Defend, enemy_army.index));

        // In danger when the garrison (plus the guest hero inside) cannot
        // repel the attack, or the guest would lose in an open field.
        let mut defense = castle.garrison.strength();
        if let Some(guest_id) = castle.hero {
            defense += world.hero(guest_id).army.strength();
        }
        if defense < enemy_strength {
            return true;
        }
        if let Some(guest_id) = castle.hero {
            let guest = world.hero(guest_id);
            if guest.army.strength() <= enemy_strength * map::pathfinding::ARMY_ADVANTAGE_SMALL {
                return true;
            }
        }
        false
    }

    /// Entry point: one full kingdom turn. Returns the command trace.
    pub fn kingdom_turn(&mut self, world: &mut World, my_color: PlayerColor) -> Vec<AdventureCommand> {
        crate::hero_turn::kingdom_turn(self, world, my_color)
    }
}

/// The enemy army a tile presents: a hostile hero, or a hostile castle that
/// can hire one.
pub(crate) fn get_enemy_army_on_tile(world: &World, kingdom_color: PlayerColor, tile: &Tile) -> Option<EnemyArmy> {
    let kind = tile.object_kind(false);
    let tile_index = tile.index;

    if kind == MapObjectKind::Hero {
        let hero = world.hero_at(tile_index)?;
        if world.are_friends(hero.color, kingdom_color) {
            return None;
        }
        // A hero pinned in place by patrol is not a threat.
        if hero.patrol && hero.patrol_distance == 0 {
            return None;
        }

        // If the hero sits in a castle, count its garrison too.
        let mut threat = hero.army.strength();
        if let Some(castle) = world.castle_entrance(tile_index) {
            threat += castle.garrison.strength();
        }

        return Some(EnemyArmy {
            index: tile_index,
            hero: Some(hero.id),
            strength: threat,
            move_points: hero.max_move_points(),
        });
    }

    if kind == MapObjectKind::Castle {
        let castle = world.castle_entrance(tile_index)?;
        // Neutral castles cannot hire heroes.
        if !castle.color.is_valid() || world.are_friends(castle.color, kingdom_color) {
            return None;
        }
        // A town that cannot even build a castle cannot produce a threat.
        if !castle.is_castle() && !castle.allow_build_castle() {
            return None;
        }

        return Some(EnemyArmy {
            index: tile_index,
            hero: None,
            strength: castle.garrison.strength(),
            // Slightly more than a fresh hero's movement allowance.
            move_points: 1500,
        });
    }

    None
}

/// Scoped restorer for the planner's pathfinder tuning: any nested evaluation
/// with temporary advantage/reserve settings goes through this guard so the
/// outer caller sees unchanged values on every exit path.
pub(crate) struct PlannerPathfinderScope<'a> {
    planner: &'a mut Planner,
    saved_advantage: f64,
    saved_reserve_ratio: f64,
}

impl<'a> PlannerPathfinderScope<'a> {
    pub fn new(planner: &'a mut Planner) -> Self {
        let saved_advantage = planner.pathfinder.minimal_army_strength_advantage();
        let saved_reserve_ratio = planner.pathfinder.spell_points_reserve_ratio();
        PlannerPathfinderScope { planner, saved_advantage, saved_reserve_ratio }
    }
}

impl Drop for PlannerPathfinderScope<'_> {
    fn drop(&mut self) {
        self.planner.pathfinder.set_minimal_army_strength_advantage(self.saved_advantage);
        self.planner.pathfinder.set_spell_points_reserve_ratio(self.saved_reserve_ratio);
    }
}

impl std::ops::Deref for PlannerPathfinderScope<'_> {
    type Target = Planner;

    fn deref(&self) -> &Planner {
        self.planner
    }
}

impl std::ops::DerefMut for PlannerPathfinderScope<'_> {
    fn deref_mut(&mut self) -> &mut Planner {
        self.planner
    }
}

/// Temporarily erases the kingdom's own heroes from the map while estimating
/// what enemy armies could reach, so they do not block the estimate.
pub(crate) struct TemporaryHeroEraser<'a> {
    world: &'a mut World,
    erased: Vec<(HeroId, i32)>,
}

impl<'a> TemporaryHeroEraser<'a> {
    pub fn new(world: &'a mut World, heroes: &[HeroId]) -> Self {
        let mut erased = Vec::new();
        for &hero_id in heroes {
            let position = world.hero(hero_id).position;
            if !world.is_valid_index(position) {
                continue;
            }
            if world.tile(position).hero != Some(hero_id) {
                // The hero is mid-move; nothing to erase.
                continue;
            }
            world.tile_mut(position).hero = None;
            erased.push((hero_id, position));
        }
        TemporaryHeroEraser { world, erased }
    }

    pub fn world(&self) -> &World {
        self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        self.world
    }
}

impl Drop for TemporaryHeroEraser<'_> {
    fn drop(&mut self) {
        for &(hero_id, position) in &self.erased {
            debug_assert!(self.world.tile(position).hero.is_none());
            self.world.tile_mut(position).hero = Some(hero_id);
        }
    }
}

/// Role assignment: the strongest hero is the Champion (unless the
/// map's victory condition pins the title), the weakest runs the mail, the
/// next weakest scouts, and everyone clearly above the median fights.
pub(crate) fn set_hero_roles(world: &mut World, heroes: &[HeroId], difficulty: Difficulty) {
    if heroes.is_empty() {
        return;
    }

    if !difficulty.are_hero_roles_allowed() {
        for &hero_id in heroes {
            world.hero_mut(hero_id).role = HeroRole::Hunter;
        }
        return;
    }

    let valuable_hero = world.victory.target_hero;

    if heroes.len() == 1 {
        let role = if valuable_hero == Some(heroes[0]) { HeroRole::Champion } else { HeroRole::Hunter };
        world.hero_mut(heroes[0]).role = role;
        return;
    }

    struct HeroValue {
        id: HeroId,
        strength: f64,
        stats: i32,
    }

    let mut list: Vec<HeroValue> = Vec::new();
    for &hero_id in heroes {
        let hero: &Hero = world.hero(hero_id);
        if hero.patrol {
            // Patrolling heroes stand their ground; always fighters.
            world.hero_mut(hero_id).role = HeroRole::Fighter;
        } else {
            list.push(HeroValue { id: hero_id, strength: hero.army.strength(), stats: hero.stats_value() });
        }
    }

    if list.is_empty() {
        return;
    }

    if list.len() > 3 {
        list.sort_by(|a, b| b.stats.cmp(&a.stats));

        if valuable_hero.is_none() {
            let champion = list.remove(0);
            world.hero_mut(champion.id).role = HeroRole::Champion;
        }

        // The weakest carries reinforcements and does not count toward the
        // median.
        let courier = list.pop().expect("list cannot be empty here");
        world.hero_mut(courier.id).role = HeroRole::Courier;

        if list.len() > 2 {
            let scout = list.pop().expect("list has two or more entries");
            world.hero_mut(scout.id).role = HeroRole::Scout;
        }
    }

    debug_assert!(!list.is_empty());
    list.sort_by(|a, b| b.strength.total_cmp(&a.strength));
    let median_strength = list[list.len() / 2].strength;

    for entry in list {
        let role = if valuable_hero == Some(entry.id) {
            HeroRole::Champion
        } else if entry.strength > median_strength * 3.0 {
            HeroRole::Fighter
        } else {
            HeroRole::Hunter
        };
        world.hero_mut(entry.id).role = role;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use map::tile::Ground;
    use ravenmoor_core::kingdom::{Control, Kingdom};
    use ravenmoor_core::monster::MonsterId;
    use ravenmoor_core::troop::Troop;

    fn flat_world(width: i32, height: i32) -> World {
        let tiles = (0..width * height).map(|index| Tile::new(index, Ground::Grass)).collect();
        let mut world = World::new(width, height, tiles, 7);
        world.kingdoms.push(Kingdom::new(PlayerColor::Blue, Control::Ai));
        world.kingdoms.push(Kingdom::new(PlayerColor::Red, Control::Ai));
        world
    }

    fn add_hero(world: &mut World, color: PlayerColor, position: i32, strength_troops: u32) -> HeroId {
        let id = HeroId(world.heroes.len() as u32);
        let mut hero = Hero::new(id, "Test", color, position);
        hero.army.join_troop(MonsterId::Swordsman, strength_troops);
        world.heroes.push(hero);
        world.tile_mut(position).hero = Some(id);
        if let Some(kingdom) = world.kingdom_mut(color) {
            kingdom.heroes.push(id);
        }
        world.relocate_hero(id, position);
        id
    }

    #[test]
    fn action_object_cache_updates_are_idempotent() {
        let mut world = flat_world(6, 6);
        world.tile_mut(8).object = Some(map::object::MapObject::new(MapObjectKind::TreasureChest));

        let mut planner = Planner::new(Difficulty::Normal);
        planner.update_map_action_object_cache(&world, 8);
        let snapshot = planner.map_action_objects.clone();
        planner.update_map_action_object_cache(&world, 8);
        assert_eq!(planner.map_action_objects, snapshot);

        world.remove_object(8);
        planner.update_map_action_object_cache(&world, 8);
        assert!(!planner.map_action_objects.contains_key(&8));
    }

    #[test]
    fn hero_eraser_restores_tiles() {
        let mut world = flat_world(6, 6);
        let hero = add_hero(&mut world, PlayerColor::Blue, 10, 5);

        {
            let eraser = TemporaryHeroEraser::new(&mut world, &[hero]);
            assert!(eraser.world().tile(10).hero.is_none());
        }
        assert_eq!(world.tile(10).hero, Some(hero));
    }

    #[test]
    fn roles_cover_the_whole_roster() {
        let mut world = flat_world(8, 8);
        let heroes: Vec<HeroId> = (0..5)
            .map(|i| add_hero(&mut world, PlayerColor::Blue, i, (i as u32 + 1) * 4))
            .collect();
        // Give them distinct stats so the ordering is meaningful.
        for (i, &id) in heroes.iter().enumerate() {
            world.hero_mut(id).attack = 1 + i as u32 * 2;
        }

        set_hero_roles(&mut world, &heroes, Difficulty::Normal);

        let roles: Vec<HeroRole> = heroes.iter().map(|&id| world.hero(id).role).collect();
        assert!(roles.contains(&HeroRole::Champion));
        assert!(roles.contains(&HeroRole::Courier));
        assert!(roles.contains(&HeroRole::Scout));
    }

    #[test]
    fn enemy_castle_threat_creates_attack_and_defend_pair() {
        let mut world = flat_world(10, 1);
        let mut own = ravenmoor_core::castle::Castle::new(CastleId(0), "Home", PlayerColor::Blue, 0);
        own.build(ravenmoor_core::castle::building::CASTLE);
        world.castles.push(own);
        world.kingdom_mut(PlayerColor::Blue).unwrap().castles.push(CastleId(0));

        let enemy = add_hero(&mut world, PlayerColor::Red, 5, 30);
        for index in 0..world.size() {
            world.tile_mut(index).reveal(PlayerColor::Blue);
        }

        let mut planner = Planner::new(Difficulty::Normal);
        planner.clear_turn_caches(&world);
        planner.scan_map(&world, PlayerColor::Blue, false);

        let army = planner.enemy_armies[&5];
        assert_eq!(army.hero, Some(enemy));
        planner.update_priority_for_enemy_army(&mut world, PlayerColor::Blue, &army.clone());

        assert_eq!(planner.priority_targets[&5].task_type, PriorityTaskType::Attack);
        assert_eq!(planner.priority_targets[&0].task_type, PriorityTaskType::Defend);
        assert!(planner.priority_targets[&5].secondary_task_tiles.contains(&0));

        // Once the threat is gone the defend task dissolves with it.
        planner.remove_priority_attack_target(5);
        assert!(planner.priority_targets.is_empty());
    }

    #[test]
    fn region_safety_spreads_from_castles() {
        // Water column splits the map into two land regions.
        let tiles: Vec<Tile> = (0..27)
            .map(|index| {
                let mut tile = Tile::new(index, Ground::Grass);
                if index % 9 == 4 {
                    tile.ground = Ground::Water;
                }
                tile
            })
            .collect();
        let world = World::new(9, 3, tiles, 3);

        let mut planner = Planner::new(Difficulty::Normal);
        planner.clear_turn_caches(&world);

        // Left region friendly, right region hostile.
        let left_region = world.tile(0).region as usize;
        let right_region = world.tile(8).region as usize;
        let water_region = world.tile(4).region as usize;
        planner.regions[left_region].friendly_castles = 1;
        planner.regions[right_region].enemy_castles = 1;

        planner.evaluate_region_safety(&world);

        assert!(planner.regions[left_region].safety_factor > 0);
        assert!(planner.regions[right_region].safety_factor < 0);
        // The water between them picks up influence from both.
        assert!(planner.regions[water_region].evaluated);
    }

    #[test]
    fn reveal_fog_hook_registers_new_threats() {
        let mut world = flat_world(8, 1);
        let enemy = add_hero(&mut world, PlayerColor::Red, 6, 20);

        let mut planner = Planner::new(Difficulty::Normal);
        planner.clear_turn_caches(&world);
        assert!(planner.enemy_armies.is_empty());

        // The fog lifts and an enemy hero stands revealed.
        planner.reveal_fog(&mut world, 6, PlayerColor::Blue);
        assert_eq!(planner.map_action_objects.get(&6), Some(&MapObjectKind::Hero));
        assert_eq!(planner.enemy_armies[&6].hero, Some(enemy));
    }

    #[test]
    fn monsters_are_not_enemy_armies() {
        let mut world = flat_world(4, 4);
        world.tile_mut(5).object = Some(map::object::MapObject::with_payload(
            MapObjectKind::Monster,
            map::object::ObjectPayload::Troops(Troop::new(MonsterId::Wolf, 10)),
        ));
        assert!(get_enemy_army_on_tile(&world, PlayerColor::Blue, world.tile(5)).is_none());
    }
}
