//! The kingdom turn driver: target selection per hero, the hero movement
//! loop with its pathfinder configurations, and the actions heroes perform on
//! arrival.

use map::object::MapObjectKind;
use map::object::MapObjectKind as O;
use map::pathfinding::{self, PathStep};
use map::tile::Ground;
use map::world::World;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use ravenmoor_core::color::PlayerColor;
use ravenmoor_core::hero::{Hero, HeroId, HeroRole};
use ravenmoor_core::spell::Spell;
use tracing::{debug, trace};

use crate::commands::AdventureCommand;
use crate::object_value::{
    fog_discovery_intensification_timeout, fog_discovery_value, scale_with_distance_and_time,
    DANGEROUS_TASK_PENALTY,
};
use crate::planner::{set_hero_roles, Planner, PlannerPathfinderScope};
use crate::validator::{ObjectValidator, ObjectValueStorage};

/// Dimension Door is worth casting when walking is impossible or the jumps
/// cover less than half the walking cost.
fn should_use_dimension_door(regular_dist: u32, dimension_door_dist: u32) -> bool {
    if dimension_door_dist == 0 {
        return false;
    }
    regular_dist == pathfinding::UNREACHABLE || dimension_door_dist < regular_dist / 2
}

/// Distance to a tile, preferring the Dimension Door route when it wins.
/// Returns the distance and whether the spell route was chosen.
fn distance_to_tile(planner: &Planner, world: &World, hero: &Hero, index: i32) -> (u32, bool) {
    let regular = planner.pathfinder.get_distance(index);

    let dd_path = planner.pathfinder.build_dimension_door_path(world, hero, index);
    if dd_path.is_empty() {
        return (regular, false);
    }

    let dd_dist = pathfinding::path_penalty(&dd_path);
    debug_assert!(dd_dist > 0);

    if should_use_dimension_door(regular, dd_dist) {
        (dd_dist, true)
    } else {
        (regular, false)
    }
}

/// The courier's main rendezvous: a friendly fighting hero to reinforce, or
/// failing that a friendly castle worth garrisoning.
fn courier_main_target(planner: &mut Planner, world: &World, hero: &Hero, lowest_possible_value: f64) -> i32 {
    debug_assert_eq!(hero.role, HeroRole::Courier);

    let Some(kingdom) = world.kingdom(hero.color) else {
        return -1;
    };

    let mut target_index = -1;
    let mut best_value = lowest_possible_value;

    for &other_id in &kingdom.heroes {
        if other_id == hero.id {
            continue;
        }
        let other = world.hero(other_id);
        if matches!(other.role, HeroRole::Courier | HeroRole::Scout) {
            continue;
        }

        let (dist, _) = distance_to_tile(planner, world, hero, other.position);
        if dist == 0 || dist == pathfinding::UNREACHABLE || hero.has_met(other_id) {
            continue;
        }

        let mut value = hero.meeting_value(other);
        if value < 500.0 {
            continue;
        }
        if other.role == HeroRole::Champion {
            value *= 2.5;
        }
        value -= dist as f64;

        if value > best_value {
            best_value = value;
            target_index = other.position;
        }
    }

    if target_index != -1 {
        return target_index;
    }

    best_value = lowest_possible_value;

    for &castle_id in &kingdom.castles {
        let castle = world.castle(castle_id);
        if castle.hero.is_some() {
            continue;
        }

        let (dist, _) = distance_to_tile(planner, world, hero, castle.position);
        if dist == 0 || dist == pathfinding::UNREACHABLE {
            continue;
        }

        let mut value = castle.visit_value(&kingdom.funds);
        if value < 250.0 {
            continue;
        }

        let safety = planner
            .regions
            .get(world.tile(castle.position).region as usize)
            .map(|stats| stats.safety_factor)
            .unwrap_or(0);
        if safety > 100 {
            value *= 2.0;
        } else if safety < 0 {
            value /= 2.0;
        }

        // Couriers are meant to travel far; no extra distance scaling here.
        value -= dist as f64;

        if value > best_value {
            best_value = value;
            target_index = castle.position;
        }
    }

    target_index
}

/// Per-tile penalties from enemy heroes that could strike there this turn.
fn enemy_threat_penalties(planner: &mut Planner, world: &World, hero: &Hero) -> Vec<f64> {
    let mut result = vec![0.0; world.size() as usize];

    let hero_strength = hero.army.strength();
    let armies: Vec<_> = planner.enemy_armies.values().copied().collect();

    // Use the optimistic pathfinder settings for the enemy heroes: minimal
    // advantage, no spell point reserve.
    let mut scope = PlannerPathfinderScope::new(planner);
    scope.pathfinder.set_minimal_army_strength_advantage(pathfinding::ARMY_ADVANTAGE_DESPERATE);
    scope.pathfinder.set_spell_points_reserve_ratio(0.0);

    for enemy_army in armies {
        // Only heroes on the move pose a one-turn threat.
        let Some(enemy_hero_id) = enemy_army.hero else {
            continue;
        };
        // An enemy no stronger than us is not a threat.
        if hero_strength * pathfinding::ARMY_ADVANTAGE_SMALL >= enemy_army.strength {
            continue;
        }
        if enemy_army.move_points == 0 {
            debug_assert!(false, "enemy army without movement");
            continue;
        }

        // Safe tiles need some margin beyond the enemy's exact reach.
        let threshold = enemy_army.move_points + Ground::SLOWEST_PENALTY * 2;

        // When the enemy cannot cross our path at all, a rough estimate is
        // enough; otherwise pre-cache the pathfinder for the enemy hero.
        let use_rough_estimate = world.approximate_distance(hero.position, enemy_army.index)
            * Ground::FASTEST_PENALTY
            > hero.move_points + threshold;

        if !use_rough_estimate {
            let enemy_hero = world.hero(enemy_hero_id).clone();
            scope.pathfinder.re_evaluate_if_needed(world, &enemy_hero);
        }

        for index in 0..world.size() {
            let (dist, safe) = if index == enemy_army.index {
                // The enemy's own tile is never safe.
                (0, false)
            } else if use_rough_estimate {
                let dist = world.approximate_distance(index, enemy_army.index) * Ground::FASTEST_PENALTY;
                (dist, dist > threshold)
            } else {
                let dist = scope.pathfinder.get_distance(index);
                (dist, dist == pathfinding::UNREACHABLE || dist > threshold)
            };

            if safe {
                continue;
            }

            // Penalties accumulate across threatening heroes, growing as the
            // enemy draws closer.
            result[index as usize] += DANGEROUS_TASK_PENALTY * (2.0 - dist as f64 / threshold as f64);
        }
    }

    result
}

/// Target selection: the best (object, value) pair for one hero, fog
/// discovery included. Returns the tile index and its priority.
pub(crate) fn get_priority_target(planner: &mut Planner, world: &World, hero_id: HeroId) -> (i32, f64) {
    let hero = world.hero(hero_id).clone();
    trace!(hero = hero.name.as_str(), position = hero.position, "searching for a map target");

    let lowest_possible_value = -1.0 * Ground::SLOWEST_PENALTY as f64 * world.size() as f64;

    let mut priority_target = -1;
    let mut max_priority = lowest_possible_value;

    let penalties = enemy_threat_penalties(planner, world, &hero);

    planner.pathfinder.re_evaluate_if_needed(world, &hero);

    let mut validator = ObjectValidator::new(&hero);
    let mut value_storage = ObjectValueStorage::new(lowest_possible_value);

    // Shared scoring tail: pick up objects on the way, subtract the enemy
    // threat penalty, discourage out-of-reach targets and scale by distance.
    let finalize_value = |planner: &mut Planner,
                          validator: &mut ObjectValidator,
                          value_storage: &mut ObjectValueStorage,
                          destination: i32,
                          mut distance: u32,
                          mut value: f64,
                          kind: MapObjectKind,
                          is_dimension_door: bool| {
        if !is_dimension_door {
            for (object_index, object_kind) in planner.pathfinder.get_objects_on_the_way(world, destination) {
                if !validator.is_valid(planner, world, &hero, object_index) {
                    continue;
                }
                if planner.map_action_objects.get(&object_index) != Some(&object_kind) {
                    continue;
                }
                let extra = value_storage.value(planner, world, &hero, object_index, object_kind, 0);
                if extra > 0.0 {
                    value += extra;
                }
            }
        }

        let penalty = if kind == O::Castle {
            // Defending our own castle is exempt when we can make it there
            // this turn: reinforcements wait inside.
            let own_reachable = world
                .castle_entrance(destination)
                .map(|castle| castle.color == hero.color && distance <= hero.move_points)
                .unwrap_or(false);
            if own_reachable {
                0.0
            } else {
                penalties[destination as usize]
            }
        } else {
            penalties[destination as usize]
        };
        value -= penalty;

        // Distant objects out of reach for this turn lose priority faster.
        if distance > hero.move_points {
            distance = hero.move_points + (distance - hero.move_points) * 2;
        }

        scale_with_distance_and_time(value, distance, kind, world.count_day())
    };

    // The courier's rendezvous is the baseline; anything scoring above zero
    // may still override it.
    if hero.role == HeroRole::Courier {
        let courier_target = courier_main_target(planner, world, &hero, lowest_possible_value);
        if courier_target != -1 {
            max_priority = 0.0;
            priority_target = courier_target;
            debug!(hero = hero.name.as_str(), target = courier_target, "courier rendezvous chosen");
        }
    }

    let candidates: Vec<(i32, MapObjectKind)> = {
        let mut entries: Vec<_> = planner.map_action_objects.iter().map(|(&k, &v)| (k, v)).collect();
        // Deterministic evaluation order.
        entries.sort_by_key(|&(index, _)| index);
        entries
    };

    for (index, kind) in candidates {
        if !validator.is_valid(planner, world, &hero, index) {
            continue;
        }

        let (dist, use_dimension_door) = distance_to_tile(planner, world, &hero, index);
        if dist == 0 || dist == pathfinding::UNREACHABLE {
            continue;
        }

        let value = value_storage.value(planner, world, &hero, index, kind, dist);
        let value = finalize_value(planner, &mut validator, &mut value_storage, index, dist, value, kind, use_dimension_door);

        if value > max_priority {
            max_priority = value;
            priority_target = index;
            trace!(index, value, ?kind, "target candidate");
        }
    }

    // Fog discovery competes with real objects.
    let mut discovery_value = fog_discovery_value(&hero);
    let (discovery_target, expands_territory) = planner.pathfinder.get_fog_discovery_tile(world, &hero);

    if discovery_target >= 0 {
        let (discovery_dist, use_dimension_door) = distance_to_tile(planner, world, &hero, discovery_target);

        if expands_territory {
            let period = fog_discovery_intensification_timeout(&hero);
            debug_assert!(period > 0);

            if discovery_value < 0.0 {
                // Opening new territory is worth much more than idly peeling
                // back the fog; the urge grows with the calendar.
                if world.count_day() > period {
                    discovery_value = 0.0;
                } else {
                    discovery_value = discovery_value / 2.0 * (period - world.count_day()) as f64 / period as f64;
                }
            } else {
                discovery_value += (1000.0 * world.count_day() as f64 / period as f64).min(1000.0);
            }
        }

        let discovery_value = finalize_value(
            planner,
            &mut validator,
            &mut value_storage,
            discovery_target,
            discovery_dist,
            discovery_value,
            O::None,
            use_dimension_door,
        );

        if priority_target == -1 || discovery_value > max_priority {
            priority_target = discovery_target;
            max_priority = discovery_value;
            debug!(hero = hero.name.as_str(), target = priority_target, "scouting the fog");
        }
    }

    (priority_target, max_priority)
}

/// Resolves what happens when the hero arrives at an action object. This is
/// the thin slice of the rules engine the planner needs to keep its own loop
/// consistent; battles chosen by the planner are treated as won since the
/// validity filter demanded an overwhelming advantage beforehand.
fn resolve_tile_action(planner: &mut Planner, world: &mut World, hero_id: HeroId, index: i32) {
    let kind = world.tile(index).object_kind(true);
    let hero_color = world.hero(hero_id).color;

    world.visits.mark(hero_id, hero_color, index, kind);

    match kind {
        O::TreasureChest | O::SeaChest | O::Resource | O::Campfire | O::Flotsam | O::MagicGarden | O::LeanTo
        | O::WaterWheel | O::Windmill | O::DerelictShip | O::DaemonCave | O::Bottle => {
            let loot = world.tile(index).object.as_ref().and_then(|object| object.funds()).unwrap_or_default();
            if let Some(kingdom) = world.kingdom_mut(hero_color) {
                kingdom.funds += loot;
            }
            world.remove_object(index);
        }

        O::Artifact | O::ShipwreckSurvivor | O::Skeleton | O::Wagon | O::Graveyard | O::Shipwreck => {
            if let Some(artifact) = world.tile(index).object.as_ref().and_then(|object| object.artifact()) {
                world.hero_mut(hero_id).bag.push(artifact);
            }
            world.remove_object(index);
        }

        O::Monster | O::AbandonedMine => {
            // The guards are defeated; a mine starts producing for us.
            if kind == O::AbandonedMine {
                if let Some(object) = world.tile_mut(index).object.as_mut() {
                    object.guard = Option::None;
                    object.owner = hero_color;
                }
            } else {
                world.remove_object(index);
            }
        }

        O::Mine | O::Sawmill | O::AlchemistLab | O::Lighthouse => {
            if let Some(object) = world.tile_mut(index).object.as_mut() {
                object.guard = Option::None;
                object.owner = hero_color;
            }
        }

        O::PeasantHut | O::GoblinHut | O::ArcherHouse | O::DwarfCottage | O::TreeHouse | O::WatchTower | O::Cave
        | O::Excavation | O::HalflingHole => {
            if let Some(troop) = world.tile(index).object.as_ref().and_then(|object| object.troop()) {
                world.hero_mut(hero_id).army.join_troop(troop.monster, troop.count);
            }
            if let Some(object) = world.tile_mut(index).object.as_mut() {
                object.payload = map::object::ObjectPayload::None;
            }
        }

        O::Ruins | O::TreeCity | O::WagonCamp | O::DesertTent | O::GenieLamp | O::BarrowMounds | O::AirAltar
        | O::EarthAltar | O::FireAltar | O::WaterAltar | O::CityOfDead | O::DragonCity | O::TrollBridge => {
            let troop = world.tile(index).object.as_ref().and_then(|object| object.troop());
            if let Some(troop) = troop {
                let affordable = world
                    .kingdom(hero_color)
                    .map(|kingdom| kingdom.funds.lowest_quotient(&troop.monster.stats().cost))
                    .unwrap_or(0)
                    .min(troop.count);
                if affordable > 0 {
                    let price = troop.monster.stats().cost * affordable as i32;
                    if let Some(kingdom) = world.kingdom_mut(hero_color) {
                        kingdom.pay(&price);
                    }
                    world.hero_mut(hero_id).army.join_troop(troop.monster, affordable);
                    if let Some(object) = world.tile_mut(index).object.as_mut() {
                        object.guard = Option::None;
                        object.payload = map::object::ObjectPayload::Troops(ravenmoor_core::troop::Troop::new(
                            troop.monster,
                            troop.count - affordable,
                        ));
                    }
                }
            }
        }

        O::Castle => {
            let Some(castle_id) = world.castle_entrance_id(index) else {
                return;
            };
            let castle_color = world.castle(castle_id).color;
            if castle_color == hero_color {
                world.castle_mut(castle_id).hero = Some(hero_id);
            } else {
                // The siege is won: the castle changes hands.
                if let Some(old_kingdom) = world.kingdom_mut(castle_color) {
                    old_kingdom.castles.retain(|&id| id != castle_id);
                }
                let castle = world.castle_mut(castle_id);
                castle.color = hero_color;
                castle.garrison = ravenmoor_core::troop::Army::new();
                castle.hero = Some(hero_id);
                if let Some(kingdom) = world.kingdom_mut(hero_color) {
                    kingdom.castles.push(castle_id);
                }
            }
        }

        O::Hero => {
            let Some(other) = world.hero_at(index) else {
                return;
            };
            let other_id = other.id;
            if other.color == hero_color {
                // Friendly meeting: hand the stronger army what it can take.
                let mut other_army = world.hero(other_id).army.clone();
                let mut hero_army = world.hero(hero_id).army.clone();
                other_army.join_strongest_from(&mut hero_army);
                world.hero_mut(hero_id).army = hero_army;
                world.hero_mut(other_id).army = other_army;
                world.hero_mut(hero_id).mark_met(other_id);
                world.hero_mut(other_id).mark_met(hero_id);
            } else {
                // The defender loses; his kingdom forgets him.
                let other_color = world.hero(other_id).color;
                world.remove_hero_from_map(other_id);
                if let Some(kingdom) = world.kingdom_mut(other_color) {
                    kingdom.heroes.retain(|&id| id != other_id);
                }
            }
        }

        O::Jail => {
            // A grateful prisoner joins the cause.
            let new_id = HeroId(world.heroes.len() as u32);
            let mut freed = Hero::new(new_id, "Freed", hero_color, index);
            freed.army.join_troop(ravenmoor_core::monster::MonsterId::Swordsman, 5);
            world.heroes.push(freed);
            if let Some(kingdom) = world.kingdom_mut(hero_color) {
                kingdom.heroes.push(new_id);
            }
            world.remove_object(index);
        }

        O::MagicWell | O::ArtesianSpring => {
            let hero = world.hero_mut(hero_id);
            let max = hero.max_spell_points();
            hero.spell_points = if kind == O::ArtesianSpring { max * 2 } else { max };
        }

        _ => {}
    }

    planner.heroes_action_complete(world, hero_id, index, kind);
}

/// Walks the hero along the path, spending movement points and handling the
/// Summon Boat transparency of water crossings. Stops early when the budget
/// runs out.
fn walk_path(planner: &mut Planner, world: &mut World, hero_id: HeroId, path: &[PathStep]) {
    for step in path {
        let (active, move_points, position) = {
            let hero = world.hero(hero_id);
            (hero.is_active(), hero.move_points, hero.position)
        };
        if !active || move_points == 0 {
            break;
        }

        if step.is_castle_teleport(world) {
            // A Town Gate/Portal hop. The spell points may have been spent on
            // the way here, so the affordability is re-checked on execution.
            let spell = if world.hero(hero_id).have_spell(Spell::TownPortal) {
                Spell::TownPortal
            } else {
                Spell::TownGate
            };
            if !world.hero(hero_id).can_cast_spell(spell) {
                world.hero_mut(hero_id).move_points = 0;
                return;
            }
            let cost = spell.cost();
            world.hero_mut(hero_id).spell_points -= cost;
        }

        let crossing_onto_open_water =
            !world.tile(position).is_water() && world.tile(step.index).is_water() && world.tile(step.index).object.is_none();
        if crossing_onto_open_water {
            // The crossing depends on Summon Boat; spell points may have been
            // drained on the way. Re-check before committing, abort otherwise.
            if !world.hero(hero_id).can_cast_spell(Spell::SummonBoat) {
                world.hero_mut(hero_id).move_points = 0;
                return;
            }
            let cost = Spell::SummonBoat.cost();
            world.hero_mut(hero_id).spell_points -= cost;
        }

        let charge = step.penalty.min(world.hero(hero_id).move_points);
        world.hero_mut(hero_id).move_points -= charge;
        world.relocate_hero(hero_id, step.index);
        planner.update_map_action_object_cache(world, step.from);
        planner.update_map_action_object_cache(world, step.index);
    }

    let position = world.hero(hero_id).position;
    if world.tile(position).object_kind(true).is_action_object() {
        resolve_tile_action(planner, world, hero_id, position);
    }
}

/// Records the commands a built path implies: a castle teleport cast first
/// when the route starts with one, then the move or attack itself.
fn push_travel_commands(
    world: &World,
    hero_id: HeroId,
    target: i32,
    guarded_target: bool,
    path: &[PathStep],
    commands: &mut Vec<AdventureCommand>,
) {
    if let Some(first) = path.first() {
        if first.is_castle_teleport(world) {
            let spell = if world.hero(hero_id).have_spell(Spell::TownPortal) {
                Spell::TownPortal
            } else {
                Spell::TownGate
            };
            commands.push(AdventureCommand::Cast { hero: hero_id, spell, target: first.index });
        }
    }

    let destination = path.last().map(|step| step.index).unwrap_or(target);
    commands.push(if guarded_target && destination == target {
        AdventureCommand::Attack { hero: hero_id, target }
    } else {
        AdventureCommand::Move { hero: hero_id, to: destination }
    });
}

/// Dispatches one hero toward the chosen target, by foot or by Dimension
/// Door, and keeps every cache in sync along the way.
fn move_hero_towards(
    planner: &mut Planner,
    world: &mut World,
    hero_id: HeroId,
    target: i32,
    commands: &mut Vec<AdventureCommand>,
) {
    let hero = world.hero(hero_id).clone();
    planner.pathfinder.re_evaluate_if_needed(world, &hero);

    let guarded_target = world.tile(target).is_guarded()
        || world
            .hero_at(target)
            .map(|other| !world.are_friends(other.color, hero.color))
            .unwrap_or(false);

    let mut dd_path = planner.pathfinder.build_dimension_door_path(world, &hero, target);
    let regular_dist = planner.pathfinder.get_distance(target);
    let mut dd_dist = pathfinding::path_penalty(&dd_path);

    if should_use_dimension_door(regular_dist, dd_dist) {
        while should_use_dimension_door(planner.pathfinder.get_distance(target), dd_dist) && !dd_path.is_empty() {
            let jump = dd_path.remove(0);
            dd_dist -= jump.penalty;

            let spell_cost = Spell::DimensionDoor.cost();
            let previous_position = world.hero(hero_id).position;
            {
                let hero = world.hero_mut(hero_id);
                hero.spell_points = hero.spell_points.saturating_sub(spell_cost);
                hero.move_points = hero.move_points.saturating_sub(jump.penalty);
                hero.dimension_door_casts += 1;
            }
            commands.push(AdventureCommand::Cast { hero: hero_id, spell: Spell::DimensionDoor, target: jump.index });
            world.relocate_hero(hero_id, jump.index);

            // The jump can land straight in the fog, revealing new tiles.
            planner.update_map_action_object_cache(world, previous_position);
            planner.update_map_action_object_cache(world, jump.index);

            let hero = world.hero(hero_id).clone();
            planner.pathfinder.re_evaluate_if_needed(world, &hero);
        }

        if planner.pathfinder.get_distance(target) > 0 {
            // The rest of the way is walked.
            let hero = world.hero(hero_id).clone();
            planner.pathfinder.re_evaluate_if_needed(world, &hero);
            let path = planner.pathfinder.build_path(world, target);
            if !path.is_empty() {
                push_travel_commands(world, hero_id, target, guarded_target, &path, commands);
                walk_path(planner, world, hero_id, &path);
            }
        }
    } else {
        let path = planner.pathfinder.build_path(world, target);
        if path.is_empty() {
            // Nothing to do: the target became unreachable mid-turn.
            world.hero_mut(hero_id).move_points = 0;
            return;
        }
        push_travel_commands(world, hero_id, target, guarded_target, &path, commands);
        walk_path(planner, world, hero_id, &path);
    }

    let hero = world.hero(hero_id);
    if hero.is_active() && hero.position != target {
        // Could not make it all the way; the remaining budget would only be
        // wasted re-planning the same route.
        if world.hero(hero_id).move_points < Ground::FASTEST_PENALTY {
            world.hero_mut(hero_id).move_points = 0;
        }
    }
}

/// The hero movement phase: repeatedly pick the kingdom-wide best
/// (hero, target) pair under progressively looser pathfinder configurations
/// and dispatch it. Returns true when every hero was kept busy to the end of
/// its movement, i.e. there would have been more to do with more heroes.
pub(crate) fn heroes_turn(
    planner: &mut Planner,
    world: &mut World,
    my_color: PlayerColor,
    commands: &mut Vec<AdventureCommand>,
) -> bool {
    let mut available: Vec<HeroId> = world
        .kingdom(my_color)
        .map(|kingdom| kingdom.heroes.clone())
        .unwrap_or_default()
        .into_iter()
        .filter(|&id| {
            let hero = world.hero(id);
            !(hero.patrol && hero.patrol_distance == 0) && hero.may_still_move()
        })
        .collect();

    let losing = world.kingdom(my_color).map(|kingdom| kingdom.is_losing_game()).unwrap_or(false);

    const COMMON_CONFIGURATIONS: [(f64, f64); 3] = [
        (pathfinding::ARMY_ADVANTAGE_LARGE, 0.5),
        (pathfinding::ARMY_ADVANTAGE_MEDIUM, 0.25),
        (pathfinding::ARMY_ADVANTAGE_SMALL, 0.0),
    ];
    const EMERGENCY_CONFIGURATIONS: [(f64, f64); 1] = [(pathfinding::ARMY_ADVANTAGE_DESPERATE, 0.0)];

    while !available.is_empty() {
        // The configuration that found the target stays in effect for the
        // whole dispatch; the scope restores the tuning afterwards.
        let mut scope = PlannerPathfinderScope::new(planner);

        let mut best_hero = available[0];
        let mut best_target = -1;

        let configurations: &[(f64, f64)] = if losing { &EMERGENCY_CONFIGURATIONS } else { &COMMON_CONFIGURATIONS };

        for &(advantage, reserve) in configurations {
            scope.pathfinder.set_minimal_army_strength_advantage(advantage);
            scope.pathfinder.set_spell_points_reserve_ratio(reserve);

            let mut max_priority = 0.0;
            for &hero_id in &available {
                let (target, priority) = get_priority_target(&mut scope, world, hero_id);
                if target != -1 && (priority > max_priority || best_target == -1) {
                    max_priority = priority;
                    best_target = target;
                    best_hero = hero_id;
                }
            }

            if best_target != -1 {
                break;
            }
        }

        if best_target == -1 {
            // Perhaps a hero is standing in everyone's way. Shuffle for
            // fairness (deterministically) and nudge the first blocker.
            let mut rng = rand::rngs::StdRng::seed_from_u64(world.seed() ^ world.count_day() as u64);
            available.shuffle(&mut rng);

            for &hero_id in &available {
                if world.hero_in_castle(hero_id).is_some() {
                    continue;
                }
                let hero = world.hero(hero_id).clone();
                if !map::pathfinding::AiWorldPathfinder::is_hero_possibly_blocking_way(world, &hero) {
                    continue;
                }
                scope.pathfinder.re_evaluate_if_needed(world, &hero);
                let nearest = scope.pathfinder.get_nearest_tile_to_move(world);
                if nearest != -1 {
                    best_target = nearest;
                    best_hero = hero_id;
                    debug!(hero = hero.name.as_str(), target = nearest, "unblocking a stuck hero");
                    break;
                }
            }
        }

        if best_target == -1 {
            // Nothing left to do this turn.
            break;
        }

        let heroes_before = world.kingdom(my_color).map(|kingdom| kingdom.heroes.len()).unwrap_or(0);

        move_hero_towards(&mut scope, world, best_hero, best_target, commands);

        // A Jail on the way can add a hero mid-loop; insert them.
        let kingdom_heroes = world.kingdom(my_color).map(|kingdom| kingdom.heroes.clone()).unwrap_or_default();
        if kingdom_heroes.len() > heroes_before {
            if let Some(&new_hero) = kingdom_heroes.last() {
                if world.hero(new_hero).may_still_move() {
                    available.push(new_hero);
                }
            }
        }

        available.retain(|&id| world.hero(id).may_still_move());
    }

    available.is_empty()
}

/// One full kingdom turn.
pub(crate) fn kingdom_turn(planner: &mut Planner, world: &mut World, my_color: PlayerColor) -> Vec<AdventureCommand> {
    let mut commands = Vec::new();

    // Step 1: fresh caches for the new day.
    planner.clear_turn_caches(world);

    let Some(kingdom) = world.kingdom(my_color) else {
        return commands;
    };
    if kingdom.is_loss() || !my_color.is_valid() {
        return commands;
    }

    let heroes: Vec<HeroId> = kingdom.heroes.clone();
    debug!(?my_color, heroes = heroes.len(), castles = kingdom.castles.len(), "kingdom turn begins");

    // Wake everyone up and try a View All sweep from the best caster.
    let mut under_view_all = false;
    let mut available_hero_count = 0;
    for &hero_id in &heroes {
        let hero = world.hero_mut(hero_id);
        hero.sleeper = false;
        hero.dimension_door_casts = 0;
        if !hero.patrol {
            available_hero_count += 1;
        }
    }
    for &hero_id in &heroes {
        let hero = world.hero(hero_id);
        if hero.can_cast_spell(Spell::ViewAll) {
            let cost = Spell::ViewAll.cost();
            world.hero_mut(hero_id).spell_points -= cost;
            commands.push(AdventureCommand::Cast { hero: hero_id, spell: Spell::ViewAll, target: -1 });
            under_view_all = true;
            break;
        }
    }

    // Step 2: scan the visible map.
    planner.scan_map(world, my_color, under_view_all);

    // Step 3: region safety.
    planner.evaluate_region_safety(world);

    // Step 4: budget.
    planner.update_kingdom_budget(world, my_color);

    let mut castles_in_danger;
    let mut sorted_castles;

    // Step 5: the hero loop, repeated while recruiting adds new actors.
    loop {
        let heroes: Vec<HeroId> = world.kingdom(my_color).map(|kingdom| kingdom.heroes.clone()).unwrap_or_default();

        // Heroes idling in castles pick up reinforcements.
        for &hero_id in &heroes {
            let position = world.hero(hero_id).position;
            planner.heroes_action_complete(world, hero_id, position, O::None);
        }

        set_hero_roles(world, &heroes, planner.difficulty);

        castles_in_danger = crate::castle_turn::find_castles_in_danger(planner, world, my_color);
        for &hero_id in &heroes {
            let position = world.hero(hero_id).position;
            if castles_in_danger.contains(&position) {
                // The hero would lose in the open field; lock them inside.
                let kind = world.tile(position).object_kind(true);
                planner.heroes_action_complete(world, hero_id, position, kind);
                world.hero_mut(hero_id).sleeper = true;
            }
        }

        sorted_castles = crate::castle_turn::sorted_castle_list(planner, world, my_color, &castles_in_danger);

        let more_tasks = heroes_turn(planner, world, my_color, &mut commands);

        if crate::castle_turn::purchase_new_heroes(
            planner,
            world,
            my_color,
            &sorted_castles,
            &castles_in_danger,
            available_hero_count,
            more_tasks,
            &mut commands,
        ) {
            if let Some(&new_hero) = world
                .kingdom(my_color)
                .and_then(|kingdom| kingdom.heroes.last())
            {
                let position = world.hero(new_hero).position;
                planner.update_map_action_object_cache(world, position);
            }
            available_hero_count += 1;
            continue;
        }

        if !more_tasks && world.is_last_day_of_week() {
            // Idle heroes on the last day of the week head home for the
            // week's fresh troops and full spell points.
            let mut new_tasks = false;
            let castles = world.kingdom(my_color).map(|kingdom| kingdom.castles.clone()).unwrap_or_default();
            for castle_id in castles {
                let castle = world.castle(castle_id);
                if castle.hero.is_none() {
                    let position = castle.position;
                    if !planner.priority_targets.contains_key(&position) {
                        planner
                            .priority_targets
                            .insert(position, crate::priority::PriorityTask::new(crate::priority::PriorityTaskType::Reinforce));
                        new_tasks = true;
                    }
                }
            }
            if new_tasks {
                continue;
            }
        }

        break;
    }

    // Heroes left with movement but nothing to spend it on stand down; the
    // next dawn wakes everyone again.
    let heroes: Vec<HeroId> = world.kingdom(my_color).map(|kingdom| kingdom.heroes.clone()).unwrap_or_default();
    for hero_id in heroes {
        if world.hero(hero_id).may_still_move() {
            world.hero_mut(hero_id).sleeper = true;
        }
    }

    // Sync the castle lists if anything got captured during the turn.
    let castle_count = world.kingdom(my_color).map(|kingdom| kingdom.castles.len()).unwrap_or(0);
    if castle_count != sorted_castles.len() {
        planner.evaluate_region_safety(world);
        castles_in_danger = crate::castle_turn::find_castles_in_danger(planner, world, my_color);
        sorted_castles = crate::castle_turn::sorted_castle_list(planner, world, my_color, &castles_in_danger);
    }

    // Step 6: castle development in danger/value order.
    for entry in &sorted_castles {
        crate::castle_turn::castle_turn(planner, world, entry.castle, entry.under_threat, &mut commands);
    }

    // Step 7: castle-resident heroes park their slowest troop in the
    // garrison for tomorrow's movement bonus.
    let heroes: Vec<HeroId> = world.kingdom(my_color).map(|kingdom| kingdom.heroes.clone()).unwrap_or_default();
    for hero_id in heroes {
        if let Some(castle_id) = world.hero_in_castle(hero_id) {
            crate::castle_turn::transfer_slowest_troops_to_garrison(world, hero_id, castle_id);
        }
    }

    commands
}

#[cfg(test)]
mod tests {
    use super::*;
    use map::object::{MapObject, ObjectPayload};
    use map::tile::Tile;
    use ravenmoor_core::difficulty::Difficulty;
    use ravenmoor_core::kingdom::{Control, Kingdom};
    use ravenmoor_core::monster::MonsterId;
    use ravenmoor_core::troop::Troop;

    fn open_world(width: i32, height: i32) -> World {
        let tiles = (0..width * height).map(|index| Tile::new(index, Ground::Grass)).collect();
        let mut world = World::new(width, height, tiles, 0xfeed);
        world.kingdoms.push(Kingdom::new(PlayerColor::Blue, Control::Ai));
        world.kingdoms.push(Kingdom::new(PlayerColor::Red, Control::Ai));
        for index in 0..width * height {
            world.tile_mut(index).reveal(PlayerColor::Blue);
        }
        world
    }

    fn add_hero(world: &mut World, name: &str, color: PlayerColor, position: i32) -> HeroId {
        let id = HeroId(world.heroes.len() as u32);
        let mut hero = Hero::new(id, name, color, position);
        hero.army.join_troop(MonsterId::Swordsman, 30);
        world.heroes.push(hero);
        if let Some(kingdom) = world.kingdom_mut(color) {
            kingdom.heroes.push(id);
        }
        world.relocate_hero(id, position);
        id
    }

    #[test]
    fn courier_adopts_the_champion_as_rendezvous() {
        // S6: an unmet friendly champion at range becomes the courier's
        // baseline target with priority zero; worthless objects cannot
        // override it.
        let mut world = open_world(20, 2);
        let courier = add_hero(&mut world, "Post", PlayerColor::Blue, 0);
        world.hero_mut(courier).role = HeroRole::Courier;
        world.hero_mut(courier).bag.push(ravenmoor_core::artifact::Artifact::SwordOfDominion);

        let champion = add_hero(&mut world, "Aldric", PlayerColor::Blue, 15);
        world.hero_mut(champion).role = HeroRole::Champion;
        world.hero_mut(champion).army.join_troop(MonsterId::Paladin, 10);

        let mut planner = Planner::new(Difficulty::Normal);
        planner.clear_turn_caches(&world);
        planner.scan_map(&world, PlayerColor::Blue, false);

        let (target, priority) = get_priority_target(&mut planner, &world, courier);
        assert_eq!(target, 15);
        assert!(priority >= 0.0);
    }

    #[test]
    fn hero_without_movement_emits_no_commands() {
        let mut world = open_world(10, 10);
        let hero = add_hero(&mut world, "Tired", PlayerColor::Blue, 0);
        world.hero_mut(hero).move_points = 0;
        world.tile_mut(55).object = Some(MapObject::new(O::TreasureChest));

        let mut planner = Planner::new(Difficulty::Normal);
        let commands = planner.kingdom_turn(&mut world, PlayerColor::Blue);
        assert!(commands.is_empty(), "got {commands:?}");
    }

    #[test]
    fn kingdom_turn_is_reproducible() {
        let build = || {
            let mut world = open_world(16, 8);
            add_hero(&mut world, "Mira", PlayerColor::Blue, 0);
            world.tile_mut(20).object = Some(MapObject::new(O::TreasureChest));
            world.tile_mut(52).object = Some(MapObject::with_payload(
                O::Mine,
                ObjectPayload::Income(ravenmoor_core::resource::Funds::from_resource(
                    ravenmoor_core::resource::ResourceKind::Ore,
                    2,
                )),
            ));
            world.tile_mut(90).object = Some(MapObject::with_payload(
                O::Monster,
                ObjectPayload::Troops(Troop::new(MonsterId::Goblin, 4)),
            ));
            world
        };

        let mut first_world = build();
        let mut first_planner = Planner::new(Difficulty::Normal);
        let first_commands = first_planner.kingdom_turn(&mut first_world, PlayerColor::Blue);

        let mut second_world = build();
        let mut second_planner = Planner::new(Difficulty::Normal);
        let second_commands = second_planner.kingdom_turn(&mut second_world, PlayerColor::Blue);

        assert_eq!(first_commands, second_commands);
        assert!(!first_commands.is_empty());
    }

    #[test]
    fn heroes_stand_down_after_the_turn() {
        let mut world = open_world(12, 6);
        let hero = add_hero(&mut world, "Mira", PlayerColor::Blue, 0);
        world.tile_mut(30).object = Some(MapObject::new(O::TreasureChest));

        let mut planner = Planner::new(Difficulty::Normal);
        planner.kingdom_turn(&mut world, PlayerColor::Blue);

        // Whatever happened during the day, nobody is left half-committed.
        assert!(!world.hero(hero).may_still_move());
    }

    #[test]
    fn hero_walks_to_the_chest_and_takes_it() {
        let mut world = open_world(12, 2);
        let hero = add_hero(&mut world, "Mira", PlayerColor::Blue, 0);
        world.tile_mut(5).object = Some(MapObject::with_payload(
            O::TreasureChest,
            ObjectPayload::FundsReward(ravenmoor_core::resource::Funds::gold(1500)),
        ));
        let gold_before = world.kingdom(PlayerColor::Blue).unwrap().funds.gold;

        let mut planner = Planner::new(Difficulty::Normal);
        let commands = planner.kingdom_turn(&mut world, PlayerColor::Blue);

        assert!(commands.iter().any(|command| matches!(command, AdventureCommand::Move { .. })));
        assert!(world.tile(5).object.is_none(), "the chest should be gone");
        assert_eq!(world.kingdom(PlayerColor::Blue).unwrap().funds.gold, gold_before + 1500);
        assert_eq!(world.hero(hero).position, 5);
    }
}
