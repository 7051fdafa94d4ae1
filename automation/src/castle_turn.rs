//! Castle-side decisions of the kingdom turn: danger assessment, hero
//! recruitment, reinforcement and the building order.

use std::collections::HashSet;

use map::world::World;
use ravenmoor_core::castle::{building, CastleId};
use ravenmoor_core::color::PlayerColor;
use ravenmoor_core::hero::{HeroId, HeroRole};
use ravenmoor_core::resource::Funds;
use ravenmoor_core::spell::Spell;
use tracing::debug;

use crate::commands::AdventureCommand;
use crate::planner::{Planner, PlannerPathfinderScope, TemporaryHeroEraser};
use crate::priority::EnemyArmy;

/// Spells taught by each mage guild level.
const GUILD_SPELLS: [&[Spell]; 5] = [
    &[Spell::Haste, Spell::Bless, Spell::Curse, Spell::Slow],
    &[Spell::Blind, Spell::LightningBolt, Spell::Steelskin, Spell::SummonBoat],
    &[Spell::Fireball, Spell::AntiMagic, Spell::Paralyze, Spell::Teleport],
    &[Spell::ChainLightning, Spell::MassSlow, Spell::Resurrect, Spell::TownGate],
    &[Spell::Armageddon, Spell::MirrorImage, Spell::ResurrectTrue, Spell::DimensionDoor],
];

/// One entry of the castle processing order.
#[derive(Debug, Clone, Copy)]
pub(crate) struct SortedCastle {
    pub castle: CastleId,
    pub under_threat: bool,
    pub safety_factor: i32,
    pub building_value: i32,
}

/// Castles ordered by urgency: threatened first, then the ones whose building
/// value outweighs their safety.
pub(crate) fn sorted_castle_list(
    planner: &Planner,
    world: &World,
    my_color: PlayerColor,
    castles_in_danger: &HashSet<i32>,
) -> Vec<SortedCastle> {
    let Some(kingdom) = world.kingdom(my_color) else {
        return Vec::new();
    };

    let mut list: Vec<SortedCastle> = kingdom
        .castles
        .iter()
        .map(|&castle_id| {
            let castle = world.castle(castle_id);
            let region = world.tile(castle.position).region as usize;
            SortedCastle {
                castle: castle_id,
                under_threat: castles_in_danger.contains(&castle.position),
                safety_factor: planner.regions.get(region).map(|stats| stats.safety_factor).unwrap_or(0),
                building_value: castle.building_value(),
            }
        })
        .collect();

    list.sort_by(|left, right| {
        if left.under_threat != right.under_threat {
            // Threatened castles always come first.
            return right.under_threat.cmp(&left.under_threat);
        }
        if !left.under_threat {
            // Safer castles develop first when nothing is burning.
            return right.safety_factor.cmp(&left.safety_factor);
        }
        // Between two threatened castles, weigh the building value against the
        // opposite castle's safety: the higher the safety, the lower the
        // urgency to defend.
        (right.building_value * left.safety_factor).cmp(&(left.building_value * right.safety_factor))
    });

    list
}

/// Castles an enemy army could reach within three days, estimated with our
/// own heroes lifted off the map and the optimistic pathfinder settings.
pub(crate) fn find_castles_in_danger(planner: &mut Planner, world: &mut World, my_color: PlayerColor) -> HashSet<i32> {
    let mut result = HashSet::new();

    let Some(kingdom) = world.kingdom(my_color) else {
        return result;
    };
    let heroes = kingdom.heroes.clone();
    let castles = kingdom.castles.clone();
    let armies: Vec<EnemyArmy> = planner.enemy_armies.values().copied().collect();

    let eraser = TemporaryHeroEraser::new(world, &heroes);
    let mut scope = PlannerPathfinderScope::new(planner);
    scope.pathfinder.set_minimal_army_strength_advantage(map::pathfinding::ARMY_ADVANTAGE_DESPERATE);
    scope.pathfinder.set_spell_points_reserve_ratio(0.0);

    for enemy_army in &armies {
        for &castle_id in &castles {
            if scope.update_individual_priority_for_castle(eraser.world(), castle_id, enemy_army) {
                result.insert(eraser.world().castle(castle_id).position);
            }
        }
    }

    result
}

/// Buys the better of the two tavern recruits into the castle. Heroes tied to
/// the map's victory or loss conditions are never re-hired.
pub(crate) fn recruit_hero(
    world: &mut World,
    castle_id: CastleId,
    buy_army: bool,
    planner: &mut Planner,
    commands: &mut Vec<AdventureCommand>,
) -> bool {
    const HERO_HIRE_COST: i32 = 2500;

    let color = world.castle(castle_id).color;
    let Some(kingdom) = world.kingdom(color) else {
        return false;
    };
    if !kingdom.funds.allows_payment(&Funds::gold(HERO_HIRE_COST)) {
        return false;
    }

    let recruit = kingdom
        .recruits
        .iter()
        .copied()
        .filter(|&id| world.victory.target_hero != Some(id))
        .max_by(|&left, &right| world.hero(left).recruit_value().total_cmp(&world.hero(right).recruit_value()));
    let Some(recruit) = recruit else {
        return false;
    };

    let position = world.castle(castle_id).position;
    {
        let kingdom = world.kingdom_mut(color).expect("kingdom checked above");
        kingdom.pay(&Funds::gold(HERO_HIRE_COST));
        kingdom.recruits.retain(|&id| id != recruit);
        kingdom.heroes.push(recruit);
    }
    {
        let hero = world.hero_mut(recruit);
        hero.color = color;
        hero.active = true;
        hero.sleeper = false;
        let max_move = hero.max_move_points();
        hero.move_points = max_move;
    }
    world.relocate_hero(recruit, position);
    world.castle_mut(castle_id).hero = Some(recruit);

    commands.push(AdventureCommand::RecruitHero { castle: castle_id, hero: recruit });
    debug!(castle = world.castle(castle_id).name.as_str(), "hero recruited");

    if buy_army {
        reinforce_hero_in_castle(planner, world, recruit, castle_id);
    } else {
        world.hero_mut(recruit).army.optimize_order();
    }

    true
}

/// Gives a castle-resident hero everything the castle can spare: the spell
/// book and guild spells, the garrison's best stacks, upgrades, and freshly
/// recruited troops. A token stack may stay behind to keep the walls manned.
pub(crate) fn reinforce_hero_in_castle(planner: &mut Planner, world: &mut World, hero_id: HeroId, castle_id: CastleId) {
    debug_assert!(world.hero(hero_id).is_active());

    let color = world.hero(hero_id).color;
    let guild_level = world.castle(castle_id).mage_guild_level() as usize;

    // A mage guild makes the spell book worth its price.
    if guild_level > 0 && !world.hero(hero_id).have_spell_book() && !world.hero(hero_id).bag.is_full() {
        let book_price = Funds::gold(500);
        let can_pay = world.kingdom(color).map(|kingdom| kingdom.allows_payment(&book_price)).unwrap_or(false);
        if can_pay {
            if let Some(kingdom) = world.kingdom_mut(color) {
                kingdom.pay(&book_price);
            }
            world.hero_mut(hero_id).bag.push(ravenmoor_core::artifact::Artifact::MagicBook);
        }
    }
    if world.hero(hero_id).have_spell_book() {
        for spells in GUILD_SPELLS.iter().take(guild_level) {
            for &spell in *spells {
                world.hero_mut(hero_id).learn_spell(spell);
            }
        }
    }

    // Merge the best of the garrison into the hero's army, upgrade, recruit
    // and merge again.
    {
        let upgradable = world.castle(castle_id).upgradable_monsters();
        let mut hero_army = world.hero(hero_id).army.clone();
        let mut garrison = world.castle(castle_id).garrison.clone();

        hero_army.join_strongest_from(&mut garrison);
        hero_army.upgrade_troops(&upgradable);
        garrison.upgrade_troops(&upgradable);
        hero_army.join_strongest_from(&mut garrison);

        let funds = world.kingdom(color).map(|kingdom| kingdom.funds).unwrap_or_default();
        let castle = world.castle_mut(castle_id);
        castle.garrison = garrison;
        let spent = castle.recruit_best_available(&funds);
        if let Some(kingdom) = world.kingdom_mut(color) {
            kingdom.pay(&spent);
        }

        let mut garrison = world.castle(castle_id).garrison.clone();
        hero_army.join_strongest_from(&mut garrison);
        world.castle_mut(castle_id).garrison = garrison;
        world.hero_mut(hero_id).army = hero_army;
    }

    // In shaky regions an insignificant stack stays to man the walls.
    let region = world.tile(world.castle(castle_id).position).region as usize;
    let safety = planner.regions.get(region).map(|stats| stats.safety_factor).unwrap_or(0);
    let is_castle = world.castle(castle_id).is_castle();
    let garrison_empty = !world.castle(castle_id).garrison.is_valid();

    if is_castle && safety <= 100 && garrison_empty {
        let hero = world.hero(hero_id);
        let role = hero.role;
        let is_fighter = matches!(role, HeroRole::Fighter | HeroRole::Champion);
        let significance_ratio = if is_fighter { 20.0 } else { 10.0 };
        let troops_strength = hero.army.strength();

        let transfer = hero
            .army
            .slowest_troop_index()
            .filter(|&index| hero.army.troops()[index].strength() <= troops_strength / significance_ratio)
            .map(|index| (index, false))
            .or_else(|| {
                if is_fighter {
                    // Every stack of an important hero is significant.
                    return Option::None;
                }
                hero.army
                    .weakest_troop_index()
                    .filter(|&index| hero.army.troops()[index].strength() <= troops_strength / significance_ratio)
                    .map(|index| (index, true))
            });

        if let Some((index, transfer_half)) = transfer {
            if world.hero(hero_id).army.occupied_slots() > 1 {
                let troop = world.hero(hero_id).army.troops()[index];
                let count = if transfer_half { troop.count / 2 } else { troop.count };
                if count > 0 && world.castle_mut(castle_id).garrison.join_troop(troop.monster, count) {
                    let hero = world.hero_mut(hero_id);
                    if count == troop.count {
                        hero.army.remove_troop(index);
                    } else if let Some(stack) = hero.army.troop_at_mut(index) {
                        stack.count -= count;
                    }
                }
            }
        }
    }

    world.hero_mut(hero_id).army.optimize_order();
    world.castle_mut(castle_id).garrison.optimize_order();
}

/// Buys a new hero at the most promising castle when the kingdom is
/// under-staffed.
#[allow(clippy::too_many_arguments)]
pub(crate) fn purchase_new_heroes(
    planner: &mut Planner,
    world: &mut World,
    my_color: PlayerColor,
    sorted_castles: &[SortedCastle],
    castles_in_danger: &HashSet<i32>,
    available_hero_count: i32,
    more_tasks_for_heroes: bool,
    commands: &mut Vec<AdventureCommand>,
) -> bool {
    let early_game_with_single_castle = world.count_day() < 5 && sorted_castles.len() == 1;
    let hero_limit: i32 =
        if early_game_with_single_castle { 2 } else { world.width() / map::world::SMALL_MAP_WIDTH + 2 };

    if available_hero_count >= hero_limit {
        return false;
    }

    let mut recruitment_castle = Option::None;
    let mut best_army_available = -1.0;

    for entry in sorted_castles {
        let castle = world.castle(entry.castle);
        if !castle.is_castle() {
            continue;
        }

        // No second hero into an occupied castle, and none into a threatened
        // one while we still have heroes elsewhere.
        if castle.hero.is_some()
            || (available_hero_count > 0 && castles_in_danger.contains(&castle.position))
        {
            continue;
        }

        let region = world.tile(castle.position).region as usize;
        let heroes_in_region = planner.regions.get(region).map(|stats| stats.friendly_heroes).unwrap_or(0);
        if heroes_in_region > 1 {
            continue;
        }

        let neighbours = world.region(region as u32).neighbour_count();
        // No point hiring into idleness or onto an island.
        if heroes_in_region > 0 && (!more_tasks_for_heroes || (sorted_castles.len() > 1 && neighbours == 0)) {
            continue;
        }

        let available_army = castle.army_recruitment_value();
        if recruitment_castle.is_none() || available_army > best_army_available {
            recruitment_castle = Some(entry.castle);
            best_army_available = available_army;
        }
    }

    match recruitment_castle {
        Some(castle_id) => recruit_hero(world, castle_id, !early_game_with_single_castle, planner, commands),
        Option::None => false,
    }
}

/// Castle development: under threat the walls come first, otherwise the most
/// valuable affordable structure gets built.
pub(crate) fn castle_turn(
    planner: &mut Planner,
    world: &mut World,
    castle_id: CastleId,
    defensive: bool,
    commands: &mut Vec<AdventureCommand>,
) {
    let _ = planner;

    let color = world.castle(castle_id).color;
    let funds = match world.kingdom(color) {
        Some(kingdom) => kingdom.funds,
        Option::None => return,
    };

    let options = world.castle(castle_id).buildable(&funds);
    if options.is_empty() {
        return;
    }

    let choice = if defensive {
        // Walls, moat and captain above everything else.
        [building::CASTLE, building::MOAT, building::CAPTAIN]
            .into_iter()
            .find(|bit| options.contains(bit))
            .or_else(|| options.iter().copied().max_by_key(|&bit| building::weight(bit)))
    } else {
        options.iter().copied().max_by_key(|&bit| building::weight(bit))
    };

    let Some(bit) = choice else {
        return;
    };

    let price = building::cost(bit);
    if let Some(kingdom) = world.kingdom_mut(color) {
        if !kingdom.pay(&price) {
            return;
        }
    }
    world.castle_mut(castle_id).build(bit);
    commands.push(AdventureCommand::Build { castle: castle_id, building: bit });
    debug!(castle = world.castle(castle_id).name.as_str(), bit, "construction started");
}

/// End-of-turn garrison trick: the slowest stack moves behind the walls so
/// tomorrow's movement allowance is computed from the faster remainder.
pub(crate) fn transfer_slowest_troops_to_garrison(world: &mut World, hero_id: HeroId, castle_id: CastleId) {
    let hero = world.hero(hero_id);
    if hero.army.occupied_slots() <= 1 {
        return;
    }
    let Some(index) = hero.army.slowest_troop_index() else {
        return;
    };
    let troop = hero.army.troops()[index];

    if world.castle_mut(castle_id).garrison.join_troop(troop.monster, troop.count) {
        world.hero_mut(hero_id).army.remove_troop(index);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use map::tile::{Ground, Tile};
    use ravenmoor_core::castle::Castle;
    use ravenmoor_core::difficulty::Difficulty;
    use ravenmoor_core::hero::Hero;
    use ravenmoor_core::kingdom::{Control, Kingdom};
    use ravenmoor_core::monster::MonsterId;
    use ravenmoor_core::troop::Troop;

    fn world_with_castle() -> (World, CastleId) {
        let tiles = (0..64).map(|index| Tile::new(index, Ground::Grass)).collect();
        let mut world = World::new(8, 8, tiles, 9);
        world.kingdoms.push(Kingdom::new(PlayerColor::Blue, Control::Ai));

        let mut castle = Castle::new(CastleId(0), "Greyford", PlayerColor::Blue, 10);
        castle.build(building::CASTLE);
        world.castles.push(castle);
        world.kingdom_mut(PlayerColor::Blue).unwrap().castles.push(CastleId(0));
        (world, CastleId(0))
    }

    #[test]
    fn slowest_troop_stays_in_the_garrison() {
        let (mut world, castle_id) = world_with_castle();
        let mut hero = Hero::new(HeroId(0), "Mira", PlayerColor::Blue, 10);
        hero.army.join_troop(MonsterId::Gargoyle, 8);
        hero.army.join_troop(MonsterId::Ogre, 4);
        world.heroes.push(hero);
        world.kingdom_mut(PlayerColor::Blue).unwrap().heroes.push(HeroId(0));

        transfer_slowest_troops_to_garrison(&mut world, HeroId(0), castle_id);

        assert!(world.castle(castle_id).garrison.has_monster(MonsterId::Ogre));
        assert!(!world.hero(HeroId(0)).army.has_monster(MonsterId::Ogre));
        assert!(world.hero(HeroId(0)).army.has_monster(MonsterId::Gargoyle));
    }

    #[test]
    fn lone_stack_never_leaves_the_hero() {
        let (mut world, castle_id) = world_with_castle();
        let mut hero = Hero::new(HeroId(0), "Mira", PlayerColor::Blue, 10);
        hero.army.join_troop(MonsterId::Ogre, 4);
        world.heroes.push(hero);

        transfer_slowest_troops_to_garrison(&mut world, HeroId(0), castle_id);
        assert!(world.hero(HeroId(0)).army.has_monster(MonsterId::Ogre));
    }

    #[test]
    fn reinforcement_takes_the_garrison() {
        let (mut world, castle_id) = world_with_castle();
        world.castle_mut(castle_id).garrison.join_troop(MonsterId::Paladin, 6);
        world.castle_mut(castle_id).build(building::MAGE_GUILD_1);

        let mut hero = Hero::new(HeroId(0), "Mira", PlayerColor::Blue, 10);
        hero.army.join_troop(MonsterId::Swordsman, 10);
        world.heroes.push(hero);
        world.kingdom_mut(PlayerColor::Blue).unwrap().heroes.push(HeroId(0));
        world.castle_mut(castle_id).hero = Some(HeroId(0));

        let mut planner = Planner::new(Difficulty::Normal);
        planner.clear_turn_caches(&world);
        reinforce_hero_in_castle(&mut planner, &mut world, HeroId(0), castle_id);

        let hero = world.hero(HeroId(0));
        assert!(hero.army.has_monster(MonsterId::Paladin));
        // The guild sold him a book and taught the first circle.
        assert!(hero.have_spell_book());
        assert!(hero.have_spell(Spell::Haste));
    }

    #[test]
    fn threatened_castles_build_defenses_first() {
        let (mut world, castle_id) = world_with_castle();
        world.kingdom_mut(PlayerColor::Blue).unwrap().funds = Funds::new(50, 20, 50, 20, 20, 20, 50_000);

        let mut planner = Planner::new(Difficulty::Normal);
        planner.clear_turn_caches(&world);

        let mut commands = Vec::new();
        castle_turn(&mut planner, &mut world, castle_id, true, &mut commands);

        assert_eq!(commands.len(), 1);
        match commands[0] {
            AdventureCommand::Build { building: bit, .. } => assert_eq!(bit, building::MOAT),
            ref other => panic!("expected a build command, got {other:?}"),
        }
    }

    #[test]
    fn hero_purchase_respects_the_limit() {
        let (mut world, _) = world_with_castle();
        let mut planner = Planner::new(Difficulty::Normal);
        planner.clear_turn_caches(&world);

        // A full roster means no recruitment regardless of the castle.
        let castles = sorted_castle_list(&planner, &world, PlayerColor::Blue, &HashSet::new());
        let mut commands = Vec::new();
        let bought = purchase_new_heroes(
            &mut planner,
            &mut world,
            PlayerColor::Blue,
            &castles,
            &HashSet::new(),
            10,
            true,
            &mut commands,
        );
        assert!(!bought);
        assert!(commands.is_empty());
    }

    #[test]
    fn recruiting_takes_the_stronger_candidate() {
        let (mut world, castle_id) = world_with_castle();

        let mut weak = Hero::new(HeroId(0), "Weak", PlayerColor::None, -1);
        weak.active = false;
        let mut strong = Hero::new(HeroId(1), "Strong", PlayerColor::None, -1);
        strong.active = false;
        strong.army.join_troop(MonsterId::Paladin, 10);
        world.heroes.push(weak);
        world.heroes.push(strong);
        let kingdom = world.kingdom_mut(PlayerColor::Blue).unwrap();
        kingdom.recruits = vec![HeroId(0), HeroId(1)];

        let mut planner = Planner::new(Difficulty::Normal);
        planner.clear_turn_caches(&world);
        let mut commands = Vec::new();
        assert!(recruit_hero(&mut world, castle_id, false, &mut planner, &mut commands));

        assert_eq!(world.castle(castle_id).hero, Some(HeroId(1)));
        assert!(world.kingdom(PlayerColor::Blue).unwrap().heroes.contains(&HeroId(1)));
        assert_eq!(commands.len(), 1);
    }
}
