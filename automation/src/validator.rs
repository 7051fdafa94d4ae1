//! Object validity: whether visiting a given map object makes any sense for a
//! given hero right now. Valuation only runs on objects that pass this
//! filter; results are cached per hero per evaluation.

use std::collections::HashMap;

use map::object::MapObjectKind;
use map::object::MapObjectKind as O;
use map::world::World;
use ravenmoor_core::hero::{luck, morale, Hero};
use ravenmoor_core::monster::MonsterId;
use ravenmoor_core::skill::{SkillKind, SkillLevel};
use ravenmoor_core::troop::Troop;

use crate::planner::Planner;

/// Movement point bonus granted by visiting the object.
pub(crate) fn movement_point_bonus(kind: MapObjectKind) -> f64 {
    match kind {
        O::Oasis => 800.0,
        O::WateringHole | O::Stables => 400.0,
        _ => 0.0,
    }
}

fn is_hero_stronger_than(planner: &mut Planner, world: &World, index: i32, hero_army_strength: f64, multiplier: f64) -> bool {
    hero_army_strength > planner.tile_army_strength(world, index) * multiplier
}

fn is_troop_valuable_to_obtain(troop: &Troop, mut army_strength_threshold: f64, army_has_monster: bool) -> bool {
    if army_has_monster {
        // The army already fields this monster, so even a small top-up merges.
        army_strength_threshold /= 2.0;
    }
    troop.strength() > army_strength_threshold
}

fn is_troop_valuable_to_hire(world: &World, hero: &Hero, troop: &Troop, army_strength_threshold: f64) -> bool {
    if !troop.is_valid() {
        return false;
    }

    let army_has_monster = hero.army.has_monster(troop.monster);
    if !army_has_monster && hero.army.is_full_house() && hero.army.all_troops_unique() {
        return false;
    }

    let Some(kingdom) = world.kingdom(hero.color) else {
        return false;
    };
    let affordable = kingdom.funds.lowest_quotient(&troop.monster.stats().cost).min(troop.count);
    if affordable == 0 {
        return false;
    }

    is_troop_valuable_to_obtain(&Troop::new(troop.monster, affordable), army_strength_threshold, army_has_monster)
}

fn should_visit_castle(world: &World, hero: &Hero, index: i32, hero_army_strength: f64) -> bool {
    let Some(castle) = world.castle_entrance(index) else {
        debug_assert!(false, "castle entrance expected");
        return false;
    };

    if hero.color == castle.color {
        return castle.hero.is_none();
    }
    if world.are_friends(hero.color, castle.color) {
        return false;
    }

    // A hero the human player must defeat to win stays untouched for them.
    if let Some(target) = world.victory.target_hero {
        if castle.hero == Some(target) {
            return false;
        }
    }

    let losing = world.kingdom(hero.color).map(|kingdom| kingdom.is_losing_game()).unwrap_or(false);
    let advantage = if losing {
        map::pathfinding::ARMY_ADVANTAGE_DESPERATE
    } else {
        map::pathfinding::ARMY_ADVANTAGE_MEDIUM
    };

    let mut defense = castle.garrison.strength();
    if let Some(guest) = castle.hero {
        defense += world.hero(guest).army.strength();
    }

    hero_army_strength > defense * advantage
}

/// The big validity switch. `under_hero` looks through a hero standing on the
/// object (used when valuing the tile the hero itself occupies).
pub(crate) fn is_valid_hero_object(
    planner: &mut Planner,
    world: &World,
    hero: &Hero,
    hero_army_strength: f64,
    index: i32,
    army_strength_threshold: f64,
    under_hero: bool,
) -> bool {
    let tile = world.tile(index);
    let kind = tile.object_kind(under_hero);

    // Artifacts reserved for the human player's victory stay on the ground.
    if let Some(artifact) = tile.object.as_ref().and_then(|object| object.artifact()) {
        if world.victory.target_artifact == Some(artifact) {
            return false;
        }
    }

    let losing = world.kingdom(hero.color).map(|kingdom| kingdom.is_losing_game()).unwrap_or(false);

    match kind {
        O::Bottle | O::Campfire | O::Flotsam | O::Resource | O::SeaChest | O::ShipwreckSurvivor | O::TreasureChest => {
            true
        }

        O::Buoy | O::Temple => {
            !world.visits.is_object_type_visited(hero.id, kind)
                && hero.morale() < morale::BLOOD
                && !hero.army.all_troops_are_undead()
        }

        O::Mine | O::Sawmill | O::AlchemistLab | O::Lighthouse => {
            if world.are_friends(hero.color, tile.object_owner()) {
                return false;
            }
            if tile.is_guarded() {
                return is_hero_stronger_than(planner, world, index, hero_army_strength, map::pathfinding::ARMY_ADVANTAGE_SMALL);
            }
            true
        }

        O::AbandonedMine => {
            is_hero_stronger_than(planner, world, index, hero_army_strength, map::pathfinding::ARMY_ADVANTAGE_LARGE)
        }

        O::LeanTo | O::MagicGarden | O::Skeleton | O::Wagon | O::WaterWheel | O::Windmill => tile
            .object
            .as_ref()
            .map(|object| object.funds().is_some() || object.artifact().is_some())
            .unwrap_or(false),

        O::Artifact => {
            if hero.bag.is_full() {
                return false;
            }
            let artifact = tile.object.as_ref().and_then(|object| object.artifact());
            if artifact == Some(ravenmoor_core::artifact::Artifact::MagicBook) && hero.have_spell_book() {
                return false;
            }
            if tile.is_guarded() {
                return is_hero_stronger_than(planner, world, index, hero_army_strength, map::pathfinding::ARMY_ADVANTAGE_LARGE);
            }
            true
        }

        O::ObservationTower => world.fog_count_to_be_revealed(index, 10, hero.color) > 0,

        // No logic to dig for the buried treasure yet; do not waste turns.
        O::Obelisk => false,

        O::Barrier => {
            let color = tile.object_owner();
            world
                .all_traveller_tent_positions(color)
                .iter()
                .any(|&tent| world.visits.is_tile_visited_by_kingdom(hero.color, tent))
        }

        O::TravellerTent => !world.visits.is_tile_visited_by_kingdom(hero.color, index),

        O::ShrineFirstCircle | O::ShrineSecondCircle | O::ShrineThirdCircle => {
            let Some(spell) = tile.object.as_ref().and_then(|object| object.spell()) else {
                debug_assert!(false, "shrine without a spell");
                return false;
            };
            if !hero.have_spell_book() {
                return false;
            }
            if spell.level() == 3 && hero.skill_level(SkillKind::Wisdom) == SkillLevel::None {
                return false;
            }
            if !world.visits.is_tile_visited_by_kingdom(hero.color, index) {
                // Unknown content is always worth a look.
                return true;
            }
            !hero.have_spell(spell)
        }

        O::Arena => !world.visits.is_object_type_visited(hero.id, kind),

        O::Fort | O::Gazebo | O::MercenaryCamp | O::StandingStones | O::WitchDoctorsHut => {
            !world.visits.is_tile_visited(hero.id, index)
        }

        O::WitchsHut => {
            if hero.has_max_secondary_skills() {
                return false;
            }
            if !world.visits.is_tile_visited_by_kingdom(hero.color, index) {
                // No prior knowledge of the taught skill.
                return true;
            }
            let Some(skill) = tile.object.as_ref().and_then(|object| object.skill()) else {
                return false;
            };
            if hero.has_secondary_skill(skill.kind) {
                return false;
            }
            if hero.army.all_troops_are_undead() && skill.kind == SkillKind::Leadership {
                return false;
            }
            if !hero.have_spell_book() && matches!(skill.kind, SkillKind::Mysticism | SkillKind::EagleEye) {
                return false;
            }
            true
        }

        O::TreeOfKnowledge => {
            if world.visits.is_tile_visited(hero.id, index) {
                return false;
            }
            // A paid tree must not drain the whole treasury.
            tile.object
                .as_ref()
                .and_then(|object| object.funds())
                .map(|price| {
                    world
                        .kingdom(hero.color)
                        .map(|kingdom| kingdom.allows_payment(&(price * 5)))
                        .unwrap_or(false)
                })
                .unwrap_or(true)
        }

        O::FaerieRing | O::Fountain | O::Idol | O::Mermaid => {
            !world.visits.is_object_type_visited(hero.id, kind) && hero.luck() < luck::IRISH
        }

        O::Oasis | O::WateringHole => {
            if world.visits.is_object_type_visited(hero.id, kind) {
                return false;
            }
            let distance = planner.pathfinder.get_distance(index);
            if distance == 0 || distance == map::pathfinding::UNREACHABLE {
                return false;
            }
            (2.0 * distance as f64) < movement_point_bonus(kind) || hero.morale() < morale::BLOOD
        }

        O::MagicWell => {
            if world.visits.is_object_type_visited(hero.id, kind) {
                return false;
            }
            if !hero.have_spell_book() || hero.spell_points >= hero.max_spell_points() {
                return false;
            }
            let distance = planner.pathfinder.get_distance(index);
            if distance == 0 || distance == map::pathfinding::UNREACHABLE {
                return false;
            }
            // Pointless when the night would refill the points anyway.
            if distance > hero.move_points
                && hero.daily_restored_spell_points() + hero.spell_points >= hero.max_spell_points()
            {
                return false;
            }
            true
        }

        O::ArtesianSpring => {
            !world.visits.is_tile_visited_by_anyone(index)
                && hero.have_spell_book()
                && hero.spell_points < 2 * hero.max_spell_points()
        }

        O::Xanadu => !world.visits.is_tile_visited(hero.id, index),

        O::PeasantHut | O::GoblinHut | O::ArcherHouse | O::DwarfCottage | O::TreeHouse | O::WatchTower | O::Cave
        | O::Excavation | O::HalflingHole => {
            let Some(troop) = tile.object.as_ref().and_then(|object| object.troop()) else {
                return false;
            };
            if !troop.is_valid() {
                return false;
            }
            let army_has_monster = hero.army.has_monster(troop.monster);
            if !army_has_monster && hero.army.is_full_house() && hero.army.all_troops_unique() {
                return false;
            }
            is_troop_valuable_to_obtain(&troop, army_strength_threshold, army_has_monster)
        }

        O::Ruins | O::TreeCity | O::WagonCamp | O::DesertTent | O::GenieLamp | O::BarrowMounds | O::AirAltar
        | O::EarthAltar | O::FireAltar | O::WaterAltar => tile
            .object
            .as_ref()
            .and_then(|object| object.troop())
            .map(|troop| is_troop_valuable_to_hire(world, hero, &troop, army_strength_threshold))
            .unwrap_or(false),

        O::CityOfDead | O::DragonCity | O::TrollBridge => {
            if tile.is_guarded() {
                return is_hero_stronger_than(planner, world, index, hero_army_strength, map::pathfinding::ARMY_ADVANTAGE_MEDIUM);
            }
            tile.object
                .as_ref()
                .and_then(|object| object.troop())
                .map(|troop| is_troop_valuable_to_hire(world, hero, &troop, army_strength_threshold))
                .unwrap_or(false)
        }

        O::FreemansFoundry => {
            hero.army.has_monster(MonsterId::Pikeman)
                || hero.army.has_monster(MonsterId::Swordsman)
                || hero.army.has_monster(MonsterId::IronGolem)
        }
        O::HillFort => {
            hero.army.has_monster(MonsterId::Dwarf)
                || hero.army.has_monster(MonsterId::Orc)
                || hero.army.has_monster(MonsterId::Ogre)
        }

        O::Stables => {
            if hero.army.has_monster(MonsterId::Cavalry) {
                return true;
            }
            if world.visits.is_object_type_visited(hero.id, kind) {
                return false;
            }
            let distance = planner.pathfinder.get_distance(index);
            if distance == 0 || distance == map::pathfinding::UNREACHABLE {
                return false;
            }
            let days_active = (map::world::DAYS_PER_WEEK - world.day_of_week() + 1) as f64;
            days_active * movement_point_bonus(kind) - 2.0 * distance as f64 > 0.0
        }

        O::DerelictShip | O::Graveyard | O::Shipwreck => {
            if world.visits.is_tile_visited_by_anyone(index) {
                return false;
            }
            let has_loot = tile
                .object
                .as_ref()
                .map(|object| object.funds().is_some() || object.artifact().is_some())
                .unwrap_or(false);
            has_loot && is_hero_stronger_than(planner, world, index, hero_army_strength, 2.0)
        }

        O::Pyramid => {
            if world.visits.is_tile_visited_by_anyone(index) {
                return false;
            }
            hero.skill_level(SkillKind::Wisdom) == SkillLevel::Expert
                && is_hero_stronger_than(planner, world, index, hero_army_strength, map::pathfinding::ARMY_ADVANTAGE_LARGE)
        }

        O::DaemonCave => {
            // The AI always fights the cave's servants and never gambles.
            tile.object.as_ref().map(|object| object.funds().is_some()).unwrap_or(false)
                && is_hero_stronger_than(planner, world, index, hero_army_strength, map::pathfinding::ARMY_ADVANTAGE_MEDIUM)
        }

        O::Monster => {
            let multiplier = if losing { 1.0 } else { map::pathfinding::ARMY_ADVANTAGE_MEDIUM };
            is_hero_stronger_than(planner, world, index, hero_army_strength, multiplier)
        }

        O::Hero => {
            let Some(other) = world.hero_at(index) else {
                debug_assert!(false, "tile reports a hero but none is there");
                return false;
            };
            let other_in_castle = world.hero_in_castle(other.id).is_some();

            if hero.color == other.color {
                if hero.has_met(other.id) {
                    return false;
                }
                return !other_in_castle;
            }
            if world.are_friends(hero.color, other.color) {
                return false;
            }
            // Keep the human player's victory-condition hero alive.
            if world.victory.target_hero == Some(other.id) {
                return false;
            }
            if other_in_castle {
                return should_visit_castle(world, hero, index, hero_army_strength);
            }

            let advantage = if losing {
                map::pathfinding::ARMY_ADVANTAGE_DESPERATE
            } else {
                map::pathfinding::ARMY_ADVANTAGE_SMALL
            };
            hero.army.is_stronger_than(&other.army, advantage)
        }

        O::Castle => should_visit_castle(world, hero, index, hero_army_strength),

        O::Jail => world
            .kingdom(hero.color)
            .map(|kingdom| kingdom.heroes.len() < ravenmoor_core::kingdom::Kingdom::max_heroes())
            .unwrap_or(false),

        O::HutOfMagi => {
            !world.visits.is_object_type_visited(hero.id, kind) && world.object_exists(MapObjectKind::EyeOfMagi)
        }

        O::MagellansMaps => !world.visits.is_tile_visited_by_anyone(index),

        O::AlchemistTower => hero.bag.count_cursed() > 0,

        // Transit helpers and objects the AI has no use for.
        O::None | O::Boat | O::EyeOfMagi | O::Oracle | O::Sign | O::Sirens | O::Sphinx | O::StoneLiths
        | O::TradingPost | O::Whirlpool => false,
    }
}

/// Caches validity checks per hero for one evaluation pass.
pub(crate) struct ObjectValidator {
    hero_army_strength: f64,
    army_strength_threshold: f64,
    cache: HashMap<i32, bool>,
}

impl ObjectValidator {
    pub fn new(hero: &Hero) -> Self {
        ObjectValidator {
            // The strength holds until the hero acts, so caching it for the
            // whole evaluation is sound.
            hero_army_strength: hero.army.strength(),
            army_strength_threshold: hero.min_joining_army_strength(),
            cache: HashMap::new(),
        }
    }

    pub fn is_valid(&mut self, planner: &mut Planner, world: &World, hero: &Hero, index: i32) -> bool {
        if let Some(&cached) = self.cache.get(&index) {
            return cached;
        }
        let valid = is_valid_hero_object(
            planner,
            world,
            hero,
            self.hero_army_strength,
            index,
            self.army_strength_threshold,
            false,
        );
        self.cache.insert(index, valid);
        valid
    }
}

/// Caches object value estimates per hero for one evaluation pass.
pub(crate) struct ObjectValueStorage {
    ignore_value: f64,
    cache: HashMap<(i32, MapObjectKind), f64>,
}

impl ObjectValueStorage {
    pub fn new(ignore_value: f64) -> Self {
        ObjectValueStorage { ignore_value, cache: HashMap::new() }
    }

    pub fn value(
        &mut self,
        planner: &Planner,
        world: &World,
        hero: &Hero,
        index: i32,
        kind: MapObjectKind,
        distance: u32,
    ) -> f64 {
        if let Some(&cached) = self.cache.get(&(index, kind)) {
            return cached;
        }
        let value = planner.object_value(world, hero, index, self.ignore_value, distance);
        self.cache.insert((index, kind), value);
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use map::object::{MapObject, ObjectPayload};
    use map::tile::{Ground, Tile};
    use ravenmoor_core::artifact::Artifact;
    use ravenmoor_core::color::PlayerColor;
    use ravenmoor_core::difficulty::Difficulty;
    use ravenmoor_core::hero::HeroId;
    use ravenmoor_core::kingdom::{Control, Kingdom};

    fn setup() -> (World, Hero, Planner) {
        let tiles = (0..36).map(|index| Tile::new(index, Ground::Grass)).collect();
        let mut world = World::new(6, 6, tiles, 5);
        world.kingdoms.push(Kingdom::new(PlayerColor::Blue, Control::Ai));

        let mut hero = Hero::new(HeroId(0), "Mira", PlayerColor::Blue, 0);
        hero.army.join_troop(MonsterId::Swordsman, 10);
        (world, hero, Planner::new(Difficulty::Normal))
    }

    #[test]
    fn pickups_are_always_worth_taking() {
        let (mut world, hero, mut planner) = setup();
        world.tile_mut(5).object = Some(MapObject::new(MapObjectKind::TreasureChest));
        let strength = hero.army.strength();
        assert!(is_valid_hero_object(&mut planner, &world, &hero, strength, 5, 10.0, false));
    }

    #[test]
    fn monsters_require_an_army_advantage() {
        let (mut world, hero, mut planner) = setup();
        world.tile_mut(5).object = Some(MapObject::with_payload(
            MapObjectKind::Monster,
            ObjectPayload::Troops(Troop::new(MonsterId::BlackDragon, 10)),
        ));
        let strength = hero.army.strength();
        assert!(!is_valid_hero_object(&mut planner, &world, &hero, strength, 5, 10.0, false));

        world.tile_mut(5).object = Some(MapObject::with_payload(
            MapObjectKind::Monster,
            ObjectPayload::Troops(Troop::new(MonsterId::Peasant, 2)),
        ));
        planner.tile_army_strengths.clear();
        assert!(is_valid_hero_object(&mut planner, &world, &hero, strength, 5, 10.0, false));
    }

    #[test]
    fn spell_book_gates_the_shrines() {
        let (mut world, mut hero, mut planner) = setup();
        world.tile_mut(5).object = Some(MapObject::with_payload(
            MapObjectKind::ShrineFirstCircle,
            ObjectPayload::SpellTaught(ravenmoor_core::spell::Spell::Haste),
        ));
        let strength = hero.army.strength();
        assert!(!is_valid_hero_object(&mut planner, &world, &hero, strength, 5, 10.0, false));

        hero.bag.push(Artifact::MagicBook);
        assert!(is_valid_hero_object(&mut planner, &world, &hero, strength, 5, 10.0, false));
    }

    #[test]
    fn validator_caches_per_tile() {
        let (mut world, hero, mut planner) = setup();
        world.tile_mut(5).object = Some(MapObject::new(MapObjectKind::TreasureChest));

        let mut validator = ObjectValidator::new(&hero);
        assert!(validator.is_valid(&mut planner, &world, &hero, 5));

        // Even after the object disappears the cached verdict holds for the
        // rest of the evaluation pass.
        world.remove_object(5);
        assert!(validator.is_valid(&mut planner, &world, &hero, 5));
    }

    #[test]
    fn weak_dwelling_troops_are_ignored() {
        let (mut world, hero, mut planner) = setup();
        world.tile_mut(5).object = Some(MapObject::with_payload(
            MapObjectKind::PeasantHut,
            ObjectPayload::Troops(Troop::new(MonsterId::Peasant, 3)),
        ));
        let strength = hero.army.strength();
        // Three peasants add nothing to a swordsman army.
        assert!(!is_valid_hero_object(&mut planner, &world, &hero, strength, 5, hero.min_joining_army_strength(), false));
    }
}
