//! Object valuation: maps (hero, object, distance) to a desirability
//! number. One scoring table per hero role; the general table is the baseline
//! the others override.

use map::object::MapObjectKind;
use map::object::MapObjectKind as O;
use map::world::World;
use ravenmoor_core::castle::CastleId;
use ravenmoor_core::hero::{luck, morale, Hero, HeroRole};
use ravenmoor_core::kingdom::Control;
use ravenmoor_core::monster::MonsterId;
use ravenmoor_core::resource::{Funds, ResourceKind};
use ravenmoor_core::skill::SkillKind;

use crate::budget::{funds_value_based_on_priority, resource_priority_modifier};
use crate::planner::Planner;
use crate::priority::PriorityTaskType;

/// Penalty attached to tiles under threat of an enemy attack.
pub(crate) const DANGEROUS_TASK_PENALTY: f64 = 50_000.0;

pub(crate) const FOG_DISCOVERY_BASE_VALUE: f64 = -10_000.0;

/// Getting a free upgrade is worth several times the raw strength delta.
const FREE_MONSTER_UPGRADE_MODIFIER: f64 = 3.0;

/// Below 1.0 the object stays in focus over long distances; above 1.0 it is
/// only interesting nearby.
fn distance_modifier(kind: MapObjectKind) -> f64 {
    match kind {
        O::Castle => 0.8,
        O::AlchemistLab | O::Artifact | O::Hero | O::Mine | O::Sawmill => 0.9,
        O::Campfire | O::Flotsam | O::GenieLamp | O::Resource | O::SeaChest | O::TreasureChest => 0.95,
        // Morale and luck boosters only pay off when they are very close.
        O::Buoy | O::Temple | O::FaerieRing | O::Fountain | O::Idol | O::Mermaid => 1.1,
        _ => 1.0,
    }
}

/// value(distance) = value − d·log₁₀(d): the non-linear loss keeps important
/// objects attractive at range. The correction slowly shrinks over the game
/// so late-game heroes stay focused on what matters.
pub(crate) fn scale_with_distance_and_time(value: f64, distance: u32, kind: MapObjectKind, day: u32) -> f64 {
    if distance == 0 {
        return value;
    }

    let mut corrected = distance as f64 * distance_modifier(kind);
    corrected *= 1.0 - (day as f64 * 0.0001).min(0.5);

    value - corrected * corrected.log10()
}

/// Fog discovery starts as a last resort but means everything to a Scout.
pub(crate) fn fog_discovery_value(hero: &Hero) -> f64 {
    match hero.role {
        HeroRole::Scout => 0.0,
        HeroRole::Hunter | HeroRole::Fighter | HeroRole::Champion => FOG_DISCOVERY_BASE_VALUE,
        HeroRole::Courier => FOG_DISCOVERY_BASE_VALUE * 2.0,
    }
}

/// Days before a role starts treating territory expansion as urgent.
pub(crate) fn fog_discovery_intensification_timeout(hero: &Hero) -> u32 {
    match hero.role {
        HeroRole::Scout => 30,
        HeroRole::Fighter | HeroRole::Champion => 60,
        HeroRole::Hunter => 90,
        HeroRole::Courier => 120,
    }
}

fn monster_upgrade_value(hero: &Hero, monster: MonsterId) -> f64 {
    let count = hero.army.monster_count(monster);
    if count == 0 {
        return 0.0;
    }
    let Some(upgraded) = monster.upgrade() else {
        return 0.0;
    };
    (upgraded.monster_strength() - monster.monster_strength()) * count as f64
}

impl Planner {
    /// Role dispatch for the object value.
    pub(crate) fn object_value(&self, world: &World, hero: &Hero, index: i32, value_to_ignore: f64, distance: u32) -> f64 {
        match hero.role {
            HeroRole::Hunter => self.general_object_value(world, hero, index, value_to_ignore, distance),
            HeroRole::Scout => self.scout_object_value(world, hero, index, value_to_ignore, distance),
            HeroRole::Fighter | HeroRole::Champion => self.fighter_object_value(world, hero, index, value_to_ignore, distance),
            HeroRole::Courier => self.courier_object_value(world, hero, index, value_to_ignore, distance),
        }
    }

    /// Castle worth under the given role parameters. An enemy castle marked as
    /// a critical task is rated no lower than the best of our castles it
    /// threatens, so eliminating the threat beats garrisoning against it.
    fn calculate_castle_value(
        &self,
        world: &World,
        hero: &Hero,
        castle_id: CastleId,
        value_per_building: f64,
        base_value: f64,
        defenseless_modifier: f64,
    ) -> f64 {
        let castle = world.castle(castle_id);
        let mut value = castle.building_value() as f64 * value_per_building + base_value;

        let losing = world.kingdom(hero.color).map(|kingdom| kingdom.is_losing_game()).unwrap_or(false);
        if losing {
            value += 15_000.0;
        }
        if world.victory.target_castle == Some(castle.position) {
            value += 20_000.0;
        }

        if hero.color == castle.color {
            // Our own endangered castle is rated like a defenseless enemy one:
            // losing it means taking it back later.
            value *= defenseless_modifier;
        } else {
            if self.is_critical_task(castle.position) {
                if let Some(task) = self.priority_targets.get(&castle.position) {
                    debug_assert_eq!(task.task_type, PriorityTaskType::Attack);
                    for &secondary in &task.secondary_task_tiles {
                        let Some(threatened) = world.castle_entrance(secondary) else {
                            continue;
                        };
                        debug_assert_eq!(threatened.color, hero.color);
                        let threatened_value = self.calculate_castle_value(
                            world,
                            hero,
                            threatened.id,
                            value_per_building,
                            base_value,
                            defenseless_modifier,
                        );
                        value = value.max(threatened_value * 2.0);
                    }
                }
            }

            if !castle.garrison.is_valid() {
                value *= defenseless_modifier;
            }
        }

        value
    }

    fn hero_object_value(
        &self,
        world: &World,
        hero: &Hero,
        index: i32,
        value_to_ignore: f64,
        base_value: f64,
        meeting_cap: f64,
        castle_value_per_building: f64,
        castle_base_value: f64,
        castle_defenseless_modifier: f64,
        stats_margin: i32,
    ) -> f64 {
        let Some(other) = world.hero_at(index) else {
            debug_assert!(false, "hero expected on tile");
            return value_to_ignore;
        };

        if hero.color == other.color {
            if hero.role > other.role {
                // The junior hero comes to us, not the other way around.
                return value_to_ignore;
            }
            if hero.role == other.role
                && hero.stats_value() + self.difficulty.min_stat_diff_for_heroes_meeting() + stats_margin
                    > other.stats_value()
            {
                return value_to_ignore;
            }

            let value = hero.meeting_value(other);
            if value < 250.0 {
                return value_to_ignore;
            }
            return value.min(meeting_cap);
        }

        if world.are_friends(hero.color, other.color) {
            debug_assert!(false, "allied heroes are filtered before valuation");
            return -DANGEROUS_TASK_PENALTY;
        }
        if world.victory.target_hero == Some(other.id) {
            debug_assert!(false, "the human player's target hero is filtered before valuation");
            return -DANGEROUS_TASK_PENALTY;
        }

        let mut value = base_value;

        if self.is_critical_task(index) {
            if let Some(task) = self.priority_targets.get(&index) {
                debug_assert_eq!(task.task_type, PriorityTaskType::Attack);
                for &secondary in &task.secondary_task_tiles {
                    let Some(threatened) = world.castle_entrance(secondary) else {
                        continue;
                    };
                    let threatened_value = self.calculate_castle_value(
                        world,
                        hero,
                        threatened.id,
                        castle_value_per_building,
                        castle_base_value,
                        castle_defenseless_modifier,
                    );
                    value = value.max(threatened_value * 2.0);
                }
            }
        } else if let Some(castle_id) = world.hero_in_castle(other.id) {
            // Defeating the garrisoned hero hands over the castle too.
            value += self.calculate_castle_value(
                world,
                hero,
                castle_id,
                castle_value_per_building,
                castle_base_value,
                castle_defenseless_modifier,
            );
        } else if world.kingdom(other.color).map(|kingdom| kingdom.control == Control::Ai).unwrap_or(false) {
            // Keep AI kingdoms from grinding each other down while the human
            // player watches.
            value *= 0.8;
        }

        value
    }

    fn general_object_value(&self, world: &World, hero: &Hero, index: i32, value_to_ignore: f64, distance: u32) -> f64 {
        // One tile of distance is worth roughly 100 points.
        let tile = world.tile(index);
        let kind = tile.object_kind(false);
        let funds = world.kingdom(hero.color).map(|kingdom| kingdom.funds).unwrap_or_default();

        match kind {
            O::Castle => {
                let Some(castle) = world.castle_entrance(index) else {
                    debug_assert!(false, "castle entrance expected");
                    return value_to_ignore;
                };

                if hero.color == castle.color {
                    if self.is_critical_task(index) {
                        return self.calculate_castle_value(world, hero, castle.id, 150.0, 3000.0, 1.25);
                    }
                    let value = castle.visit_value(&funds);
                    if !self.is_priority_task(index) && value < 500.0 {
                        return value_to_ignore;
                    }
                    return value;
                }

                if world.are_friends(hero.color, castle.color) {
                    debug_assert!(false, "allied castles are filtered before valuation");
                    return -DANGEROUS_TASK_PENALTY;
                }
                self.calculate_castle_value(world, hero, castle.id, 150.0, 3000.0, 1.25)
            }

            O::Hero => self.hero_object_value(world, hero, index, value_to_ignore, 5000.0, 10_000.0, 150.0, 3000.0, 1.25, 0),

            O::Monster => {
                let Some(troop) = tile.object.as_ref().and_then(|object| object.troop()) else {
                    debug_assert!(false, "monster tile without a stack");
                    return -DANGEROUS_TASK_PENALTY;
                };
                1000.0 + troop.total_hp() as f64 / 100.0
            }

            O::Mine | O::Sawmill | O::AlchemistLab | O::AbandonedMine => {
                if kind != O::AbandonedMine && tile.object_owner() == hero.color {
                    // Already ours; not even worth the walk.
                    return value_to_ignore;
                }
                let (resource, amount) = match kind {
                    // Abandoned mines are gold mines under the rubble.
                    O::AbandonedMine => (ResourceKind::Gold, ResourceKind::Gold.mine_daily_income()),
                    _ => tile
                        .object
                        .as_ref()
                        .and_then(|object| object.funds())
                        .and_then(|income| income.first_valid_resource())
                        .unwrap_or((ResourceKind::Gold, ResourceKind::Gold.mine_daily_income())),
                };
                amount as f64 * resource_priority_modifier(&self.budget, resource, true)
            }

            O::Artifact | O::ShipwreckSurvivor => {
                let Some(artifact) = tile.object.as_ref().and_then(|object| object.artifact()) else {
                    debug_assert!(false, "artifact reward expected");
                    return -DANGEROUS_TASK_PENALTY;
                };
                1000.0 * artifact.artifact_value() as f64
            }

            O::SeaChest | O::TreasureChest => {
                // The average chest yields about 1500 gold.
                funds_value_based_on_priority(&self.budget, &Funds::gold(1500))
            }

            O::DaemonCave => {
                // The cave pays 2500 gold after the fight.
                funds_value_based_on_priority(&self.budget, &Funds::gold(2500))
            }

            O::Graveyard | O::Shipwreck | O::Skeleton | O::Wagon => {
                match tile.object.as_ref().and_then(|object| object.artifact()) {
                    Some(artifact) => 1000.0 * artifact.artifact_value() as f64,
                    None => -DANGEROUS_TASK_PENALTY,
                }
            }

            // A bottle is only a message, but it may be blocking a path.
            O::Bottle => 0.0,

            O::Campfire => {
                // 4-6 random resources plus 400-600 gold on average; without
                // seeing the roll assume one of each and 400 gold.
                funds_value_based_on_priority(&self.budget, &Funds::new(1, 1, 1, 1, 1, 1, 400))
            }

            O::MagicGarden => funds_value_based_on_priority(&self.budget, &Funds::new(0, 0, 0, 0, 0, 3, 250)),

            O::Resource => {
                let loot = tile.object.as_ref().and_then(|object| object.funds()).unwrap_or_default();
                let estimated = match loot.first_valid_resource() {
                    Some((ResourceKind::Gold, _)) => Funds::gold(750),
                    Some((kind @ (ResourceKind::Wood | ResourceKind::Ore), _)) => Funds::from_resource(kind, 7),
                    Some((kind, _)) => Funds::from_resource(kind, 4),
                    None => Funds::gold(750),
                };
                funds_value_based_on_priority(&self.budget, &estimated)
            }

            O::DerelictShip | O::LeanTo | O::WaterWheel | O::Windmill => {
                let loot = tile.object.as_ref().and_then(|object| object.funds()).unwrap_or_default();
                let value = funds_value_based_on_priority(&self.budget, &loot);
                if value < 1.0 {
                    return value_to_ignore;
                }
                value
            }

            O::Flotsam => {
                // Averaged over the four possible rolls: 175 gold and 5 wood.
                funds_value_based_on_priority(&self.budget, &Funds::new(5, 0, 0, 0, 0, 0, 175))
            }

            O::Lighthouse => {
                if tile.object_owner() == hero.color {
                    return -DANGEROUS_TASK_PENALTY;
                }
                500.0
            }

            O::Xanadu => 3000.0,

            O::ShrineFirstCircle | O::ShrineSecondCircle | O::ShrineThirdCircle => {
                let Some(spell) = tile.object.as_ref().and_then(|object| object.spell()) else {
                    return value_to_ignore;
                };
                spell.strategic_value(hero.army.strength(), hero.max_spell_points(), hero.power)
            }

            O::Arena | O::Fort | O::MercenaryCamp | O::StandingStones | O::TreeOfKnowledge | O::WitchDoctorsHut
            | O::WitchsHut => 500.0,

            O::Ruins | O::TreeCity | O::WagonCamp | O::DesertTent | O::GenieLamp | O::BarrowMounds | O::AirAltar
            | O::EarthAltar | O::FireAltar | O::WaterAltar | O::CityOfDead | O::DragonCity | O::TrollBridge => {
                let Some(troop) = tile.object.as_ref().and_then(|object| object.troop()) else {
                    debug_assert!(false, "dwelling without stock");
                    return -DANGEROUS_TASK_PENALTY;
                };
                let affordable = funds.lowest_quotient(&troop.monster.stats().cost).min(troop.count);
                if affordable == 0 {
                    // The treasury ran dry between evaluations.
                    return -DANGEROUS_TASK_PENALTY;
                }
                ravenmoor_core::troop::Troop::new(troop.monster, affordable).strength()
            }

            O::PeasantHut | O::GoblinHut | O::ArcherHouse | O::DwarfCottage | O::TreeHouse | O::WatchTower | O::Cave
            | O::Excavation | O::HalflingHole => tile
                .object
                .as_ref()
                .and_then(|object| object.troop())
                .map(|troop| troop.strength())
                .unwrap_or(0.0),

            O::StoneLiths | O::Boat | O::Whirlpool => {
                debug_assert!(false, "transit objects are filtered before valuation");
                -DANGEROUS_TASK_PENALTY
            }

            O::ObservationTower => {
                let revealed = world.fog_count_to_be_revealed(index, 10, hero.color);
                if revealed == 0 {
                    return -DANGEROUS_TASK_PENALTY;
                }
                revealed as f64
            }

            O::MagellansMaps => 5000.0,

            O::ArtesianSpring => {
                if !hero.have_spell_book() || hero.spell_points * 2 >= hero.max_spell_points() {
                    return -DANGEROUS_TASK_PENALTY;
                }
                if hero.is_potent_spellcaster() {
                    1500.0
                } else {
                    0.0
                }
            }

            O::MagicWell => {
                if !hero.have_spell_book() || hero.spell_points >= hero.max_spell_points() {
                    return -DANGEROUS_TASK_PENALTY;
                }
                if hero.is_potent_spellcaster() {
                    1500.0
                } else {
                    0.0
                }
            }

            O::Buoy | O::Temple => {
                if hero.army.all_troops_are_undead() {
                    return 0.0;
                }
                match hero.morale() {
                    m if m >= morale::BLOOD => -DANGEROUS_TASK_PENALTY,
                    morale::GREAT => -4000.0,
                    morale::GOOD => -2000.0,
                    morale::NORMAL => 50.0,
                    _ => 100.0,
                }
            }

            O::Stables => {
                let days_active = (map::world::DAYS_PER_WEEK - world.day_of_week() + 1) as f64;
                let movement_bonus =
                    days_active * crate::validator::movement_point_bonus(kind) - 2.0 * distance as f64;

                let upgrade_value = monster_upgrade_value(hero, MonsterId::Cavalry);
                if upgrade_value > 0.0001 {
                    return movement_bonus.max(0.0) + FREE_MONSTER_UPGRADE_MODIFIER * upgrade_value;
                }
                if movement_bonus < 0.0 {
                    return -DANGEROUS_TASK_PENALTY;
                }
                movement_bonus
            }

            O::FreemansFoundry => {
                FREE_MONSTER_UPGRADE_MODIFIER
                    * (monster_upgrade_value(hero, MonsterId::Pikeman)
                        + monster_upgrade_value(hero, MonsterId::Swordsman)
                        + monster_upgrade_value(hero, MonsterId::IronGolem))
            }

            O::HillFort => {
                FREE_MONSTER_UPGRADE_MODIFIER
                    * (monster_upgrade_value(hero, MonsterId::Dwarf)
                        + monster_upgrade_value(hero, MonsterId::Orc)
                        + monster_upgrade_value(hero, MonsterId::Ogre))
            }

            // Either most likely opens new land.
            O::Barrier | O::TravellerTent => 1000.0,

            O::Oasis | O::WateringHole => {
                let bonus = crate::validator::movement_point_bonus(kind) - 2.0 * distance as f64;
                if bonus < 0.0 {
                    return -DANGEROUS_TASK_PENALTY;
                }
                bonus
            }

            // A free hero, possibly a powerful one.
            O::Jail => 3000.0,

            O::HutOfMagi => {
                let mut revealed = 0;
                for eye in world.all_eye_of_magi_positions() {
                    revealed += world.fog_count_to_be_revealed(eye, 9, hero.color);
                }
                revealed as f64
            }

            O::Gazebo => {
                // 1000 free experience, worth less the higher the level.
                let needed = hero.experience_to_next_level();
                if needed < 1000 {
                    return 1000.0;
                }
                1000.0 * 1000.0 / needed as f64
            }

            O::Pyramid => 1500.0,

            O::FaerieRing | O::Fountain | O::Idol | O::Mermaid => match hero.luck() {
                l if l >= luck::IRISH => -DANGEROUS_TASK_PENALTY,
                luck::GREAT => -4000.0,
                luck::GOOD => -2000.0,
                luck::NORMAL => 50.0,
                _ => 100.0,
            },

            O::AlchemistTower => {
                if hero.bag.count_cursed() == 0 {
                    return -DANGEROUS_TASK_PENALTY;
                }
                0.0
            }

            O::EyeOfMagi | O::Oracle | O::Sign | O::Obelisk | O::Sirens | O::Sphinx | O::TradingPost => {
                -DANGEROUS_TASK_PENALTY
            }

            O::None => 0.0,
        }
    }

    /// Fighters and Champions: battles first, trinkets later.
    fn fighter_object_value(&self, world: &World, hero: &Hero, index: i32, value_to_ignore: f64, distance: u32) -> f64 {
        debug_assert!(matches!(hero.role, HeroRole::Fighter | HeroRole::Champion));

        let tile = world.tile(index);
        let kind = tile.object_kind(false);
        let funds = world.kingdom(hero.color).map(|kingdom| kingdom.funds).unwrap_or_default();

        match kind {
            O::Castle => {
                let Some(castle) = world.castle_entrance(index) else {
                    debug_assert!(false, "castle entrance expected");
                    return value_to_ignore;
                };

                if hero.color == castle.color {
                    if self.is_critical_task(index) {
                        return self.calculate_castle_value(world, hero, castle.id, 500.0, 15_000.0, 1.5);
                    }
                    let value = castle.visit_value(&funds);
                    if !self.is_priority_task(index) && value < 500.0 {
                        return value_to_ignore;
                    }
                    // Fighters pick up reinforcements on the way, not as a goal.
                    return value / 2.0;
                }

                if world.are_friends(hero.color, castle.color) {
                    debug_assert!(false, "allied castles are filtered before valuation");
                    return -DANGEROUS_TASK_PENALTY;
                }
                self.calculate_castle_value(world, hero, castle.id, 500.0, 15_000.0, 1.5)
            }

            O::Hero => self.hero_object_value(world, hero, index, value_to_ignore, 12_000.0, 5000.0, 500.0, 15_000.0, 1.5, 1),

            O::Monster => {
                let Some(troop) = tile.object.as_ref().and_then(|object| object.troop()) else {
                    debug_assert!(false, "monster tile without a stack");
                    return -DANGEROUS_TASK_PENALTY;
                };
                // Where another friendly hero roams, the fighter clears the
                // guards and leaves the loot.
                let another_hero_near = self
                    .regions
                    .get(tile.region as usize)
                    .map(|stats| stats.friendly_heroes > 1)
                    .unwrap_or(false);
                let base = if another_hero_near { 4000.0 } else { 1000.0 };
                base + troop.total_hp() as f64 / 100.0
            }

            O::AbandonedMine => 5000.0,

            O::Artifact => {
                let Some(artifact) = tile.object.as_ref().and_then(|object| object.artifact()) else {
                    debug_assert!(false, "artifact reward expected");
                    return -DANGEROUS_TASK_PENALTY;
                };
                1500.0 * artifact.artifact_value() as f64
            }

            O::Campfire | O::Flotsam | O::LeanTo | O::MagicGarden | O::Resource | O::WaterWheel | O::Windmill => {
                let another_hero_near = self
                    .regions
                    .get(tile.region as usize)
                    .map(|stats| stats.friendly_heroes > 1)
                    .unwrap_or(false);
                if another_hero_near {
                    // Leave the pocket change to the hunters.
                    return 100.0;
                }
                self.general_object_value(world, hero, index, value_to_ignore, distance)
            }

            O::Lighthouse => {
                if tile.object_owner() == hero.color {
                    return -DANGEROUS_TASK_PENALTY;
                }
                250.0
            }

            O::Xanadu => 3500.0,

            O::ShrineFirstCircle | O::ShrineSecondCircle | O::ShrineThirdCircle => {
                let Some(spell) = tile.object.as_ref().and_then(|object| object.spell()) else {
                    return value_to_ignore;
                };
                spell.strategic_value(hero.army.strength(), hero.max_spell_points(), hero.power) * 1.1
            }

            O::Arena | O::Fort | O::MercenaryCamp | O::StandingStones | O::TreeOfKnowledge | O::WitchDoctorsHut
            | O::WitchsHut => 1250.0,

            O::ObservationTower => self.general_object_value(world, hero, index, value_to_ignore, distance) / 2.0,

            O::ArtesianSpring => {
                if !hero.have_spell_book() || hero.spell_points * 2 >= hero.max_spell_points() {
                    return -DANGEROUS_TASK_PENALTY;
                }
                if hero.is_potent_spellcaster() {
                    2000.0
                } else {
                    0.0
                }
            }

            O::MagicWell => {
                if !hero.have_spell_book() || hero.spell_points >= hero.max_spell_points() {
                    return -DANGEROUS_TASK_PENALTY;
                }
                if hero.is_potent_spellcaster() {
                    2000.0
                } else {
                    0.0
                }
            }

            O::Buoy | O::Temple => {
                if hero.army.all_troops_are_undead() {
                    return 0.0;
                }
                match hero.morale() {
                    m if m >= morale::BLOOD => -DANGEROUS_TASK_PENALTY,
                    morale::GREAT => -4000.0,
                    morale::GOOD => -2000.0,
                    morale::NORMAL => 50.0,
                    _ => 200.0,
                }
            }

            O::HutOfMagi => self.general_object_value(world, hero, index, value_to_ignore, distance) / 2.0,

            O::Pyramid => 10_000.0,

            _ => self.general_object_value(world, hero, index, value_to_ignore, distance),
        }
    }

    /// Couriers collapse almost everything to a short detour horizon; the
    /// main rendezvous target is handled separately.
    fn courier_object_value(&self, world: &World, hero: &Hero, index: i32, value_to_ignore: f64, distance: u32) -> f64 {
        debug_assert_eq!(hero.role, HeroRole::Courier);

        // Detour worths (n·log n) for two-, five- and ten-tile distances.
        const TWO_TILES: f64 = 500.0;
        const FIVE_TILES: f64 = 1400.0;
        const TEN_TILES: f64 = 3000.0;

        let tile = world.tile(index);
        let kind = tile.object_kind(false);

        match kind {
            O::Hero => {
                let Some(other) = world.hero_at(index) else {
                    debug_assert!(false, "hero expected on tile");
                    return value_to_ignore;
                };

                if hero.color == other.color {
                    // The rendezvous logic owns friendly meetings.
                    return value_to_ignore;
                }
                if world.are_friends(hero.color, other.color) {
                    debug_assert!(false, "allied heroes are filtered before valuation");
                    return -DANGEROUS_TASK_PENALTY;
                }
                if world.victory.target_hero == Some(other.id) {
                    debug_assert!(false, "the human player's target hero is filtered before valuation");
                    return -DANGEROUS_TASK_PENALTY;
                }
                if self.is_critical_task(index) {
                    // A hero threatening our castles gets the general rating.
                    return self.general_object_value(world, hero, index, value_to_ignore, distance);
                }
                TEN_TILES
            }

            O::Monster => {
                let Some(troop) = tile.object.as_ref().and_then(|object| object.troop()) else {
                    debug_assert!(false, "monster tile without a stack");
                    return -DANGEROUS_TASK_PENALTY;
                };
                TWO_TILES + troop.total_hp() as f64 / 100.0
            }

            O::Mine | O::Sawmill | O::AlchemistLab => {
                if tile.object_owner() == hero.color {
                    return -DANGEROUS_TASK_PENALTY;
                }
                let is_gold = tile
                    .object
                    .as_ref()
                    .and_then(|object| object.funds())
                    .map(|income| income.gold > 0)
                    .unwrap_or(false);
                if is_gold {
                    TEN_TILES
                } else {
                    FIVE_TILES
                }
            }

            O::Campfire | O::Flotsam | O::GenieLamp | O::Resource => TWO_TILES,

            O::SeaChest | O::TreasureChest => TWO_TILES,

            O::Arena | O::Fort | O::MercenaryCamp | O::StandingStones | O::TreeOfKnowledge | O::WitchDoctorsHut
            | O::WitchsHut | O::Xanadu => FIVE_TILES,

            O::ArtesianSpring => {
                if !hero.have_spell_book() || hero.spell_points * 2 >= hero.max_spell_points() {
                    return -DANGEROUS_TASK_PENALTY;
                }
                if hero.is_potent_spellcaster() {
                    FIVE_TILES
                } else {
                    0.0
                }
            }

            O::MagicWell => {
                if !hero.have_spell_book() || hero.spell_points >= hero.max_spell_points() {
                    return -DANGEROUS_TASK_PENALTY;
                }
                if hero.is_potent_spellcaster() {
                    FIVE_TILES
                } else {
                    0.0
                }
            }

            _ => self.general_object_value(world, hero, index, value_to_ignore, distance),
        }
    }

    /// Scouts weigh the skills that make scouting better much higher.
    fn scout_object_value(&self, world: &World, hero: &Hero, index: i32, value_to_ignore: f64, distance: u32) -> f64 {
        debug_assert_eq!(hero.role, HeroRole::Scout);

        let tile = world.tile(index);
        if tile.object_kind(false) == O::WitchsHut {
            if !world.visits.is_tile_visited_by_kingdom(hero.color, index) {
                // Unknown content: the general estimate applies.
                return self.general_object_value(world, hero, index, value_to_ignore, distance);
            }

            let Some(skill) = tile.object.as_ref().and_then(|object| object.skill()) else {
                debug_assert!(false, "witch hut without a skill after validation");
                return -DANGEROUS_TASK_PENALTY;
            };

            let value = self.general_object_value(world, hero, index, value_to_ignore, distance);
            return match skill.kind {
                SkillKind::Scouting | SkillKind::Logistics => value * 3.0,
                SkillKind::Pathfinding => value * 2.0,
                _ => value,
            };
        }

        self.general_object_value(world, hero, index, value_to_ignore, distance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use map::object::{MapObject, MapObjectKind, ObjectPayload};
    use map::tile::{Ground, Tile};
    use ravenmoor_core::color::PlayerColor;
    use ravenmoor_core::difficulty::Difficulty;
    use ravenmoor_core::hero::HeroId;
    use ravenmoor_core::kingdom::{Control, Kingdom};
    use ravenmoor_core::troop::Troop;

    fn setup() -> (World, Hero, Planner) {
        let tiles = (0..64).map(|index| Tile::new(index, Ground::Grass)).collect();
        let mut world = World::new(8, 8, tiles, 11);
        world.kingdoms.push(Kingdom::new(PlayerColor::Blue, Control::Ai));
        let mut hero = Hero::new(HeroId(0), "Mira", PlayerColor::Blue, 0);
        hero.army.join_troop(ravenmoor_core::monster::MonsterId::Swordsman, 10);
        let mut planner = Planner::new(Difficulty::Normal);
        planner.clear_turn_caches(&world);
        (world, hero, planner)
    }

    fn mine(resource: ResourceKind) -> MapObject {
        let mut object = MapObject::with_payload(
            MapObjectKind::Mine,
            ObjectPayload::Income(Funds::from_resource(resource, resource.mine_daily_income())),
        );
        object.owner = PlayerColor::None;
        object
    }

    #[test]
    fn needed_ore_mine_outranks_gold_mine() {
        // S4: with ore marked as a priority shortage, the ore mine at equal
        // distance scores above the gold mine.
        let (mut world, hero, mut planner) = setup();
        world.tile_mut(10).object = Some(mine(ResourceKind::Gold));
        world.tile_mut(20).object = Some(mine(ResourceKind::Ore));
        planner.budget[2].priority = true;

        let gold = planner.object_value(&world, &hero, 10, -1.0e9, 1000);
        let ore = planner.object_value(&world, &hero, 20, -1.0e9, 1000);
        assert!(ore > gold, "ore {ore} should beat gold {gold}");
    }

    #[test]
    fn value_decreases_with_distance() {
        let (mut world, hero, planner) = setup();
        world.tile_mut(10).object = Some(MapObject::with_payload(
            MapObjectKind::Artifact,
            ObjectPayload::ArtifactReward(ravenmoor_core::artifact::Artifact::SwordOfDominion),
        ));

        let raw = planner.object_value(&world, &hero, 10, -1.0e9, 0);
        let mut previous = scale_with_distance_and_time(raw, 100, MapObjectKind::Artifact, 1);
        for distance in [200, 400, 800, 1600, 3200] {
            let scaled = scale_with_distance_and_time(raw, distance, MapObjectKind::Artifact, 1);
            assert!(scaled < previous, "value must not grow with distance ({distance})");
            previous = scaled;
        }
    }

    #[test]
    fn castles_stay_in_focus_longer_than_fountains() {
        let value = 4000.0;
        let castle = scale_with_distance_and_time(value, 2000, MapObjectKind::Castle, 1);
        let fountain = scale_with_distance_and_time(value, 2000, MapObjectKind::Fountain, 1);
        assert!(castle > fountain);
    }

    #[test]
    fn fighters_rate_monsters_higher_when_a_hunter_is_around() {
        let (mut world, mut hero, mut planner) = setup();
        hero.role = HeroRole::Fighter;
        world.tile_mut(12).object = Some(MapObject::with_payload(
            MapObjectKind::Monster,
            ObjectPayload::Troops(Troop::new(ravenmoor_core::monster::MonsterId::Wolf, 10)),
        ));

        let alone = planner.object_value(&world, &hero, 12, -1.0e9, 500);

        let region = world.tile(12).region as usize;
        planner.regions[region].friendly_heroes = 2;
        let with_company = planner.object_value(&world, &hero, 12, -1.0e9, 500);
        assert!(with_company > alone * 3.0);
    }

    #[test]
    fn couriers_shrink_everything_to_detours() {
        let (mut world, mut hero, planner) = setup();
        hero.role = HeroRole::Courier;
        world.tile_mut(12).object = Some(MapObject::new(MapObjectKind::TreasureChest));
        assert_eq!(planner.object_value(&world, &hero, 12, -1.0e9, 200), 500.0);
    }

    #[test]
    fn obelisks_are_ignored() {
        let (mut world, hero, planner) = setup();
        world.tile_mut(12).object = Some(MapObject::new(MapObjectKind::Obelisk));
        assert!(planner.object_value(&world, &hero, 12, -1.0e9, 100) <= -DANGEROUS_TASK_PENALTY);
    }
}
