use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::resource::Funds;
use crate::speed;
use crate::spell::Spell;

bitflags! {
    /// Innate monster abilities consulted by the planners.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct MonsterAbility: u32 {
        /// Ignores battlefield obstacles and reaches any cell within its speed.
        const FLYER = 1 << 0;
        /// Has ranged attacks while not blocked in melee.
        const ARCHER = 1 << 1;
        /// Occupies two horizontally adjacent battle cells.
        const WIDE = 1 << 2;
        const UNDEAD = 1 << 3;
        const DRAGON = 1 << 4;
        /// Ranged attack damages the target cell and everything around it.
        const AREA_SHOT = 1 << 5;
        /// Melee attack hits every adjacent enemy at once.
        const ALL_ADJACENT_ATTACK = 1 << 6;
        /// Melee attack also hits the cell directly behind the target.
        const DOUBLE_CELL_ATTACK = 1 << 7;
        const UNLIMITED_RETALIATION = 1 << 8;
        const IGNORE_RETALIATION = 1 << 9;
        const ELEMENTAL = 1 << 10;
    }
}

/// The monster roster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MonsterId {
    Peasant,
    Archer,
    Ranger,
    Pikeman,
    VeteranPikeman,
    Swordsman,
    MasterSwordsman,
    Cavalry,
    Champion,
    Paladin,
    Goblin,
    Orc,
    OrcChief,
    Wolf,
    Ogre,
    OgreLord,
    Troll,
    Cyclops,
    Dwarf,
    BattleDwarf,
    Elf,
    GrandElf,
    Druid,
    Unicorn,
    Phoenix,
    Centaur,
    Gargoyle,
    Griffin,
    Minotaur,
    Hydra,
    GreenDragon,
    RedDragon,
    BlackDragon,
    Skeleton,
    Zombie,
    Mummy,
    Vampire,
    Lich,
    BoneDragon,
    IronGolem,
    SteelGolem,
    Mage,
    ArchMage,
    Giant,
    Titan,
    EarthElemental,
    AirElemental,
    FireElemental,
    WaterElemental,
}

/// Static monster data. One row per roster entry.
#[derive(Debug, Clone, Copy)]
pub struct MonsterStats {
    pub name: &'static str,
    pub attack: u32,
    pub defense: u32,
    pub damage_min: u32,
    pub damage_max: u32,
    pub hp: u32,
    pub speed: u32,
    pub shots: u32,
    pub cost: Funds,
    pub abilities: MonsterAbility,
}

const fn gold(amount: i32) -> Funds {
    Funds { wood: 0, mercury: 0, ore: 0, sulfur: 0, crystal: 0, gems: 0, gold: amount }
}

const fn cost(mercury: i32, sulfur: i32, crystal: i32, gems: i32, gold: i32) -> Funds {
    Funds { wood: 0, mercury, ore: 0, sulfur, crystal, gems, gold }
}

impl MonsterId {
    pub fn stats(self) -> &'static MonsterStats {
        use MonsterAbility as A;
        use MonsterId::*;

        macro_rules! row {
            ($name:literal, $a:expr, $d:expr, $dmin:expr, $dmax:expr, $hp:expr, $sp:expr, $sh:expr, $cost:expr, $ab:expr) => {{
                static STATS: MonsterStats = MonsterStats {
                    name: $name,
                    attack: $a,
                    defense: $d,
                    damage_min: $dmin,
                    damage_max: $dmax,
                    hp: $hp,
                    speed: $sp,
                    shots: $sh,
                    cost: $cost,
                    abilities: $ab,
                };
                &STATS
            }};
        }

        match self {
            Peasant => row!("Peasant", 1, 1, 1, 1, 1, speed::VERY_SLOW, 0, gold(20), A::empty()),
            Archer => row!("Archer", 5, 3, 2, 3, 10, speed::VERY_SLOW, 12, gold(150), A::ARCHER),
            Ranger => row!("Ranger", 5, 3, 2, 3, 10, speed::AVERAGE, 24, gold(200), A::ARCHER),
            Pikeman => row!("Pikeman", 5, 9, 3, 4, 15, speed::AVERAGE, 0, gold(200), A::empty()),
            VeteranPikeman => row!("Veteran Pikeman", 5, 9, 3, 4, 20, speed::FAST, 0, gold(250), A::empty()),
            Swordsman => row!("Swordsman", 7, 9, 4, 6, 25, speed::AVERAGE, 0, gold(250), A::empty()),
            MasterSwordsman => row!("Master Swordsman", 7, 9, 4, 6, 30, speed::FAST, 0, gold(300), A::empty()),
            Cavalry => row!("Cavalry", 10, 9, 5, 10, 30, speed::VERY_FAST, 0, gold(300), A::WIDE),
            Champion => row!("Champion", 10, 9, 5, 10, 40, speed::ULTRA_FAST, 0, gold(375), A::WIDE),
            Paladin => row!("Paladin", 11, 12, 10, 20, 50, speed::FAST, 0, gold(600), A::empty()),
            Goblin => row!("Goblin", 3, 1, 1, 2, 3, speed::AVERAGE, 0, gold(40), A::empty()),
            Orc => row!("Orc", 3, 4, 2, 3, 10, speed::VERY_SLOW, 8, gold(140), A::ARCHER),
            OrcChief => row!("Orc Chief", 3, 4, 3, 4, 15, speed::SLOW, 16, gold(175), A::ARCHER),
            Wolf => row!("Wolf", 6, 2, 3, 5, 20, speed::VERY_FAST, 0, gold(200), A::WIDE),
            Ogre => row!("Ogre", 9, 5, 4, 6, 40, speed::VERY_SLOW, 0, gold(300), A::empty()),
            OgreLord => row!("Ogre Lord", 9, 5, 5, 7, 60, speed::AVERAGE, 0, gold(500), A::empty()),
            Troll => row!("Troll", 10, 5, 5, 7, 40, speed::AVERAGE, 8, gold(600), A::ARCHER),
            Cyclops => {
                row!("Cyclops", 12, 9, 12, 24, 80, speed::FAST, 0, cost(0, 0, 1, 0, 750), A::empty())
            }
            Dwarf => row!("Dwarf", 6, 5, 2, 4, 20, speed::VERY_SLOW, 0, gold(200), A::empty()),
            BattleDwarf => row!("Battle Dwarf", 6, 6, 2, 4, 20, speed::AVERAGE, 0, gold(250), A::empty()),
            Elf => row!("Elf", 4, 3, 2, 3, 15, speed::AVERAGE, 24, gold(250), A::ARCHER),
            GrandElf => row!("Grand Elf", 5, 5, 2, 3, 15, speed::VERY_FAST, 24, gold(300), A::ARCHER),
            Druid => row!("Druid", 7, 5, 5, 8, 25, speed::FAST, 8, gold(350), A::ARCHER),
            Unicorn => row!("Unicorn", 10, 9, 7, 14, 40, speed::FAST, 0, gold(500), A::WIDE),
            Phoenix => {
                row!("Phoenix", 12, 10, 20, 40, 100, speed::BLAZING, 0, cost(1, 0, 0, 0, 1500),
                    A::WIDE.union(A::FLYER).union(A::DOUBLE_CELL_ATTACK))
            }
            Centaur => row!("Centaur", 3, 1, 1, 2, 5, speed::AVERAGE, 8, gold(60), A::ARCHER.union(A::WIDE)),
            Gargoyle => row!("Gargoyle", 4, 7, 2, 3, 15, speed::VERY_FAST, 0, gold(200), A::FLYER),
            Griffin => {
                row!("Griffin", 6, 6, 3, 5, 25, speed::AVERAGE, 0, gold(300), A::FLYER.union(A::UNLIMITED_RETALIATION))
            }
            Minotaur => row!("Minotaur", 9, 8, 5, 10, 35, speed::AVERAGE, 0, gold(400), A::empty()),
            Hydra => row!("Hydra", 8, 9, 6, 12, 75, speed::VERY_SLOW, 0, gold(800), A::WIDE.union(A::ALL_ADJACENT_ATTACK)),
            GreenDragon => {
                row!("Green Dragon", 12, 12, 25, 50, 200, speed::AVERAGE, 0, cost(0, 1, 0, 0, 3000),
                    A::WIDE.union(A::FLYER).union(A::DRAGON).union(A::DOUBLE_CELL_ATTACK))
            }
            RedDragon => {
                row!("Red Dragon", 13, 13, 25, 50, 250, speed::FAST, 0, cost(0, 1, 0, 0, 3500),
                    A::WIDE.union(A::FLYER).union(A::DRAGON).union(A::DOUBLE_CELL_ATTACK))
            }
            BlackDragon => {
                row!("Black Dragon", 14, 14, 25, 50, 300, speed::VERY_FAST, 0, cost(0, 2, 0, 0, 4000),
                    A::WIDE.union(A::FLYER).union(A::DRAGON).union(A::DOUBLE_CELL_ATTACK))
            }
            Skeleton => row!("Skeleton", 4, 3, 2, 3, 4, speed::AVERAGE, 0, gold(75), A::UNDEAD),
            Zombie => row!("Zombie", 5, 2, 2, 3, 15, speed::VERY_SLOW, 0, gold(150), A::UNDEAD),
            Mummy => row!("Mummy", 6, 6, 3, 4, 25, speed::AVERAGE, 0, gold(250), A::UNDEAD),
            Vampire => {
                row!("Vampire", 8, 6, 5, 7, 30, speed::AVERAGE, 0, gold(500),
                    A::UNDEAD.union(A::FLYER).union(A::IGNORE_RETALIATION))
            }
            Lich => row!("Lich", 7, 12, 8, 10, 25, speed::FAST, 12, gold(750), A::UNDEAD.union(A::ARCHER).union(A::AREA_SHOT)),
            BoneDragon => {
                row!("Bone Dragon", 11, 9, 25, 45, 150, speed::AVERAGE, 0, gold(1500),
                    A::UNDEAD.union(A::WIDE).union(A::FLYER).union(A::DRAGON))
            }
            IronGolem => row!("Iron Golem", 5, 10, 4, 5, 30, speed::VERY_SLOW, 0, gold(300), A::empty()),
            SteelGolem => row!("Steel Golem", 7, 10, 4, 5, 35, speed::SLOW, 0, gold(350), A::empty()),
            Mage => row!("Mage", 11, 7, 7, 9, 30, speed::FAST, 12, gold(600), A::FLYER.union(A::ARCHER)),
            ArchMage => row!("Archmage", 12, 8, 7, 9, 35, speed::VERY_FAST, 24, gold(700), A::FLYER.union(A::ARCHER)),
            Giant => {
                row!("Giant", 13, 10, 20, 30, 150, speed::AVERAGE, 0, cost(0, 0, 0, 1, 2000), A::empty())
            }
            Titan => {
                row!("Titan", 15, 15, 20, 30, 300, speed::VERY_FAST, 24, cost(0, 0, 0, 2, 5000), A::ARCHER)
            }
            EarthElemental => row!("Earth Elemental", 8, 8, 4, 5, 50, speed::SLOW, 0, gold(500), A::ELEMENTAL),
            AirElemental => row!("Air Elemental", 7, 7, 2, 8, 35, speed::VERY_FAST, 0, gold(500), A::ELEMENTAL),
            FireElemental => row!("Fire Elemental", 8, 6, 4, 6, 40, speed::FAST, 0, gold(500), A::ELEMENTAL),
            WaterElemental => row!("Water Elemental", 6, 8, 3, 7, 45, speed::AVERAGE, 0, gold(500), A::ELEMENTAL),
        }
    }

    pub fn name(self) -> &'static str {
        self.stats().name
    }

    pub fn has_ability(self, ability: MonsterAbility) -> bool {
        self.stats().abilities.contains(ability)
    }

    pub fn is_undead(self) -> bool {
        self.has_ability(MonsterAbility::UNDEAD)
    }

    pub fn is_dragon(self) -> bool {
        self.has_ability(MonsterAbility::DRAGON)
    }

    /// The direct upgrade of this monster, if one exists.
    pub fn upgrade(self) -> Option<MonsterId> {
        use MonsterId::*;
        match self {
            Archer => Some(Ranger),
            Pikeman => Some(VeteranPikeman),
            Swordsman => Some(MasterSwordsman),
            Cavalry => Some(Champion),
            Orc => Some(OrcChief),
            Ogre => Some(OgreLord),
            Dwarf => Some(BattleDwarf),
            Elf => Some(GrandElf),
            GreenDragon => Some(RedDragon),
            RedDragon => Some(BlackDragon),
            IronGolem => Some(SteelGolem),
            Mage => Some(ArchMage),
            Giant => Some(Titan),
            _ => None,
        }
    }

    /// The monster produced by a summoning spell.
    pub fn from_summon_spell(spell: Spell) -> Option<MonsterId> {
        match spell {
            Spell::SummonEarthElemental => Some(MonsterId::EarthElemental),
            Spell::SummonAirElemental => Some(MonsterId::AirElemental),
            Spell::SummonFireElemental => Some(MonsterId::FireElemental),
            Spell::SummonWaterElemental => Some(MonsterId::WaterElemental),
            _ => None,
        }
    }

    /// Strength of a single creature of this kind, the base unit of every army
    /// and threat estimate in the decision core.
    pub fn monster_strength(self) -> f64 {
        let stats = self.stats();
        let avg_damage = (stats.damage_min + stats.damage_max) as f64 / 2.0;

        let mut strength = (avg_damage + stats.hp as f64 / 10.0)
            * (1.0 + (stats.attack + stats.defense) as f64 / 20.0)
            * (0.8 + stats.speed as f64 / 10.0);

        let abilities = stats.abilities;
        if abilities.contains(MonsterAbility::ARCHER) {
            strength *= 1.5;
        }
        if abilities.contains(MonsterAbility::FLYER) {
            strength *= 1.2;
        }
        if abilities.contains(MonsterAbility::ALL_ADJACENT_ATTACK) {
            strength *= 1.2;
        }
        if abilities.contains(MonsterAbility::DOUBLE_CELL_ATTACK) {
            strength *= 1.1;
        }
        if abilities.contains(MonsterAbility::UNLIMITED_RETALIATION) {
            strength *= 1.1;
        }
        if abilities.contains(MonsterAbility::IGNORE_RETALIATION) {
            strength *= 1.15;
        }

        strength
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upgrades_are_stronger() {
        for monster in [MonsterId::Archer, MonsterId::Pikeman, MonsterId::GreenDragon, MonsterId::Giant] {
            let upgraded = monster.upgrade().unwrap();
            assert!(
                upgraded.monster_strength() > monster.monster_strength(),
                "{} should be weaker than {}",
                monster.name(),
                upgraded.name()
            );
        }
    }

    #[test]
    fn dragons_are_dragons() {
        assert!(MonsterId::BlackDragon.is_dragon());
        assert!(MonsterId::BoneDragon.is_dragon());
        assert!(!MonsterId::Hydra.is_dragon());
    }

    #[test]
    fn summon_spells_map_to_elementals() {
        assert_eq!(MonsterId::from_summon_spell(Spell::SummonFireElemental), Some(MonsterId::FireElemental));
        assert_eq!(MonsterId::from_summon_spell(Spell::Fireball), None);
    }
}
