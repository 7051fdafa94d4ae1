use serde::{Deserialize, Serialize};

use crate::color::PlayerColor;
use crate::hero::HeroId;
use crate::resource::Funds;
use crate::troop::{Army, Troop};

/// Index of a castle in the world's castle arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CastleId(pub u32);

/// Built-structure bits.
pub mod building {
    pub const TENT: u32 = 1 << 0;
    pub const CASTLE: u32 = 1 << 1;
    pub const MOAT: u32 = 1 << 2;
    pub const CAPTAIN: u32 = 1 << 3;
    pub const TAVERN: u32 = 1 << 4;
    pub const WELL: u32 = 1 << 5;
    pub const STATUE: u32 = 1 << 6;
    pub const MARKETPLACE: u32 = 1 << 7;
    pub const THIEVES_GUILD: u32 = 1 << 8;
    pub const SHIPYARD: u32 = 1 << 9;
    pub const MAGE_GUILD_1: u32 = 1 << 10;
    pub const MAGE_GUILD_2: u32 = 1 << 11;
    pub const MAGE_GUILD_3: u32 = 1 << 12;
    pub const MAGE_GUILD_4: u32 = 1 << 13;
    pub const MAGE_GUILD_5: u32 = 1 << 14;
    pub const DWELLING_1: u32 = 1 << 15;
    pub const DWELLING_2: u32 = 1 << 16;
    pub const DWELLING_3: u32 = 1 << 17;
    pub const DWELLING_4: u32 = 1 << 18;
    pub const DWELLING_5: u32 = 1 << 19;
    pub const DWELLING_6: u32 = 1 << 20;

    /// Construction price of a single structure bit.
    pub fn cost(bit: u32) -> super::Funds {
        use super::Funds;
        match bit {
            CASTLE => Funds { wood: 20, ore: 20, ..Funds::gold(5000) },
            MOAT => Funds::gold(750),
            CAPTAIN => Funds::gold(500),
            TAVERN => Funds { wood: 5, ..Funds::gold(500) },
            WELL => Funds::gold(500),
            STATUE => Funds { ore: 5, ..Funds::gold(1250) },
            MARKETPLACE => Funds { wood: 5, ..Funds::gold(500) },
            THIEVES_GUILD => Funds { wood: 5, ..Funds::gold(750) },
            SHIPYARD => Funds { wood: 20, ..Funds::gold(2000) },
            MAGE_GUILD_1 => Funds { wood: 5, ore: 5, ..Funds::gold(2000) },
            MAGE_GUILD_2 => Funds { wood: 5, ore: 5, mercury: 4, sulfur: 4, crystal: 4, gems: 4, gold: 1000 },
            MAGE_GUILD_3 => Funds { wood: 5, ore: 5, mercury: 6, sulfur: 6, crystal: 6, gems: 6, gold: 1000 },
            MAGE_GUILD_4 => Funds { wood: 5, ore: 5, mercury: 8, sulfur: 8, crystal: 8, gems: 8, gold: 1000 },
            MAGE_GUILD_5 => Funds { wood: 5, ore: 5, mercury: 10, sulfur: 10, crystal: 10, gems: 10, gold: 1000 },
            DWELLING_1 => Funds::gold(400),
            DWELLING_2 => Funds { wood: 5, ..Funds::gold(800) },
            DWELLING_3 => Funds { wood: 5, ore: 5, ..Funds::gold(1500) },
            DWELLING_4 => Funds { wood: 10, ore: 10, ..Funds::gold(3000) },
            DWELLING_5 => Funds { wood: 10, ore: 10, crystal: 5, ..Funds::gold(5000) },
            DWELLING_6 => Funds { wood: 20, ore: 20, gems: 10, ..Funds::gold(10000) },
            _ => Funds::default(),
        }
    }

    /// Relative contribution to the castle's building value.
    pub fn weight(bit: u32) -> i32 {
        match bit {
            CASTLE => 10,
            MAGE_GUILD_1 | MAGE_GUILD_2 | MAGE_GUILD_3 | MAGE_GUILD_4 | MAGE_GUILD_5 => 4,
            DWELLING_4 | DWELLING_5 => 4,
            DWELLING_6 => 6,
            DWELLING_1 | DWELLING_2 | DWELLING_3 => 2,
            TENT => 0,
            _ => 1,
        }
    }

    pub const ALL: [u32; 21] = [
        TENT, CASTLE, MOAT, CAPTAIN, TAVERN, WELL, STATUE, MARKETPLACE, THIEVES_GUILD, SHIPYARD, MAGE_GUILD_1,
        MAGE_GUILD_2, MAGE_GUILD_3, MAGE_GUILD_4, MAGE_GUILD_5, DWELLING_1, DWELLING_2, DWELLING_3, DWELLING_4,
        DWELLING_5, DWELLING_6,
    ];
}

/// A fixed-position town. Towns with the Castle structure built can defend with
/// walls and towers and can grow into the full building tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Castle {
    pub id: CastleId,
    pub name: String,
    pub color: PlayerColor,
    pub position: i32,
    pub buildings: u32,
    pub garrison: Army,
    pub hero: Option<HeroId>,
    /// Troops currently available for recruitment in the built dwellings.
    pub available_troops: Vec<Troop>,
}

impl Castle {
    pub fn new(id: CastleId, name: &str, color: PlayerColor, position: i32) -> Self {
        Castle {
            id,
            name: name.to_string(),
            color,
            position,
            buildings: building::TENT | building::DWELLING_1,
            garrison: Army::new(),
            hero: None,
            available_troops: Vec::new(),
        }
    }

    pub fn is_built(&self, bit: u32) -> bool {
        self.buildings & bit != 0
    }

    /// Whether this is a real castle rather than a town.
    pub fn is_castle(&self) -> bool {
        self.is_built(building::CASTLE)
    }

    pub fn allow_build_castle(&self) -> bool {
        !self.is_castle()
    }

    pub fn mage_guild_level(&self) -> u32 {
        [
            building::MAGE_GUILD_1,
            building::MAGE_GUILD_2,
            building::MAGE_GUILD_3,
            building::MAGE_GUILD_4,
            building::MAGE_GUILD_5,
        ]
        .iter()
        .take_while(|&&bit| self.is_built(bit))
        .count() as u32
    }

    /// Sum of weights of everything built; feeds both castle scoring and the
    /// development order.
    pub fn building_value(&self) -> i32 {
        building::ALL
            .iter()
            .filter(|&&bit| self.is_built(bit))
            .map(|&bit| building::weight(bit))
            .sum()
    }

    /// What a visiting hero would gain: garrison troops plus whatever could be
    /// recruited from the treasury.
    pub fn visit_value(&self, budget: &Funds) -> f64 {
        self.garrison.strength() + self.recruitable_strength(budget)
    }

    /// Strength of the best stacks the given treasury could hire here.
    pub fn recruitable_strength(&self, budget: &Funds) -> f64 {
        let mut funds = *budget;
        let mut strength = 0.0;

        let mut stock: Vec<Troop> = self.available_troops.clone();
        stock.sort_by(|a, b| b.monster.monster_strength().total_cmp(&a.monster.monster_strength()));

        for troop in stock {
            let unit_cost = troop.monster.stats().cost;
            let affordable = funds.lowest_quotient(&unit_cost).min(troop.count);
            if affordable == 0 {
                continue;
            }
            funds = funds - unit_cost * affordable as i32;
            strength += troop.monster.monster_strength() * affordable as f64;
        }

        strength
    }

    /// Full worth of the army a freshly hired hero could pick up here.
    pub fn army_recruitment_value(&self) -> f64 {
        let stock: f64 = self.available_troops.iter().map(Troop::strength).sum();
        stock + self.garrison.strength() / 2.0
    }

    /// Buys the best affordable troops into the garrison and returns the funds
    /// spent.
    pub fn recruit_best_available(&mut self, budget: &Funds) -> Funds {
        let mut funds = *budget;
        let mut spent = Funds::default();

        self.available_troops
            .sort_by(|a, b| b.monster.monster_strength().total_cmp(&a.monster.monster_strength()));

        for troop in &mut self.available_troops {
            let unit_cost = troop.monster.stats().cost;
            let affordable = funds.lowest_quotient(&unit_cost).min(troop.count);
            if affordable == 0 {
                continue;
            }

            let price = unit_cost * affordable as i32;
            funds = funds - price;
            spent += price;
            troop.count -= affordable;
            self.garrison.join_troop(troop.monster, affordable);
        }

        self.available_troops.retain(Troop::is_valid);
        spent
    }

    /// Monsters whose upgraded dwelling is built, so the free-upgrade rules of
    /// castle reinforcement apply to them.
    pub fn upgradable_monsters(&self) -> Vec<crate::monster::MonsterId> {
        self.available_troops
            .iter()
            .filter_map(|troop| troop.monster.upgrade().map(|_| troop.monster))
            .collect()
    }

    /// Structures that can be started right now, cheapest first.
    pub fn buildable(&self, funds: &Funds) -> Vec<u32> {
        let mut options: Vec<u32> = building::ALL
            .iter()
            .copied()
            .filter(|&bit| bit != building::TENT && !self.is_built(bit))
            .filter(|&bit| self.prerequisites_met(bit))
            .filter(|&bit| funds.allows_payment(&building::cost(bit)))
            .collect();
        options.sort_by_key(|&bit| building::cost(bit).gold);
        options
    }

    fn prerequisites_met(&self, bit: u32) -> bool {
        match bit {
            building::MAGE_GUILD_2 => self.is_built(building::MAGE_GUILD_1),
            building::MAGE_GUILD_3 => self.is_built(building::MAGE_GUILD_2),
            building::MAGE_GUILD_4 => self.is_built(building::MAGE_GUILD_3),
            building::MAGE_GUILD_5 => self.is_built(building::MAGE_GUILD_4),
            building::DWELLING_2 => self.is_built(building::DWELLING_1),
            building::DWELLING_3 => self.is_built(building::DWELLING_2),
            building::DWELLING_4 => self.is_built(building::DWELLING_3),
            building::DWELLING_5 => self.is_built(building::DWELLING_4),
            building::DWELLING_6 => self.is_built(building::DWELLING_5),
            building::MOAT | building::CAPTAIN => self.is_castle(),
            _ => true,
        }
    }

    pub fn build(&mut self, bit: u32) {
        self.buildings |= bit;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monster::MonsterId;

    #[test]
    fn towns_are_not_castles() {
        let mut town = Castle::new(CastleId(0), "Greyford", PlayerColor::Blue, 10);
        assert!(!town.is_castle());
        assert!(town.allow_build_castle());

        town.build(building::CASTLE);
        assert!(town.is_castle());
    }

    #[test]
    fn mage_guild_levels_are_sequential() {
        let mut castle = Castle::new(CastleId(0), "Greyford", PlayerColor::Blue, 10);
        castle.build(building::MAGE_GUILD_1);
        castle.build(building::MAGE_GUILD_3);
        // Level 3 without level 2 does not count.
        assert_eq!(castle.mage_guild_level(), 1);
    }

    #[test]
    fn recruiting_prefers_the_strongest_stock() {
        let mut castle = Castle::new(CastleId(0), "Greyford", PlayerColor::Blue, 10);
        castle.available_troops = vec![
            Troop::new(MonsterId::Peasant, 20),
            Troop::new(MonsterId::Swordsman, 5),
        ];

        let budget = Funds::gold(1250);
        castle.recruit_best_available(&budget);

        assert_eq!(castle.garrison.monster_count(MonsterId::Swordsman), 5);
        assert!(!castle.garrison.has_monster(MonsterId::Peasant));
    }

    #[test]
    fn moat_requires_a_castle() {
        let town = Castle::new(CastleId(0), "Greyford", PlayerColor::Blue, 10);
        let rich = Funds::gold(1_000_000);
        assert!(!town.buildable(&rich).contains(&building::MOAT));
    }
}
