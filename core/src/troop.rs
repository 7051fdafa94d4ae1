use serde::{Deserialize, Serialize};

use crate::monster::{MonsterAbility, MonsterId};
use crate::resource::Funds;

/// A stack of identical monsters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Troop {
    pub monster: MonsterId,
    pub count: u32,
}

impl Troop {
    pub fn new(monster: MonsterId, count: u32) -> Self {
        Troop { monster, count }
    }

    pub fn is_valid(&self) -> bool {
        self.count > 0
    }

    pub fn strength(&self) -> f64 {
        self.monster.monster_strength() * self.count as f64
    }

    /// Stack strength scaled by a commander's attack and defense skills.
    pub fn strength_with_bonus(&self, attack: u32, defense: u32) -> f64 {
        self.strength() * (1.0 + attack as f64 / 10.0 + defense as f64 / 20.0)
    }

    pub fn total_hp(&self) -> u64 {
        self.monster.stats().hp as u64 * self.count as u64
    }

    pub fn speed(&self) -> u32 {
        self.monster.stats().speed
    }

    pub fn cost(&self) -> Funds {
        self.monster.stats().cost * self.count as i32
    }
}

/// A hero's or castle's army: up to five troop stacks, exclusively owned.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Army {
    troops: Vec<Troop>,
}

impl Army {
    pub const SLOT_COUNT: usize = 5;

    pub fn new() -> Self {
        Army { troops: Vec::new() }
    }

    pub fn from_troops(troops: Vec<Troop>) -> Self {
        let mut army = Army::new();
        for troop in troops {
            army.join_troop(troop.monster, troop.count);
        }
        army
    }

    pub fn troops(&self) -> &[Troop] {
        &self.troops
    }

    pub fn is_valid(&self) -> bool {
        self.troops.iter().any(Troop::is_valid)
    }

    pub fn occupied_slots(&self) -> usize {
        self.troops.iter().filter(|troop| troop.is_valid()).count()
    }

    pub fn is_full_house(&self) -> bool {
        self.occupied_slots() >= Self::SLOT_COUNT
    }

    pub fn has_monster(&self, monster: MonsterId) -> bool {
        self.troops.iter().any(|troop| troop.is_valid() && troop.monster == monster)
    }

    pub fn monster_count(&self, monster: MonsterId) -> u32 {
        self.troops
            .iter()
            .filter(|troop| troop.monster == monster)
            .map(|troop| troop.count)
            .sum()
    }

    pub fn all_troops_unique(&self) -> bool {
        let valid: Vec<_> = self.troops.iter().filter(|troop| troop.is_valid()).collect();
        valid
            .iter()
            .all(|troop| valid.iter().filter(|other| other.monster == troop.monster).count() == 1)
    }

    pub fn all_troops_are_undead(&self) -> bool {
        self.is_valid() && self.troops.iter().filter(|t| t.is_valid()).all(|t| t.monster.is_undead())
    }

    /// Whether most of the army's strength comes from melee troops.
    pub fn is_melee_dominant(&self) -> bool {
        let melee: f64 = self
            .troops
            .iter()
            .filter(|troop| !troop.monster.has_ability(MonsterAbility::ARCHER))
            .map(Troop::strength)
            .sum();
        let ranged: f64 = self
            .troops
            .iter()
            .filter(|troop| troop.monster.has_ability(MonsterAbility::ARCHER))
            .map(Troop::strength)
            .sum();
        melee > ranged
    }

    pub fn strength(&self) -> f64 {
        self.troops.iter().map(Troop::strength).sum()
    }

    pub fn strength_with_bonus(&self, attack: u32, defense: u32) -> f64 {
        self.troops.iter().map(|troop| troop.strength_with_bonus(attack, defense)).sum()
    }

    pub fn is_stronger_than(&self, other: &Army, advantage: f64) -> bool {
        self.strength() > other.strength() * advantage
    }

    pub fn total_hp(&self) -> u64 {
        self.troops.iter().map(Troop::total_hp).sum()
    }

    /// Speed of the slowest stack; the adventure-map movement budget follows it.
    pub fn slowest_speed(&self) -> u32 {
        self.troops
            .iter()
            .filter(|troop| troop.is_valid())
            .map(Troop::speed)
            .min()
            .unwrap_or(0)
    }

    pub fn slowest_troop_index(&self) -> Option<usize> {
        self.troops
            .iter()
            .enumerate()
            .filter(|(_, troop)| troop.is_valid())
            .min_by_key(|(_, troop)| troop.speed())
            .map(|(index, _)| index)
    }

    pub fn weakest_troop_index(&self) -> Option<usize> {
        self.troops
            .iter()
            .enumerate()
            .filter(|(_, troop)| troop.is_valid())
            .min_by(|(_, a), (_, b)| a.strength().total_cmp(&b.strength()))
            .map(|(index, _)| index)
    }

    pub fn troop_at_mut(&mut self, index: usize) -> Option<&mut Troop> {
        self.troops.get_mut(index)
    }

    pub fn remove_troop(&mut self, index: usize) -> Option<Troop> {
        if index < self.troops.len() {
            Some(self.troops.remove(index))
        } else {
            None
        }
    }

    /// Merges a stack into the army. Stacks of the same monster always merge;
    /// a new monster needs a free slot. Returns false if the troop did not fit.
    pub fn join_troop(&mut self, monster: MonsterId, count: u32) -> bool {
        if count == 0 {
            return false;
        }

        if let Some(troop) = self.troops.iter_mut().find(|troop| troop.monster == monster) {
            troop.count += count;
            return true;
        }

        if self.troops.len() >= Self::SLOT_COUNT {
            return false;
        }
        self.troops.push(Troop::new(monster, count));
        true
    }

    /// Moves the strongest stacks of `other` into this army, as a garrison
    /// handover does. Stacks that do not fit stay behind.
    pub fn join_strongest_from(&mut self, other: &mut Army) {
        let mut incoming: Vec<Troop> = other.troops.drain(..).filter(Troop::is_valid).collect();
        incoming.sort_by(|a, b| b.strength().total_cmp(&a.strength()));

        for troop in incoming {
            if !self.join_troop(troop.monster, troop.count) {
                other.join_troop(troop.monster, troop.count);
            }
        }
    }

    /// Upgrades every stack the given set of upgradable monsters covers.
    pub fn upgrade_troops(&mut self, upgradable: &[MonsterId]) {
        for troop in &mut self.troops {
            if !upgradable.contains(&troop.monster) {
                continue;
            }
            if let Some(upgraded) = troop.monster.upgrade() {
                troop.monster = upgraded;
            }
        }
    }

    /// Reorders stacks so the strongest occupy the first slots.
    pub fn optimize_order(&mut self) {
        self.troops.sort_by(|a, b| b.strength().total_cmp(&a.strength()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merging_same_monster_does_not_take_a_slot() {
        let mut army = Army::new();
        for _ in 0..Army::SLOT_COUNT {
            assert!(army.join_troop(MonsterId::Goblin, 5));
        }
        assert_eq!(army.occupied_slots(), 1);
        assert_eq!(army.monster_count(MonsterId::Goblin), 25);
    }

    #[test]
    fn full_army_rejects_new_monsters() {
        let mut army = Army::from_troops(vec![
            Troop::new(MonsterId::Goblin, 1),
            Troop::new(MonsterId::Orc, 1),
            Troop::new(MonsterId::Wolf, 1),
            Troop::new(MonsterId::Ogre, 1),
            Troop::new(MonsterId::Troll, 1),
        ]);
        assert!(army.is_full_house());
        assert!(!army.join_troop(MonsterId::Cyclops, 1));
        assert!(army.join_troop(MonsterId::Wolf, 3));
    }

    #[test]
    fn strongest_troops_move_first() {
        let mut hero_army = Army::from_troops(vec![Troop::new(MonsterId::Peasant, 10)]);
        let mut garrison = Army::from_troops(vec![
            Troop::new(MonsterId::BlackDragon, 2),
            Troop::new(MonsterId::Goblin, 4),
        ]);

        hero_army.join_strongest_from(&mut garrison);
        assert!(hero_army.has_monster(MonsterId::BlackDragon));
        assert!(hero_army.has_monster(MonsterId::Goblin));
    }

    #[test]
    fn undead_army_detection() {
        let undead = Army::from_troops(vec![
            Troop::new(MonsterId::Skeleton, 10),
            Troop::new(MonsterId::Vampire, 3),
        ]);
        assert!(undead.all_troops_are_undead());

        let mixed = Army::from_troops(vec![
            Troop::new(MonsterId::Skeleton, 10),
            Troop::new(MonsterId::Peasant, 1),
        ]);
        assert!(!mixed.all_troops_are_undead());
    }

    #[test]
    fn slowest_troop_is_found() {
        let army = Army::from_troops(vec![
            Troop::new(MonsterId::Gargoyle, 2),
            Troop::new(MonsterId::Ogre, 2),
        ]);
        let index = army.slowest_troop_index().unwrap();
        assert_eq!(army.troops()[index].monster, MonsterId::Ogre);
    }
}
