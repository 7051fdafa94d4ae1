use serde::{Deserialize, Serialize};

use crate::artifact::{Artifact, ArtifactBonusType, BagArtifacts};
use crate::skill::{Secondary, SkillKind, SkillLevel};
use crate::spell::Spell;
use crate::troop::Army;
use crate::color::PlayerColor;

/// Morale and luck share the same -3..=3 scale.
pub mod morale {
    pub const TREASON: i32 = -3;
    pub const AWFUL: i32 = -2;
    pub const POOR: i32 = -1;
    pub const NORMAL: i32 = 0;
    pub const GOOD: i32 = 1;
    pub const GREAT: i32 = 2;
    pub const BLOOD: i32 = 3;
}

pub mod luck {
    pub const CURSED: i32 = -3;
    pub const AWFUL: i32 = -2;
    pub const BAD: i32 = -1;
    pub const NORMAL: i32 = 0;
    pub const GOOD: i32 = 1;
    pub const GREAT: i32 = 2;
    pub const IRISH: i32 = 3;
}

/// Index of a hero in the world's hero arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct HeroId(pub u32);

/// The adventure-map personality assigned to each AI hero every kingdom turn.
/// Ordering reflects seniority: a hero never travels to meet one of a lower role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum HeroRole {
    Courier,
    Scout,
    #[default]
    Hunter,
    Fighter,
    Champion,
}

/// A mobile agent on the adventure map.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hero {
    pub id: HeroId,
    pub name: String,
    pub color: PlayerColor,
    pub position: i32,
    pub attack: u32,
    pub defense: u32,
    pub power: u32,
    pub knowledge: u32,
    pub secondary_skills: Vec<Secondary>,
    pub bag: BagArtifacts,
    pub spell_book: Vec<Spell>,
    pub spell_points: u32,
    pub move_points: u32,
    pub army: Army,
    pub role: HeroRole,
    pub experience: u32,
    pub patrol: bool,
    pub patrol_distance: u32,
    pub sleeper: bool,
    pub active: bool,
    pub met_heroes: Vec<HeroId>,
    pub dimension_door_casts: u32,
}

impl Hero {
    pub fn new(id: HeroId, name: &str, color: PlayerColor, position: i32) -> Self {
        Hero {
            id,
            name: name.to_string(),
            color,
            position,
            attack: 1,
            defense: 1,
            power: 1,
            knowledge: 1,
            secondary_skills: Vec::new(),
            bag: BagArtifacts::new(),
            spell_book: Vec::new(),
            spell_points: 10,
            move_points: 1500,
            army: Army::new(),
            role: HeroRole::Hunter,
            experience: 0,
            patrol: false,
            patrol_distance: 0,
            sleeper: false,
            active: true,
            met_heroes: Vec::new(),
            dimension_door_casts: 0,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn skill_level(&self, kind: SkillKind) -> SkillLevel {
        self.secondary_skills
            .iter()
            .find(|skill| skill.kind == kind)
            .map(|skill| skill.level)
            .unwrap_or(SkillLevel::None)
    }

    pub fn has_secondary_skill(&self, kind: SkillKind) -> bool {
        self.skill_level(kind) != SkillLevel::None
    }

    pub fn has_max_secondary_skills(&self) -> bool {
        self.secondary_skills.len() >= 8
    }

    pub fn have_spell_book(&self) -> bool {
        self.bag.contains(Artifact::MagicBook)
    }

    pub fn have_spell(&self, spell: Spell) -> bool {
        self.spell_book.contains(&spell)
    }

    pub fn learn_spell(&mut self, spell: Spell) {
        if self.have_spell_book() && !self.have_spell(spell) {
            self.spell_book.push(spell);
        }
    }

    pub fn can_cast_spell(&self, spell: Spell) -> bool {
        self.have_spell_book() && self.have_spell(spell) && self.spell_points >= spell.cost()
    }

    pub fn may_cast_adventure_spells(&self) -> bool {
        self.have_spell_book() && self.spell_book.iter().any(|spell| spell.is_adventure())
    }

    pub fn max_spell_points(&self) -> u32 {
        self.knowledge * 10
    }

    /// Spell points regained overnight; Mysticism speeds regeneration up.
    pub fn daily_restored_spell_points(&self) -> u32 {
        let base = 1 + self.bag.total_effect_value(ArtifactBonusType::SpellPointsDailyGeneration).max(0) as u32;
        base + match self.skill_level(SkillKind::Mysticism) {
            SkillLevel::None => 0,
            SkillLevel::Basic => 2,
            SkillLevel::Advanced => 3,
            SkillLevel::Expert => 4,
        }
    }

    /// A hero whose magic meaningfully shapes battles; such heroes rate magic
    /// wells and springs far above others.
    pub fn is_potent_spellcaster(&self) -> bool {
        self.have_spell_book()
            && self.power >= 4
            && self.spell_book.iter().any(|spell| spell.is_combat() && spell.level() >= 3)
    }

    pub fn morale(&self) -> i32 {
        if self.bag.is_bonus_present(ArtifactBonusType::MaximumMorale) {
            return morale::BLOOD;
        }

        let mut value = self.bag.total_effect_value(ArtifactBonusType::Morale);
        value += match self.skill_level(SkillKind::Leadership) {
            SkillLevel::None => 0,
            SkillLevel::Basic => 1,
            SkillLevel::Advanced => 2,
            SkillLevel::Expert => 3,
        };
        value.clamp(morale::TREASON, morale::BLOOD)
    }

    pub fn luck(&self) -> i32 {
        if self.bag.is_bonus_present(ArtifactBonusType::MaximumLuck) {
            return luck::IRISH;
        }

        let mut value = self.bag.total_effect_value(ArtifactBonusType::Luck);
        value += match self.skill_level(SkillKind::Luck) {
            SkillLevel::None => 0,
            SkillLevel::Basic => 1,
            SkillLevel::Advanced => 2,
            SkillLevel::Expert => 3,
        };
        value.clamp(luck::CURSED, luck::IRISH)
    }

    pub fn total_primary_skill_level(&self) -> u32 {
        self.attack + self.defense + self.power + self.knowledge
    }

    pub fn level(&self) -> u32 {
        self.experience / 1000 + 1
    }

    /// Experience still missing before the next level-up.
    pub fn experience_to_next_level(&self) -> u32 {
        self.level() * 1000 - self.experience
    }

    /// Combined worth of primary and secondary skills, used for role sorting.
    pub fn stats_value(&self) -> i32 {
        let secondary: i32 = self
            .secondary_skills
            .iter()
            .map(|skill| match skill.level {
                SkillLevel::None => 0,
                SkillLevel::Basic => 1,
                SkillLevel::Advanced => 2,
                SkillLevel::Expert => 3,
            })
            .sum();
        self.total_primary_skill_level() as i32 + secondary
    }

    /// Movement budget restored at dawn: slow armies travel shorter days.
    pub fn max_move_points(&self) -> u32 {
        let base = 1300 + self.army.slowest_speed() * 30;
        let logistics = match self.skill_level(SkillKind::Logistics) {
            SkillLevel::None => 0,
            SkillLevel::Basic => base / 10,
            SkillLevel::Advanced => base / 5,
            SkillLevel::Expert => base * 3 / 10,
        };
        let artifacts = self.bag.total_effect_value(ArtifactBonusType::LandMobility).max(0) as u32;
        base + logistics + artifacts
    }

    pub fn may_still_move(&self) -> bool {
        self.active && !self.sleeper && self.move_points > 0
    }

    pub fn has_met(&self, other: HeroId) -> bool {
        self.met_heroes.contains(&other)
    }

    pub fn mark_met(&mut self, other: HeroId) {
        if !self.met_heroes.contains(&other) {
            self.met_heroes.push(other);
        }
    }

    /// Value this hero would gain from meeting a friendly hero: troops to hand
    /// over and artifacts the other side can still carry.
    pub fn meeting_value(&self, other: &Hero) -> f64 {
        let transferable = self.army.strength().min(other.army.strength() * 2.0);
        let mut value = transferable * 0.3;

        if !other.bag.is_full() && self.bag.has_valuable_artifacts() {
            value += 500.0;
        }

        value
    }

    /// Worth of re-hiring this hero; used when choosing between tavern recruits.
    pub fn recruit_value(&self) -> f64 {
        self.army.strength() + self.stats_value() as f64 * 100.0
    }

    /// Minimum strength a wandering stack must add before joining it is worth
    /// a detour.
    pub fn min_joining_army_strength(&self) -> f64 {
        self.army.strength() / 10.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monster::MonsterId;
    use crate::troop::Troop;

    fn hero() -> Hero {
        Hero::new(HeroId(0), "Aldric", PlayerColor::Blue, 42)
    }

    #[test]
    fn spellcasting_requires_book_spell_and_points() {
        let mut hero = hero();
        assert!(!hero.can_cast_spell(Spell::Haste));

        hero.bag.push(Artifact::MagicBook);
        hero.learn_spell(Spell::Haste);
        hero.spell_points = Spell::Haste.cost();
        assert!(hero.can_cast_spell(Spell::Haste));

        hero.spell_points = Spell::Haste.cost() - 1;
        assert!(!hero.can_cast_spell(Spell::Haste));
    }

    #[test]
    fn learning_without_a_book_is_ignored() {
        let mut hero = hero();
        hero.learn_spell(Spell::Haste);
        assert!(!hero.have_spell(Spell::Haste));
    }

    #[test]
    fn slow_army_travels_less() {
        let mut fast = hero();
        fast.army.join_troop(MonsterId::Gargoyle, 5);

        let mut slow = hero();
        slow.army.join_troop(MonsterId::Ogre, 5);

        assert!(fast.max_move_points() > slow.max_move_points());
    }

    #[test]
    fn roles_are_ordered_by_seniority() {
        assert!(HeroRole::Champion > HeroRole::Fighter);
        assert!(HeroRole::Fighter > HeroRole::Hunter);
        assert!(HeroRole::Hunter > HeroRole::Scout);
        assert!(HeroRole::Scout > HeroRole::Courier);
    }

    #[test]
    fn meeting_value_rises_with_transferable_troops() {
        let mut courier = hero();
        courier.army = Army::from_troops(vec![Troop::new(MonsterId::Swordsman, 30)]);

        let mut champion = hero();
        champion.id = HeroId(1);
        champion.army = Army::from_troops(vec![Troop::new(MonsterId::Paladin, 40)]);

        let mut empty_handed = hero();
        empty_handed.id = HeroId(2);
        empty_handed.army = Army::from_troops(vec![Troop::new(MonsterId::Peasant, 1)]);

        assert!(courier.meeting_value(&champion) > empty_handed.meeting_value(&champion));
    }
}
