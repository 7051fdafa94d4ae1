use ravenmoor_core::artifact::{ArtifactBonusType, BagArtifacts};
use ravenmoor_core::color::PlayerColor;
use ravenmoor_core::spell::Spell;
use ravenmoor_core::spell_info;

/// The two kinds of spellcasting entity a side can field. Only a real hero
/// may retreat, surrender or gain experience; a captain stays with the castle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommanderKind {
    Hero,
    Captain,
}

/// The spellcasting entity of one battle side.
#[derive(Debug, Clone)]
pub struct Commander {
    pub kind: CommanderKind,
    pub color: PlayerColor,
    pub attack: u32,
    pub defense: u32,
    pub power: u32,
    pub knowledge: u32,
    pub spell_points: u32,
    pub spells: Vec<Spell>,
    pub bag: BagArtifacts,
    /// One combat spell per round.
    pub spell_cast_this_round: bool,
    pub is_control_human: bool,
}

impl Commander {
    pub fn new(kind: CommanderKind, color: PlayerColor) -> Self {
        Commander {
            kind,
            color,
            attack: 1,
            defense: 1,
            power: 1,
            knowledge: 1,
            spell_points: 10,
            spells: Vec::new(),
            bag: BagArtifacts::new(),
            spell_cast_this_round: false,
            is_control_human: false,
        }
    }

    pub fn is_hero(&self) -> bool {
        self.kind == CommanderKind::Hero
    }

    pub fn max_spell_points(&self) -> u32 {
        self.knowledge * 10
    }

    pub fn have_spell_book(&self) -> bool {
        self.bag.contains(ravenmoor_core::artifact::Artifact::MagicBook)
    }

    pub fn have_spell(&self, spell: Spell) -> bool {
        self.spells.contains(&spell)
    }

    pub fn can_cast_spell(&self, spell: Spell) -> bool {
        self.have_spell_book() && self.have_spell(spell) && self.spell_points >= spell.cost()
    }

    /// Spell power including artifact-extended effect duration.
    pub fn effect_duration(&self) -> u32 {
        spell_info::effect_duration(self.power, Some(&self.bag))
    }

    /// The strongest damage a single affordable spell can deal right now.
    pub fn maximum_spell_damage_value(&self) -> f64 {
        self.spells
            .iter()
            .filter(|spell| spell.is_combat() && spell.is_damage())
            .filter(|spell| self.spell_points >= spell.cost())
            .map(|&spell| spell_info::spell_damage(spell, self.power, Some(&self.bag)) as f64)
            .fold(0.0, f64::max)
    }

    /// Overall magical threat of this commander, relative to the army size it
    /// faces. Feeds the Anti-Magic valuation of the opponent.
    pub fn magic_strategic_value(&self, opposing_army_strength: f64) -> f64 {
        if !self.have_spell_book() || self.spells.is_empty() {
            return 0.0;
        }

        let best_damage = self.maximum_spell_damage_value();
        let casts = self
            .spells
            .iter()
            .filter(|spell| spell.cost() > 0)
            .map(|spell| self.spell_points / spell.cost())
            .max()
            .unwrap_or(0)
            .min(10);

        let mut value = best_damage * (1.0 + casts as f64 / 4.0);
        if self.spells.iter().any(|spell| spell.is_resurrect()) {
            value += opposing_army_strength * 0.05;
        }
        value
    }

    pub fn no_shooting_penalty(&self) -> bool {
        self.bag.is_bonus_present(ArtifactBonusType::NoShootingPenalty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ravenmoor_core::artifact::Artifact;

    fn caster() -> Commander {
        let mut commander = Commander::new(CommanderKind::Hero, PlayerColor::Blue);
        commander.bag.push(Artifact::MagicBook);
        commander
    }

    #[test]
    fn casting_needs_book_knowledge_and_points() {
        let mut commander = caster();
        commander.spells.push(Spell::LightningBolt);
        commander.spell_points = 7;
        assert!(commander.can_cast_spell(Spell::LightningBolt));

        commander.spell_points = 6;
        assert!(!commander.can_cast_spell(Spell::LightningBolt));
        assert!(!commander.can_cast_spell(Spell::Fireball));
    }

    #[test]
    fn best_damage_spell_wins() {
        let mut commander = caster();
        commander.power = 4;
        commander.spells = vec![Spell::Arrow, Spell::LightningBolt];
        commander.spell_points = 20;

        // Lightning at 25 per power beats Arrow at 10 per power.
        assert_eq!(commander.maximum_spell_damage_value(), 400.0);
    }

    #[test]
    fn captains_are_not_heroes() {
        let captain = Commander::new(CommanderKind::Captain, PlayerColor::Red);
        assert!(!captain.is_hero());
    }
}
