use bitflags::bitflags;
use ravenmoor_core::monster::{MonsterAbility, MonsterId};
use ravenmoor_core::color::PlayerColor;
use ravenmoor_core::speed;
use ravenmoor_core::spell::Spell;

use crate::board;

bitflags! {
    /// Modifier flags of a battle unit. The `SP_*` flags mirror active spell
    /// effects, `TR_*` flags track per-round state.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct UnitModes: u32 {
        const SP_BLESS = 1 << 0;
        const SP_CURSE = 1 << 1;
        const SP_HASTE = 1 << 2;
        const SP_SLOW = 1 << 3;
        const SP_BLIND = 1 << 4;
        const SP_PARALYZE = 1 << 5;
        const SP_STONE = 1 << 6;
        const SP_BERSERKER = 1 << 7;
        const SP_HYPNOTIZE = 1 << 8;
        const SP_SHIELD = 1 << 9;
        const SP_ANTIMAGIC = 1 << 10;
        const SP_STONESKIN = 1 << 11;
        const SP_STEELSKIN = 1 << 12;
        const SP_BLOODLUST = 1 << 13;
        const SP_DRAGONSLAYER = 1 << 14;
        /// This stack is an illusion created by Mirror Image.
        const CAP_MIRRORIMAGE = 1 << 15;
        /// This stack owns a Mirror Image copy.
        const CAP_MIRROROWNER = 1 << 16;
        /// The unit has already acted this round.
        const TR_MOVED = 1 << 17;
        /// The unit has spent its retaliation this round.
        const TR_RESPONDED = 1 << 18;
        /// Scoped flag granted while evaluating the Teleport spell.
        const TELEPORT_ABILITY = 1 << 19;
    }
}

impl UnitModes {
    pub fn is_good_magic(self) -> bool {
        self.intersects(
            UnitModes::SP_BLESS
                | UnitModes::SP_HASTE
                | UnitModes::SP_SHIELD
                | UnitModes::SP_ANTIMAGIC
                | UnitModes::SP_STONESKIN
                | UnitModes::SP_STEELSKIN
                | UnitModes::SP_BLOODLUST
                | UnitModes::SP_DRAGONSLAYER,
        )
    }

    pub fn is_bad_magic(self) -> bool {
        self.intersects(
            UnitModes::SP_CURSE
                | UnitModes::SP_SLOW
                | UnitModes::SP_BLIND
                | UnitModes::SP_PARALYZE
                | UnitModes::SP_STONE
                | UnitModes::SP_BERSERKER
                | UnitModes::SP_HYPNOTIZE,
        )
    }

    pub fn is_under_magic(self) -> bool {
        self.is_good_magic() || self.is_bad_magic()
    }
}

/// A troop stack inside a battle. Lifetime: one battle.
#[derive(Debug, Clone)]
pub struct BattleUnit {
    pub uid: u32,
    pub monster: MonsterId,
    /// Total remaining hit points of the stack.
    pub hp: u32,
    pub initial_count: u32,
    pub dead: u32,
    /// The army this unit belongs to.
    pub army_color: PlayerColor,
    /// The side the unit currently fights for (differs under Hypnotize).
    pub current_color: PlayerColor,
    /// Head cell; the tail of a wide unit derives from the reflection flag.
    pub head: i32,
    pub reflected: bool,
    pub shots_left: u32,
    pub modes: UnitModes,
    /// Spells currently affecting the unit, for dispel valuation.
    pub spell_effects: Vec<Spell>,
}

impl BattleUnit {
    pub fn new(uid: u32, monster: MonsterId, count: u32, color: PlayerColor, head: i32, reflected: bool) -> Self {
        BattleUnit {
            uid,
            monster,
            hp: monster.stats().hp * count,
            initial_count: count,
            dead: 0,
            army_color: color,
            current_color: color,
            head,
            reflected,
            shots_left: monster.stats().shots,
            modes: UnitModes::default(),
            spell_effects: Vec::new(),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.hp > 0
    }

    pub fn count(&self) -> u32 {
        let per_creature = self.monster.stats().hp.max(1);
        self.hp.div_ceil(per_creature)
    }

    pub fn is_wide(&self) -> bool {
        self.monster.has_ability(MonsterAbility::WIDE)
    }

    /// Tail cell of a wide unit, -1 for narrow units. A non-reflected unit
    /// faces right, so its tail trails on the left.
    pub fn tail(&self) -> i32 {
        if !self.is_wide() {
            return -1;
        }
        if self.reflected {
            self.head + 1
        } else {
            self.head - 1
        }
    }

    pub fn occupies(&self, cell: i32) -> bool {
        cell == self.head || (self.is_wide() && cell == self.tail())
    }

    pub fn is_flying(&self) -> bool {
        self.monster.has_ability(MonsterAbility::FLYER)
    }

    pub fn is_archer(&self) -> bool {
        self.monster.has_ability(MonsterAbility::ARCHER) && self.shots_left > 0
    }

    pub fn is_dragon(&self) -> bool {
        self.monster.is_dragon()
    }

    pub fn is_immovable(&self) -> bool {
        self.modes
            .intersects(UnitModes::SP_BLIND | UnitModes::SP_PARALYZE | UnitModes::SP_STONE)
    }

    pub fn is_retaliation_allowed(&self) -> bool {
        !self.modes.contains(UnitModes::TR_RESPONDED) && !self.is_immovable()
    }

    pub fn is_ignoring_retaliation(&self) -> bool {
        self.monster.has_ability(MonsterAbility::IGNORE_RETALIATION)
    }

    /// Current speed. With `future_turn` the per-round disables are ignored,
    /// giving the speed the unit will have next round.
    pub fn speed(&self, future_turn: bool) -> u32 {
        if self.is_immovable() && !future_turn {
            return speed::STANDING;
        }

        let mut value = self.monster.stats().speed;
        if self.modes.contains(UnitModes::SP_HASTE) {
            value = speed::hastened(value);
        }
        if self.modes.contains(UnitModes::SP_SLOW) {
            value = speed::slowed(value);
        }
        value
    }

    pub fn monster_strength(&self) -> f64 {
        self.monster.monster_strength()
    }

    /// Strength of the whole stack, top creature counted by its remaining HP.
    pub fn strength(&self) -> f64 {
        let per_creature = self.monster.stats().hp.max(1);
        let whole = self.hp / per_creature;
        let fraction = (self.hp % per_creature) as f64 / per_creature as f64;
        self.monster_strength() * (whole as f64 + fraction)
    }

    pub fn damage_min(&self) -> u32 {
        self.monster.stats().damage_min * self.count()
    }

    pub fn damage_max(&self) -> u32 {
        self.monster.stats().damage_max * self.count()
    }

    /// Expected damage of one strike against the given defender, honoring
    /// Bless and Curse and the attack/defense skill difference.
    pub fn average_damage_to(&self, defender: &BattleUnit) -> f64 {
        let base = if self.modes.contains(UnitModes::SP_CURSE) {
            self.damage_min() as f64
        } else if self.modes.contains(UnitModes::SP_BLESS) {
            self.damage_max() as f64
        } else {
            (self.damage_min() + self.damage_max()) as f64 / 2.0
        };

        let mut attack = self.monster.stats().attack as i32;
        if self.modes.contains(UnitModes::SP_BLOODLUST) {
            attack += Spell::Bloodlust.extra_value() as i32;
        }
        if self.modes.contains(UnitModes::SP_DRAGONSLAYER) && defender.is_dragon() {
            attack += Spell::DragonSlayer.extra_value() as i32;
        }

        let mut defense = defender.monster.stats().defense as i32;
        if defender.modes.contains(UnitModes::SP_STONESKIN) {
            defense += Spell::Stoneskin.extra_value() as i32;
        }
        if defender.modes.contains(UnitModes::SP_STEELSKIN) {
            defense += Spell::Steelskin.extra_value() as i32;
        }

        let skill_modifier = (1.0 + (attack - defense) as f64 * 0.1).clamp(0.5, 3.0);
        base * skill_modifier
    }

    /// Damage the defender would return after surviving the given hit.
    pub fn estimate_retaliatory_damage(&self, damage_taken: u32, attacker: &BattleUnit) -> f64 {
        if !self.is_retaliation_allowed() || attacker.is_ignoring_retaliation() {
            return 0.0;
        }
        let killed = self.how_many_will_be_killed(damage_taken);
        let survivors = self.count().saturating_sub(killed);
        if survivors == 0 {
            return 0.0;
        }
        self.average_damage_to(attacker) * survivors as f64 / self.count().max(1) as f64
    }

    pub fn hit_points(&self) -> u32 {
        self.hp
    }

    pub fn missing_hit_points(&self) -> u32 {
        self.monster.stats().hp * self.initial_count - self.hp.min(self.monster.stats().hp * self.initial_count)
    }

    pub fn how_many_will_be_killed(&self, damage: u32) -> u32 {
        if damage >= self.hp {
            return self.count();
        }
        let per_creature = self.monster.stats().hp.max(1);
        self.count() - (self.hp - damage).div_ceil(per_creature)
    }

    /// Magic resistance in percent against a spell from the given caster side.
    pub fn magic_resist(&self, spell: Spell) -> u32 {
        if self.modes.contains(UnitModes::SP_ANTIMAGIC) {
            return 100;
        }
        if self.monster == MonsterId::BlackDragon {
            // Fully magic-immune.
            return 100;
        }
        if self.monster.is_undead() && spell.is_mind_influence() {
            return 100;
        }
        if spell == Spell::DeathRipple || spell == Spell::DeathWave {
            if self.monster.is_undead() {
                return 100;
            }
            return 0;
        }
        if (spell == Spell::HolyWord || spell == Spell::HolyShout) && !self.monster.is_undead() {
            return 100;
        }
        if self.monster.has_ability(MonsterAbility::ELEMENTAL) && spell.is_mind_influence() {
            return 100;
        }
        0
    }

    pub fn allow_apply_spell(&self, spell: Spell) -> bool {
        if self.modes.contains(UnitModes::SP_ANTIMAGIC) && spell != Spell::Dispel && spell != Spell::MassDispel {
            return false;
        }
        if spell.is_resurrect() {
            if spell == Spell::AnimateDead && !self.monster.is_undead() {
                return false;
            }
            if spell != Spell::AnimateDead && self.monster.is_undead() {
                return false;
            }
            return true;
        }
        self.magic_resist(spell) < 100
    }

    /// The threat this unit poses to the given defender: its expected damage
    /// output weighted by how freely it can deliver it.
    pub fn evaluate_threat_for(&self, defender: &BattleUnit, blocked_in_melee: bool) -> f64 {
        if !self.is_valid() {
            return 0.0;
        }

        let mut damage = self.average_damage_to(defender);

        if self.is_archer() && !blocked_in_melee {
            // A free shooter strikes every round without closing in.
            damage *= 2.0;
        } else if self.is_immovable() {
            damage *= 0.25;
        } else if !self.is_flying() {
            // Walkers need time to arrive.
            let dist = board::distance(self.head, defender.head).max(1);
            let turns = (dist as f64 / self.speed(true).max(1) as f64).max(1.0);
            damage /= turns.sqrt();
        }

        damage
    }

    pub fn set_mode(&mut self, mode: UnitModes) {
        self.modes.insert(mode);
    }

    pub fn reset_mode(&mut self, mode: UnitModes) {
        self.modes.remove(mode);
    }

    /// Applies an active spell effect with its mode flag.
    pub fn apply_spell_effect(&mut self, spell: Spell) {
        let mode = match spell {
            Spell::Bless | Spell::MassBless => UnitModes::SP_BLESS,
            Spell::Curse | Spell::MassCurse => UnitModes::SP_CURSE,
            Spell::Haste | Spell::MassHaste => UnitModes::SP_HASTE,
            Spell::Slow | Spell::MassSlow => UnitModes::SP_SLOW,
            Spell::Blind => UnitModes::SP_BLIND,
            Spell::Paralyze => UnitModes::SP_PARALYZE,
            Spell::Berserker => UnitModes::SP_BERSERKER,
            Spell::Hypnotize => UnitModes::SP_HYPNOTIZE,
            Spell::Shield | Spell::MassShield => UnitModes::SP_SHIELD,
            Spell::AntiMagic => UnitModes::SP_ANTIMAGIC,
            Spell::Stoneskin => UnitModes::SP_STONESKIN,
            Spell::Steelskin => UnitModes::SP_STEELSKIN,
            Spell::Bloodlust => UnitModes::SP_BLOODLUST,
            Spell::DragonSlayer => UnitModes::SP_DRAGONSLAYER,
            Spell::MirrorImage => UnitModes::CAP_MIRROROWNER,
            _ => return,
        };
        self.modes.insert(mode);
        if !self.spell_effects.contains(&spell) {
            self.spell_effects.push(spell);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit(monster: MonsterId, count: u32) -> BattleUnit {
        BattleUnit::new(1, monster, count, PlayerColor::Blue, 22, false)
    }

    #[test]
    fn kill_count_follows_hit_points() {
        let stack = unit(MonsterId::Swordsman, 10); // 25 hp each
        assert_eq!(stack.how_many_will_be_killed(24), 0);
        assert_eq!(stack.how_many_will_be_killed(25), 1);
        assert_eq!(stack.how_many_will_be_killed(70), 2);
        assert_eq!(stack.how_many_will_be_killed(10_000), 10);
    }

    #[test]
    fn bless_and_curse_pin_damage_to_the_extremes() {
        let target = unit(MonsterId::Peasant, 1);

        let mut blessed = unit(MonsterId::Swordsman, 10);
        blessed.modes.insert(UnitModes::SP_BLESS);
        let mut cursed = unit(MonsterId::Swordsman, 10);
        cursed.modes.insert(UnitModes::SP_CURSE);
        let plain = unit(MonsterId::Swordsman, 10);

        assert!(blessed.average_damage_to(&target) > plain.average_damage_to(&target));
        assert!(cursed.average_damage_to(&target) < plain.average_damage_to(&target));
    }

    #[test]
    fn free_archers_threaten_double() {
        let defender = unit(MonsterId::Swordsman, 10);
        let archer = unit(MonsterId::Ranger, 20);

        let free = archer.evaluate_threat_for(&defender, false);
        let blocked = archer.evaluate_threat_for(&defender, true);
        assert!(free > blocked * 1.5);
    }

    #[test]
    fn hypnotized_units_change_sides_not_armies() {
        let mut stack = unit(MonsterId::Wolf, 5);
        stack.current_color = PlayerColor::Red;
        assert_eq!(stack.army_color, PlayerColor::Blue);
        assert_ne!(stack.current_color, stack.army_color);
    }

    #[test]
    fn undead_resist_mind_spells() {
        let skeletons = unit(MonsterId::Skeleton, 10);
        assert_eq!(skeletons.magic_resist(Spell::Blind), 100);
        assert_eq!(skeletons.magic_resist(Spell::LightningBolt), 0);
        assert!(!skeletons.allow_apply_spell(Spell::Resurrect));
        assert!(skeletons.allow_apply_spell(Spell::AnimateDead));
    }

    #[test]
    fn wide_units_trail_their_tail() {
        let rider = BattleUnit::new(1, MonsterId::Cavalry, 3, PlayerColor::Blue, 22, false);
        assert_eq!(rider.tail(), 21);

        let reflected = BattleUnit::new(2, MonsterId::Cavalry, 3, PlayerColor::Red, 22, true);
        assert_eq!(reflected.tail(), 23);
    }
}
