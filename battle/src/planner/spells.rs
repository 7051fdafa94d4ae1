//! Combat spell valuation: every castable spell is scored, the best one above
//! the per-battle threshold wins the turn.

use ravenmoor_core::speed;
use ravenmoor_core::spell::Spell;
use ravenmoor_core::spell_info;
use tracing::trace;

use crate::arena::{Arena, TeleportAbilityGuard};
use crate::board;
use crate::commander::Commander;
use crate::unit::{BattleUnit, UnitModes};

use super::melee::{
    best_attack_outcome, evaluate_potential_attack_positions, is_outcome_improved, MeleeAttackOutcome,
};
use super::BattlePlanner;

const ANTIMAGIC_LOW_LIMIT: f64 = 200.0;
const BLOODLUST_RATIO: f64 = 0.1;

/// The chosen spell, its aim cell and the value that won. For Teleport the
/// destination cell is carried separately.
#[derive(Debug, Clone, Copy)]
pub struct SpellSelection {
    pub spell: Spell,
    pub cell: i32,
    pub value: f64,
    pub teleport_destination: i32,
}

impl SpellSelection {
    fn none() -> Self {
        SpellSelection { spell: Spell::None, cell: -1, value: 0.0, teleport_destination: -1 }
    }
}

/// Accumulator for one spell's evaluation: single-target spells keep the best
/// cell, mass effects sum over all targets.
#[derive(Debug, Clone, Copy)]
struct SpellcastOutcome {
    cell: i32,
    value: f64,
    destination: i32,
}

impl SpellcastOutcome {
    fn none() -> Self {
        SpellcastOutcome { cell: -1, value: 0.0, destination: -1 }
    }

    fn update(&mut self, potential_value: f64, target_cell: i32, is_mass_effect: bool) {
        if is_mass_effect {
            self.value += potential_value;
        } else if potential_value > self.value {
            self.value = potential_value;
            self.cell = target_cell;
        }
    }
}

/// Spell effectiveness fades once the unit has crossed the battlefield.
fn reduce_effectiveness_by_distance(unit: &BattleUnit) -> f64 {
    board::distance_from_board_edge_along_x(unit.head, unit.reflected).max(1) as f64
}

impl BattlePlanner {
    /// Scores every castable combat spell and returns the best one. When
    /// `retreating`, only kills matter and the threshold is waived: this is
    /// the farewell cast.
    pub(crate) fn select_best_spell(&self, arena: &mut Arena, unit_uid: u32, retreating: bool) -> SpellSelection {
        let Some(commander) = arena.commander(self.my_color()).cloned() else {
            debug_assert!(false, "spell selection without a commander");
            return SpellSelection::none();
        };

        let (my_strength, enemy_strength, _, enemy_shooters, _, _) = self.battle_values();

        // Conserve spell points when winning or already drained: the
        // threshold is about 20% of a single unit when armies are equal.
        let mut threshold = my_strength * my_strength / enemy_strength.max(f64::MIN_POSITIVE) * 0.04;
        if enemy_shooters / enemy_strength.max(f64::MIN_POSITIVE) > 0.5 {
            threshold *= 0.5;
        }
        if commander.spell_points * 2 < commander.max_spell_points() {
            threshold *= 2.0;
        }

        let mut best = SpellSelection::none();

        for spell in commander.spells.clone() {
            if !spell.is_combat() || !commander.can_cast_spell(spell) {
                continue;
            }
            if retreating && !spell.is_damage() {
                continue;
            }

            let outcome = if spell.is_damage() {
                self.spell_damage_value(arena, &commander, spell, unit_uid, retreating)
            } else if spell.is_effect_dispel() {
                self.spell_dispel_value(arena, &commander, spell)
            } else if spell.is_summon() {
                self.spell_summon_value(arena, &commander, spell)
            } else if spell.is_resurrect() {
                self.spell_resurrect_value(arena, &commander, spell)
            } else if spell == Spell::DragonSlayer {
                self.spell_dragon_slayer_value(arena, &commander, spell)
            } else if spell == Spell::Teleport {
                self.spell_teleport_value(arena, &commander, unit_uid)
            } else if spell == Spell::Earthquake {
                self.spell_earthquake_value(arena, &commander)
            } else if spell.is_apply_to_friends() {
                let targets: Vec<u32> = arena
                    .units
                    .iter()
                    .filter(|unit| unit.is_valid() && unit.current_color == self.my_color() && unit.army_color == self.my_color())
                    .map(|unit| unit.uid)
                    .collect();
                self.spell_effect_outcome(arena, &commander, spell, &targets)
            } else if spell.is_apply_to_enemies() {
                let enemy_color = arena.enemy_color(self.my_color());
                let targets: Vec<u32> = arena
                    .units
                    .iter()
                    .filter(|unit| unit.is_valid() && unit.current_color == enemy_color && unit.army_color == enemy_color)
                    .map(|unit| unit.uid)
                    .collect();
                self.spell_effect_outcome(arena, &commander, spell, &targets)
            } else {
                continue;
            };

            // Higher spell levels pay a sub-linear cost penalty; level 1 is
            // the unpenalised baseline.
            let value = if retreating {
                outcome.value
            } else {
                outcome.value / (spell.cost() as f64 / 3.0).sqrt()
            };
            let ignore_threshold = retreating || spell.is_resurrect();

            trace!(spell = ?spell, value, cell = outcome.cell, "spell scored");

            if value > best.value && (ignore_threshold || value > threshold) {
                best = SpellSelection {
                    spell,
                    cell: outcome.cell,
                    value,
                    teleport_destination: outcome.destination,
                };
            }
        }

        best
    }

    fn spell_damage_value(
        &self,
        arena: &Arena,
        commander: &Commander,
        spell: Spell,
        unit_uid: u32,
        retreating: bool,
    ) -> SpellcastOutcome {
        let (my_strength, enemy_strength, _, _, my_speed, enemy_speed) = self.battle_values();
        let damage = spell_info::spell_damage(spell, commander.power, Some(&commander.bag));

        let damage_heuristic = |unit: &BattleUnit, army_strength: f64, army_speed: f64| -> f64 {
            let effective = damage * (100 - unit.magic_resist(spell)) / 100;
            // An immune target is neither hurt nor woken up.
            if effective == 0 {
                return 0.0;
            }

            if retreating {
                return unit.monster_strength() * unit.how_many_will_be_killed(effective) as f64;
            }

            let hitpoints = if unit.modes.contains(UnitModes::CAP_MIRRORIMAGE) { 1 } else { unit.hit_points() };
            if effective >= hitpoints {
                // Destroying a whole stack earns a share of the army on top,
                // double for stacks faster than the army around them.
                let bonus = if unit.speed(false) as f64 > army_speed { 0.07 } else { 0.035 };
                return unit.strength() + army_strength * bonus;
            }

            let mut fraction_lost = (effective as f64 / hitpoints as f64).min(1.0);
            // Partial damage wakes a disabled unit: what survives is the
            // penalty.
            if unit.is_immovable() {
                fraction_lost += fraction_lost - 1.0;
            }
            fraction_lost * unit.strength()
        };

        let mut outcome = SpellcastOutcome::none();
        let my_color = self.my_color();
        let enemies = arena.enemy_force(my_color);
        let friendly = arena.force(my_color);

        if spell.is_single_target() {
            for enemy in &enemies {
                outcome.update(damage_heuristic(enemy, enemy_strength, enemy_speed), enemy.head, false);
            }
        } else if spell.is_apply_without_focus() {
            let mut value = 0.0;
            for enemy in &enemies {
                value += damage_heuristic(enemy, enemy_strength, enemy_speed);
            }
            for unit in &friendly {
                let lost = damage_heuristic(unit, my_strength, my_speed);
                if retreating && unit.uid == unit_uid && (lost - unit.strength()).abs() < 0.001 {
                    // The farewell cast must not kill the caster's own last
                    // acting stack outright.
                    return outcome;
                }
                value -= lost;
            }
            outcome.update(value, -1, false);
        } else {
            // Aimed area spells: evaluate every meaningful aim cell.
            let mut check_area = |cell: i32| {
                let mut value = 0.0;
                for &uid in &arena.get_targets_for_spell(my_color, spell, cell) {
                    let Some(target) = arena.unit_by_uid(uid) else {
                        continue;
                    };
                    if target.current_color == my_color {
                        let lost = damage_heuristic(target, my_strength, my_speed);
                        if retreating && target.uid == unit_uid && (lost - target.strength()).abs() < 0.001 {
                            return;
                        }
                        value -= lost;
                    } else {
                        value += damage_heuristic(target, enemy_strength, enemy_speed);
                    }
                }
                outcome.update(value, cell, false);
            };

            if spell == Spell::ChainLightning {
                for enemy in &enemies {
                    if enemy.allow_apply_spell(spell) {
                        check_area(enemy.head);
                    }
                }
            } else {
                for cell in 0..board::SIZE {
                    check_area(cell);
                }
            }
        }

        outcome
    }

    /// Zero when the effect would not survive the round anyway.
    fn spell_duration_multiplier(&self, commander: &Commander, target: &BattleUnit) -> f64 {
        let duration = commander.effect_duration();
        if duration < 2 && target.modes.contains(UnitModes::TR_MOVED) {
            return 0.0;
        }
        1.0
    }

    fn disrupting_ray_ratio(&self, target: &BattleUnit) -> f64 {
        let target_defense = target.monster.stats().defense as f64;
        if target_defense <= 1.0 {
            return 0.0;
        }

        let mut ratio = 0.2;
        let spell_value = Spell::DisruptingRay.extra_value() as f64;
        if target_defense <= spell_value {
            ratio *= (target_defense - 1.0) / spell_value;
        }

        let (my_strength, _, _, _, _, _) = self.battle_values();
        let target_strength = target.strength();
        // Against an overwhelming stack direct damage serves better.
        if my_strength < target_strength {
            ratio *= my_strength / target_strength;
        }

        ratio
    }

    fn slow_ratio(&self, target: &BattleUnit) -> f64 {
        if target.is_archer() || self.is_attacking_castle() {
            // Slow does nothing to shooters or to troops holding a castle.
            return 0.01;
        }

        let current_speed = target.speed(true);
        let lost_speed = current_speed - speed::slowed(current_speed);
        let mut ratio = 0.1 * lost_speed as f64;

        let (_, _, _, _, my_speed, _) = self.battle_values();
        if (current_speed as f64) < my_speed {
            ratio /= 2.0;
        }
        if target.modes.contains(UnitModes::SP_HASTE) {
            ratio *= 2.0;
        } else if !target.is_flying() {
            ratio /= reduce_effectiveness_by_distance(target);
        }
        ratio
    }

    fn haste_ratio(&self, target: &BattleUnit) -> f64 {
        let current_speed = target.speed(true);
        let gained_speed = speed::hastened(current_speed) - current_speed;
        let mut ratio = 0.05 * gained_speed as f64;

        let (_, _, _, _, _, enemy_speed) = self.battle_values();
        if (current_speed as f64) < enemy_speed {
            ratio *= 2.0;
        }
        if target.modes.contains(UnitModes::SP_SLOW) {
            ratio *= 2.0;
        } else if target.is_archer() || self.is_defensive_tactics() {
            // Nobody has to move; speed is worth less.
            ratio /= 2.0;
        }
        ratio
    }

    /// Value of one buff/debuff on one target. `for_dispel` skips the
    /// usefulness checks: dispelling weighs effects that are already there.
    fn spell_effect_value(
        &self,
        arena: &Arena,
        commander: &Commander,
        spell: Spell,
        target: &BattleUnit,
        target_is_last: bool,
        for_dispel: bool,
    ) -> f64 {
        if !for_dispel
            && (self.is_spellcast_useless_for_unit(arena, commander, target, spell) || !target.allow_apply_spell(spell))
        {
            return 0.0;
        }

        let mut ratio = match spell {
            Spell::Slow | Spell::MassSlow => self.slow_ratio(target),
            Spell::Blind => {
                if target_is_last {
                    // A blinded last stack retaliates at half strength; only
                    // worth it when the retaliation is still unspent.
                    if target.monster.has_ability(ravenmoor_core::monster::MonsterAbility::UNLIMITED_RETALIATION) {
                        return 0.0;
                    }
                    if !target.is_retaliation_allowed() {
                        return 0.0;
                    }
                    0.4
                } else {
                    0.8
                }
            }
            Spell::Curse | Spell::MassCurse => {
                if target.monster.stats().damage_min == target.monster.stats().damage_max {
                    return 0.0;
                }
                0.15
            }
            Spell::Berserker => {
                if target_is_last {
                    // Nobody is left for the berserk stack to turn against.
                    return 0.0;
                }
                0.85
            }
            Spell::Paralyze => {
                if target_is_last {
                    if target.monster.has_ability(ravenmoor_core::monster::MonsterAbility::UNLIMITED_RETALIATION) {
                        return 0.0;
                    }
                    if !target.is_retaliation_allowed() {
                        return 0.0;
                    }
                    if self.spell_duration_multiplier(commander, target) < 1.0 {
                        return 0.0;
                    }
                    0.5
                } else {
                    0.85
                }
            }
            Spell::Hypnotize => 1.5,
            Spell::DisruptingRay => self.disrupting_ray_ratio(target),
            Spell::Haste | Spell::MassHaste => self.haste_ratio(target),
            Spell::Bloodlust => BLOODLUST_RATIO,
            Spell::Bless | Spell::MassBless => {
                if target.monster.stats().damage_min == target.monster.stats().damage_max {
                    return 0.0;
                }
                0.15
            }
            Spell::Stoneskin => 0.1,
            Spell::Steelskin => 0.2,
            Spell::AntiMagic | Spell::MirrorImage | Spell::Shield | Spell::MassShield => 0.0,
            _ => return 0.0,
        };

        // Conditional ratios and situational multipliers.
        if target.modes.contains(UnitModes::SP_BLESS) && matches!(spell, Spell::Curse | Spell::MassCurse) {
            ratio *= 2.0;
        } else if target.modes.contains(UnitModes::SP_CURSE) && matches!(spell, Spell::Bless | Spell::MassBless) {
            ratio *= 2.0;
        } else if spell == Spell::AntiMagic
            && !target.modes.is_good_magic()
            && self.enemy_spell_strength() > ANTIMAGIC_LOW_LIMIT
        {
            // A resurrecting commander wants his spell points elsewhere.
            let ratio_limit = if commander
                .spells
                .iter()
                .any(|other| other.is_resurrect() && commander.spell_points >= other.cost() && target.allow_apply_spell(*other))
            {
                0.35
            } else {
                0.9
            };

            ratio = (self.enemy_spell_strength() / ANTIMAGIC_LOW_LIMIT * 0.036).min(ratio_limit);

            let (_, enemy_strength, _, _, _, _) = self.battle_values();
            // Hit-and-run casters are stronger than their armies.
            if self.enemy_spell_strength() > enemy_strength {
                ratio *= 1.5;
            }
            if target.modes.is_bad_magic() {
                ratio *= 2.0;
            }
        } else if spell == Spell::MirrorImage {
            ratio = if target.is_archer() {
                1.0
            } else if target.is_flying() {
                0.55
            } else {
                0.33
            };

            let (_, _, _, _, _, enemy_speed) = self.battle_values();
            // A slow clone dies before it acts.
            if (target.speed(false) as f64) < enemy_speed {
                ratio /= 5.0;
            }
        } else if spell == Spell::Berserker && !target.is_archer() {
            ratio /= reduce_effectiveness_by_distance(target);
        } else if matches!(spell, Spell::Shield | Spell::MassShield) {
            let (_, enemy_strength, _, _, _, _) = self.battle_values();
            ratio = self.enemy_ranged_units_only() / enemy_strength.max(f64::MIN_POSITIVE) * 0.3;
            if target.is_archer() {
                ratio *= 1.25;
            }
        }

        target.strength() * ratio * self.spell_duration_multiplier(commander, target)
    }

    fn spell_effect_outcome(&self, arena: &Arena, commander: &Commander, spell: Spell, targets: &[u32]) -> SpellcastOutcome {
        let is_single_target_left = targets.len() == 1;
        let is_mass = spell.is_mass();

        let mut outcome = SpellcastOutcome::none();
        for &uid in targets {
            let Some(unit) = arena.unit_by_uid(uid) else {
                continue;
            };
            let value = self.spell_effect_value(arena, commander, spell, unit, is_single_target_left, false);
            outcome.update(value, unit.head, is_mass);
        }
        outcome
    }

    /// Dispel family: sum of the enemy-cast effects on our side (and, for the
    /// full dispel, our own buffs subtracted; over enemies with signs
    /// swapped).
    fn spell_dispel_value(&self, arena: &Arena, commander: &Commander, spell: Spell) -> SpellcastOutcome {
        let is_mass = spell.is_mass();
        let is_dispel = spell == Spell::Dispel || spell == Spell::MassDispel;

        let mut outcome = SpellcastOutcome::none();

        for unit in arena.force(self.my_color()) {
            if !unit.modes.is_under_magic() {
                continue;
            }

            let mut unit_value = 0.0;
            for &effect in &unit.spell_effects {
                let effect_value = self.spell_effect_value(arena, commander, effect, unit, false, true);
                if effect.is_apply_to_enemies() {
                    unit_value += effect_value;
                } else if is_dispel && effect.is_apply_to_friends() {
                    unit_value -= effect_value;
                }
            }
            outcome.update(unit_value, unit.head, is_mass);
        }

        if is_dispel {
            let enemies = arena.enemy_force(self.my_color());
            let enemy_is_last = enemies.len() == 1;

            for unit in enemies {
                if !unit.modes.is_under_magic() {
                    continue;
                }

                let mut unit_value = 0.0;
                for &effect in &unit.spell_effects {
                    let effect_value = self.spell_effect_value(arena, commander, effect, unit, enemy_is_last, true);
                    if effect.is_apply_to_friends() {
                        unit_value += effect_value;
                    } else {
                        unit_value -= effect_value;
                    }
                }
                outcome.update(unit_value, unit.head, is_mass);
            }
        }

        outcome
    }

    fn spell_resurrect_value(&self, arena: &Arena, commander: &Commander, spell: Spell) -> SpellcastOutcome {
        let hp_restored = spell_info::resurrect_points(spell, commander.power, Some(&commander.bag));
        let (my_strength, enemy_strength, _, _, _, _) = self.battle_values();

        let mut outcome = SpellcastOutcome::none();

        let mut update_for = |unit: &BattleUnit| {
            let missing = unit.missing_hit_points().min(hp_restored);
            let mut value = missing as f64 * unit.monster_strength() / unit.monster.stats().hp.max(1) as f64;

            // A permanent resurrect while winning keeps the troops forever.
            if my_strength > enemy_strength && spell != Spell::Resurrect {
                value *= 2.0;
            }
            outcome.update(value, unit.head, false);
        };

        for unit in arena.force(self.my_color()) {
            if unit.allow_apply_spell(spell) {
                update_for(unit);
            }
        }
        for cell in arena.graveyard_cells() {
            if let Some(unit) = arena.last_resurrectable_from_graveyard(cell, spell) {
                if unit.army_color == self.my_color() {
                    update_for(unit);
                }
            }
        }

        outcome
    }

    fn spell_summon_value(&self, arena: &Arena, commander: &Commander, spell: Spell) -> SpellcastOutcome {
        let position = arena.free_position_near_hero(self.my_color());
        if position < 0 {
            return SpellcastOutcome::none();
        }
        let Some(monster) = ravenmoor_core::monster::MonsterId::from_summon_spell(spell) else {
            return SpellcastOutcome::none();
        };

        let count = spell_info::summon_monster_count(spell, commander.power, Some(&commander.bag));
        let troop = ravenmoor_core::troop::Troop::new(monster, count);

        let mut outcome = SpellcastOutcome::none();
        outcome.value = troop.strength_with_bonus(commander.attack, commander.defense);
        outcome.cell = position;

        let (my_strength, enemy_strength, _, _, _, _) = self.battle_values();
        // Less point in summoning when the battle is already won.
        if my_strength > enemy_strength * 2.0 {
            outcome.value /= 2.0;
        }
        outcome
    }

    fn spell_dragon_slayer_value(&self, arena: &Arena, commander: &Commander, spell: Spell) -> SpellcastOutcome {
        debug_assert_eq!(spell, Spell::DragonSlayer);

        let mut enemy_strength = 0.0;
        let mut dragon_strength = 0.0;
        for enemy in arena.enemy_force(self.my_color()) {
            let strength = enemy.strength();
            if enemy.is_dragon() {
                dragon_strength += strength;
            }
            enemy_strength += strength;
        }

        if dragon_strength <= 0.0 {
            return SpellcastOutcome::none();
        }

        // Estimate against Bloodlust: the same kind of attack bonus, but only
        // counting against the dragons' share of the enemy army.
        let bloodlust_bonus = Spell::Bloodlust.extra_value() as f64;
        let slayer_bonus = spell.extra_value() as f64;
        let ratio = BLOODLUST_RATIO * slayer_bonus / bloodlust_bonus * dragon_strength / enemy_strength;

        let mut outcome = SpellcastOutcome::none();
        for unit in arena.force(self.my_color()) {
            if self.is_spellcast_useless_for_unit(arena, commander, unit, spell) {
                continue;
            }
            let value = unit.strength() * ratio * self.spell_duration_multiplier(commander, unit);
            outcome.update(value, unit.head, false);
        }
        outcome
    }

    /// Teleport is valuable for a grounded melee unit that cannot reach
    /// anybody: verified by granting a scoped teleport ability and re-asking
    /// the melee outcome.
    fn spell_teleport_value(&self, arena: &mut Arena, commander: &Commander, unit_uid: u32) -> SpellcastOutcome {
        if self.is_defensive_tactics() {
            return SpellcastOutcome::none();
        }

        let Some(unit) = arena.unit_by_uid(unit_uid) else {
            return SpellcastOutcome::none();
        };
        if self.is_spellcast_useless_for_unit(arena, commander, unit, Spell::Teleport) {
            return SpellcastOutcome::none();
        }
        if unit.is_flying() || unit.is_archer() {
            return SpellcastOutcome::none();
        }

        let head = unit.head;
        let strength = unit.strength();

        let current_outcome = self.melee_best_damage(arena, unit_uid);
        if current_outcome.0 > 0.1 {
            // Someone is already in reach; no teleport needed.
            return SpellcastOutcome::none();
        }

        let best_target = {
            let guard = TeleportAbilityGuard::new(arena, unit_uid);
            self.melee_best_damage(guard.arena(), unit_uid)
        };
        if best_target.0 < 0.1 {
            return SpellcastOutcome::none();
        }

        SpellcastOutcome { cell: head, value: strength * BLOODLUST_RATIO, destination: best_target.1 }
    }

    /// The best immediate melee damage available to the unit, with the cell
    /// it would attack from.
    fn melee_best_damage(&self, arena: &Arena, unit_uid: u32) -> (f64, i32) {
        let Some(unit) = arena.unit_by_uid(unit_uid) else {
            return (0.0, -1);
        };

        let position_values = evaluate_potential_attack_positions(arena, unit);
        let mut best = MeleeAttackOutcome::worst();
        let mut found = false;

        for enemy in arena.enemy_force(self.my_color()) {
            if enemy.uid == unit_uid {
                continue;
            }
            let outcome = best_attack_outcome(arena, unit, enemy, &position_values, |_| true);
            if !outcome.can_attack_immediately {
                continue;
            }
            if is_outcome_improved(&outcome, &best) {
                best = outcome;
                found = true;
            }
        }

        if found {
            (best.attack_value.max(0.1), best.from_head)
        } else {
            (0.0, -1)
        }
    }

    /// Earthquake only matters for a melee army stuck outside castle walls.
    fn spell_earthquake_value(&self, arena: &Arena, commander: &Commander) -> SpellcastOutcome {
        if !self.is_attacking_castle() {
            return SpellcastOutcome::none();
        }

        let mut melee_units = 0;
        let mut melee_strength = 0.0;
        for unit in arena.force(self.my_color()) {
            if !unit.is_flying() && !unit.is_archer() {
                melee_units += 1;
                melee_strength += unit.strength();
            }
        }
        if melee_units == 0 {
            return SpellcastOutcome::none();
        }

        let Some(siege) = &arena.castle else {
            return SpellcastOutcome::none();
        };
        if siege.wall_targets_total == 0 || siege.wall_targets_intact == 0 {
            return SpellcastOutcome::none();
        }

        let (my_strength, enemy_strength, _, enemy_shooters, _, _) = self.battle_values();

        let min_damage = commander.power;
        let max_damage = commander.power * 2;
        let average_damage = (max_damage - min_damage) as f64 / 2.0;

        let enemy_shooter_ratio = enemy_shooters / enemy_strength.max(f64::MIN_POSITIVE);
        let target_ratio = siege.wall_targets_intact as f64 / siege.wall_targets_total as f64;
        let melee_ratio = melee_strength / my_strength.max(f64::MIN_POSITIVE);

        SpellcastOutcome {
            cell: 0,
            value: melee_units as f64 * melee_strength * melee_ratio * target_ratio * average_damage * enemy_shooter_ratio * 0.2,
            destination: -1,
        }
    }

    /// The uselessness filter: drops a spell for a target that already
    /// carries the effect, is immune, is disabled (except for Anti-Magic) or
    /// simply cannot profit.
    fn is_spellcast_useless_for_unit(
        &self,
        arena: &Arena,
        commander: &Commander,
        unit: &BattleUnit,
        spell: Spell,
    ) -> bool {
        if unit.is_immovable() && spell != Spell::AntiMagic {
            return true;
        }

        match spell {
            Spell::Bless | Spell::MassBless => unit.modes.contains(UnitModes::SP_BLESS),
            Spell::Bloodlust => unit.modes.contains(UnitModes::SP_BLOODLUST),
            Spell::Curse | Spell::MassCurse => unit.modes.contains(UnitModes::SP_CURSE),
            Spell::Haste | Spell::MassHaste => {
                unit.modes.contains(UnitModes::SP_HASTE) || unit.speed(true) == speed::INSTANT
            }
            Spell::Slow | Spell::MassSlow => {
                unit.modes.contains(UnitModes::SP_SLOW) || unit.speed(true) == speed::CRAWLING
            }
            Spell::Shield | Spell::MassShield => {
                // A one-round shield is wasted once every shooter has acted.
                if commander.effect_duration() == 1 {
                    let any_active_shooter = arena.enemy_force(self.my_color()).iter().any(|enemy| {
                        enemy.is_archer() && !enemy.is_immovable() && !enemy.modes.contains(UnitModes::TR_MOVED)
                    });
                    if !any_active_shooter {
                        return true;
                    }
                }
                unit.modes.contains(UnitModes::SP_SHIELD)
            }
            Spell::Stoneskin | Spell::Steelskin => {
                unit.modes.intersects(UnitModes::SP_STONESKIN | UnitModes::SP_STEELSKIN)
            }
            Spell::Blind | Spell::Paralyze => {
                unit.modes.intersects(UnitModes::SP_BLIND | UnitModes::SP_PARALYZE | UnitModes::SP_STONE)
            }
            Spell::DragonSlayer => unit.modes.contains(UnitModes::SP_DRAGONSLAYER),
            Spell::AntiMagic => unit.modes.contains(UnitModes::SP_ANTIMAGIC),
            Spell::Berserker => unit.modes.contains(UnitModes::SP_BERSERKER),
            Spell::Hypnotize => {
                // Only stacks small enough to control are worth the cast.
                unit.modes.contains(UnitModes::SP_HYPNOTIZE)
                    || unit.hit_points() > spell_info::hypnotize_hp_limit(commander.power, Some(&commander.bag))
            }
            Spell::MirrorImage => unit.modes.contains(UnitModes::CAP_MIRROROWNER),
            Spell::DisruptingRay => unit.monster.stats().defense <= 1,
            Spell::Teleport => false,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::CastleSiege;
    use crate::commander::{Commander, CommanderKind};
    use ravenmoor_core::artifact::Artifact;
    use ravenmoor_core::color::PlayerColor;
    use ravenmoor_core::difficulty::Difficulty;
    use ravenmoor_core::monster::MonsterId;

    fn caster(color: PlayerColor, power: u32, spells: Vec<Spell>) -> Commander {
        let mut commander = Commander::new(CommanderKind::Hero, color);
        commander.bag.push(Artifact::MagicBook);
        commander.power = power;
        commander.knowledge = 10;
        commander.spell_points = 100;
        commander.spells = spells;
        commander
    }

    fn two_sided_arena() -> Arena {
        let mut arena = Arena::new(PlayerColor::Blue, PlayerColor::Red);
        arena.units.push(BattleUnit::new(1, MonsterId::Swordsman, 20, PlayerColor::Blue, 22, false));
        arena.units.push(BattleUnit::new(2, MonsterId::Pikeman, 20, PlayerColor::Red, 32, true));
        arena
    }

    fn planner_for(arena: &mut Arena, unit_uid: u32) -> BattlePlanner {
        let mut planner = BattlePlanner::new(Difficulty::Normal);
        planner.analyze_battle_state(arena, unit_uid);
        planner
    }

    #[test]
    fn damage_spell_beats_nothing_and_aims_at_the_enemy() {
        let mut arena = two_sided_arena();
        arena.add_commander(caster(PlayerColor::Blue, 5, vec![Spell::LightningBolt]));

        let planner = planner_for(&mut arena, 1);
        let selection = planner.select_best_spell(&mut arena, 1, false);

        assert_eq!(selection.spell, Spell::LightningBolt);
        assert_eq!(selection.cell, 32);
    }

    #[test]
    fn no_affordable_spell_yields_none() {
        let mut arena = two_sided_arena();
        let mut commander = caster(PlayerColor::Blue, 5, vec![Spell::LightningBolt]);
        commander.spell_points = 0;
        arena.add_commander(commander);

        let planner = planner_for(&mut arena, 1);
        let selection = planner.select_best_spell(&mut arena, 1, false);
        assert_eq!(selection.spell, Spell::None);
    }

    #[test]
    fn hypnotize_keeps_value_on_the_last_small_enemy() {
        // S5: one enemy stack of 40 HP, spell power 10 -> 250 controllable HP.
        let mut arena = Arena::new(PlayerColor::Blue, PlayerColor::Red);
        arena.units.push(BattleUnit::new(1, MonsterId::Swordsman, 4, PlayerColor::Blue, 22, false));
        let mut enemy = BattleUnit::new(2, MonsterId::Wolf, 2, PlayerColor::Red, 32, true);
        enemy.hp = 40;
        arena.units.push(enemy);
        arena.add_commander(caster(
            PlayerColor::Blue,
            10,
            vec![Spell::Hypnotize, Spell::Blind, Spell::Paralyze, Spell::Berserker],
        ));

        let planner = planner_for(&mut arena, 1);
        let commander = arena.commander(PlayerColor::Blue).unwrap().clone();
        let target = arena.unit_by_uid(2).unwrap().clone();

        assert!(!planner.is_spellcast_useless_for_unit(&arena, &commander, &target, Spell::Hypnotize));
        // The mind spells score zero on the last enemy, Hypnotize does not.
        assert_eq!(planner.spell_effect_value(&arena, &commander, Spell::Berserker, &target, true, false), 0.0);
        let hypnotize = planner.spell_effect_value(&arena, &commander, Spell::Hypnotize, &target, true, false);
        assert!(hypnotize > 0.0);
        let expected = target.strength() * 1.5;
        assert!((hypnotize - expected).abs() < 0.001);
    }

    #[test]
    fn earthquake_needs_a_siege_and_melee_troops() {
        let mut arena = two_sided_arena();
        arena.add_commander(caster(PlayerColor::Blue, 5, vec![Spell::Earthquake]));

        let planner = planner_for(&mut arena, 1);
        let commander = arena.commander(PlayerColor::Blue).unwrap().clone();
        assert_eq!(planner.spell_earthquake_value(&arena, &commander).value, 0.0);

        arena.castle = Some(CastleSiege {
            defender: PlayerColor::Red,
            towers_strength: 30.0,
            has_moat: true,
            wall_targets_total: 6,
            wall_targets_intact: 6,
        });
        let planner = planner_for(&mut arena, 1);
        assert!(planner.spell_earthquake_value(&arena, &commander).value > 0.0);
    }

    #[test]
    fn resurrect_ignores_the_value_threshold() {
        let mut arena = two_sided_arena();
        // Wound our stack badly.
        arena.unit_by_uid_mut(1).unwrap().hp = 25;
        arena.add_commander(caster(PlayerColor::Blue, 5, vec![Spell::Resurrect]));

        let planner = planner_for(&mut arena, 1);
        let selection = planner.select_best_spell(&mut arena, 1, false);
        assert_eq!(selection.spell, Spell::Resurrect);
        assert_eq!(selection.cell, 22);
    }
}
