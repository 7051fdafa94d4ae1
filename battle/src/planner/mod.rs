mod melee;
mod spells;

pub use spells::SpellSelection;

use ravenmoor_core::color::PlayerColor;
use ravenmoor_core::difficulty::Difficulty;
use ravenmoor_core::monster::MonsterAbility;
use ravenmoor_core::speed;
use tracing::{debug, trace};

use crate::arena::{Arena, UnitRemover};
use crate::board;
use crate::command::{Actions, Command};
use crate::commander::Commander;
use crate::position::Position;
use crate::unit::{BattleUnit, UnitModes};

use melee::{find_nearest_cell_next_to_unit, get_unit_movement_target, optimal_attack_vector, threat};

/// When this many consecutive turns pass without a death on either side, the
/// attacking AI gives up on the battle.
pub const MAX_TURNS_WITHOUT_DEATHS: u32 = 50;

/// Target selected by the melee decision trees: a cell to move to and
/// optionally a unit to strike.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct BattleTargetPair {
    pub cell: i32,
    pub unit: Option<u32>,
}

impl BattleTargetPair {
    pub fn none() -> Self {
        BattleTargetPair { cell: -1, unit: None }
    }
}

/// The battle decision engine. Turn-limit counters live across the whole
/// battle; everything else is recomputed per unit turn.
pub struct BattlePlanner {
    difficulty: Difficulty,

    // Turn-limit bookkeeping.
    current_turn_number: u32,
    remaining_turns_without_deaths: u32,
    attacker_dead_count: u32,
    defender_dead_count: u32,

    // Per-turn analysis results.
    my_color: PlayerColor,
    my_army_strength: f64,
    enemy_army_strength: f64,
    my_shooters_strength: f64,
    enemy_shooters_strength: f64,
    my_ranged_units_only: f64,
    enemy_ranged_units_only: f64,
    my_army_average_speed: f64,
    enemy_average_speed: f64,
    enemy_spell_strength: f64,
    attacking_castle: bool,
    defending_castle: bool,
    consider_retreat: bool,
    defensive_tactics: bool,
    cautious_offensive: bool,
}

impl BattlePlanner {
    pub fn new(difficulty: Difficulty) -> Self {
        BattlePlanner {
            difficulty,
            current_turn_number: 0,
            remaining_turns_without_deaths: MAX_TURNS_WITHOUT_DEATHS,
            attacker_dead_count: 0,
            defender_dead_count: 0,
            my_color: PlayerColor::None,
            my_army_strength: 0.0,
            enemy_army_strength: 0.0,
            my_shooters_strength: 0.0,
            enemy_shooters_strength: 0.0,
            my_ranged_units_only: 0.0,
            enemy_ranged_units_only: 0.0,
            my_army_average_speed: 0.0,
            enemy_average_speed: 0.0,
            enemy_spell_strength: 0.0,
            attacking_castle: false,
            defending_castle: false,
            consider_retreat: false,
            defensive_tactics: false,
            cautious_offensive: false,
        }
    }

    /// Must be called when a battle starts; resets the turn-limit counters.
    pub fn battle_begins(&mut self) {
        self.current_turn_number = 0;
        self.remaining_turns_without_deaths = MAX_TURNS_WITHOUT_DEATHS;
        self.attacker_dead_count = 0;
        self.defender_dead_count = 0;
    }

    /// Plans the turn of one unit. The arena is mutable only for the scoped
    /// guards (temporary unit removal, temporary teleport flag); it is
    /// unchanged on return.
    pub fn battle_turn(&mut self, arena: &mut Arena, unit_uid: u32) -> Actions {
        let mut actions = Actions::new();
        if self.is_limit_of_turns_exceeded(arena, &mut actions) {
            return actions;
        }

        actions.extend(self.plan_unit_turn(arena, unit_uid));
        actions
    }

    pub(crate) fn my_color(&self) -> PlayerColor {
        self.my_color
    }

    pub(crate) fn is_cautious_offensive(&self) -> bool {
        self.cautious_offensive
    }

    pub(crate) fn is_attacking_castle(&self) -> bool {
        self.attacking_castle
    }

    pub(crate) fn is_defending_castle(&self) -> bool {
        self.defending_castle
    }

    pub(crate) fn my_ranged_units_only(&self) -> f64 {
        self.my_ranged_units_only
    }

    pub(crate) fn battle_values(&self) -> (f64, f64, f64, f64, f64, f64) {
        (
            self.my_army_strength,
            self.enemy_army_strength,
            self.my_shooters_strength,
            self.enemy_shooters_strength,
            self.my_army_average_speed,
            self.enemy_average_speed,
        )
    }

    pub(crate) fn enemy_spell_strength(&self) -> f64 {
        self.enemy_spell_strength
    }

    pub(crate) fn enemy_ranged_units_only(&self) -> f64 {
        self.enemy_ranged_units_only
    }

    pub(crate) fn is_defensive_tactics(&self) -> bool {
        self.defensive_tactics
    }

    /// The turn-limit gate. Only evaluated on the attacker's side; the counter
    /// resets whenever either side's dead count changes between turns.
    fn is_limit_of_turns_exceeded(&mut self, arena: &Arena, actions: &mut Actions) -> bool {
        let current_color = arena.current_color();
        if current_color != arena.attacker_color() {
            return false;
        }

        let turn = arena.turn_number();
        debug_assert!(turn > 0);

        if turn > self.current_turn_number && self.remaining_turns_without_deaths > 0 {
            let dead_now = (
                arena.force_dead_count(arena.attacker_color()),
                arena.force_dead_count(arena.defender_color()),
            );
            let dead_before = (self.attacker_dead_count, self.defender_dead_count);

            if self.current_turn_number == 0 || turn - self.current_turn_number != 1 || dead_now != dead_before {
                self.attacker_dead_count = dead_now.0;
                self.defender_dead_count = dead_now.1;
                self.remaining_turns_without_deaths = MAX_TURNS_WITHOUT_DEATHS;
            } else {
                self.remaining_turns_without_deaths -= 1;
            }

            self.current_turn_number = turn;
        }

        if self.remaining_turns_without_deaths == 0 {
            if arena.auto_battle_in_progress() {
                debug!("turn limit exhausted, switching auto battle off");
                actions.push(Command::AutoSwitch(current_color));
            } else {
                debug!("turn limit exhausted, the attacker retreats");
                debug_assert!(arena.can_retreat_opponent(current_color));
                actions.push(Command::Retreat);
            }
            return true;
        }

        false
    }

    fn plan_unit_turn(&mut self, arena: &mut Arena, unit_uid: u32) -> Actions {
        let Some(unit) = arena.unit_by_uid(unit_uid) else {
            return vec![Command::Skip(unit_uid)];
        };

        if unit.modes.contains(UnitModes::SP_BERSERKER) {
            return self.berserk_turn(arena, unit_uid);
        }

        let mut actions = Actions::new();

        self.analyze_battle_state(arena, unit_uid);

        let unit = arena.unit_by_uid(unit_uid).expect("unit disappeared during analysis");
        trace!(unit = unit.monster.name(), color = ?self.my_color, "planning unit turn");

        // Retreat/surrender gate: only real heroes may leave a battle.
        if let Some(outcome) = self.retreat_or_surrender_outcome(arena) {
            // Farewell cast: the best damage spell, threshold ignored.
            if self.commander_can_spellcast(arena) {
                let farewell = self.select_best_spell(arena, unit_uid, true);
                if farewell.spell.is_valid() {
                    actions.push(Command::Cast { spell: farewell.spell, cell: farewell.cell });
                }
            }
            actions.push(outcome);
            return actions;
        }

        // Spell heuristics.
        if self.commander_can_spellcast(arena) {
            let selection = self.select_best_spell(arena, unit_uid, false);
            if selection.spell.is_valid() {
                debug!(spell = ?selection.spell, cell = selection.cell, "casting");
                actions.push(Command::Cast { spell: selection.spell, cell: selection.cell });
                return actions;
            }
        }

        let unit = arena.unit_by_uid(unit_uid).expect("unit must still exist");
        let planned = if unit.is_archer() {
            self.archer_decision(arena, unit_uid)
        } else {
            let target = if self.defensive_tactics {
                self.melee_unit_defense(arena, unit_uid)
            } else {
                self.melee_unit_offense(arena, unit_uid)
            };
            self.melee_actions_from_target(arena, unit_uid, target)
        };
        actions.extend(planned);

        if actions.is_empty() {
            actions.push(Command::Skip(unit_uid));
        }
        actions
    }

    /// Turns a melee target pair into concrete commands.
    fn melee_actions_from_target(&self, arena: &Arena, unit_uid: u32, target: BattleTargetPair) -> Actions {
        let mut actions = Actions::new();
        let unit = arena.unit_by_uid(unit_uid).expect("planner works on live units");

        if target.cell == -1 {
            return actions;
        }

        let move_target = get_unit_movement_target(arena, unit, target.cell);

        if let Some(target_uid) = target.unit {
            let enemy = arena.unit_by_uid(target_uid).expect("melee target must exist");
            let (attack_cell, attack_direction) = optimal_attack_vector(arena, unit, enemy, move_target);
            actions.push(Command::Attack {
                attacker: unit_uid,
                target: target_uid,
                move_to: if unit.head == move_target { -1 } else { move_target },
                target_cell: attack_cell,
                direction: attack_direction,
            });
        } else if unit.head != move_target {
            actions.push(Command::Move { unit: unit_uid, cell: move_target });
        }

        actions
    }

    fn commander_can_spellcast(&self, arena: &Arena) -> bool {
        arena
            .commander(self.my_color)
            .map(|commander| {
                !commander.is_control_human
                    && commander.have_spell_book()
                    && !commander.spell_cast_this_round
                    && !arena.is_spellcast_disabled()
            })
            .unwrap_or(false)
    }

    /// The retreat/surrender decision, evaluated at the gate of every unit
    /// turn.
    fn retreat_or_surrender_outcome(&self, arena: &Arena) -> Option<Command> {
        let commander = arena.commander(self.my_color)?;
        if !commander.is_hero() || commander.is_control_human {
            return None;
        }
        if !self.consider_retreat {
            return None;
        }

        if self.my_army_strength * self.difficulty.ai_retreat_army_strength_ratio() >= self.enemy_army_strength {
            return None;
        }

        let has_valuable_artifacts = commander.bag.has_valuable_artifacts();
        let able_to_surrender = arena.can_surrender_opponent(self.my_color);
        let able_to_retreat = arena.can_retreat_opponent(self.my_color);

        // An experienced hero is worth saving so he can be hired again.
        let minimum_primary_level_for_retreat = 10;
        let experienced =
            commander.attack + commander.defense + commander.power + commander.knowledge >= minimum_primary_level_for_retreat;

        if !able_to_retreat {
            if !able_to_surrender {
                return None;
            }
            if has_valuable_artifacts || experienced {
                return Some(Command::Surrender);
            }
            return None;
        }

        if has_valuable_artifacts || experienced {
            return Some(Command::Retreat);
        }
        None
    }

    /// Computes the per-turn army statistics and picks the tactic.
    fn analyze_battle_state(&mut self, arena: &Arena, unit_uid: u32) {
        let unit = arena.unit_by_uid(unit_uid).expect("analysis needs a live unit");
        self.my_color = unit.current_color;

        self.my_army_strength = 0.0;
        self.enemy_army_strength = 0.0;
        self.my_shooters_strength = 0.0;
        self.enemy_shooters_strength = 0.0;
        self.my_ranged_units_only = 0.0;
        self.enemy_ranged_units_only = 0.0;
        self.my_army_average_speed = 0.0;
        self.enemy_average_speed = 0.0;
        self.enemy_spell_strength = 0.0;
        self.attacking_castle = false;
        self.defending_castle = false;
        self.consider_retreat = false;
        self.defensive_tactics = false;
        self.cautious_offensive = false;

        let enemy_color = arena.enemy_color(self.my_color);

        let mut enemy_speed_weight = 0.0;
        for enemy in arena.force(enemy_color) {
            let strength = enemy.strength();
            self.enemy_army_strength += strength;
            if enemy.is_archer() && !enemy.is_immovable() {
                self.enemy_ranged_units_only += strength;
            }
            self.enemy_average_speed += enemy.speed(true) as f64 * strength;
            enemy_speed_weight += strength;
        }
        self.enemy_shooters_strength = self.enemy_ranged_units_only;
        if enemy_speed_weight > 0.0 {
            self.enemy_average_speed /= enemy_speed_weight;
        }

        let mut initial_unit_count = 0;
        let mut my_speed_weight = 0.0;
        for mine in arena.army_units(self.my_color) {
            if mine.initial_count > 0 || mine.dead > 0 {
                initial_unit_count += 1;
            }

            let strength = mine.strength();
            self.my_army_average_speed += mine.speed(true) as f64 * strength;
            my_speed_weight += strength;

            if !mine.is_valid() && mine.dead > 0 {
                // Lost a whole stack already; the battle is going badly.
                self.consider_retreat = true;
                continue;
            }

            self.my_army_strength += strength;
            if mine.is_archer() && !mine.is_immovable() {
                self.my_ranged_units_only += strength;
            }
        }
        self.my_shooters_strength = self.my_ranged_units_only;
        if my_speed_weight > 0.0 {
            self.my_army_average_speed /= my_speed_weight;
        }

        self.consider_retreat = self.consider_retreat || initial_unit_count < 4;

        // Castle siege modifiers: towers shoot for the defender, walls cover
        // against the attacker's shooters.
        const WALL_RANGED_PENALTY: f64 = 50.0;
        if let Some(siege) = &arena.castle {
            let attacker_ignores_cover = arena
                .commander(arena.attacker_color())
                .map(Commander::no_shooting_penalty)
                .unwrap_or(false);

            if self.my_color == siege.defender {
                self.defending_castle = true;
                self.my_shooters_strength += siege.towers_strength;
                if !attacker_ignores_cover {
                    self.enemy_shooters_strength /= 1.0 + WALL_RANGED_PENALTY / 100.0;
                }
            } else {
                self.attacking_castle = true;
                self.enemy_shooters_strength += siege.towers_strength;
                if !attacker_ignores_cover {
                    self.my_shooters_strength /= 1.0 + WALL_RANGED_PENALTY / 100.0;
                }
            }
        }

        if let Some(commander) = arena.commander(self.my_color) {
            if self.my_shooters_strength > 1.0 {
                self.my_shooters_strength += commander.maximum_spell_damage_value();
            }
        }
        if let Some(enemy_commander) = arena.enemy_commander(self.my_color) {
            self.enemy_spell_strength = enemy_commander.magic_strategic_value(self.my_army_strength);
            self.enemy_shooters_strength += enemy_commander.maximum_spell_damage_value();
        }

        debug_assert!(self.my_army_strength > 0.0);

        let my_archer_ratio = self.my_shooters_strength / self.my_army_strength.max(f64::MIN_POSITIVE);
        let enemy_archer_ratio = self.enemy_shooters_strength / self.enemy_army_strength.max(f64::MIN_POSITIVE);

        self.defensive_tactics = {
            let in_our_half = self.is_position_located_in_defended_area(unit, &Position::of_unit(unit));
            let overpower_ratio = if unit.is_flying() { 6.0 } else { 10.0 };

            if !in_our_half {
                false
            } else if self.my_army_strength > self.enemy_army_strength * overpower_ratio {
                false
            } else if self.my_shooters_strength < self.enemy_shooters_strength {
                false
            } else if self.defending_castle {
                true
            } else {
                my_archer_ratio >= 0.15 && enemy_archer_ratio <= 0.66
            }
        };

        self.cautious_offensive = enemy_archer_ratio < 0.15;

        trace!(
            defensive = self.defensive_tactics,
            cautious = self.cautious_offensive,
            my_strength = self.my_army_strength,
            enemy_strength = self.enemy_army_strength,
            "battle state analyzed"
        );
    }

    /// Berserk override: the unit ignores orders and attacks whatever is
    /// nearest.
    fn berserk_turn(&self, arena: &Arena, unit_uid: u32) -> Actions {
        let unit = arena.unit_by_uid(unit_uid).expect("berserk unit must exist");
        debug_assert!(unit.modes.contains(UnitModes::SP_BERSERKER));

        let mut others: Vec<&BattleUnit> = arena
            .units
            .iter()
            .filter(|other| other.is_valid() && other.uid != unit_uid)
            .collect();
        others.sort_by_key(|other| board::distance(unit.head, other.head));

        if others.is_empty() {
            return vec![Command::Skip(unit_uid)];
        }

        // A berserk archer just shoots the nearest stack.
        if unit.is_archer() && !arena.is_hand_fighting(unit) {
            let target = others[0];
            return vec![Command::Attack {
                attacker: unit_uid,
                target: target.uid,
                move_to: -1,
                target_cell: -1,
                direction: 0,
            }];
        }

        // Otherwise find a stack reachable for an attack this turn.
        for other in &others {
            let Some(nearest) = find_nearest_cell_next_to_unit(arena, unit, other) else {
                continue;
            };
            if !arena.can_attack_target_from_position(unit, other, nearest.0) {
                continue;
            }

            let move_target = get_unit_movement_target(arena, unit, nearest.0);
            return vec![Command::Attack {
                attacker: unit_uid,
                target: other.uid,
                move_to: if unit.head == move_target { -1 } else { move_target },
                target_cell: -1,
                direction: -1,
            }];
        }

        // Nothing in reach: walk toward the nearest stack.
        for other in &others {
            let Some(nearest) = find_nearest_cell_next_to_unit(arena, unit, other) else {
                continue;
            };
            let move_target = get_unit_movement_target(arena, unit, nearest.0);
            if move_target != unit.head {
                return vec![Command::Move { unit: unit_uid, cell: move_target }];
            }
        }

        vec![Command::Skip(unit_uid)]
    }

    /// The archer decision tree: retreat from melee threat, fight back when
    /// blocked, otherwise shoot the biggest threat.
    fn archer_decision(&self, arena: &mut Arena, unit_uid: u32) -> Actions {
        let unit = arena.unit_by_uid(unit_uid).expect("archer must exist").clone();
        let enemies: Vec<u32> = arena.enemy_force(self.my_color).iter().map(|enemy| enemy.uid).collect();

        let retreat_position = self.find_archer_retreat_position(arena, &unit, &enemies);

        if retreat_position != -1 {
            let move_target = get_unit_movement_target(arena, &unit, retreat_position);
            if move_target != unit.head {
                debug!(cell = move_target, "archer retreating from melee threat");
                return vec![Command::Move { unit: unit_uid, cell: move_target }];
            }
            return Vec::new();
        }

        if arena.is_hand_fighting(&unit) {
            // Blocked: strike the neighbour with the best damage trade.
            let mut best: Option<(f64, u32)> = None;
            for &enemy_uid in &enemies {
                let enemy = arena.unit_by_uid(enemy_uid).expect("enemy must exist");
                if !Position::of_unit(&unit).is_adjacent(&Position::of_unit(enemy)) {
                    continue;
                }

                let damage = unit.average_damage_to(enemy);
                let retaliation = enemy.estimate_retaliatory_damage(damage as u32, &unit);
                let outcome = damage - retaliation;
                if best.map(|(value, _)| outcome > value).unwrap_or(true) {
                    best = Some((outcome, enemy_uid));
                }
            }

            if let Some((_, target)) = best {
                return vec![Command::Attack {
                    attacker: unit_uid,
                    target,
                    move_to: -1,
                    target_cell: -1,
                    direction: -1,
                }];
            }
            return Vec::new();
        }

        // Free to shoot. Area shooters aim at the densest cluster of threat.
        let mut best: Option<(f64, u32, i32)> = None;
        for &enemy_uid in &enemies {
            let enemy = arena.unit_by_uid(enemy_uid).expect("enemy must exist");

            if unit.monster.has_ability(MonsterAbility::AREA_SHOT) {
                for aim in [enemy.head, enemy.tail()] {
                    if !board::is_valid_index(aim) {
                        continue;
                    }
                    let mut value = 0.0;
                    let mut counted: Vec<u32> = Vec::new();
                    for cell in std::iter::once(aim).chain(board::neighbours(aim)) {
                        if let Some(hit) = arena.unit_at(cell) {
                            if !counted.contains(&hit.uid) {
                                counted.push(hit.uid);
                                value += threat(arena, hit, &unit);
                            }
                        }
                    }
                    if best.map(|(v, _, _)| value > v).unwrap_or(true) {
                        best = Some((value, enemy_uid, aim));
                    }
                }
            } else {
                let value = threat(arena, enemy, &unit);
                if best.map(|(v, _, _)| value > v).unwrap_or(true) {
                    best = Some((value, enemy_uid, -1));
                }
            }
        }

        match best {
            Some((_, target, cell)) => vec![Command::Attack {
                attacker: unit_uid,
                target,
                move_to: -1,
                target_cell: cell,
                direction: 0,
            }],
            None => Vec::new(),
        }
    }

    /// Finds a safe position for a threatened archer, or -1 when staying (or
    /// fighting) is the better choice. The unit itself is temporarily removed
    /// from the board so it does not block the enemies' approach routes.
    fn find_archer_retreat_position(&self, arena: &mut Arena, unit: &BattleUnit, enemies: &[u32]) -> i32 {
        // No point trying to outrun flyers.
        if enemies
            .iter()
            .filter_map(|&uid| arena.unit_by_uid(uid))
            .any(|enemy| enemy.is_flying())
        {
            return -1;
        }

        let mut candidate_heads: Vec<i32> = vec![unit.head];
        candidate_heads.extend(arena.get_all_available_moves(unit));

        let mut assessments: Vec<PositionSafety> = Vec::new();
        {
            let remover = UnitRemover::new(arena, unit.uid);
            let arena = remover.arena();

            for &head in &candidate_heads {
                let Some(position) = Position::for_unit(unit, head) else {
                    continue;
                };

                let mut threatening = Vec::new();
                let mut nearest = u32::MAX;

                for &enemy_uid in enemies {
                    let Some(enemy) = arena.unit_by_uid(enemy_uid) else {
                        continue;
                    };
                    let enemy_position = Position::of_unit(enemy);
                    let distance = position.distance(&enemy_position);
                    nearest = nearest.min(distance);

                    let threatens = if distance == 1 {
                        // Adjacent enemies silence archers even when immovable.
                        true
                    } else if enemy.is_archer() && !arena.is_hand_fighting(enemy) {
                        // Enemy shooters only threaten this assessment in melee.
                        false
                    } else {
                        melee::is_unit_able_to_approach_position(arena, enemy, &position)
                    };
                    if threatens {
                        threatening.push(enemy.head);
                    }
                }

                assessments.push(PositionSafety { head, threatening, distance_to_nearest_enemy: nearest });
            }
        }

        let Some(current) = assessments.iter().find(|assessment| assessment.head == unit.head) else {
            return -1;
        };
        self.pick_retreat_cell(arena, unit, current, &assessments)
    }

    fn pick_retreat_cell(
        &self,
        arena: &Arena,
        unit: &BattleUnit,
        current: &PositionSafety,
        assessments: &[PositionSafety],
    ) -> i32 {
        if current.threatening.is_empty() {
            return -1;
        }

        // Retreat only pays off when every threatening enemy is clearly slower.
        let unit_speed = unit.speed(false);
        let worth_retreating = current.threatening.iter().all(|&enemy_head| {
            arena
                .unit_at(enemy_head)
                .map(|enemy| {
                    let enemy_speed = enemy.speed(true);
                    enemy_speed == speed::STANDING || enemy_speed + 2 < unit_speed
                })
                .unwrap_or(true)
        });
        if !worth_retreating {
            return -1;
        }

        let center = board::SIZE / 2;
        let mut best = -1;
        let mut best_key = (0u32, 0.0f64);

        for assessment in assessments {
            if !assessment.threatening.is_empty() {
                continue;
            }
            let center_distance = board::distance(assessment.head, center);
            let key = (
                assessment.distance_to_nearest_enemy,
                if center_distance == 0 { 1.0 } else { 1.0 / center_distance as f64 },
            );
            if key > best_key {
                best = assessment.head;
                best_key = key;
            }
        }

        best
    }
}

/// Safety assessment of one candidate archer position: which enemies can get
/// to it, and how far away the closest one stands.
struct PositionSafety {
    head: i32,
    threatening: Vec<i32>,
    distance_to_nearest_enemy: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commander::{Commander, CommanderKind};
    use ravenmoor_core::monster::MonsterId;

    fn hero_commander(color: PlayerColor) -> Commander {
        Commander::new(CommanderKind::Hero, color)
    }

    fn open_field_arena() -> Arena {
        let mut arena = Arena::new(PlayerColor::Blue, PlayerColor::Red);
        arena.add_commander(hero_commander(PlayerColor::Blue));
        arena.add_commander(hero_commander(PlayerColor::Red));
        arena
    }

    #[test]
    fn turn_limit_forces_the_attacker_to_retreat() {
        // S1: fifty consecutive turns without deaths end with a retreat.
        let mut arena = open_field_arena();
        arena.units.push(BattleUnit::new(1, MonsterId::Swordsman, 10, PlayerColor::Blue, 22, false));
        arena.units.push(BattleUnit::new(2, MonsterId::Pikeman, 10, PlayerColor::Red, 32, true));

        let mut planner = BattlePlanner::new(Difficulty::Normal);
        planner.battle_begins();

        let mut last_actions = Actions::new();
        for turn in 1..=(MAX_TURNS_WITHOUT_DEATHS + 1) {
            arena.set_turn_number(turn);
            last_actions = planner.battle_turn(&mut arena, 1);
        }

        assert_eq!(last_actions, vec![Command::Retreat]);
    }

    #[test]
    fn turn_limit_counter_resets_when_someone_dies() {
        let mut arena = open_field_arena();
        arena.units.push(BattleUnit::new(1, MonsterId::Swordsman, 10, PlayerColor::Blue, 22, false));
        arena.units.push(BattleUnit::new(2, MonsterId::Pikeman, 10, PlayerColor::Red, 32, true));

        let mut planner = BattlePlanner::new(Difficulty::Normal);
        planner.battle_begins();

        for turn in 1..=30 {
            arena.set_turn_number(turn);
            planner.battle_turn(&mut arena, 1);
        }
        let drained = planner.remaining_turns_without_deaths;
        assert!(drained < MAX_TURNS_WITHOUT_DEATHS);

        // A death on the defending side refills the counter.
        arena.unit_by_uid_mut(2).unwrap().dead += 3;
        arena.set_turn_number(31);
        planner.battle_turn(&mut arena, 1);
        assert_eq!(planner.remaining_turns_without_deaths, MAX_TURNS_WITHOUT_DEATHS);
    }

    #[test]
    fn turn_limit_ignores_the_defender_side() {
        let mut arena = open_field_arena();
        arena.units.push(BattleUnit::new(1, MonsterId::Swordsman, 10, PlayerColor::Blue, 22, false));
        arena.units.push(BattleUnit::new(2, MonsterId::Pikeman, 10, PlayerColor::Red, 32, true));
        arena.set_current_color(PlayerColor::Red);

        let mut planner = BattlePlanner::new(Difficulty::Normal);
        planner.battle_begins();

        for turn in 1..=(MAX_TURNS_WITHOUT_DEATHS * 2) {
            arena.set_turn_number(turn);
            planner.battle_turn(&mut arena, 2);
        }
        // The counter never moved for the defender.
        assert_eq!(planner.remaining_turns_without_deaths, MAX_TURNS_WITHOUT_DEATHS);
    }

    #[test]
    fn berserk_archer_shoots_the_nearest_stack() {
        // S2: a berserk archer with a clear line just shoots.
        let mut arena = open_field_arena();
        let mut archer = BattleUnit::new(3, MonsterId::Ranger, 10, PlayerColor::Blue, 2, false);
        archer.set_mode(UnitModes::SP_BERSERKER);
        arena.units.push(archer);
        arena.units.push(BattleUnit::new(7, MonsterId::Pikeman, 10, PlayerColor::Red, 42, true));
        arena.units.push(BattleUnit::new(8, MonsterId::Pikeman, 10, PlayerColor::Red, 98, true));

        let mut planner = BattlePlanner::new(Difficulty::Normal);
        planner.battle_begins();
        arena.set_turn_number(1);

        let actions = planner.battle_turn(&mut arena, 3);
        assert_eq!(
            actions,
            vec![Command::Attack { attacker: 3, target: 7, move_to: -1, target_cell: -1, direction: 0 }]
        );
    }

    #[test]
    fn defensive_melee_covers_the_archer_and_strikes_the_blocker() {
        // S3: the melee unit moves next to the threatened archer and attacks
        // the enemy already blocking it.
        let mut arena = open_field_arena();
        arena.units.push(BattleUnit::new(1, MonsterId::Ranger, 20, PlayerColor::Blue, 22, false));
        arena.units.push(BattleUnit::new(2, MonsterId::Swordsman, 10, PlayerColor::Blue, 55, false));
        arena.units.push(BattleUnit::new(3, MonsterId::Pikeman, 10, PlayerColor::Red, 23, true));

        let mut planner = BattlePlanner::new(Difficulty::Normal);
        planner.battle_begins();
        arena.set_turn_number(1);

        let actions = planner.battle_turn(&mut arena, 2);
        assert_eq!(actions.len(), 1);
        match &actions[0] {
            Command::Attack { attacker, target, move_to, .. } => {
                assert_eq!(*attacker, 2);
                assert_eq!(*target, 3);
                // The attack position touches both the archer and the enemy.
                assert!(board::is_near(*move_to, 22), "move {move_to} should cover the archer");
                assert!(board::is_near(*move_to, 23), "move {move_to} should reach the enemy");
            }
            other => panic!("expected an attack, got {other:?}"),
        }
    }

    #[test]
    fn unit_with_no_enemy_skips() {
        let mut arena = open_field_arena();
        arena.units.push(BattleUnit::new(1, MonsterId::Swordsman, 10, PlayerColor::Blue, 22, false));
        // An invalid enemy stack only.
        let mut corpse = BattleUnit::new(2, MonsterId::Pikeman, 10, PlayerColor::Red, 32, true);
        corpse.hp = 0;
        corpse.dead = 10;
        arena.units.push(corpse);

        let mut planner = BattlePlanner::new(Difficulty::Normal);
        planner.battle_begins();
        arena.set_turn_number(1);

        let actions = planner.battle_turn(&mut arena, 1);
        assert_eq!(actions, vec![Command::Skip(1)]);
    }
}
