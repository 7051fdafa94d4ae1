//! Melee position scoring and the melee decision trees.

use std::collections::BTreeMap;

use ravenmoor_core::monster::MonsterAbility;
use ravenmoor_core::speed;
use tracing::trace;

use crate::arena::Arena;
use crate::board::{self, HexDirection};
use crate::position::Position;
use crate::unit::BattleUnit;

use super::{BattlePlanner, BattleTargetPair};

/// Outcome of attacking one defender from one candidate position.
#[derive(Debug, Clone, Copy)]
pub(crate) struct MeleeAttackOutcome {
    pub from_head: i32,
    pub attack_value: f64,
    pub position_value: f64,
    pub can_attack_immediately: bool,
}

impl MeleeAttackOutcome {
    pub(crate) fn worst() -> Self {
        MeleeAttackOutcome {
            from_head: -1,
            attack_value: f64::MIN,
            position_value: f64::MIN,
            can_attack_immediately: false,
        }
    }
}

fn value_has_improved(primary: f64, primary_max: f64, secondary: f64, secondary_max: f64) -> bool {
    primary_max < primary || (secondary_max < secondary && (primary_max - primary).abs() < 0.001)
}

/// Composite priority: can-attack-now first, then position value, then the
/// target's threat; near-ties on one axis defer to the other.
pub(crate) fn is_outcome_improved(new: &MeleeAttackOutcome, previous: &MeleeAttackOutcome) -> bool {
    (new.can_attack_immediately && !previous.can_attack_immediately)
        || (new.can_attack_immediately == previous.can_attack_immediately
            && value_has_improved(new.position_value, previous.position_value, new.attack_value, previous.attack_value))
}

/// Threat of `of` against `to`, taking into account whether `of` is currently
/// silenced in melee.
pub(crate) fn threat(arena: &Arena, of: &BattleUnit, to: &BattleUnit) -> f64 {
    of.evaluate_threat_for(to, arena.is_hand_fighting(of))
}

/// Threat of the stack standing behind the main target, for double-cell
/// attackers.
fn double_cell_attack_value(arena: &Arena, attacker: &BattleUnit, target: &BattleUnit, from: i32, target_cell: i32) -> f64 {
    let Some(direction) = board::direction(from, target_cell) else {
        return 0.0;
    };
    let Some(behind_cell) = board::index_direction(target_cell, direction) else {
        return 0.0;
    };
    match arena.unit_at(behind_cell) {
        Some(behind) if behind.uid != target.uid && behind.uid != attacker.uid => threat(arena, behind, attacker),
        _ => 0.0,
    }
}

/// Picks the cell and direction to aim the strike at. For double-cell
/// attackers the vector maximising the secondary hit wins.
pub(crate) fn optimal_attack_vector(arena: &Arena, attacker: &BattleUnit, target: &BattleUnit, attack_head: i32) -> (i32, i32) {
    let Some(attack_pos) = Position::for_unit(attacker, attack_head) else {
        return (-1, -1);
    };
    let target_pos = Position::of_unit(target);

    let mut best: (i32, i32) = (-1, -1);
    let mut best_value = f64::MIN;

    for &attack_cell in &attack_pos.cells() {
        for &target_cell in &target_pos.cells() {
            if !board::is_near(attack_cell, target_cell) {
                continue;
            }
            let direction = board::direction(attack_cell, target_cell)
                .map(|dir| HexDirection::ALL.iter().position(|&d| d == dir).unwrap() as i32)
                .unwrap_or(-1);

            if !attacker.monster.has_ability(MonsterAbility::DOUBLE_CELL_ATTACK) {
                return (target_cell, direction);
            }

            let value = double_cell_attack_value(arena, attacker, target, attack_cell, target_cell);
            if best.0 == -1 || value > best_value {
                best = (target_cell, direction);
                best_value = value;
            }
        }
    }

    best
}

/// The attack value of striking the target from the given position: the
/// target's threat, plus splash for double-cell attackers, or the sum over
/// everything adjacent for all-adjacent attackers.
pub(crate) fn optimal_attack_value(arena: &Arena, attacker: &BattleUnit, target: &BattleUnit, position: &Position) -> f64 {
    if attacker.monster.has_ability(MonsterAbility::ALL_ADJACENT_ATTACK) {
        let mut counted: Vec<u32> = Vec::new();
        let mut total = 0.0;
        for cell in position.around() {
            let Some(unit) = arena.unit_at(cell) else {
                continue;
            };
            // The attacker itself can be hypnotized; compare current sides.
            if unit.uid == attacker.uid || unit.current_color == attacker.current_color {
                continue;
            }
            if counted.contains(&unit.uid) {
                continue;
            }
            counted.push(unit.uid);
            total += threat(arena, unit, attacker);
        }
        return total;
    }

    let mut value = threat(arena, target, attacker);

    if attacker.monster.has_ability(MonsterAbility::DOUBLE_CELL_ATTACK) {
        let mut best_extra = 0.0;
        for &attack_cell in &position.cells() {
            for &target_cell in &Position::of_unit(target).cells() {
                if board::is_near(attack_cell, target_cell) {
                    let extra = double_cell_attack_value(arena, attacker, target, attack_cell, target_cell);
                    best_extra = f64::max(best_extra, extra);
                }
            }
        }
        value += best_extra;
    }

    value
}

/// Scores every position adjacent to an enemy the attacker could take.
/// For melee neighbours the maximum threat wins; adjacent enemy archers add
/// up instead, rewarding positions that body-block shooters.
pub(crate) fn evaluate_potential_attack_positions(arena: &Arena, attacker: &BattleUnit) -> BTreeMap<i32, f64> {
    let mut enemies: Vec<&BattleUnit> = arena
        .enemy_force(attacker.current_color)
        .into_iter()
        .filter(|enemy| enemy.uid != attacker.uid)
        .collect();
    // Process melee units first so archers accumulate on top of the maximum.
    enemies.sort_by_key(|enemy| (enemy.is_archer(), enemy.uid));

    let mut result: BTreeMap<i32, f64> = BTreeMap::new();

    for enemy in enemies {
        let enemy_pos = Position::of_unit(enemy);
        let radius = if attacker.is_wide() { 2 } else { 1 };

        for idx in board::distance_indexes(enemy.head, enemy.tail(), radius) {
            let Some(position) = Position::for_unit(attacker, idx) else {
                continue;
            };
            if position.distance(&enemy_pos) != 1 {
                continue;
            }
            if !arena.is_position_reachable(attacker, idx, false) {
                continue;
            }

            let attack_value = optimal_attack_value(arena, attacker, enemy, &position);

            result
                .entry(idx)
                .and_modify(|value| {
                    if attacker.monster.has_ability(MonsterAbility::ALL_ADJACENT_ATTACK) {
                        // Every neighbour is already counted; rescoring per
                        // enemy must not change the stored value.
                        debug_assert!((*value - attack_value).abs() < 0.001);
                    } else if enemy.is_archer() {
                        *value += attack_value;
                    } else {
                        *value = f64::max(*value, attack_value);
                    }
                })
                .or_insert(attack_value);
        }
    }

    result
}

/// The best position to strike one defender from, judged by the composite
/// outcome criteria. Positions closer to the attacker win ties.
pub(crate) fn best_attack_outcome<F>(
    arena: &Arena,
    attacker: &BattleUnit,
    defender: &BattleUnit,
    position_values: &BTreeMap<i32, f64>,
    position_filter: F,
) -> MeleeAttackOutcome
where
    F: Fn(&Position) -> bool,
{
    let defender_pos = Position::of_unit(defender);
    let mut around: Vec<i32> = position_values
        .iter()
        .filter_map(|(&head, _)| {
            let position = Position::for_unit(attacker, head)?;
            (position.distance(&defender_pos) == 1).then_some(head)
        })
        .collect();
    around.sort_by_key(|&head| board::distance(attacker.head, head));

    let mut best = MeleeAttackOutcome::worst();

    for head in around {
        let position = Position::for_unit(attacker, head).expect("filtered above");
        if !position_filter(&position) {
            continue;
        }

        let current = MeleeAttackOutcome {
            from_head: head,
            attack_value: optimal_attack_value(arena, attacker, defender, &position),
            position_value: position_values[&head],
            can_attack_immediately: arena.can_attack_target_from_position(attacker, defender, head),
        };

        if is_outcome_improved(&current, &best) {
            best = current;
        }
    }

    best
}

/// The closest cell from which the unit could stand adjacent to the target,
/// with the walking distance to it.
pub(crate) fn find_nearest_cell_next_to_unit(arena: &Arena, unit: &BattleUnit, target: &BattleUnit) -> Option<(i32, u32)> {
    let target_pos = Position::of_unit(target);
    let radius = if unit.is_wide() { 2 } else { 1 };

    let mut best: Option<(i32, u32)> = None;
    for idx in board::distance_indexes(target.head, target.tail(), radius) {
        let Some(position) = Position::for_unit(unit, idx) else {
            continue;
        };
        if position.distance(&target_pos) != 1 {
            continue;
        }
        if !arena.is_position_reachable(unit, idx, false) {
            continue;
        }

        let move_distance = arena.calculate_move_distance(unit, idx);
        if best.map(|(_, dist)| move_distance < dist).unwrap_or(true) {
            best = Some((idx, move_distance));
        }
    }
    best
}

/// The head cell the unit should actually move to when aiming at `idx`:
/// either `idx` itself when reachable this turn, or the closest reachable
/// position on the way there.
pub(crate) fn get_unit_movement_target(arena: &Arena, unit: &BattleUnit, idx: i32) -> i32 {
    if arena.is_position_reachable(unit, idx, true) {
        return idx;
    }
    arena.closest_reachable_head(unit, idx)
}

/// Whether the unit could stand next to the given position within one turn
/// (its next one included). Immovable units never can.
pub(crate) fn is_unit_able_to_approach_position(arena: &Arena, unit: &BattleUnit, position: &Position) -> bool {
    let unit_speed = unit.speed(true);
    if unit_speed == speed::STANDING {
        return false;
    }

    position.around().iter().any(|&cell| {
        let Some(candidate) = Position::for_unit(unit, cell) else {
            return false;
        };
        if !arena.is_position_reachable(unit, candidate.head, false) {
            return false;
        }
        let distance = if unit.is_flying() { 1 } else { arena.calculate_move_distance(unit, candidate.head) };
        distance <= unit_speed
    })
}

/// The safest stop along a path for the cautious offensive: the step with the
/// lowest cumulative threat from enemy walkers, as close to the target as
/// possible. Threat is assessed against the enemies' current positions; a
/// rough estimate by design of the reference behaviour.
pub(crate) fn find_optimal_position_for_subsequent_attack(
    arena: &Arena,
    path: &[i32],
    unit: &BattleUnit,
    enemies: &[&BattleUnit],
) -> i32 {
    let mut step_threats: Vec<(i32, f64)> = path.iter().map(|&head| (head, 0.0)).collect();

    for enemy in enemies {
        // Archers and flyers threaten everywhere; walking melee is what an
        // intermediate stop can actually avoid.
        if enemy.is_flying() || (enemy.is_archer() && !arena.is_hand_fighting(enemy)) {
            continue;
        }

        for (head, step_threat) in &mut step_threats {
            let Some(position) = Position::for_unit(unit, *head) else {
                continue;
            };
            if is_unit_able_to_approach_position(arena, enemy, &position) {
                *step_threat += threat(arena, enemy, unit);
            }
        }
    }

    let mut lowest = 0.0;
    let mut target = -1;
    for (head, step_threat) in step_threats {
        if target == -1 || step_threat < lowest || (step_threat - lowest).abs() < 0.001 {
            lowest = step_threat;
            target = head;
        }
    }
    target
}

impl BattlePlanner {
    /// Melee offense: best reachable strike, else chase a target that cannot
    /// evade, else creep toward the castle walls.
    pub(crate) fn melee_unit_offense(&self, arena: &Arena, unit_uid: u32) -> BattleTargetPair {
        let unit = arena.unit_by_uid(unit_uid).expect("offense needs a live unit");
        let mut target = BattleTargetPair::none();

        let position_values = evaluate_potential_attack_positions(arena, unit);
        let enemies: Vec<&BattleUnit> = arena
            .enemy_force(self.my_color())
            .into_iter()
            .filter(|enemy| enemy.uid != unit_uid)
            .collect();

        // 1. The best target within reach, if any.
        let mut best = MeleeAttackOutcome::worst();
        for enemy in &enemies {
            let outcome = best_attack_outcome(arena, unit, enemy, &position_values, |_| true);
            if !outcome.can_attack_immediately {
                continue;
            }
            if is_outcome_improved(&outcome, &best) {
                best = outcome;
                target.cell = outcome.from_head;
                target.unit = Some(enemy.uid);
            }
        }
        if target.unit.is_some() {
            return target;
        }

        // 2. A distance-based target, preferring enemies that cannot evade.
        let cannot_evade = |enemy: &&BattleUnit| {
            if enemy.is_archer() {
                return true;
            }
            let enemy_speed = enemy.speed(true);
            if enemy_speed == speed::STANDING {
                return true;
            }
            if enemy.is_flying() {
                return false;
            }
            enemy_speed < unit.speed(true)
        };

        for predicate in [&cannot_evade as &dyn Fn(&&BattleUnit) -> bool, &|_: &&BattleUnit| true] {
            let mut max_priority = f64::MIN;
            for enemy in enemies.iter().filter(|enemy| predicate(*enemy)) {
                let Some((near_idx, near_dist)) = find_nearest_cell_next_to_unit(arena, unit, enemy) else {
                    continue;
                };
                debug_assert!(near_dist > 0);

                let priority = threat(arena, enemy, unit) / near_dist.max(1) as f64;
                if priority < max_priority {
                    continue;
                }
                max_priority = priority;

                let path = arena.get_path(unit, near_idx);
                if path.is_empty() {
                    continue;
                }

                let moat_built = arena.castle.as_ref().map(|siege| siege.has_moat).unwrap_or(false);
                let last = *path.last().expect("path checked non-empty");

                if moat_built && board::is_position_in_moat(last, Position::for_unit(unit, last).map(|p| p.tail).unwrap_or(-1)) {
                    // Step into the moat on the way in to keep options open.
                    target.cell = last;
                } else if self.is_cautious_offensive() {
                    target.cell = find_optimal_position_for_subsequent_attack(arena, &path, unit, &enemies);
                } else {
                    target.cell = last;
                }
            }
            if target.cell != -1 {
                return target;
            }
        }

        // 3. Siege fallback: close in on the cells under the walls.
        if self.is_attacking_castle() {
            let mut shortest = u32::MAX;
            for cell in board::CELLS_UNDER_WALLS {
                if !arena.is_position_reachable(unit, cell, false) {
                    continue;
                }
                let distance = arena.calculate_move_distance(unit, cell);
                if target.cell == -1 || distance < shortest {
                    shortest = distance;
                    target.cell = cell;
                }
            }
            if target.cell != -1 {
                trace!(cell = target.cell, "moving toward the castle walls");
            }
        }

        target
    }

    /// Melee defense: cover the most valuable friendly archer and punish the
    /// enemies blocking it; otherwise strike what can be hit without leaving
    /// our half.
    pub(crate) fn melee_unit_defense(&self, arena: &Arena, unit_uid: u32) -> BattleTargetPair {
        let unit = arena.unit_by_uid(unit_uid).expect("defense needs a live unit");
        let mut target = BattleTargetPair::none();

        let position_values = evaluate_potential_attack_positions(arena, unit);
        let friendly: Vec<&BattleUnit> = arena
            .force(self.my_color())
            .into_iter()
            .filter(|other| other.uid != unit_uid)
            .collect();
        let enemies: Vec<&BattleUnit> = arena
            .enemy_force(self.my_color())
            .into_iter()
            .filter(|enemy| enemy.uid != unit_uid)
            .collect();

        // 1. Cover our archers. A unit whose affiliation was changed would
        // block them instead of covering them.
        if unit.army_color == self.my_color() {
            let any_enemy_attackable_now = enemies.iter().any(|enemy| {
                best_attack_outcome(arena, unit, enemy, &position_values, |_| true).can_attack_immediately
            });

            // Penalty per tile of distance: with two archer stacks the unit
            // covers the stronger one unless the weaker is much closer.
            let defense_distance_modifier = self.my_ranged_units_only() / 15.0;

            let mut best_archer_value = f64::MIN;

            for archer in friendly.iter().filter(|other| other.is_archer()) {
                let cover_cell = self.find_best_cover_cell(arena, unit, archer);

                let adjacent_enemies: Vec<&&BattleUnit> = enemies
                    .iter()
                    .filter(|enemy| Position::of_unit(archer).is_adjacent(&Position::of_unit(enemy)))
                    .collect();

                if cover_cell.is_none() && adjacent_enemies.is_empty() {
                    continue;
                }

                // Distance to pay: covering the archer, or reaching the
                // closest of the enemies blocking it.
                let mut reach: Option<u32> = cover_cell.map(|(_, dist)| dist);
                for enemy in &adjacent_enemies {
                    if let Some((_, dist)) = find_nearest_cell_next_to_unit(arena, unit, enemy) {
                        reach = Some(reach.map_or(dist, |value| value.min(dist)));
                    }
                }
                let Some(distance) = reach else {
                    continue;
                };

                // Slow units should not march half the board to cover a far
                // archer while ignoring enemies at hand.
                if any_enemy_attackable_now && !unit.is_flying() && distance > unit.speed(false) * 2 {
                    continue;
                }

                let archer_value = archer.strength() - distance as f64 * defense_distance_modifier;
                if archer_value < best_archer_value {
                    continue;
                }
                best_archer_value = archer_value;

                target.cell = cover_cell.map(|(idx, _)| idx).unwrap_or(-1);
                target.unit = None;

                // Attack a blocker outright, or at least take the best cell
                // to fight it from.
                let mut best = MeleeAttackOutcome::worst();
                for enemy in &adjacent_enemies {
                    let outcome = best_attack_outcome(arena, unit, enemy, &position_values, |_| true);
                    if is_outcome_improved(&outcome, &best) {
                        best = outcome;
                        target.cell = outcome.from_head;
                        target.unit = outcome.can_attack_immediately.then_some(enemy.uid);
                    }
                }

                if target.unit.is_some() || target.cell == -1 {
                    continue;
                }

                // A retaliation-immune cover (or one shielding an area
                // shooter) may still strike whoever stands adjacent.
                if !unit.is_ignoring_retaliation() && !archer.monster.has_ability(MonsterAbility::AREA_SHOT) {
                    continue;
                }
                let mut best_attack = 0.0;
                for enemy in &enemies {
                    if !arena.can_attack_target_from_position(unit, enemy, target.cell) {
                        continue;
                    }
                    let position = Position::for_unit(unit, target.cell).expect("cover cell is valid");
                    let value = optimal_attack_value(arena, unit, enemy, &position);
                    if value > best_attack {
                        best_attack = value;
                        target.unit = Some(enemy.uid);
                    }
                }
            }
        }

        if target.cell != -1 {
            return target;
        }

        // 2. Pure defense: the best enemy attackable without leaving our half.
        let mut best = MeleeAttackOutcome::worst();
        for enemy in &enemies {
            let outcome = best_attack_outcome(arena, unit, enemy, &position_values, |position| {
                self.is_position_located_in_defended_area(unit, position)
            });
            if outcome.from_head == -1 {
                continue;
            }
            if is_outcome_improved(&outcome, &best) {
                best = outcome;
                target.cell = outcome.from_head;
                target.unit = outcome.can_attack_immediately.then_some(enemy.uid);
            }
        }

        target
    }

    /// The best adjacent cell to park next to a friendly archer. Wide units
    /// prefer side coverage, everything else covers the front first.
    fn find_best_cover_cell(&self, arena: &Arena, unit: &BattleUnit, archer: &BattleUnit) -> Option<(i32, u32)> {
        let front_first: [HexDirection; 6] = if archer.reflected {
            [
                HexDirection::Left,
                HexDirection::TopLeft,
                HexDirection::BottomLeft,
                HexDirection::TopRight,
                HexDirection::BottomRight,
                HexDirection::Right,
            ]
        } else {
            [
                HexDirection::Right,
                HexDirection::TopRight,
                HexDirection::BottomRight,
                HexDirection::TopLeft,
                HexDirection::BottomLeft,
                HexDirection::Left,
            ]
        };
        let side_first: [HexDirection; 6] = if archer.reflected {
            [
                HexDirection::TopLeft,
                HexDirection::BottomLeft,
                HexDirection::Left,
                HexDirection::TopRight,
                HexDirection::BottomRight,
                HexDirection::Right,
            ]
        } else {
            [
                HexDirection::TopRight,
                HexDirection::BottomRight,
                HexDirection::Right,
                HexDirection::TopLeft,
                HexDirection::BottomLeft,
                HexDirection::Left,
            ]
        };

        // Side coverage only pays when the covering unit is wide; over a wide
        // archer it is always the better geometry.
        let prefer_side = unit.is_wide()
            && (archer.is_wide() || (archer.head / board::WIDTH) % 2 == if archer.reflected { 1 } else { 0 });
        let priority = if prefer_side { side_first } else { front_first };

        for own_cell in [archer.head, archer.tail()] {
            if !board::is_valid_index(own_cell) {
                continue;
            }
            for direction in priority {
                let Some(idx) = board::index_direction(own_cell, direction) else {
                    continue;
                };
                let Some(position) = Position::for_unit(unit, idx) else {
                    continue;
                };
                debug_assert!(position.distance(&Position::of_unit(archer)) <= 1);

                if !arena.is_position_reachable(unit, idx, false) {
                    continue;
                }
                return Some((idx, arena.calculate_move_distance(unit, idx)));
            }
        }
        None
    }

    /// Our half of the battlefield, or the castle cells during a defended
    /// siege. Units whose affiliation changed still face their original way.
    pub(crate) fn is_position_located_in_defended_area(&self, unit: &BattleUnit, position: &Position) -> bool {
        let reflect = if unit.army_color == self.my_color() { unit.reflected } else { !unit.reflected };

        let check = |cell: i32| {
            if self.is_defending_castle() {
                return board::is_castle_cell(cell);
            }
            board::is_own_half(cell, reflect)
        };

        position.cells().iter().all(|&cell| check(cell))
    }
}
