use std::collections::{HashMap, VecDeque};

use ravenmoor_core::artifact::ArtifactBonusType;
use ravenmoor_core::color::PlayerColor;
use ravenmoor_core::spell::Spell;

use crate::board::{self, HexDirection};
use crate::commander::Commander;
use crate::position::Position;
use crate::unit::{BattleUnit, UnitModes};

/// Castle siege context: whose castle, how strong its towers shoot, and how
/// much of the wall is still standing (for the Earthquake valuation).
#[derive(Debug, Clone)]
pub struct CastleSiege {
    pub defender: PlayerColor,
    pub towers_strength: f64,
    pub has_moat: bool,
    pub wall_targets_total: u32,
    pub wall_targets_intact: u32,
}

/// Read-only battle state the planners consume: the board, the two forces,
/// their commanders and the siege context. The decision core never resolves
/// combat here; it only asks questions.
#[derive(Debug, Clone)]
pub struct Arena {
    pub units: Vec<BattleUnit>,
    /// Dead stacks, still at their last position, for resurrection checks.
    pub graveyard: Vec<BattleUnit>,
    obstacles: Vec<i32>,
    attacker_color: PlayerColor,
    defender_color: PlayerColor,
    commanders: Vec<Commander>,
    pub castle: Option<CastleSiege>,
    turn_number: u32,
    auto_battle: bool,
    current_color: PlayerColor,
}

impl Arena {
    pub fn new(attacker_color: PlayerColor, defender_color: PlayerColor) -> Self {
        Arena {
            units: Vec::new(),
            graveyard: Vec::new(),
            obstacles: Vec::new(),
            attacker_color,
            defender_color,
            commanders: Vec::new(),
            castle: None,
            turn_number: 1,
            auto_battle: false,
            current_color: attacker_color,
        }
    }

    pub fn attacker_color(&self) -> PlayerColor {
        self.attacker_color
    }

    pub fn defender_color(&self) -> PlayerColor {
        self.defender_color
    }

    pub fn turn_number(&self) -> u32 {
        self.turn_number
    }

    pub fn set_turn_number(&mut self, turn: u32) {
        self.turn_number = turn;
    }

    pub fn current_color(&self) -> PlayerColor {
        self.current_color
    }

    pub fn set_current_color(&mut self, color: PlayerColor) {
        self.current_color = color;
    }

    pub fn auto_battle_in_progress(&self) -> bool {
        self.auto_battle
    }

    pub fn set_auto_battle(&mut self, enabled: bool) {
        self.auto_battle = enabled;
    }

    pub fn add_obstacle(&mut self, cell: i32) {
        self.obstacles.push(cell);
    }

    pub fn add_commander(&mut self, commander: Commander) {
        self.commanders.push(commander);
    }

    pub fn commander(&self, color: PlayerColor) -> Option<&Commander> {
        self.commanders.iter().find(|commander| commander.color == color)
    }

    pub fn commander_mut(&mut self, color: PlayerColor) -> Option<&mut Commander> {
        self.commanders.iter_mut().find(|commander| commander.color == color)
    }

    pub fn enemy_color(&self, color: PlayerColor) -> PlayerColor {
        if color == self.attacker_color {
            self.defender_color
        } else {
            self.attacker_color
        }
    }

    pub fn enemy_commander(&self, color: PlayerColor) -> Option<&Commander> {
        self.commander(self.enemy_color(color))
    }

    /// Valid units currently fighting for the given side (Hypnotize included).
    pub fn force(&self, color: PlayerColor) -> Vec<&BattleUnit> {
        self.units
            .iter()
            .filter(|unit| unit.is_valid() && unit.current_color == color)
            .collect()
    }

    pub fn enemy_force(&self, color: PlayerColor) -> Vec<&BattleUnit> {
        self.force(self.enemy_color(color))
    }

    /// All stacks that ever belonged to the given army, dead ones included.
    pub fn army_units(&self, color: PlayerColor) -> Vec<&BattleUnit> {
        self.units.iter().filter(|unit| unit.army_color == color).collect()
    }

    pub fn force_dead_count(&self, color: PlayerColor) -> u32 {
        let alive: u32 = self.units.iter().filter(|u| u.army_color == color).map(|u| u.dead).sum();
        let buried: u32 = self.graveyard.iter().filter(|u| u.army_color == color).map(|u| u.initial_count).sum();
        alive + buried
    }

    pub fn unit_by_uid(&self, uid: u32) -> Option<&BattleUnit> {
        self.units.iter().find(|unit| unit.uid == uid)
    }

    pub fn unit_by_uid_mut(&mut self, uid: u32) -> Option<&mut BattleUnit> {
        self.units.iter_mut().find(|unit| unit.uid == uid)
    }

    pub fn unit_at(&self, cell: i32) -> Option<&BattleUnit> {
        self.units
            .iter()
            .find(|unit| unit.is_valid() && unit.occupies(cell))
    }

    /// Whether an enemy stands right next to the unit, silencing its shots.
    pub fn is_hand_fighting(&self, unit: &BattleUnit) -> bool {
        Position::of_unit(unit)
            .around()
            .iter()
            .any(|&cell| {
                self.unit_at(cell)
                    .map(|other| other.current_color != unit.current_color)
                    .unwrap_or(false)
            })
    }

    fn is_cell_passable(&self, cell: i32, ignore_uid: u32) -> bool {
        board::is_valid_index(cell)
            && !self.obstacles.contains(&cell)
            && !self
                .units
                .iter()
                .any(|unit| unit.is_valid() && unit.uid != ignore_uid && unit.occupies(cell))
    }

    fn is_position_open(&self, unit: &BattleUnit, position: &Position) -> bool {
        position.cells().iter().all(|&cell| self.is_cell_passable(cell, unit.uid))
    }

    /// Every head cell the unit can stand on, with the step distance to get
    /// there. Flyers (and units granted the scoped teleport ability) reach any
    /// open position at distance 1.
    fn reachable_positions(&self, unit: &BattleUnit) -> HashMap<i32, u32> {
        let mut result = HashMap::new();
        result.insert(unit.head, 0);

        if unit.is_flying() || unit.modes.contains(UnitModes::TELEPORT_ABILITY) {
            for head in 0..board::SIZE {
                if let Some(position) = Position::for_unit(unit, head) {
                    if self.is_position_open(unit, &position) {
                        result.entry(head).or_insert(1);
                    }
                }
            }
            return result;
        }

        let mut queue = VecDeque::new();
        queue.push_back((unit.head, 0u32));

        while let Some((head, dist)) = queue.pop_front() {
            for direction in HexDirection::ALL {
                let Some(next) = board::index_direction(head, direction) else {
                    continue;
                };
                if result.contains_key(&next) {
                    continue;
                }
                let Some(position) = Position::for_unit(unit, next) else {
                    continue;
                };
                if !self.is_position_open(unit, &position) {
                    continue;
                }
                result.insert(next, dist + 1);
                queue.push_back((next, dist + 1));
            }
        }

        result
    }

    /// Head cells the unit can move to during the current turn.
    pub fn get_all_available_moves(&self, unit: &BattleUnit) -> Vec<i32> {
        let speed = unit.speed(false);
        self.reachable_positions(unit)
            .into_iter()
            .filter(|&(_, dist)| dist > 0 && dist <= speed)
            .map(|(head, _)| head)
            .collect()
    }

    /// Whether the unit can stand with its head on the given cell; with
    /// `this_turn` the move must also fit into the unit's speed.
    pub fn is_position_reachable(&self, unit: &BattleUnit, head: i32, this_turn: bool) -> bool {
        let Some(position) = Position::for_unit(unit, head) else {
            return false;
        };
        if head != unit.head && !self.is_position_open(unit, &position) {
            return false;
        }

        match self.reachable_positions(unit).get(&head) {
            Some(&dist) => !this_turn || dist <= unit.speed(false),
            None => false,
        }
    }

    pub fn calculate_move_distance(&self, unit: &BattleUnit, head: i32) -> u32 {
        self.reachable_positions(unit).get(&head).copied().unwrap_or(u32::MAX)
    }

    /// The head-cell sequence of the shortest walk to the target position.
    pub fn get_path(&self, unit: &BattleUnit, target_head: i32) -> Vec<i32> {
        if unit.head == target_head {
            return Vec::new();
        }
        if unit.is_flying() || unit.modes.contains(UnitModes::TELEPORT_ABILITY) {
            return vec![target_head];
        }

        // BFS with parent tracking.
        let mut parent: HashMap<i32, i32> = HashMap::new();
        let mut queue = VecDeque::new();
        parent.insert(unit.head, unit.head);
        queue.push_back(unit.head);

        while let Some(head) = queue.pop_front() {
            if head == target_head {
                break;
            }
            for direction in HexDirection::ALL {
                let Some(next) = board::index_direction(head, direction) else {
                    continue;
                };
                if parent.contains_key(&next) {
                    continue;
                }
                let Some(position) = Position::for_unit(unit, next) else {
                    continue;
                };
                if !self.is_position_open(unit, &position) {
                    continue;
                }
                parent.insert(next, head);
                queue.push_back(next);
            }
        }

        if !parent.contains_key(&target_head) {
            return Vec::new();
        }

        let mut path = Vec::new();
        let mut current = target_head;
        while current != unit.head {
            path.push(current);
            current = parent[&current];
        }
        path.reverse();
        path
    }

    /// The reachable position closest to the wanted destination this turn.
    pub fn closest_reachable_head(&self, unit: &BattleUnit, destination: i32) -> i32 {
        let speed = unit.speed(false);
        self.reachable_positions(unit)
            .into_iter()
            .filter(|&(_, dist)| dist <= speed)
            .min_by_key(|&(head, dist)| (board::distance(head, destination), dist))
            .map(|(head, _)| head)
            .unwrap_or(unit.head)
    }

    /// Geometry plus reachability: can the attacker strike the target with its
    /// head on the given cell this turn?
    pub fn can_attack_target_from_position(&self, attacker: &BattleUnit, target: &BattleUnit, head: i32) -> bool {
        let Some(position) = Position::for_unit(attacker, head) else {
            return false;
        };
        if !position.is_adjacent(&Position::of_unit(target)) {
            return false;
        }
        self.is_position_reachable(attacker, head, true)
    }

    /// Units affected by casting the given spell at the given cell.
    pub fn get_targets_for_spell(&self, caster_color: PlayerColor, spell: Spell, cell: i32) -> Vec<u32> {
        fn add_unit(targets: &mut Vec<u32>, unit: Option<&BattleUnit>) {
            if let Some(unit) = unit {
                if unit.is_valid() && !targets.contains(&unit.uid) {
                    targets.push(unit.uid);
                }
            }
        }

        let mut targets: Vec<u32> = Vec::new();

        if spell.is_mass() || spell.is_apply_without_focus() {
            for unit in &self.units {
                if !unit.is_valid() {
                    continue;
                }
                let friendly = unit.current_color == caster_color;
                let wanted = if spell.is_apply_without_focus() {
                    true
                } else if spell.is_apply_to_friends() {
                    friendly
                } else {
                    !friendly
                };
                if wanted {
                    add_unit(&mut targets, Some(unit));
                }
            }
            return targets;
        }

        match spell {
            Spell::ChainLightning => {
                // The bolt jumps to the nearest unit three times.
                let Some(first) = self.unit_at(cell) else {
                    return targets;
                };
                add_unit(&mut targets, Some(first));
                let mut last = first.head;
                for _ in 0..3 {
                    let next = self
                        .units
                        .iter()
                        .filter(|unit| unit.is_valid() && !targets.contains(&unit.uid))
                        .min_by_key(|unit| board::distance(last, unit.head));
                    match next {
                        Some(unit) => {
                            last = unit.head;
                            add_unit(&mut targets, Some(unit));
                        }
                        None => break,
                    }
                }
            }
            Spell::Fireball | Spell::MeteorShower => {
                add_unit(&mut targets, self.unit_at(cell));
                for neighbour in board::neighbours(cell) {
                    add_unit(&mut targets, self.unit_at(neighbour));
                }
            }
            Spell::Fireblast => {
                for other in 0..board::SIZE {
                    if board::distance(cell, other) <= 2 {
                        add_unit(&mut targets, self.unit_at(other));
                    }
                }
            }
            Spell::ColdRing => {
                for neighbour in board::neighbours(cell) {
                    add_unit(&mut targets, self.unit_at(neighbour));
                }
            }
            _ => add_unit(&mut targets, self.unit_at(cell)),
        }

        targets
    }

    /// A free cell in the caster's corner for a summoned stack; -1 when the
    /// corner is packed.
    pub fn free_position_near_hero(&self, color: PlayerColor) -> i32 {
        let column = if color == self.attacker_color { 0 } else { board::WIDTH - 1 };
        (0..board::HEIGHT)
            .map(|row| row * board::WIDTH + column)
            .find(|&cell| self.is_cell_passable(cell, u32::MAX))
            .unwrap_or(-1)
    }

    pub fn graveyard_cells(&self) -> Vec<i32> {
        self.graveyard.iter().map(|unit| unit.head).collect()
    }

    pub fn is_able_to_resurrect_from_graveyard(&self, cell: i32, spell: Spell) -> bool {
        self.last_resurrectable_from_graveyard(cell, spell).is_some()
    }

    pub fn last_resurrectable_from_graveyard(&self, cell: i32, spell: Spell) -> Option<&BattleUnit> {
        if !spell.is_resurrect() {
            return None;
        }
        self.graveyard
            .iter()
            .rev()
            .find(|unit| unit.head == cell && unit.allow_apply_spell(spell))
    }

    /// Only a hero commanding from the open field may flee.
    pub fn can_retreat_opponent(&self, color: PlayerColor) -> bool {
        let Some(commander) = self.commander(color) else {
            return false;
        };
        if !commander.is_hero() {
            return false;
        }
        match &self.castle {
            Some(siege) => siege.defender != color,
            None => true,
        }
    }

    pub fn can_surrender_opponent(&self, color: PlayerColor) -> bool {
        // Surrender needs somebody to surrender to.
        self.can_retreat_opponent(color) && self.enemy_commander(color).map(Commander::is_hero).unwrap_or(false)
    }

    /// Half of the army's hiring price, reduced by the matching artifacts.
    pub fn surrender_cost(&self, color: PlayerColor) -> u32 {
        let base: i64 = self
            .units
            .iter()
            .filter(|unit| unit.is_valid() && unit.army_color == color)
            .map(|unit| unit.monster.stats().cost.gold as i64 * unit.count() as i64)
            .sum();
        let mut cost = (base / 2) as u32;

        if let Some(commander) = self.commander(color) {
            for percent in commander.bag.total_multiplied_percent(ArtifactBonusType::SurrenderCostReductionPercent) {
                cost = (cost as i64 * (100 - percent).max(0) as i64 / 100) as u32;
            }
        }
        cost
    }

    pub fn is_spellcast_disabled(&self) -> bool {
        self.commanders
            .iter()
            .any(|commander| commander.bag.is_bonus_present(ArtifactBonusType::DisableAllSpellCombatCasting))
    }
}

/// Temporarily removes a unit from the board so that threat can be assessed
/// from its own (now empty) cells. Restoration is guaranteed on every exit
/// path, panics included.
pub struct UnitRemover<'a> {
    arena: &'a mut Arena,
    uid: u32,
    saved_head: i32,
}

impl<'a> UnitRemover<'a> {
    pub fn new(arena: &'a mut Arena, uid: u32) -> Self {
        let saved_head = arena.unit_by_uid(uid).map(|unit| unit.head).unwrap_or(-1);
        if let Some(unit) = arena.unit_by_uid_mut(uid) {
            // Parking the head off-board vacates both cells.
            unit.head = -100;
        }
        UnitRemover { arena, uid, saved_head }
    }

    pub fn arena(&self) -> &Arena {
        self.arena
    }
}

impl Drop for UnitRemover<'_> {
    fn drop(&mut self) {
        let saved_head = self.saved_head;
        if let Some(unit) = self.arena.unit_by_uid_mut(self.uid) {
            unit.head = saved_head;
        }
    }
}

/// Temporarily grants the scoped teleport ability used while valuing the
/// Teleport spell.
pub struct TeleportAbilityGuard<'a> {
    arena: &'a mut Arena,
    uid: u32,
}

impl<'a> TeleportAbilityGuard<'a> {
    pub fn new(arena: &'a mut Arena, uid: u32) -> Self {
        if let Some(unit) = arena.unit_by_uid_mut(uid) {
            unit.set_mode(UnitModes::TELEPORT_ABILITY);
        }
        TeleportAbilityGuard { arena, uid }
    }

    pub fn arena(&self) -> &Arena {
        self.arena
    }
}

impl Drop for TeleportAbilityGuard<'_> {
    fn drop(&mut self) {
        if let Some(unit) = self.arena.unit_by_uid_mut(self.uid) {
            unit.reset_mode(UnitModes::TELEPORT_ABILITY);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commander::CommanderKind;
    use ravenmoor_core::monster::MonsterId;

    fn arena_with_units() -> Arena {
        let mut arena = Arena::new(PlayerColor::Blue, PlayerColor::Red);
        arena.units.push(BattleUnit::new(1, MonsterId::Swordsman, 10, PlayerColor::Blue, 22, false));
        arena.units.push(BattleUnit::new(2, MonsterId::Pikeman, 10, PlayerColor::Red, 27, true));
        arena
    }

    #[test]
    fn forces_split_by_current_color() {
        let mut arena = arena_with_units();
        assert_eq!(arena.force(PlayerColor::Blue).len(), 1);
        assert_eq!(arena.enemy_force(PlayerColor::Blue)[0].uid, 2);

        // A hypnotized unit fights for the other side.
        arena.unit_by_uid_mut(2).unwrap().current_color = PlayerColor::Blue;
        assert_eq!(arena.force(PlayerColor::Blue).len(), 2);
        assert!(arena.enemy_force(PlayerColor::Blue).is_empty());
    }

    #[test]
    fn moves_are_limited_by_speed() {
        let arena = arena_with_units();
        let unit = arena.unit_by_uid(1).unwrap();
        let moves = arena.get_all_available_moves(unit);
        let speed = unit.speed(false);
        assert!(!moves.is_empty());
        for head in moves {
            assert!(arena.calculate_move_distance(unit, head) <= speed);
        }
    }

    #[test]
    fn unit_remover_restores_on_drop() {
        let mut arena = arena_with_units();
        {
            let remover = UnitRemover::new(&mut arena, 1);
            assert!(remover.arena().unit_at(22).is_none());
        }
        assert_eq!(arena.unit_at(22).unwrap().uid, 1);
    }

    #[test]
    fn teleport_guard_is_scoped() {
        let mut arena = arena_with_units();
        {
            let guard = TeleportAbilityGuard::new(&mut arena, 1);
            let unit = guard.arena().unit_by_uid(1).unwrap();
            assert!(unit.modes.contains(UnitModes::TELEPORT_ABILITY));
        }
        assert!(!arena.unit_by_uid(1).unwrap().modes.contains(UnitModes::TELEPORT_ABILITY));
    }

    #[test]
    fn retreat_rules_follow_the_siege() {
        let mut arena = arena_with_units();
        arena.add_commander(Commander::new(CommanderKind::Hero, PlayerColor::Blue));
        arena.add_commander(Commander::new(CommanderKind::Hero, PlayerColor::Red));
        assert!(arena.can_retreat_opponent(PlayerColor::Blue));
        assert!(arena.can_retreat_opponent(PlayerColor::Red));

        arena.castle = Some(CastleSiege {
            defender: PlayerColor::Red,
            towers_strength: 50.0,
            has_moat: true,
            wall_targets_total: 6,
            wall_targets_intact: 6,
        });
        assert!(arena.can_retreat_opponent(PlayerColor::Blue));
        assert!(!arena.can_retreat_opponent(PlayerColor::Red));
    }

    #[test]
    fn area_spells_cover_the_blast() {
        let mut arena = arena_with_units();
        arena.units.push(BattleUnit::new(3, MonsterId::Goblin, 5, PlayerColor::Red, 28, true));

        let targets = arena.get_targets_for_spell(PlayerColor::Blue, Spell::Fireball, 27);
        assert!(targets.contains(&2));
        assert!(targets.contains(&3));

        let single = arena.get_targets_for_spell(PlayerColor::Blue, Spell::LightningBolt, 27);
        assert_eq!(single, vec![2]);
    }
}
