use crate::board;
use crate::unit::BattleUnit;

/// A (possibly two-cell) spot on the battlefield: head cell plus the tail cell
/// of wide units. Equality ignores orientation so that a position reached
/// after a reversal is the same position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Position {
    pub head: i32,
    pub tail: i32,
}

impl Position {
    pub fn single(head: i32) -> Self {
        Position { head, tail: -1 }
    }

    pub fn of_unit(unit: &BattleUnit) -> Self {
        Position { head: unit.head, tail: unit.tail() }
    }

    /// The position a unit would occupy with its head on the given cell,
    /// keeping its current orientation. Returns None when the tail would
    /// leave the board or wrap to another row.
    pub fn for_unit(unit: &BattleUnit, head: i32) -> Option<Position> {
        if !board::is_valid_index(head) {
            return None;
        }
        if !unit.is_wide() {
            return Some(Position::single(head));
        }

        let tail = if unit.reflected { head + 1 } else { head - 1 };
        if !board::is_valid_index(tail) || tail / board::WIDTH != head / board::WIDTH {
            return None;
        }
        Some(Position { head, tail })
    }

    pub fn is_wide(&self) -> bool {
        self.tail >= 0
    }

    pub fn contains(&self, cell: i32) -> bool {
        cell == self.head || (self.is_wide() && cell == self.tail)
    }

    pub fn cells(&self) -> Vec<i32> {
        if self.is_wide() {
            vec![self.head, self.tail]
        } else {
            vec![self.head]
        }
    }

    /// Hex distance between the closest cells of two positions.
    pub fn distance(&self, other: &Position) -> u32 {
        let other_cells = other.cells();
        self.cells()
            .iter()
            .flat_map(|&a| other_cells.iter().map(move |&b| board::distance(a, b)))
            .min()
            .unwrap_or(u32::MAX)
    }

    pub fn is_adjacent(&self, other: &Position) -> bool {
        self.distance(other) == 1
    }

    pub fn around(&self) -> Vec<i32> {
        board::around_position(self.head, self.tail)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ravenmoor_core::color::PlayerColor;
    use ravenmoor_core::monster::MonsterId;

    #[test]
    fn wide_positions_never_wrap_rows() {
        let rider = BattleUnit::new(1, MonsterId::Cavalry, 1, PlayerColor::Blue, 0, false);
        // Head on the leftmost column would put the tail off the row.
        assert!(Position::for_unit(&rider, 0).is_none());
        assert!(Position::for_unit(&rider, 1).is_some());
        assert!(Position::for_unit(&rider, 11).is_none());
    }

    #[test]
    fn narrow_positions_are_single_cell() {
        let wolf = BattleUnit::new(1, MonsterId::Goblin, 1, PlayerColor::Blue, 40, false);
        let pos = Position::for_unit(&wolf, 40).unwrap();
        assert!(!pos.is_wide());
        assert_eq!(pos.cells(), vec![40]);
    }

    #[test]
    fn distance_uses_the_closest_cells() {
        let wide = Position { head: 27, tail: 26 };
        let single = Position::single(28);
        assert_eq!(wide.distance(&single), 1);
        assert!(wide.is_adjacent(&single));
    }
}
