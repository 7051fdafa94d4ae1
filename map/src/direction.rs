use serde::{Deserialize, Serialize};

/// The eight compass directions of adventure-map movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Top,
    TopRight,
    Right,
    BottomRight,
    Bottom,
    BottomLeft,
    Left,
    TopLeft,
}

impl Direction {
    pub const ALL: [Direction; 8] = [
        Direction::Top,
        Direction::TopRight,
        Direction::Right,
        Direction::BottomRight,
        Direction::Bottom,
        Direction::BottomLeft,
        Direction::Left,
        Direction::TopLeft,
    ];

    pub fn offset(self) -> (i32, i32) {
        match self {
            Direction::Top => (0, -1),
            Direction::TopRight => (1, -1),
            Direction::Right => (1, 0),
            Direction::BottomRight => (1, 1),
            Direction::Bottom => (0, 1),
            Direction::BottomLeft => (-1, 1),
            Direction::Left => (-1, 0),
            Direction::TopLeft => (-1, -1),
        }
    }

    pub fn bit(self) -> u8 {
        match self {
            Direction::Top => 1 << 0,
            Direction::TopRight => 1 << 1,
            Direction::Right => 1 << 2,
            Direction::BottomRight => 1 << 3,
            Direction::Bottom => 1 << 4,
            Direction::BottomLeft => 1 << 5,
            Direction::Left => 1 << 6,
            Direction::TopLeft => 1 << 7,
        }
    }

    pub fn reflect(self) -> Direction {
        match self {
            Direction::Top => Direction::Bottom,
            Direction::TopRight => Direction::BottomLeft,
            Direction::Right => Direction::Left,
            Direction::BottomRight => Direction::TopLeft,
            Direction::Bottom => Direction::Top,
            Direction::BottomLeft => Direction::TopRight,
            Direction::Left => Direction::Right,
            Direction::TopLeft => Direction::BottomRight,
        }
    }

    /// Diagonal steps pay a higher movement penalty.
    pub fn is_diagonal(self) -> bool {
        matches!(
            self,
            Direction::TopRight | Direction::BottomRight | Direction::BottomLeft | Direction::TopLeft
        )
    }
}

/// Passability mask allowing movement out of a tile in every direction.
pub const PASSABLE_ALL: u8 = 0xff;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reflection_is_an_involution() {
        for dir in Direction::ALL {
            assert_eq!(dir.reflect().reflect(), dir);
        }
    }

    #[test]
    fn offsets_are_distinct() {
        let mut seen = std::collections::HashSet::new();
        for dir in Direction::ALL {
            assert!(seen.insert(dir.offset()));
        }
    }
}
