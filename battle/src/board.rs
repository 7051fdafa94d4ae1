//! Static geometry of the battlefield: an 11x9 hex board, row-major indexing,
//! odd rows shifted half a cell to the right.

pub const WIDTH: i32 = 11;
pub const HEIGHT: i32 = 9;
pub const SIZE: i32 = WIDTH * HEIGHT;

/// Cells directly under the castle walls, one per wall row; the siege
/// fallback target for melee units.
pub const CELLS_UNDER_WALLS: [i32; 5] = [7, 28, 49, 72, 95];

/// The six hex directions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HexDirection {
    TopLeft,
    TopRight,
    Right,
    BottomRight,
    BottomLeft,
    Left,
}

impl HexDirection {
    pub const ALL: [HexDirection; 6] = [
        HexDirection::TopLeft,
        HexDirection::TopRight,
        HexDirection::Right,
        HexDirection::BottomRight,
        HexDirection::BottomLeft,
        HexDirection::Left,
    ];

    pub fn reflect(self) -> HexDirection {
        match self {
            HexDirection::TopLeft => HexDirection::BottomRight,
            HexDirection::TopRight => HexDirection::BottomLeft,
            HexDirection::Right => HexDirection::Left,
            HexDirection::BottomRight => HexDirection::TopLeft,
            HexDirection::BottomLeft => HexDirection::TopRight,
            HexDirection::Left => HexDirection::Right,
        }
    }
}

pub fn is_valid_index(index: i32) -> bool {
    (0..SIZE).contains(&index)
}

fn coordinates(index: i32) -> (i32, i32) {
    (index % WIDTH, index / WIDTH)
}

/// The neighbouring cell in a hex direction, if it stays on the board.
pub fn index_direction(index: i32, direction: HexDirection) -> Option<i32> {
    if !is_valid_index(index) {
        return None;
    }
    let (x, y) = coordinates(index);
    let odd_row = y % 2 == 1;

    let (nx, ny) = match direction {
        HexDirection::Left => (x - 1, y),
        HexDirection::Right => (x + 1, y),
        HexDirection::TopLeft => (if odd_row { x } else { x - 1 }, y - 1),
        HexDirection::TopRight => (if odd_row { x + 1 } else { x }, y - 1),
        HexDirection::BottomLeft => (if odd_row { x } else { x - 1 }, y + 1),
        HexDirection::BottomRight => (if odd_row { x + 1 } else { x }, y + 1),
    };

    if nx < 0 || nx >= WIDTH || ny < 0 || ny >= HEIGHT {
        None
    } else {
        Some(ny * WIDTH + nx)
    }
}

/// The direction leading from `from` to an adjacent cell `to`.
pub fn direction(from: i32, to: i32) -> Option<HexDirection> {
    HexDirection::ALL.iter().copied().find(|&dir| index_direction(from, dir) == Some(to))
}

pub fn neighbours(index: i32) -> Vec<i32> {
    HexDirection::ALL
        .iter()
        .filter_map(|&dir| index_direction(index, dir))
        .collect()
}

fn axial(index: i32) -> (i32, i32) {
    let (x, y) = coordinates(index);
    // odd-r offset -> axial
    (x - (y - (y & 1)) / 2, y)
}

/// Hex distance between two cells.
pub fn distance(a: i32, b: i32) -> u32 {
    let (aq, ar) = axial(a);
    let (bq, br) = axial(b);
    let dq = aq - bq;
    let dr = ar - br;
    ((dq.abs() + dr.abs() + (dq + dr).abs()) / 2) as u32
}

pub fn is_near(a: i32, b: i32) -> bool {
    distance(a, b) == 1
}

/// All valid cells adjacent to a (possibly two-cell) position.
pub fn around_position(head: i32, tail: i32) -> Vec<i32> {
    let mut result = neighbours(head);
    if is_valid_index(tail) {
        for cell in neighbours(tail) {
            if cell != head && !result.contains(&cell) {
                result.push(cell);
            }
        }
        result.retain(|&cell| cell != tail);
    }
    result
}

/// All cells within `radius` of the position, excluding its own cells.
pub fn distance_indexes(head: i32, tail: i32, radius: u32) -> Vec<i32> {
    (0..SIZE)
        .filter(|&cell| cell != head && cell != tail)
        .filter(|&cell| {
            let from_head = distance(head, cell);
            let from_tail = if is_valid_index(tail) { distance(tail, cell) } else { u32::MAX };
            from_head.min(from_tail) <= radius && from_head.min(from_tail) > 0
        })
        .collect()
}

/// Columns travelled from the unit's own board edge, 1-based. Attackers start
/// from the left edge, defenders (reflected) from the right.
pub fn distance_from_board_edge_along_x(index: i32, reflected: bool) -> u32 {
    let (x, _) = coordinates(index);
    if reflected {
        (WIDTH - x) as u32
    } else {
        (x + 1) as u32
    }
}

/// Cells inside the castle during a siege (the defender's corner).
pub fn is_castle_cell(index: i32) -> bool {
    let (x, _) = coordinates(index);
    x >= 8 || CELLS_UNDER_WALLS.contains(&index)
}

/// The moat runs along the column in front of the walls.
pub fn is_moat_cell(index: i32) -> bool {
    let (x, _) = coordinates(index);
    x == 7 && !CELLS_UNDER_WALLS.contains(&index)
}

/// Whether a unit standing with the given head (and optional tail) touches
/// the moat. Wide units can hang into it with either cell.
pub fn is_position_in_moat(head: i32, tail: i32) -> bool {
    is_moat_cell(head) || (is_valid_index(tail) && is_moat_cell(tail))
}

/// Whether either side's half contains the cell; used by the defensive
/// tactics check.
pub fn is_own_half(index: i32, reflected: bool) -> bool {
    distance_from_board_edge_along_x(index, reflected) <= (WIDTH / 2) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn board_has_ninety_nine_cells() {
        assert_eq!(SIZE, 99);
    }

    #[test]
    fn neighbours_stay_on_board() {
        for index in 0..SIZE {
            for cell in neighbours(index) {
                assert!(is_valid_index(cell));
                assert!(is_near(index, cell), "{index} -> {cell}");
            }
        }
    }

    #[test]
    fn corner_cells_have_fewer_neighbours() {
        assert_eq!(neighbours(0).len(), 3);
        // A central cell has all six.
        assert_eq!(neighbours(WIDTH * 4 + 5).len(), 6);
    }

    #[test]
    fn direction_roundtrip() {
        let center = WIDTH * 4 + 5;
        for dir in HexDirection::ALL {
            let next = index_direction(center, dir).unwrap();
            assert_eq!(direction(center, next), Some(dir));
            assert_eq!(index_direction(next, dir.reflect()), Some(center));
        }
    }

    #[test]
    fn distance_is_symmetric_and_adjacent_is_one() {
        for index in [0, 17, 44, 98] {
            for cell in neighbours(index) {
                assert_eq!(distance(index, cell), 1);
                assert_eq!(distance(cell, index), 1);
            }
        }
        assert_eq!(distance(0, 0), 0);
        assert_eq!(distance(0, 10), 10);
    }

    #[test]
    fn edge_distance_depends_on_orientation() {
        assert_eq!(distance_from_board_edge_along_x(0, false), 1);
        assert_eq!(distance_from_board_edge_along_x(0, true), 11);
        assert_eq!(distance_from_board_edge_along_x(10, true), 1);
    }

    #[test]
    fn moat_and_castle_cells_do_not_overlap() {
        for index in 0..SIZE {
            assert!(!(is_moat_cell(index) && is_castle_cell(index)), "cell {index}");
        }
        for index in CELLS_UNDER_WALLS {
            assert!(is_castle_cell(index));
        }
    }

    #[test]
    fn distance_is_a_metric_on_random_cells() {
        use rand::{Rng, SeedableRng};

        let mut rng = rand::rngs::StdRng::seed_from_u64(0xb0a7d);
        for _ in 0..500 {
            let a = rng.random_range(0..SIZE);
            let b = rng.random_range(0..SIZE);
            let c = rng.random_range(0..SIZE);
            assert_eq!(distance(a, b), distance(b, a));
            assert!(distance(a, c) <= distance(a, b) + distance(b, c));
        }
    }

    #[test]
    fn wide_position_perimeter_excludes_own_cells() {
        let head = 27;
        let tail = 26;
        let around = around_position(head, tail);
        assert!(!around.contains(&head));
        assert!(!around.contains(&tail));
        assert!(around.len() > neighbours(head).len() - 2);
    }
}
