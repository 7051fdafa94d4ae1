use serde::{Deserialize, Serialize};

/// Player colors. `None` is used for neutral objects (unowned mines, neutral castles).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PlayerColor {
    #[default]
    None,
    Blue,
    Green,
    Red,
    Yellow,
    Orange,
    Purple,
}

impl PlayerColor {
    pub const ALL: [PlayerColor; 6] = [
        PlayerColor::Blue,
        PlayerColor::Green,
        PlayerColor::Red,
        PlayerColor::Yellow,
        PlayerColor::Orange,
        PlayerColor::Purple,
    ];

    pub fn is_valid(self) -> bool {
        self != PlayerColor::None
    }

    fn bit(self) -> u8 {
        match self {
            PlayerColor::None => 0,
            PlayerColor::Blue => 1 << 0,
            PlayerColor::Green => 1 << 1,
            PlayerColor::Red => 1 << 2,
            PlayerColor::Yellow => 1 << 3,
            PlayerColor::Orange => 1 << 4,
            PlayerColor::Purple => 1 << 5,
        }
    }
}

/// A set of player colors packed into a byte. Used for fog visibility and alliances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ColorSet(u8);

impl ColorSet {
    pub fn empty() -> Self {
        ColorSet(0)
    }

    pub fn all() -> Self {
        ColorSet(0x3f)
    }

    pub fn contains(self, color: PlayerColor) -> bool {
        self.0 & color.bit() != 0
    }

    pub fn insert(&mut self, color: PlayerColor) {
        self.0 |= color.bit();
    }

    pub fn remove(&mut self, color: PlayerColor) {
        self.0 &= !color.bit();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn color_set_membership() {
        let mut set = ColorSet::empty();
        assert!(!set.contains(PlayerColor::Blue));

        set.insert(PlayerColor::Blue);
        set.insert(PlayerColor::Red);
        assert!(set.contains(PlayerColor::Blue));
        assert!(set.contains(PlayerColor::Red));
        assert!(!set.contains(PlayerColor::Green));

        set.remove(PlayerColor::Blue);
        assert!(!set.contains(PlayerColor::Blue));
    }

    #[test]
    fn neutral_color_is_never_in_a_set() {
        let set = ColorSet::all();
        assert!(!set.contains(PlayerColor::None));
    }
}
