use ravenmoor_core::color::{ColorSet, PlayerColor};
use ravenmoor_core::hero::HeroId;
use serde::{Deserialize, Serialize};

use crate::direction::{Direction, PASSABLE_ALL};
use crate::object::{MapObject, MapObjectKind};

/// Terrain kinds with their movement penalties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Ground {
    #[default]
    Grass,
    Dirt,
    Wasteland,
    Beach,
    Snow,
    Swamp,
    Desert,
    Lava,
    Water,
}

impl Ground {
    /// Movement points to enter a tile of this terrain with a straight step.
    pub fn penalty(self) -> u32 {
        match self {
            Ground::Grass | Ground::Dirt | Ground::Lava | Ground::Water => 100,
            Ground::Beach | Ground::Wasteland => 125,
            Ground::Snow | Ground::Swamp => 175,
            Ground::Desert => 200,
        }
    }

    pub const FASTEST_PENALTY: u32 = 100;
    pub const SLOWEST_PENALTY: u32 = 200;
}

/// One cell of the adventure map. Lifetime equals the map's.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tile {
    pub index: i32,
    pub ground: Ground,
    /// Directions a hero may leave this tile in.
    pub passability: u8,
    pub object: Option<MapObject>,
    pub hero: Option<HeroId>,
    pub region: u32,
    /// Colors for which this tile is still hidden.
    pub fog: ColorSet,
}

impl Tile {
    pub fn new(index: i32, ground: Ground) -> Self {
        Tile {
            index,
            ground,
            passability: PASSABLE_ALL,
            object: None,
            hero: None,
            region: 0,
            fog: ColorSet::all(),
        }
    }

    pub fn is_water(&self) -> bool {
        self.ground == Ground::Water
    }

    pub fn is_fog(&self, color: PlayerColor) -> bool {
        self.fog.contains(color)
    }

    pub fn reveal(&mut self, color: PlayerColor) {
        self.fog.remove(color);
    }

    /// The object kind as the planners see it. When a hero stands on an action
    /// object, the hero is what the tile presents; `under_hero` looks below.
    pub fn object_kind(&self, under_hero: bool) -> MapObjectKind {
        if !under_hero && self.hero.is_some() {
            return MapObjectKind::Hero;
        }
        self.object.as_ref().map(|object| object.kind).unwrap_or(MapObjectKind::None)
    }

    pub fn object_owner(&self) -> PlayerColor {
        self.object.as_ref().map(|object| object.owner).unwrap_or(PlayerColor::None)
    }

    pub fn allows_direction(&self, direction: Direction) -> bool {
        self.passability & direction.bit() != 0
    }

    /// Strength of the army guarding this tile, zero when unguarded.
    pub fn guard_strength(&self) -> f64 {
        self.object.as_ref().map(|object| object.guard_strength()).unwrap_or(0.0)
    }

    pub fn is_guarded(&self) -> bool {
        self.guard_strength() > 0.0
    }

    /// Whether the tile blocks movement outright (no object interaction, no
    /// passage). Water is handled by the boat rules, not here.
    pub fn is_blocked(&self) -> bool {
        self.passability == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::ObjectPayload;
    use ravenmoor_core::monster::MonsterId;
    use ravenmoor_core::troop::Troop;

    #[test]
    fn hero_masks_the_object_underneath() {
        let mut tile = Tile::new(7, Ground::Grass);
        tile.object = Some(MapObject::new(MapObjectKind::TreasureChest));
        tile.hero = Some(HeroId(3));

        assert_eq!(tile.object_kind(false), MapObjectKind::Hero);
        assert_eq!(tile.object_kind(true), MapObjectKind::TreasureChest);
    }

    #[test]
    fn guarded_tiles_report_strength() {
        let mut tile = Tile::new(0, Ground::Grass);
        assert!(!tile.is_guarded());

        tile.object = Some(MapObject::with_payload(
            MapObjectKind::Monster,
            ObjectPayload::Troops(Troop::new(MonsterId::Ogre, 8)),
        ));
        assert!(tile.is_guarded());
    }

    #[test]
    fn desert_is_the_slowest_ground() {
        assert_eq!(Ground::Desert.penalty(), Ground::SLOWEST_PENALTY);
        assert!(Ground::Grass.penalty() < Ground::Snow.penalty());
    }
}
