use std::collections::HashSet;

use ravenmoor_core::artifact::Artifact;
use ravenmoor_core::castle::{Castle, CastleId};
use ravenmoor_core::color::PlayerColor;
use ravenmoor_core::hero::{Hero, HeroId};
use ravenmoor_core::kingdom::Kingdom;
use ravenmoor_core::skill::SkillKind;
use serde::{Deserialize, Serialize};

use crate::direction::Direction;
use crate::object::MapObjectKind;
use crate::region::{build_regions, MapRegion};
use crate::tile::Tile;

pub const DAYS_PER_WEEK: u32 = 7;

/// Base view radius of a hero, before the Scouting skill.
pub const HERO_SCOUT_RADIUS: u32 = 4;

/// Width of a "small" map; the hero-purchase limit scales with it.
pub const SMALL_MAP_WIDTH: i32 = 36;

/// Map-wide victory conditions the planners must respect: targets reserved for
/// the human player are poison for the AI.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VictoryConditions {
    /// Hero whose defeat wins the game for the human player.
    pub target_hero: Option<HeroId>,
    /// Artifact whose discovery wins the game for the human player.
    pub target_artifact: Option<Artifact>,
    /// Castle whose loss ends the game for the human player.
    pub target_castle: Option<i32>,
    pub ai_also_wins: bool,
}

/// Per-hero and per-kingdom visit bookkeeping.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VisitTracker {
    tile_visits: HashSet<(HeroId, i32)>,
    type_visits: HashSet<(HeroId, MapObjectKind)>,
    kingdom_visits: HashSet<(PlayerColor, i32)>,
}

impl VisitTracker {
    pub fn mark(&mut self, hero: HeroId, color: PlayerColor, index: i32, kind: MapObjectKind) {
        self.tile_visits.insert((hero, index));
        self.type_visits.insert((hero, kind));
        self.kingdom_visits.insert((color, index));
    }

    pub fn is_tile_visited(&self, hero: HeroId, index: i32) -> bool {
        self.tile_visits.contains(&(hero, index))
    }

    pub fn is_object_type_visited(&self, hero: HeroId, kind: MapObjectKind) -> bool {
        self.type_visits.contains(&(hero, kind))
    }

    pub fn is_tile_visited_by_kingdom(&self, color: PlayerColor, index: i32) -> bool {
        self.kingdom_visits.contains(&(color, index))
    }

    pub fn is_tile_visited_by_anyone(&self, index: i32) -> bool {
        self.kingdom_visits.iter().any(|&(_, visited)| visited == index)
    }
}

/// The adventure map and every entity living on it. Heroes, castles and
/// kingdoms are stored in dense arenas and referenced by id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct World {
    width: i32,
    height: i32,
    tiles: Vec<Tile>,
    pub heroes: Vec<Hero>,
    pub castles: Vec<Castle>,
    pub kingdoms: Vec<Kingdom>,
    regions: Vec<MapRegion>,
    /// 1-based day counter across the whole game.
    day: u32,
    seed: u64,
    alliances: Vec<(PlayerColor, PlayerColor)>,
    pub visits: VisitTracker,
    pub victory: VictoryConditions,
}

impl World {
    pub fn new(width: i32, height: i32, tiles: Vec<Tile>, seed: u64) -> Self {
        debug_assert_eq!(tiles.len() as i32, width * height);

        let mut tiles = tiles;
        let regions = build_regions(&mut tiles, width);

        World {
            width,
            height,
            tiles,
            heroes: Vec::new(),
            castles: Vec::new(),
            kingdoms: Vec::new(),
            regions,
            day: 1,
            seed,
            alliances: Vec::new(),
            visits: VisitTracker::default(),
            victory: VictoryConditions::default(),
        }
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn size(&self) -> i32 {
        self.width * self.height
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn is_valid_index(&self, index: i32) -> bool {
        index >= 0 && index < self.size()
    }

    pub fn tile(&self, index: i32) -> &Tile {
        &self.tiles[index as usize]
    }

    pub fn tile_mut(&mut self, index: i32) -> &mut Tile {
        &mut self.tiles[index as usize]
    }

    pub fn point(&self, index: i32) -> (i32, i32) {
        (index % self.width, index / self.width)
    }

    pub fn index(&self, x: i32, y: i32) -> i32 {
        y * self.width + x
    }

    /// The neighbouring tile in the given direction, if it is on the map.
    pub fn direction_index(&self, index: i32, direction: Direction) -> Option<i32> {
        let (x, y) = self.point(index);
        let (dx, dy) = direction.offset();
        let (nx, ny) = (x + dx, y + dy);
        if nx < 0 || ny < 0 || nx >= self.width || ny >= self.height {
            None
        } else {
            Some(self.index(nx, ny))
        }
    }

    /// Chebyshev tile distance: the minimum number of steps between two tiles.
    pub fn approximate_distance(&self, a: i32, b: i32) -> u32 {
        let (ax, ay) = self.point(a);
        let (bx, by) = self.point(b);
        (ax - bx).abs().max((ay - by).abs()) as u32
    }

    pub fn count_day(&self) -> u32 {
        self.day
    }

    pub fn next_day(&mut self) {
        self.day += 1;
    }

    /// Whether today is the last day of the week.
    pub fn is_last_day_of_week(&self) -> bool {
        self.day % DAYS_PER_WEEK == 0
    }

    pub fn day_of_week(&self) -> u32 {
        (self.day - 1) % DAYS_PER_WEEK + 1
    }

    pub fn region_count(&self) -> usize {
        self.regions.len()
    }

    pub fn region(&self, id: u32) -> &MapRegion {
        &self.regions[id as usize]
    }

    pub fn hero(&self, id: HeroId) -> &Hero {
        &self.heroes[id.0 as usize]
    }

    pub fn hero_mut(&mut self, id: HeroId) -> &mut Hero {
        &mut self.heroes[id.0 as usize]
    }

    pub fn castle(&self, id: CastleId) -> &Castle {
        &self.castles[id.0 as usize]
    }

    pub fn castle_mut(&mut self, id: CastleId) -> &mut Castle {
        &mut self.castles[id.0 as usize]
    }

    pub fn kingdom(&self, color: PlayerColor) -> Option<&Kingdom> {
        self.kingdoms.iter().find(|kingdom| kingdom.color == color)
    }

    pub fn kingdom_mut(&mut self, color: PlayerColor) -> Option<&mut Kingdom> {
        self.kingdoms.iter_mut().find(|kingdom| kingdom.color == color)
    }

    /// The castle whose entrance occupies the given tile.
    pub fn castle_entrance(&self, index: i32) -> Option<&Castle> {
        self.castles.iter().find(|castle| castle.position == index)
    }

    pub fn castle_entrance_id(&self, index: i32) -> Option<CastleId> {
        self.castle_entrance(index).map(|castle| castle.id)
    }

    pub fn hero_at(&self, index: i32) -> Option<&Hero> {
        self.tile(index).hero.map(|id| self.hero(id))
    }

    /// The castle a hero currently resides in, if any.
    pub fn hero_in_castle(&self, hero: HeroId) -> Option<CastleId> {
        let position = self.hero(hero).position;
        self.castles
            .iter()
            .find(|castle| castle.position == position && castle.hero == Some(hero))
            .map(|castle| castle.id)
    }

    pub fn add_alliance(&mut self, a: PlayerColor, b: PlayerColor) {
        self.alliances.push((a, b));
    }

    pub fn are_friends(&self, a: PlayerColor, b: PlayerColor) -> bool {
        if a == b {
            return true;
        }
        self.alliances.iter().any(|&(x, y)| (x == a && y == b) || (x == b && y == a))
    }

    /// Tents of the given barrier color.
    pub fn all_traveller_tent_positions(&self, color: PlayerColor) -> Vec<i32> {
        self.tiles
            .iter()
            .filter(|tile| {
                tile.object_kind(true) == MapObjectKind::TravellerTent && tile.object_owner() == color
            })
            .map(|tile| tile.index)
            .collect()
    }

    pub fn all_eye_of_magi_positions(&self) -> Vec<i32> {
        self.tiles
            .iter()
            .filter(|tile| tile.object_kind(true) == MapObjectKind::EyeOfMagi)
            .map(|tile| tile.index)
            .collect()
    }

    pub fn object_exists(&self, kind: MapObjectKind) -> bool {
        self.tiles.iter().any(|tile| tile.object_kind(true) == kind)
    }

    /// How many fog tiles would open for `color` when looking around `index`
    /// with the given view radius.
    pub fn fog_count_to_be_revealed(&self, index: i32, radius: u32, color: PlayerColor) -> u32 {
        let (cx, cy) = self.point(index);
        let mut count = 0;
        for y in (cy - radius as i32).max(0)..=(cy + radius as i32).min(self.height - 1) {
            for x in (cx - radius as i32).max(0)..=(cx + radius as i32).min(self.width - 1) {
                if self.tile(self.index(x, y)).is_fog(color) {
                    count += 1;
                }
            }
        }
        count
    }

    pub fn reveal_fog_around(&mut self, index: i32, radius: u32, color: PlayerColor) {
        let (cx, cy) = self.point(index);
        for y in (cy - radius as i32).max(0)..=(cy + radius as i32).min(self.height - 1) {
            for x in (cx - radius as i32).max(0)..=(cx + radius as i32).min(self.width - 1) {
                let idx = self.index(x, y);
                self.tile_mut(idx).reveal(color);
            }
        }
    }

    /// Fraction of land tiles with an above-baseline movement penalty; drives
    /// the value of the Pathfinding skill.
    pub fn land_roughness(&self) -> f64 {
        let land: Vec<_> = self.tiles.iter().filter(|tile| !tile.is_water()).collect();
        if land.is_empty() {
            return 1.0;
        }
        let total_penalty: u64 = land.iter().map(|tile| tile.ground.penalty() as u64).sum();
        total_penalty as f64 / (land.len() as u64 * crate::tile::Ground::FASTEST_PENALTY as u64) as f64
    }

    pub fn water_percentage(&self) -> u8 {
        if self.tiles.is_empty() {
            return 0;
        }
        let water = self.tiles.iter().filter(|tile| tile.is_water()).count();
        (water * 100 / self.tiles.len()) as u8
    }

    // --- mutation helpers used by the planners and the demo driver ---

    /// Moves a hero to a new tile, keeping both tiles' hero links consistent.
    pub fn relocate_hero(&mut self, id: HeroId, to: i32) {
        let from = self.hero(id).position;
        if self.is_valid_index(from) && self.tiles[from as usize].hero == Some(id) {
            self.tiles[from as usize].hero = None;
        }
        self.hero_mut(id).position = to;
        self.tiles[to as usize].hero = Some(id);

        let hero = self.hero(id);
        let radius = HERO_SCOUT_RADIUS + ravenmoor_core::skill::scouting_bonus(hero.skill_level(SkillKind::Scouting));
        let color = hero.color;
        self.reveal_fog_around(to, radius, color);
    }

    pub fn remove_object(&mut self, index: i32) {
        self.tile_mut(index).object = None;
    }

    pub fn remove_hero_from_map(&mut self, id: HeroId) {
        let position = self.hero(id).position;
        if self.is_valid_index(position) && self.tiles[position as usize].hero == Some(id) {
            self.tiles[position as usize].hero = None;
        }
        self.hero_mut(id).active = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tile::Ground;

    fn flat_world(width: i32, height: i32) -> World {
        let tiles = (0..width * height).map(|index| Tile::new(index, Ground::Grass)).collect();
        World::new(width, height, tiles, 17)
    }

    #[test]
    fn direction_index_respects_borders() {
        let world = flat_world(4, 4);
        assert_eq!(world.direction_index(0, Direction::Left), None);
        assert_eq!(world.direction_index(0, Direction::Right), Some(1));
        assert_eq!(world.direction_index(0, Direction::Bottom), Some(4));
        assert_eq!(world.direction_index(15, Direction::BottomRight), None);
    }

    #[test]
    fn week_arithmetic() {
        let mut world = flat_world(2, 2);
        assert_eq!(world.day_of_week(), 1);
        for _ in 0..6 {
            world.next_day();
        }
        assert_eq!(world.day_of_week(), 7);
        assert!(world.is_last_day_of_week());
    }

    #[test]
    fn relocating_a_hero_updates_both_tiles() {
        let mut world = flat_world(4, 4);
        world.heroes.push(Hero::new(HeroId(0), "Mira", PlayerColor::Blue, 0));
        world.tiles[0].hero = Some(HeroId(0));

        world.relocate_hero(HeroId(0), 5);
        assert_eq!(world.tile(0).hero, None);
        assert_eq!(world.tile(5).hero, Some(HeroId(0)));
        assert_eq!(world.hero(HeroId(0)).position, 5);
    }

    #[test]
    fn fog_reveals_around_heroes() {
        let mut world = flat_world(8, 8);
        assert!(world.tile(0).is_fog(PlayerColor::Blue));
        world.heroes.push(Hero::new(HeroId(0), "Mira", PlayerColor::Blue, 63));
        world.relocate_hero(HeroId(0), 0);
        assert!(!world.tile(0).is_fog(PlayerColor::Blue));
        assert!(!world.tile(world.index(4, 4)).is_fog(PlayerColor::Blue));
        assert!(world.tile(world.index(7, 7)).is_fog(PlayerColor::Blue));
    }
}
