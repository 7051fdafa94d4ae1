use ravenmoor_core::artifact::Artifact;
use ravenmoor_core::color::PlayerColor;
use ravenmoor_core::resource::Funds;
use ravenmoor_core::skill::Secondary;
use ravenmoor_core::spell::Spell;
use ravenmoor_core::troop::Troop;
use serde::{Deserialize, Serialize};

/// Everything that can sit on an adventure-map tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MapObjectKind {
    None,
    Castle,
    Hero,
    Monster,
    Boat,
    // Capture objects with daily income.
    Mine,
    Sawmill,
    AlchemistLab,
    AbandonedMine,
    Lighthouse,
    // One-shot pickups.
    Artifact,
    TreasureChest,
    SeaChest,
    Resource,
    Campfire,
    Flotsam,
    ShipwreckSurvivor,
    Bottle,
    // Loot behind a fight.
    DaemonCave,
    Graveyard,
    Shipwreck,
    DerelictShip,
    Pyramid,
    // Loot without a fight.
    Skeleton,
    Wagon,
    LeanTo,
    MagicGarden,
    WaterWheel,
    Windmill,
    // Skill, stat and spell boosters.
    Fort,
    Gazebo,
    MercenaryCamp,
    StandingStones,
    WitchDoctorsHut,
    WitchsHut,
    TreeOfKnowledge,
    Arena,
    Xanadu,
    ShrineFirstCircle,
    ShrineSecondCircle,
    ShrineThirdCircle,
    // Free army upgrades.
    Stables,
    FreemansFoundry,
    HillFort,
    // Morale and luck.
    Buoy,
    Temple,
    FaerieRing,
    Fountain,
    Idol,
    Mermaid,
    Oasis,
    WateringHole,
    // Mana.
    MagicWell,
    ArtesianSpring,
    // Scouting.
    ObservationTower,
    MagellansMaps,
    HutOfMagi,
    EyeOfMagi,
    // Misc.
    Jail,
    TravellerTent,
    Barrier,
    Obelisk,
    Sign,
    StoneLiths,
    Whirlpool,
    TradingPost,
    Oracle,
    Sphinx,
    Sirens,
    AlchemistTower,
    // Dwellings with troops that join for free.
    PeasantHut,
    GoblinHut,
    ArcherHouse,
    DwarfCottage,
    TreeHouse,
    WatchTower,
    Cave,
    Excavation,
    HalflingHole,
    // Dwellings selling troops.
    Ruins,
    TreeCity,
    WagonCamp,
    DesertTent,
    GenieLamp,
    BarrowMounds,
    AirAltar,
    EarthAltar,
    FireAltar,
    WaterAltar,
    // Dwellings that may have to be conquered first.
    CityOfDead,
    DragonCity,
    TrollBridge,
}

impl MapObjectKind {
    /// Objects a hero can interact with by stepping on (or next to) them.
    /// Boats, stone liths and whirlpools are transit helpers, not actions.
    pub fn is_action_object(self) -> bool {
        use MapObjectKind::*;
        !matches!(self, None | Boat | StoneLiths | Whirlpool | EyeOfMagi)
    }

    pub fn is_capture_object(self) -> bool {
        use MapObjectKind::*;
        matches!(self, Castle | Mine | Sawmill | AlchemistLab | AbandonedMine | Lighthouse)
    }

    /// Dwellings whose troops join a passing army for free.
    pub fn is_free_dwelling(self) -> bool {
        use MapObjectKind::*;
        matches!(
            self,
            PeasantHut | GoblinHut | ArcherHouse | DwarfCottage | TreeHouse | WatchTower | Cave | Excavation
                | HalflingHole
        )
    }

    /// Dwellings that sell troops.
    pub fn is_hire_dwelling(self) -> bool {
        use MapObjectKind::*;
        matches!(
            self,
            Ruins | TreeCity | WagonCamp | DesertTent | GenieLamp | BarrowMounds | AirAltar | EarthAltar | FireAltar
                | WaterAltar | CityOfDead | DragonCity | TrollBridge
        )
    }

    /// Objects whose payload implies a fight before the reward.
    pub fn is_guarded_object(self) -> bool {
        use MapObjectKind::*;
        matches!(
            self,
            Monster | AbandonedMine | DaemonCave | Graveyard | Shipwreck | Pyramid | CityOfDead | DragonCity
                | TrollBridge
        )
    }
}

/// Payload attached to a map object. The object kind determines which payload
/// is present; mismatches are treated as missing state per the error policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ObjectPayload {
    None,
    ArtifactReward(Artifact),
    FundsReward(Funds),
    Troops(Troop),
    SpellTaught(Spell),
    SkillTaught(Secondary),
    /// Owner of a capture object, or the color of a barrier/tent pair.
    Owner(PlayerColor),
    /// Daily income of a mine-like object.
    Income(Funds),
}

/// A map object: kind plus optional payload plus an optional guardian stack.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapObject {
    pub kind: MapObjectKind,
    pub payload: ObjectPayload,
    pub guard: Option<Troop>,
    pub owner: PlayerColor,
}

impl MapObject {
    pub fn new(kind: MapObjectKind) -> Self {
        MapObject { kind, payload: ObjectPayload::None, guard: None, owner: PlayerColor::None }
    }

    pub fn with_payload(kind: MapObjectKind, payload: ObjectPayload) -> Self {
        MapObject { kind, payload, guard: None, owner: PlayerColor::None }
    }

    pub fn artifact(&self) -> Option<Artifact> {
        match self.payload {
            ObjectPayload::ArtifactReward(artifact) => Some(artifact),
            _ => None,
        }
    }

    pub fn funds(&self) -> Option<Funds> {
        match self.payload {
            ObjectPayload::FundsReward(funds) | ObjectPayload::Income(funds) => Some(funds),
            _ => None,
        }
    }

    pub fn troop(&self) -> Option<Troop> {
        match self.payload {
            ObjectPayload::Troops(troop) => Some(troop),
            _ => None,
        }
    }

    pub fn spell(&self) -> Option<Spell> {
        match self.payload {
            ObjectPayload::SpellTaught(spell) => Some(spell),
            _ => None,
        }
    }

    pub fn skill(&self) -> Option<Secondary> {
        match self.payload {
            ObjectPayload::SkillTaught(skill) => Some(skill),
            _ => None,
        }
    }

    /// Strength of whatever defends this tile.
    pub fn guard_strength(&self) -> f64 {
        if let Some(guard) = self.guard {
            return guard.strength();
        }
        // Wandering monsters guard themselves.
        if self.kind == MapObjectKind::Monster {
            return self.troop().map(|troop| troop.strength()).unwrap_or(0.0);
        }
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ravenmoor_core::monster::MonsterId;

    #[test]
    fn transit_objects_are_not_actions() {
        assert!(!MapObjectKind::Boat.is_action_object());
        assert!(!MapObjectKind::StoneLiths.is_action_object());
        assert!(MapObjectKind::TreasureChest.is_action_object());
    }

    #[test]
    fn monsters_guard_themselves() {
        let monsters = MapObject::with_payload(
            MapObjectKind::Monster,
            ObjectPayload::Troops(Troop::new(MonsterId::Wolf, 10)),
        );
        assert!(monsters.guard_strength() > 0.0);

        let chest = MapObject::new(MapObjectKind::TreasureChest);
        assert_eq!(chest.guard_strength(), 0.0);
    }
}
