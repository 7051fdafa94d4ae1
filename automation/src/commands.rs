use ravenmoor_core::castle::CastleId;
use ravenmoor_core::hero::HeroId;
use ravenmoor_core::spell::Spell;

/// Command records emitted by the adventure planner, in execution order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdventureCommand {
    /// Walk toward a tile without fighting anything at the destination.
    Move { hero: HeroId, to: i32 },
    /// Walk to a tile whose object implies a fight.
    Attack { hero: HeroId, target: i32 },
    Cast { hero: HeroId, spell: Spell, target: i32 },
    RecruitHero { castle: CastleId, hero: HeroId },
    Build { castle: CastleId, building: u32 },
}
