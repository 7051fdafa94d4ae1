use serde::{Deserialize, Serialize};

/// Every spell in the game, combat and adventure alike.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Spell {
    None,
    Fireball,
    Fireblast,
    LightningBolt,
    ChainLightning,
    Teleport,
    Cure,
    MassCure,
    Resurrect,
    ResurrectTrue,
    Haste,
    MassHaste,
    Slow,
    MassSlow,
    Blind,
    Bless,
    MassBless,
    Stoneskin,
    Steelskin,
    Curse,
    MassCurse,
    HolyWord,
    HolyShout,
    AntiMagic,
    Dispel,
    MassDispel,
    Arrow,
    Berserker,
    Armageddon,
    ElementalStorm,
    MeteorShower,
    Paralyze,
    Hypnotize,
    ColdRay,
    ColdRing,
    DisruptingRay,
    DeathRipple,
    DeathWave,
    DragonSlayer,
    Bloodlust,
    AnimateDead,
    MirrorImage,
    Shield,
    MassShield,
    SummonEarthElemental,
    SummonAirElemental,
    SummonFireElemental,
    SummonWaterElemental,
    Earthquake,
    ViewAll,
    SummonBoat,
    DimensionDoor,
    TownGate,
    TownPortal,
}

/// Static per-spell data: casting cost and the multipurpose extra value
/// (damage per power, HP restored/resurrected per power, skill delta, etc.)
struct SpellStats {
    cost: u32,
    extra_value: u32,
}

impl Spell {
    fn stats(self) -> SpellStats {
        use Spell::*;
        let (cost, extra_value) = match self {
            None => (0, 0),
            Fireball => (9, 10),
            Fireblast => (15, 10),
            LightningBolt => (7, 25),
            ChainLightning => (15, 40),
            Teleport => (9, 0),
            Cure => (6, 5),
            MassCure => (15, 5),
            Resurrect => (12, 50),
            ResurrectTrue => (15, 50),
            Haste => (3, 2),
            MassHaste => (10, 2),
            Slow => (3, 0),
            MassSlow => (15, 0),
            Blind => (6, 0),
            Bless => (3, 0),
            MassBless => (12, 0),
            Stoneskin => (3, 3),
            Steelskin => (6, 5),
            Curse => (3, 0),
            MassCurse => (12, 0),
            HolyWord => (9, 10),
            HolyShout => (12, 20),
            AntiMagic => (7, 0),
            Dispel => (5, 0),
            MassDispel => (12, 0),
            Arrow => (3, 10),
            Berserker => (12, 0),
            Armageddon => (20, 50),
            ElementalStorm => (15, 25),
            MeteorShower => (15, 25),
            Paralyze => (9, 0),
            Hypnotize => (15, 25),
            ColdRay => (6, 20),
            ColdRing => (9, 10),
            DisruptingRay => (7, 3),
            DeathRipple => (6, 5),
            DeathWave => (10, 10),
            DragonSlayer => (6, 5),
            Bloodlust => (3, 3),
            AnimateDead => (10, 50),
            MirrorImage => (25, 0),
            Shield => (3, 2),
            MassShield => (7, 0),
            SummonEarthElemental => (30, 3),
            SummonAirElemental => (30, 3),
            SummonFireElemental => (30, 3),
            SummonWaterElemental => (30, 3),
            Earthquake => (15, 0),
            ViewAll => (3, 0),
            SummonBoat => (5, 0),
            DimensionDoor => (10, 0),
            TownGate => (10, 0),
            TownPortal => (20, 0),
        };
        SpellStats { cost, extra_value }
    }

    pub fn is_valid(self) -> bool {
        self != Spell::None
    }

    /// Spell points required to cast this spell.
    pub fn cost(self) -> u32 {
        self.stats().cost
    }

    pub fn extra_value(self) -> u32 {
        self.stats().extra_value
    }

    pub fn level(self) -> u32 {
        use Spell::*;
        match self {
            Bless | Bloodlust | Cure | Curse | Dispel | Haste | Arrow | Shield | Slow | Stoneskin => 1,
            Blind | ColdRay | DeathRipple | DisruptingRay | DragonSlayer | LightningBolt | Steelskin | SummonBoat => 2,
            AnimateDead | AntiMagic | ColdRing | DeathWave | Earthquake | Fireball | HolyWord | MassBless
            | MassCurse | MassDispel | MassHaste | Paralyze | Teleport => 3,
            Berserker | ChainLightning | ElementalStorm | Fireblast | HolyShout | MassCure | MassShield | MassSlow
            | MeteorShower | Resurrect | TownGate | ViewAll => 4,
            Armageddon | Hypnotize | MirrorImage | ResurrectTrue | SummonEarthElemental | SummonAirElemental
            | SummonFireElemental | SummonWaterElemental | DimensionDoor | TownPortal => 5,
            None => 0,
        }
    }

    pub fn is_combat(self) -> bool {
        use Spell::*;
        !matches!(self, None | ViewAll | SummonBoat | DimensionDoor | TownGate | TownPortal)
    }

    pub fn is_adventure(self) -> bool {
        self.is_valid() && !self.is_combat()
    }

    /// Base damage per point of spell power.
    pub fn damage(self) -> u32 {
        use Spell::*;
        match self {
            Arrow | Fireball | Fireblast | LightningBolt | ColdRing | DeathWave | HolyWord | ChainLightning
            | Armageddon | ElementalStorm | MeteorShower | ColdRay | HolyShout | DeathRipple => self.extra_value(),
            _ => 0,
        }
    }

    pub fn is_damage(self) -> bool {
        self.damage() != 0
    }

    /// HP healed per point of spell power.
    pub fn restore(self) -> u32 {
        match self {
            Spell::Cure | Spell::MassCure => self.extra_value(),
            _ => 0,
        }
    }

    /// HP resurrected per point of spell power.
    pub fn resurrect(self) -> u32 {
        match self {
            Spell::Resurrect | Spell::ResurrectTrue | Spell::AnimateDead => self.extra_value(),
            _ => 0,
        }
    }

    pub fn is_resurrect(self) -> bool {
        self.resurrect() != 0
    }

    pub fn is_summon(self) -> bool {
        use Spell::*;
        matches!(self, SummonEarthElemental | SummonAirElemental | SummonFireElemental | SummonWaterElemental)
    }

    pub fn is_effect_dispel(self) -> bool {
        use Spell::*;
        matches!(self, Cure | MassCure | Dispel | MassDispel)
    }

    pub fn is_mind_influence(self) -> bool {
        use Spell::*;
        matches!(self, Blind | Paralyze | Berserker | Hypnotize)
    }

    /// Spells aimed at exactly one unit.
    pub fn is_single_target(self) -> bool {
        use Spell::*;
        matches!(
            self,
            Arrow | LightningBolt | ColdRay | Cure | Resurrect | ResurrectTrue | AnimateDead | Haste | Slow | Blind
                | Bless | Curse | Stoneskin | Steelskin | AntiMagic | Dispel | Berserker | Paralyze | Hypnotize
                | DisruptingRay | DragonSlayer | Bloodlust | MirrorImage | Shield
        )
    }

    /// Spells that hit the whole battlefield with no aimed cell.
    pub fn is_apply_without_focus(self) -> bool {
        use Spell::*;
        matches!(self, DeathRipple | DeathWave | HolyWord | HolyShout | Armageddon | ElementalStorm)
    }

    pub fn is_mass(self) -> bool {
        use Spell::*;
        matches!(self, MassCure | MassHaste | MassSlow | MassBless | MassCurse | MassDispel | MassShield)
    }

    pub fn is_apply_to_friends(self) -> bool {
        use Spell::*;
        matches!(
            self,
            Bless | MassBless | Bloodlust | Cure | MassCure | Haste | MassHaste | Shield | MassShield | Stoneskin
                | Steelskin | DragonSlayer | MirrorImage | AntiMagic
        )
    }

    pub fn is_apply_to_enemies(self) -> bool {
        use Spell::*;
        matches!(
            self,
            Slow | MassSlow | Curse | MassCurse | Blind | Paralyze | Berserker | Hypnotize | DisruptingRay
        )
    }

    /// Maximum jump length of the Dimension Door spell, in tiles (Chebyshev).
    pub const DIMENSION_DOOR_DISTANCE: i32 = 14;

    /// Movement points charged for one Dimension Door jump.
    pub const DIMENSION_DOOR_MOVE_COST: u32 = 225;

    /// Rough worth of learning this spell, used when scoring shrine visits.
    pub fn strategic_value(self, army_strength: f64, current_spell_points: u32, spell_power: u32) -> f64 {
        let cost = self.cost();
        let casts = if cost > 0 { (current_spell_points / cost).min(10) } else { 0 };

        // Diminishing returns from repeat casts, up to x5 at 10 uses.
        let casts = casts as f64;
        let amount_modifier = if casts as u32 == 1 { 1.0 } else { casts - 0.05 * casts * casts };

        if self.is_adventure() {
            return match self {
                Spell::DimensionDoor => 500.0 * amount_modifier,
                Spell::TownGate | Spell::TownPortal => 250.0 * amount_modifier,
                Spell::ViewAll => 500.0,
                _ => 0.0,
            };
        }

        if self.is_damage() {
            return amount_modifier * self.damage() as f64 * spell_power as f64;
        }

        // High-impact spells that can turn the tide of a battle.
        if self.is_resurrect() || self.is_mass() || self == Spell::Blind || self == Spell::Paralyze {
            return army_strength * 0.1 * amount_modifier;
        }

        if self.is_summon() {
            return crate::monster::MonsterId::from_summon_spell(self)
                .map(|monster| monster.monster_strength() * self.extra_value() as f64 * spell_power as f64)
                .unwrap_or(0.0);
        }

        army_strength * 0.04 * amount_modifier
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn combat_and_adventure_spells_are_disjoint() {
        assert!(Spell::Fireball.is_combat());
        assert!(!Spell::DimensionDoor.is_combat());
        assert!(Spell::DimensionDoor.is_adventure());
        assert!(!Spell::None.is_adventure());
    }

    #[test]
    fn damage_classification() {
        assert!(Spell::LightningBolt.is_damage());
        assert_eq!(Spell::LightningBolt.damage(), 25);
        assert!(!Spell::Slow.is_damage());
    }

    #[test]
    fn single_target_spells_are_not_mass() {
        for spell in [Spell::Slow, Spell::Bless, Spell::Haste, Spell::Curse] {
            assert!(spell.is_single_target());
            assert!(!spell.is_mass());
        }
        assert!(Spell::MassSlow.is_mass());
        assert!(!Spell::MassSlow.is_single_target());
    }

    #[test]
    fn damage_spells_score_by_power() {
        let weak = Spell::LightningBolt.strategic_value(1000.0, 20, 2);
        let strong = Spell::LightningBolt.strategic_value(1000.0, 20, 10);
        assert!(strong > weak);
    }
}
