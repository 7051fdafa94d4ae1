use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};

/// Artifacts a hero can carry. `MagicBook` is special: it enables spellcasting
/// and always occupies slot 0 of the bag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Artifact {
    Unknown,
    MagicBook,
    ThunderMaceOfDominion,
    GiantFlailOfDominion,
    SwordOfDominion,
    PowerAxeOfDominion,
    DragonSwordOfDominion,
    DivineBreastplate,
    ArmoredGauntlets,
    DefenderHelm,
    MinorScrollOfKnowledge,
    MajorScrollOfKnowledge,
    CasterBracelet,
    MageRing,
    WitchesBroach,
    MedalOfValor,
    MedalOfCourage,
    FizbinOfMisfortune,
    FourLeafClover,
    LuckyHorseshoe,
    TrueCompassOfMobility,
    NomadBootsOfMobility,
    SailorsAstrolabe,
    EndlessPurseOfGold,
    EndlessBagOfGold,
    EndlessSackOfGold,
    EndlessCordOfWood,
    EndlessCartOfOre,
    EndlessPouchOfSulfur,
    EndlessVialOfMercury,
    EndlessPouchOfGems,
    EndlessPouchOfCrystal,
    GoldenBow,
    BallistaOfQuickness,
    TaxLien,
    EvilEye,
    EnchantedHourglass,
    AnkhOfResurrection,
    BookOfElements,
    ElementalRing,
    SkullcapOfSorcery,
    EvercoldIcicle,
    EverhotLavaRock,
    LightningRod,
    SnakeRing,
    HolyPendant,
    PendantOfFreeWill,
    PendantOfLife,
    SeeingEyePendant,
    KineticPendant,
    PendantOfDeath,
    WandOfNegation,
    SpikedShield,
    SpikedHelm,
    SphereOfNegation,
    UltimateSword,
    UltimateCloak,
    UltimateCrown,
    UltimateWand,
}

/// Classification of an artifact bonus, fixing its aggregation strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArtifactBonusType {
    // Cumulative: each copy of each artifact adds to the total.
    AttackSkill,
    DefenseSkill,
    SpellPowerSkill,
    KnowledgeSkill,
    GoldIncome,
    WoodIncome,
    OreIncome,
    MercuryIncome,
    SulfurIncome,
    CrystalIncome,
    GemsIncome,
    // Cumulative per artifact type: duplicates of the same artifact count once.
    Morale,
    Luck,
    LandMobility,
    SeaMobility,
    SpellPointsDailyGeneration,
    EveryCombatSpellDuration,
    // Multiplied: percentages from different artifact types multiply together.
    SurrenderCostReductionPercent,
    ColdSpellExtraEffectivenessPercent,
    FireSpellExtraEffectivenessPercent,
    LightningSpellExtraEffectivenessPercent,
    ResurrectSpellExtraEffectivenessPercent,
    SummoningSpellExtraEffectivenessPercent,
    HypnotizeSpellExtraEffectivenessPercent,
    // Unique: only one artifact with this bonus takes effect.
    EndlessAmmunition,
    NoShootingPenalty,
    MaximumMorale,
    MaximumLuck,
    DisableAllSpellCombatCasting,
    CurseSpellImmunity,
    BlindSpellImmunity,
}

/// Curses carried by the handful of cursed artifacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArtifactCurseType {
    GoldPenalty,
    Morale,
    Luck,
    NoJoiningArmies,
}

/// A single bonus entry of an artifact: type plus magnitude (zero for the
/// unique on/off bonuses).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactBonus {
    pub bonus: ArtifactBonusType,
    pub value: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactCurse {
    pub curse: ArtifactCurseType,
    pub value: i32,
}

/// Full static description of one artifact.
pub struct ArtifactData {
    pub id: Artifact,
    pub value: u32,
    pub bonuses: Vec<ArtifactBonus>,
    pub curses: Vec<ArtifactCurse>,
}

/// Each bonus type aggregates in exactly one way; classify once and dispatch
/// on the classification everywhere.
pub fn is_bonus_cumulative(bonus: ArtifactBonusType) -> bool {
    use ArtifactBonusType::*;
    matches!(
        bonus,
        AttackSkill | DefenseSkill | SpellPowerSkill | KnowledgeSkill | GoldIncome | WoodIncome | OreIncome
            | MercuryIncome | SulfurIncome | CrystalIncome | GemsIncome
    )
}

pub fn is_bonus_cumulative_per_type(bonus: ArtifactBonusType) -> bool {
    use ArtifactBonusType::*;
    matches!(
        bonus,
        Morale | Luck | LandMobility | SeaMobility | SpellPointsDailyGeneration | EveryCombatSpellDuration
    )
}

pub fn is_bonus_multiplied(bonus: ArtifactBonusType) -> bool {
    use ArtifactBonusType::*;
    matches!(
        bonus,
        SurrenderCostReductionPercent
            | ColdSpellExtraEffectivenessPercent
            | FireSpellExtraEffectivenessPercent
            | LightningSpellExtraEffectivenessPercent
            | ResurrectSpellExtraEffectivenessPercent
            | SummoningSpellExtraEffectivenessPercent
            | HypnotizeSpellExtraEffectivenessPercent
    )
}

pub fn is_bonus_unique(bonus: ArtifactBonusType) -> bool {
    !is_bonus_cumulative(bonus) && !is_bonus_cumulative_per_type(bonus) && !is_bonus_multiplied(bonus)
}

fn bonus(kind: ArtifactBonusType, value: i32) -> ArtifactBonus {
    ArtifactBonus { bonus: kind, value }
}

fn curse(kind: ArtifactCurseType, value: i32) -> ArtifactCurse {
    ArtifactCurse { curse: kind, value }
}

lazy_static! {
    static ref ARTIFACT_DATA: Vec<ArtifactData> = {
        use Artifact::*;
        use ArtifactBonusType::*;

        let plain = |id, value, bonuses: Vec<ArtifactBonus>| ArtifactData { id, value, bonuses, curses: Vec::new() };

        vec![
            plain(Unknown, 0, vec![]),
            plain(MagicBook, 5, vec![]),
            plain(ThunderMaceOfDominion, 1, vec![bonus(AttackSkill, 1)]),
            plain(GiantFlailOfDominion, 1, vec![bonus(AttackSkill, 1)]),
            plain(SwordOfDominion, 2, vec![bonus(AttackSkill, 2)]),
            plain(PowerAxeOfDominion, 2, vec![bonus(AttackSkill, 2)]),
            plain(DragonSwordOfDominion, 3, vec![bonus(AttackSkill, 3)]),
            plain(DivineBreastplate, 3, vec![bonus(DefenseSkill, 3)]),
            plain(ArmoredGauntlets, 1, vec![bonus(DefenseSkill, 1)]),
            plain(DefenderHelm, 1, vec![bonus(DefenseSkill, 1)]),
            plain(MinorScrollOfKnowledge, 1, vec![bonus(KnowledgeSkill, 2)]),
            plain(MajorScrollOfKnowledge, 2, vec![bonus(KnowledgeSkill, 3)]),
            plain(CasterBracelet, 2, vec![bonus(SpellPowerSkill, 2)]),
            plain(MageRing, 2, vec![bonus(SpellPowerSkill, 2)]),
            plain(WitchesBroach, 3, vec![bonus(SpellPowerSkill, 3)]),
            plain(MedalOfValor, 1, vec![bonus(Morale, 1)]),
            plain(MedalOfCourage, 1, vec![bonus(Morale, 1)]),
            ArtifactData {
                id: FizbinOfMisfortune,
                value: 0,
                bonuses: vec![],
                curses: vec![curse(ArtifactCurseType::Morale, 2)],
            },
            plain(FourLeafClover, 1, vec![bonus(Luck, 1)]),
            plain(LuckyHorseshoe, 1, vec![bonus(Luck, 1)]),
            plain(TrueCompassOfMobility, 2, vec![bonus(LandMobility, 500), bonus(SeaMobility, 500)]),
            plain(NomadBootsOfMobility, 2, vec![bonus(LandMobility, 600)]),
            plain(SailorsAstrolabe, 2, vec![bonus(SeaMobility, 1000)]),
            plain(EndlessPurseOfGold, 2, vec![bonus(GoldIncome, 500)]),
            plain(EndlessBagOfGold, 3, vec![bonus(GoldIncome, 750)]),
            plain(EndlessSackOfGold, 4, vec![bonus(GoldIncome, 1000)]),
            plain(EndlessCordOfWood, 1, vec![bonus(WoodIncome, 1)]),
            plain(EndlessCartOfOre, 1, vec![bonus(OreIncome, 1)]),
            plain(EndlessPouchOfSulfur, 1, vec![bonus(SulfurIncome, 1)]),
            plain(EndlessVialOfMercury, 1, vec![bonus(MercuryIncome, 1)]),
            plain(EndlessPouchOfGems, 1, vec![bonus(GemsIncome, 1)]),
            plain(EndlessPouchOfCrystal, 1, vec![bonus(CrystalIncome, 1)]),
            plain(GoldenBow, 3, vec![bonus(NoShootingPenalty, 0)]),
            plain(BallistaOfQuickness, 2, vec![bonus(EndlessAmmunition, 0)]),
            ArtifactData {
                id: TaxLien,
                value: 0,
                bonuses: vec![],
                curses: vec![curse(ArtifactCurseType::GoldPenalty, 250)],
            },
            ArtifactData {
                id: EvilEye,
                value: 1,
                bonuses: vec![bonus(CurseSpellImmunity, 0)],
                curses: vec![curse(ArtifactCurseType::Luck, 1)],
            },
            plain(EnchantedHourglass, 2, vec![bonus(EveryCombatSpellDuration, 2)]),
            plain(AnkhOfResurrection, 3, vec![bonus(ResurrectSpellExtraEffectivenessPercent, 50)]),
            plain(BookOfElements, 2, vec![bonus(SummoningSpellExtraEffectivenessPercent, 50)]),
            plain(ElementalRing, 2, vec![bonus(SummoningSpellExtraEffectivenessPercent, 25)]),
            plain(SkullcapOfSorcery, 2, vec![bonus(EveryCombatSpellDuration, 2)]),
            plain(EvercoldIcicle, 2, vec![bonus(ColdSpellExtraEffectivenessPercent, 50)]),
            plain(EverhotLavaRock, 2, vec![bonus(FireSpellExtraEffectivenessPercent, 50)]),
            plain(LightningRod, 2, vec![bonus(LightningSpellExtraEffectivenessPercent, 50)]),
            plain(SnakeRing, 2, vec![bonus(BlindSpellImmunity, 0)]),
            plain(HolyPendant, 2, vec![bonus(CurseSpellImmunity, 0)]),
            plain(PendantOfFreeWill, 2, vec![bonus(BlindSpellImmunity, 0)]),
            plain(PendantOfLife, 2, vec![]),
            plain(SeeingEyePendant, 1, vec![]),
            plain(KineticPendant, 2, vec![]),
            plain(PendantOfDeath, 2, vec![]),
            plain(WandOfNegation, 2, vec![]),
            plain(SpikedShield, 2, vec![bonus(AttackSkill, 1), bonus(DefenseSkill, 1)]),
            plain(SpikedHelm, 2, vec![bonus(AttackSkill, 1), bonus(DefenseSkill, 1)]),
            plain(SphereOfNegation, 3, vec![bonus(DisableAllSpellCombatCasting, 0)]),
            plain(UltimateSword, 5, vec![bonus(AttackSkill, 12)]),
            plain(UltimateCloak, 5, vec![bonus(DefenseSkill, 12)]),
            plain(UltimateCrown, 5, vec![bonus(AttackSkill, 4), bonus(DefenseSkill, 4), bonus(SpellPowerSkill, 4), bonus(KnowledgeSkill, 4)]),
            plain(UltimateWand, 5, vec![bonus(SpellPowerSkill, 12)]),
        ]
    };
}

pub fn artifact_data(artifact: Artifact) -> &'static ArtifactData {
    ARTIFACT_DATA
        .iter()
        .find(|data| data.id == artifact)
        .unwrap_or_else(|| &ARTIFACT_DATA[0])
}

impl Artifact {
    pub fn is_valid(self) -> bool {
        self != Artifact::Unknown
    }

    /// Relative worth of the artifact on a 0..=5 scale; feeds map object scoring.
    pub fn artifact_value(self) -> u32 {
        artifact_data(self).value
    }

    pub fn is_ultimate(self) -> bool {
        use Artifact::*;
        matches!(self, UltimateSword | UltimateCloak | UltimateCrown | UltimateWand)
    }

    pub fn contains_curses(self) -> bool {
        !artifact_data(self).curses.is_empty()
    }
}

/// The hero's artifact bag: up to 14 artifacts, Magic Book pinned to slot 0.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BagArtifacts {
    items: Vec<Artifact>,
}

impl BagArtifacts {
    pub const CAPACITY: usize = 14;

    pub fn new() -> Self {
        BagArtifacts { items: Vec::new() }
    }

    pub fn items(&self) -> &[Artifact] {
        &self.items
    }

    pub fn is_full(&self) -> bool {
        self.items.len() >= Self::CAPACITY
    }

    pub fn contains(&self, artifact: Artifact) -> bool {
        self.items.contains(&artifact)
    }

    /// Adds an artifact. The Magic Book goes to slot 0 and never duplicates.
    pub fn push(&mut self, artifact: Artifact) -> bool {
        if artifact == Artifact::MagicBook {
            if self.contains(Artifact::MagicBook) {
                return false;
            }
            self.items.insert(0, artifact);
            return true;
        }

        if self.is_full() {
            return false;
        }
        self.items.push(artifact);
        true
    }

    /// Sum of a cumulative or cumulative-per-type bonus across the bag.
    pub fn total_effect_value(&self, kind: ArtifactBonusType) -> i32 {
        debug_assert!(!is_bonus_multiplied(kind) && !is_bonus_unique(kind));

        let mut total = 0;
        let mut seen_types: Vec<Artifact> = Vec::new();

        for &artifact in &self.items {
            if is_bonus_cumulative_per_type(kind) {
                if seen_types.contains(&artifact) {
                    continue;
                }
                seen_types.push(artifact);
            }

            for entry in &artifact_data(artifact).bonuses {
                if entry.bonus == kind {
                    total += entry.value;
                }
            }
        }

        total
    }

    /// All percentages of a multiplied bonus, one entry per artifact type.
    /// Callers fold them as successive `* (100 + p) / 100` factors.
    pub fn total_multiplied_percent(&self, kind: ArtifactBonusType) -> Vec<i32> {
        debug_assert!(is_bonus_multiplied(kind));

        let mut result = Vec::new();
        let mut seen_types: Vec<Artifact> = Vec::new();

        for &artifact in &self.items {
            if seen_types.contains(&artifact) {
                continue;
            }
            seen_types.push(artifact);

            for entry in &artifact_data(artifact).bonuses {
                if entry.bonus == kind {
                    result.push(entry.value);
                }
            }
        }

        result
    }

    pub fn is_bonus_present(&self, kind: ArtifactBonusType) -> bool {
        self.items
            .iter()
            .any(|&artifact| artifact_data(artifact).bonuses.iter().any(|entry| entry.bonus == kind))
    }

    pub fn first_artifact_with_bonus(&self, kind: ArtifactBonusType) -> Artifact {
        self.items
            .iter()
            .copied()
            .find(|&artifact| artifact_data(artifact).bonuses.iter().any(|entry| entry.bonus == kind))
            .unwrap_or(Artifact::Unknown)
    }

    /// Whether the bag holds anything with a real bonus; used by the
    /// retreat/surrender gate to protect valuable bags.
    pub fn has_valuable_artifacts(&self) -> bool {
        self.items.iter().any(|&artifact| !artifact_data(artifact).bonuses.is_empty())
    }

    pub fn count_cursed(&self) -> usize {
        self.items.iter().filter(|artifact| artifact.contains_curses()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn magic_book_is_pinned_to_slot_zero() {
        let mut bag = BagArtifacts::new();
        bag.push(Artifact::SwordOfDominion);
        bag.push(Artifact::MagicBook);

        assert_eq!(bag.items()[0], Artifact::MagicBook);
        // The second copy is rejected.
        assert!(!bag.push(Artifact::MagicBook));
        assert_eq!(bag.items().iter().filter(|&&a| a == Artifact::MagicBook).count(), 1);
    }

    #[test]
    fn bag_capacity_is_enforced() {
        let mut bag = BagArtifacts::new();
        for _ in 0..BagArtifacts::CAPACITY {
            assert!(bag.push(Artifact::LuckyHorseshoe));
        }
        assert!(bag.is_full());
        assert!(!bag.push(Artifact::SwordOfDominion));
    }

    #[test]
    fn cumulative_bonus_counts_every_copy() {
        let mut bag = BagArtifacts::new();
        bag.push(Artifact::SwordOfDominion);
        bag.push(Artifact::SwordOfDominion);
        assert_eq!(bag.total_effect_value(ArtifactBonusType::AttackSkill), 4);
    }

    #[test]
    fn per_type_bonus_counts_each_type_once() {
        let mut bag = BagArtifacts::new();
        bag.push(Artifact::MedalOfValor);
        bag.push(Artifact::MedalOfValor);
        bag.push(Artifact::MedalOfCourage);
        assert_eq!(bag.total_effect_value(ArtifactBonusType::Morale), 2);
    }

    #[test]
    fn multiplied_bonus_lists_one_percent_per_type() {
        let mut bag = BagArtifacts::new();
        bag.push(Artifact::ElementalRing);
        bag.push(Artifact::ElementalRing);
        bag.push(Artifact::BookOfElements);
        let percents = bag.total_multiplied_percent(ArtifactBonusType::SummoningSpellExtraEffectivenessPercent);
        assert_eq!(percents.len(), 2);
    }

    #[test]
    fn every_bonus_type_has_exactly_one_classification() {
        use ArtifactBonusType::*;
        for kind in [
            AttackSkill, Morale, SurrenderCostReductionPercent, EndlessAmmunition, NoShootingPenalty, GoldIncome,
            LandMobility, ResurrectSpellExtraEffectivenessPercent, MaximumMorale,
        ] {
            let classes = [
                is_bonus_cumulative(kind),
                is_bonus_cumulative_per_type(kind),
                is_bonus_multiplied(kind),
                is_bonus_unique(kind),
            ];
            assert_eq!(classes.iter().filter(|&&c| c).count(), 1, "{kind:?}");
        }
    }
}
