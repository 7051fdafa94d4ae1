//! Spell effect calculators: raw spell data scaled by the caster's power and
//! amplified by the relevant artifacts.

use crate::artifact::{ArtifactBonusType, BagArtifacts};
use crate::spell::Spell;

fn apply_multiplied_percents(mut value: u32, percents: &[i32]) -> u32 {
    for &percent in percents {
        value = (value as i64 * (100 + percent) as i64 / 100) as u32;
    }
    value
}

/// Damage dealt by a damage spell cast with the given spell power.
pub fn spell_damage(spell: Spell, spell_power: u32, bag: Option<&BagArtifacts>) -> u32 {
    let damage = spell.damage() * spell_power;

    let Some(bag) = bag else {
        return damage;
    };

    let bonus = match spell {
        Spell::ColdRay | Spell::ColdRing => ArtifactBonusType::ColdSpellExtraEffectivenessPercent,
        Spell::Fireball | Spell::Fireblast => ArtifactBonusType::FireSpellExtraEffectivenessPercent,
        Spell::LightningBolt | Spell::ChainLightning => ArtifactBonusType::LightningSpellExtraEffectivenessPercent,
        _ => return damage,
    };

    apply_multiplied_percents(damage, &bag.total_multiplied_percent(bonus))
}

/// Hit points restored by a resurrection spell.
pub fn resurrect_points(spell: Spell, spell_power: u32, bag: Option<&BagArtifacts>) -> u32 {
    let points = spell.resurrect() * spell_power;

    match bag {
        Some(bag) => apply_multiplied_percents(
            points,
            &bag.total_multiplied_percent(ArtifactBonusType::ResurrectSpellExtraEffectivenessPercent),
        ),
        None => points,
    }
}

/// Number of creatures brought in by a summoning spell.
pub fn summon_monster_count(spell: Spell, spell_power: u32, bag: Option<&BagArtifacts>) -> u32 {
    let count = spell.extra_value() * spell_power;

    match bag {
        Some(bag) => apply_multiplied_percents(
            count,
            &bag.total_multiplied_percent(ArtifactBonusType::SummoningSpellExtraEffectivenessPercent),
        ),
        None => count,
    }
}

/// Maximum total hit points of a stack controllable by Hypnotize.
pub fn hypnotize_hp_limit(spell_power: u32, bag: Option<&BagArtifacts>) -> u32 {
    let limit = Spell::Hypnotize.extra_value() * spell_power;

    match bag {
        Some(bag) => apply_multiplied_percents(
            limit,
            &bag.total_multiplied_percent(ArtifactBonusType::HypnotizeSpellExtraEffectivenessPercent),
        ),
        None => limit,
    }
}

/// Effective spell power for duration purposes (artifact-extended).
pub fn effect_duration(spell_power: u32, bag: Option<&BagArtifacts>) -> u32 {
    let extra = bag
        .map(|bag| bag.total_effect_value(ArtifactBonusType::EveryCombatSpellDuration))
        .unwrap_or(0);

    (spell_power as i64 + extra as i64).max(0) as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::Artifact;

    #[test]
    fn damage_scales_with_power() {
        assert_eq!(spell_damage(Spell::LightningBolt, 4, None), 100);
        assert_eq!(spell_damage(Spell::Slow, 4, None), 0);
    }

    #[test]
    fn artifacts_amplify_matching_schools_only() {
        let mut bag = BagArtifacts::new();
        bag.push(Artifact::LightningRod);

        assert_eq!(spell_damage(Spell::LightningBolt, 2, Some(&bag)), 75);
        // Fire school untouched by the lightning artifact.
        assert_eq!(spell_damage(Spell::Fireball, 2, Some(&bag)), 20);
    }

    #[test]
    fn hypnotize_limit_follows_extra_value() {
        assert_eq!(hypnotize_hp_limit(10, None), 250);
    }

    #[test]
    fn duration_extended_by_hourglass() {
        let mut bag = BagArtifacts::new();
        bag.push(Artifact::EnchantedHourglass);
        assert_eq!(effect_duration(3, Some(&bag)), 5);
    }
}
