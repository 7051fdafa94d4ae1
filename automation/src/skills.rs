//! Level-up choices: when a hero is offered two secondary skills, pick the
//! one its role and the map actually reward.

use map::world::World;
use ravenmoor_core::hero::{Hero, HeroRole};
use ravenmoor_core::skill::{Secondary, SkillKind, SkillLevel};

fn secondary_skill_value(world: &World, hero: &Hero, skill: &Secondary) -> f64 {
    if hero.skill_level(skill.kind) >= skill.level {
        return 0.0;
    }

    match skill.kind {
        // High wisdom drives the mage guild building priority, so it is not
        // gated on the castles already built.
        SkillKind::Wisdom => {
            if skill.level == SkillLevel::Basic {
                2500.0
            } else {
                1000.0
            }
        }
        SkillKind::Logistics => 1500.0,
        SkillKind::Leadership => {
            if hero.army.all_troops_are_undead() {
                100.0
            } else {
                1000.0
            }
        }
        SkillKind::Necromancy => {
            if hero.army.all_troops_are_undead() {
                1000.0
            } else {
                100.0
            }
        }
        SkillKind::Luck => match hero.role {
            HeroRole::Courier | HeroRole::Scout => 100.0,
            _ => 500.0,
        },
        SkillKind::Ballistics => match hero.role {
            HeroRole::Courier | HeroRole::Scout => 100.0,
            _ => {
                if hero.army.is_melee_dominant() {
                    1250.0
                } else {
                    250.0
                }
            }
        },
        SkillKind::Archery => match hero.role {
            HeroRole::Courier | HeroRole::Scout => 100.0,
            _ => {
                if hero.army.is_melee_dominant() {
                    100.0
                } else {
                    500.0
                }
            }
        },
        SkillKind::Estates => match hero.role {
            HeroRole::Champion | HeroRole::Fighter => 0.0,
            _ => 1000.0,
        },
        SkillKind::Pathfinding => {
            let roughness = world.land_roughness();
            if roughness > 1.25 {
                1000.0
            } else if roughness > 1.1 {
                250.0
            } else {
                100.0
            }
        }
        SkillKind::Navigation => {
            let water = world.water_percentage();
            if water > 60 {
                1000.0
            } else if water > 25 {
                100.0
            } else {
                0.0
            }
        }
        SkillKind::Scouting => match hero.role {
            HeroRole::Champion | HeroRole::Fighter => 0.0,
            HeroRole::Scout => 1250.0,
            _ => 100.0,
        },
        SkillKind::Mysticism => {
            if hero.have_spell_book() {
                500.0
            } else {
                100.0
            }
        }
        SkillKind::EagleEye => {
            if hero.have_spell_book() {
                250.0
            } else {
                0.0
            }
        }
        // Discourage picking it up, but level an existing investment to save
        // the gold it keeps costing.
        SkillKind::Diplomacy => {
            if skill.level == SkillLevel::Basic {
                100.0
            } else {
                1250.0
            }
        }
    }
}

/// Picks between the two skills offered at a level-up. A skill below the
/// usefulness threshold is avoided even on a tie.
pub fn pick_secondary_skill(world: &World, hero: &Hero, left: Secondary, right: Secondary) -> Secondary {
    // Heroes can get one or no choice depending on the level.
    if !right.is_valid() {
        return left;
    }

    let left_value = secondary_skill_value(world, hero, &left);
    let right_value = secondary_skill_value(world, hero, &right);

    if (left_value - right_value).abs() < 0.001 {
        if left_value < 300.0 {
            // Undesirable either way; learn as little of it as possible.
            return if left.level == SkillLevel::Basic { right } else { left };
        }
        return if left.level == SkillLevel::Basic { left } else { right };
    }

    if left_value > right_value {
        left
    } else {
        right
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use map::tile::{Ground, Tile};
    use ravenmoor_core::color::PlayerColor;
    use ravenmoor_core::hero::HeroId;
    use ravenmoor_core::monster::MonsterId;

    fn world() -> World {
        let tiles = (0..16).map(|index| Tile::new(index, Ground::Grass)).collect();
        World::new(4, 4, tiles, 2)
    }

    fn hero() -> Hero {
        let mut hero = Hero::new(HeroId(0), "Mira", PlayerColor::Blue, 0);
        hero.army.join_troop(MonsterId::Swordsman, 10);
        hero
    }

    #[test]
    fn wisdom_beats_eagle_eye() {
        let world = world();
        let hero = hero();
        let wisdom = Secondary::new(SkillKind::Wisdom, SkillLevel::Basic);
        let eagle_eye = Secondary::new(SkillKind::EagleEye, SkillLevel::Basic);
        assert_eq!(pick_secondary_skill(&world, &hero, wisdom, eagle_eye), wisdom);
        assert_eq!(pick_secondary_skill(&world, &hero, eagle_eye, wisdom), wisdom);
    }

    #[test]
    fn single_offer_is_taken_as_is() {
        let world = world();
        let hero = hero();
        let luck = Secondary::new(SkillKind::Luck, SkillLevel::Basic);
        let invalid = Secondary::new(SkillKind::Wisdom, SkillLevel::None);
        assert_eq!(pick_secondary_skill(&world, &hero, luck, invalid), luck);
    }

    #[test]
    fn scouts_value_scouting_over_luck() {
        let world = world();
        let mut hero = hero();
        hero.role = HeroRole::Scout;
        let scouting = Secondary::new(SkillKind::Scouting, SkillLevel::Basic);
        let luck = Secondary::new(SkillKind::Luck, SkillLevel::Basic);
        assert_eq!(pick_secondary_skill(&world, &hero, luck, scouting), scouting);
    }

    #[test]
    fn undead_armies_skip_leadership() {
        let world = world();
        let mut hero = hero();
        hero.army = ravenmoor_core::troop::Army::from_troops(vec![ravenmoor_core::troop::Troop::new(
            MonsterId::Skeleton,
            20,
        )]);
        let leadership = Secondary::new(SkillKind::Leadership, SkillLevel::Basic);
        let necromancy = Secondary::new(SkillKind::Necromancy, SkillLevel::Basic);
        assert_eq!(pick_secondary_skill(&world, &hero, leadership, necromancy), necromancy);
    }
}
