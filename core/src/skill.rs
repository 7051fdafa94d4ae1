use serde::{Deserialize, Serialize};

/// Secondary skill proficiency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum SkillLevel {
    #[default]
    None,
    Basic,
    Advanced,
    Expert,
}

/// Secondary skills a hero can learn. At most one instance of each kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SkillKind {
    Pathfinding,
    Archery,
    Logistics,
    Scouting,
    Diplomacy,
    Navigation,
    Leadership,
    Wisdom,
    Mysticism,
    Luck,
    Ballistics,
    EagleEye,
    Necromancy,
    Estates,
}

/// A learned secondary skill: kind plus proficiency level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Secondary {
    pub kind: SkillKind,
    pub level: SkillLevel,
}

impl Secondary {
    pub fn new(kind: SkillKind, level: SkillLevel) -> Self {
        Secondary { kind, level }
    }

    pub fn is_valid(&self) -> bool {
        self.level != SkillLevel::None
    }
}

/// Fraction of the extra movement penalty on rough terrain removed by the
/// Pathfinding skill. The base penalty (the part every hero pays) is untouched.
pub fn pathfinding_penalty_reduction(level: SkillLevel) -> f64 {
    match level {
        SkillLevel::None => 0.0,
        SkillLevel::Basic => 0.25,
        SkillLevel::Advanced => 0.5,
        SkillLevel::Expert => 1.0,
    }
}

/// Extra tiles of view radius granted by the Scouting skill.
pub fn scouting_bonus(level: SkillLevel) -> u32 {
    match level {
        SkillLevel::None => 0,
        SkillLevel::Basic => 1,
        SkillLevel::Advanced => 2,
        SkillLevel::Expert => 3,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expert_pathfinding_removes_all_extra_penalty() {
        assert_eq!(pathfinding_penalty_reduction(SkillLevel::Expert), 1.0);
        assert_eq!(pathfinding_penalty_reduction(SkillLevel::None), 0.0);
    }
}
