use std::collections::BTreeSet;

use ravenmoor_core::hero::HeroId;

/// How strategic AI focuses a hero on a tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriorityTaskType {
    /// Siege or chase the enemy castle or hero on the tile.
    Attack,
    /// Garrison and defend the friendly castle on the tile.
    Defend,
    /// Bring more troops to the friendly castle or hero on the tile.
    Reinforce,
}

/// An intent annotation on a tile. The secondary set links an attack task to
/// the castles it threatens (and a defend task to its attackers).
#[derive(Debug, Clone)]
pub struct PriorityTask {
    pub task_type: PriorityTaskType,
    pub secondary_task_tiles: BTreeSet<i32>,
}

impl PriorityTask {
    pub fn new(task_type: PriorityTaskType) -> Self {
        PriorityTask { task_type, secondary_task_tiles: BTreeSet::new() }
    }

    pub fn with_secondary(task_type: PriorityTaskType, secondary: i32) -> Self {
        let mut task = PriorityTask::new(task_type);
        task.secondary_task_tiles.insert(secondary);
        task
    }
}

/// A visible enemy army: a hero on the move or a castle able to hire one.
/// Cached once per kingdom turn.
#[derive(Debug, Clone, Copy)]
pub struct EnemyArmy {
    pub index: i32,
    pub hero: Option<HeroId>,
    pub strength: f64,
    pub move_points: u32,
}

/// Per-region aggregates feeding the safety heuristics.
#[derive(Debug, Clone, Default)]
pub struct RegionStats {
    pub evaluated: bool,
    pub highest_threat: f64,
    pub friendly_heroes: i32,
    pub friendly_castles: i32,
    pub enemy_castles: i32,
    pub safety_factor: i32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secondary_tiles_deduplicate() {
        let mut task = PriorityTask::with_secondary(PriorityTaskType::Attack, 10);
        task.secondary_task_tiles.insert(10);
        task.secondary_task_tiles.insert(12);
        assert_eq!(task.secondary_task_tiles.len(), 2);
    }
}
