use std::ops::{Add, AddAssign, Mul, Sub};

use serde::{Deserialize, Serialize};

/// The seven kingdom resources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceKind {
    Wood,
    Mercury,
    Ore,
    Sulfur,
    Crystal,
    Gems,
    Gold,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 7] = [
        ResourceKind::Wood,
        ResourceKind::Mercury,
        ResourceKind::Ore,
        ResourceKind::Sulfur,
        ResourceKind::Crystal,
        ResourceKind::Gems,
        ResourceKind::Gold,
    ];

    /// Daily output of a mine producing this resource.
    pub fn mine_daily_income(self) -> i32 {
        match self {
            ResourceKind::Gold => 1000,
            ResourceKind::Wood | ResourceKind::Ore => 2,
            _ => 1,
        }
    }
}

/// A bundle of resources: kingdom treasury, prices, loot, daily income.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Funds {
    pub wood: i32,
    pub mercury: i32,
    pub ore: i32,
    pub sulfur: i32,
    pub crystal: i32,
    pub gems: i32,
    pub gold: i32,
}

impl Funds {
    pub fn new(wood: i32, mercury: i32, ore: i32, sulfur: i32, crystal: i32, gems: i32, gold: i32) -> Self {
        Funds { wood, mercury, ore, sulfur, crystal, gems, gold }
    }

    pub fn from_resource(kind: ResourceKind, amount: i32) -> Self {
        let mut funds = Funds::default();
        funds.set(kind, amount);
        funds
    }

    pub fn gold(amount: i32) -> Self {
        Funds { gold: amount, ..Funds::default() }
    }

    pub fn get(&self, kind: ResourceKind) -> i32 {
        match kind {
            ResourceKind::Wood => self.wood,
            ResourceKind::Mercury => self.mercury,
            ResourceKind::Ore => self.ore,
            ResourceKind::Sulfur => self.sulfur,
            ResourceKind::Crystal => self.crystal,
            ResourceKind::Gems => self.gems,
            ResourceKind::Gold => self.gold,
        }
    }

    pub fn set(&mut self, kind: ResourceKind, amount: i32) {
        match kind {
            ResourceKind::Wood => self.wood = amount,
            ResourceKind::Mercury => self.mercury = amount,
            ResourceKind::Ore => self.ore = amount,
            ResourceKind::Sulfur => self.sulfur = amount,
            ResourceKind::Crystal => self.crystal = amount,
            ResourceKind::Gems => self.gems = amount,
            ResourceKind::Gold => self.gold = amount,
        }
    }

    /// Resources with a non-zero amount.
    pub fn valid_items(&self) -> Vec<(ResourceKind, i32)> {
        ResourceKind::ALL
            .iter()
            .filter_map(|&kind| {
                let amount = self.get(kind);
                (amount != 0).then_some((kind, amount))
            })
            .collect()
    }

    /// The first resource with a positive amount, if any. Used for single-resource
    /// piles and mine incomes where exactly one entry is expected.
    pub fn first_valid_resource(&self) -> Option<(ResourceKind, i32)> {
        ResourceKind::ALL.iter().find_map(|&kind| {
            let amount = self.get(kind);
            (amount > 0).then_some((kind, amount))
        })
    }

    /// Whether this treasury can pay the given cost.
    pub fn allows_payment(&self, cost: &Funds) -> bool {
        ResourceKind::ALL.iter().all(|&kind| self.get(kind) >= cost.get(kind))
    }

    /// How many times the given cost can be paid out of this treasury.
    /// Zero-cost entries do not constrain the result.
    pub fn lowest_quotient(&self, cost: &Funds) -> u32 {
        let mut result = u32::MAX;
        for kind in ResourceKind::ALL {
            let unit = cost.get(kind);
            if unit <= 0 {
                continue;
            }
            let have = self.get(kind).max(0) as u32;
            result = result.min(have / unit as u32);
        }
        if result == u32::MAX {
            0
        } else {
            result
        }
    }
}

impl Add for Funds {
    type Output = Funds;

    fn add(self, other: Funds) -> Funds {
        Funds {
            wood: self.wood + other.wood,
            mercury: self.mercury + other.mercury,
            ore: self.ore + other.ore,
            sulfur: self.sulfur + other.sulfur,
            crystal: self.crystal + other.crystal,
            gems: self.gems + other.gems,
            gold: self.gold + other.gold,
        }
    }
}

impl AddAssign for Funds {
    fn add_assign(&mut self, other: Funds) {
        *self = *self + other;
    }
}

impl Sub for Funds {
    type Output = Funds;

    fn sub(self, other: Funds) -> Funds {
        Funds {
            wood: self.wood - other.wood,
            mercury: self.mercury - other.mercury,
            ore: self.ore - other.ore,
            sulfur: self.sulfur - other.sulfur,
            crystal: self.crystal - other.crystal,
            gems: self.gems - other.gems,
            gold: self.gold - other.gold,
        }
    }
}

impl Mul<i32> for Funds {
    type Output = Funds;

    fn mul(self, factor: i32) -> Funds {
        Funds {
            wood: self.wood * factor,
            mercury: self.mercury * factor,
            ore: self.ore * factor,
            sulfur: self.sulfur * factor,
            crystal: self.crystal * factor,
            gems: self.gems * factor,
            gold: self.gold * factor,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lowest_quotient_ignores_free_resources() {
        let treasury = Funds::new(10, 0, 10, 0, 0, 0, 5000);
        let cost = Funds::gold(1000);
        assert_eq!(treasury.lowest_quotient(&cost), 5);
    }

    #[test]
    fn lowest_quotient_takes_scarcest_resource() {
        let treasury = Funds::new(4, 0, 10, 0, 0, 0, 5000);
        let cost = Funds { wood: 2, gold: 500, ..Funds::default() };
        assert_eq!(treasury.lowest_quotient(&cost), 2);
    }

    #[test]
    fn payment_check() {
        let treasury = Funds::new(5, 0, 5, 0, 0, 0, 2000);
        assert!(treasury.allows_payment(&Funds::gold(2000)));
        assert!(!treasury.allows_payment(&Funds::gold(2001)));
        assert!(!treasury.allows_payment(&Funds::from_resource(ResourceKind::Gems, 1)));
    }
}
