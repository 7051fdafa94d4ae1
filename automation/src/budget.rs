use ravenmoor_core::resource::{Funds, ResourceKind};

/// Per-resource budget note: how much the kingdom is short of, whether the
/// shortage blocks a priority purchase and whether it is a recurring cost.
#[derive(Debug, Clone, Copy)]
pub struct BudgetEntry {
    pub resource: ResourceKind,
    pub missing: i32,
    pub priority: bool,
    pub recurring_cost: bool,
}

impl BudgetEntry {
    pub fn new(resource: ResourceKind) -> Self {
        BudgetEntry { resource, missing: 0, priority: false, recurring_cost: false }
    }

    pub fn reset(&mut self) {
        self.missing = 0;
        self.priority = false;
        self.recurring_cost = false;
    }
}

pub fn new_budget() -> [BudgetEntry; 7] {
    [
        BudgetEntry::new(ResourceKind::Wood),
        BudgetEntry::new(ResourceKind::Mercury),
        BudgetEntry::new(ResourceKind::Ore),
        BudgetEntry::new(ResourceKind::Sulfur),
        BudgetEntry::new(ResourceKind::Crystal),
        BudgetEntry::new(ResourceKind::Gems),
        BudgetEntry::new(ResourceKind::Gold),
    ]
}

/// Relative worth of one unit of a resource against one gold piece.
///
/// For mines the ratio of daily mine outputs sets the baseline, tuned so a
/// gold mine's day and a gem mine's day carry comparable priority; one-shot
/// piles are normalised by the usual pile sizes found on maps.
pub fn base_resource_priority(resource: ResourceKind, is_mine: bool) -> f64 {
    if is_mine {
        let gold_income = ResourceKind::Gold.mine_daily_income() as f64;
        let income = resource.mine_daily_income() as f64;
        debug_assert!(income > 0.0);
        return gold_income / income * 2.0;
    }

    match resource {
        // Gold piles are usually 500-1500.
        ResourceKind::Gold => 1.0,
        // Wood and ore piles are usually 5-10.
        ResourceKind::Wood | ResourceKind::Ore => 125.0,
        // The rare resources come 2-5 at a time.
        _ => 250.0,
    }
}

/// Applies the kingdom's current shortages on top of the base priority.
pub fn resource_priority_modifier(budget: &[BudgetEntry; 7], resource: ResourceKind, is_mine: bool) -> f64 {
    let mut priority = base_resource_priority(resource, is_mine);

    for entry in budget {
        if entry.resource != resource {
            continue;
        }
        if entry.recurring_cost {
            priority *= 1.5;
        }
        if entry.priority {
            priority *= 2.0;
        }
        break;
    }

    priority
}

/// Worth of a resource bundle under the current budget priorities.
pub fn funds_value_based_on_priority(budget: &[BudgetEntry; 7], funds: &Funds) -> f64 {
    funds
        .valid_items()
        .iter()
        .filter(|(_, amount)| *amount > 0)
        .map(|&(resource, amount)| amount as f64 * resource_priority_modifier(budget, resource, false))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gem_mines_rival_gold_mines() {
        let gold_day = ResourceKind::Gold.mine_daily_income() as f64 * base_resource_priority(ResourceKind::Gold, true);
        let gems_day = ResourceKind::Gems.mine_daily_income() as f64 * base_resource_priority(ResourceKind::Gems, true);
        assert_eq!(gold_day, gems_day);
    }

    #[test]
    fn shortage_doubles_the_priority() {
        let mut budget = new_budget();
        let normal = resource_priority_modifier(&budget, ResourceKind::Ore, true);

        budget[2].priority = true;
        let urgent = resource_priority_modifier(&budget, ResourceKind::Ore, true);
        assert_eq!(urgent, normal * 2.0);
    }

    #[test]
    fn priority_ore_mine_beats_gold_mine() {
        // S4: when the kingdom is short of ore, the ore mine's daily output
        // outvalues the gold mine's at equal distance.
        let mut budget = new_budget();
        budget[2].priority = true;

        let ore_value = ResourceKind::Ore.mine_daily_income() as f64
            * resource_priority_modifier(&budget, ResourceKind::Ore, true);
        let gold_value = ResourceKind::Gold.mine_daily_income() as f64
            * resource_priority_modifier(&budget, ResourceKind::Gold, true);
        assert!(ore_value > gold_value);
    }

    #[test]
    fn funds_value_weighs_rare_resources() {
        let budget = new_budget();
        let gold = funds_value_based_on_priority(&budget, &Funds::gold(1000));
        let gems = funds_value_based_on_priority(&budget, &Funds::from_resource(ResourceKind::Gems, 4));
        assert_eq!(gold, 1000.0);
        assert_eq!(gems, 1000.0);
    }
}
