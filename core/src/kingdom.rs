use serde::{Deserialize, Serialize};

use crate::castle::CastleId;
use crate::color::PlayerColor;
use crate::hero::HeroId;
use crate::resource::Funds;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Control {
    Human,
    Ai,
}

/// One player's holdings: treasury plus ids of owned heroes and castles.
/// Cross-references stay ids; the world arena resolves them on read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Kingdom {
    pub color: PlayerColor,
    pub control: Control,
    pub funds: Funds,
    pub heroes: Vec<HeroId>,
    pub castles: Vec<CastleId>,
    /// Tavern pool to hire from.
    pub recruits: Vec<HeroId>,
}

impl Kingdom {
    pub fn new(color: PlayerColor, control: Control) -> Self {
        Kingdom {
            color,
            control,
            funds: Funds::new(20, 5, 20, 5, 5, 5, 7500),
            heroes: Vec::new(),
            castles: Vec::new(),
            recruits: Vec::new(),
        }
    }

    pub fn is_control_ai(&self) -> bool {
        self.control == Control::Ai
    }

    pub fn is_loss(&self) -> bool {
        self.heroes.is_empty() && self.castles.is_empty()
    }

    /// A kingdom without castles is living on borrowed time; the planners relax
    /// their safety margins accordingly.
    pub fn is_losing_game(&self) -> bool {
        self.castles.is_empty()
    }

    pub fn allows_payment(&self, cost: &Funds) -> bool {
        self.funds.allows_payment(cost)
    }

    pub fn pay(&mut self, cost: &Funds) -> bool {
        if !self.allows_payment(cost) {
            return false;
        }
        self.funds = self.funds - *cost;
        true
    }

    pub fn max_heroes() -> usize {
        8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payment_is_atomic() {
        let mut kingdom = Kingdom::new(PlayerColor::Blue, Control::Ai);
        kingdom.funds = Funds::gold(1000);

        assert!(!kingdom.pay(&Funds::gold(1500)));
        assert_eq!(kingdom.funds.gold, 1000);

        assert!(kingdom.pay(&Funds::gold(600)));
        assert_eq!(kingdom.funds.gold, 400);
    }

    #[test]
    fn loss_requires_losing_everything() {
        let mut kingdom = Kingdom::new(PlayerColor::Blue, Control::Ai);
        assert!(kingdom.is_loss());

        kingdom.heroes.push(HeroId(0));
        assert!(!kingdom.is_loss());
        assert!(kingdom.is_losing_game());
    }
}
