use ravenmoor_core::color::PlayerColor;
use ravenmoor_core::spell::Spell;

/// A command record emitted by the battle planner. The rules engine executes
/// them; the planner never mutates battle state itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Move (when needed) and strike. `move_to == -1` attacks from the current
    /// position; `target_cell == -1` lets the engine pick the contact cell
    /// (used for shooting).
    Attack {
        attacker: u32,
        target: u32,
        move_to: i32,
        target_cell: i32,
        direction: i32,
    },
    Move {
        unit: u32,
        cell: i32,
    },
    Cast {
        spell: Spell,
        cell: i32,
    },
    Retreat,
    Surrender,
    /// Turn auto-battle off for the given side.
    AutoSwitch(PlayerColor),
    Skip(u32),
}

pub type Actions = Vec<Command>;
