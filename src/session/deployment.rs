//! Deployment round scheduling
//!
//! Slow units are allowed onto the board earlier than fast ones so that a
//! force arrives roughly together; scouts are held back so they can maneuver
//! around the main body.

use crate::campaign::ForceRole;

/// Earliest round a scout may deploy is this minus its mobility
pub const SCOUT_HOLD_ROUNDS: i32 = 6;

/// Round a unit enters the battle
///
/// `max(explicit, base_delay - mobility)`, additionally floored at
/// `SCOUT_HOLD_ROUNDS - mobility` for scouts. Negative results clamp to 0.
pub fn compute_deploy_round(explicit: i32, base_delay: i32, mobility: i32, role: ForceRole) -> u32 {
    let mut round = explicit.max(base_delay.saturating_sub(mobility));
    if role == ForceRole::Scout {
        round = round.max(SCOUT_HOLD_ROUNDS.saturating_sub(mobility));
    }
    round.max(0) as u32
}

/// Deploy round of a bot unit: an explicit non-zero round is kept, anything
/// else inherits the force's round
pub fn inherit_deploy_round(unit_round: u32, force_round: u32) -> u32 {
    if unit_round != 0 {
        unit_round
    } else {
        force_round
    }
}
