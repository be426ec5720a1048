//! Post-battle reconciliation
//!
//! Matches what the engine reported after a battle against the roster that
//! went in, lets the operator settle the discrepancies, then writes the
//! result back into the campaign.

pub mod reconcile;
pub mod records;
pub mod roster;
pub mod salvage;
pub mod tracker;

pub use reconcile::{
    AcceptedSalvage, CommitSummary, PilotFate, PilotResolution, ReconciliationEngine,
    ReconciliationPlan, UnitFate, UnitResolution,
};
pub use records::{KillRecord, OutcomeReport, PilotOutcome, SalvageCandidate, SalvageClaim};
pub use roster::{PreBattleRoster, RosterEntry, RosterPilot};
pub use salvage::{SalvageBooking, SalvageLedger};
pub use tracker::ScenarioOutcomeTracker;
