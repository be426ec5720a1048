//! Battle session launch
//!
//! Connects the local player and one actor per bot force to a game server,
//! pushes the battle's configuration in engine order, then idles until the
//! session is stopped or the engine closes it.

pub mod bot;
pub mod clock;
pub mod deployment;
pub mod events;
pub mod identity;
pub mod map;
pub mod orchestrator;
pub mod population;
pub mod registry;

// Re-exports for convenient access
pub use bot::BotActor;
pub use clock::{Clock, ImmediateClock, TokioClock};
pub use deployment::{compute_deploy_round, inherit_deploy_round};
pub use events::{EventSink, LaunchIssue, LaunchStep, SessionEvent};
pub use identity::{matches, HasExternalId};
pub use orchestrator::{
    LaunchReport, LaunchRequest, NullHost, SessionContext, SessionHandle, SessionHost,
    SessionOrchestrator, StopHandle, StopReason,
};
pub use population::{ContractPopulation, ForcePopulation, StandardPopulation};
pub use registry::{BotState, BotSummary};

/// Label the engine shows for a force owned by `owner`
pub fn force_label(owner: &str, force: &str) -> String {
    format!("{owner}/{force}")
}
