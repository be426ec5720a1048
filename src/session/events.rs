//! Status updates a session publishes while it runs

use serde::Serialize;
use tokio::sync::mpsc;

use super::registry::BotState;
use crate::engine::EnginePhase;

/// Launch step a message refers to
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum LaunchStep {
    Connect,
    PhasePoll,
    GameOptions,
    Map,
    Conditions,
    Deployment,
    Entities,
    PlayerInfo,
    Bot(String),
}

/// A failure the launch survived
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LaunchIssue {
    pub step: LaunchStep,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    PrimaryConnected { name: String },
    PhaseObserved(EnginePhase),
    StepCompleted(LaunchStep),
    Issue(LaunchIssue),
    BotState { name: String, state: BotState },
    EntitiesSubmitted { client: String, count: usize },
    /// Launch sequence finished; waiting for a stop request
    Idle,
    Victory { winning_team: Option<u8> },
    EngineClosed,
    Stopped,
}

/// Sender half; a dropped receiver just means nobody is listening
#[derive(Debug, Clone)]
pub struct EventSink(mpsc::UnboundedSender<SessionEvent>);

impl EventSink {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<SessionEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self(tx), rx)
    }

    pub fn emit(&self, event: SessionEvent) {
        let _ = self.0.send(event);
    }
}
