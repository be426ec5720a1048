//! Post-battle records as the engine reports them

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::campaign::{ScenarioStatus, LETHAL_HITS};
use crate::core::error::Result;
use crate::core::types::ExternalId;
use crate::engine::EngineEntity;
use crate::session::identity::HasExternalId;

/// Who keeps a piece of salvage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SalvageClaim {
    #[default]
    Unclaimed,
    Unit,
    Employer,
}

/// An entity left on a field the player's side held
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalvageCandidate {
    pub entity: EngineEntity,
    #[serde(default)]
    pub claim: SalvageClaim,
}

impl SalvageCandidate {
    pub fn new(entity: EngineEntity) -> Self {
        Self {
            entity,
            claim: SalvageClaim::Unclaimed,
        }
    }

    pub fn value(&self) -> i64 {
        self.entity.value
    }

    /// Identity to quote in messages; the entity name when it has none
    pub fn label(&self) -> ExternalId {
        self.entity
            .external_id
            .clone()
            .unwrap_or_else(|| ExternalId::new(self.entity.name.clone()))
    }
}

/// A pilot the engine reported after the battle, alive or not
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PilotOutcome {
    pub external_id: Option<ExternalId>,
    pub name: String,
    #[serde(default)]
    pub hits: u8,
    #[serde(default)]
    pub dead: bool,
}

impl PilotOutcome {
    pub fn is_dead(&self) -> bool {
        self.dead || self.hits >= LETHAL_HITS
    }

    /// Fold a second report for the same pilot into this one: death sticks
    /// and the worst hit count wins
    pub fn absorb(&mut self, other: &PilotOutcome) {
        self.dead |= other.dead;
        self.hits = self.hits.max(other.hits);
    }
}

/// One kill scored during the battle
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KillRecord {
    /// Identity of the unit that scored it
    pub killer: ExternalId,
    pub victim_name: String,
}

/// Everything the engine hands back once a battle is over
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OutcomeReport {
    pub recovered: Vec<EngineEntity>,
    pub salvage: Vec<SalvageCandidate>,
    pub pilots: Vec<PilotOutcome>,
    pub kills: Vec<KillRecord>,
    pub status: ScenarioStatus,
    pub report: String,
}

impl OutcomeReport {
    pub fn from_json_str(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }
}

impl HasExternalId for SalvageCandidate {
    fn external_id(&self) -> Option<&ExternalId> {
        self.entity.external_id.as_ref()
    }
}

impl HasExternalId for PilotOutcome {
    fn external_id(&self) -> Option<&ExternalId> {
        self.external_id.as_ref()
    }
}
