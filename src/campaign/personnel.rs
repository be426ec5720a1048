//! Campaign personnel

use serde::{Deserialize, Serialize};

use crate::core::types::{ExternalId, PersonId, ScenarioId, UnitId};

/// Hits at which a pilot is dead
pub const LETHAL_HITS: u8 = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PersonStatus {
    #[default]
    Active,
    KilledInAction,
    MissingInAction,
}

/// A kill credited to a person
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Kill {
    pub victim: String,
    pub killed_with: String,
    pub scenario: ScenarioId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Person {
    pub id: PersonId,
    pub external_id: ExternalId,
    pub name: String,
    pub status: PersonStatus,
    pub hits: u8,
    /// Set while the person's unit is committed to a scenario
    pub deployed: bool,
    pub unit: Option<UnitId>,
    #[serde(default)]
    pub kills: Vec<Kill>,
}

impl Person {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: PersonId::new(),
            external_id: ExternalId::generate(),
            name: name.into(),
            status: PersonStatus::Active,
            hits: 0,
            deployed: false,
            unit: None,
            kills: Vec::new(),
        }
    }

    pub fn with_external_id(mut self, external_id: impl Into<ExternalId>) -> Self {
        self.external_id = external_id.into();
        self
    }

    pub fn is_active(&self) -> bool {
        self.status == PersonStatus::Active
    }
}
