//! Campaign units and their damage state

use serde::{Deserialize, Serialize};

use crate::core::types::{ExternalId, ForceId, Money, PersonId, ScenarioId, UnitId};

/// Armour and internal structure per hit location, plus the engine's
/// destroyed flag
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct UnitCondition {
    pub armor: Vec<i32>,
    pub structure: Vec<i32>,
    #[serde(default)]
    pub destroyed: bool,
}

impl UnitCondition {
    pub fn new(armor: Vec<i32>, structure: Vec<i32>) -> Self {
        Self {
            armor,
            structure,
            destroyed: false,
        }
    }

    pub fn total_armor(&self) -> i32 {
        self.armor.iter().map(|a| (*a).max(0)).sum()
    }

    pub fn total_structure(&self) -> i32 {
        self.structure.iter().map(|s| (*s).max(0)).sum()
    }
}

/// Result of a unit's condition diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum UnitStatus {
    #[default]
    Operational,
    Damaged,
    /// Less than half of the internal structure remains
    Crippled,
    Destroyed,
}

/// A unit owned by the campaign
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Unit {
    pub id: UnitId,
    pub external_id: ExternalId,
    pub name: String,
    pub condition: UnitCondition,
    /// Undamaged values, used as the diagnostics baseline
    pub nominal: UnitCondition,
    pub status: UnitStatus,
    pub walk_mp: i32,
    /// Explicit deploy round; 0 means "use the force's round"
    pub deploy_round: i32,
    pub value: Money,
    pub pilot: Option<PersonId>,
    /// Mirror of the pilot's hits as last reported by the engine
    pub crew_hits: u8,
    pub force: Option<ForceId>,
    pub scenario: Option<ScenarioId>,
}

impl Unit {
    pub fn new(name: impl Into<String>, walk_mp: i32, armor: Vec<i32>, structure: Vec<i32>) -> Self {
        let condition = UnitCondition::new(armor, structure);
        Self {
            id: UnitId::new(),
            external_id: ExternalId::generate(),
            name: name.into(),
            nominal: condition.clone(),
            condition,
            status: UnitStatus::Operational,
            walk_mp,
            deploy_round: 0,
            value: 0,
            pilot: None,
            crew_hits: 0,
            force: None,
            scenario: None,
        }
    }

    pub fn with_external_id(mut self, external_id: impl Into<ExternalId>) -> Self {
        self.external_id = external_id.into();
        self
    }

    pub fn with_value(mut self, value: Money) -> Self {
        self.value = value;
        self
    }

    pub fn with_deploy_round(mut self, round: i32) -> Self {
        self.deploy_round = round;
        self
    }

    /// Replace the damage state with one reported by the engine
    pub fn replace_condition(&mut self, condition: UnitCondition) {
        self.condition = condition;
    }

    /// Recompute status from current versus nominal condition
    pub fn run_diagnostics(&mut self) -> UnitStatus {
        let structure = self.condition.total_structure();
        let nominal_structure = self.nominal.total_structure();

        self.status = if self.condition.destroyed || (nominal_structure > 0 && structure == 0) {
            UnitStatus::Destroyed
        } else if structure * 2 < nominal_structure {
            UnitStatus::Crippled
        } else if structure < nominal_structure
            || self.condition.total_armor() < self.nominal.total_armor()
        {
            UnitStatus::Damaged
        } else {
            UnitStatus::Operational
        };

        self.status
    }
}
