//! Forces: named groups of campaign units

use serde::{Deserialize, Serialize};

use crate::core::types::{ForceId, ScenarioId, UnitId};

/// Role a force plays on the battlefield
///
/// Scouts deploy late so they can maneuver onto the board around the main body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ForceRole {
    #[default]
    Fight,
    Defend,
    Scout,
    Training,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Force {
    pub id: ForceId,
    pub name: String,
    pub role: ForceRole,
    pub units: Vec<UnitId>,
    pub scenario: Option<ScenarioId>,
}

impl Force {
    pub fn new(id: ForceId, name: impl Into<String>, role: ForceRole) -> Self {
        Self {
            id,
            name: name.into(),
            role,
            units: Vec::new(),
            scenario: None,
        }
    }

    pub fn remove_unit(&mut self, unit: UnitId) -> bool {
        let before = self.units.len();
        self.units.retain(|u| *u != unit);
        self.units.len() != before
    }
}
