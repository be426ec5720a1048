//! Snapshot of who went into a battle

use serde::{Deserialize, Serialize};

use crate::campaign::Campaign;
use crate::core::error::{Result, SortieError};
use crate::core::types::{ExternalId, ForceId, PersonId, ScenarioId, UnitId};
use crate::session::identity::{matches, HasExternalId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RosterEntry {
    pub unit_id: UnitId,
    pub external_id: ExternalId,
    pub name: String,
    pub force: Option<ForceId>,
    pub pilot: Option<PersonId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RosterPilot {
    pub person_id: PersonId,
    pub external_id: ExternalId,
    pub name: String,
    pub unit: Option<UnitId>,
}

/// Units and pilots committed to a scenario, taken when the battle starts
/// and never changed afterwards
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreBattleRoster {
    pub scenario: ScenarioId,
    pub units: Vec<RosterEntry>,
    pub pilots: Vec<RosterPilot>,
}

impl PreBattleRoster {
    pub fn from_scenario(campaign: &Campaign, scenario_id: ScenarioId) -> Result<Self> {
        if campaign.scenario(scenario_id).is_none() {
            return Err(SortieError::UnknownScenario(scenario_id.to_string()));
        }

        let mut units = Vec::new();
        let mut pilots: Vec<RosterPilot> = Vec::new();

        for unit in campaign.units_in_scenario(scenario_id) {
            units.push(RosterEntry {
                unit_id: unit.id,
                external_id: unit.external_id.clone(),
                name: unit.name.clone(),
                force: unit.force,
                pilot: unit.pilot,
            });

            let Some(person) = unit.pilot.and_then(|p| campaign.person(p)) else {
                continue;
            };
            if pilots.iter().any(|p| p.person_id == person.id) {
                continue;
            }
            pilots.push(RosterPilot {
                person_id: person.id,
                external_id: person.external_id.clone(),
                name: person.name.clone(),
                unit: Some(unit.id),
            });
        }

        Ok(Self {
            scenario: scenario_id,
            units,
            pilots,
        })
    }

    pub fn unit(&self, external_id: &ExternalId) -> Option<&RosterEntry> {
        self.units
            .iter()
            .find(|u| matches(*u, external_id))
    }
}

impl HasExternalId for RosterEntry {
    fn external_id(&self) -> Option<&ExternalId> {
        Some(&self.external_id)
    }
}

impl HasExternalId for RosterPilot {
    fn external_id(&self) -> Option<&ExternalId> {
        Some(&self.external_id)
    }
}
