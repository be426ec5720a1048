//! The persistent campaign: everything that outlives a single battle

use std::collections::BTreeMap;
use std::path::Path;

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use super::contract::Contract;
use super::force::{Force, ForceRole};
use super::personnel::Person;
use super::scenario::{MapSpec, Scenario};
use super::unit::Unit;
use crate::core::error::{Result, SortieError};
use crate::core::types::{ExternalId, ForceId, PersonId, ScenarioId, UnitId};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Campaign {
    pub name: String,
    pub units: AHashMap<UnitId, Unit>,
    pub personnel: AHashMap<PersonId, Person>,
    pub forces: BTreeMap<ForceId, Force>,
    pub scenarios: BTreeMap<ScenarioId, Scenario>,
    pub contracts: BTreeMap<u32, Contract>,
    /// Campaign log, newest last
    #[serde(default)]
    pub report: Vec<String>,
    #[serde(default)]
    next_force_id: u32,
    #[serde(default)]
    next_scenario_id: u32,
}

impl Campaign {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            next_force_id: 1,
            next_scenario_id: 1,
            ..Default::default()
        }
    }

    // === ROSTER BUILDING ===

    pub fn add_unit(&mut self, unit: Unit) -> UnitId {
        let id = unit.id;
        self.units.insert(id, unit);
        id
    }

    pub fn add_person(&mut self, person: Person) -> PersonId {
        let id = person.id;
        self.personnel.insert(id, person);
        id
    }

    pub fn add_contract(&mut self, contract: Contract) {
        self.contracts.insert(contract.id, contract);
    }

    pub fn add_force(&mut self, name: impl Into<String>, role: ForceRole) -> ForceId {
        let next = self.forces.keys().last().map_or(1, |f| f.0 + 1);
        let id = ForceId(self.next_force_id.max(next));
        self.next_force_id = id.0 + 1;
        self.forces.insert(id, Force::new(id, name, role));
        id
    }

    pub fn add_scenario(&mut self, name: impl Into<String>, map: MapSpec) -> ScenarioId {
        let next = self.scenarios.keys().last().map_or(1, |s| s.0 + 1);
        let id = ScenarioId(self.next_scenario_id.max(next));
        self.next_scenario_id = id.0 + 1;
        self.scenarios.insert(id, Scenario::new(id, name, map));
        id
    }

    /// Seat a person in a unit, replacing any previous pilot
    pub fn assign_pilot(&mut self, person_id: PersonId, unit_id: UnitId) -> Result<()> {
        if !self.personnel.contains_key(&person_id) {
            return Err(SortieError::UnknownPerson(person_id));
        }
        let unit = self
            .units
            .get_mut(&unit_id)
            .ok_or(SortieError::UnknownUnit(unit_id))?;
        let previous = unit.pilot.replace(person_id);

        if let Some(previous) = previous.filter(|p| *p != person_id) {
            if let Some(person) = self.personnel.get_mut(&previous) {
                person.unit = None;
            }
        }
        if let Some(person) = self.personnel.get_mut(&person_id) {
            person.unit = Some(unit_id);
        }
        Ok(())
    }

    pub fn assign_to_force(&mut self, unit_id: UnitId, force_id: ForceId) -> Result<()> {
        let unit = self
            .units
            .get_mut(&unit_id)
            .ok_or(SortieError::UnknownUnit(unit_id))?;
        let force = self
            .forces
            .get_mut(&force_id)
            .ok_or_else(|| SortieError::Config(format!("unknown force {:?}", force_id)))?;

        unit.force = Some(force_id);
        if !force.units.contains(&unit_id) {
            force.units.push(unit_id);
        }
        Ok(())
    }

    /// Commit a force (its units and their pilots) to a scenario
    pub fn deploy_force(&mut self, force_id: ForceId, scenario_id: ScenarioId) -> Result<()> {
        let scenario = self
            .scenarios
            .get_mut(&scenario_id)
            .ok_or_else(|| SortieError::UnknownScenario(scenario_id.to_string()))?;
        let force = self
            .forces
            .get_mut(&force_id)
            .ok_or_else(|| SortieError::Config(format!("unknown force {:?}", force_id)))?;

        force.scenario = Some(scenario_id);
        if !scenario.forces.contains(&force_id) {
            scenario.forces.push(force_id);
        }

        for unit_id in force.units.clone() {
            if let Some(unit) = self.units.get_mut(&unit_id) {
                unit.scenario = Some(scenario_id);
                if let Some(person) = unit.pilot.and_then(|p| self.personnel.get_mut(&p)) {
                    person.deployed = true;
                }
            }
        }
        Ok(())
    }

    // === PERSISTENCE ===

    pub fn from_json_str(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    // === LOOKUP ===

    pub fn unit(&self, id: UnitId) -> Option<&Unit> {
        self.units.get(&id)
    }

    pub fn unit_mut(&mut self, id: UnitId) -> Option<&mut Unit> {
        self.units.get_mut(&id)
    }

    pub fn person(&self, id: PersonId) -> Option<&Person> {
        self.personnel.get(&id)
    }

    pub fn person_mut(&mut self, id: PersonId) -> Option<&mut Person> {
        self.personnel.get_mut(&id)
    }

    pub fn scenario(&self, id: ScenarioId) -> Option<&Scenario> {
        self.scenarios.get(&id)
    }

    pub fn scenario_mut(&mut self, id: ScenarioId) -> Option<&mut Scenario> {
        self.scenarios.get_mut(&id)
    }

    pub fn scenario_by_name(&self, name: &str) -> Option<&Scenario> {
        self.scenarios.values().find(|s| s.name == name)
    }

    pub fn unit_by_external(&self, external_id: &ExternalId) -> Option<UnitId> {
        self.units
            .values()
            .find(|u| &u.external_id == external_id)
            .map(|u| u.id)
    }

    pub fn person_by_external(&self, external_id: &ExternalId) -> Option<PersonId> {
        self.personnel
            .values()
            .find(|p| &p.external_id == external_id)
            .map(|p| p.id)
    }

    /// Units committed to a scenario, in force order then roster order
    pub fn units_in_scenario(&self, scenario_id: ScenarioId) -> Vec<&Unit> {
        let Some(scenario) = self.scenarios.get(&scenario_id) else {
            return Vec::new();
        };

        scenario
            .forces
            .iter()
            .filter_map(|f| self.forces.get(f))
            .flat_map(|f| f.units.iter())
            .filter_map(|u| self.units.get(u))
            .collect()
    }

    // === MUTATION ===

    pub fn add_report(&mut self, line: impl Into<String>) {
        let line = line.into();
        tracing::info!(campaign = %self.name, "{}", line);
        self.report.push(line);
    }

    /// Detach a person from their unit, and the unit from them
    pub fn remove_person_from_unit(&mut self, person_id: PersonId) {
        let Some(person) = self.personnel.get_mut(&person_id) else {
            return;
        };
        if let Some(unit) = person.unit.take().and_then(|u| self.units.get_mut(&u)) {
            if unit.pilot == Some(person_id) {
                unit.pilot = None;
            }
        }
    }

    /// Remove a unit from the campaign, unlinking its force and pilot
    pub fn remove_unit(&mut self, unit_id: UnitId) -> Option<Unit> {
        let unit = self.units.remove(&unit_id)?;

        if let Some(force) = unit.force.and_then(|f| self.forces.get_mut(&f)) {
            force.remove_unit(unit_id);
        }
        if let Some(person) = unit.pilot.and_then(|p| self.personnel.get_mut(&p)) {
            if person.unit == Some(unit_id) {
                person.unit = None;
            }
        }
        Some(unit)
    }

    /// Release every force, unit and person the scenario held
    pub fn clear_scenario_assignments(&mut self, scenario_id: ScenarioId) {
        for force in self.forces.values_mut() {
            if force.scenario == Some(scenario_id) {
                force.scenario = None;
            }
        }

        for unit in self.units.values_mut() {
            if unit.scenario == Some(scenario_id) {
                unit.scenario = None;
                if let Some(person) = unit.pilot.and_then(|p| self.personnel.get_mut(&p)) {
                    person.deployed = false;
                }
            }
        }

        if let Some(scenario) = self.scenarios.get_mut(&scenario_id) {
            scenario.forces.clear();
        }
    }
}
