//! Committing a confirmed battle outcome to the campaign
//!
//! Reconciliation runs in two stages. [`ReconciliationPlan::from_tracker`]
//! decides, without side effects, one fate per roster unit and per roster
//! pilot plus the salvage the campaign takes in. [`ReconciliationEngine`]
//! then applies that plan.
//!
//! Precedence: a pilot reported dead is killed, never recovered, unless the
//! operator cleared the casualty. Salvage is booked against the contract cap
//! the way the tracker books it; a unit claim the cap refuses goes to the
//! employer.

use ahash::AHashSet;
use serde::Serialize;
use tracing::{debug, info, warn};

use super::records::{KillRecord, SalvageClaim};
use super::salvage::SalvageLedger;
use super::tracker::ScenarioOutcomeTracker;
use crate::campaign::{Campaign, Kill, PersonStatus, ScenarioStatus, Unit, UnitCondition, LETHAL_HITS};
use crate::core::error::{Result, SortieError};
use crate::core::types::{ExternalId, Money, PersonId, ScenarioId, UnitId};
use crate::engine::EngineEntity;
use crate::session::identity::contains;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum UnitFate {
    /// Back in the campaign's hands; `None` keeps the pre-battle condition
    Recovered { condition: Option<UnitCondition> },
    /// Left on the field for the other side
    SalvagedAway,
    /// Unaccounted for
    Removed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PilotFate {
    /// Back on duty; `None` keeps the pre-battle hits
    Recovered { hits: Option<u8> },
    Killed,
    Missing,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnitResolution {
    pub unit_id: UnitId,
    pub external_id: ExternalId,
    pub name: String,
    pub fate: UnitFate,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PilotResolution {
    pub person_id: PersonId,
    pub external_id: ExternalId,
    pub name: String,
    pub fate: PilotFate,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AcceptedSalvage {
    pub entity: EngineEntity,
    pub claim: SalvageClaim,
    /// Claimed for the unit but moved to the employer by the cap
    pub demoted: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconciliationPlan {
    pub scenario: ScenarioId,
    pub status: ScenarioStatus,
    pub report: String,
    pub units: Vec<UnitResolution>,
    pub pilots: Vec<PilotResolution>,
    pub salvage: Vec<AcceptedSalvage>,
    /// Kill records, one per (killer, victim)
    pub kills: Vec<KillRecord>,
    /// Ledger after the accepted salvage
    pub ledger: SalvageLedger,
}

impl ReconciliationPlan {
    pub fn from_tracker(
        tracker: &ScenarioOutcomeTracker,
        status: ScenarioStatus,
        report: impl Into<String>,
    ) -> Self {
        let roster = tracker.roster();

        let units = roster
            .units
            .iter()
            .map(|unit| {
                let fate = if let Some(entity) = tracker.recovered_entity(unit) {
                    UnitFate::Recovered {
                        condition: Some(entity.condition.clone()),
                    }
                } else if tracker.is_unit_resolved(unit) {
                    UnitFate::Recovered { condition: None }
                } else if tracker.is_salvaged(unit) {
                    UnitFate::SalvagedAway
                } else {
                    UnitFate::Removed
                };
                UnitResolution {
                    unit_id: unit.unit_id,
                    external_id: unit.external_id.clone(),
                    name: unit.name.clone(),
                    fate,
                }
            })
            .collect();

        let pilots = roster
            .pilots
            .iter()
            .map(|pilot| {
                let fate = match tracker.pilot_outcome(pilot) {
                    Some(outcome) if tracker.is_casualty_cleared(outcome) => PilotFate::Recovered {
                        hits: Some(outcome.hits.min(LETHAL_HITS - 1)),
                    },
                    Some(outcome) if outcome.is_dead() => PilotFate::Killed,
                    Some(outcome) => PilotFate::Recovered {
                        hits: Some(outcome.hits),
                    },
                    None if tracker.is_pilot_resolved(pilot) => PilotFate::Recovered { hits: None },
                    None => PilotFate::Missing,
                };
                PilotResolution {
                    person_id: pilot.person_id,
                    external_id: pilot.external_id.clone(),
                    name: pilot.name.clone(),
                    fate,
                }
            })
            .collect();

        // Own units in the salvage pile are lost, not taken in
        let booking = tracker.book_claims();
        let salvage = tracker
            .salvage()
            .iter()
            .enumerate()
            .filter(|(_, candidate)| !contains(&roster.units, *candidate))
            .filter(|(_, candidate)| candidate.claim != SalvageClaim::Unclaimed)
            .map(|(i, candidate)| {
                let demoted = booking.is_demoted(i);
                AcceptedSalvage {
                    entity: candidate.entity.clone(),
                    claim: if demoted {
                        SalvageClaim::Employer
                    } else {
                        candidate.claim
                    },
                    demoted,
                }
            })
            .collect();
        let ledger = booking.ledger;

        let mut seen = AHashSet::new();
        let kills = tracker
            .kills()
            .iter()
            .filter(|kill| seen.insert((*kill).clone()))
            .cloned()
            .collect();

        Self {
            scenario: roster.scenario,
            status,
            report: report.into(),
            units,
            pilots,
            salvage,
            kills,
            ledger,
        }
    }

    pub fn unit_fate(&self, external_id: &ExternalId) -> Option<&UnitFate> {
        self.units
            .iter()
            .find(|u| &u.external_id == external_id)
            .map(|u| &u.fate)
    }

    pub fn pilot_fate(&self, external_id: &ExternalId) -> Option<PilotFate> {
        self.pilots
            .iter()
            .find(|p| &p.external_id == external_id)
            .map(|p| p.fate)
    }
}

/// Counts of what a commit changed
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CommitSummary {
    pub units_recovered: usize,
    pub units_lost: usize,
    pub pilots_recovered: usize,
    pub pilots_killed: usize,
    pub pilots_missing: usize,
    pub salvage_acquired: usize,
    pub salvage_to_employer: usize,
    pub kills_credited: usize,
}

/// The only writer of campaign state after a battle
pub struct ReconciliationEngine<'a> {
    campaign: &'a mut Campaign,
    contract: Option<u32>,
}

impl<'a> ReconciliationEngine<'a> {
    pub fn new(campaign: &'a mut Campaign) -> Self {
        Self {
            campaign,
            contract: None,
        }
    }

    /// Book salvage against this contract
    pub fn with_contract(mut self, contract: Option<u32>) -> Self {
        self.contract = contract;
        self
    }

    /// Every record the plan names must exist before anything changes
    fn validate(&self, plan: &ReconciliationPlan) -> Result<()> {
        if self.campaign.scenario(plan.scenario).is_none() {
            return Err(SortieError::UnknownScenario(plan.scenario.to_string()));
        }
        for unit in &plan.units {
            if self.campaign.unit(unit.unit_id).is_none() {
                return Err(SortieError::UnknownUnit(unit.unit_id));
            }
        }
        for pilot in &plan.pilots {
            if self.campaign.person(pilot.person_id).is_none() {
                return Err(SortieError::UnknownPerson(pilot.person_id));
            }
        }
        if let Some(id) = self.contract {
            if !self.campaign.contracts.contains_key(&id) {
                return Err(SortieError::Config(format!("unknown contract {id}")));
            }
        }
        Ok(())
    }

    pub fn commit(&mut self, plan: &ReconciliationPlan) -> Result<CommitSummary> {
        self.validate(plan)?;
        let mut summary = CommitSummary::default();

        info!(scenario = %plan.scenario, status = ?plan.status, "committing battle outcome");

        self.recover_units(plan, &mut summary);
        self.resolve_pilots(plan, &mut summary);
        self.credit_kills(plan, &mut summary);
        self.remove_lost_units(plan, &mut summary);
        self.take_salvage(plan, &mut summary);

        let name = match self.campaign.scenario_mut(plan.scenario) {
            Some(scenario) => {
                scenario.status = plan.status;
                scenario.report = plan.report.clone();
                scenario.name.clone()
            }
            None => plan.scenario.to_string(),
        };
        self.campaign.clear_scenario_assignments(plan.scenario);
        self.campaign
            .add_report(format!("{} resolved: {:?}", name, plan.status));

        Ok(summary)
    }

    fn recover_units(&mut self, plan: &ReconciliationPlan, summary: &mut CommitSummary) {
        for resolution in &plan.units {
            let UnitFate::Recovered { condition } = &resolution.fate else {
                continue;
            };
            let Some(unit) = self.campaign.unit_mut(resolution.unit_id) else {
                continue;
            };
            if let Some(condition) = condition {
                unit.replace_condition(condition.clone());
            }
            let status = unit.run_diagnostics();
            debug!(unit = %resolution.external_id, ?status, "unit diagnostics");

            summary.units_recovered += 1;
            self.campaign
                .add_report(format!("{} recovered ({:?})", resolution.name, status));
        }
    }

    fn resolve_pilots(&mut self, plan: &ReconciliationPlan, summary: &mut CommitSummary) {
        for resolution in &plan.pilots {
            match resolution.fate {
                PilotFate::Recovered { hits } => {
                    let Some(person) = self.campaign.person_mut(resolution.person_id) else {
                        continue;
                    };
                    if let Some(hits) = hits {
                        person.hits = hits;
                    }
                    person.status = PersonStatus::Active;
                    person.deployed = false;
                    let (unit, hits) = (person.unit, person.hits);

                    if let Some(unit) = unit.and_then(|u| self.campaign.unit_mut(u)) {
                        unit.crew_hits = hits;
                    }
                    summary.pilots_recovered += 1;
                    self.campaign
                        .add_report(format!("{} recovered", resolution.name));
                }
                PilotFate::Killed => {
                    if let Some(person) = self.campaign.person_mut(resolution.person_id) {
                        person.status = PersonStatus::KilledInAction;
                        person.hits = LETHAL_HITS;
                        person.deployed = false;
                    }
                    self.campaign.remove_person_from_unit(resolution.person_id);
                    summary.pilots_killed += 1;
                    self.campaign
                        .add_report(format!("{} was killed in action", resolution.name));
                }
                PilotFate::Missing => {
                    if let Some(person) = self.campaign.person_mut(resolution.person_id) {
                        person.status = PersonStatus::MissingInAction;
                        person.deployed = false;
                    }
                    self.campaign.remove_person_from_unit(resolution.person_id);
                    summary.pilots_missing += 1;
                    self.campaign
                        .add_report(format!("{} is missing in action", resolution.name));
                }
            }
        }
    }

    /// Runs after casualties so only a surviving pilot still seated in the
    /// killing unit gets the credit
    fn credit_kills(&mut self, plan: &ReconciliationPlan, summary: &mut CommitSummary) {
        for kill in &plan.kills {
            let Some((person_id, weapon)) = self.credited_pilot(&kill.killer) else {
                warn!(killer = %kill.killer, victim = %kill.victim_name, "kill has no surviving pilot, discarded");
                continue;
            };
            let Some(person) = self.campaign.person_mut(person_id) else {
                continue;
            };

            let credit = Kill {
                victim: kill.victim_name.clone(),
                killed_with: weapon,
                scenario: plan.scenario,
            };
            if person.kills.contains(&credit) {
                debug!(victim = %kill.victim_name, "kill already credited");
                continue;
            }
            person.kills.push(credit);
            summary.kills_credited += 1;
        }
    }

    fn credited_pilot(&self, killer: &ExternalId) -> Option<(PersonId, String)> {
        let unit = self
            .campaign
            .unit_by_external(killer)
            .and_then(|id| self.campaign.unit(id))?;
        let person = unit.pilot.and_then(|p| self.campaign.person(p))?;
        person
            .is_active()
            .then(|| (person.id, unit.name.clone()))
    }

    fn remove_lost_units(&mut self, plan: &ReconciliationPlan, summary: &mut CommitSummary) {
        for resolution in &plan.units {
            let line = match resolution.fate {
                UnitFate::Recovered { .. } => continue,
                UnitFate::SalvagedAway => format!("{} was salvaged by the enemy", resolution.name),
                UnitFate::Removed => format!("{} was lost", resolution.name),
            };
            if self.campaign.remove_unit(resolution.unit_id).is_some() {
                summary.units_lost += 1;
                self.campaign.add_report(line);
            }
        }
    }

    fn take_salvage(&mut self, plan: &ReconciliationPlan, summary: &mut CommitSummary) {
        let mut to_unit: Money = 0;
        let mut to_employer: Money = 0;

        for accepted in &plan.salvage {
            let entity = &accepted.entity;
            match accepted.claim {
                SalvageClaim::Unit => {
                    self.campaign.add_unit(salvaged_unit(entity));
                    to_unit += entity.value.max(0);
                    summary.salvage_acquired += 1;
                    self.campaign
                        .add_report(format!("{} salvaged", entity.name));
                }
                SalvageClaim::Employer => {
                    to_employer += entity.value.max(0);
                    summary.salvage_to_employer += 1;
                    if accepted.demoted {
                        self.campaign.add_report(format!(
                            "{} goes to the employer: salvage share at the contract cap",
                            entity.name
                        ));
                    }
                }
                SalvageClaim::Unclaimed => {}
            }
        }

        if let Some(contract) = self.contract.and_then(|id| self.campaign.contracts.get_mut(&id)) {
            contract.salvaged_by_unit += to_unit;
            contract.salvaged_by_employer += to_employer;
        }
    }
}

/// A salvaged entity as a new, unassigned campaign unit
fn salvaged_unit(entity: &EngineEntity) -> Unit {
    let mut unit = Unit::new(
        entity.name.clone(),
        entity.walk_mp,
        entity.condition.armor.clone(),
        entity.condition.structure.clone(),
    )
    .with_value(entity.value);
    if let Some(external_id) = &entity.external_id {
        unit = unit.with_external_id(external_id.clone());
    }
    unit.condition = entity.condition.clone();
    unit.run_diagnostics();
    unit
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::campaign::{BoardSource, ForceRole, MapSpec, Person, UnitStatus};
    use crate::outcome::records::{PilotOutcome, SalvageCandidate};
    use crate::outcome::roster::PreBattleRoster;

    struct Battle {
        campaign: Campaign,
        scenario: ScenarioId,
        units: Vec<UnitId>,
        pilots: Vec<PersonId>,
    }

    /// Two piloted units in one lance, committed to a scenario
    fn battle() -> Battle {
        let mut campaign = Campaign::new("Wolf's Dragoons");
        let scenario = campaign.add_scenario(
            "Misery",
            MapSpec {
                source: BoardSource::Fixed { name: "Badlands".into() },
                width: 16,
                height: 17,
            },
        );
        let force = campaign.add_force("Alpha Lance", ForceRole::Fight);
        let mut units = Vec::new();
        let mut pilots = Vec::new();
        for (unit_name, pilot_name, id) in [("Archer", "Jaime Wolf", "1"), ("Rifleman", "Joshua Wolf", "2")] {
            let unit = campaign.add_unit(
                Unit::new(unit_name, 4, vec![20, 20], vec![10, 10]).with_external_id(format!("u{id}").as_str()),
            );
            let person = campaign.add_person(Person::new(pilot_name).with_external_id(format!("p{id}").as_str()));
            campaign.assign_pilot(person, unit).unwrap();
            campaign.assign_to_force(unit, force).unwrap();
            units.push(unit);
            pilots.push(person);
        }
        campaign.deploy_force(force, scenario).unwrap();

        Battle {
            campaign,
            scenario,
            units,
            pilots,
        }
    }

    fn tracker(battle: &Battle) -> ScenarioOutcomeTracker {
        let roster = PreBattleRoster::from_scenario(&battle.campaign, battle.scenario).unwrap();
        ScenarioOutcomeTracker::new(roster, SalvageLedger::new(40, 300_000, 700_000))
    }

    fn reported(battle: &Battle, index: usize, condition: UnitCondition) -> EngineEntity {
        let unit = battle.campaign.unit(battle.units[index]).unwrap();
        let mut entity = crate::session::orchestrator::engine_entity(unit, None);
        entity.condition = condition;
        entity
    }

    fn survivor(id: &str, hits: u8) -> PilotOutcome {
        PilotOutcome {
            external_id: Some(id.into()),
            name: id.to_string(),
            hits,
            dead: false,
        }
    }

    #[test]
    fn test_one_fate_per_roster_entry() {
        let battle = battle();
        let mut tracker = tracker(&battle);
        tracker.ingest(
            vec![reported(&battle, 0, UnitCondition::new(vec![5, 20], vec![10, 10]))],
            Vec::new(),
            vec![survivor("p1", 1)],
        );

        let plan = ReconciliationPlan::from_tracker(&tracker, ScenarioStatus::Victory, "");

        assert_eq!(plan.units.len(), 2);
        assert_eq!(plan.pilots.len(), 2);
        assert!(matches!(plan.unit_fate(&"u1".into()), Some(UnitFate::Recovered { condition: Some(_) })));
        assert_eq!(plan.unit_fate(&"u2".into()), Some(&UnitFate::Removed));
        assert_eq!(plan.pilot_fate(&"p1".into()), Some(PilotFate::Recovered { hits: Some(1) }));
        assert_eq!(plan.pilot_fate(&"p2".into()), Some(PilotFate::Missing));
    }

    #[test]
    fn test_death_wins_over_survival() {
        let battle = battle();
        let mut tracker = tracker(&battle);
        let mut dead = survivor("p1", 2);
        dead.dead = true;
        tracker.ingest(Vec::new(), Vec::new(), vec![dead, survivor("p2", 6)]);

        let plan = ReconciliationPlan::from_tracker(&tracker, ScenarioStatus::Defeat, "");
        assert_eq!(plan.pilot_fate(&"p1".into()), Some(PilotFate::Killed));
        assert_eq!(plan.pilot_fate(&"p2".into()), Some(PilotFate::Killed));
    }

    #[test]
    fn test_later_death_report_overrides_survival() {
        let battle = battle();
        let mut tracker = tracker(&battle);
        let mut dead = survivor("p1", 0);
        dead.dead = true;
        tracker.ingest(Vec::new(), Vec::new(), vec![survivor("p1", 1), dead]);

        assert_eq!(tracker.compute_casualties().len(), 1);
        let plan = ReconciliationPlan::from_tracker(&tracker, ScenarioStatus::Defeat, "");
        assert_eq!(plan.pilot_fate(&"p1".into()), Some(PilotFate::Killed));
    }

    #[test]
    fn test_cleared_casualty_returns_to_duty() {
        let battle = battle();
        let mut tracker = tracker(&battle);
        tracker.ingest(Vec::new(), Vec::new(), vec![survivor("p1", 6)]);
        tracker.clear_casualty(0).unwrap();

        let plan = ReconciliationPlan::from_tracker(&tracker, ScenarioStatus::Draw, "");
        assert_eq!(
            plan.pilot_fate(&"p1".into()),
            Some(PilotFate::Recovered { hits: Some(5) })
        );
    }

    #[test]
    fn test_commit_applies_every_fate() {
        let mut battle = battle();
        let mut tracker = tracker(&battle);
        let damaged = UnitCondition::new(vec![0, 0], vec![4, 3]);
        tracker.ingest(
            vec![reported(&battle, 0, damaged.clone())],
            Vec::new(),
            vec![survivor("p1", 2)],
        );
        let plan = ReconciliationPlan::from_tracker(&tracker, ScenarioStatus::MarginalVictory, "Held the ridge");

        let summary = ReconciliationEngine::new(&mut battle.campaign)
            .commit(&plan)
            .unwrap();

        assert_eq!(summary.units_recovered, 1);
        assert_eq!(summary.units_lost, 1);
        assert_eq!(summary.pilots_recovered, 1);
        assert_eq!(summary.pilots_missing, 1);

        let campaign = &battle.campaign;
        let archer = campaign.unit(battle.units[0]).unwrap();
        assert_eq!(archer.condition, damaged);
        assert_eq!(archer.status, UnitStatus::Crippled);
        assert_eq!(archer.crew_hits, 2);
        assert!(campaign.unit(battle.units[1]).is_none());

        let survivor = campaign.person(battle.pilots[0]).unwrap();
        assert_eq!(survivor.hits, 2);
        assert!(!survivor.deployed);
        let missing = campaign.person(battle.pilots[1]).unwrap();
        assert_eq!(missing.status, PersonStatus::MissingInAction);
        assert_eq!(missing.unit, None);

        let scenario = campaign.scenario(battle.scenario).unwrap();
        assert_eq!(scenario.status, ScenarioStatus::MarginalVictory);
        assert_eq!(scenario.report, "Held the ridge");
        assert!(scenario.forces.is_empty());
    }

    #[test]
    fn test_killed_pilot_leaves_unit() {
        let mut battle = battle();
        let mut tracker = tracker(&battle);
        let mut dead = survivor("p1", 3);
        dead.dead = true;
        tracker.ingest(
            vec![
                reported(&battle, 0, UnitCondition::new(vec![20, 20], vec![10, 10])),
                reported(&battle, 1, UnitCondition::new(vec![20, 20], vec![10, 10])),
            ],
            Vec::new(),
            vec![dead, survivor("p2", 0)],
        );
        let plan = ReconciliationPlan::from_tracker(&tracker, ScenarioStatus::Victory, "");

        ReconciliationEngine::new(&mut battle.campaign).commit(&plan).unwrap();

        let person = battle.campaign.person(battle.pilots[0]).unwrap();
        assert_eq!(person.status, PersonStatus::KilledInAction);
        assert_eq!(battle.campaign.unit(battle.units[0]).unwrap().pilot, None);
        assert!(!battle
            .campaign
            .report
            .iter()
            .any(|line| line == "Jaime Wolf recovered"));
    }

    #[test]
    fn test_kills_credited_once() {
        let mut battle = battle();
        let mut tracker = tracker(&battle);
        tracker.ingest(
            vec![reported(&battle, 0, UnitCondition::new(vec![20, 20], vec![10, 10]))],
            Vec::new(),
            vec![survivor("p1", 0)],
        );
        let kill = KillRecord {
            killer: "u1".into(),
            victim_name: "Marauder MAD-3R".into(),
        };
        let orphan = KillRecord {
            killer: "u2".into(),
            victim_name: "Warhammer WHM-6R".into(),
        };
        tracker.set_kills(vec![kill.clone(), kill, orphan]);
        let plan = ReconciliationPlan::from_tracker(&tracker, ScenarioStatus::Victory, "");
        assert_eq!(plan.kills.len(), 2);

        let summary = ReconciliationEngine::new(&mut battle.campaign).commit(&plan).unwrap();

        assert_eq!(summary.kills_credited, 1);
        let person = battle.campaign.person(battle.pilots[0]).unwrap();
        assert_eq!(person.kills.len(), 1);
        assert_eq!(person.kills[0].killed_with, "Archer");
    }

    #[test]
    fn test_salvage_over_cap_is_demoted() {
        let mut battle = battle();
        battle
            .campaign
            .add_contract(crate::campaign::Contract::new(3, "Garrison", "Davion", 40));
        let mut tracker = tracker(&battle);
        let enemy = |id: &str, value| EngineEntity {
            value,
            external_id: Some(id.into()),
            name: format!("Enemy {id}"),
            ..reported(&battle, 0, UnitCondition::new(vec![1], vec![1]))
        };
        let mut first = SalvageCandidate::new(enemy("e1", 200_000));
        first.claim = SalvageClaim::Unit;
        // Claims bypassing the tracker still hit the cap at commit
        let mut second = SalvageCandidate::new(enemy("e2", 100_000));
        second.claim = SalvageClaim::Unit;
        tracker.ingest(Vec::new(), vec![first, second], Vec::new());
        let plan = ReconciliationPlan::from_tracker(&tracker, ScenarioStatus::Victory, "");

        assert!(!plan.salvage[0].demoted);
        assert!(plan.salvage[1].demoted);
        assert_eq!(plan.salvage[1].claim, SalvageClaim::Employer);

        let summary = ReconciliationEngine::new(&mut battle.campaign)
            .with_contract(Some(3))
            .commit(&plan)
            .unwrap();

        assert_eq!(summary.salvage_acquired, 1);
        assert_eq!(summary.salvage_to_employer, 1);
        assert!(battle.campaign.unit_by_external(&"e1".into()).is_some());
        assert!(battle.campaign.unit_by_external(&"e2".into()).is_none());
        let contract = &battle.campaign.contracts[&3];
        assert_eq!(contract.salvaged_by_unit, 200_000);
        assert_eq!(contract.salvaged_by_employer, 100_000);
    }

    #[test]
    fn test_accepted_claim_survives_commit_after_employer_claim() {
        let battle = battle();
        let roster = PreBattleRoster::from_scenario(&battle.campaign, battle.scenario).unwrap();
        let mut tracker = ScenarioOutcomeTracker::new(roster, SalvageLedger::new(40, 400_000, 600_000));
        let enemy = |id: &str, value| EngineEntity {
            value,
            external_id: Some(id.into()),
            name: format!("Enemy {id}"),
            ..reported(&battle, 0, UnitCondition::new(vec![1], vec![1]))
        };
        tracker.ingest(
            Vec::new(),
            vec![
                SalvageCandidate::new(enemy("e0", 200_000)),
                SalvageCandidate::new(enemy("e1", 1_000_000)),
            ],
            Vec::new(),
        );
        tracker.claim_salvage(1, SalvageClaim::Employer).unwrap();
        tracker.claim_salvage(0, SalvageClaim::Unit).unwrap();

        let plan = ReconciliationPlan::from_tracker(&tracker, ScenarioStatus::Victory, "");

        assert_eq!(plan.salvage.len(), 2);
        assert_eq!(plan.salvage[0].claim, SalvageClaim::Unit);
        assert!(!plan.salvage[0].demoted);
        assert_eq!(plan.salvage[1].claim, SalvageClaim::Employer);
        assert_eq!(plan.ledger, tracker.salvage_ledger());
        assert_eq!(plan.ledger.current_pct(), 27);
    }

    #[test]
    fn test_own_unit_in_salvage_is_lost() {
        let battle = battle();
        let mut tracker = tracker(&battle);
        let mut own = SalvageCandidate::new(reported(&battle, 1, UnitCondition::default()));
        own.claim = SalvageClaim::Unit;
        tracker.ingest(Vec::new(), vec![own], Vec::new());

        let plan = ReconciliationPlan::from_tracker(&tracker, ScenarioStatus::Defeat, "");
        assert_eq!(plan.unit_fate(&"u2".into()), Some(&UnitFate::SalvagedAway));
        assert!(plan.salvage.is_empty());
    }

    #[test]
    fn test_commit_refuses_unknown_records() {
        let mut battle = battle();
        let tracker = tracker(&battle);
        let plan = ReconciliationPlan::from_tracker(&tracker, ScenarioStatus::Draw, "");
        battle.campaign.remove_unit(battle.units[0]);

        let result = ReconciliationEngine::new(&mut battle.campaign).commit(&plan);
        assert!(matches!(result, Err(SortieError::UnknownUnit(_))));
        // Nothing applied
        assert!(battle.campaign.person(battle.pilots[0]).unwrap().deployed);
    }
}
