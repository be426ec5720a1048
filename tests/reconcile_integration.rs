//! End-to-end reconciliation of reported outcomes into a campaign

use std::collections::BTreeSet;

use proptest::prelude::*;

use sortie::campaign::{
    BoardSource, Campaign, ForceRole, MapSpec, Person, PersonStatus, ScenarioStatus, Unit,
    UnitCondition,
};
use sortie::core::types::{ExternalId, ScenarioId};
use sortie::engine::EngineEntity;
use sortie::outcome::{
    OutcomeReport, PilotFate, PilotOutcome, PreBattleRoster, ReconciliationEngine,
    ReconciliationPlan, SalvageCandidate, SalvageClaim, SalvageLedger, ScenarioOutcomeTracker,
    UnitFate,
};

fn map() -> MapSpec {
    MapSpec {
        source: BoardSource::Fixed {
            name: "Lake Shore".into(),
        },
        width: 32,
        height: 17,
    }
}

/// `units` piloted units in one force, committed to a scenario
fn campaign(units: usize) -> (Campaign, ScenarioId) {
    let mut campaign = Campaign::new("Northwind Highlanders");
    let scenario = campaign.add_scenario("Defence of Northwind", map());
    let force = campaign.add_force("Stirling's Fusiliers", ForceRole::Defend);
    for i in 0..units {
        let unit = campaign.add_unit(
            Unit::new(format!("Highlander {i}"), 3, vec![30, 30], vec![15, 15])
                .with_external_id(format!("u{i}").as_str()),
        );
        let person =
            campaign.add_person(Person::new(format!("MechWarrior {i}")).with_external_id(format!("p{i}").as_str()));
        campaign.assign_pilot(person, unit).unwrap();
        campaign.assign_to_force(unit, force).unwrap();
    }
    campaign.deploy_force(force, scenario).unwrap();
    (campaign, scenario)
}

fn entity(id: &str) -> EngineEntity {
    EngineEntity {
        external_id: Some(id.into()),
        name: format!("Entity {id}"),
        owner: None,
        force_label: String::new(),
        deploy_round: 0,
        walk_mp: 3,
        condition: UnitCondition::new(vec![12, 30], vec![15, 15]),
        crew: None,
        value: 250_000,
    }
}

fn survivor(id: &str) -> PilotOutcome {
    PilotOutcome {
        external_id: Some(id.into()),
        name: id.to_string(),
        hits: 1,
        dead: false,
    }
}

fn tracker(campaign: &Campaign, scenario: ScenarioId) -> ScenarioOutcomeTracker {
    let roster = PreBattleRoster::from_scenario(campaign, scenario).unwrap();
    ScenarioOutcomeTracker::new(roster, SalvageLedger::unlimited())
}

#[test]
fn test_surviving_and_absent_pilots() {
    let (mut campaign, scenario) = campaign(2);
    let pilot_a = campaign.person_by_external(&"p0".into()).unwrap();
    let pilot_b = campaign.person_by_external(&"p1".into()).unwrap();

    let mut tracker = tracker(&campaign, scenario);
    tracker.ingest(vec![entity("u0"), entity("u1")], Vec::new(), vec![survivor("p0")]);
    assert_eq!(tracker.compute_missing_pilots().len(), 1);
    assert!(tracker.compute_casualties().is_empty());

    let plan = ReconciliationPlan::from_tracker(&tracker, ScenarioStatus::Victory, "Held");
    ReconciliationEngine::new(&mut campaign).commit(&plan).unwrap();

    let a = campaign.person(pilot_a).unwrap();
    let b = campaign.person(pilot_b).unwrap();
    assert_eq!(a.status, PersonStatus::Active);
    assert!(!a.deployed);
    assert_eq!(b.status, PersonStatus::MissingInAction);
    assert!(!b.deployed);
    assert_eq!(b.unit, None);

    let scenario = campaign.scenario(scenario).unwrap();
    assert!(scenario.forces.is_empty());
    assert!(campaign.forces.values().all(|f| f.scenario.is_none()));
    assert!(campaign.report.iter().any(|l| l == "MechWarrior 0 recovered"));
    assert!(campaign
        .report
        .iter()
        .any(|l| l == "MechWarrior 1 is missing in action"));
}

#[test]
fn test_operator_recovers_missing_pilot() {
    let (mut campaign, scenario) = campaign(2);
    let mut tracker = tracker(&campaign, scenario);
    tracker.ingest(vec![entity("u0"), entity("u1")], Vec::new(), vec![survivor("p0")]);

    tracker.resolve_missing_pilot(0).unwrap();
    let plan = ReconciliationPlan::from_tracker(&tracker, ScenarioStatus::Victory, "");
    assert_eq!(plan.pilot_fate(&"p1".into()), Some(PilotFate::Recovered { hits: None }));

    ReconciliationEngine::new(&mut campaign).commit(&plan).unwrap();
    let b = campaign.person_by_external(&"p1".into()).unwrap();
    assert_eq!(campaign.person(b).unwrap().status, PersonStatus::Active);
}

#[test]
fn test_report_file_drives_commit() {
    let (mut campaign, scenario) = campaign(3);
    let report = OutcomeReport::from_json_str(
        r#"{
            "recovered": [{
                "external_id": "u0",
                "name": "Highlander 0",
                "walk_mp": 3,
                "condition": { "armor": [0, 10], "structure": [15, 15] }
            }],
            "salvage": [{
                "entity": {
                    "external_id": "enemy-1",
                    "name": "Hunchback HBK-4G",
                    "walk_mp": 4,
                    "condition": { "armor": [5], "structure": [8] },
                    "value": 300000
                },
                "claim": "Unit"
            }],
            "pilots": [
                { "external_id": "p0", "name": "MechWarrior 0", "hits": 2 },
                { "external_id": "p1", "name": "MechWarrior 1", "dead": true }
            ],
            "kills": [{ "killer": "u0", "victim_name": "Hunchback HBK-4G" }],
            "status": "DecisiveVictory",
            "report": "Drove the raiders off"
        }"#,
    )
    .unwrap();

    let mut tracker = tracker(&campaign, scenario);
    tracker.ingest_report(&report);
    let missing: Vec<_> = tracker
        .compute_missing_units()
        .iter()
        .map(|u| u.external_id.clone())
        .collect();
    assert_eq!(missing, vec![ExternalId::new("u1"), ExternalId::new("u2")]);

    let plan = ReconciliationPlan::from_tracker(&tracker, report.status, report.report.clone());
    let summary = ReconciliationEngine::new(&mut campaign).commit(&plan).unwrap();

    assert_eq!(summary.units_recovered, 1);
    assert_eq!(summary.units_lost, 2);
    assert_eq!(summary.pilots_recovered, 1);
    assert_eq!(summary.pilots_killed, 1);
    assert_eq!(summary.pilots_missing, 1);
    assert_eq!(summary.salvage_acquired, 1);
    assert_eq!(summary.kills_credited, 1);

    let salvaged = campaign.unit_by_external(&"enemy-1".into()).unwrap();
    let salvaged = campaign.unit(salvaged).unwrap();
    assert_eq!(salvaged.force, None);
    assert_eq!(salvaged.value, 300_000);

    let scenario = campaign.scenario(scenario).unwrap();
    assert_eq!(scenario.status, ScenarioStatus::DecisiveVictory);
    assert_eq!(scenario.report, "Drove the raiders off");
}

#[test]
fn test_commit_survives_json_round_trip() {
    let (campaign, scenario) = campaign(1);
    let json = serde_json::to_string(&campaign).unwrap();
    let mut restored = Campaign::from_json_str(&json).unwrap();

    let mut tracker = tracker(&restored, scenario);
    tracker.ingest(vec![entity("u0")], Vec::new(), vec![survivor("p0")]);
    let plan = ReconciliationPlan::from_tracker(&tracker, ScenarioStatus::Draw, "");

    assert!(ReconciliationEngine::new(&mut restored).commit(&plan).is_ok());
}

proptest! {
    /// Once every discrepancy is resolved, each roster unit is exactly one of
    /// missing, recovered or salvaged away
    #[test]
    fn prop_unit_classification_partitions_roster(fates in prop::collection::vec(0u8..3, 1..8)) {
        let (campaign, scenario) = campaign(fates.len());
        let mut recovered = Vec::new();
        let mut salvage = Vec::new();
        for (i, fate) in fates.iter().enumerate() {
            let id = format!("u{i}");
            match fate {
                0 => recovered.push(entity(&id)),
                1 => salvage.push(SalvageCandidate::new(entity(&id))),
                _ => {}
            }
        }
        // A recovered unit also reported as salvage stays recovered
        if let Some(first) = recovered.first() {
            salvage.push(SalvageCandidate { entity: first.clone(), claim: SalvageClaim::Unclaimed });
        }

        let mut tracker = tracker(&campaign, scenario);
        tracker.ingest(recovered, salvage, Vec::new());
        let plan = ReconciliationPlan::from_tracker(&tracker, ScenarioStatus::Draw, "");

        let roster: BTreeSet<String> = tracker
            .roster()
            .units
            .iter()
            .map(|u| u.external_id.to_string())
            .collect();
        let classified: Vec<String> = plan.units.iter().map(|u| u.external_id.to_string()).collect();
        let unique: BTreeSet<String> = classified.iter().cloned().collect();

        prop_assert_eq!(classified.len(), unique.len());
        prop_assert_eq!(unique, roster);

        for (i, fate) in fates.iter().enumerate() {
            let expected = match fate {
                0 => "recovered",
                1 => "salvaged",
                _ => "removed",
            };
            let actual = match plan.unit_fate(&ExternalId::new(format!("u{i}"))) {
                Some(UnitFate::Recovered { .. }) => "recovered",
                Some(UnitFate::SalvagedAway) => "salvaged",
                Some(UnitFate::Removed) => "removed",
                None => "unclassified",
            };
            prop_assert_eq!(actual, expected);
        }
    }
}
