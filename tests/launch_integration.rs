//! End-to-end launches against the in-process engine

use std::sync::Arc;

use sortie::campaign::{
    BoardSource, Campaign, Contract, ForceDescriptor, ForceRole, MapSpec, Person, Unit,
    UnitCondition,
};
use sortie::core::types::ScenarioId;
use sortie::core::SessionConfig;
use sortie::engine::loopback::Submission;
use sortie::engine::{Deployment, EngineEntity, LoopbackServer};
use sortie::session::{
    BotState, ImmediateClock, LaunchReport, SessionContext, SessionEvent, SessionOrchestrator,
    StopReason,
};

fn bot_unit(name: &str) -> EngineEntity {
    EngineEntity {
        external_id: None,
        name: name.into(),
        owner: None,
        force_label: String::new(),
        deploy_round: 0,
        walk_mp: 5,
        condition: UnitCondition::new(vec![18, 18], vec![9, 9]),
        crew: None,
        value: 0,
    }
}

fn bot_force(name: &str, units: &[&str]) -> ForceDescriptor {
    ForceDescriptor {
        name: name.into(),
        deployment: Deployment {
            team: 2,
            ..Default::default()
        },
        camouflage: "Liao".into(),
        colour: "Green".into(),
        base_deploy_round: 2,
        role: ForceRole::Fight,
        units: units.iter().map(|u| bot_unit(u)).collect(),
    }
}

/// A lance of three piloted units committed to one scenario
fn campaign_with_lance(role: ForceRole) -> (Campaign, ScenarioId) {
    let mut campaign = Campaign::new("Gray Death Legion");
    let scenario = campaign.add_scenario(
        "Relief of Verthandi",
        MapSpec {
            source: BoardSource::Fixed {
                name: "Woodland 3".into(),
            },
            width: 16,
            height: 17,
        },
    );
    let force = campaign.add_force("Command Lance", role);

    for (i, (unit, pilot, walk)) in [
        ("Shadow Hawk", "Grayson Carlyle", 5),
        ("Marauder", "Davis McCall", 4),
        ("Locust", "Lori Kalmar", 8),
    ]
    .into_iter()
    .enumerate()
    {
        let unit = campaign.add_unit(
            Unit::new(unit, walk, vec![20, 20], vec![10, 10])
                .with_external_id(format!("unit-{i}").as_str()),
        );
        let person = campaign.add_person(Person::new(pilot).with_external_id(format!("pilot-{i}").as_str()));
        campaign.assign_pilot(person, unit).unwrap();
        campaign.assign_to_force(unit, force).unwrap();
    }
    campaign.deploy_force(force, scenario).unwrap();

    (campaign, scenario)
}

async fn launch(
    campaign: &Campaign,
    scenario: ScenarioId,
    server: &LoopbackServer,
    config: SessionConfig,
) -> LaunchReport {
    let ctx = SessionContext::new(config, Arc::new(server.connector()))
        .with_clock(Arc::new(ImmediateClock::new()));
    let (orchestrator, request, mut events) =
        SessionOrchestrator::for_scenario(campaign, scenario, ctx).unwrap();
    let handle = orchestrator.spawn(request);

    while let Some(event) = events.recv().await {
        if event == SessionEvent::Idle {
            handle.request_stop();
            break;
        }
    }
    handle.join().await.unwrap()
}

#[tokio::test]
async fn test_failed_bot_does_not_stop_launch() {
    let (mut campaign, scenario) = campaign_with_lance(ForceRole::Fight);
    campaign
        .scenario_mut(scenario)
        .unwrap()
        .bot_forces
        .push(bot_force("Raiders", &["Vindicator", "Catapult"]));
    let server = LoopbackServer::new();
    server.refuse_connections("Raiders");

    let report = launch(&campaign, scenario, &server, SessionConfig::default()).await;

    assert_eq!(report.player_units_submitted, 3);
    assert_eq!(report.bot_units_submitted(), 0);
    assert_eq!(report.bots.len(), 1);
    assert_eq!(report.bots[0].state, BotState::Failed);
    assert!(report.bots[0].failure.is_some());
    assert!(report.issues.is_empty());
    assert_eq!(report.stop_reason, Some(StopReason::Requested));
    assert_eq!(server.entities_of("Commander").len(), 3);
}

#[tokio::test]
async fn test_each_roster_unit_submitted_once() {
    let (campaign, scenario) = campaign_with_lance(ForceRole::Fight);
    let server = LoopbackServer::new();

    launch(&campaign, scenario, &server, SessionConfig::default()).await;

    let entities = server.all_entities();
    let owner = server.handle_of("Commander");
    for unit in campaign.units.values() {
        let matching: Vec<_> = entities
            .iter()
            .filter(|e| e.external_id.as_ref() == Some(&unit.external_id))
            .collect();
        assert_eq!(matching.len(), 1, "{} submitted once", unit.name);
        assert_eq!(matching[0].owner, owner);
        assert_eq!(matching[0].force_label, "Commander/Command Lance");
        assert!(matching[0].crew.is_some());
    }
}

#[tokio::test]
async fn test_colliding_bot_names_are_suffixed() {
    let (mut campaign, scenario) = campaign_with_lance(ForceRole::Fight);
    let bots = &mut campaign.scenario_mut(scenario).unwrap().bot_forces;
    bots.push(bot_force("Hunters", &["Jenner"]));
    bots.push(bot_force("Hunters", &["Panther", "Raven"]));
    let server = LoopbackServer::new();

    let report = launch(&campaign, scenario, &server, SessionConfig::default()).await;

    let names: Vec<_> = report.bots.iter().map(|b| b.name.clone()).collect();
    assert_eq!(names, vec!["Hunters", "Hunters2"]);
    assert_eq!(server.entities_of("Hunters").len(), 1);
    assert_eq!(server.entities_of("Hunters2").len(), 2);
    assert_eq!(server.player_info("Hunters2").unwrap().deployment.team, 2);
    assert!(server
        .entities_of("Hunters2")
        .iter()
        .all(|e| e.deploy_round == 2 && e.force_label == "Hunters2/Hunters"));
}

#[tokio::test]
async fn test_primary_sequence_precedes_bots() {
    let (mut campaign, scenario) = campaign_with_lance(ForceRole::Fight);
    campaign
        .scenario_mut(scenario)
        .unwrap()
        .bot_forces
        .push(bot_force("Hunters", &["Jenner"]));
    let server = LoopbackServer::new();

    launch(&campaign, scenario, &server, SessionConfig::default()).await;

    let submissions = server.submissions();
    let position = |wanted: &Submission| submissions.iter().position(|s| s == wanted).unwrap();
    let map = position(&Submission::MapSettings);
    let conditions = position(&Submission::PlanetaryConditions);
    let deployment = position(&Submission::PlayerInfo {
        client: "Commander".into(),
    });
    let entities = position(&Submission::Entities {
        client: "Commander".into(),
        count: 3,
    });
    let bot = position(&Submission::Connected {
        client: "Hunters".into(),
    });

    assert!(map < conditions);
    assert!(conditions < deployment);
    assert!(deployment < entities);
    assert!(entities < bot);
}

#[tokio::test]
async fn test_slow_bot_gives_up_and_others_finish() {
    let (mut campaign, scenario) = campaign_with_lance(ForceRole::Fight);
    let bots = &mut campaign.scenario_mut(scenario).unwrap().bot_forces;
    bots.push(bot_force("Hunters", &["Jenner"]));
    bots.push(bot_force("Raiders", &["Vindicator"]));
    let server = LoopbackServer::new();
    server.fail_connections("Hunters", 10);
    let config = SessionConfig {
        bot_connect_retries: 2,
        ..Default::default()
    };

    let report = launch(&campaign, scenario, &server, config).await;

    let hunters = report.bots.iter().find(|b| b.name == "Hunters").unwrap();
    let raiders = report.bots.iter().find(|b| b.name == "Raiders").unwrap();
    assert_eq!(hunters.state, BotState::Failed);
    assert_eq!(raiders.state, BotState::Active);
    assert_eq!(report.bot_units_submitted(), 1);
    assert!(server.connected_clients().is_empty());
}

#[tokio::test]
async fn test_contract_launch_schedules_and_adds_forces() {
    let (mut campaign, scenario) = campaign_with_lance(ForceRole::Scout);
    let mut contract = Contract::new(1, "Verthandi Rebellion", "Verthandi Rebels", 50);
    contract.deploy_delay = 7;
    contract.opposition.push(bot_force("Marik Garrison", &["Wolverine", "Griffin"]));
    campaign.add_contract(contract);
    campaign.scenario_mut(scenario).unwrap().contract = Some(1);
    let server = LoopbackServer::new();

    let report = launch(&campaign, scenario, &server, SessionConfig::default()).await;

    let rounds: Vec<_> = server
        .entities_of("Commander")
        .iter()
        .map(|e| (e.walk_mp, e.deploy_round))
        .collect();
    // max(7 - walk, 6 - walk), clamped at zero
    assert!(rounds.contains(&(5, 2)));
    assert!(rounds.contains(&(4, 3)));
    assert!(rounds.contains(&(8, 0)));

    assert_eq!(report.bots.len(), 1);
    assert_eq!(report.bots[0].name, "Marik Garrison");
    assert!(server
        .entities_of("Marik Garrison")
        .iter()
        .all(|e| e.deploy_round == 7));
}

#[tokio::test]
async fn test_engine_closure_without_stop_request() {
    let (campaign, scenario) = campaign_with_lance(ForceRole::Fight);
    let server = LoopbackServer::new();
    let ctx = SessionContext::new(SessionConfig::default(), Arc::new(server.connector()))
        .with_clock(Arc::new(ImmediateClock::new()));
    let (orchestrator, request, mut events) =
        SessionOrchestrator::for_scenario(&campaign, scenario, ctx).unwrap();
    let handle = orchestrator.spawn(request);

    while let Some(event) = events.recv().await {
        if event == SessionEvent::Idle {
            server.announce_victory(Some(1));
            server.close();
        }
        if event == SessionEvent::EngineClosed {
            break;
        }
    }

    let report = handle.join().await.unwrap();
    assert_eq!(report.stop_reason, Some(StopReason::EngineClosed));
    assert_eq!(report.winning_team, Some(1));
}
