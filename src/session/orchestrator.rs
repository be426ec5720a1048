//! Session launch
//!
//! One launch connects the local player, waits for the server to report a
//! phase, pushes rule options, board, conditions, deployment and units in the
//! order the engine needs them, starts one task per bot force and then idles
//! until asked to stop or until the engine goes away.
//!
//! Only a failed primary connection aborts the launch. Everything after it is
//! reported as a [`LaunchIssue`] and the launch carries on without that piece.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, error, info, warn};

use super::bot::BotActor;
use super::clock::{Clock, TokioClock};
use super::events::{EventSink, LaunchIssue, LaunchStep, SessionEvent};
use super::force_label;
use super::map::{prepare_conditions, resolve_map_settings};
use super::population::{population_for, ForcePopulation, StandardPopulation};
use super::registry::{BotSummary, SharedRegistry};
use crate::campaign::{Campaign, ForceDescriptor, MapSpec, Person, Unit};
use crate::core::config::SessionConfig;
use crate::core::error::{Result, SortieError};
use crate::core::types::ScenarioId;
use crate::engine::{
    Deployment, EngineClient, EngineConnector, EngineCrew, EngineEntity, EngineEvent,
    EnginePhase, GameOptions, PlanetaryConditions, PlayerInfo,
};

/// Collaborator that owns operator-facing state around a session
pub trait SessionHost: Send + Sync {
    /// Persist preferences that must survive teardown
    fn flush_preferences(&self) {}

    /// The session is going away on purpose; don't warn about the disconnect
    fn suppress_disconnect_notices(&self) {}
}

/// Host with nothing to flush or suppress
#[derive(Debug, Default, Clone, Copy)]
pub struct NullHost;

impl SessionHost for NullHost {}

/// Everything a launch needs from outside, passed in explicitly
#[derive(Clone)]
pub struct SessionContext {
    pub config: Arc<SessionConfig>,
    pub connector: Arc<dyn EngineConnector>,
    pub clock: Arc<dyn Clock>,
    pub host: Arc<dyn SessionHost>,
    pub population: Arc<dyn ForcePopulation>,
}

impl SessionContext {
    pub fn new(config: SessionConfig, connector: Arc<dyn EngineConnector>) -> Self {
        Self {
            config: Arc::new(config),
            connector,
            clock: Arc::new(TokioClock),
            host: Arc::new(NullHost),
            population: Arc::new(StandardPopulation),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_host(mut self, host: Arc<dyn SessionHost>) -> Self {
        self.host = host;
        self
    }

    pub fn with_population(mut self, population: Arc<dyn ForcePopulation>) -> Self {
        self.population = population;
        self
    }
}

/// What to launch
#[derive(Debug, Clone)]
pub struct LaunchRequest {
    pub player_forces: Vec<ForceDescriptor>,
    pub bot_forces: Vec<ForceDescriptor>,
    pub map: MapSpec,
    pub conditions: PlanetaryConditions,
    /// Where the local player deploys
    pub deployment: Deployment,
    pub game_options: GameOptions,
    pub is_host: bool,
    pub already_started: bool,
}

impl LaunchRequest {
    /// Build a hosted launch from the forces committed to a scenario
    pub fn from_scenario(campaign: &Campaign, scenario_id: ScenarioId) -> Result<Self> {
        let scenario = campaign
            .scenario(scenario_id)
            .ok_or_else(|| SortieError::UnknownScenario(scenario_id.to_string()))?;

        let player_forces = scenario
            .forces
            .iter()
            .filter_map(|id| campaign.forces.get(id))
            .map(|force| ForceDescriptor {
                name: force.name.clone(),
                deployment: scenario.deployment.clone(),
                camouflage: String::new(),
                colour: String::new(),
                base_deploy_round: 0,
                role: force.role,
                units: force
                    .units
                    .iter()
                    .filter_map(|id| campaign.unit(*id))
                    .map(|unit| {
                        let pilot = unit.pilot.and_then(|p| campaign.person(p));
                        engine_entity(unit, pilot)
                    })
                    .collect(),
            })
            .collect();

        Ok(Self {
            player_forces,
            bot_forces: scenario.bot_forces.clone(),
            map: scenario.map.clone(),
            conditions: scenario.conditions.clone(),
            deployment: scenario.deployment.clone(),
            game_options: scenario.game_options.clone(),
            is_host: true,
            already_started: false,
        })
    }

    pub fn joining(mut self) -> Self {
        self.is_host = false;
        self
    }

    pub fn started(mut self, already_started: bool) -> Self {
        self.already_started = already_started;
        self
    }

    pub fn player_unit_count(&self) -> usize {
        self.player_forces.iter().map(|f| f.units.len()).sum()
    }
}

/// A campaign unit as the engine sees it
pub fn engine_entity(unit: &Unit, pilot: Option<&Person>) -> EngineEntity {
    EngineEntity {
        external_id: Some(unit.external_id.clone()),
        name: unit.name.clone(),
        owner: None,
        force_label: String::new(),
        deploy_round: unit.deploy_round.max(0) as u32,
        walk_mp: unit.walk_mp,
        condition: unit.condition.clone(),
        crew: pilot.map(|p| EngineCrew {
            external_id: Some(p.external_id.clone()),
            name: p.name.clone(),
            hits: p.hits,
        }),
        value: unit.value,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StopReason {
    Requested,
    EngineClosed,
}

/// How a launch went, once the session has ended
#[derive(Debug, Clone, Serialize)]
pub struct LaunchReport {
    pub player_name: String,
    pub phase: EnginePhase,
    pub player_units_submitted: usize,
    /// Degraded steps of the primary sequence; bot failures are in `bots`
    pub issues: Vec<LaunchIssue>,
    pub bots: Vec<BotSummary>,
    pub stop_reason: Option<StopReason>,
    pub victory_reported: bool,
    pub winning_team: Option<u8>,
}

impl LaunchReport {
    fn new(player_name: &str) -> Self {
        Self {
            player_name: player_name.to_string(),
            phase: EnginePhase::Unknown,
            player_units_submitted: 0,
            issues: Vec::new(),
            bots: Vec::new(),
            stop_reason: None,
            victory_reported: false,
            winning_team: None,
        }
    }

    pub fn bot_units_submitted(&self) -> usize {
        self.bots.iter().map(|b| b.units_submitted).sum()
    }

    pub fn has_issue(&self, step: &LaunchStep) -> bool {
        self.issues.iter().any(|i| &i.step == step)
    }
}

/// Cooperative stop signal for a running session
#[derive(Clone)]
pub struct StopHandle {
    flag: Arc<AtomicBool>,
    host: Arc<dyn SessionHost>,
}

impl StopHandle {
    /// Flush host state and raise the flag; the idle loop notices on its next wake
    pub fn request_stop(&self) {
        self.host.flush_preferences();
        self.flag.store(true, Ordering::SeqCst);
        info!("session stop requested");
    }

    pub fn is_stop_requested(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// A launch running on its own task
pub struct SessionHandle {
    stop: StopHandle,
    task: JoinHandle<Result<LaunchReport>>,
}

impl SessionHandle {
    pub fn request_stop(&self) {
        self.stop.request_stop();
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Wait for the session to end
    pub async fn join(self) -> Result<LaunchReport> {
        self.task
            .await
            .map_err(|e| SortieError::Engine(format!("session task ended abnormally: {e}")))?
    }
}

pub struct SessionOrchestrator {
    ctx: SessionContext,
    registry: SharedRegistry,
    events: EventSink,
    stop: Arc<AtomicBool>,
    phase: EnginePhase,
}

impl SessionOrchestrator {
    pub fn new(ctx: SessionContext) -> (Self, mpsc::UnboundedReceiver<SessionEvent>) {
        let (events, receiver) = EventSink::channel();
        let orchestrator = Self {
            ctx,
            registry: SharedRegistry::new(),
            events,
            stop: Arc::new(AtomicBool::new(false)),
            phase: EnginePhase::Unknown,
        };
        (orchestrator, receiver)
    }

    /// Orchestrator for a campaign scenario, picking its launch variant
    pub fn for_scenario(
        campaign: &Campaign,
        scenario_id: ScenarioId,
        ctx: SessionContext,
    ) -> Result<(Self, LaunchRequest, mpsc::UnboundedReceiver<SessionEvent>)> {
        let scenario = campaign
            .scenario(scenario_id)
            .ok_or_else(|| SortieError::UnknownScenario(scenario_id.to_string()))?;
        let ctx = ctx.with_population(population_for(campaign, scenario));
        let request = LaunchRequest::from_scenario(campaign, scenario_id)?;
        let (orchestrator, events) = Self::new(ctx);
        Ok((orchestrator, request, events))
    }

    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            flag: self.stop.clone(),
            host: self.ctx.host.clone(),
        }
    }

    pub fn registry(&self) -> SharedRegistry {
        self.registry.clone()
    }

    /// Run the launch on its own task
    pub fn spawn(mut self, request: LaunchRequest) -> SessionHandle {
        let stop = self.stop_handle();
        let task = tokio::spawn(async move { self.launch(request).await });
        SessionHandle { stop, task }
    }

    /// Drive the whole session; returns once it has stopped and been torn down
    pub async fn launch(&mut self, request: LaunchRequest) -> Result<LaunchReport> {
        let config = self.ctx.config.clone();
        let mut report = LaunchReport::new(&config.player_name);
        let mut bots = JoinSet::new();

        info!(
            player = %config.player_name,
            host = %config.server_host,
            port = config.server_port,
            population = self.ctx.population.name(),
            is_host = request.is_host,
            "launching session"
        );

        let primary = match self
            .ctx
            .connector
            .connect(&config.player_name, &config.server_host, config.server_port)
            .await
        {
            Ok(client) => client,
            Err(e) => {
                error!(error = %e, "primary connection failed, aborting launch");
                self.events.emit(SessionEvent::Issue(LaunchIssue {
                    step: LaunchStep::Connect,
                    message: e.to_string(),
                }));
                self.teardown(None, bots).await;
                return Err(e);
            }
        };
        self.registry.lock().claim_name(&config.player_name);
        self.events.emit(SessionEvent::PrimaryConnected {
            name: config.player_name.clone(),
        });

        self.await_phase(primary.as_ref(), &mut report).await;

        if self.phase == EnginePhase::Lounge {
            self.configure(primary.as_ref(), &request, &mut report, &mut bots)
                .await;
        } else if self.phase.is_known() {
            info!(phase = ?self.phase, "game already under way, resuming without configuration");
        }

        report.stop_reason = Some(self.idle(primary.as_ref(), &mut report).await);

        self.teardown(Some(primary), bots).await;
        report.phase = self.phase;
        report.bots = self.registry.lock().summaries();
        Ok(report)
    }

    // === LAUNCH STEPS ===

    fn issue(&self, report: &mut LaunchReport, step: LaunchStep, message: String) {
        warn!(step = ?step, "{}", message);
        let issue = LaunchIssue { step, message };
        self.events.emit(SessionEvent::Issue(issue.clone()));
        report.issues.push(issue);
    }

    fn completed(&self, step: LaunchStep) {
        debug!(step = ?step, "launch step completed");
        self.events.emit(SessionEvent::StepCompleted(step));
    }

    async fn await_phase(&mut self, primary: &dyn EngineClient, report: &mut LaunchReport) {
        let retries = self.ctx.config.phase_poll_retries;

        for attempt in 1..=retries {
            match primary.phase().await {
                Ok(phase) if phase.is_known() => {
                    debug!(?phase, attempt, "engine phase observed");
                    self.phase = phase;
                    self.events.emit(SessionEvent::PhaseObserved(phase));
                    return;
                }
                Ok(_) => {}
                Err(e) => debug!(attempt, error = %e, "phase poll failed"),
            }
            self.ctx.clock.sleep(self.ctx.config.phase_poll_interval()).await;
        }

        self.issue(
            report,
            LaunchStep::PhasePoll,
            format!("engine reported no phase after {retries} polls"),
        );
    }

    async fn configure(
        &mut self,
        primary: &dyn EngineClient,
        request: &LaunchRequest,
        report: &mut LaunchReport,
        bots: &mut JoinSet<BotSummary>,
    ) {
        let config = self.ctx.config.clone();
        let clock = self.ctx.clock.clone();
        let pacing = config.step_pacing();

        let player = PlayerInfo {
            name: config.player_name.clone(),
            camouflage: config.camouflage.clone(),
            colour: config.colour.clone(),
            deployment: request.deployment.clone(),
        };

        if request.already_started {
            match primary.send_game_options(&request.game_options).await {
                Ok(()) => {
                    self.completed(LaunchStep::GameOptions);
                    clock.sleep(pacing).await;
                }
                Err(e) => self.issue(report, LaunchStep::GameOptions, e.to_string()),
            }
        }

        if request.is_host {
            let map = resolve_map_settings(&request.map, &config.map_template_dir);
            match map {
                Ok(settings) => match primary.send_map_settings(&settings).await {
                    Ok(()) => {
                        info!(map = %request.map.identifier(), kind = ?settings.kind, "board submitted");
                        self.completed(LaunchStep::Map);
                        clock.sleep(pacing).await;
                    }
                    Err(e) => self.issue(report, LaunchStep::Map, e.to_string()),
                },
                Err(e) => self.issue(
                    report,
                    LaunchStep::Map,
                    format!("skipping board submission: {e}"),
                ),
            }

            match prepare_conditions(&request.conditions) {
                Ok(conditions) => match primary.send_planetary_conditions(&conditions).await {
                    Ok(()) => {
                        self.completed(LaunchStep::Conditions);
                        clock.sleep(pacing).await;
                    }
                    Err(e) => self.issue(report, LaunchStep::Conditions, e.to_string()),
                },
                Err(e) => self.issue(report, LaunchStep::Conditions, e.to_string()),
            }
        } else {
            info!("joining a hosted game, board and conditions are the host's");
        }

        match primary.send_player_info(&player).await {
            Ok(()) => self.completed(LaunchStep::Deployment),
            Err(e) => self.issue(report, LaunchStep::Deployment, e.to_string()),
        }

        self.submit_player_units(primary, request, report).await;

        match primary.send_player_info(&player).await {
            Ok(()) => self.completed(LaunchStep::PlayerInfo),
            Err(e) => self.issue(report, LaunchStep::PlayerInfo, e.to_string()),
        }

        if request.is_host {
            self.start_bots(request, bots);
        }
    }

    async fn submit_player_units(
        &mut self,
        primary: &dyn EngineClient,
        request: &LaunchRequest,
        report: &mut LaunchReport,
    ) {
        let owner = primary.local_player();
        if owner.is_none() {
            warn!("server has not assigned the local player a slot yet");
        }

        let player_name = &self.ctx.config.player_name;
        let population = &self.ctx.population;
        let entities: Vec<EngineEntity> = request
            .player_forces
            .iter()
            .flat_map(|force| {
                let label = force_label(player_name, &force.name);
                force.units.iter().map(move |entity| {
                    let mut stamped = entity.clone();
                    stamped.owner = owner;
                    stamped.force_label = label.clone();
                    stamped.deploy_round = population.deploy_round(entity, force);
                    stamped
                })
            })
            .collect();

        let count = entities.len();
        match primary.send_entities(entities).await {
            Ok(()) => {
                info!(units = count, "player units submitted");
                report.player_units_submitted = count;
                self.events.emit(SessionEvent::EntitiesSubmitted {
                    client: player_name.clone(),
                    count,
                });
                self.completed(LaunchStep::Entities);
            }
            Err(e) => self.issue(report, LaunchStep::Entities, e.to_string()),
        }
    }

    fn start_bots(&self, request: &LaunchRequest, bots: &mut JoinSet<BotSummary>) {
        let forces = request
            .bot_forces
            .iter()
            .cloned()
            .chain(self.ctx.population.extra_bot_forces());

        for force in forces {
            let name = self.registry.lock().reserve(&force.name, &force.name);
            info!(bot = %name, force = %force.name, units = force.units.len(), "starting bot");

            let actor = BotActor::new(name, self.registry.clone(), self.events.clone());
            bots.spawn(actor.run(
                force,
                self.ctx.connector.clone(),
                self.ctx.config.clone(),
                self.ctx.clock.clone(),
            ));
        }
    }

    // === RUNNING ===

    async fn idle(&mut self, primary: &dyn EngineClient, report: &mut LaunchReport) -> StopReason {
        self.events.emit(SessionEvent::Idle);
        let interval = self.ctx.config.idle_interval();

        loop {
            if self.stop.load(Ordering::SeqCst) {
                return StopReason::Requested;
            }

            while let Some(event) = primary.poll_event() {
                match event {
                    EngineEvent::Victory { winning_team } => {
                        info!(?winning_team, "engine reported victory");
                        self.phase = EnginePhase::Victory;
                        report.victory_reported = true;
                        report.winning_team = winning_team;
                        self.events.emit(SessionEvent::Victory { winning_team });
                    }
                    EngineEvent::Closed => {
                        info!("engine closed the session");
                        self.events.emit(SessionEvent::EngineClosed);
                        return StopReason::EngineClosed;
                    }
                }
            }

            self.ctx.clock.sleep(interval).await;
        }
    }

    /// Runs on every exit path once the launch has started
    async fn teardown(&mut self, primary: Option<Arc<dyn EngineClient>>, mut bots: JoinSet<BotSummary>) {
        self.ctx.host.suppress_disconnect_notices();

        if let Some(primary) = primary {
            primary.disconnect().await;
        }

        // In-flight bots finish or fail on their own
        while let Some(joined) = bots.join_next().await {
            if let Err(e) = joined {
                warn!(error = %e, "bot task ended abnormally");
            }
        }

        let clients = self.registry.lock().take_clients();
        for client in clients {
            client.disconnect().await;
        }

        info!("session torn down");
        self.events.emit(SessionEvent::Stopped);
    }
}
