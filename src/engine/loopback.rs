//! In-process game server
//!
//! Accepts the same calls a real server would and records everything it is
//! sent, in order. Faults (refused connections, slow player assignment, an
//! engine that takes a while to report its phase, rejected entity batches)
//! can be scripted per client name, which makes it the stand-in for the
//! engine in rehearsals and tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use ahash::{AHashMap, AHashSet};
use async_trait::async_trait;

use super::{
    EngineClient, EngineConnector, EngineEntity, EngineEvent, EnginePhase, GameOptions,
    MapSettings, PlanetaryConditions, PlayerInfo,
};
use crate::core::error::{Result, SortieError};
use crate::core::types::PlayerHandle;

/// One recorded interaction, in arrival order
#[derive(Debug, Clone, PartialEq)]
pub enum Submission {
    Connected { client: String },
    GameOptions,
    MapSettings,
    PlanetaryConditions,
    PlayerInfo { client: String },
    Entities { client: String, count: usize },
    Disconnected { client: String },
}

#[derive(Debug)]
struct PlayerSlot {
    handle: PlayerHandle,
    client: String,
    info: Option<PlayerInfo>,
    entities: Vec<EngineEntity>,
    events: VecDeque<EngineEvent>,
    connected: bool,
}

#[derive(Debug, Default)]
struct ServerState {
    phase: EnginePhase,
    unknown_phase_polls: u32,
    next_handle: u32,
    players: Vec<PlayerSlot>,
    refused: AHashSet<String>,
    transient_failures: AHashMap<String, u32>,
    assignment_delay_polls: u32,
    rejects_entities: AHashSet<String>,
    options: Option<GameOptions>,
    map: Option<MapSettings>,
    conditions: Option<PlanetaryConditions>,
    submissions: Vec<Submission>,
}

impl ServerState {
    fn slot_mut(&mut self, handle: PlayerHandle) -> Option<&mut PlayerSlot> {
        self.players.iter_mut().find(|p| p.handle == handle)
    }
}

/// Shared handle to the in-process server
#[derive(Debug, Clone, Default)]
pub struct LoopbackServer {
    state: Arc<Mutex<ServerState>>,
}

impl LoopbackServer {
    /// A server sitting in its lounge, accepting everything
    pub fn new() -> Self {
        let server = Self::default();
        server.lock().phase = EnginePhase::Lounge;
        server
    }

    fn lock(&self) -> MutexGuard<'_, ServerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn connector(&self) -> LoopbackConnector {
        LoopbackConnector {
            server: self.clone(),
        }
    }

    // === SCRIPTING ===

    pub fn set_phase(&self, phase: EnginePhase) {
        self.lock().phase = phase;
    }

    /// Answer `Unknown` to the first `polls` phase queries
    pub fn report_unknown_phase_for(&self, polls: u32) {
        self.lock().unknown_phase_polls = polls;
    }

    /// Every connection attempt under this name fails
    pub fn refuse_connections(&self, name: &str) {
        self.lock().refused.insert(name.to_string());
    }

    /// The first `attempts` connection attempts under this name fail
    pub fn fail_connections(&self, name: &str, attempts: u32) {
        self.lock()
            .transient_failures
            .insert(name.to_string(), attempts);
    }

    /// New clients see no player slot for their first `polls` queries
    pub fn delay_player_assignment(&self, polls: u32) {
        self.lock().assignment_delay_polls = polls;
    }

    /// Entity batches from this client are rejected
    pub fn reject_entities_from(&self, name: &str) {
        self.lock().rejects_entities.insert(name.to_string());
    }

    pub fn announce_victory(&self, winning_team: Option<u8>) {
        let mut state = self.lock();
        state.phase = EnginePhase::Victory;
        for slot in state.players.iter_mut().filter(|p| p.connected) {
            slot.events.push_back(EngineEvent::Victory { winning_team });
        }
    }

    /// Shut the server down; every connected client is told
    pub fn close(&self) {
        let mut state = self.lock();
        for slot in state.players.iter_mut().filter(|p| p.connected) {
            slot.events.push_back(EngineEvent::Closed);
        }
    }

    // === INSPECTION ===

    pub fn submissions(&self) -> Vec<Submission> {
        self.lock().submissions.clone()
    }

    /// Names of every client that ever connected, in connection order
    pub fn client_names(&self) -> Vec<String> {
        self.lock().players.iter().map(|p| p.client.clone()).collect()
    }

    pub fn connected_clients(&self) -> Vec<String> {
        self.lock()
            .players
            .iter()
            .filter(|p| p.connected)
            .map(|p| p.client.clone())
            .collect()
    }

    pub fn entities_of(&self, client: &str) -> Vec<EngineEntity> {
        self.lock()
            .players
            .iter()
            .filter(|p| p.client == client)
            .flat_map(|p| p.entities.iter().cloned())
            .collect()
    }

    pub fn all_entities(&self) -> Vec<EngineEntity> {
        self.lock()
            .players
            .iter()
            .flat_map(|p| p.entities.iter().cloned())
            .collect()
    }

    pub fn player_info(&self, client: &str) -> Option<PlayerInfo> {
        self.lock()
            .players
            .iter()
            .find(|p| p.client == client)
            .and_then(|p| p.info.clone())
    }

    pub fn handle_of(&self, client: &str) -> Option<PlayerHandle> {
        self.lock()
            .players
            .iter()
            .find(|p| p.client == client)
            .map(|p| p.handle)
    }

    pub fn game_options(&self) -> Option<GameOptions> {
        self.lock().options.clone()
    }

    pub fn map_settings(&self) -> Option<MapSettings> {
        self.lock().map.clone()
    }

    pub fn planetary_conditions(&self) -> Option<PlanetaryConditions> {
        self.lock().conditions.clone()
    }
}

/// Connector handing out clients of a [`LoopbackServer`]
#[derive(Debug, Clone)]
pub struct LoopbackConnector {
    server: LoopbackServer,
}

#[async_trait]
impl EngineConnector for LoopbackConnector {
    async fn connect(&self, name: &str, host: &str, port: u16) -> Result<Arc<dyn EngineClient>> {
        let mut state = self.server.lock();

        let refused = if state.refused.contains(name) {
            true
        } else if let Some(remaining) = state.transient_failures.get_mut(name) {
            if *remaining > 0 {
                *remaining -= 1;
                true
            } else {
                false
            }
        } else {
            false
        };

        if refused {
            return Err(SortieError::Connect {
                host: host.to_string(),
                port,
                reason: format!("connection refused for {name}"),
            });
        }

        state.next_handle += 1;
        let handle = PlayerHandle(state.next_handle);
        state.players.push(PlayerSlot {
            handle,
            client: name.to_string(),
            info: None,
            entities: Vec::new(),
            events: VecDeque::new(),
            connected: true,
        });
        state.submissions.push(Submission::Connected {
            client: name.to_string(),
        });
        let delay = state.assignment_delay_polls;
        drop(state);

        Ok(Arc::new(LoopbackClient {
            name: name.to_string(),
            handle,
            server: self.server.clone(),
            unassigned_polls: AtomicU32::new(delay),
            closed: AtomicBool::new(false),
        }))
    }
}

struct LoopbackClient {
    name: String,
    handle: PlayerHandle,
    server: LoopbackServer,
    unassigned_polls: AtomicU32,
    closed: AtomicBool,
}

impl LoopbackClient {
    fn ensure_open(&self) -> Result<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(SortieError::Engine(format!("{} is disconnected", self.name)));
        }
        Ok(())
    }
}

#[async_trait]
impl EngineClient for LoopbackClient {
    fn name(&self) -> &str {
        &self.name
    }

    fn local_player(&self) -> Option<PlayerHandle> {
        let pending = self
            .unassigned_polls
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        match pending {
            Ok(_) => None,
            Err(_) => Some(self.handle),
        }
    }

    async fn phase(&self) -> Result<EnginePhase> {
        self.ensure_open()?;
        let mut state = self.server.lock();
        if state.unknown_phase_polls > 0 {
            state.unknown_phase_polls -= 1;
            return Ok(EnginePhase::Unknown);
        }
        Ok(state.phase)
    }

    async fn send_game_options(&self, options: &GameOptions) -> Result<()> {
        self.ensure_open()?;
        let mut state = self.server.lock();
        state.options = Some(options.clone());
        state.submissions.push(Submission::GameOptions);
        Ok(())
    }

    async fn send_map_settings(&self, settings: &MapSettings) -> Result<()> {
        self.ensure_open()?;
        let mut state = self.server.lock();
        state.map = Some(settings.clone());
        state.submissions.push(Submission::MapSettings);
        Ok(())
    }

    async fn send_planetary_conditions(&self, conditions: &PlanetaryConditions) -> Result<()> {
        self.ensure_open()?;
        let mut state = self.server.lock();
        state.conditions = Some(conditions.clone());
        state.submissions.push(Submission::PlanetaryConditions);
        Ok(())
    }

    async fn send_player_info(&self, info: &PlayerInfo) -> Result<()> {
        self.ensure_open()?;
        let mut state = self.server.lock();
        if let Some(slot) = state.slot_mut(self.handle) {
            slot.info = Some(info.clone());
        }
        state.submissions.push(Submission::PlayerInfo {
            client: self.name.clone(),
        });
        Ok(())
    }

    async fn send_entities(&self, entities: Vec<EngineEntity>) -> Result<()> {
        self.ensure_open()?;
        let mut state = self.server.lock();
        if state.rejects_entities.contains(&self.name) {
            return Err(SortieError::Engine(format!(
                "entity batch from {} rejected",
                self.name
            )));
        }
        let count = entities.len();
        if let Some(slot) = state.slot_mut(self.handle) {
            slot.entities.extend(entities);
        }
        state.submissions.push(Submission::Entities {
            client: self.name.clone(),
            count,
        });
        Ok(())
    }

    fn poll_event(&self) -> Option<EngineEvent> {
        self.server
            .lock()
            .slot_mut(self.handle)
            .and_then(|slot| slot.events.pop_front())
    }

    async fn disconnect(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        let mut state = self.server.lock();
        if let Some(slot) = state.slot_mut(self.handle) {
            slot.connected = false;
        }
        state.submissions.push(Submission::Disconnected {
            client: self.name.clone(),
        });
    }
}
