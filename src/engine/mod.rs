//! Boundary to the external game engine
//!
//! The engine runs the battle itself; we only connect clients to it, push the
//! board, conditions, players and entities it needs, and watch for it to
//! report victory or closure. Message shapes on the wire belong to the engine,
//! so everything here is expressed as typed payloads behind two traits.

pub mod loopback;

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::campaign::unit::UnitCondition;
use crate::core::error::Result;
use crate::core::types::{ExternalId, Money, PlayerHandle};

pub use loopback::{LoopbackConnector, LoopbackServer};

/// Game phase as reported by the server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EnginePhase {
    /// The server has not told us yet
    #[default]
    Unknown,
    /// Pre-game lobby; configuration is accepted
    Lounge,
    Deployment,
    Movement,
    Firing,
    EndOfTurn,
    Victory,
}

impl EnginePhase {
    pub fn is_known(self) -> bool {
        self != EnginePhase::Unknown
    }
}

/// Rule options pushed before the game starts
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GameOptions {
    pub values: BTreeMap<String, String>,
}

impl GameOptions {
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BoardKind {
    Ground,
    Space,
}

/// Procedural board parameters, loaded from a template file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedBoard {
    pub theme: String,
    pub hills_pct: u8,
    pub water_pct: u8,
    pub forest_pct: u8,
    pub seed: u64,
}

/// Board configuration as the engine consumes it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapSettings {
    pub kind: BoardKind,
    pub width: i32,
    pub height: i32,
    /// Named boards, one per map sheet; empty for space and generated boards
    pub boards: Vec<String>,
    pub generated: Option<GeneratedBoard>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Light {
    #[default]
    Day,
    Dusk,
    FullMoon,
    Moonless,
    Pitch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Weather {
    #[default]
    Clear,
    LightRain,
    HeavyRain,
    LightSnow,
    HeavySnow,
    Sleet,
    Fog,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Wind {
    #[default]
    Calm,
    LightGale,
    ModerateGale,
    StrongGale,
    Storm,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Atmosphere {
    Vacuum,
    Trace,
    Thin,
    #[default]
    Standard,
    High,
    VeryHigh,
}

/// Environmental conditions of the battlefield
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlanetaryConditions {
    pub light: Light,
    pub weather: Weather,
    pub wind: Wind,
    pub gravity: f32,
    pub temperature: i32,
    pub atmosphere: Atmosphere,
    pub emi: bool,
    pub blowing_sand: bool,
}

impl Default for PlanetaryConditions {
    fn default() -> Self {
        Self {
            light: Light::Day,
            weather: Weather::Clear,
            wind: Wind::Calm,
            gravity: 1.0,
            temperature: 25,
            atmosphere: Atmosphere::Standard,
            emi: false,
            blowing_sand: false,
        }
    }
}

/// Board edge (or area) a player deploys from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum StartingPosition {
    #[default]
    Any,
    NorthWest,
    North,
    NorthEast,
    East,
    SouthEast,
    South,
    SouthWest,
    West,
    Edge,
    Centre,
    /// Inside the explicit `deploy_area` rectangle
    Area,
}

/// Corners of a "deploy anywhere" rectangle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeployArea {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

/// Deployment parameters of one player
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Deployment {
    pub start: StartingPosition,
    pub offset: i32,
    pub width: i32,
    pub area: Option<DeployArea>,
    pub team: u8,
}

/// Player record the engine shows in its lounge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerInfo {
    pub name: String,
    pub camouflage: String,
    pub colour: String,
    pub deployment: Deployment,
}

/// Crew aboard an entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineCrew {
    pub external_id: Option<ExternalId>,
    pub name: String,
    pub hits: u8,
}

/// A unit as submitted to (and reported back by) the engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineEntity {
    pub external_id: Option<ExternalId>,
    pub name: String,
    #[serde(default)]
    pub owner: Option<PlayerHandle>,
    #[serde(default)]
    pub force_label: String,
    #[serde(default)]
    pub deploy_round: u32,
    pub walk_mp: i32,
    pub condition: UnitCondition,
    #[serde(default)]
    pub crew: Option<EngineCrew>,
    #[serde(default)]
    pub value: Money,
}

/// Notifications the engine raises on its own
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    Victory { winning_team: Option<u8> },
    Closed,
}

/// Opens client connections to a game server
#[async_trait]
pub trait EngineConnector: Send + Sync {
    async fn connect(&self, name: &str, host: &str, port: u16) -> Result<Arc<dyn EngineClient>>;
}

/// One connected client, player or bot
#[async_trait]
pub trait EngineClient: Send + Sync {
    /// Name this client registered under
    fn name(&self) -> &str;

    /// Player slot assigned by the server, once it has assigned one
    fn local_player(&self) -> Option<PlayerHandle>;

    async fn phase(&self) -> Result<EnginePhase>;

    async fn send_game_options(&self, options: &GameOptions) -> Result<()>;

    async fn send_map_settings(&self, settings: &MapSettings) -> Result<()>;

    async fn send_planetary_conditions(&self, conditions: &PlanetaryConditions) -> Result<()>;

    async fn send_player_info(&self, info: &PlayerInfo) -> Result<()>;

    async fn send_entities(&self, entities: Vec<EngineEntity>) -> Result<()>;

    /// Next pending notification, without waiting
    fn poll_event(&self) -> Option<EngineEvent>;

    async fn disconnect(&self);
}
