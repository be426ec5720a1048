//! Scenario definitions: the board, conditions and forces of one battle

use serde::{Deserialize, Serialize};

use super::force::ForceRole;
use crate::core::types::{ForceId, ScenarioId};
use crate::engine::{Deployment, EngineEntity, GameOptions, PlanetaryConditions};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ScenarioStatus {
    #[default]
    Current,
    DecisiveVictory,
    Victory,
    MarginalVictory,
    Draw,
    MarginalDefeat,
    Defeat,
    DecisiveDefeat,
}

impl ScenarioStatus {
    pub fn is_resolved(self) -> bool {
        self != ScenarioStatus::Current
    }
}

/// Where the battlefield comes from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BoardSource {
    Space,
    Fixed { name: String },
    Generated { template: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapSpec {
    pub source: BoardSource,
    pub width: i32,
    pub height: i32,
}

impl MapSpec {
    /// Map identifier as shown to the operator
    pub fn identifier(&self) -> &str {
        match &self.source {
            BoardSource::Space => "space",
            BoardSource::Fixed { name } => name,
            BoardSource::Generated { template } => template,
        }
    }
}

/// A named collection of units plus the metadata the engine needs to place
/// them. Player and bot forces share this shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForceDescriptor {
    pub name: String,
    #[serde(default)]
    pub deployment: Deployment,
    #[serde(default)]
    pub camouflage: String,
    #[serde(default)]
    pub colour: String,
    /// Round the force enters on unless a unit names its own
    #[serde(default)]
    pub base_deploy_round: u32,
    #[serde(default)]
    pub role: ForceRole,
    pub units: Vec<EngineEntity>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    pub id: ScenarioId,
    pub name: String,
    #[serde(default)]
    pub status: ScenarioStatus,
    #[serde(default)]
    pub report: String,
    /// Campaign forces committed to this battle
    #[serde(default)]
    pub forces: Vec<ForceId>,
    pub map: MapSpec,
    #[serde(default)]
    pub conditions: PlanetaryConditions,
    /// Where the local player deploys
    #[serde(default)]
    pub deployment: Deployment,
    #[serde(default)]
    pub bot_forces: Vec<ForceDescriptor>,
    #[serde(default)]
    pub game_options: GameOptions,
    #[serde(default)]
    pub contract: Option<u32>,
}

impl Scenario {
    pub fn new(id: ScenarioId, name: impl Into<String>, map: MapSpec) -> Self {
        Self {
            id,
            name: name.into(),
            status: ScenarioStatus::Current,
            report: String::new(),
            forces: Vec::new(),
            map,
            conditions: PlanetaryConditions::default(),
            deployment: Deployment::default(),
            bot_forces: Vec::new(),
            game_options: GameOptions::default(),
            contract: None,
        }
    }
}
