use thiserror::Error;

use crate::core::types::{ExternalId, PersonId, UnitId};

#[derive(Error, Debug)]
pub enum SortieError {
    #[error("Connection to {host}:{port} failed: {reason}")]
    Connect {
        host: String,
        port: u16,
        reason: String,
    },

    #[error("Engine rejected request: {0}")]
    Engine(String),

    #[error("{name} not ready after {attempts} attempts")]
    NotReady { name: String, attempts: u32 },

    #[error("Map error: {0}")]
    Map(String),

    #[error("Planetary conditions error: {0}")]
    Conditions(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unit not found: {0:?}")]
    UnknownUnit(UnitId),

    #[error("Person not found: {0:?}")]
    UnknownPerson(PersonId),

    #[error("Scenario not found: {0}")]
    UnknownScenario(String),

    #[error("Salvage claim on {external_id} refused: unit share is already {pct}% (cap {cap}%)")]
    SalvageCap {
        external_id: ExternalId,
        pct: u32,
        cap: u32,
    },

    #[error("{0} belongs to the roster and cannot be claimed as salvage")]
    OwnUnitSalvage(ExternalId),

    #[error("No {kind} at index {index}")]
    NoSuchDiscrepancy { kind: &'static str, index: usize },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    TomlError(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, SortieError>;
