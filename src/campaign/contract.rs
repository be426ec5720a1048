//! Employment contracts: salvage terms and contract-generated forces

use serde::{Deserialize, Serialize};

use super::scenario::ForceDescriptor;
use crate::core::types::Money;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contract {
    pub id: u32,
    pub name: String,
    pub employer: String,
    /// Highest share of salvage value (percent) the unit may keep
    pub salvage_pct: u32,
    /// Salvage value kept by the unit so far
    #[serde(default)]
    pub salvaged_by_unit: Money,
    /// Salvage value handed to the employer so far
    #[serde(default)]
    pub salvaged_by_employer: Money,
    /// Round from which contract forces trickle onto the board
    #[serde(default)]
    pub deploy_delay: i32,
    #[serde(default)]
    pub allies: Vec<ForceDescriptor>,
    #[serde(default)]
    pub opposition: Vec<ForceDescriptor>,
}

impl Contract {
    pub fn new(id: u32, name: impl Into<String>, employer: impl Into<String>, salvage_pct: u32) -> Self {
        Self {
            id,
            name: name.into(),
            employer: employer.into(),
            salvage_pct,
            salvaged_by_unit: 0,
            salvaged_by_employer: 0,
            deploy_delay: 0,
            allies: Vec::new(),
            opposition: Vec::new(),
        }
    }
}
