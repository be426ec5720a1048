//! Launch variants
//!
//! A plain launch sends exactly what the scenario names. A contract launch
//! also schedules unit arrival from the contract's deploy delay and brings in
//! the allied and opposing forces the contract generated.

use std::sync::Arc;

use super::deployment::{compute_deploy_round, inherit_deploy_round};
use crate::campaign::{Campaign, Contract, ForceDescriptor, Scenario};
use crate::engine::EngineEntity;

/// Decides deploy rounds for the player's units and any extra bot forces
pub trait ForcePopulation: Send + Sync {
    fn name(&self) -> &'static str;

    /// Round a player unit enters on
    fn deploy_round(&self, entity: &EngineEntity, force: &ForceDescriptor) -> u32;

    /// Bot forces to start alongside the scenario's own
    fn extra_bot_forces(&self) -> Vec<ForceDescriptor> {
        Vec::new()
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct StandardPopulation;

impl ForcePopulation for StandardPopulation {
    fn name(&self) -> &'static str {
        "standard"
    }

    fn deploy_round(&self, entity: &EngineEntity, force: &ForceDescriptor) -> u32 {
        inherit_deploy_round(entity.deploy_round, force.base_deploy_round)
    }
}

#[derive(Debug, Clone)]
pub struct ContractPopulation {
    base_delay: i32,
    forces: Vec<ForceDescriptor>,
}

impl ContractPopulation {
    pub fn from_contract(contract: &Contract) -> Self {
        let floor = contract.deploy_delay.max(0) as u32;
        let forces = contract
            .allies
            .iter()
            .chain(contract.opposition.iter())
            .cloned()
            .map(|mut force| {
                force.base_deploy_round = force.base_deploy_round.max(floor);
                force
            })
            .collect();

        Self {
            base_delay: contract.deploy_delay,
            forces,
        }
    }
}

impl ForcePopulation for ContractPopulation {
    fn name(&self) -> &'static str {
        "contract"
    }

    fn deploy_round(&self, entity: &EngineEntity, force: &ForceDescriptor) -> u32 {
        compute_deploy_round(
            entity.deploy_round as i32,
            self.base_delay,
            entity.walk_mp,
            force.role,
        )
    }

    fn extra_bot_forces(&self) -> Vec<ForceDescriptor> {
        self.forces.clone()
    }
}

/// Contract scenarios get the contract variant, everything else the plain one
pub fn population_for(campaign: &Campaign, scenario: &Scenario) -> Arc<dyn ForcePopulation> {
    match scenario.contract.and_then(|id| campaign.contracts.get(&id)) {
        Some(contract) => Arc::new(ContractPopulation::from_contract(contract)),
        None => Arc::new(StandardPopulation),
    }
}
